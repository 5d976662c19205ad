//! Rendering of advertise/withdraw intents into ExaBGP API commands.

use std::fmt;
use std::net::Ipv4Addr;

use crate::address::Address;

/// Whether a prefix is being added to or removed from the peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Advertise,
    Withdraw,
}

impl Intent {
    /// The API verb for this intent.
    pub fn verb(self) -> &'static str {
        match self {
            Intent::Advertise => "announce",
            Intent::Withdraw => "withdraw",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    pub intent: Intent,
    pub address: Address,
}

impl Command {
    pub fn advertise(address: Address) -> Self {
        Self {
            intent: Intent::Advertise,
            address,
        }
    }

    pub fn withdraw(address: Address) -> Self {
        Self {
            intent: Intent::Withdraw,
            address,
        }
    }
}

/// FlowSpec protocol match. `Any` leaves the clause out entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowProtocol {
    Tcp,
    Udp,
    Any,
}

impl fmt::Display for FlowProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FlowProtocol::Tcp => "tcp",
            FlowProtocol::Udp => "udp",
            FlowProtocol::Any => "any",
        })
    }
}

/// Advertisement method, chosen once when the configuration is loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandFormatter {
    /// Plain blackhole route with next-hop and communities.
    Unicast {
        next_hop: Ipv4Addr,
        communities: String,
    },
    /// Flow route discarding traffic sourced from the prefix.
    Flowspec {
        /// Destination-port expression such as `=5060`; `None` matches all ports.
        destination_port: Option<String>,
        protocol: FlowProtocol,
        communities: String,
    },
}

impl CommandFormatter {
    pub fn format(&self, command: &Command) -> String {
        let verb = command.intent.verb();
        match self {
            CommandFormatter::Unicast {
                next_hop,
                communities,
            } => format!(
                "{} route {} next-hop {} community [{}]",
                verb, command.address, next_hop, communities
            ),
            CommandFormatter::Flowspec {
                destination_port,
                protocol,
                communities,
            } => {
                let port_clause = match destination_port {
                    Some(expr) => format!("destination-port {}; ", expr),
                    None => String::new(),
                };
                let protocol_clause = match protocol {
                    FlowProtocol::Any => String::new(),
                    p => format!("protocol {}; ", p),
                };
                format!(
                    "{} flow route {{ match {{ source {}; {}{}}} then {{ community [{}]; discard; }} }}",
                    verb, command.address, port_clause, protocol_clause, communities
                )
            }
        }
    }

    pub fn method_name(&self) -> &'static str {
        match self {
            CommandFormatter::Unicast { .. } => "unicast",
            CommandFormatter::Flowspec { .. } => "flowspec",
        }
    }
}
