//! Line protocol with the routing-control peer (ExaBGP process API).
//!
//! Commands go out as newline-terminated lines. When the process runs
//! attached to the peer, every command may be answered with one line:
//! `done`, `error`, `shutdown`, or a JSON object such as
//! `{"type":"notification","notification":"shutdown"}`.
//!
//! ```text
//! Unstarted --handshake--> Handshaking --version ok--> Ready --shutdown--> Closed
//!     \______________________ protocol error ______________________/--> Failed
//! ```

use serde_json::Value;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout,
};
use tracing::{debug, info, warn};

use crate::error::{ControllerError, Result};

/// Peers below this major version do not acknowledge commands.
const FIRST_ACKNOWLEDGING_MAJOR: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unstarted,
    Handshaking,
    Ready,
    Closed,
    Failed,
}

/// A reply returned verbatim to a caller that asked for one.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Text(String),
    Message(Value),
}

/// Outcome of a single [`PeerSession::send_command`].
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Written without waiting for an answer.
    Sent,
    /// Peer acknowledged with `done`.
    Done,
    /// Peer answered `error`: this command was refused, the session goes on.
    Rejected,
    /// Raw answer requested by the caller.
    Response(Response),
    /// Peer asked us to stop. The session is closed.
    Shutdown,
}

pub struct PeerSession<R, W> {
    reader: R,
    writer: W,
    attached: bool,
    ack_mode: bool,
    peer: Option<String>,
    version: Option<String>,
    state: SessionState,
}

/// Session over the process's own standard input and output.
pub type StdioSession = PeerSession<BufReader<Stdin>, Stdout>;

impl StdioSession {
    pub fn stdio(attached: bool) -> Self {
        PeerSession::new(
            BufReader::new(tokio::io::stdin()),
            tokio::io::stdout(),
            attached,
        )
    }
}

impl<R, W> PeerSession<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// `attached` is true when a peer is on the other end of the channel and
    /// may answer; a detached session only ever writes.
    pub fn new(reader: R, writer: W, attached: bool) -> Self {
        Self {
            reader,
            writer,
            attached,
            ack_mode: true,
            peer: None,
            version: None,
            state: SessionState::Unstarted,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Whether each command waits for `done`/`error`.
    pub fn ack_mode(&self) -> bool {
        self.ack_mode
    }

    pub fn peer(&self) -> Option<&str> {
        self.peer.as_deref()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    /// Ask the peer for its version and decide on acknowledgement mode.
    ///
    /// Detached sessions skip the exchange and become ready immediately.
    pub async fn handshake(&mut self) -> Result<()> {
        if self.state != SessionState::Unstarted {
            return Err(self.fail(format!(
                "Handshake attempted in state {:?}",
                self.state
            )));
        }

        if !self.attached {
            debug!("No control channel, commands are written without replies");
            self.state = SessionState::Ready;
            return Ok(());
        }

        self.state = SessionState::Handshaking;
        let reply = match self.send_command("version", true).await? {
            Reply::Response(Response::Text(text)) => text,
            Reply::Response(Response::Message(value)) => {
                return Err(self.fail(format!("Invalid version identifier {}.", value)));
            }
            Reply::Shutdown => return Ok(()),
            Reply::Sent | Reply::Done | Reply::Rejected => {
                return Err(self.fail("No version identifier received.".to_string()));
            }
        };

        let (peer, version) = match parse_version(&reply) {
            Some(parts) => parts,
            None => {
                return Err(self.fail(format!("Invalid version identifier {}.", reply)));
            }
        };

        if let Some(major) = leading_number(&version) {
            if major < FIRST_ACKNOWLEDGING_MAJOR {
                self.ack_mode = false;
            }
        }

        info!(
            "Connected to {} {} (acknowledgements {})",
            peer,
            version,
            if self.ack_mode { "on" } else { "off" }
        );

        self.peer = Some(peer);
        self.version = Some(version);
        self.state = SessionState::Ready;
        Ok(())
    }

    /// Write one command and, where the protocol calls for it, read the answer.
    pub async fn send_command(&mut self, text: &str, expect_response: bool) -> Result<Reply> {
        match self.state {
            SessionState::Ready | SessionState::Handshaking => {}
            state => {
                return Err(ControllerError::Protocol(format!(
                    "Cannot send {:?} in state {:?}",
                    text, state
                )));
            }
        }

        if let Err(e) = self.write_line(text).await {
            self.state = SessionState::Failed;
            return Err(e.into());
        }
        debug!("> {}", text);

        if !self.attached || (!expect_response && !self.ack_mode) {
            return Ok(Reply::Sent);
        }

        let mut raw = String::new();
        match self.reader.read_line(&mut raw).await {
            Ok(0) => return Err(self.fail("Peer closed the control channel".to_string())),
            Ok(_) => {}
            Err(e) => {
                self.state = SessionState::Failed;
                return Err(e.into());
            }
        }
        let line = raw.trim();
        debug!("< {}", line);

        let message = if line.starts_with('{') {
            match serde_json::from_str::<Value>(line) {
                Ok(value) => Some(value),
                Err(_) => {
                    return Err(self.fail(format!("Received invalid JSON response {}.", line)));
                }
            }
        } else {
            None
        };

        if let Some(value) = &message {
            if is_shutdown_notification(value) {
                return Ok(self.close());
            }
        }

        if expect_response {
            return Ok(Reply::Response(match message {
                Some(value) => Response::Message(value),
                None => Response::Text(line.to_string()),
            }));
        }

        if message.is_some() {
            return Err(self.fail(format!("Received invalid API response {}.", line)));
        }

        match line {
            "done" => Ok(Reply::Done),
            "error" => {
                warn!("Peer rejected command: {}", text);
                Ok(Reply::Rejected)
            }
            "shutdown" => Ok(self.close()),
            other => Err(self.fail(format!("Received invalid API response {}.", other))),
        }
    }

    async fn write_line(&mut self, text: &str) -> std::io::Result<()> {
        self.writer.write_all(text.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await
    }

    fn close(&mut self) -> Reply {
        info!("Peer requested shutdown");
        self.state = SessionState::Closed;
        Reply::Shutdown
    }

    fn fail(&mut self, message: String) -> ControllerError {
        self.state = SessionState::Failed;
        ControllerError::Protocol(message)
    }
}

/// Split a `<peername> <version>` reply.
pub fn parse_version(reply: &str) -> Option<(String, String)> {
    let (peer, version) = reply.trim().split_once(' ')?;
    let version = version.trim();
    if peer.is_empty() || version.is_empty() {
        return None;
    }
    Some((peer.to_string(), version.to_string()))
}

/// Leading decimal digits of a version string, if any.
fn leading_number(version: &str) -> Option<u32> {
    let digits: String = version.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

fn is_shutdown_notification(value: &Value) -> bool {
    value.get("type").and_then(Value::as_str) == Some("notification")
        && value.get("notification").and_then(Value::as_str) == Some("shutdown")
}
