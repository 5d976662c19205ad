//! # voipbl-rtbh - Remotely triggered blackholing for VoIP blacklists
//!
//! Runs as an ExaBGP process: keeps the voipbl.org list and a local list in
//! sync with the routes ExaBGP announces, as plain blackhole routes or as
//! FlowSpec discard rules.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       voipbl-rtbh                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  CLI (clap)                                                 │
//! │    └── Commands: run [--dry-run], check, default-config     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Config (serde_yaml)                                        │
//! │    └── voipbl, localbl and exabgp sections, field rules     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Sources                                                    │
//! │    ├── voipbl: HttpFetcher (reqwest + rustls) → cache file  │
//! │    └── localbl: operator-edited file                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Reconciler (ipnet)                                         │
//! │    └── union of sources, diff against advertised set        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  CommandFormatter                                           │
//! │    ├── unicast: announce route ... next-hop ...             │
//! │    └── flowspec: announce flow route { ... discard; }       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  PeerSession (stdin/stdout line protocol)                   │
//! │    └── version handshake, done/error/shutdown replies       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```no_run
//! use voipbl_rtbh::config::Config;
//! use voipbl_rtbh::controller::Controller;
//! use voipbl_rtbh::fetcher::HttpFetcher;
//! use voipbl_rtbh::session::PeerSession;
//! use voipbl_rtbh::signal::ShutdownToken;
//! use voipbl_rtbh::store::FileStore;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("/etc/voipbl-rtbh/config.yaml")?;
//!
//!     // Detached: print one cycle of commands to stdout
//!     let mut controller = Controller::new(
//!         config.sources(),
//!         config.formatter()?,
//!         PeerSession::stdio(false),
//!         Box::new(HttpFetcher::new()?),
//!         Box::new(FileStore),
//!     );
//!     controller.run(&ShutdownToken::new()).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`address`] - CIDR parsing, private/reserved classification, list normalization
//! - [`cli`] - Command-line interface definitions
//! - [`command`] - Unicast and FlowSpec command rendering
//! - [`commands`] - CLI command implementations
//! - [`config`] - Configuration parsing and validation
//! - [`controller`] - The refresh/reconcile/emit cycle
//! - [`error`] - Error taxonomy
//! - [`fetcher`] - HTTP client for the remote list
//! - [`lock`] - Single-instance lock
//! - [`reconciler`] - Source union and diff
//! - [`session`] - ExaBGP line protocol
//! - [`signal`] - SIGINT suppression and SIGTERM shutdown
//! - [`source`] - Remote and local blacklist sources
//! - [`store`] - Cache file access

pub mod address;
pub mod cli;
pub mod command;
pub mod commands;
pub mod config;
pub mod controller;
pub mod error;
pub mod fetcher;
pub mod lock;
pub mod reconciler;
pub mod session;
pub mod signal;
pub mod source;
pub mod store;

pub use address::{parse_address, Address, AddressSet};
pub use cli::{Cli, Commands};
pub use config::Config;
pub use error::ControllerError;
