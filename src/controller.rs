//! The periodic refresh, reconcile, diff and emit cycle.

use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::{debug, info};

use crate::address::AddressSet;
use crate::command::{Command, CommandFormatter, Intent};
use crate::error::Result;
use crate::fetcher::ListFetcher;
use crate::reconciler::{count_addresses, diff, reconcile};
use crate::session::{PeerSession, Reply, SessionState};
use crate::signal::ShutdownToken;
use crate::source::BlacklistSource;
use crate::store::CacheStore;

/// Pause between two cycles while attached.
pub const CYCLE_INTERVAL: Duration = Duration::from_secs(10);

/// Commands emitted by one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub advertised: usize,
    pub withdrawn: usize,
    /// Commands the peer answered with `error`; counted in the two above too.
    pub rejected: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed(CycleReport),
    /// The peer asked us to stop partway through.
    Shutdown,
}

/// Why [`Controller::run`] returned. All of them are clean exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stop {
    PeerShutdown,
    Signal,
    /// Detached runs stop after their only cycle.
    SingleCycle,
}

pub struct Controller<R, W> {
    sources: Vec<BlacklistSource>,
    advertised: AddressSet,
    formatter: CommandFormatter,
    session: PeerSession<R, W>,
    fetcher: Box<dyn ListFetcher>,
    store: Box<dyn CacheStore>,
}

impl<R, W> Controller<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// The advertised set starts empty: whatever the peer had before a
    /// restart is advertised again.
    pub fn new(
        sources: Vec<BlacklistSource>,
        formatter: CommandFormatter,
        session: PeerSession<R, W>,
        fetcher: Box<dyn ListFetcher>,
        store: Box<dyn CacheStore>,
    ) -> Self {
        Self {
            sources,
            advertised: AddressSet::new(),
            formatter,
            session,
            fetcher,
            store,
        }
    }

    pub fn advertised(&self) -> &AddressSet {
        &self.advertised
    }

    pub fn session(&self) -> &PeerSession<R, W> {
        &self.session
    }

    /// Handshake, then cycle until the peer, a signal, or detached mode
    /// ends the loop.
    pub async fn run(&mut self, token: &ShutdownToken) -> Result<Stop> {
        tokio::select! {
            biased;
            _ = token.cancelled() => return Ok(Stop::Signal),
            handshake = self.session.handshake() => handshake?,
        }
        if self.session.state() == SessionState::Closed {
            return Ok(Stop::PeerShutdown);
        }

        loop {
            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => return Ok(Stop::Signal),
                outcome = self.run_cycle(Utc::now()) => outcome?,
            };

            if outcome == CycleOutcome::Shutdown {
                return Ok(Stop::PeerShutdown);
            }
            if !self.session.is_attached() {
                return Ok(Stop::SingleCycle);
            }

            tokio::select! {
                biased;
                _ = token.cancelled() => return Ok(Stop::Signal),
                _ = tokio::time::sleep(CYCLE_INTERVAL) => {}
            }
        }
    }

    /// One pass: refresh due sources, rebuild the target set, and send the
    /// difference, advertisements first.
    pub async fn run_cycle(&mut self, now: DateTime<Utc>) -> Result<CycleOutcome> {
        for source in &mut self.sources {
            source
                .refresh(now, self.fetcher.as_ref(), self.store.as_ref())
                .await?;
        }

        let target = reconcile(self.sources.iter().map(|s| s.entries()));
        let delta = diff(&target, &self.advertised);
        if delta.is_empty() {
            debug!("Nothing to change, {} prefixes advertised", self.advertised.len());
            return Ok(CycleOutcome::Completed(CycleReport::default()));
        }

        let commands = delta
            .advertise
            .iter()
            .map(|addr| Command::advertise(*addr))
            .chain(delta.withdraw.iter().map(|addr| Command::withdraw(*addr)));

        let mut report = CycleReport::default();
        for command in commands {
            let line = self.formatter.format(&command);
            // A rejected command is still recorded: nothing retries it
            match self.session.send_command(&line, false).await? {
                Reply::Shutdown => return Ok(CycleOutcome::Shutdown),
                Reply::Rejected => report.rejected += 1,
                Reply::Sent | Reply::Done | Reply::Response(_) => {}
            }

            match command.intent {
                Intent::Advertise => {
                    self.advertised.insert(command.address);
                    report.advertised += 1;
                }
                Intent::Withdraw => {
                    self.advertised.remove(&command.address);
                    report.withdrawn += 1;
                }
            }
        }

        info!(
            "{}: {} advertised, {} withdrawn, {} rejected; {} prefixes ({} addresses) active",
            self.formatter.method_name(),
            report.advertised,
            report.withdrawn,
            report.rejected,
            self.advertised.len(),
            count_addresses(&self.advertised)
        );

        Ok(CycleOutcome::Completed(report))
    }
}
