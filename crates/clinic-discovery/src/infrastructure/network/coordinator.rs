//! The Discovery Coordinator: UDP probe, election timer, and server beacon.
//!
//! [`DiscoveryCoordinator::start`] binds the discovery port and returns a
//! one-shot receiver straight away.  Three background tasks then race to
//! decide the role:
//!
//! - **probe** – receives datagrams on the discovery port and feeds them to
//!   the [`Election`].  The first valid beacon resolves the election as
//!   `ServerFound`; the task then returns, which closes the socket.
//! - **timer** – sleeps for the discovery timeout and feeds the expiry to the
//!   [`Election`].  If nothing was found it resolves as `BecomeServer`, closes
//!   the probe, and spawns the beacon task.
//! - **beacon** – only on the server: opens a broadcast socket and sends a
//!   fresh [`BeaconMessage`] every beacon period until stopped.  If the socket
//!   cannot be opened, the open is retried on each tick.
//!
//! All decisions, the outcome sender, and every task handle live in one
//! [`Mutex`].  Feeding the election, sending the outcome, and spawning or
//! aborting tasks happen inside the same critical section, so a beacon racing
//! the timer, or either racing [`DiscoveryCoordinator::stop`], yields at most
//! one outcome and never leaves a task running after `stop` returns.
//! The lock is never held across an `.await`.
//!
//! # Timeline (server side)
//!
//! ```text
//! t=0        start(): bind 0.0.0.0:8765, arm 5 s timer
//! t=5 s      timer fires, no beacon → BecomeServer sent, probe closed
//! t=8 s      first beacon → 255.255.255.255:8765
//! t=11 s     second beacon … every 3 s until stop()
//! ```

use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use clinic_core::{
    encode_beacon, BeaconMessage, DiscoveryTiming, Election, ElectionError, ElectionOutcome,
    Phase, BROADCAST_ADDR, BROADCAST_PORT,
};
use thiserror::Error;
use tokio::{net::UdpSocket, sync::oneshot, task::JoinHandle, time};
use tracing::{debug, error, info, warn};

/// Largest datagram the probe reads.  Beacons are well under 100 bytes.
const MAX_DATAGRAM: usize = 2048;

/// Pause after the first receive error; doubles per consecutive error.
const RECV_RETRY_MIN: Duration = Duration::from_millis(10);
/// Longest pause between receive attempts while errors persist.
const RECV_RETRY_MAX: Duration = Duration::from_secs(1);

/// Error type for discovery coordinator operations.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The receive endpoint could not be bound to the discovery port.
    #[error("failed to bind discovery socket on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    /// `start` was called on a coordinator that is already running.
    #[error("discovery already started")]
    AlreadyStarted,
    /// `start` was called after `stop`.
    #[error("discovery has been stopped")]
    Stopped,
}

impl From<ElectionError> for DiscoveryError {
    fn from(e: ElectionError) -> Self {
        match e {
            ElectionError::AlreadyStarted => DiscoveryError::AlreadyStarted,
            ElectionError::Stopped => DiscoveryError::Stopped,
        }
    }
}

/// Socket addresses and timing used by a [`DiscoveryCoordinator`].
#[derive(Debug, Clone)]
pub struct DiscoverySettings {
    /// Local address the receive endpoint binds to.
    pub listen_addr: SocketAddr,
    /// Destination of every beacon sent while serving.
    pub beacon_target: SocketAddr,
    /// Beacon period and election timeout.
    pub timing: DiscoveryTiming,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), BROADCAST_PORT),
            beacon_target: SocketAddr::new(IpAddr::V4(BROADCAST_ADDR), BROADCAST_PORT),
            timing: DiscoveryTiming::default(),
        }
    }
}

/// Everything guarded by the coordinator's lock.
#[derive(Default)]
struct CoordinatorState {
    election: Election,
    outcome_tx: Option<oneshot::Sender<ElectionOutcome>>,
    local_addr: Option<SocketAddr>,
    probe: Option<JoinHandle<()>>,
    timer: Option<JoinHandle<()>>,
    beacon: Option<JoinHandle<()>>,
}

impl CoordinatorState {
    /// Hands `outcome` to the collaborator.  Only the first call delivers.
    fn emit(&mut self, outcome: ElectionOutcome) {
        match self.outcome_tx.take() {
            Some(tx) => {
                if tx.send(outcome).is_err() {
                    debug!("election outcome receiver dropped: {outcome:?}");
                }
            }
            None => debug!("election outcome already delivered: {outcome:?}"),
        }
    }

    fn abort_all(&mut self) {
        for handle in [self.probe.take(), self.timer.take(), self.beacon.take()]
            .into_iter()
            .flatten()
        {
            handle.abort();
        }
    }
}

type Shared = Arc<Mutex<CoordinatorState>>;

fn lock(shared: &Shared) -> MutexGuard<'_, CoordinatorState> {
    // The state stays consistent even if a holder panicked: every mutation is
    // a single field assignment.
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Decides whether this process is the LAN's server or a client of it.
///
/// A coordinator runs one election per lifetime.  Dropping it is equivalent
/// to calling [`stop`](Self::stop).
pub struct DiscoveryCoordinator {
    settings: DiscoverySettings,
    shared: Shared,
}

impl DiscoveryCoordinator {
    /// Creates an idle coordinator.  Nothing is bound until [`start`](Self::start).
    pub fn new(settings: DiscoverySettings) -> Self {
        Self {
            settings,
            shared: Arc::new(Mutex::new(CoordinatorState::default())),
        }
    }

    /// Binds the discovery port, arms the election timer, and returns the
    /// receiver on which the single [`ElectionOutcome`] will arrive.
    ///
    /// The receiver reports `RecvError` if the coordinator is stopped before
    /// the role is decided.
    ///
    /// # Errors
    ///
    /// - [`DiscoveryError::AlreadyStarted`] on a second call; the running
    ///   election is left untouched.
    /// - [`DiscoveryError::Stopped`] after [`stop`](Self::stop).
    /// - [`DiscoveryError::BindFailed`] if the port cannot be bound.  Without a
    ///   receive endpoint no peer can ever be observed, so the coordinator
    ///   stops instead of electing itself.  There is no retry.
    pub async fn start(&self) -> Result<oneshot::Receiver<ElectionOutcome>, DiscoveryError> {
        lock(&self.shared).election.start()?;

        let addr = self.settings.listen_addr;
        let socket = match UdpSocket::bind(addr).await {
            Ok(socket) => socket,
            Err(source) => {
                error!("cannot bind discovery port {addr}: {source}");
                self.stop();
                return Err(DiscoveryError::BindFailed { addr, source });
            }
        };
        let local_addr = socket.local_addr().unwrap_or(addr);

        let (tx, rx) = oneshot::channel();
        let mut state = lock(&self.shared);
        if state.election.is_stopped() {
            // stop() ran while we were binding.
            return Err(DiscoveryError::Stopped);
        }
        state.outcome_tx = Some(tx);
        state.local_addr = Some(local_addr);
        state.probe = Some(tokio::spawn(probe_loop(socket, Arc::clone(&self.shared))));
        state.timer = Some(tokio::spawn(election_timer(
            self.settings.clone(),
            Arc::clone(&self.shared),
        )));
        drop(state);

        info!(
            "listening for servers on {local_addr} (timeout {:?})",
            self.settings.timing.discovery_timeout()
        );
        Ok(rx)
    }

    /// Tears down whichever endpoints and timers are active.
    ///
    /// Safe to call any number of times, from any phase.  An outcome that has
    /// not been delivered yet is suppressed.
    pub fn stop(&self) {
        let mut state = lock(&self.shared);
        let first = state.election.stop();
        state.outcome_tx = None;
        state.local_addr = None;
        state.abort_all();
        if first {
            info!("discovery stopped");
        }
    }

    /// Current election phase.
    pub fn phase(&self) -> Phase {
        lock(&self.shared).election.phase()
    }

    /// Address the receive endpoint is bound to, while it is open.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        lock(&self.shared).local_addr
    }
}

impl Drop for DiscoveryCoordinator {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Receives datagrams until the first accepted beacon.
async fn probe_loop(socket: UdpSocket, shared: Shared) {
    let mut buf = vec![0u8; MAX_DATAGRAM];
    let mut consecutive_errors = 0u32;

    loop {
        let (len, src) = match socket.recv_from(&mut buf).await {
            Ok(pair) => {
                consecutive_errors = 0;
                pair
            }
            Err(e) => {
                consecutive_errors = consecutive_errors.saturating_add(1);
                let delay = recv_retry_delay(consecutive_errors);
                warn!("discovery recv error ({consecutive_errors} in a row), retrying in {delay:?}: {e}");
                time::sleep(delay).await;
                continue;
            }
        };

        let done = {
            let mut state = lock(&shared);
            match state.election.on_datagram(&buf[..len], src.ip()) {
                Some(outcome) => {
                    info!("found server at {}", src.ip());
                    state.emit(outcome);
                    if let Some(timer) = state.timer.take() {
                        timer.abort();
                    }
                    state.probe = None;
                    state.local_addr = None;
                    true
                }
                None => state.election.is_stopped(),
            }
        };
        if done {
            break;
        }
    }
    // `socket` drops here: nothing is bound to receive further beacons.
}

/// Back-off before the next receive after `consecutive_errors` failures.
fn recv_retry_delay(consecutive_errors: u32) -> Duration {
    let doublings = consecutive_errors.saturating_sub(1).min(10);
    RECV_RETRY_MIN
        .saturating_mul(1 << doublings)
        .min(RECV_RETRY_MAX)
}

/// Fires once after the discovery timeout.
async fn election_timer(settings: DiscoverySettings, shared: Shared) {
    time::sleep(settings.timing.discovery_timeout()).await;

    let mut state = lock(&shared);
    let Some(outcome) = state.election.on_timeout() else {
        return;
    };
    info!("no server found - becoming server");
    state.emit(outcome);
    state.timer = None;
    if let Some(probe) = state.probe.take() {
        probe.abort();
    }
    state.local_addr = None;
    state.beacon = Some(tokio::spawn(beacon_loop(
        settings.beacon_target,
        settings.timing.beacon_period(),
        Arc::clone(&shared),
        open_broadcast_socket,
    )));
}

/// Broadcasts a beacon every `period`, starting one period from now.
///
/// A failed send is logged and skipped; the next tick is the retry.  The same
/// goes for opening the socket.  Each tick re-checks the stopped flag, so a
/// poll that was already running when `stop()` aborted the task sends nothing.
async fn beacon_loop<F, Fut>(target: SocketAddr, period: Duration, shared: Shared, mut open: F)
where
    F: FnMut(SocketAddr) -> Fut,
    Fut: Future<Output = std::io::Result<UdpSocket>>,
{
    let mut socket = open_beacon_socket(&mut open, target).await;
    let mut ticker = time::interval_at(time::Instant::now() + period, period);
    loop {
        ticker.tick().await;
        let stopped = lock(&shared).election.is_stopped();
        if stopped {
            debug!("beacon loop exiting: discovery stopped");
            return;
        }
        if socket.is_none() {
            socket = open_beacon_socket(&mut open, target).await;
        }
        let Some(sock) = socket.as_ref() else {
            continue;
        };

        let bytes = match encode_beacon(&BeaconMessage::now()) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("failed to encode beacon: {e}");
                continue;
            }
        };
        match sock.send_to(&bytes, target).await {
            Ok(_) => debug!("beacon sent to {target}"),
            Err(e) => warn!("broadcast error: {e}"),
        }
    }
}

async fn open_beacon_socket<F, Fut>(open: &mut F, target: SocketAddr) -> Option<UdpSocket>
where
    F: FnMut(SocketAddr) -> Fut,
    Fut: Future<Output = std::io::Result<UdpSocket>>,
{
    match open(target).await {
        Ok(socket) => {
            info!("broadcasting as server to {target}");
            Some(socket)
        }
        Err(e) => {
            error!("cannot open beacon socket, retrying next period: {e}");
            None
        }
    }
}

/// Binds an ephemeral send endpoint with `SO_BROADCAST` enabled.
async fn open_broadcast_socket(target: SocketAddr) -> std::io::Result<UdpSocket> {
    let unspecified: IpAddr = match target {
        SocketAddr::V4(_) => Ipv4Addr::UNSPECIFIED.into(),
        SocketAddr::V6(_) => std::net::Ipv6Addr::UNSPECIFIED.into(),
    };
    let socket = UdpSocket::bind(SocketAddr::new(unspecified, 0)).await?;
    socket.set_broadcast(true)?;
    Ok(socket)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
