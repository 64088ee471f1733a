//! End-to-end tests for the Discovery Coordinator over loopback UDP.
//!
//! # Purpose
//!
//! These tests drive real `DiscoveryCoordinator`s through their public API,
//! the way `main.rs` does, with shortened timing so the suite stays fast.
//! They verify:
//!
//! - Silence for the whole timeout makes an instance the server, never early.
//! - Noise on the discovery port is ignored; the first beacon wins, once.
//! - A second instance started while the first is serving finds it instead
//!   of becoming a rival server.
//! - `stop()` is idempotent and silences the beacon loop.
//!
//! # Why loopback instead of broadcast?
//!
//! CI machines rarely allow limited broadcast.  Each coordinator's beacon
//! target is pointed at `127.0.0.1:<port>` instead of `255.255.255.255`; the
//! send path (broadcast socket, period, payload) is otherwise identical.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};

use clinic_core::{decode_beacon, encode_beacon, BeaconMessage, DiscoveryTiming, ElectionOutcome, Phase};
use clinic_discovery::infrastructure::network::{DiscoveryCoordinator, DiscoverySettings};
use tokio::net::UdpSocket;
use tokio::time;

const PERIOD: Duration = Duration::from_millis(50);
const TIMEOUT: Duration = Duration::from_millis(250);

fn loopback() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn settings(listen_port: u16, beacon_target: SocketAddr, timeout: Duration) -> DiscoverySettings {
    DiscoverySettings {
        listen_addr: SocketAddr::new(loopback(), listen_port),
        beacon_target,
        timing: DiscoveryTiming::new(PERIOD, timeout).expect("valid test timing"),
    }
}

/// Finds a free UDP port by binding port 0 and releasing it.
fn free_port() -> u16 {
    let probe = std::net::UdpSocket::bind("127.0.0.1:0").expect("probe bind");
    probe.local_addr().unwrap().port()
}

/// Discards everything already queued on `socket`.
fn drain(socket: &UdpSocket) {
    let mut buf = [0u8; 512];
    while socket.try_recv_from(&mut buf).is_ok() {}
}

// ── Timeout default ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_silence_for_full_timeout_becomes_server_not_before() {
    // Arrange
    let sink = SocketAddr::new(loopback(), free_port());
    let coordinator = DiscoveryCoordinator::new(settings(0, sink, TIMEOUT));

    // Act
    let started = Instant::now();
    let rx = coordinator.start().await.expect("start");
    let outcome = time::timeout(Duration::from_secs(5), rx)
        .await
        .expect("decided in time")
        .expect("outcome delivered");
    let elapsed = started.elapsed();

    // Assert
    assert_eq!(outcome, ElectionOutcome::BecomeServer);
    assert!(elapsed >= TIMEOUT, "became server after only {elapsed:?}");
    assert_eq!(coordinator.phase(), Phase::Server);
    assert_eq!(coordinator.local_addr(), None, "probe endpoint must be closed");

    coordinator.stop();
}

// ── Single election and noise tolerance ───────────────────────────────────────

#[tokio::test]
async fn test_noise_is_ignored_and_first_beacon_wins_once() {
    // Arrange: long timeout so only a beacon can decide
    let sink = SocketAddr::new(loopback(), free_port());
    let coordinator = DiscoveryCoordinator::new(settings(0, sink, Duration::from_secs(10)));
    let rx = coordinator.start().await.expect("start");
    let target = coordinator.local_addr().expect("probe bound");
    let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    // Act: noise first, then two valid beacons
    for _ in 0..20 {
        sender.send_to(b"not json at all", target).await.unwrap();
        sender
            .send_to(br#"{"type":"printer","timestamp":1}"#, target)
            .await
            .unwrap();
        sender.send_to(br#"{"timestamp":1}"#, target).await.unwrap();
    }
    time::sleep(Duration::from_millis(50)).await;
    assert_eq!(coordinator.phase(), Phase::Probing, "noise must not decide");

    let beacon = encode_beacon(&BeaconMessage::now()).unwrap();
    sender.send_to(&beacon, target).await.unwrap();
    sender.send_to(&beacon, target).await.unwrap();

    let outcome = time::timeout(Duration::from_secs(5), rx)
        .await
        .expect("decided in time")
        .expect("outcome delivered");

    // Assert
    assert_eq!(outcome, ElectionOutcome::ServerFound(loopback()));
    assert_eq!(coordinator.phase(), Phase::Found(loopback()));
    assert_eq!(coordinator.local_addr(), None, "probe endpoint must be closed");

    coordinator.stop();
}

#[tokio::test]
async fn test_found_client_never_becomes_server_after_timeout() {
    // Arrange
    let sink = SocketAddr::new(loopback(), free_port());
    let coordinator = DiscoveryCoordinator::new(settings(0, sink, TIMEOUT));
    let rx = coordinator.start().await.expect("start");
    let target = coordinator.local_addr().expect("probe bound");
    let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    // Act
    let beacon = encode_beacon(&BeaconMessage::now()).unwrap();
    sender.send_to(&beacon, target).await.unwrap();
    let outcome = rx.await.expect("outcome delivered");
    time::sleep(TIMEOUT * 2).await;

    // Assert
    assert_eq!(outcome, ElectionOutcome::ServerFound(loopback()));
    assert_eq!(coordinator.phase(), Phase::Found(loopback()));
}

// ── Period < timeout liveness ─────────────────────────────────────────────────

#[tokio::test]
async fn test_second_instance_finds_first_server() {
    // Arrange: A will beacon at B's discovery port
    let port_b = free_port();
    let a = DiscoveryCoordinator::new(settings(0, SocketAddr::new(loopback(), port_b), TIMEOUT));
    let rx_a = a.start().await.expect("start A");
    assert_eq!(rx_a.await.expect("A decided"), ElectionOutcome::BecomeServer);

    // Act: B starts while A is serving
    let sink = SocketAddr::new(loopback(), free_port());
    let b = DiscoveryCoordinator::new(settings(port_b, sink, TIMEOUT));
    let rx_b = b.start().await.expect("start B");
    let outcome_b = time::timeout(Duration::from_secs(5), rx_b)
        .await
        .expect("B decided in time")
        .expect("B outcome delivered");

    // Assert
    assert_eq!(outcome_b, ElectionOutcome::ServerFound(loopback()));
    assert_eq!(a.phase(), Phase::Server);
    assert_eq!(b.phase(), Phase::Found(loopback()));

    a.stop();
    b.stop();
}

// ── Beacon payload and idempotent stop ────────────────────────────────────────

#[tokio::test]
async fn test_server_beacons_until_stopped_twice() {
    // Arrange
    let listener = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let target = listener.local_addr().unwrap();
    let coordinator = DiscoveryCoordinator::new(settings(0, target, TIMEOUT));
    let rx = coordinator.start().await.expect("start");
    assert_eq!(rx.await.expect("decided"), ElectionOutcome::BecomeServer);

    // Act: receive one beacon while serving
    let mut buf = [0u8; 512];
    let (len, _) = time::timeout(Duration::from_secs(2), listener.recv_from(&mut buf))
        .await
        .expect("a beacon within the period")
        .unwrap();
    let beacon = decode_beacon(&buf[..len]).expect("valid beacon");

    coordinator.stop();
    coordinator.stop();
    time::sleep(PERIOD * 2).await;
    drain(&listener);

    // Assert
    assert_eq!(beacon.kind, "clinic-server");
    assert!(beacon.timestamp > 0);
    let late = time::timeout(PERIOD * 4, listener.recv_from(&mut buf)).await;
    assert!(late.is_err(), "no beacon may follow stop()");
    assert_eq!(coordinator.phase(), Phase::Server);
}

#[tokio::test]
async fn test_stop_twice_while_probing_emits_nothing() {
    // Arrange
    let sink = SocketAddr::new(loopback(), free_port());
    let coordinator = DiscoveryCoordinator::new(settings(0, sink, TIMEOUT));
    let rx = coordinator.start().await.expect("start");

    // Act
    coordinator.stop();
    coordinator.stop();
    time::sleep(TIMEOUT * 2).await;

    // Assert
    assert!(rx.await.is_err(), "stopped coordinator must not emit");
    assert_eq!(coordinator.phase(), Phase::Probing);
}

#[tokio::test]
async fn test_discovery_port_is_released_after_stop() {
    // Arrange
    let sink = SocketAddr::new(loopback(), free_port());
    let coordinator = DiscoveryCoordinator::new(settings(0, sink, Duration::from_secs(10)));
    let _rx = coordinator.start().await.expect("start");
    let bound = coordinator.local_addr().expect("probe bound");

    // Act
    coordinator.stop();
    time::sleep(Duration::from_millis(50)).await;

    // Assert: the aborted probe task dropped its socket
    let rebound = UdpSocket::bind(bound).await;
    assert!(rebound.is_ok(), "discovery port still held after stop()");
}
