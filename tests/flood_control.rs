//! Flood control timing under a paused clock.

use std::time::Duration;

use slirc_client::ClientError;
use slirc_client::flood::{BURST, DRAIN_INTERVAL, FloodLimiter};
use tokio::sync::mpsc;
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn test_burst_then_one_line_per_interval() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let limiter = FloodLimiter::new(tx);
    let start = Instant::now();

    for i in 0..8u8 {
        limiter.send(vec![b'0' + i]).unwrap();
    }
    assert_eq!(limiter.backlog(), 3);

    for i in 0..BURST as u8 {
        assert_eq!(rx.recv().await.unwrap(), vec![b'0' + i]);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    assert_eq!(rx.recv().await.unwrap(), b"5".to_vec());
    assert!(start.elapsed() >= DRAIN_INTERVAL);
    assert_eq!(rx.recv().await.unwrap(), b"6".to_vec());
    assert!(start.elapsed() >= DRAIN_INTERVAL * 2);
    assert_eq!(rx.recv().await.unwrap(), b"7".to_vec());
    assert!(start.elapsed() >= DRAIN_INTERVAL * 3);
    assert_eq!(limiter.backlog(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_send_now_skips_backlog() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let limiter = FloodLimiter::new(tx);
    for _ in 0..7 {
        limiter.send(b"PRIVMSG #chan :spam".to_vec()).unwrap();
    }
    limiter.send_now(b"PONG irc.example.net".to_vec()).unwrap();

    let mut order = Vec::new();
    for _ in 0..6 {
        order.push(rx.recv().await.unwrap());
    }
    assert_eq!(order[5], b"PONG irc.example.net".to_vec());
    assert_eq!(limiter.backlog(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_abandon_drops_backlog() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let limiter = FloodLimiter::new(tx);
    for _ in 0..9 {
        limiter.send(b"x".to_vec()).unwrap();
    }
    limiter.abandon();
    assert_eq!(limiter.backlog(), 0);
    assert!(matches!(limiter.send(b"y".to_vec()), Err(ClientError::SessionClosed)));

    tokio::time::sleep(DRAIN_INTERVAL * 5).await;
    let mut delivered = 0;
    while rx.try_recv().is_ok() {
        delivered += 1;
    }
    assert_eq!(delivered, BURST as usize);
}
