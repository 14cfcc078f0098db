//! Ban-by-nick: USERHOST lookup followed by a host ban.

mod common;

use std::time::Duration;

use common::{CONFIG, engine, sent};
use slirc_client::engine::Command;
use tokio::time::Instant;

fn ban(channel: &str, nick: &str) -> Command {
    Command::Ban {
        channel: channel.into(),
        nick: nick.into(),
    }
}

#[tokio::test(start_paused = true)]
async fn test_reply_within_window_bans_host() {
    let mut e = engine(CONFIG);
    e.start(Instant::now());

    let out = e.command(ban("#chan", "Troll"), Instant::now());
    assert_eq!(sent(&out), ["USERHOST Troll"]);

    tokio::time::advance(Duration::from_secs(10)).await;
    let out = e.handle_line(
        b":irc.example.net 302 foo :troll=+t@bad.example.com",
        Instant::now(),
    );
    assert_eq!(sent(&out), ["MODE #chan +b *!*@bad.example.com"]);

    let again = e.handle_line(
        b":irc.example.net 302 foo :troll=+t@bad.example.com",
        Instant::now(),
    );
    assert!(sent(&again).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_late_reply_is_ignored() {
    let mut e = engine(CONFIG);
    e.start(Instant::now());

    e.command(ban("#chan", "troll"), Instant::now());
    tokio::time::advance(Duration::from_secs(31)).await;
    let out = e.handle_line(
        b":irc.example.net 302 foo :troll*=-t@bad.example.com",
        Instant::now(),
    );
    assert!(sent(&out).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_one_reply_serves_several_bans() {
    let mut e = engine(CONFIG);
    e.start(Instant::now());

    e.command(ban("#a", "troll"), Instant::now());
    e.command(ban("#b", "spammer"), Instant::now());
    let out = e.handle_line(
        b":irc.example.net 302 foo :troll=+t@one.example spammer=-s@two.example",
        Instant::now(),
    );
    assert_eq!(
        sent(&out),
        ["MODE #a +b *!*@one.example", "MODE #b +b *!*@two.example"]
    );
}
