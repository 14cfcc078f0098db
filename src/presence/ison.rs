//! ISON batching.

use std::time::Duration;

use slirc_proto::MAX_LINE_PAYLOAD;

/// Base interval between polls.
pub const POLL_INTERVAL: Duration = Duration::from_secs(60);
/// Extra delay per additional ISON line in one poll.
pub const POLL_PER_EXTRA_LINE: Duration = Duration::from_secs(30);

/// Worst-case reply overhead besides our nick: `:` + a 63-byte server name
/// + ` 303 ` + ` :`.
const REPLY_OVERHEAD: usize = 1 + 63 + 5 + 2;

/// Nick bytes that fit in one ISON line so that the `303` reply also fits.
pub fn batch_budget(own_nick: &str) -> usize {
    MAX_LINE_PAYLOAD.saturating_sub(REPLY_OVERHEAD + own_nick.len())
}

/// Split `nicks` into space-joined batches of at most `budget` bytes.
/// A nick longer than the budget still gets a batch of its own.
pub fn batches<'a, I>(nicks: I, budget: usize) -> Vec<Vec<String>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut out: Vec<Vec<String>> = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut used = 0;

    for nick in nicks {
        let cost = if current.is_empty() { nick.len() } else { nick.len() + 1 };
        if !current.is_empty() && used + cost > budget {
            out.push(std::mem::take(&mut current));
            used = 0;
        }
        used += if current.is_empty() { nick.len() } else { nick.len() + 1 };
        current.push(nick.to_string());
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Delay until the next poll after sending `lines` ISON lines.
pub fn next_delay(lines: usize) -> Duration {
    POLL_INTERVAL + POLL_PER_EXTRA_LINE * lines.saturating_sub(1) as u32
}
