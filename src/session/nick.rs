//! Nickname retry ladder used while the server keeps rejecting our nick.

use rand::Rng;

const GUEST_PREFIX: &str = "Guest";

/// Pick the nick to try after `attempt` rejections of `base`.
///
/// `base` is the first rejected nick with trailing underscores trimmed.
/// Attempts 0..=2 append one to three underscores, attempts 3..=5 put a
/// single underscore in front (then append underscores again to keep each
/// try distinct), and anything later falls back to a random guest nick.
/// Candidates are cut to `nicklen` when the server advertises one.
pub fn next_nick<R: Rng + ?Sized>(
    base: &str,
    attempt: u32,
    nicklen: Option<usize>,
    rng: &mut R,
) -> String {
    match attempt {
        0..=2 => fit("", base, attempt as usize + 1, nicklen),
        3..=5 => fit("_", base, attempt as usize - 3, nicklen),
        _ => format!("{}{:05}", GUEST_PREFIX, rng.gen_range(0..100_000)),
    }
}

/// Trim trailing underscores added by earlier attempts.
pub fn base_nick(rejected: &str) -> &str {
    let trimmed = rejected.trim_end_matches('_');
    if trimmed.is_empty() { rejected } else { trimmed }
}

fn fit(prefix: &str, base: &str, underscores: usize, nicklen: Option<usize>) -> String {
    let extra = prefix.len() + underscores;
    let keep = match nicklen {
        Some(max) if max > extra => max - extra,
        _ => base.chars().count(),
    };
    let mut nick: String = prefix.to_string();
    nick.extend(base.chars().take(keep));
    nick.push_str(&"_".repeat(underscores));
    nick
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn ladder_is_deterministic() {
        let mut rng = StdRng::seed_from_u64(7);
        let tries: Vec<String> = (0..6).map(|i| next_nick("foo", i, None, &mut rng)).collect();
        assert_eq!(tries, ["foo_", "foo__", "foo___", "_foo", "_foo_", "_foo__"]);
    }

    #[test]
    fn falls_back_to_guest() {
        let mut rng = StdRng::seed_from_u64(7);
        let nick = next_nick("foo", 6, None, &mut rng);
        assert!(nick.starts_with("Guest"));
        assert_eq!(nick.len(), 10);
        assert!(nick[5..].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn respects_nicklen() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(next_nick("longnick", 1, Some(9), &mut rng), "longnic__");
        assert_eq!(next_nick("longnick", 3, Some(9), &mut rng), "_longnick");
        assert_eq!(next_nick("longnick", 4, Some(9), &mut rng), "_longnic_");
    }

    #[test]
    fn base_trims_underscores() {
        assert_eq!(base_nick("foo__"), "foo");
        assert_eq!(base_nick("___"), "___");
    }
}
