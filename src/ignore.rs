//! Ignore list and its server-side SILENCE mirror.
//!
//! The [`IgnoreList`] is shared by every connection. Each connection keeps
//! a [`SilenceMirror`] of the masks it has pushed to the server, bounded by
//! the server's advertised SILENCE capacity.

use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use slirc_proto::{CaseMapping, RawMessage, Sign, UserAddress};
use tokio::time::Instant;
use tracing::debug;

/// A silenced mask younger than this is never evicted to make room.
pub const SILENCE_MIN_AGE: Duration = Duration::from_secs(120);

#[derive(Clone, Debug)]
pub struct IgnoreEntry {
    pub mask: UserAddress,
    pub created: DateTime<Utc>,
}

/// Process-wide ignore masks.
#[derive(Debug, Default)]
pub struct IgnoreList {
    entries: RwLock<Vec<IgnoreEntry>>,
}

impl IgnoreList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_masks<I, S>(masks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let list = Self::new();
        for mask in masks {
            list.add(UserAddress::parse(mask.as_ref()));
        }
        list
    }

    /// Returns false if the mask was already present.
    pub fn add(&self, mask: UserAddress) -> bool {
        let mut entries = self.entries.write();
        if entries.iter().any(|e| e.mask == mask) {
            return false;
        }
        entries.push(IgnoreEntry {
            mask,
            created: Utc::now(),
        });
        true
    }

    /// Returns false if the mask was not present.
    pub fn remove(&self, mask: &UserAddress) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|e| &e.mask != mask);
        entries.len() != before
    }

    /// First ignore mask matching `source`.
    pub fn matching(&self, source: &UserAddress, casemap: CaseMapping) -> Option<UserAddress> {
        self.entries
            .read()
            .iter()
            .find(|e| e.mask.matches_with(source, casemap))
            .map(|e| e.mask.clone())
    }

    pub fn snapshot(&self) -> Vec<IgnoreEntry> {
        self.entries.read().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// Masks this connection has SILENCEd on the server.
#[derive(Debug, Default)]
pub struct SilenceMirror {
    silenced: Vec<(UserAddress, Instant)>,
}

impl SilenceMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, mask: &UserAddress) -> bool {
        self.silenced.iter().any(|(m, _)| m == mask)
    }

    pub fn len(&self) -> usize {
        self.silenced.len()
    }

    pub fn is_empty(&self) -> bool {
        self.silenced.is_empty()
    }

    /// A message matching `mask` was suppressed. Mirror the mask onto the
    /// server if it supports SILENCE and there is (or can be made) room.
    pub fn on_suppressed(&mut self, mask: &UserAddress, capacity: usize, now: Instant) -> Vec<RawMessage> {
        if capacity == 0 || self.contains(mask) {
            return Vec::new();
        }

        let mut out = Vec::new();
        if self.silenced.len() >= capacity {
            let Some((idx, age)) = self
                .silenced
                .iter()
                .enumerate()
                .min_by_key(|(_, (_, at))| *at)
                .map(|(i, (_, at))| (i, now.saturating_duration_since(*at)))
            else {
                return out;
            };
            if age < SILENCE_MIN_AGE {
                debug!(mask = %mask, "SILENCE list full, keeping suppression client-side");
                return out;
            }
            let (evicted, _) = self.silenced.remove(idx);
            debug!(evicted = %evicted, mask = %mask, "SILENCE list full, evicting oldest");
            out.push(silence(Sign::Minus, &evicted));
        }

        self.silenced.push((mask.clone(), now));
        out.push(silence(Sign::Plus, mask));
        out
    }

    /// The mask is no longer ignored.
    pub fn on_unignored(&mut self, mask: &UserAddress) -> Option<RawMessage> {
        let idx = self.silenced.iter().position(|(m, _)| m == mask)?;
        self.silenced.remove(idx);
        Some(silence(Sign::Minus, mask))
    }

    /// The server echoed a SILENCE change.
    pub fn on_echo(&mut self, sign: Sign, mask: &UserAddress, now: Instant) {
        match sign {
            Sign::Plus if !self.contains(mask) => self.silenced.push((mask.clone(), now)),
            Sign::Plus => {}
            Sign::Minus => self.silenced.retain(|(m, _)| m != mask),
        }
    }
}

fn silence(sign: Sign, mask: &UserAddress) -> RawMessage {
    RawMessage::new("SILENCE", [format!("{}{}", sign.as_char(), mask.mask())])
}
