//! Correlation of multi-line replies to the request that caused them.
//!
//! Matching is FIFO per command family: every reply belonging to a family
//! is stamped with the oldest pending id, and the id is released only by
//! the family's terminating numeric. Overlapping requests of the same
//! family are therefore not disambiguated.

use std::collections::VecDeque;

use slirc_proto::Response;

use crate::context::RequestId;

/// A command whose replies are correlated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrackedCommand {
    pub trigger: &'static str,
    pub intermediate: &'static [u16],
    pub terminator: u16,
}

impl TrackedCommand {
    pub const WHO: TrackedCommand = TrackedCommand {
        trigger: "WHO",
        intermediate: &[Response::RPL_WHOREPLY as u16],
        terminator: Response::RPL_ENDOFWHO as u16,
    };

    fn owns(&self, code: u16) -> bool {
        code == self.terminator || self.intermediate.contains(&code)
    }
}

const FAMILIES: &[TrackedCommand] = &[TrackedCommand::WHO];

/// Per-connection pending request queues.
#[derive(Debug)]
pub struct Correlator {
    families: Vec<(TrackedCommand, VecDeque<RequestId>)>,
}

impl Default for Correlator {
    fn default() -> Self {
        Self::with_families(FAMILIES)
    }
}

impl Correlator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_families(families: &[TrackedCommand]) -> Self {
        Self {
            families: families.iter().map(|f| (*f, VecDeque::new())).collect(),
        }
    }

    /// The family an outbound command belongs to, if it is tracked.
    pub fn family_of(&self, command: &str) -> Option<TrackedCommand> {
        self.families
            .iter()
            .map(|(f, _)| *f)
            .find(|f| f.trigger.eq_ignore_ascii_case(command))
    }

    /// Queue `id` for an outbound command. Returns false (and queues
    /// nothing) if the command is not tracked.
    pub fn track(&mut self, command: &str, id: RequestId) -> bool {
        match self
            .families
            .iter_mut()
            .find(|(f, _)| f.trigger.eq_ignore_ascii_case(command))
        {
            Some((_, queue)) => {
                queue.push_back(id);
                true
            }
            None => false,
        }
    }

    /// Stamp an inbound numeric. Returns the id it belongs to, popping it
    /// if `code` terminates the family.
    pub fn stamp(&mut self, code: u16) -> Option<RequestId> {
        let (family, queue) = self.families.iter_mut().find(|(f, _)| f.owns(code))?;
        if code == family.terminator {
            queue.pop_front()
        } else {
            queue.front().copied()
        }
    }

    /// Number of requests still awaiting a terminator.
    pub fn pending(&self) -> usize {
        self.families.iter().map(|(_, q)| q.len()).sum()
    }
}
