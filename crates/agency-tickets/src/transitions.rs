//! Allowed status transitions.

use std::collections::{BTreeMap, BTreeSet};

use crate::errors::{Result, TicketError};
use crate::types::TicketStatus;

/// Which status may follow which.
///
/// A status missing from the table has no outgoing transitions. Staying in
/// the same status is never a transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionTable {
    allowed: BTreeMap<TicketStatus, BTreeSet<TicketStatus>>,
}

impl Default for TransitionTable {
    fn default() -> Self {
        use TicketStatus::{Cancelled, Completed, InProgress, Pending, Reopened};
        let edges: [(TicketStatus, &[TicketStatus]); 5] = [
            (Pending, &[InProgress, Completed, Cancelled]),
            (InProgress, &[Pending, Completed, Cancelled]),
            (Completed, &[Reopened]),
            (Reopened, &[InProgress, Completed, Cancelled]),
            (Cancelled, &[Reopened]),
        ];
        Self {
            allowed: edges
                .into_iter()
                .map(|(from, to)| (from, to.iter().copied().collect()))
                .collect(),
        }
    }
}

impl TransitionTable {
    /// Build a table from configuration, keyed by source status name.
    ///
    /// Unknown status names are rejected with [`TicketError::InvalidArgument`].
    pub fn from_config(config: &BTreeMap<String, Vec<String>>) -> Result<Self> {
        let mut allowed = BTreeMap::new();
        for (from, targets) in config {
            let from: TicketStatus = from.parse()?;
            let targets = targets
                .iter()
                .map(|t| t.parse::<TicketStatus>())
                .collect::<Result<BTreeSet<_>>>()?;
            let _ = allowed.insert(from, targets);
        }
        Ok(Self { allowed })
    }

    /// Whether `from -> to` is permitted.
    pub fn allows(&self, from: TicketStatus, to: TicketStatus) -> bool {
        from != to && self.allowed.get(&from).is_some_and(|set| set.contains(&to))
    }

    /// Statuses reachable from `from` in one step.
    pub fn targets(&self, from: TicketStatus) -> impl Iterator<Item = TicketStatus> + '_ {
        self.allowed
            .get(&from)
            .into_iter()
            .flatten()
            .copied()
            .filter(move |to| *to != from)
    }

    /// Resolve a requested status name against the current status.
    ///
    /// Unknown names, same-status requests, and edges missing from the table
    /// all fail with [`TicketError::InvalidTransition`].
    pub fn check(&self, from: TicketStatus, requested: &str) -> Result<TicketStatus> {
        let rejected = || TicketError::InvalidTransition {
            from: from.to_string(),
            to: requested.trim().to_string(),
        };
        let to: TicketStatus = requested.parse().map_err(|_| rejected())?;
        if self.allows(from, to) {
            Ok(to)
        } else {
            Err(rejected())
        }
    }
}
