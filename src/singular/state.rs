//! # Coordinator state.
//!
//! Owned by the poll loop; callers only ever see copies through
//! [`Singular::snapshot`](crate::Singular::snapshot).

use std::collections::BTreeSet;
use std::fmt;

/// What the coordinator last learned from the oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mastership {
    /// No successful `is_master` query yet.
    #[default]
    Unknown,
    /// This replica holds mastership.
    Master,
    /// Another replica (or none) holds mastership.
    NotMaster,
}

impl Mastership {
    pub fn from_query(master: bool) -> Self {
        if master {
            Mastership::Master
        } else {
            Mastership::NotMaster
        }
    }

    /// Returns a short stable label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            Mastership::Unknown => "unknown",
            Mastership::Master => "master",
            Mastership::NotMaster => "not_master",
        }
    }
}

impl fmt::Display for Mastership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Mastership plus the set of worker ids started in the supervisor.
///
/// Between poll cycles `running` is non-empty only while `mastership` is
/// [`Mastership::Master`] and the coordinator has not terminated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoordinatorState {
    pub mastership: Mastership,
    pub running: BTreeSet<String>,
    pub terminated: bool,
}

impl CoordinatorState {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if `id` was started and not yet stopped.
    pub fn is_running(&self, id: &str) -> bool {
        self.running.contains(id)
    }

    /// True if the running set agrees with mastership.
    pub fn is_consistent(&self) -> bool {
        self.running.is_empty() || (self.mastership == Mastership::Master && !self.terminated)
    }
}
