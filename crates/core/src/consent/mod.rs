//! User consent for usage reporting.
//!
//! Stores persist consent as two independent flags (`decided`, `accepted`).
//! Everything outside a store works with [`ConsentState`].

pub mod file;
pub mod memory;

pub use file::*;
pub use memory::*;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsentState {
    Undecided,
    Accepted,
    Declined,
}

impl ConsentState {
    pub fn from_flags(decided: bool, accepted: bool) -> Self {
        match (decided, accepted) {
            (false, _) => ConsentState::Undecided,
            (true, true) => ConsentState::Accepted,
            (true, false) => ConsentState::Declined,
        }
    }

    /// Whether events may still enter the pipeline.
    pub fn permits_collection(self) -> bool {
        self != ConsentState::Declined
    }

    pub fn name(self) -> &'static str {
        match self {
            ConsentState::Undecided => "undecided",
            ConsentState::Accepted => "accepted",
            ConsentState::Declined => "declined",
        }
    }
}

impl std::fmt::Display for ConsentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Where the user's reporting decision lives.
///
/// Implementations are read on every submission and at least once per
/// delivery pass, so reads should be cheap.
pub trait DecisionStore: Send + Sync {
    fn has_decided(&self) -> bool;

    fn has_accepted(&self) -> bool;

    /// Record a decision: `decided` becomes true, `accepted` becomes `accept`.
    fn set_decision(&self, accept: bool) -> Result<()>;

    fn consent(&self) -> ConsentState {
        ConsentState::from_flags(self.has_decided(), self.has_accepted())
    }
}
