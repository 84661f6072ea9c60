use std::sync::Mutex;

use crate::{consent::DecisionStore, error::Result};

#[derive(Debug, Default, Clone, Copy)]
struct Flags {
    decided: bool,
    accepted: bool,
}

/// Non-persistent store used when no real store is configured. Starts undecided.
#[derive(Debug, Default)]
pub struct InMemoryDecisionStore {
    flags: Mutex<Flags>,
}

impl InMemoryDecisionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `accept` as the user's decision.
    pub fn decided(accept: bool) -> Self {
        Self {
            flags: Mutex::new(Flags {
                decided: true,
                accepted: accept,
            }),
        }
    }

    fn flags(&self) -> Flags {
        *self.flags.lock().expect("InMemoryDecisionStore poisoned")
    }
}

impl DecisionStore for InMemoryDecisionStore {
    fn has_decided(&self) -> bool {
        self.flags().decided
    }

    fn has_accepted(&self) -> bool {
        self.flags().accepted
    }

    fn set_decision(&self, accept: bool) -> Result<()> {
        *self.flags.lock().expect("InMemoryDecisionStore poisoned") = Flags {
            decided: true,
            accepted: accept,
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consent::ConsentState;

    #[test]
    fn defaults_to_undecided() {
        let store = InMemoryDecisionStore::new();
        assert!(!store.has_decided());
        assert!(!store.has_accepted());
        assert_eq!(store.consent(), ConsentState::Undecided);
    }

    #[test]
    fn records_decisions() {
        let store = InMemoryDecisionStore::new();
        store.set_decision(true).unwrap();
        assert_eq!(store.consent(), ConsentState::Accepted);

        store.set_decision(false).unwrap();
        assert!(store.has_decided());
        assert_eq!(store.consent(), ConsentState::Declined);
    }
}
