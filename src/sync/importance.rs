use std::collections::HashMap;

use crate::core::{Height, Importance, PeerKey};

/// Read access to account importances
pub trait ImportanceView {
    /// Importance of the account with `key` at `height`, zero when unknown
    fn importance(&self, key: &PeerKey, height: Height) -> Importance;

    /// Number of accounts that are economically eligible to be sampled
    fn high_value_account_count(&self) -> usize;
}

/// In-memory importance table
///
/// Each account records the height its importance was calculated at; lookups
/// below that height see no importance.
#[derive(Debug, Clone, Default)]
pub struct ImportanceSnapshot {
    accounts: HashMap<PeerKey, (Importance, Height)>,
}

impl ImportanceSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the importance of an account, replacing any previous entry
    pub fn set(&mut self, key: PeerKey, importance: Importance, importance_height: Height) {
        self.accounts.insert(key, (importance, importance_height));
    }

    /// Sum of all recorded importances
    pub fn total_importance(&self) -> Importance {
        Importance(
            self.accounts
                .values()
                .fold(0u64, |sum, (importance, _)| sum.saturating_add(importance.0)),
        )
    }
}

impl ImportanceView for ImportanceSnapshot {
    fn importance(&self, key: &PeerKey, height: Height) -> Importance {
        match self.accounts.get(key) {
            Some((importance, importance_height)) if *importance_height <= height => *importance,
            _ => Importance(0),
        }
    }

    fn high_value_account_count(&self) -> usize {
        self.accounts.len()
    }
}

impl<T: ImportanceView + ?Sized> ImportanceView for &T {
    fn importance(&self, key: &PeerKey, height: Height) -> Importance {
        (**self).importance(key, height)
    }

    fn high_value_account_count(&self) -> usize {
        (**self).high_value_account_count()
    }
}
