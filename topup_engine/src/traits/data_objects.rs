use serde::{Deserialize, Serialize};

use crate::db_types::{LedgerEntry, Rupees};

/// What happened when a confirmed payment was applied to the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "entry")]
pub enum ReconcileOutcome {
    /// This call credited the account. The new ledger entry is attached.
    Reconciled(LedgerEntry),
    /// The order is no longer live: another call got there first.
    AlreadyProcessed,
}

impl ReconcileOutcome {
    pub fn is_reconciled(&self) -> bool {
        matches!(self, Self::Reconciled(_))
    }

    pub fn ledger_entry(&self) -> Option<&LedgerEntry> {
        match self {
            Self::Reconciled(entry) => Some(entry),
            Self::AlreadyProcessed => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductionSummary {
    pub accounts_scanned: usize,
    pub accounts_debited: usize,
    pub total_debited: Rupees,
}
