use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single bid as the provider reports it. Never mutated locally once
/// created; the ledger only ever replaces its contents wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bid {
    /// Assigned by the provider on acceptance; absent until acknowledged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub session_id: String,
    /// Ticket-style bidder identifier.
    #[serde(rename = "ticketId")]
    pub participant_id: u32,
    pub amount: Decimal,
    /// Bids without a timestamp sort as oldest.
    #[serde(rename = "time", default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
}

/// In-memory mirror of all bids for the currently viewed session.
///
/// Contents are swapped atomically on every refresh, so readers only ever
/// see a complete generation. Ranking extremes (highest/lowest) are NOT
/// answered here; the provider is the authority on ranking and this mirror
/// may be a partial window.
#[derive(Debug, Default)]
pub struct BidLedger {
    bids: Vec<Bid>,
}

impl BidLedger {
    /// Swap in a fresh bid list, re-sorted newest-submission-first.
    /// Missing timestamps sort after all timestamped bids; ties keep the
    /// provider's order (stable sort).
    pub fn replace_all(&mut self, mut bids: Vec<Bid>) {
        bids.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        self.bids = bids;
    }

    /// Current contents, newest first.
    pub fn bids(&self) -> &[Bid] {
        &self.bids
    }

    pub fn len(&self) -> usize {
        self.bids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty()
    }

    /// Bids placed by one participant. An absent id yields an empty list,
    /// not an error.
    pub fn for_participant(&self, participant_id: u32) -> Vec<&Bid> {
        self.bids
            .iter()
            .filter(|b| b.participant_id == participant_id)
            .collect()
    }

    /// Used on stop and session switch: the ledger holds bids for at most
    /// one session at a time.
    pub fn clear(&mut self) {
        self.bids.clear();
    }
}
