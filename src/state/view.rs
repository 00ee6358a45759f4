//! Presentation-level facts derived from the current ledger snapshot.
//! Pure functions, recomputed on every snapshot change; no state of their
//! own and no caching beyond the slice they are handed.

use rust_decimal::Decimal;
use std::collections::HashSet;

use super::Bid;

/// Number of bids in the ledger.
pub fn total_count(bids: &[Bid]) -> usize {
    bids.len()
}

/// Sum of all bid amounts.
pub fn total_amount(bids: &[Bid]) -> Decimal {
    bids.iter().map(|b| b.amount).sum()
}

/// Number of distinct participants with at least one bid.
pub fn unique_participants(bids: &[Bid]) -> usize {
    bids.iter()
        .map(|b| b.participant_id)
        .collect::<HashSet<_>>()
        .len()
}

/// One participant's bids, in ledger order.
pub fn bids_for(bids: &[Bid], participant_id: u32) -> Vec<&Bid> {
    bids.iter()
        .filter(|b| b.participant_id == participant_id)
        .collect()
}

/// A participant's highest bid amount, or zero if they have none.
/// Zero means "no commitment" here; it is not the ledger-wide extreme,
/// which stays provider-authoritative and reports "unknown" on failure.
pub fn highest_for(bids: &[Bid], participant_id: u32) -> Decimal {
    bids.iter()
        .filter(|b| b.participant_id == participant_id)
        .map(|b| b.amount)
        .max()
        .unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn bid(participant: u32, amount: Decimal) -> Bid {
        Bid {
            id: None,
            session_id: "s1".to_string(),
            participant_id: participant,
            amount,
            submitted_at: None,
        }
    }

    #[test]
    fn test_totals() {
        let bids = vec![bid(1, dec!(3.50)), bid(1, dec!(10.00)), bid(2, dec!(1.25))];

        assert_eq!(total_count(&bids), 3);
        assert_eq!(total_amount(&bids), dec!(14.75));
    }

    #[test]
    fn test_unique_participants() {
        let bids = vec![bid(1, dec!(1.00)), bid(1, dec!(2.00)), bid(2, dec!(3.00))];
        assert_eq!(unique_participants(&bids), 2);

        assert_eq!(unique_participants(&[]), 0);
    }

    #[test]
    fn test_bids_for() {
        let bids = vec![bid(1, dec!(1.00)), bid(2, dec!(2.00)), bid(1, dec!(3.00))];

        assert_eq!(bids_for(&bids, 1).len(), 2);
        assert!(bids_for(&bids, 9).is_empty());
    }

    #[test]
    fn test_highest_for() {
        let bids = vec![bid(7, dec!(3.50)), bid(7, dec!(10.00)), bid(8, dec!(99.00))];

        assert_eq!(highest_for(&bids, 7), dec!(10.00));
        // No bids: zero, meaning "no commitment".
        assert_eq!(highest_for(&bids, 42), Decimal::ZERO);
    }

    #[test]
    fn test_empty_ledger_totals() {
        assert_eq!(total_count(&[]), 0);
        assert_eq!(total_amount(&[]), Decimal::ZERO);
    }
}
