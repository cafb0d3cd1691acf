//! Pure admission checks for candidate orders.
//!
//! No I/O: the caller loads the position, its wallet holdings and the
//! participant's live orders on that position, and this module decides.
//! Checks run in a fixed order so a draft failing several rules always
//! reports the same rejection.

use super::RejectionReason;
use crate::entities::OrderType;
use crate::entities::order::{Order, OrderDraft};
use crate::entities::position::{Position, TokenHolding};
use rust_decimal::Decimal;
use time::PrimitiveDateTime;

/// Decide whether `draft` may be admitted.
///
/// `existing` must hold only the participant's own non-cancelled,
/// non-expired orders on the draft's position; stale orders still
/// count as competition.
pub fn validate(
    draft: &OrderDraft,
    position: Option<&Position>,
    holdings: &[TokenHolding],
    existing: &[Order],
    now: PrimitiveDateTime,
) -> Result<(), RejectionReason> {
    let Some(position) = position else {
        return Err(RejectionReason::PositionNotFound);
    };

    let owns = position.owner_address == draft.participant;
    match draft.order_type {
        OrderType::Bid if owns => return Err(RejectionReason::BidOnOwnPosition),
        OrderType::Listing if !owns => return Err(RejectionReason::NotOwner),
        _ => {}
    }

    // A position is only listable once its wallet has been emptied.
    if draft.order_type == OrderType::Listing
        && holdings.iter().any(|h| h.balance > Decimal::ZERO)
    {
        return Err(RejectionReason::PositionNotEmpty);
    }

    if draft.expiry <= now {
        return Err(RejectionReason::ExpiryInPast);
    }

    for order in existing.iter().filter(|o| o.order_type == draft.order_type) {
        match draft.order_type {
            // A new bid must strictly beat the participant's best
            // standing bid in the same currency; other currencies
            // compete independently.
            OrderType::Bid => {
                if order.currency == draft.currency && order.amount >= draft.amount {
                    return Err(RejectionReason::InferiorBid);
                }
            }
            // A new listing must strictly undercut every standing
            // listing regardless of currency; an undercutting price in
            // a different currency is still refused, as incomparable.
            OrderType::Listing => {
                if order.amount <= draft.amount {
                    return Err(RejectionReason::InferiorListing);
                }
                if order.currency != draft.currency {
                    return Err(RejectionReason::CurrencyMismatch);
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::OrderStatus;
    use rust_decimal::dec;
    use time::macros::datetime;

    const NOW: PrimitiveDateTime = datetime!(2026-03-01 12:00);
    const LATER: PrimitiveDateTime = datetime!(2026-04-01 00:00);

    fn position(owner: &str) -> Position {
        Position {
            chain_id: "sol".into(),
            token_id: 7,
            wallet_address: "wallet7".into(),
            owner_address: owner.into(),
        }
    }

    fn draft(order_type: OrderType, participant: &str, amount: Decimal) -> OrderDraft {
        OrderDraft {
            order_type,
            collection: "col".into(),
            currency: "usdc".into(),
            participant: participant.into(),
            chain_id: "sol".into(),
            token_id: 7,
            amount,
            nonce: 1,
            expiry: LATER,
            signature: "sig".into(),
        }
    }

    fn standing(order_type: OrderType, currency: &str, amount: Decimal) -> Order {
        Order {
            id: 10,
            order_type,
            collection: "col".into(),
            currency: currency.into(),
            participant: "alice".into(),
            chain_id: "sol".into(),
            token_id: 7,
            amount,
            nonce: 0,
            expiry: LATER,
            signature: "sig".into(),
            status: OrderStatus::Active,
            is_stale: false,
            pending_cancellation_date: None,
            created_at: NOW,
        }
    }

    #[test]
    fn rejects_order_on_unknown_position() {
        let d = draft(OrderType::Bid, "alice", dec!(5));
        assert_eq!(
            validate(&d, None, &[], &[], NOW),
            Err(RejectionReason::PositionNotFound)
        );
    }

    #[test]
    fn owner_cannot_bid_on_own_position() {
        let d = draft(OrderType::Bid, "alice", dec!(5));
        assert_eq!(
            validate(&d, Some(&position("alice")), &[], &[], NOW),
            Err(RejectionReason::BidOnOwnPosition)
        );
    }

    #[test]
    fn only_owner_may_list() {
        let d = draft(OrderType::Listing, "alice", dec!(5));
        assert_eq!(
            validate(&d, Some(&position("bob")), &[], &[], NOW),
            Err(RejectionReason::NotOwner)
        );
    }

    #[test]
    fn listing_requires_empty_wallet() {
        let d = draft(OrderType::Listing, "alice", dec!(5));
        let holdings = vec![TokenHolding {
            token_address: "mint1".into(),
            balance: dec!(3),
        }];
        assert_eq!(
            validate(&d, Some(&position("alice")), &holdings, &[], NOW),
            Err(RejectionReason::PositionNotEmpty)
        );
    }

    #[test]
    fn zero_balance_holdings_do_not_block_listing() {
        let d = draft(OrderType::Listing, "alice", dec!(5));
        let holdings = vec![TokenHolding {
            token_address: "mint1".into(),
            balance: Decimal::ZERO,
        }];
        assert_eq!(validate(&d, Some(&position("alice")), &holdings, &[], NOW), Ok(()));
    }

    #[test]
    fn rejects_past_expiry() {
        let mut d = draft(OrderType::Bid, "bob", dec!(5));
        d.expiry = datetime!(2026-02-01 00:00);
        assert_eq!(
            validate(&d, Some(&position("alice")), &[], &[], NOW),
            Err(RejectionReason::ExpiryInPast)
        );
    }

    #[test]
    fn expiry_equal_to_now_is_past() {
        let mut d = draft(OrderType::Bid, "bob", dec!(5));
        d.expiry = NOW;
        assert_eq!(
            validate(&d, Some(&position("alice")), &[], &[], NOW),
            Err(RejectionReason::ExpiryInPast)
        );
    }

    #[test]
    fn bid_must_strictly_beat_standing_bid() {
        let d = draft(OrderType::Bid, "bob", dec!(5));
        let existing = vec![standing(OrderType::Bid, "usdc", dec!(5))];
        assert_eq!(
            validate(&d, Some(&position("alice")), &[], &existing, NOW),
            Err(RejectionReason::InferiorBid)
        );
    }

    #[test]
    fn higher_bid_is_admitted() {
        let d = draft(OrderType::Bid, "bob", dec!(6));
        let existing = vec![standing(OrderType::Bid, "usdc", dec!(5))];
        assert_eq!(validate(&d, Some(&position("alice")), &[], &existing, NOW), Ok(()));
    }

    #[test]
    fn bids_in_other_currencies_do_not_compete() {
        let d = draft(OrderType::Bid, "bob", dec!(1));
        let existing = vec![standing(OrderType::Bid, "bonk", dec!(1_000_000))];
        assert_eq!(validate(&d, Some(&position("alice")), &[], &existing, NOW), Ok(()));
    }

    #[test]
    fn stale_bid_still_counts_as_competition() {
        let d = draft(OrderType::Bid, "bob", dec!(4));
        let mut stale = standing(OrderType::Bid, "usdc", dec!(5));
        stale.is_stale = true;
        assert_eq!(
            validate(&d, Some(&position("alice")), &[], &[stale], NOW),
            Err(RejectionReason::InferiorBid)
        );
    }

    #[test]
    fn listing_must_strictly_undercut() {
        let d = draft(OrderType::Listing, "alice", dec!(5));
        let existing = vec![standing(OrderType::Listing, "usdc", dec!(5))];
        assert_eq!(
            validate(&d, Some(&position("alice")), &[], &existing, NOW),
            Err(RejectionReason::InferiorListing)
        );
    }

    #[test]
    fn undercutting_listing_in_other_currency_is_refused() {
        let mut d = draft(OrderType::Listing, "alice", dec!(4));
        d.currency = "bonk".into();
        let existing = vec![standing(OrderType::Listing, "usdc", dec!(5))];
        assert_eq!(
            validate(&d, Some(&position("alice")), &[], &existing, NOW),
            Err(RejectionReason::CurrencyMismatch)
        );
    }

    #[test]
    fn lower_listing_is_admitted() {
        let d = draft(OrderType::Listing, "alice", dec!(4));
        let existing = vec![standing(OrderType::Listing, "usdc", dec!(5))];
        assert_eq!(validate(&d, Some(&position("alice")), &[], &existing, NOW), Ok(()));
    }

    #[test]
    fn standing_listings_do_not_block_a_bid() {
        let d = draft(OrderType::Bid, "bob", dec!(1));
        let existing = vec![standing(OrderType::Listing, "usdc", dec!(5))];
        assert_eq!(validate(&d, Some(&position("alice")), &[], &existing, NOW), Ok(()));
    }
}
