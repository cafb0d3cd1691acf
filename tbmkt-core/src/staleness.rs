//! Staleness resolution: which one of several competing orders is live.
//!
//! Orders compete per grouping key: `(chain_id, token_id, participant,
//! type)`, split further by currency for bids. Among non-expired,
//! non-cancelled members of a group, the winner is the lowest-priced
//! listing or the highest-priced bid; every other member is stale.
//! Equal amounts break to the lowest order id, which is the earliest
//! created order since ids are assigned monotonically.
//!
//! The same planning function serves the targeted paths (after a
//! create or a cancellation) and the batch auditor, so both converge
//! to the same assignment regardless of event arrival order.

use crate::entities::OrderType;
use crate::entities::order::Order;
use itertools::Itertools;
use std::collections::HashMap;

/// The unit over which "best order" is computed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey {
    pub chain_id: String,
    pub token_id: i64,
    pub participant: String,
    pub order_type: OrderType,
    /// Set for bids only: a participant may hold one live bid per
    /// currency, but at most one live listing regardless of currency.
    pub currency: Option<String>,
}

/// Compute the grouping key of an order.
pub fn group_key(order: &Order) -> GroupKey {
    GroupKey {
        chain_id: order.chain_id.clone(),
        token_id: order.token_id,
        participant: order.participant.clone(),
        order_type: order.order_type,
        currency: match order.order_type {
            OrderType::Bid => Some(order.currency.clone()),
            OrderType::Listing => None,
        },
    }
}

/// A single staleness correction: order `id` should have `is_stale`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StalenessFix {
    pub id: i64,
    pub is_stale: bool,
}

/// True when `candidate` wins over `incumbent` within one group.
fn beats(candidate: &Order, incumbent: &Order) -> bool {
    match candidate.order_type {
        OrderType::Listing => (candidate.amount, candidate.id) < (incumbent.amount, incumbent.id),
        OrderType::Bid => {
            candidate.amount > incumbent.amount
                || (candidate.amount == incumbent.amount && candidate.id < incumbent.id)
        }
    }
}

/// Pick the live order of one group. Returns `None` for an empty group.
/// Callers must pass only non-expired, non-cancelled orders.
pub fn resolve_group<'a>(members: impl IntoIterator<Item = &'a Order>) -> Option<&'a Order> {
    members
        .into_iter()
        .reduce(|incumbent, candidate| {
            if beats(candidate, incumbent) {
                candidate
            } else {
                incumbent
            }
        })
}

/// Plan the corrections that bring a working set of orders in line
/// with the single-live-winner invariant.
///
/// The set may span any number of groups; rows are grouped here, so
/// callers can pass whatever window they have (one participant's
/// orders on a position, or a full audit page). Only rows whose stored
/// staleness differs from the computed one are returned, sorted by id
/// for deterministic application.
pub fn plan_corrections(orders: &[Order]) -> Vec<StalenessFix> {
    let by_group: HashMap<GroupKey, Vec<&Order>> = orders
        .iter()
        .map(|order| (group_key(order), order))
        .into_group_map();

    let mut fixes = Vec::new();
    for members in by_group.into_values() {
        let Some(winner) = resolve_group(members.iter().copied()) else {
            continue;
        };
        let winner_id = winner.id;
        for member in members {
            let should_be_stale = member.id != winner_id;
            if member.is_stale != should_be_stale {
                fixes.push(StalenessFix {
                    id: member.id,
                    is_stale: should_be_stale,
                });
            }
        }
    }
    fixes.sort_by_key(|fix| fix.id);
    fixes
}

/// One audit page split into the rows safe to resolve now, a position
/// whose orders overflow the page, and the cursor for the next page.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditWindow {
    /// Rows whose groups are fully contained in the page.
    pub resolved: Vec<Order>,
    /// Token id filling the entire page. Its groups may extend beyond
    /// the page, so the caller must load that position's orders in
    /// full and resolve them as one unit; resolving the truncated
    /// slice could promote a second live winner.
    pub spill: Option<i64>,
    /// Where the next page starts; `None` when the scan is done.
    pub next_cursor: Option<i64>,
}

/// Split one audit page for safe resolution.
///
/// A short page is final: everything is resolved and the scan stops.
/// A full page may have cut a token id in half, so every row sharing
/// the final token id is held back and the next page restarts at that
/// token id. When a full page contains a single token id, holding
/// back would stall the scan; instead the token is reported as a
/// spill to be fetched whole, and the cursor skips past it.
pub fn audit_window(rows: Vec<Order>, limit: usize) -> AuditWindow {
    if rows.len() < limit {
        return AuditWindow {
            resolved: rows,
            spill: None,
            next_cursor: None,
        };
    }
    let Some(boundary) = rows.last().map(|order| order.token_id) else {
        return AuditWindow {
            resolved: rows,
            spill: None,
            next_cursor: None,
        };
    };
    if rows.first().map(|order| order.token_id) == Some(boundary) {
        return AuditWindow {
            resolved: Vec::new(),
            spill: Some(boundary),
            next_cursor: Some(boundary + 1),
        };
    }
    let resolved: Vec<Order> = rows
        .into_iter()
        .filter(|order| order.token_id < boundary)
        .collect();
    AuditWindow {
        resolved,
        spill: None,
        next_cursor: Some(boundary),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::entities::OrderStatus;
    use rust_decimal::Decimal;
    use time::macros::datetime;

    fn order(id: i64, order_type: OrderType, amount: i64, is_stale: bool) -> Order {
        order_on(id, order_type, amount, is_stale, 1, "0xuser", "0xweth")
    }

    fn order_on(
        id: i64,
        order_type: OrderType,
        amount: i64,
        is_stale: bool,
        token_id: i64,
        participant: &str,
        currency: &str,
    ) -> Order {
        Order {
            id,
            order_type,
            collection: "0xcollection".into(),
            currency: currency.into(),
            participant: participant.into(),
            chain_id: "0x1".into(),
            token_id,
            amount: Decimal::from(amount),
            nonce: id,
            expiry: datetime!(2030-01-01 00:00:00),
            signature: "0xsig".into(),
            status: OrderStatus::Active,
            is_stale,
            pending_cancellation_date: None,
            created_at: datetime!(2024-01-01 00:00:00),
        }
    }

    #[test]
    fn lowest_listing_wins() {
        let a = order(1, OrderType::Listing, 10, false);
        let b = order(2, OrderType::Listing, 9, false);
        let winner = resolve_group([&a, &b]).unwrap();
        assert_eq!(winner.id, 2);
    }

    #[test]
    fn highest_bid_wins() {
        let a = order(1, OrderType::Bid, 10, false);
        let b = order(2, OrderType::Bid, 12, false);
        let winner = resolve_group([&a, &b]).unwrap();
        assert_eq!(winner.id, 2);
    }

    #[test]
    fn equal_amounts_break_to_lowest_id() {
        let a = order(7, OrderType::Bid, 10, false);
        let b = order(3, OrderType::Bid, 10, false);
        assert_eq!(resolve_group([&a, &b]).unwrap().id, 3);

        let c = order(7, OrderType::Listing, 10, false);
        let d = order(3, OrderType::Listing, 10, false);
        assert_eq!(resolve_group([&c, &d]).unwrap().id, 3);
    }

    #[test]
    fn new_lower_listing_supersedes_previous() {
        // Create listing A (10), then B (9): B live, A stale.
        let a = order(1, OrderType::Listing, 10, false);
        let b = order(2, OrderType::Listing, 9, false);
        let fixes = plan_corrections(&[a, b]);
        assert_eq!(
            fixes,
            vec![StalenessFix {
                id: 1,
                is_stale: true
            }]
        );
    }

    #[test]
    fn cancelled_sibling_never_blocks_new_winner() {
        // After A was cancelled (and thus excluded from the working
        // set), a freshly created C is the only member and stays live.
        let c = order(2, OrderType::Listing, 11, false);
        assert!(plan_corrections(&[c]).is_empty());
    }

    #[test]
    fn bids_group_per_currency() {
        let weth = order_on(1, OrderType::Bid, 10, false, 1, "0xuser", "0xweth");
        let usdc = order_on(2, OrderType::Bid, 9, false, 1, "0xuser", "0xusdc");
        // Different currencies, different groups: both stay live.
        assert!(plan_corrections(&[weth, usdc]).is_empty());
    }

    #[test]
    fn listings_do_not_group_per_currency() {
        let weth = order_on(1, OrderType::Listing, 10, false, 1, "0xuser", "0xweth");
        let usdc = order_on(2, OrderType::Listing, 9, false, 1, "0xuser", "0xusdc");
        let fixes = plan_corrections(&[weth, usdc]);
        assert_eq!(
            fixes,
            vec![StalenessFix {
                id: 1,
                is_stale: true
            }]
        );
    }

    #[test]
    fn repromotes_best_survivor() {
        // The live order was cancelled; among the stale survivors the
        // best one must come back live.
        let survivor_low = order(1, OrderType::Bid, 8, true);
        let survivor_high = order(2, OrderType::Bid, 9, true);
        let fixes = plan_corrections(&[survivor_low, survivor_high]);
        assert_eq!(
            fixes,
            vec![StalenessFix {
                id: 2,
                is_stale: false
            }]
        );
    }

    #[test]
    fn converged_state_yields_no_fixes() {
        let live = order(1, OrderType::Bid, 10, false);
        let stale = order(2, OrderType::Bid, 9, true);
        assert!(plan_corrections(&[live, stale]).is_empty());
    }

    #[test]
    fn plan_is_order_independent() {
        let orders = vec![
            order_on(1, OrderType::Listing, 10, false, 1, "0xa", "0xweth"),
            order_on(2, OrderType::Listing, 9, true, 1, "0xa", "0xweth"),
            order_on(3, OrderType::Bid, 5, false, 1, "0xb", "0xweth"),
            order_on(4, OrderType::Bid, 7, true, 1, "0xb", "0xweth"),
            order_on(5, OrderType::Bid, 6, false, 2, "0xb", "0xusdc"),
        ];
        let expected = plan_corrections(&orders);
        assert!(!expected.is_empty());

        // Every rotation of the input converges to the same plan.
        let mut rotated = orders.clone();
        for _ in 0..rotated.len() {
            rotated.rotate_left(1);
            assert_eq!(plan_corrections(&rotated), expected);
        }
    }

    #[test]
    fn applying_a_plan_reaches_a_fixpoint() {
        let mut orders = vec![
            order(1, OrderType::Bid, 10, true),
            order(2, OrderType::Bid, 12, true),
            order(3, OrderType::Bid, 11, false),
        ];
        let fixes = plan_corrections(&orders);
        for fix in &fixes {
            if let Some(target) = orders.iter_mut().find(|o| o.id == fix.id) {
                target.is_stale = fix.is_stale;
            }
        }
        assert!(plan_corrections(&orders).is_empty());
        let live: Vec<i64> = orders
            .iter()
            .filter(|o| !o.is_stale)
            .map(|o| o.id)
            .collect();
        assert_eq!(live, vec![2]);
    }

    #[test]
    fn short_page_is_final() {
        let rows = vec![order(1, OrderType::Bid, 10, false)];
        let window = audit_window(rows, 100);
        assert_eq!(window.resolved.len(), 1);
        assert_eq!(window.spill, None);
        assert_eq!(window.next_cursor, None);
    }

    #[test]
    fn full_page_holds_back_boundary_token() {
        let rows = vec![
            order_on(1, OrderType::Bid, 10, false, 1, "0xa", "0xweth"),
            order_on(2, OrderType::Bid, 11, false, 1, "0xb", "0xweth"),
            order_on(3, OrderType::Bid, 12, false, 2, "0xa", "0xweth"),
        ];
        let window = audit_window(rows, 3);
        // Token 2 may continue on the next page; only token 1 resolves.
        assert_eq!(
            window.resolved.iter().map(|o| o.id).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert_eq!(window.spill, None);
        assert_eq!(window.next_cursor, Some(2));
    }

    #[test]
    fn full_page_of_one_token_spills_instead_of_resolving() {
        let rows = vec![
            order_on(1, OrderType::Bid, 10, false, 5, "0xa", "0xweth"),
            order_on(2, OrderType::Bid, 11, false, 5, "0xb", "0xweth"),
        ];
        let window = audit_window(rows, 2);
        assert!(window.resolved.is_empty());
        assert_eq!(window.spill, Some(5));
        assert_eq!(window.next_cursor, Some(6));
    }

    #[test]
    fn truncated_group_never_promotes_a_second_winner() {
        // Token 5 has three same-group bids; the true winner (id 3,
        // amount 10) sits past a page of size 2. The page must not be
        // resolved in place, and resolving the full group keeps the
        // existing winner without demoting or duplicating it.
        let page = vec![
            order_on(1, OrderType::Bid, 8, true, 5, "0xa", "0xweth"),
            order_on(2, OrderType::Bid, 9, true, 5, "0xa", "0xweth"),
        ];
        let window = audit_window(page, 2);
        assert!(window.resolved.is_empty());
        assert_eq!(window.spill, Some(5));

        let group = vec![
            order_on(1, OrderType::Bid, 8, true, 5, "0xa", "0xweth"),
            order_on(2, OrderType::Bid, 9, true, 5, "0xa", "0xweth"),
            order_on(3, OrderType::Bid, 10, false, 5, "0xa", "0xweth"),
        ];
        assert!(plan_corrections(&group).is_empty());
    }
}
