use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bookmart_core::{AdminId, BookId, OrderId, StockLogId};

/// Cause of a stock quantity change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockChangeType {
    /// Checkout decrement.
    Sale,
    /// Manual inbound adjustment.
    In,
    /// Manual outbound adjustment.
    Out,
}

/// Who triggered the change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "id")]
pub enum StockOperator {
    System,
    Admin(AdminId),
}

/// One row of the append-only stock ledger.
///
/// Invariant: `after_quantity == before_quantity + delta`, enforced by
/// construction — the row records `before` and `delta` and derives `after`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLog {
    pub id: StockLogId,
    pub book_id: BookId,
    pub change_type: StockChangeType,
    pub before_quantity: i64,
    pub after_quantity: i64,
    /// Signed change. Negative for sales and outbound adjustments.
    pub delta: i64,
    pub related_order_id: Option<OrderId>,
    pub operator: StockOperator,
    pub remark: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl StockLog {
    /// Ledger entry for a checkout: delta = −quantity, linked to the order.
    pub fn sale(
        id: StockLogId,
        book_id: BookId,
        before_quantity: i64,
        quantity: i64,
        order_id: OrderId,
        now: DateTime<Utc>,
    ) -> Self {
        let delta = -quantity;
        Self {
            id,
            book_id,
            change_type: StockChangeType::Sale,
            before_quantity,
            after_quantity: before_quantity + delta,
            delta,
            related_order_id: Some(order_id),
            operator: StockOperator::System,
            remark: None,
            created_at: now,
        }
    }

    /// Ledger entry for a manual adjustment: change type follows the sign.
    pub fn adjustment(
        id: StockLogId,
        book_id: BookId,
        before_quantity: i64,
        delta: i64,
        operator: StockOperator,
        remark: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let change_type = if delta >= 0 {
            StockChangeType::In
        } else {
            StockChangeType::Out
        };
        Self {
            id,
            book_id,
            change_type,
            before_quantity,
            after_quantity: before_quantity + delta,
            delta,
            related_order_id: None,
            operator,
            remark,
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn sale_links_order_and_negates_quantity() {
        let order_id = OrderId::new();
        let log = StockLog::sale(StockLogId::new(), BookId::new(), 10, 3, order_id, Utc::now());
        assert_eq!(log.change_type, StockChangeType::Sale);
        assert_eq!(log.delta, -3);
        assert_eq!(log.before_quantity, 10);
        assert_eq!(log.after_quantity, 7);
        assert_eq!(log.related_order_id, Some(order_id));
        assert_eq!(log.operator, StockOperator::System);
    }

    #[test]
    fn adjustment_sign_picks_change_type() {
        let inbound = StockLog::adjustment(
            StockLogId::new(),
            BookId::new(),
            10,
            5,
            StockOperator::Admin(AdminId::new()),
            None,
            Utc::now(),
        );
        assert_eq!(inbound.change_type, StockChangeType::In);
        assert_eq!(inbound.after_quantity, 15);

        let outbound = StockLog::adjustment(
            StockLogId::new(),
            BookId::new(),
            10,
            -4,
            StockOperator::System,
            Some("damaged".to_string()),
            Utc::now(),
        );
        assert_eq!(outbound.change_type, StockChangeType::Out);
        assert_eq!(outbound.after_quantity, 6);
    }

    proptest! {
        #[test]
        fn ledger_invariant_after_equals_before_plus_delta(
            before in -10_000i64..10_000,
            delta in -10_000i64..10_000,
        ) {
            let log = StockLog::adjustment(
                StockLogId::new(),
                BookId::new(),
                before,
                delta,
                StockOperator::System,
                None,
                Utc::now(),
            );
            prop_assert_eq!(log.after_quantity, log.before_quantity + log.delta);
        }

        #[test]
        fn running_delta_sum_tracks_stock(quantities in proptest::collection::vec(1i64..50, 1..20)) {
            // Replay a sequence of sales; the running sum of deltas must equal
            // current stock minus initial stock.
            let initial = 10_000i64;
            let mut stock = initial;
            let mut delta_sum = 0i64;
            let order_id = OrderId::new();
            for q in quantities {
                let log = StockLog::sale(StockLogId::new(), BookId::new(), stock, q, order_id, Utc::now());
                stock = log.after_quantity;
                delta_sum += log.delta;
            }
            prop_assert_eq!(delta_sum, stock - initial);
        }
    }
}
