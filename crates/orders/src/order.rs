use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bookmart_core::{BookId, DomainError, Money, OrderId, OrderLineId, UserId};

/// Order lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Legal forward transitions. Delivered and Cancelled are terminal.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Paid) | (Pending, Cancelled) | (Paid, Shipped) | (Paid, Cancelled) | (Shipped, Delivered)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl core::str::FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "paid" => Ok(OrderStatus::Paid),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(DomainError::validation(format!("unknown order status '{other}'"))),
        }
    }
}

/// Immutable order snapshot. Only `status` may change after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub total_amount: Money,
    pub status: OrderStatus,
    pub shipping_address: String,
    pub order_date: DateTime<Utc>,
}

impl Order {
    pub fn new(
        id: OrderId,
        user_id: UserId,
        total_amount: Money,
        shipping_address: String,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if shipping_address.trim().is_empty() {
            return Err(DomainError::validation("shipping address cannot be empty"));
        }
        Ok(Self {
            id,
            user_id,
            total_amount,
            status: OrderStatus::Pending,
            shipping_address,
            order_date: now,
        })
    }

    /// The only mutation an order supports.
    pub fn transition_to(&mut self, next: OrderStatus) -> Result<(), DomainError> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::validation(format!(
                "cannot transition order from {} to {}",
                self.status.as_str(),
                next.as_str()
            )));
        }
        self.status = next;
        Ok(())
    }
}

/// Immutable snapshot of a purchased book's price and quantity at checkout
/// time, decoupled from the live catalog price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: OrderLineId,
    pub order_id: OrderId,
    pub book_id: BookId,
    pub book_title: String,
    pub quantity: i64,
    pub unit_price: Money,
}

impl OrderLine {
    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// An order fully materialized with its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderWithLines {
    pub order: Order,
    pub lines: Vec<OrderLine>,
}
