//! Query filters and infra-owned records (audit log, dashboard counters).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bookmart_core::{AdminId, UserId};
use bookmart_orders::OrderStatus;

/// Append-only back-office audit entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationLog {
    pub id: Uuid,
    pub admin_id: Option<AdminId>,
    pub admin_name: Option<String>,
    /// Functional area, e.g. "books", "orders", "inventory".
    pub module: String,
    /// Verb, e.g. "create", "update", "delete", "adjust_stock".
    pub action: String,
    pub target_type: Option<String>,
    pub target_id: Option<String>,
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl OperationLog {
    pub fn new(
        admin_id: Option<AdminId>,
        admin_name: Option<String>,
        module: impl Into<String>,
        action: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            admin_id,
            admin_name,
            module: module.into(),
            action: action.into(),
            target_type: None,
            target_id: None,
            detail: None,
            created_at: now,
        }
    }

    pub fn with_target(mut self, target_type: impl Into<String>, target_id: impl Into<String>) -> Self {
        self.target_type = Some(target_type.into());
        self.target_id = Some(target_id.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Filter for the operation audit log listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationLogFilter {
    pub module: Option<String>,
    pub action: Option<String>,
    pub admin_id: Option<AdminId>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl OperationLogFilter {
    pub fn matches(&self, log: &OperationLog) -> bool {
        if let Some(module) = &self.module {
            if &log.module != module {
                return false;
            }
        }
        if let Some(action) = &self.action {
            if &log.action != action {
                return false;
            }
        }
        if let Some(admin_id) = self.admin_id {
            if log.admin_id != Some(admin_id) {
                return false;
            }
        }
        if let Some(from) = self.from {
            if log.created_at < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if log.created_at > to {
                return false;
            }
        }
        true
    }
}

/// Admin order listing filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderListFilter {
    pub status: Option<OrderStatus>,
    pub user_id: Option<UserId>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// Admin user listing filter. `keyword` matches username/email/full name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserListFilter {
    pub keyword: Option<String>,
    pub active_only: Option<bool>,
}

/// Back-office dashboard counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_users: u64,
    pub total_books: u64,
    pub total_orders: u64,
    pub today_orders: u64,
    pub pending_orders: u64,
    pub low_stock_books: u64,
    pub monthly_revenue: rust_decimal::Decimal,
}
