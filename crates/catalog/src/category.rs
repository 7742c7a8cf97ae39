use serde::{Deserialize, Serialize};

use bookmart_core::CategoryId;

/// A flat catalog category (no hierarchy).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

impl Category {
    pub fn new(id: CategoryId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}
