use bookmart_auth::Permission;
use bookmart_core::{AdminId, UserId};

/// Customer context for a request.
///
/// Present on every storefront route behind authentication.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CustomerContext {
    user_id: UserId,
}

impl CustomerContext {
    pub fn new(user_id: UserId) -> Self {
        Self { user_id }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }
}

/// Admin context for a request (authenticated identity + granted permissions).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminContext {
    admin_id: AdminId,
    permissions: Vec<Permission>,
}

impl AdminContext {
    pub fn new(admin_id: AdminId, permissions: Vec<Permission>) -> Self {
        Self {
            admin_id,
            permissions,
        }
    }

    pub fn admin_id(&self) -> AdminId {
        self.admin_id
    }

    pub fn permissions(&self) -> &[Permission] {
        &self.permissions
    }

    pub fn allows(&self, required: &Permission) -> bool {
        self.permissions
            .iter()
            .any(|p| p.is_wildcard() || p == required)
    }
}
