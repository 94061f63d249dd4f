use axum::http::HeaderMap;

use crate::adapters::PostgresStore;
use crate::domain::{Role, User};
use crate::engine::{FundsLedger, OrderEngine};
use crate::error::{BourseError, Result};

/// Shared application state for API handlers
#[derive(Clone)]
pub struct AppState {
    pub store: PostgresStore,
    pub orders: OrderEngine,
    pub funds: FundsLedger,
    /// Shared key that unlocks admin registration
    pub admin_key: Option<String>,
}

impl AppState {
    pub fn new(store: PostgresStore, admin_key: Option<String>) -> Self {
        Self {
            orders: OrderEngine::new(store.clone()),
            funds: FundsLedger::new(store.clone()),
            store,
            admin_key,
        }
    }

    /// Resolve the acting principal from the `X-User-Id` header. Session
    /// handling lives outside this core; the header stands in for the
    /// authenticated identity it would provide.
    pub async fn principal(&self, headers: &HeaderMap) -> Result<User> {
        let id = headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<i64>().ok())
            .ok_or_else(|| {
                BourseError::Validation("missing or malformed X-User-Id header".to_string())
            })?;

        self.store.get_user(id).await
    }
}

/// Capability check performed once at the boundary.
pub fn require_role(user: &User, role: Role) -> Result<()> {
    if user.role == role {
        Ok(())
    } else {
        Err(BourseError::Forbidden {
            required: role.as_str(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn user(role: Role) -> User {
        User {
            id: 1,
            username: "carol".to_string(),
            email: "carol@example.com".to_string(),
            credential_hash: String::new(),
            role,
            funds: dec!(10000.00),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_require_role() {
        assert!(require_role(&user(Role::Admin), Role::Admin).is_ok());
        assert!(matches!(
            require_role(&user(Role::Customer), Role::Admin),
            Err(BourseError::Forbidden { required: "admin" })
        ));
    }
}
