use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Account role, checked once at the API boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Role {
    type Error = String;

    fn try_from(s: &str) -> std::result::Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "customer" => Ok(Role::Customer),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// A registered account. `funds` only moves through settlement and the
/// funds ledger; both emit a transaction row alongside the mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub credential_hash: String,
    pub role: Role,
    pub funds: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Digest a password for storage. Real credential hashing lives outside
/// this core; a salted SHA-256 stands in so no plaintext is ever stored.
pub fn hash_credential(username: &str, password: &str) -> String {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(username.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Card brand of a stored payment method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CardBrand {
    Visa,
    Mastercard,
    Amex,
    Discover,
}

impl CardBrand {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardBrand::Visa => "VISA",
            CardBrand::Mastercard => "MASTERCARD",
            CardBrand::Amex => "AMEX",
            CardBrand::Discover => "DISCOVER",
        }
    }
}

impl std::fmt::Display for CardBrand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for CardBrand {
    type Error = String;

    fn try_from(s: &str) -> std::result::Result<Self, Self::Error> {
        match s.to_uppercase().as_str() {
            "VISA" => Ok(CardBrand::Visa),
            "MASTERCARD" => Ok(CardBrand::Mastercard),
            "AMEX" => Ok(CardBrand::Amex),
            "DISCOVER" => Ok(CardBrand::Discover),
            _ => Err(format!("Unknown card brand: {}", s)),
        }
    }
}

/// A stored (simulated) card. At most one default per user; setting a new
/// default clears the others in the same transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: i64,
    pub user_id: i64,
    pub brand: CardBrand,
    pub last4: String,
    pub exp_month: i16,
    pub exp_year: i16,
    pub is_default: bool,
    #[serde(skip_serializing)]
    pub token: String,
    pub created_at: DateTime<Utc>,
}

impl PaymentMethod {
    /// Short human label used in deposit transaction notes.
    pub fn label(&self) -> String {
        format!("{} ending {}", self.brand, self.last4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        assert_eq!(Role::try_from("admin").unwrap(), Role::Admin);
        assert_eq!(Role::try_from("CUSTOMER").unwrap(), Role::Customer);
        assert!(Role::try_from("root").is_err());
    }

    #[test]
    fn test_brand_round_trip() {
        for brand in [
            CardBrand::Visa,
            CardBrand::Mastercard,
            CardBrand::Amex,
            CardBrand::Discover,
        ] {
            assert_eq!(CardBrand::try_from(brand.as_str()).unwrap(), brand);
        }
        assert!(CardBrand::try_from("DINERS").is_err());
    }

    #[test]
    fn test_hash_credential_is_stable_and_opaque() {
        let a = hash_credential("carol", "hunter2");
        let b = hash_credential("carol", "hunter2");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, hash_credential("dave", "hunter2"));
        assert!(!a.contains("hunter2"));
    }

    #[test]
    fn test_payment_method_label() {
        let method = PaymentMethod {
            id: 1,
            user_id: 1,
            brand: CardBrand::Visa,
            last4: "4242".to_string(),
            exp_month: 12,
            exp_year: 2030,
            is_default: true,
            token: "tok_sim_1".to_string(),
            created_at: Utc::now(),
        };
        assert_eq!(method.label(), "VISA ending 4242");
    }
}
