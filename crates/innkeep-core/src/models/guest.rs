//! Guest and company models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Guest entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Guest {
    /// Unique identifier
    pub id: Uuid,

    /// First name (required)
    pub first_name: String,

    /// Last name (required)
    pub last_name: String,

    /// Contact email
    pub email: Option<String>,

    /// Contact phone
    pub phone: Option<String>,

    /// Street address
    pub address: Option<String>,

    /// Organization billed on the guest's behalf
    pub company_id: Option<Uuid>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Guest {
    /// Create a new guest with required name fields
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: None,
            phone: None,
            address: None,
            company_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Full display name
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Company entity, billed on behalf of one or more guests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    /// Unique identifier
    pub id: Uuid,

    /// Company name
    pub name: String,

    /// Billing email
    pub email: Option<String>,

    /// Billing address
    pub address: Option<String>,

    /// VAT identifier
    pub vat_id: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_name() {
        let guest = Guest::new("Ada", "Lovelace");
        assert_eq!(guest.full_name(), "Ada Lovelace");
    }
}
