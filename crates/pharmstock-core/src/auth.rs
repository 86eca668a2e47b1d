//! # Actors and Capabilities
//!
//! The HTTP layer authenticates a request and hands the engine an [`Actor`].
//! The engine only asks one question of it: may this role perform this action?
//!
//! ## Capability Matrix
//! ```text
//! ┌──────────────────────┬─────────┬────────────┬─────────┐
//! │ Capability           │  Admin  │ Pharmacist │  Staff  │
//! ├──────────────────────┼─────────┼────────────┼─────────┤
//! │ RecordSale           │    ✓    │     ✓      │    ✓    │
//! │ RecordPurchase       │    ✓    │     ✓      │         │
//! │ UpdatePayment        │    ✓    │     ✓      │         │
//! │ DeleteSale           │    ✓    │            │         │
//! │ DeletePurchase       │    ✓    │            │         │
//! └──────────────────────┴─────────┴────────────┴─────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

/// Staff role carried by an authenticated identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Pharmacist,
    Staff,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Pharmacist => write!(f, "pharmacist"),
            Role::Staff => write!(f, "staff"),
        }
    }
}

/// An action guarded by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    RecordSale,
    RecordPurchase,
    UpdatePayment,
    DeleteSale,
    DeletePurchase,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::RecordSale => "record sale",
            Capability::RecordPurchase => "record purchase",
            Capability::UpdatePayment => "update payment",
            Capability::DeleteSale => "delete sale",
            Capability::DeletePurchase => "delete purchase",
        };
        f.write_str(name)
    }
}

impl Role {
    /// Returns true if this role may perform `capability`.
    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::RecordSale => true,
            Capability::RecordPurchase | Capability::UpdatePayment => {
                matches!(self, Role::Admin | Role::Pharmacist)
            }
            Capability::DeleteSale | Capability::DeletePurchase => matches!(self, Role::Admin),
        }
    }
}

/// The authenticated identity behind a request.
///
/// `user_id` is recorded on every purchase and sale header as the
/// originating identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Actor {
    pub user_id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Actor {
            user_id: user_id.into(),
            role,
        }
    }

    #[inline]
    pub fn can(&self, capability: Capability) -> bool {
        self.role.allows(capability)
    }
}
