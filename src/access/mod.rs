pub mod path;
pub mod routes;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub use path::{canonical_path, PathError};
pub use routes::{RouteTable, RouteTableError, STANDARD_ROUTES};

/// Authenticated caller resolved from a session credential
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub email: Option<String>,
}

impl Identity {
    pub fn new(id: Uuid) -> Self {
        Self { id, email: None }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Protected functional areas; the unit of permission granting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceCategory {
    SystemDashboard,
    Qmrl,
    Qmhq,
    MoneyTransactions,
    InvTransactions,
    Po,
    Invoice,
    StockIn,
    Sor,
    SorL1,
    SorL2,
    SorL3,
    Warehouse,
    InventoryDashboard,
    Item,
    Admin,
}

impl ResourceCategory {
    pub const ALL: [ResourceCategory; 16] = [
        ResourceCategory::SystemDashboard,
        ResourceCategory::Qmrl,
        ResourceCategory::Qmhq,
        ResourceCategory::MoneyTransactions,
        ResourceCategory::InvTransactions,
        ResourceCategory::Po,
        ResourceCategory::Invoice,
        ResourceCategory::StockIn,
        ResourceCategory::Sor,
        ResourceCategory::SorL1,
        ResourceCategory::SorL2,
        ResourceCategory::SorL3,
        ResourceCategory::Warehouse,
        ResourceCategory::InventoryDashboard,
        ResourceCategory::Item,
        ResourceCategory::Admin,
    ];

    /// Name used in the `user_permissions.resource` column
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceCategory::SystemDashboard => "system_dashboard",
            ResourceCategory::Qmrl => "qmrl",
            ResourceCategory::Qmhq => "qmhq",
            ResourceCategory::MoneyTransactions => "money_transactions",
            ResourceCategory::InvTransactions => "inv_transactions",
            ResourceCategory::Po => "po",
            ResourceCategory::Invoice => "invoice",
            ResourceCategory::StockIn => "stock_in",
            ResourceCategory::Sor => "sor",
            ResourceCategory::SorL1 => "sor_l1",
            ResourceCategory::SorL2 => "sor_l2",
            ResourceCategory::SorL3 => "sor_l3",
            ResourceCategory::Warehouse => "warehouse",
            ResourceCategory::InventoryDashboard => "inventory_dashboard",
            ResourceCategory::Item => "item",
            ResourceCategory::Admin => "admin",
        }
    }
}

impl fmt::Display for ResourceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseAccessError {
    kind: &'static str,
    value: String,
}

impl FromStr for ResourceCategory {
    type Err = ParseAccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceCategory::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| ParseAccessError {
                kind: "resource category",
                value: s.to_string(),
            })
    }
}

/// Grant level for an (identity, category) pair. A missing grant is `Block`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionLevel {
    Edit,
    View,
    #[default]
    Block,
}

impl PermissionLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionLevel::Edit => "edit",
            PermissionLevel::View => "view",
            PermissionLevel::Block => "block",
        }
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, PermissionLevel::Block)
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionLevel {
    type Err = ParseAccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "edit" => Ok(PermissionLevel::Edit),
            "view" => Ok(PermissionLevel::View),
            "block" => Ok(PermissionLevel::Block),
            other => Err(ParseAccessError {
                kind: "permission level",
                value: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn sixteen_distinct_categories() {
        let names: HashSet<_> = ResourceCategory::ALL.iter().map(|c| c.as_str()).collect();
        assert_eq!(names.len(), 16);
    }

    #[test]
    fn category_names_parse_back() {
        for category in ResourceCategory::ALL {
            assert_eq!(category.as_str().parse::<ResourceCategory>(), Ok(category));
        }
        assert!("inventory".parse::<ResourceCategory>().is_err());
    }

    #[test]
    fn serde_uses_column_names() {
        let json = serde_json::to_string(&ResourceCategory::InventoryDashboard).unwrap();
        assert_eq!(json, "\"inventory_dashboard\"");
        let level: PermissionLevel = serde_json::from_str("\"view\"").unwrap();
        assert_eq!(level, PermissionLevel::View);
    }

    #[test]
    fn missing_grant_defaults_to_block() {
        assert_eq!(PermissionLevel::default(), PermissionLevel::Block);
        assert!(PermissionLevel::default().is_blocked());
        assert!(!PermissionLevel::View.is_blocked());
        assert!(!PermissionLevel::Edit.is_blocked());
    }

    #[test]
    fn rejects_unknown_level() {
        let err = "admin".parse::<PermissionLevel>().unwrap_err();
        assert_eq!(err.to_string(), "unknown permission level: admin");
    }
}
