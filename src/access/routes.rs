use once_cell::sync::Lazy;
use thiserror::Error;

use super::ResourceCategory;

pub const LOGIN_PATH: &str = "/login";
pub const ROOT_PATH: &str = "/";

const PUBLIC_ROUTES: [&str; 3] = [LOGIN_PATH, "/auth/callback", "/auth/confirm"];

// Specific prefixes must come before their parents.
// money_transactions, inv_transactions and sor_l1..sor_l3 have no URL of their
// own; they are granted per user but only gate actions inside the UI.
const PREFIX_TABLE: [(&str, ResourceCategory); 11] = [
    ("/dashboard", ResourceCategory::SystemDashboard),
    ("/qmrl", ResourceCategory::Qmrl),
    ("/qmhq", ResourceCategory::Qmhq),
    ("/po", ResourceCategory::Po),
    ("/invoice", ResourceCategory::Invoice),
    ("/inventory/stock-in", ResourceCategory::StockIn),
    ("/inventory/stock-out", ResourceCategory::Sor),
    ("/inventory", ResourceCategory::InventoryDashboard),
    ("/warehouse", ResourceCategory::Warehouse),
    ("/item", ResourceCategory::Item),
    ("/admin", ResourceCategory::Admin),
];

/// Compiled-in route configuration used by the server
pub static STANDARD_ROUTES: Lazy<RouteTable> = Lazy::new(RouteTable::standard);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteTableError {
    #[error("route '{0}' must start with '/' and must not end with '/'")]
    Malformed(String),

    #[error("route '{0}' is declared more than once")]
    Duplicate(String),

    #[error("prefix '{specific}' is unreachable behind earlier prefix '{general}'")]
    Shadowed { general: String, specific: String },
}

/// Public-route set plus the ordered prefix → category table.
///
/// Lookups are first-match in declaration order. Construction through
/// [`RouteTable::new`] rejects tables where an earlier prefix would shadow a
/// later, more specific one, so the first match is always the longest.
#[derive(Debug, Clone)]
pub struct RouteTable {
    public: Vec<String>,
    prefixes: Vec<(String, ResourceCategory)>,
}

impl RouteTable {
    pub fn new<P, S>(public: P, prefixes: Vec<(S, ResourceCategory)>) -> Result<Self, RouteTableError>
    where
        P: IntoIterator,
        P::Item: Into<String>,
        S: Into<String>,
    {
        let public: Vec<String> = public.into_iter().map(Into::into).collect();
        let prefixes: Vec<(String, ResourceCategory)> = prefixes
            .into_iter()
            .map(|(prefix, category)| (prefix.into(), category))
            .collect();

        for route in &public {
            validate_route(route)?;
        }
        if let Some(dup) = first_duplicate(public.iter()) {
            return Err(RouteTableError::Duplicate(dup.clone()));
        }

        for (index, (prefix, _)) in prefixes.iter().enumerate() {
            if prefix == ROOT_PATH {
                return Err(RouteTableError::Malformed(prefix.clone()));
            }
            validate_route(prefix)?;

            for (earlier, _) in &prefixes[..index] {
                if earlier == prefix {
                    return Err(RouteTableError::Duplicate(prefix.clone()));
                }
                if segment_prefix(prefix, earlier) {
                    return Err(RouteTableError::Shadowed {
                        general: earlier.clone(),
                        specific: prefix.clone(),
                    });
                }
            }
        }

        Ok(Self { public, prefixes })
    }

    /// The compiled-in table. Its ordering is checked by the unit tests below.
    pub fn standard() -> Self {
        Self {
            public: PUBLIC_ROUTES.iter().map(|route| route.to_string()).collect(),
            prefixes: PREFIX_TABLE
                .iter()
                .map(|(prefix, category)| (prefix.to_string(), *category))
                .collect(),
        }
    }

    pub fn is_public(&self, path: &str) -> bool {
        self.public.iter().any(|route| segment_prefix(path, route))
    }

    pub fn category_for(&self, path: &str) -> Option<ResourceCategory> {
        self.prefixes
            .iter()
            .find(|(prefix, _)| segment_prefix(path, prefix))
            .map(|(_, category)| *category)
    }

    pub fn public_routes(&self) -> &[String] {
        &self.public
    }

    pub fn prefixes(&self) -> &[(String, ResourceCategory)] {
        &self.prefixes
    }
}

/// True when `path` equals `prefix` or continues it at a `/` boundary.
fn segment_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

fn validate_route(route: &str) -> Result<(), RouteTableError> {
    if !route.starts_with('/') || (route.len() > 1 && route.ends_with('/')) {
        return Err(RouteTableError::Malformed(route.to_string()));
    }
    Ok(())
}

fn first_duplicate<'a>(routes: impl Iterator<Item = &'a String>) -> Option<&'a String> {
    let mut seen = std::collections::HashSet::new();
    for route in routes {
        if !seen.insert(route.as_str()) {
            return Some(route);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_table_passes_validation() {
        let validated = RouteTable::new(PUBLIC_ROUTES, PREFIX_TABLE.to_vec());
        assert!(validated.is_ok(), "standard table rejected: {:?}", validated.err());
    }

    #[test]
    fn standard_table_declares_specific_before_general() {
        let table = RouteTable::standard();
        let position = |needle: &str| {
            table
                .prefixes()
                .iter()
                .position(|(prefix, _)| prefix == needle)
                .unwrap()
        };

        assert!(position("/inventory/stock-in") < position("/inventory"));
        assert!(position("/inventory/stock-out") < position("/inventory"));
    }

    #[test]
    fn longest_prefix_wins() {
        let table = RouteTable::standard();
        assert_eq!(
            table.category_for("/inventory/stock-in/123"),
            Some(ResourceCategory::StockIn)
        );
        assert_eq!(
            table.category_for("/inventory/stock-out"),
            Some(ResourceCategory::Sor)
        );
        assert_eq!(
            table.category_for("/inventory/reports"),
            Some(ResourceCategory::InventoryDashboard)
        );
    }

    #[test]
    fn matching_respects_segment_boundaries() {
        let table = RouteTable::standard();
        assert_eq!(table.category_for("/po/42"), Some(ResourceCategory::Po));
        assert_eq!(table.category_for("/po"), Some(ResourceCategory::Po));
        assert_eq!(table.category_for("/portal"), None);
        assert_eq!(table.category_for("/items"), None);
    }

    #[test]
    fn ui_only_categories_have_no_prefix() {
        let table = RouteTable::standard();
        for category in [
            ResourceCategory::MoneyTransactions,
            ResourceCategory::InvTransactions,
            ResourceCategory::SorL1,
            ResourceCategory::SorL2,
            ResourceCategory::SorL3,
        ] {
            assert!(table.prefixes().iter().all(|(_, c)| *c != category), "{category}");
        }
    }

    #[test]
    fn unlisted_paths_have_no_category() {
        let table = RouteTable::standard();
        assert_eq!(table.category_for("/settings"), None);
        assert_eq!(table.category_for("/"), None);
    }

    #[test]
    fn public_routes_match_by_segment() {
        let table = RouteTable::standard();
        assert!(table.is_public("/login"));
        assert!(table.is_public("/auth/callback"));
        assert!(table.is_public("/auth/confirm/email"));
        assert!(!table.is_public("/auth/logout"));
        assert!(!table.is_public("/login-help"));
        assert!(!table.is_public("/"));
    }

    #[test]
    fn rejects_general_prefix_declared_first() {
        let err = RouteTable::new(
            Vec::<String>::new(),
            vec![
                ("/inventory", ResourceCategory::InventoryDashboard),
                ("/inventory/stock-in", ResourceCategory::StockIn),
            ],
        )
        .unwrap_err();

        assert_eq!(
            err,
            RouteTableError::Shadowed {
                general: "/inventory".to_string(),
                specific: "/inventory/stock-in".to_string(),
            }
        );
    }

    #[test]
    fn sibling_prefixes_sharing_text_are_not_shadowed() {
        let table = RouteTable::new(
            Vec::<String>::new(),
            vec![("/po", ResourceCategory::Po), ("/portal", ResourceCategory::Admin)],
        );
        assert!(table.is_ok());
    }

    #[test]
    fn rejects_duplicates_and_malformed_routes() {
        assert_eq!(
            RouteTable::new(
                Vec::<String>::new(),
                vec![("/po", ResourceCategory::Po), ("/po", ResourceCategory::Invoice)],
            )
            .unwrap_err(),
            RouteTableError::Duplicate("/po".to_string())
        );
        assert_eq!(
            RouteTable::new(["/login", "/login"], Vec::<(String, _)>::new()).unwrap_err(),
            RouteTableError::Duplicate("/login".to_string())
        );
        assert!(matches!(
            RouteTable::new(Vec::<String>::new(), vec![("po", ResourceCategory::Po)]),
            Err(RouteTableError::Malformed(_))
        ));
        assert!(matches!(
            RouteTable::new(Vec::<String>::new(), vec![("/po/", ResourceCategory::Po)]),
            Err(RouteTableError::Malformed(_))
        ));
        assert!(matches!(
            RouteTable::new(Vec::<String>::new(), vec![("/", ResourceCategory::Admin)]),
            Err(RouteTableError::Malformed(_))
        ));
    }
}
