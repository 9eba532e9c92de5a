//! Static route table of the merchant console.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const HOME_PATH: &str = "/";
pub const LOGIN_PATH: &str = "/auth/login";

/// Static definition of a navigable page and its access requirement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RouteDescriptor {
    /// Path pattern; `:name` segments capture parameters.
    pub path: String,
    pub name: Option<String>,
    /// Absent means `false`.
    #[serde(default)]
    pub requires_auth: bool,
}

impl RouteDescriptor {
    pub fn new(path: impl Into<String>, name: impl Into<String>, requires_auth: bool) -> Self {
        Self {
            path: path.into(),
            name: Some(name.into()),
            requires_auth,
        }
    }

    /// Match a normalized path, returning captured parameters and the number of
    /// parameter segments used (lower is more specific).
    fn match_path(&self, path: &str) -> Option<(BTreeMap<String, String>, usize)> {
        let pattern = segments(&self.path);
        let actual = segments(path);
        if pattern.len() != actual.len() {
            return None;
        }

        let mut params = BTreeMap::new();
        for (expected, got) in pattern.iter().zip(&actual) {
            if let Some(name) = expected.strip_prefix(':') {
                if got.is_empty() {
                    return None;
                }
                params.insert(name.to_owned(), (*got).to_owned());
            } else if expected != got {
                return None;
            }
        }
        let dynamic = params.len();
        Some((params, dynamic))
    }
}

/// A page route matched against a concrete path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<'a> {
    pub route: &'a RouteDescriptor,
    /// Normalized concrete path.
    pub path: String,
    pub params: BTreeMap<String, String>,
}

/// Outcome of resolving a path against the table, before any guard runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<'a> {
    Page(RouteMatch<'a>),
    Redirect(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    pages: Vec<RouteDescriptor>,
    redirects: Vec<(String, String)>,
    fallback: String,
}

impl RouteTable {
    pub fn new(
        pages: Vec<RouteDescriptor>,
        redirects: Vec<(String, String)>,
        fallback: impl Into<String>,
    ) -> Self {
        Self {
            pages,
            redirects,
            fallback: fallback.into(),
        }
    }

    /// The merchant console's pages. Order pages are reachable without a
    /// session; the order service enforces access through its cookie.
    pub fn merchant() -> Self {
        Self::new(
            vec![
                RouteDescriptor::new("/", "Home", true),
                RouteDescriptor::new("/products", "Products", true),
                RouteDescriptor::new("/products/add", "AddProduct", true),
                RouteDescriptor::new("/products/:id", "ProductDetail", true),
                RouteDescriptor::new("/orders", "Orders", false),
                RouteDescriptor::new("/orders/:id", "OrderDetail", false),
                RouteDescriptor::new("/reviews", "Reviews", true),
                RouteDescriptor::new(LOGIN_PATH, "Login", false),
            ],
            vec![("/login".to_owned(), LOGIN_PATH.to_owned())],
            HOME_PATH,
        )
    }

    pub fn pages(&self) -> &[RouteDescriptor] {
        &self.pages
    }

    pub fn by_name(&self, name: &str) -> Option<&RouteDescriptor> {
        self.pages
            .iter()
            .find(|route| route.name.as_deref() == Some(name))
    }

    /// Resolve a path to a page or a static redirect. Unknown paths redirect
    /// to the fallback.
    pub fn resolve(&self, raw_path: &str) -> Resolution<'_> {
        let path = normalize_path(raw_path);

        if let Some((_, target)) = self.redirects.iter().find(|(from, _)| *from == path) {
            return Resolution::Redirect(target.clone());
        }

        let best = self
            .pages
            .iter()
            .filter_map(|route| {
                route
                    .match_path(&path)
                    .map(|(params, dynamic)| (route, params, dynamic))
            })
            .min_by_key(|(_, _, dynamic)| *dynamic);

        match best {
            Some((route, params, _)) => Resolution::Page(RouteMatch {
                route,
                path,
                params,
            }),
            None => Resolution::Redirect(self.fallback.clone()),
        }
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::merchant()
    }
}

/// Drop query/fragment, force a leading slash and strip trailing slashes.
pub fn normalize_path(raw: &str) -> String {
    let without_fragment = raw.split('#').next().unwrap_or_default();
    let without_query = without_fragment.split('?').next().unwrap_or_default();
    let trimmed = without_query.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return "/".to_owned();
    }
    if trimmed.starts_with('/') {
        trimmed.to_owned()
    } else {
        format!("/{trimmed}")
    }
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|segment| !segment.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_name(table: &RouteTable, path: &str) -> Option<String> {
        match table.resolve(path) {
            Resolution::Page(m) => m.route.name.clone(),
            Resolution::Redirect(_) => None,
        }
    }

    #[test]
    fn resolves_static_and_parameterised_pages() {
        let table = RouteTable::merchant();
        assert_eq!(page_name(&table, "/").as_deref(), Some("Home"));
        assert_eq!(page_name(&table, "/products").as_deref(), Some("Products"));
        assert_eq!(
            page_name(&table, "/products/add").as_deref(),
            Some("AddProduct")
        );

        match table.resolve("/products/42") {
            Resolution::Page(m) => {
                assert_eq!(m.route.name.as_deref(), Some("ProductDetail"));
                assert_eq!(m.params.get("id").map(String::as_str), Some("42"));
            }
            other => panic!("unexpected resolution: {other:?}"),
        }
    }

    #[test]
    fn login_alias_and_unknown_paths_redirect() {
        let table = RouteTable::merchant();
        assert_eq!(
            table.resolve("/login"),
            Resolution::Redirect(LOGIN_PATH.to_owned())
        );
        assert_eq!(
            table.resolve("/nope/at/all"),
            Resolution::Redirect(HOME_PATH.to_owned())
        );
    }

    #[test]
    fn order_pages_do_not_require_auth() {
        let table = RouteTable::merchant();
        let orders = table.by_name("Orders").expect("orders route");
        assert!(!orders.requires_auth);
        let reviews = table.by_name("Reviews").expect("reviews route");
        assert!(reviews.requires_auth);
    }

    #[test]
    fn normalizes_paths() {
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("orders/"), "/orders");
        assert_eq!(normalize_path("/orders/A1?tab=items#top"), "/orders/A1");
        assert_eq!(normalize_path("///"), "/");
    }
}
