pub const HOME_PATH: &str = "/";
pub const LOGIN_PATH: &str = "/login";

/// Title shown when a route does not declare one
pub const DEFAULT_TITLE: &str = "Card Code Shop";

/// A route and the access rules the guard enforces for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMeta {
    pub path: String,
    pub name: String,
    pub title: Option<String>,
    /// Only for visitors who are not logged in (login page)
    pub guest_only: bool,
    pub requires_auth: bool,
    pub requires_admin: bool,
}

impl RouteMeta {
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            title: None,
            guest_only: false,
            requires_auth: false,
            requires_admin: false,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn guest_only(mut self) -> Self {
        self.guest_only = true;
        self
    }

    pub fn requires_auth(mut self) -> Self {
        self.requires_auth = true;
        self
    }

    pub fn requires_admin(mut self) -> Self {
        self.requires_admin = true;
        self
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(DEFAULT_TITLE)
    }
}

#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<RouteMeta>,
}

impl RouteTable {
    pub fn new(routes: Vec<RouteMeta>) -> Self {
        Self { routes }
    }

    /// Exact match on path, ignoring a trailing slash and any query string.
    pub fn resolve(&self, path: &str) -> Option<&RouteMeta> {
        let path = path.split(['?', '#']).next().unwrap_or(path);
        let trimmed = path.trim_end_matches('/');
        let normalized = if trimmed.is_empty() { HOME_PATH } else { trimmed };
        self.routes.iter().find(|r| r.path == normalized)
    }

    pub fn routes(&self) -> &[RouteMeta] {
        &self.routes
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new(vec![
            RouteMeta::new(HOME_PATH, "Home").title(DEFAULT_TITLE),
            RouteMeta::new(LOGIN_PATH, "Login").title("Sign In").guest_only(),
            RouteMeta::new("/profile", "Profile")
                .title("My Account")
                .requires_auth(),
            RouteMeta::new("/admin", "Admin")
                .title("Admin Console")
                .requires_auth()
                .requires_admin(),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_routes() {
        let table = RouteTable::default();
        let admin = table.resolve("/admin").expect("admin route");
        assert!(admin.requires_auth && admin.requires_admin);
        assert!(table.resolve(LOGIN_PATH).unwrap().guest_only);
        assert_eq!(table.resolve(HOME_PATH).unwrap().name, "Home");
    }

    #[test]
    fn test_resolve_normalizes_path() {
        let table = RouteTable::default();
        assert_eq!(table.resolve("/profile/").unwrap().name, "Profile");
        assert_eq!(table.resolve("/login?next=/admin").unwrap().name, "Login");
        assert_eq!(table.resolve("").unwrap().name, "Home");
        assert!(table.resolve("/orders").is_none());
    }

    #[test]
    fn test_display_title_default() {
        let route = RouteMeta::new("/x", "X");
        assert_eq!(route.display_title(), DEFAULT_TITLE);
    }
}
