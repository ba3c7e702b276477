//! Destinations a flow can send the user to after it completes.

/// Where the UI should go next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Main storefront.
    Home,
    /// Back-office.
    Admin,
    Login,
    Cart,
    Orders,
}

impl Route {
    /// Path of the route in the web client.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Home => "/home",
            Self::Admin => "/admin",
            Self::Login => "/login",
            Self::Cart => "/cart",
            Self::Orders => "/orders",
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}
