//! Where the front-end should go after a session change.

use crate::models::UserProfile;

/// Navigation target produced by login, logout and session restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// The unauthenticated entry point (login/signup).
    Auth,
    /// The customer catalog.
    Home,
    /// The catalog management surface.
    Admin,
}

impl Route {
    /// Landing route for a user: admins go to the management surface,
    /// everyone else to the catalog, nobody to the entry point.
    #[must_use]
    pub fn landing(user: Option<&UserProfile>) -> Self {
        match user {
            Some(user) if user.role.is_admin() => Self::Admin,
            Some(_) => Self::Home,
            None => Self::Auth,
        }
    }

    /// Path of the route in the web front-end.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Auth => "/auth",
            Self::Home => "/home",
            Self::Admin => "/admin",
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

#[cfg(test)]
mod tests {
    use bookstore_core::{UserId, UserRole};

    use super::*;

    fn profile(role: UserRole) -> UserProfile {
        UserProfile {
            id: UserId::generate(),
            email: "reader@example.com".into(),
            full_name: "Reader".into(),
            role,
        }
    }

    #[test]
    fn test_landing() {
        assert_eq!(Route::landing(None), Route::Auth);
        assert_eq!(Route::landing(Some(&profile(UserRole::Admin))), Route::Admin);
        assert_eq!(Route::landing(Some(&profile(UserRole::Customer))), Route::Home);
    }
}
