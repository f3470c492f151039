//! Screen reachability derived from the auth snapshot.
//!
//! SYSTEM CONTEXT
//! ==============
//! The navigation layer reads these helpers instead of inspecting session
//! fields itself, so every screen applies the same gate: nothing renders
//! while loading, signed-out users only see login, and the dashboard
//! variant follows the user's role.

#[cfg(test)]
#[path = "navigation_test.rs"]
mod tests;

use std::fmt;

use crate::types::{AuthSnapshot, Role, User};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Dashboard,
    Profile,
    TrainingList,
}

impl Route {
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Login => "/login",
            Self::Dashboard => "/dashboard",
            Self::Profile => "/profile",
            Self::TrainingList => "/trainings",
        }
    }

    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::Login => "Login",
            Self::Dashboard => "Dashboard",
            Self::Profile => "Profile",
            Self::TrainingList => "Trainings",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Role-specific dashboard content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dashboard {
    Freelancer,
    Organization,
    /// Shared by admins and maintainers.
    Admin,
}

impl Dashboard {
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Freelancer => "/dashboard/freelancer",
            Self::Organization => "/dashboard/organization",
            Self::Admin => "/dashboard/admin",
        }
    }

    /// Heading shown at the top of the dashboard.
    #[must_use]
    pub fn greeting(self, user: &User) -> String {
        match self {
            Self::Freelancer => format!("Welcome back, {}!", user.display_name("Trainer")),
            Self::Organization => format!("Welcome back, {}!", user.display_name("Organization")),
            Self::Admin => "Welcome to Atom Connect!".to_owned(),
        }
    }
}

/// Header subtitle, e.g. `"organization panel"`.
#[must_use]
pub fn panel_label(role: Role) -> String {
    format!("{} panel", role.label())
}

#[must_use]
pub fn dashboard_for(role: Role) -> Dashboard {
    match role {
        Role::Freelancer => Dashboard::Freelancer,
        Role::Organization => Dashboard::Organization,
        Role::Admin | Role::Maintainer => Dashboard::Admin,
    }
}

/// Screen to open first, or `None` while the session is still loading.
#[must_use]
pub fn initial_route(snapshot: &AuthSnapshot) -> Option<Route> {
    if snapshot.is_loading {
        return None;
    }
    Some(if snapshot.is_authenticated() { Route::Dashboard } else { Route::Login })
}

/// Redirect to login whenever auth has loaded and nobody is signed in.
#[must_use]
pub fn should_redirect_unauth(snapshot: &AuthSnapshot) -> bool {
    !snapshot.is_loading && !snapshot.is_authenticated()
}

/// Routes the navigator registers for this snapshot.
#[must_use]
pub fn reachable_routes(snapshot: &AuthSnapshot) -> Vec<Route> {
    if snapshot.is_authenticated() {
        vec![Route::Dashboard, Route::Profile, Route::TrainingList]
    } else {
        vec![Route::Login]
    }
}

#[must_use]
pub fn can_visit(snapshot: &AuthSnapshot, route: Route) -> bool {
    reachable_routes(snapshot).contains(&route)
}

/// Paths a consumer may route to by default, including the role dashboard.
#[must_use]
pub fn default_paths(snapshot: &AuthSnapshot) -> Vec<&'static str> {
    let mut paths: Vec<&'static str> = reachable_routes(snapshot).into_iter().map(Route::path).collect();
    if let Some(role) = snapshot.role().filter(|_| snapshot.is_authenticated()) {
        paths.push(dashboard_for(role).path());
    }
    paths
}

/// Only freelancers get the apply action on training listings.
#[must_use]
pub fn can_apply_to_trainings(snapshot: &AuthSnapshot) -> bool {
    snapshot.is_authenticated() && snapshot.role() == Some(Role::Freelancer)
}
