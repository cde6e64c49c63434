//! Route access policy: a pure decision table from (request path, identity)
//! to allow or redirect. Both interception hooks in `server::guard` call
//! [`decide`]; nothing else encodes these rules.

use super::principal::{Identity, Role};

pub const LOGIN_PATH: &str = "/auth/login";
pub const DASHBOARD_PATH: &str = "/dashboard";
pub const VET_HOME: &str = "/dashboard/vet";
pub const OWNER_HOME: &str = "/dashboard/owner";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    Public,
    LoginPage,
    DashboardRoot,
    DashboardVet,
    DashboardOwner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Allow,
    RedirectTo(&'static str),
}

/// Classify by literal prefix, most specific first.
pub fn classify(path: &str) -> RouteClass {
    if path.starts_with(VET_HOME) {
        RouteClass::DashboardVet
    } else if path.starts_with(OWNER_HOME) {
        RouteClass::DashboardOwner
    } else if path.starts_with(DASHBOARD_PATH) {
        RouteClass::DashboardRoot
    } else if path == LOGIN_PATH {
        RouteClass::LoginPage
    } else {
        RouteClass::Public
    }
}

/// Landing page for a role after login.
pub fn home_for(role: Role) -> &'static str {
    match role {
        Role::Vet => VET_HOME,
        Role::Owner => OWNER_HOME,
        Role::Admin => DASHBOARD_PATH,
    }
}

pub fn decide(path: &str, identity: Option<&Identity>) -> Action {
    let class = classify(path);
    let Some(identity) = identity else {
        return match class {
            RouteClass::DashboardRoot | RouteClass::DashboardVet | RouteClass::DashboardOwner => {
                Action::RedirectTo(LOGIN_PATH)
            }
            RouteClass::Public | RouteClass::LoginPage => Action::Allow,
        };
    };

    match class {
        RouteClass::Public => Action::Allow,
        RouteClass::DashboardRoot => {
            // Only the exact root redirects; deeper unscoped paths pass through
            if path != DASHBOARD_PATH {
                return Action::Allow;
            }
            match identity.role {
                Role::Vet => Action::RedirectTo(VET_HOME),
                Role::Owner => Action::RedirectTo(OWNER_HOME),
                Role::Admin => Action::Allow,
            }
        }
        RouteClass::DashboardVet => match identity.role {
            Role::Vet => Action::Allow,
            Role::Owner => Action::RedirectTo(OWNER_HOME),
            Role::Admin => Action::RedirectTo(DASHBOARD_PATH),
        },
        RouteClass::DashboardOwner => match identity.role {
            Role::Owner => Action::Allow,
            Role::Vet => Action::RedirectTo(VET_HOME),
            Role::Admin => Action::RedirectTo(DASHBOARD_PATH),
        },
        RouteClass::LoginPage => match identity.role {
            Role::Vet => Action::RedirectTo(VET_HOME),
            Role::Owner => Action::RedirectTo(OWNER_HOME),
            Role::Admin => Action::Allow,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn who(role: Role) -> Identity {
        Identity::new("subject", role)
    }

    #[test]
    fn classify_precedence() {
        assert_eq!(classify("/dashboard/vet/horses"), RouteClass::DashboardVet);
        assert_eq!(classify("/dashboard/owner"), RouteClass::DashboardOwner);
        assert_eq!(classify("/dashboard"), RouteClass::DashboardRoot);
        assert_eq!(classify("/dashboard/settings"), RouteClass::DashboardRoot);
        assert_eq!(classify("/auth/login"), RouteClass::LoginPage);
        assert_eq!(classify("/auth/login/extra"), RouteClass::Public);
        assert_eq!(classify("/api/horses"), RouteClass::Public);
    }

    #[test]
    fn literal_prefixes_are_kept() {
        assert_eq!(classify("/dashboardx"), RouteClass::DashboardRoot);
        assert_eq!(classify("/dashboard/vetting"), RouteClass::DashboardVet);
        assert_eq!(decide("/dashboardx", None), Action::RedirectTo(LOGIN_PATH));
    }

    #[test]
    fn decision_table() {
        let vet = who(Role::Vet);
        let owner = who(Role::Owner);
        assert_eq!(decide("/dashboard", None), Action::RedirectTo(LOGIN_PATH));
        assert_eq!(decide("/dashboard", Some(&vet)), Action::RedirectTo(VET_HOME));
        assert_eq!(decide("/dashboard", Some(&owner)), Action::RedirectTo(OWNER_HOME));
        assert_eq!(decide("/dashboard/vet", Some(&owner)), Action::RedirectTo(OWNER_HOME));
        assert_eq!(decide("/dashboard/owner", Some(&vet)), Action::RedirectTo(VET_HOME));
        assert_eq!(decide("/dashboard/vet", Some(&vet)), Action::Allow);
        assert_eq!(decide("/dashboard/owner", Some(&owner)), Action::Allow);
        assert_eq!(decide("/auth/login", Some(&vet)), Action::RedirectTo(VET_HOME));
        assert_eq!(decide("/auth/login", Some(&owner)), Action::RedirectTo(OWNER_HOME));
        assert_eq!(decide("/auth/login", None), Action::Allow);
    }

    #[test]
    fn admin_resolution() {
        let admin = who(Role::Admin);
        assert_eq!(decide("/dashboard", Some(&admin)), Action::Allow);
        assert_eq!(decide("/dashboard/vet", Some(&admin)), Action::RedirectTo(DASHBOARD_PATH));
        assert_eq!(decide("/dashboard/owner/horses", Some(&admin)), Action::RedirectTo(DASHBOARD_PATH));
        assert_eq!(decide("/auth/login", Some(&admin)), Action::Allow);
    }

    #[test]
    fn home_for_every_role_is_allowed_for_that_role() {
        for role in Role::ALL {
            assert_eq!(decide(home_for(role), Some(&who(role))), Action::Allow, "role {role}");
        }
    }
}
