//! Route access policy tests: the full decision table plus generated paths
//! checked against the general properties (public paths stay open, dashboards
//! need a session, no redirect loops).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use vetsense::identity::policy::{home_for, DASHBOARD_PATH, LOGIN_PATH, OWNER_HOME, VET_HOME};
use vetsense::identity::{decide, Action, Identity, Role};

fn who(role: Role) -> Identity {
    Identity::new(format!("user-{}", role.as_str().to_lowercase()), role)
}

fn identities() -> Vec<Option<Identity>> {
    let mut out = vec![None];
    out.extend(Role::ALL.iter().map(|r| Some(who(*r))));
    out
}

const SEGMENTS: &[&str] = &[
    "dashboard", "vet", "owner", "auth", "login", "api", "horses", "x", "dashboardx", "vetting", "owners", "",
];

fn random_path(rng: &mut StdRng) -> String {
    let depth = rng.gen_range(1..=4);
    let mut path = String::new();
    for _ in 0..depth {
        path.push('/');
        path.push_str(SEGMENTS[rng.gen_range(0..SEGMENTS.len())]);
    }
    path
}

#[test]
fn decision_table() {
    let vet = who(Role::Vet);
    let owner = who(Role::Owner);
    let cases: Vec<(&str, Option<&Identity>, Action)> = vec![
        ("/dashboard", None, Action::RedirectTo(LOGIN_PATH)),
        ("/dashboard/vet", None, Action::RedirectTo(LOGIN_PATH)),
        ("/dashboard/owner/horses", None, Action::RedirectTo(LOGIN_PATH)),
        ("/auth/login", None, Action::Allow),
        ("/", None, Action::Allow),
        ("/api/horses", None, Action::Allow),
        ("/auth/login", Some(&vet), Action::RedirectTo(VET_HOME)),
        ("/auth/login", Some(&owner), Action::RedirectTo(OWNER_HOME)),
        ("/dashboard", Some(&vet), Action::RedirectTo(VET_HOME)),
        ("/dashboard", Some(&owner), Action::RedirectTo(OWNER_HOME)),
        ("/dashboard/vet", Some(&vet), Action::Allow),
        ("/dashboard/vet/horses/1", Some(&vet), Action::Allow),
        ("/dashboard/owner", Some(&vet), Action::RedirectTo(VET_HOME)),
        ("/dashboard/owner", Some(&owner), Action::Allow),
        ("/dashboard/vet", Some(&owner), Action::RedirectTo(OWNER_HOME)),
        ("/dashboard/settings", Some(&vet), Action::Allow),
    ];
    for (path, identity, expected) in cases {
        assert_eq!(decide(path, identity), expected, "path={path} identity={identity:?}");
    }
}

#[test]
fn admin_lands_on_dashboard_root() {
    let admin = who(Role::Admin);
    assert_eq!(decide(DASHBOARD_PATH, Some(&admin)), Action::Allow);
    assert_eq!(decide(LOGIN_PATH, Some(&admin)), Action::Allow);
    assert_eq!(decide(VET_HOME, Some(&admin)), Action::RedirectTo(DASHBOARD_PATH));
    assert_eq!(decide(OWNER_HOME, Some(&admin)), Action::RedirectTo(DASHBOARD_PATH));
}

#[test]
fn prefixes_are_literal() {
    let owner = who(Role::Owner);
    // No segment boundary: these still count as dashboard routes
    assert_eq!(decide("/dashboardx", None), Action::RedirectTo(LOGIN_PATH));
    assert_eq!(decide("/dashboard/vetting", Some(&owner)), Action::RedirectTo(OWNER_HOME));
    // Only the exact login path is the login page
    assert_eq!(decide("/auth/login/extra", Some(&owner)), Action::Allow);
}

#[test]
fn every_role_home_is_allowed_for_that_role() {
    for role in Role::ALL {
        let identity = who(role);
        assert_eq!(decide(home_for(role), Some(&identity)), Action::Allow, "role={role}");
    }
}

#[test]
fn generated_paths_respect_policy_properties() {
    let mut rng = StdRng::seed_from_u64(0x5eed_7e75);
    for _ in 0..2000 {
        let path = random_path(&mut rng);
        for identity in identities() {
            let action = decide(&path, identity.as_ref());
            let dashboard = path.starts_with(DASHBOARD_PATH);

            if !dashboard && path != LOGIN_PATH {
                assert_eq!(action, Action::Allow, "path={path} identity={identity:?}");
            }
            if dashboard && identity.is_none() {
                assert_eq!(action, Action::RedirectTo(LOGIN_PATH), "path={path}");
            }

            // Following a redirect must settle within one more hop
            if let Action::RedirectTo(first) = action {
                assert_ne!(first, path.as_str(), "self-redirect at {path}");
                match decide(first, identity.as_ref()) {
                    Action::Allow => {}
                    Action::RedirectTo(second) => {
                        assert_eq!(
                            decide(second, identity.as_ref()),
                            Action::Allow,
                            "redirect chain {path} -> {first} -> {second} for {identity:?}"
                        );
                    }
                }
            }
        }
    }
}
