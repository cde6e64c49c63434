//! Identity, session tokens and route access policy for VETSENSE.
//! Keep the public surface thin and split implementation across sub-modules.

mod principal;
mod session;
pub mod policy;

pub use principal::{Identity, Role};
pub use session::{SessionClaims, SessionConfig, SessionManager, SessionToken, TokenError, SESSION_COOKIE};
pub use policy::{decide, Action, RouteClass};
