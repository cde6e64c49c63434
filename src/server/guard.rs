//! Request interception. `route_guard` runs in front of every route;
//! `PageAccess` repeats the same decision inside page handlers. Both defer to
//! `identity::policy::decide`.

use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use tracing::debug;

use crate::error::AppError;
use crate::identity::{decide, Action, Identity};

use super::AppState;

/// Router middleware: redirect per policy, otherwise forward with the identity attached.
pub async fn route_guard(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let identity = state.inspect_headers(req.headers());
    match decide(req.uri().path(), identity.as_ref()) {
        Action::Allow => {
            if let Some(identity) = identity {
                req.extensions_mut().insert(identity);
            }
            next.run(req).await
        }
        Action::RedirectTo(target) => {
            debug!(
                target: "vetsense::guard",
                path = %req.uri().path(),
                role = ?identity.as_ref().map(|i| i.role),
                "redirect -> {target}"
            );
            Redirect::temporary(target).into_response()
        }
    }
}

fn identity_from_parts(parts: &Parts, state: &AppState) -> Option<Identity> {
    parts
        .extensions
        .get::<Identity>()
        .cloned()
        .or_else(|| state.inspect_headers(&parts.headers))
}

/// Authenticated caller for API handlers; anonymous requests get 401.
#[derive(Debug, Clone)]
pub struct SessionIdentity(pub Identity);

impl FromRequestParts<AppState> for SessionIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        identity_from_parts(parts, state)
            .map(SessionIdentity)
            .ok_or_else(|| AppError::unauthenticated("unauthenticated", "sign in required"))
    }
}

/// Page-level access check. Rejects with the policy's redirect.
#[derive(Debug, Clone)]
pub struct PageAccess(pub Option<Identity>);

impl FromRequestParts<AppState> for PageAccess {
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let identity = identity_from_parts(parts, state);
        match decide(parts.uri.path(), identity.as_ref()) {
            Action::Allow => Ok(PageAccess(identity)),
            Action::RedirectTo(target) => Err(Redirect::temporary(target)),
        }
    }
}
