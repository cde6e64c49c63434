use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::error::{AppError, AppResult};
use crate::identity::policy::{home_for, LOGIN_PATH};
use crate::identity::{decide, Action, Identity, Role};
use crate::security::{self, MIN_PASSWORD_LEN};
use crate::storage::{NewUser, PublicUser};

use super::guard::SessionIdentity;
use super::{clear_session_cookie, session_cookie, AppState};

/// Credential endpoint. Kept outside the page paths so the access policy never redirects it.
pub const LOGIN_SUBMIT_PATH: &str = "/api/auth/login";

#[derive(Debug, Deserialize)]
pub struct LoginPayload {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterPayload {
    pub email: String,
    pub name: String,
    pub password: String,
    pub role: String,
}

pub async fn login(State(state): State<AppState>, Json(payload): Json<LoginPayload>) -> AppResult<(StatusCode, HeaderMap, Json<Value>)> {
    let email = payload.email.trim();
    if email.is_empty() || payload.password.is_empty() {
        return Err(AppError::user("invalid_login", "email and password are required"));
    }
    let Some(user) = security::authenticate(&state.store, email, &payload.password)? else {
        warn!(target: "vetsense::auth", "login rejected email={}", email);
        return Err(AppError::unauthenticated("invalid_credentials", "invalid email or password"));
    };

    let identity = Identity::new(&user.id, user.role);
    let token = state.sessions.issue(&identity, Some(&user.name)).map_err(|e| {
        error!(target: "vetsense::auth", "token issue failed: {e}");
        AppError::internal("token_issue_failed", "could not create session")
    })?;
    // Land wherever the policy would send this identity from the login page
    let redirect = match decide(LOGIN_PATH, Some(&identity)) {
        Action::RedirectTo(target) => target,
        Action::Allow => home_for(identity.role),
    };

    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, session_cookie(&token, state.sessions.ttl().as_secs(), state.cookie_secure)?);
    info!(target: "vetsense::auth", "login user={} role={}", user.id, user.role);
    Ok((StatusCode::OK, headers, Json(json!({"status":"ok","role": user.role,"redirect": redirect}))))
}

pub async fn logout(State(state): State<AppState>) -> (StatusCode, HeaderMap, Json<Value>) {
    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, clear_session_cookie(state.cookie_secure));
    (StatusCode::OK, headers, Json(json!({"status":"ok","redirect": LOGIN_PATH})))
}

pub async fn session(SessionIdentity(identity): SessionIdentity) -> Json<Value> {
    Json(json!({"status":"ok","identity": identity}))
}

pub async fn register(State(state): State<AppState>, Json(payload): Json<RegisterPayload>) -> AppResult<(StatusCode, Json<PublicUser>)> {
    let email = payload.email.trim();
    if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
        return Err(AppError::user("invalid_email", "a valid email address is required"));
    }
    if payload.name.trim().is_empty() {
        return Err(AppError::user("invalid_name", "name is required"));
    }
    if payload.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::UserInput {
            code: "weak_password".into(),
            message: format!("password must be at least {MIN_PASSWORD_LEN} characters"),
        });
    }
    let role = match payload.role.parse::<Role>() {
        Ok(r @ (Role::Vet | Role::Owner)) => r,
        Ok(Role::Admin) | Err(_) => return Err(AppError::user("invalid_role", "role must be VET or OWNER")),
    };

    let password_hash = security::hash_password(&payload.password)?;
    let user = state.store.0.lock().create_user(NewUser {
        email: email.to_string(),
        name: payload.name,
        password_hash,
        role,
    })?;
    info!(target: "vetsense::auth", "registered user={} role={}", user.id, user.role);
    Ok((StatusCode::CREATED, Json(PublicUser::from(&user))))
}

pub async fn me(State(state): State<AppState>, SessionIdentity(identity): SessionIdentity) -> AppResult<Json<PublicUser>> {
    let guard = state.store.0.lock();
    guard
        .find_user(&identity.subject_id)
        .map(|u| Json(PublicUser::from(u)))
        .ok_or_else(|| AppError::not_found("user_not_found", "account no longer exists"))
}

pub async fn list_owners(State(state): State<AppState>, SessionIdentity(identity): SessionIdentity) -> AppResult<Json<Vec<PublicUser>>> {
    match identity.role {
        Role::Vet | Role::Admin => {}
        Role::Owner => return Err(AppError::forbidden("forbidden", "only vets and admins can list owners")),
    }
    let guard = state.store.0.lock();
    Ok(Json(guard.users_with_role(Role::Owner).into_iter().map(PublicUser::from).collect()))
}
