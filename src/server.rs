//!
//! vetsense HTTP server
//! --------------------
//! This module defines the Axum-based HTTP API for VETSENSE.
//!
//! Responsibilities:
//! - Session cookies carrying signed tokens (see `identity::SessionManager`).
//! - Route protection through one shared policy (`guard`), applied as router
//!   middleware and again by the page extractor.
//! - Login/logout and registration (`auth`).
//! - Horse, passport and document endpoints over the record store.
//! - Page descriptors for the login page and the role dashboards (`pages`).

use std::sync::Arc;

use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderMap, HeaderValue, Uri};
use axum::routing::{get, post};
use axum::{middleware, Router};
use tracing::info;

use crate::config::ServerConfig;
use crate::error::AppError;
use crate::identity::{Identity, SessionManager, SESSION_COOKIE};
use crate::storage::SharedStore;

pub mod auth;
pub mod documents;
pub mod guard;
pub mod horses;
pub mod pages;

/// Shared server state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub sessions: Arc<SessionManager>,
    /// Add `Secure` to the session cookie
    pub cookie_secure: bool,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(store: SharedStore, cfg: &ServerConfig) -> Self {
        Self {
            store,
            sessions: Arc::new(SessionManager::new(&cfg.session)),
            cookie_secure: cfg.cookie_secure,
            max_upload_bytes: cfg.max_upload_bytes,
        }
    }

    /// Session token inspection for one request; anonymous on any failure.
    pub fn inspect_headers(&self, headers: &HeaderMap) -> Option<Identity> {
        self.sessions.inspect(request_token(headers).as_deref())
    }
}

/// Build the router with every route behind the access guard.
pub fn build_router(state: AppState) -> Router {
    // base64 inflates uploads by 4/3; leave room for the JSON envelope
    let body_limit = state.max_upload_bytes / 3 * 4 + 64 * 1024;

    Router::new()
        .route("/", get(|| async { "vetsense ok" }))
        .route("/auth/login", get(pages::login_page))
        .route(auth::LOGIN_SUBMIT_PATH, post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/dashboard", get(pages::admin_dashboard))
        .route("/dashboard/vet", get(pages::vet_dashboard))
        .route("/dashboard/owner", get(pages::owner_dashboard))
        .route("/api/session", get(auth::session))
        .route("/api/users", post(auth::register))
        .route("/api/users/me", get(auth::me))
        .route("/api/users/owners", get(auth::list_owners))
        .route("/api/horses", get(horses::list).post(horses::create))
        .route("/api/horses/count", get(horses::count))
        .route("/api/horses/{id}", get(horses::get_one))
        .route("/api/horses/{id}/passport", get(horses::passport))
        .route("/api/horses/{id}/passport.txt", get(horses::passport_text))
        .route("/api/horses/{id}/documents", get(documents::list).post(documents::upload))
        .route("/api/documents/{id}/download", get(documents::download))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), guard::route_guard))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound { code: "not_found".into(), message: format!("no route for {}", uri.path()) }
}

fn log_startup(cfg: &ServerConfig) {
    let cwd = std::env::current_dir().ok();
    info!(
        target: "startup",
        "vetsense starting: listen={}, data_dir={:?}, cwd={:?}, session_ttl_secs={}, cookie_secure={}, max_upload_bytes={}",
        cfg.listen_addr(), cfg.data_dir, cwd, cfg.session.ttl.as_secs(), cfg.cookie_secure, cfg.max_upload_bytes
    );
}

/// Open the store under `cfg.data_dir`, mount all routes and serve until shutdown.
pub async fn run_with_config(cfg: ServerConfig) -> anyhow::Result<()> {
    log_startup(&cfg);
    let store = SharedStore::open(&cfg.data_dir)
        .with_context(|| format!("While opening record store at {}", cfg.data_dir.display()))?;
    {
        let guard = store.0.lock();
        info!(
            target: "startup",
            "records loaded: users={}, horses={}, documents={}",
            guard.count_users(None), guard.count_horses(None), guard.count_documents(None)
        );
    }

    let app = build_router(AppState::new(store, &cfg));
    let addr = cfg.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Starting server on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

pub(crate) fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    for cookie in headers.get_all("cookie") {
        let Ok(s) = cookie.to_str() else { continue; };
        for part in s.split(';') {
            let p = part.trim();
            if let Some((k, v)) = p.split_once('=') {
                if k == name { return Some(v.to_string()); }
            }
        }
    }
    None
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get("authorization")?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") { Some(token.trim().to_string()) } else { None }
}

/// Session token from the cookie, else from an `Authorization: Bearer` header.
pub fn request_token(headers: &HeaderMap) -> Option<String> {
    parse_cookie(headers, SESSION_COOKIE).or_else(|| bearer_token(headers))
}

pub(crate) fn session_cookie(token: &str, max_age_secs: u64, secure: bool) -> Result<HeaderValue, AppError> {
    let secure = if secure { "; Secure" } else { "" };
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE}={token}; HttpOnly; SameSite=Lax; Path=/; Max-Age={max_age_secs}{secure}"
    ))
    .map_err(|_| AppError::internal("cookie_error", "could not build session cookie"))
}

pub(crate) fn clear_session_cookie(secure: bool) -> HeaderValue {
    let value = if secure {
        "vetsense_session=deleted; HttpOnly; SameSite=Lax; Path=/; Max-Age=0; Secure"
    } else {
        "vetsense_session=deleted; HttpOnly; SameSite=Lax; Path=/; Max-Age=0"
    };
    HeaderValue::from_static(value)
}
