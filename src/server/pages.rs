//! Page descriptors. Each page is JSON describing what the screen shows; the
//! visual layer is out of scope. Every handler takes `PageAccess`, so the
//! policy is enforced here even when the router middleware is not mounted.

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::identity::{Identity, Role};

use super::auth::LOGIN_SUBMIT_PATH;
use super::guard::PageAccess;
use super::AppState;

const RECENT_HORSES: usize = 5;

fn signed_in(access: PageAccess) -> AppResult<Identity> {
    access.0.ok_or_else(|| AppError::unauthenticated("unauthenticated", "sign in required"))
}

pub async fn login_page(_access: PageAccess) -> Json<Value> {
    Json(json!({
        "page": "login",
        "action": LOGIN_SUBMIT_PATH,
        "fields": ["email", "password"],
    }))
}

pub async fn admin_dashboard(State(state): State<AppState>, access: PageAccess) -> AppResult<Json<Value>> {
    let identity = signed_in(access)?;
    let guard = state.store.0.lock();
    Ok(Json(json!({
        "page": "dashboard",
        "user": identity,
        "users": {
            "vets": guard.count_users(Some(Role::Vet)),
            "owners": guard.count_users(Some(Role::Owner)),
            "admins": guard.count_users(Some(Role::Admin)),
        },
        "horses": guard.count_horses(None),
        "documents": guard.count_documents(None),
    })))
}

pub async fn vet_dashboard(State(state): State<AppState>, access: PageAccess) -> AppResult<Json<Value>> {
    let identity = signed_in(access)?;
    let guard = state.store.0.lock();
    let mut recent = guard.list_horses(None);
    recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    recent.truncate(RECENT_HORSES);
    Ok(Json(json!({
        "page": "dashboard/vet",
        "user": identity,
        "horses": guard.count_horses(None),
        "owners": guard.count_users(Some(Role::Owner)),
        "documents": guard.count_documents(None),
        "recent_horses": recent,
    })))
}

pub async fn owner_dashboard(State(state): State<AppState>, access: PageAccess) -> AppResult<Json<Value>> {
    let identity = signed_in(access)?;
    let guard = state.store.0.lock();
    let owned = guard.list_horses(Some(&identity.subject_id));
    let horse_ids: Vec<&str> = owned.iter().map(|h| h.id.as_str()).collect();
    let documents = guard.count_documents(Some(horse_ids.as_slice()));
    let horses: Vec<Value> = owned
        .into_iter()
        .map(|h| {
            json!({
                "horse": h,
                "documents": guard.list_documents(&h.id).len(),
            })
        })
        .collect();
    Ok(Json(json!({
        "page": "dashboard/owner",
        "user": identity,
        "horses": horses,
        "documents": documents,
    })))
}
