use std::fmt::Write as _;

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::identity::{Identity, Role};
use crate::storage::{Document, Horse, NewHorse};

use super::guard::SessionIdentity;
use super::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct PassportOwner {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// Read-only passport projection of a horse, its owner and its documents.
#[derive(Debug, Clone, Serialize)]
pub struct Passport {
    pub passport_number: String,
    pub issued_at: DateTime<Utc>,
    pub horse: Horse,
    pub owner: Option<PassportOwner>,
    pub documents: Vec<Document>,
}

fn owner_scope(identity: &Identity) -> Option<&str> {
    if identity.role.sees_all_records() { None } else { Some(identity.subject_id.as_str()) }
}

/// Fetch a horse the caller may see: 404 when absent, 403 when it belongs to another owner.
pub(crate) fn load_visible_horse(state: &AppState, identity: &Identity, id: &str) -> AppResult<Horse> {
    let horse = state
        .store
        .0
        .lock()
        .find_horse(id)
        .cloned()
        .ok_or_else(|| AppError::not_found("horse_not_found", "horse not found"))?;
    if !identity.can_access_owned(&horse.owner_id) {
        return Err(AppError::forbidden("forbidden", "horse belongs to another owner"));
    }
    Ok(horse)
}

pub async fn list(State(state): State<AppState>, SessionIdentity(identity): SessionIdentity) -> Json<Vec<Horse>> {
    let guard = state.store.0.lock();
    Json(guard.list_horses(owner_scope(&identity)).into_iter().cloned().collect())
}

pub async fn count(State(state): State<AppState>, SessionIdentity(identity): SessionIdentity) -> Json<Value> {
    let n = state.store.0.lock().count_horses(owner_scope(&identity));
    Json(json!({"count": n}))
}

pub async fn create(
    State(state): State<AppState>,
    SessionIdentity(identity): SessionIdentity,
    Json(payload): Json<NewHorse>,
) -> AppResult<(StatusCode, Json<Horse>)> {
    let requested_owner = payload.owner_id.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
    let owner_id = match identity.role {
        Role::Owner => {
            if requested_owner.as_ref().is_some_and(|o| *o != identity.subject_id) {
                return Err(AppError::forbidden("forbidden", "owners can only register their own horses"));
            }
            identity.subject_id.clone()
        }
        Role::Vet | Role::Admin => requested_owner
            .ok_or_else(|| AppError::user("owner_required", "owner_id is required"))?,
    };

    let mut guard = state.store.0.lock();
    match guard.find_user(&owner_id) {
        Some(u) if u.role == Role::Owner => {}
        _ => return Err(AppError::user("unknown_owner", "owner_id must reference an OWNER account")),
    }
    let horse = guard.create_horse(payload, &owner_id)?;
    info!(target: "vetsense::horses", "horse created id={} owner={} by={}", horse.id, horse.owner_id, identity.subject_id);
    Ok((StatusCode::CREATED, Json(horse)))
}

pub async fn get_one(
    State(state): State<AppState>,
    SessionIdentity(identity): SessionIdentity,
    Path(id): Path<String>,
) -> AppResult<Json<Horse>> {
    load_visible_horse(&state, &identity, &id).map(Json)
}

fn build_passport(state: &AppState, identity: &Identity, id: &str) -> AppResult<Passport> {
    let horse = load_visible_horse(state, identity, id)?;
    let guard = state.store.0.lock();
    let owner = guard.find_user(&horse.owner_id).map(|u| PassportOwner {
        id: u.id.clone(),
        name: u.name.clone(),
        email: u.email.clone(),
    });
    let documents = guard.list_documents(&horse.id).into_iter().cloned().collect();
    Ok(Passport {
        passport_number: horse.passport_number.clone(),
        issued_at: Utc::now(),
        horse,
        owner,
        documents,
    })
}

pub async fn passport(
    State(state): State<AppState>,
    SessionIdentity(identity): SessionIdentity,
    Path(id): Path<String>,
) -> AppResult<Json<Passport>> {
    build_passport(&state, &identity, &id).map(Json)
}

pub async fn passport_text(
    State(state): State<AppState>,
    SessionIdentity(identity): SessionIdentity,
    Path(id): Path<String>,
) -> AppResult<(HeaderMap, String)> {
    let passport = build_passport(&state, &identity, &id)?;
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    // Passport numbers are generated as VS-NNNNNN, always header-safe
    let disposition = format!("attachment; filename=\"passport-{}.txt\"", passport.passport_number);
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&disposition).map_err(|_| AppError::internal("header_error", "invalid passport number"))?,
    );
    Ok((headers, render_passport(&passport)))
}

fn opt(v: &Option<String>) -> &str {
    v.as_deref().unwrap_or("-")
}

/// Plain-text passport rendering.
pub fn render_passport(p: &Passport) -> String {
    let mut out = String::new();
    let h = &p.horse;
    let _ = writeln!(out, "VETSENSE EQUINE PASSPORT");
    let _ = writeln!(out, "Passport number: {}", p.passport_number);
    let _ = writeln!(out, "Issued: {}", p.issued_at.format("%Y-%m-%d %H:%M UTC"));
    let _ = writeln!(out);
    let _ = writeln!(out, "Horse");
    let _ = writeln!(out, "  Name: {}", h.name);
    let _ = writeln!(out, "  Breed: {}", opt(&h.breed));
    let _ = writeln!(out, "  Color: {}", opt(&h.color));
    let _ = writeln!(out, "  Sex: {}", opt(&h.sex));
    let dob = h.date_of_birth.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_else(|| "-".to_string());
    let _ = writeln!(out, "  Date of birth: {}", dob);
    let _ = writeln!(out, "  Microchip: {}", opt(&h.microchip_number));
    let _ = writeln!(out);
    let _ = writeln!(out, "Owner");
    match &p.owner {
        Some(o) => {
            let _ = writeln!(out, "  Name: {}", o.name);
            let _ = writeln!(out, "  Email: {}", o.email);
        }
        None => {
            let _ = writeln!(out, "  (unknown)");
        }
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Documents ({})", p.documents.len());
    for d in &p.documents {
        let _ = writeln!(
            out,
            "  - {} ({}, {} bytes, {})",
            d.file_name, d.content_type, d.size_bytes, d.created_at.format("%Y-%m-%d")
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn text_passport_lists_fields_and_documents() {
        let now = Utc::now();
        let p = Passport {
            passport_number: "VS-000042".into(),
            issued_at: now,
            horse: Horse {
                id: "h1".into(),
                name: "Storm".into(),
                breed: Some("Arabian".into()),
                color: None,
                sex: Some("mare".into()),
                date_of_birth: NaiveDate::from_ymd_opt(2015, 4, 2),
                microchip_number: None,
                passport_number: "VS-000042".into(),
                owner_id: "o1".into(),
                created_at: now,
            },
            owner: Some(PassportOwner { id: "o1".into(), name: "Ann".into(), email: "ann@example.com".into() }),
            documents: vec![Document {
                id: "d1".into(),
                horse_id: "h1".into(),
                uploaded_by: "v1".into(),
                file_name: "vaccination.pdf".into(),
                content_type: "application/pdf".into(),
                size_bytes: 1234,
                created_at: now,
            }],
        };
        let text = render_passport(&p);
        assert!(text.contains("Passport number: VS-000042"));
        assert!(text.contains("Breed: Arabian"));
        assert!(text.contains("Color: -"));
        assert!(text.contains("Date of birth: 2015-04-02"));
        assert!(text.contains("Email: ann@example.com"));
        assert!(text.contains("Documents (1)"));
        assert!(text.contains("vaccination.pdf (application/pdf, 1234 bytes"));
    }
}
