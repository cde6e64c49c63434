//!
//! vetsense storage module
//! ------------------------
//! Flat JSON-file record store for users, horses and document metadata.
//! Layout under the configured root:
//!
//! - `users.json`, `horses.json`, `documents.json`: one JSON array each.
//! - `documents/<id>.bin`: raw bytes of each uploaded document.
//!
//! Every mutation rewrites the affected file through a temp file and rename.
//! The public API centers around the `Store` type, wrapped in a thread-safe
//! `SharedStore` (`Arc<Mutex<Store>>`) by the server.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::AppError;
use crate::identity::Role;

const USERS_FILE: &str = "users.json";
const HORSES_FILE: &str = "horses.json";
const DOCUMENTS_FILE: &str = "documents.json";
const DOCUMENTS_DIR: &str = "documents";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// User as exposed over the API (no password hash).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublicUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for PublicUser {
    fn from(u: &User) -> Self {
        Self { id: u.id.clone(), email: u.email.clone(), name: u.name.clone(), role: u.role, created_at: u.created_at }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Horse {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub breed: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub sex: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub microchip_number: Option<String>,
    pub passport_number: String,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewHorse {
    pub name: String,
    #[serde(default)]
    pub breed: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub sex: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub microchip_number: Option<String>,
    #[serde(default)]
    pub owner_id: Option<String>,
}

/// Metadata for an uploaded document; bytes live beside it on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    pub id: String,
    pub horse_id: String,
    pub uploaded_by: String,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}

/// Core on-disk record store.
pub struct Store {
    root: PathBuf,
    users: Vec<User>,
    horses: Vec<Horse>,
    documents: Vec<Document>,
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn write_json<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    let text = serde_json::to_string_pretty(rows)?;
    fs::write(&tmp, text).with_context(|| format!("writing {}", tmp.display()))?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e).with_context(|| format!("replacing {}", path.display()));
    }
    Ok(())
}

/// Append `row` and persist the list. On a failed write the row is dropped again.
fn append_row<T: Serialize>(rows: &mut Vec<T>, row: T, path: &Path) -> Result<()> {
    rows.push(row);
    if let Err(e) = write_json(path, rows) {
        rows.pop();
        return Err(e);
    }
    Ok(())
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl Store {
    /// Open (or create) a store rooted at the given folder and load all record files.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join(DOCUMENTS_DIR))
            .with_context(|| format!("creating data dir {}", root.display()))?;
        let users = load_json(&root.join(USERS_FILE))?;
        let horses = load_json(&root.join(HORSES_FILE))?;
        let documents = load_json(&root.join(DOCUMENTS_FILE))?;
        let store = Self { root, users, horses, documents };
        debug!(
            target: "vetsense::storage",
            "opened store root='{}' users={} horses={} documents={}",
            store.root.display(), store.users.len(), store.horses.len(), store.documents.len()
        );
        Ok(store)
    }

    pub fn root_path(&self) -> &Path { &self.root }

    fn document_path(&self, id: &str) -> PathBuf {
        self.root.join(DOCUMENTS_DIR).join(format!("{id}.bin"))
    }

    // --- users ---

    pub fn create_user(&mut self, new: NewUser) -> Result<User> {
        let email = normalize_email(&new.email);
        if self.users.iter().any(|u| u.email == email) {
            return Err(AppError::conflict("email_taken", "email already registered").into());
        }
        let user = User {
            id: Uuid::new_v4().to_string(),
            email,
            name: new.name.trim().to_string(),
            password_hash: new.password_hash,
            role: new.role,
            created_at: Utc::now(),
        };
        let path = self.root.join(USERS_FILE);
        append_row(&mut self.users, user.clone(), &path)?;
        debug!(target: "vetsense::storage", "create_user id={} role={}", user.id, user.role);
        Ok(user)
    }

    pub fn find_user(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn find_user_by_email(&self, email: &str) -> Option<&User> {
        let email = normalize_email(email);
        self.users.iter().find(|u| u.email == email)
    }

    pub fn users_with_role(&self, role: Role) -> Vec<&User> {
        let mut out: Vec<&User> = self.users.iter().filter(|u| u.role == role).collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    pub fn count_users(&self, role: Option<Role>) -> usize {
        self.users.iter().filter(|u| role.map_or(true, |r| u.role == r)).count()
    }

    // --- horses ---

    /// Insert a horse for `owner_id`. Callers check that the owner exists.
    pub fn create_horse(&mut self, new: NewHorse, owner_id: &str) -> Result<Horse> {
        let name = new.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::user("invalid_horse", "horse name is required").into());
        }
        let microchip_number = non_blank(new.microchip_number);
        if let Some(chip) = &microchip_number {
            if self.horses.iter().any(|h| h.microchip_number.as_deref() == Some(chip.as_str())) {
                return Err(AppError::conflict("microchip_taken", "microchip number already registered").into());
            }
        }
        let horse = Horse {
            id: Uuid::new_v4().to_string(),
            name,
            breed: non_blank(new.breed),
            color: non_blank(new.color),
            sex: non_blank(new.sex),
            date_of_birth: new.date_of_birth,
            microchip_number,
            passport_number: format!("VS-{:06}", self.horses.len() + 1),
            owner_id: owner_id.to_string(),
            created_at: Utc::now(),
        };
        let path = self.root.join(HORSES_FILE);
        append_row(&mut self.horses, horse.clone(), &path)?;
        debug!(target: "vetsense::storage", "create_horse id={} passport={}", horse.id, horse.passport_number);
        Ok(horse)
    }

    pub fn find_horse(&self, id: &str) -> Option<&Horse> {
        self.horses.iter().find(|h| h.id == id)
    }

    /// Horses sorted by name, optionally restricted to one owner.
    pub fn list_horses(&self, owner_id: Option<&str>) -> Vec<&Horse> {
        let mut out: Vec<&Horse> = self
            .horses
            .iter()
            .filter(|h| owner_id.map_or(true, |o| h.owner_id == o))
            .collect();
        out.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        out
    }

    pub fn count_horses(&self, owner_id: Option<&str>) -> usize {
        self.horses.iter().filter(|h| owner_id.map_or(true, |o| h.owner_id == o)).count()
    }

    // --- documents ---

    pub fn create_document(
        &mut self,
        horse_id: &str,
        uploaded_by: &str,
        file_name: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<Document> {
        if self.find_horse(horse_id).is_none() {
            return Err(AppError::not_found("horse_not_found", "horse not found").into());
        }
        let doc = Document {
            id: Uuid::new_v4().to_string(),
            horse_id: horse_id.to_string(),
            uploaded_by: uploaded_by.to_string(),
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
            size_bytes: bytes.len() as u64,
            created_at: Utc::now(),
        };
        // Bytes first so metadata never points at a missing file
        let path = self.document_path(&doc.id);
        fs::write(&path, bytes).with_context(|| format!("writing {}", path.display()))?;
        let meta_path = self.root.join(DOCUMENTS_FILE);
        if let Err(e) = append_row(&mut self.documents, doc.clone(), &meta_path) {
            let _ = fs::remove_file(&path);
            return Err(e);
        }
        debug!(target: "vetsense::storage", "create_document id={} horse={} size={}", doc.id, doc.horse_id, doc.size_bytes);
        Ok(doc)
    }

    pub fn find_document(&self, id: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.id == id)
    }

    /// Documents for one horse, newest first.
    pub fn list_documents(&self, horse_id: &str) -> Vec<&Document> {
        let mut out: Vec<&Document> = self.documents.iter().filter(|d| d.horse_id == horse_id).collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out
    }

    pub fn count_documents(&self, horse_ids: Option<&[&str]>) -> usize {
        self.documents
            .iter()
            .filter(|d| horse_ids.map_or(true, |ids| ids.contains(&d.horse_id.as_str())))
            .count()
    }

    pub fn read_document_bytes(&self, id: &str) -> Result<Vec<u8>> {
        let path = self.document_path(id);
        fs::read(&path).with_context(|| format!("reading {}", path.display()))
    }
}

/// Thread-safe handle shared by request handlers.
#[derive(Clone)]
pub struct SharedStore(pub Arc<Mutex<Store>>);

impl SharedStore {
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        Ok(Self(Arc::new(Mutex::new(Store::open(root)?))))
    }
}
