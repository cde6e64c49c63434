//!
//! vetsense seed binary
//! --------------------
//! Populates a data directory with demo accounts (one per role) and a few
//! horses for the demo owner. Existing accounts are left untouched, so the
//! tool can be re-run safely.
//!
//! Usage: vetsense_seed [--data-dir <dir>] [--password <pw>]

use std::env;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

use vetsense::identity::Role;
use vetsense::security::hash_password;
use vetsense::storage::{NewHorse, NewUser, Store};

const DEFAULT_PASSWORD: &str = "vetsense-demo";

fn parse_arg(args: &[String], flag: &str) -> Option<String> {
    let mut i = 0;
    while i < args.len() {
        if args[i] == flag && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
        i += 1;
    }
    None
}

fn ensure_user(store: &mut Store, email: &str, name: &str, role: Role, password: &str) -> Result<String> {
    if let Some(existing) = store.find_user_by_email(email) {
        info!(target: "seed", "user exists email={} role={}", email, existing.role);
        return Ok(existing.id.clone());
    }
    let user = store.create_user(NewUser {
        email: email.to_string(),
        name: name.to_string(),
        password_hash: hash_password(password)?,
        role,
    })?;
    info!(target: "seed", "created user email={} role={}", email, role);
    Ok(user.id)
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).init();

    let args: Vec<String> = env::args().collect();
    let data_dir = parse_arg(&args, "--data-dir")
        .or_else(|| env::var("VETSENSE_DATA_DIR").ok())
        .unwrap_or_else(|| "data".to_string());
    let password = parse_arg(&args, "--password").unwrap_or_else(|| DEFAULT_PASSWORD.to_string());

    let mut store = Store::open(&data_dir).with_context(|| format!("opening data dir {data_dir}"))?;
    ensure_user(&mut store, "vet@vetsense.local", "Dr. Vera Hoof", Role::Vet, &password)?;
    ensure_user(&mut store, "admin@vetsense.local", "Site Admin", Role::Admin, &password)?;
    let owner_id = ensure_user(&mut store, "owner@vetsense.local", "Olive Stable", Role::Owner, &password)?;

    if store.count_horses(Some(&owner_id)) == 0 {
        let demo = [
            ("Juniper", "Haflinger", "chestnut", "mare", NaiveDate::from_ymd_opt(2016, 5, 12), "985141000000001"),
            ("Brandy", "Welsh Cob", "bay", "gelding", NaiveDate::from_ymd_opt(2012, 3, 3), "985141000000002"),
        ];
        for (name, breed, color, sex, dob, chip) in demo {
            let horse = store.create_horse(
                NewHorse {
                    name: name.to_string(),
                    breed: Some(breed.to_string()),
                    color: Some(color.to_string()),
                    sex: Some(sex.to_string()),
                    date_of_birth: dob,
                    microchip_number: Some(chip.to_string()),
                    owner_id: None,
                },
                &owner_id,
            )?;
            info!(target: "seed", "created horse name={} passport={}", horse.name, horse.passport_number);
        }
    }

    println!("Seeded {} (password for demo accounts: {})", store.root_path().display(), password);
    Ok(())
}
