//! # Kode Store
//!
//! The storage component for **Kode** keeps all accounts and the global settings in a single JSON
//! file. Accounts without per-account overrides are stored as plain `name -> secret` pairs, which
//! keeps exported backups readable by other tools.

#![deny(rust_2018_idioms, clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Duration, Local, Utc};
use directories::ProjectDirs;
use kode_core::{Account, Overrides, Settings};
use serde::{Deserialize, Serialize};

/// Name of the backup file, placed next to the store.
pub const BACKUP_FILE: &str = "backup.json";

/// Errors that can occur when loading or saving the store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failed to find the home directory of the executing user.
    #[error("failed to find the home folder")]
    HomefolderNotFound,
    /// An I/O related error happened.
    #[error("I/O bound error")]
    Io(#[from] std::io::Error),
    /// Encoding or decoding of JSON data failed.
    #[error("JSON (de-)serialization failed")]
    Json(#[from] serde_json::Error),
    /// Imported data was valid JSON but not a mapping of account names to secrets.
    #[error("invalid backup format, expected an object of accounts")]
    InvalidFormat,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum Entry {
    Plain(String),
    Full {
        secret: String,
        #[serde(flatten)]
        overrides: Overrides,
    },
}

impl Entry {
    fn into_account(self, name: String) -> Account {
        match self {
            Self::Plain(secret) => Account::new(name, normalize_secret(&secret)),
            Self::Full { secret, overrides } => Account {
                name,
                secret: normalize_secret(&secret),
                overrides,
            },
        }
    }
}

impl From<&Account> for Entry {
    fn from(a: &Account) -> Self {
        if a.overrides.is_empty() {
            Self::Plain(a.secret.clone())
        } else {
            Self::Full {
                secret: a.secret.clone(),
                overrides: a.overrides.clone(),
            }
        }
    }
}

#[derive(Default, Serialize, Deserialize)]
struct Data {
    #[serde(default)]
    accounts: BTreeMap<String, Entry>,
    #[serde(default)]
    settings: Settings,
}

#[derive(Serialize)]
struct Backup<'a> {
    accounts: &'a BTreeMap<String, Entry>,
    settings: &'a Settings,
    timestamp: DateTime<Utc>,
}

#[derive(Deserialize)]
struct BackupStamp {
    timestamp: DateTime<Utc>,
}

/// The account store together with the global settings.
pub struct Store {
    path: PathBuf,
    accounts: BTreeMap<String, Account>,
    settings: Settings,
}

impl Store {
    /// Default location of the store file in the user's data directory.
    pub fn default_path() -> Result<PathBuf, Error> {
        Ok(ProjectDirs::from("org", "kode", "kode")
            .ok_or(Error::HomefolderNotFound)?
            .data_dir()
            .join("store.json"))
    }

    /// Open the store at the given path. A missing file results in an empty store with default
    /// settings, which is only written on the next [`save`](Self::save).
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, Error> {
        let path = path.into();

        let data = if path.exists() {
            let file = BufReader::new(File::open(&path)?);
            serde_json::from_reader::<_, Data>(file)?
        } else {
            tracing::debug!(path = %path.display(), "no store found, starting empty");
            Data::default()
        };

        Ok(Self {
            path,
            accounts: data
                .accounts
                .into_iter()
                .map(|(name, entry)| (name.clone(), entry.into_account(name)))
                .collect(),
            settings: data.settings,
        })
    }

    /// Write the store back to disk, replacing the previous content atomically. Creates a backup
    /// afterwards, if enabled in the settings and the last one is older than a day.
    pub fn save(&self) -> Result<(), Error> {
        let data = Data {
            accounts: self.entries(),
            settings: self.settings.clone(),
        };

        write_json(&self.path, &data)?;
        tracing::debug!(path = %self.path.display(), accounts = self.accounts.len(), "store saved");

        if self.settings.auto_backup {
            self.backup_if_due(Utc::now())?;
        }

        Ok(())
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Account> {
        self.accounts.get(name)
    }

    /// All accounts, ordered by name.
    #[must_use]
    pub fn list(&self) -> &BTreeMap<String, Account> {
        &self.accounts
    }

    /// Add an account, replacing any existing account with the same name. Whitespace is removed
    /// from the secret.
    pub fn insert(&mut self, mut account: Account) -> Option<Account> {
        account.secret = normalize_secret(&account.secret);
        self.accounts.insert(account.name.clone(), account)
    }

    /// Remove an account, returning whether it existed.
    pub fn remove(&mut self, name: &str) -> bool {
        self.accounts.remove(name).is_some()
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: Settings) {
        self.settings = settings;
    }

    /// Serialize all accounts as pretty printed JSON object.
    pub fn export_json(&self) -> Result<String, Error> {
        serde_json::to_string_pretty(&self.entries()).map_err(Into::into)
    }

    /// Merge the accounts of a JSON export into this store. Imported accounts replace existing
    /// ones of the same name. Returns the amount of imported accounts.
    pub fn import_json(&mut self, content: &str) -> Result<usize, Error> {
        let value = serde_json::from_str::<serde_json::Value>(content)?;
        if !value.is_object() {
            return Err(Error::InvalidFormat);
        }

        let imported = serde_json::from_value::<BTreeMap<String, Entry>>(value)?;
        let count = imported.len();

        for (name, entry) in imported {
            self.accounts.insert(name.clone(), entry.into_account(name));
        }

        tracing::info!(count, "imported accounts");

        Ok(count)
    }

    /// Write a backup of accounts and settings if none exists yet or the last one is at least a day
    /// older than `now`. Returns whether a backup was written.
    pub fn backup_if_due(&self, now: DateTime<Utc>) -> Result<bool, Error> {
        let path = self.backup_path();

        if let Some(last) = last_backup(&path)? {
            if now - last < Duration::days(1) {
                return Ok(false);
            }
        }

        let entries = self.entries();
        write_json(
            &path,
            &Backup {
                accounts: &entries,
                settings: &self.settings,
                timestamp: now,
            },
        )?;
        tracing::debug!(path = %path.display(), %now, "backup written");

        Ok(true)
    }

    fn backup_path(&self) -> PathBuf {
        self.path.with_file_name(BACKUP_FILE)
    }

    fn entries(&self) -> BTreeMap<String, Entry> {
        self.accounts
            .iter()
            .map(|(name, account)| (name.clone(), account.into()))
            .collect()
    }
}

/// File name for exports, like `authenticator-backup-2024-01-31.json`.
#[must_use]
pub fn export_name() -> String {
    format!(
        "authenticator-backup-{}.json",
        Local::now().date_naive().format("%Y-%m-%d")
    )
}

/// Remove all whitespace from a secret, as often found in secrets copied from web pages.
#[must_use]
pub fn normalize_secret(secret: &str) -> String {
    secret.chars().filter(|c| !c.is_whitespace()).collect()
}

fn last_backup(path: &Path) -> Result<Option<DateTime<Utc>>, Error> {
    if !path.exists() {
        return Ok(None);
    }

    let file = BufReader::new(File::open(path)?);
    match serde_json::from_reader::<_, BackupStamp>(file) {
        Ok(stamp) => Ok(Some(stamp.timestamp)),
        Err(e) => {
            tracing::warn!(error = %e, "unreadable backup, replacing it");
            Ok(None)
        }
    }
}

fn write_json(path: &Path, value: &impl Serialize) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp = path.with_extension("json.tmp");
    {
        let mut file = BufWriter::new(File::create(&tmp)?);
        serde_json::to_writer_pretty(&mut file, value)?;
        file.flush()?;
    }

    fs::rename(tmp, path).map_err(Into::into)
}
