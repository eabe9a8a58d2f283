//! Per-user state store backed by flat JSON documents.
//!
//! Each document (`users.json`, `user_settings.json`, ...) is loaded once,
//! kept in memory behind a mutex and rewritten wholesale after every
//! mutation. A mutation runs on a copy of the document; the copy is written
//! to a temporary file in the data directory and renamed over the old file,
//! and only then replaces the in-memory state. Writers for the same document
//! are serialized, so no update is lost.
//!
//! Unreadable documents (missing, invalid UTF-8, corrupt JSON) are treated
//! as empty.
//!
//! Writes block on `fsync`; async handlers go through [`run_blocking`].

use chrono::NaiveDateTime;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::errors::{error_logging, AppError, AppResult};
use crate::observability;

pub const USERS_FILE: &str = "users.json";
pub const ADMINS_FILE: &str = "admins.json";
pub const SETTINGS_FILE: &str = "user_settings.json";
pub const PROFILES_FILE: &str = "user_profile.json";
pub const REMINDERS_FILE: &str = "reminders.json";
pub const HISTORY_FILE: &str = "history.json";

/// Entries shown by the history button
pub const HISTORY_LIMIT: usize = 5;

/// Skin types offered by the personalization flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkinType {
    Dry,
    Oily,
    Combination,
}

impl SkinType {
    pub const ALL: [SkinType; 3] = [SkinType::Dry, SkinType::Oily, SkinType::Combination];

    /// Interpret a free-text answer ("Сухая", "oily", "комбинированная.")
    pub fn from_user_input(input: &str) -> Option<Self> {
        let normalized = input
            .trim()
            .trim_end_matches(['.', '!', ')'])
            .trim()
            .to_lowercase();

        match normalized.as_str() {
            "dry" | "сухая" | "сухой" => Some(SkinType::Dry),
            "oily" | "жирная" | "жирный" => Some(SkinType::Oily),
            "combination" | "combined" | "комбинированная" | "комбинированный"
            | "смешанная" => Some(SkinType::Combination),
            _ => None,
        }
    }

    /// Localization key naming this skin type
    pub fn message_key(&self) -> &'static str {
        match self {
            SkinType::Dry => "skin-dry",
            SkinType::Oily => "skin-oily",
            SkinType::Combination => "skin-combination",
        }
    }
}

/// Mood reported through the mood flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Good,
    #[default]
    Normal,
    Bad,
}

/// Skin profile of a user
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Profile {
    /// Unrecognized legacy values are read as "not set"
    #[serde(default, deserialize_with = "lenient_skin_type")]
    pub skin: Option<SkinType>,
}

/// Layout of `users.json`: user id → display name
///
/// Older files store `true` instead of a name; those users are kept with an
/// empty name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
struct UserDirectory {
    #[serde(deserialize_with = "lenient_user_names")]
    names: HashMap<String, String>,
}

fn lenient_user_names<'de, D>(deserializer: D) -> Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = HashMap::<String, serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(id, value)| match value {
            serde_json::Value::String(name) => (id, name),
            _ => (id, String::new()),
        })
        .collect())
}

fn lenient_skin_type<'de, D>(deserializer: D) -> Result<Option<SkinType>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(SkinType::from_user_input))
}

/// Reply preferences of a user
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub voice: bool,
    #[serde(default)]
    pub mood: Mood,
}

/// A daily reminder, `time` is always zero-padded `HH:MM`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub time: String,
    pub text: String,
}

/// One answered analysis or consultation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(rename = "q")]
    pub question: String,
    #[serde(rename = "a")]
    pub answer: String,
    pub at: NaiveDateTime,
}

/// Layout of `history.json`: user id → entries, plus the seen-facts key
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryDocument {
    /// User id → indices of facts already shown in the current round
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub facts: HashMap<String, Vec<usize>>,
    #[serde(flatten)]
    pub entries: HashMap<String, Vec<HistoryEntry>>,
}

/// Aggregate numbers for the admin `/stats` command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    pub users: usize,
    pub reminder_users: usize,
    pub reminders: usize,
}

/// A single JSON document with serialized read-modify-write access
#[derive(Debug)]
pub struct Document<D> {
    name: &'static str,
    path: PathBuf,
    data: Mutex<D>,
}

impl<D> Document<D>
where
    D: Default + Clone + Serialize + DeserializeOwned,
{
    /// Load `file_name` from `dir`, falling back to an empty document
    pub fn open(dir: &Path, file_name: &'static str) -> Self {
        let path = dir.join(file_name);
        let data = Self::load(file_name, &path);
        Self {
            name: file_name,
            path,
            data: Mutex::new(data),
        }
    }

    fn load(name: &str, path: &Path) -> D {
        let _span = observability::storage_span("load", name).entered();

        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Document not found, starting empty");
                return D::default();
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Document unreadable, treating as empty");
                observability::record_storage_error(name, "load");
                return D::default();
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(data) => data,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Document corrupt, treating as empty");
                observability::record_storage_error(name, "load");
                D::default()
            }
        }
    }

    /// Read the document under its lock
    pub fn read<R>(&self, f: impl FnOnce(&D) -> R) -> R {
        let data = self.data.lock();
        f(&data)
    }

    /// Apply `f` and persist the result; on failure nothing changes
    pub fn update<R>(&self, f: impl FnOnce(&mut D) -> R) -> AppResult<R> {
        let _span = observability::storage_span("update", self.name).entered();

        let mut data = self.data.lock();
        let mut working = data.clone();
        let result = f(&mut working);

        if let Err(e) = self.persist(&working) {
            error_logging::log_storage_error(&e, "persist", self.name, None);
            observability::record_storage_error(self.name, "persist");
            return Err(e);
        }

        *data = working;
        Ok(result)
    }

    fn persist(&self, data: &D) -> AppResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let json = serde_json::to_vec_pretty(data)?;

        let mut temp_file = NamedTempFile::new_in(&dir)?;
        temp_file.write_all(&json)?;
        temp_file.as_file().sync_all()?;
        temp_file
            .persist(&self.path)
            .map_err(|e| AppError::Storage(format!("{}: {}", self.path.display(), e.error)))?;

        debug!(path = %self.path.display(), bytes = json.len(), "Document persisted");
        Ok(())
    }
}

/// Run blocking store work (file writes and `fsync`) on tokio's blocking pool
pub async fn run_blocking<R, F>(store: &Arc<StateStore>, f: F) -> AppResult<R>
where
    F: FnOnce(&StateStore) -> AppResult<R> + Send + 'static,
    R: Send + 'static,
{
    let store = Arc::clone(store);
    tokio::task::spawn_blocking(move || f(&store))
        .await
        .map_err(|e| AppError::Internal(format!("State store task failed: {}", e)))?
}

fn key(user_id: i64) -> String {
    user_id.to_string()
}

/// All per-user state of the assistant
#[derive(Debug)]
pub struct StateStore {
    users: Document<UserDirectory>,
    admins: Document<HashMap<String, bool>>,
    profiles: Document<HashMap<String, Profile>>,
    settings: Document<HashMap<String, Settings>>,
    reminders: Document<HashMap<String, Vec<Reminder>>>,
    history: Document<HistoryDocument>,
}

impl StateStore {
    /// Open (or lazily create) every document in `data_dir`
    pub fn open(data_dir: impl AsRef<Path>) -> AppResult<Self> {
        let dir = data_dir.as_ref();
        fs::create_dir_all(dir)?;

        Ok(Self {
            users: Document::open(dir, USERS_FILE),
            admins: Document::open(dir, ADMINS_FILE),
            profiles: Document::open(dir, PROFILES_FILE),
            settings: Document::open(dir, SETTINGS_FILE),
            reminders: Document::open(dir, REMINDERS_FILE),
            history: Document::open(dir, HISTORY_FILE),
        })
    }

    /// Record a user on first contact; returns true when the user is new
    pub fn register_user(&self, user_id: i64, display_name: &str) -> AppResult<bool> {
        self.users.update(|users| {
            users
                .names
                .insert(key(user_id), display_name.to_string())
                .is_none()
        })
    }

    /// Stored display name; `None` for unknown users and legacy entries
    pub fn display_name(&self, user_id: i64) -> Option<String> {
        self.users.read(|users| {
            users
                .names
                .get(&key(user_id))
                .filter(|name| !name.is_empty())
                .cloned()
        })
    }

    pub fn user_count(&self) -> usize {
        self.users.read(|users| users.names.len())
    }

    /// The master admin is always an admin, others come from `admins.json`
    pub fn is_admin(&self, user_id: i64, master_admin_id: i64) -> bool {
        user_id == master_admin_id
            || self
                .admins
                .read(|admins| admins.get(&key(user_id)).copied().unwrap_or(false))
    }

    pub fn add_admin(&self, user_id: i64) -> AppResult<()> {
        self.admins.update(|admins| {
            admins.insert(key(user_id), true);
        })
    }

    pub fn profile(&self, user_id: i64) -> Option<Profile> {
        self.profiles
            .read(|profiles| profiles.get(&key(user_id)).cloned())
    }

    pub fn set_skin_type(&self, user_id: i64, skin: SkinType) -> AppResult<()> {
        self.profiles.update(|profiles| {
            profiles.entry(key(user_id)).or_default().skin = Some(skin);
        })
    }

    /// Settings of a user, defaults when none were stored
    pub fn settings(&self, user_id: i64) -> Settings {
        self.settings
            .read(|settings| settings.get(&key(user_id)).copied().unwrap_or_default())
    }

    pub fn set_voice(&self, user_id: i64, voice: bool) -> AppResult<()> {
        self.settings.update(|settings| {
            settings.entry(key(user_id)).or_default().voice = voice;
        })
    }

    pub fn set_mood(&self, user_id: i64, mood: Mood) -> AppResult<()> {
        self.settings.update(|settings| {
            settings.entry(key(user_id)).or_default().mood = mood;
        })
    }

    /// Append a reminder; returns how many reminders the user now has
    pub fn add_reminder(&self, user_id: i64, reminder: Reminder) -> AppResult<usize> {
        self.reminders.update(|reminders| {
            let list = reminders.entry(key(user_id)).or_default();
            list.push(reminder);
            list.len()
        })
    }

    /// Snapshot of every stored reminder with its owner
    pub fn all_reminders(&self) -> Vec<(i64, Reminder)> {
        self.reminders.read(|reminders| {
            let mut all = Vec::new();
            for (user_key, list) in reminders {
                match user_key.parse::<i64>() {
                    Ok(user_id) => all.extend(list.iter().cloned().map(|r| (user_id, r))),
                    Err(_) => warn!(key = %user_key, "Skipping reminders under a non-numeric key"),
                }
            }
            all
        })
    }

    pub fn append_history(
        &self,
        user_id: i64,
        question: &str,
        answer: &str,
        at: NaiveDateTime,
    ) -> AppResult<()> {
        self.history.update(|history| {
            history
                .entries
                .entry(key(user_id))
                .or_default()
                .push(HistoryEntry {
                    question: question.to_string(),
                    answer: answer.to_string(),
                    at,
                });
        })
    }

    /// The `limit` most recent entries, oldest first
    pub fn recent_history(&self, user_id: i64, limit: usize) -> Vec<HistoryEntry> {
        self.history.read(|history| {
            history
                .entries
                .get(&key(user_id))
                .map(|entries| entries[entries.len().saturating_sub(limit)..].to_vec())
                .unwrap_or_default()
        })
    }

    /// Atomically read and modify the list of facts a user has seen
    pub fn with_seen_facts<R>(
        &self,
        user_id: i64,
        f: impl FnOnce(&mut Vec<usize>) -> R,
    ) -> AppResult<R> {
        self.history.update(|history| {
            let seen = history.facts.entry(key(user_id)).or_default();
            f(seen)
        })
    }

    pub fn seen_facts(&self, user_id: i64) -> Vec<usize> {
        self.history
            .read(|history| history.facts.get(&key(user_id)).cloned().unwrap_or_default())
    }

    pub fn stats(&self) -> StoreStats {
        let (reminder_users, reminders) = self.reminders.read(|reminders| {
            let users = reminders.values().filter(|list| !list.is_empty()).count();
            let total = reminders.values().map(Vec::len).sum();
            (users, total)
        });

        StoreStats {
            users: self.user_count(),
            reminder_users,
            reminders,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skin_type_from_user_input() {
        assert_eq!(SkinType::from_user_input("Сухая"), Some(SkinType::Dry));
        assert_eq!(SkinType::from_user_input("  oily "), Some(SkinType::Oily));
        assert_eq!(
            SkinType::from_user_input("комбинированная."),
            Some(SkinType::Combination)
        );
        assert_eq!(SkinType::from_user_input("normal"), None);
        assert_eq!(SkinType::from_user_input(""), None);
    }

    #[test]
    fn test_profile_reads_legacy_free_text() {
        let profile: Profile = serde_json::from_str(r#"{"skin": "Жирная"}"#).unwrap();
        assert_eq!(profile.skin, Some(SkinType::Oily));

        let unknown: Profile = serde_json::from_str(r#"{"skin": "чувствительная"}"#).unwrap();
        assert_eq!(unknown.skin, None);

        let json = serde_json::to_string(&Profile {
            skin: Some(SkinType::Combination),
        })
        .unwrap();
        assert_eq!(json, r#"{"skin":"combination"}"#);
    }

    #[test]
    fn test_partial_settings_get_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"voice": true}"#).unwrap();
        assert!(settings.voice);
        assert_eq!(settings.mood, Mood::Normal);
    }

    #[test]
    fn test_history_document_layout() {
        let raw = r#"{
            "42": [{"q": "крем?", "a": "да", "at": "2024-05-01T12:34:56.123456"}],
            "facts": {"42": [1, 3]}
        }"#;
        let doc: HistoryDocument = serde_json::from_str(raw).unwrap();
        assert_eq!(doc.entries["42"].len(), 1);
        assert_eq!(doc.entries["42"][0].question, "крем?");
        assert_eq!(doc.facts["42"], vec![1, 3]);
        assert!(!doc.entries.contains_key("facts"));
    }
}
