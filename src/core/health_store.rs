/*
 * Read-only access to the per-user health and fitness records that back the
 * virtual pages. The store is abstracted behind `HealthStoreOperations` so the
 * virtual page registry can be wired to the JSON files used in deployment or
 * to an in-memory store in tests.
 *
 * `JsonHealthStore` keeps one JSON document per user in a store directory. A
 * user without a document simply has no records yet.
 */
use super::models::{Record, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

const USER_RECORDS_EXTENSION: &str = "json";

#[derive(Debug)]
pub enum DataStoreError {
    Io(io::Error),
    Serde(serde_json::Error),
    Unavailable(String),
}

impl From<io::Error> for DataStoreError {
    fn from(err: io::Error) -> Self {
        DataStoreError::Io(err)
    }
}

impl From<serde_json::Error> for DataStoreError {
    fn from(err: serde_json::Error) -> Self {
        DataStoreError::Serde(err)
    }
}

impl std::fmt::Display for DataStoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataStoreError::Io(e) => write!(f, "Data store I/O error: {e}"),
            DataStoreError::Serde(e) => write!(f, "Malformed stored records: {e}"),
            DataStoreError::Unavailable(msg) => write!(f, "Data store unavailable: {msg}"),
        }
    }
}

impl std::error::Error for DataStoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DataStoreError::Io(e) => Some(e),
            DataStoreError::Serde(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, DataStoreError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthMetric {
    pub date: String,
    #[serde(default)]
    pub weight_kg: Option<f64>,
    #[serde(default)]
    pub body_fat_pct: Option<f64>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutEntry {
    pub date: String,
    pub workout_type: String,
    #[serde(default)]
    pub duration_min: Option<u32>,
    #[serde(default)]
    pub exercises: Vec<String>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealEntry {
    pub date: String,
    pub meal_type: String,
    pub description: String,
    #[serde(default)]
    pub calories: Option<u32>,
    #[serde(default)]
    pub protein_g: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressPhoto {
    pub date: String,
    #[serde(default)]
    pub caption: String,
    pub image_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoachingSession {
    pub date: String,
    pub coach: String,
    pub topic: String,
    #[serde(default)]
    pub summary: String,
}

impl From<&HealthMetric> for Record {
    fn from(m: &HealthMetric) -> Self {
        Record::new()
            .with("date", m.date.clone())
            .with_opt("weight_kg", m.weight_kg)
            .with_opt("body_fat_pct", m.body_fat_pct)
            .with("notes", m.notes.clone())
    }
}

impl From<&WorkoutEntry> for Record {
    fn from(w: &WorkoutEntry) -> Self {
        Record::new()
            .with("date", w.date.clone())
            .with("workout_type", w.workout_type.clone())
            .with_opt("duration_min", w.duration_min)
            .with("exercises", w.exercises.join(", "))
            .with("notes", w.notes.clone())
    }
}

impl From<&MealEntry> for Record {
    fn from(m: &MealEntry) -> Self {
        Record::new()
            .with("date", m.date.clone())
            .with("meal_type", m.meal_type.clone())
            .with("description", m.description.clone())
            .with_opt("calories", m.calories)
            .with_opt("protein_g", m.protein_g)
    }
}

impl From<&ProgressPhoto> for Record {
    fn from(p: &ProgressPhoto) -> Self {
        Record::new()
            .with("date", p.date.clone())
            .with("caption", p.caption.clone())
            .with("image_path", p.image_path.clone())
    }
}

impl From<&CoachingSession> for Record {
    fn from(c: &CoachingSession) -> Self {
        Record::new()
            .with("date", c.date.clone())
            .with("coach", c.coach.clone())
            .with("topic", c.topic.clone())
            .with("summary", c.summary.clone())
    }
}

/*
 * Everything stored for one user. Missing collections deserialize as empty so
 * a partially filled document is still valid.
 */
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserHealthRecords {
    #[serde(default)]
    pub health_metrics: Vec<HealthMetric>,
    #[serde(default)]
    pub workouts: Vec<WorkoutEntry>,
    #[serde(default)]
    pub meals: Vec<MealEntry>,
    #[serde(default)]
    pub progress_photos: Vec<ProgressPhoto>,
    #[serde(default)]
    pub coaching_sessions: Vec<CoachingSession>,
}

impl UserHealthRecords {
    /*
     * Orders every collection newest first. Dates are ISO-8601 strings, so a
     * lexicographic comparison is a chronological one. The sort is stable,
     * keeping same-day entries in stored order.
     */
    pub fn sort_newest_first(&mut self) {
        self.health_metrics.sort_by(|a, b| b.date.cmp(&a.date));
        self.workouts.sort_by(|a, b| b.date.cmp(&a.date));
        self.meals.sort_by(|a, b| b.date.cmp(&a.date));
        self.progress_photos.sort_by(|a, b| b.date.cmp(&a.date));
        self.coaching_sessions.sort_by(|a, b| b.date.cmp(&a.date));
    }
}

pub trait HealthStoreOperations: Send + Sync {
    /*
     * Loads all records owned by `user`, newest first. Records belonging to
     * any other user must never be returned.
     */
    fn user_records(&self, user: &UserId) -> Result<UserHealthRecords>;
}

/*
 * File stem for a user's record document. Bytes outside `[a-z0-9_-]` are
 * written as `%XX` (upper-case hex), so distinct ids always get distinct stems,
 * also on case-insensitive file systems.
 */
pub fn encode_user_id(user: &UserId) -> String {
    let mut encoded = String::with_capacity(user.as_str().len());
    for byte in user.as_str().bytes() {
        match byte {
            b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-' => encoded.push(char::from(byte)),
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }
    encoded
}

pub struct JsonHealthStore {
    store_dir: PathBuf,
}

impl JsonHealthStore {
    pub fn new(store_dir: PathBuf) -> Self {
        JsonHealthStore { store_dir }
    }

    pub fn store_dir(&self) -> &Path {
        &self.store_dir
    }

    fn user_file_path(&self, user: &UserId) -> Option<PathBuf> {
        let stem = encode_user_id(user);
        if stem.is_empty() {
            return None;
        }
        Some(self.store_dir.join(format!("{stem}.{USER_RECORDS_EXTENSION}")))
    }
}

impl HealthStoreOperations for JsonHealthStore {
    fn user_records(&self, user: &UserId) -> Result<UserHealthRecords> {
        log::trace!("JsonHealthStore: Loading records for user '{user}'");
        if !self.store_dir.is_dir() {
            return Err(DataStoreError::Unavailable(format!(
                "store directory {:?} is missing",
                self.store_dir
            )));
        }

        let Some(file_path) = self.user_file_path(user) else {
            log::warn!("JsonHealthStore: Empty user id has no record file.");
            return Ok(UserHealthRecords::default());
        };
        if !file_path.exists() {
            log::debug!("JsonHealthStore: No record file {file_path:?}; user has no data yet.");
            return Ok(UserHealthRecords::default());
        }

        let file = File::open(&file_path)?;
        let reader = BufReader::new(file);
        let mut records: UserHealthRecords = serde_json::from_reader(reader)?;
        records.sort_newest_first();
        log::debug!(
            "JsonHealthStore: Loaded {} metrics, {} workouts, {} meals, {} photos, {} sessions from {file_path:?}.",
            records.health_metrics.len(),
            records.workouts.len(),
            records.meals.len(),
            records.progress_photos.len(),
            records.coaching_sessions.len()
        );
        Ok(records)
    }
}

#[derive(Default)]
pub struct InMemoryHealthStore {
    users: HashMap<UserId, UserHealthRecords>,
}

impl InMemoryHealthStore {
    pub fn new() -> Self {
        InMemoryHealthStore::default()
    }

    pub fn insert(&mut self, user: UserId, mut records: UserHealthRecords) {
        records.sort_newest_first();
        self.users.insert(user, records);
    }
}

impl HealthStoreOperations for InMemoryHealthStore {
    fn user_records(&self, user: &UserId) -> Result<UserHealthRecords> {
        Ok(self.users.get(user).cloned().unwrap_or_default())
    }
}
