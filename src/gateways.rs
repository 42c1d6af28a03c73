//! Narrow read interfaces to the collaborators the planning core depends on
//!
//! The exercise catalog, the user profile, performance feedback and the
//! stimulus history are owned elsewhere. The planner only reads them through
//! these traits, so every component can be exercised with in-memory doubles.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::RwLock;

use crate::error::{LiftError, Result, StoreError};
use crate::models::{ExerciseRecord, MuscleGroup, PerformanceFeedback, StimulusRecord, UserProfile};

const BUNDLED_CATALOG: &str = include_str!("../data/exercises.json");

/// Read-only exercise catalog
pub trait ExerciseCatalog: Send + Sync {
    fn lookup(&self, id: &str) -> Option<ExerciseRecord>;

    /// Exercises whose primary target is `muscle`, in catalog order
    fn candidates_for(&self, muscle: MuscleGroup) -> Vec<ExerciseRecord>;
}

/// Source of the current user profile snapshot
pub trait UserProfileGateway: Send + Sync {
    fn profile(&self) -> UserProfile;
}

/// Source of rolling performance feedback
pub trait PerformanceFeedbackGateway: Send + Sync {
    fn feedback(&self) -> PerformanceFeedback;
}

/// Repository of per-muscle stimulus history. Retention is enforced by the
/// recovery estimator through `replace`.
pub trait StimulusHistoryStore: Send + Sync {
    fn load(&self, muscle: MuscleGroup) -> std::result::Result<Vec<StimulusRecord>, StoreError>;

    fn append(&self, muscle: MuscleGroup, record: StimulusRecord) -> std::result::Result<(), StoreError>;

    /// Overwrite the full history of one muscle
    fn replace(&self, muscle: MuscleGroup, records: &[StimulusRecord]) -> std::result::Result<(), StoreError>;
}

/// Catalog held entirely in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    exercises: Vec<ExerciseRecord>,
    index: HashMap<String, usize>,
}

impl InMemoryCatalog {
    pub fn from_records(exercises: Vec<ExerciseRecord>) -> Self {
        let index = exercises
            .iter()
            .enumerate()
            .map(|(i, exercise)| (exercise.id.clone(), i))
            .collect();
        Self { exercises, index }
    }

    /// Parse a JSON array of exercise records
    pub fn from_json(json: &str) -> Result<Self> {
        let exercises: Vec<ExerciseRecord> = serde_json::from_str(json)?;
        if exercises.is_empty() {
            return Err(LiftError::Validation("exercise catalog is empty".to_string()));
        }
        Ok(Self::from_records(exercises))
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Catalog shipped with the crate
    pub fn bundled() -> Result<Self> {
        Self::from_json(BUNDLED_CATALOG)
    }

    pub fn len(&self) -> usize {
        self.exercises.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }

    pub fn all(&self) -> &[ExerciseRecord] {
        &self.exercises
    }
}

impl ExerciseCatalog for InMemoryCatalog {
    fn lookup(&self, id: &str) -> Option<ExerciseRecord> {
        self.index.get(id).map(|&i| self.exercises[i].clone())
    }

    fn candidates_for(&self, muscle: MuscleGroup) -> Vec<ExerciseRecord> {
        self.exercises
            .iter()
            .filter(|exercise| exercise.target == Some(muscle))
            .cloned()
            .collect()
    }
}

/// Fixed profile snapshot
#[derive(Debug, Clone, Default)]
pub struct StaticProfile(pub UserProfile);

impl UserProfileGateway for StaticProfile {
    fn profile(&self) -> UserProfile {
        self.0.clone()
    }
}

/// Fixed feedback snapshot
#[derive(Debug, Clone, Default)]
pub struct StaticFeedback(pub PerformanceFeedback);

impl PerformanceFeedbackGateway for StaticFeedback {
    fn feedback(&self) -> PerformanceFeedback {
        self.0.clone()
    }
}

/// Volatile stimulus history, mainly for tests and one-shot CLI runs
#[derive(Debug, Default)]
pub struct InMemoryHistoryStore {
    records: RwLock<HashMap<MuscleGroup, Vec<StimulusRecord>>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StimulusHistoryStore for InMemoryHistoryStore {
    fn load(&self, muscle: MuscleGroup) -> std::result::Result<Vec<StimulusRecord>, StoreError> {
        let records = self.records.read().map_err(|_| StoreError::Poisoned)?;
        Ok(records.get(&muscle).cloned().unwrap_or_default())
    }

    fn append(&self, muscle: MuscleGroup, record: StimulusRecord) -> std::result::Result<(), StoreError> {
        let mut records = self.records.write().map_err(|_| StoreError::Poisoned)?;
        records.entry(muscle).or_default().push(record);
        Ok(())
    }

    fn replace(&self, muscle: MuscleGroup, new_records: &[StimulusRecord]) -> std::result::Result<(), StoreError> {
        let mut records = self.records.write().map_err(|_| StoreError::Poisoned)?;
        records.insert(muscle, new_records.to_vec());
        Ok(())
    }
}
