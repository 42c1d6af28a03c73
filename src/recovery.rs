//! Muscle recovery estimation
//!
//! Converts a muscle group's stimulus history into a 0-100% recovery score.
//!
//! # Model
//!
//! Only the most recent stimulus matters. Each muscle has a base recovery
//! window (24/48/72 hours by size class) that is scaled by the intensity of
//! that stimulus:
//!
//! - `adjusted_window = base_recovery_hours × intensity`
//! - `recovery = min(100, hours_elapsed / adjusted_window × 100)`
//!
//! A zero intensity or zero window is treated as fully recovered, as is a
//! muscle with no history at all.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, instrument, warn};

use crate::error::Result;
use crate::gateways::StimulusHistoryStore;
use crate::models::{
    CompletedExercise, CompletedSet, ExerciseRecord, MovementType, MuscleGroup, MuscleRecoveryData,
    StimulusRecord,
};

/// Recovery model parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryConfig {
    /// Most recent records kept per muscle
    pub max_records: usize,

    /// Records older than this are pruned
    pub retention_days: i64,

    /// Multiplier applied to compound movements
    pub compound_bonus: f64,

    /// Share of the stimulus credited to synergist muscles
    pub synergist_factor: f64,

    /// Repetitions that count as a full-volume session for one exercise
    pub volume_reference_reps: f64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        RecoveryConfig {
            max_records: 50,
            retention_days: 30,
            compound_bonus: 1.15,
            synergist_factor: 0.5,
            volume_reference_reps: 60.0,
        }
    }
}

/// Recovery estimator backed by a stimulus history store
pub struct RecoveryEstimator<'a> {
    store: &'a dyn StimulusHistoryStore,
    config: RecoveryConfig,
}

impl<'a> RecoveryEstimator<'a> {
    pub fn new(store: &'a dyn StimulusHistoryStore) -> Self {
        Self::with_config(store, RecoveryConfig::default())
    }

    pub fn with_config(store: &'a dyn StimulusHistoryStore, config: RecoveryConfig) -> Self {
        RecoveryEstimator { store, config }
    }

    pub fn config(&self) -> &RecoveryConfig {
        &self.config
    }

    /// Recovery of one muscle from an explicit history snapshot
    pub fn recovery_from_history(
        muscle: MuscleGroup,
        history: &[StimulusRecord],
        now: DateTime<Utc>,
    ) -> MuscleRecoveryData {
        let Some(latest) = history.iter().max_by_key(|record| record.date) else {
            return MuscleRecoveryData::fully_recovered(muscle);
        };

        let intensity = if latest.intensity.is_finite() {
            latest.intensity.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let window_hours = muscle.base_recovery_hours() * intensity;

        if window_hours <= 0.0 {
            return MuscleRecoveryData {
                muscle,
                last_worked_date: Some(latest.date),
                intensity,
                recovery_percentage: 100.0,
                estimated_full_recovery_date: Some(latest.date),
            };
        }

        // Records dated in the future count as "just trained"
        let hours_elapsed = ((now - latest.date).num_seconds() as f64 / 3600.0).max(0.0);
        let recovery_percentage = (hours_elapsed / window_hours * 100.0).clamp(0.0, 100.0);
        let full_recovery = latest.date + Duration::seconds((window_hours * 3600.0).round() as i64);

        MuscleRecoveryData {
            muscle,
            last_worked_date: Some(latest.date),
            intensity,
            recovery_percentage,
            estimated_full_recovery_date: Some(full_recovery),
        }
    }

    /// Recovery of one muscle from the store. A store failure is treated
    /// like missing history.
    pub fn recovery_of(&self, muscle: MuscleGroup, now: DateTime<Utc>) -> MuscleRecoveryData {
        match self.store.load(muscle) {
            Ok(history) => Self::recovery_from_history(muscle, &history, now),
            Err(e) => {
                warn!(muscle = %muscle, error = %e, "Stimulus history unavailable, assuming full recovery");
                MuscleRecoveryData::fully_recovered(muscle)
            }
        }
    }

    /// Recovery for several muscles, in input order
    pub fn snapshot(&self, muscles: &[MuscleGroup], now: DateTime<Utc>) -> Vec<MuscleRecoveryData> {
        muscles.iter().map(|&m| self.recovery_of(m, now)).collect()
    }

    /// Append one stimulus record per affected muscle for each completed
    /// exercise, then prune the touched histories.
    ///
    /// Returns the number of records appended.
    #[instrument(skip(self, exercises), fields(exercises = exercises.len()))]
    pub fn record_workout(
        &self,
        exercises: &[CompletedExercise],
        body_weight_kg: Option<f64>,
        now: DateTime<Utc>,
    ) -> Result<usize> {
        let mut touched: BTreeSet<MuscleGroup> = BTreeSet::new();
        let mut appended = 0;

        for completed in exercises {
            if completed.sets.is_empty() {
                continue;
            }

            let base_intensity = self.stimulus_intensity(&completed.exercise, &completed.sets, body_weight_kg);
            let total_reps: u32 = completed.sets.iter().map(|s| s.reps).sum();

            for (muscle, share) in self.muscles_for(&completed.exercise) {
                let record = StimulusRecord {
                    date: completed.completed_at,
                    intensity: (base_intensity * share).clamp(0.0, 1.0),
                    volume: total_reps as f64 * share,
                };
                self.store.append(muscle, record)?;
                touched.insert(muscle);
                appended += 1;
            }
        }

        for muscle in touched {
            let history = self.store.load(muscle)?;
            let before = history.len();
            let pruned = self.prune(history, now);
            if pruned.len() != before {
                debug!(muscle = %muscle, removed = before - pruned.len(), "Pruned stimulus history");
                self.store.replace(muscle, &pruned)?;
            }
        }

        Ok(appended)
    }

    /// Keep records inside the retention window, at most `max_records` of
    /// the most recent ones, sorted oldest first.
    pub fn prune(&self, mut records: Vec<StimulusRecord>, now: DateTime<Utc>) -> Vec<StimulusRecord> {
        let cutoff = now - Duration::days(self.config.retention_days);
        records.retain(|record| record.date >= cutoff);
        records.sort_by_key(|record| record.date);

        if records.len() > self.config.max_records {
            let excess = records.len() - self.config.max_records;
            records.drain(..excess);
        }
        records
    }

    /// Muscles credited by an exercise, with the share of stimulus each gets
    pub fn muscles_for(&self, exercise: &ExerciseRecord) -> Vec<(MuscleGroup, f64)> {
        let mut muscles = Vec::new();

        if let Some(target) = exercise.target {
            muscles.push((target, 1.0));
        }
        for &synergist in &exercise.synergists {
            if !muscles.iter().any(|(m, _)| *m == synergist) {
                muscles.push((synergist, self.config.synergist_factor));
            }
        }

        if muscles.is_empty() {
            muscles = body_part_muscles(&exercise.body_part)
                .iter()
                .map(|&m| (m, 1.0))
                .collect();
        }
        muscles
    }

    /// `clamp(0.6·volume + 0.4·weight, 0, 1) × compound bonus`, clamped again
    /// so the stored intensity stays within 0..=1
    pub fn stimulus_intensity(
        &self,
        exercise: &ExerciseRecord,
        sets: &[CompletedSet],
        body_weight_kg: Option<f64>,
    ) -> f64 {
        let total_reps: u32 = sets.iter().map(|s| s.reps).sum();
        let volume_score = if self.config.volume_reference_reps > 0.0 {
            (total_reps as f64 / self.config.volume_reference_reps).min(1.0)
        } else {
            1.0
        };

        let heaviest = sets
            .iter()
            .filter_map(|s| s.weight_kg)
            .filter(|w| w.is_finite() && *w > 0.0)
            .fold(None, |acc: Option<f64>, w| Some(acc.map_or(w, |a| a.max(w))));

        let weight_score = match (heaviest, body_weight_kg) {
            (Some(load), Some(body)) if body > 0.0 => (load / body).min(1.0),
            _ => 0.5,
        };

        let bonus = if exercise.movement_type == MovementType::Compound {
            self.config.compound_bonus
        } else {
            1.0
        };

        ((0.6 * volume_score + 0.4 * weight_score).clamp(0.0, 1.0) * bonus).clamp(0.0, 1.0)
    }
}

/// Generic mapping for exercises with no target or synergist information
pub fn body_part_muscles(body_part: &str) -> &'static [MuscleGroup] {
    match body_part.trim().to_lowercase().as_str() {
        "chest" => &[MuscleGroup::Chest],
        "back" => &[MuscleGroup::Back, MuscleGroup::Lats],
        "shoulders" => &[MuscleGroup::Shoulders],
        "upper arms" => &[MuscleGroup::Biceps, MuscleGroup::Triceps],
        "lower arms" => &[MuscleGroup::Forearms],
        "upper legs" => &[MuscleGroup::Quadriceps, MuscleGroup::Hamstrings, MuscleGroup::Glutes],
        "lower legs" => &[MuscleGroup::Calves],
        "waist" => &[MuscleGroup::Abs, MuscleGroup::Obliques],
        "neck" => &[MuscleGroup::Neck],
        "cardio" => &[MuscleGroup::Quadriceps, MuscleGroup::Calves],
        _ => &[],
    }
}
