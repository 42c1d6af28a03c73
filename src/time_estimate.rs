//! Wall-clock cost model for a single exercise prescription
//!
//! Rep-based work is `sets × reps × tempo / experience factor`; timed work
//! (holds, rounds, distance) sums explicit per-set durations. Rest, setup,
//! transition and warmup-set overhead are added on top, and the whole total is
//! scaled by the training-format multiplier.

use serde::{Deserialize, Serialize};

use crate::models::{
    EquipmentArchetype, ExerciseRecord, ExerciseTimeEstimate, ExperienceLevel, FitnessGoal, GoalFamily,
    MovementType, RepRange, SetScheme, TrackingType, TrainingFormat,
};
use crate::rep_range::base_range_for_goal;
use crate::time_budget::SessionTimeBudget;

/// Estimator constants that are not keyed by a model enum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeEstimateConfig {
    /// Walking to the next station, re-racking
    pub transition_seconds: f64,

    /// Cost of one ramp-up set before a heavy compound lift
    pub warmup_set_seconds: f64,

    /// Sets assumed for predictive exercise-count sizing
    pub representative_sets: u32,
}

impl Default for TimeEstimateConfig {
    fn default() -> Self {
        TimeEstimateConfig {
            transition_seconds: 30.0,
            warmup_set_seconds: 60.0,
            representative_sets: 3,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExerciseTimeEstimator {
    config: TimeEstimateConfig,
}

impl ExerciseTimeEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: TimeEstimateConfig) -> Self {
        ExerciseTimeEstimator { config }
    }

    pub fn config(&self) -> &TimeEstimateConfig {
        &self.config
    }

    /// Seconds per repetition, by movement type and rep bucket (≤5, 6-12, >12)
    pub fn tempo_seconds_per_rep(movement: MovementType, reps: u32) -> f64 {
        let bucket = match reps {
            0..=5 => 0,
            6..=12 => 1,
            _ => 2,
        };
        match movement {
            MovementType::Compound => [4.0, 3.5, 3.0][bucket],
            MovementType::Isolation => [3.5, 3.0, 2.5][bucket],
            MovementType::Plyometric => [2.0, 1.5, 1.5][bucket],
            MovementType::Isometric | MovementType::Cardio => 1.0,
        }
    }

    /// Beginners move slower, advanced lifters faster
    pub fn experience_tempo_factor(experience: ExperienceLevel) -> f64 {
        match experience {
            ExperienceLevel::Beginner => 0.9,
            ExperienceLevel::Intermediate => 1.0,
            ExperienceLevel::Advanced => 1.1,
        }
    }

    pub fn goal_rest_seconds(goal: FitnessGoal) -> f64 {
        match goal {
            FitnessGoal::Strength | FitnessGoal::Power => 180.0,
            FitnessGoal::Hypertrophy => 90.0,
            FitnessGoal::GeneralFitness => 75.0,
            FitnessGoal::Endurance => 45.0,
            FitnessGoal::FatLoss => 30.0,
        }
    }

    fn movement_rest_multiplier(movement: MovementType) -> f64 {
        match movement {
            MovementType::Isolation | MovementType::Isometric => 0.75,
            MovementType::Cardio => 0.5,
            MovementType::Compound | MovementType::Plyometric => 1.0,
        }
    }

    /// Rest between two sets. A prescribed rest replaces the goal default.
    pub fn rest_interval(goal: FitnessGoal, movement: MovementType, prescribed_rest: Option<u32>) -> f64 {
        let base = prescribed_rest
            .filter(|&rest| rest > 0)
            .map(f64::from)
            .unwrap_or_else(|| Self::goal_rest_seconds(goal));
        base * Self::movement_rest_multiplier(movement)
    }

    pub fn experience_rest_multiplier(experience: ExperienceLevel) -> f64 {
        match experience {
            ExperienceLevel::Beginner => 1.15,
            ExperienceLevel::Intermediate => 1.0,
            ExperienceLevel::Advanced => 0.95,
        }
    }

    pub fn format_rest_factor(format: TrainingFormat) -> f64 {
        match format {
            TrainingFormat::StraightSets => 1.0,
            TrainingFormat::Superset => 0.5,
            TrainingFormat::Circuit => 0.3,
        }
    }

    pub fn format_time_multiplier(format: TrainingFormat) -> f64 {
        match format {
            TrainingFormat::StraightSets => 1.0,
            TrainingFormat::Superset => 0.85,
            TrainingFormat::Circuit => 0.75,
        }
    }

    pub fn setup_seconds(equipment: EquipmentArchetype, experience: ExperienceLevel) -> f64 {
        let base = match equipment {
            EquipmentArchetype::Barbell => 90.0,
            EquipmentArchetype::Dumbbell => 45.0,
            EquipmentArchetype::Machine => 40.0,
            EquipmentArchetype::Cable => 35.0,
            EquipmentArchetype::Kettlebell => 30.0,
            EquipmentArchetype::Band => 20.0,
            EquipmentArchetype::Bodyweight => 10.0,
            EquipmentArchetype::Sled => 60.0,
        };
        let multiplier = match experience {
            ExperienceLevel::Beginner => 1.25,
            ExperienceLevel::Intermediate => 1.0,
            ExperienceLevel::Advanced => 0.85,
        };
        base * multiplier
    }

    /// Ramp-up sets for loaded compound lifts
    pub fn warmup_sets(exercise: &ExerciseRecord, goal: FitnessGoal, warmup_sets_enabled: bool) -> u32 {
        let loaded = matches!(
            exercise.equipment,
            EquipmentArchetype::Barbell | EquipmentArchetype::Dumbbell | EquipmentArchetype::Machine
        );
        if !warmup_sets_enabled || !loaded || exercise.movement_type != MovementType::Compound {
            return 0;
        }
        match goal.family() {
            GoalFamily::StrengthPower => 2,
            _ => 1,
        }
    }

    /// Per-set durations for time-tracked exercises, empty for rep-based ones
    pub fn set_durations(exercise: &ExerciseRecord, sets: u32, goal: FitnessGoal) -> Vec<u32> {
        let per_set = match exercise.tracking_type {
            TrackingType::Reps => return Vec::new(),
            TrackingType::Duration => match goal {
                FitnessGoal::Strength => 20,
                FitnessGoal::Power => 15,
                FitnessGoal::Hypertrophy | FitnessGoal::GeneralFitness => 30,
                FitnessGoal::Endurance => 45,
                FitnessGoal::FatLoss => 40,
            },
            TrackingType::Rounds => 60,
            TrackingType::Distance => 90,
        };
        vec![per_set; sets as usize]
    }

    /// Estimate one prescription. `set_durations` is used instead of the
    /// rep/tempo formula whenever it is non-empty.
    #[allow(clippy::too_many_arguments)]
    pub fn estimate(
        &self,
        exercise: &ExerciseRecord,
        scheme: &SetScheme,
        set_durations: &[u32],
        goal: FitnessGoal,
        experience: ExperienceLevel,
        format: TrainingFormat,
        warmup_sets_enabled: bool,
    ) -> ExerciseTimeEstimate {
        if scheme.sets == 0 {
            return ExerciseTimeEstimate::default();
        }

        let work_seconds = if set_durations.is_empty() {
            let tempo = Self::tempo_seconds_per_rep(exercise.movement_type, scheme.target_reps);
            scheme.sets as f64 * scheme.target_reps as f64 * tempo / Self::experience_tempo_factor(experience)
        } else {
            set_durations.iter().map(|&s| s as f64).sum()
        };

        let rest_seconds = (scheme.sets - 1) as f64
            * Self::rest_interval(goal, exercise.movement_type, Some(scheme.rest_seconds))
            * Self::experience_rest_multiplier(experience)
            * Self::format_rest_factor(format);

        let setup_seconds = Self::setup_seconds(exercise.equipment, experience);
        let transition_seconds = self.config.transition_seconds;
        let warmup_seconds =
            Self::warmup_sets(exercise, goal, warmup_sets_enabled) as f64 * self.config.warmup_set_seconds;

        let total_seconds = (work_seconds + rest_seconds + setup_seconds + transition_seconds + warmup_seconds)
            * Self::format_time_multiplier(format);

        ExerciseTimeEstimate {
            work_seconds,
            rest_seconds,
            setup_seconds,
            transition_seconds,
            warmup_seconds,
            total_seconds,
        }
    }

    /// Session total for a list of estimates
    pub fn session_seconds(estimates: &[ExerciseTimeEstimate]) -> f64 {
        estimates.iter().map(|e| e.total_seconds).sum()
    }

    /// Representative cost of one exercise, used to size a plan up front
    pub fn representative_seconds(
        &self,
        goal: FitnessGoal,
        experience: ExperienceLevel,
        format: TrainingFormat,
    ) -> f64 {
        let range: RepRange = base_range_for_goal(goal);
        let exercise = ExerciseRecord {
            id: "representative".to_string(),
            name: "Representative".to_string(),
            body_part: String::new(),
            target: None,
            synergists: Vec::new(),
            equipment: EquipmentArchetype::Dumbbell,
            movement_type: MovementType::Compound,
            tracking_type: TrackingType::Reps,
        };
        let scheme = SetScheme {
            sets: self.config.representative_sets,
            rep_range: range,
            target_reps: range.midpoint(),
            rest_seconds: Self::goal_rest_seconds(goal) as u32,
            load_percentage: None,
            target_rpe: None,
            override_reason: None,
        };
        self.estimate(&exercise, &scheme, &[], goal, experience, format, false)
            .total_seconds
    }

    /// Predictive exercise count for a budget, clamped to `[1, max_exercises]`,
    /// or 0 when the budget has no work time at all
    pub fn suggest_exercise_count(
        &self,
        budget: &SessionTimeBudget,
        goal: FitnessGoal,
        experience: ExperienceLevel,
        format: TrainingFormat,
        max_exercises: usize,
    ) -> usize {
        if !budget.has_work_time() || max_exercises == 0 {
            return 0;
        }
        let per_exercise = self.representative_seconds(goal, experience, format);
        if per_exercise <= 0.0 {
            return max_exercises;
        }
        let count = (budget.available_work_seconds / per_exercise).floor() as usize;
        count.clamp(1, max_exercises)
    }
}
