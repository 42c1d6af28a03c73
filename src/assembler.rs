//! Workout plan assembly
//!
//! Single-pass pipeline: recovery → allocation → per-muscle candidates →
//! cached prescriptions admitted against the session time budget → backfill
//! and fallback when placed exercises fall short of the target.
//!
//! Nothing here is an error. Empty requests, exhausted candidate pools and
//! exercises that no longer fit the budget all produce a smaller plan with a
//! note explaining why.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::allocation::{AllocationConfig, ExerciseAllocationPlanner, LowRecoveryPolicy};
use crate::gateways::{ExerciseCatalog, PerformanceFeedbackGateway, UserProfileGateway};
use crate::models::{
    ExercisePrescription, ExerciseRecord, ExperienceLevel, FitnessGoal, MovementType, MuscleAllocation, MuscleGroup,
    MuscleRole, PerformanceFeedback, SessionPhase, TimeBreakdown, TrainingFormat, UserProfile, WorkoutPlan,
};
use crate::recovery::RecoveryEstimator;
use crate::rep_cache::{ConversionKey, PrescriptionParameters, RepRangeCache, RepRangeRequest};
use crate::rep_range::RecoveryBucket;
use crate::set_scheme::{SchemeInput, SchemeSuggestion, SetSchemePlanner};
use crate::time_budget::SessionTimeBudget;
use crate::time_estimate::ExerciseTimeEstimator;

/// Planner settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerConfig {
    pub low_recovery_policy: LowRecoveryPolicy,
    pub skip_threshold: f64,
    pub fallback_min_recovery: f64,

    /// Upper bound for predictive exercise-count sizing
    pub max_exercises: usize,

    /// Shuffle candidates with this seed instead of using catalog order
    pub variety_seed: Option<u64>,

    pub training_format: TrainingFormat,
    pub default_duration_minutes: u32,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        let allocation = AllocationConfig::default();
        PlannerConfig {
            low_recovery_policy: allocation.low_recovery_policy,
            skip_threshold: allocation.skip_threshold,
            fallback_min_recovery: allocation.fallback_min_recovery,
            max_exercises: 12,
            variety_seed: None,
            training_format: TrainingFormat::StraightSets,
            default_duration_minutes: 45,
        }
    }
}

impl PlannerConfig {
    pub fn allocation(&self) -> AllocationConfig {
        AllocationConfig {
            low_recovery_policy: self.low_recovery_policy,
            skip_threshold: self.skip_threshold,
            fallback_min_recovery: self.fallback_min_recovery,
            ..AllocationConfig::default()
        }
    }
}

/// One planning request. Unset fields fall back to the profile or config.
#[derive(Debug, Clone, Default)]
pub struct PlanRequest {
    pub muscles: Vec<MuscleGroup>,
    pub total_exercises: Option<usize>,
    pub duration_minutes: u32,
    pub goal: Option<FitnessGoal>,
    pub experience: Option<ExperienceLevel>,
    pub format: Option<TrainingFormat>,
    pub phase: Option<SessionPhase>,
    pub suggestion: Option<SchemeSuggestion>,
}

/// Mutable state of one assembly run
struct Session {
    goal: FitnessGoal,
    experience: ExperienceLevel,
    format: TrainingFormat,
    phase: SessionPhase,
    profile: UserProfile,
    feedback: PerformanceFeedback,
    suggestion: Option<SchemeSuggestion>,
    budget: SessionTimeBudget,
    recovery: HashMap<MuscleGroup, f64>,
    // Reversed so that `pop` yields the next candidate
    pools: HashMap<MuscleGroup, Vec<ExerciseRecord>>,
    used: HashSet<String>,
    placed: Vec<ExercisePrescription>,
    rng: Option<StdRng>,
}

pub struct WorkoutPlanAssembler<'a> {
    catalog: &'a dyn ExerciseCatalog,
    profile: &'a dyn UserProfileGateway,
    feedback: &'a dyn PerformanceFeedbackGateway,
    recovery: &'a RecoveryEstimator<'a>,
    cache: &'a RepRangeCache,
    schemes: &'a SetSchemePlanner,
    estimator: ExerciseTimeEstimator,
    allocator: ExerciseAllocationPlanner,
    config: PlannerConfig,
}

impl<'a> WorkoutPlanAssembler<'a> {
    pub fn new(
        catalog: &'a dyn ExerciseCatalog,
        profile: &'a dyn UserProfileGateway,
        feedback: &'a dyn PerformanceFeedbackGateway,
        recovery: &'a RecoveryEstimator<'a>,
        cache: &'a RepRangeCache,
        schemes: &'a SetSchemePlanner,
    ) -> Self {
        let config = PlannerConfig::default();
        WorkoutPlanAssembler {
            catalog,
            profile,
            feedback,
            recovery,
            cache,
            schemes,
            estimator: ExerciseTimeEstimator::new(),
            allocator: ExerciseAllocationPlanner::with_config(config.allocation()),
            config,
        }
    }

    pub fn with_config(mut self, config: PlannerConfig) -> Self {
        self.allocator = ExerciseAllocationPlanner::with_config(config.allocation());
        self.config = config;
        self
    }

    pub fn with_estimator(mut self, estimator: ExerciseTimeEstimator) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    #[instrument(skip(self, request), fields(duration = request.duration_minutes, muscles = request.muscles.len()))]
    pub fn assemble(&self, request: &PlanRequest, now: DateTime<Utc>) -> WorkoutPlan {
        let profile = self.profile.profile();
        let feedback = self.feedback.feedback();
        let goal = request.goal.unwrap_or(profile.goal);
        let experience = request.experience.unwrap_or(profile.experience);
        let format = request.format.unwrap_or(self.config.training_format);
        let budget = SessionTimeBudget::for_profile(request.duration_minutes, &profile);

        let mut muscles: Vec<MuscleGroup> = Vec::with_capacity(request.muscles.len());
        for &muscle in &request.muscles {
            if !muscles.contains(&muscle) {
                muscles.push(muscle);
            }
        }

        let target = request.total_exercises.unwrap_or_else(|| {
            self.estimator
                .suggest_exercise_count(&budget, goal, experience, format, self.config.max_exercises)
        });

        let mut session = Session {
            goal,
            experience,
            format,
            phase: request.phase.unwrap_or_else(|| goal.default_phase()),
            profile,
            feedback,
            suggestion: request.suggestion,
            budget,
            recovery: HashMap::new(),
            pools: HashMap::new(),
            used: HashSet::new(),
            placed: Vec::new(),
            rng: self.config.variety_seed.map(StdRng::seed_from_u64),
        };
        let mut notes = Vec::new();

        if muscles.is_empty() || target == 0 || !session.budget.has_work_time() {
            if muscles.is_empty() {
                notes.push("No muscle groups requested".to_string());
            } else if target == 0 {
                notes.push("Exercise count is zero".to_string());
            } else {
                notes.push(format!("No work time available in {} minutes", request.duration_minutes));
            }
            info!("Empty plan: {}", notes.join("; "));
            return self.finish(session, request, target, Vec::new(), notes, now, true);
        }

        let recovery = self.recovery.snapshot(&muscles, now);
        for data in &recovery {
            session.recovery.insert(data.muscle, data.recovery_percentage);
        }
        let allocations = self.allocator.allocate(&recovery, target);

        for allocation in &allocations {
            if !self.allocator.admits(allocation.recovery_percentage) {
                notes.push(format!(
                    "Skipped {}: recovery {:.0}% is below the {:.0}% threshold",
                    allocation.muscle, allocation.recovery_percentage, self.config.skip_threshold
                ));
                continue;
            }
            if allocation.count == 0 {
                continue;
            }

            let mut placed = 0;
            while placed < allocation.count && self.place_one(&mut session, allocation.muscle) {
                placed += 1;
            }
            if placed < allocation.count {
                debug!(
                    muscle = %allocation.muscle,
                    placed,
                    allocated = allocation.count,
                    "Muscle fell short of its allocation"
                );
            }
        }

        let mut shortfall = target.saturating_sub(session.placed.len());
        if shortfall > 0 {
            let order: Vec<MuscleGroup> = self
                .allocator
                .backfill_order(&recovery)
                .into_iter()
                .filter(|m| session.recovery.get(m).is_some_and(|&r| self.allocator.admits(r)))
                .collect();
            let added = ExerciseAllocationPlanner::fill_shortfall(&order, shortfall, |m| {
                self.place_one(&mut session, m)
            });
            if added > 0 {
                notes.push(format!("Backfilled {} exercise(s) from requested muscles", added));
            }
            shortfall -= added;
        }

        if shortfall > 0 {
            let others: Vec<MuscleGroup> = MuscleGroup::ALL
                .iter()
                .copied()
                .filter(|m| !muscles.contains(m))
                .collect();
            let other_recovery = self.recovery.snapshot(&others, now);
            for data in &other_recovery {
                session.recovery.insert(data.muscle, data.recovery_percentage);
            }

            let order = self.allocator.fallback_order(&muscles, &other_recovery);
            let added = ExerciseAllocationPlanner::fill_shortfall(&order, shortfall, |m| {
                self.place_one(&mut session, m)
            });
            if added > 0 {
                let used: Vec<String> = session
                    .placed
                    .iter()
                    .filter(|p| !muscles.contains(&p.muscle))
                    .map(|p| p.muscle.to_string())
                    .collect();
                notes.push(format!(
                    "Added {} exercise(s) for recovered muscles outside the request: {}",
                    added,
                    used.join(", ")
                ));
            }
            shortfall -= added;
        }

        if shortfall > 0 {
            warn!(shortfall, target, "Could not fill the requested exercise count");
            notes.push(format!(
                "Placed {} of {} exercises: candidates or time budget exhausted",
                target - shortfall,
                target
            ));
        }

        self.finish(session, request, target, allocations, notes, now, false)
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        session: Session,
        request: &PlanRequest,
        target: usize,
        allocations: Vec<MuscleAllocation>,
        notes: Vec<String>,
        now: DateTime<Utc>,
        empty: bool,
    ) -> WorkoutPlan {
        let exercise_seconds: f64 = session.placed.iter().map(|p| p.time.total_seconds).sum();
        let breakdown = if empty {
            TimeBreakdown::default()
        } else {
            TimeBreakdown {
                warmup_seconds: session.budget.warmup_seconds,
                exercise_seconds,
                cooldown_seconds: session.budget.cooldown_seconds,
                total_seconds: session.budget.warmup_seconds + exercise_seconds + session.budget.cooldown_seconds,
            }
        };

        let plan = WorkoutPlan {
            id: Uuid::new_v4(),
            created_at: now,
            goal: session.goal,
            experience: session.experience,
            requested_duration_minutes: request.duration_minutes,
            target_exercise_count: target,
            allocations,
            actual_duration_minutes: (breakdown.total_seconds / 60.0).ceil() as u32,
            total_time_breakdown: breakdown,
            max_work_seconds: session.budget.max_work_seconds,
            exercises: session.placed,
            notes,
        };

        info!(
            exercises = plan.exercises.len(),
            target,
            minutes = plan.actual_duration_minutes,
            "Assembled workout plan"
        );
        plan
    }

    /// Place the next usable candidate for `muscle`. False once the pool is
    /// exhausted; candidates that do not fit the budget are dropped.
    fn place_one(&self, session: &mut Session, muscle: MuscleGroup) -> bool {
        if !session.pools.contains_key(&muscle) {
            let pool = self.candidate_pool(session, muscle);
            session.pools.insert(muscle, pool);
        }

        loop {
            let Some(exercise) = session.pools.get_mut(&muscle).and_then(Vec::pop) else {
                return false;
            };
            if session.used.contains(&exercise.id) {
                continue;
            }

            let recovery = session.recovery.get(&muscle).copied().unwrap_or(100.0);
            let prescription = self.prescribe(session, &exercise, muscle, recovery);

            if prescription.scheme.sets == 0 {
                debug!(exercise = %exercise.id, "Dropped: volume fully suppressed");
                continue;
            }
            if !session.budget.try_consume(prescription.time.total_seconds) {
                debug!(
                    exercise = %exercise.id,
                    seconds = prescription.time.total_seconds,
                    remaining = session.budget.remaining_seconds(),
                    "Dropped: does not fit the time budget"
                );
                continue;
            }

            debug!(exercise = %exercise.id, muscle = %muscle, "Placed exercise");
            session.used.insert(exercise.id.clone());
            session.placed.push(prescription);
            return true;
        }
    }

    fn candidate_pool(&self, session: &mut Session, muscle: MuscleGroup) -> Vec<ExerciseRecord> {
        let mut pool: Vec<ExerciseRecord> = self
            .catalog
            .candidates_for(muscle)
            .into_iter()
            .filter(|e| session.profile.has_equipment(e.equipment))
            .filter(|e| !session.profile.avoids(&e.id))
            .collect();

        if let Some(rng) = session.rng.as_mut() {
            pool.shuffle(rng);
        }
        pool.reverse();
        pool
    }

    fn prescribe(
        &self,
        session: &Session,
        exercise: &ExerciseRecord,
        muscle: MuscleGroup,
        recovery: f64,
    ) -> ExercisePrescription {
        let role = if exercise.movement_type == MovementType::Compound {
            MuscleRole::Primary
        } else {
            MuscleRole::Accessory
        };
        let parameters = PrescriptionParameters {
            goal: session.goal,
            experience: session.experience,
            role,
            format: session.format,
            phase: session.phase,
            recovery: RecoveryBucket::from_percentage(recovery),
            feedback: session.feedback.clone(),
            warmup_sets_enabled: session.profile.warmup_sets_enabled,
            suggestion: session.suggestion,
            template: self.schemes.template(session.goal, session.experience).clone(),
            timing: self.estimator.config().clone(),
        };
        let key = ConversionKey::new(exercise, &parameters);

        let mut prescription = self
            .cache
            .get_or_build_prescription(&key, || self.build_prescription(exercise, muscle, &parameters));
        prescription.muscle = muscle;
        prescription
    }

    fn build_prescription(
        &self,
        exercise: &ExerciseRecord,
        muscle: MuscleGroup,
        parameters: &PrescriptionParameters,
    ) -> ExercisePrescription {
        let window = self.cache.rep_range_for_prescription(&RepRangeRequest::new(
            exercise,
            parameters.goal,
            parameters.phase,
            parameters.recovery,
            &parameters.feedback,
        ));

        let scheme = self.schemes.scheme(
            exercise,
            &SchemeInput {
                goal: parameters.goal,
                experience: parameters.experience,
                role: parameters.role,
                feedback: &parameters.feedback,
                suggestion: parameters.suggestion,
                rep_window: Some(window),
            },
        );

        let set_durations = ExerciseTimeEstimator::set_durations(exercise, scheme.sets, parameters.goal);
        let time = self.estimator.estimate(
            exercise,
            &scheme,
            &set_durations,
            parameters.goal,
            parameters.experience,
            parameters.format,
            parameters.warmup_sets_enabled,
        );

        ExercisePrescription {
            exercise: exercise.clone(),
            muscle,
            role: parameters.role,
            scheme,
            set_durations_seconds: set_durations,
            time,
        }
    }
}
