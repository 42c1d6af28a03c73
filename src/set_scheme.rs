//! Sets/reps/rest/load prescription
//!
//! A template table keyed by (goal, experience) bounds every prescription.
//! Suggestions, fatigue and goal-family adjustments move values around inside
//! those bounds but never outside them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, trace};

use crate::error::TemplateError;
use crate::models::{
    ExerciseRecord, ExperienceLevel, FitnessGoal, GoalFamily, MuscleRole, PerformanceFeedback, RepRange, SetScheme,
};
use crate::rep_range::{EffortBand, FeedbackSignal};

/// Bounds for one (goal, experience) combination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetTemplate {
    pub goal: FitnessGoal,
    pub experience: ExperienceLevel,
    pub compound_sets: RepRange,
    pub accessory_sets: RepRange,
    pub reps: RepRange,
    pub rest_seconds: RepRange,

    /// Percentage of one-rep max, `[low, high]`
    #[serde(default)]
    pub load_percent: Option<[f64; 2]>,

    #[serde(default)]
    pub rpe: Option<[f64; 2]>,
}

impl SetTemplate {
    pub fn sets_for(&self, role: MuscleRole) -> RepRange {
        match role {
            MuscleRole::Primary => self.compound_sets,
            MuscleRole::Accessory => self.accessory_sets,
        }
    }

    fn validate(&self) -> Result<(), TemplateError> {
        let invalid = |field: &'static str, min: u32, max: u32| TemplateError::InvalidRange {
            goal: self.goal,
            experience: self.experience,
            field,
            min,
            max,
        };

        for (field, range) in [
            ("compound_sets", self.compound_sets),
            ("accessory_sets", self.accessory_sets),
            ("reps", self.reps),
        ] {
            if range.min == 0 || range.min > range.max {
                return Err(invalid(field, range.min, range.max));
            }
        }
        if self.rest_seconds.min > self.rest_seconds.max {
            return Err(invalid("rest_seconds", self.rest_seconds.min, self.rest_seconds.max));
        }
        for (field, bounds) in [("load_percent", self.load_percent), ("rpe", self.rpe)] {
            if let Some([low, high]) = bounds {
                if !low.is_finite() || !high.is_finite() || low < 0.0 || low > high {
                    return Err(invalid(field, low.max(0.0) as u32, high.max(0.0) as u32));
                }
            }
        }
        Ok(())
    }
}

fn default_template(goal: FitnessGoal, experience: ExperienceLevel) -> SetTemplate {
    let (compound, accessory, reps, rest, load, rpe) = match goal {
        FitnessGoal::Strength => ((3, 5), (2, 3), (3, 6), (150, 240), Some([80.0, 90.0]), Some([7.5, 9.0])),
        FitnessGoal::Power => ((3, 5), (2, 3), (1, 5), (150, 240), Some([70.0, 85.0]), Some([7.0, 8.5])),
        FitnessGoal::Hypertrophy => ((3, 5), (2, 4), (6, 12), (60, 120), Some([65.0, 80.0]), Some([7.0, 9.0])),
        FitnessGoal::GeneralFitness => ((2, 4), (2, 3), (8, 15), (60, 90), None, Some([6.0, 8.0])),
        FitnessGoal::Endurance => ((2, 4), (2, 3), (12, 25), (30, 60), None, Some([6.0, 8.0])),
        FitnessGoal::FatLoss => ((2, 4), (2, 3), (10, 20), (20, 45), None, Some([6.0, 8.0])),
    };

    let (compound_min, compound_max): (u32, u32) = compound;
    let compound_sets = match experience {
        ExperienceLevel::Beginner => RepRange::new(compound_min, compound_max - 1),
        ExperienceLevel::Intermediate => RepRange::new(compound_min, compound_max),
        ExperienceLevel::Advanced => RepRange::new(compound_min + 1, compound_max + 1),
    };
    let load_percent = load.map(|[low, high]: [f64; 2]| match experience {
        ExperienceLevel::Beginner => [low - 5.0, high - 5.0],
        ExperienceLevel::Intermediate => [low, high],
        ExperienceLevel::Advanced => [low, high + 2.5],
    });

    SetTemplate {
        goal,
        experience,
        compound_sets,
        accessory_sets: RepRange::new(accessory.0, accessory.1),
        reps: RepRange::new(reps.0, reps.1),
        rest_seconds: RepRange::new(rest.0, rest.1),
        load_percent,
        rpe,
    }
}

/// Template table, possibly incomplete until validated
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateTable {
    templates: HashMap<(FitnessGoal, ExperienceLevel), SetTemplate>,
}

impl Default for TemplateTable {
    fn default() -> Self {
        let templates = FitnessGoal::ALL
            .iter()
            .flat_map(|&goal| ExperienceLevel::ALL.iter().map(move |&exp| default_template(goal, exp)))
            .map(|t| ((t.goal, t.experience), t))
            .collect();
        TemplateTable { templates }
    }
}

impl TemplateTable {
    /// Table built only from the given templates, no defaults
    pub fn from_templates(templates: Vec<SetTemplate>) -> Self {
        TemplateTable {
            templates: templates.into_iter().map(|t| ((t.goal, t.experience), t)).collect(),
        }
    }

    /// Replace individual combinations
    pub fn with_overrides(mut self, overrides: &[SetTemplate]) -> Self {
        for template in overrides {
            self.templates
                .insert((template.goal, template.experience), template.clone());
        }
        self
    }

    pub fn get(&self, goal: FitnessGoal, experience: ExperienceLevel) -> Option<&SetTemplate> {
        self.templates.get(&(goal, experience))
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Every combination present and every range well-formed
    pub fn validate(&self) -> Result<(), TemplateError> {
        for goal in FitnessGoal::ALL {
            for experience in ExperienceLevel::ALL {
                self.get(goal, experience)
                    .ok_or(TemplateError::MissingCombination { goal, experience })?
                    .validate()?;
            }
        }
        Ok(())
    }
}

/// Caller-provided starting point, clamped into the template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SchemeSuggestion {
    pub sets: Option<u32>,
    pub reps: Option<u32>,
}

/// Everything besides the exercise that shapes a prescription
#[derive(Debug, Clone)]
pub struct SchemeInput<'a> {
    pub goal: FitnessGoal,
    pub experience: ExperienceLevel,
    pub role: MuscleRole,
    pub feedback: &'a PerformanceFeedback,
    pub suggestion: Option<SchemeSuggestion>,

    /// Output of the rep-range pipeline, narrowed into the template
    pub rep_window: Option<RepRange>,
}

/// Set-scheme planner over a validated template table
#[derive(Debug, Clone)]
pub struct SetSchemePlanner {
    templates: Vec<SetTemplate>,
}

fn slot(goal: FitnessGoal, experience: ExperienceLevel) -> usize {
    goal as usize * ExperienceLevel::ALL.len() + experience as usize
}

impl SetSchemePlanner {
    /// Fails fast on a missing combination or a malformed range
    pub fn new(table: TemplateTable) -> Result<Self, TemplateError> {
        table.validate()?;

        let mut templates = Vec::with_capacity(FitnessGoal::ALL.len() * ExperienceLevel::ALL.len());
        for goal in FitnessGoal::ALL {
            for experience in ExperienceLevel::ALL {
                let template = table
                    .get(goal, experience)
                    .ok_or(TemplateError::MissingCombination { goal, experience })?;
                templates.push(template.clone());
            }
        }
        Ok(SetSchemePlanner { templates })
    }

    pub fn template(&self, goal: FitnessGoal, experience: ExperienceLevel) -> &SetTemplate {
        &self.templates[slot(goal, experience)]
    }

    /// Fatigue multiplier, first matching rule wins
    pub fn fatigue_multiplier(feedback: &PerformanceFeedback) -> f64 {
        let signal = FeedbackSignal::from_feedback(feedback);
        if signal.deload {
            return 0.6;
        }
        match signal.effort {
            EffortBand::Hard => 0.85,
            EffortBand::EasyImproving => 1.1,
            EffortBand::Normal => 1.0,
        }
    }

    /// Scale sets by the fatigue multiplier, rounding to nearest and flooring at one
    pub fn apply_fatigue(sets: u32, feedback: &PerformanceFeedback) -> u32 {
        let adjusted = (sets as f64 * Self::fatigue_multiplier(feedback)).round();
        (adjusted as u32).max(1)
    }

    /// Goal-family rep window inside the template range
    pub fn adjust_rep_range(template_reps: RepRange, goal: FitnessGoal) -> RepRange {
        match goal.family() {
            GoalFamily::StrengthPower => RepRange::new(template_reps.min, template_reps.midpoint()),
            GoalFamily::Hypertrophy => template_reps,
            GoalFamily::Conditioning => RepRange::new(template_reps.midpoint(), template_reps.max),
        }
    }

    pub fn adjust_rest(template_rest: RepRange, goal: FitnessGoal) -> u32 {
        match goal.family() {
            GoalFamily::StrengthPower => template_rest.max,
            GoalFamily::Hypertrophy => (template_rest.min + template_rest.max) / 2,
            GoalFamily::Conditioning => template_rest.min,
        }
    }

    pub fn scheme(&self, exercise: &ExerciseRecord, input: &SchemeInput<'_>) -> SetScheme {
        let template = self.template(input.goal, input.experience);
        let set_range = template.sets_for(input.role);
        let suggestion = input.suggestion.unwrap_or_default();
        let mut overrides = Vec::new();

        let base_sets = match suggestion.sets {
            Some(suggested) => {
                let clamped = set_range.clamp(suggested);
                if clamped != suggested {
                    overrides.push(format!("suggested {} sets clamped to {} ({})", suggested, clamped, set_range));
                }
                clamped
            }
            None => set_range.midpoint(),
        };
        let sets = set_range.clamp(Self::apply_fatigue(base_sets, input.feedback));

        let family_window = Self::adjust_rep_range(template.reps, input.goal);
        let rep_range = input
            .rep_window
            .and_then(|window| window.intersect(&family_window))
            .unwrap_or(family_window);

        let target_reps = match suggestion.reps {
            Some(suggested) => {
                let clamped = rep_range.clamp(suggested);
                if clamped != suggested {
                    overrides.push(format!("suggested {} reps clamped to {} ({})", suggested, clamped, rep_range));
                }
                clamped
            }
            None => rep_range.midpoint(),
        };

        let rest_seconds = Self::adjust_rest(template.rest_seconds, input.goal);
        let midpoint = |[low, high]: [f64; 2]| (low + high) / 2.0;

        if !overrides.is_empty() {
            debug!(exercise = %exercise.id, "Clamped caller suggestion: {}", overrides.join("; "));
        }
        trace!(
            exercise = %exercise.id,
            sets,
            reps = %rep_range,
            target_reps,
            rest_seconds,
            "Built set scheme"
        );

        SetScheme {
            sets,
            rep_range,
            target_reps,
            rest_seconds,
            load_percentage: template.load_percent.map(midpoint),
            target_rpe: template.rpe.map(midpoint),
            override_reason: (!overrides.is_empty()).then(|| overrides.join("; ")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EquipmentArchetype, MovementType, TrackingType, Trend};
    use proptest::prelude::*;

    fn bench_press() -> ExerciseRecord {
        ExerciseRecord {
            id: "barbell-bench-press".to_string(),
            name: "Barbell Bench Press".to_string(),
            body_part: "chest".to_string(),
            target: None,
            synergists: vec![],
            equipment: EquipmentArchetype::Barbell,
            movement_type: MovementType::Compound,
            tracking_type: TrackingType::Reps,
        }
    }

    fn input(goal: FitnessGoal, feedback: &PerformanceFeedback) -> SchemeInput<'_> {
        SchemeInput {
            goal,
            experience: ExperienceLevel::Intermediate,
            role: MuscleRole::Primary,
            feedback,
            suggestion: None,
            rep_window: None,
        }
    }

    #[test]
    fn test_default_table_is_complete() {
        let table = TemplateTable::default();
        assert_eq!(table.len(), 18);
        assert!(table.validate().is_ok());
    }

    #[test]
    fn test_missing_combination_fails_fast() {
        let templates: Vec<SetTemplate> = FitnessGoal::ALL
            .iter()
            .flat_map(|&g| ExperienceLevel::ALL.iter().map(move |&e| default_template(g, e)))
            .filter(|t| !(t.goal == FitnessGoal::Power && t.experience == ExperienceLevel::Advanced))
            .collect();

        let err = SetSchemePlanner::new(TemplateTable::from_templates(templates)).unwrap_err();
        assert_eq!(
            err,
            TemplateError::MissingCombination {
                goal: FitnessGoal::Power,
                experience: ExperienceLevel::Advanced,
            }
        );
    }

    #[test]
    fn test_invalid_override_rejected() {
        let mut broken = default_template(FitnessGoal::Strength, ExperienceLevel::Beginner);
        broken.reps = RepRange { min: 8, max: 3 };
        let table = TemplateTable::default().with_overrides(&[broken]);
        assert!(matches!(
            table.validate(),
            Err(TemplateError::InvalidRange { field: "reps", .. })
        ));
    }

    #[test]
    fn test_high_rpe_reduces_sets() {
        let planner = SetSchemePlanner::new(TemplateTable::default()).unwrap();
        let feedback = PerformanceFeedback {
            average_rpe: Some(9.0),
            ..PerformanceFeedback::default()
        };

        // Intermediate hypertrophy compound range 3-5, midpoint 4
        let scheme = planner.scheme(&bench_press(), &input(FitnessGoal::Hypertrophy, &feedback));
        assert_eq!(scheme.sets, 3);
        assert!(scheme.override_reason.is_none());
    }

    #[test]
    fn test_fatigue_multipliers() {
        let deload = PerformanceFeedback {
            deload_recommended: true,
            average_rpe: Some(9.5),
            ..PerformanceFeedback::default()
        };
        assert_eq!(SetSchemePlanner::fatigue_multiplier(&deload), 0.6);

        let easy = PerformanceFeedback {
            average_rpe: Some(5.5),
            trend: Trend::Improving,
            ..PerformanceFeedback::default()
        };
        assert_eq!(SetSchemePlanner::fatigue_multiplier(&easy), 1.1);
        assert_eq!(SetSchemePlanner::apply_fatigue(4, &easy), 4);

        let easy_but_flat = PerformanceFeedback {
            trend: Trend::Stable,
            ..easy
        };
        assert_eq!(SetSchemePlanner::fatigue_multiplier(&easy_but_flat), 1.0);
        assert_eq!(SetSchemePlanner::apply_fatigue(1, &deload), 1);

        let at_threshold = PerformanceFeedback {
            average_rpe: Some(8.5),
            ..PerformanceFeedback::default()
        };
        let just_over = PerformanceFeedback {
            average_rpe: Some(8.54),
            ..PerformanceFeedback::default()
        };
        assert_eq!(SetSchemePlanner::apply_fatigue(4, &at_threshold), 4);
        assert_eq!(SetSchemePlanner::apply_fatigue(4, &just_over), 3);
    }

    #[test]
    fn test_suggestion_clamped_with_reason() {
        let planner = SetSchemePlanner::new(TemplateTable::default()).unwrap();
        let feedback = PerformanceFeedback::default();
        let scheme = planner.scheme(
            &bench_press(),
            &SchemeInput {
                suggestion: Some(SchemeSuggestion {
                    sets: Some(10),
                    reps: Some(2),
                }),
                ..input(FitnessGoal::Hypertrophy, &feedback)
            },
        );

        assert_eq!(scheme.sets, 5);
        assert_eq!(scheme.target_reps, 6);
        let reason = scheme.override_reason.unwrap();
        assert!(reason.contains("10 sets"));
        assert!(reason.contains("2 reps"));
    }

    #[test]
    fn test_goal_family_shapes_reps_and_rest() {
        let planner = SetSchemePlanner::new(TemplateTable::default()).unwrap();
        let feedback = PerformanceFeedback::default();

        let strength = planner.scheme(&bench_press(), &input(FitnessGoal::Strength, &feedback));
        assert_eq!(strength.rep_range, RepRange::new(3, 5));
        assert_eq!(strength.rest_seconds, 240);
        assert_eq!(strength.load_percentage, Some(85.0));

        let fat_loss = planner.scheme(&bench_press(), &input(FitnessGoal::FatLoss, &feedback));
        assert_eq!(fat_loss.rep_range, RepRange::new(15, 20));
        assert_eq!(fat_loss.rest_seconds, 20);
        assert_eq!(fat_loss.load_percentage, None);
    }

    #[test]
    fn test_pipeline_window_narrows_or_falls_back() {
        let planner = SetSchemePlanner::new(TemplateTable::default()).unwrap();
        let feedback = PerformanceFeedback::default();

        let narrowed = planner.scheme(
            &bench_press(),
            &SchemeInput {
                rep_window: Some(RepRange::new(10, 14)),
                ..input(FitnessGoal::Hypertrophy, &feedback)
            },
        );
        assert_eq!(narrowed.rep_range, RepRange::new(10, 12));

        let disjoint = planner.scheme(
            &bench_press(),
            &SchemeInput {
                rep_window: Some(RepRange::new(20, 30)),
                ..input(FitnessGoal::Hypertrophy, &feedback)
            },
        );
        assert_eq!(disjoint.rep_range, RepRange::new(6, 12));
    }

    proptest! {
        #[test]
        fn test_scheme_stays_within_template(
            goal_idx in 0usize..6,
            exp_idx in 0usize..3,
            primary in any::<bool>(),
            sets in proptest::option::of(0u32..20),
            reps in proptest::option::of(0u32..40),
            rpe in proptest::option::of(1.0f64..10.0),
            deload in any::<bool>(),
            window_min in 1u32..30,
            window_width in 0u32..10
        ) {
            let planner = SetSchemePlanner::new(TemplateTable::default()).unwrap();
            let goal = FitnessGoal::ALL[goal_idx];
            let experience = ExperienceLevel::ALL[exp_idx];
            let role = if primary { MuscleRole::Primary } else { MuscleRole::Accessory };
            let feedback = PerformanceFeedback {
                average_rpe: rpe,
                deload_recommended: deload,
                trend: Trend::Improving,
                ..PerformanceFeedback::default()
            };

            let scheme = planner.scheme(&bench_press(), &SchemeInput {
                goal,
                experience,
                role,
                feedback: &feedback,
                suggestion: Some(SchemeSuggestion { sets, reps }),
                rep_window: Some(RepRange::new(window_min, window_min + window_width)),
            });

            let template = planner.template(goal, experience);
            prop_assert!(template.sets_for(role).contains(scheme.sets));
            prop_assert!(template.reps.contains(scheme.target_reps));
            prop_assert!(scheme.rep_range.contains(scheme.target_reps));
        }
    }
}
