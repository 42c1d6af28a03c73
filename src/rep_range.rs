//! Rep-range pipeline
//!
//! base range by goal → session phase → movement type → recovery bucket →
//! performance feedback. Every stage is a pure function so the cache in
//! front of it stays referentially transparent.

use serde::{Deserialize, Serialize};

use crate::models::{FitnessGoal, MovementType, PerformanceFeedback, RepRange, SessionPhase, Trend};

/// Coarse recovery band used as a cache key component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryBucket {
    /// Below 60%
    Low,
    /// 60% up to 85%
    Moderate,
    High,
}

impl RecoveryBucket {
    pub const ALL: [RecoveryBucket; 3] = [RecoveryBucket::Low, RecoveryBucket::Moderate, RecoveryBucket::High];

    pub fn from_percentage(recovery_percentage: f64) -> Self {
        if recovery_percentage >= 85.0 {
            RecoveryBucket::High
        } else if recovery_percentage >= 60.0 {
            RecoveryBucket::Moderate
        } else {
            RecoveryBucket::Low
        }
    }
}

pub fn base_range_for_goal(goal: FitnessGoal) -> RepRange {
    match goal {
        FitnessGoal::Strength => RepRange::new(3, 6),
        FitnessGoal::Power => RepRange::new(1, 5),
        FitnessGoal::Hypertrophy => RepRange::new(8, 12),
        FitnessGoal::GeneralFitness => RepRange::new(8, 15),
        FitnessGoal::Endurance => RepRange::new(15, 25),
        FitnessGoal::FatLoss => RepRange::new(12, 20),
    }
}

pub fn adjust_for_phase(range: RepRange, phase: SessionPhase) -> RepRange {
    match phase {
        SessionPhase::StrengthFocus => RepRange::new(range.min.saturating_sub(2), range.max.saturating_sub(2)),
        SessionPhase::VolumeFocus => range,
        SessionPhase::ConditioningFocus => RepRange::new(range.min + 3, range.max + 3),
    }
}

pub fn adjust_for_movement(range: RepRange, movement: MovementType) -> RepRange {
    match movement {
        MovementType::Isolation => RepRange::new(range.min + 2, range.max + 2),
        // Explosive work degrades fast past a handful of reps
        MovementType::Plyometric => RepRange::new(range.min.min(6), range.max.min(6)),
        MovementType::Compound | MovementType::Isometric | MovementType::Cardio => range,
    }
}

pub fn adjust_for_recovery(range: RepRange, bucket: RecoveryBucket) -> RepRange {
    match bucket {
        RecoveryBucket::Low => RepRange::new(range.min + 2, range.max + 2),
        RecoveryBucket::Moderate | RecoveryBucket::High => range,
    }
}

/// Effort read from the rolling average RPE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffortBand {
    /// RPE above 8.5
    Hard,
    Normal,
    /// RPE below 6.0 while the trend is improving
    EasyImproving,
}

/// The parts of performance feedback that rep ranges and set counts react to.
/// Two feedback values with the same signal always plan identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeedbackSignal {
    pub effort: EffortBand,
    /// Completion rate below 80%
    pub low_completion: bool,
    pub deload: bool,
}

impl FeedbackSignal {
    pub fn from_feedback(feedback: &PerformanceFeedback) -> Self {
        let effort = match feedback.average_rpe {
            Some(rpe) if rpe > 8.5 => EffortBand::Hard,
            Some(rpe) if rpe < 6.0 && feedback.trend == Trend::Improving => EffortBand::EasyImproving,
            _ => EffortBand::Normal,
        };
        FeedbackSignal {
            effort,
            low_completion: matches!(feedback.completion_rate, Some(rate) if rate < 0.8),
            deload: feedback.deload_recommended,
        }
    }
}

/// Only the upper bound moves; it never drops below the lower bound
pub fn adjust_for_feedback(range: RepRange, feedback: &PerformanceFeedback) -> RepRange {
    let signal = FeedbackSignal::from_feedback(feedback);
    let mut max = range.max as i64;

    match signal.effort {
        EffortBand::Hard => max -= 1,
        EffortBand::EasyImproving => max += 2,
        EffortBand::Normal => {}
    }
    if signal.low_completion {
        max -= 2;
    }

    let max = max.max(range.min as i64) as u32;
    RepRange::new(range.min, max)
}

/// Run the whole pipeline
pub fn compute_rep_range(
    goal: FitnessGoal,
    phase: SessionPhase,
    movement: MovementType,
    bucket: RecoveryBucket,
    feedback: &PerformanceFeedback,
) -> RepRange {
    let range = base_range_for_goal(goal);
    let range = adjust_for_phase(range, phase);
    let range = adjust_for_movement(range, movement);
    let range = adjust_for_recovery(range, bucket);
    adjust_for_feedback(range, feedback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_buckets() {
        assert_eq!(RecoveryBucket::from_percentage(100.0), RecoveryBucket::High);
        assert_eq!(RecoveryBucket::from_percentage(85.0), RecoveryBucket::High);
        assert_eq!(RecoveryBucket::from_percentage(70.0), RecoveryBucket::Moderate);
        assert_eq!(RecoveryBucket::from_percentage(59.9), RecoveryBucket::Low);
    }

    #[test]
    fn test_strength_phase_lowers_window() {
        let range = compute_rep_range(
            FitnessGoal::Strength,
            SessionPhase::StrengthFocus,
            MovementType::Compound,
            RecoveryBucket::High,
            &PerformanceFeedback::default(),
        );
        assert_eq!(range, RepRange::new(1, 4));
    }

    #[test]
    fn test_isolation_in_volume_phase() {
        let range = compute_rep_range(
            FitnessGoal::Hypertrophy,
            SessionPhase::VolumeFocus,
            MovementType::Isolation,
            RecoveryBucket::Moderate,
            &PerformanceFeedback::default(),
        );
        assert_eq!(range, RepRange::new(10, 14));
    }

    #[test]
    fn test_plyometric_cap() {
        let range = adjust_for_movement(RepRange::new(8, 12), MovementType::Plyometric);
        assert_eq!(range, RepRange::new(6, 6));
    }

    #[test]
    fn test_low_recovery_raises_reps() {
        let range = adjust_for_recovery(RepRange::new(8, 12), RecoveryBucket::Low);
        assert_eq!(range, RepRange::new(10, 14));
    }

    #[test]
    fn test_feedback_adjustments() {
        let base = RepRange::new(8, 12);

        let hard = PerformanceFeedback {
            average_rpe: Some(9.0),
            ..PerformanceFeedback::default()
        };
        assert_eq!(adjust_for_feedback(base, &hard), RepRange::new(8, 11));

        let struggling = PerformanceFeedback {
            average_rpe: Some(9.0),
            completion_rate: Some(0.6),
            ..PerformanceFeedback::default()
        };
        assert_eq!(adjust_for_feedback(base, &struggling), RepRange::new(8, 9));

        let easy = PerformanceFeedback {
            average_rpe: Some(5.0),
            trend: Trend::Improving,
            ..PerformanceFeedback::default()
        };
        assert_eq!(adjust_for_feedback(base, &easy), RepRange::new(8, 14));

        let narrow = RepRange::new(3, 3);
        assert_eq!(adjust_for_feedback(narrow, &struggling), RepRange::new(3, 3));
    }

    #[test]
    fn test_signal_splits_at_thresholds() {
        let rpe = |value: f64| PerformanceFeedback {
            average_rpe: Some(value),
            ..PerformanceFeedback::default()
        };
        let completion = |value: f64| PerformanceFeedback {
            completion_rate: Some(value),
            ..PerformanceFeedback::default()
        };

        assert_eq!(FeedbackSignal::from_feedback(&rpe(8.5)).effort, EffortBand::Normal);
        assert_eq!(FeedbackSignal::from_feedback(&rpe(8.54)).effort, EffortBand::Hard);
        assert!(!FeedbackSignal::from_feedback(&completion(0.8)).low_completion);
        assert!(FeedbackSignal::from_feedback(&completion(0.796)).low_completion);

        // Trend only matters for easy sessions
        let declining = PerformanceFeedback {
            trend: Trend::Declining,
            ..rpe(7.0)
        };
        assert_eq!(FeedbackSignal::from_feedback(&declining), FeedbackSignal::from_feedback(&rpe(7.3)));
    }

    proptest! {
        #[test]
        fn test_pipeline_always_yields_valid_range(
            goal_idx in 0usize..6,
            phase_idx in 0usize..3,
            bucket_idx in 0usize..3,
            rpe in proptest::option::of(1.0f64..10.0),
            completion in proptest::option::of(0.0f64..1.0)
        ) {
            let feedback = PerformanceFeedback {
                average_rpe: rpe,
                completion_rate: completion,
                ..PerformanceFeedback::default()
            };
            for movement in [
                MovementType::Compound,
                MovementType::Isolation,
                MovementType::Plyometric,
                MovementType::Isometric,
                MovementType::Cardio,
            ] {
                let range = compute_rep_range(
                    FitnessGoal::ALL[goal_idx],
                    SessionPhase::ALL[phase_idx],
                    movement,
                    RecoveryBucket::ALL[bucket_idx],
                    &feedback,
                );
                prop_assert!(range.min >= 1);
                prop_assert!(range.min <= range.max);
            }
        }
    }
}
