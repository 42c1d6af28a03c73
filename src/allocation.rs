//! Proportional exercise-count allocation
//!
//! Splits a total exercise budget across muscles in proportion to a
//! recovery-derived weight using the largest-remainder (Hamilton) method, so
//! the per-muscle counts always sum to the requested total.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::models::{MuscleAllocation, MuscleGroup, MuscleRecoveryData};

const WEIGHT_EPSILON: f64 = 1e-9;

/// How muscles below the skip threshold are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LowRecoveryPolicy {
    /// Weight 0 in the allocator, never placed by the assembler
    #[default]
    Skip,
    /// Small non-zero weight, may still receive exercises
    Floor,
}

impl fmt::Display for LowRecoveryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LowRecoveryPolicy::Skip => write!(f, "skip"),
            LowRecoveryPolicy::Floor => write!(f, "floor"),
        }
    }
}

impl FromStr for LowRecoveryPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "skip" => Ok(LowRecoveryPolicy::Skip),
            "floor" => Ok(LowRecoveryPolicy::Floor),
            _ => Err(format!("Invalid low-recovery policy: {}", s)),
        }
    }
}

/// Allocation thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationConfig {
    pub low_recovery_policy: LowRecoveryPolicy,

    /// Muscles below this recovery percentage are low-recovery
    pub skip_threshold: f64,

    /// Minimum recovery for muscles pulled in by the fallback pass
    pub fallback_min_recovery: f64,

    /// Weight given to low-recovery muscles under the floor policy
    pub floor_weight: f64,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        AllocationConfig {
            low_recovery_policy: LowRecoveryPolicy::Skip,
            skip_threshold: 30.0,
            fallback_min_recovery: 70.0,
            floor_weight: 0.1,
        }
    }
}

/// Exercise allocation planner
#[derive(Debug, Clone, Default)]
pub struct ExerciseAllocationPlanner {
    config: AllocationConfig,
}

impl ExerciseAllocationPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AllocationConfig) -> Self {
        ExerciseAllocationPlanner { config }
    }

    pub fn config(&self) -> &AllocationConfig {
        &self.config
    }

    /// Step function from recovery percentage to allocation weight
    pub fn recovery_weight(&self, recovery_percentage: f64) -> f64 {
        match recovery_percentage {
            r if r >= 90.0 => 1.0,
            r if r >= 85.0 => 0.9,
            r if r >= 70.0 => 0.6,
            r if r >= 60.0 => 0.4,
            r if r >= 40.0 => 0.2,
            r if r >= self.config.skip_threshold => 0.1,
            _ => match self.config.low_recovery_policy {
                LowRecoveryPolicy::Skip => 0.0,
                LowRecoveryPolicy::Floor => self.config.floor_weight,
            },
        }
    }

    /// Whether a muscle at this recovery may receive exercises at all
    pub fn admits(&self, recovery_percentage: f64) -> bool {
        match self.config.low_recovery_policy {
            LowRecoveryPolicy::Skip => recovery_percentage >= self.config.skip_threshold,
            LowRecoveryPolicy::Floor => true,
        }
    }

    /// Split `total_exercises` across `muscles`. Output order equals input
    /// order and the counts sum to `total_exercises` exactly.
    pub fn allocate(&self, muscles: &[MuscleRecoveryData], total_exercises: usize) -> Vec<MuscleAllocation> {
        let mut counts = vec![0usize; muscles.len()];

        if !muscles.is_empty() && total_exercises > 0 {
            let weights: Vec<f64> = muscles
                .iter()
                .map(|m| sanitize(self.recovery_weight(m.recovery_percentage)))
                .collect();
            let total_weight: f64 = weights.iter().sum();

            if total_weight > WEIGHT_EPSILON {
                self.apportion(muscles, &weights, total_weight, total_exercises, &mut counts);
            } else {
                // No recovery signal: even split, extras to the earliest muscles
                let n = muscles.len();
                for (i, count) in counts.iter_mut().enumerate() {
                    *count = total_exercises / n + usize::from(i < total_exercises % n);
                }
            }

            if counts.iter().sum::<usize>() != total_exercises || counts.iter().all(|&c| c == 0) {
                let best = highest_recovery_index(muscles);
                counts.iter_mut().for_each(|c| *c = 0);
                counts[best] = total_exercises;
            }
        }

        let allocations: Vec<MuscleAllocation> = muscles
            .iter()
            .zip(counts)
            .map(|(m, count)| MuscleAllocation {
                muscle: m.muscle,
                count,
                recovery_percentage: m.recovery_percentage,
            })
            .collect();

        debug!(
            total = total_exercises,
            allocation = ?allocations.iter().map(|a| (a.muscle, a.count)).collect::<Vec<_>>(),
            "Allocated exercises"
        );
        allocations
    }

    fn apportion(
        &self,
        muscles: &[MuscleRecoveryData],
        weights: &[f64],
        total_weight: f64,
        total_exercises: usize,
        counts: &mut [usize],
    ) {
        let raw: Vec<f64> = weights
            .iter()
            .map(|w| total_exercises as f64 * w / total_weight)
            .collect();

        for (count, share) in counts.iter_mut().zip(&raw) {
            *count = share.floor() as usize;
        }

        let assigned: usize = counts.iter().sum();
        let remainder = total_exercises.saturating_sub(assigned);
        if remainder == 0 {
            return;
        }

        // Largest fractional part first, then higher recovery, then input order
        let mut order: Vec<usize> = (0..muscles.len()).filter(|&i| weights[i] > 0.0).collect();
        order.sort_by(|&a, &b| {
            let frac_a = raw[a] - raw[a].floor();
            let frac_b = raw[b] - raw[b].floor();
            frac_b
                .total_cmp(&frac_a)
                .then_with(|| {
                    muscles[b]
                        .recovery_percentage
                        .total_cmp(&muscles[a].recovery_percentage)
                })
                .then_with(|| a.cmp(&b))
        });

        if order.is_empty() {
            return;
        }
        for k in 0..remainder {
            counts[order[k % order.len()]] += 1;
        }
    }

    /// Requested muscles eligible for backfill, highest recovery first.
    /// Muscles below the skip threshold are never backfilled.
    pub fn backfill_order(&self, muscles: &[MuscleRecoveryData]) -> Vec<MuscleGroup> {
        let eligible: Vec<&MuscleRecoveryData> = muscles
            .iter()
            .filter(|m| m.recovery_percentage >= self.config.skip_threshold)
            .collect();
        rank_by_recovery(eligible)
    }

    /// Muscles outside the request that are recovered enough to substitute,
    /// highest recovery first
    pub fn fallback_order(&self, requested: &[MuscleGroup], candidates: &[MuscleRecoveryData]) -> Vec<MuscleGroup> {
        let eligible: Vec<&MuscleRecoveryData> = candidates
            .iter()
            .filter(|m| !requested.contains(&m.muscle))
            .filter(|m| m.recovery_percentage >= self.config.fallback_min_recovery)
            .collect();
        rank_by_recovery(eligible)
    }

    /// Greedily close a shortfall: keep adding one exercise to the first
    /// muscle in `order` until `try_place` reports it has nothing left, then
    /// move on. Returns how many exercises were placed.
    pub fn fill_shortfall<F>(order: &[MuscleGroup], shortfall: usize, mut try_place: F) -> usize
    where
        F: FnMut(MuscleGroup) -> bool,
    {
        let mut placed = 0;
        for &muscle in order {
            while placed < shortfall {
                if !try_place(muscle) {
                    break;
                }
                placed += 1;
            }
            if placed >= shortfall {
                break;
            }
        }
        placed
    }
}

fn sanitize(weight: f64) -> f64 {
    if weight.is_finite() && weight > 0.0 {
        weight
    } else {
        0.0
    }
}

fn highest_recovery_index(muscles: &[MuscleRecoveryData]) -> usize {
    muscles
        .iter()
        .enumerate()
        .fold(0, |best, (i, m)| {
            if m.recovery_percentage > muscles[best].recovery_percentage {
                i
            } else {
                best
            }
        })
}

fn rank_by_recovery(mut muscles: Vec<&MuscleRecoveryData>) -> Vec<MuscleGroup> {
    // Stable sort keeps input order among equals
    muscles.sort_by(|a, b| {
        b.recovery_percentage
            .total_cmp(&a.recovery_percentage)
            .then_with(|| b.muscle.priority().rank().cmp(&a.muscle.priority().rank()))
    });
    muscles.into_iter().map(|m| m.muscle).collect()
}
