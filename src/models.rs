use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Muscle groups tracked by the recovery model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MuscleGroup {
    Chest,
    Back,
    Lats,
    Shoulders,
    Traps,
    Biceps,
    Triceps,
    Forearms,
    Abs,
    Obliques,
    LowerBack,
    Quadriceps,
    Hamstrings,
    Glutes,
    Calves,
    Adductors,
    Abductors,
    Neck,
}

/// Role a muscle plays in compound movements, used to rank muscles of equal recovery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MusclePriority {
    PrimaryMover,
    SecondaryMover,
    Stabilizer,
}

impl MusclePriority {
    /// Higher rank means higher priority
    pub fn rank(&self) -> u8 {
        match self {
            MusclePriority::PrimaryMover => 3,
            MusclePriority::SecondaryMover => 2,
            MusclePriority::Stabilizer => 1,
        }
    }
}

impl MuscleGroup {
    pub const ALL: [MuscleGroup; 18] = [
        MuscleGroup::Chest,
        MuscleGroup::Back,
        MuscleGroup::Lats,
        MuscleGroup::Shoulders,
        MuscleGroup::Traps,
        MuscleGroup::Biceps,
        MuscleGroup::Triceps,
        MuscleGroup::Forearms,
        MuscleGroup::Abs,
        MuscleGroup::Obliques,
        MuscleGroup::LowerBack,
        MuscleGroup::Quadriceps,
        MuscleGroup::Hamstrings,
        MuscleGroup::Glutes,
        MuscleGroup::Calves,
        MuscleGroup::Adductors,
        MuscleGroup::Abductors,
        MuscleGroup::Neck,
    ];

    /// Hours a maximal stimulus needs before the muscle is fully recovered
    pub fn base_recovery_hours(&self) -> f64 {
        match self.priority() {
            MusclePriority::PrimaryMover => 72.0,
            MusclePriority::SecondaryMover => 48.0,
            MusclePriority::Stabilizer => 24.0,
        }
    }

    pub fn priority(&self) -> MusclePriority {
        match self {
            MuscleGroup::Chest
            | MuscleGroup::Back
            | MuscleGroup::Lats
            | MuscleGroup::Quadriceps
            | MuscleGroup::Hamstrings
            | MuscleGroup::Glutes
            | MuscleGroup::LowerBack => MusclePriority::PrimaryMover,
            MuscleGroup::Shoulders
            | MuscleGroup::Traps
            | MuscleGroup::Biceps
            | MuscleGroup::Triceps
            | MuscleGroup::Adductors
            | MuscleGroup::Abductors => MusclePriority::SecondaryMover,
            MuscleGroup::Forearms
            | MuscleGroup::Abs
            | MuscleGroup::Obliques
            | MuscleGroup::Calves
            | MuscleGroup::Neck => MusclePriority::Stabilizer,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MuscleGroup::Chest => "chest",
            MuscleGroup::Back => "back",
            MuscleGroup::Lats => "lats",
            MuscleGroup::Shoulders => "shoulders",
            MuscleGroup::Traps => "traps",
            MuscleGroup::Biceps => "biceps",
            MuscleGroup::Triceps => "triceps",
            MuscleGroup::Forearms => "forearms",
            MuscleGroup::Abs => "abs",
            MuscleGroup::Obliques => "obliques",
            MuscleGroup::LowerBack => "lower_back",
            MuscleGroup::Quadriceps => "quadriceps",
            MuscleGroup::Hamstrings => "hamstrings",
            MuscleGroup::Glutes => "glutes",
            MuscleGroup::Calves => "calves",
            MuscleGroup::Adductors => "adductors",
            MuscleGroup::Abductors => "abductors",
            MuscleGroup::Neck => "neck",
        }
    }
}

impl fmt::Display for MuscleGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MuscleGroup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "chest" | "pecs" => Ok(MuscleGroup::Chest),
            "back" | "upper_back" => Ok(MuscleGroup::Back),
            "lats" => Ok(MuscleGroup::Lats),
            "shoulders" | "delts" => Ok(MuscleGroup::Shoulders),
            "traps" => Ok(MuscleGroup::Traps),
            "biceps" => Ok(MuscleGroup::Biceps),
            "triceps" => Ok(MuscleGroup::Triceps),
            "forearms" => Ok(MuscleGroup::Forearms),
            "abs" => Ok(MuscleGroup::Abs),
            "obliques" => Ok(MuscleGroup::Obliques),
            "lower_back" | "spine" => Ok(MuscleGroup::LowerBack),
            "quadriceps" | "quads" => Ok(MuscleGroup::Quadriceps),
            "hamstrings" => Ok(MuscleGroup::Hamstrings),
            "glutes" => Ok(MuscleGroup::Glutes),
            "calves" => Ok(MuscleGroup::Calves),
            "adductors" => Ok(MuscleGroup::Adductors),
            "abductors" => Ok(MuscleGroup::Abductors),
            "neck" => Ok(MuscleGroup::Neck),
            _ => Err(format!("Unknown muscle group: {}", s)),
        }
    }
}

/// Broad goal families that share rep-window and rest adjustments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GoalFamily {
    StrengthPower,
    Hypertrophy,
    Conditioning,
}

/// Training goals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitnessGoal {
    Strength,
    Power,
    Hypertrophy,
    GeneralFitness,
    Endurance,
    FatLoss,
}

impl FitnessGoal {
    pub const ALL: [FitnessGoal; 6] = [
        FitnessGoal::Strength,
        FitnessGoal::Power,
        FitnessGoal::Hypertrophy,
        FitnessGoal::GeneralFitness,
        FitnessGoal::Endurance,
        FitnessGoal::FatLoss,
    ];

    pub fn family(&self) -> GoalFamily {
        match self {
            FitnessGoal::Strength | FitnessGoal::Power => GoalFamily::StrengthPower,
            FitnessGoal::Hypertrophy | FitnessGoal::GeneralFitness => GoalFamily::Hypertrophy,
            FitnessGoal::Endurance | FitnessGoal::FatLoss => GoalFamily::Conditioning,
        }
    }

    /// Session phase used when the caller does not pick one
    pub fn default_phase(&self) -> SessionPhase {
        match self.family() {
            GoalFamily::StrengthPower => SessionPhase::StrengthFocus,
            GoalFamily::Hypertrophy => SessionPhase::VolumeFocus,
            GoalFamily::Conditioning => SessionPhase::ConditioningFocus,
        }
    }
}

impl fmt::Display for FitnessGoal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FitnessGoal::Strength => write!(f, "Strength"),
            FitnessGoal::Power => write!(f, "Power"),
            FitnessGoal::Hypertrophy => write!(f, "Hypertrophy"),
            FitnessGoal::GeneralFitness => write!(f, "General Fitness"),
            FitnessGoal::Endurance => write!(f, "Endurance"),
            FitnessGoal::FatLoss => write!(f, "Fat Loss"),
        }
    }
}

impl FromStr for FitnessGoal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "strength" => Ok(FitnessGoal::Strength),
            "power" => Ok(FitnessGoal::Power),
            "hypertrophy" | "muscle" | "muscle-gain" => Ok(FitnessGoal::Hypertrophy),
            "general" | "general-fitness" | "general_fitness" => Ok(FitnessGoal::GeneralFitness),
            "endurance" => Ok(FitnessGoal::Endurance),
            "fat-loss" | "fat_loss" | "fatloss" | "weight-loss" => Ok(FitnessGoal::FatLoss),
            _ => Err(format!("Unknown fitness goal: {}", s)),
        }
    }
}

/// Training experience level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl ExperienceLevel {
    pub const ALL: [ExperienceLevel; 3] = [
        ExperienceLevel::Beginner,
        ExperienceLevel::Intermediate,
        ExperienceLevel::Advanced,
    ];
}

impl fmt::Display for ExperienceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExperienceLevel::Beginner => write!(f, "Beginner"),
            ExperienceLevel::Intermediate => write!(f, "Intermediate"),
            ExperienceLevel::Advanced => write!(f, "Advanced"),
        }
    }
}

impl FromStr for ExperienceLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "beginner" | "novice" => Ok(ExperienceLevel::Beginner),
            "intermediate" => Ok(ExperienceLevel::Intermediate),
            "advanced" | "expert" => Ok(ExperienceLevel::Advanced),
            _ => Err(format!("Unknown experience level: {}", s)),
        }
    }
}

/// Movement classification of an exercise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    Compound,
    Isolation,
    Plyometric,
    Isometric,
    Cardio,
}

/// How an exercise's work is measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingType {
    #[default]
    Reps,
    /// Holds and intervals
    Duration,
    Distance,
    Rounds,
}

/// Equipment archetype, drives setup time and equipment filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentArchetype {
    Barbell,
    Dumbbell,
    Machine,
    Cable,
    Kettlebell,
    Band,
    Bodyweight,
    Sled,
}

impl FromStr for EquipmentArchetype {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "barbell" => Ok(EquipmentArchetype::Barbell),
            "dumbbell" | "dumbbells" => Ok(EquipmentArchetype::Dumbbell),
            "machine" => Ok(EquipmentArchetype::Machine),
            "cable" => Ok(EquipmentArchetype::Cable),
            "kettlebell" => Ok(EquipmentArchetype::Kettlebell),
            "band" | "bands" => Ok(EquipmentArchetype::Band),
            "bodyweight" | "body weight" | "none" => Ok(EquipmentArchetype::Bodyweight),
            "sled" => Ok(EquipmentArchetype::Sled),
            _ => Err(format!("Unknown equipment: {}", s)),
        }
    }
}

/// How exercises are chained within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingFormat {
    #[default]
    StraightSets,
    Superset,
    Circuit,
}

impl FromStr for TrainingFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "straight" | "straight-sets" | "straight_sets" => Ok(TrainingFormat::StraightSets),
            "superset" | "supersets" => Ok(TrainingFormat::Superset),
            "circuit" => Ok(TrainingFormat::Circuit),
            _ => Err(format!("Unknown training format: {}", s)),
        }
    }
}

/// Goal-aligned emphasis of the current workout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    StrengthFocus,
    VolumeFocus,
    ConditioningFocus,
}

impl SessionPhase {
    pub const ALL: [SessionPhase; 3] = [
        SessionPhase::StrengthFocus,
        SessionPhase::VolumeFocus,
        SessionPhase::ConditioningFocus,
    ];
}

/// Role of an exercise within the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MuscleRole {
    Primary,
    Accessory,
}

/// Closed interval of repetitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepRange {
    pub min: u32,
    pub max: u32,
}

impl RepRange {
    /// Builds a range, swapping the bounds if needed and flooring at one rep
    pub fn new(a: u32, b: u32) -> Self {
        let (min, max) = if a <= b { (a, b) } else { (b, a) };
        let min = min.max(1);
        RepRange { min, max: max.max(min) }
    }

    pub fn contains(&self, value: u32) -> bool {
        value >= self.min && value <= self.max
    }

    /// Midpoint, rounding half up
    pub fn midpoint(&self) -> u32 {
        (self.min + self.max + 1) / 2
    }

    pub fn clamp(&self, value: u32) -> u32 {
        value.clamp(self.min, self.max)
    }

    pub fn width(&self) -> u32 {
        self.max - self.min
    }

    /// Overlap of two ranges, `None` when they are disjoint
    pub fn intersect(&self, other: &RepRange) -> Option<RepRange> {
        let min = self.min.max(other.min);
        let max = self.max.min(other.max);
        (min <= max).then_some(RepRange { min, max })
    }
}

impl fmt::Display for RepRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min == self.max {
            write!(f, "{}", self.min)
        } else {
            write!(f, "{}-{}", self.min, self.max)
        }
    }
}

/// Catalog entry for one exercise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseRecord {
    pub id: String,
    pub name: String,

    /// Coarse body part, used when neither target nor synergists are known
    pub body_part: String,

    /// Primary target muscle
    #[serde(default)]
    pub target: Option<MuscleGroup>,

    /// Secondary synergist muscles
    #[serde(default)]
    pub synergists: Vec<MuscleGroup>,

    pub equipment: EquipmentArchetype,
    pub movement_type: MovementType,

    #[serde(default)]
    pub tracking_type: TrackingType,
}

/// One training event's contribution to a muscle group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StimulusRecord {
    pub date: DateTime<Utc>,

    /// Normalized intensity (0.0-1.0)
    pub intensity: f64,

    /// Total repetitions attributed to the muscle
    pub volume: f64,
}

/// Readiness classification derived from the recovery percentage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadinessStatus {
    /// At or above 85%
    Ready,
    /// 60% up to 85%
    PartiallyReady,
    Fatigued,
}

impl fmt::Display for ReadinessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadinessStatus::Ready => write!(f, "Ready"),
            ReadinessStatus::PartiallyReady => write!(f, "Partially ready"),
            ReadinessStatus::Fatigued => write!(f, "Fatigued"),
        }
    }
}

/// Derived recovery state of one muscle group. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MuscleRecoveryData {
    pub muscle: MuscleGroup,

    /// `None` stands for the distant past (never trained)
    pub last_worked_date: Option<DateTime<Utc>>,

    pub intensity: f64,

    /// 0 (just trained) to 100 (fully recovered)
    pub recovery_percentage: f64,

    pub estimated_full_recovery_date: Option<DateTime<Utc>>,
}

impl MuscleRecoveryData {
    pub const RECOMMENDED_THRESHOLD: f64 = 85.0;
    pub const PARTIAL_THRESHOLD: f64 = 60.0;

    /// Recovery data for a muscle with no recorded stimulus
    pub fn fully_recovered(muscle: MuscleGroup) -> Self {
        MuscleRecoveryData {
            muscle,
            last_worked_date: None,
            intensity: 0.0,
            recovery_percentage: 100.0,
            estimated_full_recovery_date: None,
        }
    }

    pub fn is_recommended_for_training(&self) -> bool {
        self.recovery_percentage >= Self::RECOMMENDED_THRESHOLD
    }

    pub fn is_partially_ready(&self) -> bool {
        self.recovery_percentage >= Self::PARTIAL_THRESHOLD
    }

    pub fn readiness(&self) -> ReadinessStatus {
        if self.is_recommended_for_training() {
            ReadinessStatus::Ready
        } else if self.is_partially_ready() {
            ReadinessStatus::PartiallyReady
        } else {
            ReadinessStatus::Fatigued
        }
    }
}

/// Exercise count assigned to one muscle for a single planning request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MuscleAllocation {
    pub muscle: MuscleGroup,
    pub count: usize,
    pub recovery_percentage: f64,
}

/// Concrete sets/reps/rest/load prescription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetScheme {
    pub sets: u32,
    pub rep_range: RepRange,
    pub target_reps: u32,
    pub rest_seconds: u32,

    /// Percentage of one-rep max
    pub load_percentage: Option<f64>,

    pub target_rpe: Option<f64>,

    /// Set when a caller suggestion had to be clamped
    pub override_reason: Option<String>,
}

/// Wall-clock cost of one exercise prescription, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ExerciseTimeEstimate {
    pub work_seconds: f64,
    pub rest_seconds: f64,
    pub setup_seconds: f64,
    pub transition_seconds: f64,
    pub warmup_seconds: f64,

    /// Sum of the components above scaled by the training format multiplier
    pub total_seconds: f64,
}

/// One exercise of a generated plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExercisePrescription {
    pub exercise: ExerciseRecord,

    /// Muscle this exercise was placed for
    pub muscle: MuscleGroup,

    pub role: MuscleRole,
    pub scheme: SetScheme,

    /// Per-set durations for time-tracked exercises, empty for rep-based ones
    pub set_durations_seconds: Vec<u32>,

    pub time: ExerciseTimeEstimate,
}

/// Session time breakdown in seconds
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TimeBreakdown {
    pub warmup_seconds: f64,
    pub exercise_seconds: f64,
    pub cooldown_seconds: f64,
    pub total_seconds: f64,
}

/// Final output of the plan assembler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutPlan {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub goal: FitnessGoal,
    pub experience: ExperienceLevel,
    pub requested_duration_minutes: u32,
    pub target_exercise_count: usize,
    pub allocations: Vec<MuscleAllocation>,
    pub exercises: Vec<ExercisePrescription>,
    pub actual_duration_minutes: u32,
    pub total_time_breakdown: TimeBreakdown,
    pub max_work_seconds: f64,

    /// Human-readable notes about shortfalls and substitutions
    pub notes: Vec<String>,
}

impl WorkoutPlan {
    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }
}

/// Measurement units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Units {
    #[default]
    Metric,
    Imperial,
}

/// Snapshot of the user's profile and preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub equipment: Vec<EquipmentArchetype>,
    pub avoided_exercise_ids: Vec<String>,
    pub experience: ExperienceLevel,
    pub goal: FitnessGoal,
    pub units: Units,
    pub body_weight_kg: Option<f64>,
    pub warmup_sets_enabled: bool,
    pub warmup_enabled: bool,
    pub cooldown_enabled: bool,
}

impl Default for UserProfile {
    fn default() -> Self {
        UserProfile {
            equipment: vec![
                EquipmentArchetype::Barbell,
                EquipmentArchetype::Dumbbell,
                EquipmentArchetype::Machine,
                EquipmentArchetype::Cable,
                EquipmentArchetype::Bodyweight,
            ],
            avoided_exercise_ids: Vec::new(),
            experience: ExperienceLevel::Intermediate,
            goal: FitnessGoal::Hypertrophy,
            units: Units::Metric,
            body_weight_kg: None,
            warmup_sets_enabled: true,
            warmup_enabled: true,
            cooldown_enabled: true,
        }
    }
}

impl UserProfile {
    /// Bodyweight exercises are always available
    pub fn has_equipment(&self, equipment: EquipmentArchetype) -> bool {
        equipment == EquipmentArchetype::Bodyweight || self.equipment.contains(&equipment)
    }

    pub fn avoids(&self, exercise_id: &str) -> bool {
        self.avoided_exercise_ids.iter().any(|id| id == exercise_id)
    }
}

/// Direction of recent performance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    #[default]
    Stable,
    Declining,
}

/// Rolling performance feedback used for auto-regulation
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PerformanceFeedback {
    /// Rolling average RPE (1-10)
    pub average_rpe: Option<f64>,

    /// Fraction of prescribed sets completed (0.0-1.0)
    pub completion_rate: Option<f64>,

    pub trend: Trend,
    pub deload_recommended: bool,
}

/// One performed set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedSet {
    pub reps: u32,
    pub weight_kg: Option<f64>,
}

/// A finished exercise reported by a workout-completion event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedExercise {
    pub exercise: ExerciseRecord,
    pub sets: Vec<CompletedSet>,
    pub completed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_muscle_recovery_classes() {
        assert_eq!(MuscleGroup::Chest.base_recovery_hours(), 72.0);
        assert_eq!(MuscleGroup::Biceps.base_recovery_hours(), 48.0);
        assert_eq!(MuscleGroup::Calves.base_recovery_hours(), 24.0);
        assert!(MuscleGroup::Chest.priority().rank() > MuscleGroup::Abs.priority().rank());
    }

    #[test]
    fn test_muscle_parsing() {
        assert_eq!("Lower Back".parse::<MuscleGroup>().unwrap(), MuscleGroup::LowerBack);
        assert_eq!("quads".parse::<MuscleGroup>().unwrap(), MuscleGroup::Quadriceps);
        assert!("wings".parse::<MuscleGroup>().is_err());

        for muscle in MuscleGroup::ALL {
            assert_eq!(muscle.as_str().parse::<MuscleGroup>().unwrap(), muscle);
        }
    }

    #[test]
    fn test_rep_range_helpers() {
        let range = RepRange::new(12, 8);
        assert_eq!(range, RepRange { min: 8, max: 12 });
        assert_eq!(range.midpoint(), 10);
        assert_eq!(range.clamp(20), 12);
        assert!(range.contains(8));
        assert_eq!(
            range.intersect(&RepRange::new(10, 15)),
            Some(RepRange { min: 10, max: 12 })
        );
        assert_eq!(range.intersect(&RepRange::new(1, 5)), None);
        assert_eq!(RepRange::new(0, 0), RepRange { min: 1, max: 1 });
    }

    #[test]
    fn test_readiness_classification() {
        let mut data = MuscleRecoveryData::fully_recovered(MuscleGroup::Back);
        assert_eq!(data.readiness(), ReadinessStatus::Ready);

        data.recovery_percentage = 70.0;
        assert!(!data.is_recommended_for_training());
        assert_eq!(data.readiness(), ReadinessStatus::PartiallyReady);

        data.recovery_percentage = 20.0;
        assert_eq!(data.readiness(), ReadinessStatus::Fatigued);
    }

    #[test]
    fn test_profile_equipment_filter() {
        let profile = UserProfile {
            equipment: vec![EquipmentArchetype::Dumbbell],
            avoided_exercise_ids: vec!["bench-press".to_string()],
            ..UserProfile::default()
        };
        assert!(profile.has_equipment(EquipmentArchetype::Bodyweight));
        assert!(profile.has_equipment(EquipmentArchetype::Dumbbell));
        assert!(!profile.has_equipment(EquipmentArchetype::Barbell));
        assert!(profile.avoids("bench-press"));
    }

    #[test]
    fn test_exercise_record_deserialization_defaults() {
        let json = r#"{
            "id": "push-up",
            "name": "Push-Up",
            "body_part": "chest",
            "target": "chest",
            "equipment": "bodyweight",
            "movement_type": "compound"
        }"#;
        let record: ExerciseRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.target, Some(MuscleGroup::Chest));
        assert!(record.synergists.is_empty());
        assert_eq!(record.tracking_type, TrackingType::Reps);
    }
}
