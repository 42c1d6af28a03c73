//! Two-tier memoization in front of the rep-range and prescription pipeline
//!
//! Features:
//! - Hot tier: bounded LRU of rep ranges with a short TTL
//! - Conversion tier: fully built prescriptions stored as JSON bytes with a longer TTL
//! - Keys built from the feedback signal the pipeline branches on, with SHA256
//!   fingerprints over the prescription parameters
//! - Hit/miss/computation metrics
//! - Parallel prefetch and memory-pressure shedding
//!
//! Entries are checked against their TTL on every lookup, so a stale value is
//! never returned regardless of when invalidation runs. Concurrent misses on
//! the same key may both compute; the results are identical.

use lru::LruCache;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::mem::size_of;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::models::{
    ExercisePrescription, ExerciseRecord, ExperienceLevel, FitnessGoal, MovementType, MuscleRole,
    PerformanceFeedback, RepRange, SessionPhase, TrainingFormat,
};
use crate::rep_range::{compute_rep_range, FeedbackSignal, RecoveryBucket};
use crate::set_scheme::{SchemeSuggestion, SetTemplate};
use crate::time_estimate::TimeEstimateConfig;

/// Time source for TTL decisions
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    start: Instant,
    offset: Mutex<Duration>,
}

impl Default for ManualClock {
    fn default() -> Self {
        ManualClock {
            start: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(|e| e.into_inner());
        *offset += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let offset = self.offset.lock().unwrap_or_else(|e| e.into_inner());
        self.start + *offset
    }
}

/// Cached value with its insertion time
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub value: T,
    pub timestamp: Instant,
    pub ttl: Duration,
}

impl<T> CacheEntry<T> {
    pub fn new(value: T, timestamp: Instant, ttl: Duration) -> Self {
        CacheEntry { value, timestamp, ttl }
    }

    pub fn is_valid(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.timestamp) < self.ttl
    }
}

/// Cache sizing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    pub hot_capacity: usize,
    pub hot_ttl_secs: u64,
    pub conversion_capacity: usize,
    pub conversion_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            hot_capacity: 256,
            hot_ttl_secs: 5 * 60,
            conversion_capacity: 512,
            conversion_ttl_secs: 30 * 60,
        }
    }
}

/// Hot-tier key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepRangeKey {
    pub exercise_id: String,
    pub goal: FitnessGoal,
    pub phase: SessionPhase,
    pub movement: MovementType,
    pub recovery: RecoveryBucket,
    pub feedback: FeedbackSignal,
}

/// Inputs of the rep-range pipeline for one exercise
#[derive(Debug, Clone)]
pub struct RepRangeRequest {
    pub exercise_id: String,
    pub goal: FitnessGoal,
    pub phase: SessionPhase,
    pub movement: MovementType,
    pub recovery: RecoveryBucket,
    pub feedback: PerformanceFeedback,
}

impl RepRangeRequest {
    pub fn new(
        exercise: &ExerciseRecord,
        goal: FitnessGoal,
        phase: SessionPhase,
        recovery: RecoveryBucket,
        feedback: &PerformanceFeedback,
    ) -> Self {
        RepRangeRequest {
            exercise_id: exercise.id.clone(),
            goal,
            phase,
            movement: exercise.movement_type,
            recovery,
            feedback: feedback.clone(),
        }
    }

    pub fn key(&self) -> RepRangeKey {
        RepRangeKey {
            exercise_id: self.exercise_id.clone(),
            goal: self.goal,
            phase: self.phase,
            movement: self.movement,
            recovery: self.recovery,
            feedback: FeedbackSignal::from_feedback(&self.feedback),
        }
    }

    fn compute(&self) -> RepRange {
        compute_rep_range(self.goal, self.phase, self.movement, self.recovery, &self.feedback)
    }
}

/// Everything besides the exercise that determines a built prescription
#[derive(Debug, Clone, PartialEq)]
pub struct PrescriptionParameters {
    pub goal: FitnessGoal,
    pub experience: ExperienceLevel,
    pub role: MuscleRole,
    pub format: TrainingFormat,
    pub phase: SessionPhase,
    pub recovery: RecoveryBucket,
    pub feedback: PerformanceFeedback,
    pub warmup_sets_enabled: bool,
    pub suggestion: Option<SchemeSuggestion>,
    /// Template the scheme is bounded by
    pub template: SetTemplate,
    pub timing: TimeEstimateConfig,
}

/// Conversion-tier key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversionKey {
    pub exercise_id: String,
    pub parameters_hash: String,
    pub goal_hash: String,
}

impl ConversionKey {
    pub fn new(exercise: &ExerciseRecord, parameters: &PrescriptionParameters) -> Self {
        let parameters_hash = fingerprint(&[
            &format!("{:?}", parameters.experience),
            &format!("{:?}", parameters.role),
            &format!("{:?}", parameters.format),
            &format!("{:?}", parameters.phase),
            &format!("{:?}", parameters.recovery),
            &format!("{:?}", FeedbackSignal::from_feedback(&parameters.feedback)),
            &parameters.warmup_sets_enabled.to_string(),
            &format!("{:?}", parameters.suggestion),
            // Assemblers with different templates or timings can share one cache
            &format!("{:?}", parameters.template),
            &format!("{:?}", parameters.timing),
            // Catalog edits must not serve a prescription built from the old record
            &format!("{:?}", exercise),
        ]);
        ConversionKey {
            exercise_id: exercise.id.clone(),
            parameters_hash,
            goal_hash: fingerprint(&[&format!("{:?}", parameters.goal)]),
        }
    }
}

/// SHA256 over the parts, hex encoded
fn fingerprint(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}

/// Memory pressure signal from the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryPressure {
    /// Drop expired entries and halve the hot tier
    Warning,
    /// Drop everything and shrink to a quarter
    Critical,
}

/// Cache statistics and metrics
///
/// `total_requests` and `misses` count caller-facing lookups only: a
/// prescription request counts once even when building it consults the hot
/// tier. `hot_hits` and `conversion_hits` count hits per tier.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheMetrics {
    pub total_requests: u64,
    pub hot_hits: u64,
    pub conversion_hits: u64,
    pub misses: u64,
    pub computations: u64,
    pub evictions: u64,
    pub hot_entries: usize,
    pub conversion_entries: usize,
    pub memory_estimate_bytes: usize,
}

impl CacheMetrics {
    /// Get hit rate as percentage of caller-facing requests
    pub fn hit_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        let served = self.total_requests.saturating_sub(self.misses);
        (served as f64 / self.total_requests as f64) * 100.0
    }
}

#[derive(Debug, Default)]
struct Counters {
    requests: AtomicU64,
    hot_hits: AtomicU64,
    conversion_hits: AtomicU64,
    misses: AtomicU64,
    computations: AtomicU64,
    evictions: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

struct HotTier {
    entries: LruCache<RepRangeKey, CacheEntry<RepRange>>,
    ttl: Duration,
}

struct ConversionTier {
    entries: HashMap<ConversionKey, CacheEntry<Vec<u8>>>,
    capacity: usize,
    ttl: Duration,
}

impl ConversionTier {
    fn evict_oldest(&mut self) -> bool {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.timestamp)
            .map(|(key, _)| key.clone());
        match oldest {
            Some(key) => self.entries.remove(&key).is_some(),
            None => false,
        }
    }
}

/// Rep-range and prescription cache
pub struct RepRangeCache {
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    hot: Mutex<HotTier>,
    conversion: Mutex<ConversionTier>,
    counters: Counters,
}

const DEFAULT_HOT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(256) {
    Some(n) => n,
    None => unreachable!(),
};

fn capacity(entries: usize) -> NonZeroUsize {
    NonZeroUsize::new(entries).unwrap_or(DEFAULT_HOT_CAPACITY)
}

impl Default for RepRangeCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl RepRangeCache {
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        let hot = HotTier {
            entries: LruCache::new(capacity(config.hot_capacity)),
            ttl: Duration::from_secs(config.hot_ttl_secs),
        };
        let conversion = ConversionTier {
            entries: HashMap::new(),
            capacity: config.conversion_capacity.max(1),
            ttl: Duration::from_secs(config.conversion_ttl_secs),
        };
        RepRangeCache {
            config,
            clock,
            hot: Mutex::new(hot),
            conversion: Mutex::new(conversion),
            counters: Counters::default(),
        }
    }

    // A panic while holding a tier lock cannot leave an entry half-written,
    // so poisoned guards are safe to reuse.
    fn hot(&self) -> MutexGuard<'_, HotTier> {
        self.hot.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn conversion(&self) -> MutexGuard<'_, ConversionTier> {
        self.conversion.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Rep range for the request, computed on miss or expiry
    pub fn get_or_compute(&self, request: &RepRangeRequest) -> RepRange {
        Counters::bump(&self.counters.requests);
        let (value, hit) = self.lookup_rep_range(request);
        if !hit {
            Counters::bump(&self.counters.misses);
        }
        value
    }

    /// Rep range needed while building a prescription. The enclosing
    /// prescription request is already counted, so only tier hits and
    /// computations are recorded here.
    pub fn rep_range_for_prescription(&self, request: &RepRangeRequest) -> RepRange {
        self.lookup_rep_range(request).0
    }

    fn lookup_rep_range(&self, request: &RepRangeRequest) -> (RepRange, bool) {
        let key = request.key();
        let now = self.clock.now();

        {
            let mut hot = self.hot();
            let cached = hot.entries.get(&key).map(|entry| (entry.is_valid(now), entry.value));
            match cached {
                Some((true, value)) => {
                    Counters::bump(&self.counters.hot_hits);
                    debug!(exercise = %key.exercise_id, "Rep range cache hit");
                    return (value, true);
                }
                Some((false, _)) => {
                    hot.entries.pop(&key);
                }
                None => {}
            }
        }

        debug!(exercise = %key.exercise_id, "Rep range cache miss");

        // Lock released while computing
        let value = request.compute();
        Counters::bump(&self.counters.computations);

        let mut hot = self.hot();
        let ttl = hot.ttl;
        if let Some((evicted, _)) = hot.entries.push(key.clone(), CacheEntry::new(value, self.clock.now(), ttl)) {
            if evicted != key {
                Counters::bump(&self.counters.evictions);
            }
        }
        (value, false)
    }

    /// Fully built prescription for the key. Undecodable bytes are dropped and
    /// rebuilt rather than surfaced.
    pub fn get_or_build_prescription<F>(&self, key: &ConversionKey, build: F) -> ExercisePrescription
    where
        F: FnOnce() -> ExercisePrescription,
    {
        let now = self.clock.now();
        Counters::bump(&self.counters.requests);

        let cached = {
            let mut tier = self.conversion();
            let lookup = tier
                .entries
                .get(key)
                .map(|entry| entry.is_valid(now).then(|| entry.value.clone()));
            match lookup {
                Some(Some(bytes)) => Some(bytes),
                Some(None) => {
                    tier.entries.remove(key);
                    None
                }
                None => None,
            }
        };

        if let Some(bytes) = cached {
            match serde_json::from_slice::<ExercisePrescription>(&bytes) {
                Ok(prescription) => {
                    Counters::bump(&self.counters.conversion_hits);
                    debug!(exercise = %key.exercise_id, "Prescription cache hit");
                    return prescription;
                }
                Err(e) => {
                    warn!(exercise = %key.exercise_id, "Discarding undecodable cached prescription: {}", e);
                    self.conversion().entries.remove(key);
                }
            }
        }

        Counters::bump(&self.counters.misses);
        let prescription = build();
        Counters::bump(&self.counters.computations);

        match serde_json::to_vec(&prescription) {
            Ok(bytes) => {
                let mut tier = self.conversion();
                if !tier.entries.contains_key(key) && tier.entries.len() >= tier.capacity && tier.evict_oldest() {
                    Counters::bump(&self.counters.evictions);
                }
                let ttl = tier.ttl;
                tier.entries
                    .insert(key.clone(), CacheEntry::new(bytes, self.clock.now(), ttl));
            }
            Err(e) => warn!(exercise = %key.exercise_id, "Prescription not cached: {}", e),
        }
        prescription
    }

    /// Warm the hot tier for every exercise × phase × recovery bucket
    pub fn prefetch(&self, exercises: &[ExerciseRecord], goal: FitnessGoal, feedback: &PerformanceFeedback) -> usize {
        let requests: Vec<RepRangeRequest> = exercises
            .iter()
            .flat_map(|exercise| {
                SessionPhase::ALL.iter().flat_map(move |&phase| {
                    RecoveryBucket::ALL
                        .iter()
                        .map(move |&bucket| RepRangeRequest::new(exercise, goal, phase, bucket, feedback))
                })
            })
            .collect();

        let warmed = requests
            .par_iter()
            .map(|request| self.get_or_compute(request))
            .count();

        debug!("Prefetched {} rep ranges for {} exercises", warmed, exercises.len());
        warmed
    }

    /// Drop expired entries from both tiers
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();

        let hot_removed = {
            let mut hot = self.hot();
            let expired: Vec<RepRangeKey> = hot
                .entries
                .iter()
                .filter(|(_, entry)| !entry.is_valid(now))
                .map(|(key, _)| key.clone())
                .collect();
            for key in &expired {
                hot.entries.pop(key);
            }
            expired.len()
        };

        let conversion_removed = {
            let mut tier = self.conversion();
            let before = tier.entries.len();
            tier.entries.retain(|_, entry| entry.is_valid(now));
            before - tier.entries.len()
        };

        let removed = hot_removed + conversion_removed;
        if removed > 0 {
            debug!("Purged {} expired cache entries", removed);
        }
        removed
    }

    pub fn clear_all(&self) {
        self.hot().entries.clear();
        self.conversion().entries.clear();
        info!("Rep range cache cleared");
    }

    /// New feedback changes scheme quality signals, so nothing cached survives
    pub fn invalidate_for_feedback(&self) {
        info!("Invalidating rep range cache after feedback submission");
        self.clear_all();
    }

    /// Shrink capacity and TTL. Entries already stored are held to the reduced
    /// TTL as well. Limits stay reduced until `restore_limits`.
    pub fn apply_memory_pressure(&self, level: MemoryPressure) {
        let divisor = match level {
            MemoryPressure::Warning => 2,
            MemoryPressure::Critical => 4,
        };
        let hot_ttl = Duration::from_secs(self.config.hot_ttl_secs) / divisor;
        let conversion_ttl = Duration::from_secs(self.config.conversion_ttl_secs) / divisor;

        {
            let mut hot = self.hot();
            hot.ttl = hot_ttl;
            for (_, entry) in hot.entries.iter_mut() {
                entry.ttl = entry.ttl.min(hot_ttl);
            }
        }
        {
            let mut tier = self.conversion();
            tier.ttl = conversion_ttl;
            for entry in tier.entries.values_mut() {
                entry.ttl = entry.ttl.min(conversion_ttl);
            }
        }

        if level == MemoryPressure::Critical {
            self.clear_all();
        } else {
            self.purge_expired();
        }

        {
            let mut hot = self.hot();
            let reduced = capacity((self.config.hot_capacity / divisor as usize).max(1));
            let before = hot.entries.len();
            hot.entries.resize(reduced);
            let dropped = before.saturating_sub(hot.entries.len());
            self.counters.evictions.fetch_add(dropped as u64, Ordering::Relaxed);
        }
        {
            let mut tier = self.conversion();
            tier.capacity = (self.config.conversion_capacity / divisor as usize).max(1);
            while tier.entries.len() > tier.capacity && tier.evict_oldest() {
                Counters::bump(&self.counters.evictions);
            }
        }

        warn!("Applied {:?} memory pressure to rep range cache", level);
    }

    /// Return to the configured capacity and TTL
    pub fn restore_limits(&self) {
        {
            let mut hot = self.hot();
            hot.entries.resize(capacity(self.config.hot_capacity));
            hot.ttl = Duration::from_secs(self.config.hot_ttl_secs);
        }
        let mut tier = self.conversion();
        tier.capacity = self.config.conversion_capacity.max(1);
        tier.ttl = Duration::from_secs(self.config.conversion_ttl_secs);
    }

    pub fn metrics(&self) -> CacheMetrics {
        let (hot_entries, hot_bytes) = {
            let hot = self.hot();
            let bytes = hot
                .entries
                .iter()
                .map(|(key, _)| size_of::<RepRangeKey>() + key.exercise_id.len() + size_of::<CacheEntry<RepRange>>())
                .sum::<usize>();
            (hot.entries.len(), bytes)
        };
        let (conversion_entries, conversion_bytes) = {
            let tier = self.conversion();
            let bytes = tier
                .entries
                .iter()
                .map(|(key, entry)| {
                    size_of::<ConversionKey>()
                        + key.exercise_id.len()
                        + key.parameters_hash.len()
                        + key.goal_hash.len()
                        + size_of::<CacheEntry<Vec<u8>>>()
                        + entry.value.len()
                })
                .sum::<usize>();
            (tier.entries.len(), bytes)
        };

        CacheMetrics {
            total_requests: self.counters.requests.load(Ordering::Relaxed),
            hot_hits: self.counters.hot_hits.load(Ordering::Relaxed),
            conversion_hits: self.counters.conversion_hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            computations: self.counters.computations.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
            hot_entries,
            conversion_entries,
            memory_estimate_bytes: hot_bytes + conversion_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EquipmentArchetype, ExerciseTimeEstimate, MuscleGroup, SetScheme, TrackingType};
    use crate::set_scheme::TemplateTable;

    fn exercise(id: &str) -> ExerciseRecord {
        ExerciseRecord {
            id: id.to_string(),
            name: id.to_string(),
            body_part: "chest".to_string(),
            target: Some(MuscleGroup::Chest),
            synergists: vec![],
            equipment: EquipmentArchetype::Dumbbell,
            movement_type: MovementType::Compound,
            tracking_type: TrackingType::Reps,
        }
    }

    fn request(id: &str) -> RepRangeRequest {
        RepRangeRequest::new(
            &exercise(id),
            FitnessGoal::Hypertrophy,
            SessionPhase::VolumeFocus,
            RecoveryBucket::High,
            &PerformanceFeedback::default(),
        )
    }

    fn prescription(id: &str) -> ExercisePrescription {
        ExercisePrescription {
            exercise: exercise(id),
            muscle: MuscleGroup::Chest,
            role: MuscleRole::Primary,
            scheme: SetScheme {
                sets: 3,
                rep_range: RepRange::new(8, 12),
                target_reps: 10,
                rest_seconds: 90,
                load_percentage: Some(72.5),
                target_rpe: Some(8.0),
                override_reason: None,
            },
            set_durations_seconds: vec![],
            time: ExerciseTimeEstimate::default(),
        }
    }

    fn parameters() -> PrescriptionParameters {
        PrescriptionParameters {
            goal: FitnessGoal::Hypertrophy,
            experience: ExperienceLevel::Intermediate,
            role: MuscleRole::Primary,
            format: TrainingFormat::StraightSets,
            phase: SessionPhase::VolumeFocus,
            recovery: RecoveryBucket::High,
            feedback: PerformanceFeedback::default(),
            warmup_sets_enabled: true,
            suggestion: None,
            template: TemplateTable::default()
                .get(FitnessGoal::Hypertrophy, ExperienceLevel::Intermediate)
                .cloned()
                .unwrap(),
            timing: TimeEstimateConfig::default(),
        }
    }

    #[test]
    fn test_entry_validity() {
        let now = Instant::now();
        let entry = CacheEntry::new(1, now, Duration::from_secs(10));
        assert!(entry.is_valid(now));
        assert!(entry.is_valid(now + Duration::from_secs(9)));
        assert!(!entry.is_valid(now + Duration::from_secs(10)));
    }

    #[test]
    fn test_hit_after_miss() {
        let cache = RepRangeCache::default();
        let first = cache.get_or_compute(&request("bench"));
        let second = cache.get_or_compute(&request("bench"));

        assert_eq!(first, second);
        let metrics = cache.metrics();
        assert_eq!(metrics.total_requests, 2);
        assert_eq!(metrics.hot_hits, 1);
        assert_eq!(metrics.computations, 1);
        assert_eq!(metrics.hit_rate(), 50.0);
    }

    #[test]
    fn test_key_follows_feedback_signal() {
        let with_rpe = |rpe: f64| {
            let mut request = request("bench");
            request.feedback.average_rpe = Some(rpe);
            request.key()
        };
        assert_eq!(with_rpe(7.0), with_rpe(7.3));
        assert_ne!(with_rpe(8.5), with_rpe(8.54));

        let base = ConversionKey::new(&exercise("bench"), &parameters());
        let low_completion = ConversionKey::new(
            &exercise("bench"),
            &PrescriptionParameters {
                feedback: PerformanceFeedback {
                    completion_rate: Some(0.796),
                    ..PerformanceFeedback::default()
                },
                ..parameters()
            },
        );
        let full_completion = ConversionKey::new(
            &exercise("bench"),
            &PrescriptionParameters {
                feedback: PerformanceFeedback {
                    completion_rate: Some(0.8),
                    ..PerformanceFeedback::default()
                },
                ..parameters()
            },
        );
        assert_ne!(base, low_completion);
        assert_eq!(base, full_completion);
    }

    #[test]
    fn test_hot_tier_expires() {
        let clock = Arc::new(ManualClock::new());
        let cache = RepRangeCache::with_clock(CacheConfig::default(), clock.clone());

        cache.get_or_compute(&request("bench"));
        clock.advance(Duration::from_secs(5 * 60));
        cache.get_or_compute(&request("bench"));

        assert_eq!(cache.metrics().computations, 2);
        assert_eq!(cache.metrics().hot_hits, 0);
    }

    #[test]
    fn test_lru_eviction_counted() {
        let config = CacheConfig {
            hot_capacity: 2,
            ..CacheConfig::default()
        };
        let cache = RepRangeCache::new(config);
        cache.get_or_compute(&request("a"));
        cache.get_or_compute(&request("b"));
        cache.get_or_compute(&request("c"));

        let metrics = cache.metrics();
        assert_eq!(metrics.hot_entries, 2);
        assert_eq!(metrics.evictions, 1);
    }

    #[test]
    fn test_conversion_tier_round_trip() {
        let cache = RepRangeCache::default();
        let key = ConversionKey::new(&exercise("bench"), &parameters());
        let mut builds = 0;

        let first = cache.get_or_build_prescription(&key, || {
            builds += 1;
            prescription("bench")
        });
        let second = cache.get_or_build_prescription(&key, || {
            builds += 1;
            prescription("bench")
        });

        assert_eq!(first, second);
        assert_eq!(builds, 1);
        assert_eq!(cache.metrics().conversion_hits, 1);
        assert!(cache.metrics().memory_estimate_bytes > 0);
    }

    #[test]
    fn test_undecodable_entry_is_rebuilt() {
        let cache = RepRangeCache::default();
        let key = ConversionKey::new(&exercise("bench"), &parameters());
        let now = cache.clock.now();
        cache.conversion().entries.insert(
            key.clone(),
            CacheEntry::new(b"not json".to_vec(), now, Duration::from_secs(60)),
        );

        let rebuilt = cache.get_or_build_prescription(&key, || prescription("bench"));
        assert_eq!(rebuilt, prescription("bench"));
        assert_eq!(cache.metrics().conversion_hits, 0);
        assert_eq!(cache.metrics().computations, 1);

        cache.get_or_build_prescription(&key, || prescription("bench"));
        assert_eq!(cache.metrics().conversion_hits, 1);
    }

    #[test]
    fn test_parameters_change_key() {
        let base = ConversionKey::new(&exercise("bench"), &parameters());
        let accessory = ConversionKey::new(
            &exercise("bench"),
            &PrescriptionParameters {
                role: MuscleRole::Accessory,
                ..parameters()
            },
        );
        let strength = ConversionKey::new(
            &exercise("bench"),
            &PrescriptionParameters {
                goal: FitnessGoal::Strength,
                ..parameters()
            },
        );
        assert_ne!(base.parameters_hash, accessory.parameters_hash);
        assert_eq!(base.parameters_hash, strength.parameters_hash);
        assert_ne!(base.goal_hash, strength.goal_hash);
    }

    #[test]
    fn test_timing_and_template_change_key() {
        let base = ConversionKey::new(&exercise("bench"), &parameters());
        let slow = ConversionKey::new(
            &exercise("bench"),
            &PrescriptionParameters {
                timing: TimeEstimateConfig {
                    transition_seconds: 300.0,
                    ..TimeEstimateConfig::default()
                },
                ..parameters()
            },
        );
        let mut template = parameters().template;
        template.compound_sets = RepRange::new(6, 6);
        let overridden = ConversionKey::new(
            &exercise("bench"),
            &PrescriptionParameters {
                template,
                ..parameters()
            },
        );
        assert_ne!(base.parameters_hash, slow.parameters_hash);
        assert_ne!(base.parameters_hash, overridden.parameters_hash);
    }

    #[test]
    fn test_prescription_request_counted_once() {
        let cache = RepRangeCache::default();
        let key = ConversionKey::new(&exercise("bench"), &parameters());
        let build = || {
            cache.rep_range_for_prescription(&request("bench"));
            prescription("bench")
        };

        cache.get_or_build_prescription(&key, build);
        let metrics = cache.metrics();
        assert_eq!(metrics.total_requests, 1);
        assert_eq!(metrics.misses, 1);
        assert_eq!(metrics.computations, 2);

        cache.get_or_build_prescription(&key, build);
        let metrics = cache.metrics();
        assert_eq!(metrics.total_requests, 2);
        assert_eq!(metrics.misses, 1);
        assert_eq!(metrics.conversion_hits, 1);
        assert_eq!(metrics.hit_rate(), 50.0);
    }

    #[test]
    fn test_memory_pressure_shortens_live_entries() {
        let clock = Arc::new(ManualClock::new());
        let cache = RepRangeCache::with_clock(CacheConfig::default(), clock.clone());

        cache.get_or_compute(&request("old"));
        cache.get_or_build_prescription(&ConversionKey::new(&exercise("old"), &parameters()), || prescription("old"));
        clock.advance(Duration::from_secs(200));
        cache.get_or_compute(&request("young"));

        // Hot TTL drops to 150s, conversion TTL to 15 minutes
        cache.apply_memory_pressure(MemoryPressure::Warning);
        let metrics = cache.metrics();
        assert_eq!(metrics.hot_entries, 1);
        assert_eq!(metrics.conversion_entries, 1);

        clock.advance(Duration::from_secs(150));
        cache.get_or_compute(&request("young"));
        assert_eq!(cache.metrics().hot_hits, 0);

        clock.advance(Duration::from_secs(15 * 60));
        assert_eq!(cache.purge_expired(), 2);
    }

    #[test]
    fn test_memory_pressure_shrinks_and_restores() {
        let cache = RepRangeCache::new(CacheConfig {
            hot_capacity: 8,
            ..CacheConfig::default()
        });
        for id in ["a", "b", "c", "d", "e", "f"] {
            cache.get_or_compute(&request(id));
        }

        cache.apply_memory_pressure(MemoryPressure::Warning);
        assert_eq!(cache.metrics().hot_entries, 4);

        cache.apply_memory_pressure(MemoryPressure::Critical);
        assert_eq!(cache.metrics().hot_entries, 0);

        cache.restore_limits();
        for id in ["a", "b", "c", "d", "e", "f"] {
            cache.get_or_compute(&request(id));
        }
        assert_eq!(cache.metrics().hot_entries, 6);
    }

    #[test]
    fn test_prefetch_covers_all_combinations() {
        let cache = RepRangeCache::default();
        let exercises = vec![exercise("a"), exercise("b")];
        let warmed = cache.prefetch(&exercises, FitnessGoal::Strength, &PerformanceFeedback::default());

        assert_eq!(warmed, 2 * 3 * 3);
        assert_eq!(cache.metrics().hot_entries, 18);
    }
}
