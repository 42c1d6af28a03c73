use chrono::{Duration, TimeZone, Utc};
use tempfile::tempdir;

use liftrs::gateways::{ExerciseCatalog, InMemoryCatalog, StimulusHistoryStore};
use liftrs::history_store::SqliteHistoryStore;
use liftrs::models::{CompletedExercise, CompletedSet, MuscleGroup, ReadinessStatus, StimulusRecord};
use liftrs::recovery::{RecoveryConfig, RecoveryEstimator};

fn heavy_bench(catalog: &InMemoryCatalog, at: chrono::DateTime<Utc>) -> CompletedExercise {
    CompletedExercise {
        exercise: catalog.lookup("barbell-bench-press").unwrap(),
        sets: (0..6)
            .map(|_| CompletedSet {
                reps: 10,
                weight_kg: Some(100.0),
            })
            .collect(),
        completed_at: at,
    }
}

#[test]
fn test_history_survives_reopen() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("history.db");
    let date = Utc.with_ymd_and_hms(2025, 3, 1, 18, 0, 0).unwrap();

    {
        let store = SqliteHistoryStore::open(&db_path).unwrap();
        store
            .append(
                MuscleGroup::Hamstrings,
                StimulusRecord {
                    date,
                    intensity: 0.75,
                    volume: 24.0,
                },
            )
            .unwrap();
    }

    let store = SqliteHistoryStore::open(&db_path).unwrap();
    let records = store.load(MuscleGroup::Hamstrings).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].date, date);
    assert_eq!(records[0].intensity, 0.75);
    assert_eq!(store.record_count().unwrap(), 1);
}

#[test]
fn test_recorded_workout_drives_recovery() {
    let catalog = InMemoryCatalog::bundled().unwrap();
    let store = SqliteHistoryStore::open_in_memory().unwrap();
    let estimator = RecoveryEstimator::new(&store);
    let now = Utc::now();

    // Target plus two synergists
    let appended = estimator
        .record_workout(&[heavy_bench(&catalog, now)], Some(80.0), now)
        .unwrap();
    assert_eq!(appended, 3);

    let chest = estimator.recovery_of(MuscleGroup::Chest, now);
    assert_eq!(chest.intensity, 1.0);
    assert_eq!(chest.recovery_percentage, 0.0);
    assert_eq!(chest.readiness(), ReadinessStatus::Fatigued);

    let triceps = estimator.recovery_of(MuscleGroup::Triceps, now + Duration::hours(12));
    assert!((triceps.recovery_percentage - 50.0).abs() < 1e-6);

    let later = estimator.recovery_of(MuscleGroup::Chest, now + Duration::hours(72));
    assert_eq!(later.recovery_percentage, 100.0);
    assert_eq!(later.readiness(), ReadinessStatus::Ready);

    assert_eq!(
        estimator.recovery_of(MuscleGroup::Calves, now).recovery_percentage,
        100.0
    );
}

#[test]
fn test_retention_prunes_persisted_history() {
    let catalog = InMemoryCatalog::bundled().unwrap();
    let store = SqliteHistoryStore::open_in_memory().unwrap();
    let config = RecoveryConfig {
        max_records: 3,
        retention_days: 10,
        ..RecoveryConfig::default()
    };
    let estimator = RecoveryEstimator::with_config(&store, config);
    let now = Utc::now();

    store
        .append(
            MuscleGroup::Chest,
            StimulusRecord {
                date: now - Duration::days(20),
                intensity: 0.5,
                volume: 10.0,
            },
        )
        .unwrap();

    for day in (0..5).rev() {
        let at = now - Duration::days(day);
        estimator
            .record_workout(&[heavy_bench(&catalog, at)], None, now)
            .unwrap();
    }

    let chest = store.load(MuscleGroup::Chest).unwrap();
    assert_eq!(chest.len(), 3);
    assert!(chest.windows(2).all(|w| w[0].date <= w[1].date));
    assert!(chest.iter().all(|r| r.date >= now - Duration::days(10)));
    assert_eq!(chest.last().unwrap().date, now);
}

#[test]
fn test_empty_sets_record_nothing() {
    let catalog = InMemoryCatalog::bundled().unwrap();
    let store = SqliteHistoryStore::open_in_memory().unwrap();
    let estimator = RecoveryEstimator::new(&store);
    let now = Utc::now();

    let mut completed = heavy_bench(&catalog, now);
    completed.sets.clear();

    assert_eq!(estimator.record_workout(&[completed], None, now).unwrap(), 0);
    assert_eq!(store.record_count().unwrap(), 0);
}
