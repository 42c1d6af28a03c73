// Library interface for LiftRS modules
// This allows integration tests and benches to access the planning core

pub mod allocation;
pub mod assembler;
pub mod config;
pub mod error;
pub mod gateways;
pub mod history_store;
pub mod logging;
pub mod models;
pub mod recovery;
pub mod rep_cache;
pub mod rep_range;
pub mod set_scheme;
pub mod time_budget;
pub mod time_estimate;

// Re-export commonly used types for convenience
pub use models::*;
pub use allocation::{ExerciseAllocationPlanner, LowRecoveryPolicy};
pub use assembler::{PlanRequest, PlannerConfig, WorkoutPlanAssembler};
pub use config::AppConfig;
pub use error::{LiftError, Result};
pub use gateways::{
    ExerciseCatalog, InMemoryCatalog, InMemoryHistoryStore, PerformanceFeedbackGateway, StaticFeedback,
    StaticProfile, StimulusHistoryStore, UserProfileGateway,
};
pub use history_store::SqliteHistoryStore;
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use recovery::RecoveryEstimator;
pub use rep_cache::{CacheMetrics, RepRangeCache};
pub use set_scheme::{SetSchemePlanner, TemplateTable};
pub use time_budget::SessionTimeBudget;
pub use time_estimate::ExerciseTimeEstimator;
