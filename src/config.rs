use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::assembler::PlannerConfig;
use crate::logging::LogConfig;
use crate::models::{UserProfile, Units};
use crate::recovery::RecoveryConfig;
use crate::rep_cache::CacheConfig;
use crate::set_scheme::{SetSchemePlanner, SetTemplate, TemplateTable};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application metadata
    pub metadata: ConfigMetadata,

    /// General application settings
    pub settings: AppSettings,

    /// Plan assembly settings
    #[serde(default)]
    pub planner: PlannerConfig,

    /// Rep range cache sizing
    #[serde(default)]
    pub cache: CacheConfig,

    /// Recovery model and history retention
    #[serde(default)]
    pub recovery: RecoveryConfig,

    /// Default user profile
    #[serde(default)]
    pub profile: UserProfile,

    #[serde(default)]
    pub logging: LogConfig,

    /// Per-combination set/rep template overrides
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub templates: Vec<SetTemplate>,
}

/// Configuration metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigMetadata {
    /// Configuration format version
    pub version: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Data directory path
    pub data_dir: PathBuf,

    /// Stimulus history database, relative paths resolve against `data_dir`
    pub history_db: PathBuf,

    /// Exercise catalog JSON, the bundled catalog when unset
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,

    /// Default units (metric/imperial)
    pub default_units: Units,
}

impl Default for AppConfig {
    fn default() -> Self {
        let now = Utc::now();

        AppConfig {
            metadata: ConfigMetadata {
                version: "1.0".to_string(),
                created_at: now,
                updated_at: now,
            },
            settings: AppSettings::default(),
            planner: PlannerConfig::default(),
            cache: CacheConfig::default(),
            recovery: RecoveryConfig::default(),
            profile: UserProfile::default(),
            logging: LogConfig::default(),
            templates: Vec::new(),
        }
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        AppSettings {
            data_dir: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".liftrs"),
            history_db: PathBuf::from("history.db"),
            catalog_path: None,
            default_units: Units::Metric,
        }
    }
}

/// Configuration management implementation
impl AppConfig {
    /// Load configuration from file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;

        // Malformed template overrides must fail here, not on the first plan
        config.set_scheme_planner()?;

        Ok(config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.metadata.updated_at = Utc::now();

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".liftrs")
            .join("config.toml")
    }

    /// Load configuration from the default path, or create default if not found
    pub fn load_or_default() -> Self {
        let config_path = Self::default_config_path();

        if !config_path.exists() {
            eprintln!("Config file not found, using defaults: {}", config_path.display());
            return Self::default();
        }

        match Self::load_from_file(&config_path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Ignoring unusable config {}: {:#}", config_path.display(), e);
                Self::default()
            }
        }
    }

    /// Save configuration to default path
    pub fn save_default(&mut self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to_file(config_path)
    }

    /// Resolved path of the stimulus history database
    pub fn history_db_path(&self) -> PathBuf {
        if self.settings.history_db.is_absolute() {
            self.settings.history_db.clone()
        } else {
            self.settings.data_dir.join(&self.settings.history_db)
        }
    }

    /// Default templates with this config's overrides applied
    pub fn template_table(&self) -> TemplateTable {
        TemplateTable::default().with_overrides(&self.templates)
    }

    /// Validated set-scheme planner for this config
    pub fn set_scheme_planner(&self) -> Result<SetSchemePlanner> {
        SetSchemePlanner::new(self.template_table()).with_context(|| "Invalid set/rep template configuration")
    }
}
