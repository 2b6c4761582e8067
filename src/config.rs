//! Configuration types for the dining engine.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveTime;
use netnutrition::SourceConfig;
use serde::{Deserialize, Serialize};

use crate::classifier::normalize_token;
use crate::error::{DiningError, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiningConfig {
    /// Daily refresh schedule and retry policy.
    pub refresh: RefreshConfig,
    /// Query limits.
    pub query: QueryConfig,
    /// Upstream NetNutrition instance.
    pub source: SourceConfig,
    /// Snapshot persistence.
    pub storage: StorageConfig,
    /// Known dining facilities. Replaces the built-in table when present.
    pub facilities: Vec<FacilityConfig>,
    /// Extra meal-name aliases, e.g. `bfast = "breakfast"`.
    pub meals: BTreeMap<String, String>,
}

impl Default for DiningConfig {
    fn default() -> Self {
        Self {
            refresh: RefreshConfig::default(),
            query: QueryConfig::default(),
            source: SourceConfig::default(),
            storage: StorageConfig::default(),
            facilities: default_facilities(),
            meals: BTreeMap::new(),
        }
    }
}

/// Refresh scheduling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Local hour of the daily refresh (0-23).
    pub trigger_hour: u8,
    /// Minute of the daily refresh (0-59).
    pub trigger_minute: u8,
    /// Fixed delay between failed attempts.
    pub retry_delay_secs: u64,
    /// Failed attempts before falling back to the persisted snapshot.
    pub max_retries: u32,
    /// Run one cycle as soon as the scheduler starts.
    pub refresh_on_startup: bool,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            trigger_hour: 4,
            trigger_minute: 0,
            retry_delay_secs: 300,
            max_retries: 5,
            refresh_on_startup: true,
        }
    }
}

impl RefreshConfig {
    /// Wall-clock time of the daily trigger.
    pub fn trigger_time(&self) -> Result<NaiveTime> {
        NaiveTime::from_hms_opt(
            u32::from(self.trigger_hour),
            u32::from(self.trigger_minute),
            0,
        )
        .ok_or_else(|| {
            DiningError::Config(format!(
                "invalid trigger time {:02}:{:02}",
                self.trigger_hour, self.trigger_minute
            ))
        })
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

/// Query configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Upper bound on facility × day × meal results per query.
    pub max_selections: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self { max_selections: 5 }
    }
}

/// Snapshot persistence configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Snapshot file. Defaults to `<data dir>/snapshot.json`.
    pub snapshot_path: Option<PathBuf>,
}

impl StorageConfig {
    pub fn snapshot_path(&self) -> PathBuf {
        self.snapshot_path
            .clone()
            .unwrap_or_else(crate::app_dirs::snapshot_file)
    }
}

/// A dining facility known to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacilityConfig {
    /// Stable slug, e.g. `kissam`.
    pub id: String,
    /// Upstream unit name as listed on the catalog landing page.
    pub unit: String,
    /// Alternative names accepted in queries.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Whether the facility publishes a menu. Hours-only facilities are
    /// not refreshed and are rejected in menu queries.
    #[serde(default = "default_true")]
    pub menu: bool,
    /// Shortcut command names registered for this facility.
    #[serde(default)]
    pub commands: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl FacilityConfig {
    pub fn new(id: &str, unit: &str) -> Self {
        Self {
            id: id.to_owned(),
            unit: unit.to_owned(),
            aliases: Vec::new(),
            menu: true,
            commands: Vec::new(),
        }
    }

    fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|a| (*a).to_owned()).collect();
        self
    }

    fn with_command(mut self, command: &str) -> Self {
        self.commands.push(command.to_owned());
        self
    }

    fn hours_only(mut self) -> Self {
        self.menu = false;
        self
    }
}

/// Built-in Vanderbilt Campus Dining facilities.
pub fn default_facilities() -> Vec<FacilityConfig> {
    vec![
        FacilityConfig::new("commons", "The Commons Dining Center")
            .with_aliases(&["the-commons", "commons-center"])
            .with_command("commons"),
        FacilityConfig::new("ebi", "E. Bronson Ingram Dining Center")
            .with_aliases(&["bronson-ingram", "ingram"])
            .with_command("ebi"),
        FacilityConfig::new("kissam", "Kissam Kitchen")
            .with_aliases(&["kitchen", "kissam-kitchen"])
            .with_command("kissam"),
        FacilityConfig::new("rand", "Rand Dining Center")
            .with_aliases(&["rand-dining"])
            .with_command("rand"),
        FacilityConfig::new("zeppos", "Nicholas S. Zeppos College")
            .with_aliases(&["zep", "zeppos-college"])
            .with_command("zeppos"),
        FacilityConfig::new("rothschild", "Rothschild Dining Center")
            .with_aliases(&["roth"])
            .with_command("rothschild"),
        FacilityConfig::new("suzies", "Suzie's Cafe at Blair")
            .with_aliases(&["suzies-blair"])
            .hours_only(),
        FacilityConfig::new("local-java", "Local Java at Alumni")
            .with_aliases(&["java"])
            .hours_only(),
    ]
}

impl DiningConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| DiningError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = self.to_toml()?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| DiningError::Config(e.to_string()))
    }

    /// Returns the default config file path: `<config dir>/config.toml`.
    pub fn default_config_path() -> PathBuf {
        crate::app_dirs::config_file()
    }

    /// Facilities that publish a menu and are refreshed.
    pub fn menu_facilities(&self) -> impl Iterator<Item = &FacilityConfig> {
        self.facilities.iter().filter(|f| f.menu)
    }

    /// Validates this configuration, returning an error if any field is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.refresh.trigger_hour > 23 || self.refresh.trigger_minute > 59 {
            return Err(DiningError::Config(format!(
                "trigger time {:02}:{:02} is out of range",
                self.refresh.trigger_hour, self.refresh.trigger_minute
            )));
        }
        if self.query.max_selections == 0 {
            return Err(DiningError::Config(
                "max_selections must be greater than 0".into(),
            ));
        }
        if self.facilities.is_empty() {
            return Err(DiningError::Config("no facilities configured".into()));
        }
        self.source
            .validate()
            .map_err(|e| DiningError::Config(e.to_string()))?;

        let mut ids = HashSet::new();
        let mut names = HashSet::new();
        for facility in &self.facilities {
            if facility.id.trim().is_empty() || facility.unit.trim().is_empty() {
                return Err(DiningError::Config(
                    "facility id and unit must not be empty".into(),
                ));
            }
            if !ids.insert(facility.id.as_str()) {
                return Err(DiningError::Config(format!(
                    "duplicate facility id: {}",
                    facility.id
                )));
            }
            let mut own = HashSet::new();
            for name in std::iter::once(&facility.id).chain(&facility.aliases) {
                let token = normalize_token(name);
                if own.insert(token.clone()) && !names.insert(token) {
                    return Err(DiningError::Config(format!(
                        "facility alias {name} is used more than once"
                    )));
                }
            }
        }

        for (alias, meal) in &self.meals {
            if meal.trim().is_empty() {
                return Err(DiningError::Config(format!(
                    "meal alias {alias} has no target"
                )));
            }
        }
        Ok(())
    }
}
