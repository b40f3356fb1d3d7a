//! Read-only tip content loaded from TOML
//!
//! Loaded once at startup and passed to whatever needs it. Lookup order:
//! 1. Override file in the data dir (`~/.local/share/grocer/config/tips.toml`)
//! 2. Embedded default (compiled into the binary)

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::NewTip;
use crate::signal::ThresholdSignal;

/// Embedded default catalog
const DEFAULT_CATALOG: &str = include_str!("../../../../config/tips.toml");

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TipPriority {
    Low,
    Medium,
    High,
    Critical,
}

/// A canned tip from the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogTip {
    pub title: String,
    pub content: String,
    pub category: String,
    pub priority: TipPriority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    /// Northern-hemisphere meteorological season for a month (1-12)
    pub fn for_month(month: u32) -> Self {
        match month {
            3..=5 => Self::Spring,
            6..=8 => Self::Summer,
            9..=11 => Self::Autumn,
            _ => Self::Winter,
        }
    }

    pub fn for_date(date: NaiveDate) -> Self {
        Self::for_month(date.month())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spring => "spring",
            Self::Summer => "summer",
            Self::Autumn => "autumn",
            Self::Winter => "winter",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ThresholdSet {
    percent: u32,
    #[serde(default)]
    tips: Vec<CatalogTip>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SeasonalTips {
    #[serde(default)]
    spring: Vec<CatalogTip>,
    #[serde(default)]
    summer: Vec<CatalogTip>,
    #[serde(default)]
    autumn: Vec<CatalogTip>,
    #[serde(default)]
    winter: Vec<CatalogTip>,
}

/// Tip content keyed by tier, season and category
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TipCatalog {
    #[serde(default)]
    threshold: Vec<ThresholdSet>,
    #[serde(default)]
    seasonal: SeasonalTips,
    #[serde(default)]
    general: Vec<CatalogTip>,
    #[serde(default)]
    category: BTreeMap<String, Vec<CatalogTip>>,
    #[serde(default)]
    stored: Vec<NewTip>,
}

/// Default override path for the catalog
pub fn default_catalog_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("grocer").join("config").join("tips.toml"))
}

impl TipCatalog {
    /// Load the override file if present, otherwise the embedded catalog
    pub fn load() -> Result<Self> {
        Self::load_from(default_catalog_path().as_deref())
    }

    /// Load from `path` if it exists, otherwise the embedded catalog
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) if path.exists() => {
                debug!("Loading tip catalog from {}", path.display());
                let content = fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("Failed to read {}: {}", path.display(), e))
                })?;
                Self::from_toml(&content)
            }
            _ => Self::embedded(),
        }
    }

    /// The catalog compiled into the binary
    pub fn embedded() -> Result<Self> {
        Self::from_toml(DEFAULT_CATALOG)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let catalog: Self = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid tip catalog TOML: {}", e)))?;

        for set in &catalog.threshold {
            if ThresholdSignal::for_percentage(set.percent as f64).threshold() != Some(set.percent)
            {
                return Err(Error::Config(format!(
                    "Threshold tips must use 50, 75 or 90 percent (got {})",
                    set.percent
                )));
            }
        }
        Ok(catalog)
    }

    /// Tips for one alert tier. Empty for `ThresholdSignal::None`.
    pub fn threshold_tips(&self, signal: ThresholdSignal) -> &[CatalogTip] {
        let Some(percent) = signal.threshold() else {
            return &[];
        };
        self.threshold
            .iter()
            .find(|set| set.percent == percent)
            .map(|set| set.tips.as_slice())
            .unwrap_or(&[])
    }

    pub fn seasonal_tips(&self, season: Season) -> &[CatalogTip] {
        match season {
            Season::Spring => &self.seasonal.spring,
            Season::Summer => &self.seasonal.summer,
            Season::Autumn => &self.seasonal.autumn,
            Season::Winter => &self.seasonal.winter,
        }
    }

    pub fn general_tips(&self) -> &[CatalogTip] {
        &self.general
    }

    /// Tips for a category, matched on its lowercase name ("Personal Care" -> "personal_care")
    pub fn category_tips(&self, category_name: &str) -> &[CatalogTip] {
        self.category
            .get(&category_key(category_name))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Tips to seed into the tips table
    pub fn stored_tips(&self) -> &[NewTip] {
        &self.stored
    }
}

/// Lowercase, underscore-separated key used for tip categories
pub fn category_key(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}
