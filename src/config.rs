use std::{path::{Path, PathBuf}, time::Duration};
use serde::Deserialize;
use serde_with::{serde_as, DurationSeconds};

use crate::db::IDType;

/// Configuration de l'application
///
/// Le fichier de configuration est au format JSON. Seuls `token` et
/// `admin_channel` sont obligatoires, le reste possède une valeur par défaut.
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub token: String,
    #[serde(default = "default_prefix")]
    pub prefix: char,
    /// Salon partagé des administrateurs
    pub admin_channel: u64,
    /// Administrateurs seniors, fixés par la configuration et non par la base
    #[serde(default)]
    pub senior_admins: Vec<IDType>,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub reminders: ReminderConfig,
    #[serde(default)]
    pub prompts: PromptConfig,
    #[serde(default)]
    pub tickets: TicketPolicy,
    #[serde(skip)]
    filepath: PathBuf,
}

/// Seuils de relance des tickets en souffrance.
#[serde_as]
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct ReminderConfig {
    /// Intervalle entre deux passages
    #[serde_as(as = "DurationSeconds<u64>")]
    pub interval: Duration,
    /// Ancienneté d'un ticket `new` non pris en charge
    #[serde_as(as = "DurationSeconds<u64>")]
    pub new_after: Duration,
    /// Durée sans changement d'un ticket `on_hold`
    #[serde_as(as = "DurationSeconds<u64>")]
    pub on_hold_after: Duration,
    /// Durée sans changement d'un ticket `in_progress`
    #[serde_as(as = "DurationSeconds<u64>")]
    pub in_progress_after: Duration,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5 * 60),
            new_after: Duration::from_secs(30 * 60),
            on_hold_after: Duration::from_secs(24 * 60 * 60),
            in_progress_after: Duration::from_secs(48 * 60 * 60),
        }
    }
}

/// Table de correspondance des invites de réponse.
#[serde_as]
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct PromptConfig {
    #[serde_as(as = "DurationSeconds<u64>")]
    pub ttl: Duration,
    pub capacity: usize,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(60 * 60),
            capacity: 1024,
        }
    }
}

/// Règles d'attribution des tickets.
#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(default)]
pub struct TicketPolicy {
    /// Si vrai, seul l'administrateur assigné peut mettre en attente,
    /// reprendre ou répondre sur un ticket assigné.
    pub assignee_only: bool,
}

fn default_prefix() -> char {
    '!'
}
fn default_database_url() -> String {
    "sqlite://data/helpdesk.db?mode=rwc".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn load<P: AsRef<Path>>(filepath: P) -> Result<Self, String> {
        let str_config = match std::fs::read_to_string(filepath.as_ref()) {
            Ok(v) => v,
            Err(e) => return Err(format!("Unable to read file {}: {}", filepath.as_ref().to_string_lossy(), e)),
        };
        let mut config = Self::parse(&str_config)
            .map_err(|e| format!("Unable to parse {}: {}", filepath.as_ref().to_string_lossy(), e))?;
        config.filepath = filepath.as_ref().to_path_buf();
        Ok(config)
    }
    pub fn parse(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }
    pub fn filepath(&self) -> &Path {
        &self.filepath
    }
}
