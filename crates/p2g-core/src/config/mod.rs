//! Runtime configuration shared by the API and CLI.
//!
//! Everything is read from environment variables. Parsing goes through
//! [`AppConfig::from_lookup`] so tests can feed a plain map instead of
//! mutating the process environment.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use thiserror::Error;

use crate::pipeline::CommandSpec;
use crate::util::normalize_text_option;

pub const OUTPUT_DIRECTORY_VAR: &str = "P2G_OUTPUT_DIRECTORY";
pub const DB_PATH_VAR: &str = "P2G_DB_PATH";
pub const DOWNLOAD_COMMAND_VAR: &str = "P2G_DOWNLOAD_COMMAND";
pub const CONVERT_COMMANDS_VAR: &str = "P2G_CONVERT_COMMANDS";
pub const UPLOAD_COMMAND_VAR: &str = "P2G_UPLOAD_COMMAND";
pub const DEFAULT_NUM_WORKOUTS_VAR: &str = "P2G_DEFAULT_NUM_WORKOUTS";

const DEFAULT_OUTPUT_DIRECTORY: &str = "./output";
const DEFAULT_DB_PATH: &str = "./data/p2g.db";
const DEFAULT_NUM_WORKOUTS: u32 = 5;
/// Upper bound on the number of workouts a single run may request
pub const MAX_NUM_WORKOUTS: u32 = 1_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Where converted files are written; operators upload from here by hand
    /// when the upload stage fails.
    pub output_directory: PathBuf,
    /// libSQL database holding the persisted sync status
    pub db_path: PathBuf,
    pub download_command: Option<CommandSpec>,
    /// Converters, run in the listed order
    pub convert_commands: Vec<CommandSpec>,
    pub upload_command: Option<CommandSpec>,
    /// Workout count used when a caller does not ask for one
    pub default_num_workouts: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_directory: PathBuf::from(DEFAULT_OUTPUT_DIRECTORY),
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            download_command: None,
            convert_commands: Vec::new(),
            upload_command: None,
            default_num_workouts: DEFAULT_NUM_WORKOUTS,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let output_directory = PathBuf::from(value_or_default(
            &lookup,
            OUTPUT_DIRECTORY_VAR,
            DEFAULT_OUTPUT_DIRECTORY,
        ));
        let db_path = PathBuf::from(value_or_default(&lookup, DB_PATH_VAR, DEFAULT_DB_PATH));

        let download_command = optional_trimmed(&lookup, DOWNLOAD_COMMAND_VAR)
            .as_deref()
            .and_then(CommandSpec::parse);
        let upload_command = optional_trimmed(&lookup, UPLOAD_COMMAND_VAR)
            .as_deref()
            .and_then(CommandSpec::parse);
        let convert_commands = optional_trimmed(&lookup, CONVERT_COMMANDS_VAR)
            .map(|raw| raw.split(';').filter_map(CommandSpec::parse).collect())
            .unwrap_or_default();

        let default_num_workouts = value_or_default(
            &lookup,
            DEFAULT_NUM_WORKOUTS_VAR,
            &DEFAULT_NUM_WORKOUTS.to_string(),
        )
        .parse::<u32>()
        .map_err(|_| {
            ConfigError::Invalid(format!(
                "{DEFAULT_NUM_WORKOUTS_VAR} must be an integer in [1, {MAX_NUM_WORKOUTS}]"
            ))
        })?;
        if !(1..=MAX_NUM_WORKOUTS).contains(&default_num_workouts) {
            return Err(ConfigError::Invalid(format!(
                "{DEFAULT_NUM_WORKOUTS_VAR} must be in [1, {MAX_NUM_WORKOUTS}]"
            )));
        }

        Ok(Self {
            output_directory,
            db_path,
            download_command,
            convert_commands,
            upload_command,
            default_num_workouts,
        })
    }

    /// Whether the download and upload commands needed to run a sync are set.
    pub const fn is_pipeline_configured(&self) -> bool {
        self.download_command.is_some() && self.upload_command.is_some()
    }
}

fn value_or_default(lookup: impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    optional_trimmed(lookup, name).unwrap_or_else(|| default.to_string())
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    normalize_text_option(lookup(name))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;

    fn config_from(map: &HashMap<&str, &str>) -> Result<AppConfig, ConfigError> {
        AppConfig::from_lookup(|key| map.get(key).map(|value| (*value).to_string()))
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = config_from(&HashMap::new()).unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(!config.is_pipeline_configured());
    }

    #[test]
    fn parses_pipeline_commands() {
        let mut map = HashMap::new();
        map.insert(OUTPUT_DIRECTORY_VAR, " /srv/p2g/output ");
        map.insert(DOWNLOAD_COMMAND_VAR, "fetch-workouts --format json");
        map.insert(CONVERT_COMMANDS_VAR, "to-fit ; ;to-tcx --strict");
        map.insert(UPLOAD_COMMAND_VAR, "gupload");
        map.insert(DEFAULT_NUM_WORKOUTS_VAR, "12");

        let config = config_from(&map).unwrap();
        assert_eq!(config.output_directory, PathBuf::from("/srv/p2g/output"));
        assert_eq!(
            config.download_command,
            CommandSpec::parse("fetch-workouts --format json")
        );
        assert_eq!(config.convert_commands.len(), 2);
        assert_eq!(config.convert_commands[1].program(), "to-tcx");
        assert_eq!(config.convert_commands[1].args(), ["--strict".to_string()]);
        assert_eq!(config.default_num_workouts, 12);
        assert!(config.is_pipeline_configured());
    }

    #[test]
    fn rejects_out_of_range_default_count() {
        let mut map = HashMap::new();
        map.insert(DEFAULT_NUM_WORKOUTS_VAR, "0");
        let err = config_from(&map).unwrap_err();
        assert!(err.to_string().contains(DEFAULT_NUM_WORKOUTS_VAR));

        map.insert(DEFAULT_NUM_WORKOUTS_VAR, "lots");
        assert!(config_from(&map).is_err());
    }
}
