//! # Configuration Module / 配置模块
//!
//! The typed form of the test configuration file and the runtime options the
//! CLI collects. The file format follows the extension: TOML (the default),
//! YAML or JSON. Suites keep the order they are declared in.
//!
//! 测试配置文件的类型化表示，以及 CLI 收集的运行时选项。
//! 文件格式由扩展名决定：TOML（默认）、YAML 或 JSON。
//! 套件保持其声明顺序。

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::parser::PatternParserConfig;

/// File looked up when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "tests.toml";

/// Fatal configuration problems. Each one stops the runner before any suite
/// is started.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file {} not found.", .path.display())]
    NotFound { path: PathBuf },

    #[error("Could not read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Trouble parsing {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Unsupported config file format for {}; use .toml, .yml, .yaml or .json.", .path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("{suite} is missing a command.")]
    MissingCommand { suite: String },

    #[error("{suite} has no wip_command, but it was requested in WIP mode.")]
    MissingWipCommand { suite: String },

    #[error(
        "'{reference}' in the {suite} section does not have both a module and a type. \
         Please format it as module.ParserName."
    )]
    MalformedParserRef { suite: String, reference: String },

    #[error("Unable to find a parser called '{reference}' for {suite}.")]
    ParserNotFound { suite: String, reference: String },

    #[error("Parser '{parser}' has an invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        parser: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("{suite} has an invalid watch_glob `{glob}`: {source}")]
    InvalidWatchGlob {
        suite: String,
        glob: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("{suite} has a watch_dir that cannot be expanded: {message}")]
    InvalidWatchDir { suite: String, message: String },

    #[error("There is no test suite called '{name}'.")]
    UnknownSuite { name: String },
}

/// The options of one suite, as written in the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SuiteConfig {
    /// Shell command that runs the suite.
    #[serde(default)]
    pub command: Option<String>,
    /// Alternate command used in work-in-progress mode.
    #[serde(default, alias = "wipCommand")]
    pub wip_command: Option<String>,
    /// Display label; defaults to the command up to its first space.
    #[serde(default, alias = "shortName")]
    pub short_name: Option<String>,
    /// Dotted parser reference, `module.ParserName`.
    #[serde(default)]
    pub parser: Option<String>,
    /// Files whose changes restart the run under autoreload.
    #[serde(default, alias = "watchGlob")]
    pub watch_glob: Option<String>,
    /// Directory the glob is evaluated in; the working directory when absent.
    #[serde(default, alias = "watchDir")]
    pub watch_dir: Option<String>,
    /// Kill the suite when it runs longer than this many seconds.
    #[serde(default, alias = "timeoutSecs")]
    pub timeout_secs: Option<u64>,
}

/// The whole configuration file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TestConfig {
    /// The language for the runner's output messages (e.g., "en", "zh-CN").
    #[serde(default)]
    pub language: Option<String>,

    /// Suite name to options, in declaration order.
    #[serde(default)]
    pub suites: IndexMap<String, SuiteConfig>,

    /// Parsers defined by patterns, keyed by their dotted reference.
    #[serde(default)]
    pub parsers: IndexMap<String, PatternParserConfig>,
}

/// Which shard of the suite list this invocation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardAssignment {
    /// Shard index `n`; only `n mod count` matters.
    pub index: usize,
    /// Shard count `m`; zero disables sharding.
    pub count: usize,
}

impl ShardAssignment {
    pub fn new(index: usize, count: usize) -> Self {
        Self { index, count }
    }

    /// Whether sharding is in effect at all.
    pub fn is_active(&self) -> bool {
        self.count >= 1
    }

    /// Whether the suite at 1-based `position` of the sorted list belongs
    /// to this shard.
    pub fn includes(&self, position: usize) -> bool {
        !self.is_active() || self.index % self.count == position % self.count
    }
}

/// Runtime options gathered by the CLI.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Run suites one at a time and mirror their output live.
    pub verbose: bool,
    /// Use each suite's `wip_command`.
    pub wip: bool,
    /// Watch files and re-run on change until interrupted.
    pub autoreload: bool,
    pub shard: Option<ShardAssignment>,
    /// Only run these suites; empty means all.
    pub test_names: Vec<String>,
}

impl RunOptions {
    /// Splits a comma separated CLI list of suite names.
    pub fn parse_test_names(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// The formats a configuration file can be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
    Json,
}

impl ConfigFormat {
    /// Picks the format from the file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "toml" => Some(Self::Toml),
            "yml" | "yaml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Parses configuration text in the given format.
pub fn parse_test_config(
    content: &str,
    format: ConfigFormat,
    path: &Path,
) -> Result<TestConfig, ConfigError> {
    let parsed: Result<TestConfig, String> = match format {
        ConfigFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
        ConfigFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
        ConfigFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
    };
    parsed.map_err(|message| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    })
}

/// Loads and parses the configuration file at `path`.
pub fn load_test_config(path: &Path) -> Result<TestConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ConfigError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    let format = ConfigFormat::from_path(path).ok_or_else(|| ConfigError::UnsupportedFormat {
        path: path.to_path_buf(),
    })?;
    let config = parse_test_config(&content, format, path)?;
    tracing::debug!(
        path = %path.display(),
        suites = config.suites.len(),
        parsers = config.parsers.len(),
        "loaded test configuration"
    );
    Ok(config)
}
