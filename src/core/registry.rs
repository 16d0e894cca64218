//! # Suite Registry Module / 套件注册表模块
//!
//! Resolves the configured suites into runnable [`TestSuite`]s: picks the
//! command for the run mode, derives display names, attaches a parser and
//! records why any suite was left out.
//!
//! 将配置中的套件解析为可运行的套件：按运行模式选择命令、
//! 推导显示名称、关联解析器，并记录每个被跳过套件的原因。

use glob::Pattern;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::core::config::{ConfigError, RunOptions, SuiteConfig, TestConfig};
use crate::core::parser::{split_reference, ParserRegistry, PatternParser, ResultParser};
use crate::core::planner;
use crate::infra::{fs, t};
use crate::reporting::{ReportLine, ReportSink};

/// Where a suite's autoreload watch points.
#[derive(Debug, Clone)]
pub struct WatchSpec {
    pub glob: Pattern,
    pub dir: PathBuf,
}

/// A resolved, runnable test suite. Immutable once built.
pub struct TestSuite {
    /// The unique name the suite was configured under.
    pub name: String,
    /// The one command this run executes (`command` or `wip_command`).
    pub command: String,
    /// Display label.
    pub short_name: String,
    pub parser: Arc<dyn ResultParser>,
    pub watch: Option<WatchSpec>,
    /// `true` when the parser was inferred from the command.
    pub autodetected: bool,
    pub timeout: Option<Duration>,
}

impl TestSuite {
    /// A suite with the default parser and nothing else configured.
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        let command = command.into();
        Self {
            name: name.into(),
            short_name: default_short_name(&command),
            command,
            parser: ParserRegistry::new().fallback(),
            watch: None,
            autodetected: true,
            timeout: None,
        }
    }

    pub fn with_parser(mut self, parser: Arc<dyn ResultParser>) -> Self {
        self.parser = parser;
        self.autodetected = false;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_watch(mut self, glob: Pattern, dir: PathBuf) -> Self {
        self.watch = Some(WatchSpec { glob, dir });
        self
    }
}

impl fmt::Debug for TestSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestSuite")
            .field("name", &self.name)
            .field("command", &self.command)
            .field("short_name", &self.short_name)
            .field("parser", &self.parser.name())
            .field("watch", &self.watch)
            .field("autodetected", &self.autodetected)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// The command up to, not including, its first space.
pub fn default_short_name(command: &str) -> String {
    let command = command.trim_start();
    command.split(' ').next().unwrap_or(command).to_string()
}

/// Why a configured suite does not run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    ExcludedByFilter,
    NoWipCommand,
    NoWatchGlob,
    ShardedOut { index: usize, count: usize },
}

impl SkipReason {
    pub fn describe(&self) -> String {
        match self {
            SkipReason::ExcludedByFilter => t!("skip.filtered").to_string(),
            SkipReason::NoWipCommand => t!("skip.no_wip_command").to_string(),
            SkipReason::NoWatchGlob => t!("skip.no_watch_glob").to_string(),
            SkipReason::ShardedOut { index, count } => {
                t!("skip.sharded_out", index = index, count = count).to_string()
            }
        }
    }
}

/// The outcome of resolving one configured suite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detection {
    Accepted {
        name: String,
        parser: String,
        autodetected: bool,
    },
    Skipped {
        name: String,
        reason: SkipReason,
    },
}

impl Detection {
    pub fn name(&self) -> &str {
        match self {
            Detection::Accepted { name, .. } | Detection::Skipped { name, .. } => name,
        }
    }

    /// The human readable detection line.
    pub fn to_line(&self) -> ReportLine {
        match self {
            Detection::Accepted {
                name,
                parser,
                autodetected: true,
            } => ReportLine::success(t!("detect.detected", name = name, parser = parser)),
            Detection::Accepted { name, parser, .. } => {
                ReportLine::success(t!("detect.configured", name = name, parser = parser))
            }
            Detection::Skipped { name, reason } => ReportLine::muted(t!(
                "detect.skipped",
                name = name,
                reason = reason.describe()
            )),
        }
    }
}

/// The resolved suites of one configuration under one set of options.
#[derive(Debug)]
pub struct SuiteRegistry {
    suites: Vec<Arc<TestSuite>>,
    detections: Vec<Detection>,
    eligible: usize,
}

impl SuiteRegistry {
    /// Resolves every configured suite.
    ///
    /// # Arguments
    /// * `config` - The loaded configuration
    /// * `options` - Run mode, name filter and shard
    /// * `parsers` - Parsers available to references and auto-detection
    /// * `base_dir` - Directory relative watch directories are resolved against
    ///
    /// # Returns
    /// The registry, or the first fatal configuration error
    pub fn build(
        config: &TestConfig,
        options: &RunOptions,
        parsers: &ParserRegistry,
        base_dir: &Path,
    ) -> Result<Self, ConfigError> {
        for name in &options.test_names {
            if !config.suites.contains_key(name) {
                return Err(ConfigError::UnknownSuite { name: name.clone() });
            }
        }

        let parsers = with_config_parsers(config, parsers)?;

        let mut detections = Vec::with_capacity(config.suites.len());
        let mut eligible = Vec::new();
        for (name, suite_config) in &config.suites {
            match resolve_suite(name, suite_config, options, &parsers, base_dir)? {
                Ok(suite) => {
                    detections.push(Detection::Accepted {
                        name: suite.name.clone(),
                        parser: suite.parser.name().to_string(),
                        autodetected: suite.autodetected,
                    });
                    eligible.push(Arc::new(suite));
                }
                Err(reason) => detections.push(Detection::Skipped {
                    name: name.clone(),
                    reason,
                }),
            }
        }

        let eligible_count = eligible.len();
        let plan = planner::plan_execution(eligible, options.shard);
        if let Some(shard) = options.shard {
            for detection in &mut detections {
                if plan.sharded_out.iter().any(|n| n == detection.name()) {
                    *detection = Detection::Skipped {
                        name: detection.name().to_string(),
                        reason: SkipReason::ShardedOut {
                            index: shard.index,
                            count: shard.count,
                        },
                    };
                }
            }
        }

        Ok(Self {
            suites: plan.suites_to_run,
            detections,
            eligible: eligible_count,
        })
    }

    /// The suites to run, in configuration order.
    pub fn suites(&self) -> &[Arc<TestSuite>] {
        &self.suites
    }

    /// One entry per configured suite, in configuration order.
    pub fn detections(&self) -> &[Detection] {
        &self.detections
    }

    /// Number of suites that passed every filter except sharding.
    pub fn eligible(&self) -> usize {
        self.eligible
    }

    pub fn is_empty(&self) -> bool {
        self.suites.is_empty()
    }

    /// Emits the detection block.
    pub fn emit_detections(&self, sink: &dyn ReportSink) {
        sink.emit(ReportLine::plain(t!("detect.header")));
        for detection in &self.detections {
            sink.emit(detection.to_line().indented(1));
        }
    }
}

/// Adds the configuration's pattern parsers ahead of `parsers`, keeping
/// their declaration order.
fn with_config_parsers(
    config: &TestConfig,
    parsers: &ParserRegistry,
) -> Result<ParserRegistry, ConfigError> {
    let mut parsers = parsers.clone();
    for (reference, parser_config) in config.parsers.iter().rev() {
        if split_reference(reference).is_none() {
            return Err(ConfigError::MalformedParserRef {
                suite: "parsers".to_string(),
                reference: reference.clone(),
            });
        }
        let parser = PatternParser::from_config(reference, parser_config)?;
        parsers.register_front(reference.clone(), Arc::new(parser));
    }
    Ok(parsers)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// Resolves one suite. The outer `Result` carries fatal errors, the inner
/// one the reason a valid suite is skipped.
fn resolve_suite(
    name: &str,
    config: &SuiteConfig,
    options: &RunOptions,
    parsers: &ParserRegistry,
    base_dir: &Path,
) -> Result<Result<TestSuite, SkipReason>, ConfigError> {
    let named_explicitly = options.test_names.iter().any(|n| n == name);
    if !options.test_names.is_empty() && !named_explicitly {
        return Ok(Err(SkipReason::ExcludedByFilter));
    }

    let command = if options.wip {
        match non_empty(&config.wip_command) {
            Some(command) => command,
            None if named_explicitly => {
                return Err(ConfigError::MissingWipCommand {
                    suite: name.to_string(),
                });
            }
            None => return Ok(Err(SkipReason::NoWipCommand)),
        }
    } else {
        non_empty(&config.command).ok_or_else(|| ConfigError::MissingCommand {
            suite: name.to_string(),
        })?
    };

    if options.autoreload && non_empty(&config.watch_glob).is_none() {
        return Ok(Err(SkipReason::NoWatchGlob));
    }

    let short_name = non_empty(&config.short_name)
        .map(str::to_string)
        .unwrap_or_else(|| default_short_name(command));

    let detection_command = non_empty(&config.command).unwrap_or(command);
    let (parser, autodetected) = match non_empty(&config.parser) {
        Some(reference) => (resolve_parser_reference(name, reference, parsers)?, false),
        None => (
            parsers
                .detect(detection_command)
                .unwrap_or_else(|| parsers.fallback()),
            true,
        ),
    };

    let watch = match non_empty(&config.watch_glob) {
        Some(glob) => {
            let pattern = Pattern::new(glob).map_err(|source| ConfigError::InvalidWatchGlob {
                suite: name.to_string(),
                glob: glob.to_string(),
                source,
            })?;
            let dir = fs::resolve_watch_dir(non_empty(&config.watch_dir), base_dir).map_err(
                |e| ConfigError::InvalidWatchDir {
                    suite: name.to_string(),
                    message: format!("{e:#}"),
                },
            )?;
            Some(WatchSpec { glob: pattern, dir })
        }
        None => None,
    };

    tracing::debug!(
        suite = name,
        command,
        parser = parser.name(),
        autodetected,
        "resolved suite"
    );

    Ok(Ok(TestSuite {
        name: name.to_string(),
        command: command.to_string(),
        short_name,
        parser,
        watch,
        autodetected,
        timeout: config.timeout_secs.map(Duration::from_secs),
    }))
}

fn resolve_parser_reference(
    suite: &str,
    reference: &str,
    parsers: &ParserRegistry,
) -> Result<Arc<dyn ResultParser>, ConfigError> {
    if split_reference(reference).is_none() {
        return Err(ConfigError::MalformedParserRef {
            suite: suite.to_string(),
            reference: reference.to_string(),
        });
    }
    parsers
        .get(reference)
        .ok_or_else(|| ConfigError::ParserNotFound {
            suite: suite.to_string(),
            reference: reference.to_string(),
        })
}
