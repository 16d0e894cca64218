// src/cli.rs
use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::{env, ffi::OsString, path::PathBuf};

use crate::core::config::{RunOptions, ShardAssignment, DEFAULT_CONFIG_FILE};
use crate::infra::logging::{self, LogLevel};
use crate::infra::t;

pub mod commands;

/// Everything the command line asked for.
#[derive(Debug, Clone)]
pub struct CliArgs {
    pub config: PathBuf,
    /// Language given with `--lang`; `None` lets the config or system decide.
    pub lang: Option<String>,
    pub log_level: Option<LogLevel>,
    pub options: RunOptions,
}

/// Pre-parses the command line arguments to find the language setting.
/// This allows i18n to be initialized before the full CLI is built.
/// It looks for a `--lang <VALUE>` or `--lang=<VALUE>` argument.
fn pre_parse_language<I, T>(args: I) -> Option<String>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let args: Vec<String> = args
        .into_iter()
        .map(|arg| arg.into().to_string_lossy().into_owned())
        .collect();
    if let Some(pos) = args.iter().position(|arg| arg == "--lang") {
        return args.get(pos + 1).cloned();
    }
    args.iter()
        .find_map(|arg| arg.strip_prefix("--lang="))
        .map(str::to_string)
}

fn build_cli() -> Command {
    Command::new("poly-runner")
        .version(env!("CARGO_PKG_VERSION"))
        .about(t!("cli.about").to_string())
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help(t!("cli.config").to_string())
                .value_name("CONFIG")
                .default_value(DEFAULT_CONFIG_FILE)
                .value_parser(clap::value_parser!(PathBuf))
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help(t!("cli.verbose").to_string())
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("wip")
                .long("wip")
                .help(t!("cli.wip").to_string())
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("autoreload")
                .long("autoreload")
                .visible_alias("ci")
                .help(t!("cli.autoreload").to_string())
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("parallel")
                .long("parallel")
                .help(t!("cli.parallel").to_string())
                .value_names(["N", "M"])
                .num_args(2)
                .value_parser(clap::value_parser!(usize))
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("lang")
                .long("lang")
                .help(t!("cli.lang").to_string())
                .value_name("LANGUAGE")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .help(t!("cli.log_level").to_string())
                .value_name("LEVEL")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("tests")
                .help(t!("cli.tests").to_string())
                .value_name("TESTS")
                .action(ArgAction::Set),
        )
}

/// Parses the process arguments. Exits with clap's usage message on error.
pub fn parse_args() -> CliArgs {
    // Pre-parse language and initialize i18n first so help text is localized.
    crate::init(pre_parse_language(env::args_os()).as_deref());

    let matches = build_cli().get_matches();
    match args_from_matches(&matches) {
        Ok(args) => args,
        Err(e) => build_cli()
            .error(clap::error::ErrorKind::InvalidValue, format!("{e:#}"))
            .exit(),
    }
}

/// Parses `args` (including the binary name) without touching the process.
pub fn try_parse_args_from<I, T>(args: I) -> Result<CliArgs>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = build_cli().try_get_matches_from(args)?;
    args_from_matches(&matches)
}

fn args_from_matches(matches: &ArgMatches) -> Result<CliArgs> {
    let config = matches
        .get_one::<PathBuf>("config")
        .cloned()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    let log_level = matches
        .get_one::<String>("log-level")
        .map(|raw| LogLevel::parse(raw).with_context(|| format!("Unknown log level: {raw}")))
        .transpose()?;

    let shard = matches
        .get_many::<usize>("parallel")
        .map(|values| values.copied().collect::<Vec<_>>())
        .and_then(|values| match values.as_slice() {
            [index, count] => Some(ShardAssignment::new(*index, *count)),
            _ => None,
        });

    let options = RunOptions {
        verbose: matches.get_flag("verbose"),
        wip: matches.get_flag("wip"),
        autoreload: matches.get_flag("autoreload"),
        shard,
        test_names: matches
            .get_one::<String>("tests")
            .map(|raw| RunOptions::parse_test_names(raw))
            .unwrap_or_default(),
    };

    Ok(CliArgs {
        config,
        lang: matches.get_one::<String>("lang").cloned(),
        log_level,
        options,
    })
}

/// Runs the command line's request.
pub async fn process_command(args: CliArgs) -> Result<()> {
    logging::init_logger(args.log_level);
    tracing::debug!(?args, "parsed command line");
    commands::run::execute(args).await
}
