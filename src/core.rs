//! # Core Module / 核心模块
//!
//! This module contains the orchestration engine: configuration, the suite
//! registry, result parsers, shard planning, concurrent execution and the
//! autoreload watcher.
//!
//! 此模块包含编排引擎：配置、套件注册表、结果解析器、
//! 分片规划、并发执行以及自动重载监视器。

pub mod config;
pub mod execution;
pub mod models;
pub mod parser;
pub mod planner;
pub mod registry;
pub mod watcher;

// Re-exports
pub use config::TestConfig;
pub use execution::run_suites;
pub use models::RunResult;
pub use registry::TestSuite;
