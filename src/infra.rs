//! # Infrastructure Module / 基础设施模块
//!
//! This module provides infrastructure services for Poly Runner,
//! including child-process capture, path handling, logging and i18n support.
//!
//! 此模块为 Poly Runner 提供基础设施服务，
//! 包括子进程捕获、路径处理、日志以及国际化支持。

pub mod command;
pub mod fs;
pub mod logging;

// Re-export i18n functions for easier access
pub use rust_i18n::t;
