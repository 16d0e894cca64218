//! # Reporting Module / 报告模块
//!
//! This module turns parser verdicts into report lines and a run summary.
//! Lines go through a [`ReportSink`]: the console sink prints them with
//! colors, the memory sink keeps them for embedding and tests.
//!
//! 此模块将解析器的判定转换为报告行和运行汇总。
//! 报告行通过报告接收器输出：控制台接收器带颜色打印，内存接收器用于嵌入和测试。

pub mod console;
pub mod sink;
pub mod summary;

// Re-export common reporting items
pub use console::ConsoleSink;
pub use sink::{MemorySink, ReportLine, ReportSink, Tone};
pub use summary::{report_results, RunSummary, SuiteReport};
