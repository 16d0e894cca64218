//! # Poly Runner Library / Poly Runner 库
//!
//! This library provides the engine behind the `poly-runner` tool: it runs
//! test suites written for different languages and frameworks concurrently
//! and reduces their output to one pass/fail summary.
//!
//! ## Modules
//!
//! - `core` - Configuration, suite registry, parsers, sharding, execution and autoreload
//! - `infra` - Infrastructure services like child-process capture, paths and logging
//! - `reporting` - Report sinks, console rendering and the run summary
//! - `cli` - Command-line interface and commands
//!
//! 此库为 `poly-runner` 工具提供引擎：并发运行以不同语言和框架编写的
//! 测试套件，并将其输出汇总为统一的通过/失败结果。

pub mod cli;
pub mod core;
pub mod infra;
pub mod reporting;

// Re-export commonly used items
pub use core::config;
pub use core::execution;
pub use core::models;
pub use core::parser;

/// Initializes the application's internationalization (i18n).
///
/// An explicit `language` wins; otherwise the system locale is used. The
/// full locale (e.g. "zh-CN") is tried first, then its language part
/// (e.g. "en" from "en-US"), and finally the default language ("en").
pub fn init(language: Option<&str>) {
    let locale = language
        .map(str::to_string)
        .or_else(sys_locale::get_locale)
        .unwrap_or_else(|| "en".to_string());
    rust_i18n::set_locale(resolve_locale(&locale));
}

/// Maps a requested locale onto one the catalogue actually ships.
pub fn resolve_locale(locale: &str) -> &str {
    let available_locales = rust_i18n::available_locales!();

    if available_locales.contains(&locale) {
        return locale;
    }
    locale
        .split(['-', '_'])
        .next()
        .filter(|lang_code| available_locales.contains(lang_code))
        .unwrap_or("en")
}

// Initialize i18n
rust_i18n::i18n!("locales", fallback = "en");

#[cfg(test)]
mod tests {
    use rust_i18n::t;

    // Lookups pass the locale explicitly so tests don't race on the global
    // setting.
    #[test]
    fn test_english_catalogue() {
        assert_eq!(t!("report.all_passed", locale = "en"), "All tests passed.");
        assert_eq!(
            t!("report.passed", locale = "en", name = "rspec", counts = " 3"),
            "✔ rspec - 3 tests passed."
        );
    }

    #[test]
    fn test_chinese_catalogue() {
        assert_eq!(t!("report.all_passed", locale = "zh-CN"), "所有测试均已通过。");
        assert_eq!(t!("watch.waiting", locale = "zh-CN"), "等待文件变化...");
    }
}
