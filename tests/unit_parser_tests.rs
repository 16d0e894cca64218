//! # Parser Unit Tests / 解析器单元测试
//!
//! Exercises the bundled framework parsers, the parser registry and
//! configuration-defined pattern parsers against captured output samples.
//!
//! 使用捕获的输出样本测试内置框架解析器、解析器注册表以及配置定义的模式解析器。

mod common;

use common::finished;
use poly_runner::core::parser::{
    split_reference, CountError, DjangoParser, KarmaParser, NoseParser, ParserRegistry,
    PatternParser, PatternParserConfig, ProtractorParser, PyTestParser, ResultParser, RspecParser,
    SaladParser, StandardParser, UnittestParser,
};
use proptest::prelude::*;

/// `(passed, failed, total)` as counted by `parser`.
fn counts(parser: &dyn ResultParser, output: &str) -> (usize, usize, usize) {
    let counter = parser.counter().expect("parser should count tests");
    let result = finished(output, 1);
    (
        counter.num_passed(&result).unwrap(),
        counter.num_failed(&result).unwrap(),
        counter.num_total(&result).unwrap(),
    )
}

#[cfg(test)]
mod standard_parser_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_verdict_follows_exit_code() {
        let parser = StandardParser;
        assert!(parser.tests_passed(&finished("anything", 0)));
        assert!(!parser.tests_passed(&finished("anything", 2)));
        assert!(parser.counter().is_none());
    }

    #[test]
    fn test_no_exit_code_fails() {
        let result = poly_runner::core::models::RunResult::finished("killed", None);
        assert!(!StandardParser.tests_passed(&result));
    }
}

#[cfg(test)]
mod unittest_family_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const FAILED_RUN: &str = "\
......F.E.
======================================================================
FAIL: test_thing (app.tests.ThingTest)
----------------------------------------------------------------------
Ran 10 tests in 0.031s

FAILED (errors=1, failures=2)
";

    #[test]
    fn test_unittest_folds_errors_into_failures() {
        assert_eq!(counts(&UnittestParser, FAILED_RUN), (7, 3, 10));
    }

    #[test]
    fn test_nose_folds_errors_into_failures() {
        assert_eq!(counts(&NoseParser, FAILED_RUN), (7, 3, 10));
    }

    #[test]
    fn test_django_keeps_errors_separate() {
        assert_eq!(counts(&DjangoParser, FAILED_RUN), (8, 2, 10));
        let counter = DjangoParser.counter().unwrap();
        assert_eq!(counter.num_error(&finished(FAILED_RUN, 1)), Ok(1));
    }

    /// A rerun inside the same output: the second summary is the one that
    /// counts.
    #[test]
    fn test_second_status_block_wins() {
        let output = "\
Ran 3 tests in 0.010s

FAILED (failures=1)
Ran 5 tests in 0.020s

FAILED (failures=2)
";
        assert_eq!(counts(&UnittestParser, output), (3, 2, 5));
        assert_eq!(counts(&NoseParser, output), (3, 2, 5));
        assert_eq!(counts(&DjangoParser, output), (3, 2, 5));
    }

    #[test]
    fn test_ok_run_has_no_failures() {
        let output = "Ran 4 tests in 0.002s\n\nOK (skipped=1)\n";
        assert_eq!(counts(&UnittestParser, output), (4, 0, 4));
    }

    #[test]
    fn test_missing_ran_line_is_an_error() {
        let counter = UnittestParser.counter().unwrap();
        let result = finished("ImportError: no module named app\n", 1);
        assert!(matches!(
            counter.num_total(&result),
            Err(CountError::NoMatch { .. })
        ));
    }

    #[test]
    fn test_command_detection() {
        assert!(DjangoParser.command_matches("python manage.py test"));
        assert!(NoseParser.command_matches("nosetests --with-coverage"));
        assert!(NoseParser.command_matches("python -m nose tests/"));
        assert!(!NoseParser.command_matches("python manage.py test"));
        assert!(UnittestParser.command_matches("python -m unittest discover"));
    }
}

#[cfg(test)]
mod pytest_parser_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_all_tokens_present() {
        let output = "==== 2 failed, 10 passed, 1 error in 1.00 seconds ====";
        assert_eq!(counts(&PyTestParser, output), (10, 3, 13));
        let counter = PyTestParser.counter().unwrap();
        assert_eq!(counter.num_error(&finished(output, 1)), Ok(1));
    }

    #[test]
    fn test_absent_tokens_count_as_zero() {
        assert_eq!(counts(&PyTestParser, "==== 5 passed in 0.2s ===="), (5, 0, 5));
        assert_eq!(counts(&PyTestParser, "==== 3 failed in 0.2s ===="), (0, 3, 3));
    }

    #[test]
    fn test_second_summary_wins() {
        let output = "==== 1 failed, 2 passed in 0.1s ====\n==== 4 failed, 6 passed in 0.3s ====\n";
        assert_eq!(counts(&PyTestParser, output), (6, 4, 10));
    }

    #[test]
    fn test_colored_summary_is_counted() {
        let output = "\x1b[31m==== \x1b[1m1 failed\x1b[0m, \x1b[32m2 passed\x1b[0m ====";
        assert_eq!(counts(&PyTestParser, output), (2, 1, 3));
    }

    #[test]
    fn test_command_detection() {
        assert!(PyTestParser.command_matches("py.test -x"));
        assert!(PyTestParser.command_matches("python -m pytest"));
        assert!(!PyTestParser.command_matches("cargo test"));
    }
}

#[cfg(test)]
mod rspec_parser_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_examples_and_failures() {
        let output = "Finished in 0.1 seconds\n12 examples, 3 failures\n";
        assert_eq!(counts(&RspecParser, output), (9, 3, 12));
        let counter = RspecParser.counter().unwrap();
        assert_eq!(counter.num_error(&finished(output, 1)), Ok(3));
    }

    #[test]
    fn test_second_summary_wins() {
        let output = "4 examples, 1 failure\n\n9 examples, 2 failures\n";
        assert_eq!(counts(&RspecParser, output), (7, 2, 9));
    }

    #[test]
    fn test_singular_forms() {
        assert_eq!(counts(&RspecParser, "1 example, 1 failure"), (0, 1, 1));
    }
}

#[cfg(test)]
mod karma_parser_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Karma redraws its progress line; only the final one counts.
    #[test]
    fn test_last_progress_line_wins() {
        let output = "\
Executed 1 of 3 SUCCESS (0 secs / 0.001 secs)\r\
Executed 2 of 3 (1 FAILED) (0 secs / 0.002 secs)\r\
Executed 3 of 3 (2 FAILED) (0.005 secs / 0.003 secs)\n";
        assert_eq!(counts(&KarmaParser, output), (1, 2, 3));
    }

    #[test]
    fn test_success_line_has_no_failures() {
        assert_eq!(
            counts(&KarmaParser, "Executed 5 of 5 SUCCESS (0.01 secs / 0.009 secs)"),
            (5, 0, 5)
        );
    }

    #[test]
    fn test_no_progress_line_is_an_error() {
        let counter = KarmaParser.counter().unwrap();
        assert!(counter.num_failed(&finished("ERROR: browser crashed", 1)).is_err());
    }
}

#[cfg(test)]
mod protractor_parser_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_total_is_the_assertion_count() {
        let output = "Finished in 3.2 seconds\n2 tests, 5 assertions, 1 failure\n";
        assert_eq!(counts(&ProtractorParser, output), (4, 1, 5));
    }

    #[test]
    fn test_second_summary_wins() {
        let output = "1 test, 2 assertions, 2 failures\n3 tests, 8 assertions, 1 failure\n";
        assert_eq!(counts(&ProtractorParser, output), (7, 1, 8));
    }
}

#[cfg(test)]
mod salad_parser_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_step_summary() {
        let output = "1 feature (0 passed)\n2 scenarios (1 passed)\n7 steps (2 failed, 1 skipped, 4 passed)\n";
        assert_eq!(counts(&SaladParser, output), (4, 3, 7));
    }

    #[test]
    fn test_second_step_summary_wins() {
        let output = "4 steps (4 failed)\n6 steps (1 failed, 5 passed)\n";
        assert_eq!(counts(&SaladParser, output), (5, 1, 6));
    }

    #[test]
    fn test_all_steps_passed() {
        assert_eq!(counts(&SaladParser, "3 steps (3 passed)"), (3, 0, 3));
    }
}

#[cfg(test)]
mod pattern_parser_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cargo_config() -> PatternParserConfig {
        PatternParserConfig {
            command_matches: Some("cargo test".to_string()),
            passed: Some(r"(\d+) passed;".to_string()),
            failed: Some(r"(\d+) failed;".to_string()),
            ..PatternParserConfig::default()
        }
    }

    #[test]
    fn test_total_is_derived_from_passed_and_failed() {
        let parser = PatternParser::from_config("acme.CargoParser", &cargo_config()).unwrap();
        assert_eq!(parser.name(), "CargoParser");
        assert!(parser.command_matches("cargo test --all"));
        assert_eq!(
            counts(&parser, "test result: FAILED. 7 passed; 2 failed; 0 ignored"),
            (7, 2, 9)
        );
    }

    #[test]
    fn test_passed_is_derived_from_total_and_failed() {
        let config = PatternParserConfig {
            total: Some(r"(\d+) specs".to_string()),
            failed: Some(r"(\d+) failures".to_string()),
            ..PatternParserConfig::default()
        };
        let parser = PatternParser::from_config("acme.SpecParser", &config).unwrap();
        assert_eq!(counts(&parser, "10 specs, 4 failures"), (6, 4, 10));
    }

    #[test]
    fn test_fold_errors() {
        let config = PatternParserConfig {
            error: Some(r"(\d+) errors".to_string()),
            fold_errors: true,
            ..cargo_config()
        };
        let parser = PatternParser::from_config("acme.CargoParser", &config).unwrap();
        assert_eq!(counts(&parser, "5 passed; 1 failed; 2 errors"), (5, 3, 8));
    }

    #[test]
    fn test_invalid_pattern_is_a_config_error() {
        let config = PatternParserConfig {
            passed: Some("(unclosed".to_string()),
            ..PatternParserConfig::default()
        };
        let err = PatternParser::from_config("acme.Broken", &config).unwrap_err();
        assert!(err.to_string().contains("acme.Broken"));
    }

    #[test]
    fn test_without_patterns_there_is_no_counter() {
        let parser =
            PatternParser::from_config("acme.Plain", &PatternParserConfig::default()).unwrap();
        assert!(parser.counter().is_none());
        assert!(!parser.command_matches("anything"));
    }
}

#[cfg(test)]
mod registry_tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[test]
    fn test_bundled_lookup_by_reference() {
        let registry = ParserRegistry::bundled();
        let parser = registry.get("poly_runner.parsers.KarmaParser").unwrap();
        assert_eq!(parser.name(), "karma");
        assert!(registry.get("poly_runner.parsers.Missing").is_none());
    }

    #[test]
    fn test_detection_order() {
        let registry = ParserRegistry::bundled();
        let detect = |command: &str| registry.detect(command).map(|p| p.name().to_string());
        assert_eq!(detect("python manage.py test").as_deref(), Some("django"));
        assert_eq!(detect("nosetests").as_deref(), Some("nose"));
        assert_eq!(detect("py.test tests/").as_deref(), Some("py.test"));
        assert_eq!(detect("bundle exec rspec").as_deref(), Some("rspec"));
        assert_eq!(detect("node_modules/.bin/karma start").as_deref(), Some("karma"));
        assert_eq!(detect("protractor conf.js").as_deref(), Some("protractor"));
        assert_eq!(detect("python manage.py harvest # salad").as_deref(), Some("salad"));
        assert_eq!(detect("make check"), None);
        assert_eq!(registry.fallback().name(), "standard");
    }

    #[test]
    fn test_front_registration_wins_detection() {
        let mut registry = ParserRegistry::bundled();
        let config = PatternParserConfig {
            command_matches: Some("karma".to_string()),
            ..PatternParserConfig::default()
        };
        let parser = PatternParser::from_config("acme.MyKarma", &config).unwrap();
        registry.register_front("acme.MyKarma", Arc::new(parser));
        assert_eq!(registry.detect("karma start").unwrap().name(), "MyKarma");
        assert_eq!(registry.references().next(), Some("acme.MyKarma"));
    }

    #[test]
    fn test_split_reference() {
        assert_eq!(
            split_reference("poly_runner.parsers.KarmaParser"),
            Some(("poly_runner.parsers", "KarmaParser"))
        );
        assert_eq!(split_reference("KarmaParser"), None);
        assert_eq!(split_reference(".KarmaParser"), None);
        assert_eq!(split_reference("acme."), None);
        assert_eq!(split_reference("acme..Parser"), None);
    }
}

proptest! {
    /// For well-formed output the counts always add up.
    #[test]
    fn prop_pytest_counts_add_up(passed in 0usize..500, failed in 0usize..500, errors in 0usize..50) {
        let output = format!("==== {failed} failed, {passed} passed, {errors} error in 1.2s ====");
        let (p, f, t) = counts(&PyTestParser, &output);
        prop_assert_eq!(p + f, t);
        prop_assert_eq!(f, failed + errors);
    }

    #[test]
    fn prop_karma_counts_add_up(total in 1usize..500, failed_ratio in 0.0f64..=1.0) {
        let failed = ((total as f64) * failed_ratio) as usize;
        let output = format!("Executed {total} of {total} ({failed} FAILED) (1 sec / 1 sec)");
        let (p, f, t) = counts(&KarmaParser, &output);
        prop_assert_eq!(p + f, t);
        prop_assert_eq!(t, total);
    }

    #[test]
    fn prop_rspec_counts_add_up(
        (total, failed) in (0usize..500).prop_flat_map(|total| (Just(total), 0..=total))
    ) {
        let output = format!("{total} examples, {failed} failures");
        let (p, f, t) = counts(&RspecParser, &output);
        prop_assert_eq!(p + f, t);
    }

    #[test]
    fn prop_unittest_family_counts_add_up(
        (total, failures, errors) in (0usize..500).prop_flat_map(|total| {
            (0..=total).prop_flat_map(move |failures| (Just(total), Just(failures), 0..=total - failures))
        })
    ) {
        let status = if failures + errors == 0 {
            "OK".to_string()
        } else {
            format!("FAILED (errors={errors}, failures={failures})")
        };
        let output = format!("Ran {total} tests in 0.5s\n\n{status}\n");

        for parser in [&UnittestParser as &dyn ResultParser, &NoseParser, &DjangoParser] {
            let (p, f, t) = counts(parser, &output);
            prop_assert_eq!(p + f, t);
            prop_assert_eq!(t, total);
        }
        prop_assert_eq!(counts(&DjangoParser, &output).1, failures);
        prop_assert_eq!(counts(&NoseParser, &output).1, failures + errors);
    }

    #[test]
    fn prop_protractor_counts_add_up(
        tests in 0usize..100,
        (assertions, failures) in (0usize..500).prop_flat_map(|total| (Just(total), 0..=total))
    ) {
        let output = format!("{tests} tests, {assertions} assertions, {failures} failures");
        let (p, f, t) = counts(&ProtractorParser, &output);
        prop_assert_eq!(p + f, t);
        prop_assert_eq!(t, assertions);
    }

    #[test]
    fn prop_salad_counts_add_up(
        (total, passed) in (0usize..500).prop_flat_map(|total| (Just(total), 0..=total))
    ) {
        let output = format!("{total} steps ({} failed, {passed} passed)", total - passed);
        let (p, f, t) = counts(&SaladParser, &output);
        prop_assert_eq!(p + f, t);
        prop_assert_eq!(p, passed);
    }
}
