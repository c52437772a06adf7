#[cfg(test)]
mod tests {
    use crate::compare::compare;
    use crate::report::{
        CommandPublisher, FilePublisher, Publisher, ReportContext, format_value, render_alert_comment, render_summary,
    };
    use crate::result::{BenchResult, BenchSuite, Direction};
    use crate::step::{CommandRunner, PreparedCommand, StepFailure, StepStatus};
    use anyhow::Result;
    use std::cell::RefCell;
    use std::path::PathBuf;

    fn comparison() -> crate::compare::Comparison {
        let baseline = BenchSuite::new(vec![
            BenchResult::new("test_create_events", 1.0, "s"),
            BenchResult::new("test_load|pipe", 2.0, "s"),
            BenchResult::new("gone", 1.0, "s"),
        ])
        .unwrap();
        let current = BenchSuite::new(vec![
            BenchResult::new("test_create_events", 2.5, "s"),
            BenchResult::new("test_load|pipe", 2.0, "s"),
            BenchResult::new("fresh", 0.25, "s"),
        ])
        .unwrap();
        compare(&current, Some(&baseline), Direction::SmallerIsBetter, "200%".parse().unwrap())
    }

    #[test]
    fn value_formatting() {
        assert_eq!(format_value(2.0, "s"), "2 s");
        assert_eq!(format_value(1234.5678, "ns"), "1234.57 ns");
        assert_eq!(format_value(1.23456789, "s"), "1.2346 s");
        assert_eq!(format_value(0.0001234, "s"), "0.000123 s");
        assert_eq!(format_value(3.5, ""), "3.5000");
    }

    #[test]
    fn summary_lists_every_benchmark() {
        let summary = render_summary("OTAnalytics", &comparison());
        assert!(summary.contains("Alert threshold: 200%"));
        assert!(summary.contains("| `test_create_events` | 2.5000 s | 1 s | 2.50 | regression |"));
        assert!(summary.contains("| `fresh` | 0.250000 s | - | - | new |"));
        assert!(summary.contains("test_load\\|pipe"));
        assert!(summary.contains("Missing from this run: gone"));
    }

    #[test]
    fn alert_comment_contains_only_alerts() {
        let mentions = vec!["alice".to_string(), "@bob".to_string()];
        let ctx = ReportContext {
            suite: "OTAnalytics",
            commit: Some("abcdef12"),
            baseline_commit: None,
            mentions: &mentions,
        };
        let comment = render_alert_comment(&ctx, &comparison());
        assert!(comment.starts_with("# :warning: Performance alert: OTAnalytics"));
        assert!(comment.contains("1 benchmark(s)"));
        assert!(comment.contains("**200%**"));
        assert!(comment.contains("Commit: `abcdef12` (baseline `unknown`)"));
        assert!(comment.contains("| `test_create_events` | 2.5000 s | 1 s | 2.50 |"));
        assert!(!comment.contains("fresh"));
        assert!(comment.contains("CC: @alice @bob"));
    }

    #[test]
    fn file_publisher_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("comment.md");
        let publisher = FilePublisher { path: path.clone() };
        publisher.publish("hello").unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "hello");
        assert!(publisher.describe().starts_with("file "));
    }

    struct Capture {
        stdin: RefCell<Option<String>>,
        status: StepStatus,
    }

    impl CommandRunner for Capture {
        fn run(&self, command: &PreparedCommand) -> Result<StepStatus> {
            *self.stdin.borrow_mut() = command.stdin.clone();
            Ok(self.status)
        }
    }

    fn publish_command() -> PreparedCommand {
        PreparedCommand {
            name: "publish alert comment".to_string(),
            command: "gh pr comment --body-file -".to_string(),
            working_dir: PathBuf::from("."),
            env: vec![("REPORT_TOKEN".to_string(), "t".to_string())],
            stdin: None,
        }
    }

    #[test]
    fn command_publisher_pipes_comment() {
        let runner = Capture {
            stdin: RefCell::new(None),
            status: StepStatus {
                success: true,
                code: Some(0),
            },
        };
        let publisher = CommandPublisher {
            runner: &runner,
            command: publish_command(),
        };
        publisher.publish("body").unwrap();
        assert_eq!(runner.stdin.borrow().as_deref(), Some("body"));
    }

    #[test]
    fn command_publisher_reports_failure() {
        let runner = Capture {
            stdin: RefCell::new(None),
            status: StepStatus {
                success: false,
                code: Some(1),
            },
        };
        let publisher = CommandPublisher {
            runner: &runner,
            command: publish_command(),
        };
        let err = publisher.publish("body").unwrap_err();
        assert!(err.downcast_ref::<StepFailure>().is_some());
        assert_eq!(err.to_string(), "publish step 'publish alert comment' failed with exit code 1");
    }
}
