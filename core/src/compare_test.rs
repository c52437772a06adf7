#[cfg(test)]
mod tests {
    use crate::compare::{compare, regression_ratio};
    use crate::result::{BenchResult, BenchSuite, Direction};
    use crate::threshold::Threshold;

    fn suite(entries: &[(&str, f64)]) -> BenchSuite {
        BenchSuite::new(entries.iter().map(|(n, v)| BenchResult::new(*n, *v, "s")).collect()).unwrap()
    }

    fn t200() -> Threshold {
        "200%".parse().unwrap()
    }

    #[test]
    fn flags_only_benchmarks_above_threshold() {
        let baseline = suite(&[("fast", 1.0), ("slow", 1.0), ("edge", 1.0)]);
        let current = suite(&[("fast", 1.5), ("slow", 3.5), ("edge", 2.0)]);
        let cmp = compare(&current, Some(&baseline), Direction::SmallerIsBetter, t200());

        assert_eq!(cmp.alerts.len(), 1);
        assert_eq!(cmp.alerts[0].name, "slow");
        assert_eq!(cmp.alerts[0].ratio, 3.5);
        assert!(cmp.has_alerts());
        assert_eq!(cmp.threshold, "200%");

        let edge = cmp.deltas.iter().find(|d| d.name == "edge").unwrap();
        assert_eq!(edge.ratio, Some(2.0));
        assert!(!edge.alert, "a ratio equal to the threshold does not alert");
    }

    #[test]
    fn bigger_is_better_inverts_ratio() {
        let baseline = suite(&[("ops", 900.0)]);
        let current = suite(&[("ops", 300.0)]);
        let cmp = compare(&current, Some(&baseline), Direction::BiggerIsBetter, t200());
        assert_eq!(cmp.alerts.len(), 1);
        assert_eq!(cmp.alerts[0].ratio, 3.0);

        let improved = suite(&[("ops", 5000.0)]);
        let cmp = compare(&improved, Some(&baseline), Direction::BiggerIsBetter, t200());
        assert!(!cmp.has_alerts());
    }

    #[test]
    fn new_and_missing_never_alert() {
        let baseline = suite(&[("kept", 1.0), ("removed", 1.0)]);
        let current = suite(&[("kept", 1.0), ("added", 100.0)]);
        let cmp = compare(&current, Some(&baseline), Direction::SmallerIsBetter, t200());
        assert!(!cmp.has_alerts());
        assert_eq!(cmp.new, vec!["added".to_string()]);
        assert_eq!(cmp.missing, vec!["removed".to_string()]);
        let added = cmp.deltas.iter().find(|d| d.name == "added").unwrap();
        assert_eq!(added.baseline, None);
        assert_eq!(added.ratio, None);
    }

    #[test]
    fn no_baseline_marks_everything_new() {
        let current = suite(&[("a", 1.0), ("b", 2.0)]);
        let cmp = compare(&current, None, Direction::SmallerIsBetter, t200());
        assert_eq!(cmp.new.len(), 2);
        assert!(cmp.missing.is_empty());
        assert!(!cmp.has_alerts());
    }

    #[test]
    fn zero_denominator_is_skipped() {
        assert_eq!(regression_ratio(Direction::SmallerIsBetter, 5.0, 0.0), None);
        assert_eq!(regression_ratio(Direction::BiggerIsBetter, 0.0, 5.0), None);

        let baseline = suite(&[("zero", 0.0)]);
        let current = suite(&[("zero", 10.0)]);
        let cmp = compare(&current, Some(&baseline), Direction::SmallerIsBetter, t200());
        assert!(!cmp.has_alerts());
        assert_eq!(cmp.deltas[0].ratio, None);
    }

    #[test]
    fn alerts_sorted_by_ratio_then_name() {
        let baseline = suite(&[("a", 1.0), ("b", 1.0), ("c", 1.0)]);
        let current = suite(&[("a", 3.0), ("b", 5.0), ("c", 3.0)]);
        let cmp = compare(&current, Some(&baseline), Direction::SmallerIsBetter, t200());
        let names: Vec<&str> = cmp.alerts.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn custom_threshold_changes_outcome() {
        let baseline = suite(&[("x", 1.0)]);
        let current = suite(&[("x", 1.3)]);
        let tight: Threshold = "120%".parse().unwrap();
        assert!(compare(&current, Some(&baseline), Direction::SmallerIsBetter, tight).has_alerts());
        assert!(!compare(&current, Some(&baseline), Direction::SmallerIsBetter, t200()).has_alerts());
    }
}
