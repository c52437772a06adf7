#[cfg(test)]
mod tests {
    use crate::result::{BenchResult, Tool};
    use crate::schedule::Trigger;
    use crate::store::{DataStore, RunRecord, csv_file_name, write_csv};
    use std::fs;
    use tempfile::tempdir;

    fn record(stamp: &str, value: f64) -> RunRecord {
        RunRecord {
            generated_at: stamp.to_string(),
            commit: Some("abcdef12".to_string()),
            trigger: Trigger::Schedule,
            tool: Tool::Pytest,
            notes: None,
            benches: vec![BenchResult::new("test_create_events", value, "s")],
        }
    }

    #[test]
    fn missing_file_is_empty_store() {
        let dir = tempdir().unwrap();
        let store = DataStore::load(dir.path()).unwrap();
        assert!(store.entries.is_empty());
        assert!(store.baseline("any").is_none());
        assert!(store.runs("any").is_empty());
    }

    #[test]
    fn baseline_is_latest_and_history_is_capped() {
        let mut store = DataStore::default();
        for (i, stamp) in ["2024-01-01T00:00:00Z", "2024-01-02T00:00:00Z", "2024-01-03T00:00:00Z"]
            .iter()
            .enumerate()
        {
            store.push("nightly", record(stamp, i as f64 + 1.0), 2);
        }
        let runs = store.runs("nightly");
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].generated_at, "2024-01-02T00:00:00Z");
        assert_eq!(store.baseline("nightly").unwrap().benches[0].value, 3.0);
        assert_eq!(store.last_update.as_deref(), Some("2024-01-03T00:00:00Z"));
    }

    #[test]
    fn suites_are_independent() {
        let mut store = DataStore::default();
        store.push("a", record("2024-01-01T00:00:00Z", 1.0), 10);
        store.push("b", record("2024-01-02T00:00:00Z", 2.0), 10);
        assert_eq!(store.runs("a").len(), 1);
        assert_eq!(store.baseline("b").unwrap().benches[0].value, 2.0);
    }

    #[test]
    fn save_and_reload() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("store");
        let mut store = DataStore::default();
        store.push("nightly", record("2024-01-01T00:00:00Z", 1.5), 10);
        store.save(&nested).unwrap();

        let reloaded = DataStore::load(&nested).unwrap();
        assert_eq!(reloaded, store);
        let suite = reloaded.baseline("nightly").unwrap().suite().unwrap();
        assert_eq!(suite.get("test_create_events").unwrap().value, 1.5);

        // Only data.json remains, no temp files.
        let names: Vec<String> = fs::read_dir(&nested)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["data.json".to_string()]);
    }

    #[test]
    fn corrupt_store_is_an_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("data.json"), "{ not json").unwrap();
        let err = DataStore::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("data.json"));
    }

    #[test]
    fn csv_quotes_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(csv_file_name("OT/Analytics"));
        assert!(!path.file_name().unwrap().to_string_lossy().contains('/'));
        let mut bench = BenchResult::new("test[a,b]", 0.5, "s");
        bench.range = Some("± 0.1".to_string());
        write_csv(&path, &[bench]).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "name,value,unit,range\n\"test[a,b]\",0.500000,s,± 0.1\n");
    }

    #[test]
    fn csv_quotes_carriage_returns() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("latest.csv");
        write_csv(&path, &[BenchResult::new("test[a\rb]", 1.0, "s")]).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "name,value,unit,range\n\"test[a\rb]\",1.000000,s,\n");
    }
}
