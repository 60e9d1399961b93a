//! Composite batch operations layered on the store primitives.
//!
//! These exist to prove the composability contract of the core:
//! read-then-mutate inside one transaction, with external side effects kept
//! explicitly outside the transactional boundary.

use crate::error::Result;
use crate::predicate::{self, PredicateTerm};
use crate::store::StoreInstance;
use crate::types::Value;
use std::fs;

/// Delete a group of records and clean up their external files.
///
/// Inside one transaction: collect the `file_field` path of every record
/// whose primary key is in `primary_keys`, then delete those records. After
/// commit, each collected path is removed from the filesystem best-effort —
/// a failed file removal is logged, never rolled back and never fatal.
///
/// Returns the count of records remaining whose `group_field` equals
/// `group_value`.
pub fn delete_group(
    store: &StoreInstance,
    class_name: &str,
    primary_keys: &[String],
    file_field: &str,
    group_field: &str,
    group_value: &str,
) -> Result<usize> {
    let keys = Value::List(
        primary_keys
            .iter()
            .map(|k| Value::String(k.clone()))
            .collect(),
    );
    let query = predicate::compile(
        class_name,
        &[PredicateTerm::compare("in", "uuid", keys)],
    )?;

    let conn = store.conn();
    let paths = store.in_write(|| {
        let records = conn.execute(&query, -1)?;
        let mut paths = Vec::with_capacity(records.len());
        for record in &records {
            if let Some(crate::engine::NativeValue::String(path)) = record.get(file_field) {
                paths.push(path.clone());
            }
            conn.remove(class_name, record.primary_key())?;
        }
        Ok(paths)
    })?;

    // File cleanup happens outside the transaction: records are already
    // committed gone, and a missing or locked file must not undo that.
    for path in &paths {
        if let Err(e) = fs::remove_file(path) {
            tracing::warn!(path = %path, error = %e, "external file cleanup failed");
        }
    }

    let remaining_terms = [PredicateTerm::compare(
        "equalTo",
        group_field,
        Value::from(group_value),
    )];
    let (_, remaining) = store.query(class_name, &remaining_terms, -1)?;
    Ok(remaining)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MemoryEngine;
    use crate::store::StoreInstance;
    use crate::types::{ClassSchema, FieldKind, FieldMap, FieldSchema, StoreConfig};
    use crossbeam_channel::unbounded;
    use std::io::Write;
    use tempfile::TempDir;

    fn test_store() -> StoreInstance {
        let engine = MemoryEngine::new();
        let config = StoreConfig::in_memory(
            "batch-tests",
            vec![ClassSchema::new(
                "Recording",
                vec![
                    FieldSchema::scalar("scheduleId", FieldKind::String),
                    FieldSchema::scalar("path", FieldKind::String),
                ],
            )],
        );
        let (events, _) = unbounded();
        StoreInstance::open(engine.as_ref(), "primary", &config, events).unwrap()
    }

    fn create_recording(store: &StoreInstance, key: &str, schedule: &str, path: &str) {
        let mut fields = FieldMap::new();
        fields.insert("scheduleId".into(), Value::from(schedule));
        fields.insert("path".into(), Value::from(path));
        store.create("Recording", key, &fields).unwrap();
    }

    fn touch(dir: &TempDir, name: &str) -> String {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"audio").unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_delete_group_removes_records_and_files() {
        let dir = TempDir::new().unwrap();
        let store = test_store();

        let p1 = touch(&dir, "r1.wav");
        let p2 = touch(&dir, "r2.wav");
        let p3 = touch(&dir, "r3.wav");
        create_recording(&store, "r1", "s1", &p1);
        create_recording(&store, "r2", "s1", &p2);
        create_recording(&store, "r3", "s1", &p3);

        let keys = vec!["r1".to_string(), "r2".to_string()];
        let remaining =
            delete_group(&store, "Recording", &keys, "path", "scheduleId", "s1").unwrap();

        assert_eq!(remaining, 1);
        assert!(store.find("Recording", "r1").unwrap().is_none());
        assert!(store.find("Recording", "r2").unwrap().is_none());
        assert!(store.find("Recording", "r3").unwrap().is_some());
        assert!(!dir.path().join("r1.wav").exists());
        assert!(!dir.path().join("r2.wav").exists());
        assert!(dir.path().join("r3.wav").exists());
    }

    #[test]
    fn test_file_cleanup_is_best_effort() {
        let store = test_store();

        // Paths that do not exist: record deletion must still succeed.
        create_recording(&store, "r1", "s1", "/nonexistent/a.wav");
        create_recording(&store, "r2", "s2", "/nonexistent/b.wav");

        let keys = vec!["r1".to_string()];
        let remaining =
            delete_group(&store, "Recording", &keys, "path", "scheduleId", "s1").unwrap();

        assert_eq!(remaining, 0);
        assert!(store.find("Recording", "r1").unwrap().is_none());
        assert!(store.find("Recording", "r2").unwrap().is_some());
    }

    #[test]
    fn test_every_collected_path_gets_a_deletion_attempt() {
        let dir = TempDir::new().unwrap();
        let store = test_store();

        // One missing path between two real files: if attempts stopped at
        // the first failure, r3's file would survive.
        let p1 = touch(&dir, "r1.wav");
        let p3 = touch(&dir, "r3.wav");
        create_recording(&store, "r1", "s1", &p1);
        create_recording(&store, "r2", "s1", "/nonexistent/gap.wav");
        create_recording(&store, "r3", "s1", &p3);

        let keys = vec!["r1".to_string(), "r2".to_string(), "r3".to_string()];
        let remaining =
            delete_group(&store, "Recording", &keys, "path", "scheduleId", "s1").unwrap();

        assert_eq!(remaining, 0);
        // One attempt per collected path: both real files are gone even
        // though the attempt between them failed.
        assert!(!dir.path().join("r1.wav").exists());
        assert!(!dir.path().join("r3.wav").exists());
        assert!(store.find("Recording", "r2").unwrap().is_none());
    }

    #[test]
    fn test_keys_outside_class_are_ignored() {
        let store = test_store();
        create_recording(&store, "r1", "s1", "/tmp/none.wav");

        let keys = vec!["r1".to_string(), "ghost".to_string()];
        let remaining =
            delete_group(&store, "Recording", &keys, "path", "scheduleId", "s1").unwrap();
        assert_eq!(remaining, 0);
    }
}
