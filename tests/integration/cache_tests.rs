//! Integration tests for the binary cache lifecycle, in particular the
//! corruption-recovery contract: damaged files warn exactly once and
//! rebuild, missing/empty files rebuild silently, and no cache problem
//! ever surfaces as an error to the caller.

use apilevels::{ApiDatabase, RecordingClient, Severity};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// Copy the fixture into the temp dir so tests can touch its mtime freely.
fn setup(temp_dir: &TempDir) -> (PathBuf, PathBuf) {
    let source = temp_dir.path().join("api-versions.xml");
    fs::copy(fixtures_path().join("api-versions.xml"), &source).unwrap();
    let cache_dir = temp_dir.path().join("cache");
    (source, cache_dir)
}

fn cache_file(cache_dir: &Path) -> PathBuf {
    let mut entries: Vec<PathBuf> = fs::read_dir(cache_dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().map_or(false, |ext| ext == "bin"))
        .collect();
    assert_eq!(entries.len(), 1, "expected exactly one cache file");
    entries.remove(0)
}

#[test]
fn test_cold_start_writes_cache_without_warnings() {
    let temp_dir = TempDir::new().unwrap();
    let (source, cache_dir) = setup(&temp_dir);
    let client = RecordingClient::new(Some(source.as_path()), Some(cache_dir.as_path()));

    let db = ApiDatabase::open(&client, 34).unwrap();
    assert!(!db.loaded_from_cache());
    assert!(db.cache_path().unwrap().exists());
    assert!(client.is_log_empty());
}

#[test]
fn test_warm_start_reads_cache_without_reparsing() {
    let temp_dir = TempDir::new().unwrap();
    let (source, cache_dir) = setup(&temp_dir);
    let client = RecordingClient::new(Some(source.as_path()), Some(cache_dir.as_path()));

    ApiDatabase::open(&client, 34).unwrap();
    // deleting the XML proves the second open never touches it
    fs::remove_file(&source).unwrap();

    let db = ApiDatabase::open(&client, 34).unwrap();
    assert!(db.loaded_from_cache());
    assert!(client.is_log_empty());
    assert_eq!(db.class_since("android/app/Activity"), Some(1));
}

#[test]
fn test_header_truncation_warns_and_recovers() {
    let temp_dir = TempDir::new().unwrap();
    let (source, cache_dir) = setup(&temp_dir);
    let client = RecordingClient::new(Some(source.as_path()), Some(cache_dir.as_path()));

    ApiDatabase::open(&client, 34).unwrap();
    let cache_path = cache_file(&cache_dir);
    let image = fs::read(&cache_path).unwrap();
    fs::write(&cache_path, &image[..100]).unwrap();

    let db = ApiDatabase::open(&client, 34).unwrap();
    // queries answer from the rebuilt model
    assert_eq!(
        db.method_since("android/app/Activity", "onCreate", "(Landroid/os/Bundle;)V"),
        Some(1)
    );

    let messages = client.messages();
    assert_eq!(messages.len(), 1, "exactly one warning expected");
    assert_eq!(messages[0].severity, Severity::Warning);
    assert!(messages[0]
        .message
        .contains("Please delete the file and restart the IDE/lint:"));
    assert!(messages[0]
        .message
        .contains(&cache_dir.display().to_string()));

    // the recovery rewrote a healthy cache
    client.clear();
    let db = ApiDatabase::open(&client, 34).unwrap();
    assert!(db.loaded_from_cache());
    assert!(client.is_log_empty());
}

#[test]
fn test_zero_length_cache_regenerates_silently() {
    let temp_dir = TempDir::new().unwrap();
    let (source, cache_dir) = setup(&temp_dir);
    let client = RecordingClient::new(Some(source.as_path()), Some(cache_dir.as_path()));

    ApiDatabase::open(&client, 34).unwrap();
    let cache_path = cache_file(&cache_dir);
    fs::write(&cache_path, b"").unwrap();

    let db = ApiDatabase::open(&client, 34).unwrap();
    assert!(!db.loaded_from_cache());
    assert!(client.is_log_empty(), "empty cache must not warn");
    assert_eq!(db.class_since("java/lang/String"), Some(1));
}

#[test]
fn test_flipped_payload_byte_warns_and_recovers() {
    let temp_dir = TempDir::new().unwrap();
    let (source, cache_dir) = setup(&temp_dir);
    let client = RecordingClient::new(Some(source.as_path()), Some(cache_dir.as_path()));

    ApiDatabase::open(&client, 34).unwrap();
    let cache_path = cache_file(&cache_dir);
    let mut image = fs::read(&cache_path).unwrap();
    let last = image.len() - 1;
    image[last] ^= 0xff;
    fs::write(&cache_path, &image).unwrap();

    let db = ApiDatabase::open(&client, 34).unwrap();
    assert_eq!(db.class_since("android/os/Build"), Some(1));

    let messages = client.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].message.contains("checksum"));
}

#[test]
fn test_stale_cache_regenerates_silently() {
    let temp_dir = TempDir::new().unwrap();
    let (source, cache_dir) = setup(&temp_dir);
    let client = RecordingClient::new(Some(source.as_path()), Some(cache_dir.as_path()));

    ApiDatabase::open(&client, 34).unwrap();

    // make the source strictly newer than the cache
    std::thread::sleep(std::time::Duration::from_millis(50));
    let mut contents = fs::read_to_string(&source).unwrap();
    contents = contents.replace(
        "<field name=\"DEFAULT_KEYS_DIALER\" since=\"1\"/>",
        "<field name=\"DEFAULT_KEYS_DIALER\" since=\"2\"/>",
    );
    fs::write(&source, contents).unwrap();

    let db = ApiDatabase::open(&client, 34).unwrap();
    assert!(!db.loaded_from_cache());
    assert!(client.is_log_empty());
    assert_eq!(db.field_since("android/app/Activity", "DEFAULT_KEYS_DIALER"), Some(2));
}

#[test]
fn test_no_cache_dir_parses_directly() {
    let temp_dir = TempDir::new().unwrap();
    let (source, _) = setup(&temp_dir);
    let client = RecordingClient::new(Some(source.as_path()), None);

    let db = ApiDatabase::open(&client, 34).unwrap();
    assert!(!db.loaded_from_cache());
    assert!(db.cache_path().is_none());
    assert!(client.is_log_empty());
    assert_eq!(db.class_since("android/app/Activity"), Some(1));
}

#[test]
fn test_missing_description_is_an_error() {
    let client = RecordingClient::new(None, None);
    assert!(ApiDatabase::open(&client, 34).is_err());
}

#[test]
fn test_unreadable_description_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("api-versions.xml");
    let client = RecordingClient::new(Some(missing.as_path()), None);
    assert!(ApiDatabase::open(&client, 34).is_err());
}

#[test]
fn test_platforms_get_distinct_cache_files() {
    let temp_dir = TempDir::new().unwrap();
    let (source, cache_dir) = setup(&temp_dir);
    let client = RecordingClient::new(Some(source.as_path()), Some(cache_dir.as_path()));

    ApiDatabase::open(&client, 33).unwrap();
    ApiDatabase::open(&client, 34).unwrap();

    let bins = fs::read_dir(&cache_dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().map_or(false, |ext| ext == "bin"))
        .count();
    assert_eq!(bins, 2);
}
