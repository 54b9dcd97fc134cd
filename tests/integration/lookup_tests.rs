//! Integration tests for the query surface.
//!
//! Every lookup is exercised twice: against a database parsed straight
//! from the fixture XML and against one round-tripped through the binary
//! cache, and the answers must agree.

use apilevels::{ApiDatabase, RecordingClient};
use std::path::PathBuf;
use tempfile::TempDir;

/// Get the path to the test fixtures directory
fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn from_xml() -> ApiDatabase {
    ApiDatabase::from_file(&fixtures_path().join("api-versions.xml"), 34)
        .expect("fixture should parse")
}

/// Build twice through a cache directory: the second construction reads
/// the binary image written by the first.
fn from_cache(temp_dir: &TempDir) -> ApiDatabase {
    let source = fixtures_path().join("api-versions.xml");
    let cache_dir = temp_dir.path().join("cache");
    let client = RecordingClient::new(Some(source.as_path()), Some(cache_dir.as_path()));

    let first = ApiDatabase::open(&client, 34).expect("first open");
    assert!(!first.loaded_from_cache());

    let second = ApiDatabase::open(&client, 34).expect("second open");
    assert!(second.loaded_from_cache());
    assert!(client.is_log_empty(), "cache round-trip should be silent");
    second
}

fn databases() -> (ApiDatabase, TempDir, ApiDatabase) {
    let temp_dir = TempDir::new().unwrap();
    let cached = from_cache(&temp_dir);
    (from_xml(), temp_dir, cached)
}

#[test]
fn test_find_everything_in_both_paths() {
    let (xml_db, _guard, cached_db) = databases();

    for db in [&xml_db, &cached_db] {
        assert_eq!(db.class_since("android/app/Activity"), Some(1));
        assert_eq!(db.class_since("java/lang/String"), Some(1));
        assert_eq!(
            db.method_since("android/app/Activity", "onCreate", "(Landroid/os/Bundle;)V"),
            Some(1)
        );
        assert_eq!(db.method_since("java/lang/String", "isBlank", "()Z"), Some(30));
        assert_eq!(
            db.method_since(
                "java/util/Map",
                "getOrDefault",
                "(Ljava/lang/Object;Ljava/lang/Object;)Ljava/lang/Object;"
            ),
            Some(24)
        );
        assert_eq!(db.field_since("android/os/Build", "SERIAL"), Some(9));
        assert_eq!(db.field_deprecated_in("android/os/Build", "SERIAL"), Some(26));
        assert_eq!(
            db.method_removed_in("android/webkit/WebSettings", "getSaveFormData", "()Z"),
            Some(33)
        );
        assert_eq!(db.class_since("com/example/NotThere"), None);
    }
}

#[test]
fn test_separator_normalization_is_order_independent() {
    let (db, _guard, cached) = databases();

    let forms = [
        "android/Manifest$permission",
        "android.Manifest$permission",
        "android.Manifest.permission",
    ];
    for form in forms {
        assert_eq!(
            db.field_since(form, "AUTHENTICATE_ACCOUNTS"),
            Some(5),
            "form {form} through xml"
        );
        assert_eq!(
            cached.field_since(form, "AUTHENTICATE_ACCOUNTS"),
            Some(5),
            "form {form} through cache"
        );
    }
}

#[test]
fn test_inherited_members_resolve_transitively() {
    let (db, _guard, _cached) = databases();

    // two superclass hops up to Object
    assert_eq!(
        db.method_since("android/app/Activity", "toString", "()Ljava/lang/String;"),
        Some(1)
    );
    // through a direct interface
    assert_eq!(
        db.method_since("android/app/Activity", "onMenuOpened", "(ILandroid/view/Menu;)Z"),
        Some(1)
    );
    // declared on the interface, answered for the implementor
    assert_eq!(
        db.method_since("java/lang/String", "chars", "()Ljava/util/stream/IntStream;"),
        Some(24)
    );
}

#[test]
fn test_interface_added_later_floors_the_answer() {
    let (db, _guard, _cached) = databases();
    // the KeyEvent$Callback link appeared at 9; the member itself is older
    assert_eq!(
        db.method_since("android/app/Activity", "onKeyDown", "(ILandroid/view/KeyEvent;)Z"),
        Some(9)
    );
}

#[test]
fn test_constructors_are_never_inherited() {
    let (db, _guard, cached) = databases();

    for db in [&db, &cached] {
        // Build declares no constructor of its own; Object's does not count
        assert_eq!(db.method_since("android/os/Build", "<init>", "()V"), None);
        assert_eq!(db.method_since("android/app/Activity", "<init>", "()V"), Some(1));
    }
}

#[test]
fn test_ancestor_deprecation_is_not_inherited_as_declared() {
    let (db, _guard, _cached) = databases();

    // declared deprecation is reported through the hierarchy
    assert_eq!(
        db.method_deprecated_in(
            "android/view/ContextThemeWrapper",
            "getDrawable",
            "(I)Landroid/graphics/drawable/Drawable;"
        ),
        Some(28)
    );
    // but an undeprecated member does not pick one up from its class
    assert_eq!(
        db.method_deprecated_in("android/app/Activity", "onCreate", "(Landroid/os/Bundle;)V"),
        None
    );
}

#[test]
fn test_valid_cast_versions() {
    let (db, _guard, cached) = databases();

    for db in [&db, &cached] {
        assert_eq!(
            db.valid_cast_version("android/app/Activity", "android/content/Context"),
            Some(1)
        );
        assert_eq!(
            db.valid_cast_version("android/app/Activity", "android/view/KeyEvent$Callback"),
            Some(9)
        );
        assert_eq!(
            db.valid_cast_version("java/lang/String", "java/lang/CharSequence"),
            Some(1)
        );
        assert_eq!(db.valid_cast_version("java/lang/String", "java/util/Map"), None);
    }
}

#[test]
fn test_removed_member_listings() {
    let (db, _guard, cached) = databases();

    for db in [&db, &cached] {
        let methods = db.removed_methods("android/webkit/WebSettings");
        let signatures: Vec<&str> = methods.iter().map(|m| m.signature.as_str()).collect();
        assert_eq!(signatures, vec!["getSaveFormData()", "getSavePassword()"]);
        assert!(methods.iter().all(|m| m.removed_in == Some(33)));

        let fields = db.removed_fields("android/app/Activity");
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].signature, "FOCUSED_STATE_SET");
        assert_eq!(fields[0].since, 3);
        assert_eq!(fields[0].removed_in, Some(24));

        assert!(db.removed_fields("java/lang/String").is_empty());
        assert!(db.removed_methods("no/Such$Class").is_empty());
    }
}

#[test]
fn test_java_package_whitelist() {
    let (db, _guard, cached) = databases();

    for db in [&db, &cached] {
        assert!(db.is_valid_java_package("java/util/Map$Entry"));
        assert!(db.is_valid_java_package("java/lang/Object"));
        // desktop-only packages are not part of the platform surface
        assert!(!db.is_valid_java_package("javax/swing/JButton"));
        assert!(!db.is_valid_java_package("java/rmi/Remote"));
        assert!(!db.is_valid_java_package("java/lang/instrument/Instrumentation"));
        // android packages are real but not java packages
        assert!(!db.is_valid_java_package("android/app/Activity"));
    }
}

#[test]
fn test_stats_survive_the_cache() {
    let (db, _guard, cached) = databases();
    assert_eq!(db.class_count(), cached.class_count());
    assert_eq!(db.schema_version(), cached.schema_version());
    assert_eq!(db.highest_level(), cached.highest_level());
    assert_eq!(cached.platform_version(), 34);
}
