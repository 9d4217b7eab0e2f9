//! Integration tests for the install / replace / delete lifecycle.

mod common;

use common::TestEnv;
use senzing_package::{BackupPolicy, Installer, PackageError, Settings, TargetState};

// =============================================================================
// Install
// =============================================================================

#[test]
fn test_install_fresh_target_has_no_backup() {
    let env = TestEnv::new();
    let archive = env.package("2.1.0", &[("g2/lib/libG2.so", "v2")]);
    let installer = Installer::new(env.target());

    let report = installer.install(&archive, &env.backup()).unwrap();

    assert_eq!(report.previous, TargetState::Absent);
    assert!(report.backup.is_none());
    assert_eq!(installer.installed_version().unwrap().version, "2.1.0");
    assert_eq!(env.siblings(), vec!["pkg"]);
}

#[test]
fn test_installed_version_matches_package_version() {
    let env = TestEnv::new();
    let archive = env.package("3.4.5", &[]);
    let installer = Installer::new(env.target());

    installer.install(&archive, &env.backup()).unwrap();

    assert_eq!(
        installer.installed_version().unwrap(),
        installer.package_version(&archive).unwrap()
    );
}

#[test]
fn test_install_over_existing_preserves_previous_tree() {
    let env = TestEnv::new();
    let v1 = env.package("1.0.0", &[("g2/lib/libG2.so", "v1"), ("g2/only-in-v1", "x")]);
    let v2 = env.package("2.1.0", &[("g2/lib/libG2.so", "v2")]);
    let installer = Installer::new(env.target());

    installer.install(&v1, &env.backup()).unwrap();
    let report = installer.install(&v2, &env.backup()).unwrap();

    assert_eq!(report.backup.as_deref(), Some(env.backup().as_path()));
    assert_eq!(report.previous_version.as_deref(), Some("1.0.0"));

    let backup = Installer::new(env.backup());
    assert_eq!(backup.installed_version().unwrap().version, "1.0.0");
    assert!(env.backup().join("g2/only-in-v1").exists());
    assert_eq!(
        std::fs::read_to_string(env.backup().join("g2/lib/libG2.so")).unwrap(),
        "v1"
    );

    assert_eq!(installer.installed_version().unwrap().version, "2.1.0");
    assert!(!env.target().join("g2/only-in-v1").exists());
    assert_eq!(env.siblings(), vec!["pkg", "pkg-original"]);
}

#[test]
fn test_install_with_existing_backup_is_a_conflict() {
    let env = TestEnv::new();
    let v1 = env.package("1.0.0", &[]);
    let v2 = env.package("2.1.0", &[]);
    let installer = Installer::new(env.target());

    installer.install(&v1, &env.backup()).unwrap();
    installer.install(&v2, &env.backup()).unwrap();

    // A third install would need the backup slot that is already taken.
    let v3 = env.package("3.0.0", &[]);
    let err = installer.install(&v3, &env.backup()).unwrap_err();

    assert!(matches!(err, PackageError::Conflict { .. }));
    assert_eq!(err.exit_code(), 3);
    assert_eq!(installer.installed_version().unwrap().version, "2.1.0");
    assert_eq!(
        Installer::new(env.backup()).installed_version().unwrap().version,
        "1.0.0"
    );
    assert_eq!(env.siblings(), vec!["pkg", "pkg-original"]);
}

#[test]
fn test_install_with_versioned_backup_policy() {
    let env = TestEnv::new();
    let v1 = env.package("1.0.0", &[]);
    let v2 = env.package("2.1.0", &[]);
    let installer = Installer::new(env.target());
    installer.install(&v1, &env.backup()).unwrap();

    let settings = Settings {
        senzing_dir: env.target(),
        backup_policy: BackupPolicy::Versioned,
        ..Default::default()
    };
    let current = installer.installed_version().unwrap();
    let backup = settings.resolve_backup_dir(Some(current.version.as_str()));
    installer.install(&v2, &backup).unwrap();

    let siblings = env.siblings();
    assert_eq!(siblings.len(), 2);
    assert!(
        siblings.iter().any(|n| n.starts_with("pkg-1.0.0.")),
        "{siblings:?}"
    );
}

#[test]
fn test_failed_install_leaves_no_staging_behind() {
    let env = TestEnv::new();
    let v1 = env.package("1.0.0", &[]);
    let broken = env.root().join("broken.tgz");
    std::fs::write(&broken, b"\x1f\x8b garbage").unwrap();
    let installer = Installer::new(env.target());

    installer.install(&v1, &env.backup()).unwrap();
    assert!(installer.install(&broken, &env.backup()).is_err());

    assert_eq!(env.siblings(), vec!["pkg"]);
    assert_eq!(installer.installed_version().unwrap().version, "1.0.0");
}

// =============================================================================
// Replace / delete
// =============================================================================

#[test]
fn test_replace_never_mixes_old_and_new() {
    let env = TestEnv::new();
    let v1 = env.package("1.0.0", &[("g2/old.txt", "old")]);
    let v2 = env.package("2.1.0", &[("g2/new.txt", "new")]);
    let installer = Installer::new(env.target());

    installer.replace(&v1).unwrap();
    installer.replace(&v2).unwrap();

    assert!(!env.target().join("g2/old.txt").exists());
    assert!(env.target().join("g2/new.txt").exists());
    assert_eq!(env.siblings(), vec!["pkg"]);
}

#[test]
fn test_replace_twice_same_end_state() {
    let env = TestEnv::new();
    let archive = env.package("2.1.0", &[("g2/a", "a"), ("g2/b/c", "c")]);
    let installer = Installer::new(env.target());

    installer.replace(&archive).unwrap();
    let first = tree(&env.target());
    installer.replace(&archive).unwrap();

    assert_eq!(first, tree(&env.target()));
}

#[test]
fn test_delete_twice_is_noop() {
    let env = TestEnv::new();
    let archive = env.package("2.1.0", &[]);
    let installer = Installer::new(env.target());

    assert!(!installer.delete().unwrap());
    installer.install(&archive, &env.backup()).unwrap();
    assert!(installer.delete().unwrap());
    assert!(!installer.delete().unwrap());
    assert_eq!(installer.state().unwrap(), TargetState::Absent);
}

#[test]
fn test_installed_version_of_absent_target() {
    let env = TestEnv::new();
    let err = Installer::new(env.target()).installed_version().unwrap_err();
    assert!(matches!(err, PackageError::NotFound { .. }));
    assert_eq!(err.exit_code(), 4);
}

fn tree(root: &std::path::Path) -> Vec<(String, String)> {
    let mut entries: Vec<_> = walkdir::WalkDir::new(root)
        .into_iter()
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let rel = e.path().strip_prefix(root).unwrap().display().to_string();
            (rel, std::fs::read_to_string(e.path()).unwrap())
        })
        .collect();
    entries.sort();
    entries
}
