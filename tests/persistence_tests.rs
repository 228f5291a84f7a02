//! Configuration, ledger and script files on disk

use std::fs;
use tempfile::TempDir;
use touchless_atm::{
    bank::{Bank, Ledger},
    config::{Config, SecurityConfig},
    constants::{DEMO_ACCOUNT_BALANCE, DEMO_ACCOUNT_NUMBER, DEMO_ACCOUNT_PIN},
    script::Script,
    validator::IdlePolicy,
    Error,
};

#[test]
fn test_config_round_trip_through_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("kiosk.yaml");

    let mut config = Config::default();
    config.gesture.idle_policy = IdlePolicy::Reset;
    config.face_guide.face_unlock_frames = 12;
    config.security.ledger_path = Some(dir.path().join("accounts.yaml"));
    config.to_file(&path).unwrap();

    let loaded = Config::from_file(&path).unwrap();
    assert_eq!(loaded.gesture.idle_policy, IdlePolicy::Reset);
    assert_eq!(loaded.face_guide.face_unlock_frames, 12);
    assert_eq!(loaded.security.ledger_path, config.security.ledger_path);
    assert!(loaded.validate().is_ok());
}

#[test]
fn test_missing_config_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let result = Config::from_file(dir.path().join("absent.yaml"));
    assert!(matches!(result, Err(Error::Io(_))));
}

#[test]
fn test_ledger_is_created_and_reloaded() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("data").join("accounts.yaml");
    let security = SecurityConfig {
        ledger_path: Some(path.clone()),
        ..SecurityConfig::default()
    };

    let mut ledger = Ledger::from_config(&security).unwrap();
    assert!(path.exists());
    assert_eq!(ledger.balance(DEMO_ACCOUNT_NUMBER), Some(DEMO_ACCOUNT_BALANCE));

    let number = ledger.create_account("SATO", "4826").unwrap();
    ledger
        .withdraw(DEMO_ACCOUNT_NUMBER, DEMO_ACCOUNT_PIN, 1_000)
        .unwrap();

    let mut reloaded = Ledger::from_config(&security).unwrap();
    // PINs are stored hashed only
    let record = reloaded.account(&number).unwrap();
    assert_eq!(record.pin_hash.len(), 64);
    assert_ne!(record.pin_hash, "4826");
    assert_eq!(reloaded.holder_name(&number).as_deref(), Some("SATO"));
    assert_eq!(reloaded.balance(DEMO_ACCOUNT_NUMBER), Some(DEMO_ACCOUNT_BALANCE - 1_000));
    assert!(reloaded.verify_pin(&number, "4826").is_ok());
}

#[test]
fn test_ledger_salt_must_match() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("accounts.yaml");

    let first = SecurityConfig {
        ledger_path: Some(path.clone()),
        ..SecurityConfig::default()
    };
    Ledger::from_config(&first).unwrap();

    let other_salt = SecurityConfig {
        pin_salt: "another_salt".to_string(),
        ledger_path: Some(path),
        ..SecurityConfig::default()
    };
    let mut ledger = Ledger::from_config(&other_salt).unwrap();
    assert!(ledger.verify_pin(DEMO_ACCOUNT_NUMBER, DEMO_ACCOUNT_PIN).is_err());
}

#[test]
fn test_corrupt_ledger_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("accounts.yaml");
    fs::write(&path, "accounts: [not, a, map]").unwrap();

    let security = SecurityConfig {
        ledger_path: Some(path),
        ..SecurityConfig::default()
    };
    assert!(Ledger::from_config(&security).is_err());
}

#[test]
fn test_script_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("session.yaml");
    fs::write(
        &path,
        r#"
frame_size: [320, 240]
steps:
  - repeat: 10
    faces: [[110, 70, 100, 100]]
  - keys: "12"
"#,
    )
    .unwrap();

    let script = Script::from_file(&path).unwrap();
    assert_eq!(script.frame_size, [320, 240]);
    assert_eq!(script.frame_count(), 11);

    let source = script.into_source();
    assert_eq!(source.remaining(), 11);
}

#[test]
fn test_pin_attempt_reset_is_persisted() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("accounts.yaml");
    let security = SecurityConfig {
        ledger_path: Some(path),
        ..SecurityConfig::default()
    };

    let mut ledger = Ledger::from_config(&security).unwrap();
    assert!(ledger.verify_pin(DEMO_ACCOUNT_NUMBER, "0000").is_err());
    assert_eq!(
        Ledger::from_config(&security).unwrap().account(DEMO_ACCOUNT_NUMBER).unwrap().failed_attempts,
        1
    );

    // A correct PIN with no balance change still has to reach the file
    assert!(ledger.verify_pin(DEMO_ACCOUNT_NUMBER, DEMO_ACCOUNT_PIN).is_ok());
    let reloaded = Ledger::from_config(&security).unwrap();
    assert_eq!(reloaded.account(DEMO_ACCOUNT_NUMBER).unwrap().failed_attempts, 0);
}
