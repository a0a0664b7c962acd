//! CredentialStore 契约测试
//!
//! 验证凭证存储的本地过期策略:
//! - save 以 `now + ttl` 计算过期时间
//! - 过期记录在 load 时返回空并被删除
//! - is_valid 每次重新读取持久化记录
//! - 凭证文件仅所有者可读写

use chrono::{Duration, TimeZone, Utc};
use serde_json::Value;
use std::fs;
use std::sync::Arc;

use live_monitor::models::{AuthError, Credential};
use live_monitor::services::CredentialStore;
use live_monitor::utils::ManualClock;

fn credential() -> Credential {
    Credential::new(
        "sessdata-value".to_string(),
        "bili_jct-value".to_string(),
        "777".to_string(),
    )
    .with_refresh_value("ac_time_value".to_string())
}

fn setup() -> (tempfile::TempDir, Arc<ManualClock>, CredentialStore) {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
    ));
    let store = CredentialStore::new(
        dir.path().join("credentials.json"),
        Duration::hours(6),
        clock.clone(),
    );
    (dir, clock, store)
}

#[test]
fn test_record_contains_expiry() {
    let (dir, _, store) = setup();
    assert!(store.save(&credential()));

    let raw: Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("credentials.json")).unwrap())
            .unwrap();
    assert_eq!(raw["session_token"], "sessdata-value");
    assert_eq!(raw["csrf_token"], "bili_jct-value");
    assert_eq!(raw["user_id"], "777");
    assert_eq!(raw["refresh_value"], "ac_time_value");

    let expires_at: chrono::DateTime<Utc> =
        serde_json::from_value(raw["expires_at"].clone()).unwrap();
    assert_eq!(
        expires_at,
        Utc.with_ymd_and_hms(2024, 5, 1, 18, 0, 0).unwrap()
    );
}

#[test]
fn test_valid_until_ttl_boundary() {
    let (_dir, clock, store) = setup();
    store.save(&credential());

    clock.advance(Duration::hours(6));
    assert!(store.is_valid());

    assert_eq!(store.require_valid(), Ok(credential()));
}

#[test]
fn test_expired_round_trip() {
    for offset in [Duration::seconds(1), Duration::hours(1), Duration::days(30)] {
        let (dir, clock, store) = setup();
        store.save(&credential());

        clock.advance(Duration::hours(6) + offset);

        assert!(!store.is_valid());
        assert_eq!(store.require_valid(), Err(AuthError::CredentialExpired));
        assert!(store.load().is_none());
        assert!(!dir.path().join("credentials.json").exists());
        assert_eq!(store.require_valid(), Err(AuthError::NotLoggedIn));
    }
}

#[test]
fn test_missing_file_is_not_logged_in() {
    let (_dir, _, store) = setup();
    assert!(store.load().is_none());
    assert!(!store.is_valid());
    assert!(store.clear());
}

#[cfg(unix)]
#[test]
fn test_owner_only_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let (dir, _, store) = setup();
    store.save(&credential());

    let mode = fs::metadata(dir.path().join("credentials.json"))
        .unwrap()
        .permissions()
        .mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn test_debug_output_hides_tokens() {
    let rendered = format!("{:?}", credential());
    assert!(!rendered.contains("sessdata-value"));
    assert!(!rendered.contains("bili_jct-value"));
    assert!(!credential().sample_for_logging().contains("sessdata-value"));
}
