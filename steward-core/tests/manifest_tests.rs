//! Manifest loading, validation and identity codec integration tests.

use assert_fs::prelude::*;
use predicates::prelude::predicate;
use rstest::rstest;
use steward_core::{
    manifest, CoreError, DeliveryMedium, MessageAction, PasswordPolicy, PoolId, ResourceIdentity,
    Username,
};

const FULL_MANIFEST: &str = r#"
pool_id: eu-west-1_Ab12Cd34
username: alice
temporary_password: "Temp-Pass-1"
message_action: SUPPRESS
force_alias_creation: true
desired_delivery_mediums: [EMAIL, SMS]
client_metadata:
  source: onboarding
validation_data:
  - { name: referrer, value: hr }
user_attributes:
  - { name: email, value: alice@example.com }
  - { name: "custom:team", value: platform }
groups: [admins, readers]
"#;

// ---------------------------------------------------------------------------
// 1. Loading
// ---------------------------------------------------------------------------

#[test]
fn load_full_manifest_into_desired_state() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("alice.yaml");
    file.write_str(FULL_MANIFEST).expect("write");
    file.assert(predicate::path::exists());

    let desired = manifest::load_at(file.path())
        .expect("load")
        .into_desired()
        .expect("valid");

    assert_eq!(desired.pool_id, PoolId::from("eu-west-1_Ab12Cd34"));
    assert_eq!(desired.username, Username::from("alice"));
    assert_eq!(desired.password.temporary(), Some("Temp-Pass-1"));
    assert_eq!(desired.message_action, Some(MessageAction::Suppress));
    assert!(desired.force_alias_creation);
    assert!(desired.desired_delivery_mediums.contains(&DeliveryMedium::Sms));
    assert_eq!(desired.client_metadata.get("source").map(String::as_str), Some("onboarding"));
    assert_eq!(desired.validation_data.len(), 1);
    assert_eq!(desired.user_attributes[1].name, "custom:team");
    assert_eq!(desired.sorted_groups(), vec!["admins", "readers"]);
    assert_eq!(desired.identity().encode(), "eu-west-1_Ab12Cd34/alice");
}

#[test]
fn load_missing_manifest_returns_not_found() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let err = manifest::load_at(&dir.path().join("nobody.yaml")).unwrap_err();
    assert!(matches!(err, CoreError::ManifestNotFound { .. }), "got: {err}");
    assert!(err.to_string().contains("nobody.yaml"));
}

#[test]
fn load_corrupt_manifest_returns_parse_error_with_path() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("broken.yaml");
    file.write_str(": : corrupt : yaml : !!!\n  - broken: [unclosed").expect("write");
    let err = manifest::load_at(file.path()).unwrap_err();
    assert!(matches!(err, CoreError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("broken.yaml"));
}

#[test]
fn conflicting_passwords_are_rejected_at_conversion() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("both.yaml");
    file.write_str(
        "pool_id: p_1\nusername: bob\ntemporary_password: Temp-Pass-1\npermanent_password: Perm-Pass-1\n",
    )
    .expect("write");
    let err = manifest::load_at(file.path())
        .expect("parse")
        .into_desired()
        .unwrap_err();
    assert!(matches!(err, CoreError::ConflictingFields { .. }), "got: {err}");
}

#[test]
fn permanent_password_becomes_permanent_policy() {
    let m = manifest::parse(
        std::path::Path::new("inline.yaml"),
        "pool_id: p_1\nusername: bob\npermanent_password: Perm-Pass-1\n",
    )
    .expect("parse");
    let desired = m.into_desired().expect("valid");
    assert_eq!(desired.password, PasswordPolicy::Permanent("Perm-Pass-1".into()));
}

// ---------------------------------------------------------------------------
// 2. Identity codec
// ---------------------------------------------------------------------------

#[rstest]
#[case("poolX", "alice")]
#[case("eu-west-1_Ab12Cd34", "bob.smith@example.com")]
#[case("p_1", "ünïcødé")]
fn identity_round_trips(#[case] pool: &str, #[case] user: &str) {
    let id = ResourceIdentity::new(PoolId::from(pool), Username::from(user));
    let back = ResourceIdentity::decode(&id.encode()).expect("decode");
    assert_eq!(back, id);
}

#[rstest]
#[case("bad")]
#[case("")]
#[case("/alice")]
#[case("poolX/")]
#[case("a/b/c")]
#[case("/")]
fn malformed_identity_is_format_error(#[case] raw: &str) {
    let err = ResourceIdentity::decode(raw).unwrap_err();
    assert!(matches!(err, CoreError::Format { .. }), "[{raw}] got: {err}");
}
