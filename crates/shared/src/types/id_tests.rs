use super::*;
use std::str::FromStr;
use uuid::Uuid;

#[test]
fn test_new_ids_are_unique() {
    assert_ne!(AccountId::new(), AccountId::new());
}

#[test]
fn test_uuid_conversions() {
    let uuid = Uuid::new_v4();
    let id = AccountId::from(uuid);
    assert_eq!(id, AccountId::from_uuid(uuid));
    assert_eq!(Uuid::from(id), uuid);
    assert_eq!(id.into_inner(), uuid);
}

#[test]
fn test_display_matches_uuid() {
    let uuid = Uuid::new_v4();
    assert_eq!(UserId::from_uuid(uuid).to_string(), uuid.to_string());
}

#[test]
fn test_from_str() {
    let uuid = Uuid::new_v4();
    let id = TransactionId::from_str(&uuid.to_string()).unwrap();
    assert_eq!(id.into_inner(), uuid);
    assert!(UserId::from_str("not-a-uuid").is_err());
}

#[test]
fn test_serializes_transparently() {
    let uuid = Uuid::new_v4();
    let id = AccountId::from_uuid(uuid);
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, format!("\"{uuid}\""));
}
