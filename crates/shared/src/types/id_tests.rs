use super::*;
use std::str::FromStr;
use uuid::Uuid;

#[test]
fn test_new_ids_are_time_ordered() {
    let first = CashSessionId::new();
    let second = CashSessionId::new();
    assert_eq!(first.into_inner().get_version_num(), 7);
    assert!(first.into_inner() < second.into_inner());
}

#[test]
fn test_id_round_trips_through_display() {
    let uuid = Uuid::new_v4();
    let id = ExpenseId::from_uuid(uuid);
    assert_eq!(id.to_string(), uuid.to_string());
    assert_eq!(ExpenseId::from_str(&id.to_string()).unwrap(), id);
}

#[test]
fn test_id_rejects_garbage() {
    assert!(FlexiEntryId::from_str("not-a-uuid").is_err());
}

#[test]
fn test_id_serializes_as_bare_uuid() {
    let uuid = Uuid::new_v4();
    let json = serde_json::to_string(&UserId::from_uuid(uuid)).unwrap();
    assert_eq!(json, format!("\"{uuid}\""));

    let back: UserId = serde_json::from_str(&json).unwrap();
    assert_eq!(back.into_inner(), uuid);
}
