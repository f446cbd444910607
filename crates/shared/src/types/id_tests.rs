use super::*;
use rstest::rstest;
use uuid::Uuid;

#[test]
fn test_new_ids_are_v7_and_increasing() {
    let first = TransactionId::new();
    let second = TransactionId::new();
    assert_eq!(first.into_inner().get_version_num(), 7);
    assert_ne!(first, second);
    assert!(first < second);
}

#[test]
fn test_uuid_conversions_round_trip() {
    let raw = Uuid::new_v4();
    let account = AccountId::from(raw);
    assert_eq!(account, AccountId::from_uuid(raw));
    assert_eq!(Uuid::from(account), raw);
    assert_eq!(account.to_string(), raw.to_string());
}

#[rstest]
#[case("0190f3a4-7c1e-7d2a-9b3c-4d5e6f708192", true)]
#[case("0190F3A4-7C1E-7D2A-9B3C-4D5E6F708192", true)]
#[case("not-a-uuid", false)]
#[case("", false)]
fn test_parse(#[case] input: &str, #[case] valid: bool) {
    assert_eq!(input.parse::<CategoryId>().is_ok(), valid);
}

#[test]
fn test_serializes_as_bare_string() {
    let id = UserId::new();
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, format!("\"{}\"", id.into_inner()));
    let back: UserId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}
