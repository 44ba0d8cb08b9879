use std::collections::BTreeMap;

use serde_json::{json, Value};

use bulkedit::state::data_model::Row;
use bulkedit::state::error::FieldPathError;
use bulkedit::state::field::{Field, FieldPath};

fn student() -> Row {
    BTreeMap::from([
        ("name".to_string(), json!("Ada")),
        ("contact".to_string(), json!({ "email": "ada@example.org", "tags": ["a", "b"] })),
    ])
}

#[test]
fn test_parse_rejects_empty_and_blank_segments() {
    assert_eq!(FieldPath::parse(""), Err(FieldPathError::Empty));
    assert_eq!(
        FieldPath::parse("contact..email"),
        Err(FieldPathError::EmptySegment("contact..email".to_string()))
    );
    assert!(FieldPath::parse("contact.email").is_ok());
}

#[test]
fn test_parse_splits_once_and_displays_back() {
    let path = FieldPath::parse("a.b.c").unwrap();
    assert_eq!(path.segments(), ["a", "b", "c"]);
    assert_eq!(path.to_string(), "a.b.c");
}

#[test]
fn test_get_nested_and_array_index() {
    let row = student();
    let email = FieldPath::parse("contact.email").unwrap();
    let tag = FieldPath::parse("contact.tags.1").unwrap();
    let missing = FieldPath::parse("contact.phone.area").unwrap();

    assert_eq!(email.get(&row), Some(&json!("ada@example.org")));
    assert_eq!(tag.get(&row), Some(&json!("b")));
    assert_eq!(missing.get(&row), None);
}

#[test]
fn test_set_creates_intermediate_objects() {
    let mut row = student();
    FieldPath::parse("guardian.phone.area")
        .unwrap()
        .set(&mut row, json!("555"));
    assert_eq!(row["guardian"], json!({ "phone": { "area": "555" } }));
}

#[test]
fn test_set_overwrites_only_the_addressed_leaf() {
    let mut row = student();
    FieldPath::parse("contact.email")
        .unwrap()
        .set(&mut row, json!("new@example.org"));
    assert_eq!(
        row["contact"],
        json!({ "email": "new@example.org", "tags": ["a", "b"] })
    );
    assert_eq!(row["name"], json!("Ada"));
}

#[test]
fn test_set_into_array_slot() {
    let mut row = student();
    FieldPath::parse("contact.tags.0").unwrap().set(&mut row, json!("z"));
    assert_eq!(row["contact"]["tags"], json!(["z", "b"]));
}

#[test]
fn test_field_read_of_missing_path_is_null() {
    let row = student();
    let field = Field::path("grade").unwrap();
    assert_eq!(field.read(&row).unwrap(), Value::Null);
    assert_eq!(field.key(), "grade");
}

#[test]
fn test_parse_reserves_accessor_prefix() {
    assert_eq!(
        FieldPath::parse("@fullPhone"),
        Err(FieldPathError::Reserved("@fullPhone".to_string()))
    );
    assert!(FieldPath::parse("contact.@handle").is_ok());
}

#[test]
fn test_lookup_distinguishes_missing_from_null() {
    let mut row = student();
    row.insert("nickname".to_string(), Value::Null);
    let nickname = Field::path("nickname").unwrap();
    let grade = Field::path("grade").unwrap();
    assert_eq!(nickname.lookup(&row).unwrap(), Some(Value::Null));
    assert_eq!(grade.lookup(&row).unwrap(), None);
}

#[test]
fn test_remove_leaf_keeps_siblings() {
    let mut row = student();
    let removed = FieldPath::parse("contact.email").unwrap().remove(&mut row);
    assert_eq!(removed, Some(json!("ada@example.org")));
    assert_eq!(row["contact"], json!({ "tags": ["a", "b"] }));
}

#[test]
fn test_remove_prunes_parents_created_by_set() {
    let mut row = student();
    let before = row.clone();
    let path = FieldPath::parse("guardian.phone.area").unwrap();
    path.set(&mut row, json!("555"));
    assert_eq!(path.remove(&mut row), Some(json!("555")));
    assert_eq!(row, before);
}

#[test]
fn test_remove_of_missing_path_changes_nothing() {
    let mut row = student();
    let before = row.clone();
    assert_eq!(FieldPath::parse("contact.phone").unwrap().remove(&mut row), None);
    assert_eq!(FieldPath::parse("contact.tags.0").unwrap().remove(&mut row), None);
    assert_eq!(row, before);
}

#[test]
fn test_assign_none_removes_path() {
    let mut row = student();
    let field = Field::path("name").unwrap();
    field.assign(&mut row, None).unwrap();
    assert!(!row.contains_key("name"));
    field.assign(&mut row, Some(&json!("Ada"))).unwrap();
    assert_eq!(row, student());
}
