//! End-to-end CRUD over the patient schema: write a nested patient,
//! read it back by id through SQLite, and compare the nested structure.

use embedmap::config::{DebugFlag, EmbedmapConfig};
use embedmap::{Entity, MappingContext, Row, SchemaRegistry, Value};
use serde::{Deserialize, Serialize};
use serde_json::json;

const PATIENT_SCHEMA: &str = include_str!("../schemas/patient.toml");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersonName {
    given_name: String,
    surname: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct EmergencyContact {
    name: PersonName,
    relationship: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Patient {
    id: String,
    name: PersonName,
    emergency_contact: Option<EmergencyContact>,
}

impl Entity for Patient {
    const NAME: &'static str = "Patient";
}

fn init_context() -> MappingContext {
    let registry = SchemaRegistry::from_toml_str(PATIENT_SCHEMA).expect("schema parses");
    let config = EmbedmapConfig::in_memory().with_debug(&[DebugFlag::Query, DebugFlag::QueryParams]);
    let ctx = MappingContext::init(&config, &registry).expect("context initializes");
    ctx.refresh_database().expect("tables created");
    ctx
}

fn name(given: &str, surname: &str) -> PersonName {
    PersonName {
        given_name: given.to_string(),
        surname: surname.to_string(),
    }
}

#[test]
fn basic_crud() {
    let ctx = init_context();

    ctx.persist(
        "Patient",
        &json!({
            "id": "1",
            "name": { "givenName": "John", "surname": "Doe" },
            "emergencyContact": {
                "name": { "givenName": "Jane", "surname": "Doe" },
                "relationship": "wife"
            }
        }),
    )
    .unwrap();

    let patient = ctx
        .query("Patient")
        .unwrap()
        .select_all()
        .where_eq("id", "1")
        .get()
        .unwrap()
        .expect("patient 1 exists");

    assert_eq!(
        patient,
        json!({
            "id": "1",
            "name": { "givenName": "John", "surname": "Doe" },
            "emergencyContact": {
                "name": { "givenName": "Jane", "surname": "Doe" },
                "relationship": "wife"
            }
        })
    );

    ctx.close().unwrap();
}

#[test]
fn table_has_prefixed_columns() {
    let ctx = init_context();

    let meta = ctx.metadata("Patient").unwrap();
    assert_eq!(
        meta.column_names(),
        vec![
            "id",
            "givenName",
            "surname",
            "emergency_contact_givenName",
            "emergency_contact_surname",
            "emergency_contact_relationship",
        ]
    );
    assert_eq!(
        ctx.store().table_columns("patient").unwrap(),
        meta.column_names()
    );
}

#[test]
fn typed_round_trip_with_and_without_contact() {
    let ctx = init_context();

    let john = Patient {
        id: "1".into(),
        name: name("John", "Doe"),
        emergency_contact: Some(EmergencyContact {
            name: name("Jane", "Doe"),
            relationship: "wife".into(),
        }),
    };
    let solo = Patient {
        id: "2".into(),
        name: name("Ada", "Byron"),
        emergency_contact: None,
    };

    ctx.insert(&john).unwrap();
    ctx.insert(&solo).unwrap();

    assert_eq!(ctx.find::<Patient>("1").unwrap(), Some(john));
    assert_eq!(ctx.find::<Patient>("2").unwrap(), Some(solo));

    let raw = ctx.query("Patient").unwrap().where_eq("id", "2").rows().unwrap();
    assert_eq!(raw.len(), 1);
    for column in [
        "emergency_contact_givenName",
        "emergency_contact_surname",
        "emergency_contact_relationship",
    ] {
        assert!(raw[0].is_null(column), "{column} should be NULL");
    }
}

#[test]
fn query_by_nested_prefixed_path() {
    let ctx = init_context();

    ctx.insert(&Patient {
        id: "1".into(),
        name: name("John", "Doe"),
        emergency_contact: Some(EmergencyContact {
            name: name("Jane", "Doe"),
            relationship: "wife".into(),
        }),
    })
    .unwrap();
    ctx.insert(&Patient {
        id: "2".into(),
        name: name("Mia", "Roe"),
        emergency_contact: Some(EmergencyContact {
            name: name("Sam", "Roe"),
            relationship: "brother".into(),
        }),
    })
    .unwrap();

    let found = ctx
        .query("Patient")
        .unwrap()
        .where_eq("emergencyContact.name.givenName", "Sam")
        .all()
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["id"], "2");
}

#[test]
fn partial_contact_row_is_rejected_on_read() {
    let ctx = init_context();
    let meta = ctx.metadata("Patient").unwrap();

    let row = Row::new()
        .with("id", "3")
        .with("givenName", "Lee")
        .with("surname", "Kim")
        .with("emergency_contact_givenName", "Max")
        .with("emergency_contact_surname", Value::Null)
        .with("emergency_contact_relationship", "son");

    // The store accepts the row; only materialization enforces the rule
    ctx.store().insert_row(meta, &row).unwrap();

    let err = ctx.find_one("Patient", "3").unwrap_err();
    assert!(matches!(err, embedmap::Error::InconsistentPartialRow { .. }));
}
