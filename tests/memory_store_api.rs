//! Store-backed resources: DTO mapping, key handling and toggled verbs over `MemoryStore`.

mod common;

use axum::http::{Method, StatusCode};
use axum::Router;
use common::{get, send};
use rest_scaffold::{
    field, resource_routes, Action, ConfigError, Field, MemoryStore, Model, Options, Resource,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
struct Record {
    key: String,
    a: i64,
    b: i64,
}

impl Model for Record {
    fn fields() -> Vec<Field<Self>> {
        vec![field!(Record, key).key(), field!(Record, a), field!(Record, b)]
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct RecordDto {
    key: String,
    a: i64,
}

impl Model for RecordDto {
    fn fields() -> Vec<Field<Self>> {
        vec![field!(RecordDto, key), field!(RecordDto, a)]
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct Employee {
    id: u64,
    name: String,
    skills: Vec<String>,
}

impl Model for Employee {
    fn fields() -> Vec<Field<Self>> {
        vec![
            field!(Employee, id),
            field!(Employee, name),
            field!(Employee, skills).child(),
        ]
    }
}

fn records(options: Options<Record>) -> (Router, Arc<MemoryStore<Record, RecordDto>>) {
    let store = Arc::new(MemoryStore::<Record, RecordDto>::new().unwrap());
    store
        .insert(Record {
            key: "k1".into(),
            a: 1,
            b: 9,
        })
        .unwrap();
    let app = resource_routes(Resource::from_store("records", Arc::clone(&store), options)).unwrap();
    (app, store)
}

fn employees() -> (Router, Arc<MemoryStore<Employee, Employee>>) {
    let store = Arc::new(MemoryStore::<Employee, Employee>::new().unwrap());
    store
        .insert(Employee {
            id: 7,
            name: "Ann".into(),
            skills: vec!["rust".into(), "sql".into()],
        })
        .unwrap();
    let app = resource_routes(Resource::from_store(
        "employees",
        Arc::clone(&store),
        Options::default(),
    ))
    .unwrap();
    (app, store)
}

#[tokio::test]
async fn update_preserves_storage_only_fields() {
    let (app, store) = records(Options::default());
    let r = send(&app, Method::PUT, "/records/k1", &json!({ "key": "k1", "a": 5 }).to_string()).await;
    assert_eq!(r.status, StatusCode::OK);
    assert_eq!(r.json(), json!({ "key": "k1", "a": 5 }));
    assert_eq!(
        store.get("k1").unwrap(),
        Some(Record {
            key: "k1".into(),
            a: 5,
            b: 9,
        })
    );
}

#[tokio::test]
async fn responses_carry_only_transport_fields() {
    let (app, _) = records(Options::default());
    let r = get(&app, "/records/k1").await;
    assert_eq!(r.json(), json!({ "key": "k1", "a": 1 }));
}

#[tokio::test]
async fn create_with_empty_key_fails() {
    let (app, store) = records(Options::default());
    let r = send(&app, Method::POST, "/records", &json!({ "a": 3 }).to_string()).await;
    assert_eq!(r.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(r.json()["error"]["code"], "missing_key");
    assert_eq!(store.len().unwrap(), 1);
}

#[tokio::test]
async fn create_with_existing_key_leaves_entry_unchanged() {
    let (app, store) = records(Options::default());
    let r = send(&app, Method::POST, "/records", &json!({ "key": "k1", "a": 100 }).to_string()).await;
    assert_eq!(r.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(r.json()["error"]["code"], "conflict");
    assert_eq!(store.get("k1").unwrap().unwrap().a, 1);

    let r = send(&app, Method::POST, "/records", &json!({ "key": "k2", "a": 2 }).to_string()).await;
    assert_eq!(r.status, StatusCode::OK);
    assert_eq!(store.get("k2").unwrap().unwrap().b, 0);
}

#[tokio::test]
async fn empty_store_lists_nothing() {
    let store = Arc::new(MemoryStore::<Record, RecordDto>::new().unwrap());
    let app = resource_routes(Resource::from_store("records", store, Options::default())).unwrap();
    let r = get(&app, "/records").await;
    assert_eq!(r.status, StatusCode::OK);
    assert_eq!(r.text(), "[]");
}

#[tokio::test]
async fn integer_keys() {
    let (app, _) = employees();
    assert_eq!(get(&app, "/employees/seven").await.status, StatusCode::NOT_FOUND);
    assert_eq!(get(&app, "/employees/8").await.status, StatusCode::NOT_FOUND);
    let r = get(&app, "/employees/7").await;
    assert_eq!(r.status, StatusCode::OK);
    assert_eq!(r.json()["name"], "Ann");
    assert_eq!(
        send(&app, Method::DELETE, "/employees/x1", "").await.status,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn child_fields_become_sub_paths() {
    let (app, _) = employees();
    let r = get(&app, "/employees/7/skills").await;
    assert_eq!(r.status, StatusCode::OK);
    assert_eq!(r.json(), json!(["rust", "sql"]));
    assert_eq!(get(&app, "/employees/8/skills").await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn filter_matches_substrings() {
    let (app, store) = employees();
    store
        .insert(Employee {
            id: 8,
            name: "Bob".into(),
            skills: vec![],
        })
        .unwrap();
    let r = send(&app, Method::POST, "/employees/filter", &json!({ "name": "nn" }).to_string()).await;
    assert_eq!(r.status, StatusCode::OK);
    assert_eq!(r.json().as_array().unwrap().len(), 1);
    let r = send(&app, Method::POST, "/employees/filter", "{}").await;
    assert_eq!(r.json().as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn delete_removes_from_store() {
    let (app, store) = employees();
    let r = send(&app, Method::DELETE, "/employees/7", "").await;
    assert_eq!(r.status, StatusCode::OK);
    assert_eq!(r.text(), "deleted");
    assert!(store.is_empty().unwrap());
    assert_eq!(get(&app, "/employees/7").await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn disabled_verbs_answer_405_regardless_of_authorization() {
    let options = Options::read_only().authorize(|_, _, _| false);
    let (app, store) = records(options);
    let body = json!({ "key": "k1", "a": 5 }).to_string();
    assert_eq!(
        send(&app, Method::PUT, "/records/k1", &body).await.status,
        StatusCode::METHOD_NOT_ALLOWED
    );
    assert_eq!(
        send(&app, Method::POST, "/records", &body).await.status,
        StatusCode::METHOD_NOT_ALLOWED
    );
    assert_eq!(
        send(&app, Method::DELETE, "/records/k1", "").await.status,
        StatusCode::METHOD_NOT_ALLOWED
    );
    assert_eq!(get(&app, "/records/k1").await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(store.get("k1").unwrap().unwrap().a, 1);
}

#[tokio::test]
async fn create_without_mutate_is_not_installed() {
    let options = Options {
        mutate: false,
        ..Options::default()
    };
    let (app, store) = records(options);
    let r = send(&app, Method::POST, "/records", &json!({ "key": "k3" }).to_string()).await;
    assert_eq!(r.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(store.len().unwrap(), 1);
    assert_eq!(send(&app, Method::DELETE, "/records/k1", "").await.status, StatusCode::OK);
}

#[tokio::test]
async fn authorizer_can_deny_single_actions() {
    let options = Options::default().authorize(|_, action, item: Option<&Record>| {
        action != Action::Delete || item.map(|r| r.b != 9).unwrap_or(false)
    });
    let (app, store) = records(options);
    assert_eq!(send(&app, Method::DELETE, "/records/k1", "").await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(send(&app, Method::DELETE, "/records/k9", "").await.status, StatusCode::UNAUTHORIZED);
    assert!(store.get("k1").unwrap().is_some());
    assert_eq!(get(&app, "/records/k9").await.status, StatusCode::NOT_FOUND);
}

#[test]
fn mismatched_models_fail_at_construction() {
    #[derive(Clone, Default)]
    struct Wide {
        key: String,
        extra: bool,
    }

    impl Model for Wide {
        fn fields() -> Vec<Field<Self>> {
            vec![field!(Wide, key), field!(Wide, extra)]
        }
    }

    let err = MemoryStore::<Record, Wide>::new().err().unwrap();
    assert!(matches!(err, ConfigError::UnmappedField { field: "extra", .. }));
}

#[tokio::test]
async fn update_without_key_keeps_the_path_key() {
    let (app, store) = records(Options::default());
    let r = send(&app, Method::PUT, "/records/k1", &json!({ "a": 5 }).to_string()).await;
    assert_eq!(r.status, StatusCode::OK);
    assert_eq!(r.json(), json!({ "key": "k1", "a": 5 }));
    assert_eq!(store.len().unwrap(), 1);
    assert_eq!(
        store.get("k1").unwrap(),
        Some(Record {
            key: "k1".into(),
            a: 5,
            b: 9,
        })
    );
}

#[tokio::test]
async fn update_cannot_move_an_entity_to_another_key() {
    let options = Options {
        create: false,
        ..Options::default()
    };
    let (app, store) = records(options);
    let r = send(&app, Method::PUT, "/records/k1", &json!({ "key": "k2", "a": 5 }).to_string()).await;
    assert_eq!(r.status, StatusCode::BAD_REQUEST);
    assert_eq!(r.json()["error"]["code"], "key_mismatch");
    assert!(store.get("k2").unwrap().is_none());
    assert_eq!(store.len().unwrap(), 1);
    assert_eq!(store.get("k1").unwrap().unwrap().a, 1);
}

#[tokio::test]
async fn item_keyed_filter_stays_reachable() {
    let (app, store) = records(Options::default());
    store
        .insert(Record {
            key: "filter".into(),
            a: 2,
            b: 3,
        })
        .unwrap();

    let r = get(&app, "/records/filter").await;
    assert_eq!(r.status, StatusCode::OK);
    assert_eq!(r.json(), json!({ "key": "filter", "a": 2 }));

    let r = send(&app, Method::PUT, "/records/filter", &json!({ "a": 7 }).to_string()).await;
    assert_eq!(r.status, StatusCode::OK);
    assert_eq!(store.get("filter").unwrap().unwrap().b, 3);

    let r = send(&app, Method::POST, "/records/filter", &json!({ "a": 7 }).to_string()).await;
    assert_eq!(r.json(), json!([{ "key": "filter", "a": 7 }]));

    let r = send(&app, Method::DELETE, "/records/filter", "").await;
    assert_eq!(r.text(), "deleted");
    assert!(store.get("filter").unwrap().is_none());
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct Plain {
    key: String,
    a: i64,
    b: i64,
}

impl Model for Plain {
    fn fields() -> Vec<Field<Self>> {
        vec![field!(Plain, key).key(), field!(Plain, a), field!(Plain, b).excluded()]
    }
}

#[tokio::test]
async fn one_type_for_storage_and_transport_keeps_excluded_fields() {
    let store = Arc::new(MemoryStore::<Plain, Plain>::new().unwrap());
    store
        .insert(Plain {
            key: "k1".into(),
            a: 1,
            b: 9,
        })
        .unwrap();
    let app = resource_routes(Resource::from_store("plain", Arc::clone(&store), Options::default())).unwrap();

    let body = json!({ "key": "k1", "a": 5, "b": 100 }).to_string();
    let r = send(&app, Method::PUT, "/plain/k1", &body).await;
    assert_eq!(r.status, StatusCode::OK);
    assert_eq!(
        store.get("k1").unwrap(),
        Some(Plain {
            key: "k1".into(),
            a: 5,
            b: 9,
        })
    );
}

#[test]
fn transport_fields_over_children_must_be_marked() {
    #[derive(Clone, Default)]
    struct Summary {
        id: u64,
        skills: Vec<String>,
    }

    impl Model for Summary {
        fn fields() -> Vec<Field<Self>> {
            vec![field!(Summary, id), field!(Summary, skills)]
        }
    }

    let err = MemoryStore::<Employee, Summary>::new().err().unwrap();
    assert!(matches!(err, ConfigError::ChildInTransport { field: "skills", .. }));
}
