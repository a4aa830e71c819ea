//! `ApiClient` against an in-process stub backend.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use masterplan_client::{ApiClient, USER_ID_HEADER};
use masterplan_common::{ApiConfig, AppError};
use masterplan_core::models::{
    ClassificationCreate, ClassificationListParams, ClassificationUpdate, ProjectListParams,
    ProjectStatus, TaskUpdate,
};
use masterplan_core::test_utils::{sample_fixture, sample_tree};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use url::Url;

#[derive(Clone, Default)]
struct Seen {
    requests: Arc<Mutex<Vec<(String, HashMap<String, String>, Option<String>)>>>,
}

impl Seen {
    fn record(&self, route: &str, query: HashMap<String, String>, headers: &HeaderMap) {
        let user = headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.requests
            .lock()
            .unwrap()
            .push((route.to_string(), query, user));
    }

    fn all(&self) -> Vec<(String, HashMap<String, String>, Option<String>)> {
        self.requests.lock().unwrap().clone()
    }
}

async fn tree(
    State(seen): State<Seen>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Json<Value> {
    seen.record("tree", query, &headers);
    Json(serde_json::to_value(sample_tree()).unwrap())
}

async fn list(
    State(seen): State<Seen>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Json<Value> {
    let parent_id: Option<i64> = query.get("parent_id").and_then(|p| p.parse().ok());
    seen.record("list", query, &headers);
    let records: Vec<_> = sample_fixture()
        .records()
        .into_iter()
        .filter(|r| parent_id.is_none() || r.parent_id == parent_id)
        .collect();
    Json(serde_json::to_value(records).unwrap())
}

async fn fetch_one(Path(id): Path<i64>) -> impl IntoResponse {
    match sample_fixture().records().into_iter().find(|r| r.id == id) {
        Some(record) => Json(serde_json::to_value(record).unwrap()).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"detail": format!("Classification {id} not found")})),
        )
            .into_response(),
    }
}

async fn create(State(seen): State<Seen>, headers: HeaderMap, Json(body): Json<Value>) -> impl IntoResponse {
    seen.record("create", HashMap::new(), &headers);
    if body["name"] == "Wiring" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"detail": "Duplicate classification name 'Wiring'"})),
        )
            .into_response();
    }
    if body["name"] == "" {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"detail": [
                {"loc": ["body", "name"], "msg": "String should have at least 1 character", "type": "string_too_short"}
            ]})),
        )
            .into_response();
    }
    (
        StatusCode::CREATED,
        Json(json!({
            "id": 31,
            "project_id": body["project_id"],
            "parent_id": body["parent_id"],
            "name": body["name"],
            "depth": 2,
            "path": "Electrical/Lighting",
            "sort_no": body["sort_no"],
            "is_active": true,
            "owner_dept_id": null,
            "created_at": "2026-03-01T09:30:00.123456",
            "updated_at": null
        })),
    )
        .into_response()
}

async fn update(Path(id): Path<i64>, Json(body): Json<Value>) -> impl IntoResponse {
    // Absent fields must not be sent as null.
    if body.as_object().map_or(0, serde_json::Map::len) != 1 {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"detail": format!("unexpected fields: {body}")})),
        )
            .into_response();
    }
    Json(json!({
        "id": id,
        "project_id": 42,
        "parent_id": 7,
        "name": body["name"],
        "depth": 2,
        "path": format!("Electrical/{}", body["name"].as_str().unwrap_or_default()),
        "sort_no": 0,
        "is_active": true
    }))
    .into_response()
}

async fn remove(State(seen): State<Seen>, Path(id): Path<i64>, headers: HeaderMap) -> impl IntoResponse {
    seen.record("delete", HashMap::new(), &headers);
    match id {
        15 => StatusCode::NO_CONTENT.into_response(),
        7 => (
            StatusCode::BAD_REQUEST,
            Json(json!({"detail": "Cannot delete: 1 child classifications exist"})),
        )
            .into_response(),
        _ => (
            StatusCode::NOT_FOUND,
            Json(json!({"detail": format!("Classification {id} not found")})),
        )
            .into_response(),
    }
}

async fn tasks(State(seen): State<Seen>, Query(query): Query<HashMap<String, String>>, headers: HeaderMap) -> Json<Value> {
    let linked = query.get("classification_id").map(String::as_str) == Some("23");
    seen.record("tasks", query, &headers);
    if linked {
        Json(json!([{
            "id": 5,
            "project_id": 42,
            "classification_id": 23,
            "title": "Replace copper run",
            "status": "open",
            "actual_start_date": "2026-03-02"
        }]))
    } else {
        Json(json!([]))
    }
}

async fn update_task(
    State(seen): State<Seen>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    seen.record("update_task", HashMap::new(), &headers);
    let mut task = json!({
        "id": id,
        "project_id": 42,
        "classification_id": 15,
        "title": "Pull cable",
        "status": "open"
    });
    if let Some(fields) = body.as_object() {
        for (key, value) in fields {
            task[key] = value.clone();
        }
    }
    Json(task)
}

async fn projects() -> impl IntoResponse {
    (StatusCode::SERVICE_UNAVAILABLE, "maintenance")
}

async fn project(Path(id): Path<i64>) -> Json<Value> {
    Json(json!({
        "id": id,
        "code": "P-042",
        "name": "Plant A",
        "status": "in_progress",
        "ordered_at": "2026-01-10"
    }))
}

async fn spawn_stub() -> (ApiClient, Seen) {
    let seen = Seen::default();
    let app = Router::new()
        .route("/api/classifications/tree", get(tree))
        .route("/api/classifications", get(list).post(create))
        .route(
            "/api/classifications/{id}",
            get(fetch_one).delete(remove).patch(update),
        )
        .route("/api/tasks", get(tasks))
        .route("/api/tasks/{id}", patch(update_task))
        .route("/api/projects", get(projects))
        .route("/api/projects/{id}", get(project))
        .with_state(seen.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let config = ApiConfig {
        base_url: Url::parse(&format!("http://{addr}/api")).unwrap(),
        user_id: "dev".to_string(),
        timeout_secs: Some(5),
    };
    (ApiClient::new(&config).unwrap(), seen)
}

#[tokio::test]
async fn test_tree_fetch_sends_project_and_user() {
    let (client, seen) = spawn_stub().await;

    let tree = client.classification_tree(42).await.unwrap();
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].name, "ROOT");
    assert_eq!(tree[0].children.len(), 2);

    let requests = seen.all();
    assert_eq!(requests[0].0, "tree");
    assert_eq!(requests[0].1.get("project_id").map(String::as_str), Some("42"));
    assert_eq!(requests[0].2.as_deref(), Some("dev"));
}

#[tokio::test]
async fn test_create_parses_naive_timestamp() {
    let (client, seen) = spawn_stub().await;
    let payload = ClassificationCreate {
        project_id: 42,
        parent_id: Some(7),
        name: "Lighting".to_string(),
        sort_no: 1,
        is_active: true,
        owner_dept_id: None,
    };

    let created = client.create_classification(&payload).await.unwrap();
    assert_eq!(created.id, 31);
    assert_eq!(created.path, "Electrical/Lighting");
    assert!(created.created_at.is_some());
    assert!(created.updated_at.is_none());
    assert_eq!(seen.all()[0].2.as_deref(), Some("dev"));
}

#[tokio::test]
async fn test_create_rejection_keeps_detail() {
    let (client, _) = spawn_stub().await;
    let mut payload = ClassificationCreate::root(42);
    payload.parent_id = Some(7);
    payload.name = "Wiring".to_string();

    let err = client.create_classification(&payload).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(err.user_message(), "Duplicate classification name 'Wiring'");

    payload.name = String::new();
    let err = client.create_classification(&payload).await.unwrap_err();
    assert_eq!(
        err.user_message(),
        "name: String should have at least 1 character"
    );
}

#[tokio::test]
async fn test_update_sends_only_present_fields() {
    let (client, _) = spawn_stub().await;
    let changes = ClassificationUpdate {
        name: Some("Cabling".to_string()),
        ..Default::default()
    };

    let updated = client.update_classification(15, &changes).await.unwrap();
    assert_eq!(updated.name, "Cabling");
    assert_eq!(updated.path, "Electrical/Cabling");
}

#[tokio::test]
async fn test_list_classifications_by_parent() {
    let (client, seen) = spawn_stub().await;
    let params = ClassificationListParams {
        project_id: Some(42),
        parent_id: Some(20),
        ..Default::default()
    };

    let records = client.list_classifications(&params).await.unwrap();
    let ids: Vec<i64> = records.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![21, 22]);
    assert!(!records[1].is_active);

    let query = &seen.all()[0].1;
    assert_eq!(query.get("project_id").map(String::as_str), Some("42"));
    assert_eq!(query.get("parent_id").map(String::as_str), Some("20"));
    assert!(!query.contains_key("limit"));
}

#[tokio::test]
async fn test_get_classification() {
    let (client, _) = spawn_stub().await;

    let record = client.get_classification(23).await.unwrap();
    assert_eq!(record.name, "Copper");
    assert_eq!(record.parent_id, Some(21));

    let err = client.get_classification(404).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(ref d) if d == "Classification 404 not found"));
}

#[tokio::test]
async fn test_get_project() {
    let (client, _) = spawn_stub().await;

    let project = client.get_project(42).await.unwrap();
    assert_eq!(project.name, "Plant A");
    assert_eq!(project.status, ProjectStatus::InProgress);
    assert!(project.due_at.is_none());
}

#[tokio::test]
async fn test_update_task_sends_changed_fields() {
    let (client, seen) = spawn_stub().await;
    let changes = TaskUpdate {
        title: Some("Pull armoured cable".to_string()),
        ..Default::default()
    };

    let task = client.update_task(5, &changes).await.unwrap();
    assert_eq!(task.id, 5);
    assert_eq!(task.title, "Pull armoured cable");
    assert_eq!(task.status, "open");
    assert_eq!(seen.all()[0].2.as_deref(), Some("dev"));
}

#[tokio::test]
async fn test_delete_status_mapping() {
    let (client, _) = spawn_stub().await;

    client.delete_classification(15).await.unwrap();

    let err = client.delete_classification(7).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(ref d) if d.contains("child")));

    let err = client.delete_classification(99).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(ref d) if d == "Classification 99 not found"));
}

#[tokio::test]
async fn test_linked_task_probe_limits_to_one() {
    let (client, seen) = spawn_stub().await;

    assert!(client.has_linked_tasks(23).await.unwrap());
    assert!(!client.has_linked_tasks(15).await.unwrap());

    let probes: Vec<_> = seen
        .all()
        .into_iter()
        .filter(|(route, _, _)| route == "tasks")
        .collect();
    assert_eq!(probes.len(), 2);
    assert_eq!(probes[0].1.get("limit").map(String::as_str), Some("1"));
    assert_eq!(
        probes[1].1.get("classification_id").map(String::as_str),
        Some("15")
    );
}

#[tokio::test]
async fn test_server_error_without_json() {
    let (client, _) = spawn_stub().await;
    let err = client
        .list_projects(&ProjectListParams::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::ExternalService { status: 503, ref detail } if detail == "maintenance"
    ));
}

#[tokio::test]
async fn test_unreachable_backend_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = ApiClient::new(&ApiConfig {
        base_url: Url::parse(&format!("http://{addr}/")).unwrap(),
        user_id: "dev".to_string(),
        timeout_secs: Some(2),
    })
    .unwrap();

    let err = client.classification_tree(42).await.unwrap_err();
    assert!(matches!(err, AppError::Transport(_)));
    assert!(!err.user_message().contains(&addr.to_string()));
}
