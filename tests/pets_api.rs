use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use pet_registry::api::handlers::AppState;
use pet_registry::api::routes::create_router;
use pet_registry::config::PaginationConfig;
use pet_registry::MemoryStore;
use serde_json::{json, Value};
use tower::ServiceExt; // for `oneshot`

fn test_app(page_size: u64) -> (Router, MemoryStore) {
    let store = MemoryStore::new();
    let state = AppState::shared(
        store.clone(),
        PaginationConfig {
            page_size,
            max_page_size: 50,
        },
    );
    let app = create_router::<MemoryStore>().with_state(state);
    (app, store)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request should build");

    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("router is infallible");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, value)
}

fn pet_body(name: &str, group: &str, traits: &[&str]) -> Value {
    json!({
        "name": name,
        "age": 2,
        "weight": 8.4,
        "sex": "Female",
        "group": {"scientific_name": group},
        "traits": traits.iter().map(|t| json!({"name": t})).collect::<Vec<_>>()
    })
}

async fn create_pet(app: &Router, name: &str, group: &str, traits: &[&str]) -> Value {
    let (status, body) = send(app, Method::POST, "/pets", Some(pet_body(name, group, traits))).await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {}", body);
    body
}

fn trait_names(pet: &Value) -> Vec<String> {
    pet["traits"]
        .as_array()
        .expect("traits should be a list")
        .iter()
        .map(|t| t["name"].as_str().unwrap_or_default().to_string())
        .collect()
}

fn ids(page: &Value) -> Vec<i64> {
    page["results"]
        .as_array()
        .expect("results should be a list")
        .iter()
        .map(|p| p["id"].as_i64().expect("id should be an integer"))
        .collect()
}

#[tokio::test]
async fn create_returns_expanded_pet_and_creates_related_rows_once() {
    let (app, store) = test_app(10);

    let pet = create_pet(&app, "Luna", "Canis lupus", &["fluffy", "loyal", "Fluffy"]).await;

    assert!(pet["id"].as_i64().is_some());
    assert_eq!(pet["name"], "Luna");
    assert_eq!(pet["age"], 2);
    assert_eq!(pet["sex"], "Female");
    assert_eq!(pet["group"]["scientific_name"], "Canis lupus");
    assert!(pet["group"]["id"].as_i64().is_some());
    assert_eq!(trait_names(&pet), vec!["fluffy", "loyal"]);

    assert_eq!(store.group_count().await, 1);
    assert_eq!(store.trait_count().await, 2);
}

#[tokio::test]
async fn group_and_traits_are_reused_ignoring_case() {
    let (app, store) = test_app(10);

    let first = create_pet(&app, "Luna", "Canis Lupus", &["Fluffy"]).await;
    let second = create_pet(&app, "Bolt", "canis lupus", &["fluffy"]).await;

    assert_eq!(first["group"]["id"], second["group"]["id"]);
    assert_eq!(second["group"]["scientific_name"], "Canis Lupus");
    assert_eq!(first["traits"][0]["id"], second["traits"][0]["id"]);
    assert_eq!(store.group_count().await, 1);
    assert_eq!(store.trait_count().await, 1);
}

#[tokio::test]
async fn create_rejects_invalid_payload_with_field_details() {
    let (app, store) = test_app(10);

    let (status, body) = send(
        &app,
        Method::POST,
        "/pets",
        Some(json!({"name": "", "age": "x", "group": {"scientific_name": "Felis catus"}})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation failed");
    assert!(body["fields"]["name"].is_array());
    assert!(body["fields"]["age"].is_array());
    assert!(body["fields"]["weight"].is_array());
    assert!(body["fields"]["traits"].is_array());
    assert_eq!(store.group_count().await, 0);
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let (app, _) = test_app(10);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/pets")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn body_without_json_content_type_is_unsupported_media_type() {
    let (app, store) = test_app(10);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/pets")
        .body(Body::from(pet_body("Luna", "Canis lupus", &[]).to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["error"].is_string());
    assert_eq!(store.group_count().await, 0);
}

#[tokio::test]
async fn duplicated_query_parameter_is_a_json_bad_request() {
    let (app, _) = test_app(10);
    create_pet(&app, "Luna", "Canis lupus", &[]).await;

    let (status, body) = send(&app, Method::GET, "/pets?page=1&page=2", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn list_filters_by_exact_trait_name() {
    let (app, _) = test_app(10);

    let fluffy = create_pet(&app, "Luna", "Canis lupus", &["fluffy"]).await;
    create_pet(&app, "Rex", "Canis lupus", &["loyal"]).await;
    let both = create_pet(&app, "Mia", "Felis catus", &["loyal", "fluffy"]).await;

    let (status, page) = send(&app, Method::GET, "/pets?trait=fluffy", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["count"], 2);
    assert_eq!(
        ids(&page),
        vec![fluffy["id"].as_i64().unwrap(), both["id"].as_i64().unwrap()]
    );

    // The filter does not fold case.
    let (status, _) = send(&app, Method::GET, "/pets?trait=Fluffy", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::GET, "/pets?trait=spotted", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, page) = send(&app, Method::GET, "/pets?trait=", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["count"], 3);
}

#[tokio::test]
async fn pages_are_ordered_by_id_without_gaps() {
    let (app, _) = test_app(2);

    let mut created = Vec::new();
    for name in ["a", "b", "c", "d", "e"] {
        created.push(create_pet(&app, name, "Felis catus", &[]).await["id"].as_i64().unwrap());
    }

    let (status, first) = send(&app, Method::GET, "/pets", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["count"], 5);
    assert_eq!(first["previous"], Value::Null);
    assert_eq!(first["next"], "/pets?page=2");

    let (_, second) = send(&app, Method::GET, "/pets?page=2", None).await;
    assert_eq!(second["previous"], "/pets");
    assert_eq!(second["next"], "/pets?page=3");

    let (_, third) = send(&app, Method::GET, "/pets?page=3", None).await;
    assert_eq!(third["next"], Value::Null);

    let mut seen = ids(&first);
    seen.extend(ids(&second));
    seen.extend(ids(&third));
    assert_eq!(seen, created);
    assert!(seen.windows(2).all(|w| w[0] < w[1]));

    let (status, body) = send(&app, Method::GET, "/pets?page=4", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Invalid page.");

    let (_, sized) = send(&app, Method::GET, "/pets?page_size=4&page=2", None).await;
    assert_eq!(ids(&sized), created[4..].to_vec());
    assert_eq!(sized["previous"], "/pets?page_size=4");
}

#[tokio::test]
async fn empty_listing_has_one_empty_page() {
    let (app, _) = test_app(2);

    let (status, page) = send(&app, Method::GET, "/pets", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page, json!({"count": 0, "next": null, "previous": null, "results": []}));
}

#[tokio::test]
async fn retrieve_returns_pet_or_not_found() {
    let (app, _) = test_app(10);
    let pet = create_pet(&app, "Luna", "Canis lupus", &["fluffy"]).await;
    let id = pet["id"].as_i64().unwrap();

    let (status, fetched) = send(&app, Method::GET, &format!("/pets/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, pet);

    let (status, _) = send(&app, Method::GET, "/pets/9999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::GET, "/pets/abc", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn patch_replaces_traits_only_when_key_present() {
    let (app, _) = test_app(10);
    let pet = create_pet(&app, "Luna", "Canis lupus", &["fluffy", "loyal"]).await;
    let uri = format!("/pets/{}", pet["id"]);

    // No traits key: traits survive, scalars merge.
    let (status, updated) = send(&app, Method::PATCH, &uri, Some(json!({"name": "Luna II", "age": 3}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Luna II");
    assert_eq!(updated["age"], 3);
    assert_eq!(updated["weight"], pet["weight"]);
    assert_eq!(trait_names(&updated), vec!["fluffy", "loyal"]);

    // A list replaces, never merges.
    let (_, updated) = send(&app, Method::PATCH, &uri, Some(json!({"traits": [{"name": "calm"}]}))).await;
    assert_eq!(trait_names(&updated), vec!["calm"]);

    // An empty list clears.
    let (_, updated) = send(&app, Method::PATCH, &uri, Some(json!({"traits": []}))).await;
    assert_eq!(trait_names(&updated), Vec::<String>::new());

    let (_, fetched) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(fetched, updated);
}

#[tokio::test]
async fn patch_reassigns_group_through_resolver() {
    let (app, store) = test_app(10);
    let cat = create_pet(&app, "Tom", "Felis catus", &[]).await;
    let dog = create_pet(&app, "Rex", "Canis lupus", &[]).await;

    let (status, updated) = send(
        &app,
        Method::PATCH,
        &format!("/pets/{}", cat["id"]),
        Some(json!({"group": {"scientific_name": "CANIS LUPUS"}})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["group"], dog["group"]);
    assert_eq!(store.group_count().await, 2);
}

#[tokio::test]
async fn patch_validates_and_reports_missing_pet() {
    let (app, _) = test_app(10);
    let pet = create_pet(&app, "Luna", "Canis lupus", &[]).await;

    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/pets/{}", pet["id"]),
        Some(json!({"sex": "Unknown"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["sex"].is_array());

    let (status, _) = send(&app, Method::PATCH, "/pets/777", Some(json!({"age": 1}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_twice_is_not_found_the_second_time() {
    let (app, store) = test_app(10);
    let pet = create_pet(&app, "Luna", "Canis lupus", &["fluffy"]).await;
    let uri = format!("/pets/{}", pet["id"]);

    let (status, body) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, _) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Related rows outlive the pet.
    assert_eq!(store.group_count().await, 1);
    assert_eq!(store.trait_count().await, 1);
}

#[tokio::test]
async fn concurrent_creates_share_a_new_group() {
    let (app, store) = test_app(10);

    let (a, b) = tokio::join!(
        send(&app, Method::POST, "/pets", Some(pet_body("Tom", "Felis Catus", &["sleepy"]))),
        send(&app, Method::POST, "/pets", Some(pet_body("Kit", "felis catus", &["SLEEPY"]))),
    );

    assert_eq!(a.0, StatusCode::CREATED);
    assert_eq!(b.0, StatusCode::CREATED);
    assert_eq!(a.1["group"]["id"], b.1["group"]["id"]);
    assert_eq!(store.group_count().await, 1);
    assert_eq!(store.trait_count().await, 1);
}

#[tokio::test]
async fn health_and_openapi_are_served() {
    let (app, _) = test_app(10);

    let (status, health) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");

    let (status, spec) = send(&app, Method::GET, "/docs/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(spec["paths"]["/pets/{pet_id}"]["patch"].is_object());
}
