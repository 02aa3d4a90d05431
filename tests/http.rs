mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use common::{denying, posts};
use resource_kit::{
    common_routes, resource_routes, AppState, ContainsFilter, CurrentUser, DeleteAction, ListSettings, Resource,
    ResourceRegistry,
};
use serde_json::{json, Value};
use tower::ServiceExt;

fn app() -> Router {
    let registry = ResourceRegistry::new().register(
        "posts",
        Resource::new(posts(15))
            .with_list_settings(ListSettings {
                available_filter_columns: Some(vec!["published".into()]),
                max_per_page: Some(50),
                ..ListSettings::default()
            })
            .with_custom_filter(ContainsFilter::new("title_contains", "title"))
            .with_action_type("delete", DeleteAction),
    );
    let state = AppState::new(registry);
    Router::new().merge(common_routes(state.clone())).merge(resource_routes(state))
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_action(body: Value, user: Option<CurrentUser>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/posts/actions")
        .header("content-type", "application/json");
    if let Some(user) = user {
        builder = builder.extension(user);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn list_returns_page_and_message() {
    let response = app().oneshot(get("/posts?perPage=5&page=2")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["meta"]["message"], json!("15 items found"));
    assert_eq!(body["data"]["countItems"], json!(15));
    assert_eq!(body["data"]["result"]["perPage"], json!(5));
    assert_eq!(body["data"]["result"]["data"][0]["id"], json!(6));
}

#[tokio::test]
async fn list_applies_json_filters_from_query_string() {
    let filters = r#"[{"name":"published","value":true,"active":true}]"#;
    let uri = format!("/posts?filters={}", urlencoding::encode(filters));
    let response = app().oneshot(get(&uri)).await.unwrap();
    let body = read_json(response).await;
    assert_eq!(body["data"]["countItems"], json!(7));
}

#[tokio::test]
async fn list_applies_bracket_filters_and_includes() {
    let query = serde_urlencoded::to_string([
        ("filters[0][name]", "published"),
        ("filters[0][value]", "true"),
        ("filters[0][active]", "true"),
        ("include[]", "comments"),
    ])
    .unwrap();
    let response = app().oneshot(get(&format!("/posts?{}", query))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["data"]["countItems"], json!(7));
    let first = &body["data"]["result"]["data"][0];
    assert_eq!(first["id"], json!(2));
    assert_eq!(first["comments"][0]["body"], json!("third"));
}

#[tokio::test]
async fn list_rejects_non_integer_per_page() {
    let response = app().oneshot(get("/posts?per_page=many")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(body["error"]["code"], json!("bad_request"));
}

#[tokio::test]
async fn find_rejects_invalid_parameters() {
    let response = app().oneshot(get("/posts/3?page=0")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn ids_route_reports_invalid_parameters_as_unprocessable() {
    let response = app().oneshot(get("/posts/ids?perPage=many")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json(response).await;
    assert_eq!(body["error"]["code"], json!("validation_error"));
}

#[tokio::test]
async fn unknown_resource_is_not_found() {
    let response = app().oneshot(get("/authors")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn ids_route_lists_every_identifier() {
    let response = app().oneshot(get("/posts/ids")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(15));
    assert_eq!(body["meta"]["message"], json!("15 items found"));
}

#[tokio::test]
async fn find_route_returns_one_record_or_404() {
    let response = app().oneshot(get("/posts/3")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["data"]["title"], json!("Post 3"));

    let response = app().oneshot(get("/posts/300")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_action_with_user() {
    let user = CurrentUser(denying(Vec::new()));
    let request = post_action(json!({"type": "delete", "relatedIds": [1, 2], "data": {}}), Some(user));
    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["data"]["delete_count"], json!(2));
}

#[tokio::test]
async fn delete_action_without_user_is_unauthorized() {
    let request = post_action(json!({"type": "delete", "relatedIds": [1], "data": {}}), None);
    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_action_type_is_unprocessable() {
    let request = post_action(json!({"type": "archive", "relatedIds": [1], "data": {}}), None);
    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json(response).await;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["message"], json!("The action type is not valid."));
    assert_eq!(body["errors"]["type"], json!(["The action type is not valid."]));
}

#[tokio::test]
async fn malformed_action_body_is_unprocessable() {
    let request = post_action(json!({"relatedIds": "nope"}), None);
    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json(response).await;
    assert_eq!(body["success"], json!(false));
    assert!(body["errors"]["type"].is_array());
    assert!(body["errors"]["data"].is_array());
}

#[tokio::test]
async fn health_and_resources() {
    let response = app().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let response = app().oneshot(get("/resources")).await.unwrap();
    assert_eq!(read_json(response).await["resources"], json!(["posts"]));
}
