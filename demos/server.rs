//! Demo server. With DATABASE_URL set, serves every entity in CONFIG_PATH/entities.json from
//! PostgreSQL; otherwise serves in-memory `posts` and `comments`. An `X-User-Id` header stands in
//! for authentication: that user may delete only their own records.

use axum::{extract::Request, middleware::Next, response::Response, Router};
use resource_kit::storage::IncludeDirection;
use resource_kit::{
    common_routes, load_from_path, resolve, resource_routes, AppState, ContainsFilter, CurrentUser, DeleteAction,
    KeywordColumns, ListSettings, MemoryCollection, Principal, Record, Resource, ResourceRegistry,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tracing_subscriber::EnvFilter;

struct HeaderUser {
    id: String,
}

impl Principal for HeaderUser {
    fn can(&self, _ability: &str, record: &Record) -> bool {
        match record.get("user_id") {
            Some(Value::String(s)) => *s == self.id,
            Some(Value::Number(n)) => n.to_string() == self.id,
            _ => false,
        }
    }
}

async fn header_auth(mut req: Request, next: Next) -> Response {
    let user = req
        .headers()
        .get("X-User-Id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    if let Some(id) = user {
        req.extensions_mut().insert(CurrentUser(Arc::new(HeaderUser { id })));
    }
    next.run(req).await
}

fn memory_registry() -> ResourceRegistry {
    let comments = Arc::new(MemoryCollection::new("comments").with_belongs_to("post", "post_id").with_records(vec![
        json!({"id": 1, "post_id": 1, "user_id": 2, "body": "First!"}),
        json!({"id": 2, "post_id": 1, "user_id": 1, "body": "Thanks"}),
        json!({"id": 3, "post_id": 2, "user_id": 2, "body": "Nice write-up"}),
    ]));
    let posts = (1..=25)
        .map(|i| json!({"id": i, "user_id": 1 + i % 2, "title": format!("Post {}", i), "published": i % 3 != 0}))
        .collect();
    let posts = MemoryCollection::new("posts")
        .with_records(posts)
        .with_relation("comments", IncludeDirection::ToMany, comments.clone(), "id", "post_id");

    ResourceRegistry::new()
        .register(
            "posts",
            Resource::new(Arc::new(posts))
                .with_list_settings(ListSettings {
                    available_filter_columns: Some(vec!["published".into(), "user_id".into()]),
                    available_includes: Some(vec!["comments".into()]),
                    max_per_page: Some(50),
                    ..ListSettings::default()
                })
                .with_custom_filter(ContainsFilter::new("title_contains", "title").case_insensitive())
                .with_keyword_filter(KeywordColumns::new(["title"]))
                .with_action_type("delete", DeleteAction),
        )
        .register(
            "comments",
            Resource::new(comments)
                .with_list_settings(ListSettings {
                    available_scopes: Some(vec!["post".into()]),
                    ..ListSettings::default()
                })
                .with_action_type("delete", DeleteAction),
        )
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("resource_kit=info".parse()?))
        .init();

    let registry = match std::env::var("DATABASE_URL") {
        Ok(database_url) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(5)
                .connect(&database_url)
                .await?;
            let config_path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "sample".into());
            let model = resolve(&load_from_path(&config_path).await?)?;
            ResourceRegistry::from_model(&pool, &model)?
        }
        Err(_) => memory_registry(),
    };
    let state = AppState::new(registry);

    let app = Router::new()
        .merge(common_routes(state.clone()))
        .nest("/api/v1", resource_routes(state))
        .layer(
            ServiceBuilder::new()
                .layer(RequestBodyLimitLayer::new(1024 * 1024))
                .map_request(|req: axum::http::Request<_>| req.map(axum::body::Body::new))
                .layer(axum::middleware::from_fn(header_auth)),
        );

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
