//! Example consumer: a separate project that exposes an in-memory todo list through rest-scaffold.
//!
//! Run from repo root: `cargo run -p example-consumer`

use axum::Router;
use rest_scaffold::{common_routes, field, resource_routes, Field, MemoryStore, Model, Options, Resource, Settings};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct Todo {
    id: String,
    title: String,
    done: bool,
    notes: Vec<String>,
}

impl Model for Todo {
    fn fields() -> Vec<Field<Self>> {
        vec![
            field!(Todo, id).key(),
            field!(Todo, title),
            field!(Todo, done),
            field!(Todo, notes).child(),
        ]
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("rest_scaffold=info")),
        )
        .init();

    let settings = Settings::from_env()?;
    let store = Arc::new(MemoryStore::<Todo, Todo>::new()?);
    store.insert(Todo {
        id: "welcome".into(),
        title: "Try GET /todos/welcome/notes".into(),
        done: false,
        notes: vec!["created at startup".into()],
    })?;

    let todos = resource_routes(Resource::from_store("todos", store, Options::default()))?;
    let api = if settings.api_prefix.is_empty() {
        todos
    } else {
        Router::new().nest(&settings.api_prefix, todos)
    };
    let app = Router::new().merge(common_routes()).merge(api);

    let listener = TcpListener::bind(settings.bind_addr).await?;
    let port = listener.local_addr()?.port();
    tracing::info!("Example consumer listening on http://{}:{}", settings.bind_addr.ip(), port);
    axum::serve(listener, app).await?;
    Ok(())
}
