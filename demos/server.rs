//! Example server: an employees API over PostgreSQL.
//!
//! `DATABASE_URL=postgres://localhost/scaffold cargo run --example server`

use axum::Router;
use rest_scaffold::{
    common_routes_with_ready, field, resource_routes, Action, Field, Model, Options, PgStore, Resource, Settings,
};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct Employee {
    employee_no: i64,
    name: String,
    department: String,
    salary: i64,
    skills: Vec<String>,
}

impl Model for Employee {
    fn fields() -> Vec<Field<Self>> {
        vec![
            field!(Employee, employee_no).key(),
            field!(Employee, name),
            field!(Employee, department),
            field!(Employee, salary),
            field!(Employee, skills).child(),
        ]
    }
}

/// Public view: salary stays server-side. Skills are served at `/employees/:id/skills`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct EmployeeDto {
    employee_no: i64,
    name: String,
    department: String,
}

impl Model for EmployeeDto {
    fn fields() -> Vec<Field<Self>> {
        vec![
            field!(EmployeeDto, employee_no),
            field!(EmployeeDto, name),
            field!(EmployeeDto, department),
        ]
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("rest_scaffold=info".parse()?))
        .init();

    let settings = Settings::from_env()?;
    let database_url = settings
        .database_url
        .clone()
        .unwrap_or_else(|| "postgres://localhost/scaffold".into());
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .connect(&database_url)
        .await?;

    let store = PgStore::<Employee, EmployeeDto>::builder(pool.clone(), "employees")
        .soft_delete("deleted_at")
        .build()?;
    store.ensure_table().await?;

    // Only requests carrying a bearer token may write.
    let options = Options::default()
        .body_limit(settings.body_limit)
        .authorize(|ctx, action, _: Option<&Employee>| {
            ctx.bearer_token().is_some()
                || matches!(action, Action::GetAll | Action::GetOne | Action::Search)
        });
    let employees = resource_routes(Resource::from_store("employees", Arc::new(store), options))?;

    let api = if settings.api_prefix.is_empty() {
        Router::new().merge(employees)
    } else {
        Router::new().nest(&settings.api_prefix, employees)
    };
    let app = Router::new()
        .merge(common_routes_with_ready(pool))
        .merge(api);

    let listener = TcpListener::bind(settings.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
