//! Resource handlers: locate, authorize, decode, execute, respond.

use crate::error::{AppError, StoreError};
use crate::extractors::RequestContext;
use crate::resource::{Action, Resource};
use crate::response::{deleted, ok_many, ok_one};
use axum::{
    body::Bytes,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;

type ResourceState<T, D> = State<Arc<Resource<T, D>>>;

fn failed<T, D>(res: &Resource<T, D>, op: &'static str, err: StoreError) -> AppError {
    match &err {
        StoreError::KeyMismatch { .. } => tracing::warn!(path = %res.path, op, error = %err, "rejected edit"),
        _ => tracing::error!(path = %res.path, op, error = %err, "operation failed"),
    }
    AppError::Operation(err)
}

fn decode<D: DeserializeOwned>(path: &str, body: &Bytes) -> Result<D, AppError> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::warn!(path = %path, error = %e, "malformed body");
        AppError::MalformedBody(e.to_string())
    })
}

/// Finds the item and authorizes `action` on it. Authorization runs before absence is revealed.
async fn locate<T, D>(
    res: &Resource<T, D>,
    ctx: &RequestContext,
    id: String,
    action: Action,
) -> Result<T, AppError>
where
    T: Send + Sync + 'static,
{
    match (res.find)(id.clone()).await {
        Ok(Some(item)) => {
            res.check(ctx, action, Some(&item))?;
            Ok(item)
        }
        Ok(None) | Err(StoreError::KeyFormat(_)) => {
            res.check(ctx, action, None)?;
            Err(AppError::NotFound(id))
        }
        Err(e) => {
            res.check(ctx, action, None)?;
            Err(failed(res, "find", e))
        }
    }
}

pub async fn list<T, D>(
    State(res): ResourceState<T, D>,
    ctx: RequestContext,
) -> Result<impl IntoResponse, AppError>
where
    T: Send + Sync + 'static,
    D: Serialize + Send + Sync + 'static,
{
    res.check(&ctx, Action::GetAll, None)?;
    let items = (res.find_all)().await.map_err(|e| failed(&res, "find all", e))?;
    Ok(ok_many(items.iter().map(|i| (res.dto)(i)).collect()))
}

pub async fn filter<T, D>(
    State(res): ResourceState<T, D>,
    ctx: RequestContext,
    body: Bytes,
) -> Result<impl IntoResponse, AppError>
where
    T: Send + Sync + 'static,
    D: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    let Some(search) = res.search.clone() else {
        return Err(AppError::MethodNotAllowed);
    };
    res.check(&ctx, Action::Search, None)?;
    let template: D = decode(&res.path, &body)?;
    let items = search(template).await.map_err(|e| failed(&res, "search", e))?;
    Ok(ok_many(items.iter().map(|i| (res.dto)(i)).collect()))
}

pub async fn read<T, D>(
    State(res): ResourceState<T, D>,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError>
where
    T: Send + Sync + 'static,
    D: Serialize + Send + Sync + 'static,
{
    let item = locate(&res, &ctx, id, Action::GetOne).await?;
    Ok(ok_one((res.dto)(&item)))
}

/// Lists the child collection at position `index` of the item.
pub async fn child_list<T, D>(
    State(res): ResourceState<T, D>,
    ctx: RequestContext,
    Path(id): Path<String>,
    index: usize,
) -> Result<impl IntoResponse, AppError>
where
    T: Send + Sync + 'static,
    D: Send + Sync + 'static,
{
    let item = locate(&res, &ctx, id, Action::GetOne).await?;
    let child = res
        .children
        .get(index)
        .ok_or_else(|| AppError::NotFound(format!("child collection {}", index)))?;
    Ok(ok_many((child.get)(&item)))
}

pub async fn update<T, D>(
    State(res): ResourceState<T, D>,
    ctx: RequestContext,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError>
where
    T: Send + Sync + 'static,
    D: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    let Some(mutate) = res.mutate.clone() else {
        return Err(AppError::MethodNotAllowed);
    };
    let item = locate(&res, &ctx, id, Action::Mutate).await?;
    let edit: D = decode(&res.path, &body)?;
    let updated = mutate(item, edit).await.map_err(|e| failed(&res, "mutate", e))?;
    Ok(ok_one((res.dto)(&updated)))
}

pub async fn create<T, D>(
    State(res): ResourceState<T, D>,
    ctx: RequestContext,
    body: Bytes,
) -> Result<impl IntoResponse, AppError>
where
    T: Send + Sync + 'static,
    D: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    let Some(create) = res.create.clone() else {
        return Err(AppError::MethodNotAllowed);
    };
    res.check(&ctx, Action::Create, None)?;
    let edit: D = decode(&res.path, &body)?;
    let created = create(edit).await.map_err(|e| failed(&res, "create", e))?;
    Ok(ok_one((res.dto)(&created)))
}

pub async fn delete_one<T, D>(
    State(res): ResourceState<T, D>,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError>
where
    T: Send + Sync + 'static,
    D: Send + Sync + 'static,
{
    let Some(delete) = res.delete.clone() else {
        return Err(AppError::MethodNotAllowed);
    };
    let item = locate(&res, &ctx, id, Action::Delete).await?;
    delete(item).await.map_err(|e| failed(&res, "delete", e))?;
    Ok(deleted())
}
