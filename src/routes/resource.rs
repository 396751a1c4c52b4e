//! Installs the routes of one resource under `/<path>`.

use crate::error::ConfigError;
use crate::extractors::RequestContext;
use crate::handlers::resource::{child_list, create, delete_one, filter, list, read, update};
use crate::resource::Resource;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, State},
    routing::{get, post, MethodRouter},
    Router,
};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;

/// Path segments must be non-empty and URL-safe (unreserved characters only).
fn check_segment(segment: &str) -> Result<(), ConfigError> {
    let ok = !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~'));
    if ok {
        Ok(())
    } else {
        Err(ConfigError::InvalidPath(segment.to_string()))
    }
}

const FILTER: &str = "filter";

/// `POST /<path>/filter` searches. The static segment shadows `/:id` for an item keyed `filter`, so the item
/// verbs are served here too.
fn filter_route<T, D>(resource: &Resource<T, D>) -> MethodRouter<Arc<Resource<T, D>>>
where
    T: Send + Sync + 'static,
    D: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    let reserved = || Path(FILTER.to_string());
    let mut route = post(filter::<T, D>).get(move |state: State<Arc<Resource<T, D>>>, ctx: RequestContext| {
        read(state, ctx, reserved())
    });
    if resource.mutate.is_some() {
        route = route.put(
            move |state: State<Arc<Resource<T, D>>>, ctx: RequestContext, body: Bytes| {
                update(state, ctx, reserved(), body)
            },
        );
    }
    if resource.delete.is_some() {
        route = route.delete(move |state: State<Arc<Resource<T, D>>>, ctx: RequestContext| {
            delete_one(state, ctx, reserved())
        });
    }
    route
}

/// Router for one resource. Verbs whose callbacks are absent are not installed, so they answer 405.
///
/// | Method | Path | Installed when |
/// |---|---|---|
/// | GET | `/<path>` | always |
/// | POST | `/<path>/filter` | search (also answers the item verbs for key `filter`) |
/// | GET | `/<path>/:id/<child>` | per child |
/// | GET | `/<path>/:id` | always |
/// | PUT | `/<path>/:id` | mutate |
/// | POST | `/<path>` | mutate and create |
/// | DELETE | `/<path>/:id` | delete |
pub fn resource_routes<T, D>(resource: Resource<T, D>) -> Result<Router, ConfigError>
where
    T: Send + Sync + 'static,
    D: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    let path = resource.path.trim_matches('/').to_string();
    check_segment(&path)?;
    let mut seen = HashSet::new();
    for child in &resource.children {
        check_segment(&child.path)?;
        if child.path == FILTER || !seen.insert(child.path.as_str()) {
            return Err(ConfigError::DuplicatePath(child.path.clone()));
        }
    }

    tracing::info!(
        path = %path,
        search = resource.search.is_some(),
        mutate = resource.mutate.is_some(),
        create = resource.create.is_some() && resource.mutate.is_some(),
        delete = resource.delete.is_some(),
        children = resource.children.len(),
        "registering resource"
    );

    let base = format!("/{}", path);
    let mut collection: MethodRouter<Arc<Resource<T, D>>> = get(list::<T, D>);
    if resource.create.is_some() && resource.mutate.is_some() {
        collection = collection.post(create::<T, D>);
    }
    let mut item: MethodRouter<Arc<Resource<T, D>>> = get(read::<T, D>);
    if resource.mutate.is_some() {
        item = item.put(update::<T, D>);
    }
    if resource.delete.is_some() {
        item = item.delete(delete_one::<T, D>);
    }

    let mut router: Router<Arc<Resource<T, D>>> = Router::new()
        .route(&base, collection.clone())
        .route(&format!("{}/", base), collection);
    if resource.search.is_some() {
        router = router.route(&format!("{}/{}", base, FILTER), filter_route(&resource));
    }
    for (index, child) in resource.children.iter().enumerate() {
        router = router.route(
            &format!("{}/:id/{}", base, child.path),
            get(
                move |state: State<Arc<Resource<T, D>>>, ctx: RequestContext, id: Path<String>| {
                    child_list(state, ctx, id, index)
                },
            ),
        );
    }
    router = router.route(&format!("{}/:id", base), item);

    let body_limit = resource.body_limit;
    let router = router.with_state(Arc::new(resource));
    Ok(match body_limit {
        Some(bytes) => router
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(bytes)),
        None => router,
    })
}
