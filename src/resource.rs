//! Resource definition: the callbacks and authorization policy behind one exposed path.

use crate::config::Options;
use crate::error::{AppError, StoreError};
use crate::extractors::RequestContext;
use crate::store::Store;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

pub(crate) type FindFn<T> = Arc<dyn Fn(String) -> BoxFuture<Result<Option<T>, StoreError>> + Send + Sync>;
pub(crate) type FindAllFn<T> = Arc<dyn Fn() -> BoxFuture<Result<Vec<T>, StoreError>> + Send + Sync>;
pub(crate) type SearchFn<T, D> = Arc<dyn Fn(D) -> BoxFuture<Result<Vec<T>, StoreError>> + Send + Sync>;
pub(crate) type MutateFn<T, D> = Arc<dyn Fn(T, D) -> BoxFuture<Result<T, StoreError>> + Send + Sync>;
pub(crate) type CreateFn<T, D> = Arc<dyn Fn(D) -> BoxFuture<Result<T, StoreError>> + Send + Sync>;
pub(crate) type DeleteFn<T> = Arc<dyn Fn(T) -> BoxFuture<Result<T, StoreError>> + Send + Sync>;
pub(crate) type DtoFn<T, D> = Arc<dyn Fn(&T) -> D + Send + Sync>;

/// Authorization callback. The entity is `None` for aggregate operations and when the item was not found.
pub type AuthorizeFn<T> = Arc<dyn Fn(&RequestContext, Action, Option<&T>) -> bool + Send + Sync>;

/// Operation being authorized.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    GetAll,
    /// Reading one item or one of its child collections.
    GetOne,
    Search,
    Mutate,
    Create,
    Delete,
}

/// Read-only sub-collection served at `/:id/<path>`.
#[derive(Clone)]
pub struct ChildCollection<T> {
    pub(crate) path: String,
    pub(crate) get: Arc<dyn Fn(&T) -> Vec<Value> + Send + Sync>,
}

impl<T> ChildCollection<T> {
    pub fn new<F>(path: impl Into<String>, get: F) -> Self
    where
        F: Fn(&T) -> Vec<Value> + Send + Sync + 'static,
    {
        ChildCollection {
            path: path.into(),
            get: Arc::new(get),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// One exposed REST resource. `T` is the storage type, `D` the transport (JSON) type.
///
/// Find, FindAll and the DTO projector are required; every other callback is optional and its HTTP verb
/// is only installed when present. Immutable once handed to [`resource_routes`](crate::resource_routes).
pub struct Resource<T, D> {
    pub(crate) path: String,
    pub(crate) find: FindFn<T>,
    pub(crate) find_all: FindAllFn<T>,
    pub(crate) search: Option<SearchFn<T, D>>,
    pub(crate) mutate: Option<MutateFn<T, D>>,
    pub(crate) create: Option<CreateFn<T, D>>,
    pub(crate) delete: Option<DeleteFn<T>>,
    pub(crate) children: Vec<ChildCollection<T>>,
    pub(crate) dto: DtoFn<T, D>,
    pub(crate) authorize: Option<AuthorizeFn<T>>,
    pub(crate) body_limit: Option<usize>,
}

impl<T, D> Resource<T, D>
where
    T: Send + Sync + 'static,
    D: Send + Sync + 'static,
{
    pub fn new<F, FFut, A, AFut, P>(path: impl Into<String>, find: F, find_all: A, dto: P) -> Self
    where
        F: Fn(String) -> FFut + Send + Sync + 'static,
        FFut: Future<Output = Result<Option<T>, StoreError>> + Send + 'static,
        A: Fn() -> AFut + Send + Sync + 'static,
        AFut: Future<Output = Result<Vec<T>, StoreError>> + Send + 'static,
        P: Fn(&T) -> D + Send + Sync + 'static,
    {
        Resource {
            path: path.into(),
            find: Arc::new(move |key: String| -> BoxFuture<Result<Option<T>, StoreError>> {
                Box::pin(find(key))
            }),
            find_all: Arc::new(move || -> BoxFuture<Result<Vec<T>, StoreError>> { Box::pin(find_all()) }),
            search: None,
            mutate: None,
            create: None,
            delete: None,
            children: Vec::new(),
            dto: Arc::new(dto),
            authorize: None,
            body_limit: None,
        }
    }

    /// Enables `POST /filter`; the decoded DTO is the filter template.
    pub fn search<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(D) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<T>, StoreError>> + Send + 'static,
    {
        self.search = Some(Arc::new(move |filter: D| -> BoxFuture<Result<Vec<T>, StoreError>> {
            Box::pin(f(filter))
        }));
        self
    }

    /// Enables `PUT /:id`, and together with [`create`](Self::create) `POST /`.
    pub fn mutate<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(T, D) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, StoreError>> + Send + 'static,
    {
        self.mutate = Some(Arc::new(move |item: T, edit: D| -> BoxFuture<Result<T, StoreError>> {
            Box::pin(f(item, edit))
        }));
        self
    }

    pub fn create<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(D) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, StoreError>> + Send + 'static,
    {
        self.create = Some(Arc::new(move |edit: D| -> BoxFuture<Result<T, StoreError>> {
            Box::pin(f(edit))
        }));
        self
    }

    pub fn delete<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, StoreError>> + Send + 'static,
    {
        self.delete = Some(Arc::new(move |item: T| -> BoxFuture<Result<T, StoreError>> {
            Box::pin(f(item))
        }));
        self
    }

    pub fn child<F>(mut self, path: impl Into<String>, get: F) -> Self
    where
        F: Fn(&T) -> Vec<Value> + Send + Sync + 'static,
    {
        self.children.push(ChildCollection::new(path, get));
        self
    }

    pub fn authorize<F>(mut self, f: F) -> Self
    where
        F: Fn(&RequestContext, Action, Option<&T>) -> bool + Send + Sync + 'static,
    {
        self.authorize = Some(Arc::new(f));
        self
    }

    /// Rejects request bodies larger than `bytes` with 413.
    pub fn body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = Some(bytes);
        self
    }

    /// Wires every operation of `store` into a resource, minus whatever `options` disables.
    pub fn from_store<S>(path: impl Into<String>, store: Arc<S>, options: Options<T>) -> Self
    where
        S: Store<T, D>,
    {
        let s = Arc::clone(&store);
        let find = move |key: String| {
            let s = Arc::clone(&s);
            async move { <S as Store<T, D>>::find(&*s, &key).await }
        };
        let s = Arc::clone(&store);
        let find_all = move || {
            let s = Arc::clone(&s);
            async move { <S as Store<T, D>>::find_all(&*s).await }
        };
        let s = Arc::clone(&store);
        let dto = move |item: &T| <S as Store<T, D>>::to_transport(&*s, item);
        let mut resource = Resource::new(path, find, find_all, dto);

        if options.search {
            let s = Arc::clone(&store);
            resource = resource.search(move |filter: D| {
                let s = Arc::clone(&s);
                async move { <S as Store<T, D>>::search(&*s, &filter).await }
            });
        }
        if options.mutate {
            let s = Arc::clone(&store);
            resource = resource.mutate(move |item: T, edit: D| {
                let s = Arc::clone(&s);
                async move { <S as Store<T, D>>::mutate(&*s, item, edit).await }
            });
        }
        if options.create {
            let s = Arc::clone(&store);
            resource = resource.create(move |edit: D| {
                let s = Arc::clone(&s);
                async move { <S as Store<T, D>>::create(&*s, edit).await }
            });
        }
        if options.delete {
            let s = Arc::clone(&store);
            resource = resource.delete(move |item: T| {
                let s = Arc::clone(&s);
                async move { <S as Store<T, D>>::delete(&*s, item).await }
            });
        }
        resource.children = <S as Store<T, D>>::children(&*store);
        resource.authorize = options.authorize;
        resource.body_limit = options.body_limit;
        resource
    }
}

impl<T, D> Resource<T, D> {
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Runs the authorizer, if any. Absence means always allowed.
    pub(crate) fn check(
        &self,
        ctx: &RequestContext,
        action: Action,
        item: Option<&T>,
    ) -> Result<(), AppError> {
        match &self.authorize {
            Some(allow) if !allow(ctx, action, item) => {
                tracing::debug!(path = %self.path, ?action, found = item.is_some(), "access denied");
                Err(AppError::Unauthorized)
            }
            _ => Ok(()),
        }
    }
}

impl<T, D> fmt::Debug for Resource<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("path", &self.path)
            .field("search", &self.search.is_some())
            .field("mutate", &self.mutate.is_some())
            .field("create", &self.create.is_some())
            .field("delete", &self.delete.is_some())
            .field(
                "children",
                &self.children.iter().map(|c| c.path.as_str()).collect::<Vec<_>>(),
            )
            .field("authorize", &self.authorize.is_some())
            .finish()
    }
}
