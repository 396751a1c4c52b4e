//! Which operations a store-backed resource exposes, and who may call them.

use crate::extractors::RequestContext;
use crate::resource::{Action, AuthorizeFn};
use std::fmt;
use std::sync::Arc;

/// Options for [`Resource::from_store`](crate::Resource::from_store).
pub struct Options<T> {
    pub create: bool,
    pub mutate: bool,
    pub delete: bool,
    pub search: bool,
    pub authorize: Option<AuthorizeFn<T>>,
    pub body_limit: Option<usize>,
}

impl<T> Default for Options<T> {
    fn default() -> Self {
        Options {
            create: true,
            mutate: true,
            delete: true,
            search: true,
            authorize: None,
            body_limit: None,
        }
    }
}

impl<T> Options<T> {
    /// GET and filter only.
    pub fn read_only() -> Self {
        Options {
            create: false,
            mutate: false,
            delete: false,
            ..Options::default()
        }
    }

    pub fn authorize<F>(mut self, f: F) -> Self
    where
        F: Fn(&RequestContext, Action, Option<&T>) -> bool + Send + Sync + 'static,
    {
        self.authorize = Some(Arc::new(f));
        self
    }

    pub fn body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = Some(bytes);
        self
    }
}

impl<T> Clone for Options<T> {
    fn clone(&self) -> Self {
        Options {
            create: self.create,
            mutate: self.mutate,
            delete: self.delete,
            search: self.search,
            authorize: self.authorize.clone(),
            body_limit: self.body_limit,
        }
    }
}

impl<T> fmt::Debug for Options<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("create", &self.create)
            .field("mutate", &self.mutate)
            .field("delete", &self.delete)
            .field("search", &self.search)
            .field("authorize", &self.authorize.is_some())
            .field("body_limit", &self.body_limit)
            .finish()
    }
}
