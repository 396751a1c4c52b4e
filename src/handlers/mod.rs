//! HTTP handlers for resource operations.

pub mod resource;
