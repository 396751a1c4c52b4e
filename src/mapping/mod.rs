//! Storage ↔ transport field mapping: descriptors, the correspondence map and DTO conversion.

mod convert;
mod field;
mod map;
mod value;

pub use convert::MatchPolicy;
pub use field::{Field, Model};
pub use map::FieldMap;
pub use value::{FieldValue, KeyKind};
