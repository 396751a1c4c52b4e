//! Safe SQL builder: identifiers from field names and store configuration only, values as parameters.

mod builder;
pub mod params;
pub use builder::*;
pub use params::*;
