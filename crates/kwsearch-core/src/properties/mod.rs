//! Text format of a settings file.

pub mod codec;

pub use codec::{parse_properties, write_properties, PropertiesError};
