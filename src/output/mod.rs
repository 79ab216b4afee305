//! Output writers for extracted textures.

mod csv;
mod dds;
mod json;

pub use self::csv::*;
pub use self::dds::*;
pub use self::json::*;
