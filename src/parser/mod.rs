//! Binary parser for the TPF texture container.

mod container;
mod header;
mod reader;

pub use container::*;
pub use header::*;
pub use reader::*;

#[cfg(test)]
pub(crate) use container::tests as fixtures;
