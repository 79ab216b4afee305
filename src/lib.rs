//! TPF Unpacker Library
//!
//! Parses FromSoftware .tpf texture containers and extracts the DDS textures
//! they bundle.

pub mod convert;
pub mod output;
pub mod parser;
pub mod tpf;

pub use convert::{ConvertOptions, Converter, Texconv};
pub use parser::{Container, ExtractedEntry, LayoutVariant, ParseError, ParseOptions};
pub use tpf::TpfFile;
