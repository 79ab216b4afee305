//! Header and descriptor structures for the TPF container format.

use super::reader::BinaryReader;
use serde::Serialize;
use std::fmt;
use std::io::{Read, Seek};
use thiserror::Error;

/// Errors that can occur during parsing.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Bad signature: expected {expected:?}, got {actual:?}")]
    BadSignature { expected: [u8; 4], actual: [u8; 4] },

    #[error("Bad {field} value {offset} in entry {index}")]
    BadOffset {
        field: OffsetField,
        index: usize,
        offset: i32,
    },

    #[error("Bad data size {size} in entry {index}")]
    BadSize { index: usize, size: i32 },

    #[error("Bad entry count: {0}")]
    BadEntryCount(i32),

    #[error("Truncated input: needed {needed} bytes at offset {offset}, {available} available")]
    TruncatedInput {
        offset: u64,
        needed: u64,
        available: u64,
    },

    #[error("Offset {offset} out of range for a stream of {size} bytes")]
    OutOfRange { offset: u64, size: u64 },

    #[error("Name bytes are not valid Shift-JIS: {bytes:02X?}")]
    TextDecodeError { bytes: Vec<u8> },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Which descriptor offset a [`ParseError::BadOffset`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetField {
    Name,
    Data,
}

impl fmt::Display for OffsetField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OffsetField::Name => f.write_str("name offset"),
            OffsetField::Data => f.write_str("data offset"),
        }
    }
}

/// Descriptor layout of the entry table.
///
/// The layout differs between titles and is not recorded in the file, so the
/// caller picks it (or asks for detection, see `VariantSelection::Auto`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutVariant {
    /// Dark Souls 3 and most other titles: 20-byte descriptors.
    #[default]
    Default,
    /// Bloodborne: 36-byte descriptors with explicit dimensions.
    Bloodborne,
}

impl LayoutVariant {
    /// Size of one descriptor in the entry table.
    pub const fn descriptor_size(self) -> u64 {
        match self {
            LayoutVariant::Default => 20,
            LayoutVariant::Bloodborne => 36,
        }
    }
}

/// Container header (16 bytes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHeader {
    pub signature: [u8; 4],
    /// Informational only; never used for bounds checks.
    pub declared_size: i32,
    pub entry_count: i32,
    pub version: u8,
    pub flag2: u8,
    pub encoding: u8,
    pub flag3: u8,
}

impl ContainerHeader {
    pub const MAGIC: [u8; 4] = *b"TPF\0";
    pub const SIZE: u64 = 16;

    /// Read the header from the current reader position.
    pub fn read<R: Read + Seek>(reader: &mut BinaryReader<R>) -> Result<Self, ParseError> {
        let mut signature = [0u8; 4];
        signature.copy_from_slice(&reader.read_bytes(4)?);

        Ok(Self {
            signature,
            declared_size: reader.read_i32_le()?,
            entry_count: reader.read_i32_le()?,
            version: reader.read_u8()?,
            flag2: reader.read_u8()?,
            encoding: reader.read_u8()?,
            flag3: reader.read_u8()?,
        })
    }

    pub fn check_signature(&self) -> Result<(), ParseError> {
        if self.signature != Self::MAGIC {
            return Err(ParseError::BadSignature {
                expected: Self::MAGIC,
                actual: self.signature,
            });
        }
        Ok(())
    }

    /// Entry count as a usize, rejecting negative values.
    pub fn entries(&self) -> Result<usize, ParseError> {
        usize::try_from(self.entry_count).map_err(|_| ParseError::BadEntryCount(self.entry_count))
    }
}

/// Trailing part of a descriptor, after the fields shared by both layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorTail {
    Default {
        reserved: u32,
    },
    Bloodborne {
        width: u16,
        height: u16,
        dxgi_format: u32,
    },
}

/// One entry of the entry table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDescriptor {
    pub data_offset: i32,
    pub data_size: i32,
    pub format: u8,
    pub is_cube_map: u8,
    pub mipmap_count: u8,
    pub flags: u8,
    pub name_offset: i32,
    pub tail: DescriptorTail,
}

impl EntryDescriptor {
    /// Read one descriptor laid out as `variant` from the current position.
    pub fn read<R: Read + Seek>(
        reader: &mut BinaryReader<R>,
        variant: LayoutVariant,
    ) -> Result<Self, ParseError> {
        let data_offset = reader.read_i32_le()?;
        let data_size = reader.read_i32_le()?;
        let format = reader.read_u8()?;
        let is_cube_map = reader.read_u8()?;
        let mipmap_count = reader.read_u8()?;
        let flags = reader.read_u8()?;

        let (name_offset, tail) = match variant {
            LayoutVariant::Bloodborne => {
                let width = reader.read_u16_le()?;
                let height = reader.read_u16_le()?;
                reader.read_u32_le()?;
                reader.read_u32_le()?;
                let name_offset = reader.read_i32_le()?;
                reader.read_u32_le()?;
                let dxgi_format = reader.read_u32_le()?;
                (
                    name_offset,
                    DescriptorTail::Bloodborne {
                        width,
                        height,
                        dxgi_format,
                    },
                )
            }
            LayoutVariant::Default => {
                let name_offset = reader.read_i32_le()?;
                let reserved = reader.read_u32_le()?;
                (name_offset, DescriptorTail::Default { reserved })
            }
        };

        Ok(Self {
            data_offset,
            data_size,
            format,
            is_cube_map,
            mipmap_count,
            flags,
            name_offset,
            tail,
        })
    }

    pub fn is_cube_map(&self) -> bool {
        self.is_cube_map != 0
    }

    /// Width and height, only recorded by the Bloodborne layout.
    pub fn dimensions(&self) -> Option<(u16, u16)> {
        match self.tail {
            DescriptorTail::Bloodborne { width, height, .. } => Some((width, height)),
            DescriptorTail::Default { .. } => None,
        }
    }

    pub fn dxgi_format(&self) -> Option<u32> {
        match self.tail {
            DescriptorTail::Bloodborne { dxgi_format, .. } => Some(dxgi_format),
            DescriptorTail::Default { .. } => None,
        }
    }
}
