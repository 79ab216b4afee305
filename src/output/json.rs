//! JSON manifest describing a container and its entries.

use super::dds::dds_file_name;
use crate::parser::{Container, LayoutVariant};
use crate::tpf::TpfFile;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
pub struct Manifest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub signature: String,
    pub declared_size: i32,
    pub entry_count: i32,
    pub version: u8,
    pub flag2: u8,
    pub encoding: u8,
    pub flag3: u8,
    pub layout: LayoutVariant,
    pub entries: Vec<ManifestEntry<'a>>,
    /// Why parsing stopped early, when partial results were kept.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incomplete: Option<String>,
}

#[derive(Serialize)]
pub struct ManifestEntry<'a> {
    pub index: usize,
    pub name: &'a str,
    /// Output file name, absent when the name can't be used on disk.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub data_offset: i32,
    pub data_size: i32,
    pub name_offset: i32,
    pub format: u8,
    pub is_cube_map: bool,
    pub mipmap_count: u8,
    pub flags: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dxgi_format: Option<u32>,
}

impl<'a> Manifest<'a> {
    pub fn new(container: &'a Container) -> Self {
        let header = &container.header;
        let entries = container
            .iter()
            .enumerate()
            .map(|(index, (descriptor, entry))| {
                let (width, height) = descriptor.dimensions().unzip();
                ManifestEntry {
                    index,
                    name: &entry.name,
                    file: dds_file_name(&entry.name).ok(),
                    data_offset: descriptor.data_offset,
                    data_size: descriptor.data_size,
                    name_offset: descriptor.name_offset,
                    format: descriptor.format,
                    is_cube_map: descriptor.is_cube_map(),
                    mipmap_count: descriptor.mipmap_count,
                    flags: descriptor.flags,
                    width,
                    height,
                    dxgi_format: descriptor.dxgi_format(),
                }
            })
            .collect();

        Self {
            source: None,
            signature: String::from_utf8_lossy(&header.signature)
                .trim_end_matches('\0')
                .to_string(),
            declared_size: header.declared_size,
            entry_count: header.entry_count,
            version: header.version,
            flag2: header.flag2,
            encoding: header.encoding,
            flag3: header.flag3,
            layout: container.variant,
            entries,
            incomplete: container.incomplete.as_ref().map(|e| e.to_string()),
        }
    }

    pub fn from_tpf(tpf: &'a TpfFile) -> Self {
        let mut manifest = Self::new(&tpf.container);
        manifest.source = tpf.source.as_ref().map(|p| p.display().to_string());
        manifest
    }
}

/// Write a TpfFile manifest as JSON to a writer.
pub fn write_manifest<W: Write>(
    tpf: &TpfFile,
    writer: W,
    pretty: bool,
) -> Result<(), serde_json::Error> {
    let manifest = Manifest::from_tpf(tpf);

    if pretty {
        serde_json::to_writer_pretty(writer, &manifest)
    } else {
        serde_json::to_writer(writer, &manifest)
    }
}

/// Write a TpfFile manifest as a JSON string.
pub fn to_manifest_string(tpf: &TpfFile, pretty: bool) -> Result<String, serde_json::Error> {
    let manifest = Manifest::from_tpf(tpf);

    if pretty {
        serde_json::to_string_pretty(&manifest)
    } else {
        serde_json::to_string(&manifest)
    }
}
