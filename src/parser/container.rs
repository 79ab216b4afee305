//! Container layer: entry table traversal and offset resolution.

use super::header::{
    ContainerHeader, EntryDescriptor, LayoutVariant, OffsetField, ParseError,
};
use super::reader::BinaryReader;
use log::{debug, trace, warn};
use std::io::{Read, Seek};

/// How the descriptor layout is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantSelection {
    /// Use this layout regardless of the file contents.
    Fixed(LayoutVariant),
    /// Pick the first layout whose entry table is structurally plausible.
    Auto,
}

impl Default for VariantSelection {
    fn default() -> Self {
        VariantSelection::Fixed(LayoutVariant::Default)
    }
}

/// What to do when an entry fails to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Return the first error; no entries survive.
    #[default]
    Abort,
    /// Stop at the failing entry and keep the ones resolved before it.
    /// The error is stored in [`Container::incomplete`].
    KeepResolved,
}

#[derive(Debug, Clone)]
pub struct ParseOptions {
    pub variant: VariantSelection,
    pub check_signature: bool,
    pub error_policy: ErrorPolicy,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            variant: VariantSelection::default(),
            check_signature: true,
            error_policy: ErrorPolicy::default(),
        }
    }
}

impl ParseOptions {
    pub fn with_variant(mut self, variant: VariantSelection) -> Self {
        self.variant = variant;
        self
    }
}

/// A texture recovered from the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedEntry {
    pub name: String,
    pub payload: Vec<u8>,
}

/// A parsed container.
///
/// `descriptors[i]` and `entries[i]` describe the same texture, in the order
/// the file declares them.
#[derive(Debug)]
pub struct Container {
    pub header: ContainerHeader,
    pub variant: LayoutVariant,
    pub descriptors: Vec<EntryDescriptor>,
    pub entries: Vec<ExtractedEntry>,
    /// Set only under [`ErrorPolicy::KeepResolved`] when an entry failed.
    pub incomplete: Option<ParseError>,
}

impl Container {
    /// Parse a whole container from a seekable source.
    pub fn parse<R: Read + Seek>(source: R, options: &ParseOptions) -> Result<Self, ParseError> {
        let mut reader = BinaryReader::new(source)?;

        let header = ContainerHeader::read(&mut reader)?;
        if options.check_signature {
            header.check_signature()?;
        }
        let count = header.entries()?;

        let variant = match options.variant {
            VariantSelection::Fixed(variant) => variant,
            VariantSelection::Auto => detect_variant(&mut reader, count)?,
        };
        debug!(
            "header: {} entries, version {}, encoding {}, declared size {}, {:?} layout",
            count, header.version, header.encoding, header.declared_size, variant
        );

        // The count is untrusted; don't reserve more than the stream could hold.
        let capacity = count.min((reader.remaining() / variant.descriptor_size()) as usize);
        let mut descriptors = Vec::with_capacity(capacity);
        let mut entries = Vec::with_capacity(capacity);
        let mut incomplete = None;

        for index in 0..count {
            match read_entry(&mut reader, index, variant) {
                Ok((descriptor, entry)) => {
                    descriptors.push(descriptor);
                    entries.push(entry);
                }
                Err(e) => match options.error_policy {
                    ErrorPolicy::Abort => return Err(e),
                    ErrorPolicy::KeepResolved => {
                        warn!("stopping at entry {index}, keeping {} resolved: {e}", entries.len());
                        incomplete = Some(e);
                        break;
                    }
                },
            }
        }

        Ok(Self {
            header,
            variant,
            descriptors,
            entries,
            incomplete,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries paired with their descriptors, in file order.
    pub fn iter(&self) -> impl Iterator<Item = (&EntryDescriptor, &ExtractedEntry)> {
        self.descriptors.iter().zip(&self.entries)
    }

    /// Find an entry by name.
    pub fn find(&self, name: &str) -> Option<&ExtractedEntry> {
        self.entries.iter().find(|e| e.name == name)
    }
}

/// Read the descriptor at the cursor and follow its offsets.
///
/// The cursor ends up just past the descriptor, whatever was resolved.
fn read_entry<R: Read + Seek>(
    reader: &mut BinaryReader<R>,
    index: usize,
    variant: LayoutVariant,
) -> Result<(EntryDescriptor, ExtractedEntry), ParseError> {
    let descriptor = EntryDescriptor::read(reader, variant)?;
    trace!("entry {index}: {descriptor:?}");

    if descriptor.name_offset <= 0 {
        return Err(ParseError::BadOffset {
            field: OffsetField::Name,
            index,
            offset: descriptor.name_offset,
        });
    }
    let name = reader.read_string_at(descriptor.name_offset as u64)?;

    if descriptor.data_offset <= 0 {
        return Err(ParseError::BadOffset {
            field: OffsetField::Data,
            index,
            offset: descriptor.data_offset,
        });
    }
    let size = usize::try_from(descriptor.data_size).map_err(|_| ParseError::BadSize {
        index,
        size: descriptor.data_size,
    })?;
    let payload = reader.read_bytes_at(descriptor.data_offset as u64, size)?;

    Ok((descriptor, ExtractedEntry { name, payload }))
}

/// Guess the descriptor layout from the shape of the entry table.
///
/// A layout is plausible when every descriptor read with its stride points
/// past the end of the table it implies, and every payload ends inside the
/// stream. Default is tried before Bloodborne. When neither fits, Default is
/// returned so the real parse reports what is wrong.
fn detect_variant<R: Read + Seek>(
    reader: &mut BinaryReader<R>,
    count: usize,
) -> Result<LayoutVariant, ParseError> {
    for variant in [LayoutVariant::Default, LayoutVariant::Bloodborne] {
        if is_plausible(reader, count, variant)? {
            debug!("detected {variant:?} layout");
            return Ok(variant);
        }
    }
    debug!("no layout fits the entry table, falling back to default");
    Ok(LayoutVariant::Default)
}

fn is_plausible<R: Read + Seek>(
    reader: &mut BinaryReader<R>,
    count: usize,
    variant: LayoutVariant,
) -> Result<bool, ParseError> {
    let len = reader.len() as i64;
    let table_end = ContainerHeader::SIZE as i64 + count as i64 * variant.descriptor_size() as i64;
    if table_end > len {
        return Ok(false);
    }

    reader.resolve(ContainerHeader::SIZE, |r| {
        for _ in 0..count {
            let d = EntryDescriptor::read(r, variant)?;
            let name = d.name_offset as i64;
            let data = d.data_offset as i64;
            let size = d.data_size as i64;
            if name < table_end || name >= len || data < table_end || size < 0 || data + size > len
            {
                return Ok(false);
            }
        }
        Ok(true)
    })
}
