//! CSV listing of a container's entries.

use crate::parser::Container;
use std::io::{self, Write};

/// Write one row per entry.
///
/// Format: index,name,format,mipmaps,data_offset,data_size
pub fn write_listing<W: Write>(container: &Container, mut writer: W) -> io::Result<()> {
    // Header
    writeln!(writer, "index,name,format,mipmaps,data_offset,data_size")?;

    for (i, (descriptor, entry)) in container.iter().enumerate() {
        writeln!(
            writer,
            "{},{},{},{},{},{}",
            i,
            quote(&entry.name),
            descriptor.format,
            descriptor.mipmap_count,
            descriptor.data_offset,
            descriptor.data_size
        )?;
    }

    Ok(())
}

/// Write the listing as a CSV string.
pub fn to_listing_string(container: &Container) -> io::Result<String> {
    let mut buf = Vec::new();
    write_listing(container, &mut buf)?;
    String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn quote(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::fixtures::{build, Fixture};
    use crate::parser::{LayoutVariant, ParseOptions};
    use std::io::Cursor;

    #[test]
    fn test_listing() {
        let bytes = build(
            LayoutVariant::Default,
            &[
                Fixture {
                    name: b"c1000_a",
                    payload: b"AAAA",
                },
                Fixture {
                    name: b"odd,name",
                    payload: b"B",
                },
            ],
        );
        let container = Container::parse(Cursor::new(&bytes), &ParseOptions::default()).unwrap();
        let csv = to_listing_string(&container).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "index,name,format,mipmaps,data_offset,data_size");
        assert_eq!(
            lines[1],
            format!("0,c1000_a,0,1,{},4", container.descriptors[0].data_offset)
        );
        assert!(lines[2].starts_with("1,\"odd,name\",0,1,"));
    }
}
