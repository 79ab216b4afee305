use std::fs;
use std::path::Path;
use tpf_unpacker::output::{write_dds_files, write_manifest};
use tpf_unpacker::parser::{ErrorPolicy, OffsetField, VariantSelection};
use tpf_unpacker::{LayoutVariant, ParseError, ParseOptions, TpfFile};

/// (name bytes, payload) pairs laid out as a default-layout container:
/// header, 20-byte descriptors, double-null-terminated names, payloads.
fn container_bytes(textures: &[(&[u8], &[u8])]) -> Vec<u8> {
    let table_end = 16 + textures.len() * 20;
    let names_len: usize = textures.iter().map(|(name, _)| name.len() + 2).sum();

    let mut out = b"TPF\0".to_vec();
    out.extend_from_slice(&0i32.to_le_bytes());
    out.extend_from_slice(&(textures.len() as i32).to_le_bytes());
    out.extend_from_slice(&[0x00, 0x03, 0x01, 0x00]);

    let mut name_offset = table_end;
    let mut data_offset = table_end + names_len;
    for (name, payload) in textures {
        out.extend_from_slice(&(data_offset as i32).to_le_bytes());
        out.extend_from_slice(&(payload.len() as i32).to_le_bytes());
        out.extend_from_slice(&[0x00, 0x00, 0x01, 0x00]);
        out.extend_from_slice(&(name_offset as i32).to_le_bytes());
        out.extend_from_slice(&[0; 4]);
        name_offset += name.len() + 2;
        data_offset += payload.len();
    }
    for (name, _) in textures {
        out.extend_from_slice(name);
        out.extend_from_slice(&[0, 0]);
    }
    for (_, payload) in textures {
        out.extend_from_slice(payload);
    }
    out
}

fn write_tpf(dir: &Path, file_name: &str, bytes: &[u8]) -> std::path::PathBuf {
    let path = dir.join(file_name);
    fs::write(&path, bytes).unwrap();
    path
}

#[test]
fn extracts_textures_next_to_input() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_tpf(
        dir.path(),
        "c1000.tpf",
        &container_bytes(&[(b"c1000_a ", b"DDS aaaa"), (b"c1000_n", b"DDS nn")]),
    );

    let tpf = TpfFile::from_file(&path, &ParseOptions::default()).unwrap();
    assert_eq!(tpf.source.as_deref(), Some(path.as_path()));

    let out_dir = TpfFile::default_output_dir(&path);
    assert_eq!(out_dir, dir.path().join("c1000_textures"));

    let report = write_dds_files(&tpf.container, &out_dir).unwrap();
    assert_eq!(
        report.written,
        vec![out_dir.join("c1000_a.dds"), out_dir.join("c1000_n.dds")]
    );
    assert!(report.skipped.is_empty());
    assert_eq!(fs::read(out_dir.join("c1000_a.dds")).unwrap(), b"DDS aaaa");
    assert_eq!(fs::read(out_dir.join("c1000_n.dds")).unwrap(), b"DDS nn");
}

#[test]
fn skips_unsafe_names() {
    let dir = tempfile::tempdir().unwrap();
    let bytes = container_bytes(&[(b"../escape", b"x"), (b"ok", b"y"), (b"", b"z")]);
    let tpf = TpfFile::from_bytes(&bytes, &ParseOptions::default()).unwrap();

    let report = write_dds_files(&tpf.container, dir.path()).unwrap();
    assert_eq!(report.written, vec![dir.path().join("ok.dds")]);
    let skipped: Vec<usize> = report.skipped.iter().map(|(i, _)| *i).collect();
    assert_eq!(skipped, vec![0, 2]);
    assert!(!dir.path().parent().unwrap().join("escape.dds").exists());
}

#[test]
fn manifest_records_source() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_tpf(dir.path(), "m10.tpf", &container_bytes(&[(b"m10_wall", b"DDS ")]));
    let tpf = TpfFile::from_file(&path, &ParseOptions::default()).unwrap();

    let mut out = Vec::new();
    write_manifest(&tpf, &mut out, false).unwrap();
    let json: serde_json::Value = serde_json::from_slice(&out).unwrap();

    assert_eq!(json["source"], path.display().to_string());
    assert_eq!(json["entries"][0]["file"], "m10_wall.dds");
    assert_eq!(json["entries"][0]["data_size"], 4);
}

#[test]
fn bad_file_does_not_affect_others() {
    let dir = tempfile::tempdir().unwrap();
    let good = write_tpf(dir.path(), "a.tpf", &container_bytes(&[(b"a", b"1")]));

    let mut bad_bytes = container_bytes(&[(b"b1", b"11"), (b"b2", b"22")]);
    // data_offset of the second descriptor
    bad_bytes[36..40].copy_from_slice(&(-1i32).to_le_bytes());
    let bad = write_tpf(dir.path(), "b.tpf", &bad_bytes);

    let results: Vec<_> = [&good, &bad]
        .iter()
        .map(|p| TpfFile::from_file(p, &ParseOptions::default()))
        .collect();

    assert_eq!(results[0].as_ref().unwrap().container.len(), 1);
    assert!(matches!(
        results[1],
        Err(ParseError::BadOffset {
            field: OffsetField::Data,
            index: 1,
            offset: -1
        })
    ));

    let partial = ParseOptions {
        error_policy: ErrorPolicy::KeepResolved,
        ..ParseOptions::default()
    };
    let tpf = TpfFile::from_file(&bad, &partial).unwrap();
    assert!(tpf.is_incomplete());
    assert_eq!(tpf.container.entries[0].name, "b1");
    assert_eq!(tpf.container.entries[0].payload, b"11");
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = TpfFile::from_file(&dir.path().join("missing.tpf"), &ParseOptions::default());
    assert!(matches!(result, Err(ParseError::Io(_))));
}

#[test]
fn auto_layout_on_default_file() {
    let bytes = container_bytes(&[(b"c1000_a", b"DDS ")]);
    let options = ParseOptions::default().with_variant(VariantSelection::Auto);
    let tpf = TpfFile::from_bytes(&bytes, &options).unwrap();
    assert_eq!(tpf.container.variant, LayoutVariant::Default);
}
