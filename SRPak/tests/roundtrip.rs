//! Pack/unpack integration tests against real files on disk

mod common;

use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use common::{FailingCompressor, FrameCompressor, body, read_tree, write_tree};
use srpak::packfile::{HEADER_SIZE, PackfileReader, UNCOMPRESSED_SENTINEL, VERSION};
use srpak::pak_tools::{PackOptions, PackfileOperations, UnpackOptions};
use srpak::{Error, FormatError, ValidationError};

fn source_files() -> Vec<(&'static str, Vec<u8>)> {
    vec![
        ("sr5/data/ui/fonts/main.ttf", body(300, 1)),
        ("sr5/data/ui/hud.cvbm_pc", body(4000, 2)),
        ("sr5/data/ui/hud.gvbm_pc", body(9000, 3)),
        ("sr5/data/meshes/car.ccmesh_pc", body(12_000, 4)),
        ("sr5/data/meshes/car.gcmesh_pc", body(20_000, 5)),
        ("sr5/data/scripts/init.lua", b"print('hello')\n".to_vec()),
        ("sr5/data/empty.bin", Vec::new()),
    ]
}

fn build_source(root: &Path) {
    let files = source_files();
    let refs: Vec<(&str, &[u8])> = files.iter().map(|(p, b)| (*p, b.as_slice())).collect();
    write_tree(root, &refs);
}

fn expected_tree() -> Vec<(String, Vec<u8>)> {
    let mut files: Vec<(String, Vec<u8>)> = source_files()
        .into_iter()
        .map(|(p, b)| (p.to_string(), b))
        .collect();
    files.sort();
    files
}

fn pack_options() -> PackOptions {
    PackOptions::new().with_compressor(FrameCompressor::default())
}

fn unpack_options() -> UnpackOptions {
    UnpackOptions::new()
        .with_threads(4)
        .with_compressor(FrameCompressor::default())
}

fn le_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes(bytes[at..at + 4].try_into().unwrap())
}

fn le_u64(bytes: &[u8], at: usize) -> u64 {
    u64::from_le_bytes(bytes[at..at + 8].try_into().unwrap())
}

#[test]
fn test_round_trip_selective() {
    let tmp = TempDir::new().unwrap();
    let src = tmp.path().join("src");
    build_source(&src);
    let archive = tmp.path().join("misc.vpp_pc");

    let summary = PackfileOperations::pack(&src, &archive, &pack_options()).unwrap();
    assert_eq!(summary.files, 7);
    // Only the two mesh files are outside the store-raw list.
    assert_eq!(summary.compressed, 2);

    let out = tmp.path().join("out");
    let unpacked =
        PackfileOperations::unpack(&[archive], &out, &unpack_options()).unwrap();
    assert_eq!(unpacked.archives, 1);
    assert_eq!(unpacked.files, 7);
    assert_eq!(read_tree(&out), expected_tree());
}

#[test]
fn test_round_trip_no_compression() {
    let tmp = TempDir::new().unwrap();
    let src = tmp.path().join("src");
    build_source(&src);
    let archive = tmp.path().join("misc.vpp_pc");

    let options = pack_options().with_no_compression(true);
    let summary = PackfileOperations::pack(&src, &archive, &options).unwrap();
    assert_eq!(summary.compressed, 0);

    let entries = PackfileOperations::list(&archive).unwrap();
    assert!(entries.iter().all(|e| !e.compressed));

    let out = tmp.path().join("out");
    PackfileOperations::unpack(&[archive], &out, &unpack_options()).unwrap();
    assert_eq!(read_tree(&out), expected_tree());
}

#[test]
fn test_str2_compresses_everything() {
    let tmp = TempDir::new().unwrap();
    let src = tmp.path().join("src");
    build_source(&src);
    let archive = tmp.path().join("terrain.str2_pc");

    let summary = PackfileOperations::pack(&src, &archive, &pack_options()).unwrap();
    assert_eq!(summary.compressed, summary.files);

    let out = tmp.path().join("out");
    let compressor = std::sync::Arc::new(FrameCompressor::default());
    let options = UnpackOptions {
        compressor: compressor.clone(),
        ..unpack_options()
    };
    PackfileOperations::unpack(&[archive], &out, &options).unwrap();
    assert_eq!(compressor.decompressed.load(Ordering::SeqCst), 7);
    assert_eq!(read_tree(&out), expected_tree());
}

#[test]
fn test_header_patch_law() {
    let tmp = TempDir::new().unwrap();
    let src = tmp.path().join("src");
    build_source(&src);
    let archive = tmp.path().join("misc.vpp_pc");
    PackfileOperations::pack(&src, &archive, &pack_options()).unwrap();

    let bytes = std::fs::read(&archive).unwrap();
    let index = PackfileOperations::index(&archive).unwrap();
    let header = &index.header;

    assert_eq!(&bytes[0..4], &[0xCE, 0x0A, 0x89, 0x51]);
    assert_eq!(le_u32(&bytes, 4), VERSION);
    assert_eq!(header.pack_size, bytes.len() as u64);
    assert_eq!(header.data_base + header.data_size, header.pack_size);
    assert_eq!(header.data_size, index.stored_total());
    assert_eq!(header.compressed_data_size, header.data_size);

    // The name table sits right before the data section.
    let names_end = header.names_start() + u64::from(header.names_size);
    assert_eq!(names_end, header.data_base);
    assert_eq!(u64::from(le_u32(&bytes, 24)) + HEADER_SIZE, header.names_start());
    assert_eq!(le_u64(&bytes, 32), header.pack_size);
    assert_eq!(le_u64(&bytes, 64), header.data_base);
}

#[test]
fn test_offsets_and_sentinel() {
    let tmp = TempDir::new().unwrap();
    let src = tmp.path().join("src");
    build_source(&src);
    let archive = tmp.path().join("misc.vpp_pc");
    PackfileOperations::pack(&src, &archive, &pack_options()).unwrap();

    let index = PackfileOperations::index(&archive).unwrap();
    let mut expected_offset = 0;
    for entry in &index.entries {
        let record = &entry.record;
        assert_eq!(record.data_offset, expected_offset, "{}", entry.display_path());
        expected_offset += record.effective_size();

        if record.flags & 1 == 0 {
            assert_eq!(record.stored_size, UNCOMPRESSED_SENTINEL);
            assert_eq!(record.effective_size(), record.uncompressed_size);
        } else {
            assert_ne!(record.stored_size, UNCOMPRESSED_SENTINEL);
        }
    }
    assert_eq!(expected_offset, index.header.data_size);
}

#[test]
fn test_raw_and_compressed_entries() {
    let tmp = TempDir::new().unwrap();
    let src = tmp.path().join("src");
    let raw = body(5000, 7);
    let mesh = body(5000, 8);
    write_tree(
        &src,
        &[
            ("data/ui/labels.xml", raw.as_slice()),
            ("data/ui/panel.ccmesh_pc", mesh.as_slice()),
        ],
    );
    let archive = tmp.path().join("ui.vpp_pc");
    PackfileOperations::pack(&src, &archive, &pack_options()).unwrap();

    let index = PackfileOperations::index(&archive).unwrap();
    assert_eq!(index.directories, vec!["data\\ui".to_string()]);

    let xml = index.entries.iter().find(|e| e.name == "labels.xml").unwrap();
    assert_eq!(xml.record.flags, 0);
    assert_eq!(xml.record.stored_size, UNCOMPRESSED_SENTINEL);

    let ccmesh = index.entries.iter().find(|e| e.name == "panel.ccmesh_pc").unwrap();
    assert_eq!(ccmesh.record.flags, 1);
    assert!(ccmesh.record.stored_size < mesh.len() as u64);
}

#[test]
fn test_bad_version_writes_nothing() {
    let tmp = TempDir::new().unwrap();
    let src = tmp.path().join("src");
    build_source(&src);
    let good = tmp.path().join("good.vpp_pc");
    PackfileOperations::pack(&src, &good, &pack_options()).unwrap();

    let mut bytes = std::fs::read(&good).unwrap();
    bytes[4..8].copy_from_slice(&16u32.to_le_bytes());
    let bad = tmp.path().join("bad.vpp_pc");
    std::fs::write(&bad, bytes).unwrap();

    // The good archive is listed first; nothing may be written for it either.
    let out = tmp.path().join("out");
    let err = PackfileOperations::unpack(&[good, bad], &out, &unpack_options()).unwrap_err();
    assert!(matches!(
        err,
        Error::Format(FormatError::UnsupportedVersion { found: 16, .. })
    ));
    assert!(!out.exists());
}

#[test]
fn test_bad_magic() {
    let tmp = TempDir::new().unwrap();
    let bad = tmp.path().join("junk.vpp_pc");
    std::fs::write(&bad, vec![0u8; 0x200]).unwrap();

    let err = PackfileOperations::list(&bad).unwrap_err();
    assert!(matches!(err, Error::Format(FormatError::BadMagic { .. })));
}

#[test]
fn test_thread_count_rejected_first() {
    let tmp = TempDir::new().unwrap();
    // The input does not exist, so only the thread check can fire.
    let input = vec![tmp.path().join("missing.vpp_pc")];
    let out = tmp.path().join("out");

    for threads in [0, 51] {
        let options = unpack_options().with_threads(threads);
        let err = PackfileOperations::unpack(&input, &out, &options).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::ThreadCount { min: 1, max: 50, .. })
        ));
    }
    assert!(!out.exists());
}

#[test]
fn test_bad_input_extension() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("misc.zip");
    std::fs::write(&input, b"PK").unwrap();

    let err = PackfileOperations::unpack(&[input], tmp.path().join("out"), &unpack_options())
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::BadExtension { .. })
    ));
}

#[test]
fn test_bad_output_extension() {
    let tmp = TempDir::new().unwrap();
    let src = tmp.path().join("src");
    build_source(&src);

    let output = tmp.path().join("misc.zip");
    let err = PackfileOperations::pack(&src, &output, &pack_options()).unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::BadExtension { .. })
    ));
    assert!(!output.exists());
}

#[test]
fn test_same_name_gets_own_slot() {
    let tmp = TempDir::new().unwrap();
    let src = tmp.path().join("src");
    write_tree(
        &src,
        &[
            ("data/a/same.txt", b"first".as_slice()),
            ("data/b/same.txt", b"second".as_slice()),
        ],
    );
    let archive = tmp.path().join("names.vpp_pc");
    PackfileOperations::pack(&src, &archive, &pack_options()).unwrap();

    let reader = PackfileReader::open(&archive).unwrap();
    let header = reader.read_header().unwrap();
    let records = reader.read_entry_table(&header).unwrap();
    assert_eq!(records.len(), 2);
    assert_ne!(records[0].name_offset, records[1].name_offset);

    let names = reader.read_name_table(&header).unwrap();
    assert_eq!(names.get_str(records[0].name_offset).unwrap(), "same.txt");
    assert_eq!(names.get_str(records[1].name_offset).unwrap(), "same.txt");

    let expected: usize = ["data\\a", "same.txt", "data\\b", "same.txt"]
        .iter()
        .map(|n| n.len() + 1)
        .sum();
    assert_eq!(names.len(), expected);
    assert_eq!(header.names_size as usize, expected);
}

#[test]
fn test_engine_tree_unpacks_beside_primary_group() {
    let tmp = TempDir::new().unwrap();
    let src = tmp.path().join("src");
    let shader = body(640, 9);
    write_tree(
        &src,
        &[
            ("data/engine/shaders/fog.fxo_vk_pc", shader.as_slice()),
            ("data/engineering/notes.txt", b"not remapped".as_slice()),
        ],
    );
    let archive = tmp.path().join("engine.vpp_pc");
    PackfileOperations::pack(&src, &archive, &pack_options()).unwrap();

    let index = PackfileOperations::index(&archive).unwrap();
    assert_eq!(
        index.directories,
        vec![
            "..\\ctg\\data\\engine\\shaders".to_string(),
            "data\\engineering".to_string(),
        ]
    );
    let fog = index.entries.iter().find(|e| e.name == "fog.fxo_vk_pc").unwrap();
    assert_eq!(fog.record.alignment, 16);

    let out = tmp.path().join("out");
    PackfileOperations::unpack(&[archive], &out, &unpack_options()).unwrap();
    assert_eq!(
        read_tree(&out),
        vec![
            ("ctg/data/engine/shaders/fog.fxo_vk_pc".to_string(), shader),
            ("sr5/data/engineering/notes.txt".to_string(), b"not remapped".to_vec()),
        ]
    );
}

#[test]
fn test_files_outside_data_are_skipped() {
    let tmp = TempDir::new().unwrap();
    let src = tmp.path().join("src");
    write_tree(
        &src,
        &[
            ("readme.txt", b"skip me".as_slice()),
            ("tools/build.lua", b"skip me too".as_slice()),
            ("mod/data/keep.txt", b"keep".as_slice()),
        ],
    );
    let archive = tmp.path().join("partial.vpp_pc");
    let summary = PackfileOperations::pack(&src, &archive, &pack_options()).unwrap();
    assert_eq!(summary.files, 1);

    let entries = PackfileOperations::list(&archive).unwrap();
    assert_eq!(entries[0].path, "data\\keep.txt");
}

#[test]
fn test_empty_tree_packs_empty_archive() {
    let tmp = TempDir::new().unwrap();
    let src = tmp.path().join("src");
    std::fs::create_dir_all(src.join("nothing")).unwrap();
    let archive = tmp.path().join("empty.vpp_pc");

    let summary = PackfileOperations::pack(&src, &archive, &pack_options()).unwrap();
    assert_eq!(summary.files, 0);
    assert!(PackfileOperations::list(&archive).unwrap().is_empty());
}

#[test]
fn test_duplicate_inputs_extracted_once() {
    let tmp = TempDir::new().unwrap();
    let src = tmp.path().join("src");
    build_source(&src);
    let archive = tmp.path().join("misc.vpp_pc");
    PackfileOperations::pack(&src, &archive, &pack_options()).unwrap();

    let mut trailing = archive.clone().into_os_string();
    trailing.push("/");
    let inputs = vec![archive.clone(), PathBuf::from(trailing)];

    let out = tmp.path().join("out");
    let summary = PackfileOperations::unpack(&inputs, &out, &unpack_options()).unwrap();
    assert_eq!(summary.archives, 1);
}

#[test]
fn test_failed_decompression_aborts() {
    let tmp = TempDir::new().unwrap();
    let src = tmp.path().join("src");
    write_tree(
        &src,
        &[
            ("data/a.ccmesh_pc", body(1000, 1).as_slice()),
            ("data/b.ccmesh_pc", body(1000, 2).as_slice()),
            ("data/c.ccmesh_pc", body(1000, 3).as_slice()),
        ],
    );
    let archive = tmp.path().join("meshes.vpp_pc");
    PackfileOperations::pack(&src, &archive, &pack_options()).unwrap();

    let options = UnpackOptions::new()
        .with_threads(1)
        .with_compressor(FailingCompressor);
    let err = PackfileOperations::unpack(&[archive], tmp.path().join("out"), &options)
        .unwrap_err();

    match err {
        Error::ExtractionAborted {
            total,
            failed,
            completed,
            skipped,
            source,
        } => {
            assert_eq!((total, failed, completed, skipped), (3, 1, 0, 2));
            assert!(matches!(*source, Error::Compression { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
}

/// Overwrite the first occurrence of `from` in the archive's name table.
fn rewrite_name(archive: &Path, from: &[u8], to: &[u8]) {
    assert_eq!(from.len(), to.len());
    let mut bytes = std::fs::read(archive).unwrap();
    let at = bytes
        .windows(from.len())
        .position(|w| w == from)
        .expect("name present in archive");
    bytes[at..at + to.len()].copy_from_slice(to);
    std::fs::write(archive, bytes).unwrap();
}

#[cfg(unix)]
#[test]
fn test_non_utf8_names_extract_separately() {
    use std::os::unix::ffi::OsStrExt;

    let tmp = TempDir::new().unwrap();
    let src = tmp.path().join("src");
    write_tree(
        &src,
        &[
            ("data/cafX.txt", b"one".as_slice()),
            ("data/cafY.txt", b"two".as_slice()),
        ],
    );
    let archive = tmp.path().join("latin1.vpp_pc");
    let options = pack_options().with_no_compression(true);
    PackfileOperations::pack(&src, &archive, &options).unwrap();
    rewrite_name(&archive, b"cafX.txt\0", b"caf\xE9.txt\0");
    rewrite_name(&archive, b"cafY.txt\0", b"caf\xE8.txt\0");

    let out = tmp.path().join("out");
    let summary = PackfileOperations::unpack(&[archive], &out, &unpack_options()).unwrap();
    assert_eq!(summary.files, 2);

    let mut found: Vec<(Vec<u8>, Vec<u8>)> = std::fs::read_dir(out.join("sr5/data"))
        .unwrap()
        .map(|e| {
            let e = e.unwrap();
            (e.file_name().as_bytes().to_vec(), std::fs::read(e.path()).unwrap())
        })
        .collect();
    found.sort();
    assert_eq!(
        found,
        vec![
            (b"caf\xE8.txt".to_vec(), b"two".to_vec()),
            (b"caf\xE9.txt".to_vec(), b"one".to_vec()),
        ]
    );
}

#[test]
fn test_duplicate_entry_paths_rejected() {
    let tmp = TempDir::new().unwrap();
    let src = tmp.path().join("src");
    write_tree(
        &src,
        &[
            ("data/a.txt", b"first".as_slice()),
            ("data/b.txt", b"second".as_slice()),
        ],
    );
    let archive = tmp.path().join("dupes.vpp_pc");
    PackfileOperations::pack(&src, &archive, &pack_options()).unwrap();
    rewrite_name(&archive, b"b.txt\0", b"a.txt\0");

    let out = tmp.path().join("out");
    let err = PackfileOperations::unpack(&[archive], &out, &unpack_options()).unwrap_err();
    assert!(
        matches!(err, Error::Format(FormatError::DuplicatePath { ref path }) if path == "data\\a.txt"),
        "unexpected error: {err}"
    );
    assert!(!out.exists());
}
