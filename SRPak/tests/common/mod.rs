//! Shared fixtures for the integration tests
#![allow(dead_code)]

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use lz4_flex::frame::{FrameDecoder, FrameEncoder};
use srpak::compression::{Compressor, StagedFile};
use srpak::{Error, Result};

/// In-process lz4 frame compressor, so tests don't need the `lz4` tool.
#[derive(Debug, Default)]
pub struct FrameCompressor {
    pub compressed: AtomicUsize,
    pub decompressed: AtomicUsize,
}

impl Compressor for FrameCompressor {
    fn compress(&self, source: &Path, work_dir: &Path) -> Result<StagedFile> {
        std::fs::create_dir_all(work_dir)?;
        let target = work_dir.join(source.file_name().expect("source has a file name"));

        let body = std::fs::read(source)?;
        let mut encoder = FrameEncoder::new(File::create(&target)?);
        encoder.write_all(&body)?;
        encoder.finish().map_err(io::Error::other)?;

        self.compressed.fetch_add(1, Ordering::SeqCst);
        let size = std::fs::metadata(&target)?.len();
        Ok(StagedFile { path: target, size })
    }

    fn decompress(&self, path: &Path) -> Result<()> {
        let mut body = Vec::new();
        FrameDecoder::new(File::open(path)?).read_to_end(&mut body)?;
        std::fs::write(path, body)?;
        self.decompressed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Fails every call the way a broken `lz4` would.
#[derive(Debug, Default)]
pub struct FailingCompressor;

impl Compressor for FailingCompressor {
    fn compress(&self, _source: &Path, _work_dir: &Path) -> Result<StagedFile> {
        Err(failure())
    }

    fn decompress(&self, _path: &Path) -> Result<()> {
        Err(failure())
    }
}

fn failure() -> Error {
    Error::Compression {
        program: "lz4".to_string(),
        status: "exit status: 1".to_string(),
        stderr: "Error 44 : Unrecognized header".to_string(),
    }
}

/// Write `files` (relative path, contents) below `root`.
pub fn write_tree(root: &Path, files: &[(&str, &[u8])]) {
    for (relative, contents) in files {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }
}

/// Every file below `root` as (relative path with `/`, contents), sorted.
pub fn read_tree(root: &Path) -> Vec<(String, Vec<u8>)> {
    let mut files: Vec<(String, Vec<u8>)> = walkdir::WalkDir::new(root)
        .into_iter()
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let relative = e.path().strip_prefix(root).unwrap();
            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            (key, std::fs::read(e.path()).unwrap())
        })
        .collect();
    files.sort();
    files
}

/// Compressible filler of a given length.
pub fn body(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| seed.wrapping_add((i % 17) as u8)).collect()
}
