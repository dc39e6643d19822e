//! Local fixture files used as upload payloads
//!
//! Each size class maps to one file in the fixture directory. Files are
//! regenerated from random bytes at suite setup, block by block.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use rand::{Rng, RngCore};
use serde::Serialize;

use crate::error::HarnessResult;

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;

/// Objects larger than this are uploaded in multipart chunks
pub const MULTIPART_THRESHOLD: u64 = 5 * MIB;

/// Multipart chunk size passed to the CLI, in MiB
pub const MULTIPART_CHUNK_MB: u64 = 5;

/// A fixture size: total bytes, file name and how it is written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SizeClass {
    /// Total size in bytes
    pub bytes: u64,
    /// File name inside the fixture directory
    pub file_name: &'static str,
    /// Bytes written per block
    pub block_size: u64,
    /// Number of blocks
    pub block_count: u64,
}

impl SizeClass {
    const fn new(file_name: &'static str, block_size: u64, block_count: u64) -> Self {
        Self {
            bytes: block_size * block_count,
            file_name,
            block_size,
            block_count,
        }
    }

    /// Whether an object of this size needs a multipart upload
    pub fn needs_multipart(&self) -> bool {
        self.bytes > MULTIPART_THRESHOLD
    }
}

/// Every size class, smallest first
pub const SIZE_CLASSES: [SizeClass; 6] = [
    SizeClass::new("_1KB.bin", KIB, 1),
    SizeClass::new("_1MB.bin", MIB, 1),
    SizeClass::new("_5MB.bin", MIB, 5),
    SizeClass::new("_6MB.bin", MIB, 6),
    SizeClass::new("_16MB.bin", MIB, 16),
    SizeClass::new("_32MB.bin", MIB, 32),
];

/// The fixture directory and the size classes in use
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureSet {
    dir: PathBuf,
    classes: Vec<SizeClass>,
}

impl FixtureSet {
    /// All size classes under `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            classes: SIZE_CLASSES.to_vec(),
        }
    }

    /// Keep only classes of at most `max_bytes`; the smallest class always stays
    pub fn with_max_size(mut self, max_bytes: u64) -> Self {
        self.classes = SIZE_CLASSES
            .iter()
            .enumerate()
            .filter(|(i, class)| *i == 0 || class.bytes <= max_bytes)
            .map(|(_, class)| *class)
            .collect();
        self
    }

    /// Fixture directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Size classes in use, smallest first (never empty)
    pub fn classes(&self) -> &[SizeClass] {
        &self.classes
    }

    /// A pseudo-random size class
    pub fn random_class(&self) -> &SizeClass {
        let idx = rand::thread_rng().gen_range(0..self.classes.len());
        &self.classes[idx]
    }

    /// The class at `idx`, cycling through the classes in use
    pub fn cycle(&self, idx: usize) -> &SizeClass {
        &self.classes[idx % self.classes.len()]
    }

    /// Local path of a class's file
    pub fn path(&self, class: &SizeClass) -> PathBuf {
        self.dir.join(class.file_name)
    }

    /// Recreate the directory and write every fixture file
    pub fn generate(&self) -> HarnessResult<()> {
        if self.dir.exists() {
            fs::remove_dir_all(&self.dir)?;
        }
        fs::create_dir_all(&self.dir)?;

        let mut rng = rand::thread_rng();
        for class in &self.classes {
            let path = self.path(class);
            let mut writer = BufWriter::new(File::create(&path)?);
            let mut block = vec![0u8; class.block_size as usize];
            for _ in 0..class.block_count {
                rng.fill_bytes(&mut block);
                writer.write_all(&block)?;
            }
            writer.flush()?;
            tracing::debug!(path = %path.display(), bytes = class.bytes, "Fixture written");
        }

        tracing::info!(
            dir = %self.dir.display(),
            files = self.classes.len(),
            "Fixtures generated"
        );
        Ok(())
    }
}
