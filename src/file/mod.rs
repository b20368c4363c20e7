//! File and memory backing for binary input data.
//!
//! This module provides the low-level plumbing shared by descriptor loading and image
//! parsing:
//!
//! - [`File`] - backs input bytes with either a memory-mapped file or an owned buffer
//! - [`crate::file::parser::Parser`] - cursor-based bounds-checked decoding
//! - [`crate::file::io`] - primitive little-endian read/write helpers
//!
//! Descriptor files are typically large enough that mapping beats reading: the registry
//! loader walks the mapping once, copying out only names and field records.
//!
//! # Usage Examples
//!
//! ```rust,no_run
//! use typescope::File;
//!
//! let file = File::from_file(std::path::Path::new("game.ref"))?;
//! println!("{} descriptor bytes", file.data().len());
//! # Ok::<(), typescope::Error>(())
//! ```

pub(crate) mod io;
pub(crate) mod parser;

use std::path::Path;

use memmap2::Mmap;

use crate::Result;

/// Backing storage for binary input data.
///
/// `File` abstracts over the two ways input bytes reach this crate: a memory-mapped
/// file on disk, or a buffer the caller already owns. Both expose the same contiguous
/// `&[u8]` view through [`File::data`].
///
/// # Examples
///
/// ```rust
/// use typescope::File;
///
/// let file = File::from_mem(vec![1, 2, 3, 4]);
/// assert_eq!(file.data(), &[1, 2, 3, 4]);
/// ```
pub enum File {
    /// Memory-mapped file contents
    Mapped(Mmap),
    /// Caller-provided buffer
    Owned(Vec<u8>),
}

impl File {
    /// Map a file from disk.
    ///
    /// The mapping stays valid for the lifetime of the returned `File`. The file must
    /// not be modified while mapped; this is the usual memory-map caveat and the reason
    /// descriptor files are treated as immutable build artifacts.
    ///
    /// # Arguments
    /// * `path` - Path of the file to map
    ///
    /// # Errors
    /// Returns [`crate::Error::Io`] if the file cannot be opened or mapped.
    pub fn from_file(path: &Path) -> Result<File> {
        let file = std::fs::File::open(path)?;
        // Safety: the mapping is read-only and private to this process; mutation of the
        // underlying file during the mapping's lifetime is excluded by contract.
        let mapping = unsafe { Mmap::map(&file)? };
        Ok(File::Mapped(mapping))
    }

    /// Wrap an in-memory buffer.
    ///
    /// # Arguments
    /// * `data` - The buffer to take ownership of
    #[must_use]
    pub fn from_mem(data: Vec<u8>) -> File {
        File::Owned(data)
    }

    /// The contiguous byte view of the backing storage.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        match self {
            File::Mapped(mapping) => mapping,
            File::Owned(buffer) => buffer,
        }
    }

    /// Returns the length of the backing data in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data().len()
    }

    /// Returns `true` if the backing data is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data().is_empty()
    }
}
