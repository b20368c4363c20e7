// Copyright 2025 The typescope authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(dead_code)]
//#![deny(unsafe_code)]
// - 'lip/save.rs' reads object memory through reflected field offsets
// - 'lip/load.rs' allocates raw image memory and patches pointer slots
// - 'file/mod.rs' uses mmap to map a descriptor file into memory

//! # typescope
//!
//! Runtime reflection and load-in-place persistence for object models that have no built-in
//! run-time type information. `typescope` lets a program describe the shape of its own types
//! once - fields, offsets, base classes, instance hooks - then use that description to flatten
//! an arbitrary, potentially cyclic graph of linked objects into one contiguous binary image
//! and reconstruct it later with a single bulk copy and a pointer-fixup pass, without re-running
//! any type's normal construction logic.
//!
//! ## Features
//!
//! - **🗂 Registry-driven reflection** - Name-hash keyed type records for classes, enums,
//!   pointers and fixed arrays, with two-phase symbolic reference resolution
//! - **📦 Load-in-place images** - Self-contained binary blobs with a pointer-fixup table;
//!   loading is one allocation, one bulk copy and an offset-patching loop
//! - **🔁 Identity-preserving capture** - Shared pointers and cycles are deduplicated at save
//!   time and reconstructed with the same topology
//! - **🧬 Dispatch restoration** - Per-class install hooks reinstate function-table references
//!   on reloaded objects, so polymorphic calls dispatch correctly
//! - **🛡 Bounds-checked formats** - Descriptor files and object images are parsed through
//!   checked accessors; corrupt offsets are rejected, never dereferenced
//! - **🔧 Offline metadata friendly** - Consumes type/field descriptor files produced by an
//!   external extractor, independent of declaration order
//!
//! ## Quick Start
//!
//! Add `typescope` to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! typescope = "0.2"
//! ```
//!
//! ### Describing and round-tripping a type
//!
//! ```rust
//! use typescope::prelude::*;
//!
//! #[repr(C)]
//! struct Node {
//!     next: *mut Node,
//!     val: i64,
//! }
//!
//! # fn main() -> typescope::Result<()> {
//! let registry = TypeRegistry::new();
//! registry.add_type(Type::pointer(
//!     "Node*",
//!     std::mem::size_of::<usize>() as u32,
//!     TypeTag::from_name("Node"),
//! ))?;
//! ClassBuilder::new("Node", std::mem::size_of::<Node>() as u32)
//!     .field("next", "Node*", 0)
//!     .field("val", "i64", 8)
//!     .register(&registry)?;
//! registry.post_init()?;
//!
//! // A one-node cycle.
//! let mut node = Node { next: std::ptr::null_mut(), val: 7 };
//! let here: *mut Node = &mut node;
//! node.next = here;
//!
//! let engine = LipEngine::new(&registry);
//! let mut image = Vec::new();
//! unsafe {
//!     engine.save_raw(&node as *const Node as *const u8, TypeTag::from_name("Node"), 1, &mut image)?;
//! }
//!
//! let restored = engine.load_raw(&mut image.as_slice(), 1)?;
//! let restored_node = unsafe { &*(restored.as_ptr() as *const Node) };
//! assert_eq!(restored_node.val, 7);
//! assert!(std::ptr::eq(restored_node.next, restored.as_ptr() as *mut Node));
//! # Ok(())
//! # }
//! ```
//!
//! ### Loading registry contents from a descriptor file
//!
//! ```rust,no_run
//! use typescope::prelude::*;
//!
//! # fn main() -> typescope::Result<()> {
//! let registry = TypeRegistry::new();
//! typescope::reflection::load_descriptor_file(&registry, std::path::Path::new("game.ref"))?;
//! if let Some(ty) = registry.find_type("Sprite") {
//!     println!("{} is {} bytes", ty.name(), ty.size());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! `typescope` is organized into three layers:
//!
//! - [`reflection`] - The type model ([`Type`], [`reflection::Field`]), the
//!   [`TypeRegistry`] and the binary descriptor loader
//! - [`lip`] - The load-in-place engine: graph capture, image emission and reconstruction
//! - `file` - Bounds-checked binary plumbing shared by both (exposed as [`Parser`] and
//!   [`File`])
//!
//! ### The build-then-read-only protocol
//!
//! Registration happens in two phases. Types reference each other symbolically by
//! [`TypeTag`] (a 32-bit hash of the display name), so a descriptor file may list a derived
//! class before its base. After all types for a session are registered,
//! [`TypeRegistry::post_init`] resolves every symbolic reference into a live, shared type
//! record. Save, load and instance creation refuse to run on an unresolved registry. After
//! resolution the registry is read-only; concurrent lookups from multiple threads are safe,
//! concurrent mutation is not supported.
//!
//! ### Load-in-place
//!
//! [`lip::LipEngine::save_raw`] walks an object graph guided by reflected field metadata,
//! capturing each distinct pointee as a region of the output image and recording a fixup for
//! every pointer slot. Aliased pointers and cycles resolve to regions that are already
//! captured, which both terminates traversal and preserves identity.
//! [`lip::LipEngine::load_raw`] reverses the process: read the header, validate the fixup
//! table, bulk-copy the raw bytes into one allocation, patch every pointer slot, and
//! reinstall per-class dispatch tables. The reconstructed object is returned as a
//! [`lip::LipObject`] (or typed [`lip::LipBox`]) whose teardown is a raw deallocation -
//! no constructor ever ran, so no destructor ever runs.
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, Error>`](Result) with explicit error information:
//!
//! ```rust
//! use typescope::{Error, TypeRegistry};
//!
//! let registry = TypeRegistry::new();
//! match registry.create_instance("Sprite") {
//!     Ok(instance) => println!("created {instance:p}"),
//!     Err(Error::RegistryNotResolved) => println!("post_init has not run"),
//!     Err(Error::TypeNotFound(tag)) => println!("unknown type {tag}"),
//!     Err(e) => println!("other error: {e}"),
//! }
//! ```
//!
//! ## Safety
//!
//! Capture reads live object memory through reflected offsets, and loading installs dispatch
//! hooks supplied by the caller. The unsafe surface is concentrated in three places:
//! [`lip::LipEngine::save_raw`]/[`lip::LipEngine::save`] (the caller vouches that the object
//! matches its registered layout), [`TypeRegistry::bind_instance_hooks`] (the caller vouches
//! the hooks match the layout), and the typed accessors on fields. Everything downstream -
//! including [`lip::LipEngine::load_raw`] - is bounds-checked against the image.
//!
//! ## Limitations
//!
//! Images record raw byte layout and are only valid for a same-architecture round trip:
//! pointer width, endianness and struct layout must match between writer and reader. There is
//! no schema migration beyond the version tag in the image header.
#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;
pub(crate) mod file;

/// Shared functionality which is used in unit- and integration-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// This module provides a curated selection of the most frequently used types
/// from across the typescope library, allowing for convenient glob imports.
///
/// # Example
///
/// ```rust
/// use typescope::prelude::*;
///
/// let registry = TypeRegistry::new();
/// assert!(registry.find_type("u32").is_some());
/// ```
pub mod prelude;

/// The reflection type model, registry and descriptor loading.
///
/// This module implements the registry-driven type description layer:
///
/// - [`reflection::Type`] - tagged type records (fundamental, class, enum, pointer, array)
/// - [`reflection::Field`] / [`reflection::FieldAccessor`] - named, typed, offset members
///   and cached-address access to them
/// - [`reflection::TypeRegistry`] - tag-keyed ownership of all type records, two-phase
///   symbolic resolution, instance hooks
/// - [`reflection::ClassBuilder`] / [`reflection::EnumBuilder`] - programmatic registration
/// - [`reflection::load_descriptor`] - binary type/field descriptor file parsing
///
/// # Example
///
/// ```rust
/// use typescope::reflection::{ClassBuilder, TypeRegistry};
///
/// # fn main() -> typescope::Result<()> {
/// let registry = TypeRegistry::new();
/// ClassBuilder::new("Point", 8)
///     .field("x", "f32", 0)
///     .field("y", "f32", 4)
///     .register(&registry)?;
/// registry.post_init()?;
///
/// let point = registry.find_type("Point").unwrap();
/// assert_eq!(point.size(), 8);
/// # Ok(())
/// # }
/// ```
pub mod reflection;

/// The load-in-place serialization engine.
///
/// Walks object graphs following reflected field metadata, deduplicates shared and circular
/// pointers, emits self-contained binary images with a pointer-fixup table, and reconstructs
/// live, pointer-correct, dispatch-correct objects from those images.
///
/// # Key Types
///
/// - [`lip::LipEngine`] - Save/Load entry point, borrowing a resolved registry
/// - [`lip::LipObject`] / [`lip::LipBox`] - owned reconstructed objects (raw deallocation,
///   no destructor logic)
/// - [`lip::ImageHeader`] / [`lip::PointerFixup`] - the on-disk image format
/// - [`lip::Reflected`] - marker trait tying a Rust type to its registered metadata
pub mod lip;

/// `typescope` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always
/// [`Error`]. This is used consistently throughout the crate for all fallible operations.
///
/// # Examples
///
/// ```rust
/// use typescope::{Result, TypeRegistry};
///
/// fn resolved_registry() -> Result<TypeRegistry> {
///     let registry = TypeRegistry::new();
///     registry.post_init()?;
///     Ok(registry)
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// `typescope` Error type
///
/// The main error type for all operations in this crate. Provides detailed error
/// information for registration, descriptor parsing, and save/load operations.
pub use error::Error;

/// Tag-keyed owner of all reflected type records.
///
/// See [`reflection::TypeRegistry`] for registration, lookup and resolution.
pub use reflection::TypeRegistry;

/// Core type model types.
///
/// - [`Type`] - a reflected type record
/// - [`TypeTag`] - 32-bit name-hash identity
/// - [`reflection::ReflectionKind`] - the variant tag
pub use reflection::{ReflectionKind, Type, TypeTag};

/// The load-in-place engine entry point.
///
/// See [`lip::LipEngine`] for graph capture and image reconstruction.
pub use lip::LipEngine;

/// Provides access to low-level file and memory parsing utilities.
///
/// The [`Parser`] type is used for decoding descriptor files and object images;
/// [`File`] backs descriptor data with a memory map or an owned buffer.
pub use file::{parser::Parser, File};
