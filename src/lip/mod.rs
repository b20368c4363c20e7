//! The load-in-place serialization engine.
//!
//! "Load-in-place" reconstructs an object graph by bulk-copying bytes and patching
//! pointers and dispatch tables, bypassing normal construction entirely. The engine
//! walks graphs guided by the reflected field metadata of a resolved
//! [`crate::TypeRegistry`]:
//!
//! - [`LipEngine::save_raw`] / [`LipEngine::save`] - capture a graph and emit an image
//! - [`LipEngine::load_raw`] / [`LipEngine::load`] - reconstruct an image into one
//!   allocation, returned as [`LipObject`] / [`LipBox`]
//! - [`ImageHeader`] / [`PointerFixup`] - the binary image format
//! - [`Reflected`] - marker trait tying a Rust type to its registered metadata
//!
//! # Sequence classes
//!
//! Dynamically-sized containers are recognized by a display-name convention: a class
//! whose name (after one optional `ns::` qualifier) starts with the engine's sequence
//! prefix is treated as a pointer pair delimiting contiguous element storage. The
//! prefix defaults to [`DEFAULT_SEQUENCE_PREFIX`] and is configurable per engine -
//! the matching rule decides which classes receive raw-range capture, so changing it
//! changes the image layout for affected graphs.
//!
//! # Concurrency
//!
//! Save and load are single-threaded, synchronous, and run to completion on the calling
//! thread, bounded by input size. There is no cancellation at this layer; callers
//! wanting bounds wrap the operations externally.

pub(crate) mod image;
pub(crate) mod load;
pub(crate) mod save;

pub use image::{ImageHeader, PointerFixup, FIXUP_SIZE, HEADER_SIZE, IMAGE_ALIGN};
pub use load::{LipBox, LipObject};

use crate::reflection::{TypeRegistry, TypeTag};

/// The default display-name prefix that marks dynamically-sized sequence classes.
pub const DEFAULT_SEQUENCE_PREFIX: &str = "vector<";

/// Marker trait tying a Rust type to its registered reflection metadata.
///
/// Implemented by application types that participate in typed save/load. The
/// implementation asserts nothing at compile time - it is a promise.
///
/// # Safety
/// The implementor vouches that the type's in-memory layout (size, field offsets,
/// pointer fields, base placement) exactly matches the metadata registered under
/// `TYPE_NAME`. Typed save and load trust this correspondence.
///
/// # Examples
///
/// ```rust
/// use typescope::lip::Reflected;
///
/// #[repr(C)]
/// struct Node {
///     next: *mut Node,
///     val: i64,
/// }
///
/// unsafe impl Reflected for Node {
///     const TYPE_NAME: &'static str = "Node";
/// }
/// ```
pub unsafe trait Reflected {
    /// The display name the type is registered under.
    const TYPE_NAME: &'static str;

    /// The type's identity tag.
    #[must_use]
    fn type_tag() -> TypeTag {
        TypeTag::from_name(Self::TYPE_NAME)
    }
}

/// Save/Load entry point over a resolved type registry.
///
/// The engine borrows the registry read-only; constructing one is free, so short-lived
/// engines per operation are fine. All state of an individual save or load lives on the
/// operation's own stack.
///
/// # Examples
///
/// ```rust
/// use typescope::{LipEngine, TypeRegistry};
///
/// let registry = TypeRegistry::new();
/// let engine = LipEngine::new(&registry);
/// assert_eq!(engine.sequence_prefix(), "vector<");
///
/// let engine = LipEngine::with_sequence_prefix(&registry, "span<");
/// assert_eq!(engine.sequence_prefix(), "span<");
/// ```
pub struct LipEngine<'r> {
    registry: &'r TypeRegistry,
    sequence_prefix: String,
}

impl<'r> LipEngine<'r> {
    /// Create an engine with the default sequence-name prefix.
    #[must_use]
    pub fn new(registry: &'r TypeRegistry) -> LipEngine<'r> {
        LipEngine::with_sequence_prefix(registry, DEFAULT_SEQUENCE_PREFIX)
    }

    /// Create an engine recognizing a custom sequence-name prefix.
    #[must_use]
    pub fn with_sequence_prefix(
        registry: &'r TypeRegistry,
        prefix: impl Into<String>,
    ) -> LipEngine<'r> {
        LipEngine {
            registry,
            sequence_prefix: prefix.into(),
        }
    }

    /// The registry this engine resolves types against.
    #[must_use]
    pub fn registry(&self) -> &'r TypeRegistry {
        self.registry
    }

    /// The display-name prefix that marks sequence classes.
    #[must_use]
    pub fn sequence_prefix(&self) -> &str {
        &self.sequence_prefix
    }

    /// Returns `true` if `name` denotes a sequence class under this engine's
    /// convention: one leading `ns::` qualifier is skipped, then the prefix must
    /// match literally.
    pub(crate) fn is_sequence_class(&self, name: &str) -> bool {
        let bare = match name.find("::") {
            Some(pos) => &name[pos + 2..],
            None => name,
        };
        bare.starts_with(self.sequence_prefix.as_str())
    }
}
