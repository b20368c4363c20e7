use thiserror::Error;

use crate::reflection::TypeTag;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// This enum covers all error conditions that can occur while building a type registry,
/// parsing type descriptor files, and saving or loading load-in-place object images.
///
/// # Error Categories
///
/// ## Registration
/// - [`Error::DuplicateType`] - A type with the same name hash is already registered
/// - [`Error::UnresolvedType`] - A symbolic type reference failed to resolve during `post_init`
/// - [`Error::RegistryNotResolved`] - An operation requiring a resolved registry ran too early
///
/// ## Lookup and access
/// - [`Error::TypeNotFound`] - No type is registered under the requested name or tag
/// - [`Error::NotAClass`] - A class operation was applied to a non-class type
/// - [`Error::FieldNotFound`] - A field lookup by name found nothing in the class or its bases
/// - [`Error::HookUnbound`] - A declared instance hook has no bound function
///
/// ## Image format
/// - [`Error::VersionMismatch`] - The stored image version disagrees with the expected one
/// - [`Error::TypeMismatch`] - The stored root type disagrees with the requested one
/// - [`Error::Malformed`] - Corrupt descriptor or image data, with the detection site
/// - [`Error::OutOfBounds`] - A read or write would have left the buffer
/// - [`Error::FixupOverflow`] - The captured graph needs more fixups than the format can hold
/// - [`Error::NotSerializable`] - A traversed class carries a `NO_SERIALIZE` field
///
/// ## I/O
/// - [`Error::Io`] - Underlying stream read/write failure
#[derive(Error, Debug)]
pub enum Error {
    /// A type with the same name hash is already present in the registry.
    ///
    /// Registration is rejected immediately and the registry is left unchanged.
    #[error("Type '{0}' is already registered")]
    DuplicateType(String),

    /// No type is registered under the requested tag.
    #[error("No type registered for tag {0}")]
    TypeNotFound(TypeTag),

    /// A symbolic type reference could not be resolved to a live type record.
    ///
    /// This is reported by `post_init` when a field, base class, pointee or array
    /// element names a tag that was never registered. It indicates corrupt or
    /// incomplete metadata; the registry is not usable for save/load until fixed.
    #[error("Unresolved type reference {0}")]
    UnresolvedType(TypeTag),

    /// An operation that requires resolved cross-references ran before `post_init`.
    ///
    /// The registry follows a strict build-then-read-only protocol: register all
    /// types, call [`crate::TypeRegistry::post_init`], then save/load/instantiate.
    #[error("Registry has not been resolved, call post_init() after registration")]
    RegistryNotResolved,

    /// A class-only operation was applied to a type of a different reflection kind.
    #[error("Type '{0}' is not a class")]
    NotAClass(String),

    /// A class reached by save traversal carries a field marked `NO_SERIALIZE`.
    #[error("Type '{0}' is not load-in-place serializable")]
    NotSerializable(String),

    /// A field lookup by name found nothing in the class or its base chain.
    #[error("Field '{0}' not found")]
    FieldNotFound(String),

    /// The class declares an instance hook in its metadata, but no function has
    /// been bound for it via [`crate::TypeRegistry::bind_instance_hooks`].
    #[error("No instance hook bound for type '{0}'")]
    HookUnbound(String),

    /// The image's stored root type tag disagrees with the requested type.
    #[error("Image root type {actual} does not match expected type {expected}")]
    TypeMismatch {
        /// The tag the caller asked for
        expected: TypeTag,
        /// The tag stored in the image header
        actual: TypeTag,
    },

    /// The image's stored version disagrees with the caller's expected version.
    ///
    /// Passing an expected version of 0 disables the gate.
    #[error("Image version {actual} does not match expected version {expected}")]
    VersionMismatch {
        /// The version the caller expects
        expected: u32,
        /// The version stored in the image header
        actual: u32,
    },

    /// The captured graph produced more pointer fixups than the image format's
    /// 16-bit count field can represent.
    #[error("Graph requires {0} pointer fixups, format limit is 65535")]
    FixupOverflow(usize),

    /// The input data is damaged and could not be parsed.
    ///
    /// Covers malformed descriptor files and corrupt object images, including
    /// fixup offsets that leave the image's byte range. The error carries the
    /// source location where the malformation was detected.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while parsing the input.
    ///
    /// This is a safety check to prevent buffer overruns when reading data beyond
    /// the end of a descriptor or image buffer.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// Underlying stream I/O failure, propagated from the standard library.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
