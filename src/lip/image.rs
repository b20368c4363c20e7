//! The load-in-place object image format.
//!
//! An image is one self-contained byte blob:
//!
//! ```text
//! Header: uint32 typeTag; uint32 size; uint32 version; uint16 numPointerFixups
//! Fixup[numPointerFixups]: uint32 pointerOffset; uint32 pointerValueOffset;
//!                          uint32 dispatchTypeTag (0 = none)
//! RawBytes[size]
//! ```
//!
//! All integers are fixed-width little-endian, written field by field with no struct
//! padding. The raw bytes hold the root object at offset 0 followed by every object it
//! transitively points to, in capture discovery order.
//!
//! Every offset in the fixup table is relative to, and must resolve within, this same
//! image - no fixup ever references memory outside the blob. [`PointerFixup::validate`]
//! enforces that invariant before the loader dereferences anything.

use std::io::{Read, Write};

use crate::{
    file::io::{read_le_at, write_le_at},
    reflection::TypeTag,
    Result,
};

/// Encoded image header size in bytes.
pub const HEADER_SIZE: usize = 14;

/// Encoded fixup entry size in bytes.
pub const FIXUP_SIZE: usize = 12;

/// Width of a pointer slot inside the raw bytes.
pub(crate) const POINTER_SIZE: usize = std::mem::size_of::<usize>();

/// Alignment of the allocation the loader reconstructs an image into.
pub const IMAGE_ALIGN: usize = 16;

/// Read exactly `buf.len()` bytes, mapping a premature end of stream to a malformed
/// image instead of a bare I/O error.
pub(crate) fn read_exact_checked(
    input: &mut impl Read,
    buf: &mut [u8],
    what: &str,
) -> Result<()> {
    input.read_exact(buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            malformed_error!("image ended while reading {}", what)
        } else {
            crate::Error::Io(e)
        }
    })
}

/// The fixed-size header that leads every object image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageHeader {
    /// Tag of the root object's class.
    pub type_tag: TypeTag,
    /// Total raw byte size: root object plus every captured region.
    pub size: u32,
    /// Caller-defined compatibility tag, checked by the loader when non-zero.
    pub version: u32,
    /// Number of fixup entries that follow the header.
    pub num_fixups: u16,
}

impl ImageHeader {
    /// Decode a header from a stream.
    ///
    /// # Errors
    /// [`crate::Error::Malformed`] if the stream ends early, [`crate::Error::Io`] for
    /// other read failures.
    pub fn read_from(input: &mut impl Read) -> Result<ImageHeader> {
        let mut buf = [0u8; HEADER_SIZE];
        read_exact_checked(input, &mut buf, "header")?;

        let mut offset = 0;
        Ok(ImageHeader {
            type_tag: TypeTag::new(read_le_at::<u32>(&buf, &mut offset)?),
            size: read_le_at::<u32>(&buf, &mut offset)?,
            version: read_le_at::<u32>(&buf, &mut offset)?,
            num_fixups: read_le_at::<u16>(&buf, &mut offset)?,
        })
    }

    /// Encode the header to a stream.
    ///
    /// # Errors
    /// [`crate::Error::Io`] on write failure.
    pub fn write_to(&self, out: &mut impl Write) -> Result<()> {
        let mut buf = [0u8; HEADER_SIZE];
        let mut offset = 0;
        write_le_at(&mut buf, &mut offset, self.type_tag.value())?;
        write_le_at(&mut buf, &mut offset, self.size)?;
        write_le_at(&mut buf, &mut offset, self.version)?;
        write_le_at(&mut buf, &mut offset, self.num_fixups)?;
        out.write_all(&buf)?;
        Ok(())
    }
}

/// One pointer-patching instruction.
///
/// At load time the slot at `base + pointer_offset` receives the address
/// `base + pointer_value_offset`. A non-zero `dispatch_tag` additionally asks the loader
/// to reinstall that class's dispatch table at the target address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PointerFixup {
    /// Offset of the pointer slot within the raw bytes.
    pub pointer_offset: u32,
    /// Offset of the data the slot must point to.
    pub pointer_value_offset: u32,
    /// Class whose dispatch table the target needs, or [`TypeTag::NONE`].
    pub dispatch_tag: TypeTag,
}

impl PointerFixup {
    /// Decode a fixup entry from a stream.
    ///
    /// # Errors
    /// [`crate::Error::Malformed`] if the stream ends early, [`crate::Error::Io`] for
    /// other read failures.
    pub fn read_from(input: &mut impl Read) -> Result<PointerFixup> {
        let mut buf = [0u8; FIXUP_SIZE];
        read_exact_checked(input, &mut buf, "fixup table")?;

        let mut offset = 0;
        Ok(PointerFixup {
            pointer_offset: read_le_at::<u32>(&buf, &mut offset)?,
            pointer_value_offset: read_le_at::<u32>(&buf, &mut offset)?,
            dispatch_tag: TypeTag::new(read_le_at::<u32>(&buf, &mut offset)?),
        })
    }

    /// Encode the fixup entry to a stream.
    ///
    /// # Errors
    /// [`crate::Error::Io`] on write failure.
    pub fn write_to(&self, out: &mut impl Write) -> Result<()> {
        let mut buf = [0u8; FIXUP_SIZE];
        let mut offset = 0;
        write_le_at(&mut buf, &mut offset, self.pointer_offset)?;
        write_le_at(&mut buf, &mut offset, self.pointer_value_offset)?;
        write_le_at(&mut buf, &mut offset, self.dispatch_tag.value())?;
        out.write_all(&buf)?;
        Ok(())
    }

    /// Check both offsets against the image's byte range.
    ///
    /// The slot needs room for a full pointer; the target must lie inside the image.
    ///
    /// # Errors
    /// [`crate::Error::Malformed`] for any out-of-range offset.
    pub fn validate(&self, image_size: u32) -> Result<()> {
        let slot_end = self
            .pointer_offset
            .checked_add(POINTER_SIZE as u32)
            .filter(|&end| end <= image_size);
        if slot_end.is_none() {
            return Err(malformed_error!(
                "fixup slot at offset {} escapes image of {} bytes",
                self.pointer_offset,
                image_size
            ));
        }
        if self.pointer_value_offset >= image_size {
            return Err(malformed_error!(
                "fixup target at offset {} escapes image of {} bytes",
                self.pointer_value_offset,
                image_size
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_roundtrip_is_packed() {
        let header = ImageHeader {
            type_tag: TypeTag::new(0xAABBCCDD),
            size: 0x100,
            version: 3,
            num_fixups: 7,
        };

        let mut bytes = Vec::new();
        header.write_to(&mut bytes).unwrap();
        assert_eq!(bytes.len(), HEADER_SIZE);
        assert_eq!(&bytes[..4], &[0xDD, 0xCC, 0xBB, 0xAA]);

        let decoded = ImageHeader::read_from(&mut bytes.as_slice()).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn fixup_roundtrip() {
        let fixup = PointerFixup {
            pointer_offset: 0x20,
            pointer_value_offset: 0x40,
            dispatch_tag: TypeTag::from_name("Sprite"),
        };

        let mut bytes = Vec::new();
        fixup.write_to(&mut bytes).unwrap();
        assert_eq!(bytes.len(), FIXUP_SIZE);

        let decoded = PointerFixup::read_from(&mut bytes.as_slice()).unwrap();
        assert_eq!(decoded, fixup);
    }

    #[test]
    fn truncated_header_is_malformed() {
        let bytes = [0u8; HEADER_SIZE - 1];
        assert!(matches!(
            ImageHeader::read_from(&mut bytes.as_slice()),
            Err(crate::Error::Malformed { .. })
        ));
    }

    #[test]
    fn validate_accepts_in_range() {
        let fixup = PointerFixup {
            pointer_offset: 0,
            pointer_value_offset: 63,
            dispatch_tag: TypeTag::NONE,
        };
        fixup.validate(64).unwrap();
    }

    #[test]
    fn validate_rejects_slot_escape() {
        let fixup = PointerFixup {
            pointer_offset: 60,
            pointer_value_offset: 0,
            dispatch_tag: TypeTag::NONE,
        };
        // Slot needs a full pointer's width.
        assert!(matches!(
            fixup.validate(64),
            Err(crate::Error::Malformed { .. })
        ));
    }

    #[test]
    fn validate_rejects_target_escape() {
        let fixup = PointerFixup {
            pointer_offset: 0,
            pointer_value_offset: 64,
            dispatch_tag: TypeTag::NONE,
        };
        assert!(matches!(
            fixup.validate(64),
            Err(crate::Error::Malformed { .. })
        ));
    }

    #[test]
    fn validate_rejects_offset_overflow() {
        let fixup = PointerFixup {
            pointer_offset: u32::MAX - 2,
            pointer_value_offset: 0,
            dispatch_tag: TypeTag::NONE,
        };
        assert!(fixup.validate(u32::MAX).is_err());
    }
}
