//! Packed 64-bit resource handles.
//!
//! Keeps the bit layout exactly as specified so that a handle value remains meaningful
//! purely as an integer: bits 0-28 index, bits 29-31 transient registry id, bits 32-39
//! flags, bits 40-47 generation (persistent) / frame tag (transient), bits 48-55 resource
//! kind. This mirrors the `#[repr(transparent)]` newtype-handle idiom this codebase
//! already uses (`render::handle::{Buffer, Image, ...}`), generalised to a single packed
//! integer instead of one newtype per resource kind, since the frame graph needs to pack
//! generation/flag/kind bits the original newtypes didn't carry.

use bitflags::bitflags;

const INDEX_BITS: u32 = 29;
const INDEX_SHIFT: u32 = 0;
const INDEX_MASK: u64 = (1 << INDEX_BITS) - 1;

const TRANSIENT_ID_BITS: u32 = 3;
const TRANSIENT_ID_SHIFT: u32 = INDEX_SHIFT + INDEX_BITS;
const TRANSIENT_ID_MASK: u64 = (1 << TRANSIENT_ID_BITS) - 1;

const FLAGS_BITS: u32 = 8;
const FLAGS_SHIFT: u32 = TRANSIENT_ID_SHIFT + TRANSIENT_ID_BITS;
const FLAGS_MASK: u64 = (1 << FLAGS_BITS) - 1;

const GENERATION_BITS: u32 = 8;
const GENERATION_SHIFT: u32 = FLAGS_SHIFT + FLAGS_BITS;
const GENERATION_MASK: u64 = (1 << GENERATION_BITS) - 1;

const KIND_BITS: u32 = 8;
const KIND_SHIFT: u32 = GENERATION_SHIFT + GENERATION_BITS;
const KIND_MASK: u64 = (1 << KIND_BITS) - 1;

/// What a resource handle refers to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ResourceKind {
    Buffer = 0,
    Texture = 1,
    Sampler = 2,
    ArgumentBuffer = 3,
    ArgumentBufferArray = 4,
    ThreadgroupMemory = 5,
}

impl ResourceKind {
    fn from_bits(v: u8) -> ResourceKind {
        match v {
            0 => ResourceKind::Buffer,
            1 => ResourceKind::Texture,
            2 => ResourceKind::Sampler,
            3 => ResourceKind::ArgumentBuffer,
            4 => ResourceKind::ArgumentBufferArray,
            5 => ResourceKind::ThreadgroupMemory,
            other => panic!("invalid resource kind bits in handle: {}", other),
        }
    }
}

bitflags! {
    /// Per-handle flags, packed into bits 32-39.
    pub struct Flags: u8 {
        const PERSISTENT                 = 0b0000_0001;
        const WINDOW_HANDLE               = 0b0000_0010;
        const HISTORY_BUFFER              = 0b0000_0100;
        const IMMUTABLE_ONCE_INITIALISED  = 0b0000_1000;
        const EXTERNAL_OWNERSHIP          = 0b0001_0000;
        const RESOURCE_VIEW               = 0b0010_0000;
    }
}

/// A packed 64-bit reference to a resource record in a registry.
///
/// Validity is checked against the owning registry: a persistent handle is valid while
/// its generation matches the record's current generation; a transient handle is valid
/// while its low frame-tag bits match the frame graph's current frame tag (see
/// `registry::TransientRegistry::is_valid`).
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Handle(u64);

impl Handle {
    pub fn new(
        index: u32,
        transient_registry_id: u8,
        flags: Flags,
        generation_or_frame_tag: u8,
        kind: ResourceKind,
    ) -> Handle {
        assert!(
            (index as u64) <= INDEX_MASK,
            "resource index {} overflows {} bits",
            index,
            INDEX_BITS
        );
        assert!(
            (transient_registry_id as u64) <= TRANSIENT_ID_MASK,
            "transient registry id {} overflows {} bits",
            transient_registry_id,
            TRANSIENT_ID_BITS
        );
        let bits = ((index as u64) & INDEX_MASK) << INDEX_SHIFT
            | ((transient_registry_id as u64) & TRANSIENT_ID_MASK) << TRANSIENT_ID_SHIFT
            | ((flags.bits() as u64) & FLAGS_MASK) << FLAGS_SHIFT
            | ((generation_or_frame_tag as u64) & GENERATION_MASK) << GENERATION_SHIFT
            | ((kind as u64) & KIND_MASK) << KIND_SHIFT;
        Handle(bits)
    }

    pub fn index(self) -> u32 {
        ((self.0 >> INDEX_SHIFT) & INDEX_MASK) as u32
    }

    pub fn transient_registry_id(self) -> u8 {
        ((self.0 >> TRANSIENT_ID_SHIFT) & TRANSIENT_ID_MASK) as u8
    }

    pub fn flags(self) -> Flags {
        Flags::from_bits_truncate(((self.0 >> FLAGS_SHIFT) & FLAGS_MASK) as u8)
    }

    pub fn generation_or_frame_tag(self) -> u8 {
        ((self.0 >> GENERATION_SHIFT) & GENERATION_MASK) as u8
    }

    pub fn kind(self) -> ResourceKind {
        ResourceKind::from_bits(((self.0 >> KIND_SHIFT) & KIND_MASK) as u8)
    }

    pub fn is_persistent(self) -> bool {
        self.flags().contains(Flags::PERSISTENT)
    }

    /// Splits the packed index into `(chunk_index, index_in_chunk)` for a registry with
    /// the given chunk size, per §4.A.
    pub fn chunk_coordinates(self, chunk_size: u32) -> (u32, u32) {
        let idx = self.index();
        (idx / chunk_size, idx % chunk_size)
    }

    pub(crate) fn bits(self) -> u64 {
        self.0
    }
}

impl std::fmt::Debug for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Handle")
            .field("index", &self.index())
            .field("kind", &self.kind())
            .field("flags", &self.flags())
            .field("generation_or_frame_tag", &self.generation_or_frame_tag())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_field() {
        let h = Handle::new(12345, 5, Flags::PERSISTENT | Flags::WINDOW_HANDLE, 200, ResourceKind::Texture);
        assert_eq!(h.index(), 12345);
        assert_eq!(h.transient_registry_id(), 5);
        assert_eq!(h.flags(), Flags::PERSISTENT | Flags::WINDOW_HANDLE);
        assert_eq!(h.generation_or_frame_tag(), 200);
        assert_eq!(h.kind(), ResourceKind::Texture);
        assert!(h.is_persistent());
    }

    #[test]
    fn chunk_coordinates_split_by_division() {
        let h = Handle::new(257, 0, Flags::empty(), 0, ResourceKind::Buffer);
        assert_eq!(h.chunk_coordinates(256), (1, 1));
    }

    #[test]
    #[should_panic]
    fn index_overflow_panics() {
        Handle::new(1 << 29, 0, Flags::empty(), 0, ResourceKind::Buffer);
    }
}
