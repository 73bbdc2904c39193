//! Block and chunk coordinates

use glam::IVec3;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Chunk edge length is `1 << CHUNK_SHIFT` blocks
pub const CHUNK_SHIFT: i32 = 4;

const PACKED_XZ_BITS: u32 = 26;
const PACKED_Y_BITS: u32 = 12;
const PACKED_X_SHIFT: u32 = PACKED_Y_BITS + PACKED_XZ_BITS;
const PACKED_Z_SHIFT: u32 = PACKED_Y_BITS;
const PACKED_XZ_MASK: i64 = (1 << PACKED_XZ_BITS) - 1;
const PACKED_Y_MASK: i64 = (1 << PACKED_Y_BITS) - 1;

/// Absolute position of a single world cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const ORIGIN: BlockPos = BlockPos { x: 0, y: 0, z: 0 };

    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Position shifted by a relative offset
    pub fn offset(self, delta: IVec3) -> Self {
        Self::from(self.as_ivec3() + delta)
    }

    pub fn as_ivec3(self) -> IVec3 {
        IVec3::new(self.x, self.y, self.z)
    }

    /// Chunk column containing this position
    pub fn chunk(self) -> ChunkPos {
        ChunkPos::new(self.x >> CHUNK_SHIFT, self.z >> CHUNK_SHIFT)
    }

    /// Pack into a single `i64` (26 bits x, 26 bits z, 12 bits y).
    ///
    /// Lossless for |x|, |z| < 2^25 and |y| < 2^11.
    pub fn as_long(self) -> i64 {
        ((self.x as i64 & PACKED_XZ_MASK) << PACKED_X_SHIFT)
            | ((self.z as i64 & PACKED_XZ_MASK) << PACKED_Z_SHIFT)
            | (self.y as i64 & PACKED_Y_MASK)
    }

    /// Inverse of [`BlockPos::as_long`]
    pub fn from_long(packed: i64) -> Self {
        let x = packed >> PACKED_X_SHIFT;
        let y = (packed << (64 - PACKED_Y_BITS)) >> (64 - PACKED_Y_BITS);
        let z = (packed << (64 - PACKED_X_SHIFT)) >> (64 - PACKED_XZ_BITS);
        Self::new(x as i32, y as i32, z as i32)
    }
}

impl From<IVec3> for BlockPos {
    fn from(v: IVec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl From<BlockPos> for IVec3 {
    fn from(pos: BlockPos) -> Self {
        pos.as_ivec3()
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Horizontal chunk column coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Whether `pos` lies inside this chunk column
    pub fn contains(self, pos: BlockPos) -> bool {
        pos.chunk() == self
    }
}

impl fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.x, self.z)
    }
}
