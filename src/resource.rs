//! External resource identity, access declarations, and version tracking.
//!
//! The graph never owns GPU objects. A [`ResourceId`] is the stable identity
//! of a texture or buffer handed out by the engine's resource pool; the graph
//! only records how passes touch it. Every write access mints an immutable
//! [`ResourceVersion`] linked to the previous one, turning read-after-write
//! and write-after-write hazards into ordinary graph edges without any caller
//! reasoning about barriers.

use bitflags::bitflags;
use bumpalo::collections::Vec as BumpVec;

use crate::arena::FrameArena;
use crate::pass::PassHandle;

/// Identity of an external GPU resource (texture or buffer).
///
/// The resource pool guarantees the identity is stable for the duration of
/// the frame. `ResourceId` is only a key; the graph never dereferences it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(u64);

impl ResourceId {
    /// Create an identity from a raw pool handle.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Derive an identity from an object's address.
    ///
    /// Matches pools that key resources by pointer. The object must stay
    /// pinned at that address for the whole frame.
    pub fn from_addr<T>(object: &T) -> Self {
        Self(object as *const T as usize as u64)
    }

    /// Get the raw identity value.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

bitflags! {
    /// How a pass accesses a resource.
    ///
    /// Mirrors the RHI access states: the low bits are read states, the high
    /// bits are write states. Storage, render-target, and depth-stencil
    /// accesses appear in both masks because the GPU may read back what it
    /// writes (blending, depth test, in-place compute).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Access: u32 {
        /// Read as indirect draw/dispatch arguments.
        const INDIRECT_ARGS = 1 << 0;
        /// Read as vertex buffer data.
        const VERTEX_BUFFER = 1 << 1;
        /// Read as index buffer data.
        const INDEX_BUFFER = 1 << 2;
        /// Read as uniform buffer data.
        const UNIFORM_BUFFER = 1 << 3;
        /// Sampled or fetched in a shader (SRV).
        const SHADER_RESOURCE = 1 << 4;
        /// Source of a copy operation.
        const COPY_SRC = 1 << 5;

        /// Destination of a copy operation.
        const COPY_DST = 1 << 6;
        /// Read/write as storage texture or buffer (UAV).
        const STORAGE = 1 << 7;
        /// Written as color render target.
        const RENDER_TARGET = 1 << 8;
        /// Written as depth/stencil attachment.
        const DEPTH_STENCIL = 1 << 9;

        /// Every access state the GPU reads through.
        const READ_MASK = Self::INDIRECT_ARGS.bits()
            | Self::VERTEX_BUFFER.bits()
            | Self::INDEX_BUFFER.bits()
            | Self::UNIFORM_BUFFER.bits()
            | Self::SHADER_RESOURCE.bits()
            | Self::COPY_SRC.bits()
            | Self::STORAGE.bits()
            | Self::RENDER_TARGET.bits()
            | Self::DEPTH_STENCIL.bits();

        /// Every access state the GPU writes through.
        const WRITE_MASK = Self::COPY_DST.bits()
            | Self::STORAGE.bits()
            | Self::RENDER_TARGET.bits()
            | Self::DEPTH_STENCIL.bits();
    }
}

impl Access {
    /// Check if this access reads the resource.
    pub fn is_read(self) -> bool {
        self.intersects(Self::READ_MASK)
    }

    /// Check if this access writes the resource.
    ///
    /// A write access mints a new resource version with the declaring pass
    /// as producer.
    pub fn is_write(self) -> bool {
        self.intersects(Self::WRITE_MASK)
    }
}

/// Handle to a resource version inside one graph.
///
/// Only valid within the [`RenderGraph`](crate::RenderGraph) that minted it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VersionHandle(u32);

impl VersionHandle {
    pub(crate) fn new(index: u32) -> Self {
        Self(index)
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Immutable snapshot of a resource's state at one point in the frame.
///
/// Versions form an append-only chain per resource: a write access mints a
/// new version whose `previous` link is the chain's prior last version. A
/// producer-less version represents the resource's pre-frame state and
/// contributes no dependency edge.
#[derive(Debug)]
pub struct ResourceVersion<'fr> {
    resource: ResourceId,
    producer: Option<PassHandle>,
    previous: Option<VersionHandle>,
    readers: BumpVec<'fr, PassHandle>,
}

impl<'fr> ResourceVersion<'fr> {
    pub(crate) fn new(
        resource: ResourceId,
        producer: Option<PassHandle>,
        previous: Option<VersionHandle>,
        arena: &'fr FrameArena,
    ) -> Self {
        Self {
            resource,
            producer,
            previous,
            readers: BumpVec::new_in(arena.bump()),
        }
    }

    /// Identity of the underlying GPU resource.
    pub fn resource(&self) -> ResourceId {
        self.resource
    }

    /// The pass that produced this version, or `None` for pre-frame state.
    pub fn producer(&self) -> Option<PassHandle> {
        self.producer
    }

    /// The version this one superseded, if any.
    pub fn previous(&self) -> Option<VersionHandle> {
        self.previous
    }

    /// Passes that consume this version.
    ///
    /// Used to order a later overwrite of the resource after its readers.
    pub fn readers(&self) -> &[PassHandle] {
        &self.readers
    }

    pub(crate) fn add_reader(&mut self, reader: PassHandle) {
        if !self.readers.contains(&reader) {
            self.readers.push(reader);
        }
    }
}

/// First and last version of one resource's chain this frame.
#[derive(Debug, Clone, Copy)]
pub(crate) struct VersionChain {
    #[allow(dead_code)]
    pub first: VersionHandle,
    pub last: VersionHandle,
}

static_assertions::assert_impl_all!(ResourceId: Copy, Send, Sync);
static_assertions::assert_impl_all!(Access: Copy, Send, Sync);
static_assertions::assert_impl_all!(VersionHandle: Copy, Send, Sync);
