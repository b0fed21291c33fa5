//! Frame-scoped arena allocation.
//!
//! All graph-owned objects (passes, resource versions, tasks) live exactly one
//! frame and are freed in bulk. [`FrameArena`] wraps a bump allocator that the
//! surrounding frame loop owns and resets once the graph built on top of it
//! has finished executing. `reset` takes `&mut self`, so the borrow checker
//! rejects any graph that would outlive its frame.

use bumpalo::Bump;

/// Bump allocator backing one frame's worth of graph objects.
///
/// # Lifecycle
///
/// ```
/// use framegraph::{FrameArena, RenderGraph};
///
/// let mut arena = FrameArena::new();
/// loop {
///     let graph = RenderGraph::new(&arena);
///     // build and execute the graph...
///     graph.execute();
///     arena.reset();
///     # break;
/// }
/// ```
#[derive(Debug)]
pub struct FrameArena {
    bump: Bump,
}

impl FrameArena {
    /// Create a new empty arena.
    pub fn new() -> Self {
        Self { bump: Bump::new() }
    }

    /// Create an arena with `bytes` of pre-allocated capacity.
    ///
    /// Sizing the arena for a typical frame up front avoids chunk growth on
    /// the hot path.
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            bump: Bump::with_capacity(bytes),
        }
    }

    /// Reclaim every allocation made this frame.
    ///
    /// Requires exclusive access, which guarantees no graph built on this
    /// arena is still alive. The largest backing chunk is retained, so
    /// steady-state frames allocate without touching the system allocator.
    pub fn reset(&mut self) {
        self.bump.reset();
    }

    /// Allocation footprint of this arena's chunks.
    ///
    /// Follows the underlying allocator's accounting: because `reset` keeps
    /// the largest chunk for reuse, the footprint stays non-zero once the
    /// arena has warmed up.
    pub fn allocated_bytes(&self) -> usize {
        self.bump.allocated_bytes()
    }

    pub(crate) fn bump(&self) -> &Bump {
        &self.bump
    }
}

impl Default for FrameArena {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocations_grow_arena() {
        let arena = FrameArena::new();
        let before = arena.allocated_bytes();
        arena.bump().alloc_str("frame-local string");
        assert!(arena.allocated_bytes() > before);
    }

    #[test]
    fn test_footprint_is_stable_across_frames() {
        let mut arena = FrameArena::with_capacity(4096);
        for i in 0..64 {
            arena.bump().alloc(i as u64);
        }
        arena.reset();
        let footprint = arena.allocated_bytes();
        for _ in 0..8 {
            for i in 0..64 {
                arena.bump().alloc(i as u64);
            }
            arena.reset();
        }
        // Reset keeps the backing chunk: identical frames must not grow it.
        assert_eq!(arena.allocated_bytes(), footprint);
    }
}
