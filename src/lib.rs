//! Per-frame GPU render dependency graph.
//!
//! The renderer's frame is declared, not executed, during scene traversal:
//! each visited system creates [passes](Pass) on a [`RenderGraph`], declares
//! which GPU resources the pass reads and writes, and queues the command
//! recording work as [tasks](Task). At the end of traversal the graph knows
//! the whole frame, so it can do what immediate submission cannot:
//!
//! - **Dependency discovery**: resource accesses are translated into
//!   dependency edges through per-resource version chains. Writes mint new
//!   versions, reads resolve to the current one, and hazards (read-after-write,
//!   write-after-write, write-after-read) become ordinary edges.
//! - **Dead-pass pruning**: only passes reachable backward from the declared
//!   frame [outputs](RenderGraph::add_output) execute. Work nothing observes
//!   is skipped wholesale.
//! - **Stable scheduling**: live passes run ordered by dependency depth, with
//!   registration order breaking ties. The same declarations always produce
//!   the same schedule.
//!
//! Graphs are single-use: one [`FrameArena`] and one graph per frame,
//! [`RenderGraph::execute`] consumes the graph, and the arena is reset for
//! the next frame.
//!
//! # Example
//!
//! ```
//! use framegraph::{Access, FrameArena, PassType, RenderGraph, ResourceId};
//!
//! let arena = FrameArena::new();
//! let mut graph = RenderGraph::new(&arena);
//!
//! let shadow_map = ResourceId::from_raw(1);
//! let backbuffer = ResourceId::from_raw(2);
//!
//! graph
//!     .add_pass(PassType::Graphics, "shadow")
//!     .add_resource(shadow_map, Access::DEPTH_STENCIL)
//!     .add_func(|| { /* record shadow draws */ });
//!
//! graph
//!     .add_pass(PassType::Graphics, "lighting")
//!     .add_resource(shadow_map, Access::SHADER_RESOURCE)
//!     .add_resource(backbuffer, Access::RENDER_TARGET)
//!     .add_func(|| { /* record lighting draws */ });
//!
//! // A pass no output depends on never runs.
//! graph
//!     .add_pass(PassType::Compute, "debug histogram")
//!     .add_func(|| unreachable!());
//!
//! graph.add_output(backbuffer);
//! assert!(graph.execute());
//! ```

pub mod arena;
pub mod graph;
pub mod pass;
pub mod plugin;
pub mod resource;
pub mod task;

pub use arena::FrameArena;
pub use graph::RenderGraph;
pub use pass::{Pass, PassHandle, PassMut, PassType};
pub use plugin::Plugin;
pub use resource::{Access, ResourceId, ResourceVersion, VersionHandle};
pub use task::Task;

/// Crate version, for diagnostics.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
