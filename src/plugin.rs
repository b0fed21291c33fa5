//! Frame and pass lifecycle hooks.
//!
//! Plugins observe a graph's execution without participating in scheduling.
//! Typical uses live outside this crate: GPU timing queries around passes,
//! debug-marker injection, schedule capture for tooling. Hooks default to
//! no-ops; a plugin overrides only the boundaries it cares about.
//!
//! Plugins are registered per-graph (so per-frame) with
//! [`RenderGraph::add_plugin`](crate::RenderGraph::add_plugin) and are invoked
//! in registration order, only inside
//! [`RenderGraph::execute`](crate::RenderGraph::execute).

use crate::graph::RenderGraph;
use crate::pass::Pass;

/// Observer invoked at frame and pass boundaries.
///
/// ```
/// use framegraph::{Pass, Plugin, RenderGraph};
///
/// struct MarkerPlugin;
///
/// impl Plugin for MarkerPlugin {
///     fn on_pass_begin(&mut self, pass: &Pass<'_>) {
///         log::trace!("begin {}", pass.name());
///     }
///     fn on_pass_end(&mut self, pass: &Pass<'_>) {
///         log::trace!("end {}", pass.name());
///     }
/// }
/// ```
#[allow(unused_variables)]
pub trait Plugin {
    /// Called once before any pass runs, after the schedule is built.
    fn on_frame_begin(&mut self, graph: &RenderGraph<'_>) {}

    /// Called once after the last pass ran.
    fn on_frame_end(&mut self, graph: &RenderGraph<'_>) {}

    /// Called before each scheduled pass runs its tasks.
    fn on_pass_begin(&mut self, pass: &Pass<'_>) {}

    /// Called after each scheduled pass ran its tasks.
    ///
    /// The pass's task list is already drained at this point.
    fn on_pass_end(&mut self, pass: &Pass<'_>) {}
}
