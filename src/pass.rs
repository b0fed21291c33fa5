//! Passes and the chaining pass builder.

use std::fmt;

use bumpalo::collections::Vec as BumpVec;

use crate::arena::FrameArena;
use crate::graph::RenderGraph;
use crate::resource::{Access, ResourceId, VersionHandle};
use crate::task::{FnTask, Task};

/// Type of GPU work a pass performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassType {
    /// Rasterization work (vertex/fragment shaders).
    Graphics,
    /// Compute shader dispatches.
    Compute,
    /// Copy operations.
    Transfer,
}

/// Handle to a pass in the render graph.
///
/// `PassHandle` is `Copy` and cheap to pass around. It is only valid within
/// the [`RenderGraph`](crate::RenderGraph) that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PassHandle(u32);

impl PassHandle {
    pub(crate) fn new(index: u32) -> Self {
        Self(index)
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A named unit of GPU work owned by one graph for one frame.
///
/// Passes are created only through [`RenderGraph::add_pass`] and configured
/// through the returned [`PassMut`]. During execution, plugins receive `&Pass`
/// at the pass-begin/pass-end boundaries and can inspect it through the
/// accessors here.
pub struct Pass<'fr> {
    handle: PassHandle,
    pass_type: PassType,
    name: &'fr str,
    /// Declared resource uses, in declaration order.
    pub(crate) resources: BumpVec<'fr, (VersionHandle, Access)>,
    /// Explicit ordering edges not derivable from resource usage.
    pub(crate) dependencies: BumpVec<'fr, PassHandle>,
    /// Deferred work, run in FIFO order.
    pub(crate) tasks: BumpVec<'fr, crate::task::BoxedTask<'fr>>,
    /// Reachable backward from a frame output.
    pub(crate) live: bool,
    /// Tasks have run and the task list is drained.
    pub(crate) executed: bool,
}

impl<'fr> Pass<'fr> {
    pub(crate) fn new(
        handle: PassHandle,
        pass_type: PassType,
        name: &'fr str,
        arena: &'fr FrameArena,
    ) -> Self {
        Self {
            handle,
            pass_type,
            name,
            resources: BumpVec::new_in(arena.bump()),
            dependencies: BumpVec::new_in(arena.bump()),
            tasks: BumpVec::new_in(arena.bump()),
            live: false,
            executed: false,
        }
    }

    /// Handle of this pass within its graph.
    pub fn handle(&self) -> PassHandle {
        self.handle
    }

    /// Display name, for diagnostics and debug markers.
    pub fn name(&self) -> &str {
        self.name
    }

    /// Type of GPU work this pass performs.
    pub fn pass_type(&self) -> PassType {
        self.pass_type
    }

    /// Number of declared resource uses.
    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    /// Explicit dependencies added through [`PassMut::add_dependency`].
    pub fn explicit_dependencies(&self) -> &[PassHandle] {
        &self.dependencies
    }

    /// Number of tasks still queued on this pass.
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Check if this pass has no queued tasks.
    ///
    /// An empty pass is legal (it may exist purely to insert a dependency
    /// edge); emptiness is a diagnostic hint, never a scheduling rule.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Check if this pass was reached backward from a frame output.
    ///
    /// Meaningful once scheduling has run; plugins observe it during
    /// execution hooks.
    pub fn is_live(&self) -> bool {
        self.live
    }

    /// Check if this pass already ran its tasks.
    pub fn is_executed(&self) -> bool {
        self.executed
    }
}

impl fmt::Debug for Pass<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pass")
            .field("name", &self.name)
            .field("pass_type", &self.pass_type)
            .field("resources", &self.resources.len())
            .field("dependencies", &self.dependencies.len())
            .field("tasks", &self.tasks.len())
            .field("live", &self.live)
            .field("executed", &self.executed)
            .finish()
    }
}

/// Chaining builder for a freshly created (or re-opened) pass.
///
/// Returned by [`RenderGraph::add_pass`] and [`RenderGraph::pass_mut`]. Every
/// mutation returns the builder again:
///
/// ```
/// use framegraph::{Access, FrameArena, PassType, RenderGraph, ResourceId};
///
/// let arena = FrameArena::new();
/// let mut graph = RenderGraph::new(&arena);
/// let gbuffer = ResourceId::from_raw(10);
///
/// graph
///     .add_pass(PassType::Graphics, "gbuffer")
///     .add_resource(gbuffer, Access::RENDER_TARGET)
///     .add_func(|| { /* record draws */ });
/// ```
pub struct PassMut<'g, 'fr> {
    pub(crate) graph: &'g mut RenderGraph<'fr>,
    pub(crate) handle: PassHandle,
}

impl<'g, 'fr> PassMut<'g, 'fr> {
    /// Handle of the pass being built.
    pub fn handle(&self) -> PassHandle {
        self.handle
    }

    /// Declare that this pass reads or writes `resource`.
    ///
    /// A write access mints a new resource version produced by this pass; a
    /// read access resolves to the resource's current version and records a
    /// dependency on its producer, if any.
    pub fn add_resource(self, resource: ResourceId, access: Access) -> Self {
        self.graph.record_resource(self.handle, resource, access);
        self
    }

    /// Add an ordering edge not derivable from resource usage.
    ///
    /// Useful for non-resource side effects such as readback timing. The
    /// dependency must already exist in the graph, which is what makes
    /// explicit edges acyclic by construction.
    pub fn add_dependency(self, dependency: PassHandle) -> Self {
        self.graph.record_dependency(self.handle, dependency);
        self
    }

    /// Append a task to this pass's FIFO task list.
    pub fn add_task<T: Task + 'fr>(self, task: T) -> Self {
        self.graph.record_task(self.handle, task);
        self
    }

    /// Append a closure as a task.
    pub fn add_func(self, func: impl FnOnce() + 'fr) -> Self {
        self.graph.record_task(self.handle, FnTask::new(func));
        self
    }
}

static_assertions::assert_impl_all!(PassHandle: Copy, Send, Sync);
static_assertions::assert_impl_all!(PassType: Copy, Send, Sync);
