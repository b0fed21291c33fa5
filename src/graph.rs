//! Per-frame render graph: build, prune, schedule, execute.
//!
//! [`RenderGraph`] is the per-frame root. Scene traversal creates passes and
//! declares their resource accesses; the access declarations mint resource
//! versions which carry the dependency edges. Once traversal registered the
//! frame outputs, [`RenderGraph::execute`] walks backward from the outputs,
//! prunes every pass whose results are never observed, orders the survivors
//! by dependency depth, and replays their tasks.
//!
//! # Scheduling
//!
//! The schedule is a backward reachability walk followed by a stable
//! topological ordering:
//!
//! 1. Each output resolves to its resource's final version; the version's
//!    producer is a root of the walk.
//! 2. Visiting a pass visits the producers of everything it reads, the
//!    producer of the version each of its writes superseded, and its
//!    explicit dependencies.
//! 3. Unvisited passes are dead: their tasks never run and they contribute no
//!    GPU cost. A pass that only reads a resource stays dead unless an output
//!    chain reaches it; a later overwrite of that resource does not revive it.
//! 4. Every live pass gets `depth = 1 + max(depth of dependencies)`
//!    (0 without dependencies), where a write additionally orders after the
//!    live readers of the version it supersedes; the schedule orders by depth
//!    ascending with registration order breaking ties, so identical input
//!    sequences always produce identical schedules.
//!
//! # One graph per frame
//!
//! A graph is created over a [`FrameArena`], populated, executed, and
//! discarded. [`RenderGraph::execute`] consumes the graph, so a second
//! execution is rejected at compile time, and `FrameArena::reset` cannot be
//! called while the graph is alive.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;

use bumpalo::collections::Vec as BumpVec;

use crate::arena::FrameArena;
use crate::pass::{Pass, PassHandle, PassMut, PassType};
use crate::plugin::Plugin;
use crate::resource::{Access, ResourceId, ResourceVersion, VersionChain, VersionHandle};
use crate::task::{box_task, Task};

/// The per-frame render dependency graph.
///
/// See the [module docs](self) for the execution model and
/// [`PassMut`] for pass construction.
pub struct RenderGraph<'fr> {
    arena: &'fr FrameArena,
    /// All passes created this frame, in registration order.
    passes: BumpVec<'fr, Pass<'fr>>,
    /// All resource versions minted this frame.
    versions: BumpVec<'fr, ResourceVersion<'fr>>,
    /// Per-resource version chains, keyed by external identity.
    chains: HashMap<ResourceId, VersionChain>,
    /// Resources whose final versions must be produced this frame.
    outputs: Vec<ResourceId>,
    /// Observers invoked at frame/pass boundaries, in registration order.
    plugins: Vec<Box<dyn Plugin + 'fr>>,
}

impl<'fr> RenderGraph<'fr> {
    /// Create an empty graph backed by `arena`.
    pub fn new(arena: &'fr FrameArena) -> Self {
        Self {
            arena,
            passes: BumpVec::new_in(arena.bump()),
            versions: BumpVec::new_in(arena.bump()),
            chains: HashMap::new(),
            outputs: Vec::new(),
            plugins: Vec::new(),
        }
    }

    /// The arena backing this graph's allocations.
    pub fn arena(&self) -> &'fr FrameArena {
        self.arena
    }

    /// Create and register a new pass.
    ///
    /// The returned [`PassMut`] configures the pass through chaining; its
    /// [`handle`](PassMut::handle) can re-open the pass later via
    /// [`pass_mut`](Self::pass_mut).
    pub fn add_pass(&mut self, pass_type: PassType, name: &str) -> PassMut<'_, 'fr> {
        let handle = PassHandle::new(self.passes.len() as u32);
        let name: &'fr str = self.arena.bump().alloc_str(name);
        log::trace!("add {pass_type:?} pass '{name}' as #{}", handle.index());
        self.passes
            .push(Pass::new(handle, pass_type, name, self.arena));
        PassMut {
            graph: self,
            handle,
        }
    }

    /// Re-open an existing pass for further configuration.
    ///
    /// # Panics
    ///
    /// Panics if `handle` does not belong to this graph.
    pub fn pass_mut(&mut self, handle: PassHandle) -> PassMut<'_, 'fr> {
        assert!(handle.index() < self.passes.len(), "invalid pass handle");
        PassMut {
            graph: self,
            handle,
        }
    }

    /// Get a pass by handle.
    ///
    /// # Panics
    ///
    /// Panics if `handle` does not belong to this graph.
    pub fn pass(&self, handle: PassHandle) -> &Pass<'fr> {
        assert!(handle.index() < self.passes.len(), "invalid pass handle");
        &self.passes[handle.index()]
    }

    /// All passes in registration order.
    pub fn passes(&self) -> &[Pass<'fr>] {
        &self.passes
    }

    /// Number of passes registered this frame.
    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    /// Number of resource versions minted this frame.
    pub fn version_count(&self) -> usize {
        self.versions.len()
    }

    /// Number of registered frame outputs.
    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// Check if no passes were registered.
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Mark `resource` as a frame output.
    ///
    /// Outputs are the roots of the backward reachability walk: the resource's
    /// final version this frame must be produced. An output that is never
    /// written this frame is not an error; it simply schedules nothing.
    pub fn add_output(&mut self, resource: ResourceId) -> &mut Self {
        if !self.outputs.contains(&resource) {
            self.outputs.push(resource);
        }
        self
    }

    /// Register a plugin, invoked in registration order during
    /// [`execute`](Self::execute).
    pub fn add_plugin<P: Plugin + 'fr>(&mut self, plugin: P) -> &mut Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    /// Number of registered plugins.
    pub fn plugin_count(&self) -> usize {
        self.plugins.len()
    }

    // ========================================================================
    // Resource version tracking
    // ========================================================================

    /// Mint a new version of `resource` produced by `writer`.
    fn writable_resource(&mut self, resource: ResourceId, writer: PassHandle) -> VersionHandle {
        let previous = self.chains.get(&resource).map(|chain| chain.last);
        let handle = VersionHandle::new(self.versions.len() as u32);
        self.versions.push(ResourceVersion::new(
            resource,
            Some(writer),
            previous,
            self.arena,
        ));
        match self.chains.entry(resource) {
            Entry::Occupied(mut entry) => entry.get_mut().last = handle,
            Entry::Vacant(entry) => {
                entry.insert(VersionChain {
                    first: handle,
                    last: handle,
                });
            }
        }
        handle
    }

    /// Resolve `resource` to its current version.
    ///
    /// A resource never written this frame resolves to a producer-less
    /// version carrying its pre-frame state, which contributes no edge.
    fn readable_resource(&mut self, resource: ResourceId) -> VersionHandle {
        if let Some(chain) = self.chains.get(&resource) {
            return chain.last;
        }
        let handle = VersionHandle::new(self.versions.len() as u32);
        self.versions
            .push(ResourceVersion::new(resource, None, None, self.arena));
        self.chains.insert(
            resource,
            VersionChain {
                first: handle,
                last: handle,
            },
        );
        handle
    }

    pub(crate) fn record_resource(
        &mut self,
        pass: PassHandle,
        resource: ResourceId,
        access: Access,
    ) {
        self.assert_not_executed(pass, "add_resource");
        let version = if access.is_write() {
            self.writable_resource(resource, pass)
        } else {
            self.readable_resource(resource)
        };
        if access.is_read() {
            // A read-write access consumes the version it just minted; the
            // edge to the prior state comes from the version's previous link.
            let version_data = &mut self.versions[version.index()];
            if version_data.producer() != Some(pass) {
                version_data.add_reader(pass);
            }
        }
        self.passes[pass.index()].resources.push((version, access));
    }

    pub(crate) fn record_dependency(&mut self, pass: PassHandle, dependency: PassHandle) {
        self.assert_not_executed(pass, "add_dependency");
        assert!(
            dependency.index() < self.passes.len(),
            "invalid dependency handle"
        );
        assert!(pass != dependency, "pass cannot depend on itself");
        let dependencies = &mut self.passes[pass.index()].dependencies;
        if !dependencies.contains(&dependency) {
            dependencies.push(dependency);
        }
    }

    pub(crate) fn record_task<T: Task + 'fr>(&mut self, pass: PassHandle, task: T) {
        self.assert_not_executed(pass, "add_task");
        let boxed = box_task(self.arena, task);
        self.passes[pass.index()].tasks.push(boxed);
    }

    fn assert_not_executed(&self, pass: PassHandle, operation: &str) {
        assert!(
            !self.passes[pass.index()].executed,
            "{operation} on pass '{}' after it executed",
            self.passes[pass.index()].name()
        );
    }

    // ========================================================================
    // Scheduling
    // ========================================================================

    /// Prune dead passes and compute the execution order.
    fn build_schedule(&mut self) -> Vec<PassHandle> {
        let pass_count = self.passes.len();
        let mut reached = vec![VisitState::Unvisited; pass_count];

        for &resource in &self.outputs {
            let root = self
                .chains
                .get(&resource)
                .and_then(|chain| self.versions[chain.last.index()].producer());
            match root {
                Some(producer) => {
                    mark_live(&self.passes, &self.versions, &mut reached, producer.index());
                }
                // Never written this frame: nothing to schedule for it.
                None => log::trace!("output {resource:?} has no producer this frame"),
            }
        }

        for (index, pass) in self.passes.iter_mut().enumerate() {
            pass.live = reached[index] == VisitState::Done;
        }

        // Depths are computed over the live passes only. Write-after-read
        // edges toward dead readers would revive them if they participated
        // in the reachability walk above; they only order live passes.
        let mut state = vec![VisitState::Unvisited; pass_count];
        let mut depth = vec![0u32; pass_count];
        let mut order: Vec<PassHandle> = Vec::with_capacity(pass_count);
        for index in 0..pass_count {
            if self.passes[index].live {
                visit(&self.passes, &self.versions, &mut state, &mut depth, index);
                order.push(PassHandle::new(index as u32));
            }
        }
        // Stable sort: registration order breaks ties within a depth.
        order.sort_by_key(|handle| depth[handle.index()]);
        order
    }

    // ========================================================================
    // Execution
    // ========================================================================

    /// Schedule and run the frame.
    ///
    /// Prunes dead passes, orders the live ones, and runs their tasks in
    /// schedule order with plugin hooks around each pass. Consuming `self`
    /// makes the graph single-use: a second execution does not compile.
    ///
    /// Returns `true` if at least one pass executed.
    pub fn execute(mut self) -> bool {
        let order = self.build_schedule();

        if log::log_enabled!(log::Level::Debug) {
            let names: Vec<&str> = order
                .iter()
                .map(|handle| self.passes[handle.index()].name())
                .collect();
            log::debug!(
                "schedule [{}] ({} of {} passes live)",
                names.join(", "),
                order.len(),
                self.passes.len()
            );
        }

        let mut plugins = std::mem::take(&mut self.plugins);
        for plugin in plugins.iter_mut() {
            plugin.on_frame_begin(&self);
        }

        let mut any_executed = false;
        for &handle in &order {
            if self.passes[handle.index()].executed {
                continue;
            }
            for plugin in plugins.iter_mut() {
                plugin.on_pass_begin(&self.passes[handle.index()]);
            }
            self.execute_pass(handle);
            any_executed = true;
            for plugin in plugins.iter_mut() {
                plugin.on_pass_end(&self.passes[handle.index()]);
            }
        }

        for plugin in plugins.iter_mut() {
            plugin.on_frame_end(&self);
        }
        any_executed
    }

    /// Run one pass's tasks in FIFO order and drain its task list.
    ///
    /// A no-op if the pass already executed, so several independent consumers
    /// may request the same pass without double execution.
    pub(crate) fn execute_pass(&mut self, handle: PassHandle) {
        let pass = &mut self.passes[handle.index()];
        if pass.executed {
            return;
        }
        pass.executed = true;
        log::trace!("execute pass '{}' ({} tasks)", pass.name(), pass.tasks.len());
        let tasks = std::mem::replace(&mut pass.tasks, BumpVec::new_in(self.arena.bump()));
        for mut task in tasks {
            task.run();
            // Task dropped here: captured arguments are released immediately.
        }
    }
}

impl fmt::Debug for RenderGraph<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderGraph")
            .field("passes", &self.passes.len())
            .field("versions", &self.versions.len())
            .field("outputs", &self.outputs.len())
            .field("plugins", &self.plugins.len())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Unvisited,
    InProgress,
    Done,
}

/// Backward reachability walk marking live passes.
///
/// Recurses into read producers, the producer of the version each write
/// superseded, and explicit dependencies. Readers of a superseded version are
/// deliberately not followed: an overwrite does not make a reader's results
/// observed, so it must not revive a dead reader.
fn mark_live(
    passes: &[Pass<'_>],
    versions: &[ResourceVersion<'_>],
    state: &mut [VisitState],
    index: usize,
) {
    match state[index] {
        VisitState::Done => return,
        VisitState::InProgress => panic!(
            "dependency cycle through pass '{}'",
            passes[index].name()
        ),
        VisitState::Unvisited => {}
    }
    state[index] = VisitState::InProgress;

    for &(version, access) in passes[index].resources.iter() {
        let version_data = &versions[version.index()];
        if access.is_read() {
            if let Some(producer) = version_data.producer() {
                if producer.index() != index {
                    mark_live(passes, versions, state, producer.index());
                }
            }
        }
        if access.is_write() {
            if let Some(previous) = version_data.previous() {
                if let Some(producer) = versions[previous.index()].producer() {
                    if producer.index() != index {
                        mark_live(passes, versions, state, producer.index());
                    }
                }
            }
        }
    }
    for &dep in passes[index].dependencies.iter() {
        mark_live(passes, versions, state, dep.index());
    }

    state[index] = VisitState::Done;
}

/// Depth-first visit computing `depth = 1 + max(depth of dependencies)` over
/// the live passes.
///
/// The graph is acyclic by construction (explicit dependencies and version
/// links only ever reference passes that already exist), so the `InProgress`
/// check can only fire on a declaration interleaving that broke that
/// construction; it fails fast instead of corrupting the schedule.
fn visit(
    passes: &[Pass<'_>],
    versions: &[ResourceVersion<'_>],
    state: &mut [VisitState],
    depth: &mut [u32],
    index: usize,
) -> u32 {
    match state[index] {
        VisitState::Done => return depth[index],
        VisitState::InProgress => panic!(
            "dependency cycle through pass '{}'",
            passes[index].name()
        ),
        VisitState::Unvisited => {}
    }
    state[index] = VisitState::InProgress;

    let mut pass_depth = 0u32;
    let visit_dependency = |dep: PassHandle,
                            state: &mut [VisitState],
                            depth: &mut [u32],
                            pass_depth: &mut u32| {
        if dep.index() == index {
            return;
        }
        let dep_depth = visit(passes, versions, state, depth, dep.index());
        *pass_depth = (*pass_depth).max(dep_depth + 1);
    };

    for &(version, access) in passes[index].resources.iter() {
        let version_data = &versions[version.index()];
        if access.is_read() {
            // Read-after-write: run after the producer of what we consume.
            if let Some(producer) = version_data.producer() {
                visit_dependency(producer, state, depth, &mut pass_depth);
            }
        }
        if access.is_write() {
            if let Some(previous) = version_data.previous() {
                let previous_data = &versions[previous.index()];
                // Write-after-write: run after the previous producer.
                if let Some(producer) = previous_data.producer() {
                    visit_dependency(producer, state, depth, &mut pass_depth);
                }
                // Write-after-read: run after the live readers still
                // consuming the version this write supersedes. Dead readers
                // never run, so they impose no ordering.
                for &reader in previous_data.readers() {
                    if passes[reader.index()].live {
                        visit_dependency(reader, state, depth, &mut pass_depth);
                    }
                }
            }
        }
    }
    for &dep in passes[index].dependencies.iter() {
        visit_dependency(dep, state, depth, &mut pass_depth);
    }

    state[index] = VisitState::Done;
    depth[index] = pass_depth;
    pass_depth
}
