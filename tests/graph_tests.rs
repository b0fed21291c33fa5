use std::cell::RefCell;
use std::rc::Rc;

use framegraph::{Access, FrameArena, Pass, PassType, Plugin, RenderGraph, ResourceId};

type Trace = Rc<RefCell<Vec<String>>>;

/// Opt-in schedule logging: `RUST_LOG=framegraph=debug cargo test -- --nocapture`.
fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn trace() -> Trace {
    Rc::new(RefCell::new(Vec::new()))
}

fn record(trace: &Trace, label: &str) -> impl FnOnce() + 'static {
    let trace = trace.clone();
    let label = label.to_string();
    move || trace.borrow_mut().push(label)
}

fn position(trace: &[String], label: &str) -> usize {
    trace
        .iter()
        .position(|entry| entry == label)
        .unwrap_or_else(|| panic!("'{label}' not in trace {trace:?}"))
}

#[test]
fn test_linear_chain_runs_in_dependency_order() {
    // The simulated resource contents stand in for GPU state: b's task must
    // observe what a's task produced.
    init_logs();
    let arena = FrameArena::new();
    let mut graph = RenderGraph::new(&arena);
    let executed = trace();
    let contents = Rc::new(RefCell::new(0u32));

    let intermediate = ResourceId::from_raw(1);
    let backbuffer = ResourceId::from_raw(2);

    let written = contents.clone();
    graph
        .add_pass(PassType::Graphics, "a")
        .add_resource(intermediate, Access::RENDER_TARGET)
        .add_func(record(&executed, "a"))
        .add_func(move || *written.borrow_mut() = 42);
    let observed = contents.clone();
    graph
        .add_pass(PassType::Graphics, "b")
        .add_resource(intermediate, Access::SHADER_RESOURCE)
        .add_resource(backbuffer, Access::RENDER_TARGET)
        .add_func(record(&executed, "b"))
        .add_func(move || assert_eq!(*observed.borrow(), 42));
    graph.add_output(backbuffer);

    assert!(graph.execute());
    assert_eq!(*executed.borrow(), ["a", "b"]);
}

#[test]
fn test_diamond_respects_all_edges() {
    // a writes a gbuffer read by b and c; d consumes both of their outputs.
    init_logs();
    let arena = FrameArena::new();
    let mut graph = RenderGraph::new(&arena);
    let executed = trace();

    let gbuffer = ResourceId::from_raw(1);
    let lit = ResourceId::from_raw(2);
    let shadowed = ResourceId::from_raw(3);
    let backbuffer = ResourceId::from_raw(4);

    graph
        .add_pass(PassType::Graphics, "a")
        .add_resource(gbuffer, Access::RENDER_TARGET)
        .add_func(record(&executed, "a"));
    graph
        .add_pass(PassType::Compute, "b")
        .add_resource(gbuffer, Access::SHADER_RESOURCE)
        .add_resource(lit, Access::STORAGE)
        .add_func(record(&executed, "b"));
    graph
        .add_pass(PassType::Compute, "c")
        .add_resource(gbuffer, Access::SHADER_RESOURCE)
        .add_resource(shadowed, Access::STORAGE)
        .add_func(record(&executed, "c"));
    graph
        .add_pass(PassType::Graphics, "d")
        .add_resource(lit, Access::SHADER_RESOURCE)
        .add_resource(shadowed, Access::SHADER_RESOURCE)
        .add_resource(backbuffer, Access::RENDER_TARGET)
        .add_func(record(&executed, "d"));
    graph.add_output(backbuffer);

    assert!(graph.execute());
    let executed = executed.borrow();
    assert_eq!(executed.len(), 4);
    let a = position(&executed, "a");
    let b = position(&executed, "b");
    let c = position(&executed, "c");
    let d = position(&executed, "d");
    assert!(a < b && a < c, "source must precede both branches: {executed:?}");
    assert!(b < d && c < d, "join must follow both branches: {executed:?}");
    // Same depth: registration order decides.
    assert!(b < c, "equal-depth passes keep registration order: {executed:?}");
}

#[test]
fn test_unreachable_passes_are_pruned() {
    init_logs();
    let arena = FrameArena::new();
    let mut graph = RenderGraph::new(&arena);
    let executed = trace();

    let backbuffer = ResourceId::from_raw(1);
    let scratch = ResourceId::from_raw(2);

    graph
        .add_pass(PassType::Graphics, "main")
        .add_resource(backbuffer, Access::RENDER_TARGET)
        .add_func(record(&executed, "main"));
    // Writes something no output chain reaches.
    graph
        .add_pass(PassType::Compute, "orphan")
        .add_resource(scratch, Access::STORAGE)
        .add_func(record(&executed, "orphan"));
    graph.add_output(backbuffer);

    assert!(graph.execute());
    assert_eq!(*executed.borrow(), ["main"]);
}

#[test]
fn test_shared_producer_executes_once() {
    // Two output chains reach the same producer; it must run exactly once.
    init_logs();
    let arena = FrameArena::new();
    let mut graph = RenderGraph::new(&arena);
    let executed = trace();

    let shared = ResourceId::from_raw(1);
    let left = ResourceId::from_raw(2);
    let right = ResourceId::from_raw(3);

    graph
        .add_pass(PassType::Compute, "shared")
        .add_resource(shared, Access::STORAGE)
        .add_func(record(&executed, "shared"));
    graph
        .add_pass(PassType::Graphics, "left")
        .add_resource(shared, Access::SHADER_RESOURCE)
        .add_resource(left, Access::RENDER_TARGET)
        .add_func(record(&executed, "left"));
    graph
        .add_pass(PassType::Graphics, "right")
        .add_resource(shared, Access::SHADER_RESOURCE)
        .add_resource(right, Access::RENDER_TARGET)
        .add_func(record(&executed, "right"));
    graph.add_output(left).add_output(right);

    assert!(graph.execute());
    assert_eq!(*executed.borrow(), ["shared", "left", "right"]);
}

#[test]
fn test_tasks_run_fifo_across_recording_sites() {
    init_logs();
    let arena = FrameArena::new();
    let mut graph = RenderGraph::new(&arena);
    let executed = trace();

    let backbuffer = ResourceId::from_raw(1);
    let handle = graph
        .add_pass(PassType::Graphics, "ui")
        .add_resource(backbuffer, Access::RENDER_TARGET)
        .add_func(record(&executed, "panel"))
        .add_func(record(&executed, "text"))
        .handle();
    // A later traversal step re-opens the pass and appends more work.
    graph.pass_mut(handle).add_func(record(&executed, "cursor"));
    graph.add_output(backbuffer);

    assert!(graph.execute());
    assert_eq!(*executed.borrow(), ["panel", "text", "cursor"]);
}

#[test]
fn test_unwritten_output_schedules_nothing() {
    init_logs();
    let arena = FrameArena::new();
    let mut graph = RenderGraph::new(&arena);
    let executed = trace();

    graph
        .add_pass(PassType::Graphics, "a")
        .add_func(record(&executed, "a"));
    // Output exists as pre-frame state only; nothing produced it this frame.
    graph.add_output(ResourceId::from_raw(1));

    assert!(!graph.execute());
    assert!(executed.borrow().is_empty());
}

#[test]
fn test_explicit_dependency_orders_independent_passes() {
    // "readback" shares no resource with "main"; without the explicit edge the
    // scheduler would be free to run it first.
    init_logs();
    let arena = FrameArena::new();
    let mut graph = RenderGraph::new(&arena);
    let executed = trace();

    let backbuffer = ResourceId::from_raw(1);
    let staging = ResourceId::from_raw(2);

    let main = graph
        .add_pass(PassType::Graphics, "main")
        .add_resource(backbuffer, Access::RENDER_TARGET)
        .add_func(record(&executed, "main"))
        .handle();
    graph
        .add_pass(PassType::Transfer, "readback")
        .add_resource(staging, Access::COPY_DST)
        .add_dependency(main)
        .add_func(record(&executed, "readback"));
    graph.add_output(staging).add_output(backbuffer);

    assert!(graph.execute());
    assert_eq!(*executed.borrow(), ["main", "readback"]);
}

#[test]
fn test_write_after_write_keeps_declaration_order() {
    init_logs();
    let arena = FrameArena::new();
    let mut graph = RenderGraph::new(&arena);
    let executed = trace();

    let target = ResourceId::from_raw(1);
    graph
        .add_pass(PassType::Graphics, "opaque")
        .add_resource(target, Access::RENDER_TARGET)
        .add_func(record(&executed, "opaque"));
    graph
        .add_pass(PassType::Graphics, "transparent")
        .add_resource(target, Access::RENDER_TARGET)
        .add_func(record(&executed, "transparent"));
    graph.add_output(target);

    assert!(graph.execute());
    assert_eq!(*executed.borrow(), ["opaque", "transparent"]);
}

#[test]
fn test_write_after_read_waits_for_readers() {
    // "copy" reads the first version of `buffer`; "overwrite" supersedes it
    // and must run after the read even though it never reads anything.
    init_logs();
    let arena = FrameArena::new();
    let mut graph = RenderGraph::new(&arena);
    let executed = trace();

    let buffer = ResourceId::from_raw(1);
    let snapshot = ResourceId::from_raw(2);

    graph
        .add_pass(PassType::Compute, "fill")
        .add_resource(buffer, Access::STORAGE)
        .add_func(record(&executed, "fill"));
    graph
        .add_pass(PassType::Transfer, "copy")
        .add_resource(buffer, Access::COPY_SRC)
        .add_resource(snapshot, Access::COPY_DST)
        .add_func(record(&executed, "copy"));
    graph
        .add_pass(PassType::Transfer, "overwrite")
        .add_resource(buffer, Access::COPY_DST)
        .add_func(record(&executed, "overwrite"));
    graph.add_output(snapshot).add_output(buffer);

    assert!(graph.execute());
    let executed = executed.borrow();
    let copy = position(&executed, "copy");
    let overwrite = position(&executed, "overwrite");
    assert!(copy < overwrite, "overwrite must wait for readers: {executed:?}");
}

#[test]
fn test_dead_reader_of_overwritten_resource_stays_pruned() {
    // "debug readback" reads the shadow map but nothing observes its result;
    // the later overwrite of the shadow map must not revive it.
    init_logs();
    let arena = FrameArena::new();
    let mut graph = RenderGraph::new(&arena);
    let executed = trace();

    let shadow = ResourceId::from_raw(1);
    let backbuffer = ResourceId::from_raw(2);

    graph
        .add_pass(PassType::Graphics, "shadow")
        .add_resource(shadow, Access::DEPTH_STENCIL)
        .add_func(record(&executed, "shadow"));
    graph
        .add_pass(PassType::Transfer, "debug readback")
        .add_resource(shadow, Access::COPY_SRC)
        .add_func(record(&executed, "debug readback"));
    graph
        .add_pass(PassType::Graphics, "shadow update")
        .add_resource(shadow, Access::DEPTH_STENCIL)
        .add_func(record(&executed, "shadow update"));
    graph
        .add_pass(PassType::Graphics, "main")
        .add_resource(shadow, Access::SHADER_RESOURCE)
        .add_resource(backbuffer, Access::RENDER_TARGET)
        .add_func(record(&executed, "main"));
    graph.add_output(backbuffer);

    assert!(graph.execute());
    assert_eq!(*executed.borrow(), ["shadow", "shadow update", "main"]);
}

struct TracePlugin {
    trace: Trace,
}

impl Plugin for TracePlugin {
    fn on_frame_begin(&mut self, graph: &RenderGraph<'_>) {
        self.trace
            .borrow_mut()
            .push(format!("frame begin ({} passes)", graph.pass_count()));
    }

    fn on_frame_end(&mut self, _graph: &RenderGraph<'_>) {
        self.trace.borrow_mut().push("frame end".to_string());
    }

    fn on_pass_begin(&mut self, pass: &Pass<'_>) {
        self.trace.borrow_mut().push(format!("begin {}", pass.name()));
    }

    fn on_pass_end(&mut self, pass: &Pass<'_>) {
        assert!(pass.is_executed());
        assert!(pass.is_live());
        self.trace.borrow_mut().push(format!("end {}", pass.name()));
    }
}

#[test]
fn test_plugin_hooks_wrap_scheduled_passes_only() {
    init_logs();
    let arena = FrameArena::new();
    let mut graph = RenderGraph::new(&arena);
    let events = trace();

    let backbuffer = ResourceId::from_raw(1);
    graph
        .add_pass(PassType::Graphics, "main")
        .add_resource(backbuffer, Access::RENDER_TARGET)
        .add_func(record(&events, "task main"));
    graph.add_pass(PassType::Compute, "dead");
    graph.add_output(backbuffer);
    graph.add_plugin(TracePlugin {
        trace: events.clone(),
    });

    assert!(graph.execute());
    assert_eq!(
        *events.borrow(),
        [
            "frame begin (2 passes)",
            "begin main",
            "task main",
            "end main",
            "frame end",
        ]
    );
}

#[test]
fn test_empty_reachable_pass_still_gets_hooks() {
    // A pass with no tasks still produces its output version and still gets
    // its plugin hooks; emptiness is diagnostic, not a scheduling rule.
    init_logs();
    let arena = FrameArena::new();
    let mut graph = RenderGraph::new(&arena);
    let events = trace();

    let backbuffer = ResourceId::from_raw(1);
    graph
        .add_pass(PassType::Graphics, "clear")
        .add_resource(backbuffer, Access::RENDER_TARGET);
    graph.add_output(backbuffer);
    graph.add_plugin(TracePlugin {
        trace: events.clone(),
    });

    assert!(graph.execute());
    assert_eq!(
        *events.borrow(),
        ["frame begin (1 passes)", "begin clear", "end clear", "frame end"]
    );
}

#[test]
fn test_equal_depth_passes_keep_registration_order() {
    init_logs();
    let arena = FrameArena::new();
    let mut graph = RenderGraph::new(&arena);
    let executed = trace();

    // Three independent root passes, all depth 0.
    for (index, name) in ["x", "y", "z"].iter().enumerate() {
        graph
            .add_pass(PassType::Graphics, name)
            .add_resource(ResourceId::from_raw(index as u64 + 1), Access::RENDER_TARGET)
            .add_func(record(&executed, name));
        graph.add_output(ResourceId::from_raw(index as u64 + 1));
    }

    assert!(graph.execute());
    assert_eq!(*executed.borrow(), ["x", "y", "z"]);
}

#[test]
fn test_arena_resets_between_frames() {
    init_logs();
    let mut arena = FrameArena::new();
    let total = Rc::new(RefCell::new(0u32));

    for frame in 0..3 {
        let mut graph = RenderGraph::new(&arena);
        let backbuffer = ResourceId::from_raw(1);
        let captured = total.clone();
        graph
            .add_pass(PassType::Graphics, "main")
            .add_resource(backbuffer, Access::RENDER_TARGET)
            .add_func(move || *captured.borrow_mut() += 1);
        graph.add_output(backbuffer);
        assert!(graph.execute(), "frame {frame} must execute");
        arena.reset();
    }

    assert_eq!(*total.borrow(), 3);
}
