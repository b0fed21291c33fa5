//! Deferred work units attached to passes.
//!
//! A task is a previously-recorded call that the graph replays when its pass
//! is scheduled. Tasks are allocated from the frame arena, run exactly once in
//! FIFO order, and are dropped immediately after running so captured state
//! (staging buffers, pool references) is released mid-frame rather than at
//! arena reset.

use bumpalo::boxed::Box as BumpBox;

use crate::arena::FrameArena;

/// A deferred unit of recorded work.
///
/// Implement this for reusable task types; one-off closures go through
/// [`PassMut::add_func`](crate::PassMut::add_func) instead.
pub trait Task {
    /// Run the recorded work.
    ///
    /// Called at most once; the task is dropped right after.
    fn run(&mut self);
}

/// Adapter that runs a captured closure as a task.
pub(crate) struct FnTask<F: FnOnce()> {
    func: Option<F>,
}

impl<F: FnOnce()> FnTask<F> {
    pub(crate) fn new(func: F) -> Self {
        Self { func: Some(func) }
    }
}

impl<F: FnOnce()> Task for FnTask<F> {
    fn run(&mut self) {
        if let Some(func) = self.func.take() {
            func();
        }
    }
}

/// Arena-boxed task. Dropping it runs the payload's destructor without
/// freeing arena memory.
pub(crate) type BoxedTask<'fr> = BumpBox<'fr, dyn Task + 'fr>;

pub(crate) fn box_task<'fr, T: Task + 'fr>(arena: &'fr FrameArena, task: T) -> BoxedTask<'fr> {
    let boxed = BumpBox::new_in(task, arena.bump());
    // BumpBox cannot unsize-coerce on stable; the raw-pointer round trip only
    // attaches the vtable metadata to the same allocation.
    let raw = BumpBox::into_raw(boxed);
    unsafe { BumpBox::from_raw(raw as *mut (dyn Task + 'fr)) }
}
