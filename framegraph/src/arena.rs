//! Tagged bump allocation (§4.B).
//!
//! Mirrors `render::arena::Arena`'s "one arena per resource lifetime, freed by dropping
//! it" idiom, generalised from one arena-per-backend-object to one arena-per-lifecycle-tag.
//! Each tag owns a [`typed_arena::Arena<T>`] per worker thread; a thread records into its
//! own arena with no lock (§5 "arenas are split per thread"), and the tag is freed en
//! masse simply by dropping the `TaggedArena` that owns those per-thread arenas — there is
//! no explicit "free" call, the same way `render::arena::Arena`'s `Drop` impl is its free.

use typed_arena::Arena;

/// The lifecycle tags named in §4.B. `RenderPassExecution` carries the recording pass's
/// index since its lifetime is scoped to that one pass's recording.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Tag {
    RenderPassExecution(usize),
    FrameGraphCompilation,
    FrameGraphExecution,
    ResourceUsageNodes,
}

/// A bump arena scoped to one [`Tag`], partitioned into one [`typed_arena::Arena`] per
/// worker thread so that concurrent recorders never contend on a lock.
///
/// `typed_arena::Arena` is not `Sync`; rather than share one behind a mutex (which would
/// serialise every allocation and defeat the point), each worker thread is handed its own
/// private arena via [`TaggedArena::thread_view`] and never sees another thread's.
pub struct TaggedArena<T> {
    tag: Tag,
    per_thread: Vec<Arena<T>>,
}

impl<T> TaggedArena<T> {
    pub fn new(tag: Tag, thread_count: usize) -> Self {
        let mut per_thread = Vec::with_capacity(thread_count);
        per_thread.resize_with(thread_count, Arena::new);
        TaggedArena { tag, per_thread }
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// Gives exclusive, lock-free access to the arena owned by `thread_index`. Callers
    /// must not call this twice for the same thread index from two different threads at
    /// once; the orchestrator hands out one `ThreadView` per spawned worker and never
    /// reuses an index within one compile pass.
    pub fn thread_view(&self, thread_index: usize) -> ThreadView<T> {
        let arena = self
            .per_thread
            .get(thread_index)
            .expect("thread index out of range for this tagged arena");
        ThreadView { arena }
    }

    /// Consumes every per-thread arena, returning all allocated values in thread order.
    /// This is the arena's "free": once called, the `TaggedArena` is gone and any
    /// `ThreadView` into it can no longer be used (enforced by the `self` move).
    pub fn drain(self) -> Vec<T> {
        self.per_thread.into_iter().flat_map(Arena::into_vec).collect()
    }
}

/// A lock-free allocation handle into one thread's slice of a [`TaggedArena`].
pub struct ThreadView<'a, T> {
    arena: &'a Arena<T>,
}

impl<'a, T> ThreadView<'a, T> {
    pub fn alloc(&self, value: T) -> &'a mut T {
        self.arena.alloc(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_survive_until_drain() {
        let arena = TaggedArena::<u32>::new(Tag::ResourceUsageNodes, 2);
        {
            let v0 = arena.thread_view(0);
            let v1 = arena.thread_view(1);
            *v0.alloc(1) += 10;
            *v1.alloc(2) += 20;
        }
        let mut drained = arena.drain();
        drained.sort_unstable();
        assert_eq!(drained, vec![11, 22]);
    }

    #[test]
    #[should_panic]
    fn out_of_range_thread_view_panics() {
        let arena = TaggedArena::<u32>::new(Tag::FrameGraphExecution, 1);
        let _ = arena.thread_view(5);
    }
}
