//! The public entry point (§4.I): queues passes between frames, drives one `execute`
//! per frame through the compiler and on to a backend, and owns the per-instance
//! transient registries and frame-lifetime scratch.
//!
//! Grounded on `src/sync.rs`'s `FrameBoundObject`/`WaitList` naming for the
//! unmanaged-reference-retention idea (that module itself is an unfinished stub in this
//! codebase — `enqueue`/`reclaim` are both `unimplemented!()` — so only the shape is
//! borrowed, not the body) and on `src/device/mod.rs`'s `max_frames_in_flight` for the
//! in-flight-frame permit count this crate's [`FrameGraphConfig`] carries forward.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Condvar, Mutex, OnceLock};
use std::time::{Duration, Instant};

use crate::arena::{Tag, TaggedArena};
use crate::backend::{Backend, CompiledPlan, UnmanagedObject};
use crate::compiler;
use crate::config::FrameGraphConfig;
use crate::handle::ResourceKind;
use crate::pass::Pass;
use crate::registry::TransientRegistry;

const TRANSIENT_CHUNK_SIZE: u32 = 256;
const ARG_BUFFER_ARRAY_CHUNK_SIZE: u32 = 64;

/// Assigns each live [`FrameGraph`] a distinct 3-bit transient registry id so their
/// transient handles never collide (§3's packed handle carries only 3 bits for it).
static NEXT_TRANSIENT_REGISTRY_ID: AtomicU8 = AtomicU8::new(0);

/// Monotonic counter incremented once per `execute` call, process-wide, per §4.I
/// "increments global submission index".
static SUBMISSION_INDEX: AtomicU64 = AtomicU64::new(0);

/// The process-wide "only one frame graph executing at a time" mutex (§4.I, §5).
fn execute_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

/// A counting semaphore bounding how many frames may be in flight on the backend at
/// once, built directly over `std::sync::{Mutex, Condvar}` rather than a dedicated
/// concurrency crate (§5, §9 design notes: "a thread pool with a wait-for-all primitive,
/// not a custom job manager" — the same reasoning extends to this one primitive).
#[derive(Clone)]
struct Semaphore(Arc<(Mutex<usize>, Condvar)>);

impl Semaphore {
    fn new(permits: usize) -> Self {
        Semaphore(Arc::new((Mutex::new(permits), Condvar::new())))
    }

    fn acquire(&self) {
        let (lock, cvar) = &*self.0;
        let mut permits = lock.lock().unwrap();
        while *permits == 0 {
            permits = cvar.wait(permits).unwrap();
        }
        *permits -= 1;
    }

    fn release(&self) {
        let (lock, cvar) = &*self.0;
        let mut permits = lock.lock().unwrap();
        *permits += 1;
        cvar.notify_one();
    }
}

/// Queues passes across one or more frames and drives their compilation and execution
/// (§4.I). Not `Sync`: only the thread that owns a `FrameGraph` may enqueue passes or
/// call `execute` on it.
pub struct FrameGraph {
    config: FrameGraphConfig,
    transient_buffers: TransientRegistry,
    transient_textures: TransientRegistry,
    transient_arg_buffer_arrays: TransientRegistry,
    passes: Vec<Pass>,
    early_blit_count: usize,
    /// Backend-owned objects (pipeline descriptors, acceleration structures, …) a client
    /// wants kept alive for the duration of the in-flight frame; released only once that
    /// frame's GPU work completes (§5 "unmanaged_references buffer").
    unmanaged_references: TaggedArena<Box<dyn UnmanagedObject>>,
    semaphore: Semaphore,
    last_frame_render_duration: Duration,
    last_frame_gpu_time: Arc<Mutex<Duration>>,
    pending_on_submission: Option<Box<dyn FnOnce() + Send>>,
    pending_on_gpu_completion: Option<Box<dyn FnOnce(Duration) + Send>>,
    queued_completion_callbacks: Vec<Box<dyn FnOnce() + Send>>,
}

impl FrameGraph {
    pub fn new(config: FrameGraphConfig) -> Self {
        let registry_id = NEXT_TRANSIENT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed) % 8;
        FrameGraph {
            transient_buffers: TransientRegistry::new(
                ResourceKind::Buffer,
                registry_id,
                TRANSIENT_CHUNK_SIZE,
                config.transient_buffer_capacity,
            ),
            transient_textures: TransientRegistry::new(
                ResourceKind::Texture,
                registry_id,
                TRANSIENT_CHUNK_SIZE,
                config.transient_texture_capacity,
            ),
            transient_arg_buffer_arrays: TransientRegistry::new(
                ResourceKind::ArgumentBufferArray,
                registry_id,
                ARG_BUFFER_ARRAY_CHUNK_SIZE,
                config.transient_arg_buffer_array_capacity,
            ),
            passes: Vec::new(),
            early_blit_count: 0,
            unmanaged_references: TaggedArena::new(Tag::FrameGraphExecution, 1),
            semaphore: Semaphore::new(config.inflight_frame_count.max(1) as usize),
            last_frame_render_duration: Duration::ZERO,
            last_frame_gpu_time: Arc::new(Mutex::new(Duration::ZERO)),
            pending_on_submission: None,
            pending_on_gpu_completion: None,
            queued_completion_callbacks: Vec::new(),
            config,
        }
    }

    pub fn transient_buffers(&self) -> &TransientRegistry {
        &self.transient_buffers
    }

    pub fn transient_textures(&self) -> &TransientRegistry {
        &self.transient_textures
    }

    pub fn transient_arg_buffer_arrays(&self) -> &TransientRegistry {
        &self.transient_arg_buffer_arrays
    }

    /// Enqueues a pass for the next `execute` call, appended after any early blit passes
    /// and every previously-queued ordinary pass.
    pub fn add_pass(&mut self, pass: Pass) {
        self.passes.push(pass);
    }

    /// Inserts a blit pass ahead of every other queued pass (but after earlier early blit
    /// passes), for the common "upload this frame's staging data before anything reads
    /// it" pattern.
    pub fn insert_early_blit_pass(&mut self, pass: Pass) {
        self.passes.insert(self.early_blit_count, pass);
        self.early_blit_count += 1;
    }

    /// Convenience wrapper for the common case of a pass that does nothing but run a
    /// plain CPU callback — the one pass kind whose whole body *is* a callback
    /// (`PassBody::Cpu`).
    pub fn add_cpu_callback_pass(&mut self, name: impl Into<String>, f: impl FnOnce() + Send + 'static) {
        self.add_pass(Pass::cpu(name, f));
    }

    pub fn queue(&self) -> &[Pass] {
        &self.passes
    }

    pub fn has_enqueued_passes(&self) -> bool {
        !self.passes.is_empty()
    }

    /// Registers a one-shot callback fired right after this frame's work is handed to
    /// the backend (before `execute` returns).
    pub fn on_submission(&mut self, cb: impl FnOnce() + Send + 'static) {
        self.pending_on_submission = Some(Box::new(cb));
    }

    /// Registers a one-shot callback fired with the measured GPU time once this frame's
    /// work completes on the backend, possibly from another thread.
    pub fn on_gpu_completion(&mut self, cb: impl FnOnce(Duration) + Send + 'static) {
        self.pending_on_gpu_completion = Some(Box::new(cb));
    }

    /// Queues an additional no-argument callback fired alongside `on_gpu_completion`
    /// when this frame's GPU work completes; unlike `on_gpu_completion`, any number of
    /// these may be queued before one `execute` call.
    pub fn queue_completion_callback(&mut self, cb: impl FnOnce() + Send + 'static) {
        self.queued_completion_callbacks.push(Box::new(cb));
    }

    pub fn last_frame_render_duration(&self) -> Duration {
        self.last_frame_render_duration
    }

    pub fn last_frame_gpu_time(&self) -> Duration {
        *self.last_frame_gpu_time.lock().unwrap()
    }

    /// Keeps a backend-owned object alive until this frame's GPU work completes.
    pub fn retain_unmanaged(&self, obj: Box<dyn UnmanagedObject>) {
        self.unmanaged_references.thread_view(0).alloc(obj);
    }

    /// Compiles the currently queued passes and hands them to `backend` (§4.I).
    ///
    /// Blocks on the process-wide execute lock and on the in-flight-frame semaphore
    /// before doing any work, and resets this instance's per-frame state (transient
    /// registries, pass queue, submission index) before returning — the caller is free
    /// to start enqueueing the next frame's passes immediately.
    pub fn execute(&mut self, backend: &dyn Backend) {
        let _process_guard = execute_lock().lock().unwrap();
        self.semaphore.acquire();

        debug!("frame graph execute: {} queued passes", self.passes.len());

        // §7 "empty active plan": zero *enqueued* passes is distinguished from a
        // non-empty queue that compiles down to nothing (§8 S2, which still submits an
        // empty plan to the backend). Here there is nothing to compile at all, so the
        // backend is never touched — not even `begin_frame_resource_access`.
        if self.passes.is_empty() {
            if let Some(cb) = self.pending_on_submission.take() {
                cb();
            }
            let on_completion = self.pending_on_gpu_completion.take();
            let queued = std::mem::take(&mut self.queued_completion_callbacks);
            if let Some(cb) = on_completion {
                cb(Duration::ZERO);
            }
            for cb in queued {
                cb();
            }
            self.reset();
            self.semaphore.release();
            return;
        }

        backend.begin_frame_resource_access();

        let passes = std::mem::take(&mut self.passes);
        let pass_count = passes.len();

        let start = Instant::now();
        let compiled = compiler::compile(passes, backend, self.config.worker_thread_count);
        self.last_frame_render_duration = start.elapsed();
        debug!(
            "compiled {} of {} queued passes in {:?}",
            compiled.active_passes.len(),
            pass_count,
            self.last_frame_render_duration
        );

        let plan = CompiledPlan {
            active_passes: &compiled.active_passes,
            commands: &compiled.commands,
            used_resources: &compiled.used_resources,
            dependency_table: &compiled.dependency_table,
        };

        let gpu_time = Arc::clone(&self.last_frame_gpu_time);
        let semaphore = self.semaphore.clone();
        let on_completion = self.pending_on_gpu_completion.take();
        let queued = std::mem::take(&mut self.queued_completion_callbacks);

        backend.execute_frame_graph(
            plan,
            Box::new(move |duration| {
                *gpu_time.lock().unwrap() = duration;
                if let Some(cb) = on_completion {
                    cb(duration);
                }
                for cb in queued {
                    cb();
                }
                semaphore.release();
            }),
        );

        if let Some(cb) = self.pending_on_submission.take() {
            cb();
        }

        self.reset();
    }

    /// Per-frame teardown (§4.I "Reset"): resets the transient registries, drops the
    /// pass queue, and advances the global submission counter. Deliberately does *not*
    /// drain `unmanaged_references` — those live until the GPU completion callback
    /// fires, per §5.
    fn reset(&mut self) {
        self.transient_buffers.reset();
        self.transient_textures.reset();
        self.transient_arg_buffer_arrays.reset();
        self.early_blit_count = 0;
        let index = SUBMISSION_INDEX.fetch_add(1, Ordering::Relaxed);
        trace!("frame graph submission index advanced to {}", index + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{ArgumentReflection, BindingPath, PipelineDescriptor, Reflection, RenderTargetDescriptor};
    use crate::handle::{Flags, Handle};
    use std::sync::atomic::AtomicUsize;

    #[derive(Debug)]
    struct NullReflection;
    impl Reflection for NullReflection {
        fn binding_path(&self, _n: &str, _a: usize, _b: Option<BindingPath>) -> Option<BindingPath> {
            None
        }
        fn binding_is_active(&self, _p: BindingPath) -> bool {
            false
        }
        fn argument_reflection(&self, _p: BindingPath) -> Option<ArgumentReflection> {
            None
        }
        fn argument_buffer_encoder(&self, _p: BindingPath) -> Option<Box<dyn UnmanagedObject>> {
            None
        }
        fn remap_binding_path(&self, _a: BindingPath, b: BindingPath) -> BindingPath {
            b
        }
        fn remap_argument_buffer_path_for_active_stages(&self, p: BindingPath) -> BindingPath {
            p
        }
    }

    struct RecordingBackend {
        completions_fired: AtomicUsize,
    }

    impl Backend for RecordingBackend {
        fn begin_frame_resource_access(&self) {}
        fn execute_frame_graph(&self, _plan: CompiledPlan<'_>, completion_cb: Box<dyn FnOnce(Duration) + Send>) {
            self.completions_fired.fetch_add(1, Ordering::SeqCst);
            completion_cb(Duration::from_millis(1));
        }
        fn render_pipeline_reflection(&self, _d: &dyn PipelineDescriptor, _r: &dyn RenderTargetDescriptor) -> Box<dyn Reflection> {
            Box::new(NullReflection)
        }
        fn compute_pipeline_reflection(&self, _d: &dyn PipelineDescriptor) -> Box<dyn Reflection> {
            Box::new(NullReflection)
        }
        fn argument_buffer_path(&self, _set_index: u32, _stages: crate::usage::Stages) -> BindingPath {
            BindingPath(0)
        }
        fn thread_execution_width(&self) -> u32 {
            32
        }
        fn materialise_persistent_buffer(&self, _h: Handle) {}
        fn materialise_persistent_texture(&self, _h: Handle) {}
        fn register_window_texture(&self, _h: Handle, _w: *mut std::ffi::c_void) {}
        fn replace_texture_region(&self, _t: Handle, _level: u32, _slice: u32, _bpr: u32, _bytes: &[u8]) {}
        fn buffer_contents(&self, _b: Handle, _range: crate::usage::ResourceRange) -> *mut std::ffi::c_void {
            std::ptr::null_mut()
        }
        fn buffer_did_modify_range(&self, _b: Handle, _range: crate::usage::ResourceRange) {}
    }

    #[test]
    fn execute_drains_the_queue_and_runs_completion_hooks() {
        let mut graph = FrameGraph::new(FrameGraphConfig::builder().inflight_frame_count(2).build());
        let written = Handle::new(1, 0, Flags::PERSISTENT, 0, ResourceKind::Buffer);
        graph.add_pass(Pass::blit("upload", move |enc| enc.fill_buffer(written, 0, 4, 0)));
        assert!(graph.has_enqueued_passes());

        let fired = Arc::new(Mutex::new(false));
        let fired_clone = Arc::clone(&fired);
        graph.on_gpu_completion(move |_duration| {
            *fired_clone.lock().unwrap() = true;
        });

        let backend = RecordingBackend { completions_fired: AtomicUsize::new(0) };
        graph.execute(&backend);

        assert!(!graph.has_enqueued_passes());
        assert!(*fired.lock().unwrap());
        assert_eq!(backend.completions_fired.load(Ordering::SeqCst), 1);
        assert!(graph.last_frame_gpu_time() >= Duration::from_millis(1));
    }

    #[test]
    fn executing_with_zero_enqueued_passes_never_touches_the_backend() {
        let mut graph = FrameGraph::new(FrameGraphConfig::default());
        assert!(!graph.has_enqueued_passes());

        let fired = Arc::new(Mutex::new(false));
        let fired_clone = Arc::clone(&fired);
        graph.on_gpu_completion(move |_duration| {
            *fired_clone.lock().unwrap() = true;
        });

        let backend = RecordingBackend { completions_fired: AtomicUsize::new(0) };
        graph.execute(&backend);

        assert!(*fired.lock().unwrap(), "completion callback must still fire on an empty queue");
        assert_eq!(backend.completions_fired.load(Ordering::SeqCst), 0, "backend must not be invoked at all");
    }

    #[test]
    fn early_blit_passes_stay_ahead_of_ordinary_passes() {
        let mut graph = FrameGraph::new(FrameGraphConfig::default());
        graph.add_pass(Pass::cpu("ordinary", || {}));
        graph.insert_early_blit_pass(Pass::cpu("early", || {}));
        assert_eq!(graph.queue()[0].name, "early");
        assert_eq!(graph.queue()[1].name, "ordinary");
    }
}
