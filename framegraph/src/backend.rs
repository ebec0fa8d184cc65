//! The external interfaces this crate consumes (§6): a GPU backend and its pipeline
//! reflection, both modeled as trait objects so no concrete backend is a compile-time
//! dependency of the core — the same separation this codebase already keeps between its
//! abstract renderer traits (`render::traits::{Buffer, Image, ...}`) and any one concrete
//! backend, down to reusing `downcast_rs` for backend-owned objects that the core must
//! hold onto without knowing their concrete type.

use std::fmt::Debug;
use std::time::Duration;

use downcast_rs::{impl_downcast, Downcast};

use crate::command::Command;
use crate::dependency::DependencyTable;
use crate::handle::Handle;
use crate::pass::PassRecord;
use crate::usage::{ResourceRange, Stages, UsageKind};

/// Opaque backend identifier for a specific slot in a pipeline's descriptor layout.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BindingPath(pub u64);

/// A backend-owned object (compiled pipeline descriptor, acceleration structure, …) kept
/// alive by the frame graph for the duration of a frame without the core knowing its
/// concrete type. Held in the orchestrator's `unmanaged_references` buffer (§5) and
/// dropped only after GPU completion.
pub trait UnmanagedObject: Downcast + Debug {}
impl_downcast!(UnmanagedObject);

/// Opaque description of a render or compute pipeline as the client specified it; the
/// core never inspects this, it only forwards it to the backend to obtain a
/// [`Reflection`].
pub trait PipelineDescriptor: Downcast + Debug {}
impl_downcast!(PipelineDescriptor);

/// Opaque description of a render target (attachments, formats, sample counts, …); the
/// core never inspects this, it only forwards it to the backend to obtain a
/// [`Reflection`]. Mergeability (§4.H phase 5) is judged through the concrete
/// `render_targets_are_mergeable` comparison over `RenderTargetDesc`
/// (`crate::pass::render_targets_are_mergeable`), not through this opaque type.
pub trait RenderTargetDescriptor: Downcast + Debug {}
impl_downcast!(RenderTargetDescriptor);

/// Metadata about one resolved argument binding.
#[derive(Copy, Clone, Debug)]
pub struct ArgumentReflection {
    pub binding_path: BindingPath,
    pub kind: UsageKind,
    pub stages: Stages,
    pub is_active: bool,
}

/// Metadata about a compiled GPU pipeline: maps argument keys to binding paths and
/// reports which slots are actually active in the compiled shader.
pub trait Reflection: Debug {
    fn binding_path(
        &self,
        argument_name: &str,
        array_index: usize,
        argument_buffer_path: Option<BindingPath>,
    ) -> Option<BindingPath>;

    fn binding_is_active(&self, path: BindingPath) -> bool;

    fn argument_reflection(&self, path: BindingPath) -> Option<ArgumentReflection>;

    /// An opaque encoder handle for an argument buffer at `path`, if this pipeline
    /// actually declares one there.
    fn argument_buffer_encoder(&self, path: BindingPath) -> Option<Box<dyn UnmanagedObject>>;

    /// Remaps a binding path inside an argument buffer that is shared with a different
    /// argument-buffer path (the argument buffer was re-pointed at a new slot).
    fn remap_binding_path(
        &self,
        in_original_arg_buffer: BindingPath,
        new_arg_buffer_path: BindingPath,
    ) -> BindingPath;

    /// Remaps a binding path so it is valid when read from whichever stages are
    /// currently active (some backends pack per-stage argument tables differently).
    fn remap_argument_buffer_path_for_active_stages(&self, path: BindingPath) -> BindingPath;
}

/// The fully compiled plan handed to the backend by the orchestrator (§6 "Plan handed to
/// the backend").
pub struct CompiledPlan<'a> {
    pub active_passes: &'a [PassRecord],
    pub commands: &'a [Command],
    pub used_resources: &'a [Handle],
    pub dependency_table: &'a DependencyTable,
}

/// The GPU backend interface the core consumes (§6). `Sync` because the compiler's
/// worker pool (§4.H phase 2, §5) calls into it from multiple threads at once while
/// recording passes eagerly.
pub trait Backend: Sync {
    /// Asserts the next frame's resources may be touched.
    fn begin_frame_resource_access(&self);

    /// Consumes the compiled plan. `completion_cb` must be invoked exactly once, with the
    /// measured GPU time, when the submitted work finishes (possibly from another
    /// thread).
    fn execute_frame_graph(
        &self,
        plan: CompiledPlan,
        completion_cb: Box<dyn FnOnce(Duration) + Send>,
    );

    fn render_pipeline_reflection(
        &self,
        desc: &dyn PipelineDescriptor,
        render_target_desc: &dyn RenderTargetDescriptor,
    ) -> Box<dyn Reflection>;

    fn compute_pipeline_reflection(&self, desc: &dyn PipelineDescriptor) -> Box<dyn Reflection>;

    fn argument_buffer_path(&self, set_index: u32, stages: Stages) -> BindingPath;

    /// Number of threads that execute in lockstep on the compute backend; used by the
    /// compute encoder to flag whether a dispatch's threadgroup size is a multiple of it.
    fn thread_execution_width(&self) -> u32;

    fn materialise_persistent_buffer(&self, resource: Handle);
    fn materialise_persistent_texture(&self, resource: Handle);
    fn register_window_texture(&self, texture: Handle, native_window: *mut std::ffi::c_void);

    /// Uploads `bytes` into one mip level / array slice of a texture (§6 "External
    /// Interfaces"). The caller is responsible for calling
    /// [`Backend::wait_for_cpu_access`]-style synchronisation before reusing `bytes`;
    /// the backend does not block here.
    fn replace_texture_region(
        &self,
        texture: Handle,
        level: u32,
        slice: u32,
        bytes_per_row: u32,
        bytes: &[u8],
    );

    /// A CPU-visible pointer to `buffer`'s storage over `range`, valid only for
    /// shared/managed-memory buffers; the caller must have already waited for any
    /// outstanding GPU write via the resource's `wait_for_cpu_access`.
    fn buffer_contents(&self, buffer: Handle, range: ResourceRange) -> *mut std::ffi::c_void;

    /// Tells the backend that the CPU just wrote into `range` of a managed-memory
    /// buffer obtained from [`Backend::buffer_contents`], so it can flush that range to
    /// the GPU before the next submission that reads it.
    fn buffer_did_modify_range(&self, buffer: Handle, range: ResourceRange);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binding_path_is_a_plain_value() {
        let a = BindingPath(1);
        let b = BindingPath(1);
        assert_eq!(a, b);
    }
}
