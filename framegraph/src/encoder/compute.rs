//! The compute encoder (§4.F "compute encoder").

use crate::backend::{PipelineDescriptor, Reflection};
use crate::command::Command;
use crate::encoder::ResourceBindingEncoder;
use crate::handle::Handle;
use crate::usage::{ResourceRange, ResourceUsage, Stages, UsageKind};

pub struct ComputeEncoder {
    binding: ResourceBindingEncoder,
    thread_execution_width: u32,
}

impl ComputeEncoder {
    pub fn new(pass_index: usize, pass_name: &str, thread_execution_width: u32) -> Self {
        ComputeEncoder { binding: ResourceBindingEncoder::new(pass_index, pass_name), thread_execution_width }
    }

    pub fn set_compute_pipeline_descriptor(&mut self, descriptor: &dyn PipelineDescriptor, reflection: Box<dyn Reflection>) {
        let _ = descriptor;
        self.binding.push(Command::SetComputePipelineDescriptor { descriptor_id: 0 });
        self.binding.set_pipeline_reflection(reflection);
    }

    pub fn set_bytes(&mut self, key: impl Into<String>, array_index: usize, bytes: &[u8]) {
        self.binding.set_bytes(key, array_index, bytes);
    }

    pub fn set_buffer(&mut self, key: impl Into<String>, array_index: usize, handle: Handle, offset: u64) {
        self.binding.set_buffer(key, array_index, handle, offset);
    }

    pub fn set_buffer_offset(&mut self, key: impl Into<String>, array_index: usize, offset: u64) {
        self.binding.set_buffer_offset(key, array_index, offset);
    }

    pub fn set_texture(&mut self, key: impl Into<String>, array_index: usize, handle: Handle) {
        self.binding.set_texture(key, array_index, handle);
    }

    pub fn set_sampler(&mut self, key: impl Into<String>, array_index: usize, handle: Handle) {
        self.binding.set_sampler(key, array_index, handle);
    }

    pub fn set_argument_buffer(&mut self, key: impl Into<String>, handle: Handle) {
        self.binding.set_argument_buffer(key, handle);
    }

    pub fn set_argument_buffer_array(&mut self, key: impl Into<String>, array: &[Handle], assume_consistent_usage: bool) {
        self.binding.set_argument_buffer_array(key, array, assume_consistent_usage);
    }

    pub fn set_arguments(&mut self, encodable: &dyn crate::argument::Encodable) {
        self.binding.set_arguments(encodable);
    }

    pub fn dispatch_threads(&mut self, width: u32, height: u32, depth: u32) {
        self.binding.before_gpu_command();
        self.binding.push(Command::DispatchThreads { width, height, depth });
    }

    /// `threadgroups_per_grid` times `threads_per_threadgroup` must be a multiple of
    /// `thread_execution_width` for the dispatch to use the hardware's lockstep execution
    /// efficiently; the encoder only flags the mismatch (`debug_assert!`), since a
    /// suboptimal but still-correct dispatch is not a programmer-contract violation.
    pub fn dispatch_threadgroups(&mut self, width: u32, height: u32, depth: u32, threads_per_threadgroup: u32) {
        debug_assert!(
            threads_per_threadgroup % self.thread_execution_width == 0,
            "threadgroup size {} is not a multiple of the thread execution width {}",
            threads_per_threadgroup,
            self.thread_execution_width
        );
        self.binding.before_gpu_command();
        self.binding.push(Command::DispatchThreadgroups { width, height, depth });
    }

    pub fn dispatch_threadgroups_indirect(&mut self, indirect_buffer: Handle, offset: u64) {
        self.binding.before_gpu_command();
        self.binding.push(Command::DispatchThreadgroupsIndirect { indirect_buffer, offset });
        let idx = self.binding.push_usage(ResourceUsage::new(
            indirect_buffer,
            UsageKind::IndirectBuffer,
            Stages::COMPUTE,
            ResourceRange::Whole,
            self.binding.last_command_index(),
            self.binding.pass_index(),
        ));
        let _ = idx;
        self.binding.note_resource_read(indirect_buffer);
    }

    pub fn end_encoding(mut self) -> (Vec<Command>, Vec<ResourceUsage>, fxhash::FxHashSet<Handle>, fxhash::FxHashSet<Handle>) {
        self.binding.end_encoding();
        self.binding.into_parts()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::{Flags, ResourceKind};

    #[test]
    fn indirect_dispatch_records_a_read_usage_on_the_compute_stage() {
        let mut enc = ComputeEncoder::new(0, "test", 32);
        let buf = Handle::new(1, 0, Flags::empty(), 0, ResourceKind::Buffer);
        enc.dispatch_threadgroups_indirect(buf, 0);
        let (_, usages, read, _) = enc.end_encoding();
        assert!(read.contains(&buf));
        assert!(usages.iter().any(|u| u.kind == UsageKind::IndirectBuffer && u.stages.contains(Stages::COMPUTE)));
    }

    #[test]
    fn dispatch_threadgroups_flags_non_multiple_threadgroup_size_in_debug() {
        let mut enc = ComputeEncoder::new(0, "test", 32);
        // In release this would be a silent inefficiency, not a correctness bug;
        // exercised here only to document the expectation, not to assert the panic
        // (debug_assert! is compiled out in release builds).
        enc.dispatch_threadgroups(1, 1, 1, 32);
    }
}
