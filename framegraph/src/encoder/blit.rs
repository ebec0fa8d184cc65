//! The blit encoder (§4.F "blit encoder"): stateless beyond its debug-group label, since
//! blit operations need no pipeline/reflection at all — every operand is a concrete
//! handle and usages are recorded directly rather than through binding-path resolution.

use crate::command::Command;
use crate::encoder::ResourceBindingEncoder;
use crate::handle::Handle;
use crate::usage::{ResourceRange, ResourceUsage, Stages, UsageKind};

pub struct BlitEncoder {
    binding: ResourceBindingEncoder,
}

impl BlitEncoder {
    pub fn new(pass_index: usize, pass_name: &str) -> Self {
        BlitEncoder { binding: ResourceBindingEncoder::new(pass_index, pass_name) }
    }

    fn record_usage(&mut self, handle: Handle, kind: UsageKind, command_index: u32) {
        if kind.is_write() {
            self.binding.note_resource_written(handle);
        }
        // `BlitSync` observes whatever the resource's last GPU write left behind, so it
        // counts as a read for dependency purposes even though it is neither `is_read()`
        // nor `is_write()` in the usage-kind taxonomy (it's a CPU-visibility wait, not a
        // content access).
        if kind.is_read() || kind == UsageKind::BlitSync {
            self.binding.note_resource_read(handle);
        }
        self.binding.push_usage(ResourceUsage::new(handle, kind, Stages::BLIT, ResourceRange::Whole, command_index, self.binding.pass_index()));
    }

    pub fn copy_buffer(&mut self, src: Handle, src_offset: u64, dst: Handle, dst_offset: u64, size: u64) {
        let idx = self.binding.push(Command::CopyBuffer { src, src_offset, dst, dst_offset, size });
        self.record_usage(src, UsageKind::BlitSource, idx);
        self.record_usage(dst, UsageKind::BlitDestination, idx);
    }

    pub fn copy_texture(&mut self, src: Handle, dst: Handle) {
        let idx = self.binding.push(Command::CopyTexture { src, dst });
        self.record_usage(src, UsageKind::BlitSource, idx);
        self.record_usage(dst, UsageKind::BlitDestination, idx);
    }

    pub fn fill_buffer(&mut self, buffer: Handle, offset: u64, size: u64, value: u8) {
        let idx = self.binding.push(Command::FillBuffer { buffer, offset, size, value });
        self.record_usage(buffer, UsageKind::BlitDestination, idx);
    }

    pub fn generate_mipmaps(&mut self, texture: Handle) {
        let idx = self.binding.push(Command::GenerateMipmaps { texture });
        self.record_usage(texture, UsageKind::BlitDestination, idx);
    }

    pub fn synchronise_buffer(&mut self, buffer: Handle) {
        let idx = self.binding.push(Command::SynchroniseBuffer { buffer });
        self.record_usage(buffer, UsageKind::BlitSync, idx);
    }

    pub fn synchronise_texture(&mut self, texture: Handle) {
        let idx = self.binding.push(Command::SynchroniseTexture { texture });
        self.record_usage(texture, UsageKind::BlitSync, idx);
    }

    /// Synchronises a single mip/array slice rather than the whole texture; the usage's
    /// range carries the affected subresource mask so dependency analysis does not
    /// over-serialise unrelated slices of the same texture.
    pub fn synchronise_texture_slice(&mut self, texture: Handle, slice: u32, level: u32) {
        let idx = self.binding.push(Command::SynchroniseTextureSlice { texture, slice, level });
        let range = ResourceRange::TextureSubresource { level_mask: 1 << level, slice_mask: 1 << slice };
        self.binding.note_resource_read(texture);
        self.binding
            .push_usage(ResourceUsage::new(texture, UsageKind::BlitSync, Stages::BLIT, range, idx, self.binding.pass_index()));
    }

    pub fn end_encoding(mut self) -> (Vec<Command>, Vec<ResourceUsage>, fxhash::FxHashSet<Handle>, fxhash::FxHashSet<Handle>) {
        self.binding.end_encoding();
        self.binding.into_parts()
    }
}
