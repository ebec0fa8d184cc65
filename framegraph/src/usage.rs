//! Per-`(resource, pass)` usage records (§3 "Resource usage").

use bitflags::bitflags;

use crate::handle::Handle;

/// How a pass uses a resource.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UsageKind {
    Read,
    Write,
    ReadWrite,
    VertexBuffer,
    IndexBuffer,
    IndirectBuffer,
    BlitSource,
    BlitDestination,
    WriteOnlyRenderTarget,
    ReadWriteRenderTarget,
    UnusedRenderTarget,
    UnusedArgumentBuffer,
    BlitSync,
    ArgumentBuffer,
}

impl UsageKind {
    /// Whether this usage kind counts as a write for dependency-table purposes (§4.H
    /// phase 3: "for every subsequent pass that reads a written resource").
    pub fn is_write(self) -> bool {
        matches!(
            self,
            UsageKind::Write
                | UsageKind::ReadWrite
                | UsageKind::WriteOnlyRenderTarget
                | UsageKind::ReadWriteRenderTarget
                | UsageKind::BlitDestination
        )
    }

    pub fn is_read(self) -> bool {
        matches!(
            self,
            UsageKind::Read
                | UsageKind::ReadWrite
                | UsageKind::VertexBuffer
                | UsageKind::IndexBuffer
                | UsageKind::IndirectBuffer
                | UsageKind::BlitSource
                | UsageKind::ReadWriteRenderTarget
                | UsageKind::ArgumentBuffer
        )
    }
}

bitflags! {
    /// Pipeline stages a usage is visible from.
    pub struct Stages: u8 {
        const VERTEX          = 0b0000_0001;
        const FRAGMENT         = 0b0000_0010;
        const COMPUTE          = 0b0000_0100;
        const BLIT             = 0b0000_1000;
        const CPU_BEFORE_RENDER = 0b0001_0000;
    }
}

/// Which part of a resource a usage touches.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ResourceRange {
    Whole,
    Bytes { offset: u64, length: u64 },
    TextureSubresource { level_mask: u32, slice_mask: u32 },
}

/// A single `(resource, pass)` usage record.
#[derive(Clone, Debug)]
pub struct ResourceUsage {
    pub resource: Handle,
    pub kind: UsageKind,
    pub stages: Stages,
    pub range: ResourceRange,
    pub in_argument_buffer: bool,
    /// `[first, last]` command index inside the owning pass at the time the usage was
    /// recorded; rewritten to global command indices during compilation (§4.H phase 8).
    pub first_command_index: u32,
    pub last_command_index: u32,
    pub pass_index: usize,
}

impl ResourceUsage {
    pub fn new(
        resource: Handle,
        kind: UsageKind,
        stages: Stages,
        range: ResourceRange,
        command_index: u32,
        pass_index: usize,
    ) -> Self {
        ResourceUsage {
            resource,
            kind,
            stages,
            range,
            in_argument_buffer: false,
            first_command_index: command_index,
            last_command_index: command_index,
            pass_index,
        }
    }

    /// Extends the usage's upper bound, per "extend every usage... to
    /// `last_gpu_command_index + 1`" (§4.E step 1).
    pub fn extend_to(&mut self, command_index: u32) {
        if command_index > self.last_command_index {
            self.last_command_index = command_index;
        }
    }

    pub fn offset_by(&mut self, pass_command_start: u32) {
        self.first_command_index += pass_command_start;
        self.last_command_index += pass_command_start;
    }
}

/// Merges a freshly-compiled usage list into a resource's aggregated, order-stable list
/// (§4.H phase 8: "merge-or-append into the resource's aggregated usages list (stable
/// order)"), keeping the invariant that the result stays sorted by `first_command_index`
/// (§8 property 5).
pub fn merge_usage(usages: &mut Vec<ResourceUsage>, usage: ResourceUsage) {
    let pos = usages
        .iter()
        .position(|u| u.first_command_index > usage.first_command_index)
        .unwrap_or(usages.len());
    usages.insert(pos, usage);
}
