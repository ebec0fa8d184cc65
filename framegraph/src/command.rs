//! The tagged-union command stream (§3 "Command", §4.C).
//!
//! `render::command::CommandInner` is the closest existing analogue — a tagged union
//! whose variants are patched in place after a pipeline is bound (see
//! `CommandBuffer::bind_pipeline_interface`'s local `Visitor`). This module generalises
//! that to the frame graph's wider command vocabulary. Rather than the arena-raw-pointer
//! payload the spec describes literally, each pass keeps its own `Vec<Command>`: commands
//! are plain owned enum values, addressed by index, which gives the same "patch the
//! payload in place once reflection resolves it" behaviour without any unsafe code.

use smallvec::SmallVec;

use crate::backend::BindingPath;
use crate::handle::Handle;

/// One recorded GPU (or CPU-passthrough) command.
#[derive(Clone, Debug)]
pub enum Command {
    SetBytes {
        binding_path: Option<BindingPath>,
        offset: u32,
        length: u32,
    },
    SetBuffer {
        binding_path: Option<BindingPath>,
        handle: Handle,
        offset: u64,
        has_dynamic_offset: bool,
    },
    SetBufferOffset {
        binding_path: Option<BindingPath>,
        offset: u64,
    },
    SetSampler {
        binding_path: Option<BindingPath>,
        handle: Handle,
    },
    SetTexture {
        binding_path: Option<BindingPath>,
        handle: Handle,
    },
    SetArgumentBuffer {
        binding_path: Option<BindingPath>,
        handle: Handle,
    },
    SetArgumentBufferArray {
        binding_path: Option<BindingPath>,
        handle: Handle,
    },
    ClearRenderTargets {
        color_mask: u8,
        depth: bool,
        stencil: bool,
    },
    SetRenderPipelineDescriptor {
        descriptor_id: u64,
    },
    SetDepthStencilDescriptor {
        descriptor_id: u64,
    },
    SetVertexBuffer {
        index: u32,
        handle: Handle,
        offset: u64,
    },
    DrawPrimitives {
        vertex_count: u32,
        instance_count: u32,
        base_vertex: u32,
    },
    DrawIndexedPrimitives {
        index_count: u32,
        instance_count: u32,
        index_buffer: Handle,
    },
    SetComputePipelineDescriptor {
        descriptor_id: u64,
    },
    DispatchThreads {
        width: u32,
        height: u32,
        depth: u32,
    },
    DispatchThreadgroups {
        width: u32,
        height: u32,
        depth: u32,
    },
    DispatchThreadgroupsIndirect {
        indirect_buffer: Handle,
        offset: u64,
    },
    CopyBuffer {
        src: Handle,
        src_offset: u64,
        dst: Handle,
        dst_offset: u64,
        size: u64,
    },
    CopyTexture {
        src: Handle,
        dst: Handle,
    },
    FillBuffer {
        buffer: Handle,
        offset: u64,
        size: u64,
        value: u8,
    },
    GenerateMipmaps {
        texture: Handle,
    },
    SynchroniseBuffer {
        buffer: Handle,
    },
    SynchroniseTexture {
        texture: Handle,
    },
    SynchroniseTextureSlice {
        texture: Handle,
        slice: u32,
        level: u32,
    },
    /// Opaque payload the backend interprets; the core never looks inside it.
    External {
        label: String,
    },
    PushDebugGroup {
        label: String,
    },
    PopDebugGroup,
    Present {
        swapchain_texture: Handle,
    },
}

impl Command {
    /// The binding-path slot a binding command carries, if any; `None` either because
    /// this command never has one, or because it hasn't been resolved yet (the `nil`
    /// placeholder from §4.C).
    pub fn binding_path(&self) -> Option<BindingPath> {
        match self {
            Command::SetBytes { binding_path, .. }
            | Command::SetBuffer { binding_path, .. }
            | Command::SetBufferOffset { binding_path, .. }
            | Command::SetSampler { binding_path, .. }
            | Command::SetTexture { binding_path, .. }
            | Command::SetArgumentBuffer { binding_path, .. }
            | Command::SetArgumentBufferArray { binding_path, .. } => *binding_path,
            _ => None,
        }
    }

    /// Patches the resolved binding path into the command in place, per §4.C's
    /// "the encoder fills it in place once reflection resolves the key".
    pub fn set_binding_path(&mut self, path: BindingPath) {
        let slot = match self {
            Command::SetBytes { binding_path, .. }
            | Command::SetBuffer { binding_path, .. }
            | Command::SetBufferOffset { binding_path, .. }
            | Command::SetSampler { binding_path, .. }
            | Command::SetTexture { binding_path, .. }
            | Command::SetArgumentBuffer { binding_path, .. }
            | Command::SetArgumentBufferArray { binding_path, .. } => binding_path,
            other => panic!("{:?} does not carry a binding path", other),
        };
        *slot = Some(path);
    }

    /// The buffer handle a `SetBuffer`/`SetBufferOffset` pair concerns, used by the
    /// `set_buffer_offset` walk-back (§4.C).
    pub fn buffer_handle(&self) -> Option<Handle> {
        match self {
            Command::SetBuffer { handle, .. } => Some(*handle),
            _ => None,
        }
    }
}

/// A pass's locally recorded command sequence, addressed by index so that later phases
/// (binding resolution, global command indexing) can patch commands in place or look
/// a fixed number of slots backward. Most passes record only a handful of commands, so
/// this stays inline in a `SmallVec` rather than spilling every pass's stream to the heap.
#[derive(Default, Debug)]
pub struct CommandStream {
    commands: SmallVec<[Command; 8]>,
}

impl CommandStream {
    pub fn new() -> Self {
        CommandStream { commands: SmallVec::new() }
    }

    pub fn from_vec(commands: Vec<Command>) -> Self {
        CommandStream { commands: SmallVec::from_vec(commands) }
    }

    pub fn push(&mut self, command: Command) -> u32 {
        self.commands.push(command);
        (self.commands.len() - 1) as u32
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn get(&self, index: u32) -> &Command {
        &self.commands[index as usize]
    }

    pub fn get_mut(&mut self, index: u32) -> &mut Command {
        &mut self.commands[index as usize]
    }

    /// Walks backward from `from` looking for the nearest preceding `SetBuffer` command,
    /// used to find the controlling binding for a later `SetBufferOffset` (§4.C, §4.E
    /// step 3 "setBufferOffset").
    pub fn find_controlling_set_buffer(&mut self, from: u32) -> Option<u32> {
        let mut i = from as i64 - 1;
        while i >= 0 {
            if matches!(self.commands[i as usize], Command::SetBuffer { .. }) {
                return Some(i as u32);
            }
            i -= 1;
        }
        None
    }

    pub fn as_slice(&self) -> &[Command] {
        &self.commands
    }

    pub fn into_vec(self) -> Vec<Command> {
        self.commands.into_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::{Flags, ResourceKind};

    fn h() -> Handle {
        Handle::new(1, 0, Flags::empty(), 0, ResourceKind::Buffer)
    }

    #[test]
    fn binding_path_round_trips() {
        let mut c = Command::SetTexture {
            binding_path: None,
            handle: h(),
        };
        assert_eq!(c.binding_path(), None);
        c.set_binding_path(BindingPath(42));
        assert_eq!(c.binding_path(), Some(BindingPath(42)));
    }

    #[test]
    fn finds_controlling_set_buffer_by_walking_back() {
        let mut stream = CommandStream::new();
        stream.push(Command::SetTexture { binding_path: None, handle: h() });
        let set_buffer_idx = stream.push(Command::SetBuffer {
            binding_path: None,
            handle: h(),
            offset: 0,
            has_dynamic_offset: false,
        });
        let offset_idx = stream.push(Command::SetBufferOffset { binding_path: None, offset: 16 });
        assert_eq!(stream.find_controlling_set_buffer(offset_idx), Some(set_buffer_idx));
    }
}
