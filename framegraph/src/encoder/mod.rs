//! The resource-binding encoder (§4.E): the shared binding-recording machinery every
//! specialised encoder (render/compute/blit/external, §4.F) builds on.
//!
//! Grounded on `render::command::CommandBuffer::bind_pipeline_interface`'s local `Visitor`
//! (the closest existing analogue to "translate a declared interface into emitted
//! commands against a pipeline"); `update_resource_usages` itself has no direct corpus
//! analogue and is built from the numbered algorithm this crate's expanded spec lays out
//! in §4.E.

pub mod blit;
pub mod compute;
pub mod external;
pub mod render;

pub use blit::BlitEncoder;
pub use compute::ComputeEncoder;
pub use external::ExternalEncoder;
pub use render::RenderEncoder;

use fxhash::{FxHashMap, FxHashSet};

use crate::argument::{ArgumentBuffer, BindingKind};
use crate::backend::{BindingPath, Reflection};
use crate::command::Command;
use crate::handle::Handle;
use crate::usage::{ResourceRange, ResourceUsage, Stages, UsageKind};

/// A binding command queued for resolution against pipeline reflection, not yet known to
/// be live on the wire (§4.C "binding commands carry a binding_path placeholder at record
/// time"; here the placeholder is simply the command's absence from `commands` until
/// resolution decides it should be emitted).
#[derive(Clone, Debug)]
enum BindingCommandKind {
    SetBytes { offset: u32, length: u32 },
    SetBuffer { handle: Handle, offset: u64 },
    SetBufferOffset { offset: u64 },
    SetSampler { handle: Handle },
    SetTexture { handle: Handle },
}

fn bindings_equal(a: &BindingCommandKind, b: &BindingCommandKind) -> bool {
    match (a, b) {
        (BindingCommandKind::SetBuffer { handle: h0, offset: o0 }, BindingCommandKind::SetBuffer { handle: h1, offset: o1 }) => {
            h0 == h1 && o0 == o1
        }
        (BindingCommandKind::SetTexture { handle: h0 }, BindingCommandKind::SetTexture { handle: h1 }) => h0 == h1,
        (BindingCommandKind::SetSampler { handle: h0 }, BindingCommandKind::SetSampler { handle: h1 }) => h0 == h1,
        _ => false,
    }
}

#[derive(Clone, Debug)]
struct PendingBindingCommand {
    key: String,
    array_index: usize,
    kind: BindingCommandKind,
}

/// The role a pending argument-buffer binding plays (§4.D "standalone | in-array(i,
/// args_ptr)").
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ArgumentBufferRole {
    Standalone,
    InArray { slot: usize },
}

#[derive(Clone, Debug)]
struct PendingArgumentBuffer {
    key: String,
    handle: Handle,
    role: ArgumentBufferRole,
    assume_consistent_usage: bool,
}

/// What the encoder currently knows about a live binding at one binding path: the payload
/// it was last asked to bind, and (once the resource has actually been registered as
/// used) the index of its usage record in this encoder's local `usages`.
struct BoundBinding {
    kind: BindingCommandKind,
    usage_index: Option<usize>,
}

/// Records generic binding commands, deduplicates repeats, and — on every GPU-effecting
/// call — reconciles queued bindings against pipeline reflection (§4.E). Each specialised
/// encoder (§4.F) embeds one of these and forwards its binding operations to it.
pub struct ResourceBindingEncoder {
    pass_index: usize,
    commands: Vec<Command>,
    usages: Vec<ResourceUsage>,
    read: FxHashSet<Handle>,
    written: FxHashSet<Handle>,
    inline_bytes: Vec<u8>,
    pending_binding_commands: Vec<PendingBindingCommand>,
    pending_argument_buffers: Vec<PendingArgumentBuffer>,
    emitted_argument_buffer_arrays: FxHashSet<BindingPath>,
    bound_resources: FxHashMap<BindingPath, BoundBinding>,
    untracked_bound_resources: FxHashMap<BindingPath, BoundBinding>,
    last_gpu_command_index: u32,
    needs_update: bool,
    pipeline_state_changed: bool,
    current_pipeline_reflection: Option<Box<dyn Reflection>>,
}

impl ResourceBindingEncoder {
    pub fn new(pass_index: usize, pass_name: &str) -> Self {
        let mut enc = ResourceBindingEncoder {
            pass_index,
            commands: Vec::new(),
            usages: Vec::new(),
            read: FxHashSet::default(),
            written: FxHashSet::default(),
            inline_bytes: Vec::new(),
            pending_binding_commands: Vec::new(),
            pending_argument_buffers: Vec::new(),
            emitted_argument_buffer_arrays: FxHashSet::default(),
            bound_resources: FxHashMap::default(),
            untracked_bound_resources: FxHashMap::default(),
            last_gpu_command_index: 0,
            needs_update: false,
            pipeline_state_changed: false,
            current_pipeline_reflection: None,
        };
        enc.commands.push(Command::PushDebugGroup { label: pass_name.to_string() });
        enc
    }

    pub fn pass_index(&self) -> usize {
        self.pass_index
    }

    pub fn last_command_index(&self) -> u32 {
        self.commands.len().saturating_sub(1) as u32
    }

    fn next_command_index(&self) -> u32 {
        self.commands.len() as u32
    }

    /// Sets (or replaces) the pipeline this encoder is recording against. A programmer
    /// error to issue any binding command before this is ever called, per §7's "issuing
    /// GPU commands without a bound pipeline".
    pub fn set_pipeline_reflection(&mut self, reflection: Box<dyn Reflection>) {
        self.current_pipeline_reflection = Some(reflection);
        self.pipeline_state_changed = true;
        self.needs_update = true;
    }

    pub fn has_pipeline(&self) -> bool {
        self.current_pipeline_reflection.is_some()
    }

    fn queue(&mut self, key: impl Into<String>, array_index: usize, kind: BindingCommandKind) {
        self.pending_binding_commands.push(PendingBindingCommand { key: key.into(), array_index, kind });
        self.needs_update = true;
    }

    pub fn set_bytes(&mut self, key: impl Into<String>, array_index: usize, bytes: &[u8]) {
        let offset = self.inline_bytes.len() as u32;
        self.inline_bytes.extend_from_slice(bytes);
        self.queue(key, array_index, BindingCommandKind::SetBytes { offset, length: bytes.len() as u32 });
    }

    /// `set_value<T>` (§4.E) as a thin wrapper over `set_bytes`: `T` must be a
    /// `Copy` plain-old-data type, mirroring the POD constraint the spec itself states.
    pub fn set_value<T: Copy>(&mut self, key: impl Into<String>, array_index: usize, value: T) {
        let bytes = unsafe {
            std::slice::from_raw_parts(&value as *const T as *const u8, std::mem::size_of::<T>())
        };
        self.set_bytes(key, array_index, bytes);
    }

    pub fn set_buffer(&mut self, key: impl Into<String>, array_index: usize, handle: Handle, offset: u64) {
        self.queue(key, array_index, BindingCommandKind::SetBuffer { handle, offset });
    }

    pub fn set_buffer_offset(&mut self, key: impl Into<String>, array_index: usize, offset: u64) {
        self.queue(key, array_index, BindingCommandKind::SetBufferOffset { offset });
    }

    pub fn set_sampler(&mut self, key: impl Into<String>, array_index: usize, handle: Handle) {
        self.queue(key, array_index, BindingCommandKind::SetSampler { handle });
    }

    pub fn set_texture(&mut self, key: impl Into<String>, array_index: usize, handle: Handle) {
        self.queue(key, array_index, BindingCommandKind::SetTexture { handle });
    }

    pub fn set_argument_buffer(&mut self, key: impl Into<String>, handle: Handle) {
        self.pending_argument_buffers.push(PendingArgumentBuffer {
            key: key.into(),
            handle,
            role: ArgumentBufferRole::Standalone,
            assume_consistent_usage: false,
        });
        self.needs_update = true;
    }

    pub fn set_argument_buffer_array(&mut self, key: impl Into<String>, array: &[Handle], assume_consistent_usage: bool) {
        let key = key.into();
        for (slot, &handle) in array.iter().enumerate() {
            self.pending_argument_buffers.push(PendingArgumentBuffer {
                key: key.clone(),
                handle,
                role: ArgumentBufferRole::InArray { slot },
                assume_consistent_usage,
            });
        }
        self.needs_update = true;
    }

    pub fn set_arguments(&mut self, encodable: &dyn crate::argument::Encodable) {
        encodable.encode_into(self);
    }

    /// The central reconciliation algorithm (§4.E). Called before every GPU-effecting
    /// command and once more at `end_encoding` with `ending = true`.
    pub fn update_resource_usages(&mut self, ending: bool) {
        if ending {
            let extend_to = self.last_gpu_command_index + 1;
            for b in self.bound_resources.values().chain(self.untracked_bound_resources.values()) {
                if let Some(idx) = b.usage_index {
                    self.usages[idx].extend_to(extend_to);
                }
            }
            return;
        }
        if !self.needs_update {
            return;
        }
        let pipeline_changed = self.pipeline_state_changed;
        let reflection = self
            .current_pipeline_reflection
            .take()
            .expect("update_resource_usages: no pipeline set");

        let pending = std::mem::take(&mut self.pending_binding_commands);
        let mut still_pending = Vec::with_capacity(pending.len());
        for cmd in pending {
            match reflection.binding_path(&cmd.key, cmd.array_index, None) {
                None => still_pending.push(cmd),
                Some(path) => self.resolve_binding_command(path, cmd, pipeline_changed, reflection.as_ref()),
            }
        }
        self.pending_binding_commands = still_pending;

        let pending_abs = std::mem::take(&mut self.pending_argument_buffers);
        let mut still_pending_abs = Vec::with_capacity(pending_abs.len());
        for pab in pending_abs {
            if let Some(pab) = self.resolve_argument_buffer(pab, reflection.as_ref()) {
                still_pending_abs.push(pab);
            }
        }
        self.pending_argument_buffers = still_pending_abs;

        if pipeline_changed {
            self.reexamine_tracked_bindings(reflection.as_ref());
        }

        self.current_pipeline_reflection = Some(reflection);
        self.pipeline_state_changed = false;
        self.needs_update = false;
    }

    fn resolve_binding_command(
        &mut self,
        path: BindingPath,
        cmd: PendingBindingCommand,
        pipeline_changed: bool,
        reflection: &dyn Reflection,
    ) {
        match cmd.kind {
            BindingCommandKind::SetBytes { offset, length } => {
                self.commands.push(Command::SetBytes { binding_path: Some(path), offset, length });
            }
            BindingCommandKind::SetSampler { handle } => {
                self.commands.push(Command::SetSampler { binding_path: Some(path), handle });
            }
            BindingCommandKind::SetBufferOffset { offset } => {
                self.commands.push(Command::SetBufferOffset { binding_path: Some(path), offset });
                let target = self.commands.len() as u32 - 1;
                match self.find_controlling_set_buffer(path) {
                    Some(idx) => {
                        if let Command::SetBuffer { has_dynamic_offset, .. } = &mut self.commands[idx as usize] {
                            *has_dynamic_offset = true;
                        }
                    }
                    None => {
                        debug_assert!(
                            false,
                            "set_buffer_offset(key={}) at command {} has no controlling set_buffer",
                            cmd.key, target
                        );
                    }
                }
            }
            kind @ (BindingCommandKind::SetBuffer { .. } | BindingCommandKind::SetTexture { .. }) => {
                self.bind_trackable(path, kind, pipeline_changed, reflection);
            }
        }
    }

    /// Finds the nearest emitted `SetBuffer` command bound at `path`, for
    /// `set_buffer_offset`'s walk-back (§4.C, §4.E "setBufferOffset").
    fn find_controlling_set_buffer(&self, path: BindingPath) -> Option<u32> {
        self.commands.iter().enumerate().rev().find_map(|(i, c)| match c {
            Command::SetBuffer { binding_path, .. } if *binding_path == Some(path) => Some(i as u32),
            _ => None,
        })
    }

    fn bind_trackable(&mut self, path: BindingPath, kind: BindingCommandKind, pipeline_changed: bool, reflection: &dyn Reflection) {
        let elide = !pipeline_changed
            && self
                .bound_resources
                .get(&path)
                .or_else(|| self.untracked_bound_resources.get(&path))
                .map_or(false, |prev| bindings_equal(&prev.kind, &kind));
        if elide {
            let idx = self.next_command_index();
            if let Some(usage_idx) = self
                .bound_resources
                .get(&path)
                .or_else(|| self.untracked_bound_resources.get(&path))
                .and_then(|b| b.usage_index)
            {
                self.usages[usage_idx].extend_to(idx);
            }
            return;
        }

        // Replacing whatever was bound at this path before: close its usage interval.
        if let Some(prev) = self.bound_resources.remove(&path) {
            if let Some(usage_idx) = prev.usage_index {
                self.usages[usage_idx].extend_to(self.last_gpu_command_index);
            }
        }

        let active = reflection.binding_is_active(path);
        if active {
            self.emit_and_track(path, kind, reflection);
        } else {
            self.bound_resources.insert(path, BoundBinding { kind, usage_index: None });
        }
    }

    fn emit_and_track(&mut self, path: BindingPath, kind: BindingCommandKind, reflection: &dyn Reflection) {
        let command = match &kind {
            BindingCommandKind::SetBuffer { handle, offset } => Command::SetBuffer {
                binding_path: Some(path),
                handle: *handle,
                offset: *offset,
                has_dynamic_offset: false,
            },
            BindingCommandKind::SetTexture { handle } => Command::SetTexture { binding_path: Some(path), handle: *handle },
            _ => unreachable!("emit_and_track only called for buffer/texture bindings"),
        };
        let command_index = self.commands.len() as u32;
        self.commands.push(command);

        let handle = match &kind {
            BindingCommandKind::SetBuffer { handle, .. } | BindingCommandKind::SetTexture { handle } => *handle,
            _ => unreachable!(),
        };
        let refl = reflection.argument_reflection(path);
        let (usage_kind, stages) = refl.map_or((UsageKind::Read, Stages::empty()), |r| (r.kind, r.stages));
        if usage_kind.is_write() {
            self.written.insert(handle);
        }
        if usage_kind.is_read() {
            self.read.insert(handle);
        }
        let usage_idx = self.usages.len();
        self.usages.push(ResourceUsage::new(handle, usage_kind, stages, ResourceRange::Whole, command_index, self.pass_index));
        self.bound_resources.insert(path, BoundBinding { kind, usage_index: Some(usage_idx) });
    }

    /// §4.E step 4's argument-buffer handling, for one pending entry: resolves an
    /// argument-buffer binding path from the user key, registers the argument buffer
    /// resource's own usage, and emits `set_argument_buffer`/`set_argument_buffer_array`
    /// (the latter once, on the first active slot). Returns `Some` if still unresolved.
    fn resolve_argument_buffer(&mut self, pab: PendingArgumentBuffer, reflection: &dyn Reflection) -> Option<PendingArgumentBuffer> {
        let path = reflection.binding_path(&pab.key, 0, None)?;
        if !reflection.binding_is_active(path) {
            return Some(pab);
        }
        match pab.role {
            ArgumentBufferRole::Standalone => {
                let idx = self.commands.len() as u32;
                self.commands.push(Command::SetArgumentBuffer { binding_path: Some(path), handle: pab.handle });
                self.register_argument_buffer_usage(pab.handle, idx, pab.assume_consistent_usage, path);
            }
            ArgumentBufferRole::InArray { .. } => {
                if self.emitted_argument_buffer_arrays.insert(path) {
                    let idx = self.commands.len() as u32;
                    self.commands.push(Command::SetArgumentBufferArray { binding_path: Some(path), handle: pab.handle });
                    self.register_argument_buffer_usage(pab.handle, idx, pab.assume_consistent_usage, path);
                } else {
                    self.register_argument_buffer_usage(pab.handle, self.last_command_index(), pab.assume_consistent_usage, path);
                }
            }
        }
        None
    }

    fn register_argument_buffer_usage(&mut self, handle: Handle, command_index: u32, assume_consistent_usage: bool, path: BindingPath) {
        self.read.insert(handle);
        let usage_idx = self.usages.len();
        self.usages.push(ResourceUsage::new(
            handle,
            UsageKind::ArgumentBuffer,
            Stages::empty(),
            ResourceRange::Whole,
            command_index,
            self.pass_index,
        ));
        let entry = BoundBinding { kind: BindingCommandKind::SetBuffer { handle, offset: 0 }, usage_index: Some(usage_idx) };
        if assume_consistent_usage {
            self.untracked_bound_resources.insert(path, entry);
        } else {
            self.bound_resources.insert(path, entry);
        }
    }

    /// Translates one argument buffer's own pending bindings (its internal slots, as
    /// opposed to the argument buffer *itself* being bound to the pipeline above) and
    /// registers a usage for every resource found inside it, or an `unused_argument_buffer`
    /// usage for the argument buffer as a whole if a slot cannot be resolved at all
    /// (§4.D, §4.H step 4 "for each pending entry in the argument buffer..."). Run by the
    /// compiler once per argument buffer discovered in a pass's usages, not by the encoder
    /// itself, since it needs the argument buffer's own pending-list storage.
    pub fn translate_argument_buffer_contents(
        argbuf: &mut ArgumentBuffer,
        reflection: &dyn Reflection,
        argument_buffer_path: BindingPath,
    ) -> Vec<ResourceUsage> {
        let mut usages = Vec::new();
        let mut any_unresolved = false;
        argbuf.translate_enqueued_bindings(|key, array_index, kind| {
            match reflection.binding_path(key, array_index, Some(argument_buffer_path)) {
                Some(path) => {
                    if let BindingKind::Buffer { handle, .. } | BindingKind::Texture { handle } | BindingKind::Sampler { handle } = kind {
                        usages.push(ResourceUsage::new(*handle, UsageKind::Read, Stages::empty(), ResourceRange::Whole, 0, 0));
                    }
                    Some(path)
                }
                None => {
                    any_unresolved = true;
                    None
                }
            }
        });
        if any_unresolved {
            usages.push(ResourceUsage::new(
                argbuf.handle(),
                UsageKind::UnusedArgumentBuffer,
                Stages::empty(),
                ResourceRange::Whole,
                0,
                0,
            ));
        }
        usages
    }

    /// §4.E step 5: on a pipeline change, re-examine every tracked bound record: emit
    /// newly-active ones that were never emitted, close newly-inactive ones, and move
    /// consistent-usage bindings into the untracked map.
    fn reexamine_tracked_bindings(&mut self, reflection: &dyn Reflection) {
        let paths: Vec<BindingPath> = self.bound_resources.keys().copied().collect();
        for path in paths {
            let active = reflection.binding_is_active(path);
            let entry = self.bound_resources.get(&path).unwrap();
            match (active, entry.usage_index) {
                (true, None) => {
                    let kind = entry.kind.clone();
                    self.emit_and_track(path, kind, reflection);
                }
                (false, Some(usage_idx)) => {
                    self.usages[usage_idx].extend_to(self.last_gpu_command_index);
                    self.bound_resources.get_mut(&path).unwrap().usage_index = None;
                }
                _ => {}
            }
        }
    }

    /// Closes every bound usage range and clears the binding queues, per §4.E
    /// `reset_all_bindings()`.
    pub fn reset_all_bindings(&mut self) {
        for b in self.bound_resources.values().chain(self.untracked_bound_resources.values()) {
            if let Some(idx) = b.usage_index {
                self.usages[idx].extend_to(self.last_gpu_command_index);
            }
        }
        self.bound_resources.clear();
        self.untracked_bound_resources.clear();
        self.pending_binding_commands.clear();
        self.pending_argument_buffers.clear();
        self.emitted_argument_buffer_arrays.clear();
    }

    /// Called immediately before every GPU-effecting command (draw/dispatch/copy); updates
    /// bindings, then advances `last_gpu_command_index` past the command about to be
    /// pushed by the caller.
    pub fn before_gpu_command(&mut self) {
        self.update_resource_usages(false);
    }

    pub fn push(&mut self, command: Command) -> u32 {
        let idx = self.commands.len() as u32;
        self.commands.push(command);
        self.last_gpu_command_index = idx;
        idx
    }

    pub fn note_resource_read(&mut self, handle: Handle) {
        self.read.insert(handle);
    }

    pub fn note_resource_written(&mut self, handle: Handle) {
        self.written.insert(handle);
    }

    pub fn push_usage(&mut self, usage: ResourceUsage) -> usize {
        let idx = self.usages.len();
        self.usages.push(usage);
        idx
    }

    pub fn usages_mut(&mut self) -> &mut Vec<ResourceUsage> {
        &mut self.usages
    }

    pub fn last_gpu_command_index(&self) -> u32 {
        self.last_gpu_command_index
    }

    /// `end_encoding` (§4.E): final reconciliation plus the pass's closing debug-group pop.
    pub fn end_encoding(&mut self) {
        self.update_resource_usages(true);
        self.commands.push(Command::PopDebugGroup);
    }

    /// Hands over everything recorded, for the compiler to fold into a `PassRecord`.
    pub fn into_parts(self) -> (Vec<Command>, Vec<ResourceUsage>, FxHashSet<Handle>, FxHashSet<Handle>) {
        (self.commands, self.usages, self.read, self.written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ArgumentReflection;
    use crate::handle::{Flags, ResourceKind};

    #[derive(Debug)]
    struct FakeReflection {
        active: FxHashSet<u64>,
    }

    impl Reflection for FakeReflection {
        fn binding_path(&self, name: &str, _array_index: usize, _arg_buf: Option<BindingPath>) -> Option<BindingPath> {
            match name {
                "tex" => Some(BindingPath(1)),
                "buf" => Some(BindingPath(2)),
                _ => None,
            }
        }
        fn binding_is_active(&self, path: BindingPath) -> bool {
            self.active.contains(&path.0)
        }
        fn argument_reflection(&self, path: BindingPath) -> Option<ArgumentReflection> {
            Some(ArgumentReflection { binding_path: path, kind: UsageKind::Read, stages: Stages::FRAGMENT, is_active: self.binding_is_active(path) })
        }
        fn argument_buffer_encoder(&self, _path: BindingPath) -> Option<Box<dyn crate::backend::UnmanagedObject>> {
            None
        }
        fn remap_binding_path(&self, _in_original: BindingPath, new_path: BindingPath) -> BindingPath {
            new_path
        }
        fn remap_argument_buffer_path_for_active_stages(&self, path: BindingPath) -> BindingPath {
            path
        }
    }

    fn tex_handle() -> Handle {
        Handle::new(7, 0, Flags::empty(), 0, ResourceKind::Texture)
    }

    #[test]
    fn late_binding_resolves_once_pipeline_is_set() {
        let mut enc = ResourceBindingEncoder::new(0, "compute");
        enc.set_texture("tex", 0, tex_handle());
        assert!(enc.commands.len() == 1, "only the debug-group push so far");

        let mut active = FxHashSet::default();
        active.insert(1u64);
        enc.set_pipeline_reflection(Box::new(FakeReflection { active }));
        enc.update_resource_usages(false);

        let emitted = enc.commands.iter().filter(|c| matches!(c, Command::SetTexture { .. })).count();
        assert_eq!(emitted, 1);
        assert_eq!(enc.usages.len(), 1);
    }

    #[test]
    fn duplicate_buffer_binding_is_elided() {
        let mut enc = ResourceBindingEncoder::new(0, "compute");
        let mut active = FxHashSet::default();
        active.insert(2u64);
        enc.set_pipeline_reflection(Box::new(FakeReflection { active }));

        let buf = Handle::new(3, 0, Flags::empty(), 0, ResourceKind::Buffer);
        enc.set_buffer("buf", 0, buf, 0);
        enc.update_resource_usages(false);
        enc.set_buffer("buf", 0, buf, 0);
        enc.update_resource_usages(false);

        let emitted = enc.commands.iter().filter(|c| matches!(c, Command::SetBuffer { .. })).count();
        assert_eq!(emitted, 1, "second identical binding should be elided");
        assert_eq!(enc.usages.len(), 1);
    }

    #[test]
    fn inactive_binding_stays_unemitted_until_pipeline_change() {
        let mut enc = ResourceBindingEncoder::new(0, "compute");
        enc.set_pipeline_reflection(Box::new(FakeReflection { active: FxHashSet::default() }));
        let buf = Handle::new(3, 0, Flags::empty(), 0, ResourceKind::Buffer);
        enc.set_buffer("buf", 0, buf, 0);
        enc.update_resource_usages(false);
        assert!(!enc.commands.iter().any(|c| matches!(c, Command::SetBuffer { .. })));

        let mut active = FxHashSet::default();
        active.insert(2u64);
        enc.set_pipeline_reflection(Box::new(FakeReflection { active }));
        enc.update_resource_usages(false);
        assert!(enc.commands.iter().any(|c| matches!(c, Command::SetBuffer { .. })));
    }
}
