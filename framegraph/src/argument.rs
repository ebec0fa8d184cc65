//! Argument buffers (§3, §4.D): a resource of kind
//! [`ArgumentBuffer`](crate::handle::ResourceKind::ArgumentBuffer) that accepts bindings
//! under user keys and translates them to backend binding paths once reflection is
//! available.
//!
//! Grounded on `render::descriptor::Descriptor`'s binding-kind taxonomy (SampledImage /
//! Image / Buffer / Empty), widened here with the sampler and inline-bytes cases the
//! frame graph's argument buffers also carry.

use std::sync::Mutex;

use fxhash::FxHashMap;

use crate::backend::{BindingPath, UnmanagedObject};
use crate::handle::Handle;

/// One binding an argument buffer can hold, before or after path resolution.
#[derive(Clone, Debug)]
pub enum BindingKind {
    Buffer { handle: Handle, offset: u64 },
    Texture { handle: Handle },
    Sampler { handle: Handle },
    InlineBytes { offset: u32, length: u32 },
}

/// A binding queued under a user key, not yet resolved to a binding path.
#[derive(Clone, Debug)]
pub struct PendingBinding {
    pub key: String,
    pub array_index: usize,
    pub kind: BindingKind,
}

/// A binding that has been resolved to a concrete backend slot.
#[derive(Clone, Debug)]
pub struct ResolvedBinding {
    pub binding_path: BindingPath,
    pub kind: BindingKind,
}

/// A resource of kind `ArgumentBuffer`: an ordered pending-binding list, an ordered
/// resolved-binding list, and an append-only inline byte slab for `set_bytes`.
pub struct ArgumentBuffer {
    handle: Handle,
    is_persistent: bool,
    pending: Vec<PendingBinding>,
    resolved: Vec<ResolvedBinding>,
    inline_bytes: Mutex<Vec<u8>>,
    encoder: Mutex<Option<Box<dyn UnmanagedObject>>>,
}

impl ArgumentBuffer {
    pub fn new(handle: Handle, is_persistent: bool) -> Self {
        ArgumentBuffer {
            handle,
            is_persistent,
            pending: Vec::new(),
            resolved: Vec::new(),
            inline_bytes: Mutex::new(Vec::new()),
            encoder: Mutex::new(None),
        }
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// Appends bytes to the inline storage slab and queues a pending `InlineBytes`
    /// binding for them. Contract: mixing a transient source resource into a persistent
    /// argument buffer is a programmer error handled by [`ArgumentBuffer::bind_resource`],
    /// not here — raw bytes have no resource identity to validate.
    pub fn set_bytes(&mut self, key: impl Into<String>, array_index: usize, bytes: &[u8]) {
        let offset = {
            let mut slab = self.inline_bytes.lock().unwrap();
            let offset = slab.len() as u32;
            slab.extend_from_slice(bytes);
            offset
        };
        self.pending.push(PendingBinding {
            key: key.into(),
            array_index,
            kind: BindingKind::InlineBytes {
                offset,
                length: bytes.len() as u32,
            },
        });
    }

    pub fn set_buffer(&mut self, key: impl Into<String>, array_index: usize, handle: Handle, offset: u64) {
        self.bind_resource(key, array_index, handle, BindingKind::Buffer { handle, offset });
    }

    pub fn set_texture(&mut self, key: impl Into<String>, array_index: usize, handle: Handle) {
        self.bind_resource(key, array_index, handle, BindingKind::Texture { handle });
    }

    pub fn set_sampler(&mut self, key: impl Into<String>, array_index: usize, handle: Handle) {
        self.bind_resource(key, array_index, handle, BindingKind::Sampler { handle });
    }

    /// Enforces §7's "mixing persistent/transient in argument buffers" contract
    /// violation: a persistent argument buffer may only bind persistent resources.
    fn bind_resource(&mut self, key: impl Into<String>, array_index: usize, bound: Handle, kind: BindingKind) {
        if self.is_persistent {
            assert!(
                bound.is_persistent(),
                "cannot bind a transient resource into a persistent argument buffer"
            );
        }
        self.pending.push(PendingBinding {
            key: key.into(),
            array_index,
            kind,
        });
    }

    pub fn pending(&self) -> &[PendingBinding] {
        &self.pending
    }

    pub fn resolved(&self) -> &[ResolvedBinding] {
        &self.resolved
    }

    pub fn set_encoder(&self, encoder: Box<dyn UnmanagedObject>) {
        *self.encoder.lock().unwrap() = Some(encoder);
    }

    /// Scans the pending list, resolving each entry against `resolve`. Resolved entries
    /// move to the resolved list (in scan order, i.e. stable); unresolved entries stay
    /// pending for a future pipeline state to resolve (§4.D, §8 property 9).
    pub fn translate_enqueued_bindings(
        &mut self,
        mut resolve: impl FnMut(&str, usize, &BindingKind) -> Option<BindingPath>,
    ) {
        let mut still_pending = Vec::with_capacity(self.pending.len());
        for entry in self.pending.drain(..) {
            match resolve(&entry.key, entry.array_index, &entry.kind) {
                Some(path) => self.resolved.push(ResolvedBinding {
                    binding_path: path,
                    kind: entry.kind,
                }),
                None => still_pending.push(entry),
            }
        }
        self.pending = still_pending;
    }
}

/// Implemented by `#[derive(Encodable)]`-generated types: translates a user-declared
/// struct into a sequence of binding calls against a resource-binding encoder, field by
/// field in declaration order.
pub trait Encodable {
    fn encode_into(&self, encoder: &mut crate::encoder::ResourceBindingEncoder);
}

/// Per-registry lookup of argument buffers by the handle that names them, mirroring the
/// registries' "single logical writer at a time" policy (§4.A): the map itself is
/// guarded, the argument buffers it hands out are not.
#[derive(Default)]
pub struct ArgumentBufferTable {
    by_handle: FxHashMap<Handle, ArgumentBuffer>,
}

impl ArgumentBufferTable {
    pub fn new() -> Self {
        ArgumentBufferTable::default()
    }

    pub fn insert(&mut self, buffer: ArgumentBuffer) {
        self.by_handle.insert(buffer.handle(), buffer);
    }

    pub fn get(&self, handle: Handle) -> Option<&ArgumentBuffer> {
        self.by_handle.get(&handle)
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut ArgumentBuffer> {
        self.by_handle.get_mut(&handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::{Flags, ResourceKind};

    fn persistent_handle() -> Handle {
        Handle::new(1, 0, Flags::PERSISTENT, 0, ResourceKind::Buffer)
    }

    fn transient_handle() -> Handle {
        Handle::new(2, 0, Flags::empty(), 0, ResourceKind::Buffer)
    }

    #[test]
    #[should_panic(expected = "transient resource")]
    fn persistent_argument_buffer_rejects_transient_binding() {
        let mut ab = ArgumentBuffer::new(persistent_handle(), true);
        ab.set_buffer("tex", 0, transient_handle(), 0);
    }

    #[test]
    fn translate_moves_resolved_entries_and_keeps_unresolved_pending() {
        let mut ab = ArgumentBuffer::new(transient_handle(), false);
        ab.set_texture("a", 0, transient_handle());
        ab.set_texture("b", 0, transient_handle());
        ab.translate_enqueued_bindings(|key, _, _| if key == "a" { Some(BindingPath(1)) } else { None });
        assert_eq!(ab.resolved().len(), 1);
        assert_eq!(ab.pending().len(), 1);
        assert_eq!(ab.pending()[0].key, "b");
    }

    #[test]
    fn set_bytes_records_offset_and_length() {
        let mut ab = ArgumentBuffer::new(transient_handle(), false);
        ab.set_bytes("c", 0, &[1, 2, 3, 4]);
        match &ab.pending()[0].kind {
            BindingKind::InlineBytes { offset, length } => {
                assert_eq!(*offset, 0);
                assert_eq!(*length, 4);
            }
            other => panic!("expected InlineBytes, got {:?}", other),
        }
    }
}
