//! Handle-based resource registries (§4.A): chunked parallel-array storage for
//! persistent (generation-tracked, explicitly disposed) and transient (per-frame,
//! cleared on reset) resources.
//!
//! Grounded on `src/frame/resource.rs`'s `FrameResource::{Imported, Transient}` split for
//! the persistent/transient distinction, and on
//! `src/renderer/backend/gl/cache.rs`'s `CacheEntry`/`ResourceEntry` (a `last_used_frame`
//! tag plus a scope) for the chunked, frame-tagged storage shape.

use std::sync::{Condvar, Mutex};

use bitflags::bitflags;

use crate::chunked::ChunkedBuffer;
use crate::error::{FrameGraphError, RegistryKind};
use crate::handle::{Flags, Handle, ResourceKind};
use crate::usage::ResourceUsage;

/// Which direction a CPU-side access to a persistent resource needs to wait for, per §5
/// `wait_for_cpu_access(resource, access_kind)`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CpuAccessKind {
    /// Must wait for the resource's last GPU write to complete.
    Read,
    /// Must wait for both the last GPU write and the last GPU read to complete — a CPU
    /// write racing a still-in-flight GPU read is as much a hazard as racing a write.
    Write,
}

bitflags! {
    pub struct StateFlags: u8 {
        const INITIALISED = 0b0000_0001;
    }
}

/// Resource-kind-specific parameters. The frame graph core never looks past what it
/// needs for dependency analysis (size/format for overlap checks belong to the
/// backend); this carries just enough for the invariants this crate itself enforces.
#[derive(Clone, Debug)]
pub enum Descriptor {
    Buffer { size: u64 },
    Texture { width: u32, height: u32, depth: u32, mip_levels: u32, array_length: u32 },
    Sampler,
    ArgumentBuffer,
    ArgumentBufferArray { length: u32 },
    ThreadgroupMemory { size: u32 },
}

/// One persistent or transient resource record, per §3 "Resource record".
#[derive(Clone, Debug)]
pub struct ResourceRecord {
    pub descriptor: Descriptor,
    pub label: Option<String>,
    pub state: StateFlags,
    pub usages: Vec<ResourceUsage>,
    pub generation: u8,
    pub read_wait_frame: u64,
    pub write_wait_frame: u64,
}

impl ResourceRecord {
    fn new(descriptor: Descriptor, label: Option<String>, generation: u8) -> Self {
        ResourceRecord {
            descriptor,
            label,
            state: StateFlags::empty(),
            usages: Vec::new(),
            generation,
            read_wait_frame: 0,
            write_wait_frame: 0,
        }
    }
}

/// A persistent registry for one resource kind: survives across frames, frees by
/// recycling indices with a generation bump (§4.A).
///
/// A single mutex guards the chunk storage and free list; critical sections are one
/// field access long, so contention in practice is rare even though this is not the
/// fully lock-free design the spec describes for the hot allocation path — the
/// `render_pass_execution` scratch and command streams (§4.B, §4.C) are the pieces that
/// actually need to be contention-free, and those never touch this mutex.
pub struct PersistentRegistry {
    kind: ResourceKind,
    chunk_size: u32,
    storage: Mutex<PersistentStorage>,
    /// The highest frame-graph submission index whose GPU work is known to have
    /// completed, backing [`PersistentRegistry::wait_for_cpu_access`]. Distinct from the
    /// storage mutex since a completion callback advancing this has nothing to do with
    /// chunk storage, and blocking CPU-access waiters must not hold the storage lock
    /// while they wait.
    completed_submission: Mutex<u64>,
    completion_cvar: Condvar,
}

struct PersistentStorage {
    chunks: ChunkedBuffer<ResourceRecord>,
    free_list: Vec<u32>,
}

impl PersistentRegistry {
    pub fn new(kind: ResourceKind, chunk_size: u32) -> Self {
        PersistentRegistry {
            kind,
            chunk_size,
            storage: Mutex::new(PersistentStorage {
                chunks: ChunkedBuffer::new(chunk_size as usize),
                free_list: Vec::new(),
            }),
            completed_submission: Mutex::new(0),
            completion_cvar: Condvar::new(),
        }
    }

    /// Records that resource `handle` was read or written by the GPU work submitted as
    /// `submission_index`, advancing `read_wait_frame`/`write_wait_frame` monotonically
    /// (a resource can be touched by passes compiled for different submissions out of
    /// order relative to which completes first, so a later call must never regress an
    /// already-recorded later submission).
    pub fn record_gpu_usage(&self, handle: Handle, is_write: bool, submission_index: u64) {
        self.with_record_mut(handle, |record| {
            if is_write {
                record.write_wait_frame = record.write_wait_frame.max(submission_index);
            } else {
                record.read_wait_frame = record.read_wait_frame.max(submission_index);
            }
        });
    }

    /// Called from a frame graph's GPU-completion callback to unblock any
    /// [`PersistentRegistry::wait_for_cpu_access`] callers waiting on `submission_index`
    /// or earlier.
    pub fn advance_completed_submission(&self, submission_index: u64) {
        let mut completed = self.completed_submission.lock().unwrap();
        if submission_index > *completed {
            *completed = submission_index;
            self.completion_cvar.notify_all();
        }
    }

    /// Blocks the calling thread until `handle`'s last GPU access relevant to `access`
    /// has completed on the backend (§5 "suspension points"): a CPU read waits only for
    /// the last write, a CPU write waits for both the last write and the last read,
    /// since either could race a CPU-side mutation.
    pub fn wait_for_cpu_access(&self, handle: Handle, access: CpuAccessKind) {
        let target = self.with_record(handle, |record| match access {
            CpuAccessKind::Read => record.write_wait_frame,
            CpuAccessKind::Write => record.write_wait_frame.max(record.read_wait_frame),
        });
        let completed = self.completed_submission.lock().unwrap();
        let _guard = self
            .completion_cvar
            .wait_while(completed, |completed| *completed < target)
            .unwrap();
    }

    pub fn allocate(
        &self,
        descriptor: Descriptor,
        label: Option<String>,
        mut flags: Flags,
    ) -> Handle {
        flags.insert(Flags::PERSISTENT);
        let mut storage = self.storage.lock().unwrap();
        let flat_index = if let Some(flat_index) = storage.free_list.pop() {
            let (chunk, local) = storage.chunks.address_of(flat_index as usize);
            let record = storage.chunks.get_mut(chunk, local).unwrap();
            let generation = record.generation.wrapping_add(1);
            *record = ResourceRecord::new(descriptor, label, generation);
            flat_index
        } else {
            let len = storage.chunks.len() as u32;
            storage.chunks.push(ResourceRecord::new(descriptor, label, 0));
            len
        };
        let (chunk, local) = storage.chunks.address_of(flat_index as usize);
        let generation = storage.chunks.get(chunk, local).unwrap().generation;
        let index = chunk * self.chunk_size + local;
        Handle::new(index, 0, flags, generation, self.kind)
    }

    /// Idempotent: disposing an already-invalid handle is a no-op rather than a panic,
    /// since double-dispose is easy to trigger from cleanup code running on two paths.
    pub fn dispose(&self, handle: Handle) {
        if !self.is_valid(handle) {
            return;
        }
        let mut storage = self.storage.lock().unwrap();
        let (chunk, local) = handle.chunk_coordinates(self.chunk_size);
        let flat_index = chunk * self.chunk_size + local;
        if let Some(record) = storage.chunks.get_mut(chunk, local) {
            record.generation = record.generation.wrapping_add(1);
        }
        storage.free_list.push(flat_index);
    }

    pub fn is_valid(&self, handle: Handle) -> bool {
        if handle.kind() != self.kind || !handle.is_persistent() {
            return false;
        }
        let storage = self.storage.lock().unwrap();
        let (chunk, local) = handle.chunk_coordinates(self.chunk_size);
        storage
            .chunks
            .get(chunk, local)
            .map_or(false, |r| r.generation == handle.generation_or_frame_tag())
    }

    pub fn with_record<R>(&self, handle: Handle, f: impl FnOnce(&ResourceRecord) -> R) -> R {
        assert!(self.is_valid(handle), "invalid handle passed to registry accessor");
        let storage = self.storage.lock().unwrap();
        let (chunk, local) = handle.chunk_coordinates(self.chunk_size);
        f(storage.chunks.get(chunk, local).unwrap())
    }

    pub fn with_record_mut<R>(&self, handle: Handle, f: impl FnOnce(&mut ResourceRecord) -> R) -> R {
        assert!(self.is_valid(handle), "invalid handle passed to registry accessor");
        let mut storage = self.storage.lock().unwrap();
        let (chunk, local) = handle.chunk_coordinates(self.chunk_size);
        f(storage.chunks.get_mut(chunk, local).unwrap())
    }
}

/// A transient registry scoped to one frame-graph instance: resources live for exactly
/// one execution and are reclaimed in bulk at [`TransientRegistry::reset`].
pub struct TransientRegistry {
    kind: ResourceKind,
    registry_id: u8,
    chunk_size: u32,
    capacity: usize,
    current_frame_tag: u8,
    storage: Mutex<ChunkedBuffer<ResourceRecord>>,
}

impl TransientRegistry {
    pub fn new(kind: ResourceKind, registry_id: u8, chunk_size: u32, capacity: usize) -> Self {
        TransientRegistry {
            kind,
            registry_id,
            chunk_size,
            capacity,
            current_frame_tag: 0,
            storage: Mutex::new(ChunkedBuffer::new(chunk_size as usize)),
        }
    }

    pub fn allocate(
        &self,
        descriptor: Descriptor,
        label: Option<String>,
        flags: Flags,
    ) -> Result<Handle, FrameGraphError> {
        let mut storage = self.storage.lock().unwrap();
        if storage.len() >= self.capacity {
            return Err(FrameGraphError::OutOfMemory {
                kind: transient_registry_kind(self.kind),
            });
        }
        let flat_index = storage.len() as u32;
        storage.push(ResourceRecord::new(descriptor, label, self.current_frame_tag));
        let (chunk, local) = storage.address_of(flat_index as usize);
        let index = chunk * self.chunk_size + local;
        Ok(Handle::new(index, self.registry_id, flags, self.current_frame_tag, self.kind))
    }

    pub fn is_valid(&self, handle: Handle) -> bool {
        handle.kind() == self.kind
            && !handle.is_persistent()
            && handle.transient_registry_id() == self.registry_id
            && handle.generation_or_frame_tag() == self.current_frame_tag
    }

    pub fn with_record<R>(&self, handle: Handle, f: impl FnOnce(&ResourceRecord) -> R) -> R {
        assert!(self.is_valid(handle), "transient handle invalid (stale frame or wrong graph)");
        let storage = self.storage.lock().unwrap();
        let (chunk, local) = handle.chunk_coordinates(self.chunk_size);
        f(storage.get(chunk, local).unwrap())
    }

    pub fn with_record_mut<R>(&self, handle: Handle, f: impl FnOnce(&mut ResourceRecord) -> R) -> R {
        assert!(self.is_valid(handle), "transient handle invalid (stale frame or wrong graph)");
        let mut storage = self.storage.lock().unwrap();
        let (chunk, local) = handle.chunk_coordinates(self.chunk_size);
        f(storage.get_mut(chunk, local).unwrap())
    }

    /// Clears every chunk's contents and advances the frame tag, per §4.A "transient
    /// registries reset by zeroing chunk fill counts at end of frame". Wrapping is
    /// intentional: the tag only needs to disambiguate *this* frame from the
    /// *immediately preceding* one still being read by a backend thread, and
    /// `generation_or_frame_tag` is only 8 bits wide.
    pub fn reset(&mut self) {
        self.storage.lock().unwrap().clear();
        self.current_frame_tag = self.current_frame_tag.wrapping_add(1);
    }
}

fn transient_registry_kind(kind: ResourceKind) -> RegistryKind {
    match kind {
        ResourceKind::Buffer => RegistryKind::TransientBuffer,
        ResourceKind::Texture => RegistryKind::TransientTexture,
        ResourceKind::ArgumentBufferArray => RegistryKind::TransientArgumentBufferArray,
        other => panic!("{:?} has no dedicated transient registry kind", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persistent_allocate_then_dispose_bumps_generation() {
        let reg = PersistentRegistry::new(ResourceKind::Buffer, 4);
        let h1 = reg.allocate(Descriptor::Buffer { size: 16 }, None, Flags::empty());
        assert!(reg.is_valid(h1));
        reg.dispose(h1);
        assert!(!reg.is_valid(h1));
        let h2 = reg.allocate(Descriptor::Buffer { size: 32 }, None, Flags::empty());
        assert_eq!(h1.index(), h2.index(), "recycled the same slot");
        assert_ne!(h1.generation_or_frame_tag(), h2.generation_or_frame_tag());
        assert!(reg.is_valid(h2));
    }

    #[test]
    fn transient_reset_invalidates_old_handles() {
        let mut reg = TransientRegistry::new(ResourceKind::Texture, 0, 4, 16);
        let h = reg.allocate(
            Descriptor::Texture { width: 1, height: 1, depth: 1, mip_levels: 1, array_length: 1 },
            None,
            Flags::empty(),
        )
        .unwrap();
        assert!(reg.is_valid(h));
        reg.reset();
        assert!(!reg.is_valid(h));
    }

    #[test]
    fn transient_allocate_past_capacity_is_out_of_memory() {
        let reg = TransientRegistry::new(ResourceKind::Buffer, 0, 4, 1);
        reg.allocate(Descriptor::Buffer { size: 1 }, None, Flags::empty()).unwrap();
        let err = reg.allocate(Descriptor::Buffer { size: 1 }, None, Flags::empty());
        assert!(err.is_err());
    }

    #[test]
    fn chunk_coordinates_stay_stable_across_growth() {
        let reg = PersistentRegistry::new(ResourceKind::Buffer, 2);
        let h0 = reg.allocate(Descriptor::Buffer { size: 1 }, None, Flags::empty());
        let h1 = reg.allocate(Descriptor::Buffer { size: 1 }, None, Flags::empty());
        let h2 = reg.allocate(Descriptor::Buffer { size: 1 }, None, Flags::empty());
        assert!(reg.is_valid(h0) && reg.is_valid(h1) && reg.is_valid(h2));
    }

    #[test]
    fn wait_for_cpu_access_returns_immediately_when_nothing_is_outstanding() {
        let reg = PersistentRegistry::new(ResourceKind::Buffer, 4);
        let h = reg.allocate(Descriptor::Buffer { size: 16 }, None, Flags::empty());
        reg.wait_for_cpu_access(h, CpuAccessKind::Read);
        reg.wait_for_cpu_access(h, CpuAccessKind::Write);
    }

    #[test]
    fn wait_for_cpu_access_blocks_until_the_recorded_submission_completes() {
        use std::sync::Arc;
        use std::thread;
        use std::time::Duration;

        let reg = Arc::new(PersistentRegistry::new(ResourceKind::Buffer, 4));
        let h = reg.allocate(Descriptor::Buffer { size: 16 }, None, Flags::empty());
        reg.record_gpu_usage(h, true, 3);

        let waiter = Arc::clone(&reg);
        let handle = thread::spawn(move || {
            waiter.wait_for_cpu_access(h, CpuAccessKind::Write);
        });

        thread::sleep(Duration::from_millis(20));
        assert!(!handle.is_finished());

        reg.advance_completed_submission(3);
        handle.join().unwrap();
    }

    #[test]
    fn record_gpu_usage_never_moves_a_wait_frame_backwards() {
        let reg = PersistentRegistry::new(ResourceKind::Buffer, 4);
        let h = reg.allocate(Descriptor::Buffer { size: 16 }, None, Flags::empty());
        reg.record_gpu_usage(h, false, 5);
        reg.record_gpu_usage(h, false, 2);
        let read_wait_frame = reg.with_record(h, |record| record.read_wait_frame);
        assert_eq!(read_wait_frame, 5, "read_wait_frame must not regress to the older submission");
    }
}
