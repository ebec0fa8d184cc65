//! The frame graph compiler (§4.H): turns a batch of declared passes into an ordered,
//! culled, dependency-annotated plan ready for the backend.
//!
//! Grounded on `src/frame/sched.rs` for the reindex/evaluate/order phase split and on
//! `src/frame/dependency.rs` for the dependency-table-then-reachability shape; the
//! render-target-merge-preferring topological walk has no direct analogue in either and
//! is built from this crate's own description of phase 5.

use std::sync::Mutex;

use fxhash::{FxHashMap, FxHashSet};

use crate::backend::Backend;
use crate::command::{Command, CommandStream};
use crate::dependency::{DependencyKind, DependencyTable};
use crate::encoder::{BlitEncoder, ComputeEncoder, ExternalEncoder, RenderEncoder};
use crate::handle::{Flags, Handle};
use crate::pass::{render_targets_are_mergeable, Pass, PassBody, PassKind, PassRecord, RenderTargetDesc};
use crate::usage::{merge_usage, ResourceUsage};

/// Everything the backend needs to execute one frame, per §6 "plan handed to the
/// backend".
pub struct CompiledFrame {
    pub active_passes: Vec<PassRecord>,
    pub commands: Vec<Command>,
    pub used_resources: Vec<Handle>,
    pub dependency_table: DependencyTable,
}

/// One pass's compiler-owned working state, from reindexing through global command
/// indexing. `pass` is `Some` until the pass has actually been recorded (eagerly in
/// phase 2, or on materialisation in phase 6); taking it out of `Option` lets the
/// compiler hand pass bodies to worker threads without fighting the borrow checker over
/// a shared slice.
struct Draft {
    name: String,
    kind: PassKind,
    target_desc: Option<RenderTargetDesc>,
    read: FxHashSet<Handle>,
    written: FxHashSet<Handle>,
    usages: Vec<ResourceUsage>,
    commands: Vec<Command>,
    recorded: bool,
    pass: Option<Pass>,
}

struct EagerOutput {
    index: usize,
    commands: Vec<Command>,
    usages: Vec<ResourceUsage>,
    read: FxHashSet<Handle>,
    written: FxHashSet<Handle>,
}

/// Runs one pass's body against the encoder matching its kind and hands back everything
/// it recorded. The only point in the compiler that actually executes client closures.
fn record_pass(index: usize, pass: Pass, backend: &dyn Backend) -> EagerOutput {
    match pass.body {
        PassBody::Draw { target_desc, clears, record } => {
            let mut encoder = RenderEncoder::new(index, &pass.name, target_desc, &clears);
            record(&mut encoder);
            let (commands, usages, read, written, _target_desc) = encoder.end_encoding();
            EagerOutput { index, commands, usages, read, written }
        }
        PassBody::Compute { record } => {
            let mut encoder = ComputeEncoder::new(index, &pass.name, backend.thread_execution_width());
            record(&mut encoder);
            let (commands, usages, read, written) = encoder.end_encoding();
            EagerOutput { index, commands, usages, read, written }
        }
        PassBody::Blit { record } => {
            let mut encoder = BlitEncoder::new(index, &pass.name);
            record(&mut encoder);
            let (commands, usages, read, written) = encoder.end_encoding();
            EagerOutput { index, commands, usages, read, written }
        }
        PassBody::External { record } => {
            let mut encoder = ExternalEncoder::new(index, &pass.name);
            record(&mut encoder);
            let (commands, usages, read, written) = encoder.end_encoding();
            EagerOutput { index, commands, usages, read, written }
        }
        PassBody::Cpu { record } => {
            record();
            EagerOutput { index, commands: Vec::new(), usages: Vec::new(), read: FxHashSet::default(), written: FxHashSet::default() }
        }
    }
}

fn apply_output(draft: &mut Draft, out: EagerOutput) {
    draft.commands = out.commands;
    draft.usages = out.usages;
    draft.read = out.read;
    draft.written = out.written;
    draft.recorded = true;
}

/// §4.H phase 2: CPU passes with no declared writes run synchronously on the calling
/// thread; everything else in `indices` is distributed across a bounded worker pool and
/// joined before returning.
fn evaluate_usages(drafts: &mut [Draft], indices: &[usize], backend: &dyn Backend, worker_thread_count: usize) {
    if indices.is_empty() {
        return;
    }
    let (cpu, gpu): (Vec<usize>, Vec<usize>) = indices.iter().copied().partition(|&i| drafts[i].kind == PassKind::Cpu);

    for i in cpu {
        let pass = drafts[i].pass.take().expect("pass already recorded");
        let out = record_pass(i, pass, backend);
        apply_output(&mut drafts[i], out);
    }

    if gpu.is_empty() {
        return;
    }
    let worker_count = worker_thread_count.max(1).min(gpu.len());
    let jobs: Vec<(usize, Pass)> = gpu
        .into_iter()
        .map(|i| (i, drafts[i].pass.take().expect("pass already recorded")))
        .collect();

    let mut job_chunks: Vec<Vec<(usize, Pass)>> = (0..worker_count).map(|_| Vec::new()).collect();
    for (slot, job) in jobs.into_iter().enumerate() {
        job_chunks[slot % worker_count].push(job);
    }

    let results: Mutex<Vec<EagerOutput>> = Mutex::new(Vec::new());
    std::thread::scope(|scope| {
        for chunk in job_chunks {
            let results = &results;
            scope.spawn(move || {
                let mut local = Vec::with_capacity(chunk.len());
                for (index, pass) in chunk {
                    local.push(record_pass(index, pass, backend));
                }
                results.lock().unwrap().extend(local);
            });
        }
    });

    for out in results.into_inner().unwrap() {
        let index = out.index;
        apply_output(&mut drafts[index], out);
    }
}

fn activate(i: usize, table: &DependencyTable, is_active: &mut [bool]) {
    if is_active[i] {
        return;
    }
    is_active[i] = true;
    for (j, kind) in table.dependencies_of(i) {
        if kind == DependencyKind::Execution {
            activate(j, table, is_active);
        }
    }
}

fn can_merge(drafts: &[Draft], a: usize, b: usize) -> bool {
    match (&drafts[a].target_desc, &drafts[b].target_desc) {
        (Some(x), Some(y)) => render_targets_are_mergeable(x, y),
        _ => false,
    }
}

/// §4.H phase 5: a topological walk that visits a pass's non-mergeable dependencies
/// before its mergeable ones, so mergeable draw passes land adjacent to each other in
/// the final order.
fn visit(i: usize, table: &DependencyTable, drafts: &[Draft], is_active: &[bool], visited: &mut [bool], order: &mut Vec<usize>) {
    if visited[i] {
        return;
    }
    visited[i] = true;
    let deps: Vec<(usize, DependencyKind)> = table.dependencies_of(i).filter(|(j, _)| is_active[*j]).collect();
    let (mergeable, not_mergeable): (Vec<_>, Vec<_>) = deps.into_iter().partition(|(j, _)| can_merge(drafts, i, *j));
    for (j, _) in not_mergeable {
        visit(j, table, drafts, is_active, visited, order);
    }
    for (j, _) in mergeable {
        visit(j, table, drafts, is_active, visited, order);
    }
    order.push(i);
}

/// Runs the full compiler pipeline over a batch of declared passes, in insertion order
/// (early-inserted blit passes are expected to already be at the front of `passes`).
pub fn compile(passes: Vec<Pass>, backend: &dyn Backend, worker_thread_count: usize) -> CompiledFrame {
    let n = passes.len();
    debug!("compiling {} passes with {} worker threads", n, worker_thread_count);
    let mut drafts: Vec<Draft> = Vec::with_capacity(n);
    for pass in passes {
        let target_desc = match &pass.body {
            PassBody::Draw { target_desc, .. } => Some(target_desc.clone()),
            _ => None,
        };
        drafts.push(Draft {
            name: pass.name.clone(),
            kind: pass.kind(),
            target_desc,
            read: FxHashSet::default(),
            written: FxHashSet::default(),
            usages: Vec::new(),
            commands: Vec::new(),
            recorded: false,
            pass: Some(pass),
        });
    }

    // Phase 2: evaluate usages. Passes with no declared writes run their encoder now
    // (eagerly, across the worker pool); the rest trust their declared read/write sets.
    let eager: Vec<usize> = (0..n)
        .filter(|&i| drafts[i].pass.as_ref().map_or(false, |p| p.declared_writes.is_empty()))
        .collect();
    trace!("{} passes eligible for eager (no declared writes) execution", eager.len());
    evaluate_usages(&mut drafts, &eager, backend, worker_thread_count);
    for i in 0..n {
        if drafts[i].recorded {
            continue;
        }
        if let Some(pass) = &drafts[i].pass {
            drafts[i].read = pass.declared_reads.iter().copied().collect();
            drafts[i].written = pass.declared_writes.iter().copied().collect();
        }
    }

    // Phase 3: dependency table and side-effect/window-texture flags.
    let mut table = DependencyTable::new(n);
    let mut has_side_effects = vec![false; n];
    let mut uses_window_texture = vec![false; n];
    for i in 0..n {
        let written: Vec<Handle> = drafts[i].written.iter().copied().collect();
        for r in written {
            for j in (i + 1)..n {
                if drafts[j].read.contains(&r) {
                    table.set_at_least(j, i, DependencyKind::Execution);
                } else if drafts[j].written.contains(&r) && table.get(j, i) != DependencyKind::Execution {
                    table.set_at_least(j, i, DependencyKind::Ordering);
                }
            }
            let flags = r.flags();
            if flags.intersects(Flags::PERSISTENT | Flags::WINDOW_HANDLE | Flags::HISTORY_BUFFER | Flags::EXTERNAL_OWNERSHIP) {
                has_side_effects[i] = true;
            }
            if flags.contains(Flags::WINDOW_HANDLE) {
                uses_window_texture[i] = true;
            }
        }
    }

    // Phase 4: activity marking by reverse reachability from side-effecting passes.
    let mut is_active = vec![false; n];
    for i in (0..n).rev() {
        if has_side_effects[i] {
            activate(i, &table, &mut is_active);
        }
    }

    // Phase 5: dependency-respecting, merge-preferring ordering.
    let mut order: Vec<usize> = Vec::with_capacity(n);
    let mut visited = vec![false; n];
    for i in (0..n).rev() {
        if is_active[i] {
            visit(i, &table, &drafts, &is_active, &mut visited, &mut order);
        }
    }

    // Phase 6: materialise any active pass the eager pass skipped, single-threaded.
    for &i in &order {
        if !drafts[i].recorded {
            let pass = drafts[i].pass.take().expect("deferred active pass missing body");
            let out = record_pass(i, pass, backend);
            apply_output(&mut drafts[i], out);
        }
    }
    let active_order: Vec<usize> = order
        .into_iter()
        .filter(|&i| {
            if drafts[i].kind == PassKind::Cpu || drafts[i].commands.is_empty() {
                is_active[i] = false;
                false
            } else {
                true
            }
        })
        .collect();

    // Phase 7: restrict the dependency table to the surviving, reordered passes.
    let mut old_to_new = FxHashMap::default();
    for (new_index, &old_index) in active_order.iter().enumerate() {
        old_to_new.insert(old_index, new_index);
    }
    let dependency_table = table.restrict(&old_to_new);

    // Phase 8: global command indexing and per-resource usage aggregation.
    let mut commands = Vec::new();
    let mut active_passes = Vec::with_capacity(active_order.len());
    let mut resource_usages: FxHashMap<Handle, Vec<ResourceUsage>> = FxHashMap::default();
    for (new_index, &old_index) in active_order.iter().enumerate() {
        let draft = &mut drafts[old_index];
        let start = commands.len() as u32;
        commands.extend(draft.commands.iter().cloned());
        let end = commands.len() as u32;

        for usage in &mut draft.usages {
            usage.offset_by(start);
            merge_usage(resource_usages.entry(usage.resource).or_default(), usage.clone());
        }

        let mut record = PassRecord::new(new_index, draft.name.clone(), draft.kind, draft.target_desc.clone());
        record.commands = CommandStream::from_vec(std::mem::take(&mut draft.commands));
        record.read = std::mem::take(&mut draft.read);
        record.written = std::mem::take(&mut draft.written);
        record.usages = std::mem::take(&mut draft.usages);
        record.command_range = start..end;
        record.is_active = true;
        record.has_side_effects = has_side_effects[old_index];
        record.uses_window_texture = uses_window_texture[old_index];
        record.is_recorded = true;
        active_passes.push(record);
    }

    let mut used_resources: Vec<Handle> = resource_usages.keys().copied().collect();
    used_resources.sort_by_key(|h| h.bits());

    debug!(
        "compiled {} active passes ({} culled) touching {} resources",
        active_passes.len(),
        n - active_passes.len(),
        used_resources.len()
    );
    CompiledFrame { active_passes, commands, used_resources, dependency_table }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{ArgumentReflection, BindingPath, PipelineDescriptor, Reflection, RenderTargetDescriptor, UnmanagedObject};
    use crate::handle::ResourceKind;
    use std::time::Duration;

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

    struct NullBackend;
    impl Backend for NullBackend {
        fn begin_frame_resource_access(&self) {}
        fn execute_frame_graph(&self, _plan: crate::backend::CompiledPlan<'_>, _cb: Box<dyn FnOnce(Duration) + Send>) {}
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

    fn buf(index: u32, flags: Flags) -> Handle {
        Handle::new(index, 0, flags, 0, ResourceKind::Buffer)
    }

    #[test]
    fn a_pass_with_no_side_effecting_write_is_culled() {
        let written = buf(1, Flags::empty());
        let pass = Pass::blit("dead-write", move |enc| enc.fill_buffer(written, 0, 4, 0));
        let frame = compile(vec![pass], &NullBackend, 2);
        assert!(frame.active_passes.is_empty());
    }

    #[test]
    fn a_pass_writing_a_persistent_resource_survives() {
        let written = buf(1, Flags::PERSISTENT);
        let pass = Pass::blit("keep", move |enc| enc.fill_buffer(written, 0, 4, 0));
        let frame = compile(vec![pass], &NullBackend, 2);
        assert_eq!(frame.active_passes.len(), 1);
        assert!(frame.used_resources.contains(&written));
    }

    #[test]
    fn a_reader_of_a_surviving_writers_output_is_also_kept() {
        // The reader only survives culling because *its own* write is side-effecting;
        // a pass that merely reads a persistent resource without itself producing
        // anything externally visible is not kept by that read alone (§8 property 8 only
        // pulls a writer in for readers that are themselves active).
        let intermediate = buf(1, Flags::PERSISTENT);
        let output = buf(2, Flags::PERSISTENT);
        let writer = Pass::blit("writer", move |enc| enc.fill_buffer(intermediate, 0, 4, 0));
        let reader = Pass::blit("reader", move |enc| enc.copy_buffer(intermediate, 0, output, 0, 4));
        let frame = compile(vec![writer, reader], &NullBackend, 2);
        assert_eq!(frame.active_passes.len(), 2);
        assert_eq!(frame.active_passes[0].name, "writer");
        assert_eq!(frame.active_passes[1].name, "reader");
    }

    #[test]
    fn a_pure_reader_with_no_side_effect_of_its_own_is_culled_even_if_its_input_is_kept() {
        let resource = buf(1, Flags::PERSISTENT);
        let writer = Pass::blit("writer", move |enc| enc.fill_buffer(resource, 0, 4, 0));
        let reader = Pass::blit("idle-reader", move |enc| enc.synchronise_buffer(resource));
        let frame = compile(vec![writer, reader], &NullBackend, 2);
        assert_eq!(frame.active_passes.len(), 1);
        assert_eq!(frame.active_passes[0].name, "writer");
    }
}
