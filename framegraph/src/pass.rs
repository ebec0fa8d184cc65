//! Passes and pass records (§3 "Pass record", §4.G, §9 "Passes as capability-carrying
//! objects").
//!
//! Grounded on `src/frame/mod.rs`'s `PassBuilder`/`Frame::submit` for the
//! declare-then-record shape, and on `src/frame/graphics.rs`'s `GraphicsTaskBuilder` for
//! the attachment load/store/clear vocabulary a draw pass carries.

use fxhash::FxHashSet;

use crate::command::CommandStream;
use crate::encoder::{BlitEncoder, ComputeEncoder, ExternalEncoder, RenderEncoder};
use crate::handle::Handle;
use crate::usage::ResourceUsage;

/// Which color/depth/stencil slot an attachment clear op targets.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AttachmentIndex {
    Color(u8),
    Depth,
    Stencil,
}

/// Per-attachment clear instruction, per §4.G ("keep | clear(color/depth/stencil)").
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ClearOp {
    Keep,
    ClearColor([f32; 4]),
    ClearDepth(f32),
    ClearStencil(u32),
}

/// Opaque (to the backend) pixel format token; the core only ever compares these for
/// equality when judging render-target mergeability.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PixelFormat(pub u32);

/// Load/store behaviour for one attachment across a render pass, independent of the
/// clear value itself (§4.F "load/store semantics").
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LoadAction {
    Load,
    Clear,
    DontCare,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StoreAction {
    Store,
    DontCare,
    MultisampleResolve,
}

/// One render-target attachment slot.
#[derive(Clone, Debug, PartialEq)]
pub struct AttachmentDesc {
    pub index: AttachmentIndex,
    pub texture: Handle,
    pub format: PixelFormat,
    pub sample_count: u32,
    pub load: LoadAction,
    pub store: StoreAction,
    pub resolve_texture: Option<Handle>,
}

/// A full render-target descriptor: every attachment a draw pass writes to.
#[derive(Clone, Debug, Default)]
pub struct RenderTargetDesc {
    pub attachments: Vec<AttachmentDesc>,
}

/// Per-color-attachment state a render pipeline descriptor carries, the piece of it
/// `set_render_pipeline_descriptor` actually inspects (§4.F): everything else about the
/// pipeline stays behind the opaque `PipelineDescriptor` the backend alone interprets.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ColorAttachmentWriteState {
    /// Non-zero iff any color channel is enabled for writing.
    pub write_mask: u8,
    pub blending_enabled: bool,
}

/// Depth/stencil comparison function, mirroring the fixed small vocabulary every GPU API
/// exposes for this.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CompareFunction {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StencilOperation {
    Keep,
    Zero,
    Replace,
    IncrementClamp,
    DecrementClamp,
    Invert,
    IncrementWrap,
    DecrementWrap,
}

/// Stencil test/op state for one face (front or back).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StencilFaceState {
    pub compare: CompareFunction,
    pub fail_op: StencilOperation,
    pub depth_fail_op: StencilOperation,
    pub pass_op: StencilOperation,
}

impl Default for StencilFaceState {
    fn default() -> Self {
        StencilFaceState {
            compare: CompareFunction::Always,
            fail_op: StencilOperation::Keep,
            depth_fail_op: StencilOperation::Keep,
            pass_op: StencilOperation::Keep,
        }
    }
}

/// The piece of a depth-stencil pipeline descriptor `set_depth_stencil_descriptor`
/// inspects directly (§4.F): depth write/compare plus per-face stencil state.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct DepthStencilDescriptor {
    pub depth_write_enabled: bool,
    pub depth_compare: CompareFunction,
    pub stencil_front: StencilFaceState,
    pub stencil_back: StencilFaceState,
}

impl Default for CompareFunction {
    fn default() -> Self {
        CompareFunction::Always
    }
}

impl RenderTargetDesc {
    pub fn attachment(&self, index: AttachmentIndex) -> Option<&AttachmentDesc> {
        self.attachments.iter().find(|a| a.index == index)
    }
}

/// Whether two render targets can share one GPU render-pass instance (§4.H phase 5,
/// §8 property 7): every attachment slot present in either must match texture, format,
/// sample count, and load/store behaviour in the other.
pub fn render_targets_are_mergeable(a: &RenderTargetDesc, b: &RenderTargetDesc) -> bool {
    let mut indices: Vec<AttachmentIndex> = a.attachments.iter().map(|x| x.index).collect();
    for att in &b.attachments {
        if !indices.contains(&att.index) {
            indices.push(att.index);
        }
    }
    indices.into_iter().all(|idx| match (a.attachment(idx), b.attachment(idx)) {
        (Some(x), Some(y)) => {
            x.texture == y.texture
                && x.format == y.format
                && x.sample_count == y.sample_count
                && x.load == y.load
                && x.store == y.store
                && x.resolve_texture == y.resolve_texture
        }
        (None, None) => true,
        _ => false,
    })
}

/// The deferred recording closure for each pass variant (§9 "passes as a small tagged
/// variant"). Each closure is handed the matching specialised encoder and records that
/// pass's commands into it.
pub enum PassBody {
    Draw {
        target_desc: RenderTargetDesc,
        clears: Vec<(AttachmentIndex, ClearOp)>,
        record: Box<dyn FnOnce(&mut RenderEncoder) + Send>,
    },
    Compute {
        record: Box<dyn FnOnce(&mut ComputeEncoder) + Send>,
    },
    Blit {
        record: Box<dyn FnOnce(&mut BlitEncoder) + Send>,
    },
    External {
        record: Box<dyn FnOnce(&mut ExternalEncoder) + Send>,
    },
    Cpu {
        record: Box<dyn FnOnce() + Send>,
    },
}

impl PassBody {
    pub fn kind(&self) -> PassKind {
        match self {
            PassBody::Draw { .. } => PassKind::Draw,
            PassBody::Compute { .. } => PassKind::Compute,
            PassBody::Blit { .. } => PassKind::Blit,
            PassBody::External { .. } => PassKind::External,
            PassBody::Cpu { .. } => PassKind::Cpu,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PassKind {
    Draw,
    Compute,
    Blit,
    External,
    Cpu,
}

/// A pass as the client declares it: a name, its body, and — for passes that declare
/// their resources upfront rather than being inferred from recording — the read/write
/// sets used directly by §4.H phase 2's "otherwise" branch.
pub struct Pass {
    pub name: String,
    pub body: PassBody,
    pub declared_reads: Vec<Handle>,
    pub declared_writes: Vec<Handle>,
}

impl Pass {
    pub fn draw(
        name: impl Into<String>,
        target_desc: RenderTargetDesc,
        clears: Vec<(AttachmentIndex, ClearOp)>,
        record: impl FnOnce(&mut RenderEncoder) + Send + 'static,
    ) -> Self {
        Pass {
            name: name.into(),
            body: PassBody::Draw { target_desc, clears, record: Box::new(record) },
            declared_reads: Vec::new(),
            declared_writes: Vec::new(),
        }
    }

    pub fn compute(name: impl Into<String>, record: impl FnOnce(&mut ComputeEncoder) + Send + 'static) -> Self {
        Pass {
            name: name.into(),
            body: PassBody::Compute { record: Box::new(record) },
            declared_reads: Vec::new(),
            declared_writes: Vec::new(),
        }
    }

    pub fn blit(name: impl Into<String>, record: impl FnOnce(&mut BlitEncoder) + Send + 'static) -> Self {
        Pass {
            name: name.into(),
            body: PassBody::Blit { record: Box::new(record) },
            declared_reads: Vec::new(),
            declared_writes: Vec::new(),
        }
    }

    pub fn external(name: impl Into<String>, record: impl FnOnce(&mut ExternalEncoder) + Send + 'static) -> Self {
        Pass {
            name: name.into(),
            body: PassBody::External { record: Box::new(record) },
            declared_reads: Vec::new(),
            declared_writes: Vec::new(),
        }
    }

    pub fn cpu(name: impl Into<String>, record: impl FnOnce() + Send + 'static) -> Self {
        Pass {
            name: name.into(),
            body: PassBody::Cpu { record: Box::new(record) },
            declared_reads: Vec::new(),
            declared_writes: Vec::new(),
        }
    }

    /// Declares this pass's resource sets upfront, opting it into §4.H phase 2's
    /// "otherwise" (non-eager) path: the compiler trusts these lists instead of
    /// inferring them by running the pass's encoder immediately.
    pub fn with_declared_resources(mut self, reads: Vec<Handle>, writes: Vec<Handle>) -> Self {
        self.declared_reads = reads;
        self.declared_writes = writes;
        self
    }

    pub fn kind(&self) -> PassKind {
        self.body.kind()
    }
}

/// Compiler-owned bookkeeping for one pass, built up across §4.H's phases.
pub struct PassRecord {
    pub name: String,
    pub kind: PassKind,
    pub target_desc: Option<RenderTargetDesc>,
    pub commands: CommandStream,
    pub read: FxHashSet<Handle>,
    pub written: FxHashSet<Handle>,
    pub usages: Vec<ResourceUsage>,
    pub command_range: std::ops::Range<u32>,
    pub index: usize,
    pub is_active: bool,
    pub has_side_effects: bool,
    pub uses_window_texture: bool,
    /// True once this pass's encoder has actually run and populated `commands`/`usages`.
    /// Passes with declared resources are left deferred until §4.H phase 6.
    pub is_recorded: bool,
}

impl PassRecord {
    pub fn new(index: usize, name: String, kind: PassKind, target_desc: Option<RenderTargetDesc>) -> Self {
        PassRecord {
            name,
            kind,
            target_desc,
            commands: CommandStream::new(),
            read: FxHashSet::default(),
            written: FxHashSet::default(),
            usages: Vec::new(),
            command_range: 0..0,
            index,
            is_active: false,
            has_side_effects: false,
            uses_window_texture: false,
            is_recorded: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attachment(idx: AttachmentIndex, texture: Handle) -> AttachmentDesc {
        AttachmentDesc {
            index: idx,
            texture,
            format: PixelFormat(1),
            sample_count: 1,
            load: LoadAction::Clear,
            store: StoreAction::Store,
            resolve_texture: None,
        }
    }

    #[test]
    fn identical_attachments_are_mergeable() {
        use crate::handle::{Flags, ResourceKind};
        let tex = Handle::new(0, 0, Flags::empty(), 0, ResourceKind::Texture);
        let a = RenderTargetDesc { attachments: vec![attachment(AttachmentIndex::Color(0), tex)] };
        let b = RenderTargetDesc { attachments: vec![attachment(AttachmentIndex::Color(0), tex)] };
        assert!(render_targets_are_mergeable(&a, &b));
    }

    #[test]
    fn differing_formats_are_not_mergeable() {
        use crate::handle::{Flags, ResourceKind};
        let tex = Handle::new(0, 0, Flags::empty(), 0, ResourceKind::Texture);
        let mut a_att = attachment(AttachmentIndex::Color(0), tex);
        let mut b_att = a_att.clone();
        a_att.format = PixelFormat(1);
        b_att.format = PixelFormat(2);
        let a = RenderTargetDesc { attachments: vec![a_att] };
        let b = RenderTargetDesc { attachments: vec![b_att] };
        assert!(!render_targets_are_mergeable(&a, &b));
    }
}
