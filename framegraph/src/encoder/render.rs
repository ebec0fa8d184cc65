//! The draw encoder (§4.F "render/draw encoder").
//!
//! Grounded on `src/frame/graphics.rs`'s `GraphicsTaskBuilder` for the attachment
//! promotion rules (unused -> write-only -> read-write as clears/draws/blends touch a
//! slot) and vertex-buffer slot tracking.

use smallvec::SmallVec;

use crate::backend::{PipelineDescriptor, Reflection};
use crate::command::Command;
use crate::encoder::ResourceBindingEncoder;
use crate::handle::Handle;
use crate::pass::{AttachmentIndex, ClearOp, ColorAttachmentWriteState, DepthStencilDescriptor, RenderTargetDesc, StencilFaceState};
use crate::usage::{ResourceRange, ResourceUsage, Stages, UsageKind};

/// How a render-pass attachment has been touched so far this pass, per §4.F's promotion
/// ladder: a slot starts `Unused`, is promoted to `WriteOnly` the first time it is
/// cleared or drawn into, and further promoted to `ReadWrite` once a blend or a resolve
/// needs to read it back.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum AttachmentState {
    Unused,
    WriteOnly,
    ReadWrite,
}

/// Classifies one stencil face's contribution to the attachment's usage state, per
/// §4.F "any non-`always` compare or any non-`keep` op triggers a usage; read vs write
/// classified per-op": a non-`Always` compare needs the existing stencil value back
/// (read-write, since there is no read-only render-target usage kind), while a
/// write-only face (ops that replace the value but never test it) needs only write-only.
fn stencil_attachment_state(face: &StencilFaceState) -> Option<AttachmentState> {
    if face.compare != crate::pass::CompareFunction::Always {
        Some(AttachmentState::ReadWrite)
    } else if face.fail_op != crate::pass::StencilOperation::Keep
        || face.depth_fail_op != crate::pass::StencilOperation::Keep
        || face.pass_op != crate::pass::StencilOperation::Keep
    {
        Some(AttachmentState::WriteOnly)
    } else {
        None
    }
}

pub struct RenderEncoder {
    binding: ResourceBindingEncoder,
    target_desc: RenderTargetDesc,
    attachment_state: SmallVec<[(AttachmentIndex, AttachmentState, Handle); 8]>,
    vertex_buffers: SmallVec<[(u32, Handle); 4]>,
}

impl RenderEncoder {
    pub fn new(pass_index: usize, pass_name: &str, target_desc: RenderTargetDesc, clears: &[(AttachmentIndex, ClearOp)]) -> Self {
        let mut enc = RenderEncoder {
            binding: ResourceBindingEncoder::new(pass_index, pass_name),
            attachment_state: target_desc
                .attachments
                .iter()
                .map(|a| (a.index, AttachmentState::Unused, a.texture))
                .collect(),
            target_desc,
            vertex_buffers: SmallVec::new(),
        };
        if !clears.is_empty() {
            enc.binding.push(Command::ClearRenderTargets {
                color_mask: clears.iter().fold(0u8, |mask, (idx, _)| match idx {
                    AttachmentIndex::Color(n) => mask | (1 << n),
                    _ => mask,
                }),
                depth: clears.iter().any(|(idx, _)| *idx == AttachmentIndex::Depth),
                stencil: clears.iter().any(|(idx, _)| *idx == AttachmentIndex::Stencil),
            });
            for (idx, _) in clears {
                enc.promote_attachment(*idx, AttachmentState::WriteOnly);
            }
        }
        enc
    }

    fn promote_attachment(&mut self, index: AttachmentIndex, to: AttachmentState) {
        if let Some(entry) = self.attachment_state.iter_mut().find(|(i, ..)| *i == index) {
            if to as u8 > entry.1 as u8 {
                entry.1 = to;
            }
        }
    }

    /// Extends color-attachment usages by inspecting the pipeline's per-attachment write
    /// masks and blend states (§4.F): a non-empty write mask with blending enabled
    /// promotes the slot to read-write (blending reads the destination back), a
    /// non-empty mask without blending promotes it to write-only, and an empty mask
    /// leaves it untouched — the promotion ladder (`promote_attachment`) is monotone, so
    /// this never demotes a slot a previous draw already wrote.
    pub fn set_render_pipeline_descriptor(
        &mut self,
        descriptor: &dyn PipelineDescriptor,
        color_attachment_states: &[(AttachmentIndex, ColorAttachmentWriteState)],
        reflection: Box<dyn Reflection>,
    ) {
        let _ = descriptor;
        self.binding.push(Command::SetRenderPipelineDescriptor { descriptor_id: 0 });
        self.binding.set_pipeline_reflection(reflection);
        for (index, write_state) in color_attachment_states {
            if write_state.write_mask == 0 {
                continue;
            }
            let target = if write_state.blending_enabled { AttachmentState::ReadWrite } else { AttachmentState::WriteOnly };
            self.promote_attachment(*index, target);
        }
    }

    /// Extends depth/stencil usage by inspecting the descriptor's write-enable and
    /// compare state directly (§4.F): depth write alone promotes to write-only, a
    /// compare function other than `Always` promotes to read-write (the test reads the
    /// existing depth value back); stencil is promoted analogously per-face, using
    /// whichever of front/back asks for more.
    pub fn set_depth_stencil_descriptor(&mut self, id: u64, descriptor: DepthStencilDescriptor) {
        self.binding.push(Command::SetDepthStencilDescriptor { descriptor_id: id });

        if descriptor.depth_write_enabled {
            self.promote_attachment(AttachmentIndex::Depth, AttachmentState::WriteOnly);
        }
        if descriptor.depth_compare != crate::pass::CompareFunction::Always {
            self.promote_attachment(AttachmentIndex::Depth, AttachmentState::ReadWrite);
        }

        if let Some(state) = stencil_attachment_state(&descriptor.stencil_front).max(stencil_attachment_state(&descriptor.stencil_back)) {
            self.promote_attachment(AttachmentIndex::Stencil, state);
        }
    }

    pub fn set_vertex_buffer(&mut self, index: u32, handle: Handle, offset: u64) {
        self.binding.before_gpu_command();
        self.binding.push(Command::SetVertexBuffer { index, handle, offset });
        self.vertex_buffers.retain(|(i, _)| *i != index);
        self.vertex_buffers.push((index, handle));
        let usage_idx = self.binding.push_usage(ResourceUsage::new(
            handle,
            UsageKind::VertexBuffer,
            Stages::VERTEX,
            ResourceRange::Whole,
            self.binding.last_command_index(),
            self.binding.pass_index(),
        ));
        let _ = usage_idx;
        self.binding.note_resource_read(handle);
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

    /// `draw_primitives`/`draw_indexed_primitives` share the "update bindings, emit,
    /// promote every color attachment to write-only if it is still unused" path.
    pub fn draw_primitives(&mut self, vertex_count: u32, instance_count: u32, base_vertex: u32) {
        assert!(instance_count > 0, "instance_count must be > 0");
        self.binding.before_gpu_command();
        self.binding.push(Command::DrawPrimitives { vertex_count, instance_count, base_vertex });
        self.promote_all_color_attachments_to_write_only();
    }

    pub fn draw_indexed_primitives(&mut self, index_count: u32, instance_count: u32, index_buffer: Handle) {
        assert!(instance_count > 0, "instance_count must be > 0");
        self.binding.before_gpu_command();
        self.binding.push(Command::DrawIndexedPrimitives { index_count, instance_count, index_buffer });
        let usage_idx = self.binding.push_usage(ResourceUsage::new(
            index_buffer,
            UsageKind::IndexBuffer,
            Stages::VERTEX,
            ResourceRange::Whole,
            self.binding.last_command_index(),
            self.binding.pass_index(),
        ));
        let _ = usage_idx;
        self.binding.note_resource_read(index_buffer);
        self.promote_all_color_attachments_to_write_only();
    }

    fn promote_all_color_attachments_to_write_only(&mut self) {
        for (_, state, _) in &mut self.attachment_state {
            if *state == AttachmentState::Unused {
                *state = AttachmentState::WriteOnly;
            }
        }
    }

    /// Folds the final attachment promotion ladder into render-target usages and closes
    /// out the binding encoder, per §4.F "on `end_encoding`, emit a usage per attachment
    /// reflecting its final promoted state, plus resolve-attachment handling".
    pub fn end_encoding(mut self) -> (Vec<Command>, Vec<ResourceUsage>, fxhash::FxHashSet<Handle>, fxhash::FxHashSet<Handle>, RenderTargetDesc) {
        let last = self.binding.last_gpu_command_index();
        for (index, state, texture) in &self.attachment_state {
            let kind = match state {
                AttachmentState::Unused => UsageKind::UnusedRenderTarget,
                AttachmentState::WriteOnly => UsageKind::WriteOnlyRenderTarget,
                AttachmentState::ReadWrite => UsageKind::ReadWriteRenderTarget,
            };
            if kind.is_write() {
                self.binding.note_resource_written(*texture);
            }
            if kind.is_read() {
                self.binding.note_resource_read(*texture);
            }
            self.binding.push_usage(ResourceUsage::new(*texture, kind, Stages::FRAGMENT, ResourceRange::Whole, last, self.binding.pass_index()));
            if let Some(attachment) = self.target_desc.attachment(*index) {
                if let Some(resolve) = attachment.resolve_texture {
                    self.binding.note_resource_written(resolve);
                    self.binding.push_usage(ResourceUsage::new(
                        resolve,
                        UsageKind::WriteOnlyRenderTarget,
                        Stages::FRAGMENT,
                        ResourceRange::Whole,
                        last,
                        self.binding.pass_index(),
                    ));
                }
            }
        }
        self.binding.end_encoding();
        let target_desc = self.target_desc.clone();
        let (commands, usages, read, written) = self.binding.into_parts();
        (commands, usages, read, written, target_desc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::{Flags, ResourceKind};
    use crate::pass::{AttachmentDesc, LoadAction, PixelFormat, StoreAction};

    fn tex() -> Handle {
        Handle::new(1, 0, Flags::empty(), 0, ResourceKind::Texture)
    }

    #[test]
    fn unused_attachment_stays_unused_without_a_draw() {
        let target = RenderTargetDesc {
            attachments: vec![AttachmentDesc {
                index: AttachmentIndex::Color(0),
                texture: tex(),
                format: PixelFormat(1),
                sample_count: 1,
                load: LoadAction::Load,
                store: StoreAction::Store,
                resolve_texture: None,
            }],
        };
        let enc = RenderEncoder::new(0, "test", target, &[]);
        let (_, usages, ..) = enc.end_encoding();
        assert_eq!(usages[0].kind, UsageKind::UnusedRenderTarget);
    }

    #[test]
    fn a_draw_promotes_color_attachments_to_write_only() {
        let target = RenderTargetDesc {
            attachments: vec![AttachmentDesc {
                index: AttachmentIndex::Color(0),
                texture: tex(),
                format: PixelFormat(1),
                sample_count: 1,
                load: LoadAction::Load,
                store: StoreAction::Store,
                resolve_texture: None,
            }],
        };
        let mut enc = RenderEncoder::new(0, "test", target, &[]);
        enc.draw_primitives(3, 1, 0);
        let (_, usages, ..) = enc.end_encoding();
        assert_eq!(usages[0].kind, UsageKind::WriteOnlyRenderTarget);
    }

    #[test]
    #[should_panic(expected = "instance_count")]
    fn zero_instance_draw_is_rejected() {
        let target = RenderTargetDesc { attachments: vec![] };
        let mut enc = RenderEncoder::new(0, "test", target, &[]);
        enc.draw_primitives(3, 0, 0);
    }

    #[derive(Debug)]
    struct FakePipelineDescriptor;
    impl crate::backend::PipelineDescriptor for FakePipelineDescriptor {}

    #[derive(Debug)]
    struct NullReflection;
    impl Reflection for NullReflection {
        fn binding_path(&self, _n: &str, _a: usize, _b: Option<crate::backend::BindingPath>) -> Option<crate::backend::BindingPath> {
            None
        }
        fn binding_is_active(&self, _p: crate::backend::BindingPath) -> bool {
            false
        }
        fn argument_reflection(&self, _p: crate::backend::BindingPath) -> Option<crate::backend::ArgumentReflection> {
            None
        }
        fn argument_buffer_encoder(&self, _p: crate::backend::BindingPath) -> Option<Box<dyn crate::backend::UnmanagedObject>> {
            None
        }
        fn remap_binding_path(&self, _a: crate::backend::BindingPath, b: crate::backend::BindingPath) -> crate::backend::BindingPath {
            b
        }
        fn remap_argument_buffer_path_for_active_stages(&self, p: crate::backend::BindingPath) -> crate::backend::BindingPath {
            p
        }
    }

    fn single_attachment(texture: Handle) -> RenderTargetDesc {
        RenderTargetDesc {
            attachments: vec![AttachmentDesc {
                index: AttachmentIndex::Color(0),
                texture,
                format: PixelFormat(1),
                sample_count: 1,
                load: LoadAction::Load,
                store: StoreAction::Store,
                resolve_texture: None,
            }],
        }
    }

    #[test]
    fn blending_pipeline_promotes_a_written_mask_to_read_write() {
        let mut enc = RenderEncoder::new(0, "test", single_attachment(tex()), &[]);
        enc.set_render_pipeline_descriptor(
            &FakePipelineDescriptor,
            &[(AttachmentIndex::Color(0), ColorAttachmentWriteState { write_mask: 0b1111, blending_enabled: true })],
            Box::new(NullReflection),
        );
        let (_, usages, ..) = enc.end_encoding();
        assert_eq!(usages[0].kind, UsageKind::ReadWriteRenderTarget);
    }

    #[test]
    fn non_blending_pipeline_with_a_write_mask_promotes_to_write_only() {
        let mut enc = RenderEncoder::new(0, "test", single_attachment(tex()), &[]);
        enc.set_render_pipeline_descriptor(
            &FakePipelineDescriptor,
            &[(AttachmentIndex::Color(0), ColorAttachmentWriteState { write_mask: 0b1111, blending_enabled: false })],
            Box::new(NullReflection),
        );
        let (_, usages, ..) = enc.end_encoding();
        assert_eq!(usages[0].kind, UsageKind::WriteOnlyRenderTarget);
    }

    #[test]
    fn empty_write_mask_leaves_the_attachment_unused() {
        let mut enc = RenderEncoder::new(0, "test", single_attachment(tex()), &[]);
        enc.set_render_pipeline_descriptor(
            &FakePipelineDescriptor,
            &[(AttachmentIndex::Color(0), ColorAttachmentWriteState { write_mask: 0, blending_enabled: true })],
            Box::new(NullReflection),
        );
        let (_, usages, ..) = enc.end_encoding();
        assert_eq!(usages[0].kind, UsageKind::UnusedRenderTarget);
    }

    #[test]
    fn depth_write_without_a_compare_test_promotes_write_only() {
        let target = RenderTargetDesc {
            attachments: vec![AttachmentDesc {
                index: AttachmentIndex::Depth,
                texture: tex(),
                format: PixelFormat(1),
                sample_count: 1,
                load: LoadAction::Clear,
                store: StoreAction::Store,
                resolve_texture: None,
            }],
        };
        let mut enc = RenderEncoder::new(0, "test", target, &[]);
        enc.set_depth_stencil_descriptor(0, DepthStencilDescriptor { depth_write_enabled: true, ..Default::default() });
        let (_, usages, ..) = enc.end_encoding();
        assert_eq!(usages[0].kind, UsageKind::WriteOnlyRenderTarget);
    }

    #[test]
    fn depth_compare_other_than_always_promotes_read_write() {
        let target = RenderTargetDesc {
            attachments: vec![AttachmentDesc {
                index: AttachmentIndex::Depth,
                texture: tex(),
                format: PixelFormat(1),
                sample_count: 1,
                load: LoadAction::Clear,
                store: StoreAction::Store,
                resolve_texture: None,
            }],
        };
        let mut enc = RenderEncoder::new(0, "test", target, &[]);
        enc.set_depth_stencil_descriptor(
            0,
            DepthStencilDescriptor { depth_write_enabled: true, depth_compare: crate::pass::CompareFunction::Less, ..Default::default() },
        );
        let (_, usages, ..) = enc.end_encoding();
        assert_eq!(usages[0].kind, UsageKind::ReadWriteRenderTarget);
    }

    #[test]
    fn stencil_stays_unused_when_every_face_is_a_no_op() {
        let target = RenderTargetDesc {
            attachments: vec![AttachmentDesc {
                index: AttachmentIndex::Stencil,
                texture: tex(),
                format: PixelFormat(1),
                sample_count: 1,
                load: LoadAction::Load,
                store: StoreAction::Store,
                resolve_texture: None,
            }],
        };
        let mut enc = RenderEncoder::new(0, "test", target, &[]);
        enc.set_depth_stencil_descriptor(0, DepthStencilDescriptor::default());
        let (_, usages, ..) = enc.end_encoding();
        assert_eq!(usages[0].kind, UsageKind::UnusedRenderTarget);
    }

    #[test]
    fn a_stencil_face_with_a_non_keep_op_promotes_write_only() {
        let target = RenderTargetDesc {
            attachments: vec![AttachmentDesc {
                index: AttachmentIndex::Stencil,
                texture: tex(),
                format: PixelFormat(1),
                sample_count: 1,
                load: LoadAction::Load,
                store: StoreAction::Store,
                resolve_texture: None,
            }],
        };
        let mut enc = RenderEncoder::new(0, "test", target, &[]);
        enc.set_depth_stencil_descriptor(
            0,
            DepthStencilDescriptor {
                stencil_front: StencilFaceState { pass_op: crate::pass::StencilOperation::Replace, ..Default::default() },
                ..Default::default()
            },
        );
        let (_, usages, ..) = enc.end_encoding();
        assert_eq!(usages[0].kind, UsageKind::WriteOnlyRenderTarget);
    }
}
