//! The external encoder (§4.F "external encoder"): wraps an opaque, backend-interpreted
//! payload while still requiring the resources it touches to be declared, so dependency
//! analysis stays correct even though the core cannot see inside the payload itself.

use crate::command::Command;
use crate::encoder::ResourceBindingEncoder;
use crate::handle::Handle;
use crate::usage::{ResourceRange, ResourceUsage, Stages, UsageKind};

pub struct ExternalEncoder {
    binding: ResourceBindingEncoder,
}

impl ExternalEncoder {
    pub fn new(pass_index: usize, pass_name: &str) -> Self {
        ExternalEncoder { binding: ResourceBindingEncoder::new(pass_index, pass_name) }
    }

    /// Records the opaque command itself plus one usage per resource the caller declares
    /// it touches; `reads`/`writes` stand in for whatever the backend-specific payload
    /// actually does, since the core has no way to infer it.
    pub fn record(&mut self, label: impl Into<String>, reads: &[Handle], writes: &[Handle]) {
        let idx = self.binding.push(Command::External { label: label.into() });
        for &h in reads {
            self.binding.note_resource_read(h);
            self.binding.push_usage(ResourceUsage::new(h, UsageKind::Read, Stages::empty(), ResourceRange::Whole, idx, self.binding.pass_index()));
        }
        for &h in writes {
            self.binding.note_resource_written(h);
            self.binding.push_usage(ResourceUsage::new(h, UsageKind::Write, Stages::empty(), ResourceRange::Whole, idx, self.binding.pass_index()));
        }
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
    fn declared_resources_produce_matching_usages() {
        let mut enc = ExternalEncoder::new(0, "test");
        let r = Handle::new(1, 0, Flags::empty(), 0, ResourceKind::Buffer);
        let w = Handle::new(2, 0, Flags::empty(), 0, ResourceKind::Buffer);
        enc.record("native-plugin-call", &[r], &[w]);
        let (_, usages, read, written) = enc.end_encoding();
        assert!(read.contains(&r));
        assert!(written.contains(&w));
        assert_eq!(usages.len(), 2);
    }
}
