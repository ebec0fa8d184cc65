//! Construction-time configuration for a [`crate::FrameGraph`].
//!
//! Mirrors the `config`+`toml`-backed device options elsewhere in this codebase
//! (`cfg.get::<usize>("gfx.max_frames_in_flight")`): the same values can be supplied
//! programmatically via [`FrameGraphConfig::builder`] or loaded from a `[frame_graph]`
//! table via [`FrameGraphConfig::from_config`].

use crate::error::Result;

/// Upper bounds and concurrency knobs for a frame graph instance.
#[derive(Copy, Clone, Debug)]
pub struct FrameGraphConfig {
    /// Maximum number of frames executing concurrently on the backend.
    pub inflight_frame_count: u32,
    /// Upper bound used to pre-size the transient buffer registry.
    pub transient_buffer_capacity: usize,
    /// Upper bound used to pre-size the transient texture registry.
    pub transient_texture_capacity: usize,
    /// Upper bound used to pre-size the transient argument-buffer-array registry.
    pub transient_arg_buffer_array_capacity: usize,
    /// Size of the worker pool that records passes in parallel during compilation.
    pub worker_thread_count: usize,
}

impl Default for FrameGraphConfig {
    fn default() -> Self {
        FrameGraphConfig {
            inflight_frame_count: 3,
            transient_buffer_capacity: 256,
            transient_texture_capacity: 256,
            transient_arg_buffer_array_capacity: 64,
            worker_thread_count: 4,
        }
    }
}

impl FrameGraphConfig {
    pub fn builder() -> FrameGraphConfigBuilder {
        FrameGraphConfigBuilder(FrameGraphConfig::default())
    }

    /// Reads a `[frame_graph]` table out of an already-merged `config::Config`, falling
    /// back to [`Default`] values for any key that is absent.
    pub fn from_config(cfg: &config::Config) -> Result<Self> {
        let mut result = FrameGraphConfig::default();
        if let Ok(v) = cfg.get::<u32>("frame_graph.inflight_frame_count") {
            result.inflight_frame_count = v;
        }
        if let Ok(v) = cfg.get::<usize>("frame_graph.transient_buffer_capacity") {
            result.transient_buffer_capacity = v;
        }
        if let Ok(v) = cfg.get::<usize>("frame_graph.transient_texture_capacity") {
            result.transient_texture_capacity = v;
        }
        if let Ok(v) = cfg.get::<usize>("frame_graph.transient_arg_buffer_array_capacity") {
            result.transient_arg_buffer_array_capacity = v;
        }
        if let Ok(v) = cfg.get::<usize>("frame_graph.worker_thread_count") {
            result.worker_thread_count = v;
        }
        Ok(result)
    }
}

/// Builder for [`FrameGraphConfig`]; every setter returns `self` for chaining.
pub struct FrameGraphConfigBuilder(FrameGraphConfig);

impl FrameGraphConfigBuilder {
    pub fn inflight_frame_count(mut self, v: u32) -> Self {
        self.0.inflight_frame_count = v;
        self
    }

    pub fn transient_buffer_capacity(mut self, v: usize) -> Self {
        self.0.transient_buffer_capacity = v;
        self
    }

    pub fn transient_texture_capacity(mut self, v: usize) -> Self {
        self.0.transient_texture_capacity = v;
        self
    }

    pub fn transient_arg_buffer_array_capacity(mut self, v: usize) -> Self {
        self.0.transient_arg_buffer_array_capacity = v;
        self
    }

    pub fn worker_thread_count(mut self, v: usize) -> Self {
        self.0.worker_thread_count = v;
        self
    }

    pub fn build(self) -> FrameGraphConfig {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let cfg = FrameGraphConfig::builder()
            .inflight_frame_count(2)
            .worker_thread_count(1)
            .build();
        assert_eq!(cfg.inflight_frame_count, 2);
        assert_eq!(cfg.worker_thread_count, 1);
        assert_eq!(
            cfg.transient_buffer_capacity,
            FrameGraphConfig::default().transient_buffer_capacity
        );
    }

    #[test]
    fn from_config_reads_frame_graph_table() {
        let mut c = config::Config::default();
        c.merge(config::File::from_str(
            "[frame_graph]\ninflight_frame_count = 5\n",
            config::FileFormat::Toml,
        ))
        .unwrap();
        let cfg = FrameGraphConfig::from_config(&c).unwrap();
        assert_eq!(cfg.inflight_frame_count, 5);
    }
}
