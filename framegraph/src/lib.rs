//! Frame graph compiler and executor for a GPU rendering pipeline.
//!
//! Client code declares a batch of render passes (draw, compute, blit, external, CPU)
//! that read and write GPU resources. The graph records each pass's commands into a
//! deferred stream, infers inter-pass dependencies from resource usage, prunes passes
//! that contribute nothing to an externally visible output, orders the survivors, and
//! hands a compiled plan to a backend for execution.
//!
//! The backend itself, pipeline reflection, GPU memory allocation, and presentation are
//! all out of scope here: this crate only consumes them through the traits in
//! [`backend`].

#[macro_use]
extern crate log;

pub mod arena;
pub mod argument;
pub mod backend;
pub mod chunked;
pub mod command;
pub mod compiler;
pub mod config;
pub mod dependency;
pub mod encoder;
pub mod error;
pub mod handle;
pub mod orchestrator;
pub mod pass;
pub mod registry;
pub mod usage;

pub use backend::{Backend, Reflection};
pub use config::FrameGraphConfig;
pub use error::{FrameGraphError, Result};
pub use handle::{Flags, Handle, ResourceKind};
pub use orchestrator::FrameGraph;
pub use pass::{Pass, PassKind};

pub use framegraph_macros::Encodable;
