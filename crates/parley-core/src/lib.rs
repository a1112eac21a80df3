//! Parley Session Core
//!
//! This crate provides the client-side session core of the Parley multi-user chat
//! client: a sorted, deduplicated participant registry, an arrival-ordered message log
//! with a pluggable multi-key ordering policy, the filter projection used for display,
//! and the blocking ingestion loop that drives them from a transport.
//!
//! Everything visual (windows, colours, key bindings) lives outside this crate and talks
//! to it through the [`render::RenderSink`] and [`transport::CommandSink`] seams.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod config;
pub mod errors;
pub mod ingest;
pub mod log;
pub mod message;
pub mod ordering;
pub mod projector;
pub mod registry;
pub mod render;
pub mod session;
pub mod transport;
pub mod types;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use config::SessionConfig;
pub use errors::{
    ConfigError, IngestError, ParleyError, RenderError, Result, StartupFailure, TransportError,
};
pub use ingest::{EndReason, IngestReport, IngestState, IngestionLoop, RunFlag, StateWatch};
pub use log::MessageLog;
pub use message::{name_color_seed, Message};
pub use ordering::{Criteria, OrderingPolicy, SortCriterion};
pub use projector::{project, remaining_after_removal, survives_removal, Selection};
pub use registry::{NameRegistry, RegistryChange};
pub use render::{render_all, MemoryRenderSink, RenderSink};
pub use session::ChatSession;
pub use transport::{
    pipe, CommandSink, JsonLinesSource, LineCommandSink, MessageSource, PipeReader, PipeWriter,
    StreamSlot,
};
pub use types::Timestamp;
