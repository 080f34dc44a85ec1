//! aisql - LLM-backed SQL functions
//!
//! Wraps a remote LLM API (text generation, embeddings, vision) as a catalogue
//! of SQL functions returning JSON. The two pieces every text function goes
//! through are the [`stream`] reassembler, which rebuilds one completion from
//! incremental or cumulative stream fragments, and the [`extract`] module,
//! which recovers JSON from free-form model output.

pub mod config;
pub mod error;
pub mod extract;
pub mod functions;
pub mod provider;
pub mod stream;
pub mod testing;

pub use error::{AisqlError, Result};
pub use extract::{ExtractionResult, FallbackReason, extract};
pub use stream::{DeliveryMode, StreamReassembler, reassemble};
pub use functions::{AiFunction, FunctionArgs, FunctionRunner, UdfResponse};
pub use provider::{CompletionProvider, RemoteProvider};
