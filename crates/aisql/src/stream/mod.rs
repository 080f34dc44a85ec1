//! Streamed completion handling
//!
//! [`StreamReassembler`] rebuilds the completion text from fragments that may
//! be incremental deltas or cumulative snapshots. [`sse`] frames the raw
//! event stream into those fragments.

pub mod reassembler;
pub mod sse;

pub use reassembler::{DeliveryMode, StreamReassembler, reassemble};
pub use sse::{ReassembledContent, SseDecoder, SseEvent, fragment_from_event, reassemble_sse};
