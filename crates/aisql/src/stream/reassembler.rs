//! Reassembly of token-streamed completions
//!
//! A streaming completion API is expected to emit incremental deltas, each
//! one a new suffix of the output. Some upstreams instead resend the whole
//! text-so-far with every chunk, or switch between the two mid-stream, so
//! plain concatenation duplicates the output over and over. The reassembler
//! folds fragments into one final text without knowing which delivery mode
//! is in effect.

use std::fmt;

use tracing::trace;

/// How the fragments seen so far were delivered.
///
/// Diagnostic only: the reassembled text never depends on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryMode {
    /// No non-empty fragment has been seen
    #[default]
    Empty,
    /// Every fragment was appended as a delta
    Incremental,
    /// Every fragment after the first restated the full text
    Cumulative,
    /// Both appends and restatements occurred
    Mixed,
}

impl DeliveryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryMode::Empty => "empty",
            DeliveryMode::Incremental => "incremental",
            DeliveryMode::Cumulative => "cumulative",
            DeliveryMode::Mixed => "mixed",
        }
    }
}

impl fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Running reconstruction state for one stream.
///
/// Create one per stream and feed it fragments in arrival order. Instances
/// must not be shared between streams.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamReassembler {
    accumulated: String,
    last_fragment: String,
    appended: usize,
    replaced: usize,
}

impl StreamReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one fragment into the reconstruction.
    ///
    /// A fragment containing the previous fragment, or everything accumulated
    /// so far, is taken as a cumulative snapshot and replaces the text.
    /// Anything else is appended. Empty fragments are ignored.
    pub fn push(&mut self, fragment: &str) {
        if fragment.is_empty() {
            return;
        }

        let restates_last =
            !self.last_fragment.is_empty() && fragment.contains(self.last_fragment.as_str());
        let restates_all =
            !self.accumulated.is_empty() && fragment.contains(self.accumulated.as_str());

        if restates_last || restates_all {
            trace!(
                fragment_len = fragment.len(),
                accumulated_len = self.accumulated.len(),
                restates_last,
                "cumulative fragment, replacing accumulated text"
            );
            self.accumulated.clear();
            self.accumulated.push_str(fragment);
            self.replaced += 1;
        } else {
            trace!(fragment_len = fragment.len(), "incremental fragment");
            self.accumulated.push_str(fragment);
            self.appended += 1;
        }

        self.last_fragment.clear();
        self.last_fragment.push_str(fragment);
    }

    /// The current best guess at the full text
    pub fn accumulated(&self) -> &str {
        &self.accumulated
    }

    /// The most recent non-empty fragment
    pub fn last_fragment(&self) -> &str {
        &self.last_fragment
    }

    pub fn is_empty(&self) -> bool {
        self.accumulated.is_empty()
    }

    /// Delivery mode inferred from the fragments seen so far.
    ///
    /// The first fragment of any stream is an append, so a cumulative stream
    /// shows exactly one append.
    pub fn mode(&self) -> DeliveryMode {
        match (self.appended, self.replaced) {
            (0, 0) => DeliveryMode::Empty,
            (_, 0) => DeliveryMode::Incremental,
            (0 | 1, _) => DeliveryMode::Cumulative,
            _ => DeliveryMode::Mixed,
        }
    }

    /// Consume the reassembler and return the final text
    pub fn into_text(self) -> String {
        self.accumulated
    }
}

impl<S: AsRef<str>> Extend<S> for StreamReassembler {
    fn extend<I: IntoIterator<Item = S>>(&mut self, fragments: I) {
        for fragment in fragments {
            self.push(fragment.as_ref());
        }
    }
}

impl<S: AsRef<str>> FromIterator<S> for StreamReassembler {
    fn from_iter<I: IntoIterator<Item = S>>(fragments: I) -> Self {
        let mut reassembler = Self::new();
        reassembler.extend(fragments);
        reassembler
    }
}

/// Pure form of [`StreamReassembler::push`]: returns the state after `fragment`.
pub fn reassemble(mut state: StreamReassembler, fragment: &str) -> StreamReassembler {
    state.push(fragment);
    state
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = "人工智能是计算机科学的一个分支。";

    #[test]
    fn test_cumulative_stream_keeps_last_snapshot() {
        let state: StreamReassembler = ["人工智能", "人工智能是计算机科学", FULL]
            .into_iter()
            .collect();

        assert_eq!(state.accumulated(), FULL);
        assert_eq!(state.accumulated().chars().count(), 16);
        assert_eq!(state.mode(), DeliveryMode::Cumulative);
    }

    #[test]
    fn test_incremental_stream_concatenates() {
        let state: StreamReassembler = ["人工智能", "是计算机科学", "的一个分支。"]
            .into_iter()
            .collect();

        assert_eq!(state.accumulated(), FULL);
        assert_eq!(state.mode(), DeliveryMode::Incremental);
    }

    #[test]
    fn test_mixed_stream_resets_on_full_restatement() {
        let state: StreamReassembler = ["人工智能", "是计算机科学", FULL].into_iter().collect();

        assert_eq!(state.accumulated(), FULL);
        assert_eq!(state.mode(), DeliveryMode::Mixed);
    }

    #[test]
    fn test_empty_fragment_is_noop() {
        let mut state = StreamReassembler::new();
        state.push("Hello");
        let before = state.clone();

        state.push("");
        assert_eq!(state, before);
        assert_eq!(state.last_fragment(), "Hello");
    }

    #[test]
    fn test_duplicate_snapshot_collapses() {
        let state: StreamReassembler = ["Hel", "Hello", "Hello"].into_iter().collect();
        assert_eq!(state.accumulated(), "Hello");
    }

    #[test]
    fn test_duplicate_delta_is_read_as_restatement() {
        // indistinguishable from a cumulative snapshot of the last fragment
        let state: StreamReassembler = ["Hello", " world", " world"].into_iter().collect();
        assert_eq!(state.accumulated(), " world");
    }

    #[test]
    fn test_truncated_repeat_is_appended() {
        // prefix of the previous fragment: left as an append, see DESIGN.md
        let state: StreamReassembler = ["Hello world", "Hello"].into_iter().collect();
        assert_eq!(state.accumulated(), "Hello worldHello");
    }

    #[test]
    fn test_restatement_after_deltas() {
        let state: StreamReassembler = ["ab", "c", "abcd", "e"].into_iter().collect();
        assert_eq!(state.accumulated(), "abcde");
        assert_eq!(state.mode(), DeliveryMode::Mixed);
    }

    #[test]
    fn test_pure_function_matches_push() {
        let fragments = ["The ", "The quick", " fox"];
        let folded = fragments
            .iter()
            .fold(StreamReassembler::new(), |state, f| reassemble(state, f));

        let mut pushed = StreamReassembler::new();
        for f in fragments {
            pushed.push(f);
        }

        assert_eq!(folded, pushed);
        assert_eq!(folded.into_text(), "The quick fox");
    }

    #[test]
    fn test_new_state_is_empty() {
        let state = StreamReassembler::new();
        assert!(state.is_empty());
        assert_eq!(state.mode(), DeliveryMode::Empty);
        assert_eq!(state.into_text(), "");
    }
}
