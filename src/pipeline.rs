//! Row events in, one outcome out.
//!
//! ```text
//! AwaitingFirstRow --row--> Streaming --row--> Streaming
//!        |                      |
//!        +--- missing cols ---> Failed
//!        +--- parser error ---> Failed
//!        +--- end, no rows ---> Empty
//!                               +--- end -----> Succeeded
//! ```
//!
//! The three right-hand states are terminal. Whatever arrives after the
//! first terminal transition is dropped, so a caller can keep feeding events
//! without checking whether it already has an answer.
use std::mem;

use tracing::{debug, trace};

use crate::clean::{clean_row, RawRow, ResultSet};
use crate::validate::{missing_columns, ValidationMode};
use crate::{IngestError, Outcome};

/// What the parser reports, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Row(RawRow),
    Error(String),
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    AwaitingFirstRow,
    Streaming,
    Failed,
    Succeeded,
    Empty,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PipelineState::Failed | PipelineState::Succeeded | PipelineState::Empty
        )
    }
}

#[derive(Debug)]
pub struct Pipeline {
    state: PipelineState,
    mode: ValidationMode,
    rows_seen: usize,
    results: ResultSet,
}

impl Pipeline {
    pub fn new(mode: ValidationMode) -> Self {
        Self {
            state: PipelineState::AwaitingFirstRow,
            mode,
            rows_seen: 0,
            results: Vec::new(),
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Rows accumulated so far. Emptied once an outcome is committed.
    pub fn rows(&self) -> &[crate::CleanedRow] {
        &self.results
    }

    /// Advance on one event. Returns `Some` exactly once per pipeline: on the
    /// transition into a terminal state.
    pub fn handle(&mut self, event: StreamEvent) -> Option<Outcome> {
        if self.state.is_terminal() {
            trace!(state = ?self.state, "event after commit ignored");
            return None;
        }

        match event {
            StreamEvent::Row(raw) => {
                if self.mode.applies_to(self.rows_seen) {
                    let missing = missing_columns(&raw);
                    if !missing.is_empty() {
                        debug!(row = self.rows_seen, ?missing, "required columns missing");
                        return self.commit(
                            PipelineState::Failed,
                            Err(IngestError::MissingColumns { missing }),
                        );
                    }
                }
                self.rows_seen += 1;
                self.results.push(clean_row(raw));
                self.state = PipelineState::Streaming;
                None
            }
            StreamEvent::Error(message) => {
                debug!(rows = self.rows_seen, %message, "parser error");
                self.commit(PipelineState::Failed, Err(IngestError::Parse(message)))
            }
            StreamEvent::End if self.results.is_empty() => {
                self.commit(PipelineState::Empty, Err(IngestError::Empty))
            }
            StreamEvent::End => {
                let rows = mem::take(&mut self.results);
                self.commit(PipelineState::Succeeded, Ok(rows))
            }
        }
    }

    fn commit(&mut self, state: PipelineState, outcome: Outcome) -> Option<Outcome> {
        debug!(from = ?self.state, to = ?state, "outcome committed");
        self.state = state;
        self.results = Vec::new();
        Some(outcome)
    }
}
