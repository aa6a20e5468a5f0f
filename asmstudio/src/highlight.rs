//! The `highlight` module holds the debounce state machine that decides when a
//! highlight pass runs and whether its result may still be applied.
//!
//! ```text
//! Idle ──edit──► Scheduled ──deadline──► Running ──apply/stale──► Idle
//!                   ▲  │edit                  │edit
//!                   └──┘                      ▼
//!                                          Scheduled
//! ```
//!
//! Time is passed in by the caller, so the machine has no timers of its own and can be
//! driven from any event loop (or a test) deterministically.

use crate::lexer::{self, Span};
use std::time::{Duration, Instant};

/// Caret/selection byte offsets to restore after spans were applied.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Selection {
    pub start: usize,
    pub end: usize,
}

impl Selection {
    #[must_use]
    pub const fn caret(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }
}

/// Immutable snapshot handed to the background worker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HighlightJob {
    pub generation: u64,
    pub text: String,
    pub selection: Selection,
}

impl HighlightJob {
    /// Tokenize the snapshot.
    #[must_use]
    pub fn run(&self) -> HighlightResult {
        HighlightResult {
            generation: self.generation,
            spans: lexer::tokenize(&self.text),
            selection: self.selection,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HighlightResult {
    pub generation: u64,
    pub spans: Vec<Span>,
    pub selection: Selection,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HighlightState {
    Idle,
    Scheduled { deadline: Instant },
    Running { job: HighlightJob, applying: bool },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EditOutcome {
    /// A pass is pending and will be due at `deadline`
    Scheduled { deadline: Instant },
    /// The edit came from applying highlight output and was ignored
    Suppressed,
}

/// Proof that a result was accepted. Edits are suppressed until it is handed back to
/// [`HighlightScheduler::end_apply`].
#[derive(Debug)]
#[must_use = "pass the ticket to `end_apply` once the spans are applied"]
pub struct ApplyTicket {
    generation: u64,
}

#[derive(Debug)]
pub struct HighlightScheduler {
    state: HighlightState,
    delay: Duration,
    generation: u64,
}

impl Default for HighlightScheduler {
    fn default() -> Self {
        Self::new(Duration::from_millis(300))
    }
}

impl HighlightScheduler {
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self {
            state: HighlightState::Idle,
            delay,
            generation: 0,
        }
    }

    #[must_use]
    pub const fn state(&self) -> &HighlightState {
        &self.state
    }

    #[must_use]
    pub const fn is_applying(&self) -> bool {
        matches!(self.state, HighlightState::Running { applying: true, .. })
    }

    /// Deadline of the pending pass, if one is scheduled.
    #[must_use]
    pub const fn next_deadline(&self) -> Option<Instant> {
        match self.state {
            HighlightState::Scheduled { deadline } => Some(deadline),
            _ => None,
        }
    }

    /// Record a text edit. Bursts of edits coalesce: each one pushes the deadline out.
    pub fn notify_edit(&mut self, now: Instant) -> EditOutcome {
        if self.is_applying() {
            return EditOutcome::Suppressed;
        }

        let deadline = now.checked_add(self.delay).unwrap_or(now);
        if let HighlightState::Running { job, .. } = &self.state {
            tracing::trace!(generation = job.generation, "edit supersedes running highlight pass");
        }
        self.state = HighlightState::Scheduled { deadline };
        EditOutcome::Scheduled { deadline }
    }

    /// Start the pending pass once its deadline has passed, capturing `text` and
    /// `selection`. Returns the job to run off the interactive thread.
    pub fn poll(&mut self, now: Instant, text: &str, selection: Selection) -> Option<HighlightJob> {
        let HighlightState::Scheduled { deadline } = self.state else {
            return None;
        };
        if now < deadline {
            return None;
        }

        if text.is_empty() {
            self.state = HighlightState::Idle;
            return None;
        }

        self.generation += 1;
        let job = HighlightJob {
            generation: self.generation,
            text: text.to_string(),
            selection,
        };
        self.state = HighlightState::Running {
            job: job.clone(),
            applying: false,
        };
        Some(job)
    }

    /// Accept `result` for applying if it belongs to the running pass and the text has
    /// not changed since the snapshot. Stale results are dropped.
    pub fn begin_apply(
        &mut self,
        result: &HighlightResult,
        current_text: &str,
    ) -> Option<ApplyTicket> {
        let HighlightState::Running { job, applying } = &mut self.state else {
            tracing::debug!(generation = result.generation, "dropping highlight result, no pass running");
            return None;
        };

        if *applying || job.generation != result.generation {
            tracing::debug!(
                generation = result.generation,
                current = job.generation,
                "dropping superseded highlight result"
            );
            return None;
        }

        if job.text != current_text {
            tracing::debug!(generation = result.generation, "dropping stale highlight result");
            self.state = HighlightState::Idle;
            return None;
        }

        *applying = true;
        Some(ApplyTicket {
            generation: result.generation,
        })
    }

    /// Finish applying; the scheduler goes back to idle.
    pub fn end_apply(&mut self, ticket: ApplyTicket) {
        if let HighlightState::Running { job, .. } = &self.state
            && job.generation == ticket.generation
        {
            self.state = HighlightState::Idle;
        }
    }

    /// The pass `generation` produced no result (e.g. its task failed). Leaves the text
    /// unstyled until the next edit.
    pub fn abandon(&mut self, generation: u64) {
        if let HighlightState::Running { job, applying: false } = &self.state
            && job.generation == generation
        {
            self.state = HighlightState::Idle;
        }
    }
}
