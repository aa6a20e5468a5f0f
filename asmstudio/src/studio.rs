//! The `studio` module is the interactive-thread side of the front end.
//!
//! [`Studio`] owns the documents, the highlight scheduler and the background worker.
//! The host calls [`Studio::notify_edit`] on every edit and [`Studio::tick`] from its
//! event loop. Each tick snapshots the editor into the current document, so an
//! assembly always sees what was typed. Work runs on the worker and comes back as
//! [`StudioEvent`]s.

use crate::assembler::{Assembler, AssemblyReport, AssemblyRequest, assemble_request};
use crate::config::StudioConfig;
use crate::error::StudioError;
use crate::export::{self, ExportedFiles};
use crate::highlight::{EditOutcome, HighlightResult, HighlightScheduler, Selection};
use crate::lexer::Span;
use crate::session::DocumentSet;
use crate::worker::{TaskId, TaskReport, Worker};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// The text widget being highlighted.
pub trait EditorSurface {
    fn text(&self) -> String;
    fn selection(&self) -> Selection;
    /// Replace the styling of the whole text with `spans` and restore `selection`.
    /// Edit notifications raised from here are ignored by the scheduler.
    fn apply_highlight(&mut self, spans: &[Span], selection: Selection);
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StudioEvent {
    Status { message: String, is_error: bool },
    Assembled(AssemblyReport),
    /// Assembler message, verbatim
    AssemblyFailed(String),
    Exported(ExportedFiles),
    Highlighted { spans: Vec<Span> },
}

impl StudioEvent {
    fn status(message: impl Into<String>) -> Self {
        Self::Status {
            message: message.into(),
            is_error: false,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self::Status {
            message: message.into(),
            is_error: true,
        }
    }
}

/// What a worker task produced.
#[derive(Debug)]
enum TaskOutput {
    Highlight(HighlightResult),
    Assembly(AssemblyReport),
    Export(ExportedFiles),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum TaskKind {
    Highlight { generation: u64 },
    Assembly,
    Export,
}

pub struct Studio<A: Assembler + 'static> {
    documents: DocumentSet,
    /// Shared with editor listeners, which report edits through it
    scheduler: Rc<RefCell<HighlightScheduler>>,
    worker: Worker<TaskOutput>,
    assembler: Arc<Mutex<A>>,
    config: StudioConfig,
    reference_hex: Option<String>,
    last_report: Option<AssemblyReport>,
    pending: HashMap<TaskId, TaskKind>,
    events: Vec<StudioEvent>,
}

impl<A: Assembler + 'static> Studio<A> {
    /// # Errors
    /// Returns an error if the background worker cannot be started.
    pub fn new(assembler: A, config: StudioConfig) -> Result<Self, StudioError> {
        Ok(Self {
            documents: DocumentSet::with_placeholder(&config.placeholder_name),
            scheduler: Rc::new(RefCell::new(HighlightScheduler::new(config.highlight_delay))),
            worker: Worker::spawn("asmstudio-worker")?,
            assembler: Arc::new(Mutex::new(assembler)),
            config,
            reference_hex: None,
            last_report: None,
            pending: HashMap::new(),
            events: Vec::new(),
        })
    }

    #[must_use]
    pub const fn documents(&self) -> &DocumentSet {
        &self.documents
    }

    pub const fn documents_mut(&mut self) -> &mut DocumentSet {
        &mut self.documents
    }

    #[must_use]
    pub const fn config(&self) -> &StudioConfig {
        &self.config
    }

    /// Report of the last successful assembly, if the last assembly succeeded.
    #[must_use]
    pub const fn last_report(&self) -> Option<&AssemblyReport> {
        self.last_report.as_ref()
    }

    /// Handle for editor listeners that need to report edits themselves.
    #[must_use]
    pub fn scheduler(&self) -> Rc<RefCell<HighlightScheduler>> {
        Rc::clone(&self.scheduler)
    }

    /// Trusted HEX every following assembly is checked against.
    pub fn set_reference_hex(&mut self, reference_hex: Option<String>) {
        self.reference_hex = reference_hex;
    }

    pub fn notify_edit(&mut self, now: Instant) -> EditOutcome {
        self.scheduler.borrow_mut().notify_edit(now)
    }

    /// Copy the editor text into the current document, start a due highlight pass and
    /// process whatever the worker has finished. Never blocks.
    ///
    /// `editor` must be showing the current document.
    pub fn tick(&mut self, now: Instant, editor: &mut impl EditorSurface) -> Vec<StudioEvent> {
        let text = editor.text();
        if self.documents.current().content != text {
            self.documents.update_current(&text);
        }

        let job = self
            .scheduler
            .borrow_mut()
            .poll(now, &text, editor.selection());

        if let Some(job) = job {
            let generation = job.generation;
            match self.worker.submit("highlight", move || Ok(TaskOutput::Highlight(job.run()))) {
                Ok(id) => {
                    self.pending.insert(id, TaskKind::Highlight { generation });
                }
                Err(err) => {
                    tracing::warn!(%err, "could not queue highlight pass");
                    self.scheduler.borrow_mut().abandon(generation);
                }
            }
        }

        for report in self.worker.drain() {
            self.handle_report(report, editor);
        }
        std::mem::take(&mut self.events)
    }

    /// Block until the worker reports one task (or `timeout` passes), then process it
    /// along with anything else already finished. For hosts without an event loop.
    ///
    /// # Errors
    /// Returns [`StudioError::WorkerClosed`] if the worker is gone.
    pub fn wait(
        &mut self,
        timeout: Duration,
        editor: &mut impl EditorSurface,
    ) -> Result<Vec<StudioEvent>, StudioError> {
        if let Some(report) = self.worker.wait_next(timeout)? {
            self.handle_report(report, editor);
        }
        for report in self.worker.drain() {
            self.handle_report(report, editor);
        }
        Ok(std::mem::take(&mut self.events))
    }

    /// Whether any submitted task has not reported back yet.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Assemble the current document with every open document as an include.
    pub fn assemble(&mut self) {
        let request = AssemblyRequest::from_session(&self.documents, self.reference_hex.clone());
        let assembler = Arc::clone(&self.assembler);
        let config = self.config.clone();

        let submitted = self.worker.submit("assemble", move || {
            // A panic inside an earlier assembly must not lock the assembler forever
            let mut assembler = assembler.lock().unwrap_or_else(PoisonError::into_inner);
            assemble_request(&mut *assembler, &request, &config).map(TaskOutput::Assembly)
        });
        self.track(submitted, TaskKind::Assembly, "Assembling...");
    }

    /// Write the last successful assembly into the configured export directory.
    pub fn export(&mut self) {
        let Some(report) = self.last_report.clone() else {
            self.events.push(StudioEvent::error(StudioError::NothingToExport.to_string()));
            return;
        };
        let name = self.documents.current().name.clone();
        let dir = self.config.export_dir.clone();

        let submitted = self.worker.submit("export", move || {
            export::export(&report, &name, &dir).map(TaskOutput::Export)
        });
        self.track(submitted, TaskKind::Export, "Exporting...");
    }

    fn track(&mut self, submitted: Result<TaskId, StudioError>, kind: TaskKind, status: &str) {
        match submitted {
            Ok(id) => {
                self.pending.insert(id, kind);
                self.events.push(StudioEvent::status(status));
            }
            Err(err) => self.events.push(StudioEvent::error(err.to_string())),
        }
    }

    fn handle_report(&mut self, report: TaskReport<TaskOutput>, editor: &mut impl EditorSurface) {
        let Some(kind) = self.pending.remove(&report.id) else {
            tracing::warn!(id = report.id, label = %report.label, "report for unknown task");
            return;
        };

        match (kind, report.result) {
            (_, Ok(TaskOutput::Highlight(result))) => self.apply_highlight(result, editor),
            (TaskKind::Highlight { generation }, Err(err)) => {
                // Highlighting failures only cost styling
                tracing::warn!(generation, %err, "highlight pass failed");
                self.scheduler.borrow_mut().abandon(generation);
            }
            (_, Ok(TaskOutput::Assembly(report))) => {
                let message = match report.reference_match {
                    Some(true) => format!("Assembled {} bytes, matches reference", report.image_len),
                    Some(false) => format!("Assembled {} bytes, DIFFERS from reference", report.image_len),
                    None => format!("Assembled {} bytes", report.image_len),
                };
                self.last_report = Some(report.clone());
                self.events.push(StudioEvent::Assembled(report));
                self.events.push(StudioEvent::status(message));
            }
            (TaskKind::Assembly, Err(StudioError::AssemblyFailure(text))) => {
                self.last_report = None;
                self.events.push(StudioEvent::AssemblyFailed(text));
            }
            (TaskKind::Assembly, Err(err)) => {
                self.last_report = None;
                self.events.push(StudioEvent::error(err.to_string()));
            }
            (_, Ok(TaskOutput::Export(files))) => {
                let message = format!("Exported to {}", files.hex.display());
                self.events.push(StudioEvent::Exported(files));
                self.events.push(StudioEvent::status(message));
            }
            (TaskKind::Export, Err(err)) => {
                self.events.push(StudioEvent::error(err.to_string()));
            }
        }
    }

    fn apply_highlight(&mut self, result: HighlightResult, editor: &mut impl EditorSurface) {
        // The scheduler must not stay borrowed while the editor runs its listeners
        let ticket = self
            .scheduler
            .borrow_mut()
            .begin_apply(&result, &editor.text());
        let Some(ticket) = ticket else {
            return;
        };

        editor.apply_highlight(&result.spans, result.selection);
        self.scheduler.borrow_mut().end_apply(ticket);
        self.events.push(StudioEvent::Highlighted {
            spans: result.spans,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::tests::ScriptedAssembler;
    use crate::highlight::HighlightState;
    use crate::lexer::{ColorClass, tokenize};
    use std::time::{SystemTime, UNIX_EPOCH};

    const TIMEOUT: Duration = Duration::from_secs(5);

    /// Editor double whose change listener reports every text change, including
    /// the ones caused by applying highlight spans.
    struct FakeEditor {
        text: RefCell<String>,
        /// Text the user types right after the next snapshot was taken
        typed_ahead: RefCell<Option<String>>,
        selection: Selection,
        spans: Vec<Span>,
        listener: Rc<RefCell<HighlightScheduler>>,
        suppressed: usize,
    }

    impl FakeEditor {
        fn new(text: &str, listener: Rc<RefCell<HighlightScheduler>>) -> Self {
            Self {
                text: RefCell::new(text.to_string()),
                typed_ahead: RefCell::new(None),
                selection: Selection::caret(text.len()),
                spans: vec![],
                listener,
                suppressed: 0,
            }
        }
    }

    impl EditorSurface for FakeEditor {
        fn text(&self) -> String {
            let current = self.text.borrow().clone();
            if let Some(next) = self.typed_ahead.borrow_mut().take() {
                *self.text.borrow_mut() = next;
            }
            current
        }

        fn selection(&self) -> Selection {
            self.selection
        }

        fn apply_highlight(&mut self, spans: &[Span], selection: Selection) {
            // Re-styling counts as a text change for the widget
            self.selection = Selection::default();
            if self.listener.borrow_mut().notify_edit(Instant::now()) == EditOutcome::Suppressed {
                self.suppressed += 1;
            }
            self.spans = spans.to_vec();
            self.selection = selection;
        }
    }

    fn wait_until<A: Assembler + 'static>(
        studio: &mut Studio<A>,
        editor: &mut FakeEditor,
        mut events: Vec<StudioEvent>,
        done: impl Fn(&StudioEvent) -> bool,
    ) -> Vec<StudioEvent> {
        while !events.iter().any(&done) {
            let batch = studio.wait(TIMEOUT, editor).unwrap();
            assert!(!batch.is_empty() || studio.is_busy(), "no progress");
            events.extend(batch);
        }
        events
    }

    fn studio_with(output: &str) -> Studio<ScriptedAssembler> {
        Studio::new(
            ScriptedAssembler::answering(output, "LISTING"),
            StudioConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_highlight_pass_applies_spans_and_restores_selection() {
        // Arrange
        let mut studio = studio_with(":00000001FF\n");
        let text = "LABEL: MOV R1,R2 ; comment";
        let mut editor = FakeEditor::new(text, studio.scheduler());
        editor.selection = Selection { start: 7, end: 10 };
        let t0 = Instant::now();

        // Act
        studio.notify_edit(t0);
        let early = studio.tick(t0 + Duration::from_millis(100), &mut editor);
        let started = studio.tick(t0 + Duration::from_millis(300), &mut editor);
        let events = wait_until(&mut studio, &mut editor, started, |e| {
            matches!(e, StudioEvent::Highlighted { .. })
        });

        // Assert
        assert!(early.is_empty());
        assert_eq!(editor.spans, tokenize(text));
        assert_eq!(editor.selection, Selection { start: 7, end: 10 });
        assert_eq!(editor.suppressed, 1);
        assert!(events.contains(&StudioEvent::Highlighted {
            spans: tokenize(text)
        }));
        assert!(editor.spans.contains(&Span::new(0, 6, ColorClass::Label)));
        assert_eq!(studio.scheduler().borrow().state(), &HighlightState::Idle);
    }

    #[test]
    fn test_highlight_result_dropped_when_text_changed() {
        // Arrange
        let mut studio = studio_with(":00000001FF\n");
        let mut editor = FakeEditor::new("NOP", studio.scheduler());
        let t0 = Instant::now();
        studio.notify_edit(t0);

        // Act: the user keeps typing while the pass runs
        *editor.typed_ahead.borrow_mut() = Some("NOP\nRET".to_string());
        let mut events = studio.tick(t0 + Duration::from_millis(300), &mut editor);
        if studio.is_busy() {
            events.extend(studio.wait(TIMEOUT, &mut editor).unwrap());
        }

        // Assert
        assert!(events.is_empty());
        assert!(editor.spans.is_empty());
        assert_eq!(studio.scheduler().borrow().state(), &HighlightState::Idle);
        assert!(!studio.is_busy());
    }

    #[test]
    fn test_assemble_reports_canonical_hex() {
        // Arrange
        let mut studio = studio_with(":0100010022DC\n:0100000011EE\n:00000001FF\n");
        let mut editor = FakeEditor::new("", studio.scheduler());
        studio.documents_mut().open("main.asm", "DB 0x11, 0x22");
        studio.set_reference_hex(Some(":020000001122CB\n:00000001FF\n".to_string()));

        // Act
        studio.assemble();
        let events = wait_until(&mut studio, &mut editor, vec![], |e| {
            matches!(e, StudioEvent::Assembled(_))
        });

        // Assert
        let report = studio.last_report().unwrap();
        assert_eq!(report.canonical_hex, ":020000001122CB\n:00000001FF\n");
        assert_eq!(report.listing, "LISTING");
        assert_eq!(report.reference_match, Some(true));
        assert!(events.contains(&StudioEvent::Status {
            message: "Assembled 2 bytes, matches reference".to_string(),
            is_error: false
        }));
    }

    #[test]
    fn test_assemble_uses_edited_text() {
        // Arrange
        let mut studio = studio_with(":0100000042BD\n:00000001FF\n");
        studio.documents_mut().open("main.asm", "NOP");
        let mut editor = FakeEditor::new("NOP\nDB 0x42", studio.scheduler());
        let t0 = Instant::now();

        // Act
        studio.notify_edit(t0);
        let events = studio.tick(t0, &mut editor);
        studio.assemble();
        wait_until(&mut studio, &mut editor, events, |e| matches!(e, StudioEvent::Assembled(_)));

        // Assert
        assert_eq!(studio.documents().current().content, "NOP\nDB 0x42");
        let assembler = studio.assembler.lock().unwrap();
        assert_eq!(assembler.sources, ["NOP\nDB 0x42"]);
        assert!(
            assembler
                .includes
                .contains(&("main.asm".to_string(), "NOP\nDB 0x42".to_string()))
        );
    }

    #[test]
    fn test_assembly_failure_is_surfaced_verbatim() {
        // Arrange
        let message = "ERROR: line 1: unknown instruction";
        let mut studio = studio_with(message);
        let mut editor = FakeEditor::new("", studio.scheduler());
        studio.documents_mut().open("main.asm", "MUV R0,R1");

        // Act
        studio.assemble();
        let events = wait_until(&mut studio, &mut editor, vec![], |e| {
            matches!(e, StudioEvent::AssemblyFailed(_))
        });

        // Assert
        assert!(events.contains(&StudioEvent::AssemblyFailed(message.to_string())));
        assert!(studio.last_report().is_none());
    }

    #[test]
    fn test_empty_source_is_reported_as_status() {
        // Arrange
        let mut studio = studio_with(":00000001FF\n");
        let mut editor = FakeEditor::new("", studio.scheduler());

        // Act
        studio.assemble();
        let events = wait_until(&mut studio, &mut editor, vec![], |e| {
            matches!(e, StudioEvent::Status { is_error: true, .. })
        });

        // Assert
        assert!(events.contains(&StudioEvent::Status {
            message: StudioError::EmptySource.to_string(),
            is_error: true
        }));
    }

    #[test]
    fn test_export_requires_successful_assembly() {
        // Arrange
        let mut studio = studio_with(":00000001FF\n");
        let mut editor = FakeEditor::new("", studio.scheduler());

        // Act
        studio.export();
        let events = studio.tick(Instant::now(), &mut editor);

        // Assert
        assert_eq!(
            events,
            vec![StudioEvent::Status {
                message: "Nothing to export, assemble successfully first".to_string(),
                is_error: true
            }]
        );
        assert!(!studio.is_busy());
    }

    #[test]
    fn test_export_after_assembly() {
        // Arrange
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("asmstudio-studio-export-{nanos}"));
        let config = StudioConfig {
            export_dir: dir.clone(),
            ..StudioConfig::default()
        };
        let mut studio = Studio::new(
            ScriptedAssembler::answering(":0100000011EE\n:00000001FF\n", "LISTING"),
            config,
        )
        .unwrap();
        let mut editor = FakeEditor::new("", studio.scheduler());
        studio.documents_mut().open("blink.asm", "DB 0x11");

        // Act
        studio.assemble();
        wait_until(&mut studio, &mut editor, vec![], |e| matches!(e, StudioEvent::Assembled(_)));
        studio.export();
        let events = wait_until(&mut studio, &mut editor, vec![], |e| {
            matches!(e, StudioEvent::Exported(_))
        });

        // Assert
        let expected = ExportedFiles {
            hex: dir.join("blink.hex"),
            listing: dir.join("blink.lst"),
        };
        assert!(events.contains(&StudioEvent::Exported(expected.clone())));
        assert_eq!(
            std::fs::read_to_string(&expected.hex).unwrap(),
            ":0100000011EE\n:00000001FF\n"
        );
        assert_eq!(std::fs::read_to_string(&expected.listing).unwrap(), "LISTING");
        std::fs::remove_dir_all(dir).ok();
    }
}
