//! Single-view coordinator: one text buffer, the diagram parsed from it, the
//! visual editing session when the diagram is editable, the preview pane and
//! the persisted draft.
//!
//! Nothing here owns a clock or a thread. The host feeds in user events and
//! calls [`Workbench::tick`] when [`Workbench::next_deadline`] passes; render
//! requests come back out and their results are handed in again through
//! [`Workbench::complete_render`].

use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::code_block::extract;
use crate::config::Config;
use crate::files::{self, DraftStore, ExportError, ImportError};
use crate::graph_ast::Diagram;
use crate::graph_parser::parse;
use crate::preview::{Preview, RenderError, RenderRequest};
use crate::session::{EditError, GraphEdit, GraphEditSession, TextUpdate};
use crate::settle::{Debouncer, RenderGenerations};

pub struct Workbench<S: DraftStore> {
    config: Config,
    store: S,
    text: String,
    diagram: Diagram,
    session: Option<GraphEditSession>,
    reparse: Debouncer<String>,
    render: Debouncer<String>,
    draft: Debouncer<String>,
    generations: RenderGenerations,
    preview: Preview,
    error: Option<String>,
}

impl<S: DraftStore> Workbench<S> {
    /// Open the workbench on the saved draft, or on the configured initial
    /// diagram when there is none. Call [`Workbench::render_now`] for the
    /// first preview.
    pub fn new(config: Config, store: S) -> Self {
        let text = match store.load() {
            Ok(Some(draft)) => {
                tracing::info!(bytes = draft.len(), "restored draft");
                draft
            }
            Ok(None) => config.initial_diagram.clone(),
            Err(err) => {
                tracing::warn!(%err, "ignoring unreadable draft");
                config.initial_diagram.clone()
            }
        };
        let diagram = parse(&text);
        let session = diagram
            .is_editable()
            .then(|| GraphEditSession::new(&config, &diagram));
        Self {
            reparse: Debouncer::new(config.settle_delay()),
            render: Debouncer::new(config.settle_delay()),
            draft: Debouncer::new(config.draft_debounce()),
            config,
            store,
            text,
            diagram,
            session,
            generations: RenderGenerations::new(),
            preview: Preview::Loading,
            error: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Current contents of the text buffer.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The diagram as of the last re-parse.
    pub fn diagram(&self) -> &Diagram {
        &self.diagram
    }

    /// `None` in render-only mode.
    pub fn session(&self) -> Option<&GraphEditSession> {
        self.session.as_ref()
    }

    pub fn is_editable(&self) -> bool {
        self.session.is_some()
    }

    pub fn preview(&self) -> &Preview {
        &self.preview
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Earliest instant at which [`Workbench::tick`] has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        [&self.reparse, &self.render, &self.draft]
            .into_iter()
            .filter_map(|d| d.deadline())
            .min()
    }

    /// A keystroke in the text editor.
    pub fn on_text_edit(&mut self, now: Instant, text: impl Into<String>) {
        let text = text.into();
        if text == self.text {
            return;
        }
        self.text = text;
        self.schedule_all(now);
    }

    /// Pasted content replaces the buffer after fence stripping.
    pub fn on_paste(&mut self, now: Instant, text: &str) -> Option<RenderRequest> {
        self.load_text(now, extract(text))
    }

    /// A direct manipulation in the visual editor. Returns whether the text
    /// buffer was rewritten.
    pub fn on_graph_edit(&mut self, now: Instant, edit: GraphEdit) -> Result<bool, EditError> {
        let Some(session) = self.session.as_mut() else {
            tracing::debug!("graph edit in render-only mode ignored");
            return Ok(false);
        };
        let Some(code) = session.apply_edit(now, edit)? else {
            return Ok(false);
        };
        // Programmatic update: goes straight into the buffer, not through
        // on_text_edit.
        self.text = code;
        self.schedule_all(now);
        Ok(true)
    }

    /// Replace the selection in the visual editor.
    pub fn select<I, T>(&mut self, ids: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        if let Some(session) = self.session.as_mut() {
            session.select(ids);
        }
    }

    /// Fire every timer that is due. A render that comes due is returned for
    /// the host to run.
    pub fn tick(&mut self, now: Instant) -> Option<RenderRequest> {
        if let Some(text) = self.draft.poll(now) {
            self.save_draft(&text);
        }
        if let Some(text) = self.reparse.poll(now) {
            self.reparse_text(now, &text);
        }
        let text = self.render.poll(now)?;
        self.request_render(text)
    }

    /// Render the current text immediately, superseding any pending render.
    pub fn render_now(&mut self) -> Option<RenderRequest> {
        self.render.cancel();
        let text = self.text.clone();
        self.request_render(text)
    }

    /// Hand back the outcome of a [`RenderRequest`]. Results for a superseded
    /// generation are dropped; returns whether the preview changed.
    pub fn complete_render(&mut self, generation: u64, result: Result<String, RenderError>) -> bool {
        if !self.generations.is_current(generation) {
            tracing::trace!(
                generation,
                latest = self.generations.latest(),
                "discarding stale render"
            );
            return false;
        }
        match result {
            Ok(svg) => {
                self.preview = Preview::Svg(svg);
                self.error = None;
            }
            Err(err) => {
                tracing::warn!(generation, %err, "render failed");
                self.preview = Preview::Error(err.message.clone());
                self.error = Some(err.message);
            }
        }
        true
    }

    /// Switch themes; the preview is redrawn.
    pub fn set_theme(&mut self, theme: impl Into<String>) -> Option<RenderRequest> {
        self.config.theme = theme.into();
        self.render_now()
    }

    /// Start over from the configured new-diagram template.
    pub fn new_diagram(&mut self, now: Instant) -> Option<RenderRequest> {
        let template = self.config.new_diagram.clone();
        self.load_text(now, template)
    }

    pub fn import(&mut self, now: Instant, path: &Path) -> Result<Option<RenderRequest>, ImportError> {
        let text = files::import_file(path)?;
        Ok(self.load_text(now, text))
    }

    pub fn export(&self, path: &Path) -> Result<PathBuf, ExportError> {
        files::export_file(path, &self.text)
    }

    /// Replace the whole buffer: parse and render right away, keep the draft
    /// write on its debounce.
    fn load_text(&mut self, now: Instant, text: String) -> Option<RenderRequest> {
        self.reparse.cancel();
        self.reparse_text(now, &text);
        self.draft.schedule(now, text.clone());
        self.text = text;
        self.render_now()
    }

    fn schedule_all(&mut self, now: Instant) {
        self.reparse.schedule(now, self.text.clone());
        self.render.schedule(now, self.text.clone());
        self.draft.schedule(now, self.text.clone());
    }

    fn save_draft(&mut self, text: &str) {
        match self.store.save(text) {
            Ok(()) => tracing::debug!(bytes = text.len(), "saved draft"),
            Err(err) => tracing::warn!(%err, "failed to save draft"),
        }
    }

    fn reparse_text(&mut self, now: Instant, text: &str) {
        let diagram = parse(text);
        if diagram.is_editable() {
            match self.session.as_mut() {
                Some(session) => {
                    if session.apply_text(now, &diagram) == TextUpdate::Applied {
                        tracing::debug!("visual editor updated from text");
                    }
                }
                None => {
                    tracing::info!("text is a flowchart, visual editing enabled");
                    self.session = Some(GraphEditSession::new(&self.config, &diagram));
                }
            }
        } else if self.session.take().is_some() {
            tracing::info!("text is not a flowchart, switching to render-only mode");
        }
        self.diagram = diagram;
    }

    fn request_render(&mut self, text: String) -> Option<RenderRequest> {
        let generation = self.generations.advance();
        if text.trim().is_empty() {
            self.preview = Preview::Empty;
            self.error = None;
            return None;
        }
        Some(RenderRequest {
            generation,
            text,
            theme: self.config.theme_options(),
        })
    }
}
