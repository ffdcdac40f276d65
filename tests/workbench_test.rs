use std::time::{Duration, Instant};

use mermalaid::files::DRAFT_KEY;
use mermalaid::{
    Config, DraftStore, FileDraftStore, GraphEdit, ImportError, Preview, RenderError, Renderer,
    ThemeOptions, Workbench,
};
use pretty_assertions::assert_eq;

const SETTLE: Duration = Duration::from_millis(500);

/// Accepts text with a solid arrow and draws its line count.
struct FakeRenderer;

impl Renderer for FakeRenderer {
    fn render(&self, text: &str, theme: &ThemeOptions) -> Result<String, RenderError> {
        Ok(format!("<svg class=\"{}\">{}</svg>", theme.id, text.lines().count()))
    }

    fn validate(&self, text: &str) -> Result<(), RenderError> {
        if text.contains("-->") || text.starts_with("sequenceDiagram") {
            Ok(())
        } else {
            Err(RenderError::new("Syntax error in text"))
        }
    }
}

#[test]
fn draft_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let t0 = Instant::now();

    let mut wb = Workbench::new(Config::default(), FileDraftStore::new(dir.path()));
    wb.on_text_edit(t0, "graph LR\n    Saved --> Draft");
    assert!(!dir.path().join(DRAFT_KEY).exists());
    wb.tick(t0 + SETTLE);
    assert!(dir.path().join(DRAFT_KEY).exists());

    let reopened = Workbench::new(Config::default(), FileDraftStore::new(dir.path()));
    assert_eq!(reopened.text(), "graph LR\n    Saved --> Draft");
    assert_eq!(reopened.session().unwrap().nodes().len(), 2);
}

#[test]
fn edit_render_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let t0 = Instant::now();
    let mut wb = Workbench::new(Config::default(), FileDraftStore::new(dir.path()));

    let initial = wb.render_now().unwrap();
    assert!(wb.complete_render(initial.generation, initial.run(&FakeRenderer)));
    assert_eq!(wb.preview(), &Preview::Svg("<svg class=\"github-light\">6</svg>".into()));

    wb.on_text_edit(t0, "graph TD\n    A -> B");
    let broken = wb.tick(t0 + SETTLE).unwrap();
    wb.complete_render(broken.generation, broken.run(&FakeRenderer));
    assert_eq!(wb.error(), Some("Syntax error in text"));
    assert_eq!(wb.preview(), &Preview::Error("Syntax error in text".into()));

    wb.on_text_edit(t0 + SETTLE, "graph TD\n    A --> B");
    let fixed = wb.tick(t0 + SETTLE * 2).unwrap();
    wb.complete_render(fixed.generation, fixed.run(&FakeRenderer));
    assert_eq!(wb.error(), None);
    assert_eq!(wb.preview(), &Preview::Svg("<svg class=\"github-light\">2</svg>".into()));
}

#[test]
fn slow_render_does_not_overwrite_newer_text() {
    let dir = tempfile::tempdir().unwrap();
    let t0 = Instant::now();
    let mut wb = Workbench::new(Config::default(), FileDraftStore::new(dir.path()));

    wb.on_text_edit(t0, "graph TD\n    Old --> Text");
    let slow = wb.tick(t0 + SETTLE).unwrap();
    wb.on_text_edit(t0 + SETTLE, "graph TD\n    New --> Text");
    let fast = wb.tick(t0 + SETTLE * 2).unwrap();

    assert!(wb.complete_render(fast.generation, fast.run(&FakeRenderer)));
    assert!(!wb.complete_render(slow.generation, slow.run(&FakeRenderer)));
    assert_eq!(wb.preview(), &Preview::Svg("<svg class=\"github-light\">2</svg>".into()));
}

#[test]
fn graph_edit_flows_to_draft_and_render() {
    let dir = tempfile::tempdir().unwrap();
    let t0 = Instant::now();
    let mut store = FileDraftStore::new(dir.path());
    store.save("graph LR\n    A --> B").unwrap();
    let mut wb = Workbench::new(Config::default(), store);

    let rewritten = wb
        .on_graph_edit(
            t0,
            GraphEdit::RelabelEdge {
                key: "A-B".into(),
                label: "go".into(),
            },
        )
        .unwrap();
    assert!(rewritten);
    assert_eq!(wb.text(), "graph LR\n\n    A[A]\n    B[B]\n\n    A -->|go| B");

    let request = wb.tick(t0 + SETTLE).unwrap();
    assert_eq!(request.text, wb.text());
    assert_eq!(wb.store().load().unwrap().as_deref(), Some(wb.text()));
}

#[test]
fn import_and_export() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("flow.markdown");
    std::fs::write(&source, "```mermaid\nflowchart LR\n    In --> Out\n```\n").unwrap();

    let t0 = Instant::now();
    let mut wb = Workbench::new(Config::default(), FileDraftStore::new(dir.path()));
    let request = wb.import(t0, &source).unwrap().unwrap();
    assert_eq!(request.text, "flowchart LR\n    In --> Out");
    assert_eq!(wb.session().unwrap().nodes().len(), 2);

    let written = wb.export(&dir.path().join("copy")).unwrap();
    assert_eq!(written.file_name().unwrap(), "copy.mmd");
    assert_eq!(std::fs::read_to_string(written).unwrap(), "flowchart LR\n    In --> Out");

    let err = wb.import(t0, &dir.path().join("picture.png")).unwrap_err();
    assert!(matches!(err, ImportError::UnsupportedExtension { .. }));
    assert_eq!(wb.text(), "flowchart LR\n    In --> Out");
}

#[test]
fn config_timings_apply() {
    let config = Config::from_toml_str("settle_delay_ms = 50\ndraft_debounce_ms = 1000").unwrap();
    let dir = tempfile::tempdir().unwrap();
    let t0 = Instant::now();
    let mut wb = Workbench::new(config, FileDraftStore::new(dir.path()));
    wb.on_text_edit(t0, "graph TD\n    A --> B");
    assert_eq!(wb.next_deadline(), Some(t0 + Duration::from_millis(50)));
    assert!(wb.tick(t0 + Duration::from_millis(50)).is_some());
    assert_eq!(wb.next_deadline(), Some(t0 + Duration::from_millis(1000)));
}
