pub mod code_block;
pub mod config;
pub mod display_width;
pub mod files;
pub mod generator;
pub mod graph_ast;
pub mod graph_parser;
pub mod label;
pub mod preview;
pub mod session;
pub mod settle;
pub mod shape;
pub mod workbench;

pub use code_block::extract;
pub use config::{Config, ConfigError, ThemeOptions};
pub use files::{DraftError, DraftStore, ExportError, FileDraftStore, ImportError, MemoryDraftStore};
pub use generator::generate;
pub use graph_ast::{
    Diagram, DiagramKind, Direction, Edge, EdgeStyle, Node, ShapeKind, Subgraph, sanitize_id,
};
pub use graph_parser::{is_editable, parse};
pub use preview::{Preview, RenderError, RenderRequest, Renderer};
pub use session::{EditError, GraphEdit, GraphEditSession, Point, SyncState, TextUpdate};
pub use workbench::Workbench;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Draft(#[from] DraftError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Edit(#[from] EditError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("failed to read stdin: {0}")]
    Stdin(#[source] std::io::Error),
}

/// Strip a markdown fence, parse, and regenerate canonical text.
/// `None` when the input is not a flowchart.
pub fn canonicalize(input: &str) -> Option<String> {
    let diagram = parse(&extract(input));
    diagram.is_editable().then(|| diagram.to_code())
}
