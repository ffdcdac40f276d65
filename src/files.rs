use std::io;
use std::path::{Path, PathBuf};

use crate::code_block::extract;

/// Extensions accepted on import, compared case-insensitively.
pub const IMPORT_EXTENSIONS: [&str; 4] = ["mmd", "txt", "md", "markdown"];

pub const EXPORT_EXTENSION: &str = "mmd";

/// Fixed key the draft is stored under.
pub const DRAFT_KEY: &str = "mermalaid-draft";

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("invalid file type `{path}`: expected one of .mmd, .txt, .md, .markdown")]
    UnsupportedExtension { path: String },
    #[error("failed to read `{path}`: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("`{path}` contains no diagram")]
    Empty { path: String },
}

#[derive(Debug, thiserror::Error)]
#[error("failed to write `{path}`: {source}")]
pub struct ExportError {
    pub path: String,
    #[source]
    pub source: io::Error,
}

#[derive(Debug, thiserror::Error)]
pub enum DraftError {
    #[error("failed to read draft: {0}")]
    Read(#[source] io::Error),
    #[error("failed to write draft: {0}")]
    Write(#[source] io::Error),
}

pub fn is_importable(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            IMPORT_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
}

/// Read a diagram file, unwrapping a markdown ```` ```mermaid ```` fence.
pub fn import_file(path: &Path) -> Result<String, ImportError> {
    let shown = path.display().to_string();
    if !is_importable(path) {
        return Err(ImportError::UnsupportedExtension { path: shown });
    }
    let content = std::fs::read_to_string(path).map_err(|source| ImportError::Read {
        path: shown.clone(),
        source,
    })?;
    let code = extract(&content);
    if code.is_empty() {
        return Err(ImportError::Empty { path: shown });
    }
    tracing::info!(path = %shown, bytes = code.len(), "imported diagram");
    Ok(code)
}

/// `path` with the export extension, appended when missing.
pub fn export_path(path: &Path) -> PathBuf {
    let has_extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(EXPORT_EXTENSION));
    if has_extension {
        path.to_path_buf()
    } else {
        let mut name = path.as_os_str().to_os_string();
        name.push(".");
        name.push(EXPORT_EXTENSION);
        PathBuf::from(name)
    }
}

/// Write raw diagram text; returns the path actually written.
pub fn export_file(path: &Path, text: &str) -> Result<PathBuf, ExportError> {
    let target = export_path(path);
    std::fs::write(&target, text).map_err(|source| ExportError {
        path: target.display().to_string(),
        source,
    })?;
    tracing::info!(path = %target.display(), "exported diagram");
    Ok(target)
}

/// Where the current text survives between sessions.
pub trait DraftStore {
    fn load(&self) -> Result<Option<String>, DraftError>;
    fn save(&mut self, text: &str) -> Result<(), DraftError>;
}

/// Draft kept as a file named [`DRAFT_KEY`] inside a directory.
#[derive(Debug, Clone)]
pub struct FileDraftStore {
    dir: PathBuf,
}

impl FileDraftStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(DRAFT_KEY)
    }
}

impl DraftStore for FileDraftStore {
    fn load(&self) -> Result<Option<String>, DraftError> {
        match std::fs::read_to_string(self.path()) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(DraftError::Read(err)),
        }
    }

    fn save(&mut self, text: &str) -> Result<(), DraftError> {
        std::fs::create_dir_all(&self.dir).map_err(DraftError::Write)?;
        std::fs::write(self.path(), text).map_err(DraftError::Write)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryDraftStore {
    text: Option<String>,
    writes: usize,
}

impl MemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            writes: 0,
        }
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl DraftStore for MemoryDraftStore {
    fn load(&self) -> Result<Option<String>, DraftError> {
        Ok(self.text.clone())
    }

    fn save(&mut self, text: &str) -> Result<(), DraftError> {
        self.text = Some(text.to_string());
        self.writes += 1;
        Ok(())
    }
}
