use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_THEME: &str = "github-light";

const INITIAL_DIAGRAM: &str = "graph TD\n    A[Start] --> B{Decision}\n    B -->|Yes| C[Action 1]\n    B -->|No| D[Action 2]\n    C --> E[End]\n    D --> E";

const NEW_DIAGRAM: &str = "graph TD\n    A[Start] --> B[End]";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Everything the editor core is parameterized by. Passed explicitly to the
/// session and workbench constructors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub settle_delay_ms: u64,
    pub draft_debounce_ms: u64,
    pub suppress_window_ms: u64,
    pub layout: GridLayout,
    pub theme: String,
    pub new_diagram: String,
    pub initial_diagram: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            settle_delay_ms: 500,
            draft_debounce_ms: 500,
            suppress_window_ms: 100,
            layout: GridLayout::default(),
            theme: DEFAULT_THEME.to_string(),
            new_diagram: NEW_DIAGRAM.to_string(),
            initial_diagram: INITIAL_DIAGRAM.to_string(),
        }
    }
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn draft_debounce(&self) -> Duration {
        Duration::from_millis(self.draft_debounce_ms)
    }

    pub fn suppress_window(&self) -> Duration {
        Duration::from_millis(self.suppress_window_ms)
    }

    pub fn theme_options(&self) -> ThemeOptions {
        ThemeOptions::resolve(&self.theme)
    }
}

/// Grid placement for nodes that have no position yet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridLayout {
    pub columns: usize,
    pub spacing_x: f64,
    pub spacing_y: f64,
    pub origin_x: f64,
    pub origin_y: f64,
}

impl Default for GridLayout {
    fn default() -> Self {
        Self {
            columns: 3,
            spacing_x: 200.0,
            spacing_y: 150.0,
            origin_x: 50.0,
            origin_y: 50.0,
        }
    }
}

impl GridLayout {
    /// Position of the `index`-th node in row-major order.
    pub fn place(&self, index: usize) -> (f64, f64) {
        let columns = self.columns.max(1);
        let column = (index % columns) as f64;
        let row = (index / columns) as f64;
        (
            column * self.spacing_x + self.origin_x,
            row * self.spacing_y + self.origin_y,
        )
    }
}

/// Colors handed to the external renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeOptions {
    pub id: String,
    pub bg: String,
    pub fg: String,
    pub line: String,
    pub accent: String,
    pub muted: String,
    pub dark: bool,
}

const THEMES: &[(&str, &str, &str, &str, &str, &str, bool)] = &[
    ("github-light", "#ffffff", "#1f2328", "#d1d9e0", "#0969da", "#59636e", false),
    ("github-dark", "#0d1117", "#e6edf3", "#3d444d", "#4493f8", "#9198a1", true),
    ("zinc-dark", "#18181b", "#fafafa", "#3f3f46", "#a1a1aa", "#71717a", true),
    ("nord", "#2e3440", "#d8dee9", "#4c566a", "#88c0d0", "#616e88", true),
    ("solarized-light", "#fdf6e3", "#657b83", "#eee8d5", "#268bd2", "#93a1a1", false),
];

impl ThemeOptions {
    /// Look up a theme by id; unknown ids fall back to [`DEFAULT_THEME`].
    pub fn resolve(id: &str) -> Self {
        let entry = match THEMES.iter().find(|t| t.0 == id) {
            Some(entry) => entry,
            None => {
                let known = Self::ids().collect::<Vec<_>>().join(", ");
                tracing::warn!(theme = id, fallback = DEFAULT_THEME, known = %known, "unknown theme");
                THEMES
                    .iter()
                    .find(|t| t.0 == DEFAULT_THEME)
                    .unwrap_or(&THEMES[0])
            }
        };
        let (id, bg, fg, line, accent, muted, dark) = *entry;
        ThemeOptions {
            id: id.to_string(),
            bg: bg.to_string(),
            fg: fg.to_string(),
            line: line.to_string(),
            accent: accent.to_string(),
            muted: muted.to_string(),
            dark,
        }
    }

    pub fn ids() -> impl Iterator<Item = &'static str> {
        THEMES.iter().map(|t| t.0)
    }
}
