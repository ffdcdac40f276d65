use serde::{Deserialize, Serialize};

pub use crate::shape::{EdgeStyle, ShapeKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    #[serde(rename = "TD")]
    TopDown,
    #[serde(rename = "BT")]
    BottomTop,
    #[serde(rename = "LR")]
    LeftRight,
    #[serde(rename = "RL")]
    RightLeft,
}

impl Direction {
    /// Read a direction token, case-insensitively, folding `TB` into `TD`
    /// and `DT` into `BT`.
    pub fn from_token(token: &str) -> Option<Direction> {
        match token.to_ascii_uppercase().as_str() {
            "TD" | "TB" => Some(Direction::TopDown),
            "BT" | "DT" => Some(Direction::BottomTop),
            "LR" => Some(Direction::LeftRight),
            "RL" => Some(Direction::RightLeft),
            _ => None,
        }
    }

    pub fn as_token(self) -> &'static str {
        match self {
            Direction::TopDown => "TD",
            Direction::BottomTop => "BT",
            Direction::LeftRight => "LR",
            Direction::RightLeft => "RL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagramKind {
    #[default]
    Flowchart,
    Graph,
    /// Any text that is not a flowchart/graph declaration. Not an error:
    /// the text is rendered as-is but cannot be edited as a graph.
    Unsupported,
}

impl DiagramKind {
    /// Keyword written on the declaration line. `Unsupported` has none and
    /// is written as a flowchart.
    pub fn keyword(self) -> &'static str {
        match self {
            DiagramKind::Graph => "graph",
            DiagramKind::Flowchart | DiagramKind::Unsupported => "flowchart",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagram {
    pub kind: DiagramKind,
    pub direction: Direction,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subgraphs: Vec<Subgraph>,
}

impl Diagram {
    pub fn unsupported() -> Self {
        Diagram {
            kind: DiagramKind::Unsupported,
            direction: Direction::TopDown,
            nodes: Vec::new(),
            edges: Vec::new(),
            subgraphs: Vec::new(),
        }
    }

    pub fn is_editable(&self) -> bool {
        self.kind != DiagramKind::Unsupported
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subgraph {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub node_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub label: String,
    pub shape: ShapeKind,
}

impl Node {
    /// A node that was referenced but never given brackets.
    pub fn implicit(id: &str) -> Self {
        Node {
            id: id.to_string(),
            label: id.to_string(),
            shape: ShapeKind::Rect,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub style: EdgeStyle,
}

impl Edge {
    /// Composite `source-target` key. Two edges between the same ordered pair
    /// share a key.
    pub fn key(&self) -> String {
        edge_key(&self.source, &self.target)
    }
}

pub fn edge_key(source: &str, target: &str) -> String {
    format!("{source}-{target}")
}

/// Rewrite an id into identifier form: letters, digits and `_`, with every
/// other character replaced by `_`. Such ids never contain the `-` of an edge
/// key.
pub fn sanitize_id(id: &str) -> String {
    if id.is_empty() {
        return "_".to_string();
    }
    id.chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}
