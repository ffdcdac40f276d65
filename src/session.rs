//! Live, position-aware copy of a flowchart that is edited by direct
//! manipulation and kept in step with the text.
//!
//! The session is in one of two states. `GraphDriven` is the resting state:
//! every edit that changes the text-visible graph produces freshly generated
//! text. `TextDriven` is entered while a re-parsed diagram is absorbed and
//! lasts for a bounded window; edits arriving inside it still apply to the
//! graph but emit no text, so a text-originated update cannot bounce back
//! into the editor as a new text change.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::config::{Config, GridLayout};
use crate::generator::generate;
use crate::graph_ast::*;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LiveNode {
    pub id: String,
    pub label: String,
    pub shape: ShapeKind,
    pub position: Point,
}

impl LiveNode {
    /// The label as written to text: an empty label shows the id.
    pub fn display_label(&self) -> &str {
        if self.label.is_empty() { &self.id } else { &self.label }
    }
}

/// An edge as the session sees it: at most one per ordered pair, identified
/// by its `source-target` key.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveEdge {
    pub key: String,
    pub source: String,
    pub target: String,
    pub label: String,
    pub style: EdgeStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    GraphDriven,
    TextDriven { until: Instant },
}

#[derive(Debug, Clone, PartialEq)]
pub enum GraphEdit {
    AddNode {
        id: String,
        label: String,
        shape: ShapeKind,
        position: Option<Point>,
    },
    MoveNode {
        id: String,
        position: Point,
    },
    Connect {
        source: String,
        target: String,
        label: Option<String>,
        style: EdgeStyle,
    },
    RelabelNode {
        id: String,
        label: String,
    },
    RelabelEdge {
        key: String,
        label: String,
    },
    DeleteNode {
        id: String,
    },
    DeleteEdge {
        key: String,
    },
}

impl GraphEdit {
    fn with_safe_ids(self) -> Self {
        match self {
            GraphEdit::AddNode {
                id,
                label,
                shape,
                position,
            } => GraphEdit::AddNode {
                id: sanitize_id(&id),
                label,
                shape,
                position,
            },
            GraphEdit::MoveNode { id, position } => GraphEdit::MoveNode {
                id: sanitize_id(&id),
                position,
            },
            GraphEdit::Connect {
                source,
                target,
                label,
                style,
            } => GraphEdit::Connect {
                source: sanitize_id(&source),
                target: sanitize_id(&target),
                label,
                style,
            },
            GraphEdit::RelabelNode { id, label } => GraphEdit::RelabelNode {
                id: sanitize_id(&id),
                label,
            },
            GraphEdit::DeleteNode { id } => GraphEdit::DeleteNode {
                id: sanitize_id(&id),
            },
            edge_edit @ (GraphEdit::RelabelEdge { .. } | GraphEdit::DeleteEdge { .. }) => edge_edit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    #[error("cannot connect `{source_id}` to `{target_id}`: node `{missing}` does not exist")]
    UnresolvedEndpoint {
        source_id: String,
        target_id: String,
        missing: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextUpdate {
    /// Same nodes, labels, shapes and edges as the live graph; nothing touched.
    Unchanged,
    Applied,
    /// The text is not a flowchart/graph; the live graph is left alone.
    NotEditable,
}

#[derive(Debug, Clone)]
pub struct GraphEditSession {
    layout: GridLayout,
    suppress_window: Duration,
    kind: DiagramKind,
    direction: Direction,
    nodes: Vec<LiveNode>,
    edges: Vec<LiveEdge>,
    selection: BTreeSet<String>,
    state: SyncState,
}

impl GraphEditSession {
    pub fn new(config: &Config, diagram: &Diagram) -> Self {
        let layout = config.layout;
        let nodes = diagram
            .nodes
            .iter()
            .enumerate()
            .map(|(index, node)| live_node(node, placed(&layout, index)))
            .collect();
        Self {
            layout,
            suppress_window: config.suppress_window(),
            kind: diagram.kind,
            direction: diagram.direction,
            nodes,
            edges: live_edges(&diagram.edges),
            selection: BTreeSet::new(),
            state: SyncState::GraphDriven,
        }
    }

    pub fn kind(&self) -> DiagramKind {
        self.kind
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn nodes(&self) -> &[LiveNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[LiveEdge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&LiveNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edge(&self, key: &str) -> Option<&LiveEdge> {
        self.edges.iter().find(|e| e.key == key)
    }

    pub fn selection(&self) -> &BTreeSet<String> {
        &self.selection
    }

    /// Replace the selection; ids that are not live nodes are dropped.
    pub fn select<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selection = ids
            .into_iter()
            .map(Into::into)
            .filter(|id| self.nodes.iter().any(|n| &n.id == id))
            .collect();
    }

    /// The state in effect at `now`. An elapsed suppression window reads as
    /// `GraphDriven` even before the session is touched again.
    pub fn state(&self, now: Instant) -> SyncState {
        match self.state {
            SyncState::TextDriven { until } if now < until => self.state,
            _ => SyncState::GraphDriven,
        }
    }

    /// Absorb a freshly parsed diagram.
    ///
    /// Nodes whose id survives keep their position; new ids are placed on the
    /// grid at their index in the parsed order; vanished ids are dropped
    /// along with their selection. When nothing text-visible differs from the
    /// live graph the update is skipped entirely.
    pub fn apply_text(&mut self, now: Instant, diagram: &Diagram) -> TextUpdate {
        if !diagram.is_editable() {
            return TextUpdate::NotEditable;
        }
        self.kind = diagram.kind;
        self.direction = diagram.direction;

        let edges = live_edges(&diagram.edges);
        if !self.differs_from(&diagram.nodes, &edges) {
            tracing::debug!("text update matches live graph, skipping");
            return TextUpdate::Unchanged;
        }

        self.state = SyncState::TextDriven {
            until: now + self.suppress_window,
        };

        let nodes: Vec<LiveNode> = {
            let previous: HashMap<&str, Point> = self
                .nodes
                .iter()
                .map(|n| (n.id.as_str(), n.position))
                .collect();
            diagram
                .nodes
                .iter()
                .enumerate()
                .map(|(index, node)| {
                    let position = previous
                        .get(node.id.as_str())
                        .copied()
                        .unwrap_or_else(|| placed(&self.layout, index));
                    live_node(node, position)
                })
                .collect()
        };

        self.nodes = nodes;
        self.edges = edges;
        let nodes = &self.nodes;
        self.selection.retain(|id| nodes.iter().any(|n| &n.id == id));
        tracing::debug!(
            nodes = self.nodes.len(),
            edges = self.edges.len(),
            "applied text update"
        );
        TextUpdate::Applied
    }

    /// Apply a direct-manipulation edit.
    ///
    /// Node ids are passed through [`sanitize_id`] first, so `"my node"`
    /// names the node `my_node`. Returns the regenerated text when the edit
    /// changed something the text shows and the session is `GraphDriven`;
    /// moves never produce text.
    pub fn apply_edit(&mut self, now: Instant, edit: GraphEdit) -> Result<Option<String>, EditError> {
        self.state = self.state(now);
        let changed = match edit.with_safe_ids() {
            GraphEdit::AddNode {
                id,
                label,
                shape,
                position,
            } => {
                self.add_node(id, label, shape, position);
                true
            }
            GraphEdit::MoveNode { id, position } => {
                if let Some(node) = self.nodes.iter_mut().find(|n| n.id == id) {
                    node.position = position;
                }
                false
            }
            GraphEdit::Connect {
                source,
                target,
                label,
                style,
            } => {
                self.connect(source, target, label.unwrap_or_default(), style)?;
                true
            }
            GraphEdit::RelabelNode { id, label } => {
                match self.nodes.iter_mut().find(|n| n.id == id) {
                    Some(node) => {
                        node.label = label;
                        true
                    }
                    None => false,
                }
            }
            GraphEdit::RelabelEdge { key, label } => {
                match self.edges.iter_mut().find(|e| e.key == key) {
                    Some(edge) => {
                        edge.label = label;
                        true
                    }
                    None => false,
                }
            }
            GraphEdit::DeleteNode { id } => {
                let before = self.nodes.len();
                self.nodes.retain(|n| n.id != id);
                self.edges.retain(|e| e.source != id && e.target != id);
                self.selection.remove(&id);
                before != self.nodes.len()
            }
            GraphEdit::DeleteEdge { key } => {
                let before = self.edges.len();
                self.edges.retain(|e| e.key != key);
                before != self.edges.len()
            }
        };

        if !changed {
            return Ok(None);
        }
        Ok(self.graph_changed(now))
    }

    /// The live graph as a plain diagram, positions dropped.
    pub fn snapshot(&self) -> Diagram {
        Diagram {
            kind: self.kind,
            direction: self.direction,
            nodes: self
                .nodes
                .iter()
                .map(|n| Node {
                    id: n.id.clone(),
                    label: n.label.clone(),
                    shape: n.shape,
                })
                .collect(),
            edges: self
                .edges
                .iter()
                .map(|e| Edge {
                    source: e.source.clone(),
                    target: e.target.clone(),
                    label: (!e.label.is_empty()).then(|| e.label.clone()),
                    style: e.style,
                })
                .collect(),
            subgraphs: Vec::new(),
        }
    }

    pub fn to_code(&self) -> String {
        let diagram = self.snapshot();
        generate(&diagram.nodes, &diagram.edges, self.direction, self.kind)
    }

    fn graph_changed(&mut self, now: Instant) -> Option<String> {
        match self.state(now) {
            SyncState::TextDriven { .. } => {
                tracing::debug!("graph edit inside text-driven window, not emitting text");
                None
            }
            SyncState::GraphDriven => Some(self.to_code()),
        }
    }

    fn add_node(&mut self, id: String, label: String, shape: ShapeKind, position: Option<Point>) {
        if let Some(node) = self.nodes.iter_mut().find(|n| n.id == id) {
            node.label = label;
            node.shape = shape;
            if let Some(position) = position {
                node.position = position;
            }
            return;
        }
        let position = position.unwrap_or_else(|| placed(&self.layout, self.nodes.len()));
        self.nodes.push(LiveNode {
            id,
            label,
            shape,
            position,
        });
    }

    fn connect(
        &mut self,
        source: String,
        target: String,
        label: String,
        style: EdgeStyle,
    ) -> Result<(), EditError> {
        let missing = [&source, &target]
            .into_iter()
            .find(|id| self.node(id).is_none())
            .cloned();
        if let Some(missing) = missing {
            return Err(EditError::UnresolvedEndpoint {
                source_id: source,
                target_id: target,
                missing,
            });
        }

        let key = edge_key(&source, &target);
        match self.edges.iter_mut().find(|e| e.key == key) {
            Some(edge) => {
                edge.label = label;
                edge.style = style;
            }
            None => self.edges.push(LiveEdge {
                key,
                source,
                target,
                label,
                style,
            }),
        }
        Ok(())
    }

    fn differs_from(&self, nodes: &[Node], edges: &[LiveEdge]) -> bool {
        if self.nodes.len() != nodes.len() || self.edges.len() != edges.len() {
            return true;
        }

        let live_nodes: HashMap<&str, &LiveNode> =
            self.nodes.iter().map(|n| (n.id.as_str(), n)).collect();
        let nodes_changed = nodes.iter().any(|node| match live_nodes.get(node.id.as_str()) {
            Some(live) => live.display_label() != node.label || live.shape != node.shape,
            None => true,
        });

        let live_edges: HashMap<&str, &LiveEdge> =
            self.edges.iter().map(|e| (e.key.as_str(), e)).collect();
        let edges_changed = edges.iter().any(|edge| match live_edges.get(edge.key.as_str()) {
            Some(live) => live.label != edge.label || live.style != edge.style,
            None => true,
        });

        nodes_changed || edges_changed
    }
}

fn placed(layout: &GridLayout, index: usize) -> Point {
    let (x, y) = layout.place(index);
    Point { x, y }
}

fn live_node(node: &Node, position: Point) -> LiveNode {
    LiveNode {
        id: node.id.clone(),
        label: node.label.clone(),
        shape: node.shape,
        position,
    }
}

/// Collapse parsed edges to one per ordered pair; the first declaration wins.
fn live_edges(edges: &[Edge]) -> Vec<LiveEdge> {
    let mut seen: HashSet<String> = HashSet::new();
    edges
        .iter()
        .filter_map(|edge| {
            let key = edge.key();
            if !seen.insert(key.clone()) {
                tracing::debug!(key, "dropping parallel edge, one edge per pair in the session");
                return None;
            }
            Some(LiveEdge {
                key,
                source: edge.source.clone(),
                target: edge.target.clone(),
                label: edge.label.clone().unwrap_or_default(),
                style: edge.style,
            })
        })
        .collect()
}
