use crate::graph_ast::*;
use crate::label::protect;

const INDENT: &str = "    ";

/// Write nodes and edges as canonical flowchart text.
///
/// Layout: declaration line, blank line, one line per node, blank line, one
/// line per edge. An empty node label is written as the node id and an empty
/// edge label is omitted.
pub fn generate(nodes: &[Node], edges: &[Edge], direction: Direction, kind: DiagramKind) -> String {
    let mut lines: Vec<String> = Vec::with_capacity(nodes.len() + edges.len() + 3);
    lines.push(format!("{} {}", kind.keyword(), direction.as_token()));
    lines.push(String::new());

    for node in nodes {
        lines.push(node_line(node));
    }

    lines.push(String::new());

    for edge in edges {
        lines.push(edge_line(edge));
    }

    lines.join("\n")
}

impl Diagram {
    pub fn to_code(&self) -> String {
        generate(&self.nodes, &self.edges, self.direction, self.kind)
    }
}

fn node_line(node: &Node) -> String {
    let (open, close) = node.shape.delimiters();
    let label = if node.label.is_empty() {
        node.id.as_str()
    } else {
        node.label.as_str()
    };
    format!("{INDENT}{}{open}{}{close}", node.id, protect(label))
}

fn edge_line(edge: &Edge) -> String {
    let arrow = edge.style.arrow_token();
    match edge.label.as_deref().filter(|l| !l.is_empty()) {
        Some(label) => format!(
            "{INDENT}{} {arrow}|{}| {}",
            edge.source,
            protect(label),
            edge.target
        ),
        None => format!("{INDENT}{} {arrow} {}", edge.source, edge.target),
    }
}
