use std::collections::HashMap;

use winnow::ascii::{Caseless, space0, space1};
use winnow::combinator::{alt, delimited, eof, opt, preceded, repeat, terminated};
use winnow::error::ParserError;
use winnow::prelude::*;
use winnow::token::{literal, take_till, take_while};

use crate::graph_ast::*;
use crate::label::unescape;
use crate::shape::{DELIMITERS, Delimiter};

/// True when the first meaningful line declares a flowchart or graph with a
/// direction, e.g. `flowchart TD` or `GRAPH tb`.
pub fn is_editable(input: &str) -> bool {
    content_lines(input)
        .next()
        .is_some_and(|mut line| declaration(&mut line).is_ok())
}

/// Parse flowchart/graph text into a [`Diagram`].
///
/// Never fails: text that does not start with a flowchart/graph declaration
/// yields an `Unsupported` diagram, and lines that cannot be classified are
/// skipped.
pub fn parse(input: &str) -> Diagram {
    let mut lines = content_lines(input);
    let Some(mut first) = lines.next() else {
        return Diagram::unsupported();
    };
    let Ok((kind, direction)) = declaration(&mut first) else {
        return Diagram::unsupported();
    };

    let mut builder = DiagramBuilder::new(kind, direction);
    for line in lines {
        let mut rest = line;
        match statement(&mut rest) {
            Ok(statement) => builder.apply(statement),
            Err(_) => tracing::debug!(line, "skipping unrecognized flowchart line"),
        }
    }
    builder.finish()
}

/// Non-blank lines with `%%` comments removed and `%` lines dropped.
fn content_lines(input: &str) -> impl Iterator<Item = &str> {
    input
        .lines()
        .map(|line| match line.find("%%") {
            Some(at) => &line[..at],
            None => line,
        })
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('%'))
}

#[derive(Debug)]
struct NodeRef<'s> {
    id: &'s str,
    shape: Option<(ShapeKind, String)>,
}

#[derive(Debug)]
struct Link<'s> {
    style: EdgeStyle,
    label: Option<String>,
    target: NodeRef<'s>,
}

#[derive(Debug)]
enum Statement<'s> {
    SubgraphOpen { id: &'s str, label: Option<String> },
    SubgraphEnd,
    Edges(NodeRef<'s>, Vec<Link<'s>>),
    Node(NodeRef<'s>),
}

struct DiagramBuilder {
    kind: DiagramKind,
    direction: Direction,
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
    edges: Vec<Edge>,
    subgraphs: Vec<Subgraph>,
    open_subgraphs: Vec<usize>,
}

impl DiagramBuilder {
    fn new(kind: DiagramKind, direction: Direction) -> Self {
        DiagramBuilder {
            kind,
            direction,
            nodes: Vec::new(),
            index: HashMap::new(),
            edges: Vec::new(),
            subgraphs: Vec::new(),
            open_subgraphs: Vec::new(),
        }
    }

    fn apply(&mut self, statement: Statement<'_>) {
        match statement {
            Statement::SubgraphOpen { id, label } => {
                self.open_subgraphs.push(self.subgraphs.len());
                self.subgraphs.push(Subgraph {
                    id: id.to_string(),
                    label,
                    node_ids: Vec::new(),
                });
            }
            Statement::SubgraphEnd => {
                self.open_subgraphs.pop();
            }
            Statement::Edges(head, links) => {
                let mut source = head;
                for link in links {
                    self.define(&source);
                    self.define(&link.target);
                    self.edges.push(Edge {
                        source: source.id.to_string(),
                        target: link.target.id.to_string(),
                        label: link.label,
                        style: link.style,
                    });
                    source = NodeRef {
                        id: link.target.id,
                        shape: None,
                    };
                }
            }
            Statement::Node(node) => self.define(&node),
        }
    }

    /// Record a node reference. Brackets overwrite label and shape in place;
    /// a bare id only creates the node if it is new. An empty label reads as
    /// the id.
    fn define(&mut self, node: &NodeRef<'_>) {
        let shaped = node.shape.as_ref().map(|(shape, label)| {
            let label = if label.is_empty() {
                node.id.to_string()
            } else {
                label.clone()
            };
            (*shape, label)
        });
        match self.index.get(node.id) {
            Some(&at) => {
                if let Some((shape, label)) = shaped {
                    self.nodes[at].shape = shape;
                    self.nodes[at].label = label;
                }
            }
            None => {
                let decl = match shaped {
                    Some((shape, label)) => Node {
                        id: node.id.to_string(),
                        label,
                        shape,
                    },
                    None => Node::implicit(node.id),
                };
                self.index.insert(decl.id.clone(), self.nodes.len());
                self.nodes.push(decl);
            }
        }

        if let Some(&open) = self.open_subgraphs.last() {
            let members = &mut self.subgraphs[open].node_ids;
            if !members.iter().any(|id| id == node.id) {
                members.push(node.id.to_string());
            }
        }
    }

    fn finish(self) -> Diagram {
        Diagram {
            kind: self.kind,
            direction: self.direction,
            nodes: self.nodes,
            edges: self.edges,
            subgraphs: self.subgraphs,
        }
    }
}

fn declaration(input: &mut &str) -> winnow::Result<(DiagramKind, Direction)> {
    let kind = alt((
        Caseless("flowchart").value(DiagramKind::Flowchart),
        Caseless("graph").value(DiagramKind::Graph),
    ))
    .parse_next(input)?;
    space1.parse_next(input)?;
    let direction = direction.parse_next(input)?;
    Ok((kind, direction))
}

fn direction(input: &mut &str) -> winnow::Result<Direction> {
    take_while(2, |c: char| c.is_ascii_alphabetic())
        .verify_map(Direction::from_token)
        .parse_next(input)
}

fn statement<'s>(input: &mut &'s str) -> winnow::Result<Statement<'s>> {
    alt((
        subgraph_open,
        subgraph_end,
        edge_chain.map(|(head, links)| Statement::Edges(head, links)),
        node_definition.map(Statement::Node),
    ))
    .parse_next(input)
}

fn subgraph_open<'s>(input: &mut &'s str) -> winnow::Result<Statement<'s>> {
    Caseless("subgraph").parse_next(input)?;
    space1.parse_next(input)?;
    let id = identifier.parse_next(input)?;
    let label = opt(preceded(space0, subgraph_label)).parse_next(input)?;
    Ok(Statement::SubgraphOpen {
        id,
        label: label.map(unescape),
    })
}

fn subgraph_label<'s>(input: &mut &'s str) -> winnow::Result<&'s str> {
    alt((
        quoted,
        delimited('[', alt((quoted, take_till(1.., ']'))), ']'),
    ))
    .parse_next(input)
}

fn subgraph_end<'s>(input: &mut &'s str) -> winnow::Result<Statement<'s>> {
    ("end", eof).map(|_| Statement::SubgraphEnd).parse_next(input)
}

fn identifier<'s>(input: &mut &'s str) -> winnow::Result<&'s str> {
    take_while(1.., |c: char| c.is_alphanumeric() || c == '_').parse_next(input)
}

fn node_ref<'s>(input: &mut &'s str) -> winnow::Result<NodeRef<'s>> {
    let id = identifier.parse_next(input)?;
    let shape = opt(shape_label).parse_next(input)?;
    Ok(NodeRef { id, shape })
}

fn node_definition<'s>(input: &mut &'s str) -> winnow::Result<NodeRef<'s>> {
    let id = identifier.parse_next(input)?;
    let shape = shape_label.parse_next(input)?;
    Ok(NodeRef {
        id,
        shape: Some(shape),
    })
}

/// Try each delimiter pair in table order; the first full match wins.
fn shape_label(input: &mut &str) -> winnow::Result<(ShapeKind, String)> {
    for delimiter in DELIMITERS {
        let mut attempt = *input;
        if let Ok(label) = bracketed(delimiter, &mut attempt) {
            *input = attempt;
            return Ok((delimiter.shape, unescape(label)));
        }
    }
    Err(ParserError::from_input(input))
}

fn bracketed<'s>(delimiter: &Delimiter, input: &mut &'s str) -> winnow::Result<&'s str> {
    literal(delimiter.open).parse_next(input)?;
    alt((
        terminated(quoted, delimiter.close),
        |input: &mut &'s str| unquoted(delimiter.close, input),
    ))
    .parse_next(input)
}

/// Label text up to the first `]`, `)` or `}` of the closer's bracket family.
/// Whatever precedes that character in the closer (the `/` of `/]`) must end
/// the label and is stripped from it.
fn unquoted<'s>(close: &'static str, input: &mut &'s str) -> winnow::Result<&'s str> {
    let Some((at, stop)) = close
        .char_indices()
        .find(|&(_, c)| matches!(c, ']' | ')' | '}'))
    else {
        return Err(ParserError::from_input(input));
    };
    let (marker, tail) = close.split_at(at);
    let label = take_till(1.., stop)
        .verify_map(|raw: &'s str| raw.strip_suffix(marker).filter(|label| !label.is_empty()))
        .parse_next(input)?;
    literal(tail).parse_next(input)?;
    Ok(label)
}

fn quoted<'s>(input: &mut &'s str) -> winnow::Result<&'s str> {
    delimited('"', take_till(0.., '"'), '"').parse_next(input)
}

fn edge_chain<'s>(input: &mut &'s str) -> winnow::Result<(NodeRef<'s>, Vec<Link<'s>>)> {
    let head = node_ref.parse_next(input)?;
    let links: Vec<Link<'s>> = repeat(1.., link).parse_next(input)?;
    Ok((head, links))
}

fn link<'s>(input: &mut &'s str) -> winnow::Result<Link<'s>> {
    space0.parse_next(input)?;
    let style = arrow.parse_next(input)?;
    space0.parse_next(input)?;
    let label = opt(edge_label).parse_next(input)?;
    space0.parse_next(input)?;
    let target = node_ref.parse_next(input)?;
    Ok(Link {
        style,
        label: label.map(unescape),
        target,
    })
}

/// A maximal run of `-`, `.`, `=` and `>` carrying at least one stroke.
fn arrow(input: &mut &str) -> winnow::Result<EdgeStyle> {
    take_while(2.., ('-', '.', '=', '>'))
        .verify(|token: &str| token.contains(['-', '=']))
        .map(EdgeStyle::classify)
        .parse_next(input)
}

fn edge_label<'s>(input: &mut &'s str) -> winnow::Result<&'s str> {
    delimited('|', alt((quoted, take_till(1.., '|'))), '|').parse_next(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn shape_of(line: &str) -> (ShapeKind, String) {
        let mut input = line;
        node_definition(&mut input).unwrap().shape.unwrap()
    }

    #[test]
    fn parse_direction_synonyms() {
        let mut input = "TB";
        assert_eq!(direction(&mut input).unwrap(), Direction::TopDown);
        let mut input = "dt";
        assert_eq!(direction(&mut input).unwrap(), Direction::BottomTop);
        let mut input = "RL";
        assert_eq!(direction(&mut input).unwrap(), Direction::RightLeft);
    }

    #[test]
    fn parse_direction_rejects_unknown() {
        let mut input = "XY";
        assert!(direction(&mut input).is_err());
    }

    #[test]
    fn declaration_is_case_insensitive() {
        let mut input = "GRAPH tb";
        assert_eq!(
            declaration(&mut input).unwrap(),
            (DiagramKind::Graph, Direction::TopDown)
        );
    }

    #[test]
    fn editable_headers() {
        assert!(is_editable("flowchart TD"));
        assert!(is_editable("graph LR"));
        assert!(is_editable("GRAPH tb"));
        assert!(is_editable("  %% title\n\nflowchart BT\n  A"));
        assert!(!is_editable("sequenceDiagram"));
        assert!(!is_editable(""));
        assert!(!is_editable("graph"));
        assert!(!is_editable("graph XY"));
        assert!(!is_editable("flowchart-elk TD"));
    }

    #[test]
    fn shape_precedence_brace() {
        assert_eq!(shape_of("A{{Hex}}"), (ShapeKind::Hexagon, "Hex".to_string()));
        assert_eq!(shape_of("A{Dia}"), (ShapeKind::Diamond, "Dia".to_string()));
    }

    #[test]
    fn shape_precedence_paren() {
        assert_eq!(shape_of("A(((x)))").0, ShapeKind::DoubleCircle);
        assert_eq!(shape_of("A((x))").0, ShapeKind::Stadium);
        assert_eq!(shape_of("A(x)").0, ShapeKind::Rounded);
        assert_eq!(shape_of("A([x])").0, ShapeKind::Cylinder);
    }

    #[test]
    fn shape_precedence_bracket() {
        assert_eq!(shape_of("A[\\x/]").0, ShapeKind::TrapezoidAlt);
        assert_eq!(shape_of("A[/x\\]").0, ShapeKind::Trapezoid);
        assert_eq!(shape_of("A[/x/]").0, ShapeKind::Parallelogram);
        assert_eq!(shape_of("A[(x)]").0, ShapeKind::Circle);
        assert_eq!(shape_of("A[[x]]").0, ShapeKind::Subroutine);
        assert_eq!(shape_of("A[x]").0, ShapeKind::Rect);
    }

    #[test]
    fn triple_bracket_reads_as_rect() {
        assert_eq!(shape_of("A[[[x]]]"), (ShapeKind::Rect, "x".to_string()));
    }

    #[test]
    fn unmatched_slash_falls_back_to_rect() {
        assert_eq!(shape_of("A[/x]"), (ShapeKind::Rect, "/x".to_string()));
    }

    #[test]
    fn unquoted_label_stops_at_its_closer() {
        let mut input = "A[/in/] --> B[/out\\]";
        let node = node_definition(&mut input).unwrap();
        assert_eq!(node.shape, Some((ShapeKind::Parallelogram, "in".to_string())));
        assert_eq!(input, " --> B[/out\\]");

        let mut input = "A(one) --> B(two)";
        let node = node_definition(&mut input).unwrap();
        assert_eq!(node.shape, Some((ShapeKind::Rounded, "one".to_string())));
        assert_eq!(input, " --> B(two)");
    }

    #[test]
    fn closer_marker_must_end_the_label() {
        assert_eq!(shape_of("A[\\in\\]"), (ShapeKind::Rect, "\\in\\".to_string()));
        assert_eq!(shape_of("A[/\\]"), (ShapeKind::Rect, "/\\".to_string()));
    }

    #[test]
    fn labels_decode_entities() {
        assert_eq!(
            shape_of("A[\"say #quot;hi#quot; (loud)\"]"),
            (ShapeKind::Rect, "say \"hi\" (loud)".to_string())
        );
        let diagram = parse("graph TD\n    A -->|50#37;% done| B\n");
        assert_eq!(diagram.edges[0].label, Some("50%% done".to_string()));
    }

    #[test]
    fn empty_quoted_label_reads_as_id() {
        let diagram = parse("graph TD\n    A[\"\"]\n");
        assert_eq!(diagram.nodes[0].label, "A");
    }

    #[test]
    fn two_shaped_endpoints_on_one_line() {
        let diagram = parse("graph TD\n    A[\\in\\] --> B[\\out/]\n");
        assert_eq!(diagram.nodes.len(), 2);
        assert_eq!(diagram.nodes[0].shape, ShapeKind::Rect);
        assert_eq!(diagram.nodes[1].shape, ShapeKind::TrapezoidAlt);
        assert_eq!(diagram.nodes[1].label, "out");
        assert_eq!(diagram.edges.len(), 1);
    }

    #[test]
    fn quoted_label_may_contain_delimiters() {
        assert_eq!(
            shape_of("A[\"[NOTE] Hello\"]"),
            (ShapeKind::Rect, "[NOTE] Hello".to_string())
        );
        assert_eq!(
            shape_of("A{\"choice {A}\"}"),
            (ShapeKind::Diamond, "choice {A}".to_string())
        );
    }

    #[test]
    fn node_ref_without_shape() {
        let mut input = "A rest";
        let n = node_ref(&mut input).unwrap();
        assert_eq!(n.id, "A");
        assert!(n.shape.is_none());
        assert_eq!(input, " rest");
    }

    #[test]
    fn arrow_tokens() {
        let mut input = "-->rest";
        assert_eq!(arrow(&mut input).unwrap(), EdgeStyle::Arrow);
        assert_eq!(input, "rest");
        let mut input = "-.->rest";
        assert_eq!(arrow(&mut input).unwrap(), EdgeStyle::Dotted);
        let mut input = "==>rest";
        assert_eq!(arrow(&mut input).unwrap(), EdgeStyle::Thick);
        let mut input = "---rest";
        assert_eq!(arrow(&mut input).unwrap(), EdgeStyle::Line);
        let mut input = "--";
        assert_eq!(arrow(&mut input).unwrap(), EdgeStyle::Line);
    }

    #[test]
    fn arrow_needs_a_stroke() {
        let mut input = ">>";
        assert!(arrow(&mut input).is_err());
        let mut input = "-";
        assert!(arrow(&mut input).is_err());
    }

    #[test]
    fn parse_simple_td_graph() {
        let diagram = parse("graph TD\n    A[Start] --> B[End]\n");
        assert_eq!(diagram.kind, DiagramKind::Graph);
        assert_eq!(diagram.direction, Direction::TopDown);
        assert_eq!(diagram.nodes.len(), 2);
        assert_eq!(diagram.nodes[0].label, "Start");
        assert_eq!(diagram.nodes[1].label, "End");
        assert_eq!(diagram.edges.len(), 1);
        assert_eq!(diagram.edges[0].source, "A");
        assert_eq!(diagram.edges[0].target, "B");
        assert_eq!(diagram.edges[0].style, EdgeStyle::Arrow);
    }

    #[test]
    fn parse_edge_without_spaces() {
        let diagram = parse("graph TD\nA-->B");
        assert_eq!(diagram.edges.len(), 1);
        assert_eq!(diagram.nodes.len(), 2);
    }

    #[test]
    fn parse_edge_label() {
        let diagram = parse("graph TD\n    A -->|yes| B\n");
        assert_eq!(diagram.edges[0].label, Some("yes".to_string()));
        let diagram = parse("graph TD\n    A -->B\n");
        assert_eq!(diagram.edges[0].label, None);
    }

    #[test]
    fn parse_edge_chain() {
        let diagram = parse("flowchart LR\n    A --> B[Middle] -.-> C\n");
        assert_eq!(diagram.edges.len(), 2);
        assert_eq!(diagram.edges[1].source, "B");
        assert_eq!(diagram.edges[1].target, "C");
        assert_eq!(diagram.edges[1].style, EdgeStyle::Dotted);
        assert_eq!(diagram.nodes[1].label, "Middle");
    }

    #[test]
    fn parse_node_redefinition_keeps_first_position() {
        let diagram = parse("graph TD\n    A[First]\n    B\n    B --> A\n    A(Second)\n");
        assert_eq!(diagram.nodes.len(), 2);
        assert_eq!(diagram.nodes[0].id, "A");
        assert_eq!(diagram.nodes[0].label, "Second");
        assert_eq!(diagram.nodes[0].shape, ShapeKind::Rounded);
    }

    #[test]
    fn parse_bare_reference_keeps_definition() {
        let diagram = parse("graph TD\n    A{Check}\n    A --> B\n");
        assert_eq!(diagram.nodes[0].shape, ShapeKind::Diamond);
        assert_eq!(diagram.nodes[0].label, "Check");
    }

    #[test]
    fn parse_skips_styling_statements() {
        let input = "graph TD\n    classDef hot fill:#f00\n    A --> B\n    style A fill:#f9f\n    linkStyle 0 stroke:#333\n    click A call\n";
        let diagram = parse(input);
        assert_eq!(diagram.nodes.len(), 2);
        assert_eq!(diagram.edges.len(), 1);
    }

    #[test]
    fn parse_strips_comments() {
        let input = "%% leading\ngraph TD\n    A --> B %% trailing\n    %% C --> D\n";
        let diagram = parse(input);
        assert_eq!(diagram.nodes.len(), 2);
        assert_eq!(diagram.edges.len(), 1);
    }

    #[test]
    fn parse_unsupported() {
        let diagram = parse("sequenceDiagram\n    Alice->>Bob: Hi\n");
        assert_eq!(diagram, Diagram::unsupported());
        assert_eq!(parse(""), Diagram::unsupported());
    }

    #[test]
    fn parse_subgraph_membership() {
        let input = "graph TD\n    C\n    subgraph one \"Backend\"\n        A --> B\n    end\n    C --> A\n";
        let diagram = parse(input);
        assert_eq!(diagram.subgraphs.len(), 1);
        assert_eq!(diagram.subgraphs[0].id, "one");
        assert_eq!(diagram.subgraphs[0].label, Some("Backend".to_string()));
        assert_eq!(diagram.subgraphs[0].node_ids, vec!["A", "B"]);
        assert_eq!(diagram.nodes.len(), 3);
        assert_eq!(diagram.edges.len(), 2);
    }

    #[test]
    fn parse_nested_subgraphs() {
        let input = "graph TD\n subgraph outer\n A[a]\n subgraph inner[Inner]\n B[b]\n end\n C[c]\n end\n";
        let diagram = parse(input);
        assert_eq!(diagram.subgraphs.len(), 2);
        assert_eq!(diagram.subgraphs[0].node_ids, vec!["A", "C"]);
        assert_eq!(diagram.subgraphs[1].label, Some("Inner".to_string()));
        assert_eq!(diagram.subgraphs[1].node_ids, vec!["B"]);
    }

    #[test]
    fn parse_stray_end_is_ignored() {
        let diagram = parse("graph TD\n    end\n    A --> B\n");
        assert_eq!(diagram.edges.len(), 1);
        assert!(diagram.subgraphs.is_empty());
    }
}
