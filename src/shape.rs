use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Visual shape of a node, encoded in the DSL by its bracket delimiters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    #[default]
    Rect,
    Rounded,
    Stadium,
    Subroutine,
    Cylinder,
    Circle,
    #[serde(rename = "doublecircle")]
    DoubleCircle,
    #[serde(alias = "rhombus")]
    Diamond,
    Hexagon,
    Parallelogram,
    Trapezoid,
    #[serde(rename = "trapezoidAlt")]
    TrapezoidAlt,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 12] = [
        ShapeKind::Rect,
        ShapeKind::Rounded,
        ShapeKind::Stadium,
        ShapeKind::Subroutine,
        ShapeKind::Cylinder,
        ShapeKind::Circle,
        ShapeKind::DoubleCircle,
        ShapeKind::Diamond,
        ShapeKind::Hexagon,
        ShapeKind::Parallelogram,
        ShapeKind::Trapezoid,
        ShapeKind::TrapezoidAlt,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ShapeKind::Rect => "rect",
            ShapeKind::Rounded => "rounded",
            ShapeKind::Stadium => "stadium",
            ShapeKind::Subroutine => "subroutine",
            ShapeKind::Cylinder => "cylinder",
            ShapeKind::Circle => "circle",
            ShapeKind::DoubleCircle => "doublecircle",
            ShapeKind::Diamond => "diamond",
            ShapeKind::Hexagon => "hexagon",
            ShapeKind::Parallelogram => "parallelogram",
            ShapeKind::Trapezoid => "trapezoid",
            ShapeKind::TrapezoidAlt => "trapezoidAlt",
        }
    }

    /// Canonical `(open, close)` pair written by the generator.
    ///
    /// Every pair here is recognized as the same shape by [`DELIMITERS`], so
    /// serializing a shape and parsing it back is the identity.
    pub fn delimiters(self) -> (&'static str, &'static str) {
        match self {
            ShapeKind::Rect => ("[", "]"),
            ShapeKind::Rounded => ("(", ")"),
            ShapeKind::Stadium => ("((", "))"),
            ShapeKind::Subroutine => ("[[", "]]"),
            ShapeKind::Cylinder => ("([", "])"),
            ShapeKind::Circle => ("[(", ")]"),
            ShapeKind::DoubleCircle => ("(((", ")))"),
            ShapeKind::Diamond => ("{", "}"),
            ShapeKind::Hexagon => ("{{", "}}"),
            ShapeKind::Parallelogram => ("[/", "/]"),
            ShapeKind::Trapezoid => ("[/", "\\]"),
            ShapeKind::TrapezoidAlt => ("[\\", "/]"),
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown name `{0}`")]
pub struct UnknownName(pub String);

impl FromStr for ShapeKind {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "rhombus" {
            return Ok(ShapeKind::Diamond);
        }
        ShapeKind::ALL
            .into_iter()
            .find(|shape| shape.name() == s)
            .ok_or_else(|| UnknownName(s.to_string()))
    }
}

/// A bracket pair the parser tries when reading a node definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delimiter {
    pub open: &'static str,
    pub close: &'static str,
    pub shape: ShapeKind,
}

const fn delimiter(open: &'static str, close: &'static str, shape: ShapeKind) -> Delimiter {
    Delimiter { open, close, shape }
}

/// Bracket pairs in match order, most specific first; the first pair whose
/// opener and closer both match wins.
///
/// A shorter opener must never precede a longer one it is a prefix of:
/// `{{` before `{`, `(((` before `((` before `(`, and every two-character
/// `[`/`(` opener before the plain bracket forms.
pub const DELIMITERS: &[Delimiter] = &[
    delimiter("{{", "}}", ShapeKind::Hexagon),
    delimiter("{", "}", ShapeKind::Diamond),
    delimiter("[\\", "/]", ShapeKind::TrapezoidAlt),
    delimiter("[/", "\\]", ShapeKind::Trapezoid),
    delimiter("[/", "/]", ShapeKind::Parallelogram),
    // not a standard form, read as a plain box
    delimiter("[[[", "]]]", ShapeKind::Rect),
    delimiter("(((", ")))", ShapeKind::DoubleCircle),
    delimiter("[[", "]]", ShapeKind::Subroutine),
    delimiter("((", "))", ShapeKind::Stadium),
    delimiter("[(", ")]", ShapeKind::Circle),
    delimiter("([", "])", ShapeKind::Cylinder),
    delimiter("(", ")", ShapeKind::Rounded),
    delimiter("[", "]", ShapeKind::Rect),
];

/// Line and arrowhead style of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeStyle {
    #[default]
    Arrow,
    Line,
    Thick,
    Dotted,
}

impl EdgeStyle {
    pub const ALL: [EdgeStyle; 4] = [
        EdgeStyle::Arrow,
        EdgeStyle::Line,
        EdgeStyle::Thick,
        EdgeStyle::Dotted,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EdgeStyle::Arrow => "arrow",
            EdgeStyle::Line => "line",
            EdgeStyle::Thick => "thick",
            EdgeStyle::Dotted => "dotted",
        }
    }

    pub fn arrow_token(self) -> &'static str {
        match self {
            EdgeStyle::Arrow => "-->",
            EdgeStyle::Line => "---",
            EdgeStyle::Thick => "==>",
            EdgeStyle::Dotted => "-.->",
        }
    }

    /// Classify a run of `-`, `.`, `=` and `>` characters.
    ///
    /// Checked in order: `==` anywhere is thick, `.` anywhere is dotted, a
    /// headless run of hyphens (`--`, `---`) is a line, anything else is an
    /// arrow.
    pub fn classify(token: &str) -> EdgeStyle {
        if token.contains("==") {
            EdgeStyle::Thick
        } else if token.contains('.') {
            EdgeStyle::Dotted
        } else if token.len() >= 2 && token.chars().all(|c| c == '-') {
            EdgeStyle::Line
        } else {
            EdgeStyle::Arrow
        }
    }
}

impl fmt::Display for EdgeStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EdgeStyle {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EdgeStyle::ALL
            .into_iter()
            .find(|style| style.name() == s)
            .ok_or_else(|| UnknownName(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn classify_thick_before_dotted() {
        assert_eq!(EdgeStyle::classify("==>"), EdgeStyle::Thick);
        assert_eq!(EdgeStyle::classify("===>"), EdgeStyle::Thick);
        assert_eq!(EdgeStyle::classify("==.>"), EdgeStyle::Thick);
    }

    #[test]
    fn classify_dotted() {
        assert_eq!(EdgeStyle::classify("-.->"), EdgeStyle::Dotted);
        assert_eq!(EdgeStyle::classify("-.-"), EdgeStyle::Dotted);
    }

    #[test]
    fn classify_headless_run_is_line() {
        assert_eq!(EdgeStyle::classify("--"), EdgeStyle::Line);
        assert_eq!(EdgeStyle::classify("---"), EdgeStyle::Line);
    }

    #[test]
    fn classify_defaults_to_arrow() {
        assert_eq!(EdgeStyle::classify("-->"), EdgeStyle::Arrow);
        assert_eq!(EdgeStyle::classify("--->"), EdgeStyle::Arrow);
        assert_eq!(EdgeStyle::classify("->"), EdgeStyle::Arrow);
    }

    #[test]
    fn canonical_tokens_classify_to_their_style() {
        for style in EdgeStyle::ALL {
            assert_eq!(EdgeStyle::classify(style.arrow_token()), style);
        }
    }

    #[test]
    fn rhombus_is_an_alias_for_diamond() {
        assert_eq!("rhombus".parse::<ShapeKind>(), Ok(ShapeKind::Diamond));
        assert_eq!("diamond".parse::<ShapeKind>(), Ok(ShapeKind::Diamond));
    }

    #[test]
    fn shape_names_parse_back() {
        for shape in ShapeKind::ALL {
            assert_eq!(shape.name().parse::<ShapeKind>(), Ok(shape));
        }
        let err = "blob".parse::<ShapeKind>().unwrap_err();
        assert_eq!(err.to_string(), "unknown name `blob`");
        let err: Box<dyn std::error::Error> = Box::new(err);
        assert!(err.source().is_none());
    }

    #[test]
    fn canonical_delimiters_resolve_to_same_shape() {
        for shape in ShapeKind::ALL {
            let (open, close) = shape.delimiters();
            let first = DELIMITERS
                .iter()
                .find(|d| {
                    let text = format!("{open}x{close}");
                    text.starts_with(d.open) && text.ends_with(d.close)
                })
                .map(|d| d.shape);
            assert_eq!(first, Some(shape), "{open}x{close}");
        }
    }

    #[test]
    fn serde_names_match_display() {
        let json = serde_json::to_string(&ShapeKind::TrapezoidAlt).unwrap();
        assert_eq!(json, "\"trapezoidAlt\"");
        let shape: ShapeKind = serde_json::from_str("\"rhombus\"").unwrap();
        assert_eq!(shape, ShapeKind::Diamond);
    }
}
