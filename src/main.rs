use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use mermalaid::display_width::{column_width, pad_to_width, truncate_to_width};
use mermalaid::{Config, Diagram, Error, GraphEditSession};
use tracing::info;

const LABEL_COLUMNS: usize = 24;

#[derive(Parser)]
#[command(
    name = "mermalaid",
    version,
    about = "Normalize Mermaid flowcharts and inspect them as graphs"
)]
struct Cli {
    /// Input file (.mmd, .txt, .md, .markdown); reads stdin if not provided
    file: Option<PathBuf>,

    /// What to print for the input
    #[arg(long, value_enum, default_value = "canonical")]
    emit: Emit,

    /// Only report whether the input is an editable flowchart (exit code 1 if not)
    #[arg(long)]
    check: bool,

    /// Configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable verbose logging (repeat for more detail)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress everything except errors
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Emit {
    /// Regenerated flowchart text; other diagram types are passed through
    Canonical,
    /// Parsed diagram as JSON
    Json,
    /// Node and edge table with grid positions
    Summary,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match run(&cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("ERROR: {e}");
            std::process::exit(1);
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .try_init();
}

fn run(cli: &Cli) -> Result<i32, Error> {
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let input = read_input(cli.file.as_deref())?;
    let diagram = mermalaid::parse(&input);

    if cli.check {
        if !cli.quiet {
            println!("{}", verdict(&diagram));
        }
        return Ok(if diagram.is_editable() { 0 } else { 1 });
    }

    let output = match cli.emit {
        Emit::Canonical if diagram.is_editable() => diagram.to_code(),
        Emit::Canonical => {
            info!("not a flowchart, passing input through");
            input
        }
        Emit::Json => serde_json::to_string_pretty(&diagram)?,
        Emit::Summary => summary(&config, &diagram),
    };
    println!("{output}");
    Ok(0)
}

fn read_input(file: Option<&Path>) -> Result<String, Error> {
    match file {
        Some(path) => Ok(mermalaid::files::import_file(path)?),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(Error::Stdin)?;
            Ok(mermalaid::extract(&buf))
        }
    }
}

fn verdict(diagram: &Diagram) -> String {
    if diagram.is_editable() {
        format!(
            "editable {} {}: {} nodes, {} edges",
            diagram.kind.keyword(),
            diagram.direction.as_token(),
            diagram.nodes.len(),
            diagram.edges.len()
        )
    } else {
        "not an editable flowchart (render only)".to_string()
    }
}

fn summary(config: &Config, diagram: &Diagram) -> String {
    let mut out = verdict(diagram);
    if !diagram.is_editable() {
        return out;
    }
    let session = GraphEditSession::new(config, diagram);

    let labels: Vec<String> = session
        .nodes()
        .iter()
        .map(|n| truncate_to_width(n.display_label(), LABEL_COLUMNS))
        .collect();
    let id_w = column_width(session.nodes().iter().map(|n| n.id.as_str())).max(2);
    let label_w = column_width(labels.iter().map(String::as_str)).max(5);
    let shape_w = column_width(session.nodes().iter().map(|n| n.shape.name())).max(5);

    out.push_str("\n\n");
    out.push_str(&format!(
        "{}  {}  {}  POSITION\n",
        pad_to_width("ID", id_w),
        pad_to_width("LABEL", label_w),
        pad_to_width("SHAPE", shape_w)
    ));
    for (node, label) in session.nodes().iter().zip(&labels) {
        out.push_str(&format!(
            "{}  {}  {}  ({:.0}, {:.0})\n",
            pad_to_width(&node.id, id_w),
            pad_to_width(label, label_w),
            pad_to_width(node.shape.name(), shape_w),
            node.position.x,
            node.position.y
        ));
    }

    if !session.edges().is_empty() {
        let key_w = column_width(session.edges().iter().map(|e| e.key.as_str())).max(4);
        let style_w = column_width(session.edges().iter().map(|e| e.style.name())).max(5);
        out.push('\n');
        out.push_str(&format!(
            "{}  {}  LABEL\n",
            pad_to_width("EDGE", key_w),
            pad_to_width("STYLE", style_w)
        ));
        for edge in session.edges() {
            let line = format!(
                "{}  {}  {}",
                pad_to_width(&edge.key, key_w),
                pad_to_width(edge.style.name(), style_w),
                truncate_to_width(&edge.label, LABEL_COLUMNS)
            );
            out.push_str(line.trim_end());
            out.push('\n');
        }
    }
    out.truncate(out.trim_end().len());
    out
}
