use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use mosaic_core::{NodeId, Vec2, WorkspaceDocument};
use mosaic_graph::{CanvasStore, LayoutSettings};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(author, version, about = "Apply canvas layout operations to a workspace file", long_about = None)]
struct Args {
    /// Workspace JSON file to read
    #[arg(short, long)]
    input: PathBuf,

    /// Where to write the result (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Layout settings file (defaults to the user config directory)
    #[arg(short, long)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Push apart overlapping sibling nodes
    Resolve {
        #[arg(long)]
        threshold: Option<f64>,
        #[arg(long)]
        margin: Option<f64>,
        #[arg(long)]
        max_iterations: Option<usize>,
    },
    /// Add a node at the nearest free spot to a point
    Place {
        #[arg(long = "type", default_value = "note")]
        node_type: String,
        #[arg(long, allow_hyphen_values = true)]
        x: f64,
        #[arg(long, allow_hyphen_values = true)]
        y: f64,
    },
    /// Wrap two or more nodes in a new group
    Group {
        #[arg(required = true, num_args = 2..)]
        ids: Vec<String>,
    },
    /// Dissolve a group, keeping its children in place
    Ungroup { id: String },
    /// Print the alignment guides for a node moved to a point
    Guides {
        id: String,
        #[arg(long, allow_hyphen_values = true)]
        x: f64,
        #[arg(long, allow_hyphen_values = true)]
        y: f64,
        #[arg(long)]
        threshold: Option<f64>,
    },
}

fn load_settings(path: Option<&Path>) -> Result<LayoutSettings> {
    match path {
        Some(path) => LayoutSettings::load_from(path)
            .with_context(|| format!("reading settings {}", path.display())),
        None => Ok(LayoutSettings::load()),
    }
}

fn emit(text: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
            tracing::info!("Wrote {:?}", path);
        }
        None => println!("{}", text),
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings(args.settings.as_deref())?;
    let content = std::fs::read_to_string(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let document = WorkspaceDocument::from_json(&content)?;

    if let Command::Resolve {
        threshold,
        margin,
        max_iterations,
    } = &args.command
    {
        let collision = &mut settings.collision;
        collision.overlap_threshold = threshold.unwrap_or(collision.overlap_threshold);
        collision.margin = margin.unwrap_or(collision.margin);
        collision.max_iterations = max_iterations.unwrap_or(collision.max_iterations);
    }
    if let Command::Guides {
        threshold: Some(threshold),
        ..
    } = &args.command
    {
        settings.snap_threshold = *threshold;
    }

    let mut store = CanvasStore::new(settings);
    store.load_document(&document);

    match &args.command {
        Command::Resolve { .. } => {
            let outcome = store.resolve_collisions();
            eprintln!(
                "Resolved in {} iterations (converged: {})",
                outcome.iterations, outcome.converged
            );
        }
        Command::Place { node_type, x, y } => {
            let node = store.drop_node(node_type, Vec2::new(*x, *y), None);
            eprintln!(
                "Placed {} at ({}, {})",
                node.id, node.position.x, node.position.y
            );
        }
        Command::Group { ids } => {
            let ids: Vec<NodeId> = ids.iter().map(|id| NodeId::from(id.as_str())).collect();
            match store.group_selected_nodes(&ids) {
                Some(group_id) => eprintln!("Created group {}", group_id),
                None => bail!("nothing to group: need at least two existing nodes"),
            }
        }
        Command::Ungroup { id } => {
            if !store.ungroup_node(&NodeId::from(id.as_str())) {
                bail!("{} is not a group in this workspace", id);
            }
        }
        Command::Guides { id, x, y, .. } => {
            let id = NodeId::from(id.as_str());
            let Some(node) = store.graph().node(&id) else {
                bail!("node {} not found", id);
            };
            let mut dragged = node.clone();
            dragged.position = Vec2::new(*x, *y);
            let guides = store.snap_guides(&dragged);
            return emit(&serde_json::to_string_pretty(&guides)?, args.output.as_deref());
        }
    }

    emit(&store.to_document().to_json()?, args.output.as_deref())
}
