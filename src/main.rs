use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use area_layout::config::ConfigError;
use area_layout::diagnostics::{DiagnosticsLog, global_diagnostics, set_global_diagnostics};
use area_layout::editor::{InsertSide, JoinDirection, PlaceSource, Placement};
use area_layout::error::LayoutError;
use area_layout::layout::{Area, Axis, LayoutTree, NodeId};
use area_layout::preview::render_text;
use area_layout::registry::{AreaDescriptor, AreaRegistry, PermissiveRegistry};
use area_layout::session::{CommandOutcome, LayoutSession};
use area_layout::{LayoutConfig, tracing_sub};
use clap::{Parser, Subcommand, ValueEnum};
use ratatui::prelude::Rect;
use thiserror::Error;

#[derive(Parser, Debug)]
#[command(
    name = "area-layout",
    version = env!("CARGO_PKG_VERSION"),
    about = "Inspect and edit a persisted panel layout"
)]
struct Cli {
    /// Layout file (JSON). A missing file starts from a single empty area.
    #[arg(short = 'l', long = "layout", value_name = "FILE")]
    layout: PathBuf,

    /// Engine config (TOML).
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Width of the surface the layout is compiled against.
    #[arg(long, default_value_t = 120)]
    width: u16,

    /// Height of the surface the layout is compiled against.
    #[arg(long, default_value_t = 40)]
    height: u16,

    /// Print the engine's decision log after the layout.
    #[arg(short = 'v', long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the compiled layout.
    Show,
    /// Split a leaf in two.
    Split {
        leaf: u64,
        #[arg(long, value_enum, default_value_t = AxisArg::Horizontal)]
        axis: AxisArg,
        #[arg(long, value_enum, default_value_t = SideArg::After)]
        side: SideArg,
    },
    /// Move an existing area, or insert a new one, next to a target.
    Place {
        target: u64,
        /// Existing area to move.
        #[arg(long, conflicts_with = "new")]
        source: Option<u64>,
        /// Type tag of a new area to insert.
        #[arg(long = "new", value_name = "TYPE")]
        new: Option<String>,
        #[arg(long = "at", value_enum, default_value_t = PlacementArg::Stack)]
        at: PlacementArg,
    },
    /// Remove an area or subtree.
    Remove { id: u64 },
    /// Merge a row child into its neighbor.
    Join {
        row: u64,
        index: usize,
        #[arg(long, value_enum, default_value_t = JoinArg::Previous)]
        toward: JoinArg,
    },
    /// Set the fractional sizes of a row's children.
    Resize {
        row: u64,
        #[arg(required = true, num_args = 1..)]
        sizes: Vec<f64>,
    },
    /// Cut a subtree out and write it as its own layout.
    Detach {
        id: u64,
        #[arg(short = 'o', long = "out", value_name = "FILE")]
        out: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum AxisArg {
    Horizontal,
    Vertical,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SideArg {
    Before,
    After,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PlacementArg {
    Top,
    Bottom,
    Left,
    Right,
    Stack,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum JoinArg {
    Previous,
    Next,
}

impl From<AxisArg> for Axis {
    fn from(value: AxisArg) -> Self {
        match value {
            AxisArg::Horizontal => Axis::Horizontal,
            AxisArg::Vertical => Axis::Vertical,
        }
    }
}

impl From<SideArg> for InsertSide {
    fn from(value: SideArg) -> Self {
        match value {
            SideArg::Before => InsertSide::Before,
            SideArg::After => InsertSide::After,
        }
    }
}

impl From<PlacementArg> for Placement {
    fn from(value: PlacementArg) -> Self {
        match value {
            PlacementArg::Top => Placement::Top,
            PlacementArg::Bottom => Placement::Bottom,
            PlacementArg::Left => Placement::Left,
            PlacementArg::Right => Placement::Right,
            PlacementArg::Stack => Placement::Stack,
        }
    }
}

impl From<JoinArg> for JoinDirection {
    fn from(value: JoinArg) -> Self {
        match value {
            JoinArg::Previous => JoinDirection::Previous,
            JoinArg::Next => JoinDirection::Next,
        }
    }
}

#[derive(Debug, Error)]
enum CliError {
    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error("place needs either --source or --new")]
    MissingSource,
    #[error("command was not applied: {0}")]
    NotApplied(String),
}

fn main() {
    let cli = Cli::parse();
    if cli.verbose {
        set_global_diagnostics(DiagnosticsLog::default());
    }
    let result = run(cli);
    if let Some(log) = global_diagnostics() {
        let lines = log.lines();
        eprint!(
            "{}",
            indoc::formatdoc!(
                "
                --- engine log ({count} lines) ---
                {body}
                ",
                count = lines.len(),
                body = lines.join("\n"),
            )
        );
    }
    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = match &cli.config {
        Some(path) => LayoutConfig::load(path)?,
        None => LayoutConfig::default(),
    };
    tracing_sub::init_for(&config, cli.verbose);
    let registry: Arc<dyn AreaRegistry> = Arc::new(PermissiveRegistry);
    let tree = read_layout(&cli.layout)?;
    let bounds = Rect::new(0, 0, cli.width, cli.height);
    let mut session = LayoutSession::new(tree, bounds, config, registry)?;

    let outcome = match cli.command {
        Command::Show => None,
        Command::Split { leaf, axis, side } => {
            Some(session.split(NodeId::new(leaf), axis.into(), side.into())?)
        }
        Command::Place {
            target,
            source,
            new,
            at,
        } => {
            let source = match (source, new) {
                (Some(id), _) => PlaceSource::Existing(NodeId::new(id)),
                (None, Some(type_tag)) => PlaceSource::New(AreaDescriptor::new(type_tag)),
                (None, None) => return Err(CliError::MissingSource),
            };
            Some(session.place(source, NodeId::new(target), at.into())?)
        }
        Command::Remove { id } => Some(session.remove(NodeId::new(id))?),
        Command::Join { row, index, toward } => {
            Some(session.join(NodeId::new(row), index, toward.into())?)
        }
        Command::Resize { row, sizes } => Some(session.set_row_sizes(NodeId::new(row), &sizes)?),
        Command::Detach { id, out } => {
            let (detached, outcome) = session.detach(NodeId::new(id))?;
            write_file(&out, &detached.to_json().map_err(LayoutError::from)?)?;
            Some(outcome)
        }
    };

    if let Some(outcome) = outcome {
        report(&outcome)?;
        write_file(&cli.layout, &session.to_json()?)?;
    }
    print!("{}", render_text(session.tree(), session.viewports(), bounds));
    Ok(())
}

fn read_layout(path: &Path) -> Result<LayoutTree, CliError> {
    match fs::read_to_string(path) {
        Ok(json) => Ok(LayoutTree::from_json(&json).map_err(LayoutError::from)?),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(LayoutTree::new(Area::empty())),
        Err(source) => Err(CliError::Io {
            path: path.display().to_string(),
            source,
        }),
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), CliError> {
    fs::write(path, contents).map_err(|source| CliError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn report(outcome: &CommandOutcome) -> Result<(), CliError> {
    if !outcome.applied {
        return Err(CliError::NotApplied(outcome.label.clone()));
    }
    if outcome.created.is_empty() {
        println!("{}", outcome.label);
    } else {
        let created: Vec<String> = outcome.created.iter().map(ToString::to_string).collect();
        println!("{} (created {})", outcome.label, created.join(", "));
    }
    Ok(())
}
