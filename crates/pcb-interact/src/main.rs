use clap::{Parser, Subcommand};
use log::info;
use pcb_interact::anchor::compute_anchor_offsets;
use pcb_interact::connectivity::compute_rats_nest;
use pcb_interact::highlight::project_highlights;
use pcb_interact::hit_test::get_primitives_under_point;
use pcb_interact::primitives::circuit_to_primitives;
use pcb_interact::types::Point;
use pcb_interact::worker::ConnectivityClient;
use pcb_interact::{apply_edit_events, load_circuit, load_edit_events, InteractError, Matrix};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "pcb-interact", about = "Hit-test, edit and inspect circuit JSON")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Apply an edit event list to a circuit
    Apply {
        /// Circuit JSON file
        circuit: PathBuf,
        /// Edit events JSON file (array or single event)
        events: PathBuf,
        /// Output JSON file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List the primitives under a board point, with their highlight boxes
    Hit {
        circuit: PathBuf,
        /// X in mm
        #[arg(long, allow_hyphen_values = true)]
        x: f64,
        /// Y in mm
        #[arg(long, allow_hyphen_values = true)]
        y: f64,
        /// Zoom in pixels per mm, scales the trace tolerance
        #[arg(long, default_value_t = 1.0)]
        scale: f64,
    },
    /// Print net membership
    Connectivity {
        circuit: PathBuf,
        /// Also print the unrouted connections
        #[arg(long)]
        rats_nest: bool,
    },
    /// Print positioned-element offsets from their anchors
    Anchors { circuit: PathBuf },
}

fn to_json<T: Serialize>(value: &T, pretty: bool) -> Result<String, InteractError> {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }?;
    Ok(json)
}

fn emit(json: &str, output: Option<&Path>) -> Result<(), InteractError> {
    match output {
        Some(path) => {
            std::fs::write(path, json)?;
            eprintln!("Written to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn run(cli: Cli) -> Result<(), InteractError> {
    match cli.command {
        Command::Apply {
            circuit,
            events,
            output,
        } => {
            let elements = load_circuit(&circuit)?;
            let events = load_edit_events(&events)?;
            info!("applying {} edit events to {} elements", events.len(), elements.len());
            let edited = apply_edit_events(&elements, &events);
            emit(&to_json(&edited, cli.pretty)?, output.as_deref())
        }
        Command::Hit { circuit, x, y, scale } => {
            let elements = load_circuit(&circuit)?;
            let primitives = circuit_to_primitives(&elements);
            let transform = Matrix::scale(scale, -scale);
            let hits = get_primitives_under_point(&primitives, Point::new(x, y), &transform);
            info!("{} of {} primitives under ({x}, {y})", hits.len(), primitives.len());
            let highlights = project_highlights(hits, &transform);
            emit(&to_json(&highlights, cli.pretty)?, None)
        }
        Command::Connectivity { circuit, rats_nest } => {
            let elements = load_circuit(&circuit)?;
            let mut client = ConnectivityClient::new();
            client.request(elements.clone());
            let map = client.wait()?;
            let json = if rats_nest {
                let lines = compute_rats_nest(&elements, &map);
                to_json(&serde_json::json!({ "connectivity": map, "rats_nest": lines }), cli.pretty)?
            } else {
                to_json(&map, cli.pretty)?
            };
            emit(&json, None)
        }
        Command::Anchors { circuit } => {
            let elements = load_circuit(&circuit)?;
            emit(&to_json(&compute_anchor_offsets(&elements), cli.pretty)?, None)
        }
    }
}

fn main() {
    env_logger::init();
    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
