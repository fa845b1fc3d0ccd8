use std::path::PathBuf;

use clap::{Parser, Subcommand};
use glam::Vec3;

use slipstream_shared::*;
use slipstream_sim::{run_session_on, IdlePilot, Pilot, SlalomPilot, ThrottlePilot, VehicleSim};
use slipstream_track::TerrainField;

#[derive(Parser)]
#[command(name = "slipstream", about = "Slipstream racing simulation CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a session with a scripted pilot
    Run {
        /// Pilot name (idle, throttle, slalom)
        #[arg(long, default_value = "throttle")]
        pilot: String,

        /// Number of ticks to simulate
        #[arg(long, default_value_t = DEFAULT_SESSION_TICKS)]
        ticks: u32,

        /// Step multiplier per tick
        #[arg(long, default_value_t = DEFAULT_DT)]
        dt: f32,

        /// Collision mask PNG (requires --elevation)
        #[arg(long)]
        collision: Option<PathBuf>,

        /// Elevation map PNG (requires --collision)
        #[arg(long)]
        elevation: Option<PathBuf>,

        /// World units per track image pixel
        #[arg(long, default_value_t = 1.0)]
        pixel_ratio: f32,

        /// Output path for replay JSON
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Print sampling info for a track image
    Inspect {
        /// Path to a track PNG
        path: PathBuf,

        /// World units per track image pixel
        #[arg(long, default_value_t = 1.0)]
        pixel_ratio: f32,
    },
}

/// Resolve a pilot name to a boxed Pilot trait object.
fn resolve_pilot(name: &str) -> Box<dyn Pilot> {
    match name {
        "idle" => Box::new(IdlePilot),
        "throttle" => Box::new(ThrottlePilot),
        "slalom" => Box::new(SlalomPilot::new(40)),
        other => {
            eprintln!("Unknown pilot '{}'. Valid options: idle, throttle, slalom.", other);
            std::process::exit(1);
        }
    }
}

fn load_field(path: &PathBuf, pixel_ratio: f32) -> TerrainField {
    match TerrainField::from_png_file(path, pixel_ratio) {
        Ok(field) => field,
        Err(e) => {
            eprintln!("Failed to load track image {}: {}", path.display(), e);
            std::process::exit(1);
        }
    }
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            pilot,
            ticks,
            dt,
            collision,
            elevation,
            pixel_ratio,
            output,
        } => cmd_run(&pilot, ticks, dt, collision, elevation, pixel_ratio, output),

        Commands::Inspect { path, pixel_ratio } => cmd_inspect(&path, pixel_ratio),
    }
}

fn cmd_run(
    pilot_name: &str,
    ticks: u32,
    dt: f32,
    collision: Option<PathBuf>,
    elevation: Option<PathBuf>,
    pixel_ratio: f32,
    output: Option<PathBuf>,
) {
    let mut pilot = resolve_pilot(pilot_name);

    let mut sim = VehicleSim::new(VehicleTuning::default());
    match (collision, elevation) {
        (Some(collision), Some(elevation)) => {
            sim = sim.with_terrain(
                load_field(&collision, pixel_ratio),
                load_field(&elevation, pixel_ratio),
            );
        }
        (None, None) => {}
        _ => {
            eprintln!("--collision and --elevation must be given together.");
            std::process::exit(1);
        }
    }

    let config = SessionConfig {
        pilot_name: pilot.name().to_string(),
        max_ticks: ticks,
        dt,
        start_position: Vec3::ZERO,
        ..Default::default()
    };

    let replay = run_session_on(sim, &config, pilot.as_mut());

    println!(
        "Session finished at tick {}: top speed {:.3}, distance {:.1}, {} frames",
        replay.final_tick,
        replay.stats.top_speed,
        replay.stats.distance,
        replay.frames.len(),
    );

    if let Some(path) = output {
        let json = match serde_json::to_string_pretty(&replay) {
            Ok(json) => json,
            Err(e) => {
                eprintln!("Failed to serialize replay: {}", e);
                std::process::exit(1);
            }
        };
        if let Err(e) = std::fs::write(&path, json) {
            eprintln!("Failed to write {}: {}", path.display(), e);
            std::process::exit(1);
        }
        println!("Replay written to {}", path.display());
    }
}

fn cmd_inspect(path: &PathBuf, pixel_ratio: f32) {
    let field = load_field(path, pixel_ratio);
    let (w, h) = field.dims();
    println!("{}: {}x{} pixels, {} world units per pixel", path.display(), w, h, pixel_ratio);
    println!(
        "world extent: x [{:.1}, {:.1}], z [{:.1}, {:.1}]",
        -((w - 1) as f32) * 0.5 * pixel_ratio,
        ((w - 1) as f32) * 0.5 * pixel_ratio,
        -((h - 1) as f32) * 0.5 * pixel_ratio,
        ((h - 1) as f32) * 0.5 * pixel_ratio,
    );
    println!("sample at origin: {:.3}", field.sample(0.0, 0.0));
}
