//! Render a LiDAR scan through a scripted viewer session and write PNG frames.
//!
//! Channel records are read from a JSON array, or synthesised the way a
//! four-channel sensor reports them when no input is given.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use instant::Instant;
use lidarscope::prelude::*;
use log::LevelFilter;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Parser, Debug)]
#[command(author, version, about = "Render a LiDAR scan to PNG frames")]
struct Args {
    /// JSON file holding an array of channel records; synthesised when absent
    #[arg(long)]
    input: Option<PathBuf>,

    /// JSON viewer configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output directory for the frames
    #[arg(long, default_value = "frames")]
    out: PathBuf,

    #[arg(long, default_value_t = 800)]
    width: u32,

    #[arg(long, default_value_t = 600)]
    height: u32,

    #[arg(long, value_enum, default_value_t = ColorArg::Distance)]
    color: ColorArg,

    #[arg(long, default_value_t = 2.0)]
    point_size: f32,

    /// Seed for the synthesised scan
    #[arg(long, default_value_t = 7)]
    seed: u64,

    /// Maximum range of the synthesised scan, metres
    #[arg(long, default_value_t = 50.0)]
    max_range: f32,

    /// Log debug output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorArg {
    Distance,
    Channel,
    Intensity,
    VerticalAngle,
}

impl From<ColorArg> for ColorMode {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Distance => ColorMode::Distance,
            ColorArg::Channel => ColorMode::Channel,
            ColorArg::Intensity => ColorMode::Intensity,
            ColorArg::VerticalAngle => ColorMode::VerticalAngle,
        }
    }
}

/// One scripted step of the session
enum Step {
    Initial,
    Drag { from: (f32, f32), to: (f32, f32), modifiers: Modifiers },
    Wheel(f32),
    Click(f32, f32),
    Key(char),
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose)?;

    let config = match &args.config {
        Some(path) => {
            let json = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            ViewerConfig::from_json(&json)?
        }
        None => ViewerConfig::default(),
    };
    let frame_interval = Duration::from_secs_f32(1.0 / config.target_fps) + Duration::from_millis(1);

    let records = match &args.input {
        Some(path) => load_records(path)?,
        None => synthesise_records(args.seed, args.max_range),
    };
    let points = points_from_records(&records);
    log::info!("{} records, {} points", records.len(), points.len());

    let settings = RenderSettings {
        color_mode: args.color.into(),
        point_size: args.point_size,
        hfov: records.first().map_or(100.0, |r| r.hfov),
        ..Default::default()
    };

    let mut viewer = Viewer::new(config)?;
    let canvas = CanvasSize::new(args.width, args.height);
    viewer.set_display_metrics(args.width as f32, args.height as f32, canvas);
    viewer.set_pick_listener(|position: Point3f| {
        log::info!("picked ({:.2}, {:.2})", position.x, position.y);
    });

    fs::create_dir_all(&args.out).with_context(|| format!("creating {}", args.out.display()))?;

    let (cx, cy) = canvas.center();
    let script = [
        ("initial", Step::Initial),
        ("rotated", Step::Drag { from: (cx, cy), to: (cx + 60.0, cy + 80.0), modifiers: Modifiers::NONE }),
        ("spun", Step::Drag { from: (cx, cy), to: (cx + 50.0, cy), modifiers: Modifiers::CONTROL }),
        ("zoomed", Step::Wheel(-4.0)),
        ("panned", Step::Drag { from: (cx, cy), to: (cx - 40.0, cy + 30.0), modifiers: Modifiers::SHIFT }),
        ("top_view", Step::Key('t')),
        ("picked", Step::Click(cx + 40.0, cy - 80.0)),
    ];

    let start = Instant::now();
    for (index, (name, step)) in script.into_iter().enumerate() {
        apply(&mut viewer, step);

        let mut surface = RasterSurface::with_size(canvas);
        let now = start + frame_interval * index as u32;
        let Some(stats) = viewer.render_at(&mut surface, &points, &settings, now) else {
            log::warn!("frame {name} was not rendered");
            continue;
        };
        log::debug!(
            "{name}: {} drawn, {} culled, {} batches, grid rebuilt: {}",
            stats.points.drawn,
            stats.points.culled,
            stats.points.batches,
            stats.grid_rebuilt
        );

        let path = args.out.join(format!("{index:02}_{name}.png"));
        surface
            .image()
            .save(&path)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("{}", path.display());
    }

    let report = viewer.performance_report(&settings);
    println!("{}", serde_json::to_string_pretty(&report)?);

    viewer.shutdown();
    Ok(())
}

fn apply(viewer: &mut Viewer, step: Step) {
    match step {
        Step::Initial => {}
        Step::Drag { from, to, modifiers } => {
            viewer.pointer_down(PointerEvent::primary(from.0, from.1).with_modifiers(modifiers));
            // intermediate moves so the drag is seen as a gesture, not a jump
            for i in 1..=10 {
                let t = i as f32 / 10.0;
                viewer.pointer_move(from.0 + (to.0 - from.0) * t, from.1 + (to.1 - from.1) * t);
            }
            viewer.pointer_up(PointerEvent::primary(to.0, to.1).with_modifiers(modifiers));
        }
        Step::Wheel(notches) => viewer.wheel(notches),
        Step::Click(x, y) => {
            viewer.pointer_down(PointerEvent::primary(x, y));
            viewer.pointer_up(PointerEvent::primary(x, y));
        }
        Step::Key(key) => {
            viewer.key_down(Key::Character(key));
        }
    }
}

fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    simplelog::WriteLogger::init(
        level,
        simplelog::ConfigBuilder::new()
            .set_target_level(LevelFilter::Off)
            .set_location_level(LevelFilter::Off)
            .build(),
        std::io::stderr(),
    )
    .context("installing logger")
}

fn load_records(path: &Path) -> Result<Vec<ChannelRecord>> {
    let json = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("parsing {}", path.display()))
}

/// A four-channel, 100 degree sensor: 400 returns per channel with an
/// occasional missing return
fn synthesise_records(seed: u64, max_range: f32) -> Vec<ChannelRecord> {
    const VFOV: [f32; 4] = [-1.1, 0.0, 1.1, 2.2];
    const RETURNS: usize = 400;

    let mut rng = StdRng::seed_from_u64(seed);
    let max_range = max_range.max(1.0);

    (0..VFOV.len() as u32)
        .map(|channel| {
            let mut distances = Vec::with_capacity(RETURNS);
            let mut detections = Vec::with_capacity(RETURNS);
            for i in 0..RETURNS {
                // a wall whose range varies smoothly across the field of view
                let t = i as f32 / RETURNS as f32;
                let wall = max_range * (0.45 + 0.25 * (t * std::f32::consts::TAU * 2.0).sin());
                let distance = if rng.gen_bool(0.05) {
                    0.0
                } else {
                    (wall + rng.gen_range(-0.5..0.5)).clamp(0.0, max_range)
                };
                distances.push((distance * 100.0).round() / 100.0);
                detections.push(rng.gen_range(0.0..255.0));
            }

            let mut record = ChannelRecord::new(channel, 100.0, 0.0, distances).with_max_range(max_range);
            record.vfov = VerticalFov::PerChannel(VFOV.to_vec());
            record.detection_data = Some(detections);
            record
        })
        .collect()
}
