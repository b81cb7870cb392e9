//! anroll CLI — unroll photographs of vessels from a contour profile.

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};

use anroll::{
    ContourSamples, Engine, ErrorKind, OptimizerConfig, Param, ParamKey, Parameters, SweepAxis,
};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "anroll")]
#[command(about = "Develop curved-surface photographs onto a flat plane")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile a session and print the blend shape bounds.
    Bounds(SessionArgs),

    /// Run the image mapping pass and write the mesh as JSON.
    Map(CliMapArgs),

    /// Compute the distortion map and write it as JSON.
    Errors(CliErrorsArgs),

    /// Minimize the weighted distortion and print the result.
    Optimize(CliOptimizeArgs),

    /// Print per-metric error totals over a parameter grid.
    Sweep(CliSweepArgs),
}

#[derive(Debug, Clone, Args)]
struct SessionArgs {
    /// Contour profile JSON (`height`, `arc_length`, `radius` arrays).
    #[arg(long)]
    contour: PathBuf,

    /// Parameter JSON; missing fields take their defaults.
    #[arg(long)]
    params: Option<PathBuf>,

    /// Parameter override `name=value`, applied after `--params`.
    #[arg(long = "set", value_name = "NAME=VALUE")]
    overrides: Vec<String>,
}

#[derive(Debug, Clone, Args)]
struct CliMapArgs {
    #[command(flatten)]
    session: SessionArgs,

    /// Source photograph; colours are sampled from it when given.
    #[arg(long)]
    image: Option<PathBuf>,

    /// Path to write the mapped mesh (JSON).
    #[arg(long)]
    out: PathBuf,

    /// Path to write the grid overlay polylines (JSON).
    #[arg(long)]
    grid_out: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ErrorKindArg {
    Horizontal,
    Vertical,
    Combined,
    Relative,
    Angular,
}

impl ErrorKindArg {
    fn to_core(self) -> ErrorKind {
        match self {
            Self::Horizontal => ErrorKind::Horizontal,
            Self::Vertical => ErrorKind::Vertical,
            Self::Combined => ErrorKind::Combined,
            Self::Relative => ErrorKind::Relative,
            Self::Angular => ErrorKind::Angular,
        }
    }
}

#[derive(Debug, Clone, Args)]
struct CliErrorsArgs {
    #[command(flatten)]
    session: SessionArgs,

    /// Path to write the distortion map (JSON).
    #[arg(long)]
    out: PathBuf,

    /// Also write the coloured error mesh for one metric.
    #[arg(long, value_enum)]
    mesh: Option<ErrorKindArg>,

    /// Path for the coloured error mesh (JSON).
    #[arg(long, requires = "mesh")]
    mesh_out: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct CliOptimizeArgs {
    #[command(flatten)]
    session: SessionArgs,

    /// Optimize the interpolation target.
    #[arg(long = "if")]
    interpolation_target: bool,

    /// Optimize the shape factor.
    #[arg(long)]
    shape: bool,

    /// Optimize the radius scale.
    #[arg(long)]
    radius: bool,

    /// Wall-clock limit in seconds.
    #[arg(long, default_value = "10.0")]
    seconds: f64,

    /// Side of the square evaluation grid.
    #[arg(long, default_value = "100")]
    grid: usize,

    /// Seed of the multistart sampler.
    #[arg(long)]
    seed: Option<u64>,

    /// Path to write the report (JSON).
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct CliSweepArgs {
    #[command(flatten)]
    session: SessionArgs,

    /// Interpolation target range: LO HI STEPS.
    #[arg(long, num_args = 3, value_names = ["LO", "HI", "STEPS"])]
    if_range: Option<Vec<f64>>,

    /// Shape factor range: LO HI STEPS. Omitted: flat blend curve.
    #[arg(long, num_args = 3, value_names = ["LO", "HI", "STEPS"])]
    shape_range: Option<Vec<f64>>,

    /// Radius scale range: LO HI STEPS.
    #[arg(long, num_args = 3, value_names = ["LO", "HI", "STEPS"])]
    radius_range: Option<Vec<f64>>,
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Bounds(args) => run_bounds(&args),
        Commands::Map(args) => run_map(&args),
        Commands::Errors(args) => run_errors(&args),
        Commands::Optimize(args) => run_optimize(&args),
        Commands::Sweep(args) => run_sweep(&args),
    }
}

// ── Session setup ──────────────────────────────────────────────────────

fn open_session(args: &SessionArgs) -> CliResult<Engine> {
    tracing::info!("Loading contour: {}", args.contour.display());
    let samples = ContourSamples::from_json_file(&args.contour).map_err(|e| -> CliError {
        format!("Failed to load contour {}: {}", args.contour.display(), e).into()
    })?;
    let params = match &args.params {
        Some(path) => Parameters::from_json_file(path).map_err(|e| -> CliError {
            format!("Failed to load parameters {}: {}", path.display(), e).into()
        })?,
        None => Parameters::default(),
    };

    let mut engine = Engine::new(&samples, params)?;
    for text in &args.overrides {
        let param = Param::parse_assignment(text)
            .map_err(|e| -> CliError { format!("--set {}: {}", text, e).into() })?;
        engine.set(param);
    }
    Ok(engine)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> CliResult<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    tracing::info!("Results written to {}", path.display());
    Ok(())
}

// ── bounds ─────────────────────────────────────────────────────────────

fn run_bounds(args: &SessionArgs) -> CliResult<()> {
    let mut engine = open_session(args)?;
    let flags = engine.reconcile()?;

    let fit = engine.contour().linear_fit();
    let bounds = engine.shape_bounds();
    println!("anroll session");
    println!("  arc length:     {:.3}", engine.contour().arc_length());
    println!("  linear fit:     r = {:.6} * a + {:.3}", fit.slope, fit.intercept);
    println!("  shape bounds:   [{:.6}, {:.6}]", bounds.min, bounds.max);
    let (a, d) = engine.blend().coefficients();
    println!("  blend:          {:.6} * x^2 + {:.6}", a, d);
    println!(
        "  stale passes:   image={} grid={} errors={}",
        flags.image, flags.grid, flags.errors
    );
    for (name, value) in engine_feedback(&mut engine) {
        println!("  feedback {:<20} {}", name, value);
    }
    Ok(())
}

fn engine_feedback(engine: &mut Engine) -> Vec<(String, f64)> {
    engine
        .drain_feedback()
        .into_iter()
        .map(|e| (e.name, e.value))
        .collect()
}

// ── map ────────────────────────────────────────────────────────────────

fn run_map(args: &CliMapArgs) -> CliResult<()> {
    let mut engine = open_session(&args.session)?;

    let source = match &args.image {
        Some(path) => {
            tracing::info!("Loading image: {}", path.display());
            let img = image::open(path).map_err(|e| -> CliError {
                format!("Failed to open image {}: {}", path.display(), e).into()
            })?;
            Some(img.to_rgba8())
        }
        None => None,
    };

    let mesh = engine.map_image(source.as_ref())?;
    tracing::info!(
        "Mapped {}x{} points ({} triangles)",
        mesh.width,
        mesh.height,
        mesh.triangles.len()
    );
    write_json(&args.out, &mesh)?;

    if let Some(path) = &args.grid_out {
        let lines = engine.map_grid()?;
        write_json(path, &lines)?;
    }
    Ok(())
}

// ── errors ─────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ErrorReport<'a> {
    width: usize,
    height: usize,
    /// `[horizontal, vertical, relative, angular]` sums.
    totals: [f64; 4],
    weighted_total: f64,
    map: &'a anroll::DistortionMap,
}

fn run_errors(args: &CliErrorsArgs) -> CliResult<()> {
    let mut engine = open_session(&args.session)?;
    let map = engine.map_errors()?;
    let weights = engine.parameters().error_weights();

    let report = ErrorReport {
        width: map.width(),
        height: map.height(),
        totals: map.metric_totals(),
        weighted_total: map.total_weighted_error(&weights),
        map: &map,
    };
    tracing::info!(
        "Distortion {}x{}: weighted total {:.6}",
        report.width,
        report.height,
        report.weighted_total
    );
    write_json(&args.out, &report)?;

    if let (Some(kind), Some(path)) = (args.mesh, &args.mesh_out) {
        write_json(path, &map.render_data(kind.to_core()))?;
    }
    Ok(())
}

// ── optimize ───────────────────────────────────────────────────────────

fn run_optimize(args: &CliOptimizeArgs) -> CliResult<()> {
    let mut config = OptimizerConfig {
        max_seconds: args.seconds,
        grid_size: args.grid,
        ..OptimizerConfig::default()
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    let mut engine = open_session(&args.session)?.with_optimizer_config(config);

    for (on, key) in [
        (args.interpolation_target, ParamKey::OptimizeInterpolationTarget),
        (args.shape, ParamKey::OptimizeShapeFactor),
        (args.radius, ParamKey::OptimizeRadiusScale),
    ] {
        if on {
            engine.set(Param::flag(key, true)?);
        }
    }
    if engine.enabled_dimensions().is_empty() {
        return Err("enable at least one of --if, --shape, --radius".into());
    }

    let report = engine.optimize()?;
    for (dim, value) in &report.values {
        println!("{:<22} {}", dim.name(), value);
    }
    println!(
        "objective {:.6} after {} evaluations in {:.2}s ({:?})",
        report.objective, report.evaluations, report.elapsed_s, report.stop
    );
    if let Some(path) = &args.out {
        write_json(path, &report)?;
    }
    Ok(())
}

// ── sweep ──────────────────────────────────────────────────────────────

fn axis(range: &Option<Vec<f64>>, current: f64) -> SweepAxis {
    match range.as_deref() {
        Some([lo, hi, steps]) => SweepAxis::new(*lo, *hi, steps.max(1.0) as usize),
        _ => SweepAxis::fixed(current),
    }
}

fn run_sweep(args: &CliSweepArgs) -> CliResult<()> {
    let mut engine = open_session(&args.session)?;
    let params = engine.parameters().clone();
    let rows = engine.sweep(
        axis(&args.if_range, params.interpolation_target),
        axis(&args.shape_range, params.shape_factor),
        axis(&args.radius_range, params.radius_scale),
    )?;
    for row in &rows {
        println!("{}", row.to_line());
    }
    tracing::info!("{} configurations evaluated", rows.len());
    Ok(())
}
