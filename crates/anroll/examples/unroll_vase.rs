use anroll::{ContourSamples, Engine, OptimizerConfig, Param, ParamKey, Parameters};
use std::error::Error;

/// Bulging vase silhouette, 200 units tall.
fn vase_profile(n: usize) -> ContourSamples {
    let height = 200.0;
    let radius = |h: f64| 70.0 + 18.0 * (std::f64::consts::PI * h / height).sin() - 0.05 * h;
    let mut hs = Vec::with_capacity(n);
    let mut arcs = Vec::with_capacity(n);
    let mut radii = Vec::with_capacity(n);
    let mut arc = 0.0;
    for i in 0..n {
        let h = height * i as f64 / (n - 1) as f64;
        if i > 0 {
            let ph = height * (i - 1) as f64 / (n - 1) as f64;
            arc += ((h - ph).powi(2) + (radius(h) - radius(ph)).powi(2)).sqrt();
        }
        hs.push(h);
        arcs.push(arc);
        radii.push(radius(h));
    }
    ContourSamples::new(hs, arcs, radii)
}

fn main() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = std::env::args().collect();

    let mut engine = Engine::new(&vase_profile(300), Parameters::default())?
        .with_optimizer_config(OptimizerConfig {
            max_seconds: 3.0,
            grid_size: 40,
            ..OptimizerConfig::default()
        });

    let before = engine.map_errors()?;
    let weights = engine.parameters().error_weights();
    println!(
        "Initial weighted distortion: {:.5}",
        before.total_weighted_error(&weights)
    );

    engine.set(Param::flag(ParamKey::OptimizeInterpolationTarget, true)?);
    engine.set(Param::flag(ParamKey::OptimizeShapeFactor, true)?);
    let report = engine.optimize()?;
    for (dim, value) in &report.values {
        println!("  {} = {:.5}", dim.name(), value);
    }
    println!(
        "Optimized weighted distortion: {:.5} ({} evaluations)",
        report.objective, report.evaluations
    );

    if let Some(out_path) = args.get(1) {
        let mesh = engine.map_image(None)?;
        let json = serde_json::to_string_pretty(&mesh)?;
        std::fs::write(out_path, json)?;
        println!("Wrote {out_path}");
    }
    Ok(())
}
