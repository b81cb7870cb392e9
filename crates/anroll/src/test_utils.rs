//! Synthetic contour profiles shared by unit tests.

use crate::contour::ContourSamples;

/// Straight-walled profile `R(h) = r0 + k h` over `[0, height]`.
///
/// `k = 0` is a cylinder. The arc length is the slant length `h √(1 + k²)`.
pub(crate) fn cone_samples(n: usize, r0: f64, k: f64, height: f64) -> ContourSamples {
    let slant = (1.0 + k * k).sqrt();
    let hs: Vec<f64> = (0..n)
        .map(|i| height * i as f64 / (n - 1) as f64)
        .collect();
    let arcs = hs.iter().map(|h| h * slant).collect();
    let radii = hs.iter().map(|h| r0 + k * h).collect();
    ContourSamples::new(hs, arcs, radii)
}

/// Bulging vase profile `R(h) = 60 + 20 sin(π h / H) + 0.1 h`.
///
/// Arc lengths are accumulated on a fine polyline between samples.
pub(crate) fn vase_samples(n: usize, height: f64) -> ContourSamples {
    let radius = |h: f64| 60.0 + 20.0 * (std::f64::consts::PI * h / height).sin() + 0.1 * h;
    const SUB: usize = 64;

    let mut hs = Vec::with_capacity(n);
    let mut arcs = Vec::with_capacity(n);
    let mut radii = Vec::with_capacity(n);
    let mut arc = 0.0;
    let mut prev_h = 0.0;
    for i in 0..n {
        let h = height * i as f64 / (n - 1) as f64;
        for s in 1..=SUB {
            let h0 = prev_h + (h - prev_h) * (s - 1) as f64 / SUB as f64;
            let h1 = prev_h + (h - prev_h) * s as f64 / SUB as f64;
            arc += ((h1 - h0).powi(2) + (radius(h1) - radius(h0)).powi(2)).sqrt();
        }
        prev_h = h;
        hs.push(h);
        arcs.push(arc);
        radii.push(radius(h));
    }
    ContourSamples::new(hs, arcs, radii)
}
