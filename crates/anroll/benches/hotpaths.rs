use std::f64::consts::PI;

use anroll::{
    compute_shape_bounds, BlendCurve, ContourModel, ContourSamples, DistortionEstimator, Engine,
    Mapper, MappingParams, MappingTable, Parameters, DEFAULT_JITTER,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{Rgba, RgbaImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Vase silhouette with a little radius noise, as a traced contour would be.
fn make_profile_fixture(n: usize, seed: u64) -> ContourSamples {
    let height = 240.0;
    let mut rng = StdRng::seed_from_u64(seed);
    let mut hs = Vec::with_capacity(n);
    let mut arcs = Vec::with_capacity(n);
    let mut radii = Vec::with_capacity(n);
    let mut arc = 0.0;
    let mut prev: Option<(f64, f64)> = None;

    for i in 0..n {
        let h = height * i as f64 / (n - 1) as f64;
        let r = 90.0 + 25.0 * (PI * h / height).sin() - 0.08 * h + rng.gen_range(-0.3..0.3);
        if let Some((ph, pr)) = prev {
            arc += ((h - ph).powi(2) + (r - pr).powi(2)).sqrt();
        }
        prev = Some((h, r));
        hs.push(h);
        arcs.push(arc);
        radii.push(r);
    }
    ContourSamples::new(hs, arcs, radii)
}

fn make_photo_fixture(width: u32, height: u32, seed: u64) -> RgbaImage {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut img = RgbaImage::new(width, height);
    for (x, y, px) in img.enumerate_pixels_mut() {
        let v = 128.0 + 60.0 * ((x as f64 * 0.02).sin() * (y as f64 * 0.015).cos());
        let n: f64 = rng.gen_range(-4.0..4.0);
        let c = (v + n).clamp(0.0, 255.0) as u8;
        *px = Rgba([c, c / 2, 255 - c, 255]);
    }
    img
}

fn fitted_model() -> (ContourModel, BlendCurve) {
    let params = Parameters::default();
    let mut contour = ContourModel::fit(&make_profile_fixture(400, 11), params.spline_smoothing)
        .expect("deterministic fixture should always fit");
    contour.set_crop(0.05, 0.05);
    contour.refit_linear_approximation();
    let mut blend = BlendCurve::new(params.interpolation_target, params.shape_factor);
    blend.set_bounds(compute_shape_bounds(
        &contour,
        params.interpolation_target,
        params.restrict_shape,
        512,
    ));
    (contour, blend)
}

fn bench_contour_fit(c: &mut Criterion) {
    let samples = make_profile_fixture(400, 3);
    c.bench_function("contour_fit_400pts", |b| {
        b.iter(|| {
            let model = ContourModel::fit(black_box(&samples), 1e-3)
                .expect("deterministic fixture should always fit");
            black_box(model.arc_length())
        })
    });
}

fn bench_shape_bounds(c: &mut Criterion) {
    let (contour, _) = fitted_model();
    c.bench_function("shape_bounds_512rows", |b| {
        b.iter(|| black_box(compute_shape_bounds(black_box(&contour), 0.6, true, 512)))
    });
}

fn bench_mapping_table(c: &mut Criterion) {
    let (contour, blend) = fitted_model();
    let mut params = MappingParams::from(&Parameters::default());

    c.bench_function("mapping_table_500x500", |b| {
        let mapper = Mapper::new(&contour, &blend, params);
        b.iter(|| black_box(MappingTable::build(black_box(&mapper), 500, 500).width()))
    });

    params.enforce_isotropy = true;
    c.bench_function("mapping_table_500x500_isotropic", |b| {
        let mapper = Mapper::new(&contour, &blend, params);
        b.iter(|| black_box(MappingTable::build(black_box(&mapper), 500, 500).width()))
    });
}

fn bench_distortion(c: &mut Criterion) {
    let (contour, blend) = fitted_model();
    let params = MappingParams::from(&Parameters::default());

    c.bench_function("distortion_100x100", |b| {
        let estimator = DistortionEstimator::new(Mapper::new(&contour, &blend, params));
        b.iter(|| {
            let map = estimator.evaluate(100, 100, black_box(DEFAULT_JITTER));
            black_box(map.metric_totals())
        })
    });
}

fn bench_image_pass(c: &mut Criterion) {
    let photo = make_photo_fixture(1280, 960, 5);
    let mut engine = Engine::new(&make_profile_fixture(400, 13), Parameters::default())
        .expect("deterministic fixture should always fit");

    c.bench_function("image_pass_1280x960", |b| {
        b.iter(|| {
            let mesh = engine
                .map_image(Some(black_box(&photo)))
                .expect("default crop is valid");
            black_box(mesh.triangles.len())
        })
    });
}

criterion_group!(
    hotpaths,
    bench_contour_fit,
    bench_shape_bounds,
    bench_mapping_table,
    bench_distortion,
    bench_image_pass
);
criterion_main!(hotpaths);
