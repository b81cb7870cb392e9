/// Diverging colour ramp for a distortion ratio.
///
/// The ratio is shifted by `-0.5` and clamped to `[0, 1]`, so a ratio of `1`
/// (no distortion) lands on white in the middle of the ramp. Compression runs
/// through blues, stretching through reds.
pub fn error_color(ratio: f64) -> [f32; 3] {
    const STOPS: [(f64, [f64; 3]); 5] = [
        (0.0, [0.0, 0.114, 0.549]),
        (0.45, [0.161, 0.3333, 1.0]),
        (0.5, [1.0, 1.0, 1.0]),
        (0.55, [1.0, 0.157, 0.2]),
        (1.0, [0.557, 0.0, 0.016]),
    ];

    let t = (ratio - 0.5).clamp(0.0, 1.0);
    if t.is_nan() {
        return [0.0; 3];
    }
    let mut rgb = STOPS[STOPS.len() - 1].1;
    for pair in STOPS.windows(2) {
        let ((t0, c0), (t1, c1)) = (pair[0], pair[1]);
        if t <= t1 {
            let w = (t - t0) / (t1 - t0);
            rgb = [
                c0[0] * (1.0 - w) + c1[0] * w,
                c0[1] * (1.0 - w) + c1[1] * w,
                c0[2] * (1.0 - w) + c1[2] * w,
            ];
            break;
        }
    }
    rgb.map(|c| c as f32)
}
