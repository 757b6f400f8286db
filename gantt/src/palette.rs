use plotters::style::RGBColor;

/// Evenly spaced stops of the viridis colormap, dark to light.
pub const VIRIDIS: &[RGBColor] = &[
    RGBColor(0x44, 0x01, 0x54),
    RGBColor(0x47, 0x2d, 0x7b),
    RGBColor(0x3b, 0x52, 0x8b),
    RGBColor(0x2c, 0x72, 0x8e),
    RGBColor(0x21, 0x91, 0x8c),
    RGBColor(0x28, 0xae, 0x80),
    RGBColor(0x5e, 0xc9, 0x62),
    RGBColor(0xad, 0xdc, 0x30),
    RGBColor(0xfd, 0xe7, 0x25),
];

/// Color at `position` in `0.0..=1.0`, linearly interpolated between stops.
pub fn viridis(position: f64) -> RGBColor {
    let position = position.clamp(0.0, 1.0);
    let scaled = position * (VIRIDIS.len() - 1) as f64;
    let lower = scaled.floor() as usize;
    let upper = (lower + 1).min(VIRIDIS.len() - 1);
    let t = scaled - lower as f64;

    let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
    let (a, b) = (VIRIDIS[lower], VIRIDIS[upper]);
    RGBColor(mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}

/// `count` colors sampled at `linspace(0, 1, count)`.
pub fn sample(count: usize) -> Vec<RGBColor> {
    match count {
        0 => Vec::new(),
        1 => vec![viridis(0.0)],
        _ => (0..count)
            .map(|i| viridis(i as f64 / (count - 1) as f64))
            .collect(),
    }
}
