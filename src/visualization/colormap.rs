//! Continuous colour scales for temperature and ODBA.

use plotters::style::colors::colormaps::ViridisRGB;
use plotters::style::RGBColor;

use crate::core::transforms::{finite_range, percentile_bounds};

/// Perceptually uniform palettes. Viridis comes from plotters; plasma is not
/// shipped there and is sampled from nine evenly spaced stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Palette {
    Viridis,
    Plasma,
}

const PLASMA: [(u8, u8, u8); 9] = [
    (13, 8, 135),
    (76, 2, 161),
    (126, 3, 168),
    (169, 35, 149),
    (204, 71, 120),
    (229, 107, 93),
    (248, 149, 64),
    (253, 197, 39),
    (240, 249, 33),
];

impl Palette {
    /// Colour at `t` in 0..=1 (clamped, NaN maps to 0).
    pub fn sample(&self, t: f64) -> RGBColor {
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
        match self {
            Palette::Viridis => ViridisRGB::get_color(t),
            Palette::Plasma => interpolate(&PLASMA, t),
        }
    }
}

/// Linear interpolation between evenly spaced stops.
fn interpolate(stops: &[(u8, u8, u8)], t: f64) -> RGBColor {
    let pos = t * (stops.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = (lo + 1).min(stops.len() - 1);
    let frac = pos - lo as f64;

    let lerp = |a: u8, b: u8| -> u8 { (a as f64 + (b as f64 - a as f64) * frac).round() as u8 };
    let (a, b) = (stops[lo], stops[hi]);
    RGBColor(lerp(a.0, b.0), lerp(a.1, b.1), lerp(a.2, b.2))
}

/// Maps data values onto a palette over `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorScale {
    pub palette: Palette,
    pub min: f64,
    pub max: f64,
}

impl ColorScale {
    /// A flat range is widened by one unit each side so it stays drawable.
    pub fn new(palette: Palette, min: f64, max: f64) -> Self {
        let (min, max) = if (max - min).abs() < f64::EPSILON {
            (min - 1.0, max + 1.0)
        } else {
            (min.min(max), min.max(max))
        };
        Self { palette, min, max }
    }

    /// Scale spanning the full finite range of `values`.
    pub fn full_range(palette: Palette, values: &[f64]) -> Option<Self> {
        let (min, max) = finite_range(values)?;
        Some(Self::new(palette, min, max))
    }

    /// Scale clipped to the `low`..`high` percentiles of `values`.
    pub fn percentile_clipped(palette: Palette, values: &[f64], low: f64, high: f64) -> Option<Self> {
        let (min, max) = percentile_bounds(values, low, high)?;
        Some(Self::new(palette, min, max))
    }

    /// Position of `value` within the scale, clamped to 0..=1.
    pub fn normalize(&self, value: f64) -> f64 {
        ((value - self.min) / (self.max - self.min)).clamp(0.0, 1.0)
    }

    pub fn color(&self, value: f64) -> RGBColor {
        self.palette.sample(self.normalize(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_endpoints() {
        assert_eq!(Palette::Viridis.sample(0.0), RGBColor(68, 1, 84));
        assert_eq!(Palette::Viridis.sample(1.0), RGBColor(254, 232, 37));
        assert_eq!(Palette::Viridis.sample(7.5), RGBColor(254, 232, 37));
        assert_eq!(Palette::Plasma.sample(-3.0), RGBColor(13, 8, 135));
        assert_eq!(Palette::Plasma.sample(f64::NAN), RGBColor(13, 8, 135));
    }

    #[test]
    fn test_palette_midpoint_interpolation() {
        // Halfway between stops 0 and 1 of plasma
        let c = Palette::Plasma.sample(1.0 / 16.0);
        assert_eq!(c, RGBColor(45, 5, 148));
    }

    #[test]
    fn test_percentile_scale_clips_outliers() {
        let mut values: Vec<f64> = (0..=100).map(|v| v as f64).collect();
        values.push(10_000.0);

        let scale = ColorScale::percentile_clipped(Palette::Plasma, &values, 2.0, 98.0).unwrap();
        assert!(scale.max < 100.0);
        assert_eq!(scale.normalize(10_000.0), 1.0);
        assert_eq!(scale.normalize(-5.0), 0.0);
        assert_eq!(scale.color(10_000.0), Palette::Plasma.sample(1.0));
    }

    #[test]
    fn test_full_range_scale() {
        let scale = ColorScale::full_range(Palette::Viridis, &[22.0, f64::NAN, 26.0]).unwrap();
        assert_eq!((scale.min, scale.max), (22.0, 26.0));
        assert_eq!(scale.normalize(24.0), 0.5);
        assert!(ColorScale::full_range(Palette::Viridis, &[]).is_none());
    }

    #[test]
    fn test_flat_scale_is_widened() {
        let scale = ColorScale::new(Palette::Viridis, 5.0, 5.0);
        assert_eq!((scale.min, scale.max), (4.0, 6.0));
        assert_eq!(scale.normalize(5.0), 0.5);
    }
}
