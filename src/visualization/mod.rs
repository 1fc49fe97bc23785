//! Chart rendering for the biologging report.
//!
//! Four PNG charts are produced with plotters, each drawn over the same
//! day/night background bands:
//! - depth over time coloured by temperature
//! - binned ODBA over time with a moving average line
//! - depth over time coloured by ODBA
//! - per-axis acceleration coloured by ODBA
//!
//! The time axis is hours since the first sample, labelled with local
//! wall-clock time. Depth is drawn as negative pressure so the surface sits
//! at the top of the chart.

pub mod colormap;

use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters_bitmap::BitMapBackend;
use thiserror::Error;

use crate::config::PlotConfig;
use crate::core::loaders::Axis;
use crate::core::transforms::{finite_range, flatten_optional, from_hours, hours_since};
use crate::processors::daynight::{shading_spans, ShadeKind, ShadeSpan};
use crate::processors::pipeline::Analysis;
use colormap::{ColorScale, Palette};

/// Errors that can occur during visualization.
#[derive(Error, Debug)]
pub enum VisualizationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Plotting error: {0}")]
    PlottingError(String),

    #[error("Empty sample table")]
    EmptyTable,

    #[error("No finite values to plot for {0}")]
    NoData(&'static str),
}

/// Result type for visualization operations.
pub type Result<T> = std::result::Result<T, VisualizationError>;

/// Daylight band colour.
const DAY_SHADE: RGBAColor = RGBAColor(255, 221, 87, 0.22);

/// Night band colour.
const NIGHT_SHADE: RGBAColor = RGBAColor(25, 35, 80, 0.18);

/// Width reserved for the colour bar on the right.
const COLORBAR_WIDTH: u32 = 120;

/// File names written by [`render_all`].
pub const DEPTH_TEMPERATURE_PNG: &str = "depth_temperature.png";
pub const ODBA_BINNED_PNG: &str = "odba_minute.png";
pub const DEPTH_ODBA_PNG: &str = "depth_odba.png";
pub const ACCELERATION_PNG: &str = "acceleration_axes.png";

fn plot_err<E: std::fmt::Display>(e: E) -> VisualizationError {
    VisualizationError::PlottingError(e.to_string())
}

/// Maps timestamps onto the chart's x axis.
#[derive(Debug, Clone, Copy)]
pub struct TimeAxis {
    pub origin: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeAxis {
    pub fn new(origin: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { origin, end }
    }

    #[inline]
    pub fn to_x(&self, t: NaiveDateTime) -> f64 {
        hours_since(self.origin, t)
    }

    /// X range covering the deployment; at least one hour wide.
    pub fn range(&self) -> Range<f64> {
        let end = self.to_x(self.end).max(1.0);
        0.0..end
    }

    /// Wall-clock label for an x position.
    pub fn label(&self, x: f64) -> String {
        from_hours(self.origin, x).format("%d/%m %H:%M").to_string()
    }

    /// Clip a shading span to the visible range.
    pub fn clip(&self, span: &ShadeSpan) -> Option<(f64, f64)> {
        let range = self.range();
        let x0 = self.to_x(span.start).max(range.start);
        let x1 = self.to_x(span.end).min(range.end);
        (x1 > x0).then_some((x0, x1))
    }
}

/// Series of markers positioned in chart coordinates.
pub type ColoredPoints = Vec<(f64, f64, RGBColor)>;

/// Build markers for `ys` coloured by `color_values`.
///
/// Rows whose y or colour value is missing are skipped. Beyond
/// `max_points` (0 = unlimited) rows are stride-subsampled.
pub fn colored_points(
    axis: &TimeAxis,
    times: &[NaiveDateTime],
    ys: &[f64],
    color_values: &[f64],
    scale: &ColorScale,
    max_points: usize,
) -> ColoredPoints {
    let n = times.len();
    let step = if max_points > 0 && n > max_points {
        (n + max_points - 1) / max_points
    } else {
        1
    };

    (0..n)
        .step_by(step)
        .filter(|&i| ys[i].is_finite() && color_values[i].is_finite())
        .map(|i| (axis.to_x(times[i]), ys[i], scale.color(color_values[i])))
        .collect()
}

/// Y range of the finite values padded by 5% each side.
pub fn padded_range(values: &[f64]) -> Option<Range<f64>> {
    let (mut lo, mut hi) = finite_range(values)?;
    if (hi - lo).abs() < f64::EPSILON {
        lo -= 1.0;
        hi += 1.0;
    }
    let pad = (hi - lo) * 0.05;
    Some((lo - pad)..(hi + pad))
}

/// One chart panel: shaded background, coloured markers, optional line.
struct Panel<'a> {
    caption: Option<&'a str>,
    y_desc: &'a str,
    y_range: Range<f64>,
    /// Labels show -y (depth panels)
    negate_labels: bool,
    points: &'a [(f64, f64, RGBColor)],
    line: Option<&'a [(f64, f64)]>,
}

fn draw_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    panel: &Panel,
    axis: &TimeAxis,
    spans: &[ShadeSpan],
    style: &PlotConfig,
) -> Result<()> {
    let mut builder = ChartBuilder::on(area);
    builder
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(70);
    if let Some(caption) = panel.caption {
        builder.caption(caption, ("sans-serif", 26));
    }

    let mut chart = builder
        .build_cartesian_2d(axis.range(), panel.y_range.clone())
        .map_err(plot_err)?;

    let x_fmt = |x: &f64| axis.label(*x);
    let y_fmt = |y: &f64| {
        if panel.negate_labels {
            format!("{:.0}", -*y + 0.0)
        } else {
            format!("{:.2}", y)
        }
    };

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Local time")
        .y_desc(panel.y_desc)
        .x_labels(12)
        .x_label_formatter(&x_fmt)
        .y_label_formatter(&y_fmt)
        .draw()
        .map_err(plot_err)?;

    let (y_lo, y_hi) = (panel.y_range.start, panel.y_range.end);
    chart
        .draw_series(spans.iter().filter_map(|span| {
            let (x0, x1) = axis.clip(span)?;
            let color = match span.kind {
                ShadeKind::Day => DAY_SHADE,
                ShadeKind::Night => NIGHT_SHADE,
            };
            Some(Rectangle::new([(x0, y_lo), (x1, y_hi)], color.filled()))
        }))
        .map_err(plot_err)?;

    let size = style.point_size as i32;
    let alpha = style.alpha.clamp(0.0, 1.0);
    chart
        .draw_series(
            panel
                .points
                .iter()
                .map(|&(x, y, c)| Circle::new((x, y), size, c.mix(alpha).filled())),
        )
        .map_err(plot_err)?;

    if let Some(line) = panel.line {
        chart
            .draw_series(LineSeries::new(line.iter().copied(), BLACK.stroke_width(2)))
            .map_err(plot_err)?;
    }

    Ok(())
}

fn draw_colorbar<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    scale: &ColorScale,
    label: &str,
) -> Result<()> {
    let mut chart = ChartBuilder::on(area)
        .margin_top(50)
        .margin_bottom(60)
        .margin_right(10)
        .y_label_area_size(70)
        .build_cartesian_2d(0.0f64..1.0, scale.min..scale.max)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .disable_x_axis()
        .y_desc(label)
        .draw()
        .map_err(plot_err)?;

    let steps = 128;
    let span = scale.max - scale.min;
    chart
        .draw_series((0..steps).map(|i| {
            let v0 = scale.min + span * i as f64 / steps as f64;
            let v1 = scale.min + span * (i + 1) as f64 / steps as f64;
            Rectangle::new([(0.0, v0), (1.0, v1)], scale.color(v0).filled())
        }))
        .map_err(plot_err)?;

    Ok(())
}

/// Shared setup: white canvas split into plot area and colour bar.
fn with_canvas<'p, F>(output_path: &'p Path, style: &PlotConfig, draw: F) -> Result<()>
where
    F: FnOnce(
        &DrawingArea<BitMapBackend<'p>, Shift>,
        &DrawingArea<BitMapBackend<'p>, Shift>,
    ) -> Result<()>,
{
    let root = BitMapBackend::new(output_path, (style.width, style.height)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let split_at = style.width.saturating_sub(COLORBAR_WIDTH) as i32;
    let (main, bar) = root.split_horizontally(split_at);

    draw(&main, &bar)?;

    root.present().map_err(plot_err)?;
    Ok(())
}

fn time_axis(analysis: &Analysis) -> Result<TimeAxis> {
    let (start, end) = analysis
        .table
        .time_span()
        .ok_or(VisualizationError::EmptyTable)?;
    Ok(TimeAxis::new(start, end))
}

fn odba_scale(analysis: &Analysis, style: &PlotConfig) -> Result<ColorScale> {
    ColorScale::percentile_clipped(
        Palette::Plasma,
        &flatten_optional(analysis.odba()),
        style.percentile_low,
        style.percentile_high,
    )
    .ok_or(VisualizationError::NoData("ODBA"))
}

fn negated(values: &[f64]) -> Vec<f64> {
    values.iter().map(|v| -v).collect()
}

/// Depth over time, coloured by temperature over its full range.
pub fn plot_depth_temperature(output_path: &Path, analysis: &Analysis, style: &PlotConfig) -> Result<()> {
    let table = &analysis.table;
    let axis = time_axis(analysis)?;
    let spans = shading_spans(&analysis.intervals);

    let scale = ColorScale::full_range(Palette::Viridis, &table.temperature)
        .ok_or(VisualizationError::NoData("temperature"))?;

    let depth = negated(&table.pressure);
    let y_range = padded_range(&depth).ok_or(VisualizationError::NoData("pressure"))?;
    let points = colored_points(
        &axis,
        &table.timestamps,
        &depth,
        &table.temperature,
        &scale,
        style.max_points,
    );

    with_canvas(output_path, style, |main, bar| {
        draw_panel(
            main,
            &Panel {
                caption: Some("Depth and temperature"),
                y_desc: "Depth (dbar)",
                y_range,
                negate_labels: true,
                points: &points,
                line: None,
            },
            &axis,
            &spans,
            style,
        )?;
        draw_colorbar(bar, &scale, "Temperature (°C)")
    })
}

/// Binned ODBA with its moving average, markers coloured by ODBA.
pub fn plot_odba_binned(output_path: &Path, analysis: &Analysis, style: &PlotConfig) -> Result<()> {
    let binned = &analysis.odba_binned;
    let axis = time_axis(analysis)?;
    let spans = shading_spans(&analysis.intervals);

    let values = flatten_optional(&binned.values);
    let scale = ColorScale::percentile_clipped(
        Palette::Plasma,
        &values,
        style.percentile_low,
        style.percentile_high,
    )
    .ok_or(VisualizationError::NoData("binned ODBA"))?;

    let y_range = padded_range(&values).ok_or(VisualizationError::NoData("binned ODBA"))?;
    let points = colored_points(&axis, &binned.times, &values, &values, &scale, style.max_points);

    let line: Vec<(f64, f64)> = binned
        .times
        .iter()
        .zip(&analysis.odba_smoothed)
        .filter_map(|(&t, v)| v.map(|v| (axis.to_x(t), v)))
        .collect();

    with_canvas(output_path, style, |main, bar| {
        draw_panel(
            main,
            &Panel {
                caption: Some("ODBA (one-minute mean, moving average)"),
                y_desc: "ODBA (g)",
                y_range,
                negate_labels: false,
                points: &points,
                line: Some(line.as_slice()),
            },
            &axis,
            &spans,
            style,
        )?;
        draw_colorbar(bar, &scale, "ODBA (g)")
    })
}

/// Depth over time, coloured by percentile-clipped ODBA.
pub fn plot_depth_odba(output_path: &Path, analysis: &Analysis, style: &PlotConfig) -> Result<()> {
    let table = &analysis.table;
    let axis = time_axis(analysis)?;
    let spans = shading_spans(&analysis.intervals);
    let scale = odba_scale(analysis, style)?;

    let odba = flatten_optional(analysis.odba());
    let depth = negated(&table.pressure);
    let y_range = padded_range(&depth).ok_or(VisualizationError::NoData("pressure"))?;
    let points = colored_points(&axis, &table.timestamps, &depth, &odba, &scale, style.max_points);

    with_canvas(output_path, style, |main, bar| {
        draw_panel(
            main,
            &Panel {
                caption: Some("Depth and ODBA"),
                y_desc: "Depth (dbar)",
                y_range,
                negate_labels: true,
                points: &points,
                line: None,
            },
            &axis,
            &spans,
            style,
        )?;
        draw_colorbar(bar, &scale, "ODBA (g)")
    })
}

/// One row per acceleration axis, coloured by percentile-clipped ODBA.
pub fn plot_acceleration_axes(output_path: &Path, analysis: &Analysis, style: &PlotConfig) -> Result<()> {
    let table = &analysis.table;
    let axis = time_axis(analysis)?;
    let spans = shading_spans(&analysis.intervals);
    let scale = odba_scale(analysis, style)?;
    let odba = flatten_optional(analysis.odba());

    let mut rows = Vec::with_capacity(3);
    for acc_axis in Axis::ALL {
        let values = table.axis(acc_axis);
        let y_range = padded_range(values).ok_or(VisualizationError::NoData("acceleration"))?;
        let points = colored_points(&axis, &table.timestamps, values, &odba, &scale, style.max_points);
        rows.push((acc_axis, y_range, points));
    }

    with_canvas(output_path, style, |main, bar| {
        let areas = main.split_evenly((3, 1));
        for (area, (acc_axis, y_range, points)) in areas.iter().zip(&rows) {
            let y_desc = format!("Acc {} (g)", acc_axis.label());
            let caption = (*acc_axis == Axis::X).then_some("Acceleration by axis");
            draw_panel(
                area,
                &Panel {
                    caption,
                    y_desc: &y_desc,
                    y_range: y_range.clone(),
                    negate_labels: false,
                    points,
                    line: None,
                },
                &axis,
                &spans,
                style,
            )?;
        }
        draw_colorbar(bar, &scale, "ODBA (g)")
    })
}

/// Render all four charts into `output_dir`, returning the written paths.
///
/// Charts are independent: one that cannot be drawn (e.g. no ODBA value is
/// defined) is logged and skipped. Fails only when nothing could be written.
pub fn render_all(output_dir: &Path, analysis: &Analysis, style: &PlotConfig) -> Result<Vec<PathBuf>> {
    if analysis.table.is_empty() {
        return Err(VisualizationError::EmptyTable);
    }
    fs::create_dir_all(output_dir)?;

    let charts: [(&str, fn(&Path, &Analysis, &PlotConfig) -> Result<()>); 4] = [
        (DEPTH_TEMPERATURE_PNG, plot_depth_temperature),
        (ODBA_BINNED_PNG, plot_odba_binned),
        (DEPTH_ODBA_PNG, plot_depth_odba),
        (ACCELERATION_PNG, plot_acceleration_axes),
    ];

    let mut written = Vec::with_capacity(charts.len());
    let mut first_error = None;
    for (name, render) in charts {
        let path = output_dir.join(name);
        match render(&path, analysis, style) {
            Ok(()) => {
                log::info!("Wrote {}", path.display());
                written.push(path);
            }
            Err(e) => {
                log::warn!("Skipping {}: {}", name, e);
                first_error.get_or_insert(e);
            }
        }
    }

    match first_error {
        Some(e) if written.is_empty() => Err(e),
        _ => Ok(written),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::processors::pipeline::analyze;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    /// Hourly tag export starting 01/03/23 00:00.
    fn write_export(hours: usize) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Tag ID: 4321\nSampling: 1/h\nDeployment: test").unwrap();
        writeln!(file, "Date Time,Pressure,Temperature,Acc X,Acc Y,Acc Z").unwrap();
        for i in 0..hours {
            writeln!(
                file,
                "0{}/03/23 {:02}:00,{}.0,{}.5,0.05,-0.98,{}",
                1 + i / 24,
                i % 24,
                10 + i % 24,
                22 + i % 4,
                if i % 2 == 0 { "0.10" } else { "0.00" }
            )
            .unwrap();
        }
        file.flush().unwrap();
        file
    }

    fn small_style() -> PlotConfig {
        PlotConfig {
            width: 640,
            height: 480,
            ..PlotConfig::default()
        }
    }

    fn non_empty(path: &Path) -> bool {
        fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false)
    }

    #[test]
    fn test_render_all_writes_four_charts() {
        let file = write_export(48);
        let analysis = analyze(file.path(), &PipelineConfig::default()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("report");

        let written = render_all(&out, &analysis, &small_style()).unwrap();

        assert_eq!(written.len(), 4);
        for name in [DEPTH_TEMPERATURE_PNG, ODBA_BINNED_PNG, DEPTH_ODBA_PNG, ACCELERATION_PNG] {
            let path = out.join(name);
            assert!(written.contains(&path));
            assert!(non_empty(&path), "{} missing or empty", name);
        }
    }

    #[test]
    fn test_render_all_skips_charts_without_odba() {
        // Fewer rows than the ODBA window: no ODBA value is defined
        let file = write_export(3);
        let analysis = analyze(file.path(), &PipelineConfig::default()).unwrap();
        assert!(analysis.odba().iter().all(|v| v.is_none()));
        let dir = tempfile::tempdir().unwrap();

        let written = render_all(dir.path(), &analysis, &small_style()).unwrap();

        assert_eq!(written, vec![dir.path().join(DEPTH_TEMPERATURE_PNG)]);
        assert!(non_empty(&dir.path().join(DEPTH_TEMPERATURE_PNG)));
        assert!(!dir.path().join(DEPTH_ODBA_PNG).exists());
        assert!(!dir.path().join(ACCELERATION_PNG).exists());
    }

    #[test]
    fn test_time_axis_mapping() {
        let axis = TimeAxis::new(ts("2023-03-01 10:00"), ts("2023-03-02 10:00"));
        assert_eq!(axis.range(), 0.0..24.0);
        assert_eq!(axis.to_x(ts("2023-03-01 16:30")), 6.5);
        assert_eq!(axis.label(6.5), "01/03 16:30");
    }

    #[test]
    fn test_short_deployment_gets_one_hour_axis() {
        let axis = TimeAxis::new(ts("2023-03-01 10:00"), ts("2023-03-01 10:05"));
        assert_eq!(axis.range(), 0.0..1.0);
    }

    #[test]
    fn test_clip_spans() {
        let axis = TimeAxis::new(ts("2023-03-01 10:00"), ts("2023-03-02 10:00"));

        let partly_before = ShadeSpan {
            kind: ShadeKind::Day,
            start: ts("2023-03-01 06:30"),
            end: ts("2023-03-01 18:00"),
        };
        assert_eq!(axis.clip(&partly_before), Some((0.0, 8.0)));

        let outside = ShadeSpan {
            kind: ShadeKind::Night,
            start: ts("2023-03-02 18:00"),
            end: ts("2023-03-03 06:30"),
        };
        assert_eq!(axis.clip(&outside), None);
    }

    #[test]
    fn test_colored_points_skip_missing_and_subsample() {
        let axis = TimeAxis::new(ts("2023-03-01 10:00"), ts("2023-03-01 10:09"));
        let times: Vec<NaiveDateTime> = (0..10)
            .map(|i| ts("2023-03-01 10:00") + chrono::Duration::minutes(i))
            .collect();
        let ys: Vec<f64> = (0..10).map(|i| -(i as f64)).collect();
        let mut colors = vec![1.0; 10];
        colors[2] = f64::NAN;
        let scale = ColorScale::new(Palette::Viridis, 0.0, 2.0);

        let all = colored_points(&axis, &times, &ys, &colors, &scale, 0);
        assert_eq!(all.len(), 9);
        assert_eq!(all[0].1, 0.0);
        assert_eq!(all[0].2, Palette::Viridis.sample(0.5));

        // stride 2 keeps rows 0, 2, 4, 6, 8; row 2 has no colour
        let thinned = colored_points(&axis, &times, &ys, &colors, &scale, 5);
        assert_eq!(thinned.len(), 4);
    }

    #[test]
    fn test_padded_range() {
        let r = padded_range(&[0.0, 10.0, f64::NAN]).unwrap();
        assert_eq!(r, -0.5..10.5);
        let flat = padded_range(&[3.0, 3.0]).unwrap();
        assert!(flat.start < 3.0 && flat.end > 3.0);
        assert!(padded_range(&[f64::NAN]).is_none());
    }
}
