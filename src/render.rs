//! Image artifacts for finalized aggregates.
//!
//! A [`Chart`] borrows one finalized aggregate; a [`Renderer`] turns it into a
//! file. Charts are independent of each other and of the run that produced
//! them. An empty chart is never drawn: [`render_chart`] reports it as
//! [`Rendered::Skipped`] instead.
//!
//! The pure helpers [`histogram_bins`] and [`cloud_layout`] compute geometry
//! without touching a backend.

use crate::error::Notice;
use anyhow::{Context, Result};
use plotters::prelude::*;
use std::fs::create_dir_all;
use std::path::{Path, PathBuf};

pub const PUBLICATIONS_BY_YEAR: &str = "publications_by_year";
pub const TOP_SOURCES: &str = "top_sources";
pub const TITLE_WORDCLOUD: &str = "title_wordcloud";
pub const TITLE_WORD_COUNT_DIST: &str = "title_word_count_dist";
pub const FILTERED_PUBLICATIONS_BY_YEAR: &str = "filtered_publications_by_year";
pub const FILTERED_TOP_SOURCES: &str = "filtered_top_sources";

/// Base names of the images an analysis run produces.
pub const STATIC_IMAGES: [&str; 4] = [
    PUBLICATIONS_BY_YEAR,
    TOP_SOURCES,
    TITLE_WORDCLOUD,
    TITLE_WORD_COUNT_DIST,
];

/// A finalized aggregate ready to be drawn.
#[derive(Clone, Copy, Debug)]
pub enum Chart<'a> {
    /// Counts over ordered integer keys, drawn as a line with markers.
    TimeSeries {
        title: &'a str,
        x_label: &'a str,
        y_label: &'a str,
        points: &'a [(i32, u64)],
    },
    /// Labelled counts, drawn as horizontal bars, largest on top.
    Bar {
        title: &'a str,
        x_label: &'a str,
        y_label: &'a str,
        bars: &'a [(String, u64)],
    },
    /// Frequency-weighted words.
    Cloud {
        title: &'a str,
        words: &'a [(String, u64)],
    },
    /// Raw values binned into `bins` equal-width bins.
    Histogram {
        title: &'a str,
        x_label: &'a str,
        y_label: &'a str,
        values: &'a [u32],
        bins: usize,
    },
}

impl Chart<'_> {
    pub fn title(&self) -> &str {
        match self {
            Chart::TimeSeries { title, .. }
            | Chart::Bar { title, .. }
            | Chart::Cloud { title, .. }
            | Chart::Histogram { title, .. } => title,
        }
    }

    /// Truth that there is nothing to draw.
    pub fn is_empty(&self) -> bool {
        match self {
            Chart::TimeSeries { points, .. } => points.is_empty(),
            Chart::Bar { bars, .. } => bars.is_empty(),
            Chart::Cloud { words, .. } => words.is_empty(),
            Chart::Histogram { values, bins, .. } => values.is_empty() || *bins == 0,
        }
    }
}

/// Something that persists a chart as an image file.
pub trait Renderer {
    /// File extension of the produced images, without the dot.
    fn extension(&self) -> &'static str;

    /// Draw `chart` into `path`. Never called with an empty chart.
    fn render(&self, chart: &Chart<'_>, path: &Path) -> Result<()>;
}

/// Outcome of [`render_chart`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rendered {
    Written(PathBuf),
    Skipped(Notice),
}

/// Render `chart` as `dir/name.<ext>`, creating `dir` if needed.
///
/// # Errors
/// Directory creation or rendering failures.
pub fn render_chart(renderer: &dyn Renderer, chart: &Chart<'_>, dir: &Path, name: &str) -> Result<Rendered> {
    if chart.is_empty() {
        let notice = Notice::NoData(format!("nothing to plot for '{}'", chart.title()));
        log::warn!("{notice}");
        return Ok(Rendered::Skipped(notice));
    }
    create_dir_all(dir).with_context(|| format!("mkdir -p {}", dir.display()))?;
    let path = dir.join(format!("{name}.{}", renderer.extension()));
    renderer
        .render(chart, &path)
        .with_context(|| format!("render '{}' to {}", chart.title(), path.display()))?;
    log::info!("Saved plot: {}", path.display());
    Ok(Rendered::Written(path))
}

/// One histogram bin, `[lo, hi)` (the last bin also holds `hi`).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bin {
    pub lo: f64,
    pub hi: f64,
    pub count: u64,
}

/// Bin `values` into `bins` equal-width bins spanning `min..=max`.
///
/// When all values are equal the range is widened to `value ± 0.5`. Empty
/// input or zero bins give no bins.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn histogram_bins(values: &[u32], bins: usize) -> Vec<Bin> {
    let (Some(&min), Some(&max)) = (values.iter().min(), values.iter().max()) else {
        return Vec::new();
    };
    if bins == 0 {
        return Vec::new();
    }
    let (lo, hi) = if min == max {
        (f64::from(min) - 0.5, f64::from(max) + 0.5)
    } else {
        (f64::from(min), f64::from(max))
    };
    let width = (hi - lo) / bins as f64;
    let mut out: Vec<Bin> = (0..bins)
        .map(|i| Bin {
            lo: lo + width * i as f64,
            hi: lo + width * (i + 1) as f64,
            count: 0,
        })
        .collect();
    for &v in values {
        let i = (((f64::from(v) - lo) / width) as usize).min(bins - 1);
        out[i].count += 1;
    }
    out
}

/// A word placed by [`cloud_layout`]; `(x, y)` is the top-left corner.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedWord {
    pub text: String,
    pub x: i32,
    pub y: i32,
    pub size: u32,
}

const CLOUD_MIN_FONT: f64 = 12.0;
const CLOUD_MAX_FONT: f64 = 72.0;

/// Estimated box of `text` at `size` px.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn word_box(text: &str, size: u32) -> (i32, i32) {
    let w = (f64::from(size) * 0.6 * text.chars().count() as f64).ceil() as i32;
    (w, size as i32)
}

/// Place `words` (most frequent first) on a `width × height` canvas.
///
/// Font size grows with the square root of the frequency. Each word walks an
/// Archimedean spiral from the centre until its box hits no placed word;
/// words that do not fit are left out. The layout is deterministic.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss, clippy::cast_sign_loss)]
pub fn cloud_layout(words: &[(String, u64)], width: u32, height: u32) -> Vec<PlacedWord> {
    let Some(max) = words.iter().map(|(_, n)| *n).max().filter(|&m| m > 0) else {
        return Vec::new();
    };
    let (cx, cy) = (f64::from(width) / 2.0, f64::from(height) / 2.0);
    let mut placed: Vec<PlacedWord> = Vec::with_capacity(words.len());
    let overlaps = |placed: &[PlacedWord], x: i32, y: i32, w: i32, h: i32| {
        placed.iter().any(|p| {
            let (pw, ph) = word_box(&p.text, p.size);
            x < p.x + pw && p.x < x + w && y < p.y + ph && p.y < y + h
        })
    };

    for (text, count) in words {
        let scale = (*count as f64 / max as f64).sqrt();
        let size = (CLOUD_MIN_FONT + (CLOUD_MAX_FONT - CLOUD_MIN_FONT) * scale).round() as u32;
        let (w, h) = word_box(text, size);
        let mut t = 0.0_f64;
        while t < 200.0 * std::f64::consts::PI {
            let r = 2.0 * t;
            let x = (cx + r * t.cos()) as i32 - w / 2;
            let y = (cy + r * t.sin()) as i32 - h / 2;
            if x >= 0
                && y >= 0
                && x + w <= width as i32
                && y + h <= height as i32
                && !overlaps(&placed, x, y, w, h)
            {
                placed.push(PlacedWord {
                    text: text.clone(),
                    x,
                    y,
                    size,
                });
                break;
            }
            t += 0.1;
        }
    }
    placed
}

/// Plotters-backed SVG renderer.
#[derive(Clone, Copy, Debug)]
pub struct SvgRenderer {
    pub width: u32,
    pub height: u32,
}

impl Default for SvgRenderer {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 600,
        }
    }
}

const PALETTE: [RGBColor; 6] = [
    RGBColor(68, 1, 84),
    RGBColor(59, 82, 139),
    RGBColor(33, 145, 140),
    RGBColor(94, 201, 98),
    RGBColor(253, 231, 37),
    RGBColor(49, 104, 142),
];

impl Renderer for SvgRenderer {
    fn extension(&self) -> &'static str {
        "svg"
    }

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    fn render(&self, chart: &Chart<'_>, path: &Path) -> Result<()> {
        let root = SVGBackend::new(path, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE)?;

        match *chart {
            Chart::TimeSeries {
                title,
                x_label,
                y_label,
                points,
            } => {
                let (first, last) = (points[0].0, points[points.len() - 1].0);
                // A single key still needs a non-empty axis.
                let (first, last) = match (last > first, first.checked_add(1)) {
                    (true, _) => (first, last),
                    (false, Some(next)) => (first, next),
                    (false, None) => (first - 1, first),
                };
                let top = points.iter().map(|(_, n)| *n).max().unwrap_or(0) as f64;
                let mut cc = ChartBuilder::on(&root)
                    .caption(title, ("sans-serif", 28))
                    .margin(15)
                    .x_label_area_size(40)
                    .y_label_area_size(70)
                    .build_cartesian_2d(first..last, 0f64..(top * 1.1).max(1.0))?;
                cc.configure_mesh()
                    .x_desc(x_label)
                    .y_desc(y_label)
                    .x_label_formatter(&|y| y.to_string())
                    .draw()?;
                let series: Vec<(i32, f64)> = points.iter().map(|&(x, n)| (x, n as f64)).collect();
                cc.draw_series(LineSeries::new(series.iter().copied(), &PALETTE[1]))?;
                cc.draw_series(series.iter().map(|&p| Circle::new(p, 3, PALETTE[1].filled())))?;
            }
            Chart::Bar {
                title,
                x_label,
                y_label,
                bars,
            } => {
                let top = bars.iter().map(|(_, n)| *n).max().unwrap_or(0) as f64;
                let n = bars.len() as i32;
                let labels: Vec<&str> = bars.iter().map(|(l, _)| l.as_str()).collect();
                let mut cc = ChartBuilder::on(&root)
                    .caption(title, ("sans-serif", 28))
                    .margin(15)
                    .x_label_area_size(40)
                    .y_label_area_size(200)
                    .build_cartesian_2d(0f64..(top * 1.05).max(1.0), 0..n)?;
                // Row 0 is the bottom of the plot; the largest bar goes on top.
                let label_of = |row: &i32| {
                    usize::try_from(n - 1 - *row)
                        .ok()
                        .and_then(|i| labels.get(i))
                        .map(|l| (*l).to_string())
                        .unwrap_or_default()
                };
                cc.configure_mesh()
                    .disable_y_mesh()
                    .x_desc(x_label)
                    .y_desc(y_label)
                    .y_labels(bars.len())
                    .y_label_formatter(&label_of)
                    .draw()?;
                cc.draw_series(bars.iter().enumerate().map(|(i, (_, count))| {
                    let row = n - 1 - i as i32;
                    let color = PALETTE[i % PALETTE.len()];
                    Rectangle::new([(0.0, row), (*count as f64, row + 1)], color.filled())
                }))?;
            }
            Chart::Cloud { title, words } => {
                root.draw(&Text::new(title.to_string(), (10, 10), ("sans-serif", 24).into_font()))?;
                let top_margin = 40;
                let placed = cloud_layout(words, self.width, self.height.saturating_sub(top_margin));
                for (i, word) in placed.iter().enumerate() {
                    let style = ("sans-serif", word.size as i32)
                        .into_font()
                        .color(&PALETTE[i % PALETTE.len()]);
                    root.draw(&Text::new(
                        word.text.clone(),
                        (word.x, word.y + top_margin as i32),
                        style,
                    ))?;
                }
            }
            Chart::Histogram {
                title,
                x_label,
                y_label,
                values,
                bins,
            } => {
                let bins = histogram_bins(values, bins);
                let (lo, hi) = (bins[0].lo, bins[bins.len() - 1].hi);
                let top = bins.iter().map(|b| b.count).max().unwrap_or(0) as f64;
                let mut cc = ChartBuilder::on(&root)
                    .caption(title, ("sans-serif", 28))
                    .margin(15)
                    .x_label_area_size(40)
                    .y_label_area_size(70)
                    .build_cartesian_2d(lo..hi, 0f64..(top * 1.1).max(1.0))?;
                cc.configure_mesh()
                    .disable_x_mesh()
                    .x_desc(x_label)
                    .y_desc(y_label)
                    .draw()?;
                cc.draw_series(bins.iter().map(|b| {
                    Rectangle::new([(b.lo, 0.0), (b.hi, b.count as f64)], PALETTE[2].mix(0.7).filled())
                }))?;
                cc.draw_series(bins.iter().map(|b| {
                    Rectangle::new([(b.lo, 0.0), (b.hi, b.count as f64)], BLACK.stroke_width(1))
                }))?;
            }
        }

        root.present()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bins_cover_min_to_max() {
        let bins = histogram_bins(&[1, 2, 2, 3, 10], 3);
        assert_eq!(bins.len(), 3);
        assert_eq!(bins[0].lo, 1.0);
        assert_eq!(bins[2].hi, 10.0);
        assert_eq!(bins.iter().map(|b| b.count).sum::<u64>(), 5);
        assert_eq!(bins[0].count, 4);
        assert_eq!(bins[2].count, 1);
    }

    #[test]
    fn constant_values_fall_in_one_bin() {
        let bins = histogram_bins(&[7, 7, 7], 4);
        assert_eq!(bins.iter().map(|b| b.count).sum::<u64>(), 3);
        assert!(bins.iter().any(|b| b.count == 3));
        assert!(histogram_bins(&[], 4).is_empty());
        assert!(histogram_bins(&[1], 0).is_empty());
    }

    #[test]
    fn cloud_words_stay_inside_and_do_not_overlap() {
        let words: Vec<(String, u64)> = ["virus", "cell", "protein", "covid", "respiratory"]
            .iter()
            .enumerate()
            .map(|(i, w)| ((*w).to_string(), 50 - 10 * i as u64))
            .collect();
        let placed = cloud_layout(&words, 600, 300);
        assert_eq!(placed.len(), words.len());
        assert!(placed[0].size > placed[4].size);
        for (i, a) in placed.iter().enumerate() {
            let (aw, ah) = word_box(&a.text, a.size);
            assert!(a.x >= 0 && a.y >= 0 && a.x + aw <= 600 && a.y + ah <= 300);
            for b in &placed[i + 1..] {
                let (bw, bh) = word_box(&b.text, b.size);
                let disjoint = a.x + aw <= b.x || b.x + bw <= a.x || a.y + ah <= b.y || b.y + bh <= a.y;
                assert!(disjoint, "{} overlaps {}", a.text, b.text);
            }
        }
        assert_eq!(placed, cloud_layout(&words, 600, 300));
    }
}
