//! Headless exploration: sample, filter, preview and redraw.

use crate::config::{SampleConfig, ViewConfig};
use crate::error::Notice;
use crate::metrics::write_json;
use crate::record::{Paper, YEAR};
use crate::render::{
    Chart, FILTERED_PUBLICATIONS_BY_YEAR, FILTERED_TOP_SOURCES, Rendered, Renderer, STATIC_IMAGES,
    render_chart,
};
use crate::sample::sample;
use crate::view::{Filter, FilterOptions, filter, recompute};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Whether a static image of the analysis run is available.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageStatus {
    pub name: String,
    pub path: PathBuf,
    pub present: bool,
}

/// Everything the exploration surface shows for one filter state.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExploreReport {
    pub fraction: f64,
    pub rows_read: u64,
    pub sample_size: usize,
    pub options: FilterOptions,
    pub filter: Filter,
    pub filtered_rows: usize,
    pub preview: Vec<Paper>,
    pub images: Vec<ImageStatus>,
    pub by_year: Vec<(i32, u64)>,
    pub top_sources: Vec<(String, u64)>,
    pub rendered: Vec<PathBuf>,
    pub notices: Vec<Notice>,
}

/// Presence of each static image under `dir`.
pub fn image_status(dir: &Path, extension: &str) -> Vec<ImageStatus> {
    STATIC_IMAGES
        .iter()
        .map(|name| {
            let path = dir.join(format!("{name}.{extension}"));
            ImageStatus {
                name: (*name).to_string(),
                present: path.is_file(),
                path,
            }
        })
        .collect()
}

/// Load a sample, apply the view and build the report.
///
/// A missing or empty artifact yields a report holding only notices.
///
/// # Errors
/// Invalid configuration, hard read failures and rendering failures.
pub fn explore(sample_cfg: &SampleConfig, view: &ViewConfig, renderer: &dyn Renderer) -> Result<ExploreReport> {
    view.validate()?;
    let sample = sample(sample_cfg)?;
    let mut report = ExploreReport {
        fraction: sample_cfg.fraction,
        rows_read: sample.rows_read,
        sample_size: sample.len(),
        images: image_status(&view.image_dir, renderer.extension()),
        notices: sample.notices.clone(),
        ..ExploreReport::default()
    };
    for image in report.images.iter().filter(|i| !i.present) {
        let notice = Notice::Info(format!(
            "plot '{}' not available, run the analysis first",
            image.name
        ));
        log::warn!("{notice}");
        report.notices.push(notice);
    }
    if sample.is_empty() {
        return Ok(report);
    }

    let options = FilterOptions::from_sample(&sample);
    let mut chosen = options.default_filter();
    if view.year_range.is_some() {
        chosen.year_range = view.year_range;
    }
    if let Some(sources) = &view.sources {
        chosen.sources = Some(sources.iter().cloned().collect());
    }
    for notice in &options.notices {
        if !report.notices.contains(notice) {
            report.notices.push(notice.clone());
        }
    }

    let filtered = filter(&sample, &chosen);
    let summary = recompute(&filtered, &sample.source_field, view.top_sources);
    report.filtered_rows = filtered.len();
    report.preview = filtered
        .iter()
        .take(view.preview_rows)
        .map(|p| (*p).clone())
        .collect();
    report.by_year = summary.by_year;
    report.top_sources = summary.top_sources;
    report.options = options;
    report.filter = chosen;

    if let Some(dir) = &view.output_dir {
        let charts = [
            (
                FILTERED_PUBLICATIONS_BY_YEAR,
                Chart::TimeSeries {
                    title: "Filtered Publications by Year (Sample)",
                    x_label: "Year",
                    y_label: "Number of Papers (Sample)",
                    points: &report.by_year,
                },
            ),
            (
                FILTERED_TOP_SOURCES,
                Chart::Bar {
                    title: "Top Sources (Filtered Sample)",
                    x_label: "Number of Papers (Sample)",
                    y_label: "Source",
                    bars: &report.top_sources,
                },
            ),
        ];
        let mut rendered = Vec::new();
        let mut notices = Vec::new();
        for (name, chart) in &charts {
            match render_chart(renderer, chart, dir, name)? {
                Rendered::Written(path) => rendered.push(path),
                Rendered::Skipped(notice) => notices.push(notice),
            }
        }
        report.rendered = rendered;
        report.notices.extend(notices);
    }
    Ok(report)
}

impl ExploreReport {
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        write_json(path, self)
    }

    /// Text rendition of the report.
    pub fn print(&self) {
        println!(
            "Exploring a {:.1}% sample: {} of {} rows",
            self.fraction * 100.0,
            self.sample_size,
            self.rows_read
        );
        match self.filter.year_range {
            Some((first, last)) => println!("Showing {YEAR}s {first} to {last}"),
            None => println!("Showing all {YEAR}s"),
        }
        if let Some(sources) = self.filter.sources.as_ref().filter(|s| !s.is_empty()) {
            let names: Vec<&str> = sources.iter().map(String::as_str).collect();
            println!("Sources: {}", names.join(", "));
        }
        println!("Total papers in filtered sample: {}", self.filtered_rows);

        if !self.preview.is_empty() {
            println!("\nSample data (first {} rows):", self.preview.len());
            for paper in &self.preview {
                let year = paper.year.map(|y| y.to_string()).unwrap_or_default();
                let words = paper.title_word_count.map(|n| n.to_string()).unwrap_or_default();
                println!(
                    "  [{year:>4}] {} ({}; {words} words)",
                    paper.title,
                    paper.source.as_deref().unwrap_or("-")
                );
            }
        }
        if !self.by_year.is_empty() {
            println!("\nFiltered publications by year:");
            for (year, n) in &self.by_year {
                println!("  {year}: {n}");
            }
        }
        if !self.top_sources.is_empty() {
            println!("\nTop sources (filtered):");
            for (source, n) in &self.top_sources {
                println!("  {source}: {n}");
            }
        }
        for image in &self.images {
            let state = if image.present { "present" } else { "missing" };
            println!("image {}: {state} ({})", image.name, image.path.display());
        }
        for path in &self.rendered {
            println!("rendered {}", path.display());
        }
        for notice in &self.notices {
            println!("note: {notice}");
        }
    }
}
