use anyhow::Result;
use scholarstream::error::Notice;
use scholarstream::render::{Chart, Rendered, SvgRenderer, render_chart};
use scholarstream::testing::RecordingRenderer;
use std::fs;
use std::path::Path;

fn assert_svg(path: &Path) -> Result<()> {
    let text = fs::read_to_string(path)?;
    assert!(text.contains("<svg"), "{}", path.display());
    assert!(text.trim_end().ends_with("</svg>"), "{}", path.display());
    Ok(())
}

#[test]
fn svg_renderer_draws_every_chart_kind() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let renderer = SvgRenderer::default();
    let points = [(2019, 4), (2020, 10), (2021, 7)];
    let bars = [("PMC".to_string(), 9), ("WHO".to_string(), 3)];
    let words = [
        ("virus".to_string(), 40),
        ("cell".to_string(), 12),
        ("immune".to_string(), 3),
    ];
    let values = [1, 2, 2, 3, 9, 12];
    let charts = [
        (
            "series",
            Chart::TimeSeries {
                title: "By Year",
                x_label: "year",
                y_label: "papers",
                points: &points,
            },
        ),
        (
            "bars",
            Chart::Bar {
                title: "Top",
                x_label: "papers",
                y_label: "source",
                bars: &bars,
            },
        ),
        (
            "cloud",
            Chart::Cloud {
                title: "Words",
                words: &words,
            },
        ),
        (
            "hist",
            Chart::Histogram {
                title: "Lengths",
                x_label: "words",
                y_label: "frequency",
                values: &values,
                bins: 5,
            },
        ),
    ];
    for (name, chart) in &charts {
        let Rendered::Written(path) = render_chart(&renderer, chart, tmp.path(), name)? else {
            panic!("{name} was skipped");
        };
        assert_eq!(path, tmp.path().join(format!("{name}.svg")));
        assert_svg(&path)?;
    }
    Ok(())
}

#[test]
fn empty_charts_are_skipped_without_a_file() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let dir = tmp.path().join("images");
    let recorder = RecordingRenderer::default();
    let chart = Chart::TimeSeries {
        title: "Nothing",
        x_label: "x",
        y_label: "y",
        points: &[],
    };
    match render_chart(&recorder, &chart, &dir, "nothing")? {
        Rendered::Skipped(Notice::NoData(msg)) => assert!(msg.contains("Nothing")),
        other => panic!("unexpected outcome: {other:?}"),
    }
    let zero_bins = Chart::Histogram {
        title: "No bins",
        x_label: "x",
        y_label: "y",
        values: &[1, 2],
        bins: 0,
    };
    assert!(matches!(
        render_chart(&recorder, &zero_bins, &dir, "bins")?,
        Rendered::Skipped(_)
    ));
    assert!(recorder.titles().is_empty());
    assert!(!dir.exists());
    Ok(())
}

#[test]
fn single_year_series_at_the_top_of_the_year_type() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let renderer = SvgRenderer::default();
    for (name, points) in [("max", [(i32::MAX, 3)]), ("min", [(i32::MIN, 2)]), ("one", [(2020, 5)])] {
        let chart = Chart::TimeSeries {
            title: "By Year",
            x_label: "year",
            y_label: "papers",
            points: &points,
        };
        let Rendered::Written(path) = render_chart(&renderer, &chart, tmp.path(), name)? else {
            panic!("{name} was skipped");
        };
        assert_svg(&path)?;
    }
    Ok(())
}
