use anyhow::Result;
use scholarstream::config::{AnalysisConfig, CleanConfig};
use scholarstream::error::{Notice, PipelineError};
use scholarstream::metrics::{BATCHES, ROWS_READ};
use scholarstream::pipeline::{ANALYSIS_SUMMARY, run_analysis, run_clean};
use scholarstream::render::STATIC_IMAGES;
use scholarstream::testing::{MetadataBuilder, RecordingRenderer};
use std::fs;
use std::path::Path;

fn analysis_config(input: &Path, output_dir: &Path, window_size: usize) -> AnalysisConfig {
    AnalysisConfig {
        input: input.to_path_buf(),
        output_dir: output_dir.to_path_buf(),
        window_size,
        ..AnalysisConfig::default()
    }
}

#[test]
fn clean_then_analyse_writes_images_and_summary() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let input = MetadataBuilder::new()
        .add_generated(120)
        .write_csv(tmp.path().join("metadata.csv"))?;
    let cleaned = tmp.path().join("cleaned.csv");
    let clean = run_clean(&CleanConfig {
        input,
        output: cleaned.clone(),
        window_size: 25,
        ..CleanConfig::default()
    })?;
    assert_eq!(clean.dropped_columns, ["journal", "pmcid"]);

    let images = tmp.path().join("images");
    let renderer = RecordingRenderer::default();
    let report = run_analysis(&analysis_config(&cleaned, &images, 40), &renderer)?;

    assert_eq!(renderer.titles().len(), 4);
    let expected: Vec<_> = STATIC_IMAGES
        .iter()
        .map(|name| images.join(format!("{name}.txt")))
        .collect();
    assert_eq!(report.rendered, expected);
    assert!(expected.iter().all(|p| p.is_file()));

    let rows = report.summary.rows_seen;
    assert!(rows > 0 && rows < 120);
    assert_eq!(report.metrics.get(ROWS_READ), rows);
    assert_eq!(report.metrics.get(BATCHES), rows.div_ceil(40));
    assert!(report.summary.top_sources.len() <= 10);
    assert!(report.summary.top_tokens.len() <= 50);
    assert!(report.summary.notices.is_empty(), "{:?}", report.summary.notices);

    let saved: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(images.join(ANALYSIS_SUMMARY))?)?;
    assert_eq!(saved["summary"]["rows_seen"], rows);
    assert_eq!(
        saved["summary"]["by_year"].as_array().map(Vec::len),
        Some(report.summary.by_year.len())
    );
    assert_eq!(saved["metrics"]["rows_read"]["value"], rows);
    Ok(())
}

#[test]
fn empty_artifact_is_reported_not_failed() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let cleaned = tmp.path().join("cleaned.csv");
    fs::write(&cleaned, "title,year,source,title_word_count\n")?;
    let images = tmp.path().join("images");
    let renderer = RecordingRenderer::default();

    let report = run_analysis(&analysis_config(&cleaned, &images, 10), &renderer)?;
    assert_eq!(report.summary.rows_seen, 0);
    assert!(report.rendered.is_empty());
    assert!(renderer.titles().is_empty());
    assert!(matches!(report.summary.notices.first(), Some(Notice::NoData(_))));
    assert_eq!(report.summary.notices.len(), 1 + STATIC_IMAGES.len());
    assert!(images.join(ANALYSIS_SUMMARY).is_file());
    Ok(())
}

#[test]
fn missing_artifact_fails_without_output() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let images = tmp.path().join("images");
    let err = run_analysis(
        &analysis_config(&tmp.path().join("absent.csv"), &images, 10),
        &RecordingRenderer::default(),
    )
    .err()
    .unwrap();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::NotFound { .. })
    ));
    assert!(!images.exists());
    Ok(())
}

#[test]
fn zero_window_is_invalid() {
    let cfg = AnalysisConfig {
        window_size: 0,
        ..AnalysisConfig::default()
    };
    let err = run_analysis(&cfg, &RecordingRenderer::default()).err().unwrap();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::InvalidConfig(_))
    ));
}
