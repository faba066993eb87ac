use anyhow::Result;
use scholarstream::config::SampleConfig;
use scholarstream::error::Notice;
use scholarstream::sample::sample;
use scholarstream::testing::write_cleaned_csv;
use std::fs;
use std::path::{Path, PathBuf};

fn fixture(dir: &Path, rows: usize) -> Result<PathBuf> {
    let titles: Vec<String> = (0..rows).map(|i| format!("paper {i:05}")).collect();
    let sources = ["PMC", "WHO", "Medline"];
    let data: Vec<(&str, Option<i32>, Option<&str>)> = titles
        .iter()
        .enumerate()
        .map(|(i, t)| (t.as_str(), Some(2015 + (i % 8) as i32), Some(sources[i % 3])))
        .collect();
    write_cleaned_csv(dir.join("cleaned.csv"), &data)
}

fn config(path: PathBuf, window_size: usize, fraction: f64) -> SampleConfig {
    SampleConfig {
        path,
        window_size,
        fraction,
        ..SampleConfig::default()
    }
}

#[test]
fn draws_the_expected_share_deterministically() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = fixture(tmp.path(), 1000)?;

    let first = sample(&config(path.clone(), 100, 0.1))?;
    assert_eq!(first.len(), 100);
    assert_eq!(first.rows_read, 1000);
    assert_eq!(first.windows, 10);
    assert!(first.notices.is_empty(), "{:?}", first.notices);

    let again = sample(&config(path.clone(), 100, 0.1))?;
    assert_eq!(first.papers, again.papers);

    let reseeded = sample(&SampleConfig {
        seed: 7,
        ..config(path, 100, 0.1)
    })?;
    assert_eq!(reseeded.len(), 100);
    assert_ne!(first.papers, reseeded.papers);
    Ok(())
}

#[test]
fn size_grows_with_fraction() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = fixture(tmp.path(), 1000)?;
    let sizes: Vec<usize> = [0.05, 0.1, 0.2, 1.0]
        .into_iter()
        .map(|f| sample(&config(path.clone(), 100, f)).map(|s| s.len()))
        .collect::<Result<_>>()?;
    assert_eq!(sizes, [50, 100, 200, 1000]);
    Ok(())
}

#[test]
fn overshoot_is_resampled_in_file_order() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = fixture(tmp.path(), 1000)?;
    // 66 windows of 15 draw 2 each, the last window of 10 draws 1.
    let s = sample(&config(path, 15, 0.1))?;
    assert_eq!(s.drawn, 133);
    assert_eq!(s.len(), 100);
    assert!(s.papers.windows(2).all(|w| w[0].title < w[1].title));
    Ok(())
}

#[test]
fn sampled_papers_are_typed() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = fixture(tmp.path(), 40)?;
    let s = sample(&config(path, 10, 1.0))?;
    assert_eq!(s.len(), 40);
    let paper = &s.papers[9];
    assert_eq!(paper.title, "paper 00009");
    assert_eq!(paper.year, Some(2016));
    assert_eq!(paper.source.as_deref(), Some("PMC"));
    assert_eq!(paper.title_word_count, Some(2));
    assert_eq!(
        paper.publish_time,
        chrono::NaiveDate::from_ymd_opt(2016, 1, 1)
    );
    Ok(())
}

#[test]
fn missing_or_empty_artifact_gives_empty_sample() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let missing = sample(&config(tmp.path().join("absent.csv"), 10, 0.1))?;
    assert!(missing.is_empty());
    assert!(matches!(missing.notices.as_slice(), [Notice::NoData(_)]));

    let empty = tmp.path().join("empty.csv");
    fs::write(&empty, "title,year\n")?;
    let s = sample(&config(empty, 10, 0.1))?;
    assert!(s.is_empty());
    assert_eq!(s.rows_read, 0);
    assert!(matches!(s.notices.as_slice(), [Notice::NoData(_)]));
    Ok(())
}

#[test]
fn tiny_fraction_of_small_file_is_empty_with_notice() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = fixture(tmp.path(), 4)?;
    let s = sample(&config(path, 10, 0.1))?;
    assert!(s.is_empty());
    assert_eq!(s.rows_read, 4);
    assert!(s.notices.iter().any(|n| matches!(n, Notice::NoData(_))));
    Ok(())
}

#[test]
fn invalid_fraction_is_rejected() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = fixture(tmp.path(), 10)?;
    for fraction in [0.0, -0.5, 1.5, f64::NAN] {
        assert!(sample(&config(path.clone(), 10, fraction)).is_err(), "{fraction}");
    }
    assert!(sample(&config(path, 0, 0.5)).is_err());
    Ok(())
}
