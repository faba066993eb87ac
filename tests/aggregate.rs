use anyhow::Result;
use scholarstream::aggregate::{AggregateFields, AggregateResults, StreamingAggregator};
use scholarstream::config::CleanConfig;
use scholarstream::error::Notice;
use scholarstream::io::csv::read_batches;
use scholarstream::pipeline::run_clean;
use scholarstream::testing::{MetadataBuilder, cats_and_dogs_titles, write_cleaned_csv};
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

fn aggregate(path: &Path, window: usize) -> Result<AggregateResults> {
    let mut aggregator = StreamingAggregator::new(AggregateFields::default(), 3)?;
    for batch in read_batches(path, NonZeroUsize::new(window).unwrap())? {
        aggregator.fold_batch(&batch?);
    }
    Ok(aggregator.finalize())
}

fn cleaned_fixture(dir: &Path, rows: usize) -> Result<PathBuf> {
    let input = MetadataBuilder::new()
        .add_generated(rows)
        .write_csv(dir.join("metadata.csv"))?;
    let output = dir.join("cleaned.csv");
    run_clean(&CleanConfig {
        input,
        output: output.clone(),
        window_size: 50,
        ..CleanConfig::default()
    })?;
    Ok(output)
}

#[test]
fn token_frequency_over_two_titles() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let titles = cats_and_dogs_titles();
    let rows: Vec<(&str, Option<i32>, Option<&str>)> = titles
        .iter()
        .map(|t| (t.as_str(), Some(2020), Some("PMC")))
        .collect();
    let path = write_cleaned_csv(tmp.path().join("cleaned.csv"), &rows)?;

    let summary = aggregate(&path, 1)?.summarize(10, 50);
    let tokens: Vec<(&str, u64)> = summary
        .top_tokens
        .iter()
        .map(|(t, n)| (t.as_str(), *n))
        .collect();
    assert_eq!(tokens, [("cats", 2), ("dogs", 2), ("and", 1), ("are", 1)]);
    assert_eq!(summary.by_year, [(2020, 2)]);
    assert_eq!(summary.top_sources, [("PMC".to_string(), 2)]);
    assert_eq!(summary.scalar, [3, 3]);
    Ok(())
}

#[test]
fn results_do_not_depend_on_window_size() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = cleaned_fixture(tmp.path(), 300)?;

    let whole = aggregate(&path, 1_000_000)?;
    assert_eq!(whole.batches, 1);
    let rows = whole.rows_seen;
    let reference = whole.summarize(usize::MAX, usize::MAX);

    for window in [1, 7, 64] {
        let results = aggregate(&path, window)?;
        assert_eq!(results.rows_seen, rows);
        assert_eq!(results.batches, rows.div_ceil(window as u64));
        let summary = results.summarize(usize::MAX, usize::MAX);
        assert_eq!(summary.by_year, reference.by_year, "window {window}");
        assert_eq!(summary.top_sources, reference.top_sources, "window {window}");
        assert_eq!(summary.top_tokens, reference.top_tokens, "window {window}");
        assert_eq!(summary.scalar, reference.scalar, "window {window}");
    }
    Ok(())
}

#[test]
fn category_totals_match_non_missing_values() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = cleaned_fixture(tmp.path(), 200)?;

    let mut rdr = csv::Reader::from_path(&path)?;
    let header = rdr.headers()?.clone();
    let year_col = header.iter().position(|h| h == "year").unwrap();
    let source_col = header.iter().position(|h| h == "source").unwrap();
    let (mut with_year, mut with_source, mut rows) = (0u64, 0u64, 0u64);
    for record in rdr.records() {
        let record = record?;
        rows += 1;
        with_year += u64::from(!record[year_col].is_empty());
        with_source += u64::from(!record[source_col].is_empty());
    }
    // The generator writes some unparseable dates, hence some missing years.
    assert!(with_year < rows);

    for window in [1, 7, rows as usize] {
        let results = aggregate(&path, window)?;
        assert_eq!(results.years.total(), with_year);
        assert_eq!(results.sources.total(), with_source);
        assert_eq!(results.scalar.len() as u64, rows);
    }
    Ok(())
}

#[test]
fn missing_field_is_noticed_once() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("nosource.csv");
    let mut body = String::from("title,year,title_word_count\n");
    for i in 0..10 {
        body.push_str(&format!("paper number {i},2021,3\n"));
    }
    body.push_str("bad year,20x1,2\n");
    fs::write(&path, body)?;

    let results = aggregate(&path, 3)?;
    assert_eq!(results.notices, [Notice::FieldMissing("source".to_string())]);
    assert!(results.sources.is_empty());
    assert_eq!(results.years.get(&2021), 10);
    assert_eq!(results.parse_failures.numbers, 1);
    assert_eq!(results.rows_seen, 11);
    Ok(())
}
