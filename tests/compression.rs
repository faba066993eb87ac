use anyhow::Result;
use scholarstream::aggregate::{AggregateFields, StreamingAggregator};
use scholarstream::config::CleanConfig;
use scholarstream::io::csv::read_batches;
use scholarstream::pipeline::run_clean;
use scholarstream::testing::{MetadataBuilder, read_to_string};
use std::fs;
use std::num::NonZeroUsize;
use std::path::Path;

fn clean(input: &Path, output: &Path) -> Result<()> {
    run_clean(&CleanConfig {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        window_size: 5,
        ..CleanConfig::default()
    })?;
    Ok(())
}

fn titles(path: &Path) -> Result<Vec<String>> {
    let mut out = Vec::new();
    for batch in read_batches(path, NonZeroUsize::new(4).unwrap())? {
        let batch = batch?;
        let pos = batch.schema.position("title").unwrap();
        out.extend(batch.rows.iter().map(|r| r[pos].to_string()));
    }
    Ok(out)
}

#[test]
fn float_formatted_year_counts_as_integer() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("cleaned.csv");
    fs::write(
        &path,
        "title,source,year,title_word_count\n\
         a,PMC,2020.0,1\n\
         b,PMC,2020,1\n\
         c,WHO,2021.5,1\n",
    )?;

    let mut aggregator = StreamingAggregator::new(AggregateFields::default(), 3)?;
    for batch in read_batches(&path, NonZeroUsize::new(2).unwrap())? {
        aggregator.fold_batch(&batch?);
    }
    let summary = aggregator.finalize().summarize(10, 10);
    assert_eq!(summary.by_year, [(2020, 2)]);
    Ok(())
}

#[cfg(feature = "compression-gzip")]
mod gzip {
    use super::*;

    #[test]
    fn gzip_without_extension_is_detected_by_magic() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let builder = MetadataBuilder::new().add_generated(20);
        let plain = builder.write_csv(tmp.path().join("metadata.csv"))?;
        let gz = builder.write_csv(tmp.path().join("metadata.csv.gz"))?;
        let disguised = tmp.path().join("disguised.csv");
        fs::rename(&gz, &disguised)?;

        assert_ne!(fs::read(&disguised)?, fs::read(&plain)?);
        assert_eq!(titles(&disguised)?, titles(&plain)?);
        assert_eq!(read_to_string(&disguised)?, read_to_string(&plain)?);
        Ok(())
    }
}

#[cfg(all(feature = "compression-bzip2", feature = "compression-xz"))]
mod bzip2_xz {
    use super::*;

    #[test]
    fn bzip2_and_xz_round_trip_through_cleaning() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let builder = MetadataBuilder::new().add_generated(30);
        let plain_in = builder.write_csv(tmp.path().join("metadata.csv"))?;
        let bz_in = builder.write_csv(tmp.path().join("metadata.csv.bz2"))?;
        let xz_in = builder.write_csv(tmp.path().join("metadata.csv.xz"))?;

        let plain_out = tmp.path().join("plain.csv");
        clean(&plain_in, &plain_out)?;
        let expected = read_to_string(&plain_out)?;
        assert!(!expected.is_empty());

        for (input, output) in [(&bz_in, "cleaned.csv.xz"), (&xz_in, "cleaned.csv.bz2")] {
            let output = tmp.path().join(output);
            clean(input, &output)?;
            assert_ne!(fs::read(&output)?, fs::read(&plain_out)?);
            assert_eq!(read_to_string(&output)?, expected);
        }
        Ok(())
    }
}
