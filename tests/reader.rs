use anyhow::Result;
use scholarstream::error::PipelineError;
use scholarstream::io::csv::{ChunkReader, read_batches};
use std::fs;
use std::num::NonZeroUsize;

fn window(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap()
}

fn kind(err: &anyhow::Error) -> Option<&PipelineError> {
    err.downcast_ref::<PipelineError>()
}

#[test]
fn missing_file_is_not_found() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let err = ChunkReader::open(tmp.path().join("nope.csv"), window(10)).err().unwrap();
    assert!(matches!(kind(&err), Some(PipelineError::NotFound { .. })));
    Ok(())
}

#[test]
fn header_only_and_zero_byte_files_are_empty() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let header_only = tmp.path().join("header.csv");
    fs::write(&header_only, "title,abstract\n")?;
    let zero = tmp.path().join("zero.csv");
    fs::write(&zero, "")?;

    for path in [header_only, zero] {
        let err = read_batches(&path, window(10)).err().unwrap();
        assert!(
            matches!(kind(&err), Some(PipelineError::Empty { .. })),
            "{}: {err:#}",
            path.display()
        );
    }
    Ok(())
}

#[test]
fn batches_partition_the_file_in_order() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("rows.csv");
    let mut body = String::from("id,title\n");
    for i in 0..23 {
        body.push_str(&format!("{i},paper {i}\n"));
    }
    fs::write(&path, body)?;

    for w in [1, 5, 7, 23, 100] {
        let reader = read_batches(&path, window(w))?;
        assert_eq!(reader.schema().names(), ["id", "title"]);
        let batches = reader.collect::<Result<Vec<_>>>()?;
        assert_eq!(batches.len(), 23usize.div_ceil(w));
        assert!(batches.iter().all(|b| b.len() <= w && !b.is_empty()));
        let indexes: Vec<usize> = batches.iter().map(|b| b.index).collect();
        assert_eq!(indexes, (1..=batches.len()).collect::<Vec<_>>());
        let ids: Vec<String> = batches
            .iter()
            .flat_map(|b| b.rows.iter().map(|r| r[0].to_string()))
            .collect();
        let expected: Vec<String> = (0..23).map(|i| i.to_string()).collect();
        assert_eq!(ids, expected, "window {w}");
    }
    Ok(())
}

#[test]
fn reader_counts_rows_and_is_single_pass() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("rows.csv");
    fs::write(&path, "title\na\nb\nc\n")?;
    let mut reader = read_batches(&path, window(2))?;
    assert_eq!(reader.rows_read(), 0);
    assert_eq!(reader.next().unwrap()?.len(), 2);
    assert_eq!(reader.next().unwrap()?.len(), 1);
    assert!(reader.next().is_none());
    assert!(reader.next().is_none());
    assert_eq!(reader.rows_read(), 3);
    Ok(())
}

#[test]
fn malformed_row_fails_with_batch_index() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("bad.csv");
    // Third data row has an extra field.
    fs::write(&path, "a,b\n1,2\n3,4\n5,6,7\n")?;
    let mut reader = read_batches(&path, window(2))?;
    assert!(reader.next().unwrap().is_ok());
    let err = reader.next().unwrap().err().unwrap();
    match kind(&err) {
        Some(PipelineError::Unexpected { batch, .. }) => assert_eq!(*batch, 2),
        other => panic!("unexpected error kind: {other:?}"),
    }
    assert!(reader.next().is_none());
    Ok(())
}
