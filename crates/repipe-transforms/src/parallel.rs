//! Order-preserving chunked fan-out for column transforms.

use rayon::prelude::*;
use repipe_pipeline::Result;
use tracing::debug;

/// Rows per parallel chunk.
pub const CHUNK_SIZE: usize = 1000;

/// Apply `f` to every row, fanning out over chunks of [`CHUNK_SIZE`] rows when
/// the column is larger than one chunk. Output rows keep input order.
pub fn map_rows<T, U, F>(transform: &str, rows: &[T], f: F) -> Result<Vec<U>>
where
    T: Sync,
    U: Send,
    F: Fn(&T) -> Result<U> + Sync,
{
    if rows.len() <= CHUNK_SIZE {
        return rows.iter().map(&f).collect();
    }

    debug!(transform, rows = rows.len(), "executing parallel transform");
    let parts: Vec<Result<Vec<U>>> = rows
        .par_chunks(CHUNK_SIZE)
        .map(|chunk| chunk.iter().map(&f).collect())
        .collect();

    debug!(transform, chunks = parts.len(), "concatenating sub-parts");
    let mut out = Vec::with_capacity(rows.len());
    for part in parts {
        out.extend(part?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use repipe_pipeline::PipelineError;

    use super::*;

    #[test]
    fn large_inputs_keep_row_order() {
        let rows: Vec<usize> = (0..3 * CHUNK_SIZE + 17).collect();
        let out = map_rows("Double", &rows, |row| Ok(row * 2)).unwrap();
        assert_eq!(out.len(), rows.len());
        assert!(out.iter().enumerate().all(|(idx, value)| *value == idx * 2));
    }

    #[test]
    fn first_error_is_returned() {
        let rows: Vec<usize> = (0..2 * CHUNK_SIZE).collect();
        let err = map_rows("Fail", &rows, |row| {
            if *row == 1500 {
                Err(PipelineError::invalid_input("Fail", "row 1500"))
            } else {
                Ok(*row)
            }
        })
        .unwrap_err();
        assert!(err.to_string().contains("row 1500"));
    }
}
