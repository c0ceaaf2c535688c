//! Embedding text format.
//!
//! ```text
//! N dim
//! id v1 v2 ... vdim
//! ...
//! ```

use crate::error::{Error, Result};
use crate::model::GraphAutoencoder;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Write `(id, vector)` rows with the `N dim` header.
pub fn write_embeddings<W: Write>(mut writer: W, ids: &[String], rows: &[Vec<f32>]) -> Result<()> {
    if ids.len() != rows.len() {
        return Err(Error::DimensionMismatch {
            expected: ids.len(),
            got: rows.len(),
        });
    }
    let dim = rows.first().map_or(0, Vec::len);
    writeln!(writer, "{} {}", rows.len(), dim)?;
    for (id, row) in ids.iter().zip(rows) {
        if row.len() != dim {
            return Err(Error::DimensionMismatch {
                expected: dim,
                got: row.len(),
            });
        }
        write!(writer, "{id}")?;
        for v in row {
            write!(writer, " {v}")?;
        }
        writeln!(writer)?;
    }
    writer.flush()?;
    Ok(())
}

/// Save a model's extracted embeddings, rows in node index order.
pub fn save_embeddings(path: impl AsRef<Path>, model: &GraphAutoencoder) -> Result<()> {
    let rows = model.embedding_rows()?;
    let file = File::create(path)?;
    write_embeddings(BufWriter::new(file), model.node_ids(), &rows)
}

/// Parse the format written by [`write_embeddings`].
pub fn read_embeddings<R: BufRead>(reader: R) -> Result<Vec<(String, Vec<f32>)>> {
    let mut lines = reader.lines().enumerate();

    let (count, dim) = match lines.next() {
        Some((_, line)) => {
            let line = line?;
            let mut header = line.split_whitespace().map(|t| t.parse::<usize>());
            match (header.next(), header.next(), header.next()) {
                (Some(Ok(n)), Some(Ok(d)), None) => (n, d),
                _ => return Err(parse_error(1, format!("expected `N dim` header, got {line:?}"))),
            }
        }
        None => return Err(parse_error(1, "empty embedding file".to_string())),
    };

    let mut out = Vec::with_capacity(count);
    for (i, line) in lines {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let Some(id) = tokens.next() else { continue };
        let values = tokens
            .map(|t| t.parse::<f32>().map_err(|e| parse_error(i + 1, format!("invalid value {t:?}: {e}"))))
            .collect::<Result<Vec<_>>>()?;
        if values.len() != dim {
            return Err(parse_error(i + 1, format!("expected {dim} values, got {}", values.len())));
        }
        out.push((id.to_string(), values));
    }

    if out.len() != count {
        return Err(Error::DimensionMismatch {
            expected: count,
            got: out.len(),
        });
    }
    Ok(out)
}

/// Read an embedding file from disk.
pub fn load_embeddings(path: impl AsRef<Path>) -> Result<Vec<(String, Vec<f32>)>> {
    let file = File::open(path)?;
    read_embeddings(BufReader::new(file))
}

fn parse_error(line: usize, message: String) -> Error {
    Error::Graph(graphae_core::Error::Parse { line, message })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_header_and_rows() {
        let mut buf = Vec::new();
        let ids = vec!["a".to_string(), "b".to_string()];
        let rows = vec![vec![0.5, -1.0], vec![2.0, 0.25]];
        write_embeddings(&mut buf, &ids, &rows).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "2 2\na 0.5 -1\nb 2 0.25\n");

        let back = read_embeddings(Cursor::new(text)).unwrap();
        assert_eq!(back[1], ("b".to_string(), vec![2.0, 0.25]));
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let ids = vec!["a".to_string(), "b".to_string()];
        let rows = vec![vec![1.0], vec![1.0, 2.0]];
        assert!(write_embeddings(Vec::new(), &ids, &rows).is_err());
    }

    #[test]
    fn test_bad_header() {
        let err = read_embeddings(Cursor::new("two 2\n")).unwrap_err();
        assert!(matches!(err, Error::Graph(graphae_core::Error::Parse { line: 1, .. })));
    }

    #[test]
    fn test_row_count_checked() {
        let err = read_embeddings(Cursor::new("3 1\na 1\nb 2\n")).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 3, got: 2 }));
    }

    #[test]
    fn test_wrong_width() {
        let err = read_embeddings(Cursor::new("1 2\na 1\n")).unwrap_err();
        assert!(matches!(err, Error::Graph(graphae_core::Error::Parse { line: 2, .. })));
    }
}
