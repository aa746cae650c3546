// Row-major f32 matrices on disk: bincode, gzip-wrapped when the file name
// ends in ".gz".

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use nutrirank_core::{Error, Result, Vector};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingMatrix {
    pub rows: usize,
    pub dim: usize,
    pub data: Vec<f32>,
}

impl EmbeddingMatrix {
    pub fn from_rows(rows: &[Vec<f32>], dim: usize) -> Result<Self> {
        let mut data = Vec::with_capacity(rows.len() * dim);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != dim {
                return Err(Error::ArtifactDimensionMismatch {
                    artifact: format!("matrix row {}", i),
                    expected: dim,
                    actual: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            rows: rows.len(),
            dim,
            data,
        })
    }

    /// Split into per-row vectors after checking the header against the
    /// payload length.
    pub fn into_vectors(self, artifact: &str) -> Result<Vec<Vector>> {
        let expected = self.rows.checked_mul(self.dim).ok_or_else(|| {
            Error::ArtifactCorrupt(format!(
                "{}: header {}x{} overflows",
                artifact, self.rows, self.dim
            ))
        })?;
        if expected != self.data.len() {
            return Err(Error::ArtifactCorrupt(format!(
                "{}: header says {}x{} but payload holds {} values",
                artifact,
                self.rows,
                self.dim,
                self.data.len()
            )));
        }
        if self.dim == 0 {
            return Ok(vec![Vector::new(Vec::new()); self.rows]);
        }
        Ok(self.data.chunks_exact(self.dim).map(Vector::from_slice).collect())
    }
}

fn is_gzip(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("gz")
}

pub fn read_matrix(path: &Path) -> Result<EmbeddingMatrix> {
    let name = path.display().to_string();
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::ArtifactMissing(name.clone()),
        _ => Error::Io(e),
    })?;

    let reader: Box<dyn Read> = if is_gzip(path) {
        Box::new(GzDecoder::new(BufReader::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };

    bincode::deserialize_from(reader)
        .map_err(|e| Error::ArtifactCorrupt(format!("{}: {}", name, e)))
}

pub fn write_matrix(path: &Path, matrix: &EmbeddingMatrix) -> anyhow::Result<()> {
    let file = File::create(path)?;
    if is_gzip(path) {
        let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        bincode::serialize_into(&mut encoder, matrix)?;
        encoder.finish()?.flush()?;
    } else {
        let mut writer = BufWriter::new(file);
        bincode::serialize_into(&mut writer, matrix)?;
        writer.flush()?;
    }
    Ok(())
}
