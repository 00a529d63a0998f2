use rayon::prelude::*;

use crate::error::ParseError;
use crate::pipeline::aggregate;
use crate::pipeline::parse::FileFormat;
use crate::types::activity::Activity;

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub format: FileFormat,
    pub bytes: Vec<u8>,
}

/// Parses and aggregates every file on the rayon pool. Results are returned in
/// input order; one bad file does not affect the others.
pub fn ingest_files(files: &[UploadedFile]) -> Vec<Result<Activity, ParseError>> {
    files
        .par_iter()
        .map(|file| {
            aggregate::aggregate_file(&file.bytes, file.format).map_err(|err| {
                tracing::warn!("Failed to ingest {}: {}", file.name, err);
                err
            })
        })
        .collect()
}
