//! Building a ReviewIndex from a review log.
//!
//! Entry points, from most to least convenient:
//! - `ReviewIndex::load_from_path`: open a `.gz` file and parse it
//! - `ReviewIndex::from_gzip_reader`: any gzip-compressed byte stream
//! - `ReviewIndex::from_text_reader`: already decompressed text
//!
//! All three run the same single pass, then build the derived views
//! (preference rows, item stats). Any error aborts the load and no index is
//! returned.

use crate::error::{IngestError, Result};
use crate::parser;
use crate::types::*;
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::time::Instant;
use tracing::{info, instrument};

impl ReviewIndex {
    /// Load a gzip-compressed review log from disk
    ///
    /// This is the main entry point for loading data.
    #[instrument]
    pub fn load_from_path(path: &Path) -> Result<Self> {
        info!("Loading review log from {:?}", path);

        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                IngestError::FileNotFound {
                    path: path.display().to_string(),
                }
            }
            _ => IngestError::Io(e),
        })?;

        Self::from_gzip_reader(file)
    }

    /// Load from any gzip-compressed stream
    ///
    /// Concatenated gzip members are read as one continuous log.
    pub fn from_gzip_reader<R: Read>(reader: R) -> Result<Self> {
        let decoder = MultiGzDecoder::new(reader);
        Self::from_text_reader(BufReader::new(decoder))
    }

    /// Load from decompressed, line-oriented UTF-8 text
    pub fn from_text_reader<R: BufRead>(reader: R) -> Result<Self> {
        let start = Instant::now();
        let mut index = ReviewIndex::new();

        let lines = parser::parse_reviews(reader, &mut index)?;
        index.finalize();

        info!(
            lines,
            users = index.total_users(),
            products = index.total_products(),
            reviews = index.total_reviews(),
            ratings = index.store().len(),
            elapsed = ?start.elapsed(),
            "Review log loaded"
        );
        Ok(index)
    }
}
