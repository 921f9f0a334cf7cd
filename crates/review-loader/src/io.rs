//! Export of the rating matrix as a plain row-per-rating table.
//!
//! The table is the optional intermediate artifact between ingestion and
//! modeling: one `user_index,item_index,score` row per rating, in store order,
//! no header. Duplicate rows are written as they were stored.

use crate::error::Result;
use crate::types::RatingStore;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Write every rating row to `out`, returning the number of rows written
pub fn write_rating_table<W: Write>(store: &RatingStore, out: W) -> Result<usize> {
    let mut out = BufWriter::new(out);
    for rating in store.ratings() {
        writeln!(out, "{},{},{:?}", rating.user, rating.item, rating.score)?;
    }
    out.flush()?;
    Ok(store.len())
}

/// Write the rating table to a file, replacing it if it exists
pub fn export_rating_table(store: &RatingStore, path: &Path) -> Result<usize> {
    let file = File::create(path)?;
    let rows = write_rating_table(store, file)?;
    info!(rows, "Wrote rating table to {:?}", path);
    Ok(rows)
}
