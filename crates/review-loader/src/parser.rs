//! Streaming parser for review logs.
//!
//! A review log is a sequence of loosely structured blocks, one field per line:
//!
//! ```text
//! product/productId: B003AI2VGA
//! review/userId: A141HP4LYPWMSR
//! review/profileName: Brian E. Erland "Rainbow Sphinx"
//! review/helpfulness: 7/7
//! review/score: 3.0
//! review/time: 1182729600
//! review/summary: "There Is So Much Darkness Now ~ Come For The Miracle"
//! review/text: Synopsis: On the daily trek from Juarez, Mexico to ...
//! ```
//!
//! Only three prefixes matter (product, user, score). Every other line is
//! skipped without looking at it.
//!
//! Records are positional: a score belongs to the last user line, which belongs
//! to the last product line. `RecordAssembler` makes that ordering an explicit
//! state machine instead of a handful of loose variables:
//!
//! ```text
//! AwaitingProduct --product--> AwaitingUser(p) --user--> AwaitingScore(p, u)
//!                                   ^                          |
//!                                   +----------score-----------+
//! ```
//!
//! The reader is consumed one line at a time through a single reused buffer,
//! so memory use is the registries and the store, never the input.

use crate::error::{IngestError, Result};
use crate::types::*;
use std::io::{self, BufRead};
use tracing::{debug, instrument};

pub const PRODUCT_KEY: &str = "product/productId: ";
pub const USER_KEY: &str = "review/userId: ";
pub const SCORE_KEY: &str = "review/score: ";

const PROGRESS_EVERY_LINES: usize = 1_000_000;

/// The three record lines we care about, plus everything else
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    Product(&'a str),
    User(&'a str),
    Score(&'a str),
    Other,
}

/// Classify a line by its literal prefix and return the payload after it
pub fn classify_line(line: &str) -> LineKind<'_> {
    if let Some(rest) = line.strip_prefix(PRODUCT_KEY) {
        LineKind::Product(rest)
    } else if let Some(rest) = line.strip_prefix(USER_KEY) {
        LineKind::User(rest)
    } else if let Some(rest) = line.strip_prefix(SCORE_KEY) {
        LineKind::Score(rest)
    } else {
        LineKind::Other
    }
}

/// Where the assembler is within a product -> user -> score block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    /// No product line seen yet
    AwaitingProduct,
    /// A product is current; waiting for the next reviewer
    AwaitingUser { product: ItemIndex },
    /// A reviewer is pending; waiting for their score
    AwaitingScore { product: ItemIndex, user: UserIndex },
}

/// Turns classified lines into ratings, registering identifiers as it goes
#[derive(Debug)]
pub struct RecordAssembler {
    state: RecordState,
    /// The (user, item) pair assembled at the most recent user line
    last_pair: Option<(UserIndex, ItemIndex)>,
}

impl RecordAssembler {
    pub fn new() -> Self {
        Self {
            state: RecordState::AwaitingProduct,
            last_pair: None,
        }
    }

    pub fn state(&self) -> RecordState {
        self.state
    }

    /// Feed one line (without its terminator)
    ///
    /// Returns the rating completed by this line, if any. `line_no` is 1-based
    /// and only used for error reporting.
    pub fn feed(
        &mut self,
        line: &str,
        line_no: usize,
        index: &mut ReviewIndex,
    ) -> Result<Option<Rating>> {
        match classify_line(line) {
            LineKind::Product(payload) => {
                let product_id = parse_identifier(payload, "product", line_no)?;
                let product = index.register_product(product_id);
                // A pending reviewer loses its score slot; last_pair still holds it
                self.state = RecordState::AwaitingUser { product };
                Ok(None)
            }
            LineKind::User(payload) => {
                let user_id = parse_identifier(payload, "user", line_no)?;
                let product = match self.state {
                    RecordState::AwaitingProduct => {
                        return Err(IngestError::OutOfOrder {
                            line: line_no,
                            found: "review/userId",
                            expected: "product/productId",
                        });
                    }
                    RecordState::AwaitingUser { product } => product,
                    RecordState::AwaitingScore { product, .. } => product,
                };
                let user = index.register_review(user_id);
                self.state = RecordState::AwaitingScore { product, user };
                self.last_pair = Some((user, product));
                Ok(None)
            }
            LineKind::Score(payload) => {
                let score = parse_score(payload, line_no)?;
                let (user, item) = match self.state {
                    RecordState::AwaitingScore { product, user } => {
                        self.state = RecordState::AwaitingUser { product };
                        (user, product)
                    }
                    // No pending reviewer: the score belongs to the last assembled pair
                    _ => self.last_pair.ok_or_else(|| IngestError::MalformedRecord {
                        line: line_no,
                        field: "score",
                        value: payload.to_string(),
                        reason: "score without a preceding review/userId".to_string(),
                    })?,
                };
                let rating = Rating { user, item, score };
                index.insert_rating(rating);
                Ok(Some(rating))
            }
            LineKind::Other => Ok(None),
        }
    }
}

impl Default for RecordAssembler {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_identifier<'a>(payload: &'a str, field: &'static str, line_no: usize) -> Result<&'a str> {
    let id = payload.trim();
    if id.is_empty() {
        return Err(IngestError::MalformedRecord {
            line: line_no,
            field,
            value: payload.to_string(),
            reason: "empty identifier".to_string(),
        });
    }
    Ok(id)
}

/// Parse a score payload such as `4.0`
///
/// Non-finite values are rejected: a single NaN would poison every
/// correlation it takes part in.
pub fn parse_score(payload: &str, line_no: usize) -> Result<f32> {
    let text = payload.trim();
    let score: f32 = text.parse().map_err(|e| IngestError::MalformedRecord {
        line: line_no,
        field: "score",
        value: text.to_string(),
        reason: format!("Invalid score: {}", e),
    })?;
    if !score.is_finite() {
        return Err(IngestError::MalformedRecord {
            line: line_no,
            field: "score",
            value: text.to_string(),
            reason: "score is not a finite number".to_string(),
        });
    }
    Ok(score)
}

/// Map a read failure to an ingestion error
///
/// Invalid gzip data and invalid UTF-8 surface from `read_line` as
/// `InvalidInput`/`InvalidData`; those are decode errors, the rest plain I/O.
fn read_error(err: io::Error, line_no: usize) -> IngestError {
    match err.kind() {
        io::ErrorKind::InvalidData | io::ErrorKind::InvalidInput | io::ErrorKind::UnexpectedEof => {
            IngestError::Decode {
                line: line_no,
                reason: err.to_string(),
            }
        }
        _ => IngestError::Io(err),
    }
}

/// Parse decompressed review text into `index`
///
/// Returns the number of lines read. Identifiers and ratings are added to
/// the index as they are discovered; derived views are not built here.
#[instrument(skip(reader, index))]
pub fn parse_reviews<R: BufRead>(mut reader: R, index: &mut ReviewIndex) -> Result<usize> {
    let mut assembler = RecordAssembler::new();
    let mut buf = String::new();
    let mut line_no = 0;

    loop {
        buf.clear();
        let read = reader
            .read_line(&mut buf)
            .map_err(|e| read_error(e, line_no + 1))?;
        if read == 0 {
            break;
        }
        line_no += 1;

        let line = buf.trim_end_matches(['\n', '\r']);
        assembler.feed(line, line_no, index)?;

        if line_no % PROGRESS_EVERY_LINES == 0 {
            debug!(
                lines = line_no,
                users = index.total_users(),
                products = index.total_products(),
                ratings = index.store().len(),
                "Ingestion progress"
            );
        }
    }

    Ok(line_no)
}
