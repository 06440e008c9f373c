//! Ordered interaction logs
//!
//! Sequential selection consumes a [`RatingStream`]. End of data is a normal
//! `Ok(None)` return; only genuine read failures are errors.

use std::collections::VecDeque;
use std::io::{self, BufRead};

use super::rating::Rating;
use crate::error::{SimError, SimResult};

/// An ordered source of interactions
pub trait RatingStream: Send {
    /// Move to the next interaction, `Ok(None)` once the log is exhausted
    fn advance(&mut self) -> SimResult<Option<Rating>>;
}

/// In-memory log
#[derive(Clone, Debug, Default)]
pub struct VecStream {
    ratings: VecDeque<Rating>,
}

impl VecStream {
    /// Create a stream over the given ratings, in order
    pub fn new(ratings: impl IntoIterator<Item = Rating>) -> Self {
        Self {
            ratings: ratings.into_iter().collect(),
        }
    }

    /// Remaining interactions
    pub fn len(&self) -> usize {
        self.ratings.len()
    }

    /// True when exhausted
    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }
}

impl RatingStream for VecStream {
    fn advance(&mut self) -> SimResult<Option<Rating>> {
        Ok(self.ratings.pop_front())
    }
}

/// Log of tab-separated `user\titem[\tvalue]` lines
///
/// A missing value column means an implicit interaction of value `1.0`.
/// Blank lines are skipped.
pub struct LineStream<R> {
    reader: R,
    line: String,
    line_number: usize,
}

impl<R: BufRead + Send> LineStream<R> {
    /// Wrap a buffered reader
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            line_number: 0,
        }
    }

    fn parse_line(&self) -> SimResult<Rating> {
        let mut fields = self.line.trim_end().split('\t');
        let user = self.parse_field(fields.next(), "user")?;
        let item = self.parse_field(fields.next(), "item")?;
        let value = match fields.next() {
            Some(raw) => raw.trim().parse::<f64>().map_err(|e| self.invalid(e))?,
            None => 1.0,
        };
        Ok(Rating::new(user, item, value))
    }

    fn parse_field(&self, field: Option<&str>, name: &str) -> SimResult<u32> {
        let raw = field.ok_or_else(|| self.invalid(format!("missing {} column", name)))?;
        raw.trim().parse::<u32>().map_err(|e| self.invalid(e))
    }

    fn invalid(&self, cause: impl std::fmt::Display) -> SimError {
        SimError::Io(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("line {}: {}", self.line_number, cause),
        ))
    }
}

impl<R: BufRead + Send> RatingStream for LineStream<R> {
    fn advance(&mut self) -> SimResult<Option<Rating>> {
        loop {
            self.line.clear();
            let read = self.reader.read_line(&mut self.line)?;
            if read == 0 {
                return Ok(None);
            }
            self.line_number += 1;
            if self.line.trim().is_empty() {
                continue;
            }
            return self.parse_line().map(Some);
        }
    }
}
