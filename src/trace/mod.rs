//! Per-iteration trace logs
//!
//! A [`TraceRecord`] is one decision: iteration, target user, the ranked
//! items offered and the elapsed time. Two encodings are supported:
//!
//! - text: one tab-separated line per item,
//!   `iteration\tuser\titem\telapsed_ms`; consecutive lines with the same
//!   iteration and user form one record
//! - binary: big-endian `i32` iteration, `i32` user, `i32` item count, the
//!   `i32` items, then an `i64` timestamp
//!
//! A record without items has no text lines; use the binary codec when
//! empty decisions must survive a round trip.

use std::io::{BufRead, ErrorKind, Read, Write};

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// One logged decision
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceRecord {
    pub iteration: usize,
    pub user: u32,
    /// Offered items, best first
    pub items: Vec<u32>,
    pub elapsed_ms: u64,
}

/// On-disk trace encoding
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraceFormat {
    #[default]
    Text,
    Binary,
}

fn to_i32(value: u64, field: &str) -> SimResult<i32> {
    i32::try_from(value)
        .map_err(|_| SimError::MalformedTrace(format!("{} {} does not fit in i32", field, value)))
}

fn from_i32(value: i32, field: &str) -> SimResult<u32> {
    u32::try_from(value)
        .map_err(|_| SimError::MalformedTrace(format!("negative {}: {}", field, value)))
}

impl TraceRecord {
    /// Text lines of this record, each terminated by `\n`
    pub fn encode_text(&self) -> String {
        self.items
            .iter()
            .map(|item| {
                format!(
                    "{}\t{}\t{}\t{}\n",
                    self.iteration, self.user, item, self.elapsed_ms
                )
            })
            .collect()
    }

    /// Binary form of this record
    pub fn encode_binary(&self) -> SimResult<Vec<u8>> {
        let mut out = Vec::with_capacity(20 + 4 * self.items.len());
        out.extend_from_slice(&to_i32(self.iteration as u64, "iteration")?.to_be_bytes());
        out.extend_from_slice(&to_i32(u64::from(self.user), "user")?.to_be_bytes());
        out.extend_from_slice(&to_i32(self.items.len() as u64, "item count")?.to_be_bytes());
        for &item in &self.items {
            out.extend_from_slice(&to_i32(u64::from(item), "item")?.to_be_bytes());
        }
        let elapsed = i64::try_from(self.elapsed_ms)
            .map_err(|_| SimError::MalformedTrace("timestamp does not fit in i64".into()))?;
        out.extend_from_slice(&elapsed.to_be_bytes());
        Ok(out)
    }

    /// Decode one binary record, `None` on a clean end of input
    pub fn decode_binary<R: Read>(reader: &mut R) -> SimResult<Option<Self>> {
        let mut head = [0u8; 4];
        if !read_or_eof(reader, &mut head)? {
            return Ok(None);
        }
        let iteration = from_i32(i32::from_be_bytes(head), "iteration")? as usize;
        let user = from_i32(read_i32(reader)?, "user")?;
        let count = from_i32(read_i32(reader)?, "item count")? as usize;
        let mut items = Vec::with_capacity(count.min(1 << 16));
        for _ in 0..count {
            items.push(from_i32(read_i32(reader)?, "item")?);
        }
        let mut stamp = [0u8; 8];
        reader.read_exact(&mut stamp).map_err(truncated)?;
        let elapsed = i64::from_be_bytes(stamp);
        let elapsed_ms = u64::try_from(elapsed)
            .map_err(|_| SimError::MalformedTrace(format!("negative timestamp: {}", elapsed)))?;
        Ok(Some(Self {
            iteration,
            user,
            items,
            elapsed_ms,
        }))
    }
}

fn truncated(err: std::io::Error) -> SimError {
    if err.kind() == ErrorKind::UnexpectedEof {
        SimError::MalformedTrace("truncated record".into())
    } else {
        SimError::Io(err)
    }
}

fn read_i32<R: Read>(reader: &mut R) -> SimResult<i32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf).map_err(truncated)?;
    Ok(i32::from_be_bytes(buf))
}

/// Fill `buf`; `false` if the input ended before the first byte
fn read_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> SimResult<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(false),
            Ok(0) => return Err(SimError::MalformedTrace("truncated record".into())),
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(SimError::Io(e)),
        }
    }
    Ok(true)
}

/// Writes records in one format
pub struct TraceWriter<W: Write> {
    inner: W,
    format: TraceFormat,
    written: usize,
}

impl<W: Write> TraceWriter<W> {
    pub fn new(inner: W, format: TraceFormat) -> Self {
        Self {
            inner,
            format,
            written: 0,
        }
    }

    /// Append one record
    pub fn write(&mut self, record: &TraceRecord) -> SimResult<()> {
        match self.format {
            TraceFormat::Text => self.inner.write_all(record.encode_text().as_bytes())?,
            TraceFormat::Binary => self.inner.write_all(&record.encode_binary()?)?,
        }
        self.written += 1;
        Ok(())
    }

    /// Records written so far
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn flush(&mut self) -> SimResult<()> {
        self.inner.flush()?;
        Ok(())
    }

    /// Flush and hand back the sink
    pub fn into_inner(mut self) -> SimResult<W> {
        self.flush()?;
        Ok(self.inner)
    }
}

fn parse_field<T: std::str::FromStr>(field: Option<&str>, name: &str, line: usize) -> SimResult<T> {
    field
        .and_then(|f| f.trim().parse().ok())
        .ok_or_else(|| SimError::MalformedTrace(format!("line {}: bad {}", line, name)))
}

/// Read a text trace
pub fn read_text<R: BufRead>(reader: R) -> SimResult<Vec<TraceRecord>> {
    let mut records: Vec<TraceRecord> = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let number = index + 1;
        let mut fields = line.split('\t');
        let iteration: usize = parse_field(fields.next(), "iteration", number)?;
        let user: u32 = parse_field(fields.next(), "user", number)?;
        let item: u32 = parse_field(fields.next(), "item", number)?;
        let elapsed_ms: u64 = parse_field(fields.next(), "elapsed time", number)?;

        match records.last_mut() {
            Some(last) if last.iteration == iteration && last.user == user => {
                last.items.push(item);
            }
            _ => records.push(TraceRecord {
                iteration,
                user,
                items: vec![item],
                elapsed_ms,
            }),
        }
    }
    Ok(records)
}

/// Read a binary trace
pub fn read_binary<R: Read>(mut reader: R) -> SimResult<Vec<TraceRecord>> {
    let mut records = Vec::new();
    while let Some(record) = TraceRecord::decode_binary(&mut reader)? {
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn record() -> TraceRecord {
        TraceRecord {
            iteration: 7,
            user: 3,
            items: vec![12, 4, 9],
            elapsed_ms: 15,
        }
    }

    #[test]
    fn test_text_lines() {
        assert_eq!(
            record().encode_text(),
            "7\t3\t12\t15\n7\t3\t4\t15\n7\t3\t9\t15\n"
        );
    }

    #[test]
    fn test_binary_layout() {
        let bytes = record().encode_binary().unwrap();
        assert_eq!(bytes.len(), 4 * 3 + 4 * 3 + 8);
        assert_eq!(&bytes[0..4], &[0, 0, 0, 7]);
        assert_eq!(&bytes[8..12], &[0, 0, 0, 3]);
        assert_eq!(&bytes[bytes.len() - 8..], &15i64.to_be_bytes());
    }

    #[test]
    fn test_both_codecs_agree() {
        let records = vec![
            record(),
            TraceRecord {
                iteration: 8,
                user: 1,
                items: vec![0],
                elapsed_ms: 0,
            },
        ];

        let mut text = TraceWriter::new(Vec::new(), TraceFormat::Text);
        let mut binary = TraceWriter::new(Vec::new(), TraceFormat::Binary);
        for r in &records {
            text.write(r).unwrap();
            binary.write(r).unwrap();
        }
        assert_eq!(text.written(), 2);

        let from_text = read_text(Cursor::new(text.into_inner().unwrap())).unwrap();
        let from_binary = read_binary(Cursor::new(binary.into_inner().unwrap())).unwrap();
        assert_eq!(from_text, records);
        assert_eq!(from_binary, records);
    }

    #[test]
    fn test_truncated_binary() {
        let bytes = record().encode_binary().unwrap();
        let err = read_binary(Cursor::new(&bytes[..bytes.len() - 3])).unwrap_err();
        assert!(matches!(err, SimError::MalformedTrace(_)));
    }

    #[test]
    fn test_malformed_text() {
        let err = read_text(Cursor::new("1\t2\tx\t0\n")).unwrap_err();
        assert!(matches!(err, SimError::MalformedTrace(_)));
    }

    #[test]
    fn test_out_of_range_iteration() {
        let big = TraceRecord {
            iteration: usize::MAX,
            user: 0,
            items: vec![],
            elapsed_ms: 0,
        };
        assert!(big.encode_binary().is_err());
    }
}
