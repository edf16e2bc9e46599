//! Stream segmentation
//!
//! Splits a byte stream into fixed-size segments in a single sequential pass.
//! Every segment is exactly `segment_size` bytes except possibly the last.
//! An empty stream yields no segments.

use crate::error::{GnfdError, Result};
use bytes::Bytes;
use std::io::{self, Read};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Blocking segmenter over any [`Read`] source
pub struct Segmenter<R> {
    reader: R,
    segment_size: usize,
    bytes_read: u64,
    segments: u64,
    finished: bool,
}

impl<R: Read> Segmenter<R> {
    /// Create a segmenter producing `segment_size`-byte segments
    pub fn new(reader: R, segment_size: usize) -> Self {
        Self {
            reader,
            segment_size: segment_size.max(1),
            bytes_read: 0,
            segments: 0,
            finished: false,
        }
    }

    /// Total bytes consumed from the stream so far
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Number of segments produced so far
    pub fn segment_count(&self) -> u64 {
        self.segments
    }

    fn read_segment(&mut self) -> io::Result<Option<Bytes>> {
        let mut buf = vec![0u8; self.segment_size];
        let mut filled = 0;

        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => {
                    self.finished = true;
                    break;
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        if filled == 0 {
            return Ok(None);
        }
        self.bytes_read += filled as u64;
        self.segments += 1;
        Ok(Some(finish_segment(buf, filled)))
    }
}

/// Trim a segment buffer to the bytes actually read. A short last segment
/// gives back the unused part of the allocation.
fn finish_segment(mut buf: Vec<u8>, filled: usize) -> Bytes {
    if filled < buf.len() {
        buf.truncate(filled);
        buf.shrink_to_fit();
    }
    Bytes::from(buf)
}

impl<R: Read> Iterator for Segmenter<R> {
    type Item = Result<Bytes>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.read_segment() {
            Ok(segment) => segment.map(Ok),
            Err(e) => {
                // The partial segment is dropped; the stream is not resumable.
                self.finished = true;
                Some(Err(GnfdError::ReadError(e)))
            }
        }
    }
}

/// Segmenter over an [`AsyncRead`] source
pub struct AsyncSegmenter<R> {
    reader: R,
    segment_size: usize,
    bytes_read: u64,
    segments: u64,
    finished: bool,
}

impl<R: AsyncRead + Unpin> AsyncSegmenter<R> {
    /// Create a segmenter producing `segment_size`-byte segments
    pub fn new(reader: R, segment_size: usize) -> Self {
        Self {
            reader,
            segment_size: segment_size.max(1),
            bytes_read: 0,
            segments: 0,
            finished: false,
        }
    }

    /// Total bytes consumed from the stream so far
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Number of segments produced so far
    pub fn segment_count(&self) -> u64 {
        self.segments
    }

    /// Read the next segment, or `None` at end of stream
    pub async fn next_segment(&mut self) -> Result<Option<Bytes>> {
        if self.finished {
            return Ok(None);
        }

        let mut buf = vec![0u8; self.segment_size];
        let mut filled = 0;

        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]).await {
                Ok(0) => {
                    self.finished = true;
                    break;
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.finished = true;
                    return Err(GnfdError::ReadError(e));
                }
            }
        }

        if filled == 0 {
            return Ok(None);
        }
        self.bytes_read += filled as u64;
        self.segments += 1;
        Ok(Some(finish_segment(buf, filled)))
    }
}
