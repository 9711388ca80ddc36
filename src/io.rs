//! Byte source and sink traits - the only I/O the coder needs.
//!
//! The range coder reads and writes one byte at a time. Anything that can hand
//! out or accept single bytes can back a coding pass: in-memory slices,
//! vectors, or any [`std::io::Read`] / [`std::io::Write`] via the adapters
//! below. Wrap files in `BufReader` / `BufWriter` before adapting them.

use crate::error::Result;
use std::io::{self, Read, Write};

/// Source of bytes for a decoding pass.
///
/// Returning `None` signals end of stream. The decoder treats everything past
/// the end as zero bits, which is how the encoder's trailing padding is
/// completed.
pub trait ByteSource {
    fn read_byte(&mut self) -> Option<u8>;
}

/// Sink of bytes for an encoding pass.
pub trait ByteSink {
    fn write_byte(&mut self, byte: u8) -> Result<()>;
}

impl<T: ByteSource + ?Sized> ByteSource for &mut T {
    #[inline]
    fn read_byte(&mut self) -> Option<u8> {
        (**self).read_byte()
    }
}

impl<T: ByteSink + ?Sized> ByteSink for &mut T {
    #[inline]
    fn write_byte(&mut self, byte: u8) -> Result<()> {
        (**self).write_byte(byte)
    }
}

impl ByteSink for Vec<u8> {
    #[inline]
    fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.push(byte);
        Ok(())
    }
}

/// Byte source over a borrowed slice.
#[derive(Debug, Clone)]
pub struct SliceSource<'a> {
    data: &'a [u8],
    pos: usize,
    /// Reads attempted after the slice was exhausted.
    overrun: usize,
}

impl<'a> SliceSource<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            overrun: 0,
        }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of reads that found the slice already exhausted.
    pub fn overrun(&self) -> usize {
        self.overrun
    }
}

impl ByteSource for SliceSource<'_> {
    #[inline]
    fn read_byte(&mut self) -> Option<u8> {
        match self.data.get(self.pos) {
            Some(&b) => {
                self.pos += 1;
                Some(b)
            }
            None => {
                self.overrun += 1;
                None
            }
        }
    }
}

/// Adapter from [`std::io::Read`].
///
/// A read error ends the stream like EOF does; the error is kept and can be
/// inspected with [`IoSource::take_error`] once the pass is over.
#[derive(Debug)]
pub struct IoSource<R> {
    inner: R,
    error: Option<io::Error>,
}

impl<R: Read> IoSource<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, error: None }
    }

    /// Take the first I/O error encountered, if any.
    pub fn take_error(&mut self) -> Option<io::Error> {
        self.error.take()
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> ByteSource for IoSource<R> {
    fn read_byte(&mut self) -> Option<u8> {
        if self.error.is_some() {
            return None;
        }
        let mut buf = [0u8; 1];
        loop {
            match self.inner.read(&mut buf) {
                Ok(0) => return None,
                Ok(_) => return Some(buf[0]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.error = Some(e);
                    return None;
                }
            }
        }
    }
}

/// Adapter from [`std::io::Write`].
#[derive(Debug)]
pub struct IoSink<W> {
    inner: W,
}

impl<W: Write> IoSink<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> ByteSink for IoSink<W> {
    fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.inner.write_all(&[byte])?;
        Ok(())
    }
}
