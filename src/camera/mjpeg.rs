//! Splitting a byte stream of concatenated JPEG images into frames.
//!
//! Capture pipelines such as `jpegenc ! fdsink` write one JPEG after another
//! with no container around them. Frames are delimited by walking the JPEG
//! marker structure rather than searching for `FF D9`, so embedded thumbnails
//! inside `APPn` segments do not end a frame early:
//!
//! ```text
//! FF D8                      SOI
//! FF Ex <len> ...            APPn / DQT / SOF / DHT ... (skipped by length)
//! FF DA <len> ... entropy    SOS, then scan data until the next real marker
//! FF D9                      EOI
//! ```
//!
//! Inside scan data `FF 00` is a stuffed byte and `FF D0..D7` are restart
//! markers; any other marker ends the scan (progressive images have several).

use std::io::{self, BufRead, Read};

const MARKER: u8 = 0xFF;
const SOI: u8 = 0xD8;
const EOI: u8 = 0xD9;
const SOS: u8 = 0xDA;
const TEM: u8 = 0x01;
const RST: std::ops::RangeInclusive<u8> = 0xD0..=0xD7;

/// Upper bound on one frame, so a corrupt stream cannot grow a frame forever.
pub const MAX_FRAME_BYTES: usize = 64 * 1024 * 1024;

/// Read the next complete JPEG from `reader`.
///
/// Bytes before the next start-of-image marker are skipped. Returns
/// `Ok(None)` when the stream ends before a new frame starts; a stream that
/// ends or breaks the marker structure mid-frame is an error. After an error
/// the next call resynchronizes on the following start-of-image marker.
pub fn read_jpeg<R: BufRead>(reader: &mut R) -> io::Result<Option<Vec<u8>>> {
    if !skip_to_soi(reader)? {
        return Ok(None);
    }

    let mut frame = vec![MARKER, SOI];
    let mut marker = read_marker(reader, &mut frame)?;
    loop {
        marker = match marker {
            EOI => return Ok(Some(frame)),
            SOS => {
                read_segment(reader, &mut frame)?;
                read_scan(reader, &mut frame)?
            }
            TEM => read_marker(reader, &mut frame)?,
            m if RST.contains(&m) => read_marker(reader, &mut frame)?,
            _ => {
                read_segment(reader, &mut frame)?;
                read_marker(reader, &mut frame)?
            }
        };
        if frame.len() > MAX_FRAME_BYTES {
            return Err(invalid("frame exceeds size limit"));
        }
    }
}

fn next_byte<R: BufRead>(reader: &mut R) -> io::Result<Option<u8>> {
    let byte = reader.fill_buf()?.first().copied();
    if byte.is_some() {
        reader.consume(1);
    }
    Ok(byte)
}

fn require_byte<R: BufRead>(reader: &mut R) -> io::Result<u8> {
    next_byte(reader)?.ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "stream ended inside a JPEG frame",
        )
    })
}

fn invalid(message: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message.to_string())
}

/// Consume bytes up to and including the next `FF D8`. False on end of stream.
fn skip_to_soi<R: BufRead>(reader: &mut R) -> io::Result<bool> {
    let mut previous = 0u8;
    while let Some(byte) = next_byte(reader)? {
        if previous == MARKER && byte == SOI {
            return Ok(true);
        }
        previous = byte;
    }
    Ok(false)
}

/// Read `FF <marker>`, skipping fill bytes, and append it to `frame`.
fn read_marker<R: BufRead>(reader: &mut R, frame: &mut Vec<u8>) -> io::Result<u8> {
    if require_byte(reader)? != MARKER {
        return Err(invalid("expected a JPEG marker"));
    }
    let mut marker = require_byte(reader)?;
    while marker == MARKER {
        marker = require_byte(reader)?;
    }
    if marker == 0x00 {
        return Err(invalid("stuffed byte outside scan data"));
    }
    frame.extend([MARKER, marker]);
    Ok(marker)
}

/// Copy a length-prefixed segment body into `frame`.
fn read_segment<R: BufRead>(reader: &mut R, frame: &mut Vec<u8>) -> io::Result<()> {
    let len = u16::from_be_bytes([require_byte(reader)?, require_byte(reader)?]);
    if len < 2 {
        return Err(invalid("segment length below 2"));
    }
    frame.extend(len.to_be_bytes());

    let body = usize::from(len - 2);
    let copied = Read::take(&mut *reader, body as u64).read_to_end(frame)?;
    if copied != body {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "stream ended inside a JPEG segment",
        ));
    }
    Ok(())
}

/// Copy entropy-coded data into `frame` and return the marker that ends it.
fn read_scan<R: BufRead>(reader: &mut R, frame: &mut Vec<u8>) -> io::Result<u8> {
    loop {
        let byte = require_byte(reader)?;
        if byte != MARKER {
            frame.push(byte);
            if frame.len() > MAX_FRAME_BYTES {
                return Err(invalid("frame exceeds size limit"));
            }
            continue;
        }

        let mut next = require_byte(reader)?;
        while next == MARKER {
            next = require_byte(reader)?;
        }
        frame.extend([MARKER, next]);
        if next != 0x00 && !RST.contains(&next) {
            return Ok(next);
        }
    }
}
