//! Byte rotation transform.
//!
//! Every byte is shifted by the key modulo 256: `Encrypt` adds the key and
//! `Decrypt` subtracts it. This is a reversible obfuscation (a Caesar cipher
//! over the byte alphabet), not a secure cipher.

use crate::error::TransformError;
use crate::key::{Key, KeyProvider};
use crate::task::{Action, TaskTicket};
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

const CHUNK_SIZE: usize = 64 * 1024;

/// Summary of one completed transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformReport {
    pub bytes: u64,
    pub in_place: bool,
}

pub fn rotate(byte: u8, action: Action, key: Key) -> u8 {
    match action {
        Action::Encrypt => byte.wrapping_add(key.value()),
        Action::Decrypt => byte.wrapping_sub(key.value()),
    }
}

pub fn apply(buf: &mut [u8], action: Action, key: Key) {
    for byte in buf.iter_mut() {
        *byte = rotate(*byte, action, key);
    }
}

/// Rewrite a seekable stream in place from its current position to the end.
///
/// Each chunk is read, transformed, then written back over the bytes it came
/// from, leaving the cursor where the next read continues.
pub fn transform_in_place<F>(file: &mut F, action: Action, key: Key) -> io::Result<u64>
where
    F: Read + Write + Seek,
{
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut total = 0u64;

    loop {
        let n = match file.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };

        apply(&mut buf[..n], action, key);
        file.seek(SeekFrom::Current(-(n as i64)))?;
        file.write_all(&buf[..n])?;
        total += n as u64;
    }

    file.flush()?;
    Ok(total)
}

/// Copy `reader` into `writer`, transforming every byte.
pub fn transform_stream<R, W>(reader: &mut R, writer: &mut W, action: Action, key: Key) -> io::Result<u64>
where
    R: Read,
    W: Write,
{
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut total = 0u64;

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };

        apply(&mut buf[..n], action, key);
        writer.write_all(&buf[..n])?;
        total += n as u64;
    }

    writer.flush()?;
    Ok(total)
}

/// Transform one file synchronously in the calling context.
///
/// When `input` and `output` name the same file it is rewritten in place,
/// otherwise `output` is created or truncated.
pub fn transform_file(
    input: &Path,
    output: &Path,
    action: Action,
    key: Key,
) -> Result<TransformReport, TransformError> {
    if same_file(input, output) {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(output)
            .map_err(|e| TransformError::io(output, e))?;
        let bytes =
            transform_in_place(&mut file, action, key).map_err(|e| TransformError::io(output, e))?;
        return Ok(TransformReport {
            bytes,
            in_place: true,
        });
    }

    let source = File::open(input).map_err(|e| TransformError::io(input, e))?;
    let target = File::create(output).map_err(|e| TransformError::io(output, e))?;
    let mut reader = BufReader::new(source);
    let mut writer = BufWriter::new(target);
    let bytes = transform_stream(&mut reader, &mut writer, action, key)
        .map_err(|e| TransformError::io(output, e))?;

    Ok(TransformReport {
        bytes,
        in_place: false,
    })
}

/// Run a ticket inside a worker: read the key, reopen the files, transform.
pub fn execute(ticket: &TaskTicket, keys: &dyn KeyProvider) -> Result<TransformReport, TransformError> {
    let key = Key::load(keys)?;
    tracing::debug!("{} using key {}", ticket, key);
    transform_file(&ticket.input, &ticket.output, ticket.action, key)
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
