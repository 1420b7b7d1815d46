//! Output comparison: golden file against generated file.
//!
//! Without transforms both files are streamed and the comparison stops at the
//! first differing byte. With transforms both files are read fully, normalized,
//! then compared.

use crate::case::{Comparison, Transform};
use crate::runner::Failure;
use regex::bytes::Regex;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

const CHUNK: usize = 8 * 1024;

/// Check one comparison, returning the reason it failed if it did.
pub fn compare(comparison: &Comparison) -> Result<(), Failure> {
    let expected = comparison.expected();
    let actual = comparison.actual();

    let expected_len = file_len(expected, Failure::MissingInputFile)?;
    let actual_len = file_len(actual, Failure::MissingOutputFile)?;

    if comparison.transforms().is_empty() {
        return compare_streams(expected, actual, expected_len, actual_len);
    }

    let left = apply_transforms(read_all(expected)?, comparison.transforms())?;
    let right = apply_transforms(read_all(actual)?, comparison.transforms())?;
    match first_difference(&left, &right) {
        None => Ok(()),
        Some(offset) => Err(mismatch(
            comparison,
            offset,
            left.len() as u64,
            right.len() as u64,
        )),
    }
}

/// Offset of the first differing byte, or of the shorter length if one is a prefix.
pub fn first_difference(a: &[u8], b: &[u8]) -> Option<usize> {
    match a.iter().zip(b).position(|(x, y)| x != y) {
        Some(pos) => Some(pos),
        None if a.len() != b.len() => Some(a.len().min(b.len())),
        None => None,
    }
}

/// Apply `transforms` in order.
pub fn apply_transforms(mut data: Vec<u8>, transforms: &[Transform]) -> Result<Vec<u8>, Failure> {
    for transform in transforms {
        data = match transform {
            Transform::NormalizeLineEndings => normalize_line_endings(&data),
            Transform::StripTrailingWhitespace => strip_trailing_whitespace(&data),
            Transform::Replace { pattern, with } => {
                let re = Regex::new(pattern).map_err(|e| Failure::InvalidTransform {
                    pattern: pattern.clone(),
                    message: e.to_string(),
                })?;
                re.replace_all(&data, with.as_bytes()).into_owned()
            }
        };
    }
    Ok(data)
}

fn compare_streams(
    expected: &Path,
    actual: &Path,
    expected_len: u64,
    actual_len: u64,
) -> Result<(), Failure> {
    let mut left = BufReader::new(open(expected)?);
    let mut right = BufReader::new(open(actual)?);
    let mut lbuf = vec![0u8; CHUNK];
    let mut rbuf = vec![0u8; CHUNK];
    let mut offset: u64 = 0;

    loop {
        let ln = read_chunk(&mut left, &mut lbuf).map_err(|e| io_failure(expected, e))?;
        let rn = read_chunk(&mut right, &mut rbuf).map_err(|e| io_failure(actual, e))?;

        if let Some(pos) = first_difference(&lbuf[..ln], &rbuf[..rn]) {
            return Err(Failure::ContentMismatch {
                expected: expected.to_path_buf(),
                actual: actual.to_path_buf(),
                offset: offset + pos as u64,
                expected_len,
                actual_len,
            });
        }
        if ln == 0 {
            return Ok(());
        }
        offset += ln as u64;
    }
}

/// Fill `buf` as far as the reader allows; returns bytes read, 0 at EOF.
fn read_chunk(reader: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn normalize_line_endings(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut iter = data.iter().peekable();
    while let Some(&b) = iter.next() {
        if b == b'\r' {
            if iter.peek() == Some(&&b'\n') {
                iter.next();
            }
            out.push(b'\n');
        } else {
            out.push(b);
        }
    }
    out
}

fn strip_trailing_whitespace(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    for (i, line) in data.split(|&b| b == b'\n').enumerate() {
        if i > 0 {
            out.push(b'\n');
        }
        let end = line
            .iter()
            .rposition(|&b| b != b' ' && b != b'\t')
            .map_or(0, |p| p + 1);
        out.extend_from_slice(&line[..end]);
    }
    out
}

fn file_len(path: &Path, missing: fn(std::path::PathBuf) -> Failure) -> Result<u64, Failure> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() => Ok(meta.len()),
        Ok(_) => Err(Failure::Io {
            path: path.to_path_buf(),
            message: "not a regular file".to_string(),
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(missing(path.to_path_buf())),
        Err(e) => Err(io_failure(path, e)),
    }
}

fn open(path: &Path) -> Result<File, Failure> {
    File::open(path).map_err(|e| io_failure(path, e))
}

fn read_all(path: &Path) -> Result<Vec<u8>, Failure> {
    std::fs::read(path).map_err(|e| io_failure(path, e))
}

fn io_failure(path: &Path, e: std::io::Error) -> Failure {
    Failure::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

fn mismatch(comparison: &Comparison, offset: usize, expected_len: u64, actual_len: u64) -> Failure {
    Failure::ContentMismatch {
        expected: comparison.expected().to_path_buf(),
        actual: comparison.actual().to_path_buf(),
        offset: offset as u64,
        expected_len,
        actual_len,
    }
}
