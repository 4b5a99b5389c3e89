//! Shared framing for the versioned, tagged snapshot envelopes every engine
//! uses to persist itself: a single version byte, an optional algorithm tag,
//! then a MessagePack-encoded fixed-order payload.

use std::io::{Read, Write};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{Error, Result};

/// Writes `version` as a single byte, then `payload` as a MessagePack array
/// (field names are not encoded, so the payload struct's field order is
/// part of the wire format).
pub fn write_versioned<W: Write, T: Serialize>(w: &mut W, version: u8, payload: &T) -> Result<()> {
    w.write_all(&[version])?;
    rmp_serde::encode::write(w, payload)?;
    Ok(())
}

/// Reads the version byte and returns it alongside a reader positioned at
/// the start of the payload. Callers dispatch on the version themselves.
pub fn read_version<R: Read>(r: &mut R) -> Result<u8> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

pub fn read_payload<R: Read, T: DeserializeOwned>(r: &mut R) -> Result<T> {
    Ok(rmp_serde::decode::from_read(r)?)
}

/// The outer envelope engines expose to their host: a version byte, an
/// algorithm tag, then the engine-specific payload.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct Tagged {
    algorithm: String,
}

pub fn write_tagged<W: Write, T: Serialize>(
    w: &mut W,
    version: u8,
    algorithm: &str,
    payload: &T,
) -> Result<()> {
    write_tag_only(w, version, algorithm)?;
    rmp_serde::encode::write(w, payload)?;
    Ok(())
}

/// Writes just the version byte and algorithm tag, with no payload
/// following. Used when the payload is written separately by a nested
/// `save` call (e.g. [`crate::ann::AnnIndex::save`]).
pub fn write_tag_only<W: Write>(w: &mut W, version: u8, algorithm: &str) -> Result<()> {
    w.write_all(&[version])?;
    rmp_serde::encode::write(
        w,
        &Tagged {
            algorithm: algorithm.to_string(),
        },
    )?;
    Ok(())
}

/// Reads the version and algorithm tag, verifying the tag matches
/// `expected_algorithm`, then returns a reader ready for the payload.
pub fn read_tagged<R: Read>(r: &mut R, expected_algorithm: &str) -> Result<u8> {
    let version = read_version(r)?;
    let tagged: Tagged = rmp_serde::decode::from_read(&mut *r)?;
    if tagged.algorithm != expected_algorithm {
        return Err(Error::AlgorithmMismatch {
            expected: expected_algorithm.to_string(),
            found: tagged.algorithm,
        });
    }
    Ok(version)
}
