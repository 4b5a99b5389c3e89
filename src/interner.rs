//! Stable integer identifiers for dimension strings.
//!
//! Not thread-safe in isolation; callers that register new dimensions
//! concurrently with readers must hold an enclosing write lock, the same
//! way [`crate::arow::Arow`] and [`crate::pa::PassiveAggressive`] do.

use std::collections::HashMap;
use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::snapshot;

const FORMAT_VERSION: u8 = 1;

#[derive(Debug, Default, Clone)]
pub struct StringInterner {
    storage: HashMap<String, u32>,
    gen: u32,
}

#[derive(Serialize, Deserialize)]
struct InternerData {
    storage: HashMap<String, u32>,
    gen: u32,
}

impl StringInterner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the ID for `s` if already registered, else 0. Never
    /// registers `s`.
    pub fn get_or_zero(&self, s: &str) -> u32 {
        self.storage.get(s).copied().unwrap_or(0)
    }

    /// Returns the ID for `s`, registering it if this is the first time it
    /// has been seen. Idempotent.
    pub fn get(&mut self, s: &str) -> u32 {
        let existing = self.get_or_zero(s);
        if existing != 0 {
            return existing;
        }
        self.gen += 1;
        self.storage.insert(s.to_string(), self.gen);
        self.gen
    }

    pub fn gen(&self) -> u32 {
        self.gen
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    pub fn save<W: Write>(&self, w: &mut W) -> Result<()> {
        snapshot::write_versioned(
            w,
            FORMAT_VERSION,
            &InternerData {
                storage: self.storage.clone(),
                gen: self.gen,
            },
        )
    }

    pub fn load<R: Read>(r: &mut R) -> Result<Self> {
        let version = snapshot::read_version(r)?;
        match version {
            1 => {
                let data: InternerData = snapshot::read_payload(r)?;
                Ok(Self {
                    storage: data.storage,
                    gen: data.gen,
                })
            }
            other => Err(crate::error::Error::UnsupportedVersion(other)),
        }
    }
}
