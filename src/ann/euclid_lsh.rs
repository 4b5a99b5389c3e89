//! Euclid-LSH: reuses the sign-random-projection hash of [`super::lsh`] but
//! ranks by an estimated Euclidean distance, recovered from the Hamming
//! distance via a precomputed cosine correction table.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::ann::lsh::Lsh;
use crate::bits::{build_cos_table, BitArray};
use crate::error::Result;
use crate::snapshot;

const FORMAT_VERSION: u8 = 1;
pub const ALGORITHM_TAG: &str = "euclid_lsh";

#[derive(Debug, Clone)]
pub struct EuclidLsh {
    data: BitArray,
    norms: Vec<f32>,
    cos_table: Vec<f32>,
}

#[derive(Serialize, Deserialize)]
struct EuclidLshData {
    norms: Vec<f32>,
}

fn l2_norm(fv: &[(String, f32)]) -> f32 {
    fv.iter().map(|(_, v)| v * v).sum::<f32>().sqrt()
}

impl EuclidLsh {
    pub fn new(bit_num: u32) -> Self {
        Self {
            data: BitArray::new(bit_num, 0),
            norms: Vec::new(),
            cos_table: build_cos_table(bit_num),
        }
    }

    pub fn bit_num(&self) -> u32 {
        self.data.bit_num()
    }

    fn extend_norms(&mut self, new_len: u32) {
        if (new_len as usize) > self.norms.len() {
            self.norms.resize(new_len as usize, 0.0);
        }
    }

    pub fn set_row(&mut self, id: u32, fv: &[(String, f32)]) -> Result<()> {
        if id > self.data.len() {
            self.data.resize(id)?;
        }
        self.extend_norms(id);
        let hash = Lsh::hash(self.data.bit_num(), fv);
        self.data.set(id - 1, &hash)?;
        self.norms[(id - 1) as usize] = l2_norm(fv);
        Ok(())
    }

    pub fn neighbor_row_from_id(&self, id: u32, k: usize) -> Result<Vec<(u32, f32)>> {
        let query = self.data.get(id - 1)?;
        let q_norm = self.norms[(id - 1) as usize];
        self.data
            .euclid_lsh_scores(&query, q_norm, &self.norms, &self.cos_table, k)
    }

    pub fn neighbor_row_from_fv(&self, fv: &[(String, f32)], k: usize) -> Result<Vec<(u32, f32)>> {
        let query = Lsh::hash(self.data.bit_num(), fv);
        let q_norm = l2_norm(fv);
        self.data
            .euclid_lsh_scores(&query, q_norm, &self.norms, &self.cos_table, k)
    }

    pub fn save<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(&[FORMAT_VERSION])?;
        self.data.save(w)?;
        snapshot::write_versioned(
            w,
            FORMAT_VERSION,
            &EuclidLshData {
                norms: self.norms.clone(),
            },
        )
    }

    pub fn load<R: Read>(r: &mut R) -> Result<Self> {
        let version = snapshot::read_version(r)?;
        match version {
            1 => {
                let data = BitArray::load(r)?;
                let _inner_version = snapshot::read_version(r)?;
                let extra: EuclidLshData = snapshot::read_payload(r)?;
                let cos_table = build_cos_table(data.bit_num());
                Ok(Self {
                    data,
                    norms: extra.norms,
                    cos_table,
                })
            }
            other => Err(crate::error::Error::UnsupportedVersion(other)),
        }
    }
}
