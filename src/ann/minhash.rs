//! MinHash: ranks by Hamming distance between per-position minimum-sample
//! winners, approximating Jaccard similarity between feature sets.

use std::io::{Read, Write};

use crate::bits::{BitArray, BitVector};
use crate::error::Result;
use crate::hash::{fnv1_64, minhash_sample};
use crate::snapshot;

const FORMAT_VERSION: u8 = 1;
pub const ALGORITHM_TAG: &str = "minhash";

#[derive(Debug, Clone)]
pub struct MinHash {
    data: BitArray,
}

impl MinHash {
    pub fn new(bit_num: u32) -> Self {
        Self {
            data: BitArray::new(bit_num, 0),
        }
    }

    pub fn bit_num(&self) -> u32 {
        self.data.bit_num()
    }

    pub(crate) fn hash(bit_num: u32, fv: &[(String, f32)]) -> BitVector {
        let mut min_values = vec![f32::INFINITY; bit_num as usize];
        let mut winning_hash = vec![0u64; bit_num as usize];

        for (dim, value) in fv {
            if *value == 0.0 {
                continue;
            }
            let dim_hash = fnv1_64(dim);
            for j in 0..bit_num as u64 {
                let sample = minhash_sample(dim_hash, j, *value);
                let slot = j as usize;
                if sample < min_values[slot] {
                    min_values[slot] = sample;
                    winning_hash[slot] = dim_hash;
                }
            }
        }

        let mut out = BitVector::new(bit_num);
        for (j, h) in winning_hash.iter().enumerate() {
            if h & 1 == 1 {
                out.set(j as u32).unwrap();
            }
        }
        out
    }

    pub fn set_row(&mut self, id: u32, fv: &[(String, f32)]) -> Result<()> {
        if id > self.data.len() {
            self.data.resize(id)?;
        }
        let hash = Self::hash(self.data.bit_num(), fv);
        self.data.set(id - 1, &hash)
    }

    pub fn neighbor_row_from_id(&self, id: u32, k: usize) -> Result<Vec<(u32, f32)>> {
        let query = self.data.get(id - 1)?;
        self.data.rank_by_hamming(&query, k)
    }

    pub fn neighbor_row_from_fv(&self, fv: &[(String, f32)], k: usize) -> Result<Vec<(u32, f32)>> {
        let query = Self::hash(self.data.bit_num(), fv);
        self.data.rank_by_hamming(&query, k)
    }

    pub fn save<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(&[FORMAT_VERSION])?;
        self.data.save(w)
    }

    pub fn load<R: Read>(r: &mut R) -> Result<Self> {
        let version = snapshot::read_version(r)?;
        match version {
            1 => Ok(Self {
                data: BitArray::load(r)?,
            }),
            other => Err(crate::error::Error::UnsupportedVersion(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fv(pairs: &[(&str, f32)]) -> Vec<(String, f32)> {
        pairs.iter().map(|&(d, v)| (d.to_string(), v)).collect()
    }

    #[test]
    fn identical_sets_hash_identically() {
        let a = MinHash::hash(24, &fv(&[("a", 1.0), ("b", 1.0)]));
        let b = MinHash::hash(24, &fv(&[("a", 1.0), ("b", 1.0)]));
        assert_eq!(a, b);
    }

    #[test]
    fn disjoint_sets_are_not_trivially_identical() {
        let a = MinHash::hash(64, &fv(&[("a", 1.0)]));
        let b = MinHash::hash(64, &fv(&[("z", 1.0)]));
        assert_ne!(a, b);
    }
}
