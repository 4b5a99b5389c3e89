//! Sign-random-projection LSH: ranks by Hamming distance between signed
//! random projections, approximating cosine similarity.

use std::io::{Read, Write};

use crate::bits::{BitArray, BitVector};
use crate::error::Result;
use crate::hash::{fnv1_64, gaussian_projection};
use crate::snapshot;

const FORMAT_VERSION: u8 = 1;
pub const ALGORITHM_TAG: &str = "lsh";

#[derive(Debug, Clone)]
pub struct Lsh {
    data: BitArray,
}

impl Lsh {
    pub fn new(bit_num: u32) -> Self {
        Self {
            data: BitArray::new(bit_num, 0),
        }
    }

    pub fn bit_num(&self) -> u32 {
        self.data.bit_num()
    }

    /// Signs `B` random-projection accumulators, one per dimension in
    /// `fv`, with a Gaussian vector seeded from the dimension's hash.
    pub(crate) fn hash(bit_num: u32, fv: &[(String, f32)]) -> BitVector {
        let mut accum = vec![0.0f64; bit_num as usize];
        for (dim, value) in fv {
            let dim_hash = fnv1_64(dim);
            let projection = gaussian_projection(dim_hash, bit_num);
            for (a, p) in accum.iter_mut().zip(projection.iter()) {
                *a += *value as f64 * (*p as f64);
            }
        }
        let mut out = BitVector::new(bit_num);
        for (j, a) in accum.iter().enumerate() {
            if *a > 0.0 {
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
    fn identical_vectors_hash_identically() {
        let a = Lsh::hash(32, &fv(&[("a", 1.0), ("b", 2.0)]));
        let b = Lsh::hash(32, &fv(&[("a", 1.0), ("b", 2.0)]));
        assert_eq!(a, b);
    }

    #[test]
    fn neighbor_query_returns_self_first() {
        let mut idx = Lsh::new(16);
        idx.set_row(1, &fv(&[("a", 1.0)])).unwrap();
        idx.set_row(2, &fv(&[("z", -5.0)])).unwrap();
        let neighbors = idx.neighbor_row_from_id(1, 2).unwrap();
        assert_eq!(neighbors[0].0, 1);
        assert_eq!(neighbors[0].1, 0.0);
    }
}
