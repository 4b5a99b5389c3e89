//! Approximate nearest-neighbor indexes over sparse feature vectors.
//!
//! Three hashing strategies share the same bit-packed substrate
//! ([`crate::bits`]) and the same partial-sort ranking
//! ([`crate::sort`]): sign-random-projection LSH, MinHash, and Euclid-LSH.
//! They are exposed as a closed enum rather than a trait object — the set
//! of algorithms is fixed by this crate, so an exhaustive match costs
//! nothing and avoids dynamic dispatch on the hot scoring path.

pub mod euclid_lsh;
pub mod lsh;
pub mod minhash;

use std::io::{Read, Write};

pub use euclid_lsh::EuclidLsh;
pub use lsh::Lsh;
pub use minhash::MinHash;

use crate::error::{Error, Result};
use crate::snapshot;

/// Common capability set every ANN index variant below implements.
pub trait NearestNeighborIndex {
    fn set_row(&mut self, id: u32, fv: &[(String, f32)]) -> Result<()>;
    fn neighbor_row_from_id(&self, id: u32, k: usize) -> Result<Vec<(u32, f32)>>;
    fn neighbor_row_from_fv(&self, fv: &[(String, f32)], k: usize) -> Result<Vec<(u32, f32)>>;
}

impl NearestNeighborIndex for Lsh {
    fn set_row(&mut self, id: u32, fv: &[(String, f32)]) -> Result<()> {
        Lsh::set_row(self, id, fv)
    }
    fn neighbor_row_from_id(&self, id: u32, k: usize) -> Result<Vec<(u32, f32)>> {
        Lsh::neighbor_row_from_id(self, id, k)
    }
    fn neighbor_row_from_fv(&self, fv: &[(String, f32)], k: usize) -> Result<Vec<(u32, f32)>> {
        Lsh::neighbor_row_from_fv(self, fv, k)
    }
}

impl NearestNeighborIndex for MinHash {
    fn set_row(&mut self, id: u32, fv: &[(String, f32)]) -> Result<()> {
        MinHash::set_row(self, id, fv)
    }
    fn neighbor_row_from_id(&self, id: u32, k: usize) -> Result<Vec<(u32, f32)>> {
        MinHash::neighbor_row_from_id(self, id, k)
    }
    fn neighbor_row_from_fv(&self, fv: &[(String, f32)], k: usize) -> Result<Vec<(u32, f32)>> {
        MinHash::neighbor_row_from_fv(self, fv, k)
    }
}

impl NearestNeighborIndex for EuclidLsh {
    fn set_row(&mut self, id: u32, fv: &[(String, f32)]) -> Result<()> {
        EuclidLsh::set_row(self, id, fv)
    }
    fn neighbor_row_from_id(&self, id: u32, k: usize) -> Result<Vec<(u32, f32)>> {
        EuclidLsh::neighbor_row_from_id(self, id, k)
    }
    fn neighbor_row_from_fv(&self, fv: &[(String, f32)], k: usize) -> Result<Vec<(u32, f32)>> {
        EuclidLsh::neighbor_row_from_fv(self, fv, k)
    }
}

/// Which of the three hashing strategies a caller wants. Mirrors the
/// `nearest_neighbor_algorithm` construction parameter a host would pass
/// in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Lsh,
    MinHash,
    EuclidLsh,
}

impl Algorithm {
    pub fn tag(self) -> &'static str {
        match self {
            Algorithm::Lsh => lsh::ALGORITHM_TAG,
            Algorithm::MinHash => minhash::ALGORITHM_TAG,
            Algorithm::EuclidLsh => euclid_lsh::ALGORITHM_TAG,
        }
    }
}

/// A nearest-neighbor index over one of the three supported hash
/// families.
#[derive(Debug, Clone)]
pub enum AnnIndex {
    Lsh(Lsh),
    MinHash(MinHash),
    EuclidLsh(EuclidLsh),
}

impl AnnIndex {
    pub fn new(algorithm: Algorithm, hash_num: u32) -> Result<Self> {
        if hash_num == 0 {
            return Err(Error::InvalidParameter("hash_num must be > 0".to_string()));
        }
        Ok(match algorithm {
            Algorithm::Lsh => AnnIndex::Lsh(Lsh::new(hash_num)),
            Algorithm::MinHash => AnnIndex::MinHash(MinHash::new(hash_num)),
            Algorithm::EuclidLsh => AnnIndex::EuclidLsh(EuclidLsh::new(hash_num)),
        })
    }

    pub fn algorithm_tag(&self) -> &'static str {
        match self {
            AnnIndex::Lsh(_) => lsh::ALGORITHM_TAG,
            AnnIndex::MinHash(_) => minhash::ALGORITHM_TAG,
            AnnIndex::EuclidLsh(_) => euclid_lsh::ALGORITHM_TAG,
        }
    }

    pub fn set_row(&mut self, id: u32, fv: &[(String, f32)]) -> Result<()> {
        match self {
            AnnIndex::Lsh(i) => i.set_row(id, fv),
            AnnIndex::MinHash(i) => i.set_row(id, fv),
            AnnIndex::EuclidLsh(i) => i.set_row(id, fv),
        }
    }

    pub fn neighbor_row_from_id(&self, id: u32, k: usize) -> Result<Vec<(u32, f32)>> {
        match self {
            AnnIndex::Lsh(i) => i.neighbor_row_from_id(id, k),
            AnnIndex::MinHash(i) => i.neighbor_row_from_id(id, k),
            AnnIndex::EuclidLsh(i) => i.neighbor_row_from_id(id, k),
        }
    }

    pub fn neighbor_row_from_fv(&self, fv: &[(String, f32)], k: usize) -> Result<Vec<(u32, f32)>> {
        match self {
            AnnIndex::Lsh(i) => i.neighbor_row_from_fv(fv, k),
            AnnIndex::MinHash(i) => i.neighbor_row_from_fv(fv, k),
            AnnIndex::EuclidLsh(i) => i.neighbor_row_from_fv(fv, k),
        }
    }

    pub fn save<W: Write>(&self, w: &mut W) -> Result<()> {
        snapshot::write_tag_only(w, 1, self.algorithm_tag())?;
        match self {
            AnnIndex::Lsh(i) => i.save(w),
            AnnIndex::MinHash(i) => i.save(w),
            AnnIndex::EuclidLsh(i) => i.save(w),
        }
    }

    pub fn load<R: Read>(r: &mut R) -> Result<Self> {
        let version = snapshot::read_version(r)?;
        match version {
            1 => {
                let tagged: TaggedPeek = snapshot::read_payload(r)?;
                match tagged.algorithm.as_str() {
                    lsh::ALGORITHM_TAG => Ok(AnnIndex::Lsh(Lsh::load(r)?)),
                    minhash::ALGORITHM_TAG => Ok(AnnIndex::MinHash(MinHash::load(r)?)),
                    euclid_lsh::ALGORITHM_TAG => Ok(AnnIndex::EuclidLsh(EuclidLsh::load(r)?)),
                    other => Err(Error::AlgorithmMismatch {
                        expected: "lsh|minhash|euclid_lsh".to_string(),
                        found: other.to_string(),
                    }),
                }
            }
            other => Err(Error::UnsupportedVersion(other)),
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct TaggedPeek {
    algorithm: String,
}
