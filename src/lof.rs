//! LightLOF: an incremental local-outlier-factor anomaly scorer layered on
//! top of an ANN index, with a fixed-capacity random-replacement eviction
//! policy once the point budget is exhausted.

use std::io::{Read, Write};

use parking_lot::RwLock;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::ann::{Algorithm, AnnIndex};
use crate::error::{Error, Result};
use crate::snapshot;

const FORMAT_VERSION: u8 = 1;
pub const ALGORITHM_TAG: &str = "light_lof";

/// Unbounded capacity sentinel: a host passing `max_size = 0` gets
/// effectively unbounded growth up to this ceiling.
const UNBOUNDED_MAX_SIZE: u32 = i32::MAX as u32;

struct Inner {
    nn: AnnIndex,
    nn_num: u32,
    rnn_num: u32,
    max_size: u32,
    kdist: Vec<f32>,
    lrd: Vec<f32>,
    rng: rand::rngs::StdRng,
    next_id: u32,
}

pub struct LightLof {
    inner: RwLock<Inner>,
}

#[derive(Serialize, Deserialize)]
struct LightLofData {
    nn_num: u32,
    rnn_num: u32,
    max_size: u32,
    kdist: Vec<f32>,
    lrd: Vec<f32>,
    next_id: u32,
    rng_seed: u64,
}

impl LightLof {
    /// `max_size == 0` means unbounded (up to `i32::MAX` points).
    pub fn new(algorithm: Algorithm, hash_num: u32, nn_num: u32, rnn_num: u32, max_size: u32) -> Result<Self> {
        if nn_num < 2 {
            return Err(Error::InvalidParameter(
                "nearest_neighbor_num must be >= 2".to_string(),
            ));
        }
        if rnn_num < nn_num {
            return Err(Error::InvalidParameter(
                "reverse_nearest_neighbor_num must be >= nearest_neighbor_num".to_string(),
            ));
        }
        let nn = AnnIndex::new(algorithm, hash_num)?;
        let max_size = if max_size == 0 { UNBOUNDED_MAX_SIZE } else { max_size };
        Ok(Self {
            inner: RwLock::new(Inner {
                nn,
                nn_num,
                rnn_num,
                max_size,
                kdist: Vec::new(),
                lrd: Vec::new(),
                rng: rand::rngs::StdRng::seed_from_u64(0),
                next_id: 0,
            }),
        })
    }

    /// Adds `fv` as a new point (or overwrites an evicted slot once at
    /// capacity), then returns its LOF score.
    pub fn add(&self, fv: &[(String, f32)]) -> Result<f32> {
        let mut inner = self.inner.write();
        let id = inner.allocate_id();
        inner.nn.set_row(id, fv)?;
        inner.recompute_around(id)?;
        inner.calc_lof_for_stored(id)
    }

    /// Same as [`LightLof::add`] but does not compute or return a score.
    pub fn add_without_calc_score(&self, fv: &[(String, f32)]) -> Result<()> {
        let mut inner = self.inner.write();
        let id = inner.allocate_id();
        inner.nn.set_row(id, fv)?;
        inner.recompute_around(id)
    }

    /// Scores `fv` as an ad-hoc query without mutating any stored state.
    pub fn calc_score(&self, fv: &[(String, f32)]) -> Result<f32> {
        let inner = self.inner.read();
        inner.calc_lof_for_query(fv)
    }

    pub fn save<W: Write>(&self, w: &mut W) -> Result<()> {
        let inner = self.inner.read();
        snapshot::write_tag_only(w, FORMAT_VERSION, ALGORITHM_TAG)?;
        inner.nn.save(w)?;
        snapshot::write_versioned(
            w,
            FORMAT_VERSION,
            &LightLofData {
                nn_num: inner.nn_num,
                rnn_num: inner.rnn_num,
                max_size: inner.max_size,
                kdist: inner.kdist.clone(),
                lrd: inner.lrd.clone(),
                next_id: inner.next_id,
                rng_seed: 0,
            },
        )
    }

    pub fn load<R: Read>(r: &mut R) -> Result<Self> {
        let version = snapshot::read_tagged(r, ALGORITHM_TAG)?;
        match version {
            1 => {
                let nn = AnnIndex::load(r)?;
                let _inner_version = snapshot::read_version(r)?;
                let data: LightLofData = snapshot::read_payload(r)?;
                Ok(Self {
                    inner: RwLock::new(Inner {
                        nn,
                        nn_num: data.nn_num,
                        rnn_num: data.rnn_num,
                        max_size: data.max_size,
                        kdist: data.kdist,
                        lrd: data.lrd,
                        rng: rand::rngs::StdRng::seed_from_u64(data.rng_seed),
                        next_id: data.next_id,
                    }),
                })
            }
            other => Err(Error::UnsupportedVersion(other)),
        }
    }
}

impl Inner {
    fn allocate_id(&mut self) -> u32 {
        let live = self.kdist.len() as u32;
        if live < self.max_size {
            self.next_id += 1;
            self.kdist.push(0.0);
            self.lrd.push(0.0);
            self.next_id
        } else {
            let victim = self.rng.gen_range(1..=self.max_size);
            self.kdist[(victim - 1) as usize] = 0.0;
            self.lrd[(victim - 1) as usize] = 0.0;
            log::debug!("light_lof evicting slot {victim} to make room for a new point");
            victim
        }
    }

    /// Neighbors of a point already stored at `id`: query for `nn_num + 1`
    /// and discard the entry matching `id` itself, since a stored point is
    /// always its own closest neighbor at distance 0 otherwise.
    fn neighbors_of_stored(&self, id: u32, k: u32) -> Result<Vec<(u32, f32)>> {
        let raw = self.nn.neighbor_row_from_id(id, (k + 1) as usize)?;
        let mut filtered: Vec<(u32, f32)> = raw.into_iter().filter(|&(nid, _)| nid != id).collect();
        filtered.truncate(k as usize);
        Ok(filtered)
    }

    fn kdist_of(&self, id: u32) -> f32 {
        self.kdist.get((id - 1) as usize).copied().unwrap_or(f32::INFINITY)
    }

    fn lrd_of(&self, id: u32) -> f32 {
        self.lrd.get((id - 1) as usize).copied().unwrap_or(1.0)
    }

    /// k-distance and LRD for a neighbor set: farthest neighbor distance,
    /// and the reciprocal mean reachability distance.
    fn kdist_and_lrd(&self, neighbors: &[(u32, f32)]) -> (f32, f32) {
        if neighbors.is_empty() {
            return (0.0, 1.0);
        }
        let kdist = neighbors.iter().map(|&(_, d)| d).fold(f32::MIN, f32::max);
        let sum_reach: f32 = neighbors
            .iter()
            .map(|&(nid, d)| d.max(self.kdist_of(nid)))
            .sum();
        let lrd = if sum_reach == 0.0 {
            f32::INFINITY
        } else {
            neighbors.len() as f32 / sum_reach
        };
        (kdist, lrd)
    }

    /// Recomputes kdist/lrd for `id` and every point that now counts `id`
    /// among its reverse nearest neighbors.
    fn recompute_around(&mut self, id: u32) -> Result<()> {
        let rnn = self.neighbors_of_stored(id, self.rnn_num)?;
        let mut affected: Vec<u32> = rnn.iter().map(|&(nid, _)| nid).collect();
        affected.push(id);

        for p in affected {
            let neighbors = self.neighbors_of_stored(p, self.nn_num)?;
            let (kdist, lrd) = self.kdist_and_lrd(&neighbors);
            let idx = (p - 1) as usize;
            if idx < self.kdist.len() {
                self.kdist[idx] = kdist;
                self.lrd[idx] = lrd;
            }
        }
        Ok(())
    }

    /// `empty_score` is what to report when `neighbors` is empty: the two
    /// call sites below disagree on this, per the spec's own split
    /// behavior (see DESIGN.md) — a stored point with no other points to
    /// compare against scores `1`, but an ad-hoc query against a wholly
    /// empty index scores `+inf`.
    fn calc_lof_from_neighbors(&self, neighbors: &[(u32, f32)], empty_score: f32) -> f32 {
        if neighbors.is_empty() {
            return empty_score;
        }
        let (_, lrd_q) = self.kdist_and_lrd(neighbors);
        let lrd_sum: f32 = neighbors.iter().map(|&(nid, _)| self.lrd_of(nid)).sum();

        if lrd_sum.is_infinite() && lrd_q.is_infinite() {
            return 1.0;
        }
        lrd_sum / (neighbors.len() as f32 * lrd_q)
    }

    fn calc_lof_for_stored(&self, id: u32) -> Result<f32> {
        let neighbors = self.neighbors_of_stored(id, self.nn_num)?;
        Ok(self.calc_lof_from_neighbors(&neighbors, 1.0))
    }

    fn calc_lof_for_query(&self, fv: &[(String, f32)]) -> Result<f32> {
        let neighbors = self.nn.neighbor_row_from_fv(fv, self.nn_num as usize)?;
        Ok(self.calc_lof_from_neighbors(&neighbors, f32::INFINITY))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sparse_vector(seed: u32, dims: u32) -> Vec<(String, f32)> {
        (0..dims)
            .map(|d| (format!("f{d}"), ((seed * 7 + d * 13) % 23) as f32))
            .collect()
    }

    #[test]
    fn rejects_bad_hyperparameters() {
        assert!(LightLof::new(Algorithm::MinHash, 32, 1, 5, 0).is_err());
        assert!(LightLof::new(Algorithm::MinHash, 32, 5, 2, 0).is_err());
    }

    #[test]
    fn scores_before_any_point_is_infinite() {
        let lof = LightLof::new(Algorithm::MinHash, 32, 5, 10, 0).unwrap();
        let score = lof.calc_score(&sparse_vector(1, 4)).unwrap();
        assert!(score.is_infinite());
    }

    #[test]
    fn first_added_point_scores_one_not_infinite() {
        let lof = LightLof::new(Algorithm::MinHash, 32, 5, 10, 0).unwrap();
        let score = lof.add(&sparse_vector(1, 4)).unwrap();
        assert_eq!(score, 1.0);
    }

    #[test]
    fn capacity_scenario_produces_finite_positive_scores() {
        let lof = LightLof::new(Algorithm::MinHash, 64, 10, 30, 0).unwrap();
        let mut last = 0.0;
        for i in 0..100u32 {
            last = lof.add(&sparse_vector(i, 6)).unwrap();
        }
        assert!(last.is_finite());
        assert!(last >= 0.0);
    }

    #[test]
    fn eviction_bounds_live_point_count() {
        let lof = LightLof::new(Algorithm::MinHash, 32, 5, 10, 50).unwrap();
        for i in 0..500u32 {
            lof.add(&sparse_vector(i, 5)).unwrap();
        }
        let inner = lof.inner.read();
        assert_eq!(inner.kdist.len() as u32, 50);
    }

    #[test]
    fn roundtrips_through_save_load() {
        let lof = LightLof::new(Algorithm::MinHash, 32, 5, 10, 20).unwrap();
        for i in 0..10u32 {
            lof.add(&sparse_vector(i, 4)).unwrap();
        }
        let mut buf = Vec::new();
        lof.save(&mut buf).unwrap();
        let loaded = LightLof::load(&mut &buf[..]).unwrap();

        let probe = sparse_vector(99, 4);
        let a = lof.calc_score(&probe).unwrap();
        let b = loaded.calc_score(&probe).unwrap();
        assert_eq!(a, b);
    }
}
