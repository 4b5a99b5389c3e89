//! Dense array of `len` fixed-width bit vectors packed back-to-back into a
//! single 64-bit word buffer.
//!
//! `get`/`set` dispatch across three layouts depending on whether a stored
//! vector starts word-aligned, fits wholly inside one word, or straddles a
//! word boundary; all three are folded into one bit-extraction/bit-write
//! primitive (`read_bits`/`write_bits`) below rather than duplicated per
//! case, since the straddling case subsumes the other two when the shift
//! amount is zero.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::bits::vector::BitVector;
use crate::error::{Error, Result};
use crate::snapshot;
use crate::sort::{partial_sort_by_dist, Scored};

const WORD_BITS: u32 = 64;
const FORMAT_VERSION: u8 = 1;

/// Implementation-defined ceiling on the number of rows a bit array may
/// grow to. IDs are exposed to hosts as `int64`, but a 32-bit count is
/// sufficient internally, so the cap sits well below `u32::MAX` to leave
/// headroom for the doubling growth strategy to not overflow `usize`
/// word-count arithmetic on 32-bit targets.
pub const MAX_LEN: u32 = 1 << 28;

#[derive(Debug, Clone)]
pub struct BitArray {
    data: Vec<u64>,
    bit_num: u32,
    len: u32,
}

#[derive(Serialize, Deserialize)]
struct BitArrayData {
    data: Vec<u64>,
    bit_num: u32,
    len: u32,
}

fn n_words(bit_num: u32, len: u32) -> usize {
    let total_bits = bit_num as u64 * len as u64;
    ((total_bits + WORD_BITS as u64 - 1) / WORD_BITS as u64) as usize
}

fn least_bits(n: u32) -> u64 {
    if n >= 64 {
        u64::MAX
    } else {
        (1u64 << n) - 1
    }
}

fn read_bits(data: &[u64], pos: u64, nbits: u32) -> u64 {
    if nbits == 0 {
        return 0;
    }
    let word = (pos / WORD_BITS as u64) as usize;
    let offset = (pos % WORD_BITS as u64) as u32;
    let lo = data.get(word).copied().unwrap_or(0) >> offset;
    let value = if offset == 0 {
        lo
    } else {
        let hi = data.get(word + 1).copied().unwrap_or(0) << (WORD_BITS - offset);
        lo | hi
    };
    value & least_bits(nbits)
}

fn write_bits(data: &mut [u64], pos: u64, nbits: u32, value: u64) {
    if nbits == 0 {
        return;
    }
    let value = value & least_bits(nbits);
    let word = (pos / WORD_BITS as u64) as usize;
    let offset = (pos % WORD_BITS as u64) as u32;
    let room = WORD_BITS - offset;

    if nbits <= room {
        let mask = least_bits(nbits) << offset;
        data[word] = (data[word] & !mask) | (value << offset);
    } else {
        let mask_lo = least_bits(room) << offset;
        data[word] = (data[word] & !mask_lo) | ((value << offset) & mask_lo);
        let remaining = nbits - room;
        if let Some(next) = data.get_mut(word + 1) {
            let mask_hi = least_bits(remaining);
            *next = (*next & !mask_hi) | ((value >> room) & mask_hi);
        }
    }
}

impl BitArray {
    pub fn new(bit_num: u32, len: u32) -> Self {
        Self {
            data: vec![0; n_words(bit_num, len)],
            bit_num,
            len,
        }
    }

    pub fn bit_num(&self) -> u32 {
        self.bit_num
    }

    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Grows the backing buffer to hold at least `new_len` vectors,
    /// doubling capacity each time rather than resizing exactly to
    /// `new_len`.
    pub fn resize(&mut self, new_len: u32) -> Result<()> {
        if new_len <= self.len {
            return Ok(());
        }
        if new_len > MAX_LEN {
            return Err(Error::CapacityExceeded(MAX_LEN as u64));
        }
        let mut capacity = self.len.max(1);
        while capacity < new_len {
            capacity = capacity.saturating_mul(2).min(MAX_LEN);
        }
        self.data.resize(n_words(self.bit_num, capacity), 0);
        self.len = new_len;
        log::trace!(
            "bit array resized to {} vectors ({} bits each)",
            new_len,
            self.bit_num
        );
        Ok(())
    }

    fn check_index(&self, i: u32) -> Result<()> {
        if i >= self.len {
            return Err(Error::IndexOutOfRange {
                index: i as u64,
                len: self.len as u64,
            });
        }
        Ok(())
    }

    fn check_width(&self, v: &BitVector) -> Result<()> {
        if v.bit_num() != self.bit_num {
            return Err(Error::ShapeMismatch {
                expected: self.bit_num,
                actual: v.bit_num(),
            });
        }
        Ok(())
    }

    pub fn get(&self, i: u32) -> Result<BitVector> {
        self.check_index(i)?;
        let mut out = BitVector::new(self.bit_num);
        let start = i as u64 * self.bit_num as u64;
        let mut remaining = self.bit_num;
        let mut bit_offset = 0u32;
        while remaining > 0 {
            let chunk = remaining.min(WORD_BITS);
            let bits = read_bits(&self.data, start + bit_offset as u64, chunk);
            for b in 0..chunk {
                if bits & (1u64 << b) != 0 {
                    out.set(bit_offset + b).unwrap();
                }
            }
            bit_offset += chunk;
            remaining -= chunk;
        }
        Ok(out)
    }

    pub fn set(&mut self, i: u32, v: &BitVector) -> Result<()> {
        self.check_index(i)?;
        self.check_width(v)?;
        let start = i as u64 * self.bit_num as u64;
        for (w, &word) in v.words().iter().enumerate() {
            let nbits = (self.bit_num - w as u32 * WORD_BITS).min(WORD_BITS);
            write_bits(&mut self.data, start + (w as u32 * WORD_BITS) as u64, nbits, word);
        }
        Ok(())
    }

    pub fn hamming(&self, i: u32, v: &BitVector) -> Result<u32> {
        self.check_width(v)?;
        let stored = self.get(i)?;
        Ok(crate::bits::vector::hamming_distance(&stored, v))
    }

    /// Ranks every stored row by Hamming distance to `query`, returning the
    /// `k` closest as `(id, normalized_distance)` in ascending order. `id`
    /// is the 1-based row number (row index `i` surfaces as `i + 1`).
    pub fn rank_by_hamming(&self, query: &BitVector, k: usize) -> Result<Vec<(u32, f32)>> {
        self.check_width(query)?;
        let mut scored: Vec<Scored> = (0..self.len)
            .map(|i| {
                let dist = self.hamming(i, query).unwrap();
                Scored { id: i + 1, dist: dist as f32 }
            })
            .collect();
        partial_sort_by_dist(&mut scored, k);
        let bound = k.min(scored.len());
        Ok(scored[..bound]
            .iter()
            .map(|s| (s.id, s.dist / self.bit_num as f32))
            .collect())
    }

    /// Fused Euclid-LSH scoring: for each stored row `i`, computes the
    /// Hamming distance to `query`, converts it to an intermediate score
    /// via `cos_table`, partially sorts by that score, then surfaces the
    /// true Euclidean distance `sqrt(q_norm^2 + score)` for the `k` best.
    pub fn euclid_lsh_scores(
        &self,
        query: &BitVector,
        q_norm: f32,
        norms: &[f32],
        cos_table: &[f32],
        k: usize,
    ) -> Result<Vec<(u32, f32)>> {
        self.check_width(query)?;
        let mut scored: Vec<Scored> = (0..self.len)
            .map(|i| {
                let h = self.hamming(i, query).unwrap() as usize;
                let norm_i = norms.get(i as usize).copied().unwrap_or(0.0);
                let cos = cos_table[h];
                let score = norm_i * (norm_i - 2.0 * q_norm * cos);
                Scored { id: i + 1, dist: score }
            })
            .collect();
        partial_sort_by_dist(&mut scored, k);
        let bound = k.min(scored.len());
        Ok(scored[..bound]
            .iter()
            .map(|s| (s.id, (q_norm * q_norm + s.dist).max(0.0).sqrt()))
            .collect())
    }

    pub fn save<W: Write>(&self, w: &mut W) -> Result<()> {
        snapshot::write_versioned(
            w,
            FORMAT_VERSION,
            &BitArrayData {
                data: self.data.clone(),
                bit_num: self.bit_num,
                len: self.len,
            },
        )
    }

    pub fn load<R: Read>(r: &mut R) -> Result<Self> {
        let version = snapshot::read_version(r)?;
        match version {
            1 => {
                let d: BitArrayData = snapshot::read_payload(r)?;
                Ok(Self {
                    data: d.data,
                    bit_num: d.bit_num,
                    len: d.len,
                })
            }
            other => Err(Error::UnsupportedVersion(other)),
        }
    }
}

/// Precomputes `cos(pi * k / bit_num)` for `k` in `0..=bit_num`, the
/// correction table Euclid-LSH uses to turn a Hamming distance into an
/// angle-derived score without calling `cos` per query.
pub fn build_cos_table(bit_num: u32) -> Vec<f32> {
    (0..=bit_num)
        .map(|k| {
            if k == 0 {
                1.0
            } else if k == bit_num {
                -1.0
            } else {
                ((std::f64::consts::PI * k as f64) / bit_num as f64).cos() as f32
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_vector(bit_num: u32, bit: u32) -> BitVector {
        let mut v = BitVector::new(bit_num);
        v.set(bit).unwrap();
        v
    }

    #[test]
    fn set_and_get_roundtrip_for_odd_width() {
        let bit_num = 67;
        let len = 10;
        let mut arr = BitArray::new(bit_num, len);
        for i in 0..len {
            let v = unit_vector(bit_num, i % bit_num);
            arr.set(i, &v).unwrap();
        }
        for i in 0..len {
            let expected = unit_vector(bit_num, i % bit_num);
            assert_eq!(arr.get(i).unwrap(), expected);
        }
    }

    #[test]
    fn hamming_against_complement_is_full_width() {
        let bit_num = 67;
        let mut arr = BitArray::new(bit_num, 1);
        arr.set(0, &unit_vector(bit_num, 3)).unwrap();

        let mut complement = BitVector::new(bit_num);
        for b in 0..bit_num {
            if b != 3 {
                complement.set(b).unwrap();
            }
        }
        assert_eq!(arr.hamming(0, &complement).unwrap(), bit_num);
    }

    #[test]
    fn resize_preserves_existing_rows() {
        let bit_num = 33;
        let mut arr = BitArray::new(bit_num, 2);
        arr.set(0, &unit_vector(bit_num, 1)).unwrap();
        arr.set(1, &unit_vector(bit_num, 2)).unwrap();
        arr.resize(5).unwrap();
        assert_eq!(arr.len(), 5);
        assert_eq!(arr.get(0).unwrap(), unit_vector(bit_num, 1));
        assert_eq!(arr.get(1).unwrap(), unit_vector(bit_num, 2));
    }

    #[test]
    fn rank_by_hamming_returns_closest_first() {
        let bit_num = 8;
        let mut arr = BitArray::new(bit_num, 3);
        arr.set(0, &unit_vector(bit_num, 0)).unwrap();
        arr.set(1, &unit_vector(bit_num, 1)).unwrap();
        let mut far = BitVector::new(bit_num);
        for b in 0..bit_num {
            far.set(b).unwrap();
        }
        arr.set(2, &far).unwrap();

        let query = unit_vector(bit_num, 0);
        let ranked = arr.rank_by_hamming(&query, 3).unwrap();
        assert_eq!(ranked[0].0, 1);
    }

    #[test]
    fn cos_table_endpoints_are_exact() {
        let table = build_cos_table(16);
        assert_eq!(table[0], 1.0);
        assert_eq!(table[16], -1.0);
    }

    #[test]
    fn resize_past_max_len_is_capacity_exceeded() {
        let mut arr = BitArray::new(8, 1);
        let err = arr.resize(MAX_LEN + 1).unwrap_err();
        assert!(matches!(err, Error::CapacityExceeded(_)));
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let arr = BitArray::new(8, 2);
        let wrong = BitVector::new(9);
        assert!(arr.hamming(0, &wrong).is_err());
    }

    #[test]
    fn roundtrips_through_save_load() {
        let bit_num = 40;
        let mut arr = BitArray::new(bit_num, 3);
        arr.set(1, &unit_vector(bit_num, 7)).unwrap();

        let mut buf = Vec::new();
        arr.save(&mut buf).unwrap();
        let loaded = BitArray::load(&mut &buf[..]).unwrap();

        assert_eq!(loaded.get(1).unwrap(), arr.get(1).unwrap());
        assert_eq!(loaded.bit_num(), arr.bit_num());
        assert_eq!(loaded.len(), arr.len());
    }
}
