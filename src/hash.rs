//! Dimension hashing and the samplers built on top of it: FNV-1 for stable
//! per-dimension keys, a 64-bit mixer for MinHash, and seeded Gaussian
//! random projection for sign-LSH / Euclid-LSH.

use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

const FNV_OFFSET: u64 = 14695981039346656037;
const FNV_PRIME: u64 = 1099511628211;

/// 64-bit FNV-1 (not FNV-1a) over the UTF-8 bytes of `s`.
pub fn fnv1_64(s: &str) -> u64 {
    let mut hash = FNV_OFFSET;
    for &byte in s.as_bytes() {
        hash = hash.wrapping_mul(FNV_PRIME);
        hash ^= byte as u64;
    }
    hash
}

/// Go-style 64-bit triple-word mixer used by MinHash sampling.
#[allow(clippy::many_single_char_names)]
fn hash_mix64(mut a: u64, mut b: u64, mut c: u64) -> (u64, u64, u64) {
    a = a.wrapping_sub(b);
    a = a.wrapping_sub(c);
    a ^= c >> 43;
    b = b.wrapping_sub(c);
    b = b.wrapping_sub(a);
    b ^= a << 9;
    c = c.wrapping_sub(a);
    c = c.wrapping_sub(b);
    c ^= b >> 8;
    a = a.wrapping_sub(b);
    a = a.wrapping_sub(c);
    a ^= c >> 38;
    b = b.wrapping_sub(c);
    b = b.wrapping_sub(a);
    b ^= a << 23;
    c = c.wrapping_sub(a);
    c = c.wrapping_sub(b);
    c ^= b >> 5;
    a = a.wrapping_sub(b);
    a = a.wrapping_sub(c);
    a ^= c >> 35;
    b = b.wrapping_sub(c);
    b = b.wrapping_sub(a);
    b ^= a << 49;
    c = c.wrapping_sub(a);
    c = c.wrapping_sub(b);
    c ^= b >> 11;
    a = a.wrapping_sub(b);
    a = a.wrapping_sub(c);
    a ^= c >> 12;
    b = b.wrapping_sub(c);
    b = b.wrapping_sub(a);
    b ^= a << 18;
    c = c.wrapping_sub(a);
    c = c.wrapping_sub(b);
    c ^= b >> 22;
    (a, b, c)
}

const MIX_SEED: u64 = 0xC3A5C85C97CB3127;

/// MinHash sampling value for one (dimension, hash-position, feature-value)
/// triple: `-ln(r) / value` where `r` is a uniform sample in `(0, 1]`
/// derived from mixing `(dim_hash, position, MIX_SEED)` twice.
pub fn minhash_sample(dim_hash: u64, position: u64, value: f32) -> f32 {
    let (a1, b1, c1) = hash_mix64(dim_hash, position, MIX_SEED);
    let (a2, _, _) = hash_mix64(a1, b1, c1);
    let r = (a2 as f64) / (u64::MAX as f64);
    let r = r.max(f64::MIN_POSITIVE);
    (-(r.ln()) / value as f64) as f32
}

/// Draws `width` standard-normal samples deterministically from a
/// dimension's FNV-1 hash. This is a documented cross-language hazard: it
/// does not reproduce the original Go implementation's generator bit for
/// bit, only within this crate's own snapshots (see DESIGN.md).
pub fn gaussian_projection(dim_hash: u64, width: u32) -> Vec<f32> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(dim_hash);
    (0..width)
        .map(|_| rng.sample::<f64, _>(StandardNormal) as f32)
        .collect()
}
