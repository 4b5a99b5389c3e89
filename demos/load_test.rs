//! ```bash
//! cargo run --example load_test --release
//! ```
//!
//! Exercises the two main engines end to end: an AROW classifier trained on
//! the shogun-family-name dataset (the classic jubatus demo corpus this
//! crate's design traces back to), and a LightLOF anomaly index put through
//! an insert/save/load/verify cycle the way a host would exercise it before
//! trusting persistence in production.

use std::collections::BTreeMap;
use std::io::{BufReader, BufWriter};
use std::{fs, path::PathBuf, time::Instant};

use fluxml::ann::Algorithm;
use fluxml::{Arow, LightLof, Value};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Hash width shared by every ANN index in this demo.
const HASH_NUM: u32 = 64;
/// Number of sparse vectors to insert into the LightLOF index.
const N_VECS: usize = 10_000;
/// Dimensions per sparse vector.
const DIM: usize = 32;
/// Number of ad-hoc queries to run for the round-trip check.
const N_QUERIES: usize = 100;
/// Deterministic seed for reproducibility.
const SEED: u64 = 42;

const SHOGUN_LIST: &[(&str, &str)] = &[
    ("徳川", "家康"), ("徳川", "秀忠"), ("徳川", "家光"), ("徳川", "家綱"),
    ("徳川", "綱吉"), ("徳川", "家宣"), ("徳川", "家継"), ("徳川", "吉宗"),
    ("徳川", "家重"), ("徳川", "家治"), ("徳川", "家斉"), ("徳川", "家慶"),
    ("徳川", "家定"), ("徳川", "家茂"),
    ("足利", "尊氏"), ("足利", "義詮"), ("足利", "義満"), ("足利", "義持"),
    ("足利", "義量"), ("足利", "義教"), ("足利", "義勝"), ("足利", "義政"),
    ("足利", "義尚"), ("足利", "義稙"), ("足利", "義澄"), ("足利", "義稙"),
    ("足利", "義晴"), ("足利", "義輝"), ("足利", "義栄"),
    ("北条", "時政"), ("北条", "義時"), ("北条", "泰時"), ("北条", "経時"),
    ("北条", "時頼"), ("北条", "長時"), ("北条", "政村"), ("北条", "時宗"),
    ("北条", "貞時"), ("北条", "師時"), ("北条", "宗宣"), ("北条", "煕時"),
    ("北条", "基時"), ("北条", "高時"), ("北条", "貞顕"),
];

fn unigram(given: &str) -> Value {
    let mut m = BTreeMap::new();
    for c in given.chars() {
        m.insert(c.to_string(), Value::Float(1.0));
    }
    Value::Map(m)
}

fn random_sparse_vector(rng: &mut StdRng, dim: usize) -> Vec<(String, f32)> {
    (0..dim)
        .map(|d| (format!("f{d}"), rng.gen::<f32>() * 2.0 - 1.0))
        .collect()
}

fn fmt_bytes(n: u64) -> String {
    match n {
        b if b < 1024 => format!("{b} B"),
        b if b < 1024 * 1024 => format!("{:.2} KiB", b as f64 / 1024.0),
        b => format!("{:.2} MiB", b as f64 / (1024.0 * 1024.0)),
    }
}

fn divider() {
    println!("{}", "─".repeat(60));
}

fn run_shogun_demo() -> Result<(), Box<dyn std::error::Error>> {
    divider();
    println!("Phase 0 — AROW shogun classifier");

    let arow = Arow::new(1.0)?;

    let mut rng = StdRng::seed_from_u64(SEED);
    let mut shuffled: Vec<(&str, &str)> = SHOGUN_LIST.to_vec();
    // Fisher-Yates, mirroring the original demo's `rand.Perm` shuffle.
    for i in (1..shuffled.len()).rev() {
        let j = rng.gen_range(0..=i);
        shuffled.swap(i, j);
    }

    for (family, given) in &shuffled {
        arow.train(&unigram(given), family)?;
    }

    for given in ["慶喜", "義昭", "守時"] {
        let scores = arow.classify(&unigram(given))?;
        let argmax = scores
            .iter()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(label, _)| label.clone())
            .unwrap_or_else(|| "<none>".to_string());
        println!("  {given} -> {argmax}");
    }

    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    println!("╔══════════════════════════════════════════════════════════╗");
    println!("║           fluxml Load Test & Persistence Verifier        ║");
    println!("╚══════════════════════════════════════════════════════════╝");
    println!();

    run_shogun_demo()?;

    // ── Phase 1: Data Generation ─────────────────────────────────────────
    divider();
    println!("Phase 1 — Generating random sparse vectors");
    println!("  Vectors:   {N_VECS}");
    println!("  Dimension: {DIM}");

    let t0 = Instant::now();
    let mut rng = StdRng::seed_from_u64(SEED);
    let vectors: Vec<Vec<(String, f32)>> = (0..N_VECS)
        .map(|_| random_sparse_vector(&mut rng, DIM))
        .collect();
    println!("  Generated in {:?}", t0.elapsed());

    // ── Phase 2: Insertion ────────────────────────────────────────────────
    divider();
    println!("Phase 2 — Inserting into LightLOF (MinHash, unbounded capacity)");

    let lof = LightLof::new(Algorithm::MinHash, HASH_NUM, 10, 30, 0)?;
    let t0 = Instant::now();
    for v in &vectors {
        lof.add_without_calc_score(v)?;
    }
    let insert_duration = t0.elapsed();
    println!("  Inserted {N_VECS} vectors in {insert_duration:?}");
    println!(
        "  Throughput: {:.0} vectors/sec",
        N_VECS as f64 / insert_duration.as_secs_f64()
    );

    // ── Phase 3: Baseline scoring ─────────────────────────────────────────
    divider();
    println!("Phase 3 — Running {N_QUERIES} baseline LOF queries");

    let mut query_rng = StdRng::seed_from_u64(SEED + 1);
    let queries: Vec<Vec<(String, f32)>> = (0..N_QUERIES)
        .map(|_| random_sparse_vector(&mut query_rng, DIM))
        .collect();

    let t0 = Instant::now();
    let baseline_scores: Vec<f32> = queries.iter().map(|q| lof.calc_score(q).unwrap()).collect();
    let search_duration = t0.elapsed();
    println!("  Completed in {search_duration:?}");
    println!(
        "  Average per query: {:.2} us",
        search_duration.as_micros() as f64 / N_QUERIES as f64
    );

    // ── Phase 4: Serialization ────────────────────────────────────────────
    divider();
    println!("Phase 4 — Saving index to disk");

    let tmp_path = PathBuf::from("/tmp/fluxml_load_test.bin");
    let t0 = Instant::now();
    {
        let file = fs::File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        lof.save(&mut writer)?;
    }
    let save_duration = t0.elapsed();
    let file_size = fs::metadata(&tmp_path)?.len();
    println!("  Saved to: {}", tmp_path.display());
    println!("  File size: {}", fmt_bytes(file_size));
    println!("  Saved in: {save_duration:?}");

    // ── Phase 5: Deserialization ──────────────────────────────────────────
    divider();
    println!("Phase 5 — Loading index from disk");

    let t0 = Instant::now();
    let lof_loaded = {
        let file = fs::File::open(&tmp_path)?;
        let mut reader = BufReader::new(file);
        LightLof::load(&mut reader)?
    };
    let load_duration = t0.elapsed();
    println!("  Loaded in: {load_duration:?}");

    // ── Phase 6: Integrity verification ───────────────────────────────────
    divider();
    println!("Phase 6 — Verifying round-trip integrity");

    let loaded_scores: Vec<f32> = queries
        .iter()
        .map(|q| lof_loaded.calc_score(q).unwrap())
        .collect();

    let mut mismatches = 0usize;
    for (i, (a, b)) in baseline_scores.iter().zip(loaded_scores.iter()).enumerate() {
        if (a - b).abs() > 1e-4 && !(a.is_infinite() && b.is_infinite()) {
            eprintln!("  x Query {i}: score drift -- original={a:.6}, loaded={b:.6}");
            mismatches += 1;
        }
    }

    divider();
    if mismatches == 0 {
        println!("Round-trip integrity: PASSED ({N_QUERIES} queries, 0 mismatches)");
    } else {
        println!("Round-trip integrity: FAILED ({mismatches}/{N_QUERIES} mismatches)");
    }

    println!();
    println!("Performance Summary");
    println!("──────────────────────────────────────────────────");
    println!(
        "  Insert throughput:  {:.0} vec/s",
        N_VECS as f64 / insert_duration.as_secs_f64()
    );
    println!(
        "  Query latency:      {:.2} us/query",
        search_duration.as_micros() as f64 / N_QUERIES as f64
    );
    println!("  Snapshot size:      {}", fmt_bytes(file_size));
    println!("──────────────────────────────────────────────────");

    let _ = fs::remove_file(&tmp_path);

    Ok(())
}
