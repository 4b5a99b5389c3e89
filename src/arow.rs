//! AROW: an online confidence-weighted linear classifier. Each label owns
//! a sparse per-dimension `(mean, covariance)` pair, initialized lazily to
//! `(0, 1)` on first touch.

use std::collections::HashMap;
use std::io::{Read, Write};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::flatten::{flatten, Value};
use crate::interner::StringInterner;
use crate::snapshot;

const FORMAT_VERSION: u8 = 1;
pub const ALGORITHM_TAG: &str = "arow";

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
struct Weight {
    mean: f32,
    cov: f32,
}

impl Weight {
    fn new() -> Self {
        Self { mean: 0.0, cov: 1.0 }
    }
}

struct State {
    interner: StringInterner,
    labels: HashMap<String, HashMap<u32, Weight>>,
}

pub struct Arow {
    reg_weight: f32,
    state: RwLock<State>,
}

#[derive(Serialize, Deserialize)]
struct ArowData {
    reg_weight: f32,
    labels: Vec<(String, Vec<(u32, f32, f32)>)>,
}

impl Arow {
    pub fn new(reg_weight: f32) -> Result<Self> {
        if reg_weight <= 0.0 {
            return Err(Error::InvalidParameter(
                "regularization_weight must be > 0".to_string(),
            ));
        }
        Ok(Self {
            reg_weight,
            state: RwLock::new(State {
                interner: StringInterner::new(),
                labels: HashMap::new(),
            }),
        })
    }

    /// Flattens `value`, registering any unseen dimension in the
    /// interner, and scores every known label against it.
    pub fn train(&self, value: &Value, label: &str) -> Result<()> {
        if label.is_empty() {
            return Err(Error::EmptyLabel);
        }
        let mut full = Vec::new();
        flatten(value, &mut |k, v| full.push((k, v)))?;

        let mut state = self.state.write();
        state.labels.entry(label.to_string()).or_default();

        let full: Vec<(u32, f32)> = full
            .into_iter()
            .map(|(k, v)| (state.interner.get(&k), v))
            .collect();

        let mut scores: Vec<(String, f32)> = state
            .labels
            .keys()
            .map(|l| {
                let score = score_for_label(&state.labels[l], &full);
                (l.clone(), score)
            })
            .collect();

        let corr_score = scores
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, s)| *s)
            .unwrap_or(0.0);

        scores.retain(|(l, _)| l != label);
        let incorrect = scores
            .into_iter()
            .fold(None, |best: Option<(String, f32)>, (l, s)| match best {
                Some((_, bs)) if bs >= s => best,
                _ => Some((l, s)),
            });

        // With no competing label yet, the label is registered above but
        // there is nothing to separate from: no weight update.
        let Some((incorrect_label, incorrect_score)) = incorrect else {
            return Ok(());
        };

        let margin = incorrect_score - corr_score;
        if margin <= -1.0 {
            return Ok(());
        }

        let variance: f32 = full
            .iter()
            .map(|&(dim, v)| {
                let cov_corr = state.labels[label].get(&dim).map(|w| w.cov).unwrap_or(1.0);
                let cov_incorr = state.labels[&incorrect_label]
                    .get(&dim)
                    .map(|w| w.cov)
                    .unwrap_or(1.0);
                v * v * (cov_corr + cov_incorr)
            })
            .sum();

        let beta = 1.0 / (variance + 1.0 / self.reg_weight);
        let alpha = (1.0 + margin) * beta;

        for &(dim, v) in &full {
            update_weight(&mut state.labels, label, dim, v, alpha, beta, 1.0);
            update_weight(&mut state.labels, &incorrect_label, dim, v, alpha, beta, -1.0);
        }

        Ok(())
    }

    /// Flattens `value` against the read-only interner (unknown
    /// dimensions are dropped) and scores every label.
    pub fn classify(&self, value: &Value) -> Result<HashMap<String, f32>> {
        let mut raw = Vec::new();
        flatten(value, &mut |k, v| raw.push((k, v)))?;

        let state = self.state.read();
        let known: Vec<(u32, f32)> = raw
            .into_iter()
            .filter_map(|(k, v)| {
                let id = state.interner.get_or_zero(&k);
                if id == 0 {
                    None
                } else {
                    Some((id, v))
                }
            })
            .collect();

        Ok(state
            .labels
            .iter()
            .map(|(label, weights)| (label.clone(), score_for_label(weights, &known)))
            .collect())
    }

    pub fn clear(&self) {
        let mut state = self.state.write();
        state.labels.clear();
        state.interner = StringInterner::new();
    }

    pub fn save<W: Write>(&self, w: &mut W) -> Result<()> {
        let state = self.state.read();
        snapshot::write_tag_only(w, FORMAT_VERSION, ALGORITHM_TAG)?;
        state.interner.save(w)?;
        let labels = state
            .labels
            .iter()
            .map(|(label, weights)| {
                let entries = weights
                    .iter()
                    .map(|(&dim, w)| (dim, w.mean, w.cov))
                    .collect();
                (label.clone(), entries)
            })
            .collect();
        snapshot::write_versioned(
            w,
            FORMAT_VERSION,
            &ArowData {
                reg_weight: self.reg_weight,
                labels,
            },
        )
    }

    pub fn load<R: Read>(r: &mut R) -> Result<Self> {
        let version = snapshot::read_tagged(r, ALGORITHM_TAG)?;
        match version {
            1 => {
                let interner = StringInterner::load(r)?;
                let _inner_version = snapshot::read_version(r)?;
                let data: ArowData = snapshot::read_payload(r)?;
                let labels = data
                    .labels
                    .into_iter()
                    .map(|(label, entries)| {
                        let weights = entries
                            .into_iter()
                            .map(|(dim, mean, cov)| (dim, Weight { mean, cov }))
                            .collect();
                        (label, weights)
                    })
                    .collect();
                Ok(Self {
                    reg_weight: data.reg_weight,
                    state: RwLock::new(State { interner, labels }),
                })
            }
            other => Err(Error::UnsupportedVersion(other)),
        }
    }
}

fn score_for_label(weights: &HashMap<u32, Weight>, fv: &[(u32, f32)]) -> f32 {
    fv.iter()
        .map(|&(dim, v)| weights.get(&dim).map(|w| w.mean * v).unwrap_or(0.0))
        .sum()
}

#[allow(clippy::too_many_arguments)]
fn update_weight(
    labels: &mut HashMap<String, HashMap<u32, Weight>>,
    label: &str,
    dim: u32,
    value: f32,
    alpha: f32,
    beta: f32,
    sign: f32,
) {
    let weights = labels.entry(label.to_string()).or_default();
    let w = weights.entry(dim).or_insert_with(Weight::new);
    let cov = w.cov;
    w.mean += sign * alpha * cov * value;
    w.cov -= beta * cov * cov * value * value;
}
