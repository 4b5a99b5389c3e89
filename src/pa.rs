//! Passive-Aggressive (PA-I) online linear regressor with a noise-adaptive
//! insensitivity band derived from running target statistics.

use std::collections::HashMap;
use std::io::{Read, Write};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::flatten::{flatten, Value};
use crate::snapshot;

const FORMAT_VERSION: u8 = 1;
pub const ALGORITHM_TAG: &str = "passive_aggressive";

const MIN_SQUARED_NORM: f32 = 1e-12;

struct State {
    model: HashMap<String, f32>,
    sum: f64,
    sq_sum: f64,
    count: u64,
}

pub struct PassiveAggressive {
    reg_weight: f32,
    sensitivity: f32,
    state: RwLock<State>,
}

#[derive(Serialize, Deserialize)]
struct PaData {
    reg_weight: f32,
    sensitivity: f32,
    model: Vec<(String, f32)>,
    sum: f64,
    sq_sum: f64,
    count: u64,
}

impl PassiveAggressive {
    pub fn new(reg_weight: f32, sensitivity: f32) -> Result<Self> {
        if reg_weight <= 0.0 {
            return Err(Error::InvalidParameter(
                "regularization_weight must be > 0".to_string(),
            ));
        }
        if sensitivity < 0.0 {
            return Err(Error::InvalidParameter("sensitivity must be >= 0".to_string()));
        }
        Ok(Self {
            reg_weight,
            sensitivity,
            state: RwLock::new(State {
                model: HashMap::new(),
                sum: 0.0,
                sq_sum: 0.0,
                count: 0,
            }),
        })
    }

    pub fn train(&self, value: &Value, target: f32) -> Result<()> {
        let mut fv = Vec::new();
        flatten(value, &mut |k, v| fv.push((k, v)))?;

        let mut state = self.state.write();
        state.sum += target as f64;
        state.sq_sum += (target as f64) * (target as f64);
        state.count += 1;

        let mean = (state.sum / state.count as f64) as f32;
        let variance = (state.sq_sum / state.count as f64) as f32 - mean * mean;
        let std_dev = variance.max(0.0).sqrt();

        let predicted = estimate_with(&state.model, &fv);
        let error = target - predicted;
        let loss = error.abs() - self.sensitivity * std_dev;
        if loss <= 0.0 {
            return Ok(());
        }

        let squared_norm: f32 = fv.iter().map(|(_, v)| v * v).sum();
        if squared_norm < MIN_SQUARED_NORM {
            return Ok(());
        }

        let coeff = error.signum() * loss.min(self.reg_weight) / squared_norm;
        for (dim, v) in &fv {
            *state.model.entry(dim.clone()).or_insert(0.0) += coeff * v;
        }
        Ok(())
    }

    pub fn estimate(&self, value: &Value) -> Result<f32> {
        let mut fv = Vec::new();
        flatten(value, &mut |k, v| fv.push((k, v)))?;
        let state = self.state.read();
        Ok(estimate_with(&state.model, &fv))
    }

    pub fn clear(&self) {
        let mut state = self.state.write();
        state.model.clear();
        state.sum = 0.0;
        state.sq_sum = 0.0;
        state.count = 0;
    }

    pub fn save<W: Write>(&self, w: &mut W) -> Result<()> {
        let state = self.state.read();
        snapshot::write_tag_only(w, FORMAT_VERSION, ALGORITHM_TAG)?;
        snapshot::write_versioned(
            w,
            FORMAT_VERSION,
            &PaData {
                reg_weight: self.reg_weight,
                sensitivity: self.sensitivity,
                model: state.model.iter().map(|(k, v)| (k.clone(), *v)).collect(),
                sum: state.sum,
                sq_sum: state.sq_sum,
                count: state.count,
            },
        )
    }

    pub fn load<R: Read>(r: &mut R) -> Result<Self> {
        let version = snapshot::read_tagged(r, ALGORITHM_TAG)?;
        match version {
            1 => {
                let data: PaData = snapshot::read_payload(r)?;
                Ok(Self {
                    reg_weight: data.reg_weight,
                    sensitivity: data.sensitivity,
                    state: RwLock::new(State {
                        model: data.model.into_iter().collect(),
                        sum: data.sum,
                        sq_sum: data.sq_sum,
                        count: data.count,
                    }),
                })
            }
            other => Err(Error::UnsupportedVersion(other)),
        }
    }
}

fn estimate_with(model: &HashMap<String, f32>, fv: &[(String, f32)]) -> f32 {
    fv.iter()
        .map(|(k, v)| model.get(k).copied().unwrap_or(0.0) * v)
        .sum()
}
