use crate::error::InferenceError;
use serde::Serialize;
use std::sync::Arc;

/// Output order of the potato leaf model.
pub const DEFAULT_LABELS: [&str; 3] = ["Early Blight", "Late Blight", "Healthy"];

/// Maps a model output position to its class name. Fixed at startup.
#[derive(Clone, Debug)]
pub struct ClassLabels {
    names: Arc<[String]>,
}

impl Default for ClassLabels {
    fn default() -> Self {
        Self::new(DEFAULT_LABELS.iter().map(|l| l.to_string()).collect())
    }
}

impl ClassLabels {
    pub fn new(names: Vec<String>) -> Self {
        Self {
            names: names.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Reduces a probability vector to its top class.
    pub fn classify(&self, probabilities: &[f32]) -> Result<Classification, InferenceError> {
        let (index, confidence) = argmax(probabilities).ok_or(InferenceError::EmptyOutput)?;
        let label = self
            .get(index)
            .ok_or(InferenceError::LabelOutOfRange {
                index,
                labels: self.len(),
            })?
            .to_string();

        Ok(Classification {
            index,
            label,
            confidence,
        })
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Classification {
    #[serde(skip)]
    pub index: usize,
    #[serde(rename = "class")]
    pub label: String,
    pub confidence: f32,
}

/// Index and value of the largest element. The first one wins on ties and NaN
/// entries are never selected.
pub fn argmax(values: &[f32]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, top)) if v <= top => {}
            _ => best = Some((i, v)),
        }
    }
    best
}

/// Numerically stable softmax.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
