// src/metrics.rs
//! Evaluation metrics a serialized model may reference by name.
//!
//! Inference never calls these. A model artifact lists the metrics it was
//! compiled with and loading refuses names the registry cannot resolve.

use ndarray::ArrayView1;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Score of a single prediction against a one-hot target.
pub type MetricFn = Arc<dyn Fn(ArrayView1<f32>, ArrayView1<f32>) -> f32 + Send + Sync>;

#[derive(Clone, Default)]
pub struct MetricRegistry {
    metrics: HashMap<String, MetricFn>,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, metric: MetricFn) -> &mut Self {
        self.metrics.insert(name.into(), metric);
        self
    }

    pub fn get(&self, name: &str) -> Option<&MetricFn> {
        self.metrics.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.metrics.contains_key(name)
    }

    /// Registry for the skin lesion model: top-2 and top-3 accuracy.
    pub fn skin_lesion() -> Self {
        let mut registry = Self::new();
        registry
            .register("top_2_accuracy", top_k_accuracy(2))
            .register("top_3_accuracy", top_k_accuracy(3));
        registry
    }
}

impl fmt::Debug for MetricRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.metrics.keys().collect();
        names.sort();
        f.debug_struct("MetricRegistry").field("metrics", &names).finish()
    }
}

/// 1.0 if the target class is among the `k` highest predictions, else 0.0.
pub fn top_k_accuracy(k: usize) -> MetricFn {
    Arc::new(move |y_true, y_pred| top_k_categorical_accuracy(y_true, y_pred, k))
}

pub fn top_k_categorical_accuracy(y_true: ArrayView1<f32>, y_pred: ArrayView1<f32>, k: usize) -> f32 {
    let target = match y_true
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, &v)| match best {
            Some((_, b)) if v <= b => best,
            _ => Some((i, v)),
        }) {
        Some((i, _)) => i,
        None => return 0.0,
    };
    let Some(&target_score) = y_pred.get(target) else {
        return 0.0;
    };
    let better = y_pred.iter().filter(|&&p| p > target_score).count();
    if better < k {
        1.0
    } else {
        0.0
    }
}
