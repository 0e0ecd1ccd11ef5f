// src/model.rs
//! Serialized sequential image model and its forward pass.
//!
//! An artifact is a JSON document:
//!
//! ```json
//! {
//!   "name": "skin-lesion",
//!   "input_shape": [224, 224, 3],
//!   "metrics": ["top_2_accuracy", "top_3_accuracy"],
//!   "labels": ["..."],
//!   "layers": [
//!     {"type": "average_pooling_2d", "pool_size": 32},
//!     {"type": "global_average_pooling_2d"},
//!     {"type": "dense", "kernel": [[...]], "bias": [...], "activation": "softmax"}
//!   ]
//! }
//! ```
//!
//! Tensors are channels-last. Shapes are checked once at load time so the
//! forward pass only fails on a mis-shaped input batch.

use crate::error::{JobError, Result};
use crate::metrics::MetricRegistry;
use log::{debug, info};
use ndarray::{s, Array1, Array2, Array4, ArrayD, ArrayView4, Axis, Ix2, Ix4, IxDyn};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    #[default]
    Linear,
    Relu,
    Sigmoid,
    Softmax,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum LayerSpec {
    #[serde(rename = "average_pooling_2d")]
    AveragePooling2d { pool_size: usize },
    #[serde(rename = "global_average_pooling_2d")]
    GlobalAveragePooling2d,
    #[serde(rename = "flatten")]
    Flatten,
    #[serde(rename = "dense")]
    Dense {
        kernel: Vec<Vec<f32>>,
        bias: Vec<f32>,
        #[serde(default)]
        activation: Activation,
    },
    #[serde(rename = "softmax")]
    Softmax,
}

#[derive(Debug, Deserialize)]
struct ModelArtifact {
    #[serde(default)]
    name: Option<String>,
    input_shape: [usize; 3],
    #[serde(default)]
    metrics: Vec<String>,
    #[serde(default)]
    labels: Option<Vec<String>>,
    layers: Vec<LayerSpec>,
}

#[derive(Debug)]
enum Layer {
    AveragePooling2d(usize),
    GlobalAveragePooling2d,
    Flatten,
    Dense {
        kernel: Array2<f32>,
        bias: Array1<f32>,
        activation: Activation,
    },
    Softmax,
}

#[derive(Debug)]
pub struct Model {
    name: String,
    input_shape: [usize; 3],
    metrics: Vec<String>,
    labels: Option<Vec<String>>,
    layers: Vec<Layer>,
    output_dim: usize,
}

impl Model {
    pub fn load(path: &Path, registry: &MetricRegistry) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|e| JobError::model(format!("{}: {}", path.display(), e)))?;
        let model = Self::from_json(&raw, registry)?;
        info!(
            "Loaded model {} from {} ({} layers, {} outputs)",
            model.name,
            path.display(),
            model.layers.len(),
            model.output_dim
        );
        Ok(model)
    }

    /// Parses an artifact. Every metric it names must be registered.
    pub fn from_json(raw: &str, registry: &MetricRegistry) -> Result<Self> {
        let artifact: ModelArtifact = serde_json::from_str(raw)
            .map_err(|e| JobError::model(format!("malformed artifact: {}", e)))?;

        for metric in &artifact.metrics {
            if !registry.contains(metric) {
                return Err(JobError::model(format!("unknown metric: {}", metric)));
            }
        }

        let mut shape: Vec<usize> = artifact.input_shape.to_vec();
        if shape.iter().any(|&d| d == 0) {
            return Err(JobError::model("input shape has a zero dimension"));
        }
        let mut layers = Vec::with_capacity(artifact.layers.len());
        for (i, spec) in artifact.layers.into_iter().enumerate() {
            let (layer, next) = compile_layer(spec, &shape)
                .map_err(|msg| JobError::model(format!("layer {}: {}", i, msg)))?;
            layers.push(layer);
            shape = next;
        }

        let output_dim = match shape.as_slice() {
            [n] => *n,
            other => {
                return Err(JobError::model(format!(
                    "model output must be a vector, got shape {:?}",
                    other
                )))
            }
        };

        Ok(Model {
            name: artifact.name.unwrap_or_else(|| "unnamed".to_string()),
            input_shape: artifact.input_shape,
            metrics: artifact.metrics,
            labels: artifact.labels,
            layers,
            output_dim,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn input_shape(&self) -> [usize; 3] {
        self.input_shape
    }

    pub fn metrics(&self) -> &[String] {
        &self.metrics
    }

    pub fn labels(&self) -> Option<&[String]> {
        self.labels.as_deref()
    }

    pub fn output_dim(&self) -> usize {
        self.output_dim
    }

    /// Runs a batch of `[n, height, width, channels]` images, one score row per image.
    pub fn predict(&self, batch: ArrayView4<f32>) -> Result<Array2<f32>> {
        let (_, h, w, c) = batch.dim();
        if [h, w, c] != self.input_shape {
            return Err(JobError::model(format!(
                "input batch {:?} does not match model input {:?}",
                batch.shape(),
                self.input_shape
            )));
        }

        let mut x: ArrayD<f32> = batch.to_owned().into_dyn();
        for layer in &self.layers {
            x = forward(layer, x)?;
            debug!("{:?} -> {:?}", layer_name(layer), x.shape());
        }
        x.into_dimensionality::<Ix2>()
            .map_err(|e| JobError::model(format!("unexpected output shape: {}", e)))
    }
}

fn layer_name(layer: &Layer) -> &'static str {
    match layer {
        Layer::AveragePooling2d(_) => "average_pooling_2d",
        Layer::GlobalAveragePooling2d => "global_average_pooling_2d",
        Layer::Flatten => "flatten",
        Layer::Dense { .. } => "dense",
        Layer::Softmax => "softmax",
    }
}

/// Validates one layer against the incoming per-sample shape and returns its output shape.
fn compile_layer(spec: LayerSpec, shape: &[usize]) -> std::result::Result<(Layer, Vec<usize>), String> {
    match spec {
        LayerSpec::AveragePooling2d { pool_size } => match shape {
            &[h, w, c] => {
                if pool_size == 0 || pool_size > h || pool_size > w {
                    return Err(format!("pool size {} does not fit {}x{}", pool_size, h, w));
                }
                Ok((
                    Layer::AveragePooling2d(pool_size),
                    vec![h / pool_size, w / pool_size, c],
                ))
            }
            _ => Err(format!("pooling needs a 3-d input, got {:?}", shape)),
        },
        LayerSpec::GlobalAveragePooling2d => match shape {
            &[_, _, c] => Ok((Layer::GlobalAveragePooling2d, vec![c])),
            _ => Err(format!("global pooling needs a 3-d input, got {:?}", shape)),
        },
        LayerSpec::Flatten => Ok((Layer::Flatten, vec![shape.iter().product()])),
        LayerSpec::Dense {
            kernel,
            bias,
            activation,
        } => {
            let inputs = match shape {
                &[n] => n,
                _ => return Err(format!("dense needs a 1-d input, got {:?}", shape)),
            };
            let units = bias.len();
            if units == 0 {
                return Err("dense layer has no units".to_string());
            }
            if kernel.len() != inputs {
                return Err(format!("kernel has {} rows, expected {}", kernel.len(), inputs));
            }
            if let Some(row) = kernel.iter().find(|row| row.len() != units) {
                return Err(format!("kernel row has {} columns, expected {}", row.len(), units));
            }
            let flat: Vec<f32> = kernel.into_iter().flatten().collect();
            let kernel = Array2::from_shape_vec((inputs, units), flat).map_err(|e| e.to_string())?;
            Ok((
                Layer::Dense {
                    kernel,
                    bias: Array1::from(bias),
                    activation,
                },
                vec![units],
            ))
        }
        LayerSpec::Softmax => Ok((Layer::Softmax, shape.to_vec())),
    }
}

fn forward(layer: &Layer, x: ArrayD<f32>) -> Result<ArrayD<f32>> {
    let shape_err = |e: ndarray::ShapeError| JobError::model(format!("shape mismatch: {}", e));
    match layer {
        Layer::AveragePooling2d(pool) => {
            let x = x.into_dimensionality::<Ix4>().map_err(shape_err)?;
            Ok(average_pool(&x, *pool).into_dyn())
        }
        Layer::GlobalAveragePooling2d => {
            let x = x.into_dimensionality::<Ix4>().map_err(shape_err)?;
            let pooled = x
                .mean_axis(Axis(1))
                .and_then(|rows| rows.mean_axis(Axis(1)))
                .ok_or_else(|| JobError::model("global pooling over an empty input"))?;
            Ok(pooled.into_dyn())
        }
        Layer::Flatten => {
            let batch = x.shape()[0];
            let rest: usize = x.shape()[1..].iter().product();
            let flat = x
                .as_standard_layout()
                .into_owned()
                .into_shape(IxDyn(&[batch, rest]))
                .map_err(shape_err)?;
            Ok(flat)
        }
        Layer::Dense {
            kernel,
            bias,
            activation,
        } => {
            let x = x.into_dimensionality::<Ix2>().map_err(shape_err)?;
            let mut out = x.dot(kernel) + bias;
            match activation {
                Activation::Linear => {}
                Activation::Relu => out.mapv_inplace(|v| v.max(0.0)),
                Activation::Sigmoid => out.mapv_inplace(|v| 1.0 / (1.0 + (-v).exp())),
                Activation::Softmax => {
                    let mut dyn_out = out.into_dyn();
                    softmax_last_axis(&mut dyn_out);
                    return Ok(dyn_out);
                }
            }
            Ok(out.into_dyn())
        }
        Layer::Softmax => {
            let mut x = x;
            softmax_last_axis(&mut x);
            Ok(x)
        }
    }
}

fn average_pool(x: &Array4<f32>, pool: usize) -> Array4<f32> {
    let (b, h, w, c) = x.dim();
    let (oh, ow) = (h / pool, w / pool);
    let mut out = Array4::<f32>::zeros((b, oh, ow, c));
    for n in 0..b {
        for i in 0..oh {
            for j in 0..ow {
                let window = x.slice(s![n, i * pool..(i + 1) * pool, j * pool..(j + 1) * pool, ..]);
                let area = (pool * pool) as f32;
                for ch in 0..c {
                    out[[n, i, j, ch]] = window.slice(s![.., .., ch]).sum() / area;
                }
            }
        }
    }
    out
}

fn softmax_last_axis(x: &mut ArrayD<f32>) {
    let last = Axis(x.ndim() - 1);
    for mut lane in x.lanes_mut(last) {
        let max = lane.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
        lane.mapv_inplace(|v| (v - max).exp());
        let total = lane.sum();
        lane.mapv_inplace(|v| v / total);
    }
}
