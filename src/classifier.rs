// src/classifier.rs
use crate::error::{JobError, Result};
use crate::metrics::MetricRegistry;
use crate::model::Model;
use crate::models::Classification;
use log::{debug, info};
use ndarray::Array4;
use std::fs;
use std::path::Path;

/// The model is a data dependency expected in the working directory.
pub const MODEL_PATH: &str = "./model.json";

pub const INPUT_SIDE: u32 = 224;

/// Must match the class order the model was trained with.
pub const LABELS: [&str; 7] = [
    "Actinic Keratoses and Intraepithelial Carcinoma",
    "Basal Cell Carcinoma",
    "Benign Keratosis",
    "Dermatofibroma",
    "Melanoma",
    "Melanocytic Nevi",
    "Vascular Lesions",
];

pub fn report_line(label: &str) -> String {
    format!("This might be an image of {}.\n", label)
}

/// Decode, resize to 224x224, scale to [-1, 1] and add the batch axis. Order matters.
pub fn preprocess(bytes: &[u8]) -> Result<Array4<f32>> {
    let rgb = image::load_from_memory(bytes)?.to_rgb8();
    let (width, height) = rgb.dimensions();

    let side = INPUT_SIDE as usize;
    let rows = interpolation_weights(height as usize, side);
    let cols = interpolation_weights(width as usize, side);

    let mut batch = Array4::<f32>::zeros((1, side, side, 3));
    for (y, row) in rows.iter().enumerate() {
        for (x, col) in cols.iter().enumerate() {
            for c in 0..3 {
                let at = |px: usize, py: usize| rgb.get_pixel(px as u32, py as u32)[c] as f32;
                let top = lerp(at(col.lower, row.lower), at(col.upper, row.lower), col.frac);
                let bottom = lerp(at(col.lower, row.upper), at(col.upper, row.upper), col.frac);
                batch[[0, y, x, c]] = normalize(lerp(top, bottom, row.frac));
            }
        }
    }
    Ok(batch)
}

/// Source neighbours for one output coordinate of a bilinear resize.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Interpolation {
    lower: usize,
    upper: usize,
    frac: f32,
}

// Half-pixel centres and no antialiasing: only the two nearest source
// pixels contribute, even when shrinking.
fn interpolation_weights(in_size: usize, out_size: usize) -> Vec<Interpolation> {
    let scale = in_size as f32 / out_size as f32;
    let last = in_size.saturating_sub(1);
    (0..out_size)
        .map(|i| {
            let src = (i as f32 + 0.5) * scale - 0.5;
            let floor = src.floor();
            Interpolation {
                lower: (floor.max(0.0) as usize).min(last),
                upper: (src.ceil().max(0.0) as usize).min(last),
                frac: src - floor,
            }
        })
        .collect()
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

fn normalize(pixel: f32) -> f32 {
    (pixel - 127.5) / 127.5
}

#[derive(Debug)]
pub struct Classifier {
    model: Model,
}

impl Classifier {
    pub fn load(path: &Path, registry: &MetricRegistry) -> Result<Self> {
        Self::from_model(Model::load(path, registry)?)
    }

    /// Checks the model agrees with the fixed input size and label list.
    pub fn from_model(model: Model) -> Result<Self> {
        let side = INPUT_SIDE as usize;
        if model.input_shape() != [side, side, 3] {
            return Err(JobError::model(format!(
                "model expects input {:?}, images are preprocessed to [{}, {}, 3]",
                model.input_shape(),
                side,
                side
            )));
        }
        if model.output_dim() != LABELS.len() {
            return Err(JobError::label_mismatch(LABELS.len(), model.output_dim()));
        }
        if let Some(bundled) = model.labels() {
            if !bundled.iter().map(String::as_str).eq(LABELS.iter().copied()) {
                return Err(JobError::LabelMismatch(format!(
                    "bundled labels {:?} differ from the expected class order",
                    bundled
                )));
            }
        }
        Ok(Self { model })
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn classify(&self, image_bytes: &[u8]) -> Result<Classification> {
        let batch = preprocess(image_bytes)?;
        let scores = self.model.predict(batch.view())?;
        let row = scores.row(0).to_vec();
        debug!("Class scores: {:?}", row);
        Classification::from_scores(row)
    }

    pub fn describe(&self, classification: &Classification) -> Result<&'static str> {
        classification.label(&LABELS)
    }
}

/// Classifies one image file and writes the report. Nothing is written on failure.
pub fn run(input_path: &Path, output_path: &Path, model_path: &Path) -> Result<&'static str> {
    let classifier = Classifier::load(model_path, &MetricRegistry::skin_lesion())?;

    let bytes = fs::read(input_path)
        .map_err(|e| JobError::input(format!("{}: {}", input_path.display(), e)))?;
    let classification = classifier.classify(&bytes)?;
    let label = classifier.describe(&classification)?;
    info!("Predicted class {} ({})", classification.index, label);

    fs::write(output_path, report_line(label))
        .map_err(|e| JobError::output(format!("{}: {}", output_path.display(), e)))?;
    Ok(label)
}
