//! HazardDetector capability.
//!
//! Two interchangeable implementations sit behind one trait: a learned
//! ONNX classifier (tract) scoring a fixed label set, and a flame-pixel
//! heuristic used when the model is not available. The choice is made once
//! at startup and never revisited per frame.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use super::stream::Frame;
use crate::state::AppConfig;
use crate::threat_classifier::CAMERA_SCORE_CRITICAL;

/// Labels whose detection counts as a camera hazard.
pub const HAZARD_LABELS: [&str; 4] = ["fire", "smoke", "car crash", "accident"];

/// Flame-colored pixel ratio above which the heuristic calls a hazard.
pub const FLAME_PIXEL_RATIO: f64 = 0.005;

/// Model input edge length; frames are resized to this square.
const MODEL_INPUT_SIZE: u32 = 128;

/// Verdict for one frame.
#[derive(Debug, Clone)]
pub struct HazardAssessment {
    pub hazardous: bool,
    /// Highest hazard-label confidence, or the flame pixel ratio.
    pub score: f64,
    pub detections: Vec<(String, f32)>,
}

/// Frame-level hazard assessment capability.
pub trait HazardDetector: Send + Sync {
    fn name(&self) -> &'static str;

    fn assess(&self, frame: &Frame) -> Result<HazardAssessment>;
}

/// Pick the detector at startup: the learned model when it loads, the
/// flame-pixel heuristic otherwise.
pub fn load_detector(config: &AppConfig) -> Arc<dyn HazardDetector> {
    match OnnxHazardDetector::load(&config.model_path, &config.model_labels) {
        Ok(detector) => {
            tracing::info!(
                model = %config.model_path.display(),
                labels = detector.labels.len(),
                "ONNX hazard detector loaded"
            );
            Arc::new(detector)
        }
        Err(e) => {
            tracing::warn!(
                model = %config.model_path.display(),
                error = %e,
                "Hazard model unavailable, installing flame-pixel heuristic"
            );
            Arc::new(FlamePixelDetector)
        }
    }
}

/// Hazard verdict over a set of labeled detections: hazardous when any
/// hazard label scores above the confidence bar.
pub fn evaluate_detections(detections: &[(String, f32)]) -> (bool, f64) {
    let mut score = 0.0f64;
    for (label, confidence) in detections {
        if is_hazard_label(label) {
            score = score.max(*confidence as f64);
        }
    }
    (score > CAMERA_SCORE_CRITICAL, score)
}

fn is_hazard_label(label: &str) -> bool {
    let label = label.to_ascii_lowercase();
    HAZARD_LABELS.iter().any(|hazard| *hazard == label)
}

type OnnxPlan = TypedRunnableModel<TypedModel>;

/// Learned-model detector: ONNX classifier over a label file.
pub struct OnnxHazardDetector {
    model: OnnxPlan,
    labels: Vec<String>,
}

impl OnnxHazardDetector {
    pub fn load(model_path: &Path, labels_path: &Path) -> Result<Self> {
        let labels: Vec<String> = fs::read_to_string(labels_path)
            .with_context(|| format!("read label file {}", labels_path.display()))?
            .lines()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();
        if labels.is_empty() {
            return Err(anyhow!("label file {} is empty", labels_path.display()));
        }

        let size = MODEL_INPUT_SIZE as usize;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, size, size)),
            )
            .context("set model input fact")?
            .into_optimized()
            .context("optimize ONNX model")?
            .into_runnable()
            .context("build runnable ONNX model")?;

        Ok(Self { model, labels })
    }

    fn build_input(&self, frame: &Frame) -> Result<Tensor> {
        let img = image::RgbImage::from_raw(frame.width, frame.height, frame.pixels.clone())
            .ok_or_else(|| anyhow!("frame pixel buffer does not match its dimensions"))?;
        let resized = image::imageops::resize(
            &img,
            MODEL_INPUT_SIZE,
            MODEL_INPUT_SIZE,
            image::imageops::FilterType::Triangle,
        );

        let size = MODEL_INPUT_SIZE as usize;
        let input = tract_ndarray::Array4::from_shape_fn(
            (1, 3, size, size),
            |(_, channel, y, x)| {
                resized.get_pixel(x as u32, y as u32)[channel] as f32 / 255.0
            },
        );

        Ok(input.into_tensor())
    }

    fn label_scores(&self, outputs: TVec<TValue>) -> Result<Vec<(String, f32)>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let scores = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;

        Ok(self
            .labels
            .iter()
            .zip(scores.iter())
            .map(|(label, score)| (label.clone(), *score))
            .collect())
    }
}

impl HazardDetector for OnnxHazardDetector {
    fn name(&self) -> &'static str {
        "onnx"
    }

    fn assess(&self, frame: &Frame) -> Result<HazardAssessment> {
        let input = self.build_input(frame)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        let detections = self.label_scores(outputs)?;
        let (hazardous, score) = evaluate_detections(&detections);

        Ok(HazardAssessment {
            hazardous,
            score,
            detections,
        })
    }
}

/// Heuristic fallback: proportion of flame-colored pixels in the frame.
pub struct FlamePixelDetector;

impl HazardDetector for FlamePixelDetector {
    fn name(&self) -> &'static str {
        "flame-pixel"
    }

    fn assess(&self, frame: &Frame) -> Result<HazardAssessment> {
        let total = (frame.width as usize) * (frame.height as usize);
        if total == 0 || frame.pixels.len() != total * 3 {
            return Err(anyhow!("frame has no usable pixel data"));
        }

        let flame = frame
            .pixels
            .chunks_exact(3)
            .filter(|px| is_flame_colored(px[0], px[1], px[2]))
            .count();
        let ratio = flame as f64 / total as f64;

        Ok(HazardAssessment {
            hazardous: ratio > FLAME_PIXEL_RATIO,
            score: ratio,
            detections: Vec::new(),
        })
    }
}

// Bright, red-dominant pixels with the warm R > G > B falloff of a flame.
fn is_flame_colored(r: u8, g: u8, b: u8) -> bool {
    r > 180 && g > 40 && b < 80 && r > g && g > b
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_frame(width: u32, height: u32, rgb: [u8; 3]) -> Frame {
        let mut pixels = Vec::with_capacity((width * height * 3) as usize);
        for _ in 0..width * height {
            pixels.extend_from_slice(&rgb);
        }
        Frame {
            pixels,
            width,
            height,
        }
    }

    #[test]
    fn flame_colored_frame_is_hazardous() {
        let detector = FlamePixelDetector;
        let frame = solid_frame(16, 16, [230, 120, 30]);

        let assessment = detector.assess(&frame).unwrap();
        assert!(assessment.hazardous);
        assert_eq!(assessment.score, 1.0);
    }

    #[test]
    fn dark_frame_is_safe() {
        let detector = FlamePixelDetector;
        let frame = solid_frame(16, 16, [12, 14, 20]);

        let assessment = detector.assess(&frame).unwrap();
        assert!(!assessment.hazardous);
        assert_eq!(assessment.score, 0.0);
    }

    #[test]
    fn truncated_frame_is_an_error() {
        let detector = FlamePixelDetector;
        let frame = Frame {
            pixels: vec![0; 10],
            width: 16,
            height: 16,
        };
        assert!(detector.assess(&frame).is_err());
    }

    #[test]
    fn hazard_labels_need_high_confidence() {
        let (hazardous, score) =
            evaluate_detections(&[("fire".to_string(), 0.9), ("person".to_string(), 0.3)]);
        assert!(hazardous);
        assert!((score - 0.9).abs() < 1e-6);

        let (hazardous, _) = evaluate_detections(&[("fire".to_string(), 0.69)]);
        assert!(!hazardous);
    }

    #[test]
    fn non_hazard_labels_are_ignored_regardless_of_confidence() {
        let (hazardous, score) = evaluate_detections(&[("person".to_string(), 0.99)]);
        assert!(!hazardous);
        assert_eq!(score, 0.0);
    }

    #[test]
    fn label_matching_is_case_insensitive() {
        let (hazardous, _) = evaluate_detections(&[("Smoke".to_string(), 0.8)]);
        assert!(hazardous);
    }
}
