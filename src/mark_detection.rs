use crate::config::FaceMeshConfig;
use crate::constants::{FACE_MESH_LANDMARKS, REFINED_FACE_MESH_LANDMARKS};
use crate::detector::{CandidateMetadata, FaceCandidate, LandmarkDetector, LandmarkPoint};
use crate::utils::image_conversion::resize_linear;
use crate::{Error, Result};
use image::RgbImage;
use ndarray::{Array, CowArray};
use ort::{Environment, GraphOptimizationLevel, Session, Value};
use std::path::Path;
use std::sync::Arc;

/// Face mesh model input side length
const FACE_MESH_INPUT_SIZE: u32 = 256;

/// Values per landmark in the model output (x, y, z)
const VALUES_PER_LANDMARK: usize = 3;

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Face mesh landmark detector using `ONNX` Runtime.
///
/// The model sees the whole raster resized to 256x256 and reports at most
/// one face together with a face-presence logit.
pub struct OnnxFaceMeshDetector {
    session: Session,
    min_confidence: f32,
    refine_landmarks: bool,
}

impl OnnxFaceMeshDetector {
    /// Load the face mesh model
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The ONNX runtime environment cannot be created
    /// - The ONNX model file cannot be loaded
    /// - The model does not have the landmark and face-flag outputs
    pub fn new<P: AsRef<Path>>(model_path: P, settings: &FaceMeshConfig) -> Result<Self> {
        log::info!(
            "Initializing face mesh detector with model: {}",
            model_path.as_ref().display()
        );
        let environment = Arc::new(
            Environment::builder()
                .with_name("face_mesh")
                .with_log_level(ort::LoggingLevel::Warning)
                .build()?,
        );

        let session = ort::SessionBuilder::new(&environment)?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_model_from_file(model_path)?;

        if session.outputs.len() < 2 {
            return Err(Error::ModelError(format!(
                "Face mesh model needs landmark and face flag outputs, found {}",
                session.outputs.len()
            )));
        }

        Ok(Self {
            session,
            min_confidence: settings.min_detection_confidence,
            refine_landmarks: settings.refine_landmarks,
        })
    }

    /// Run the model on a 256x256 input
    fn forward(&self, input: &RgbImage) -> Result<(Vec<f32>, f32)> {
        let samples: Vec<f32> = input.as_raw().iter().map(|&v| f32::from(v) / 255.0).collect();
        let side = FACE_MESH_INPUT_SIZE as usize;
        let array: CowArray<_, _> = Array::from_shape_vec((1, side, side, 3), samples)
            .map_err(|e| Error::ModelError(format!("Failed to create input tensor: {e}")))?
            .into_dyn()
            .into();

        let inputs = vec![Value::from_array(self.session.allocator(), &array)?];
        let outputs: Vec<Value> = self.session.run(inputs)?;

        let landmarks_output = outputs
            .first()
            .ok_or_else(|| Error::ModelOutputError("Missing landmark output".to_string()))?;
        let flag_output = outputs
            .get(1)
            .ok_or_else(|| Error::ModelOutputError("Missing face flag output".to_string()))?;

        let landmarks = landmarks_output.try_extract::<f32>()?;
        let landmarks: Vec<f32> = landmarks.view().iter().copied().collect();

        let flag = flag_output.try_extract::<f32>()?;
        let flag = flag
            .view()
            .iter()
            .next()
            .copied()
            .ok_or_else(|| Error::ModelOutputError("Empty face flag output".to_string()))?;

        Ok((landmarks, sigmoid(flag)))
    }

    /// Convert raw model output into a candidate in normalized coordinates
    fn postprocess(&self, raw: &[f32], confidence: f32) -> Result<FaceCandidate> {
        let available = raw.len() / VALUES_PER_LANDMARK;
        if available < FACE_MESH_LANDMARKS {
            return Err(Error::ModelOutputError(format!(
                "Expected at least {FACE_MESH_LANDMARKS} landmarks, got {available}"
            )));
        }
        let count = if self.refine_landmarks {
            available.min(REFINED_FACE_MESH_LANDMARKS)
        } else {
            FACE_MESH_LANDMARKS
        };

        let size = f64::from(FACE_MESH_INPUT_SIZE);
        let points = raw
            .chunks_exact(VALUES_PER_LANDMARK)
            .take(count)
            .zip(0u32..)
            .map(|(xyz, id)| {
                LandmarkPoint::with_depth(
                    id,
                    f64::from(xyz[0]) / size,
                    f64::from(xyz[1]) / size,
                    f64::from(xyz[2]) / size,
                )
            })
            .collect();

        Ok(FaceCandidate::new(points).with_metadata(CandidateMetadata {
            score: Some(confidence),
            ..CandidateMetadata::default()
        }))
    }
}

impl LandmarkDetector for OnnxFaceMeshDetector {
    fn detect(&self, image: &RgbImage) -> Result<Vec<FaceCandidate>> {
        let input = resize_linear(image, FACE_MESH_INPUT_SIZE, FACE_MESH_INPUT_SIZE);
        let (raw, confidence) = self.forward(&input)?;
        if confidence < self.min_confidence {
            log::debug!("Face confidence {confidence:.3} below {:.3}", self.min_confidence);
            return Ok(Vec::new());
        }
        Ok(vec![self.postprocess(&raw, confidence)?])
    }

    fn name(&self) -> &str {
        "onnx_face_mesh"
    }
}
