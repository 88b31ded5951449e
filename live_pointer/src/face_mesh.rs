// THEORY:
// Two-stage landmark detection on opencv `dnn`: YuNet finds face boxes on the
// BGR frame, then the refined face-mesh model runs once per box on a square
// crop. Cropping, tensor packing and decoding are shared with the library
// (`core_modules::mesh_input`); this file only moves tensors in and out of
// opencv.
//
// The mesh model's outputs are matched up once at load, from a forward pass on
// a blank input: which output holds the landmarks and which the face-presence
// logit. Every later pass reads those two positions and nothing else.

use crate::convert::frame_to_bgr;
use gaze_pointer::{
    Error, Result,
    config::DetectorConfig,
    core_modules::{
        frame::Frame,
        landmark::FaceLandmarks,
        mesh_input::{self, MeshOutputs, MeshRoi},
    },
    devices::LandmarkDetector,
};
use opencv::{
    core::{CV_32F, Mat, Ptr, Scalar, Size, Vector},
    dnn::{self, Net},
    objdetect::FaceDetectorYN,
    prelude::*,
};
use std::path::Path;
use tracing::{debug, info};

const YUNET_NMS_THRESHOLD: f32 = 0.3;
const YUNET_TOP_K: i32 = 5000;

pub struct OpenCvFaceMesh {
    face_boxes: Option<Ptr<FaceDetectorYN>>,
    mesh: Net,
    output_names: Vector<String>,
    outputs: MeshOutputs,
    input: Mat,
    config: DetectorConfig,
}

fn forward(mesh: &mut Net, input: &Mat, output_names: &Vector<String>) -> Result<Vec<Mat>> {
    mesh.set_input(input, "", 1.0, Scalar::default())
        .map_err(Error::detector)?;
    let mut outputs = Vector::<Mat>::new();
    mesh.forward(&mut outputs, output_names).map_err(Error::detector)?;
    Ok(outputs.to_vec())
}

fn output_values(outputs: &[Mat]) -> Result<Vec<&[f32]>> {
    outputs
        .iter()
        .map(|output| output.data_typed::<f32>().map_err(Error::detector))
        .collect()
}

fn path_str(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or_else(|| Error::detector(format!("model path {} is not valid UTF-8", path.display())))
}

impl OpenCvFaceMesh {
    #[tracing::instrument(skip(config), fields(landmark_model = %config.landmark_model.display()))]
    pub fn load(config: &DetectorConfig) -> Result<Self> {
        let mut mesh = dnn::read_net_from_onnx(path_str(&config.landmark_model)?).map_err(Error::detector)?;
        let output_names = mesh.get_unconnected_out_layers_names().map_err(Error::detector)?;

        let face_boxes = match &config.face_model {
            Some(path) => Some(
                FaceDetectorYN::create(
                    path_str(path)?,
                    "",
                    Size::new(320, 320),
                    config.score_threshold,
                    YUNET_NMS_THRESHOLD,
                    YUNET_TOP_K,
                    dnn::DNN_BACKEND_DEFAULT,
                    dnn::DNN_TARGET_CPU,
                )
                .map_err(Error::detector)?,
            ),
            None => None,
        };

        let input = Mat::new_nd_with_default(&config.layout.shape(config.input_size), CV_32F, Scalar::all(0.0))
            .map_err(Error::detector)?;

        let blank = forward(&mut mesh, &input, &output_names)?;
        let lengths: Vec<usize> = output_values(&blank)?.iter().map(|values| values.len()).collect();
        let names = output_names.to_vec();
        let outputs = MeshOutputs::resolve(names.as_slice(), &lengths, config.presence_output.as_deref())?;

        info!(
            outputs = output_names.len(),
            landmark_output = outputs.landmarks,
            presence_output = ?outputs.presence,
            face_boxes = face_boxes.is_some(),
            "face mesh loaded"
        );
        Ok(Self {
            face_boxes,
            mesh,
            output_names,
            outputs,
            input,
            config: config.clone(),
        })
    }

    fn face_rois(&mut self, frame: &Frame) -> Result<Vec<MeshRoi>> {
        let (width, height) = frame.dimensions();
        let Some(detector) = self.face_boxes.as_mut() else {
            return Ok(vec![MeshRoi::full_frame(width, height)]);
        };

        let bgr = frame_to_bgr(frame).map_err(Error::detector)?;
        detector
            .set_input_size(Size::new(width as i32, height as i32))
            .map_err(Error::detector)?;
        let mut rows = Mat::default();
        detector.detect(&bgr, &mut rows).map_err(Error::detector)?;

        let boxes = if rows.rows() > 0 {
            mesh_input::parse_yunet_rows(rows.data_typed::<f32>().map_err(Error::detector)?)?
        } else {
            Vec::new()
        };

        let ranked = mesh_input::rank_faces(boxes, self.config.score_threshold, self.config.max_faces);
        Ok(ranked
            .iter()
            .map(|face| MeshRoi::around(face, self.config.roi_scale))
            .collect())
    }

    fn run_mesh(&mut self, frame: &Frame, roi: &MeshRoi) -> Result<Option<FaceLandmarks>> {
        let size = self.config.input_size;
        let crop = mesh_input::crop_to_input(frame.image(), roi, size);
        let tensor = mesh_input::to_tensor(&crop, self.config.layout);
        self.input
            .data_typed_mut::<f32>()
            .map_err(Error::detector)?
            .copy_from_slice(&tensor);

        let outputs = forward(&mut self.mesh, &self.input, &self.output_names)?;
        let values = output_values(&outputs)?;
        let (raw, logit) = self.outputs.select(&values)?;

        if let Some(score) = logit.map(mesh_input::presence_score) {
            if score < self.config.presence_threshold {
                debug!(score, "face mesh rejected the crop");
                return Ok(None);
            }
        }

        let (width, height) = frame.dimensions();
        mesh_input::decode_landmarks(raw, roi, size, width, height).map(Some)
    }
}

impl LandmarkDetector for OpenCvFaceMesh {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceLandmarks>> {
        let rois = self.face_rois(frame)?;
        let mut faces = Vec::with_capacity(rois.len());
        for roi in &rois {
            if let Some(face) = self.run_mesh(frame, roi)? {
                faces.push(face);
            }
        }
        Ok(faces)
    }
}
