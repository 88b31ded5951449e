// THEORY:
// The face mesh model never sees the whole camera frame. It sees a square
// region of interest around one face, resized to the model's input size. This
// module owns both halves of that coordinate change so any inference backend
// can share it:
//
// - forward: frame → square ROI → `input_size`² RGB → f32 tensor in [0, 1]
// - backward: model-space pixel triples → landmarks normalized to the frame
//
// The mesh model's outputs are matched up once, when the model is loaded
// (`MeshOutputs::resolve`). The landmark tensor is the first output large enough
// to hold the refined mesh. The face-presence logit is picked by name when one
// is configured, otherwise it is the first single-value output; any later
// single-value output (the tongue score) is not read.
//
// ROIs are kept in integer frame pixels so the crop and the decode use exactly
// the same origin and side. A ROI may stick out of the frame; the part outside
// is black in the crop and decodes like any other position.

use crate::core_modules::landmark::{FaceLandmarks, Landmark, REFINED_LANDMARK_COUNT};
use crate::error::{Error, Result};
use image::{RgbImage, imageops};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Memory order of the model's input tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TensorLayout {
    /// `[1, height, width, 3]`, the order of models converted from TFLite.
    #[default]
    Nhwc,
    /// `[1, 3, height, width]`.
    Nchw,
}

impl TensorLayout {
    pub fn shape(self, input_size: u32) -> [i32; 4] {
        let side = input_size as i32;
        match self {
            TensorLayout::Nhwc => [1, side, side, 3],
            TensorLayout::Nchw => [1, 3, side, side],
        }
    }
}

/// A face box from the detection stage, in frame pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub score: f32,
}

/// Values per YuNet detection row: box, five landmark pairs, score.
pub const YUNET_ROW_LEN: usize = 15;
const YUNET_SCORE_COLUMN: usize = 14;

impl FaceBox {
    /// One YuNet row. Columns 0..4 are the box in frame pixels, column 14 the score.
    pub fn from_yunet_row(row: &[f32]) -> Result<Self> {
        if row.len() < YUNET_ROW_LEN {
            return Err(Error::detector(format!(
                "face detection row holds {} values, expected {YUNET_ROW_LEN}",
                row.len()
            )));
        }
        Ok(Self {
            x: row[0],
            y: row[1],
            width: row[2],
            height: row[3],
            score: row[YUNET_SCORE_COLUMN],
        })
    }
}

/// Splits a flat `N x 15` YuNet result into face boxes.
pub fn parse_yunet_rows(data: &[f32]) -> Result<Vec<FaceBox>> {
    if data.len() % YUNET_ROW_LEN != 0 {
        return Err(Error::detector(format!(
            "face detection output holds {} values, not a multiple of {YUNET_ROW_LEN}",
            data.len()
        )));
    }
    data.chunks_exact(YUNET_ROW_LEN).map(FaceBox::from_yunet_row).collect()
}

/// Positions of the landmark and presence tensors among the mesh model's outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshOutputs {
    pub landmarks: usize,
    pub presence: Option<usize>,
}

impl MeshOutputs {
    pub fn resolve<S: AsRef<str>>(names: &[S], lengths: &[usize], presence_name: Option<&str>) -> Result<Self> {
        if names.len() != lengths.len() {
            return Err(Error::detector(format!(
                "{} output names for {} outputs",
                names.len(),
                lengths.len()
            )));
        }

        let landmarks = lengths
            .iter()
            .position(|&len| len >= REFINED_LANDMARK_COUNT * 3)
            .ok_or_else(|| Error::detector("face mesh model has no landmark output"))?;

        let presence = match presence_name {
            Some(wanted) => {
                let index = names
                    .iter()
                    .position(|name| name.as_ref() == wanted)
                    .ok_or_else(|| Error::detector(format!("face mesh model has no output named {wanted}")))?;
                if lengths[index] != 1 {
                    return Err(Error::detector(format!(
                        "output {wanted} holds {} values, expected a single presence logit",
                        lengths[index]
                    )));
                }
                Some(index)
            }
            None => lengths.iter().position(|&len| len == 1),
        };

        Ok(Self { landmarks, presence })
    }

    /// Picks the landmark tensor and the presence logit out of one forward pass.
    pub fn select<'a>(&self, outputs: &[&'a [f32]]) -> Result<(&'a [f32], Option<f32>)> {
        let landmarks = outputs
            .get(self.landmarks)
            .copied()
            .ok_or_else(|| Error::detector(format!("missing landmark output {}", self.landmarks)))?;
        let presence = match self.presence {
            Some(index) => Some(
                outputs
                    .get(index)
                    .and_then(|values| values.first().copied())
                    .ok_or_else(|| Error::detector(format!("missing presence output {index}")))?,
            ),
            None => None,
        };
        Ok((landmarks, presence))
    }
}

/// Square crop fed to the landmark model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshRoi {
    pub x: i64,
    pub y: i64,
    pub side: u32,
}

impl MeshRoi {
    /// A square centered on the face box, `max(width, height) * scale` wide.
    pub fn around(face: &FaceBox, scale: f32) -> Self {
        let side = (face.width.max(face.height) * scale).round().max(1.0);
        let center_x = face.x + face.width / 2.0;
        let center_y = face.y + face.height / 2.0;
        Self {
            x: (center_x - side / 2.0).round() as i64,
            y: (center_y - side / 2.0).round() as i64,
            side: side as u32,
        }
    }

    /// The largest centered square inside the frame. Used when no face-box stage
    /// is configured.
    pub fn full_frame(frame_width: u32, frame_height: u32) -> Self {
        let side = frame_width.min(frame_height).max(1);
        Self {
            x: ((frame_width - side.min(frame_width)) / 2) as i64,
            y: ((frame_height - side.min(frame_height)) / 2) as i64,
            side,
        }
    }
}

/// Cuts the ROI out of the frame and resizes it to `input_size` square.
pub fn crop_to_input(frame: &RgbImage, roi: &MeshRoi, input_size: u32) -> RgbImage {
    let mut square = RgbImage::new(roi.side, roi.side);
    imageops::replace(&mut square, frame, -roi.x, -roi.y);
    if roi.side == input_size {
        return square;
    }
    imageops::resize(&square, input_size, input_size, imageops::FilterType::Triangle)
}

pub fn to_tensor(image: &RgbImage, layout: TensorLayout) -> Vec<f32> {
    match layout {
        TensorLayout::Nhwc => image.as_raw().iter().map(|&v| v as f32 / 255.0).collect(),
        TensorLayout::Nchw => {
            let plane = image.width() as usize * image.height() as usize;
            let mut tensor = vec![0.0; plane * 3];
            for (i, pixel) in image.pixels().enumerate() {
                for (channel, &value) in pixel.0.iter().enumerate() {
                    tensor[channel * plane + i] = value as f32 / 255.0;
                }
            }
            tensor
        }
    }
}

/// Maps `(x, y, z)` triples in model input pixels back to frame-normalized
/// landmarks. Extra trailing values are ignored.
pub fn decode_landmarks(
    raw: &[f32],
    roi: &MeshRoi,
    input_size: u32,
    frame_width: u32,
    frame_height: u32,
) -> Result<FaceLandmarks> {
    if raw.len() < REFINED_LANDMARK_COUNT * 3 {
        return Err(Error::detector(format!(
            "landmark tensor holds {} values, expected at least {}",
            raw.len(),
            REFINED_LANDMARK_COUNT * 3
        )));
    }

    let scale = roi.side as f64 / input_size as f64;
    let points = raw
        .chunks_exact(3)
        .take(REFINED_LANDMARK_COUNT)
        .map(|p| Landmark {
            x: (roi.x as f64 + p[0] as f64 * scale) / frame_width as f64,
            y: (roi.y as f64 + p[1] as f64 * scale) / frame_height as f64,
            z: p[2] as f64 / input_size as f64,
        })
        .collect();
    Ok(FaceLandmarks::new(points))
}

/// Face-presence probability from the model's raw logit.
pub fn presence_score(logit: f32) -> f32 {
    1.0 / (1.0 + (-logit).exp())
}

/// Drops boxes under the score threshold and keeps the `max_faces` best.
pub fn rank_faces(mut faces: Vec<FaceBox>, score_threshold: f32, max_faces: usize) -> Vec<FaceBox> {
    faces.retain(|face| face.score >= score_threshold);
    faces.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    faces.truncate(max_faces);
    faces
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn face_box(x: f32, y: f32, width: f32, height: f32, score: f32) -> FaceBox {
        FaceBox { x, y, width, height, score }
    }

    #[test]
    fn roi_is_a_scaled_square_centered_on_the_box() {
        let roi = MeshRoi::around(&face_box(200.0, 100.0, 100.0, 120.0, 0.9), 1.5);
        assert_eq!(roi, MeshRoi { x: 160, y: 70, side: 180 });
    }

    #[test]
    fn full_frame_roi_is_the_centered_square() {
        assert_eq!(MeshRoi::full_frame(640, 480), MeshRoi { x: 80, y: 0, side: 480 });
        assert_eq!(MeshRoi::full_frame(480, 640), MeshRoi { x: 0, y: 80, side: 480 });
    }

    #[test]
    fn crop_pads_outside_the_frame_with_black() {
        let frame = RgbImage::from_pixel(4, 4, Rgb([200, 100, 50]));
        let roi = MeshRoi { x: -2, y: -2, side: 4 };

        let crop = crop_to_input(&frame, &roi, 4);

        assert_eq!(crop.dimensions(), (4, 4));
        assert_eq!(*crop.get_pixel(0, 0), Rgb([0, 0, 0]));
        assert_eq!(*crop.get_pixel(1, 3), Rgb([0, 0, 0]));
        assert_eq!(*crop.get_pixel(2, 2), Rgb([200, 100, 50]));
        assert_eq!(*crop.get_pixel(3, 3), Rgb([200, 100, 50]));
    }

    #[test]
    fn crop_resizes_to_the_model_input() {
        let frame = RgbImage::from_pixel(640, 480, Rgb([10, 20, 30]));
        let crop = crop_to_input(&frame, &MeshRoi::full_frame(640, 480), 256);
        assert_eq!(crop.dimensions(), (256, 256));
        assert_eq!(*crop.get_pixel(128, 128), Rgb([10, 20, 30]));
    }

    #[test]
    fn tensor_layouts_order_channels_differently() {
        let image = RgbImage::from_fn(2, 1, |x, _| if x == 0 { Rgb([255, 0, 0]) } else { Rgb([0, 0, 255]) });

        assert_eq!(to_tensor(&image, TensorLayout::Nhwc), vec![1.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
        assert_eq!(to_tensor(&image, TensorLayout::Nchw), vec![1.0, 0.0, 0.0, 0.0, 0.0, 1.0]);

        let image = RgbImage::from_fn(2, 1, |x, _| if x == 0 { Rgb([255, 51, 0]) } else { Rgb([0, 0, 255]) });
        assert_eq!(to_tensor(&image, TensorLayout::Nhwc), vec![1.0, 0.2, 0.0, 0.0, 0.0, 1.0]);
        assert_eq!(to_tensor(&image, TensorLayout::Nchw), vec![1.0, 0.0, 0.2, 0.0, 0.0, 1.0]);
        assert_eq!(TensorLayout::Nchw.shape(256), [1, 3, 256, 256]);
    }

    #[test]
    fn decoding_undoes_the_roi_transform() {
        let roi = MeshRoi { x: 160, y: 70, side: 180 };
        let mut raw = vec![0.0f32; REFINED_LANDMARK_COUNT * 3];
        // Point 0 at the input center, point 1 at the input origin.
        raw[0] = 128.0;
        raw[1] = 128.0;
        raw[2] = 25.6;

        let face = decode_landmarks(&raw, &roi, 256, 640, 480).expect("full tensor");

        assert_eq!(face.len(), REFINED_LANDMARK_COUNT);
        let center = face.get(0).unwrap();
        assert!((center.x - 250.0 / 640.0).abs() < 1e-9);
        assert!((center.y - 160.0 / 480.0).abs() < 1e-9);
        assert!((center.z - 0.1).abs() < 1e-6);
        let origin = face.get(1).unwrap();
        assert!((origin.x - 160.0 / 640.0).abs() < 1e-9);
        assert!((origin.y - 70.0 / 480.0).abs() < 1e-9);
    }

    #[test]
    fn short_landmark_tensors_are_rejected() {
        let raw = vec![0.0f32; 468 * 3];
        let err = decode_landmarks(&raw, &MeshRoi::full_frame(640, 480), 256, 640, 480).unwrap_err();
        assert!(matches!(err, Error::Detector(_)));
    }

    #[test]
    fn presence_is_a_sigmoid() {
        assert!((presence_score(0.0) - 0.5).abs() < 1e-6);
        assert!(presence_score(6.0) > 0.99);
        assert!(presence_score(-6.0) < 0.01);
    }

    #[test]
    fn ranking_keeps_the_strongest_faces() {
        let faces = vec![
            face_box(0.0, 0.0, 10.0, 10.0, 0.6),
            face_box(50.0, 0.0, 10.0, 10.0, 0.95),
            face_box(90.0, 0.0, 10.0, 10.0, 0.3),
        ];

        let ranked = rank_faces(faces.clone(), 0.5, 1);
        assert_eq!(ranked, vec![faces[1]]);

        let ranked = rank_faces(faces.clone(), 0.5, 5);
        assert_eq!(ranked, vec![faces[1], faces[0]]);
    }

    #[test]
    fn yunet_rows_take_the_box_and_the_last_column_score() {
        let mut data = Vec::new();
        for (offset, score) in [(0.0, 0.9), (100.0, 0.4)] {
            let mut row = vec![-1.0f32; YUNET_ROW_LEN];
            row[..4].copy_from_slice(&[10.0 + offset, 20.0, 30.0, 40.0]);
            row[YUNET_ROW_LEN - 1] = score;
            data.extend(row);
        }

        let faces = parse_yunet_rows(&data).expect("two rows");
        assert_eq!(
            faces,
            vec![face_box(10.0, 20.0, 30.0, 40.0, 0.9), face_box(110.0, 20.0, 30.0, 40.0, 0.4)]
        );
        assert!(parse_yunet_rows(&[]).unwrap().is_empty());
    }

    #[test]
    fn ragged_yunet_output_is_rejected() {
        assert!(matches!(parse_yunet_rows(&[0.0; 20]), Err(Error::Detector(_))));
        assert!(matches!(FaceBox::from_yunet_row(&[0.0; 14]), Err(Error::Detector(_))));
    }

    #[test]
    fn a_trailing_tongue_score_does_not_replace_presence() {
        let landmarks = vec![0.0f32; REFINED_LANDMARK_COUNT * 3];
        let presence = [2.0f32];
        let tongue = [-3.0f32];
        let names = ["Identity", "Identity_1", "Identity_2"];

        let resolved = MeshOutputs::resolve(&names, &[landmarks.len(), 1, 1], None).expect("three outputs");
        assert_eq!(resolved, MeshOutputs { landmarks: 0, presence: Some(1) });

        let (mesh, logit) = resolved.select(&[landmarks.as_slice(), &presence[..], &tongue[..]]).unwrap();
        assert_eq!(mesh.len(), REFINED_LANDMARK_COUNT * 3);
        assert_eq!(logit, Some(2.0));
        assert!(presence_score(logit.unwrap()) > 0.5);
    }

    #[test]
    fn presence_output_can_be_pinned_by_name() {
        let names = ["tongue", "landmarks", "face_flag"];
        let lengths = [1, REFINED_LANDMARK_COUNT * 3, 1];

        let resolved = MeshOutputs::resolve(&names, &lengths, Some("face_flag")).unwrap();
        assert_eq!(resolved, MeshOutputs { landmarks: 1, presence: Some(2) });

        assert!(MeshOutputs::resolve(&names, &lengths, Some("missing")).is_err());
        assert!(MeshOutputs::resolve(&names, &lengths, Some("landmarks")).is_err());
    }

    #[test]
    fn models_without_a_full_mesh_output_are_rejected() {
        let err = MeshOutputs::resolve(&["a", "b"], &[468 * 3, 1], None).unwrap_err();
        assert!(matches!(err, Error::Detector(_)));

        let landmark_only = MeshOutputs::resolve(&["a"], &[REFINED_LANDMARK_COUNT * 3], None).unwrap();
        assert_eq!(landmark_only.presence, None);
        let mesh = vec![0.0f32; REFINED_LANDMARK_COUNT * 3];
        let (_, logit) = landmark_only.select(&[mesh.as_slice()]).unwrap();
        assert_eq!(logit, None);
    }
}
