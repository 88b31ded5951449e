// THEORY:
// Landmark indices are not ours to choose. They come from the refined
// 478-point face mesh topology (468 surface points plus two 5-point iris rings)
// and never change between faces or frames. The named constants below are the
// only place raw indices appear; everything else asks `FaceLandmarks` for a
// semantic group and gets an error, never a panic, if the set is too short.

use crate::error::{Error, Result};

/// Number of points in a refined face mesh (surface plus iris rings).
pub const REFINED_LANDMARK_COUNT: usize = 478;

/// Four points around the right iris, in model order.
pub const RIGHT_IRIS_RING: [usize; 4] = [474, 475, 476, 477];

/// The ring point whose position drives the cursor.
pub const RIGHT_IRIS_TRACKING_POINT: usize = RIGHT_IRIS_RING[2];

pub const LEFT_EYE_LOWER_LID: usize = 145;
pub const LEFT_EYE_UPPER_LID: usize = 159;

/// A landmark in coordinates normalized to the frame: x and y are nominally in
/// [0, 1]. `z` is the model's relative depth and is not used for mapping.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: 0.0 }
    }

    /// Position in frame pixels. Not truncated.
    pub fn to_pixel(&self, frame_width: u32, frame_height: u32) -> (f64, f64) {
        (self.x * frame_width as f64, self.y * frame_height as f64)
    }
}

/// The two eyelid points used for blink detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyelidPair {
    pub lower: Landmark,
    pub upper: Landmark,
}

impl EyelidPair {
    /// Vertical lid separation in normalized units. Shrinks as the eye closes and
    /// can go negative.
    pub fn gap(&self) -> f64 {
        self.lower.y - self.upper.y
    }
}

/// All landmarks of one detected face, in model order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FaceLandmarks {
    points: Vec<Landmark>,
}

impl FaceLandmarks {
    pub fn new(points: Vec<Landmark>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Landmark] {
        &self.points
    }

    pub fn get(&self, index: usize) -> Result<Landmark> {
        self.points.get(index).copied().ok_or(Error::LandmarkIndex {
            index,
            len: self.points.len(),
        })
    }

    pub fn iris_ring(&self) -> Result<[Landmark; 4]> {
        let [a, b, c, d] = RIGHT_IRIS_RING;
        Ok([self.get(a)?, self.get(b)?, self.get(c)?, self.get(d)?])
    }

    pub fn eyelids(&self) -> Result<EyelidPair> {
        Ok(EyelidPair {
            lower: self.get(LEFT_EYE_LOWER_LID)?,
            upper: self.get(LEFT_EYE_UPPER_LID)?,
        })
    }
}

/// Builds a full mesh with every point at the frame center except the tracking
/// point and the two eyelid points.
#[cfg(test)]
pub(crate) fn synthetic_face(tracking: (f64, f64), lower_lid_y: f64, upper_lid_y: f64) -> FaceLandmarks {
    let mut points = vec![Landmark::new(0.5, 0.5); REFINED_LANDMARK_COUNT];
    points[RIGHT_IRIS_TRACKING_POINT] = Landmark::new(tracking.0, tracking.1);
    points[LEFT_EYE_LOWER_LID] = Landmark::new(0.4, lower_lid_y);
    points[LEFT_EYE_UPPER_LID] = Landmark::new(0.4, upper_lid_y);
    FaceLandmarks::new(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_indices_follow_the_refined_mesh_topology() {
        assert_eq!(RIGHT_IRIS_RING, [474, 475, 476, 477]);
        assert_eq!(RIGHT_IRIS_TRACKING_POINT, 476);
        assert_eq!(LEFT_EYE_LOWER_LID, 145);
        assert_eq!(LEFT_EYE_UPPER_LID, 159);
        assert!(RIGHT_IRIS_RING.iter().all(|&i| i < REFINED_LANDMARK_COUNT));
    }

    #[test]
    fn iris_ring_selects_points_in_model_order() {
        let points = (0..REFINED_LANDMARK_COUNT)
            .map(|i| Landmark::new(i as f64 / 1000.0, 0.0))
            .collect();
        let face = FaceLandmarks::new(points);

        let ring = face.iris_ring().expect("full mesh");
        let xs: Vec<f64> = ring.iter().map(|l| l.x).collect();
        assert_eq!(xs, vec![0.474, 0.475, 0.476, 0.477]);
    }

    #[test]
    fn eyelid_gap_is_lower_minus_upper() {
        let face = synthetic_face((0.5, 0.5), 0.41, 0.40);
        let gap = face.eyelids().expect("full mesh").gap();
        assert!((gap - 0.01).abs() < 1e-12);
    }

    #[test]
    fn short_mesh_is_an_error_not_a_panic() {
        // A 468-point mesh has no iris rings.
        let face = FaceLandmarks::new(vec![Landmark::default(); 468]);
        assert!(matches!(
            face.iris_ring(),
            Err(Error::LandmarkIndex { index: 474, len: 468 })
        ));
        assert!(face.eyelids().is_ok());
    }

    #[test]
    fn pixel_conversion_scales_each_axis() {
        let (x, y) = Landmark::new(0.25, 0.75).to_pixel(640, 480);
        assert_eq!((x, y), (160.0, 360.0));
    }
}
