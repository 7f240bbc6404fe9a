// Landmark contours, either as named groups or picked out of a full face mesh.
use serde::Deserialize;

use crate::error::DetectorError;
use crate::types::Point;

/// Normalized [0, 1] image coordinate, `[x, y]`.
pub type NormPoint = [f32; 2];

/* ---- Face-mesh indices of each contour (468-point mesh) ---- */
const LIPS_OUTER: &[usize] = &[61, 146, 91, 181, 84, 17, 314, 405, 321, 375, 291];
const LIPS_INNER: &[usize] = &[78, 95, 88, 178, 87, 14, 317, 402, 310, 415, 308];
const BROW_LEFT: &[usize] = &[70, 63, 105, 66, 107, 55, 65, 52, 53, 46];
const BROW_RIGHT: &[usize] = &[336, 296, 334, 293, 300, 276, 283, 282, 295, 285];
const EYE_LEFT: &[usize] = &[33, 7, 163, 144, 145, 153, 154, 155, 133];
const EYE_RIGHT: &[usize] = &[362, 382, 381, 380, 374, 373, 390, 249, 263];
const FACE_OVAL: &[usize] = &[
    10, 338, 297, 332, 284, 251, 389, 356, 454, 323, 361, 288, 397, 365, 379, 378, 400, 377, 152, 148, 176,
    149, 150, 136, 172, 58, 132, 93, 234, 127, 162, 21, 54, 103, 67, 109,
];

/// The contour groups the mask builder needs.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FaceLandmarks {
    pub lips_outer: Vec<NormPoint>,
    pub lips_inner: Vec<NormPoint>,
    pub brow_left: Vec<NormPoint>,
    pub brow_right: Vec<NormPoint>,
    pub eye_left: Vec<NormPoint>,
    pub eye_right: Vec<NormPoint>,
    pub face_oval: Vec<NormPoint>,
}

/// On-disk landmark answer: named groups or the raw mesh.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum LandmarkFile {
    Mesh { mesh: Vec<NormPoint> },
    Groups(FaceLandmarks),
}

impl LandmarkFile {
    pub fn into_landmarks(self) -> Result<FaceLandmarks, DetectorError> {
        match self {
            LandmarkFile::Groups(groups) => Ok(groups),
            LandmarkFile::Mesh { mesh } => FaceLandmarks::from_mesh(&mesh),
        }
    }
}

impl FaceLandmarks {
    /// Pick every contour out of a full face mesh.
    pub fn from_mesh(mesh: &[NormPoint]) -> Result<Self, DetectorError> {
        let pick = |ids: &[usize]| -> Result<Vec<NormPoint>, DetectorError> {
            ids.iter()
                .map(|&i| {
                    mesh.get(i).copied().ok_or_else(|| {
                        DetectorError::MalformedOutput(format!("mesh has {} points, needs index {i}", mesh.len()))
                    })
                })
                .collect()
        };
        Ok(Self {
            lips_outer: pick(LIPS_OUTER)?,
            lips_inner: pick(LIPS_INNER)?,
            brow_left: pick(BROW_LEFT)?,
            brow_right: pick(BROW_RIGHT)?,
            eye_left: pick(EYE_LEFT)?,
            eye_right: pick(EYE_RIGHT)?,
            face_oval: pick(FACE_OVAL)?,
        })
    }

    /// A face needs at least a closed oval.
    pub fn has_face(&self) -> bool {
        self.face_oval.len() >= 3
    }
}

/// Scale a normalized contour into pixel space.
pub(crate) fn to_pixels(points: &[NormPoint], width: usize, height: usize) -> Vec<Point> {
    points.iter().map(|&[x, y]| Point::new(x * width as f32, y * height as f32)).collect()
}
