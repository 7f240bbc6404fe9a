// Part Mask Builder: detector answer → per-part stencils.
// Visual expectation: skin covers the face minus eyes and mouth, lips are a ring,
// and face_clip reaches a few pixels past the jawline.
use tracing::{debug, warn};

use super::class_map::{ClassIds, ClassMap};
use super::landmarks::{FaceLandmarks, to_pixels};
use super::provider::DetectorHandle;
use super::Detection;
use crate::error::DetectorError;
use crate::stencil::{FillRule, dilate, feather, fill_polygons, subtract_in_place, union_in_place, upscale_nearest};
use crate::steps::Part;
use crate::types::{AlphaStencil, RasterBuffer};

/// Feathering knobs for the landmark path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MaskParams {
    /// Box-blur radius softening polygon edges.
    pub feather_px: usize,
    /// How far painting may go past the face boundary.
    pub face_clip_margin_px: usize,
}

impl Default for MaskParams {
    fn default() -> Self {
        Self { feather_px: 1, face_clip_margin_px: 6 }
    }
}

/// Stencils derived once per photo.
///
/// `lips`, `brows` and `eyes` are `None` when nothing was detected for them;
/// `None` means "no restriction", never "always excluded".
#[derive(Clone, Debug, PartialEq)]
pub struct PartMaskSet {
    pub width: usize,
    pub height: usize,
    pub skin: AlphaStencil,
    /// Face region grown by the margin; every layer is clipped to it.
    pub face_clip: AlphaStencil,
    pub lips: Option<AlphaStencil>,
    pub brows: Option<AlphaStencil>,
    pub eyes: Option<AlphaStencil>,
}

impl PartMaskSet {
    /// Whole canvas permitted, no part restrictions.
    pub fn fallback(width: usize, height: usize) -> Self {
        let full = AlphaStencil::full(width, height);
        Self {
            width,
            height,
            skin: full.clone(),
            face_clip: full,
            lips: None,
            brows: None,
            eyes: None,
        }
    }

    /// Stencil a step is clamped or guided to, if there is one.
    pub fn part(&self, part: Part) -> Option<&AlphaStencil> {
        match part {
            Part::Skin => Some(&self.skin),
            Part::Lips => self.lips.as_ref(),
            Part::Brows => self.brows.as_ref(),
            Part::Eyes => self.eyes.as_ref(),
        }
    }

    pub fn from_landmarks(
        lm: &FaceLandmarks,
        width: usize,
        height: usize,
        params: &MaskParams,
    ) -> Result<Self, DetectorError> {
        if !lm.has_face() {
            return Err(DetectorError::NoFace);
        }
        let px = |points: &[[f32; 2]]| to_pixels(points, width, height);
        let fp = params.feather_px;

        // Lips: outer and inner contours together, even-odd → ring.
        let lips_raw = fill_polygons(
            width,
            height,
            &[px(&lm.lips_outer), px(&lm.lips_inner)],
            FillRule::EvenOdd,
        );
        // Each side filled on its own so a reversed contour cannot cancel the other.
        let pair = |left: &[[f32; 2]], right: &[[f32; 2]]| {
            let mut both = fill_polygons(width, height, &[px(left)], FillRule::NonZero);
            union_in_place(&mut both, &fill_polygons(width, height, &[px(right)], FillRule::NonZero));
            both
        };
        let brows_raw = pair(&lm.brow_left, &lm.brow_right);
        let eyes_raw = pair(&lm.eye_left, &lm.eye_right);
        let face = fill_polygons(width, height, &[px(&lm.face_oval)], FillRule::NonZero);

        // Skin = oval minus eyes minus lips, softened afterwards.
        let mut skin = face.clone();
        subtract_in_place(&mut skin, &eyes_raw);
        subtract_in_place(&mut skin, &lips_raw);

        let face_clip = feather(&dilate(&face, params.face_clip_margin_px), fp);

        Ok(Self {
            width,
            height,
            skin: feather(&skin, fp),
            face_clip,
            lips: non_empty(feather(&lips_raw, fp)),
            brows: non_empty(feather(&brows_raw, fp)),
            eyes: non_empty(feather(&eyes_raw, fp)),
        })
    }

    pub fn from_class_map(
        map: &ClassMap,
        ids: &ClassIds,
        width: usize,
        height: usize,
        params: &MaskParams,
    ) -> Result<Self, DetectorError> {
        if map.ids.len() != map.width * map.height {
            return Err(DetectorError::MalformedOutput("class map size mismatch".into()));
        }
        let up = upscale_nearest(&map.ids, map.width, map.height, width, height);
        let select = |set: &[u8]| {
            AlphaStencil::from_fn(width, height, |x, y| if set.contains(&up[y * width + x]) { 255 } else { 0 })
        };

        let face = select(&ids.face);
        if face.is_empty() {
            return Err(DetectorError::NoFace);
        }
        let face_clip = feather(&dilate(&face, params.face_clip_margin_px), params.feather_px);

        Ok(Self {
            width,
            height,
            skin: select(&ids.skin),
            face_clip,
            lips: non_empty(select(&ids.lips)),
            brows: non_empty(select(&ids.brows)),
            eyes: non_empty(select(&ids.eyes)),
        })
    }
}

fn non_empty(s: AlphaStencil) -> Option<AlphaStencil> {
    if s.is_empty() { None } else { Some(s) }
}

/// Whether the masks came from a detector or are the fallback.
#[derive(Clone, Debug, PartialEq)]
pub enum MaskStatus {
    Detected,
    Fallback(DetectorError),
}

/// A usable mask set plus how it was obtained.
#[derive(Clone, Debug, PartialEq)]
pub struct MaskOutcome {
    pub masks: PartMaskSet,
    pub status: MaskStatus,
}

/// Run one detector pass and derive the part masks.
/// Never fails: any detector problem yields the whole-canvas fallback.
pub fn build_part_masks(photo: &RasterBuffer, detector: &mut DetectorHandle, params: &MaskParams) -> MaskOutcome {
    let (w, h) = (photo.width, photo.height);
    let derived = detector.detect(photo).and_then(|detection| match detection {
        Detection::Landmarks(lm) => PartMaskSet::from_landmarks(&lm, w, h, params),
        Detection::ClassMap(map) => PartMaskSet::from_class_map(&map, &ClassIds::default(), w, h, params),
    });

    match derived {
        Ok(masks) => {
            debug!(width = w, height = h, lips = masks.lips.is_some(), "part masks derived");
            MaskOutcome { masks, status: MaskStatus::Detected }
        }
        Err(err) => {
            if !err.is_unavailable() {
                // Per-photo failure; unavailability is reported by whoever owns the session.
                warn!(error = %err, "face detection failed, using whole-canvas masks");
            }
            MaskOutcome { masks: PartMaskSet::fallback(w, h), status: MaskStatus::Fallback(err) }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{ExecutionProvider, NoDetectorFactory, StaticDetector};
    use crate::detect::{DetectorFactory, FaceDetector};

    fn rect(x0: f32, y0: f32, x1: f32, y1: f32) -> Vec<[f32; 2]> {
        vec![[x0, y0], [x1, y0], [x1, y1], [x0, y1]]
    }

    fn face() -> FaceLandmarks {
        FaceLandmarks {
            lips_outer: rect(0.35, 0.7, 0.65, 0.8),
            lips_inner: rect(0.42, 0.73, 0.58, 0.77),
            brow_left: rect(0.25, 0.25, 0.4, 0.28),
            brow_right: rect(0.6, 0.25, 0.75, 0.28),
            eye_left: rect(0.28, 0.35, 0.4, 0.4),
            eye_right: rect(0.6, 0.35, 0.72, 0.4),
            face_oval: rect(0.2, 0.1, 0.8, 0.9),
        }
    }

    fn sharp() -> MaskParams {
        MaskParams { feather_px: 0, face_clip_margin_px: 0 }
    }

    #[test]
    fn fallback_is_fully_permissive() {
        let m = PartMaskSet::fallback(10, 10);
        assert!(m.face_clip.alpha.iter().all(|&a| a == 255));
        assert!(m.skin.alpha.iter().all(|&a| a == 255));
        assert!(m.part(Part::Lips).is_none());
        assert!(m.part(Part::Skin).is_some());
    }

    #[test]
    fn lips_are_a_ring() {
        let m = PartMaskSet::from_landmarks(&face(), 100, 100, &sharp()).unwrap();
        let lips = m.lips.as_ref().unwrap();
        assert_eq!(lips.get(37, 75), 255); // between contours
        assert_eq!(lips.get(50, 75), 0); // mouth interior
        assert_eq!(lips.get(50, 50), 0);
    }

    #[test]
    fn skin_excludes_eyes_and_lips() {
        let m = PartMaskSet::from_landmarks(&face(), 100, 100, &sharp()).unwrap();
        assert_eq!(m.skin.get(50, 50), 255);
        assert_eq!(m.skin.get(33, 37), 0); // eye
        assert_eq!(m.skin.get(37, 75), 0); // lips ring
        assert_eq!(m.skin.get(5, 5), 0); // outside the face
        // No margin: the clip is the oval itself, eyes and lips included.
        assert_eq!(m.face_clip.get(33, 37), 255);
        assert_eq!(m.face_clip.get(20, 50), 255);
        assert_eq!(m.face_clip.get(19, 50), 0);
    }

    #[test]
    fn face_clip_reaches_past_the_oval() {
        let params = MaskParams { feather_px: 0, face_clip_margin_px: 4 };
        let m = PartMaskSet::from_landmarks(&face(), 100, 100, &params).unwrap();
        let bare = PartMaskSet::from_landmarks(&face(), 100, 100, &sharp()).unwrap();
        assert_eq!(bare.face_clip.get(17, 50), 0);
        assert_eq!(m.face_clip.get(17, 50), 255);
        assert_eq!(m.face_clip.get(10, 50), 0);
    }

    #[test]
    fn feathering_softens_edges() {
        let m = PartMaskSet::from_landmarks(&face(), 100, 100, &MaskParams::default()).unwrap();
        assert!(m.skin.alpha.iter().any(|&a| a > 0 && a < 255));
    }

    #[test]
    fn missing_oval_is_no_face() {
        let mut lm = face();
        lm.face_oval.truncate(2);
        assert_eq!(PartMaskSet::from_landmarks(&lm, 50, 50, &sharp()), Err(DetectorError::NoFace));
    }

    #[test]
    fn overlapping_brows_keep_their_overlap() {
        let mut lm = face();
        // Right brow overlaps the left one and winds the other way.
        lm.brow_right = vec![[0.3, 0.25], [0.3, 0.28], [0.5, 0.28], [0.5, 0.25]];
        let m = PartMaskSet::from_landmarks(&lm, 100, 100, &sharp()).unwrap();
        let brows = m.brows.as_ref().unwrap();
        assert_eq!(brows.get(35, 26), 255); // in both
        assert_eq!(brows.get(27, 26), 255); // left only
        assert_eq!(brows.get(45, 26), 255); // right only
        assert_eq!(brows.get(55, 26), 0);
    }

    #[test]
    fn undetected_parts_are_unrestricted() {
        let mut lm = face();
        lm.brow_left.clear();
        lm.brow_right.clear();
        let m = PartMaskSet::from_landmarks(&lm, 100, 100, &sharp()).unwrap();
        assert!(m.brows.is_none());
    }

    #[test]
    fn class_map_upscales_nearest() {
        // 2x2 map: skin, lips / background, eyes
        let map = ClassMap::new(2, 2, vec![1, 12, 0, 4]).unwrap();
        let m = PartMaskSet::from_class_map(&map, &ClassIds::default(), 4, 4, &sharp()).unwrap();
        assert_eq!(m.skin.get(0, 0), 255);
        assert_eq!(m.skin.get(1, 1), 255);
        assert_eq!(m.skin.get(2, 0), 0);
        assert_eq!(m.lips.as_ref().unwrap().get(3, 1), 255);
        assert_eq!(m.eyes.as_ref().unwrap().get(3, 3), 255);
        assert_eq!(m.face_clip.get(0, 3), 0);
        assert!(m.brows.is_none());
    }

    #[test]
    fn class_map_without_face_ids_is_no_face() {
        let map = ClassMap::new(2, 1, vec![0, 17]).unwrap();
        let err = PartMaskSet::from_class_map(&map, &ClassIds::default(), 4, 4, &sharp()).unwrap_err();
        assert_eq!(err, DetectorError::NoFace);
    }

    struct Fixed(Detection);

    impl DetectorFactory for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn create(&self, _: ExecutionProvider) -> Result<Box<dyn FaceDetector>, DetectorError> {
            Ok(Box::new(StaticDetector::new(self.0.clone())))
        }
    }

    #[test]
    fn unavailable_detector_yields_fallback() {
        let mut handle = DetectorHandle::new(Box::new(NoDetectorFactory), ExecutionProvider::DEFAULT_ORDER.to_vec());
        let out = build_part_masks(&RasterBuffer::new(8, 6), &mut handle, &MaskParams::default());
        assert_eq!(out.masks, PartMaskSet::fallback(8, 6));
        assert!(matches!(out.status, MaskStatus::Fallback(ref e) if e.is_unavailable()));
    }

    #[test]
    fn detected_face_yields_masks() {
        let factory = Fixed(Detection::Landmarks(face()));
        let mut handle = DetectorHandle::new(Box::new(factory), vec![ExecutionProvider::Cpu]);
        let out = build_part_masks(&RasterBuffer::new(100, 100), &mut handle, &MaskParams::default());
        assert_eq!(out.status, MaskStatus::Detected);
        assert!(out.masks.lips.is_some());
    }
}
