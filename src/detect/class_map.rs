// Per-pixel class ids from a face-parsing model.
use crate::error::DetectorError;

/// Class id per pixel at the detector's native resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassMap {
    pub width: usize,
    pub height: usize,
    pub ids: Vec<u8>, // length = width * height
}

impl ClassMap {
    pub fn new(width: usize, height: usize, ids: Vec<u8>) -> Result<Self, DetectorError> {
        if width == 0 || height == 0 || ids.len() != width * height {
            return Err(DetectorError::MalformedOutput(format!(
                "class map {width}x{height} with {} ids",
                ids.len()
            )));
        }
        Ok(Self { width, height, ids })
    }
}

/// Which class ids make up each part (face-parsing label convention).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassIds {
    pub skin: Vec<u8>,
    pub brows: Vec<u8>,
    pub eyes: Vec<u8>,
    pub lips: Vec<u8>,
    /// Everything counted as "face" for the clip boundary.
    pub face: Vec<u8>,
}

impl Default for ClassIds {
    fn default() -> Self {
        Self {
            skin: vec![1],
            brows: vec![2, 3],
            eyes: vec![4, 5],
            lips: vec![12, 13],
            // skin, brows, eyes, glasses, nose, mouth, lips
            face: vec![1, 2, 3, 4, 5, 6, 10, 11, 12, 13],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_must_match_dimensions() {
        assert!(ClassMap::new(2, 2, vec![0; 4]).is_ok());
        assert!(ClassMap::new(2, 2, vec![0; 3]).is_err());
        assert!(ClassMap::new(0, 2, Vec::new()).is_err());
    }
}
