use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Axis-aligned bounding box in frame pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl BoundingBox {
    /// Create a box, rejecting non-finite or inverted edges.
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Result<Self, TypeError> {
        let bbox = Self {
            left,
            top,
            right,
            bottom,
        };
        if bbox.is_valid() {
            Ok(bbox)
        } else {
            Err(TypeError::InvalidBoundingBox {
                left,
                top,
                right,
                bottom,
            })
        }
    }

    /// Returns `true` if every edge is finite and the box is not inverted.
    pub fn is_valid(&self) -> bool {
        [self.left, self.top, self.right, self.bottom]
            .iter()
            .all(|v| v.is_finite())
            && self.right >= self.left
            && self.bottom >= self.top
    }

    pub fn center_x(&self) -> f32 {
        (self.left + self.right) / 2.0
    }

    pub fn center_y(&self) -> f32 {
        (self.top + self.bottom) / 2.0
    }

    /// Center of the box relative to a `frame_width` x `frame_height` frame.
    ///
    /// Returns `None` for an empty frame or an invalid box. Centers falling
    /// outside the frame are clamped onto its edge.
    pub fn normalized_center(
        &self,
        frame_width: u32,
        frame_height: u32,
    ) -> Option<NormalizedPoint> {
        if frame_width == 0 || frame_height == 0 || !self.is_valid() {
            return None;
        }
        Some(NormalizedPoint::clamped(
            self.center_x() / frame_width as f32,
            self.center_y() / frame_height as f32,
        ))
    }
}

/// A point in frame-relative coordinates, both axes in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPoint {
    pub x: f32,
    pub y: f32,
}

impl NormalizedPoint {
    /// Build a point, clamping each axis into `[0, 1]`.
    pub fn clamped(x: f32, y: f32) -> Self {
        Self {
            x: x.clamp(0.0, 1.0),
            y: y.clamp(0.0, 1.0),
        }
    }

    /// The frame center.
    pub const fn center() -> Self {
        Self { x: 0.5, y: 0.5 }
    }
}

/// One classification attached to a detection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub label: String,
    pub score: f32,
}

impl CategoryScore {
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// A single object detection emitted by the vision model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bounding_box: BoundingBox,
    #[serde(default)]
    pub categories: Vec<CategoryScore>,
}

impl Detection {
    pub fn new(bounding_box: BoundingBox, categories: Vec<CategoryScore>) -> Self {
        Self {
            bounding_box,
            categories,
        }
    }

    /// Convenience constructor for a detection with a single category.
    pub fn single(bounding_box: BoundingBox, label: impl Into<String>, score: f32) -> Self {
        Self::new(bounding_box, vec![CategoryScore::new(label, score)])
    }

    /// The highest-scoring category. Ties keep the earliest entry; NaN
    /// scores never win over a real score.
    pub fn top_category(&self) -> Option<&CategoryScore> {
        self.categories.iter().fold(None, |best, candidate| match best {
            None => Some(candidate),
            Some(current) if candidate.score > current.score || current.score.is_nan() => {
                Some(candidate)
            }
            Some(current) => Some(current),
        })
    }
}
