//! Input and output records of the cleaning pipeline

use serde::{Deserialize, Serialize};

use crate::error::{CleanError, Result};

/// Level tag marking a segment as the box-of-record for its field
pub const CROP_LEVEL: &str = "crop";

/// Display region in image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub top: i64,
    pub left: i64,
    pub bottom: i64,
    pub right: i64,
}

/// One raw OCR detection for a display region in one frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bottom: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

impl Segment {
    /// Create a segment with a name and raw value only
    pub fn new(name: impl Into<String>, value: Option<&str>) -> Self {
        Self {
            name: Some(name.into()),
            value: value.map(str::to_string),
            ..Default::default()
        }
    }

    /// Mark this segment as the crop box for its field
    pub fn with_crop(mut self, bbox: BoundingBox) -> Self {
        self.top = Some(bbox.top);
        self.left = Some(bbox.left);
        self.bottom = Some(bbox.bottom);
        self.right = Some(bbox.right);
        self.level = Some(CROP_LEVEL.to_string());
        self
    }

    /// Field name, if present and non-empty
    pub fn field_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|n| !n.is_empty())
    }

    pub fn is_crop(&self) -> bool {
        self.level.as_deref() == Some(CROP_LEVEL)
    }

    /// Bounding box of a crop segment.
    ///
    /// `Ok(None)` for segments that are not crops. A crop segment must carry
    /// all four coordinates.
    pub fn crop_box(&self) -> Result<Option<BoundingBox>> {
        if !self.is_crop() {
            return Ok(None);
        }
        let field = self.name.clone().unwrap_or_default();
        let require = |value: Option<i64>, coordinate: &'static str| {
            value.ok_or_else(|| CleanError::MissingCropBox {
                field: field.clone(),
                coordinate,
            })
        };
        Ok(Some(BoundingBox {
            top: require(self.top, "top")?,
            left: require(self.left, "left")?,
            bottom: require(self.bottom, "bottom")?,
            right: require(self.right, "right")?,
        }))
    }
}

/// Final value of one field in one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanedSegment {
    pub name: String,
    pub value: Option<String>,
    #[serde(flatten)]
    pub bbox: Option<BoundingBox>,
}

/// Batch envelope for one frame
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OcrRequest {
    #[serde(default, rename = "monitorId")]
    pub monitor_id: Option<String>,
    /// Carried for the caller's logging only
    #[serde(default, rename = "imageId")]
    pub image_id: Option<serde_json::Value>,
    #[serde(default)]
    pub segments: Vec<Segment>,
}
