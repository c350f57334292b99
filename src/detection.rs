//! Typed view of the vision model's answer
//!
//! The model is asked for JSON shaped like
//! `{ "patterns": [ { "type", "description", "bbox": [x, y, w, h] } ] }`
//! but answers are often wrapped in a fenced block or prose, and boxes come
//! back as arrays or objects. Parsing is lenient about all of that.

use crate::error::{CaptureError, CaptureResult};
use crate::mapping::{is_valid_bbox, BoundingBox};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Known deceptive UI pattern categories
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PatternKind {
    ConfirmShaming,
    FakeUrgency,
    FakeScarcity,
    HiddenCosts,
    ForcedContinuity,
    Preselection,
    TrickQuestion,
    DisguisedAds,
    Nagging,
    Misdirection,
    Sneaking,
    RoachMotel,
    Other(String),
}

impl PatternKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::ConfirmShaming => "confirmshaming",
            Self::FakeUrgency => "fake_urgency",
            Self::FakeScarcity => "fake_scarcity",
            Self::HiddenCosts => "hidden_costs",
            Self::ForcedContinuity => "forced_continuity",
            Self::Preselection => "preselection",
            Self::TrickQuestion => "trick_question",
            Self::DisguisedAds => "disguised_ads",
            Self::Nagging => "nagging",
            Self::Misdirection => "misdirection",
            Self::Sneaking => "sneaking",
            Self::RoachMotel => "roach_motel",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for PatternKind {
    fn from(value: String) -> Self {
        let key: String = value
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();

        match key.as_str() {
            "confirmshaming" => Self::ConfirmShaming,
            "fakeurgency" | "urgency" | "countdowntimer" => Self::FakeUrgency,
            "fakescarcity" | "scarcity" | "lowstock" => Self::FakeScarcity,
            "hiddencosts" | "hiddencost" | "drippricing" => Self::HiddenCosts,
            "forcedcontinuity" => Self::ForcedContinuity,
            "preselection" | "preselected" => Self::Preselection,
            "trickquestion" | "trickquestions" => Self::TrickQuestion,
            "disguisedads" | "disguisedad" => Self::DisguisedAds,
            "nagging" => Self::Nagging,
            "misdirection" => Self::Misdirection,
            "sneaking" | "sneakintobasket" => Self::Sneaking,
            "roachmotel" | "hardtocancel" => Self::RoachMotel,
            _ => Self::Other(value.trim().to_string()),
        }
    }
}

impl From<PatternKind> for String {
    fn from(kind: PatternKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single pattern reported by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(rename = "type", alias = "pattern", alias = "category")]
    pub kind: PatternKind,

    #[serde(default)]
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,

    /// `None` when the model gave no usable box
    #[serde(
        default,
        alias = "box",
        alias = "bounding_box",
        deserialize_with = "lenient_bbox",
        skip_serializing_if = "Option::is_none"
    )]
    pub bbox: Option<BoundingBox>,

    /// Per-detection override of the caller's normalized flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalized: Option<bool>,
}

impl Detection {
    pub fn is_normalized(&self, default: bool) -> bool {
        self.normalized.unwrap_or(default)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionReport {
    #[serde(default, alias = "detections", alias = "darkPatterns")]
    pub patterns: Vec<Detection>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl DetectionReport {
    /// Parse a raw model answer.
    ///
    /// Accepts a bare JSON object or array, optionally inside a fenced code
    /// block or surrounded by prose. Every `{` or `[` is tried in order and
    /// the first one that reads as a report (or a list of detections) wins,
    /// so brackets in the prose are skipped.
    pub fn parse(answer: &str) -> CaptureResult<Self> {
        let mut last_error = None;

        for (start, _) in answer.match_indices(['{', '[']) {
            match Self::parse_at(&answer[start..]) {
                Ok(report) => {
                    log::debug!(
                        "Parsed {} detections from offset {}",
                        report.patterns.len(),
                        start
                    );
                    return Ok(report);
                }
                Err(e) => {
                    log::trace!("No report at offset {}: {}", start, e);
                    last_error = Some(e);
                }
            }
        }

        Err(CaptureError::Detection(match last_error {
            Some(e) => format!("no usable JSON in model answer: {}", e),
            None => "no JSON found in model answer".to_string(),
        }))
    }

    fn parse_at(candidate: &str) -> Result<Self, serde_json::Error> {
        let value = serde_json::Deserializer::from_str(candidate)
            .into_iter::<serde_json::Value>()
            .next()
            .unwrap_or(Ok(serde_json::Value::Null))?;

        match value {
            serde_json::Value::Array(_) => Ok(DetectionReport {
                patterns: serde_json::from_value(value)?,
                summary: None,
            }),
            other => serde_json::from_value(other),
        }
    }

    /// Detections that carry a usable box
    pub fn locatable(&self) -> impl Iterator<Item = &Detection> {
        self.patterns.iter().filter(|d| d.bbox.is_some())
    }
}

fn lenient_bbox<'de, D>(deserializer: D) -> Result<Option<BoundingBox>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawBox {
        Array([f64; 4]),
        Object(BoundingBox),
    }

    let value = serde_json::Value::deserialize(deserializer)?;
    let bbox = match serde_json::from_value::<RawBox>(value) {
        Ok(RawBox::Array(values)) => BoundingBox::from_array(values),
        Ok(RawBox::Object(bbox)) => bbox,
        Err(_) => return Ok(None),
    };

    // Negative origins are left for the highlighter to clamp
    let sized = BoundingBox {
        x: bbox.x.max(0.0),
        y: bbox.y.max(0.0),
        ..bbox
    };
    if bbox.x.is_finite() && bbox.y.is_finite() && is_valid_bbox(&sized) {
        Ok(Some(bbox))
    } else {
        log::warn!("Ignoring unusable bounding box {:?}", bbox.to_array());
        Ok(None)
    }
}
