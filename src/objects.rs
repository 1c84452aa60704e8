use crate::utils::bbox::BoundingBox;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Object class reported by the detector
///
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectClass {
    Person,
    Other(String),
}

impl ObjectClass {
    /// Class from the detector label, `"person"` (case-insensitive) maps to [ObjectClass::Person]
    ///
    pub fn from_label(label: &str) -> Self {
        if label.eq_ignore_ascii_case("person") {
            ObjectClass::Person
        } else {
            ObjectClass::Other(label.to_string())
        }
    }

    pub fn is_person(&self) -> bool {
        matches!(self, ObjectClass::Person)
    }
}

impl fmt::Display for ObjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectClass::Person => write!(f, "person"),
            ObjectClass::Other(label) => write!(f, "{}", label),
        }
    }
}

/// Raw detector output
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub confidence: f32,
    pub class: ObjectClass,
}

impl Detection {
    pub fn new(bbox: BoundingBox, confidence: f32, class: ObjectClass) -> Self {
        assert!(
            (0.0..=1.0).contains(&confidence),
            "Confidence must be between 0.0 and 1.0"
        );
        Self {
            bbox,
            confidence,
            class,
        }
    }
}

/// Confirmed track reported by the tracker for the current frame
///
/// `track_id` identifies one physical target only while the tracker keeps the track confirmed.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedObject {
    pub track_id: u64,
    pub bbox: BoundingBox,
    pub class: ObjectClass,
    pub confidence: f32,
}

impl TrackedObject {
    pub fn new(track_id: u64, bbox: BoundingBox, class: ObjectClass, confidence: f32) -> Self {
        assert!(
            (0.0..=1.0).contains(&confidence),
            "Confidence must be between 0.0 and 1.0"
        );
        Self {
            track_id,
            bbox,
            class,
            confidence,
        }
    }

    /// Person track with full confidence
    ///
    pub fn person(track_id: u64, bbox: BoundingBox) -> Self {
        Self::new(track_id, bbox, ObjectClass::Person, 1.0)
    }

    pub fn is_person(&self) -> bool {
        self.class.is_person()
    }
}
