use serde::{Deserialize, Serialize};

use crate::shared::color::Rgb;

/// Semantic category a detection is reported under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Person,
    Vehicle,
    Threat,
    Face,
}

impl Bucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Person => "person",
            Bucket::Vehicle => "vehicle",
            Bucket::Threat => "threat",
            Bucket::Face => "face",
        }
    }
}

/// Raw detector labels that map into each object bucket.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelSets {
    pub person: Vec<String>,
    pub vehicle: Vec<String>,
    pub threat: Vec<String>,
}

impl Default for LabelSets {
    fn default() -> Self {
        Self {
            person: to_strings(&["person"]),
            vehicle: to_strings(&["car", "truck", "bus", "motorcycle", "bicycle"]),
            threat: to_strings(&["knife", "scissors"]),
        }
    }
}

impl LabelSets {
    /// Bucket for a raw label. Threat beats vehicle beats person when a label
    /// is listed in several sets; unlisted labels map to `None`.
    pub fn classify(&self, label: &str) -> Option<Bucket> {
        let listed = |set: &[String]| set.iter().any(|l| l == label);
        if listed(&self.threat) {
            Some(Bucket::Threat)
        } else if listed(&self.vehicle) {
            Some(Bucket::Vehicle)
        } else if listed(&self.person) {
            Some(Bucket::Person)
        } else {
            None
        }
    }
}

/// Overlay color per bucket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketPalette {
    pub person: Rgb,
    pub vehicle: Rgb,
    pub threat: Rgb,
    pub face: Rgb,
}

impl Default for BucketPalette {
    fn default() -> Self {
        Self {
            person: Rgb(0, 255, 0),
            vehicle: Rgb(0, 165, 255),
            threat: Rgb(255, 0, 0),
            face: Rgb(255, 0, 255),
        }
    }
}

impl BucketPalette {
    pub fn color_for(&self, bucket: Bucket) -> Rgb {
        match bucket {
            Bucket::Person => self.person,
            Bucket::Vehicle => self.vehicle,
            Bucket::Threat => self.threat,
            Bucket::Face => self.face,
        }
    }
}

fn to_strings(labels: &[&str]) -> Vec<String> {
    labels.iter().map(|l| l.to_string()).collect()
}
