use serde::Serialize;

use crate::detection::domain::bucket::Bucket;
use crate::shared::bounding_box::PercentBox;

/// A detection as reported to clients. Only lives as long as the message
/// it is serialized into.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionRecord {
    /// `{bucket}-{position in this frame's list}`; unique within one frame only.
    pub id: String,
    pub class: Bucket,
    pub label: String,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub person_name: Option<String>,
    pub bounding_box: PercentBox,
}

impl DetectionRecord {
    /// Id for the next record appended to a list currently holding `position`
    /// entries.
    pub fn make_id(bucket: Bucket, position: usize) -> String {
        format!("{}-{position}", bucket.as_str())
    }
}

/// First character upper-cased, the rest lower-cased ("person" -> "Person",
/// "TV" -> "Tv").
pub fn display_label(raw: &str) -> String {
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
