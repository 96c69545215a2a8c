use serde::Serialize;
use thiserror::Error;

use crate::detection::domain::detection_record::DetectionRecord;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("client disconnected")]
    Disconnected,
    #[error("send failed: {0}")]
    Send(String),
    #[error("failed to serialize message: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Server-to-client message, serialized as JSON tagged by `type`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamMessage {
    Frame {
        #[serde(rename = "cameraId")]
        camera_id: String,
        /// `data:image/jpeg;base64,...`
        data: String,
    },
    Detection {
        #[serde(rename = "cameraId")]
        camera_id: String,
        data: Vec<DetectionRecord>,
    },
    Error {
        data: String,
    },
}

impl StreamMessage {
    pub fn error(text: impl Into<String>) -> Self {
        StreamMessage::Error { data: text.into() }
    }

    pub fn to_json(&self) -> Result<String, TransportError> {
        Ok(serde_json::to_string(self)?)
    }
}
