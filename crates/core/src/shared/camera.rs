use std::fmt;

use serde::{Deserialize, Serialize};

/// Address of a capture source: a local device index or a stream address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Locator {
    Device(u32),
    Stream(String),
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Device(index) => write!(f, "device {index}"),
            Locator::Stream(address) => write!(f, "{address}"),
        }
    }
}

/// Static description of one camera, loaded once at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CameraDescriptor {
    pub id: String,
    pub locator: Locator,
    pub name: String,
    pub location: String,
}
