// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for scene boundaries.
//!
//! The kinematic operations themselves never fail; these errors come from
//! validating host input and from scene edits that a gate refuses.

use crate::types::PartId;

/// Result type alias for scene operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while validating or editing a scene.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A referenced part id does not exist in the scene.
    #[error("part not found: {0}")]
    UnknownPart(PartId),

    /// Two parts share the same id.
    #[error("duplicate part id: {0}")]
    DuplicatePartId(PartId),

    /// A part sits outside the supported depth layers.
    #[error("part {id} has invalid layer {layer} (expected 1..=3)")]
    InvalidLayer { id: PartId, layer: u8 },

    /// Rotation direction other than +1 / -1.
    #[error("invalid direction {0} (expected 1 or -1)")]
    InvalidDirection(i8),

    /// Fixed parts cannot be moved or deleted.
    #[error("part {0} is fixed")]
    FixedPart(PartId),

    /// A move would put a part onto an obstacle.
    #[error("part {0} would collide with an obstacle")]
    Blocked(PartId),

    /// A belt would pass through an obstacle.
    #[error("belt between {source_id} and {target_id} is obstructed")]
    BeltObstructed { source_id: PartId, target_id: PartId },

    /// A belt must join two different parts.
    #[error("belt endpoints must differ (part {0})")]
    SelfBelt(PartId),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
