//! Media types of events and posts.

use serde::{Deserialize, Serialize};

/// `image` media type string, as stored in the database.
pub const MEDIA_IMAGE: &str = "image";

/// `video` media type string, as stored in the database.
pub const MEDIA_VIDEO: &str = "video";

/// Media type of an event or post asset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    #[default]
    Image,
    Video,
}

impl MediaType {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaType::Image => MEDIA_IMAGE,
            MediaType::Video => MEDIA_VIDEO,
        }
    }
}
