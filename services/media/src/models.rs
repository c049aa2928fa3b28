use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Width and height of the first stream reported by the probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn aspect_ratio(&self) -> AspectRatio {
        AspectRatio::reduce(self.width, self.height)
    }
}

/// A `width:height` pair reduced by its greatest common divisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AspectRatio {
    pub width: u32,
    pub height: u32,
}

impl AspectRatio {
    /// Reduce a pair. A zero height leaves the pair untouched.
    pub fn reduce(width: u32, height: u32) -> Self {
        if height == 0 {
            return Self { width, height };
        }

        let divisor = gcd(width, height);
        Self {
            width: width / divisor,
            height: height / divisor,
        }
    }

    pub fn class(&self) -> AspectClass {
        match (self.width, self.height) {
            (16, 9) => AspectClass::Landscape,
            (9, 16) => AspectClass::Portrait,
            _ => AspectClass::Other,
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Orientation bucket used as the storage key prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AspectClass {
    Landscape,
    Portrait,
    Other,
}

impl AspectClass {
    pub fn from_dimensions(dimensions: Dimensions) -> Self {
        dimensions.aspect_ratio().class()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AspectClass::Landscape => "landscape",
            AspectClass::Portrait => "portrait",
            AspectClass::Other => "other",
        }
    }
}

impl fmt::Display for AspectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Location of an uploaded object in the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObject {
    pub bucket: String,
    pub key: String,
}

impl fmt::Display for StoredObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// Video metadata row as persisted by the metadata store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub video: Option<StoredObject>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VideoRecord {
    pub fn new(user_id: Uuid, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            title: title.into(),
            description: None,
            thumbnail_url: None,
            video: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }
}

/// Playback view of a [`VideoRecord`]. `video_url` is a freshly signed URL
/// and is never written back to the store.
#[derive(Debug, Clone, Serialize)]
pub struct SignedVideo {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub video_url: Option<String>,
    pub video_url_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_common_resolutions() {
        let cases = [
            ((1920, 1080), "16:9", AspectClass::Landscape),
            ((1280, 720), "16:9", AspectClass::Landscape),
            ((1080, 1920), "9:16", AspectClass::Portrait),
            ((720, 1280), "9:16", AspectClass::Portrait),
            ((1000, 1000), "1:1", AspectClass::Other),
            ((640, 480), "4:3", AspectClass::Other),
        ];

        for ((width, height), ratio, class) in cases {
            let dimensions = Dimensions::new(width, height);
            assert_eq!(dimensions.aspect_ratio().to_string(), ratio);
            assert_eq!(AspectClass::from_dimensions(dimensions), class);
        }
    }

    #[test]
    fn reduction_is_idempotent() {
        for (width, height) in [(1920, 1080), (1080, 1920), (1000, 1000), (1366, 768), (7, 3)] {
            let once = AspectRatio::reduce(width, height);
            let twice = AspectRatio::reduce(once.width, once.height);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn zero_dimensions_do_not_divide_by_zero() {
        assert_eq!(AspectRatio::reduce(1920, 0).to_string(), "1920:0");
        assert_eq!(AspectRatio::reduce(0, 0).to_string(), "0:0");
        assert_eq!(AspectRatio::reduce(0, 1080).to_string(), "0:1");
        assert_eq!(
            AspectClass::from_dimensions(Dimensions::new(0, 0)),
            AspectClass::Other
        );
    }

    #[test]
    fn aspect_class_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&AspectClass::Portrait).unwrap(),
            "\"portrait\""
        );
        assert_eq!(AspectClass::Landscape.to_string(), "landscape");
    }
}
