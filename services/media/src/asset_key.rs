//! Storage key generation.
//!
//! Keys look like `landscape/<43 url-safe chars>.mp4`: an optional category
//! prefix, 32 bytes of OS randomness and an extension taken from the media
//! subtype.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;
use std::fmt;

/// Extension used when a media type has no usable subtype.
pub const FALLBACK_EXTENSION: &str = "bin";

const KEY_ENTROPY_BYTES: usize = 32;

/// Strip parameters (`; codecs=...`) and normalize case.
///
/// `"Video/MP4; codecs=avc1"` becomes `"video/mp4"`.
pub fn essence(media_type: &str) -> String {
    media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// File extension for a media type: the subtype, or `bin` if the type does
/// not have exactly one `/`.
pub fn extension_for(media_type: &str) -> &str {
    let mut parts = media_type.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(subtype), None) if !subtype.is_empty() => subtype,
        _ => FALLBACK_EXTENSION,
    }
}

/// Object key inside a bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey(String);

impl StorageKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StorageKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Generates unguessable object keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssetKeyAllocator;

impl AssetKeyAllocator {
    pub fn new() -> Self {
        Self
    }

    /// Key under `category/`, e.g. `portrait/<id>.mp4`.
    pub fn allocate(&self, category: &str, media_type: &str) -> StorageKey {
        let name = self.allocate_flat(media_type);
        StorageKey(format!("{}/{}", category.trim_matches('/'), name.0))
    }

    /// Key without a category prefix, e.g. `<id>.png`.
    ///
    /// # Panics
    ///
    /// If the OS entropy source fails.
    pub fn allocate_flat(&self, media_type: &str) -> StorageKey {
        let mut bytes = [0u8; KEY_ENTROPY_BYTES];
        OsRng.fill_bytes(&mut bytes);
        let id = URL_SAFE_NO_PAD.encode(bytes);

        StorageKey(format!("{}.{}", id, extension_for(media_type)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn extension_comes_from_subtype() {
        assert_eq!(extension_for("video/mp4"), "mp4");
        assert_eq!(extension_for("image/png"), "png");
        assert_eq!(extension_for("image/jpeg"), "jpeg");
    }

    #[test]
    fn malformed_types_fall_back_to_bin() {
        assert_eq!(extension_for("image"), "bin");
        assert_eq!(extension_for("a/b/c"), "bin");
        assert_eq!(extension_for("video/"), "bin");
        assert_eq!(extension_for(""), "bin");
    }

    #[test]
    fn essence_strips_parameters() {
        assert_eq!(essence("video/mp4"), "video/mp4");
        assert_eq!(essence("Video/MP4; codecs=\"avc1\""), "video/mp4");
        assert_eq!(essence("  image/png  "), "image/png");
    }

    #[test]
    fn key_has_prefix_id_and_extension() {
        let key = AssetKeyAllocator::new().allocate("landscape", "video/mp4");
        let (prefix, name) = key.as_str().split_once('/').unwrap();
        let (id, ext) = name.rsplit_once('.').unwrap();

        assert_eq!(prefix, "landscape");
        assert_eq!(ext, "mp4");
        // 32 bytes of unpadded base64
        assert_eq!(id.len(), 43);
        assert!(
            id.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn flat_key_has_no_prefix() {
        let key = AssetKeyAllocator::new().allocate_flat("image/png");
        assert!(!key.as_str().contains('/'));
        assert!(key.as_str().ends_with(".png"));
    }

    #[test]
    fn keys_do_not_collide() {
        let allocator = AssetKeyAllocator::new();
        let keys: HashSet<StorageKey> = (0..10_000)
            .map(|_| allocator.allocate("other", "video/mp4"))
            .collect();

        assert_eq!(keys.len(), 10_000);
    }
}
