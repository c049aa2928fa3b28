//! Service configuration loaded from the environment

use std::path::PathBuf;
use std::time::Duration;

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

/// Runtime settings of the API service.
///
/// Every field maps to an upper-case environment variable of the same name
/// (`S3_BUCKET`, `MAX_UPLOAD_BYTES`, ...). Only `JWT_SECRET` is required.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub port: u16,
    pub s3_bucket: String,
    pub s3_region: String,
    /// Custom S3 endpoint (MinIO, localstack)
    pub s3_endpoint: Option<String>,
    pub assets_root: PathBuf,
    pub public_base_url: String,
    pub staging_dir: Option<PathBuf>,
    pub max_upload_bytes: u64,
    pub max_thumbnail_bytes: u64,
    pub url_ttl_secs: u64,
    pub tool_timeout_secs: u64,
    pub ffprobe_path: PathBuf,
    pub ffmpeg_path: PathBuf,
    pub jwt_secret: String,
}

impl Settings {
    /// Load settings from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(Environment::default().try_parsing(true))
    }

    fn from_source(environment: Environment) -> Result<Self, ConfigError> {
        let settings: Settings = Config::builder()
            .set_default("port", 8091)?
            .set_default("s3_bucket", "tubely-videos")?
            .set_default("s3_region", "us-east-1")?
            .set_default("assets_root", "./assets")?
            .set_default("public_base_url", "http://localhost:8091")?
            .set_default("max_upload_bytes", media::pipeline::DEFAULT_MAX_UPLOAD_BYTES)?
            .set_default(
                "max_thumbnail_bytes",
                media::thumbnail::DEFAULT_MAX_THUMBNAIL_BYTES,
            )?
            .set_default("url_ttl_secs", media::playback::DEFAULT_URL_TTL.as_secs())?
            .set_default(
                "tool_timeout_secs",
                media::tool::DEFAULT_TOOL_TIMEOUT.as_secs(),
            )?
            .set_default("ffprobe_path", "ffprobe")?
            .set_default("ffmpeg_path", "ffmpeg")?
            .add_source(environment)
            .build()?
            .try_deserialize()?;

        if settings.jwt_secret.trim().is_empty() {
            return Err(ConfigError::Message("JWT_SECRET must not be empty".to_string()));
        }
        if settings.url_ttl_secs == 0 {
            return Err(ConfigError::Message(
                "URL_TTL_SECS must be greater than zero".to_string(),
            ));
        }

        Ok(settings)
    }

    pub fn url_ttl(&self) -> Duration {
        Duration::from_secs(self.url_ttl_secs)
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn environment(vars: &[(&str, &str)]) -> Environment {
        let map = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Environment::default().try_parsing(true).source(Some(map))
    }

    #[test]
    fn defaults_apply() {
        let settings = Settings::from_source(environment(&[("JWT_SECRET", "s3cr3t")])).unwrap();

        assert_eq!(settings.port, 8091);
        assert_eq!(settings.s3_bucket, "tubely-videos");
        assert_eq!(settings.s3_endpoint, None);
        assert_eq!(settings.max_upload_bytes, 1 << 30);
        assert_eq!(settings.max_thumbnail_bytes, 10 << 20);
        assert_eq!(settings.url_ttl(), Duration::from_secs(3600));
        assert_eq!(settings.tool_timeout(), Duration::from_secs(300));
        assert_eq!(settings.ffmpeg_path, PathBuf::from("ffmpeg"));
        assert_eq!(settings.staging_dir, None);
    }

    #[test]
    fn environment_overrides_defaults() {
        let settings = Settings::from_source(environment(&[
            ("JWT_SECRET", "s3cr3t"),
            ("PORT", "9000"),
            ("S3_BUCKET", "other-bucket"),
            ("S3_ENDPOINT", "http://localhost:9000"),
            ("MAX_UPLOAD_BYTES", "2048"),
            ("STAGING_DIR", "/var/tmp/tubely"),
        ]))
        .unwrap();

        assert_eq!(settings.port, 9000);
        assert_eq!(settings.s3_bucket, "other-bucket");
        assert_eq!(settings.s3_endpoint.as_deref(), Some("http://localhost:9000"));
        assert_eq!(settings.max_upload_bytes, 2048);
        assert_eq!(settings.staging_dir, Some(PathBuf::from("/var/tmp/tubely")));
    }

    #[test]
    fn jwt_secret_is_required() {
        assert!(Settings::from_source(environment(&[])).is_err());
        assert!(Settings::from_source(environment(&[("JWT_SECRET", " ")])).is_err());
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let result = Settings::from_source(environment(&[
            ("JWT_SECRET", "s3cr3t"),
            ("URL_TTL_SECS", "0"),
        ]));
        assert!(result.is_err());
    }
}
