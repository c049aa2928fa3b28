//! Fast-start rewrite of MP4 containers through `ffmpeg`.
//!
//! The rewrite copies streams without re-encoding and moves the `moov` atom
//! in front of the media data so playback can begin before the download
//! completes.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempPath;
use thiserror::Error;
use tracing::{info, warn};

use crate::tool::{DEFAULT_TOOL_TIMEOUT, ToolCommand, ToolError};

/// Suffix appended to the input path to name the rewritten file.
pub const PROCESSED_SUFFIX: &str = ".processing";

#[derive(Error, Debug)]
pub enum TranscodeError {
    #[error("failed to execute command ffmpeg: {0}")]
    Tool(#[from] ToolError),

    #[error("couldn't get the stat of processed file {path}: {source}")]
    MissingOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("processed file {0} is empty")]
    EmptyOutput(PathBuf),
}

/// Produces a streaming-ready copy of a local video.
///
/// The returned [`TempPath`] owns the new file: dropping it deletes the file.
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn rewrite(&self, input: &Path) -> Result<TempPath, TranscodeError>;
}

/// Output path used for a given input: the input path plus [`PROCESSED_SUFFIX`].
pub fn processed_path(input: &Path) -> PathBuf {
    let mut name = OsString::from(input.as_os_str());
    name.push(PROCESSED_SUFFIX);
    PathBuf::from(name)
}

/// [`Transcoder`] backed by the `ffmpeg` binary.
#[derive(Debug, Clone)]
pub struct FfmpegFastStart {
    program: PathBuf,
    timeout: Duration,
}

impl FfmpegFastStart {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

impl Default for FfmpegFastStart {
    fn default() -> Self {
        Self::new("ffmpeg", DEFAULT_TOOL_TIMEOUT)
    }
}

#[async_trait]
impl Transcoder for FfmpegFastStart {
    async fn rewrite(&self, input: &Path) -> Result<TempPath, TranscodeError> {
        let output_path = processed_path(input);
        info!(
            "Rewriting {} for fast start into {}",
            input.display(),
            output_path.display()
        );

        // Owned from here on so a partial file from a failed run is removed too.
        let output = TempPath::from_path(output_path);

        ToolCommand::new(&self.program)
            .arg("-i")
            .path_arg(input)
            .arg("-codec")
            .arg("copy")
            .arg("-movflags")
            .arg("faststart")
            .arg("-f")
            .arg("mp4")
            .path_arg(&output)
            .timeout(self.timeout)
            .execute()
            .await?;

        let metadata =
            tokio::fs::metadata(&output)
                .await
                .map_err(|source| TranscodeError::MissingOutput {
                    path: output.to_path_buf(),
                    source,
                })?;

        if metadata.len() == 0 {
            warn!("ffmpeg reported success but wrote nothing to {}", output.display());
            return Err(TranscodeError::EmptyOutput(output.to_path_buf()));
        }

        Ok(output)
    }
}
