//! Stream geometry extraction through `ffprobe`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::models::{AspectClass, Dimensions};
use crate::tool::{DEFAULT_TOOL_TIMEOUT, ToolCommand, ToolError};

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("ffprobe error: {0}")]
    Tool(#[from] ToolError),

    #[error("couldn't parse the command's output: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("no video streams found")]
    NoStreams,
}

/// Reads stream geometry from a local media file.
#[async_trait]
pub trait MediaProbe: Send + Sync {
    /// Dimensions of the first stream in the file.
    async fn dimensions(&self, path: &Path) -> Result<Dimensions, ProbeError>;

    async fn classify(&self, path: &Path) -> Result<AspectClass, ProbeError> {
        let dimensions = self.dimensions(path).await?;
        let class = AspectClass::from_dimensions(dimensions);
        info!(
            width = dimensions.width,
            height = dimensions.height,
            ratio = %dimensions.aspect_ratio(),
            class = %class,
            "Classified video"
        );
        Ok(class)
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
}

/// Parse `ffprobe -print_format json -show_streams` output.
pub fn parse_dimensions(stdout: &[u8]) -> Result<Dimensions, ProbeError> {
    let output: ProbeOutput = serde_json::from_slice(stdout)?;
    let first = output.streams.first().ok_or(ProbeError::NoStreams)?;
    Ok(Dimensions::new(first.width, first.height))
}

/// [`MediaProbe`] backed by the `ffprobe` binary.
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    program: PathBuf,
    timeout: Duration,
}

impl FfprobeProbe {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self::new("ffprobe", DEFAULT_TOOL_TIMEOUT)
    }
}

#[async_trait]
impl MediaProbe for FfprobeProbe {
    async fn dimensions(&self, path: &Path) -> Result<Dimensions, ProbeError> {
        info!("Probing file: {}", path.display());

        let output = ToolCommand::new(&self.program)
            .arg("-v")
            .arg("error")
            .arg("-print_format")
            .arg("json")
            .arg("-show_streams")
            .path_arg(path)
            .timeout(self.timeout)
            .execute()
            .await?;

        parse_dimensions(&output.stdout)
    }
}
