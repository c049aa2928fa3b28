//! Error taxonomy of the ingestion pipeline
//!
//! Every failure carries a stable [`IngestError::category`] so callers can
//! branch on it without matching message text.

use common::error::DatabaseError;
use thiserror::Error;
use uuid::Uuid;

use crate::models::StoredObject;
use crate::object_store::{SignError, UploadError};
use crate::probe::ProbeError;
use crate::transcoder::TranscodeError;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("video {0} not found")]
    NotFound(Uuid),

    #[error("user is not the owner of video {0}")]
    Unauthorized(Uuid),

    #[error("unsupported media type {0:?}")]
    UnsupportedMediaType(String),

    #[error("upload exceeds the limit of {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    /// The upload body could not be read to the end.
    #[error("failed to read upload body: {0}")]
    Body(#[source] std::io::Error),

    #[error("local I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error(transparent)]
    Transcode(#[from] TranscodeError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    /// The object was uploaded but the record was not updated.
    #[error("uploaded {object} but couldn't save video metadata: {source}")]
    Persist {
        object: StoredObject,
        #[source]
        source: DatabaseError,
    },

    #[error(transparent)]
    Sign(#[from] SignError),

    #[error("metadata store error: {0}")]
    Store(#[from] DatabaseError),
}

impl IngestError {
    /// Stable category name.
    pub fn category(&self) -> &'static str {
        match self {
            IngestError::NotFound(_)
            | IngestError::Unauthorized(_)
            | IngestError::UnsupportedMediaType(_)
            | IngestError::PayloadTooLarge { .. }
            | IngestError::Body(_) => "validation",
            IngestError::Io(_) => "io",
            IngestError::Probe(_) => "probe",
            IngestError::Transcode(_) => "transcode",
            IngestError::Upload(_) => "upload",
            IngestError::Persist { .. } => "persist",
            IngestError::Sign(_) => "sign",
            IngestError::Store(_) => "store",
        }
    }

    /// Whether repeating the same request can succeed.
    ///
    /// Only remote upload failures qualify: nothing was created remotely.
    pub fn is_retryable(&self) -> bool {
        matches!(self, IngestError::Upload(_))
    }

    /// Remote object left without a record, if any.
    pub fn orphaned_object(&self) -> Option<&StoredObject> {
        match self {
            IngestError::Persist { object, .. } => Some(object),
            _ => None,
        }
    }
}
