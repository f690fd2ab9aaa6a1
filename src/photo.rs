//! Photo uploads and address recognition.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{info, warn};

use crate::error::{PipelineError, RECOGNIZE_FAILED, Result};
use crate::traits::{Address, AddressRecognizer};

/// Largest accepted photo, checked before encoding.
pub const MAX_PHOTO_BYTES: usize = 4 * 1024 * 1024;

/// An image ready for dispatch as a base64 data URI.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoUpload {
    data_uri: String,
}

impl PhotoUpload {
    pub fn from_bytes(mime: &str, bytes: &[u8]) -> Result<Self> {
        if bytes.len() > MAX_PHOTO_BYTES {
            return Err(PipelineError::validation("Please upload an image smaller than 4MB."));
        }
        if !mime.starts_with("image/") {
            return Err(PipelineError::validation("Please upload an image file."));
        }
        let data_uri = format!("data:{};base64,{}", mime, STANDARD.encode(bytes));
        Ok(Self { data_uri })
    }

    pub fn data_uri(&self) -> &str {
        &self.data_uri
    }
}

/// Runs recognition on `upload`.
///
/// `Ok(None)` means the service found no address. Transport failures and
/// replies without an `address` field become [`PipelineError::Upstream`].
pub async fn recognize_address<R: AddressRecognizer + ?Sized>(
    recognizer: &R,
    upload: &PhotoUpload,
) -> Result<Option<Address>> {
    let raw = recognizer.recognize(upload.data_uri()).await.map_err(|err| {
        warn!(error = %err, "address recognition failed");
        PipelineError::upstream(RECOGNIZE_FAILED)
    })?;

    let Some(address) = raw.address else {
        warn!("recognition reply is missing the address field");
        return Err(PipelineError::upstream(RECOGNIZE_FAILED));
    };
    let address = address.trim();
    if address.is_empty() {
        info!("no address found in photo");
        return Ok(None);
    }
    Ok(Some(address.to_string()))
}
