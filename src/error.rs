use thiserror::Error;

/// Failure turning an encoded image payload into drawable pixels.
///
/// Decode failures abort the triggering operation and surface a notice;
/// the document is never touched.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Codec the decoder does not handle (HEIC/HEIF lands here).
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),
    #[error("Could not decode image: {0}")]
    InvalidData(#[from] image::ImageError),
    #[error("Could not decode image data: {0}")]
    InvalidEncoding(#[from] base64::DecodeError),
    #[error("Could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// Decoded, but with a zero dimension no layer can use.
    #[error("Image has no pixels")]
    EmptyImage,
}

/// Failure from the remote image-editing collaborator.
///
/// The variants mirror the response-validation ladder so a notice can name
/// the exact reason; none of them leave a mark on the document.
#[derive(Debug, Error)]
pub enum RemoteEditError {
    #[error("API Key is missing. Please check Settings.")]
    MissingApiKey,
    /// Transport or HTTP failure, carrying the server's message when one
    /// was provided.
    #[error("{0}")]
    Http(String),
    #[error("Request blocked: {0}")]
    Blocked(String),
    #[error("API returned no candidates in its response.")]
    NoCandidates,
    #[error("Generation failed. Reason: {0}")]
    BadFinishReason(String),
    #[error("Invalid response: No content parts found.")]
    NoContentParts,
    /// The model answered with prose instead of pixels.
    #[error("AI returned text: \"{0}\"")]
    TextOnly(String),
    #[error("AI did not return an image.")]
    NoImage,
    #[error("Response image could not be decoded: {0}")]
    BadImagePayload(#[from] DecodeError),
    /// The job's completion channel dropped before any result arrived.
    #[error("AI edit was cancelled")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_messages_name_the_reason() {
        assert_eq!(
            RemoteEditError::Blocked("SAFETY".to_owned()).to_string(),
            "Request blocked: SAFETY"
        );
        assert_eq!(
            RemoteEditError::BadFinishReason("MAX_TOKENS".to_owned()).to_string(),
            "Generation failed. Reason: MAX_TOKENS"
        );
        assert_eq!(
            RemoteEditError::TextOnly("no can do".to_owned()).to_string(),
            "AI returned text: \"no can do\""
        );
    }

    #[test]
    fn test_decode_error_wraps_image_errors() {
        let err = DecodeError::UnsupportedFormat("image/heic".to_owned());
        assert_eq!(err.to_string(), "Unsupported image format: image/heic");
    }
}
