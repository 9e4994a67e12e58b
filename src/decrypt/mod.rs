//! Turns a raw response body into JSON.
//!
//! Most endpoints answer with plain JSON, which is passed through untouched.
//! Some pages instead embed an AES-encrypted data store in HTML markup; those
//! are handed to the first registered [`PayloadScheme`] that recognizes them.

mod cryptojs;

use serde_json::Value;
use thiserror::Error;

pub use cryptojs::CryptoJsScheme;

/// Why a body could not be turned into JSON.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The body is neither JSON nor a format any scheme recognizes.
    #[error("body is not JSON and no payload scheme recognized it ({0})")]
    Unrecognized(String),

    /// The markup was recognized but the embedded data blob is missing or malformed.
    #[error("embedded data blob not found: {0}")]
    MissingBlob(String),

    /// None of the key strategies produced a password.
    #[error("no decryption key in markup")]
    NoKey,

    #[error("base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The ciphertext lacks the `Salted__` header or is too short.
    #[error("ciphertext header is invalid")]
    BadHeader,

    /// Block cipher failure: wrong length, wrong key or bad padding.
    #[error("decryption failed: {0}")]
    Cipher(String),

    #[error("decrypted payload is not UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

/// One way of unwrapping an obfuscated body.
///
/// Schemes are versioned and several may be registered side by side.
pub trait PayloadScheme: Send + Sync {
    /// Stable identifier, used in logs.
    fn version(&self) -> &'static str;

    /// Cheap check whether this scheme should attempt `body`.
    fn recognizes(&self, body: &str) -> bool;

    /// Decodes `body` into JSON.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] describing the first step that failed.
    fn decode(&self, body: &str) -> Result<Value, DecodeError>;
}

/// The single `decode` entry point used by the client.
pub struct Decryptor {
    schemes: Vec<Box<dyn PayloadScheme>>,
}

impl std::fmt::Debug for Decryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.schemes.iter().map(|s| s.version()))
            .finish()
    }
}

impl Default for Decryptor {
    fn default() -> Self {
        Self::with_schemes(vec![Box::new(CryptoJsScheme)])
    }
}

impl Decryptor {
    /// A decryptor that tries `schemes` in order after the plain-JSON check.
    pub fn with_schemes(schemes: Vec<Box<dyn PayloadScheme>>) -> Self {
        Self { schemes }
    }

    /// Decodes a raw body: JSON passes through unchanged, anything else goes to
    /// the first scheme that recognizes it.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`]; never panics on malformed input.
    pub fn decode(&self, body: &str) -> Result<Value, DecodeError> {
        let trimmed = body.trim_start();
        if (trimmed.starts_with('{') || trimmed.starts_with('['))
            && let Ok(v) = serde_json::from_str(trimmed)
        {
            return Ok(v);
        }

        match self.schemes.iter().find(|s| s.recognizes(body)) {
            Some(scheme) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(scheme = scheme.version(), "decoding obfuscated payload");
                scheme.decode(body)
            }
            None => {
                let preview: String = trimmed.chars().take(40).collect();
                Err(DecodeError::Unrecognized(preview))
            }
        }
    }
}
