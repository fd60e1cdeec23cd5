//! Base64 data URIs (`data:<mimetype>;base64,<data>`).
//!
//! Audio recorded by a client travels to the transcription flow in this
//! form, and the provider layer unpacks it again into an attachment.

use base64::{Engine as _, engine::general_purpose};
use serde::{Deserialize, Serialize};

/// A parsed `data:` URI carrying base64-encoded media.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataUri {
    /// MIME type, e.g. `audio/webm`.
    pub mime_type: String,

    /// The base64 payload exactly as it appeared in the URI.
    pub data: String,
}

impl DataUri {
    /// Encode raw bytes into a data URI.
    pub fn encode(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: general_purpose::STANDARD.encode(bytes),
        }
    }

    /// Parse a `data:<mime>;base64,<payload>` string.
    ///
    /// The MIME type must have a `type/subtype` shape and the payload must be
    /// non-empty, valid standard base64.
    pub fn parse(uri: &str) -> Result<Self, String> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| "must start with 'data:'".to_string())?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| "missing ',' before the encoded data".to_string())?;
        let mime_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| "must declare ';base64' encoding".to_string())?;

        let valid_mime = mime_type
            .split_once('/')
            .is_some_and(|(t, s)| !t.is_empty() && !s.is_empty() && !mime_type.contains(' '));
        if !valid_mime {
            return Err(format!("invalid MIME type '{mime_type}'"));
        }
        if payload.is_empty() {
            return Err("encoded data is empty".into());
        }
        general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| format!("invalid base64 data: {e}"))?;

        Ok(Self {
            mime_type: mime_type.to_string(),
            data: payload.to_string(),
        })
    }

    /// Decode the payload back into bytes.
    pub fn bytes(&self) -> Result<Vec<u8>, String> {
        general_purpose::STANDARD
            .decode(&self.data)
            .map_err(|e| format!("invalid base64 data: {e}"))
    }

    /// The subtype of the MIME type (`webm` for `audio/webm;codecs=opus`).
    pub fn subtype(&self) -> &str {
        self.mime_type
            .split_once('/')
            .map(|(_, s)| s.split(';').next().unwrap_or(s))
            .unwrap_or("")
    }
}

impl std::fmt::Display for DataUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "data:{};base64,{}", self.mime_type, self.data)
    }
}
