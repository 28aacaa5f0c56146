//! Share-link issuance. A share token grants unauthenticated read access to one CV.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;
use serde::Serialize;

use crate::models::cv::CvRow;

const TOKEN_BYTES: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShareState {
    pub is_public: bool,
    pub share_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ShareLink {
    pub share_token: String,
    pub share_url: String,
    pub is_public: bool,
}

/// 32 random bytes, URL-safe base64 without padding (43 chars).
pub fn generate_share_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Share state after issuing a link. Re-issuing on a public CV keeps its token.
pub fn issue(cv: &CvRow) -> ShareState {
    match (&cv.share_token, cv.is_public) {
        (Some(token), true) => ShareState {
            is_public: true,
            share_token: Some(token.clone()),
        },
        _ => ShareState {
            is_public: true,
            share_token: Some(generate_share_token()),
        },
    }
}

/// Share state after revocation: no token, private.
pub fn revoke() -> ShareState {
    ShareState {
        is_public: false,
        share_token: None,
    }
}

pub fn share_url(app_base_url: &str, token: &str) -> String {
    format!("{}/cv/shared/{token}", app_base_url.trim_end_matches('/'))
}

/// Cheap shape check before a token reaches the database.
pub fn looks_like_token(candidate: &str) -> bool {
    candidate.len() == 43
        && candidate
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}
