use std::collections::HashSet;

use axum::http::HeaderMap;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// What a diary key vouches for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiaryClaims {
    pub diaryname: String,
    pub username: String,
}

/// Issues and checks diary keys.
///
/// Keys are HS256 tokens over [`DiaryClaims`] with no time claims, so the same
/// diary name and user always produce the same key.
#[derive(Clone)]
pub struct KeySigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl KeySigner {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn issue(&self, diaryname: &str, username: &str) -> Result<String, AppError> {
        let claims = DiaryClaims {
            diaryname: diaryname.to_string(),
            username: username.to_string(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(|error| {
            AppError::internal(format!("Key signing failed: {}", sanitize(&error)))
        })
    }

    pub fn verify(&self, key: &str) -> Result<DiaryClaims, AppError> {
        decode::<DiaryClaims>(key, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|error| {
                AppError::bad_key(format!("Key validation failed: {}", sanitize(&error)))
            })
    }
}

/// Pull the diary key out of `Authorization: Basic base64(key:)`.
pub fn extract_basic_key(headers: &HeaderMap) -> Result<String, AppError> {
    let header = headers
        .get("authorization")
        .ok_or_else(|| AppError::bad_key("Missing Authorization header"))?
        .to_str()
        .map_err(|_| AppError::bad_key("Authorization header is not valid UTF-8"))?;

    let (scheme, encoded) = header
        .split_once(' ')
        .ok_or_else(|| AppError::bad_key("Authorization header must be `Basic <credentials>`"))?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return Err(AppError::bad_key("Authorization scheme must be `Basic`"));
    }

    let decoded = STANDARD
        .decode(encoded.trim())
        .map_err(|_| AppError::bad_key("Basic credentials are not valid base64"))?;
    let credentials = String::from_utf8(decoded)
        .map_err(|_| AppError::bad_key("Basic credentials are not valid UTF-8"))?;
    let key = credentials
        .split_once(':')
        .map_or(credentials.as_str(), |(user, _)| user)
        .trim();
    if key.is_empty() {
        return Err(AppError::bad_key("Diary key is empty"));
    }

    Ok(key.to_string())
}

fn sanitize(error: &impl std::fmt::Display) -> String {
    error.to_string().replace('\n', " ").trim().to_string()
}
