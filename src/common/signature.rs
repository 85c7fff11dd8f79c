//! Authenticity check for requests arriving from the chat channel.
//!
//! The bot signs every field it sends: the fields (minus `hash`) are sorted
//! by key, rendered as `key=value` lines joined by `\n`, and HMAC-SHA256'd
//! with `SHA-256(bot_token)` as the key. `auth_date` is the unix time the
//! payload was issued; payloads older than a day are refused.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

pub const HASH_FIELD: &str = "hash";
pub const AUTH_DATE_FIELD: &str = "auth_date";

/// Maximum payload age.
pub const FRESHNESS_WINDOW_SECS: i64 = 86_400;

/// Tolerated clock skew for payloads stamped slightly in the future.
pub const CLOCK_SKEW_SECS: i64 = 300;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("signed payload is missing '{0}'")]
    MissingField(&'static str),

    #[error("auth_date is not a unix timestamp")]
    MalformedTimestamp,

    #[error("signature is not valid hex")]
    MalformedSignature,

    #[error("signed payload is outside the freshness window")]
    Expired,

    #[error("signature mismatch")]
    Mismatch,

    #[error("'{0}' is not a valid chat id")]
    MalformedChatId(String),
}

/// The exact string that gets signed.
pub fn data_check_string(fields: &BTreeMap<String, String>) -> String {
    fields
        .iter()
        .filter(|(key, _)| key.as_str() != HASH_FIELD)
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn mac_for(fields: &BTreeMap<String, String>, bot_token: &str) -> Result<HmacSha256, SignatureError> {
    let secret_key = Sha256::digest(bot_token.as_bytes());
    let mut mac =
        HmacSha256::new_from_slice(&secret_key).map_err(|_| SignatureError::MalformedSignature)?;
    mac.update(data_check_string(fields).as_bytes());
    Ok(mac)
}

/// Lowercase hex signature over `fields`, ignoring any `hash` already present.
pub fn sign(fields: &BTreeMap<String, String>, bot_token: &str) -> Result<String, SignatureError> {
    let mac = mac_for(fields, bot_token)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

pub fn verify(
    fields: &BTreeMap<String, String>,
    bot_token: &str,
    now: DateTime<Utc>,
) -> Result<(), SignatureError> {
    let auth_date: i64 = fields
        .get(AUTH_DATE_FIELD)
        .ok_or(SignatureError::MissingField(AUTH_DATE_FIELD))?
        .parse()
        .map_err(|_| SignatureError::MalformedTimestamp)?;

    let declared = fields
        .get(HASH_FIELD)
        .ok_or(SignatureError::MissingField(HASH_FIELD))?;
    let declared = hex::decode(declared).ok_or(SignatureError::MalformedSignature)?;

    mac_for(fields, bot_token)?
        .verify_slice(&declared)
        .map_err(|_| SignatureError::Mismatch)?;

    let age = now.timestamp() - auth_date;
    if age > FRESHNESS_WINDOW_SECS || age < -CLOCK_SKEW_SECS {
        return Err(SignatureError::Expired);
    }

    Ok(())
}

mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{b:02x}")).collect()
    }

    pub fn decode(s: &str) -> Option<Vec<u8>> {
        if s.len() % 2 != 0 {
            return None;
        }
        (0..s.len())
            .step_by(2)
            .map(|i| s.get(i..i + 2).and_then(|pair| u8::from_str_radix(pair, 16).ok()))
            .collect()
    }
}
