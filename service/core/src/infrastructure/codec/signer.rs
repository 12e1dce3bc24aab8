// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Two-stage MAC envelope: `base64url(payload) "." base64url(HMAC-SHA-256(key, base64url(payload)))`.
//!
//! The MAC covers the *encoded* first segment, not the raw payload bytes.
//! Clients that mint or check descriptors rely on that exact construction.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::digest::{Key, KeyInit};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

const SEGMENT_SEPARATOR: char = '.';

/// The single failure value of [`verify`]. Carries no detail on purpose: a
/// forged descriptor and a truncated one look the same to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid descriptor")]
pub struct CodecError;

/// HMAC keyed with `key` normalized to one block: keys longer than a block
/// are hashed first, shorter ones are zero-padded.
fn keyed_mac(key: &[u8]) -> HmacSha256 {
    let mut block = Key::<HmacSha256>::default();
    if key.len() > block.len() {
        let digest = Sha256::digest(key);
        block[..digest.len()].copy_from_slice(&digest);
    } else {
        block[..key.len()].copy_from_slice(key);
    }
    <HmacSha256 as KeyInit>::new(&block)
}

pub fn b64_encode(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

pub fn b64_decode(text: &str) -> Result<Vec<u8>, CodecError> {
    URL_SAFE_NO_PAD.decode(text).map_err(|_| CodecError)
}

/// Sign `payload` with `key`.
pub fn sign(payload: &str, key: &[u8]) -> String {
    let m64 = b64_encode(payload.as_bytes());
    let mut mac = keyed_mac(key);
    mac.update(m64.as_bytes());
    let tag = mac.finalize().into_bytes();
    format!("{}{}{}", m64, SEGMENT_SEPARATOR, b64_encode(&tag))
}

/// Verify `token` under `key` and return its payload.
///
/// Fails closed on a wrong segment count, undecodable base64, a MAC mismatch
/// (compared in constant time), a non-UTF-8 payload or an empty payload.
pub fn verify(token: &str, key: &[u8]) -> Result<String, CodecError> {
    let mut segments = token.split(SEGMENT_SEPARATOR);
    let (Some(m64), Some(mac64), None) = (segments.next(), segments.next(), segments.next()) else {
        return Err(CodecError);
    };

    let tag = b64_decode(mac64)?;
    let mut mac = keyed_mac(key);
    mac.update(m64.as_bytes());
    mac.verify_slice(&tag).map_err(|_| CodecError)?;

    let payload = String::from_utf8(b64_decode(m64)?).map_err(|_| CodecError)?;
    if payload.is_empty() {
        return Err(CodecError);
    }
    Ok(payload)
}
