// Upstream request signing
// sign = MD5(timestamp + payload_json + nonce), uppercase hex

use md5::{Digest, Md5};
use rand::Rng;
use serde::Serialize;

use crate::error::{ProxyError, ProxyResult};

/// nonce 字母表 (与 deviceId 字母表顺序不同)
const NONCE_ALPHABET: &[u8] = b"useandom-26T198340PX75pxJACKVERYMINDBUSHWOLF_GQZbfghjklqvwyzrict";
pub const NONCE_LEN: usize = 21;

/// Signed request envelope. `body` is the exact JSON that was signed and must
/// be sent unchanged.
#[derive(Debug, Clone)]
pub struct SignedEnvelope {
    pub timestamp: String,
    pub nonce: String,
    pub signature: String,
    pub body: String,
}

impl SignedEnvelope {
    pub fn new<T: Serialize>(payload: &T) -> ProxyResult<Self> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let nonce = nanoid(NONCE_LEN);
        Self::with_parts(payload, timestamp, nonce)
    }

    pub fn with_parts<T: Serialize>(
        payload: &T,
        timestamp: String,
        nonce: String,
    ) -> ProxyResult<Self> {
        let body = serde_json::to_string(payload)
            .map_err(|e| ProxyError::InvalidRequest(format!("payload serialization: {}", e)))?;
        let signature = sign(&timestamp, &body, &nonce);
        Ok(Self {
            timestamp,
            nonce,
            signature,
            body,
        })
    }
}

/// Compute the upstream signature over an already serialized payload.
///
/// Key order in `payload_json` is significant.
pub fn sign(timestamp: &str, payload_json: &str, nonce: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(timestamp.as_bytes());
    hasher.update(payload_json.as_bytes());
    hasher.update(nonce.as_bytes());
    format!("{:X}", hasher.finalize())
}

/// URL-safe random id; bytes are consumed last-to-first.
pub fn nanoid(size: usize) -> String {
    let mut bytes = vec![0u8; size];
    rand::thread_rng().fill(&mut bytes[..]);
    bytes
        .iter()
        .rev()
        .map(|b| NONCE_ALPHABET[(b & 63) as usize] as char)
        .collect()
}
