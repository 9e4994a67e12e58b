//! CryptoJS-compatible AES payloads embedded in quote page markup.
//!
//! The page carries `root.App.main = {...};` whose `context.dispatcher.stores`
//! is an OpenSSL-style salted ciphertext (`U2FsdGVkX1...`). The password sits in
//! sibling keys of the same object; several placements have been seen and are
//! tried in order.

use std::sync::LazyLock;

use aes::Aes256;
use base64::{Engine as _, engine::general_purpose};
use cbc::cipher::{BlockDecryptMut, KeyIvInit, block_padding::Pkcs7};
use md5::{Digest, Md5};
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::{DecodeError, PayloadScheme};

static APP_MAIN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"root\.App\.main\s*=\s*").ok());

const SALTED_MAGIC: &[u8] = b"Salted__";
const CIPHERTEXT_PREFIX: &str = "U2F";

/// AES-256-CBC with an `EVP_BytesToKey`(MD5) derived key, as produced by CryptoJS.
#[derive(Debug, Clone, Copy, Default)]
pub struct CryptoJsScheme;

impl PayloadScheme for CryptoJsScheme {
    fn version(&self) -> &'static str {
        "cryptojs-aes-v1"
    }

    fn recognizes(&self, body: &str) -> bool {
        body.contains("root.App.main")
    }

    fn decode(&self, body: &str) -> Result<Value, DecodeError> {
        let blob = extract_blob(body)?;
        let stores = blob
            .get("context")
            .and_then(|c| c.get("dispatcher"))
            .and_then(|d| d.get("stores"))
            .ok_or_else(|| DecodeError::MissingBlob("context.dispatcher.stores".into()))?;

        match stores {
            Value::String(s) if s.starts_with(CIPHERTEXT_PREFIX) => {
                let password = find_password(&blob)?;
                decrypt_salted(s, &password)
            }
            Value::String(s) => Ok(serde_json::from_str(s)?),
            other => Ok(other.clone()),
        }
    }
}

fn extract_blob(body: &str) -> Result<Map<String, Value>, DecodeError> {
    let re = APP_MAIN
        .as_ref()
        .ok_or_else(|| DecodeError::MissingBlob("pattern unavailable".into()))?;
    let start = re
        .find(body)
        .ok_or_else(|| DecodeError::MissingBlob("root.App.main".into()))?
        .end();
    // Only the first value is parsed; script text after it is ignored.
    let first = serde_json::Deserializer::from_str(&body[start..])
        .into_iter::<Value>()
        .next()
        .ok_or_else(|| DecodeError::MissingBlob("root.App.main is empty".into()))??;
    match first {
        Value::Object(map) => Ok(map),
        _ => Err(DecodeError::MissingBlob("root.App.main is not an object".into())),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WordArray {
    words: Vec<i32>,
    sig_bytes: usize,
}

/// Finds the password next to the ciphertext. Relies on document key order.
fn find_password(blob: &Map<String, Value>) -> Result<String, DecodeError> {
    if let Some(p) = password_from_cs_cr(blob)? {
        return Ok(p);
    }
    if let Some(p) = password_from_single_stray_key(blob) {
        return Ok(p);
    }
    if let Some(p) = password_after_plugins(blob) {
        return Ok(p);
    }
    Err(DecodeError::NoKey)
}

/// `_cs` is the password, `_cr` a JSON word array used as salt for PBKDF2-SHA1.
fn password_from_cs_cr(blob: &Map<String, Value>) -> Result<Option<String>, DecodeError> {
    let (Some(Value::String(cs)), Some(Value::String(cr))) = (blob.get("_cs"), blob.get("_cr"))
    else {
        return Ok(None);
    };
    let words: WordArray = serde_json::from_str(cr)?;
    let salt: Vec<u8> = words.words.iter().flat_map(|w| w.to_be_bytes()).collect();
    if salt.len() != words.sig_bytes {
        return Err(DecodeError::Cipher("_cr sigBytes mismatch".into()));
    }
    let mut key = [0u8; 32];
    pbkdf2::pbkdf2_hmac::<sha1::Sha1>(cs.as_bytes(), &salt, 1, &mut key);
    Ok(Some(hex::encode(key)))
}

/// Exactly one key besides `context` and `plugins`, holding a non-empty string.
fn password_from_single_stray_key(blob: &Map<String, Value>) -> Option<String> {
    let mut rest = blob
        .iter()
        .filter(|(k, _)| *k != "context" && *k != "plugins");
    match (rest.next(), rest.next()) {
        (Some((_, Value::String(s))), None) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Four non-empty string values directly following `plugins`, concatenated.
fn password_after_plugins(blob: &Map<String, Value>) -> Option<String> {
    let keys: Vec<&String> = blob.keys().filter(|k| *k != "context").collect();
    let at = keys.iter().position(|k| *k == "plugins")?;
    let parts: Vec<&str> = keys
        .iter()
        .skip(at + 1)
        .take(5)
        .map(|k| blob.get(*k).and_then(Value::as_str).unwrap_or_default())
        .collect();
    (parts.len() == 4 && parts.iter().all(|p| !p.is_empty())).then(|| parts.concat())
}

/// OpenSSL `EVP_BytesToKey` with MD5 and one iteration: 32-byte key, 16-byte IV.
fn evp_bytes_to_key(password: &[u8], salt: &[u8]) -> ([u8; 32], [u8; 16]) {
    let mut material = Vec::with_capacity(48);
    let mut block: Vec<u8> = Vec::new();
    while material.len() < 48 {
        let mut h = Md5::new();
        h.update(&block);
        h.update(password);
        h.update(salt);
        block = h.finalize().to_vec();
        material.extend_from_slice(&block);
    }
    let mut key = [0u8; 32];
    let mut iv = [0u8; 16];
    key.copy_from_slice(&material[..32]);
    iv.copy_from_slice(&material[32..48]);
    (key, iv)
}

fn decrypt_salted(ciphertext_b64: &str, password: &str) -> Result<Value, DecodeError> {
    let raw = general_purpose::STANDARD.decode(ciphertext_b64.trim())?;
    if raw.len() < 16 || &raw[..8] != SALTED_MAGIC {
        return Err(DecodeError::BadHeader);
    }
    let (key, iv) = evp_bytes_to_key(password.as_bytes(), &raw[8..16]);
    let plain = cbc::Decryptor::<Aes256>::new_from_slices(&key, &iv)
        .map_err(|e| DecodeError::Cipher(e.to_string()))?
        .decrypt_padded_vec_mut::<Pkcs7>(&raw[16..])
        .map_err(|e| DecodeError::Cipher(e.to_string()))?;
    let text = String::from_utf8(plain)?;
    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
pub(crate) fn seal(plaintext: &str, password: &str, salt: [u8; 8]) -> String {
    use cbc::cipher::BlockEncryptMut;

    let (key, iv) = evp_bytes_to_key(password.as_bytes(), &salt);
    let ct = cbc::Encryptor::<Aes256>::new(&key.into(), &iv.into())
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());
    let mut out = SALTED_MAGIC.to_vec();
    out.extend_from_slice(&salt);
    out.extend_from_slice(&ct);
    general_purpose::STANDARD.encode(out)
}
