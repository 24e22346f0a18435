//! Small utility helpers used across modules.

use sha2::{Digest, Sha256};

/// Uppercase base36 digits, matching the format activation keys are printed in.
const BASE36_ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Hex digest of a SHA-256 hash.
/// Used for password hashing so account files never hold plain text.
pub fn sha256_hex(input: &str) -> String {
  let mut hasher = Sha256::new();
  hasher.update(input.as_bytes());
  format!("{:x}", hasher.finalize())
}

/// Raw SHA-256 digest bytes.
/// Activation keys re-encode these in base36 rather than hex.
pub fn sha256_bytes(input: &str) -> [u8; 32] {
  let mut hasher = Sha256::new();
  hasher.update(input.as_bytes());
  hasher.finalize().into()
}

/// Encode a big-endian byte string as uppercase base36.
/// Long division by 36 over the bytes, so arbitrary digest sizes work.
pub fn base36_from_bytes(digest: &[u8]) -> String {
  let mut digits: Vec<u32> = digest.iter().map(|&d| u32::from(d)).collect();
  let mut out: Vec<u8> = Vec::new();
  while digits.iter().any(|&d| d != 0) {
    let mut rem: u32 = 0;
    for d in digits.iter_mut() {
      let cur = rem * 256 + *d;
      *d = cur / 36;
      rem = cur % 36;
    }
    out.push(BASE36_ALPHABET[rem as usize]);
  }
  if out.is_empty() {
    return "0".to_string();
  }
  out.reverse();
  String::from_utf8(out).unwrap_or_default()
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge request/response payloads.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let cut: String = s.chars().take(max).collect();
  format!("{}… ({} bytes total)", cut, s.len())
}
