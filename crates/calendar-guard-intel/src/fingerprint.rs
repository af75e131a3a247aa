//! # Fingerprinter
//!
//! Computes two SHA-256 hashes over a field's text: a content hash (over
//! normalized text) and a structural hash (over a canonical feature
//! string). Neither is reversible to the original text. Grounded on
//! `sentinel-registry/src/storage.rs`'s hash-based verification approach
//! (there, over `ToolSchema`; here, over scanned text), using `sha2` the
//! same way.

use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::OnceLock;

/// A pair of hashes identifying one piece of scanned text.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fingerprint {
    pub content_hash: String,
    pub structural_hash: String,
}

fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hasher.finalize().iter().map(|b| format!("{b:02x}")).collect()
}

fn collapse_whitespace(text: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\s+").unwrap());
    re.replace_all(text, " ").into_owned()
}

/// `SHA-256(trim(collapse_whitespace(lowercase(text))))`.
pub fn content_hash(text: &str) -> String {
    let normalized = collapse_whitespace(&text.to_lowercase());
    sha256_hex(normalized.trim())
}

fn length_bucket(len: usize) -> &'static str {
    match len {
        0..=100 => "0-100",
        101..=500 => "100-500",
        501..=2000 => "500-2000",
        2001..=10000 => "2000-10000",
        _ => "10000+",
    }
}

fn base64_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z0-9+/]{32,}={0,2}").unwrap())
}

fn html_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<\s*([a-z][a-z0-9]*)\b").unwrap())
}

fn zero_width_chars() -> &'static [char] {
    const CHARS: [char; 6] = ['\u{200B}', '\u{200C}', '\u{200D}', '\u{FEFF}', '\u{2060}', '\u{00AD}'];
    &CHARS
}

fn url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"https?://\S+").unwrap())
}

fn percent_encoding_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"%[0-9A-Fa-f]{2}").unwrap())
}

/// Builds the `key:value|key:value|...` canonical feature string, with
/// keys emitted in a fixed sorted order so the hash is stable regardless
/// of how this function evolves internally.
fn canonical_features(text: &str) -> String {
    let lower = text.to_lowercase();

    let b64 = base64_run_re().find_iter(text).count();

    let mut tags: Vec<String> = html_tag_re()
        .captures_iter(text)
        .map(|c| c[1].to_lowercase())
        .collect();
    tags.sort();
    tags.dedup();
    let html = if tags.is_empty() { "none".to_string() } else { tags.join(",") };

    let zwc = text.chars().filter(|c| zero_width_chars().contains(c)).count();
    let urls = url_re().find_iter(text).count();
    let lines = text.matches('\n').count();
    let encoding = percent_encoding_re().find_iter(text).count();

    let mut scripts = 0u8;
    for marker in ["javascript:", "vbscript:", "data:", "<script", "on"] {
        if marker == "on" {
            static ON_RE: OnceLock<Regex> = OnceLock::new();
            let re = ON_RE.get_or_init(|| Regex::new(r"(?i)\bon[a-z]+\s*=").unwrap());
            if re.is_match(&lower) {
                scripts += 1;
            }
        } else if marker == "data:" {
            if lower.contains("data:") && lower.contains(";base64") {
                scripts += 1;
            }
        } else if lower.contains(marker) {
            scripts += 1;
        }
    }

    format!(
        "b64:{b64}|encoding:{encoding}|html:{html}|len:{len}|lines:{lines}|scripts:{scripts}|urls:{urls}|zwc:{zwc}",
        len = length_bucket(text.len()),
    )
}

/// `SHA-256(canonical_features(text))`.
pub fn structural_hash(text: &str) -> String {
    sha256_hex(&canonical_features(text))
}

/// Computes both hashes for a piece of text.
pub fn fingerprint(text: &str) -> Fingerprint {
    Fingerprint {
        content_hash: content_hash(text),
        structural_hash: structural_hash(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_is_64_hex_chars() {
        let h = content_hash("hello world");
        assert_eq!(h.len(), 64);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn content_hash_is_stable_across_case_and_whitespace() {
        let a = content_hash("Hello   World");
        let b = content_hash("  hello world  ");
        assert_eq!(a, b);
    }

    #[test]
    fn content_hash_differs_for_different_text() {
        assert_ne!(content_hash("hello"), content_hash("goodbye"));
    }

    #[test]
    fn structural_hash_is_stable_for_same_shape_different_values() {
        let a = structural_hash("<script>alert(1)</script>");
        let b = structural_hash("<script>alert(2)</script>");
        assert_eq!(a, b);
    }

    #[test]
    fn structural_hash_differs_for_different_shape() {
        let plain = structural_hash("just some plain text with no markup at all");
        let scripty = structural_hash("<script>evil()</script>");
        assert_ne!(plain, scripty);
    }

    #[test]
    fn fingerprint_returns_both_hashes() {
        let fp = fingerprint("some text");
        assert_eq!(fp.content_hash.len(), 64);
        assert_eq!(fp.structural_hash.len(), 64);
    }
}
