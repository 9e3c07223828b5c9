//! Source signatures embedded in generated SVG documents.
//!
//! Every SVG carries the SHA-256 of the relevant source of its block,
//! so a later run can tell whether an existing output is still current
//! without rendering again.

use std::{fmt::Write, sync::LazyLock};

use log::trace;
use regex::Regex;
use sha2::{Digest, Sha256};

use tracery_parser::source::relevant_source;

static SIGNATURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<!--SRC-SIGNATURE=([0-9a-f]{64})-->").expect("static signature pattern")
});

/// Lowercase hex SHA-256 of the relevant source of `text`.
///
/// Trailing whitespace, line endings and anything after the `@end` line
/// do not affect the result.
pub fn signature(text: &str) -> String {
    let digest = Sha256::digest(relevant_source(text).as_bytes());
    digest
        .iter()
        .fold(String::with_capacity(64), |mut hex, byte| {
            let _ = write!(hex, "{byte:02x}");
            hex
        })
}

/// The signature embedded in `svg`, if any.
pub fn extract_signature(svg: &str) -> Option<&str> {
    SIGNATURE
        .captures(svg)
        .and_then(|captures| captures.get(1))
        .map(|signature| signature.as_str())
}

/// Inserts the signature of `source` and the generator banner right before
/// the closing `</svg>` tag.
pub fn embed(svg: &str, source: &str) -> String {
    let signature = signature(source);
    trace!(signature; "Embedding source signature");
    let comments = format!(
        "<!--SRC-SIGNATURE={signature}--><!--Generated by tracery {}-->",
        env!("CARGO_PKG_VERSION")
    );
    match svg.rfind("</svg>") {
        Some(end) => {
            let mut out = String::with_capacity(svg.len() + comments.len());
            out.push_str(&svg[..end]);
            out.push_str(&comments);
            out.push_str(&svg[end..]);
            out
        }
        None => format!("{svg}{comments}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "@startuml\nAlice -> Bob : hello\n@enduml";

    #[test]
    fn test_signature_is_hex_sha256() {
        let signature = signature(SOURCE);
        assert_eq!(signature.len(), 64);
        assert!(signature.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')));
        assert_ne!(signature, super::signature("@startuml\nAlice -> Bob\n@enduml"));
    }

    #[test]
    fn test_banner_does_not_change_signature() {
        let with_banner = "@startuml  \r\nAlice -> Bob : hello\r\n@enduml\n\ntracery 0.1.0\nLanguage: fr\nCountry: CA";
        assert_eq!(signature(SOURCE), signature(with_banner));
    }

    #[test]
    fn test_embed_then_extract() {
        let svg = "<svg xmlns=\"http://www.w3.org/2000/svg\">\n<g/>\n</svg>";
        let embedded = embed(svg, SOURCE);
        assert!(embedded.ends_with("-->\n</svg>") || embedded.ends_with("--></svg>"));
        assert!(embedded.contains("<!--Generated by tracery "));
        assert_eq!(extract_signature(&embedded), Some(signature(SOURCE).as_str()));
    }

    #[test]
    fn test_extract_without_signature() {
        assert_eq!(extract_signature("<svg></svg>"), None);
        assert_eq!(extract_signature("<!--SRC-SIGNATURE=xyz-->"), None);
    }
}
