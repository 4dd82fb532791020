//! Small helpers shared across the SDK: query-key casing and file
//! content encoding for JSON payloads.

use crate::error::Result;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::path::Path;

/// Convert a `snake_case` identifier to the `CamelCase` form the API
/// expects for query parameters (`sync_timeout_ms` -> `SyncTimeoutMs`).
pub fn to_camel_case(s: &str) -> String {
    s.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// Read a local file and return its content base64-encoded, for
/// embedding raw documents in JSON payloads.
pub async fn base64_file(path: impl AsRef<Path>) -> Result<String> {
    let content = tokio::fs::read(path).await?;
    Ok(BASE64.encode(content))
}

/// Read a local file into a multipart form part, carrying the file
/// name when one is present.
pub async fn file_part(path: impl AsRef<Path>) -> Result<reqwest::multipart::Part> {
    let path = path.as_ref();
    let content = tokio::fs::read(path).await?;
    let mut part = reqwest::multipart::Part::bytes(content);
    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
        part = part.file_name(name.to_string());
    }
    Ok(part)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_camel_case() {
        assert_eq!(to_camel_case("sync_timeout_ms"), "SyncTimeoutMs");
        assert_eq!(to_camel_case("number"), "Number");
        assert_eq!(to_camel_case("principal_inn"), "PrincipalInn");
    }

    #[test]
    fn test_to_camel_case_edge_cases() {
        assert_eq!(to_camel_case(""), "");
        assert_eq!(to_camel_case("_"), "");
        assert_eq!(to_camel_case("a__b"), "AB");
    }

    #[tokio::test]
    async fn test_base64_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.xml");
        tokio::fs::write(&path, b"<poa/>").await.unwrap();
        assert_eq!(base64_file(&path).await.unwrap(), "PHBvYS8+");
    }

    #[tokio::test]
    async fn test_base64_file_missing() {
        let result = base64_file("/nonexistent/doc.xml").await;
        assert!(matches!(result, Err(crate::MandataError::Io(_))));
    }
}
