//! Turns uploaded bytes into plain text.

use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{Result, RetrievalError};
use crate::web::html_to_text;

/// File extensions [`parse_document`] understands
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "txt", "md", "markdown", "html", "htm"];

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    pub content: String,
    pub file_type: String,
}

/// Lower-cased extension of `filename`, or the empty string
pub fn extension_of(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

pub fn is_supported(filename: &str) -> bool {
    SUPPORTED_EXTENSIONS.contains(&extension_of(filename).as_str())
}

/// MIME type recorded on the stored file pointer
pub fn content_type_for(filename: &str) -> &'static str {
    match extension_of(filename).as_str() {
        "pdf" => "application/pdf",
        "md" | "markdown" => "text/markdown",
        "html" | "htm" => "text/html",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

pub fn parse_document(filename: &str, bytes: &[u8]) -> Result<ParsedDocument> {
    let ext = extension_of(filename);

    let (content, file_type) = match ext.as_str() {
        "txt" => (decode_utf8(filename, bytes)?, "txt"),
        "md" | "markdown" => (decode_utf8(filename, bytes)?, "md"),
        "html" | "htm" => (html_to_text(&String::from_utf8_lossy(bytes)), "html"),
        "pdf" => {
            let text = pdf_extract::extract_text_from_mem(bytes).map_err(|e| {
                RetrievalError::Parse {
                    filename: filename.to_string(),
                    reason: format!("PDF parse error: {}", e),
                }
            })?;
            (text, "pdf")
        }
        _ => return Err(RetrievalError::UnsupportedFileType(ext)),
    };

    Ok(ParsedDocument {
        content: clean_text(&content),
        file_type: file_type.to_string(),
    })
}

/// [`parse_document`] on the blocking pool; PDF extraction is CPU bound
pub async fn parse_document_blocking(filename: &str, bytes: &[u8]) -> Result<ParsedDocument> {
    let name = filename.to_string();
    let bytes = bytes.to_vec();
    tokio::task::spawn_blocking(move || parse_document(&name, &bytes))
        .await
        .map_err(|e| RetrievalError::Parse {
            filename: filename.to_string(),
            reason: format!("parser task failed: {}", e),
        })?
}

fn decode_utf8(filename: &str, bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec()).map_err(|e| RetrievalError::Parse {
        filename: filename.to_string(),
        reason: e.to_string(),
    })
}

/// Strips NUL characters, which the document store rejects
pub fn clean_text(text: &str) -> String {
    text.replace('\0', "")
}

/// Strips NUL from string values and drops null or empty entries, recursing into objects
pub fn clean_metadata(metadata: Map<String, Value>) -> Map<String, Value> {
    metadata
        .into_iter()
        .filter_map(|(key, value)| clean_value(value).map(|v| (key, v)))
        .collect()
}

fn clean_value(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::String(s) => {
            let s = clean_text(&s);
            (!s.is_empty()).then_some(Value::String(s))
        }
        Value::Array(items) => {
            let items: Vec<Value> = items.into_iter().filter_map(clean_value).collect();
            (!items.is_empty()).then_some(Value::Array(items))
        }
        Value::Object(map) => {
            let map = clean_metadata(map);
            (!map.is_empty()).then_some(Value::Object(map))
        }
        other => Some(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_text_and_markdown() {
        let doc = parse_document("notes.TXT", b"hello\0 world").unwrap();
        assert_eq!(doc.content, "hello world");
        assert_eq!(doc.file_type, "txt");

        let doc = parse_document("readme.markdown", b"# Title").unwrap();
        assert_eq!(doc.file_type, "md");
    }

    #[test]
    fn test_unsupported_extension() {
        let err = parse_document("image.png", b"...").unwrap_err();
        assert!(matches!(err, RetrievalError::UnsupportedFileType(ext) if ext == "png"));
        assert!(matches!(
            parse_document("noext", b"..."),
            Err(RetrievalError::UnsupportedFileType(_))
        ));
    }

    #[test]
    fn test_invalid_utf8_is_parse_error() {
        let err = parse_document("bad.txt", &[0xff, 0xfe, 0xfd]).unwrap_err();
        assert!(matches!(err, RetrievalError::Parse { .. }));
    }

    #[test]
    fn test_garbage_pdf_is_parse_error() {
        let err = parse_document("broken.pdf", b"not a pdf").unwrap_err();
        assert!(matches!(err, RetrievalError::Parse { .. }));
    }

    #[test]
    fn test_clean_metadata() {
        let meta = json!({
            "source": "a\0.pdf",
            "author": "",
            "page": 3,
            "missing": null,
            "tags": ["", "x"],
            "nested": {"empty": null}
        });
        let cleaned = clean_metadata(meta.as_object().unwrap().clone());
        assert_eq!(
            Value::Object(cleaned),
            json!({"source": "a.pdf", "page": 3, "tags": ["x"]})
        );
    }

    #[test]
    fn test_content_types() {
        assert_eq!(content_type_for("a.pdf"), "application/pdf");
        assert_eq!(content_type_for("a.md"), "text/markdown");
        assert!(is_supported("A.PDF"));
        assert!(!is_supported("a.docx"));
    }
}
