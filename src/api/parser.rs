//! Normalisation of ingestion responses into an [`IngestResult`].
//!
//! The service answers either with a JSON payload or with an HTML page that
//! embeds the digest. The page is read through fixed locations:
//!
//! | Field      | Location                                                    |
//! |------------|-------------------------------------------------------------|
//! | summary    | first `<textarea>` with both `w-full` and `h-[160px]` classes |
//! | tree       | element with `id="directory-structure-content"` (`value`)   |
//! | content    | first `<textarea>` whose class list contains `result-text`  |
//! | ingest id  | `data-ingest-id` on the element carrying `data-results`     |
//!
//! A missing summary means the repository did not ingest; missing tree or
//! content regions are treated as empty.

use regex::{Captures, Regex};
use std::sync::OnceLock;
use tracing::debug;

use super::types::{IngestError, StructuredPayload};
use crate::domain::IngestResult;

const SUMMARY_CLASSES: &[&str] = &["w-full", "h-[160px]"];
const CONTENT_CLASSES: &[&str] = &["result-text"];
const TREE_ID: &str = "directory-structure-content";
const RESULTS_ATTR: &str = "data-results";
const INGEST_ID_ATTR: &str = "data-ingest-id";

/// Raw response body tagged by its declared shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseBody {
    Structured(String),
    Document(String),
}

impl ResponseBody {
    /// Pick the strategy from the response `Content-Type`.
    pub fn from_content_type(content_type: Option<&str>, body: String) -> Self {
        let is_json = content_type
            .map(|ct| ct.to_ascii_lowercase().contains("json"))
            .unwrap_or(false);
        if is_json {
            ResponseBody::Structured(body)
        } else {
            ResponseBody::Document(body)
        }
    }
}

pub fn parse_response(body: &ResponseBody) -> Result<IngestResult, IngestError> {
    match body {
        ResponseBody::Structured(raw) => parse_structured(raw),
        ResponseBody::Document(raw) => parse_document(raw),
    }
}

fn parse_structured(raw: &str) -> Result<IngestResult, IngestError> {
    let payload: StructuredPayload = serde_json::from_str(raw)
        .map_err(|e| IngestError::ParseFailure(format!("invalid JSON payload: {}", e)))?;

    let summary = payload
        .summary
        .ok_or_else(|| IngestError::ParseFailure("payload has no summary".to_string()))?;

    Ok(IngestResult {
        summary,
        tree: payload.tree.unwrap_or_default(),
        content: payload.content.unwrap_or_default(),
        ingest_id: payload.ingest_id.filter(|id| !id.is_empty()),
    })
}

fn parse_document(html: &str) -> Result<IngestResult, IngestError> {
    let summary = textarea_with_classes(html, SUMMARY_CLASSES).ok_or_else(|| {
        IngestError::ParseFailure("summary region not found in response".to_string())
    })?;

    let tree = tree_region(html).unwrap_or_default();
    let content = textarea_with_classes(html, CONTENT_CLASSES).unwrap_or_default();
    let ingest_id = ingest_id(html);

    debug!(
        "Parsed document: summary {} bytes, tree {} bytes, content {} bytes, ingest id {:?}",
        summary.len(),
        tree.len(),
        content.len(),
        ingest_id
    );

    Ok(IngestResult {
        summary,
        tree,
        content,
        ingest_id,
    })
}

// ============================================================================
// Minimal HTML scanning
// ============================================================================

fn textarea_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)<textarea\b([^>]*)>(.*?)</textarea\s*>").expect("valid textarea regex")
    })
}

fn start_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)<([a-zA-Z][a-zA-Z0-9-]*)\b([^>]*)>").expect("valid start tag regex")
    })
}

fn attr_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"([^\s"'>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
            .expect("valid attribute regex")
    })
}

fn entity_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);").expect("valid entity regex")
    })
}

type Attributes = Vec<(String, Option<String>)>;

fn parse_attributes(raw: &str) -> Attributes {
    attr_re()
        .captures_iter(raw)
        .map(|caps| {
            let name = caps[1].to_ascii_lowercase();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| decode_entities(m.as_str()));
            (name, value)
        })
        .collect()
}

fn attribute<'a>(attrs: &'a Attributes, name: &str) -> Option<&'a (String, Option<String>)> {
    attrs.iter().find(|(n, _)| n == name)
}

fn attribute_value<'a>(attrs: &'a Attributes, name: &str) -> Option<&'a str> {
    attribute(attrs, name).and_then(|(_, v)| v.as_deref())
}

fn has_classes(attrs: &Attributes, wanted: &[&str]) -> bool {
    attribute_value(attrs, "class")
        .map(|classes| {
            wanted
                .iter()
                .all(|class| classes.split_whitespace().any(|c| c == *class))
        })
        .unwrap_or(false)
}

/// Inner text of a textarea; the newline right after the start tag is not content.
fn textarea_text(inner: &str) -> String {
    let inner = inner
        .strip_prefix("\r\n")
        .or_else(|| inner.strip_prefix('\n'))
        .unwrap_or(inner);
    decode_entities(inner)
}

fn textarea_with_classes(html: &str, classes: &[&str]) -> Option<String> {
    textarea_re().captures_iter(html).find_map(|caps| {
        let attrs = parse_attributes(&caps[1]);
        has_classes(&attrs, classes).then(|| textarea_text(&caps[2]))
    })
}

fn tree_region(html: &str) -> Option<String> {
    for caps in start_tag_re().captures_iter(html) {
        let attrs = parse_attributes(&caps[2]);
        if attribute_value(&attrs, "id") != Some(TREE_ID) {
            continue;
        }
        if let Some(value) = attribute_value(&attrs, "value") {
            return Some(value.to_string());
        }

        let tag = caps[1].to_ascii_lowercase();
        let rest = &html[caps.get(0)?.end()..];
        let close = format!("</{}", tag);
        let end = rest.to_ascii_lowercase().find(&close)?;
        let inner = &rest[..end];
        return Some(if tag == "textarea" {
            textarea_text(inner)
        } else {
            decode_entities(inner)
        });
    }
    None
}

fn ingest_id(html: &str) -> Option<String> {
    start_tag_re().captures_iter(html).find_map(|caps| {
        let attrs = parse_attributes(&caps[2]);
        attribute(&attrs, RESULTS_ATTR)?;
        attribute_value(&attrs, INGEST_ID_ATTR)
            .filter(|id| !id.is_empty())
            .map(ToOwned::to_owned)
    })
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    entity_re()
        .replace_all(text, |caps: &Captures| {
            let entity = &caps[1];
            let decoded = if let Some(hex) = entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = entity.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match entity {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some('\u{a0}'),
                    _ => None,
                }
            };
            decoded
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html>
<html><body>
<div data-results data-ingest-id="abc-123" class="mt-10">
  <textarea class="w-full h-[160px] p-4" readonly>
Repository: cyclotruc/gitingest
Files analyzed: 2</textarea>
  <input type="hidden" id="directory-structure-content" value="Directory structure:&#10;├── a.py&#10;└── b.py">
  <textarea class="result-text w-full" readonly>
================
File: a.py
================
print(&quot;a&quot;) &lt;3 &amp; more</textarea>
</div>
</body></html>"#;

    #[test]
    fn test_parse_full_document() {
        let result = parse_response(&ResponseBody::Document(PAGE.to_string())).unwrap();
        assert_eq!(result.summary, "Repository: cyclotruc/gitingest\nFiles analyzed: 2");
        assert_eq!(result.tree, "Directory structure:\n├── a.py\n└── b.py");
        assert!(result.content.starts_with("================\nFile: a.py"));
        assert!(result.content.ends_with("print(\"a\") <3 & more"));
        assert_eq!(result.ingest_id.as_deref(), Some("abc-123"));
    }

    #[test]
    fn test_missing_summary_is_parse_failure() {
        let html = r#"<html><body><p>Repository not found</p>
<input id="directory-structure-content" value="Directory structure:"></body></html>"#;
        let err = parse_response(&ResponseBody::Document(html.to_string())).unwrap_err();
        assert!(matches!(err, IngestError::ParseFailure(_)));
    }

    #[test]
    fn test_missing_tree_and_content_are_empty() {
        let html = r#"<textarea class="w-full h-[160px]">Summary only</textarea>"#;
        let result = parse_response(&ResponseBody::Document(html.to_string())).unwrap();
        assert_eq!(result.summary, "Summary only");
        assert_eq!(result.tree, "");
        assert_eq!(result.content, "");
        assert_eq!(result.ingest_id, None);
    }

    #[test]
    fn test_tree_region_as_element_text() {
        let html = r#"<textarea class="w-full h-[160px]">s</textarea>
<pre id="directory-structure-content">Directory structure:
└── src/</pre>"#;
        let result = parse_response(&ResponseBody::Document(html.to_string())).unwrap();
        assert_eq!(result.tree, "Directory structure:\n└── src/");
    }

    #[test]
    fn test_class_match_is_whole_token() {
        let html = r#"<textarea class="w-full h-[160px]-wide">nope</textarea>"#;
        assert!(parse_response(&ResponseBody::Document(html.to_string())).is_err());
    }

    #[test]
    fn test_summary_needs_both_classes() {
        let html = r#"<textarea class="h-[160px]">notes</textarea>
<textarea class="p-4 w-full h-[160px]">Repository: a/b</textarea>"#;
        let result = parse_response(&ResponseBody::Document(html.to_string())).unwrap();
        assert_eq!(result.summary, "Repository: a/b");

        let html = r#"<textarea class="h-[160px]">notes</textarea>"#;
        assert!(parse_response(&ResponseBody::Document(html.to_string())).is_err());
    }

    #[test]
    fn test_ingest_id_requires_results_marker() {
        let html = r#"<div data-ingest-id="stray"></div>
<textarea class="w-full h-[160px]">s</textarea>"#;
        let result = parse_response(&ResponseBody::Document(html.to_string())).unwrap();
        assert_eq!(result.ingest_id, None);
    }

    #[test]
    fn test_structured_payload() {
        let body = ResponseBody::from_content_type(
            Some("application/json; charset=utf-8"),
            r#"{"summary":"s","tree":"Directory structure:\n└── a.py","content":"c","ingest_id":"id-1"}"#
                .to_string(),
        );
        assert!(matches!(body, ResponseBody::Structured(_)));

        let result = parse_response(&body).unwrap();
        assert_eq!(result.summary, "s");
        assert_eq!(result.tree, "Directory structure:\n└── a.py");
        assert_eq!(result.content, "c");
        assert_eq!(result.ingest_id.as_deref(), Some("id-1"));
    }

    #[test]
    fn test_structured_payload_without_summary_fails() {
        let body = ResponseBody::Structured(r#"{"tree":"t","content":"c"}"#.to_string());
        assert!(matches!(
            parse_response(&body),
            Err(IngestError::ParseFailure(_))
        ));

        let body = ResponseBody::Structured("not json".to_string());
        assert!(matches!(
            parse_response(&body),
            Err(IngestError::ParseFailure(_))
        ));
    }

    #[test]
    fn test_content_type_selection() {
        assert!(matches!(
            ResponseBody::from_content_type(Some("text/html"), String::new()),
            ResponseBody::Document(_)
        ));
        assert!(matches!(
            ResponseBody::from_content_type(None, String::new()),
            ResponseBody::Document(_)
        ));
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("a &amp; b"), "a & b");
        assert_eq!(decode_entities("&#65;&#x42;"), "AB");
        assert_eq!(decode_entities("&unknown; stays"), "&unknown; stays");
    }
}
