//! First-kilobyte content-type sniffing. Deliberately cheap: no charset
//! detection, no magic-byte tables, just the signals the pipeline needs
//! to decide whether cleaning applies.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectedType {
    Html,
    Json,
    Xml,
    PlainText,
}

impl DetectedType {
    pub fn mime_type(&self) -> &'static str {
        match self {
            DetectedType::Html => "text/html",
            DetectedType::Json => "application/json",
            DetectedType::Xml => "application/xml",
            DetectedType::PlainText => "text/plain",
        }
    }
}

const SNIFF_WINDOW: usize = 1024;

pub fn detect_content_type(body: &[u8]) -> DetectedType {
    let window = &body[..body.len().min(SNIFF_WINDOW)];
    let text = String::from_utf8_lossy(window);
    let trimmed = text.trim_start();
    let lower = trimmed.to_ascii_lowercase();

    if lower.starts_with("<?xml") {
        return DetectedType::Xml;
    }
    if looks_like_html(&lower) {
        return DetectedType::Html;
    }
    if serde_json::from_str::<serde_json::Value>(trimmed).is_ok() {
        return DetectedType::Json;
    }
    if trimmed.starts_with('<') {
        return DetectedType::Xml;
    }
    DetectedType::PlainText
}

fn looks_like_html(lower: &str) -> bool {
    const TAGS: &[&str] = &["<!doctype html", "<html", "<head", "<body", "<div", "<script", "<title"];
    TAGS.iter().any(|tag| lower.contains(tag))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_html_via_doctype() {
        assert_eq!(detect_content_type(b"<!DOCTYPE html><html><body>hi</body></html>"), DetectedType::Html);
    }

    #[test]
    fn detects_json_object() {
        assert_eq!(detect_content_type(br#"{"a": 1}"#), DetectedType::Json);
    }

    #[test]
    fn detects_xml_declaration() {
        assert_eq!(detect_content_type(b"<?xml version=\"1.0\"?><root/>"), DetectedType::Xml);
    }

    #[test]
    fn falls_back_to_plain_text() {
        assert_eq!(detect_content_type(b"just some words"), DetectedType::PlainText);
    }

    #[test]
    fn bare_angle_bracket_without_html_tags_is_xml() {
        assert_eq!(detect_content_type(b"<root><item/></root>"), DetectedType::Xml);
    }
}
