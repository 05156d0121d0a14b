//! Message markup
//!
//! Messages are plain text with inline elements written as tags, for example
//! `<at id="42"/>` or `<image url="..."/>`. Literal `<`, `>`, `&` and `"`
//! are entity-escaped.

use once_cell::sync::Lazy;
use regex::Regex;

static ELEMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"</?([A-Za-z][\w:-]*)(?:\s[^>]*)?/?>"#).expect("element pattern"));

/// One piece of a parsed message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Escaped text
    Text(String),
    Element { name: String, raw: String },
}

impl Segment {
    pub fn to_markup(&self) -> &str {
        match self {
            Segment::Text(text) => text,
            Segment::Element { raw, .. } => raw,
        }
    }
}

/// Split a message into text and element segments
pub fn parse(source: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut last = 0;
    for capture in ELEMENT_RE.captures_iter(source) {
        let Some(whole) = capture.get(0) else {
            continue;
        };
        if whole.start() > last {
            segments.push(Segment::Text(source[last..whole.start()].to_string()));
        }
        segments.push(Segment::Element {
            name: capture[1].to_ascii_lowercase(),
            raw: whole.as_str().to_string(),
        });
        last = whole.end();
    }
    if last < source.len() {
        segments.push(Segment::Text(source[last..].to_string()));
    }
    segments
}

/// Whether the message has an element whose name is not in `allowed`
pub fn has_element_except(source: &str, allowed: &[&str]) -> bool {
    parse(source).iter().any(|segment| match segment {
        Segment::Element { name, .. } => !allowed.contains(&name.as_str()),
        Segment::Text(_) => false,
    })
}

pub fn escape(source: &str) -> String {
    source
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub fn unescape(source: &str) -> String {
    source
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#91;", "[")
        .replace("&#93;", "]")
        .replace("&amp;", "&")
}

pub fn at_user(id: &str) -> String {
    format!("<at id=\"{}\"/>", escape(id))
}

pub fn at_all() -> String {
    "<at type=\"all\"/>".to_string()
}

/// Replace image elements by a short marker for listings
pub fn summarize_images(source: &str) -> String {
    parse(source)
        .iter()
        .map(|segment| match segment {
            Segment::Element { name, .. } if name == "image" || name == "img" => "[image]",
            other => other.to_markup(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mixed_content() {
        let segments = parse("hi <at id=\"1\"/> there<face id=\"2\"/>");
        assert_eq!(segments.len(), 4);
        assert_eq!(segments[0], Segment::Text("hi ".into()));
        assert!(matches!(&segments[1], Segment::Element { name, .. } if name == "at"));
        assert!(matches!(&segments[3], Segment::Element { name, .. } if name == "face"));
    }

    #[test]
    fn test_element_detection() {
        assert!(has_element_except("foo<image url=\"x\"/>", &["face"]));
        assert!(!has_element_except("foo<face id=\"1\"/>", &["face"]));
        assert!(!has_element_except("a < b", &["face"]));
    }

    #[test]
    fn test_escape_round_trip() {
        let raw = "<a & \"b\">";
        assert_eq!(unescape(&escape(raw)), raw);
        assert_eq!(unescape("&#91;x&#93;"), "[x]");
    }

    #[test]
    fn test_summarize_images() {
        assert_eq!(
            summarize_images("look <image url=\"http://x\"/>!"),
            "look [image]!"
        );
    }
}
