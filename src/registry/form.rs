//! Registry form page scraping and form encoding
//!
//! The registry renders each data-entry form as plain HTML. Saving means
//! replaying the page's hidden fields with a fresh CSRF token, so these
//! helpers pull input values out of the document and build the
//! `application/x-www-form-urlencoded` body.

use regex::Regex;

/// Name of the anti-forgery field on every form page
pub const CSRF_FIELD: &str = "redcap_csrf_token";

lazy_static::lazy_static! {
    static ref INPUT_TAG_RE: Regex = Regex::new(r"(?is)<input\b[^>]*>").unwrap();
    static ref HIDDEN_TYPE_RE: Regex = Regex::new(r#"(?i)\stype\s*=\s*["']hidden["']"#).unwrap();
    static ref NAME_ATTR_RE: Regex = Regex::new(r#"(?i)\sname\s*=\s*["']([^"']+)["']"#).unwrap();
    static ref VALUE_ATTR_RE: Regex = Regex::new(r#"(?i)\svalue\s*=\s*["']([^"']*)["']"#).unwrap();
    static ref CSRF_RE: Regex =
        Regex::new(r#"redcap_csrf_token[^>]*value\s*=\s*["']([^"']+)["']"#).unwrap();
}

/// One `<input>` element reduced to name/value
#[derive(Debug, Clone, PartialEq, Eq)]
struct InputTag {
    name: String,
    value: String,
    hidden: bool,
}

fn input_tags(html: &str) -> impl Iterator<Item = InputTag> + '_ {
    INPUT_TAG_RE.find_iter(html).filter_map(|m| {
        let tag = m.as_str();
        let name = NAME_ATTR_RE.captures(tag)?.get(1)?.as_str().to_string();
        let value = VALUE_ATTR_RE
            .captures(tag)
            .and_then(|c| c.get(1))
            .map(|v| decode_entities(v.as_str()))
            .unwrap_or_default();
        Some(InputTag {
            name,
            value,
            hidden: HIDDEN_TYPE_RE.is_match(tag),
        })
    })
}

/// Value of the first input with the given name
pub fn input_value(html: &str, name: &str) -> Option<String> {
    input_tags(html).find(|t| t.name == name).map(|t| t.value)
}

/// Non-empty value of the first input with the given name
pub fn non_empty_input(html: &str, name: &str) -> Option<String> {
    input_value(html, name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// CSRF token of a form page
pub fn csrf_token(html: &str) -> Option<String> {
    CSRF_RE
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| decode_entities(m.as_str()))
}

/// All hidden inputs in document order; a repeated name keeps the last value
pub fn hidden_fields(html: &str) -> Vec<(String, String)> {
    let mut fields: Vec<(String, String)> = Vec::new();
    for tag in input_tags(html).filter(|t| t.hidden) {
        match fields.iter_mut().find(|(name, _)| *name == tag.name) {
            Some(existing) => existing.1 = tag.value,
            None => fields.push((tag.name, tag.value)),
        }
    }
    fields
}

/// Encode ordered pairs as a form body
pub fn encode_form<K: AsRef<str>, V: AsRef<str>>(pairs: &[(K, V)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| {
            format!(
                "{}={}",
                urlencoding::encode(k.as_ref()),
                urlencoding::encode(v.as_ref())
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn decode_entities(value: &str) -> String {
    value
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#039;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
<form id="form" method="post">
  <input type="hidden" name="redcap_csrf_token" value="tok-123">
  <input type='hidden' name='record_id' value='100'>
  <input type="hidden" value="A &amp; B" name="notes_hidden">
  <input type="hidden" name="image_needle_saved" value="">
  <input type="text" name="needle_measurement" value="4.2">
  <input name="procedure_date" type="text" value="01-15-2024"/>
  <INPUT TYPE="HIDDEN" NAME="empty_one">
</form>"#;

    #[test]
    fn test_csrf_token() {
        assert_eq!(csrf_token(PAGE), Some("tok-123".to_string()));
        assert_eq!(csrf_token("<html></html>"), None);
    }

    #[test]
    fn test_hidden_fields_in_order() {
        let fields = hidden_fields(PAGE);
        let names: Vec<&str> = fields.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            vec!["redcap_csrf_token", "record_id", "notes_hidden", "image_needle_saved", "empty_one"]
        );
        assert_eq!(fields[2].1, "A & B");
        assert_eq!(fields[4].1, "");
    }

    #[test]
    fn test_input_value_any_type() {
        assert_eq!(input_value(PAGE, "procedure_date"), Some("01-15-2024".to_string()));
        assert_eq!(non_empty_input(PAGE, "needle_measurement"), Some("4.2".to_string()));
        assert_eq!(non_empty_input(PAGE, "image_needle_saved"), None);
        assert_eq!(input_value(PAGE, "missing"), None);
    }

    #[test]
    fn test_encode_form() {
        let body = encode_form(&[("a b", "x&y"), ("submit", "Save & Exit Record")]);
        assert_eq!(body, "a%20b=x%26y&submit=Save%20%26%20Exit%20Record");
    }
}
