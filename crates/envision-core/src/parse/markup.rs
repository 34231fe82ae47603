//! Minimal tag scanning for the model's XML-like output dialect.

use regex::Regex;
use rustc_hash::FxHashMap;
use std::sync::OnceLock;

/// One `<name attrs>body</name>` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Element {
    pub attrs: FxHashMap<String, String>,
    pub body: String,
}

fn attr_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"([A-Za-z][\w-]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid regex")
    })
}

fn stray_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<.+?>").expect("valid regex"))
}

/// Element names the response dialects use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tag {
    Summary,
    Intended,
    HighStakes,
    Misuse,
    Stakeholder,
    Direct,
    Indirect,
    Harm,
    Type,
    Severity,
    Explain,
}

impl Tag {
    const COUNT: usize = 11;

    pub(crate) fn name(self) -> &'static str {
        match self {
            Tag::Summary => "summary",
            Tag::Intended => "intended",
            Tag::HighStakes => "highstakes",
            Tag::Misuse => "misuse",
            Tag::Stakeholder => "stakeholder",
            Tag::Direct => "direct",
            Tag::Indirect => "indirect",
            Tag::Harm => "harm",
            Tag::Type => "type",
            Tag::Severity => "severity",
            Tag::Explain => "explain",
        }
    }

    fn regex(self) -> &'static Regex {
        static RE: [OnceLock<Regex>; Tag::COUNT] = [const { OnceLock::new() }; Tag::COUNT];
        RE[self as usize].get_or_init(|| {
            let name = self.name();
            Regex::new(&format!(r"(?is)<{name}((?:\s[^<>]*)?)>(.*?)</{name}\s*>"))
                .expect("valid regex")
        })
    }
}

/// Scans `text` for `<tag ...>...</tag>` elements (case-insensitive), left to right.
/// The first matching closing tag ends an element, so nesting of the same name is not
/// supported.
pub(crate) fn elements(text: &str, tag: Tag) -> Vec<Element> {
    tag.regex()
        .captures_iter(text)
        .map(|caps| {
            let attrs = attr_regex()
                .captures_iter(caps.get(1).map_or("", |m| m.as_str()))
                .filter_map(|a| {
                    let key = a.get(1)?.as_str().to_ascii_lowercase();
                    let value = a.get(2).or_else(|| a.get(3))?.as_str().to_string();
                    Some((key, value))
                })
                .collect();
            Element {
                attrs,
                body: caps.get(2).map_or("", |m| m.as_str()).to_string(),
            }
        })
        .collect()
}

/// Cleaned text of the first `tag` element inside `body`.
pub(crate) fn child_text(body: &str, tag: Tag) -> Option<String> {
    elements(body, tag).first().map(|e| clean_text(&e.body))
}

/// Removes nested tags, decodes entities and trims.
pub(crate) fn clean_text(raw: &str) -> String {
    let stripped = stray_tag_regex().replace_all(raw, "");
    htmlize::unescape(stripped.as_ref()).trim().to_string()
}

/// Extracts the functionality summary from a summary response: the first `<summary>`
/// element when present, the whole trimmed text otherwise.
pub fn parse_summary(response: &str) -> String {
    match elements(response, Tag::Summary).first() {
        Some(e) => clean_text(&e.body),
        None => clean_text(response),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elements_capture_attributes_and_body() {
        let found = elements(
            r#"<stakeholder type="direct" relevance='very relevant'>Nurses</stakeholder>"#,
            Tag::Stakeholder,
        );
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].attrs.get("type").map(String::as_str), Some("direct"));
        assert_eq!(
            found[0].attrs.get("relevance").map(String::as_str),
            Some("very relevant")
        );
        assert_eq!(found[0].body, "Nurses");
    }

    #[test]
    fn similar_tag_names_do_not_collide() {
        let found: Vec<_> = elements("<indirect>A</indirect><direct>B</direct>", Tag::Direct)
            .into_iter()
            .map(|e| e.body)
            .collect();
        assert_eq!(found, vec!["B".to_string()]);
    }

    #[test]
    fn nested_children_are_reachable() {
        let harms = elements(
            "<harm><type>Economic loss</type><explain>x</explain></harm>",
            Tag::Harm,
        );
        assert_eq!(harms.len(), 1);
        assert_eq!(
            child_text(&harms[0].body, Tag::Type).as_deref(),
            Some("Economic loss")
        );
        assert_eq!(child_text(&harms[0].body, Tag::Severity), None);
    }

    #[test]
    fn tag_regexes_are_built_once() {
        assert!(std::ptr::eq(Tag::Harm.regex(), Tag::Harm.regex()));
        assert!(!std::ptr::eq(Tag::Harm.regex(), Tag::Explain.regex()));
        let upper = elements("<HighStakes>Dosage advice</HIGHSTAKES>", Tag::HighStakes);
        assert_eq!(upper.len(), 1);
        assert_eq!(upper[0].body, "Dosage advice");
    }

    #[test]
    fn clean_text_strips_tags_and_entities() {
        assert_eq!(clean_text(" <b>Fish &amp; chips</b> "), "Fish & chips");
    }

    #[test]
    fn summary_falls_back_to_raw_text() {
        assert_eq!(parse_summary("<summary> Triage </summary>"), "Triage");
        assert_eq!(parse_summary("  Triage patients\n"), "Triage patients");
    }
}
