//! Cleaning of free text coming from the listing source.
//!
//! Two flavours share one core: [`strip_markup`] removes tags, decodes
//! entities and normalises whitespace; [`clean_for_storage`] additionally
//! replaces every character outside the storable allow-list with a space.
//! Neither ever fails. Input that had to be patched up (NUL bytes or
//! replacement characters left over from a bad upstream decode) comes back
//! as [`Sanitized::Lossy`] so the caller can log it.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// A word directly followed by `>` is an opening tag that lost its `<`.
static BROKEN_OPEN_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\w+)>").unwrap());
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(?:#([0-9]{1,7})|#[xX]([0-9a-fA-F]{1,6})|(nbsp|amp|lt|gt|quot|apos));").unwrap()
});

/// Punctuation kept by [`clean_for_storage`] in addition to word characters
/// and whitespace.
const STORABLE_PUNCTUATION: &str = ".,-+!?:;()\"'/\\@#$&*=[]{}<>|~`";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sanitized {
    Clean(String),
    Lossy(String),
}

impl Sanitized {
    pub fn text(&self) -> &str {
        match self {
            Sanitized::Clean(t) | Sanitized::Lossy(t) => t,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Sanitized::Clean(t) | Sanitized::Lossy(t) => t,
        }
    }

    pub fn is_lossy(&self) -> bool {
        matches!(self, Sanitized::Lossy(_))
    }
}

/// Strip markup and entities, collapse whitespace, cap at `max_chars`.
pub fn strip_markup(input: &str, max_chars: usize) -> Sanitized {
    let (text, lossy) = replace_unstorable(input);
    let text = strip_to_fixpoint(text);
    finish(&text, max_chars, lossy)
}

/// [`strip_markup`] plus the character allow-list applied before storage.
pub fn clean_for_storage(input: &str, max_chars: usize) -> Sanitized {
    let (text, lossy) = replace_unstorable(input);
    let text = strip_to_fixpoint(text);
    let filtered: String = text
        .chars()
        .map(|c| if is_storable(c) { c } else { ' ' })
        .collect();
    finish(&filtered, max_chars, lossy)
}

fn is_storable(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c.is_whitespace() || STORABLE_PUNCTUATION.contains(c)
}

/// Postgres text cannot hold NUL, and U+FFFD marks bytes that were already
/// lost upstream. Both become spaces.
fn replace_unstorable(input: &str) -> (String, bool) {
    if !input.contains(['\0', '\u{FFFD}']) {
        return (input.to_string(), false);
    }
    (input.replace(['\0', '\u{FFFD}'], " "), true)
}

/// Repair, strip and decode until nothing changes.
///
/// Decoding `&lt;b&gt;` yields a fresh tag, so a single pass is not enough
/// for the output to be tag-free. Every pass that changes anything makes
/// the text strictly shorter, so the loop terminates.
fn strip_to_fixpoint(mut text: String) -> String {
    loop {
        let repaired = BROKEN_OPEN_TAG.replace_all(&text, "<${1}>");
        let stripped = TAG.replace_all(&repaired, "");
        let decoded = decode_entities(&stripped);
        if decoded == text {
            return text;
        }
        text = decoded;
    }
}

fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures| {
            if let Some(name) = caps.get(3) {
                let literal = match name.as_str() {
                    "nbsp" => " ",
                    "amp" => "&",
                    "lt" => "<",
                    "gt" => ">",
                    "quot" => "\"",
                    _ => "'",
                };
                return literal.to_string();
            }
            let code = match (caps.get(1), caps.get(2)) {
                (Some(dec), _) => dec.as_str().parse::<u32>().ok(),
                (None, Some(hex)) => u32::from_str_radix(hex.as_str(), 16).ok(),
                _ => None,
            };
            match code.and_then(char::from_u32) {
                Some(c) if !c.is_control() && c != '\u{FFFD}' => c.to_string(),
                _ => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn finish(text: &str, max_chars: usize, lossy: bool) -> Sanitized {
    let collapsed = WHITESPACE.replace_all(text, " ");
    let out = truncate_chars(collapsed.trim(), max_chars).trim_end().to_string();
    if lossy {
        Sanitized::Lossy(out)
    } else {
        Sanitized::Clean(out)
    }
}

/// Longest prefix of `s` holding at most `max_chars` characters.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
