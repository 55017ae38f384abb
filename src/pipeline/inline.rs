//! Inline normalisation: wiki inline markup → LaTeX text commands.
//!
//! ## Rule Order
//!
//! Rules must run in this order. Bold (`'''`) is matched before italic
//! (`''`) so a triple quote is never half-consumed as a double quote, and
//! entities are decoded last so a literal `&lt;sub&gt;` written by an author
//! does not turn into a subscript.
//!
//! 1. `<br>` → `", "` (joins multi-line enumerations onto one line)
//! 2. `'''X'''` → `\textbf{X}`
//! 3. `''X''` → `\textit{X}`
//! 4. `<sub>X</sub>` / `<sup>X</sup>` → `\textsubscript{X}` / `\textsuperscript{X}`
//! 5. HTML entities → literal characters
//!
//! Each rule is a single non-recursive substitution pass; nested emphasis is
//! not re-scanned.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all inline rules to one text run.
pub fn normalize(input: &str) -> String {
    let s = replace_line_breaks(input);
    let s = replace_bold(&s);
    let s = replace_italic(&s);
    let s = replace_sub_sup(&s);
    decode_entities(&s)
}

// ── Rule 1: Line breaks ──────────────────────────────────────────────────────

static RE_BR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<\s*br\s*/?\s*>").unwrap());

fn replace_line_breaks(input: &str) -> String {
    RE_BR.replace_all(input, ", ").into_owned()
}

// ── Rule 2: Bold ─────────────────────────────────────────────────────────────

static RE_BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"'''(.*?)'''").unwrap());

fn replace_bold(input: &str) -> String {
    RE_BOLD.replace_all(input, r"\textbf{${1}}").into_owned()
}

// ── Rule 3: Italic ───────────────────────────────────────────────────────────

static RE_ITALIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"''(.*?)''").unwrap());

fn replace_italic(input: &str) -> String {
    RE_ITALIC.replace_all(input, r"\textit{${1}}").into_owned()
}

// ── Rule 4: Subscript / superscript ──────────────────────────────────────────

static RE_SUB: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<\s*sub\s*>(.*?)<\s*/\s*sub\s*>").unwrap());
static RE_SUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<\s*sup\s*>(.*?)<\s*/\s*sup\s*>").unwrap());

fn replace_sub_sup(input: &str) -> String {
    let s = RE_SUB.replace_all(input, r"\textsubscript{${1}}");
    RE_SUP
        .replace_all(&s, r"\textsuperscript{${1}}")
        .into_owned()
}

// ── Rule 5: HTML entities ────────────────────────────────────────────────────

/// Longest entity name we try to resolve (`&CounterClockwiseContourIntegral;`).
const MAX_ENTITY_LEN: usize = 40;

/// Entities HTML also accepts without the closing `;` (the Latin-1 set).
const LEGACY_ENTITIES: &[&str] = &[
    "AElig", "AMP", "Aacute", "Acirc", "Agrave", "Aring", "Atilde", "Auml", "COPY", "Ccedil",
    "ETH", "Eacute", "Ecirc", "Egrave", "Euml", "GT", "Iacute", "Icirc", "Igrave", "Iuml", "LT",
    "Ntilde", "Oacute", "Ocirc", "Ograve", "Oslash", "Otilde", "Ouml", "QUOT", "REG", "THORN",
    "Uacute", "Ucirc", "Ugrave", "Uuml", "Yacute", "aacute", "acirc", "acute", "aelig", "agrave",
    "amp", "aring", "atilde", "auml", "brvbar", "ccedil", "cedil", "cent", "copy", "curren",
    "deg", "divide", "eacute", "ecirc", "egrave", "eth", "euml", "frac12", "frac14", "frac34",
    "gt", "iacute", "icirc", "iexcl", "igrave", "iquest", "iuml", "laquo", "lt", "macr", "micro",
    "middot", "nbsp", "not", "ntilde", "oacute", "ocirc", "ograve", "ordf", "ordm", "oslash",
    "otilde", "ouml", "para", "plusmn", "pound", "quot", "raquo", "reg", "sect", "shy", "sup1",
    "sup2", "sup3", "szlig", "thorn", "times", "uacute", "ucirc", "ugrave", "uml", "uuml",
    "yacute", "yen", "yuml",
];

/// Decode named and numeric HTML entities; anything unrecognised (a bare
/// `&`, an unknown name) is copied through unchanged.
///
/// Latin-1 names are also decoded without their `;` (`&amp` → `&`), longest
/// name first, the way browsers read legacy markup.
fn decode_entities(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let candidate = &rest[amp..];
        let decoded = entity_len(candidate)
            .and_then(|len| decode_entity(&candidate[..len]).map(|s| (len, s)))
            .or_else(|| legacy_entity(candidate));
        match decoded {
            Some((len, text)) => {
                out.push_str(&text);
                rest = &candidate[len..];
            }
            None => {
                out.push('&');
                rest = &candidate[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Resolve one complete `&name;` / `&#N;` / `&#xN;` reference.
pub(crate) fn decode_entity(entity: &str) -> Option<String> {
    let decoded = html_escape::decode_html_entities(entity);
    (decoded != entity).then(|| decoded.into_owned())
}

/// Longest legacy name directly after the `&` at the start of `s`.
fn legacy_entity(s: &str) -> Option<(usize, String)> {
    let body = s.get(1..)?;
    let name = LEGACY_ENTITIES
        .iter()
        .filter(|name| body.starts_with(*name))
        .max_by_key(|name| name.len())?;
    let text = decode_entity(&format!("&{};", name))?;
    Some((name.len() + 1, text))
}

/// Byte length of `&name;` at the start of `s`, if it is shaped like an entity.
fn entity_len(s: &str) -> Option<usize> {
    let body = s.get(1..)?;
    let end = body
        .char_indices()
        .take(MAX_ENTITY_LEN)
        .find(|&(_, c)| !(c.is_ascii_alphanumeric() || c == '#'))
        .filter(|&(_, c)| c == ';')
        .map(|(i, _)| i)?;
    (end > 0).then_some(end + 2)
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bold() {
        assert_eq!(normalize("'''Beta'''"), r"\textbf{Beta}");
    }

    #[test]
    fn test_italic() {
        assert_eq!(normalize("''x'' and ''y''"), r"\textit{x} and \textit{y}");
    }

    #[test]
    fn test_bold_before_italic() {
        assert_eq!(normalize("'''a''' ''b''"), r"\textbf{a} \textit{b}");
    }

    #[test]
    fn test_bold_is_not_recursive() {
        // The inner double quotes are rewritten by the italic pass, not re-bolded.
        assert_eq!(normalize("'''''x'''''"), r"\textbf{\textit{x}}");
    }

    #[test]
    fn test_line_breaks() {
        assert_eq!(normalize("a<br>b<BR/>c<br />d"), "a, b, c, d");
    }

    #[test]
    fn test_sub_sup() {
        assert_eq!(
            normalize("x<sub>i</sub><SUP >2</ sup>"),
            r"x\textsubscript{i}\textsuperscript{2}"
        );
    }

    #[test]
    fn test_entities() {
        assert_eq!(normalize("&mu; &gt; 0 &#8722;1 &#x3C3;"), "μ > 0 −1 σ");
        assert_eq!(normalize("&nbsp;"), "\u{a0}");
        assert_eq!(normalize("&minus;&le;"), "−≤");
    }

    #[test]
    fn test_greek_entities() {
        assert_eq!(
            normalize("&alpha; &beta; &lambda; &theta; &nu; &sigma; &pi;"),
            "α β λ θ ν σ π"
        );
        assert_eq!(normalize("&Gamma;(&alpha;)"), "Γ(α)");
    }

    #[test]
    fn test_legacy_entities_without_semicolon() {
        assert_eq!(normalize("a &amp b &lt c"), "a & b < c");
        assert_eq!(normalize("&copy2024"), "©2024");
        // Longest legacy name wins.
        assert_eq!(normalize("&notin"), "¬in");
        assert_eq!(normalize("&notin;"), "∉");
        // Only Latin-1 names are legacy.
        assert_eq!(normalize("&mu"), "&mu");
    }

    #[test]
    fn test_entities_decoded_after_tags() {
        // An escaped tag written by the author stays literal text.
        assert_eq!(normalize("&lt;sub&gt;1&lt;/sub&gt;"), "<sub>1</sub>");
    }

    #[test]
    fn test_bare_ampersand_untouched() {
        assert_eq!(normalize("a & b &unknownthing; &;"), "a & b &unknownthing; &;");
    }

    #[test]
    fn test_unicode_passthrough() {
        assert_eq!(normalize("'''μ'''"), r"\textbf{μ}");
    }

    #[test]
    fn test_entity_len() {
        assert_eq!(entity_len("&amp; rest"), Some(5));
        assert_eq!(entity_len("&#8722;"), Some(7));
        assert_eq!(entity_len("& amp;"), None);
        assert_eq!(entity_len("&;"), None);
        assert_eq!(entity_len("&"), None);
    }
}
