//! Body formatting helpers: newline auto-formatting for html renderings and
//! tag stripping for plaintext alternatives.

use std::sync::OnceLock;

use regex::Regex;

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").expect("tag regex"))
}

fn br_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<br\s*/?>").expect("br regex"))
}

fn blank_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{3,}").expect("blank run regex"))
}

/// Paragraph/line-break conversion applied to html bodies unless the
/// template disables auto-formatting: blank-line separated blocks become
/// `<p>` elements, single newlines become `<br />`.
pub fn auto_format_html(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n");
    normalized
        .split("\n\n")
        .filter(|block| !block.trim().is_empty())
        .map(|block| format!("<p>{}</p>", block.trim_end().replace('\n', "<br />")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Derive a plaintext rendering from html: line breaks and paragraph ends
/// become newlines, every other tag is removed, common entities decoded.
pub fn strip_html(html: &str) -> String {
    let with_breaks = br_re().replace_all(html, "\n");
    let with_paragraphs = with_breaks.replace("</p>", "\n\n").replace("</tr>", "\n");
    let stripped = tag_re().replace_all(&with_paragraphs, "");
    let decoded = stripped
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#039;", "'");
    blank_run_re()
        .replace_all(&decoded, "\n\n")
        .trim()
        .to_string()
}
