//! In-page search highlighting over rendered HTML.
//!
//! [`highlight`] wraps every case-insensitive, non-overlapping occurrence of a
//! literal search term in a `<mark>` marker carrying its zero-based,
//! document-order index:
//!
//! ```text
//! <mark class="search-highlight" id="match-0" data-match-index="0">Catan</mark>
//! ```
//!
//! # Matching rules
//!
//! - The term is literal. It is escaped with [`regex::escape`] before being
//!   compiled, so `"3."` only ever matches the two characters `3` and `.`.
//! - Only text outside tags is searched. Tag names, attribute names and
//!   attribute values are copied through untouched.
//! - A match never spans two text runs: `Vic<strong>tory</strong>` does not
//!   match `"victory"`.
//! - Character references are matched by what they decode to, and are always
//!   wrapped whole. `Q&amp;A` matches `"q&a"`; `"amp"` matches nothing there.

use regex::{Regex, RegexBuilder};

/// CSS class carried by every marker.
pub const MARKER_CLASS: &str = "search-highlight";
/// Extra class carried by the emphasized marker.
pub const ACTIVE_CLASS: &str = "active";
/// Attribute holding the marker's index.
pub const INDEX_ATTR: &str = "data-match-index";

/// Result of a highlight pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Highlighted {
    pub html: String,
    pub match_count: usize,
}

/// Element id of marker `index`, used as a scroll anchor.
pub fn marker_id(index: usize) -> String {
    format!("match-{}", index)
}

/// Highlight all occurrences of `term` in `html`.
///
/// An empty or whitespace-only term returns the input unchanged with a match
/// count of zero.
pub fn highlight(html: &str, term: &str) -> Highlighted {
    highlight_with_active(html, term, None)
}

/// Like [`highlight`], additionally giving marker `active` the
/// [`ACTIVE_CLASS`] class.
pub fn highlight_with_active(html: &str, term: &str, active: Option<usize>) -> Highlighted {
    let unchanged = || Highlighted {
        html: html.to_string(),
        match_count: 0,
    };

    let Some(pattern) = compile_term(term) else {
        return unchanged();
    };

    let mut out = String::with_capacity(html.len() + 64);
    let mut next_index = 0usize;
    let mut rest = html;

    loop {
        let text_end = rest.find('<').unwrap_or(rest.len());
        next_index = mark_run(&rest[..text_end], &pattern, next_index, active, &mut out);
        rest = &rest[text_end..];
        if rest.is_empty() {
            break;
        }

        let tag_end = rest.find('>').map(|i| i + 1).unwrap_or(rest.len());
        out.push_str(&rest[..tag_end]);
        rest = &rest[tag_end..];
        if rest.is_empty() {
            break;
        }
    }

    Highlighted {
        html: out,
        match_count: next_index,
    }
}

fn compile_term(term: &str) -> Option<Regex> {
    if term.trim().is_empty() {
        return None;
    }
    RegexBuilder::new(&regex::escape(term))
        .case_insensitive(true)
        .build()
        .ok()
}

/// One decoded character and the source bytes it came from.
struct CharSpan {
    decoded: usize,
    src_start: usize,
    src_end: usize,
}

/// Wrap the matches found in a single text run. Returns the next free index.
fn mark_run(
    run: &str,
    pattern: &Regex,
    mut index: usize,
    active: Option<usize>,
    out: &mut String,
) -> usize {
    if run.is_empty() {
        return index;
    }

    let (decoded, spans) = decode_run(run);
    let mut cursor = 0usize;

    for m in pattern.find_iter(&decoded) {
        let first = spans.partition_point(|s| s.decoded < m.start());
        let last = spans.partition_point(|s| s.decoded < m.end());
        if first >= last || last > spans.len() {
            continue;
        }
        let src_start = spans[first].src_start;
        let src_end = spans[last - 1].src_end;

        out.push_str(&run[cursor..src_start]);
        push_marker_open(out, index, active == Some(index));
        out.push_str(&run[src_start..src_end]);
        out.push_str("</mark>");

        cursor = src_end;
        index += 1;
    }

    out.push_str(&run[cursor..]);
    index
}

fn push_marker_open(out: &mut String, index: usize, is_active: bool) {
    out.push_str("<mark class=\"");
    out.push_str(MARKER_CLASS);
    if is_active {
        out.push(' ');
        out.push_str(ACTIVE_CLASS);
    }
    out.push_str("\" id=\"");
    out.push_str(&marker_id(index));
    out.push_str("\" ");
    out.push_str(INDEX_ATTR);
    out.push_str("=\"");
    out.push_str(&index.to_string());
    out.push_str("\">");
}

fn decode_run(run: &str) -> (String, Vec<CharSpan>) {
    let mut decoded = String::with_capacity(run.len());
    let mut spans = Vec::with_capacity(run.len());
    let mut i = 0usize;

    while i < run.len() {
        let rest = &run[i..];
        let (ch, len) = match parse_char_ref(rest) {
            Some(found) => found,
            None => match rest.chars().next() {
                Some(c) => (c, c.len_utf8()),
                None => break,
            },
        };
        spans.push(CharSpan {
            decoded: decoded.len(),
            src_start: i,
            src_end: i + len,
        });
        decoded.push(ch);
        i += len;
    }

    (decoded, spans)
}

/// Longest character reference considered, excluding `&` and `;`.
const MAX_REF_LEN: usize = 32;

/// Parse a character reference at the start of `s`, returning the decoded
/// character and the number of source bytes consumed.
fn parse_char_ref(s: &str) -> Option<(char, usize)> {
    if !s.starts_with('&') {
        return None;
    }
    let semi = s.bytes().skip(1).take(MAX_REF_LEN + 1).position(|b| b == b';')? + 1;
    let name = &s[1..semi];
    if name.is_empty() {
        return None;
    }

    let ch = if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        char::from_u32(code)?
    } else {
        match name {
            "amp" => '&',
            "lt" => '<',
            "gt" => '>',
            "quot" => '"',
            "apos" => '\'',
            "nbsp" => '\u{a0}',
            // Unknown names stay opaque: matchable by nothing, wrapped whole.
            other if other.bytes().all(|b| b.is_ascii_alphanumeric()) => '\u{fffd}',
            _ => return None,
        }
    };

    Some((ch, semi + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quick_xml::events::Event;
    use quick_xml::Reader;

    const SUMMARY_HTML: &str = "<h2>Catan (1995)</h2>\n\
        <p>Trade and build on the island of Catan.</p>\n\
        <h3>GAMEPLAY</h3>\n\
        <ul>\n<li><strong>Roll</strong>: roll 2 dice. On a 7, move the robber.</li>\n\
        <li><a href=\"/rules/catan\" title=\"Catan rules\">Build</a> roads.</li>\n</ul>\n";

    /// Parse `html` as XML and return the marker indices in document order.
    /// Panics if the markup is not well formed.
    fn marker_indices(html: &str) -> Vec<usize> {
        let wrapped = format!("<root>{}</root>", html);
        let mut reader = Reader::from_str(&wrapped);
        let mut indices = Vec::new();
        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) if e.name().as_ref() == b"mark" => {
                    let attr = e
                        .try_get_attribute(INDEX_ATTR)
                        .unwrap()
                        .expect("marker without index");
                    indices.push(attr.unescape_value().unwrap().parse().unwrap());
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => panic!("malformed markup: {} in {}", e, html),
            }
        }
        indices
    }

    #[test]
    fn empty_term_is_identity() {
        for term in ["", "   ", "\t\n"] {
            let out = highlight(SUMMARY_HTML, term);
            assert_eq!(out.html, SUMMARY_HTML);
            assert_eq!(out.match_count, 0);
        }
    }

    #[test]
    fn no_match_leaves_markup_unchanged() {
        let out = highlight(SUMMARY_HTML, "carcassonne");
        assert_eq!(out.match_count, 0);
        assert_eq!(out.html, SUMMARY_HTML);
    }

    #[test]
    fn matches_case_insensitively_in_document_order() {
        let out = highlight(SUMMARY_HTML, "cAtAn");
        // Heading and paragraph; the href and title attribute are skipped.
        assert_eq!(out.match_count, 2);
        assert_eq!(marker_indices(&out.html), vec![0, 1]);
        assert!(out.html.contains(
            "<h2><mark class=\"search-highlight\" id=\"match-0\" data-match-index=\"0\">Catan</mark> (1995)</h2>"
        ));
        assert!(out.html.contains("href=\"/rules/catan\" title=\"Catan rules\""));
    }

    #[test]
    fn indices_are_contiguous_across_runs() {
        let out = highlight(SUMMARY_HTML, "r");
        let indices = marker_indices(&out.html);
        assert_eq!(indices.len(), out.match_count);
        assert_eq!(indices, (0..out.match_count).collect::<Vec<_>>());
    }

    #[test]
    fn metacharacters_match_literally() {
        let html = "<p>Roll 3d6. Take 3. Score 3x.</p>";
        let out = highlight(html, "3.");
        assert_eq!(out.match_count, 1);
        assert!(out.html.contains("Take <mark"));

        assert_eq!(highlight("<p>cost (2)</p>", "(2)").match_count, 1);
        assert_eq!(highlight("<p>a+b a*b</p>", "a*b").match_count, 1);
        assert_eq!(highlight("<p>abc</p>", ".*").match_count, 0);
    }

    #[test]
    fn matches_do_not_overlap() {
        let out = highlight("<p>aaaa</p>", "aa");
        assert_eq!(out.match_count, 2);
        let out = highlight("<p>aaa</p>", "aa");
        assert_eq!(out.match_count, 1);
        assert!(out.html.ends_with("</mark>a</p>"));
    }

    #[test]
    fn match_across_inline_markup_is_not_detected() {
        let out = highlight("<p>Vic<strong>tory</strong> points</p>", "victory");
        assert_eq!(out.match_count, 0);
    }

    #[test]
    fn tag_names_and_attributes_are_never_matched() {
        let html = "<p class=\"strong\"><strong>weak</strong></p>";
        let out = highlight(html, "strong");
        assert_eq!(out.match_count, 0);
        assert_eq!(out.html, html);
    }

    #[test]
    fn character_references_match_by_decoded_text() {
        let out = highlight("<p>Q&amp;A and R&amp;D</p>", "q&a");
        assert_eq!(out.match_count, 1);
        assert!(out.html.contains(">Q&amp;A</mark>"));

        assert_eq!(highlight("<p>Q&amp;A</p>", "amp").match_count, 0);
        assert_eq!(highlight("<p>5 &lt; 7</p>", "<").match_count, 1);
        assert_eq!(highlight("<p>caf&#233;</p>", "café").match_count, 1);
    }

    #[test]
    fn leading_text_without_tags_is_searched() {
        let out = highlight("Robber moves", "robber");
        assert_eq!(out.match_count, 1);
        assert!(out.html.starts_with("<mark"));
    }

    #[test]
    fn active_marker_gets_active_class() {
        let out = highlight_with_active(SUMMARY_HTML, "roll", Some(1));
        assert_eq!(out.match_count, 2);
        assert!(out
            .html
            .contains("class=\"search-highlight active\" id=\"match-1\""));
        assert!(!out
            .html
            .contains("class=\"search-highlight active\" id=\"match-0\""));
    }

    #[test]
    fn rehighlighting_keeps_structure_well_formed() {
        let first = highlight(SUMMARY_HTML, "catan");
        marker_indices(&first.html);

        let second = highlight(&first.html, "an");
        assert!(second.match_count > 0);
        // Parses, and the marker attributes from the first pass are intact.
        marker_indices(&second.html);
        assert!(second.html.contains("data-match-index=\"1\""));

        let third = highlight(&second.html, "mark");
        assert_eq!(third.match_count, 0);
        marker_indices(&third.html);
    }

    #[test]
    fn malformed_references_are_plain_text() {
        let out = highlight("<p>fish & chips &;</p>", "& c");
        assert_eq!(out.match_count, 1);
        marker_indices(&highlight("<p>fish &amp; chips</p>", "chips").html);
    }
}
