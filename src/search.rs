//! In-page search over a rendered summary.
//!
//! The summary page carries its search state in the query string:
//! `q` is the term, `m` the current match index and `last` the term that
//! index belongs to. A request rebuilds a [`SearchNavigator`] from that
//! state, so an edited term starts again at the first match while the same
//! term keeps its position.

use serde::{Deserialize, Serialize};

use rulesheet_core::highlight::{highlight, highlight_with_active, marker_id};
use rulesheet_core::navigator::{next_index, previous_index, SearchNavigator};

/// Search state sent by the summary page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub m: Option<usize>,
    #[serde(default)]
    pub last: Option<String>,
}

/// Highlighted body plus everything needed to draw the search controls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchOutcome {
    pub html: String,
    pub term: String,
    pub match_count: usize,
    pub current: usize,
    /// `"i/N"`, or `"0/0"` without matches.
    pub label: String,
    pub next: usize,
    pub previous: usize,
    /// Scroll anchor of the emphasized marker.
    pub anchor: Option<String>,
}

impl SearchOutcome {
    pub fn is_active(&self) -> bool {
        !self.term.trim().is_empty()
    }
}

/// Highlight `body_html` for the state in `query`.
pub fn search_summary(body_html: &str, query: &SearchQuery) -> SearchOutcome {
    let term = query.q.as_deref().unwrap_or("");
    let last = query.last.as_deref().unwrap_or("");

    let mut nav = SearchNavigator::resume(last, query.m.unwrap_or(0));
    nav.set_term(term);

    let count = highlight(body_html, nav.term()).match_count;
    nav.set_match_count(count);

    let html = match nav.emphasized() {
        Some(active) => highlight_with_active(body_html, nav.term(), Some(active)).html,
        None => body_html.to_string(),
    };

    SearchOutcome {
        html,
        term: nav.term().to_string(),
        match_count: count,
        current: nav.current(),
        label: nav.position_label(),
        next: next_index(nav.current(), count),
        previous: previous_index(nav.current(), count),
        anchor: nav.emphasized().map(marker_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = "<h2>Catan</h2><p>Roll dice. Move the robber. Roll again.</p>";

    fn query(q: &str, m: usize, last: &str) -> SearchQuery {
        SearchQuery {
            q: Some(q.to_string()),
            m: Some(m),
            last: Some(last.to_string()),
        }
    }

    #[test]
    fn no_term_leaves_body_alone() {
        let out = search_summary(BODY, &SearchQuery::default());
        assert_eq!(out.html, BODY);
        assert_eq!(out.label, "0/0");
        assert!(!out.is_active());
        assert!(out.anchor.is_none());
    }

    #[test]
    fn new_term_starts_at_first_match() {
        let out = search_summary(BODY, &query("roll", 1, "rob"));
        assert_eq!(out.match_count, 2);
        assert_eq!(out.current, 0);
        assert_eq!(out.label, "1/2");
        assert_eq!(out.next, 1);
        assert_eq!(out.previous, 1);
        assert_eq!(out.anchor.as_deref(), Some("match-0"));
        assert!(out
            .html
            .contains(r#"<mark class="search-highlight active" id="match-0""#));
    }

    #[test]
    fn same_term_keeps_position() {
        let out = search_summary(BODY, &query("roll", 1, "roll"));
        assert_eq!(out.current, 1);
        assert_eq!(out.label, "2/2");
        assert_eq!(out.next, 0);
        assert!(out
            .html
            .contains(r#"<mark class="search-highlight active" id="match-1""#));
    }

    #[test]
    fn out_of_range_index_is_clamped() {
        let out = search_summary(BODY, &query("robber", 7, "robber"));
        assert_eq!(out.current, 0);
        assert_eq!(out.label, "1/1");
    }

    #[test]
    fn no_matches_reports_zero() {
        let out = search_summary(BODY, &query("meeple", 0, ""));
        assert!(out.is_active());
        assert_eq!(out.match_count, 0);
        assert_eq!(out.label, "0/0");
        assert_eq!(out.html, BODY);
    }
}
