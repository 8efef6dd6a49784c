//! Match navigation state for the in-page search box.
//!
//! [`SearchNavigator`] owns the current match index and turns user actions
//! (typing, next/previous, Enter, open/close) into [`Effect`]s for the view
//! layer to apply: which marker loses emphasis, which one gains it and is
//! scrolled into view, and when the term field should take focus.
//!
//! The navigator never touches markup itself; marker `i` is the element
//! produced by [`crate::highlight`] with index `i`.

/// A view-side action requested by the navigator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Move input focus to the search term field.
    FocusInput,
    /// Remove emphasis from marker `i`.
    ClearEmphasis(usize),
    /// Emphasize marker `i` and bring it into view.
    Emphasize(usize),
}

/// Keys the search field reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Enter; `reverse` is set when the shift modifier is held.
    Enter { reverse: bool },
    Other,
}

/// Index after `current` with wraparound. `0` when there are no matches.
pub fn next_index(current: usize, match_count: usize) -> usize {
    if match_count == 0 {
        return 0;
    }
    (current + 1) % match_count
}

/// Index before `current` with wraparound. `0` when there are no matches.
pub fn previous_index(current: usize, match_count: usize) -> usize {
    if match_count == 0 {
        return 0;
    }
    (current % match_count + match_count - 1) % match_count
}

/// Search session state for one open view.
#[derive(Debug, Clone, Default)]
pub struct SearchNavigator {
    open: bool,
    term: String,
    match_count: usize,
    current: usize,
    emphasized: Option<usize>,
}

impl SearchNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Navigator for a page that carries its search state in the URL:
    /// open, positioned at `current` for `term`, with no match count yet.
    /// The next [`set_match_count`](Self::set_match_count) clamps the index.
    pub fn resume(term: &str, current: usize) -> Self {
        Self {
            open: true,
            term: term.to_string(),
            match_count: 0,
            current,
            emphasized: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn match_count(&self) -> usize {
        self.match_count
    }

    pub fn current(&self) -> usize {
        self.current
    }

    /// Marker currently emphasized, if any.
    pub fn emphasized(&self) -> Option<usize> {
        self.emphasized
    }

    /// Counter shown next to the field, e.g. `"3/12"`, or `"0/0"`.
    pub fn position_label(&self) -> String {
        if self.match_count == 0 {
            "0/0".to_string()
        } else {
            format!("{}/{}", self.current + 1, self.match_count)
        }
    }

    /// Open the search interface and focus the term field.
    pub fn open(&mut self) -> Vec<Effect> {
        self.open = true;
        vec![Effect::FocusInput]
    }

    /// Close the search interface, discarding the term and all match state.
    pub fn close(&mut self) -> Vec<Effect> {
        self.open = false;
        self.term.clear();
        self.match_count = 0;
        self.current = 0;
        self.emphasized.take().map(Effect::ClearEmphasis).into_iter().collect()
    }

    /// Replace the search term. Any change resets the current index to `0`.
    ///
    /// Returns `true` when the term changed and the caller should re-run the
    /// highlighter and report the new count via [`set_match_count`](Self::set_match_count).
    pub fn set_term(&mut self, term: &str) -> bool {
        if self.term == term {
            return false;
        }
        self.term = term.to_string();
        self.current = 0;
        true
    }

    /// Record a fresh match count after the markup was (re)highlighted.
    ///
    /// The old emphasis is always cleared, since the markers it referred to
    /// were replaced, and the marker at the current index is emphasized.
    pub fn set_match_count(&mut self, match_count: usize) -> Vec<Effect> {
        self.match_count = match_count;
        if self.current >= match_count {
            self.current = 0;
        }
        let mut effects = Vec::with_capacity(2);
        if let Some(old) = self.emphasized.take() {
            effects.push(Effect::ClearEmphasis(old));
        }
        if match_count > 0 {
            self.emphasized = Some(self.current);
            effects.push(Effect::Emphasize(self.current));
        }
        effects
    }

    /// Advance to the next match, wrapping to the first. No-op without matches.
    pub fn go_to_next(&mut self) -> Vec<Effect> {
        if self.match_count == 0 {
            return Vec::new();
        }
        self.move_to(next_index(self.current, self.match_count))
    }

    /// Step back to the previous match, wrapping to the last. No-op without matches.
    pub fn go_to_previous(&mut self) -> Vec<Effect> {
        if self.match_count == 0 {
            return Vec::new();
        }
        self.move_to(previous_index(self.current, self.match_count))
    }

    /// Key handling for the term field: Enter goes forward, shift+Enter back.
    pub fn on_key(&mut self, key: Key) -> Vec<Effect> {
        match key {
            Key::Enter { reverse: false } => self.go_to_next(),
            Key::Enter { reverse: true } => self.go_to_previous(),
            Key::Other => Vec::new(),
        }
    }

    fn move_to(&mut self, index: usize) -> Vec<Effect> {
        self.current = index;
        let mut effects = Vec::with_capacity(2);
        if let Some(old) = self.emphasized.take() {
            if old != index {
                effects.push(Effect::ClearEmphasis(old));
            }
        }
        self.emphasized = Some(index);
        effects.push(Effect::Emphasize(index));
        effects
    }
}
