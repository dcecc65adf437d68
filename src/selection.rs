//! Keyboard highlight model over the suggestion rows.
//!
//! Rows are addressed with the widget's integer convention: `-1` is nothing
//! highlighted, `0` is the summary row, `1..=N` are suggestions. Slot `0`
//! is skipped when the response has no summary row.

/// Which row, if any, is highlighted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Highlight {
    #[default]
    None,
    Summary,
    /// Zero-based index into the suggestion list.
    Suggestion(usize),
}

/// The shape of the currently shown rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rows {
    pub suggestions: usize,
    pub has_summary: bool,
}

impl Rows {
    /// Largest valid highlight index (`-1` when there are no rows).
    pub fn max_index(&self) -> i64 {
        if self.suggestions > 0 {
            self.suggestions as i64
        } else if self.has_summary {
            0
        } else {
            -1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.suggestions == 0 && !self.has_summary
    }
}

impl Highlight {
    /// The integer form: `-1`, `0` for the summary, `i + 1` for suggestion `i`.
    pub fn index(self) -> i64 {
        match self {
            Self::None => -1,
            Self::Summary => 0,
            Self::Suggestion(i) => i as i64 + 1,
        }
    }

    fn from_index(index: i64, rows: Rows) -> Self {
        match index {
            i if i < 0 => Self::None,
            0 if rows.has_summary => Self::Summary,
            0 => Self::None,
            i => Self::Suggestion((i - 1) as usize),
        }
    }

    /// Move down one row, stopping at the last row.
    pub fn down(self, rows: Rows) -> Self {
        let mut next = self.index() + 1;
        if next == 0 && !rows.has_summary {
            next = 1;
        }
        Self::from_index(next.min(rows.max_index()), rows)
    }

    /// Move up one row, stopping at "nothing highlighted".
    pub fn up(self, rows: Rows) -> Self {
        let mut next = self.index() - 1;
        if next == 0 && !rows.has_summary {
            next = -1;
        }
        Self::from_index(next.max(-1).min(rows.max_index()), rows)
    }

    /// Re-bound a highlight after the row set changed underneath it.
    pub fn clamped(self, rows: Rows) -> Self {
        Self::from_index(self.index().min(rows.max_index()), rows)
    }
}

/// Replace the last word of `query` with `text` and leave the cursor after
/// a trailing space, ready for the next word.
pub fn merge_last_word(query: &str, text: &str) -> String {
    let head = match query.rfind(char::is_whitespace) {
        Some(pos) => {
            let ws_len = query[pos..].chars().next().map_or(1, char::len_utf8);
            &query[..pos + ws_len]
        }
        None => "",
    };
    format!("{head}{} ", text.trim())
}
