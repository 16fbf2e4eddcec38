/*!
This modules contains the types shared by the public API and both matching
engines: the search [`Input`], byte [`Span`]s and the [`Match`]/[`Captures`]
results.
*/

use std::ops::Range;

/// Defines the input paramter to most matching methods on a [`crate::Regex`].
/// Since all values other than subject have a default value it's always
/// sufficient to only provide the subject string to all matching methods,
/// but for cases where we need more control (when finding all matches for instance)
/// this types come handy.
#[derive(Debug, Clone)]
pub struct Input<'s> {
    /// The subject string against which the regex is matched
    pub subject: &'s str,
    /// Perform the match within that span (but take the surroundings into accounts)
    /// Default: 0..subject.len()
    pub span: Span,
    /// Whenever the match should be anchored at the start of span.
    /// Default: false
    pub anchored: bool,
    /// Whenever the search may stop at the first match found instead of
    /// completing the leftmost-first one. Only useful when the bounds don't
    /// matter, as in [`crate::Regex::is_match`].
    /// Default: false
    pub first_match: bool,
}

impl<'s> Input<'s> {
    pub fn new(subject: &'s str) -> Self {
        Self {
            subject,
            span: (0..subject.len()).into(),
            anchored: false,
            first_match: false,
        }
    }

    pub fn span(mut self, span: impl Into<Span>) -> Self {
        self.span = span.into();
        self
    }

    pub fn anchored(mut self, value: bool) -> Self {
        self.anchored = value;
        self
    }

    pub fn first_match(mut self, value: bool) -> Self {
        self.first_match = value;
        self
    }

    pub fn valid(&self) -> bool {
        self.span.valid()
            && self.subject.is_char_boundary(self.span.from)
            && self.subject.is_char_boundary(self.span.to)
    }
}

impl<'s> From<&'s str> for Input<'s> {
    fn from(subject: &'s str) -> Self {
        Self::new(subject)
    }
}

/// A span in a &str. Similar to [`std::ops::Range`], but implements Copy.
#[derive(Copy, Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub from: usize,
    pub to: usize,
}

impl Span {
    pub fn empty(&self) -> bool {
        self.from == self.to
    }

    pub fn valid(&self) -> bool {
        self.from <= self.to
    }

    pub fn invalid() -> Span {
        Span { from: 1, to: 0 }
    }
}

impl From<Range<usize>> for Span {
    fn from(value: Range<usize>) -> Self {
        Self {
            from: value.start,
            to: value.end,
        }
    }
}

impl From<Span> for Range<usize> {
    fn from(val: Span) -> Self {
        val.from..val.to
    }
}

/// The character ending right before `at`, if any.
pub(crate) fn char_before(subject: &str, at: usize) -> Option<char> {
    subject[..at].chars().next_back()
}

/// The character starting at `at`, if any.
pub(crate) fn char_at(subject: &str, at: usize) -> Option<char> {
    subject[at..].chars().next()
}

/// Successful non-capturing match. Contains only the bounds of the
/// overall match.
#[derive(Copy, Debug, Clone, PartialEq, Eq)]
pub struct Match<'s> {
    pub subject: &'s str,
    pub span: Span,
}

impl<'s> Match<'s> {
    pub fn new(subject: &'s str, span: impl Into<Span>) -> Self {
        let span = span.into();
        Self { subject, span }
    }

    pub fn start(&self) -> usize {
        self.span.from
    }

    pub fn end(&self) -> usize {
        self.span.to
    }

    pub fn range(&self) -> Range<usize> {
        self.span.into()
    }

    pub fn is_empty(&self) -> bool {
        self.span.empty()
    }

    pub fn as_str(&self) -> &'s str {
        &self.subject[self.span.from..self.span.to]
    }

    /// Returns the byte-index where the next non-overlapping
    /// match could start. This take into account empty match.
    pub fn next_match_start(&self) -> usize {
        if self.span.empty() {
            // Must advance to next codepoint otherwise we would always return
            // the same empty match forever.
            match char_at(self.subject, self.span.to) {
                Some(c) => self.span.to + c.len_utf8(),
                // Past the end, so the next search span is invalid
                None => self.span.to + 1,
            }
        } else {
            self.span.to
        }
    }
}

/// Successful capturing match. Contains the bounds (if any) of all capture groups
/// defined in the pattern. In particular this include the implicit capture-group
/// 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captures<'s> {
    subject: &'s str,
    spans: Box<[Span]>,
}

impl<'s> Captures<'s> {
    pub fn new(subject: &'s str, spans: Box<[Span]>) -> Self {
        Self { subject, spans }
    }

    pub fn get(&self, group_index: usize) -> Option<Match<'s>> {
        let span = *self.spans.get(group_index)?;
        if !span.valid() {
            return None;
        }

        Some(Match {
            subject: self.subject,
            span,
        })
    }

    /// The overall match, always set.
    pub fn group0(&self) -> Match<'s> {
        Match::new(self.subject, self.spans[0])
    }

    pub fn start(&self) -> usize {
        self.spans[0].from
    }

    pub fn end(&self) -> usize {
        self.spans[0].to
    }

    /// Number of groups, including group 0.
    pub fn group_len(&self) -> usize {
        self.spans.len()
    }

    /// All groups in order, `None` for those that did not participate.
    pub fn iter(&self) -> impl Iterator<Item = Option<Match<'s>>> + '_ {
        (0..self.group_len()).map(|i| self.get(i))
    }
}
