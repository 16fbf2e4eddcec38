//! Abstract syntax tree produced by the parser.

/// Zero-width position assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Start,
    End,
}

/// A set of characters, kept as sorted, non-overlapping and non-adjacent
/// inclusive ranges.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClassSet {
    ranges: Vec<(char, char)>,
}

fn next_char(c: char) -> Option<char> {
    match c as u32 {
        0xD7FF => Some('\u{E000}'),
        _ => char::from_u32(c as u32 + 1),
    }
}

fn prev_char(c: char) -> Option<char> {
    match c as u32 {
        0 => None,
        0xE000 => Some('\u{D7FF}'),
        v => char::from_u32(v - 1),
    }
}

impl ClassSet {
    /// Builds a canonical set out of arbitrary (possibly overlapping) ranges.
    pub fn new(ranges: impl IntoIterator<Item = (char, char)>) -> Self {
        let mut ranges: Vec<_> = ranges.into_iter().collect();
        ranges.sort_unstable();
        let mut merged: Vec<(char, char)> = Vec::with_capacity(ranges.len());
        for (lo, hi) in ranges {
            match merged.last_mut() {
                Some(last) if next_char(last.1).is_none_or(|next| lo <= next) => {
                    if hi > last.1 {
                        last.1 = hi;
                    }
                }
                _ => merged.push((lo, hi)),
            }
        }
        Self { ranges: merged }
    }

    pub fn ranges(&self) -> &[(char, char)] {
        &self.ranges
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn contains(&self, c: char) -> bool {
        class_contains(&self.ranges, c)
    }

    /// The complement over every scalar value.
    pub fn negate(&self) -> Self {
        let mut ranges = Vec::with_capacity(self.ranges.len() + 1);
        let mut start = Some('\0');
        for &(lo, hi) in &self.ranges {
            if let Some(s) = start {
                if s < lo {
                    if let Some(end) = prev_char(lo) {
                        ranges.push((s, end));
                    }
                }
            }
            start = next_char(hi);
        }
        if let Some(s) = start {
            ranges.push((s, char::MAX));
        }
        Self { ranges }
    }

    /// Adds the other ASCII case of every ASCII letter in the set.
    pub fn fold_ascii_case(&self) -> Self {
        let mut extra = Vec::new();
        for &(lo, hi) in &self.ranges {
            for (from, to, delta) in [('a', 'z', -32i32), ('A', 'Z', 32i32)] {
                let lo = lo.max(from);
                let hi = hi.min(to);
                if lo <= hi {
                    let shift = |c: char| char::from_u32((c as i32 + delta) as u32).unwrap_or(c);
                    extra.push((shift(lo), shift(hi)));
                }
            }
        }
        if extra.is_empty() {
            return self.clone();
        }
        Self::new(self.ranges.iter().copied().chain(extra))
    }
}

/// Membership test over canonical ranges.
pub(crate) fn class_contains(ranges: &[(char, char)], c: char) -> bool {
    ranges
        .binary_search_by(|&(lo, hi)| {
            if hi < c {
                std::cmp::Ordering::Less
            } else if lo > c {
                std::cmp::Ordering::Greater
            } else {
                std::cmp::Ordering::Equal
            }
        })
        .is_ok()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Literal(char),
    AnyChar,
    CharClass {
        set: ClassSet,
        negated: bool,
    },
    Concat(Vec<Node>),
    Alternate(Vec<Node>),
    Repeat {
        child: Box<Node>,
        min: u32,
        max: Option<u32>,
        greedy: bool,
    },
    Group {
        child: Box<Node>,
        capture_index: Option<usize>,
    },
    Anchor(Anchor),
}

impl Node {
    /// The node that matches only the empty string.
    pub fn empty() -> Node {
        Node::Concat(Vec::new())
    }

    /// Whether this node can succeed without consuming input.
    pub fn is_nullable(&self) -> bool {
        match self {
            Node::Literal(_) | Node::AnyChar | Node::CharClass { .. } => false,
            Node::Anchor(_) => true,
            Node::Concat(nodes) => nodes.iter().all(Node::is_nullable),
            Node::Alternate(nodes) => nodes.iter().any(Node::is_nullable),
            Node::Repeat { child, min, .. } => *min == 0 || child.is_nullable(),
            Node::Group { child, .. } => child.is_nullable(),
        }
    }
}

/// The parser's result: the root node plus the number of capturing groups
/// (not counting the implicit whole-match group).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxTree {
    pub root: Node,
    pub capture_count: usize,
}
