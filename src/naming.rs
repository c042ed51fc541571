//! Column-naming policy and candidate-name expansion.

use crate::schema::Field;

/// Naming conventions that may derive acceptable source-column spellings for
/// a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Convention {
    /// The declared spelling, compared exactly.
    Original,
    /// The declared spelling, compared ascii-case-insensitively.
    IgnoreCase,
    /// `user_id` for a field declared `UserId`.
    Snake,
    /// `userId` for a field declared `user_id`.
    Camel,
    /// `UserId` for a field declared `user_id`.
    Pascal,
}

impl Convention {
    /// Every convention, in expansion order.
    pub const ALL: [Convention; 5] = [
        Convention::Original,
        Convention::IgnoreCase,
        Convention::Snake,
        Convention::Camel,
        Convention::Pascal,
    ];

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

/// Set of enabled conventions plus override behavior.
///
/// An empty set leaves a field without explicit source names unmatchable;
/// that field resolves to absent, which is accepted behavior rather than an
/// error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NamingPolicy {
    conventions: u8,
    apply_on_overridden: bool,
}

impl NamingPolicy {
    /// Policy with no conventions enabled.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            conventions: 0,
            apply_on_overridden: false,
        }
    }

    /// Policy enabling the given conventions.
    #[must_use]
    pub fn new<I>(conventions: I) -> Self
    where
        I: IntoIterator<Item = Convention>,
    {
        let mut policy = Self::empty();
        for convention in conventions {
            policy = policy.with(convention);
        }
        policy
    }

    /// Enable a convention.
    #[must_use]
    pub fn with(mut self, convention: Convention) -> Self {
        self.conventions |= convention.bit();
        self
    }

    /// Disable a convention.
    #[must_use]
    pub fn without(mut self, convention: Convention) -> Self {
        self.conventions &= !convention.bit();
        self
    }

    /// True when the convention is enabled.
    #[must_use]
    pub fn contains(&self, convention: Convention) -> bool {
        self.conventions & convention.bit() != 0
    }

    /// True when no convention is enabled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conventions == 0
    }

    /// Whether convention-derived spellings are added even for fields that
    /// declare explicit source names.
    #[must_use]
    pub fn apply_on_overridden(mut self, apply: bool) -> Self {
        self.apply_on_overridden = apply;
        self
    }

    /// True when convention-derived spellings apply to overridden fields.
    #[must_use]
    pub fn applies_on_overridden(&self) -> bool {
        self.apply_on_overridden
    }
}

impl Default for NamingPolicy {
    fn default() -> Self {
        Self::empty().with(Convention::Original)
    }
}

/// One spelling a source column may bear for a field, with its comparison
/// mode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    text: String,
    ignore_case: bool,
}

impl Candidate {
    /// The spelling.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// True when the spelling compares ascii-case-insensitively.
    #[must_use]
    pub fn is_case_insensitive(&self) -> bool {
        self.ignore_case
    }

    /// Whether a column name matches this candidate.
    #[must_use]
    pub fn matches(&self, column: &str) -> bool {
        if self.ignore_case {
            self.text.eq_ignore_ascii_case(column)
        } else {
            self.text == column
        }
    }
}

/// Expand the acceptable source-column spellings for one field under a
/// policy.
///
/// Pure: the output depends only on the field's declared identifier, its
/// explicit source names, and the policy. Duplicate spellings collapse to a
/// single candidate whose comparison mode is the more permissive of the two.
/// An empty result is legal and means the field never matches a column.
pub fn expand_candidates(field: &Field, policy: &NamingPolicy) -> Vec<Candidate> {
    let mut out: Vec<Candidate> = Vec::new();
    let ignore_case = policy.contains(Convention::IgnoreCase);

    if !field.source_names().is_empty() {
        for name in field.source_names() {
            push_candidate(&mut out, name.clone(), ignore_case);
        }
        if !policy.applies_on_overridden() {
            return out;
        }
    }

    for convention in Convention::ALL {
        if !policy.contains(convention) {
            continue;
        }
        let (text, mode) = match convention {
            Convention::Original => (field.name().to_string(), false),
            Convention::IgnoreCase => (field.name().to_string(), true),
            Convention::Snake => (to_snake(field.name()), false),
            Convention::Camel => (to_camel(field.name()), false),
            Convention::Pascal => (to_pascal(field.name()), false),
        };
        push_candidate(&mut out, text, mode);
    }
    out
}

fn push_candidate(out: &mut Vec<Candidate>, text: String, ignore_case: bool) {
    if let Some(existing) = out.iter_mut().find(|c| c.text == text) {
        existing.ignore_case |= ignore_case;
    } else {
        out.push(Candidate { text, ignore_case });
    }
}

/// Insert `_` at every lower→upper boundary, then ascii-lowercase.
fn to_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for ch in name.chars() {
        if ch.is_ascii_uppercase() && prev_lower {
            out.push('_');
        }
        prev_lower = ch.is_ascii_lowercase();
        out.push(ch.to_ascii_lowercase());
    }
    out
}

fn to_camel(name: &str) -> String {
    recase_words(name, false)
}

fn to_pascal(name: &str) -> String {
    recase_words(name, true)
}

/// Strip non-alphanumeric separators and recase word-initial letters.
/// Non-initial letters keep their declared case.
fn recase_words(name: &str, first_upper: bool) -> String {
    let mut out = String::with_capacity(name.len());
    let mut word_start = true;
    let mut first_word = true;
    for ch in name.chars() {
        if !ch.is_ascii_alphanumeric() {
            word_start = true;
            if !out.is_empty() {
                first_word = false;
            }
            continue;
        }
        if word_start {
            if first_word && !first_upper {
                out.push(ch.to_ascii_lowercase());
            } else {
                out.push(ch.to_ascii_uppercase());
            }
            word_start = false;
        } else {
            out.push(ch);
        }
    }
    out
}
