//! # Text Patterns
//!
//! Compiled text-matching patterns with a source string, a flag set, and a
//! mutable `last_index` matching position used by global and sticky patterns.

use super::{FacsimileError, Identity};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

// =============================================================================
// FLAGS
// =============================================================================

/// Pattern flags, written `gimsuy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PatternFlags {
    /// `g`: matching resumes at `last_index`.
    pub global: bool,
    /// `i`
    pub ignore_case: bool,
    /// `m`: `^`/`$` match at line boundaries.
    pub multiline: bool,
    /// `s`: `.` matches newlines.
    pub dot_all: bool,
    /// `u`
    pub unicode: bool,
    /// `y`: a match must start exactly at `last_index`.
    pub sticky: bool,
}

impl PatternFlags {
    /// Parse a flag string such as `"gi"`.
    pub fn parse(flags: &str) -> Result<Self, FacsimileError> {
        let mut parsed = Self::default();
        for flag in flags.chars() {
            match flag {
                'g' => parsed.global = true,
                'i' => parsed.ignore_case = true,
                'm' => parsed.multiline = true,
                's' => parsed.dot_all = true,
                'u' => parsed.unicode = true,
                'y' => parsed.sticky = true,
                other => return Err(FacsimileError::UnknownPatternFlag(other)),
            }
        }
        Ok(parsed)
    }

    /// Whether matching state (`last_index`) is consulted.
    #[must_use]
    pub fn is_stateful(self) -> bool {
        self.global || self.sticky
    }
}

impl fmt::Display for PatternFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (set, flag) in [
            (self.global, 'g'),
            (self.ignore_case, 'i'),
            (self.multiline, 'm'),
            (self.dot_all, 's'),
            (self.unicode, 'u'),
            (self.sticky, 'y'),
        ] {
            if set {
                write!(f, "{flag}")?;
            }
        }
        Ok(())
    }
}

// =============================================================================
// PATTERN
// =============================================================================

#[derive(Debug)]
pub(crate) struct PatternData {
    source: Rc<str>,
    flags: PatternFlags,
    regex: Regex,
    last_index: Cell<usize>,
}

/// A compiled pattern.
#[derive(Clone, Debug)]
pub struct Pattern(pub(crate) Rc<PatternData>);

impl Pattern {
    /// Compile `source` with a flag string.
    pub fn new(source: &str, flags: &str) -> Result<Self, FacsimileError> {
        Self::with_flags(source, PatternFlags::parse(flags)?)
    }

    /// Compile `source` with parsed flags.
    pub fn with_flags(source: &str, flags: PatternFlags) -> Result<Self, FacsimileError> {
        let regex = RegexBuilder::new(source)
            .case_insensitive(flags.ignore_case)
            .multi_line(flags.multiline)
            .dot_matches_new_line(flags.dot_all)
            .build()
            .map_err(|e| FacsimileError::InvalidPattern {
                pattern: source.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self(Rc::new(PatternData {
            source: Rc::from(source),
            flags,
            regex,
            last_index: Cell::new(0),
        })))
    }

    /// A new pattern with the same source and flags, starting at the same
    /// `last_index`. The compiled program is immutable and shared.
    #[must_use]
    pub fn recompiled(&self) -> Self {
        Self(Rc::new(PatternData {
            source: self.0.source.clone(),
            flags: self.0.flags,
            regex: self.0.regex.clone(),
            last_index: Cell::new(self.last_index()),
        }))
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.0.source
    }

    #[must_use]
    pub fn flags(&self) -> PatternFlags {
        self.0.flags
    }

    #[must_use]
    pub fn last_index(&self) -> usize {
        self.0.last_index.get()
    }

    pub fn set_last_index(&self, index: usize) {
        self.0.last_index.set(index);
    }

    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        self.0.regex.is_match(text)
    }

    /// Find the next match as a byte range.
    ///
    /// Stateless patterns search from the start. Global and sticky patterns
    /// search from `last_index`, advance it past the match, and reset it to
    /// zero when nothing matches.
    pub fn find_next(&self, text: &str) -> Option<(usize, usize)> {
        let flags = self.flags();
        if !flags.is_stateful() {
            return self.0.regex.find(text).map(|m| (m.start(), m.end()));
        }

        let start = self.last_index();
        let found = if start > text.len() {
            None
        } else {
            self.0
                .regex
                .find_at(text, start)
                .filter(|m| !flags.sticky || m.start() == start)
        };

        match found {
            Some(m) => {
                self.set_last_index(m.end());
                Some((m.start(), m.end()))
            }
            None => {
                self.set_last_index(0);
                None
            }
        }
    }

    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity::of(&self.0)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.source(), self.flags())
    }
}
