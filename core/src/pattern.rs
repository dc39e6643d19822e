//! Must-find / must-not-find output assertions
//!
//! Literal patterns are escaped and then compiled by the same regex engine as
//! regex patterns, so both kinds share one matching path. Every pattern is
//! compiled in multi-line mode and matched with a substring search.

use regex::{Regex, RegexBuilder};

use crate::error::{HarnessError, HarnessResult};

/// The assertion bundle for one invocation
///
/// Patterns are checked in declaration order within each group, literal
/// group before regex group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternSet {
    must_find: Vec<String>,
    must_find_re: Vec<String>,
    must_not_find: Vec<String>,
    must_not_find_re: Vec<String>,
}

impl PatternSet {
    /// An empty set; every output satisfies it
    pub fn new() -> Self {
        Self::default()
    }

    /// Require a literal substring
    pub fn must_find(mut self, literal: impl Into<String>) -> Self {
        self.must_find.push(literal.into());
        self
    }

    /// Require every literal substring in order
    pub fn must_find_all<I, S>(mut self, literals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.must_find.extend(literals.into_iter().map(Into::into));
        self
    }

    /// Require a regex match
    pub fn must_find_re(mut self, pattern: impl Into<String>) -> Self {
        self.must_find_re.push(pattern.into());
        self
    }

    /// Forbid a literal substring
    pub fn must_not_find(mut self, literal: impl Into<String>) -> Self {
        self.must_not_find.push(literal.into());
        self
    }

    /// Forbid a regex match
    pub fn must_not_find_re(mut self, pattern: impl Into<String>) -> Self {
        self.must_not_find_re.push(pattern.into());
        self
    }

    /// Whether no pattern at all has been declared
    pub fn is_empty(&self) -> bool {
        self.must_find.is_empty()
            && self.must_find_re.is_empty()
            && self.must_not_find.is_empty()
            && self.must_not_find_re.is_empty()
    }

    /// Compile both groups; the first invalid regex is reported
    pub fn compile(&self) -> HarnessResult<CompiledPatternSet> {
        let mut required = compile(&self.must_find, false)?;
        required.extend(compile(&self.must_find_re, true)?);

        let mut forbidden = compile(&self.must_not_find, false)?;
        forbidden.extend(compile(&self.must_not_find_re, true)?);

        Ok(CompiledPatternSet {
            required,
            forbidden,
        })
    }
}

/// A pattern ready for matching, remembering how it was declared
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    source: String,
    is_regex: bool,
    regex: Regex,
}

impl CompiledPattern {
    /// Pattern text as the caller wrote it (before escaping)
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether the pattern was declared as a regex
    pub fn is_regex(&self) -> bool {
        self.is_regex
    }

    /// First match in `output`, if any
    pub fn find<'o>(&self, output: &'o str) -> Option<&'o str> {
        self.regex.find(output).map(|m| m.as_str())
    }
}

/// Both compiled groups of a [`PatternSet`]
#[derive(Debug, Clone, Default)]
pub struct CompiledPatternSet {
    /// Must-find, literal first then regex
    pub required: Vec<CompiledPattern>,
    /// Must-not-find, literal first then regex
    pub forbidden: Vec<CompiledPattern>,
}

/// Compile patterns, escaping them first unless `is_regex`
pub fn compile<S: AsRef<str>>(patterns: &[S], is_regex: bool) -> HarnessResult<Vec<CompiledPattern>> {
    patterns
        .iter()
        .map(|pattern| {
            let source = pattern.as_ref();
            let expr = if is_regex {
                source.to_string()
            } else {
                regex::escape(source)
            };
            let regex = RegexBuilder::new(&expr)
                .multi_line(true)
                .build()
                .map_err(|source_err| HarnessError::Pattern {
                    pattern: source.to_string(),
                    source: source_err,
                })?;
            Ok(CompiledPattern {
                source: source.to_string(),
                is_regex,
                regex,
            })
        })
        .collect()
}

/// The first pattern that does not occur in `output`
pub fn find_first_missing<'p>(
    output: &str,
    compiled: &'p [CompiledPattern],
) -> Option<&'p CompiledPattern> {
    compiled.iter().find(|pattern| pattern.find(output).is_none())
}

/// The first pattern that does occur in `output`, with the matched text
pub fn find_first_present<'p, 'o>(
    output: &'o str,
    compiled: &'p [CompiledPattern],
) -> Option<(&'p CompiledPattern, &'o str)> {
    compiled
        .iter()
        .find_map(|pattern| pattern.find(output).map(|matched| (pattern, matched)))
}
