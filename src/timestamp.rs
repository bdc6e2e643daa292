use std::borrow::Cow;

use chrono::format::{Item, StrftimeItems};
use chrono::Local;
use regex::{NoExpand, Regex};
use serde::Deserialize;

use crate::error::TimestampError;

/// Timestamp rewrite rule as it appears in a document's metadata header:
/// a regex locating the timestamp and a strftime template producing its
/// replacement.
#[derive(Debug, Clone, Deserialize)]
pub struct TimestampRule {
    pub find: String,
    pub replace: String,
}

impl TimestampRule {
    /// Compile into a rewriter, validating both halves of the rule so a
    /// bad pattern or template fails before any replay starts.
    pub fn compile(&self) -> Result<TimestampRewriter, TimestampError> {
        let find = Regex::new(&self.find)?;
        if StrftimeItems::new(&self.replace).any(|item| matches!(item, Item::Error)) {
            return Err(TimestampError::Template(self.replace.clone()));
        }
        Ok(TimestampRewriter {
            find,
            template: self.replace.clone(),
        })
    }
}

/// Compiled form of a [`TimestampRule`].
#[derive(Debug, Clone)]
pub struct TimestampRewriter {
    find: Regex,
    template: String,
}

impl TimestampRewriter {
    /// Replace the first `find` match with the current wall-clock time
    /// rendered through the rule's template. Lines without a match are
    /// returned borrowed and untouched.
    pub fn rewrite<'a>(&self, line: &'a str) -> Cow<'a, str> {
        let now = Local::now().format(&self.template).to_string();
        // NoExpand: the rendered time is literal text, never a $-template
        self.find.replace(line, NoExpand(&now))
    }
}
