use std::fs;
use std::io;
use std::path::Path;

use serde::Serialize;

use crate::document::{ConfigDocument, Metadata};
use crate::error::RenderError;

/// Static input/output boilerplate around the rendered filter stage. The
/// pipeline reads from a beats listener and dumps decoded events to
/// stdout, which is all a verification run needs.
const PIPELINE_TEMPLATE: &str = "\
input {
  beats {
    port => 5044
  }
}

%FILTER_STAGE%

output {
  stdout {
    codec => rubydebug
  }
}
";

/// Fixed multiline grouping applied to every tracked source: a line that
/// does not open with a date joins the record before it.
const MULTILINE_PATTERN: &str = r"^\d+-\d+-\d+ ";

/// Render the complete pipeline config for one document's metadata.
///
/// A raw `filter` block wins and is used verbatim as the filter body.
/// Otherwise exactly one grok pattern is turned into a match stanza
/// against the `message` field. Anything else is an error; with several
/// patterns we refuse rather than silently picking the first.
pub fn render_filter(metadata: &Metadata) -> Result<String, RenderError> {
    let body = match (&metadata.filter, metadata.groks.as_slice()) {
        (Some(filter), _) => filter.trim_end().to_string(),
        (None, [grok]) => format!(
            "  grok {{\n    match => {{ \"message\" => \"{}\" }}\n  }}",
            grok
        ),
        (None, []) => return Err(RenderError::NoFilterSource),
        (None, many) => {
            return Err(RenderError::MultipleGroks { count: many.len() });
        }
    };
    let stage = format!("filter {{\n{}\n}}", body);
    Ok(PIPELINE_TEMPLATE.replace("%FILTER_STAGE%", &stage))
}

#[derive(Debug, Serialize)]
struct RoutingDocument {
    sources: Vec<RoutingEntry>,
}

#[derive(Debug, Serialize)]
struct RoutingEntry {
    #[serde(rename = "type")]
    kind: String,
    paths: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tags: Vec<String>,
    multiline: MultilineRule,
}

#[derive(Debug, Serialize)]
struct MultilineRule {
    pattern: String,
    negate: bool,
    #[serde(rename = "match")]
    mode: String,
}

impl Default for MultilineRule {
    fn default() -> Self {
        MultilineRule {
            pattern: MULTILINE_PATTERN.to_string(),
            negate: true,
            mode: "after".to_string(),
        }
    }
}

/// Render the routing document for the shipper side: one `log` entry per
/// tracked source carrying its paths, tags and the fixed multiline
/// directives.
pub fn render_routing(docs: &[ConfigDocument]) -> Result<String, RenderError> {
    let routing = RoutingDocument {
        sources: docs
            .iter()
            .map(|doc| RoutingEntry {
                kind: "log".to_string(),
                paths: doc.metadata.paths.clone(),
                tags: doc.metadata.tags.clone(),
                multiline: MultilineRule::default(),
            })
            .collect(),
    };
    Ok(serde_yaml::to_string(&routing)?)
}

/// Write `contents` to `path` only when it differs from what is already
/// there, so downstream processes watching the file never see a no-op
/// rewrite. Returns whether a write happened.
pub fn write_if_changed(path: &Path, contents: &str) -> Result<bool, RenderError> {
    match fs::read_to_string(path) {
        Ok(existing) if existing == contents => return Ok(false),
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, contents)?;
    Ok(true)
}
