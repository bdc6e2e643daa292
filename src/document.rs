use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::Deserialize;

use crate::error::DocumentError;
use crate::timestamp::{TimestampRewriter, TimestampRule};

/// A line starting with this marker ends the metadata header; everything
/// after it is example material.
pub const METADATA_DELIMITER: &str = "###";

/// Metadata header of a config document, decoded from the YAML block that
/// precedes the delimiter. Unknown keys are tolerated.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Metadata {
    pub description: Option<String>,
    pub paths: Vec<String>,
    pub groks: Vec<String>,
    pub filter: Option<String>,
    pub timestamp: Option<TimestampRule>,
    pub application: String,
    pub tags: Vec<String>,
}

impl Default for Metadata {
    fn default() -> Self {
        Metadata {
            description: None,
            paths: Vec::new(),
            groks: Vec::new(),
            filter: None,
            timestamp: None,
            application: "app".to_string(),
            tags: Vec::new(),
        }
    }
}

/// One sample log record: a run of consecutive non-blank lines from the
/// example section. Multi-line records (stack traces) stay together.
/// Line endings are preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExampleGroup {
    pub lines: Vec<String>,
}

/// A parsed config document: metadata header plus the ordered example
/// groups that follow it. Built fresh on every parse, immutable after.
#[derive(Debug, Clone)]
pub struct ConfigDocument {
    pub metadata: Metadata,
    pub examples: Vec<ExampleGroup>,
    pub filename: String,
    timestamps: Option<TimestampRewriter>,
}

impl ConfigDocument {
    pub fn parse_file(path: &Path) -> Result<Self, DocumentError> {
        let file = File::open(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::parse(BufReader::new(file), &name)
    }

    /// Split `reader` into the metadata header and blank-line-separated
    /// example groups. The first delimiter line is consumed and discarded;
    /// any later occurrence is ordinary example text. Without a delimiter
    /// the whole input is metadata and there are no examples.
    pub fn parse<R: BufRead>(mut reader: R, filename: &str) -> Result<Self, DocumentError> {
        let mut header = String::new();
        let mut examples: Vec<ExampleGroup> = Vec::new();
        let mut current: Vec<String> = Vec::new();
        let mut in_examples = false;

        let mut line = String::new();
        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                break;
            }
            if !in_examples {
                if line.starts_with(METADATA_DELIMITER) {
                    in_examples = true;
                } else {
                    header.push_str(&line);
                }
                continue;
            }
            if line.trim().is_empty() {
                flush_group(&mut current, &mut examples);
            } else {
                current.push(line.clone());
            }
        }
        flush_group(&mut current, &mut examples);

        let metadata = decode_header(&header, filename)?;
        let timestamps = match &metadata.timestamp {
            Some(rule) => Some(rule.compile().map_err(|source| {
                DocumentError::BadTimestampRule {
                    file: filename.to_string(),
                    source,
                }
            })?),
            None => None,
        };

        Ok(ConfigDocument {
            metadata,
            examples,
            filename: filename.to_string(),
            timestamps,
        })
    }

    /// Compiled timestamp rewriter, present when the header declared one.
    pub fn timestamps(&self) -> Option<&TimestampRewriter> {
        self.timestamps.as_ref()
    }
}

fn decode_header(header: &str, filename: &str) -> Result<Metadata, DocumentError> {
    if header.trim().is_empty() {
        return Ok(Metadata::default());
    }
    serde_yaml::from_str(header).map_err(|source| DocumentError::MalformedMetadata {
        file: filename.to_string(),
        source,
    })
}

fn flush_group(current: &mut Vec<String>, groups: &mut Vec<ExampleGroup>) {
    if !current.is_empty() {
        groups.push(ExampleGroup {
            lines: std::mem::take(current),
        });
    }
}
