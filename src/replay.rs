use std::borrow::Cow;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::process::{Child, Command, Stdio};

use crate::document::{ConfigDocument, ExampleGroup};
use crate::error::ReplayError;

/// Which example groups to replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Every group, in document order.
    All,
    /// Exactly the group at this position.
    One(usize),
}

/// Destination for replayed log lines. Implemented by a local file, a
/// delivery command, and (for tests) a plain byte buffer.
pub trait Sink {
    fn write_line(&mut self, line: &[u8]) -> Result<(), ReplayError>;

    /// Flush buffered output and surface any deferred delivery failure.
    fn finish(&mut self) -> Result<(), ReplayError> {
        Ok(())
    }
}

impl Sink for Vec<u8> {
    fn write_line(&mut self, line: &[u8]) -> Result<(), ReplayError> {
        self.extend_from_slice(line);
        Ok(())
    }
}

/// Local log file, appended to unless opened with `truncate`.
pub struct FileSink {
    file: File,
}

impl FileSink {
    pub fn open(path: &Path, truncate: bool) -> Result<Self, ReplayError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = if truncate {
            OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(path)?
        } else {
            OpenOptions::new().create(true).append(true).open(path)?
        };
        Ok(FileSink { file })
    }
}

impl Sink for FileSink {
    fn write_line(&mut self, line: &[u8]) -> Result<(), ReplayError> {
        self.file.write_all(line)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), ReplayError> {
        self.file.flush()?;
        Ok(())
    }
}

/// Delivery command (for instance an ssh invocation appending to a remote
/// log) fed the replayed lines on stdin. Best-effort: no retry, but a
/// spawn failure or non-zero exit is reported.
pub struct CommandSink {
    command: String,
    child: Child,
}

impl CommandSink {
    pub fn spawn(command: &str) -> Result<Self, ReplayError> {
        let child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::piped())
            .spawn()
            .map_err(|e| ReplayError::Delivery {
                command: command.to_string(),
                reason: e.to_string(),
            })?;
        Ok(CommandSink {
            command: command.to_string(),
            child,
        })
    }

    fn delivery_error(&self, reason: String) -> ReplayError {
        ReplayError::Delivery {
            command: self.command.clone(),
            reason,
        }
    }
}

impl Sink for CommandSink {
    fn write_line(&mut self, line: &[u8]) -> Result<(), ReplayError> {
        match self.child.stdin.as_mut() {
            Some(stdin) => stdin
                .write_all(line)
                .map_err(|e| ReplayError::Delivery {
                    command: self.command.clone(),
                    reason: e.to_string(),
                }),
            None => Err(self.delivery_error("stdin already closed".to_string())),
        }
    }

    fn finish(&mut self) -> Result<(), ReplayError> {
        // Close stdin so the command sees EOF, then collect its exit.
        drop(self.child.stdin.take());
        let status = self
            .child
            .wait()
            .map_err(|e| self.delivery_error(e.to_string()))?;
        if !status.success() {
            return Err(self.delivery_error(format!("exited with {}", status)));
        }
        Ok(())
    }
}

/// Resolve `selection` against the document, failing before any sink I/O
/// when an explicit index is out of range.
pub fn select<'a>(
    doc: &'a ConfigDocument,
    selection: Selection,
) -> Result<Vec<&'a ExampleGroup>, ReplayError> {
    match selection {
        Selection::All => Ok(doc.examples.iter().collect()),
        Selection::One(index) => {
            let group = doc
                .examples
                .get(index)
                .ok_or(ReplayError::IndexOutOfRange {
                    index,
                    count: doc.examples.len(),
                })?;
            Ok(vec![group])
        }
    }
}

/// Replay the selected example groups into `sink`, line by line and in
/// document order. With `fresh_timestamps` and a timestamp rule in the
/// header, each line's first timestamp match is rewritten to now before
/// it is written. Returns the number of bytes written.
pub fn replay(
    doc: &ConfigDocument,
    selection: Selection,
    fresh_timestamps: bool,
    sink: &mut dyn Sink,
) -> Result<u64, ReplayError> {
    let groups = select(doc, selection)?;
    let rewriter = if fresh_timestamps {
        doc.timestamps()
    } else {
        None
    };

    let mut written = 0u64;
    for group in groups {
        for line in &group.lines {
            let out: Cow<str> = match rewriter {
                Some(rw) => rw.rewrite(line),
                None => Cow::Borrowed(line.as_str()),
            };
            sink.write_line(out.as_bytes())?;
            written += out.len() as u64;
        }
    }
    sink.finish()?;
    Ok(written)
}
