// src/lib.rs
pub mod document;
pub mod error;
pub mod render;
pub mod replay;
pub mod timestamp;
pub mod watch;

pub use error::*;

pub use document::{ConfigDocument, ExampleGroup, Metadata, METADATA_DELIMITER};
pub use render::{render_filter, render_routing, write_if_changed};
pub use replay::{replay, select, CommandSink, FileSink, Selection, Sink};
pub use timestamp::{TimestampRewriter, TimestampRule};
pub use watch::{FileWatcher, DEFAULT_DEBOUNCE};
