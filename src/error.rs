#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("{file}: metadata header is not a YAML mapping: {source}")]
    MalformedMetadata {
        file: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{file}: invalid timestamp rule: {source}")]
    BadTimestampRule {
        file: String,
        #[source]
        source: TimestampError,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum TimestampError {
    #[error("find pattern does not compile: {0}")]
    Pattern(#[from] regex::Error),

    #[error("replace template '{0}' contains an unknown time specifier")]
    Template(String),
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("metadata provides neither a filter block nor a grok pattern")]
    NoFilterSource,

    #[error("multiple grok patterns are unsupported ({count} given); provide one grok or a raw filter")]
    MultipleGroks { count: usize },

    #[error("could not encode routing document: {0}")]
    RoutingEncode(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("example index {index} out of range: document has {count} example group(s)")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("delivery command '{command}' failed: {reason}")]
    Delivery { command: String, reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("'{0}' does not name a watchable file")]
    NotAFile(String),

    #[error("watch setup failed: {0}")]
    Notify(#[from] notify::Error),

    #[error(transparent)]
    Pipeline(#[from] anyhow::Error),
}
