use thiserror::Error;

#[derive(Debug, Error)]
pub enum UpdaterError {
    #[error("not initialized: run 'proxyup init'")]
    NotInitialized,

    #[error("config file not found: {0}")]
    ConfigNotFound(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid cron expression '{expr}': {message}")]
    InvalidCron { expr: String, message: String },

    #[error("checkout failed: {0}")]
    Checkout(String),

    #[error("provisioning failed: {0}")]
    ProvisionFailed(String),

    #[error("generator failed ({status}): {output}")]
    GeneratorFailed { status: String, output: String },

    #[error("fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("git {command} failed: {message}")]
    Git { command: String, message: String },

    #[error("commit failed: {0}")]
    CommitFailed(String),

    #[error("push failed: {0}")]
    PushFailed(String),

    #[error("git executable not found on PATH")]
    GitNotFound,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, UpdaterError>;
