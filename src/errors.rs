use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Site configuration could not be loaded. Fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unable to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A gallery or carousel manifest is missing or malformed.
/// Callers log it and carry on with empty data.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("unable to read manifest {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unable to parse manifest {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("syntax error in {file}: {source}")]
    Syntax {
        file: String,
        #[source]
        source: minijinja::Error,
    },
    #[error("compilation task ended without a result")]
    Interrupted,
}

// Sources are Arc'd so one failed compilation can be handed to every waiter.
#[derive(Debug, Clone, Error)]
pub enum TemplateError {
    #[error("unable to compile template {name}: {source}")]
    Compile {
        name: String,
        #[source]
        source: Arc<CompileError>,
    },
    #[error("error while rendering template {name}: {source}")]
    Render {
        name: String,
        #[source]
        source: Arc<minijinja::Error>,
    },
}

/// What a page render function can fail with.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("page not found")]
    NotFound,
    #[error(transparent)]
    Template(#[from] TemplateError),
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("unable to open log file {path}: {source}")]
    Log {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("unable to listen on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("server error: {0}")]
    Serve(#[source] io::Error),
}
