//! Error handling for the kiln application.
//! Defines the closed error taxonomy used throughout the generation pipeline.

use crate::context::Context;
use std::io;
use thiserror::Error;

/// Custom error types for kiln operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Represents errors that occur during file system operations
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    /// Represents errors raised by the template engine. Syntax errors in
    /// template content propagate through this variant unchanged.
    #[error("Template error: {0}")]
    MinijinjaError(#[from] minijinja::Error),

    /// The acquired directory does not directly contain a `kiln.json`.
    #[error("A template descriptor (kiln.json) could not be found in '{template_dir}'")]
    RepositoryNotFound { template_dir: String },

    /// Cloning or checking out a repository failed.
    #[error("Failed to clone repository '{repo_url}': {output}")]
    RepositoryCloneFailed { repo_url: String, output: String },

    /// The repository URL could not be identified as git or hg.
    #[error("Unable to identify the repository type of '{repo_url}'")]
    UnknownRepoType { repo_url: String },

    /// The VCS client binary is not available on the search path.
    #[error("'{vcs}' is not installed")]
    VcsNotInstalled { vcs: String },

    /// Corrupt archive, empty archive or bad password.
    #[error("Invalid zip repository '{zip_uri}': {reason}")]
    InvalidZipRepository { zip_uri: String, reason: String },

    /// No valid template root could be located in the acquired directory.
    #[error(
        "'{repo_dir}' is not a valid template directory: it contains neither \
         a kiln.json nor a non-VCS subdirectory"
    )]
    NonTemplatedInputDir { repo_dir: String },

    /// The template descriptor could not be parsed.
    #[error("Unable to decode template descriptor '{context_file}': {source}")]
    ContextDecoding {
        context_file: String,
        source: serde_json::Error,
    },

    /// The output directory already exists and overwriting was not requested.
    #[error("Output directory '{output_dir}' already exists")]
    OutputDirExists { output_dir: String },

    /// A lifecycle hook script failed to render or execute.
    #[error("Hook '{hook}' failed: {reason}")]
    FailedHook { hook: String, reason: String },

    /// Content rendering referenced a variable absent from the context.
    /// Carries the full context so the user can see what was available.
    #[error("Undefined variable in template '{file}': {message}")]
    UndefinedVariable {
        file: String,
        message: String,
        context: Context,
    },

    /// Represents errors during user configuration loading or processing
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Represents errors during interactive prompting
    #[error("Prompt error: {0}")]
    PromptError(String),
}

/// Convenience type alias for Results with kiln's Error as the error type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// True when the underlying template-engine error is an undefined
    /// variable reference rather than a syntax problem.
    pub fn is_undefined_variable(&self) -> bool {
        matches!(
            self,
            Error::MinijinjaError(e) if e.kind() == minijinja::ErrorKind::UndefinedError
        )
    }
}

/// Default error handler that prints the error and exits the program.
pub fn default_error_handler(err: Error) -> ! {
    eprintln!("{err}");
    std::process::exit(1);
}
