//! kiln creates runnable project skeletons from reusable directory
//! templates: trees of literal files, templated files and templated
//! names, driven by a declared set of prompt variables and surrounded by
//! lifecycle hooks.

/// Command-line interface module for the kiln application
pub mod cli;

/// User configuration handling (~/.kilnrc)
pub mod config;

/// The ordered variable context and its merge rules
pub mod context;

/// Error types and handling for the kiln application
pub mod error;

/// The generation engine: template tree walking and rendering
pub mod generate;

/// Lifecycle hook discovery and execution
/// Handles scripts in:
/// - hooks/pre_prompt
/// - hooks/pre_gen_project
/// - hooks/post_gen_project
pub mod hooks;

/// Template acquisition from local paths, repositories and archives
pub mod loader;

/// Locating the template root inside an acquired directory
pub mod locate;

/// User input and interaction handling
pub mod prompt;

/// Template rendering through MiniJinja
pub mod renderer;

/// Saving and reusing resolved contexts
pub mod replay;

/// Top-level pipeline orchestration
pub mod scaffold;

/// Filesystem helpers shared across the pipeline
pub mod utils;
