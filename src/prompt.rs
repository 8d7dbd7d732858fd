//! User input and interaction handling.
//!
//! Everything interactive goes through the [`Prompter`] trait so the
//! pipeline can run fully non-interactively (`no_input`) and tests can
//! substitute canned answers.

use crate::context::{Context, Value, NESTED_TEMPLATES_KEY};
use crate::error::{Error, Result};
use crate::renderer::{namespaced, TemplateRenderer};
use crate::utils;
use dialoguer::{Confirm, Input, Password, Select};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

/// Trait for interactive question/answer backends.
pub trait Prompter {
    /// Asks a yes/no question. When `skip` is set the question is not
    /// asked and `true` is returned.
    fn confirm(&self, skip: bool, question: String) -> Result<bool>;

    /// Asks for a line of text with a pre-filled default.
    fn input(&self, prompt: String, default: String) -> Result<String>;

    /// Asks the user to pick one item; returns the chosen index.
    fn select(&self, prompt: String, items: &[String], default: usize) -> Result<usize>;

    /// Asks for a password without echoing it.
    fn password(&self, prompt: String) -> Result<String>;
}

/// Terminal prompter backed by dialoguer.
pub struct DialoguerPrompter;

impl DialoguerPrompter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DialoguerPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompter for DialoguerPrompter {
    fn confirm(&self, skip: bool, question: String) -> Result<bool> {
        if skip {
            return Ok(true);
        }
        Confirm::new()
            .with_prompt(question)
            .default(false)
            .interact()
            .map_err(|e| Error::PromptError(e.to_string()))
    }

    fn input(&self, prompt: String, default: String) -> Result<String> {
        Input::new()
            .with_prompt(prompt)
            .default(default)
            .allow_empty(true)
            .interact_text()
            .map_err(|e| Error::PromptError(e.to_string()))
    }

    fn select(&self, prompt: String, items: &[String], default: usize) -> Result<usize> {
        Select::new()
            .with_prompt(prompt)
            .items(items)
            .default(default)
            .interact()
            .map_err(|e| Error::PromptError(e.to_string()))
    }

    fn password(&self, prompt: String) -> Result<String> {
        Password::new()
            .with_prompt(prompt)
            .interact()
            .map_err(|e| Error::PromptError(e.to_string()))
    }
}

/// Renders a default value against the partially resolved context, so a
/// declared default like `{{ kiln.project_name | slugify }}` shows up
/// already expanded in the prompt.
fn render_default(
    key: &str,
    raw: &Value,
    resolved: &Context,
    renderer: &dyn TemplateRenderer,
) -> Result<String> {
    let text = raw.to_text();
    if !text.contains("{{") {
        return Ok(text);
    }
    match renderer.render(&text, &namespaced(resolved)) {
        Ok(rendered) => Ok(rendered),
        Err(e) if e.is_undefined_variable() => Err(Error::UndefinedVariable {
            file: key.to_string(),
            message: e.to_string(),
            context: resolved.clone(),
        }),
        Err(e) => Err(e),
    }
}

/// Resolves every entry of `context` into a concrete value, prompting the
/// user unless `no_input` is set.
///
/// Private keys (leading underscore) are carried through untouched and
/// never prompted; `__`-prefixed keys are rendered but not prompted.
/// Root-level lists act as choice lists (first element is the default)
/// and collapse to the chosen value. Nested maps are resolved in a second
/// pass, after every scalar is known.
pub fn prompt_for_config(
    context: &Context,
    renderer: &dyn TemplateRenderer,
    prompter: &dyn Prompter,
    no_input: bool,
) -> Result<Context> {
    let mut resolved = Context::new();
    let mut deferred_maps: Vec<(String, IndexMap<String, Value>)> = Vec::new();

    for (key, value) in context {
        if key == NESTED_TEMPLATES_KEY {
            resolved.insert(key.clone(), value.clone());
            continue;
        }
        if key.starts_with("__") {
            let rendered = render_default(key, value, &resolved, renderer)?;
            resolved.insert(key.clone(), Value::String(rendered));
            continue;
        }
        if key.starts_with('_') {
            resolved.insert(key.clone(), value.clone());
            continue;
        }

        match value {
            Value::List(choices) if !choices.is_empty() => {
                let picked = if no_input {
                    0
                } else {
                    let items: Vec<String> =
                        choices.iter().map(Value::to_text).collect();
                    prompter.select(format!("Select {key}"), &items, 0)?
                };
                resolved.insert(key.clone(), choices[picked].clone());
            }
            Value::Bool(default) => {
                let answer = if no_input {
                    *default
                } else {
                    ask_yes_no(prompter, key, *default)?
                };
                resolved.insert(key.clone(), Value::Bool(answer));
            }
            Value::Map(map) => {
                deferred_maps.push((key.clone(), map.clone()));
            }
            _ => {
                let default = render_default(key, value, &resolved, renderer)?;
                let answer = if no_input {
                    default
                } else {
                    prompter.input(key.clone(), default)?
                };
                resolved.insert(key.clone(), Value::String(answer));
            }
        }
    }

    for (key, map) in deferred_maps {
        let value = if no_input {
            Value::Map(map)
        } else {
            read_user_map(prompter, &key, map)?
        };
        resolved.insert(key, value);
    }

    Ok(resolved)
}

fn ask_yes_no(prompter: &dyn Prompter, key: &str, default: bool) -> Result<bool> {
    let items = if default {
        ["yes".to_string(), "no".to_string()]
    } else {
        ["no".to_string(), "yes".to_string()]
    };
    let picked = prompter.select(format!("{key}?"), &items, 0)?;
    Ok(items[picked] == "yes")
}

/// Prompts for a map-valued variable as a JSON document, defaulting to
/// the declared value.
fn read_user_map(
    prompter: &dyn Prompter,
    key: &str,
    default: IndexMap<String, Value>,
) -> Result<Value> {
    let default_json =
        serde_json::to_string(&Value::Map(default.clone())).unwrap_or_default();
    let answer = prompter.input(format!("{key} (JSON)"), default_json)?;
    match serde_json::from_str::<IndexMap<String, Value>>(&answer) {
        Ok(parsed) => Ok(Value::Map(parsed)),
        Err(e) => Err(Error::PromptError(format!(
            "invalid JSON value for '{key}': {e}"
        ))),
    }
}

/// Presents the nested-template table (the reserved `templates` key) as a
/// choice and returns the selected sub-template directory, if any.
pub fn choose_nested_template(
    context: &Context,
    repo_dir: &Path,
    prompter: &dyn Prompter,
) -> Result<Option<PathBuf>> {
    let Some(Value::Map(templates)) = context.get(NESTED_TEMPLATES_KEY) else {
        return Ok(None);
    };
    if templates.is_empty() {
        return Ok(None);
    }

    let mut labels = Vec::new();
    let mut paths = Vec::new();
    for (name, entry) in templates {
        let path = entry
            .as_map()
            .and_then(|m| m.get("path"))
            .and_then(Value::as_str)
            .unwrap_or(name);
        let description = entry
            .as_map()
            .and_then(|m| m.get("description"))
            .and_then(Value::as_str)
            .unwrap_or(name);
        labels.push(format!("{name} ({description})"));
        paths.push(path.to_string());
    }

    let picked = prompter.select("Select a template".to_string(), &labels, 0)?;
    Ok(Some(repo_dir.join(&paths[picked])))
}

/// Asks whether a previously downloaded file/directory may be deleted and
/// re-fetched. Returns `true` when it was deleted, `false` when the
/// existing copy should be reused. Under `no_input` deletion is forced.
pub fn prompt_and_delete<P: AsRef<Path>>(
    prompter: &dyn Prompter,
    path: P,
    no_input: bool,
) -> Result<bool> {
    let path = path.as_ref();
    let question = format!(
        "You've downloaded '{}' before. Delete and re-download it?",
        path.display()
    );
    if prompter.confirm(no_input, question)? {
        if path.is_dir() {
            utils::rmtree(path)?;
        } else {
            std::fs::remove_file(path).map_err(Error::IoError)?;
        }
        Ok(true)
    } else {
        log::debug!("Reusing existing '{}'", path.display());
        Ok(false)
    }
}
