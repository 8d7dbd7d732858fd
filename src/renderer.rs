//! Template rendering for kiln.
//! Wraps MiniJinja behind the [`TemplateRenderer`] trait so the generation
//! engine never depends on a concrete templating implementation.

use crate::context::{Context, Value};
use crate::error::{Error, Result};
use indexmap::IndexMap;
use minijinja::{Environment, UndefinedBehavior};

/// Namespace under which templates see the context,
/// e.g. `{{ kiln.project_name }}`.
pub const TEMPLATE_NAMESPACE: &str = "kiln";

/// Wraps a resolved context under the `kiln` namespace for rendering.
pub fn namespaced(context: &Context) -> Value {
    let mut root = IndexMap::new();
    root.insert(TEMPLATE_NAMESPACE.to_string(), Value::Map(context.clone()));
    Value::Map(root)
}

/// Trait for template rendering engines.
pub trait TemplateRenderer {
    /// Renders a template string with the given context value.
    ///
    /// Undefined variable references surface as a distinguishable error
    /// kind (see [`Error::is_undefined_variable`]); syntax errors
    /// propagate unchanged.
    fn render(&self, template: &str, context: &Value) -> Result<String>;
}

/// Explicit registry of template-exposed helper functions.
///
/// Populated once per run and handed to the renderer constructor; nothing
/// registers itself ambiently.
pub struct ExtensionRegistry {
    installers: Vec<(String, Box<dyn Fn(&mut Environment<'static>) + Send + Sync>)>,
}

impl ExtensionRegistry {
    /// An empty registry with no filters.
    pub fn empty() -> Self {
        Self { installers: Vec::new() }
    }

    /// Registers an installer under a diagnostic name.
    pub fn register<F>(&mut self, name: &str, installer: F)
    where
        F: Fn(&mut Environment<'static>) + Send + Sync + 'static,
    {
        self.installers.push((name.to_string(), Box::new(installer)));
    }

    /// Installs every registered extension into the environment.
    pub fn install(&self, env: &mut Environment<'static>) {
        for (name, installer) in &self.installers {
            log::debug!("Installing template extension '{name}'");
            installer(env);
        }
    }
}

impl Default for ExtensionRegistry {
    /// The built-in filter set: `jsonify`, `slugify`, `snake_case`,
    /// `camel_case`.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("jsonify", |env| {
            env.add_filter("jsonify", |value: minijinja::Value| {
                serde_json::to_string(&value).map_err(|e| {
                    minijinja::Error::new(
                        minijinja::ErrorKind::InvalidOperation,
                        e.to_string(),
                    )
                })
            });
        });
        registry.register("slugify", |env| {
            env.add_filter("slugify", |value: String| cruet::to_kebab_case(&value));
        });
        registry.register("snake_case", |env| {
            env.add_filter("snake_case", |value: String| cruet::to_snake_case(&value));
        });
        registry.register("camel_case", |env| {
            env.add_filter("camel_case", |value: String| cruet::to_camel_case(&value));
        });
        registry
    }
}

/// MiniJinja-based template rendering engine.
pub struct MiniJinjaRenderer {
    env: Environment<'static>,
}

impl MiniJinjaRenderer {
    /// Creates a renderer with the built-in extension registry.
    pub fn new() -> Self {
        Self::with_registry(&ExtensionRegistry::default())
    }

    /// Creates a renderer with an explicit extension registry.
    pub fn with_registry(registry: &ExtensionRegistry) -> Self {
        let mut env = Environment::new();
        // Undefined references must be loud: they signal a template/context
        // mismatch the user has to fix.
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        registry.install(&mut env);
        Self { env }
    }
}

impl Default for MiniJinjaRenderer {
    fn default() -> Self {
        MiniJinjaRenderer::new()
    }
}

impl TemplateRenderer for MiniJinjaRenderer {
    fn render(&self, template: &str, context: &Value) -> Result<String> {
        self.env
            .render_str(template, minijinja::Value::from_serialize(context))
            .map_err(Error::MinijinjaError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context_with(key: &str, value: &str) -> Value {
        let mut ctx = Context::new();
        ctx.insert(key.to_string(), Value::String(value.to_string()));
        namespaced(&ctx)
    }

    #[test]
    fn test_render_basic() {
        let renderer = MiniJinjaRenderer::new();
        let ctx = context_with("project_name", "Demo");
        let out = renderer.render("Hello {{ kiln.project_name }}", &ctx).unwrap();
        assert_eq!(out, "Hello Demo");
    }

    #[test]
    fn test_undefined_variable_is_distinguishable() {
        let renderer = MiniJinjaRenderer::new();
        let ctx = context_with("project_name", "Demo");
        let err = renderer.render("{{ kiln.missing }}", &ctx).unwrap_err();
        assert!(err.is_undefined_variable());
    }

    #[test]
    fn test_syntax_error_is_not_undefined() {
        let renderer = MiniJinjaRenderer::new();
        let ctx = context_with("project_name", "Demo");
        let err = renderer.render("{% if %}", &ctx).unwrap_err();
        assert!(!err.is_undefined_variable());
    }

    #[test]
    fn test_builtin_filters() {
        let renderer = MiniJinjaRenderer::new();
        let ctx = context_with("project_name", "Peanut Butter");
        assert_eq!(
            renderer
                .render("{{ kiln.project_name | slugify }}", &ctx)
                .unwrap(),
            "peanut-butter"
        );
        assert_eq!(
            renderer
                .render("{{ kiln.project_name | snake_case }}", &ctx)
                .unwrap(),
            "peanut_butter"
        );
    }
}
