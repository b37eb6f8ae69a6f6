//! Tera rendering engine: [`TemplateEngine`] and [`Renderer`].
//!
//! The compose template is embedded at compile time. A user template
//! directory may supply `compose.yml.tera` to replace it; sibling `.tera`
//! files are loaded too so an override can `include` them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tera::{Tera, Value};

use fleet_core::types::Roster;

use crate::context::{ManifestContext, ManifestOptions};
use crate::error::RenderError;

/// Name of the manifest template.
pub const MANIFEST_TEMPLATE: &str = "compose.yml.tera";

// ---------------------------------------------------------------------------
// Embedded templates
// ---------------------------------------------------------------------------

const TPLS: &[(&str, &str)] = &[(MANIFEST_TEMPLATE, include_str!("templates/compose.yml.tera"))];

// ---------------------------------------------------------------------------
// Template loading helpers
// ---------------------------------------------------------------------------

fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RenderError {
    RenderError::Io { path: path.into(), source }
}

/// `*.tera` files directly inside `dir`, keyed by file name.
///
/// A missing directory yields no overrides. Subdirectories are ignored.
fn load_user_templates(dir: &Path) -> Result<Vec<(String, String)>, RenderError> {
    if !dir.is_dir() {
        return Ok(vec![]);
    }
    let mut templates = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| io_err(dir, e))? {
        let path = entry.map_err(|e| io_err(dir, e))?.path();
        if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("tera") {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        templates.push((name.to_string(), contents));
    }
    templates.sort();
    Ok(templates)
}

/// `{{ value | yaml_str }}`: a double-quoted YAML scalar.
///
/// JSON string syntax is a subset of YAML double-quoted scalars, so
/// `serde_json` does the escaping.
fn yaml_str(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let raw = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    serde_json::to_string(&raw)
        .map(Value::String)
        .map_err(|e| tera::Error::msg(format!("yaml_str: {e}")))
}

fn build_tera(user_template_dir: Option<&Path>) -> Result<Tera, RenderError> {
    let mut templates: HashMap<String, String> = TPLS
        .iter()
        .map(|(name, content)| (name.to_string(), content.to_string()))
        .collect();
    if let Some(dir) = user_template_dir {
        for (name, content) in load_user_templates(dir)? {
            templates.insert(name, content);
        }
    }

    let mut tera = Tera::default();
    tera.autoescape_on(vec![]);
    tera.register_filter("yaml_str", yaml_str);
    let items: Vec<(String, String)> = templates.into_iter().collect();
    tera.add_raw_templates(items)?;
    Ok(tera)
}

// ---------------------------------------------------------------------------
// TemplateEngine
// ---------------------------------------------------------------------------

/// Tera-based engine with optional user overrides.
///
/// Overrides are matched by file name; `compose.yml.tera` replaces the
/// embedded manifest template.
pub struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    /// Load the embedded template plus any overrides in `user_template_dir`.
    pub fn new(user_template_dir: Option<&Path>) -> Result<Self, RenderError> {
        let tera = build_tera(user_template_dir)?;
        Ok(TemplateEngine { tera })
    }

    /// Render the manifest template with a prepared context.
    pub fn render(&self, ctx: &ManifestContext) -> Result<String, RenderError> {
        let tera_ctx = ctx.to_tera_context()?;
        let content = self.tera.render(MANIFEST_TEMPLATE, &tera_ctx)?;
        Ok(content.replace("\r\n", "\n"))
    }
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Manifest renderer. Create once and reuse; rendering has no side effects.
pub struct Renderer {
    engine: TemplateEngine,
    options: ManifestOptions,
}

impl Renderer {
    /// Embedded template, default options.
    pub fn new() -> Result<Self, RenderError> {
        Self::with_options(ManifestOptions::default(), None)
    }

    pub fn with_options(
        options: ManifestOptions,
        user_template_dir: Option<&Path>,
    ) -> Result<Self, RenderError> {
        Ok(Renderer {
            engine: TemplateEngine::new(user_template_dir)?,
            options,
        })
    }

    pub fn options(&self) -> &ManifestOptions {
        &self.options
    }

    /// Render the full manifest text for `roster`.
    pub fn render(&self, roster: &Roster) -> Result<String, RenderError> {
        let ctx = ManifestContext::from_roster(roster, &self.options)?;
        self.render_with_context(&ctx)
    }

    /// Render using a caller-provided [`ManifestContext`].
    pub fn render_with_context(&self, ctx: &ManifestContext) -> Result<String, RenderError> {
        self.engine.render(ctx)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
