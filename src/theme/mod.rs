//! Theme engine
//!
//! Template rendering using Tera.
//! - Default templates are embedded in the binary
//! - An optional theme directory overrides templates by name
//! - The `webp` function builds hosted image URLs
//! - Rendering can fall back to an error page instead of failing

use anyhow::{Context, Result};
use rust_embed::RustEmbed;
use std::error::Error as StdError;
use std::fs;
use std::path::{Path, PathBuf};
use tera::{Context as TeraContext, Tera};

use crate::services::images::{CloudinaryUrlBuilder, WebpFunction};

mod error;

pub use error::ThemeError;

/// Templates compiled into the binary
#[derive(RustEmbed)]
#[folder = "templates/"]
#[include = "*.html"]
struct DefaultTemplates;

/// Theme engine for rendering templates
pub struct ThemeEngine {
    tera: Tera,
    /// Override directory, if one was found at startup
    theme_path: Option<PathBuf>,
}

impl ThemeEngine {
    /// Create a theme engine.
    ///
    /// Templates found under `theme_path` replace embedded templates of the
    /// same name. A missing directory is not an error.
    pub fn new(theme_path: &Path, images: CloudinaryUrlBuilder) -> Result<Self> {
        let mut templates: Vec<(String, String)> = Vec::new();

        for name in DefaultTemplates::iter() {
            let file = DefaultTemplates::get(&name)
                .ok_or_else(|| ThemeError::NotFound(name.to_string()))?;
            let content = String::from_utf8(file.data.into_owned())
                .map_err(|e| ThemeError::TemplateError(format!("{} is not UTF-8: {}", name, e)))?;
            templates.push((name.to_string(), content));
        }

        let theme_path = if theme_path.is_dir() {
            let mut overrides = Vec::new();
            collect_templates_from_dir(theme_path, theme_path, &mut overrides)?;
            tracing::info!(
                "Loaded {} template override(s) from {}",
                overrides.len(),
                theme_path.display()
            );
            for (name, content) in overrides {
                templates.retain(|(existing, _)| existing != &name);
                templates.push((name, content));
            }
            Some(theme_path.to_path_buf())
        } else {
            tracing::debug!("No theme directory at {}, using embedded templates", theme_path.display());
            None
        };

        let mut tera = Tera::default();
        tera.add_raw_templates(templates)
            .map_err(|e| ThemeError::TemplateError(describe(&e)))
            .context("Failed to load templates")?;
        tera.register_function("webp", WebpFunction::new(images));

        Ok(Self { tera, theme_path })
    }

    /// Render a template with context
    pub fn render(&self, template: &str, context: &TeraContext) -> Result<String> {
        self.tera.render(template, context).map_err(|e| {
            ThemeError::TemplateError(format!("Failed to render '{}': {}", template, describe(&e))).into()
        })
    }

    /// Render a template, falling back to `error.html` and then to a
    /// built-in page. Never fails.
    pub fn render_with_fallback(&self, template: &str, context: &TeraContext) -> String {
        match self.render(template, context) {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!("Failed to render template '{}': {:#}, trying error template", template, e);

                let mut error_context = context.clone();
                error_context.insert("status", &500);
                error_context.insert("error_message", "The page could not be displayed.");

                match self.render("error.html", &error_context) {
                    Ok(html) => html,
                    Err(error_template_err) => {
                        tracing::warn!(
                            "Failed to render error template: {:#}, returning simple HTML error page",
                            error_template_err
                        );
                        simple_error_page("Error", "The page could not be displayed.")
                    }
                }
            }
        }
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|t| t == name)
    }

    pub fn theme_path(&self) -> Option<&Path> {
        self.theme_path.as_deref()
    }
}

/// Flatten a Tera error and its causes into one line
fn describe(e: &tera::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(s) = source {
        message.push_str(&format!(": {}", s));
        source = s.source();
    }
    message
}

/// Collect `.html` files below `current_path`, named relative to `base_path`
fn collect_templates_from_dir(
    base_path: &Path,
    current_path: &Path,
    templates: &mut Vec<(String, String)>,
) -> Result<()> {
    let entries = fs::read_dir(current_path).map_err(ThemeError::IoError)?;
    for entry in entries {
        let path = entry.map_err(ThemeError::IoError)?.path();

        if path.is_dir() {
            collect_templates_from_dir(base_path, &path, templates)?;
        } else if path.extension().map_or(false, |ext| ext == "html") {
            let relative_path = path
                .strip_prefix(base_path)
                .map_err(|_| ThemeError::TemplateError("Failed to get relative path".to_string()))?;
            let name = relative_path.to_string_lossy().replace('\\', "/");
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read template: {:?}", path))?;
            templates.push((name, content));
        }
    }
    Ok(())
}

/// Last-resort page used when no template can be rendered
pub fn simple_error_page(title: &str, message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{title}</title>
    <style>
        body {{ font-family: sans-serif; max-width: 600px; margin: 50px auto; padding: 20px; }}
        h1 {{ color: #c0392b; }}
    </style>
</head>
<body>
    <h1>{title}</h1>
    <p>{message}</p>
    <p><a href="/">Back to the exercises</a></p>
</body>
</html>"#,
        title = tera::escape_html(title),
        message = tera::escape_html(message),
    )
}

#[cfg(test)]
mod tests;
