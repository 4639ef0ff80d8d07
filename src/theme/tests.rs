//! Tests for the theme engine

use super::*;
use std::fs;
use tempfile::TempDir;
use tera::Context as TeraContext;

fn images() -> CloudinaryUrlBuilder {
    CloudinaryUrlBuilder::new("demo", true)
}

/// Engine with embedded templates only
fn engine() -> ThemeEngine {
    ThemeEngine::new(Path::new("/nonexistent/theme/dir"), images()).unwrap()
}

/// Variables every page expects from the viewer
fn page_context() -> TeraContext {
    let mut context = TeraContext::new();
    context.insert("site_name", "Exercise Blog");
    context.insert("login_url", "/accounts/login/");
    context.insert("request_path", "/");
    context.insert("current_user", &Option::<()>::None);
    context.insert("notice", &Option::<()>::None);
    context
}

#[test]
fn test_embedded_templates_load() {
    let engine = engine();
    assert!(engine.theme_path().is_none());
    for name in [
        "base.html",
        "404.html",
        "error.html",
        "exercises/list.html",
        "exercises/detail.html",
        "exercises/add_comment.html",
        "exercises/edit_comment.html",
        "exercises/contact_form.html",
        "exercises/report_comment_form.html",
        "exercises/_report_form.html",
        "account/login.html",
        "account/signup.html",
        "admin/index.html",
        "admin/list.html",
        "admin/detail.html",
        "admin/form.html",
        "admin/confirm_delete.html",
    ] {
        assert!(engine.has_template(name), "missing {}", name);
    }
}

#[test]
fn test_error_page_renders_status_and_message() {
    let mut context = page_context();
    context.insert("status", &403);
    context.insert("error_message", "You do not have permission to view this page.");

    let html = engine().render("error.html", &context).unwrap();
    assert!(html.contains("403"));
    assert!(html.contains("You do not have permission to view this page."));
    assert!(html.contains("Exercise Blog"));
}

#[test]
fn test_notice_is_rendered_and_escaped() {
    let mut context = page_context();
    context.insert(
        "notice",
        &serde_json::json!({ "level": "error", "message": "<b>bad</b>" }),
    );
    let html = engine().render("404.html", &context).unwrap();
    assert!(html.contains("notice-error"));
    assert!(html.contains("&lt;b&gt;bad&lt;&#x2F;b&gt;"));
}

#[test]
fn test_override_directory_replaces_by_name() {
    let temp_dir = TempDir::new().unwrap();
    fs::create_dir_all(temp_dir.path().join("exercises")).unwrap();
    fs::write(
        temp_dir.path().join("404.html"),
        "custom 404 for {{ site_name }}",
    )
    .unwrap();
    fs::write(
        temp_dir.path().join("exercises/promo.html"),
        r#"{% extends "base.html" %}{% block content %}promo{% endblock content %}"#,
    )
    .unwrap();
    fs::write(temp_dir.path().join("notes.txt"), "ignored").unwrap();

    let engine = ThemeEngine::new(temp_dir.path(), images()).unwrap();
    assert_eq!(engine.theme_path(), Some(temp_dir.path()));
    assert!(engine.has_template("exercises/promo.html"));
    assert!(!engine.has_template("notes.txt"));

    let html = engine.render("404.html", &page_context()).unwrap();
    assert_eq!(html, "custom 404 for Exercise Blog");

    // Overrides can extend embedded templates
    let html = engine.render("exercises/promo.html", &page_context()).unwrap();
    assert!(html.contains("promo"));
    assert!(html.contains("/static/site.css"));
}

#[test]
fn test_broken_override_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("base.html"), "{% if %}").unwrap();
    assert!(ThemeEngine::new(temp_dir.path(), images()).is_err());
}

#[test]
fn test_webp_function_in_templates() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("thumb.html"),
        r#"{{ webp(url=image) }}|{{ webp(url=image, width=400, height=300) }}|{{ webp(url=missing) }}"#,
    )
    .unwrap();
    let engine = ThemeEngine::new(temp_dir.path(), images()).unwrap();

    let mut context = TeraContext::new();
    context.insert("image", "https://res.cloudinary.com/demo/image/upload/v1/squat.jpg");
    context.insert("missing", &Option::<String>::None);

    let html = engine.render("thumb.html", &context).unwrap();
    assert_eq!(
        html,
        "https://res.cloudinary.com/demo/image/upload/c_fit,w_250/squat.webp|\
         https://res.cloudinary.com/demo/image/upload/c_fit,h_300,w_400/squat.webp|"
    );
}

#[test]
fn test_render_with_fallback_uses_error_template() {
    let engine = engine();
    let html = engine.render_with_fallback("does/not/exist.html", &page_context());
    assert!(html.contains("500"));
    assert!(html.contains("The page could not be displayed."));
}

#[test]
fn test_render_with_fallback_without_page_context() {
    // error.html itself needs the viewer variables, so the built-in page is used
    let html = engine().render_with_fallback("does/not/exist.html", &TeraContext::new());
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("The page could not be displayed."));
}

#[test]
fn test_render_missing_template_is_an_error() {
    assert!(engine().render("nope.html", &page_context()).is_err());
}

#[test]
fn test_simple_error_page_escapes() {
    let html = simple_error_page("<script>", "a & b");
    assert!(html.contains("&lt;script&gt;"));
    assert!(html.contains("a &amp; b"));
    assert!(!html.contains("<script>"));
}
