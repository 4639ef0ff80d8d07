//! Stylesheet and page script, embedded in the binary

use axum::{
    extract::Path,
    http::header,
    response::{IntoResponse, Response},
};
use rust_embed::RustEmbed;

use crate::web::middleware::WebError;

#[derive(RustEmbed)]
#[folder = "static/"]
struct StaticAssets;

/// GET /static/{*path}
pub async fn serve_static(Path(path): Path<String>) -> Result<Response, WebError> {
    let path = urlencoding::decode(&path)
        .map(|p| p.into_owned())
        .unwrap_or(path);
    let asset = StaticAssets::get(&path).ok_or_else(|| WebError::NotFound(format!("static {}", path)))?;

    Ok((
        [
            (header::CONTENT_TYPE, content_type(&path)),
            (header::CACHE_CONTROL, "public, max-age=3600"),
        ],
        asset.data.into_owned(),
    )
        .into_response())
}

fn content_type(path: &str) -> &'static str {
    match path.rsplit('.').next().unwrap_or("") {
        "css" => "text/css",
        "js" => "application/javascript",
        "png" => "image/png",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type() {
        assert_eq!(content_type("site.css"), "text/css");
        assert_eq!(content_type("report.js"), "application/javascript");
        assert_eq!(content_type("README"), "application/octet-stream");
    }

    #[test]
    fn test_assets_are_embedded() {
        assert!(StaticAssets::get("site.css").is_some());
        assert!(StaticAssets::get("report.js").is_some());
    }
}
