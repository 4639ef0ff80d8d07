//! Hosted image delivery URLs
//!
//! Images live on a Cloudinary-style service. This module only builds
//! delivery URLs that ask the service for a webp rendition; nothing here
//! performs network I/O.

use serde_json::Value;
use std::collections::HashMap;

/// Width used when a template does not pass one
pub const DEFAULT_WIDTH: u32 = 250;

/// Builds delivery URLs for one cloud account
#[derive(Debug, Clone)]
pub struct CloudinaryUrlBuilder {
    cloud_name: String,
    secure: bool,
}

impl CloudinaryUrlBuilder {
    pub fn new(cloud_name: impl Into<String>, secure: bool) -> Self {
        Self {
            cloud_name: cloud_name.into(),
            secure,
        }
    }

    pub fn from_config(config: &crate::config::ImageConfig) -> Self {
        Self::new(config.cloud_name.clone(), config.secure)
    }

    fn base(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{}://res.cloudinary.com/{}/image/upload", scheme, self.cloud_name)
    }

    /// webp rendition of `url`, fitted into `width` and optionally `height`.
    ///
    /// An empty reference yields an empty string. A height of zero is
    /// treated as absent.
    pub fn webp_url(&self, url: &str, width: u32, height: Option<u32>) -> String {
        if url.is_empty() {
            return String::new();
        }

        let public_id = public_id_from_url(url);
        let mut transformation = String::from("c_fit");
        if let Some(height) = height.filter(|h| *h > 0) {
            transformation.push_str(&format!(",h_{}", height));
        }
        transformation.push_str(&format!(",w_{}", width));

        format!("{}/{}/{}.webp", self.base(), transformation, public_id)
    }

    /// Untransformed webp rendition used for admin thumbnails
    pub fn thumbnail_url(&self, image: &str) -> String {
        let image = image.trim();
        if image.is_empty() {
            return String::new();
        }
        let public_id = if image.contains("://") {
            public_id_from_url(image).to_string()
        } else {
            strip_extension(image).to_string()
        };
        format!("{}/{}.webp", self.base(), public_id)
    }
}

/// Last `/` segment of `url`, cut at its first `.`
pub fn public_id_from_url(url: &str) -> &str {
    let last = url.rsplit('/').next().unwrap_or(url);
    last.split('.').next().unwrap_or(last)
}

/// Drop the extension from the final path segment of a bare public id
fn strip_extension(public_id: &str) -> &str {
    match public_id.rfind('/') {
        Some(slash) => {
            let tail = &public_id[slash + 1..];
            match tail.find('.') {
                Some(dot) => &public_id[..slash + 1 + dot],
                None => public_id,
            }
        }
        None => public_id.split('.').next().unwrap_or(public_id),
    }
}

/// Template function `webp(url=..., width=250, height=None)`
pub struct WebpFunction {
    builder: CloudinaryUrlBuilder,
}

impl WebpFunction {
    pub fn new(builder: CloudinaryUrlBuilder) -> Self {
        Self { builder }
    }
}

/// Positive integer argument; anything unusable counts as absent
fn dimension(args: &HashMap<String, Value>, key: &str) -> Option<u32> {
    let value = match args.get(key)? {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    };
    value.filter(|v| *v > 0)
}

impl tera::Function for WebpFunction {
    fn call(&self, args: &HashMap<String, Value>) -> tera::Result<Value> {
        let url = match args.get("url") {
            Some(Value::String(s)) => s.as_str(),
            _ => "",
        };
        let width = dimension(args, "width").unwrap_or(DEFAULT_WIDTH);
        let height = dimension(args, "height");

        Ok(Value::String(self.builder.webp_url(url, width, height)))
    }

    fn is_safe(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tera::Function;

    fn builder() -> CloudinaryUrlBuilder {
        CloudinaryUrlBuilder::new("demo", true)
    }

    #[test]
    fn test_empty_url_is_empty() {
        assert_eq!(builder().webp_url("", 250, None), "");
        assert_eq!(builder().thumbnail_url(""), "");
    }

    #[test]
    fn test_width_only() {
        let url = builder().webp_url(
            "https://res.cloudinary.com/demo/image/upload/v123/abc123.jpg",
            250,
            None,
        );
        assert_eq!(
            url,
            "https://res.cloudinary.com/demo/image/upload/c_fit,w_250/abc123.webp"
        );
        assert!(!url.contains("h_"));
    }

    #[test]
    fn test_width_and_height() {
        let url = builder().webp_url("http://x/y/plank.png", 400, Some(300));
        assert_eq!(
            url,
            "https://res.cloudinary.com/demo/image/upload/c_fit,h_300,w_400/plank.webp"
        );
    }

    #[test]
    fn test_zero_height_is_absent() {
        let url = builder().webp_url("abc.jpg", 100, Some(0));
        assert_eq!(url, "https://res.cloudinary.com/demo/image/upload/c_fit,w_100/abc.webp");
    }

    #[test]
    fn test_public_id_cut_at_first_dot() {
        assert_eq!(public_id_from_url("a/b/name.v2.final.jpg"), "name");
        assert_eq!(public_id_from_url("no-slashes"), "no-slashes");
        assert_eq!(public_id_from_url("trailing/"), "");
    }

    #[test]
    fn test_insecure_scheme() {
        let url = CloudinaryUrlBuilder::new("gym", false).webp_url("x.jpg", 250, None);
        assert!(url.starts_with("http://res.cloudinary.com/gym/"));
    }

    #[test]
    fn test_thumbnail() {
        let b = builder();
        assert_eq!(
            b.thumbnail_url("https://res.cloudinary.com/demo/image/upload/v1/squat.jpg"),
            "https://res.cloudinary.com/demo/image/upload/squat.webp"
        );
        assert_eq!(
            b.thumbnail_url("exercises/squat.jpg"),
            "https://res.cloudinary.com/demo/image/upload/exercises/squat.webp"
        );
        assert_eq!(
            b.thumbnail_url("squat"),
            "https://res.cloudinary.com/demo/image/upload/squat.webp"
        );
    }

    #[test]
    fn test_template_function_defaults() {
        let f = WebpFunction::new(builder());
        let mut args = HashMap::new();
        args.insert("url".to_string(), Value::String("a/b/lunge.jpg".to_string()));

        let value = f.call(&args).unwrap();
        assert_eq!(
            value,
            Value::String("https://res.cloudinary.com/demo/image/upload/c_fit,w_250/lunge.webp".to_string())
        );

        args.insert("width".to_string(), serde_json::json!(600));
        args.insert("height".to_string(), serde_json::json!(400));
        let value = f.call(&args).unwrap();
        assert!(value.as_str().unwrap().contains("c_fit,h_400,w_600"));
    }

    #[test]
    fn test_template_function_missing_or_null_url() {
        let f = WebpFunction::new(builder());
        let mut args = HashMap::new();
        assert_eq!(f.call(&args).unwrap(), Value::String(String::new()));

        args.insert("url".to_string(), Value::Null);
        assert_eq!(f.call(&args).unwrap(), Value::String(String::new()));
    }

    #[test]
    fn test_template_function_bad_width() {
        let f = WebpFunction::new(builder());
        let mut args = HashMap::new();
        args.insert("url".to_string(), Value::String("x.jpg".to_string()));
        args.insert("width".to_string(), serde_json::json!(-5));
        args.insert("height".to_string(), Value::String("tall".to_string()));
        assert_eq!(
            f.call(&args).unwrap(),
            Value::String(builder().webp_url("x.jpg", DEFAULT_WIDTH, None))
        );

        args.insert("width".to_string(), Value::String("auto".to_string()));
        args.insert("height".to_string(), serde_json::json!(true));
        assert_eq!(
            f.call(&args).unwrap(),
            Value::String(builder().webp_url("x.jpg", DEFAULT_WIDTH, None))
        );
    }

    proptest! {
        #[test]
        fn webp_url_shape(
            folder in "[a-z0-9]{1,8}",
            id in "[a-zA-Z0-9_-]{1,16}",
            ext in "(jpg|png|gif)",
            width in 1u32..2000,
        ) {
            let url = builder().webp_url(&format!("https://host/{}/{}.{}", folder, id, ext), width, None);
            let expected_suffix = format!("/c_fit,w_{}/{}.webp", width, id);
            prop_assert!(url.ends_with(&expected_suffix));
            prop_assert!(!url.contains(",h_"));
        }
    }
}
