//! Build packaging
//!
//! After the bundler runs, the stylesheet has a content-hashed name. This step
//! writes that name into the manifest's web-accessible resources and into the
//! placeholder token inside the content script.
//!
//! Expected build layout:
//! - manifest.json
//! - static/css/<hashed>.css
//! - static/js/content.js

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Token in the content script replaced by the stylesheet path
pub const CSS_PLACEHOLDER: &str = "__REPLACE_ON_BUILD__";

/// Packaging errors
#[derive(Error, Debug)]
pub enum PackagingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Could not find css file in {0:?}")]
    MissingCss(PathBuf),

    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),
}

/// What the packaging step changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagingReport {
    /// Stylesheet path as referenced from the extension root
    pub css_path: String,

    /// Number of placeholder tokens replaced in the content script
    pub replacements: usize,
}

/// Name of the stylesheet in `<build>/static/css`.
///
/// If several exist the alphabetically first is used.
pub fn find_css_file(build_dir: &Path) -> Result<String, PackagingError> {
    let css_dir = build_dir.join("static").join("css");
    let mut names: Vec<String> = fs::read_dir(&css_dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.ends_with(".css"))
        .collect();
    names.sort();

    names
        .into_iter()
        .next()
        .ok_or(PackagingError::MissingCss(css_dir))
}

/// Put `css_path` into `web_accessible_resources[0].resources[0]`
pub fn update_manifest(manifest_path: &Path, css_path: &str) -> Result<(), PackagingError> {
    let content = fs::read_to_string(manifest_path)?;
    let mut manifest: Value = serde_json::from_str(&content)?;

    let slot = manifest
        .get_mut("web_accessible_resources")
        .and_then(|v| v.get_mut(0))
        .and_then(|v| v.get_mut("resources"))
        .and_then(|v| v.get_mut(0))
        .ok_or_else(|| {
            PackagingError::InvalidManifest(
                "web_accessible_resources[0].resources[0] is missing".to_string(),
            )
        })?;
    *slot = Value::String(css_path.to_string());

    fs::write(manifest_path, serde_json::to_string_pretty(&manifest)?)?;
    Ok(())
}

/// Replace every placeholder in the script, returning how many were replaced
pub fn update_content_script(script_path: &Path, css_path: &str) -> Result<usize, PackagingError> {
    let content = fs::read_to_string(script_path)?;
    let count = content.matches(CSS_PLACEHOLDER).count();
    if count > 0 {
        fs::write(script_path, content.replace(CSS_PLACEHOLDER, css_path))?;
    }
    Ok(count)
}

/// Run the whole packaging step on a build directory
pub fn run(build_dir: &Path) -> Result<PackagingReport, PackagingError> {
    let file_name = find_css_file(build_dir)?;
    tracing::info!("Found stylesheet: {}", file_name);

    let css_path = format!("/static/css/{}", file_name);
    update_manifest(&build_dir.join("manifest.json"), &css_path)?;
    let replacements =
        update_content_script(&build_dir.join("static").join("js").join("content.js"), &css_path)?;

    if replacements == 0 {
        tracing::warn!("No {} token found in content script", CSS_PLACEHOLDER);
    }
    tracing::info!("Packaging complete ({} replacement(s))", replacements);

    Ok(PackagingReport {
        css_path,
        replacements,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn build_dir() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("static/css")).unwrap();
        fs::create_dir_all(root.join("static/js")).unwrap();
        fs::write(root.join("static/css/main.3f2a9c.css"), "body{}").unwrap();
        fs::write(root.join("static/css/main.3f2a9c.css.map"), "{}").unwrap();
        fs::write(
            root.join("static/js/content.js"),
            "link.href = chrome.runtime.getURL('__REPLACE_ON_BUILD__'); /* __REPLACE_ON_BUILD__ */",
        )
        .unwrap();
        fs::write(
            root.join("manifest.json"),
            r#"{"manifest_version": 3, "web_accessible_resources": [{"resources": ["placeholder"], "matches": ["<all_urls>"]}]}"#,
        )
        .unwrap();
        dir
    }

    #[test]
    fn test_run_rewrites_manifest_and_script() {
        let dir = build_dir();

        let report = run(dir.path()).unwrap();

        assert_eq!(report.css_path, "/static/css/main.3f2a9c.css");
        assert_eq!(report.replacements, 2);

        let manifest: Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("manifest.json")).unwrap()).unwrap();
        assert_eq!(
            manifest["web_accessible_resources"][0]["resources"][0],
            "/static/css/main.3f2a9c.css"
        );
        assert_eq!(manifest["manifest_version"], 3);

        let script = fs::read_to_string(dir.path().join("static/js/content.js")).unwrap();
        assert!(!script.contains(CSS_PLACEHOLDER));
        assert!(script.contains("getURL('/static/css/main.3f2a9c.css')"));
    }

    #[test]
    fn test_missing_css_is_reported() {
        let dir = build_dir();
        fs::remove_file(dir.path().join("static/css/main.3f2a9c.css")).unwrap();

        assert!(matches!(run(dir.path()), Err(PackagingError::MissingCss(_))));
    }

    #[test]
    fn test_manifest_without_resources_is_rejected() {
        let dir = build_dir();
        let manifest = dir.path().join("manifest.json");
        fs::write(&manifest, r#"{"manifest_version": 3}"#).unwrap();

        assert!(matches!(
            update_manifest(&manifest, "/static/css/a.css"),
            Err(PackagingError::InvalidManifest(_))
        ));
    }
}
