//! Server-wide settings consulted by the resource layer
//!
//! Loaded from TOML; every field has a default so an empty document is a
//! valid configuration.

use crate::errors::{FolioError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

pub const CC_PUBLIC_DOMAIN: &str = "http://creativecommons.org/licenses/publicdomain/";
pub const CC_BY_3_0: &str = "http://creativecommons.org/licenses/by/3.0/";
pub const CC_BY_SA_3_0: &str = "http://creativecommons.org/licenses/by-sa/3.0/";

/// 20 MiB
pub const DEFAULT_MAX_RESOURCE_SIZE: u64 = 20 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Licenses content on this server may be published under
    pub allowed_licenses: Vec<String>,
    /// Injected into licensed resources saved without any license
    pub default_license: String,
    /// Parent license -> licenses a derivative may carry
    pub license_compatibility: BTreeMap<String, Vec<String>>,
    /// Host used to build absolute author URLs
    pub site_domain: Option<String>,
    pub max_resource_size: u64,
}

impl Default for Settings {
    fn default() -> Self {
        let mut license_compatibility = BTreeMap::new();
        license_compatibility.insert(
            CC_PUBLIC_DOMAIN.to_string(),
            vec![
                CC_PUBLIC_DOMAIN.to_string(),
                CC_BY_3_0.to_string(),
                CC_BY_SA_3_0.to_string(),
            ],
        );
        license_compatibility.insert(
            CC_BY_3_0.to_string(),
            vec![CC_BY_3_0.to_string(), CC_BY_SA_3_0.to_string()],
        );
        license_compatibility.insert(CC_BY_SA_3_0.to_string(), vec![CC_BY_SA_3_0.to_string()]);

        Self {
            allowed_licenses: vec![
                CC_PUBLIC_DOMAIN.to_string(),
                CC_BY_3_0.to_string(),
                CC_BY_SA_3_0.to_string(),
            ],
            default_license: CC_BY_SA_3_0.to_string(),
            license_compatibility,
            site_domain: None,
            max_resource_size: DEFAULT_MAX_RESOURCE_SIZE,
        }
    }
}

impl Settings {
    /// # Errors
    ///
    /// `Config` if the document is not valid TOML for this shape or fails
    /// [`Settings::validate`]
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(s).map_err(|e| FolioError::Config {
            message: e.to_string(),
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// # Errors
    ///
    /// `Io` if the file cannot be read, otherwise as [`Settings::from_toml_str`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| FolioError::Io {
            op: "load_settings".to_string(),
            message: format!("{}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&text)
    }

    /// # Errors
    ///
    /// `Config` if the default license is not itself allowed, or the size
    /// limit is zero
    pub fn validate(&self) -> Result<()> {
        if !self.is_allowed_license(&self.default_license) {
            return Err(FolioError::Config {
                message: format!(
                    "default license {} is not in allowed_licenses",
                    self.default_license
                ),
            });
        }
        if self.max_resource_size == 0 {
            return Err(FolioError::Config {
                message: "max_resource_size must be positive".to_string(),
            });
        }
        Ok(())
    }

    pub fn is_allowed_license(&self, license: &str) -> bool {
        self.allowed_licenses.iter().any(|l| l == license)
    }

    /// Licenses a derivative of `parent_license` may be published under
    ///
    /// A license missing from the table is compatible only with itself.
    pub fn compatible_licenses<'a>(&'a self, parent_license: &'a str) -> Vec<&'a str> {
        match self.license_compatibility.get(parent_license) {
            Some(list) => list.iter().map(String::as_str).collect(),
            None => vec![parent_license],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        settings.validate().unwrap();
        assert_eq!(settings.default_license, CC_BY_SA_3_0);
        assert_eq!(settings.max_resource_size, 20 * 1024 * 1024);
    }

    #[test]
    fn test_empty_toml_gives_defaults() {
        let settings = Settings::from_toml_str("").unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_toml_overrides() {
        let settings = Settings::from_toml_str(
            r#"
            allowed_licenses = ["lic:a", "lic:b"]
            default_license = "lic:b"
            site_domain = "example.org"

            [license_compatibility]
            "lic:a" = ["lic:a", "lic:b"]
            "#,
        )
        .unwrap();
        assert_eq!(settings.allowed_licenses, vec!["lic:a", "lic:b"]);
        assert_eq!(settings.site_domain.as_deref(), Some("example.org"));
        assert_eq!(settings.compatible_licenses("lic:a"), vec!["lic:a", "lic:b"]);
        assert_eq!(settings.compatible_licenses("lic:b"), vec!["lic:b"]);
    }

    #[test]
    fn test_default_license_must_be_allowed() {
        let err = Settings::from_toml_str(
            r#"
            allowed_licenses = ["lic:a"]
            default_license = "lic:b"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, FolioError::Config { .. }));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = Settings::from_toml_str("allowed_licences = []").unwrap_err();
        assert!(matches!(err, FolioError::Config { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("folio.toml");
        std::fs::write(&path, "max_resource_size = 1024\n").unwrap();

        let settings = Settings::load(&path).unwrap();

        assert_eq!(settings.max_resource_size, 1024);
        assert_eq!(settings.default_license, CC_BY_SA_3_0);
    }

    #[test]
    fn test_load_missing_file() {
        let err = Settings::load("/nonexistent/folio.toml").unwrap_err();
        assert!(matches!(err, FolioError::Io { .. }));
    }
}
