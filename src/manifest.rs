//! Extension manifest inspection.
//!
//! The packager only cares about a handful of manifest fields: the three
//! declarations every store requires (`manifest_version`, `name`, `version`)
//! and the icon references it rewrites in the staged copy. Everything else is
//! carried through untouched, in its original key order.

use crate::error::{PackagerError, Result};
use crate::icons::IconSpec;
use camino::{Utf8Path, Utf8PathBuf};
use serde_json::{Map, Value};
use std::fmt;

/// Fields the host platform refuses to load a manifest without.
pub const REQUIRED_FIELDS: &[&str] = &["manifest_version", "name", "version"];

const ABSENT: &str = "missing";
const MALFORMED_VERSION: &str = "not a version of one to four dot-separated numbers";

/// Manifest keys whose values map icon sizes to asset paths.
const ICON_MAP_PATHS: &[&[&str]] = &[
    &["icons"],
    &["action", "default_icon"],
    &["browser_action", "default_icon"],
];

/// A validated extension version string.
///
/// Browser stores accept one to four dot-separated integers (`1`, `1.2`,
/// `1.2.0`, `1.2.0.7`). The value is embedded verbatim in the package file
/// name, so anything else is rejected.
///
/// # Examples
///
/// ```
/// use web_notes_packager::manifest::ExtensionVersion;
///
/// let version = ExtensionVersion::try_from("1.2.0").expect("valid version");
/// assert_eq!(version.as_str(), "1.2.0");
/// assert!(ExtensionVersion::try_from("1.2-beta").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExtensionVersion(String);

impl ExtensionVersion {
    /// Return the version as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for ExtensionVersion {
    type Error = PackagerError;

    fn try_from(value: &str) -> Result<Self> {
        let components: Vec<&str> = value.split('.').collect();
        let well_formed = (1..=4).contains(&components.len())
            && components.iter().all(|part| {
                !part.is_empty() && part.len() <= 5 && part.bytes().all(|b| b.is_ascii_digit())
            });
        if well_formed {
            Ok(Self(value.to_owned()))
        } else {
            Err(PackagerError::ManifestFieldMissing {
                field: "version",
                problem: MALFORMED_VERSION,
            })
        }
    }
}

impl fmt::Display for ExtensionVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extract the `version` field from a manifest document.
///
/// # Errors
///
/// Returns [`PackagerError::ManifestFieldMissing`] saying whether the field
/// is absent, not a string, or not a well-formed version.
///
/// # Examples
///
/// ```
/// use web_notes_packager::manifest::read_version;
///
/// let document = serde_json::json!({"version": "1.2.0"});
/// assert_eq!(read_version(&document).expect("version").as_str(), "1.2.0");
/// ```
pub fn read_version(document: &Value) -> Result<ExtensionVersion> {
    version_field(document.get("version"))
}

fn version_field(value: Option<&Value>) -> Result<ExtensionVersion> {
    let problem = match value {
        Some(Value::String(raw)) => return ExtensionVersion::try_from(raw.as_str()),
        Some(_) => "not a string",
        None => ABSENT,
    };
    Err(PackagerError::ManifestFieldMissing {
        field: "version",
        problem,
    })
}

/// A parsed, validated manifest.
#[derive(Debug, Clone)]
pub struct Manifest {
    path: Utf8PathBuf,
    document: Map<String, Value>,
}

impl Manifest {
    /// Read and validate the manifest at `path`.
    ///
    /// Purely read-only: nothing is written, so it is safe to run before any
    /// staging work.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::ManifestParse`] on unreadable or malformed
    /// JSON and [`PackagerError::ManifestFieldMissing`] naming the first
    /// required field that is absent or malformed, and what is wrong with it.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| PackagerError::ManifestParse {
            path: path.to_owned(),
            reason: e.to_string(),
        })?;
        Self::parse(path, &text)
    }

    /// Parse and validate manifest text, attributing errors to `path`.
    ///
    /// # Errors
    ///
    /// See [`Manifest::load`].
    pub fn parse(path: &Utf8Path, text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text).map_err(|e| PackagerError::ManifestParse {
            path: path.to_owned(),
            reason: e.to_string(),
        })?;
        let Value::Object(document) = value else {
            return Err(PackagerError::ManifestParse {
                path: path.to_owned(),
                reason: "top-level value must be a JSON object".to_owned(),
            });
        };

        let manifest = Self {
            path: path.to_owned(),
            document,
        };
        manifest.check_required_fields()?;
        Ok(manifest)
    }

    fn check_required_fields(&self) -> Result<()> {
        for field in REQUIRED_FIELDS.iter().copied() {
            if let Some(problem) = self.field_problem(field) {
                return Err(PackagerError::ManifestFieldMissing { field, problem });
            }
        }
        self.version().map(|_| ())
    }

    fn field_problem(&self, field: &str) -> Option<&'static str> {
        let numeric = field == "manifest_version";
        match self.document.get(field) {
            None | Some(Value::Null) => Some(ABSENT),
            Some(Value::Number(n)) if numeric && n.is_u64() => None,
            Some(_) if numeric => Some("not a non-negative integer"),
            Some(Value::String(s)) if s.trim().is_empty() => Some("blank"),
            Some(Value::String(_)) => None,
            Some(_) => Some("not a string"),
        }
    }

    /// Return the path the manifest was read from.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Return the declared version.
    ///
    /// # Errors
    ///
    /// Cannot fail for a manifest built by [`Manifest::parse`]; the signature
    /// mirrors [`read_version`].
    pub fn version(&self) -> Result<ExtensionVersion> {
        version_field(self.document.get("version"))
    }

    /// Return the declared extension name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.document
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Return the `manifest_version` declaration.
    #[must_use]
    pub fn manifest_version(&self) -> u64 {
        self.document
            .get("manifest_version")
            .and_then(Value::as_u64)
            .unwrap_or_default()
    }

    /// Return the `icons` mapping as `(size, path)` pairs.
    #[must_use]
    pub fn icons(&self) -> Vec<(String, String)> {
        self.document
            .get("icons")
            .and_then(Value::as_object)
            .map(|icons| {
                icons
                    .iter()
                    .filter_map(|(size, path)| Some((size.clone(), path.as_str()?.to_owned())))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Return a copy whose icon references point at the raster files the
    /// icon converter produces (`icon16.svg` → `16.png`).
    ///
    /// Every icon map (`icons`, `action.default_icon`,
    /// `browser_action.default_icon`) is rewritten; entries that do not
    /// reference a vector source from `spec` are left alone. The source
    /// manifest is not modified.
    #[must_use]
    pub fn with_raster_icons(&self, spec: &IconSpec) -> Self {
        let mut document = self.document.clone();
        for path in ICON_MAP_PATHS {
            if let Some(Value::Object(icons)) = lookup_mut(&mut document, path) {
                rewrite_icon_map(icons, spec);
            }
        }
        Self {
            path: self.path.clone(),
            document,
        }
    }

    /// Serialise the manifest as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::Io`] if serialisation fails.
    pub fn to_json(&self) -> Result<String> {
        let mut text = serde_json::to_string_pretty(&self.document).map_err(std::io::Error::from)?;
        text.push('\n');
        Ok(text)
    }

    /// Write the manifest to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::Io`] if the file cannot be written.
    pub fn write_to(&self, path: &Utf8Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

fn lookup_mut<'a>(document: &'a mut Map<String, Value>, path: &[&str]) -> Option<&'a mut Value> {
    let (first, rest) = path.split_first()?;
    rest.iter()
        .try_fold(document.get_mut(*first)?, |value, key| value.get_mut(*key))
}

fn rewrite_icon_map(icons: &mut Map<String, Value>, spec: &IconSpec) {
    for value in icons.values_mut() {
        let Some(current) = value.as_str() else {
            continue;
        };
        if let Some(raster) = spec.raster_for_source(current) {
            *value = Value::String(raster);
        }
    }
}
