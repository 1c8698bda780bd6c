//! Package naming policy.
//!
//! Archives are named `<product>-extension-v<version>.zip`, where the version
//! is copied verbatim from the manifest and the product is either configured
//! or derived from the manifest name.

use crate::manifest::ExtensionVersion;
use std::fmt;

/// Fixed infix between product and version.
const PACKAGE_INFIX: &str = "-extension-v";

/// Fixed archive extension.
const PACKAGE_EXTENSION: &str = ".zip";

/// Turn a display name into a lowercase, hyphen-separated file name prefix.
///
/// Runs of anything other than ASCII letters and digits collapse to a single
/// hyphen; leading and trailing hyphens are dropped. A name with no usable
/// characters becomes `extension`.
///
/// # Examples
///
/// ```
/// use web_notes_packager::naming::slugify;
///
/// assert_eq!(slugify("Web Notes"), "web-notes");
/// assert_eq!(slugify("  Notes & Clips 2 "), "notes-clips-2");
/// ```
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        "extension".to_owned()
    } else {
        slug
    }
}

/// Deterministic archive file name.
///
/// # Examples
///
/// ```
/// use web_notes_packager::manifest::ExtensionVersion;
/// use web_notes_packager::naming::PackageName;
///
/// let version = ExtensionVersion::try_from("1.2.0")?;
/// let name = PackageName::new("Web Notes", version);
/// assert_eq!(name.filename(), "web-notes-extension-v1.2.0.zip");
/// # Ok::<(), web_notes_packager::error::PackagerError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageName {
    product: String,
    version: ExtensionVersion,
}

impl PackageName {
    /// Build a name from a product label (slugified) and manifest version.
    #[must_use]
    pub fn new(product: &str, version: ExtensionVersion) -> Self {
        Self {
            product: slugify(product),
            version,
        }
    }

    /// Return the slugified product prefix.
    #[must_use]
    pub fn product(&self) -> &str {
        &self.product
    }

    /// Return the version component.
    #[must_use]
    pub fn version(&self) -> &ExtensionVersion {
        &self.version
    }

    /// Return the filename as a string without consuming the value.
    #[must_use]
    pub fn filename(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{PACKAGE_INFIX}{}{PACKAGE_EXTENSION}",
            self.product, self.version
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn version(raw: &str) -> ExtensionVersion {
        ExtensionVersion::try_from(raw).expect("valid version")
    }

    #[rstest]
    #[case::spaces("Web Notes", "web-notes")]
    #[case::already_slug("web-notes", "web-notes")]
    #[case::punctuation("Notes: Pro!", "notes-pro")]
    #[case::underscores("web__notes", "web-notes")]
    #[case::non_ascii("Café Notes", "caf-notes")]
    #[case::nothing_usable("***", "extension")]
    fn slugify_cases(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(slugify(input), expected);
    }

    #[rstest]
    fn version_is_embedded_verbatim() {
        let name = PackageName::new("web-notes", version("2.10.3.1"));
        assert_eq!(name.filename(), "web-notes-extension-v2.10.3.1.zip");
        assert_eq!(name.version().as_str(), "2.10.3.1");
    }

    #[rstest]
    fn product_is_normalised() {
        let name = PackageName::new("Web Notes", version("1.2.0"));
        assert_eq!(name.product(), "web-notes");
        assert_eq!(name.to_string(), "web-notes-extension-v1.2.0.zip");
    }
}
