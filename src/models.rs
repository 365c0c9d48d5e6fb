use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::FetchError;

/// A dependency of the scanned Go module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Module {
    pub path: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub indirect: bool,
    /// Error reported by `go list` while loading the module.
    #[serde(default)]
    pub error: Option<ModuleError>,
}

impl Module {
    pub fn new(path: impl Into<String>, version: impl Into<String>, indirect: bool) -> Self {
        Self {
            path: path.into(),
            version: version.into(),
            indirect,
            error: None,
        }
    }
}

impl std::fmt::Display for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.version.is_empty() {
            write!(f, "{}", self.path)
        } else {
            write!(f, "{}@{}", self.path, self.version)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleError {
    #[serde(rename = "Err")]
    pub err: String,
}

/// License metadata scraped from a module's licenses page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct License {
    /// License identifier, e.g. `MIT`.
    pub license_type: String,
    /// Path of the license file inside the module.
    pub source: String,
    /// Full license text.
    pub content: String,
}

/// Outcome of looking up a single module.
///
/// Both variants carry the module and the URI that was requested so a
/// consumer can correlate results arriving in completion order.
#[derive(Debug)]
pub enum LicenseResult {
    Success {
        module: Module,
        uri: String,
        license: License,
    },
    Failure {
        module: Module,
        uri: String,
        error: FetchError,
    },
}

impl LicenseResult {
    pub fn module(&self) -> &Module {
        match self {
            LicenseResult::Success { module, .. } | LicenseResult::Failure { module, .. } => module,
        }
    }

    pub fn uri(&self) -> &str {
        match self {
            LicenseResult::Success { uri, .. } | LicenseResult::Failure { uri, .. } => uri,
        }
    }

    pub fn license(&self) -> Option<&License> {
        match self {
            LicenseResult::Success { license, .. } => Some(license),
            LicenseResult::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&FetchError> {
        match self {
            LicenseResult::Success { .. } => None,
            LicenseResult::Failure { error, .. } => Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, LicenseResult::Success { .. })
    }
}

impl Serialize for LicenseResult {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            LicenseResult::Success {
                module,
                uri,
                license,
            } => {
                let mut map = serializer.serialize_map(Some(5))?;
                map.serialize_entry("Module", module)?;
                map.serialize_entry("URI", uri)?;
                map.serialize_entry("Source", &license.source)?;
                map.serialize_entry("Content", &license.content)?;
                map.serialize_entry("Type", &license.license_type)?;
                map.end()
            }
            LicenseResult::Failure { module, uri, error } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("Module", module)?;
                map.serialize_entry("URI", uri)?;
                map.serialize_entry("Err", &error.to_string())?;
                map.end()
            }
        }
    }
}
