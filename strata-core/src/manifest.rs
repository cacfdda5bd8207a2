//! Reading and validating `package.json` manifests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

pub const MANIFEST_FILE: &str = "package.json";

/// The subset of a member `package.json` strata cares about.
///
/// Unknown fields are ignored so real-world manifests with engines,
/// exports maps and the rest parse cleanly.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageManifest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub scripts: HashMap<String, String>,
    #[serde(default)]
    pub dependencies: HashMap<String, String>,
    #[serde(default, rename = "devDependencies")]
    pub dev_dependencies: HashMap<String, String>,
}

impl PackageManifest {
    /// Reads `<dir>/package.json`.
    pub fn read(dir: &Path) -> Result<Self> {
        let path = dir.join(MANIFEST_FILE);
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::ManifestMissing(path));
            }
            Err(err) => return Err(Error::Io(err)),
        };
        serde_json::from_str(&contents).map_err(|source| Error::ManifestInvalid { path, source })
    }
}

/// A candidate workspace-root `package.json`. Only the `workspaces` field
/// matters here; its shape is validated separately so that the root walk can
/// detect the field's presence without committing to a shape.
#[derive(Debug, Clone)]
pub struct RootManifest {
    path: PathBuf,
    workspaces: Option<serde_json::Value>,
}

impl RootManifest {
    /// Reads `path` as a potential workspace root manifest.
    pub fn read(path: &Path) -> Result<Self> {
        #[derive(Deserialize)]
        struct Raw {
            #[serde(default)]
            workspaces: Option<serde_json::Value>,
        }
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::ManifestMissing(path.to_path_buf()));
            }
            Err(err) => return Err(Error::Io(err)),
        };
        let raw: Raw = serde_json::from_str(&contents).map_err(|source| Error::ManifestInvalid {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            workspaces: raw.workspaces,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the manifest declares a `workspaces` field at all, regardless
    /// of shape. The outermost ancestor for which this holds is the root.
    pub fn declares_workspaces(&self) -> bool {
        self.workspaces.is_some()
    }

    /// Validates the `workspaces` declaration and extracts the member glob
    /// patterns. The accepted shape is `{"workspaces": {"packages": [..]}}`
    /// with every entry a string. Anything else, including the bare-array
    /// form, is rejected as malformed.
    pub fn workspace_patterns(&self) -> Result<Vec<String>> {
        let malformed = || Error::DependenciesMalformed {
            path: self.path.clone(),
        };
        let workspaces = self.workspaces.as_ref().ok_or_else(malformed)?;
        let packages = workspaces
            .as_object()
            .and_then(|obj| obj.get("packages"))
            .and_then(serde_json::Value::as_array)
            .ok_or_else(malformed)?;
        packages
            .iter()
            .map(|entry| {
                entry
                    .as_str()
                    .map(str::to_string)
                    .ok_or_else(malformed)
            })
            .collect()
    }
}
