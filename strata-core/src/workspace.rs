//! Workspace discovery: root walk, member expansion, manifest loading.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::manifest::{PackageManifest, RootManifest, MANIFEST_FILE};
use crate::package::Package;

/// Directories never treated as workspace members even when a pattern
/// matches them.
pub const DEFAULT_EXCLUDES: &[&str] = &["tree-sitter-rtf"];

#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Package directory names to drop from the member set.
    pub exclude: Vec<String>,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            exclude: DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// A discovered workspace: its root directory and member packages keyed by
/// name, in name order.
#[derive(Debug, Clone, Serialize)]
pub struct Workspace {
    pub root_dir: PathBuf,
    pub packages: IndexMap<String, Package>,
}

impl Workspace {
    pub fn package_names(&self) -> impl Iterator<Item = &str> {
        self.packages.keys().map(String::as_str)
    }
}

/// Walks from `start` up to (but not past) `home`, returning the outermost
/// ancestor whose `package.json` declares a `workspaces` field.
///
/// `home` itself and the filesystem root are boundaries, never candidates.
pub fn find_root(start: &Path, home: &Path) -> Result<RootManifest> {
    let mut outermost: Option<RootManifest> = None;
    let mut dir = start.to_path_buf();
    loop {
        if dir == home {
            break;
        }
        let manifest_path = dir.join(MANIFEST_FILE);
        match RootManifest::read(&manifest_path) {
            Ok(manifest) => {
                if manifest.declares_workspaces() {
                    debug!(path = %manifest_path.display(), "workspace root candidate");
                    outermost = Some(manifest);
                }
            }
            Err(Error::ManifestMissing(_)) => {}
            Err(Error::ManifestInvalid { path, .. }) => {
                warn!(path = %path.display(), "skipping unparseable manifest during root walk");
            }
            Err(err) => return Err(err),
        }
        match dir.parent() {
            Some(parent) => dir = parent.to_path_buf(),
            None => break,
        }
    }
    outermost.ok_or_else(|| Error::RootNotFound(start.to_path_buf()))
}

/// Expands workspace member glob patterns into the set of member directories.
/// A directory only counts as a member when it contains a `package.json`.
pub fn expand_members(root_dir: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut members = Vec::new();
    for pattern in patterns {
        let full = root_dir.join(pattern);
        let full = full.to_string_lossy().into_owned();
        let paths = glob::glob(&full).map_err(|source| Error::MemberPattern {
            pattern: pattern.clone(),
            source,
        })?;
        for entry in paths {
            let path = entry.map_err(|err| Error::Io(err.into_error()))?;
            if path.is_dir() && path.join(MANIFEST_FILE).is_file() {
                members.push(path);
            }
        }
    }
    members.sort();
    members.dedup();
    Ok(members)
}

/// Discovers the workspace containing `start`, resolving the home directory
/// as the upper boundary of the root walk.
pub fn discover(start: &Path, options: &DiscoveryOptions) -> Result<Workspace> {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/"));
    discover_from(start, &home, options)
}

/// Discovery with an explicit walk boundary.
pub fn discover_from(start: &Path, home: &Path, options: &DiscoveryOptions) -> Result<Workspace> {
    let root = find_root(start, home)?;
    let patterns = root.workspace_patterns()?;
    let root_dir = root
        .path()
        .parent()
        .unwrap_or_else(|| Path::new("/"))
        .to_path_buf();
    let member_dirs = expand_members(&root_dir, &patterns)?;

    let loaded: Vec<Option<Package>> = member_dirs
        .par_iter()
        .map(|dir| load_member(dir))
        .collect();

    let mut packages: Vec<Package> = loaded
        .into_iter()
        .flatten()
        .filter(|pkg| {
            let dir_name = pkg
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let excluded = options.exclude.iter().any(|e| *e == dir_name);
            if excluded {
                debug!(package = %pkg.name, "excluded by discovery options");
            }
            !excluded
        })
        .collect();
    packages.sort_by(|a, b| a.name.cmp(&b.name));

    let mut map = IndexMap::with_capacity(packages.len());
    for pkg in packages {
        map.insert(pkg.name.clone(), pkg);
    }

    Ok(Workspace {
        root_dir,
        packages: map,
    })
}

/// Loads one member manifest. Members whose manifest is missing, invalid or
/// nameless are skipped with a warning rather than failing discovery.
fn load_member(dir: &Path) -> Option<Package> {
    let manifest = match PackageManifest::read(dir) {
        Ok(manifest) => manifest,
        Err(err) => {
            warn!(path = %dir.display(), %err, "skipping member with unreadable manifest");
            return None;
        }
    };
    let Some(name) = manifest.name else {
        warn!(path = %dir.display(), "skipping member manifest without a name");
        return None;
    };
    let mut dependencies: Vec<String> = manifest.dependencies.into_keys().collect();
    dependencies.sort();
    let mut dev_dependencies: Vec<String> = manifest.dev_dependencies.into_keys().collect();
    dev_dependencies.sort();
    Some(Package::new(
        name,
        dir.to_path_buf(),
        manifest.scripts,
        dependencies,
        dev_dependencies,
    ))
}
