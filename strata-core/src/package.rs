//! Package data model.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Serialize, Serializer};
use smallvec::SmallVec;

/// The lifecycle scripts strata knows how to orchestrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptKind {
    Build,
    Lint,
    Test,
}

impl ScriptKind {
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            ScriptKind::Build => "build",
            ScriptKind::Lint => "lint",
            ScriptKind::Test => "test",
        }
    }
}

impl fmt::Display for ScriptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A workspace member package, as read from its manifest.
///
/// Dependency lists hold the raw names declared in the manifest; the
/// intersection with actual workspace members happens at graph build time.
#[derive(Debug, Clone, Serialize)]
pub struct Package {
    pub name: String,
    pub path: PathBuf,
    pub scripts: HashMap<String, String>,
    #[serde(serialize_with = "serialize_deps")]
    pub dependencies: SmallVec<[String; 4]>,
    #[serde(rename = "devDependencies", serialize_with = "serialize_deps")]
    pub dev_dependencies: SmallVec<[String; 4]>,
}

fn serialize_deps<S>(deps: &SmallVec<[String; 4]>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_seq(deps.iter())
}

impl Package {
    pub fn new(
        name: String,
        path: PathBuf,
        scripts: HashMap<String, String>,
        dependencies: Vec<String>,
        dev_dependencies: Vec<String>,
    ) -> Self {
        Self {
            name,
            path,
            scripts,
            dependencies: SmallVec::from_vec(dependencies),
            dev_dependencies: SmallVec::from_vec(dev_dependencies),
        }
    }

    /// The command string registered for a script, if the package declares it.
    /// Packages without a given script are treated as trivially succeeding.
    pub fn script(&self, kind: ScriptKind) -> Option<&str> {
        self.scripts.get(kind.as_str()).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pkg(deps: &[&str]) -> Package {
        Package::new(
            "app".to_string(),
            PathBuf::from("/ws/app"),
            HashMap::from([("build".to_string(), "tsc -b".to_string())]),
            deps.iter().map(|s| s.to_string()).collect(),
            vec![],
        )
    }

    #[test]
    fn script_lookup_by_kind() {
        let p = pkg(&[]);
        assert_eq!(p.script(ScriptKind::Build), Some("tsc -b"));
        assert_eq!(p.script(ScriptKind::Lint), None);
        assert_eq!(p.script(ScriptKind::Test), None);
    }

    #[test]
    fn script_kind_display_is_lowercase() {
        assert_eq!(ScriptKind::Build.to_string(), "build");
        assert_eq!(ScriptKind::Lint.to_string(), "lint");
        assert_eq!(ScriptKind::Test.to_string(), "test");
    }

    #[test]
    fn package_serializes_dep_lists_as_arrays() {
        let p = pkg(&["lib", "util"]);
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["dependencies"], serde_json::json!(["lib", "util"]));
        assert_eq!(json["devDependencies"], serde_json::json!([]));
    }
}
