//! Run status events and their aggregation into a final report.

use indexmap::IndexMap;
use serde::Serialize;

use crate::package::ScriptKind;

/// Terminal and transient states of one (package, script) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptStatus {
    Running,
    Success,
    Error,
    Skip,
}

/// One event on the status channel.
#[derive(Debug, Clone, Serialize)]
pub struct StatusUpdate {
    pub package: String,
    pub script: ScriptKind,
    pub status: ScriptStatus,
    pub output: Option<String>,
}

/// The last known state of one script, with whatever output it produced.
#[derive(Debug, Clone, Serialize)]
pub struct ScriptRecord {
    pub status: ScriptStatus,
    pub output: String,
}

/// Accumulated run state, keyed by package then script.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub packages: IndexMap<String, IndexMap<ScriptKind, ScriptRecord>>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the report with empty entries so package order matches the
    /// workspace even before any event arrives.
    pub fn with_packages<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut packages = IndexMap::new();
        for name in names {
            packages.insert(name.into(), IndexMap::new());
        }
        Self { packages }
    }

    /// Records an event, replacing any earlier state for the same script.
    pub fn apply(&mut self, update: StatusUpdate) {
        let scripts = self.packages.entry(update.package).or_default();
        scripts.insert(
            update.script,
            ScriptRecord {
                status: update.status,
                output: update.output.unwrap_or_default(),
            },
        );
    }

    /// Collapses a package's script states into one displayable status.
    /// Running wins over everything, then Error, then Skip; Success only
    /// when every recorded script succeeded; None when nothing ran yet.
    pub fn package_status(&self, name: &str) -> Option<ScriptStatus> {
        let scripts = self.packages.get(name)?;
        if scripts.is_empty() {
            return None;
        }
        let statuses = || scripts.values().map(|r| r.status);
        if statuses().any(|s| s == ScriptStatus::Running) {
            Some(ScriptStatus::Running)
        } else if statuses().any(|s| s == ScriptStatus::Error) {
            Some(ScriptStatus::Error)
        } else if statuses().any(|s| s == ScriptStatus::Skip) {
            Some(ScriptStatus::Skip)
        } else if statuses().all(|s| s == ScriptStatus::Success) {
            Some(ScriptStatus::Success)
        } else {
            None
        }
    }

    /// Every (package, script) pair that ended in Error, with its output.
    pub fn failures(&self) -> Vec<(&str, ScriptKind, &str)> {
        self.packages
            .iter()
            .flat_map(|(name, scripts)| {
                scripts
                    .iter()
                    .filter(|(_, record)| record.status == ScriptStatus::Error)
                    .map(move |(kind, record)| (name.as_str(), *kind, record.output.as_str()))
            })
            .collect()
    }

    pub fn has_failures(&self) -> bool {
        self.packages
            .values()
            .flat_map(IndexMap::values)
            .any(|record| record.status == ScriptStatus::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(
        package: &str,
        script: ScriptKind,
        status: ScriptStatus,
        output: Option<&str>,
    ) -> StatusUpdate {
        StatusUpdate {
            package: package.to_string(),
            script,
            status,
            output: output.map(str::to_string),
        }
    }

    #[test]
    fn running_dominates_aggregation() {
        let mut report = RunReport::new();
        report.apply(update("app", ScriptKind::Build, ScriptStatus::Success, None));
        report.apply(update("app", ScriptKind::Test, ScriptStatus::Running, None));
        assert_eq!(report.package_status("app"), Some(ScriptStatus::Running));
    }

    #[test]
    fn error_dominates_settled_states() {
        let mut report = RunReport::new();
        report.apply(update("app", ScriptKind::Build, ScriptStatus::Success, None));
        report.apply(update(
            "app",
            ScriptKind::Lint,
            ScriptStatus::Error,
            Some("bad"),
        ));
        assert_eq!(report.package_status("app"), Some(ScriptStatus::Error));
    }

    #[test]
    fn all_success_aggregates_to_success() {
        let mut report = RunReport::new();
        report.apply(update("app", ScriptKind::Build, ScriptStatus::Success, None));
        report.apply(update("app", ScriptKind::Test, ScriptStatus::Success, None));
        assert_eq!(report.package_status("app"), Some(ScriptStatus::Success));
    }

    #[test]
    fn unseen_package_has_no_status() {
        let report = RunReport::with_packages(["app"]);
        assert_eq!(report.package_status("app"), None);
        assert_eq!(report.package_status("ghost"), None);
    }

    #[test]
    fn later_events_replace_earlier_states() {
        let mut report = RunReport::new();
        report.apply(update("app", ScriptKind::Build, ScriptStatus::Running, None));
        report.apply(update(
            "app",
            ScriptKind::Build,
            ScriptStatus::Success,
            Some("done"),
        ));
        assert_eq!(report.package_status("app"), Some(ScriptStatus::Success));
    }

    #[test]
    fn failures_collects_outputs() {
        let mut report = RunReport::new();
        report.apply(update(
            "app",
            ScriptKind::Test,
            ScriptStatus::Error,
            Some("1 test failed"),
        ));
        report.apply(update("lib", ScriptKind::Build, ScriptStatus::Success, None));
        let failures = report.failures();
        assert_eq!(failures, vec![("app", ScriptKind::Test, "1 test failed")]);
        assert!(report.has_failures());
    }

    #[test]
    fn skip_aggregates_below_error() {
        let mut report = RunReport::new();
        report.apply(update("app", ScriptKind::Build, ScriptStatus::Skip, None));
        assert_eq!(report.package_status("app"), Some(ScriptStatus::Skip));
    }
}
