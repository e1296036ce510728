//! Copy-task, manifest and report types

use crate::error::{Error, Result, TaskError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Placeholder -> replacement pairs applied to a template's content.
///
/// Stored in a `BTreeMap` so iteration order never depends on insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Substitutions(BTreeMap<String, String>);

impl Substitutions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a pair, replacing any previous replacement for the placeholder
    pub fn insert(&mut self, placeholder: impl Into<String>, replacement: impl Into<String>) {
        self.0.insert(placeholder.into(), replacement.into());
    }

    pub fn get(&self, placeholder: &str) -> Option<&str> {
        self.0.get(placeholder).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Pairs in placeholder order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Substitutions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// One unit of work: fetch `source_key`, substitute, write to `destination`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCopyTask")]
pub struct CopyTask {
    source_key: String,
    destination: PathBuf,
    substitutions: Substitutions,
}

/// Unvalidated wire form; deserialized tasks go through the builder
#[derive(Deserialize)]
struct RawCopyTask {
    source_key: String,
    destination: PathBuf,
    #[serde(default)]
    substitutions: Substitutions,
}

impl TryFrom<RawCopyTask> for CopyTask {
    type Error = Error;

    fn try_from(raw: RawCopyTask) -> Result<Self> {
        CopyTask::builder(raw.source_key, raw.destination)
            .substitutions(raw.substitutions.iter())
            .build()
    }
}

impl CopyTask {
    /// Start building a task
    pub fn builder(
        source_key: impl Into<String>,
        destination: impl Into<PathBuf>,
    ) -> CopyTaskBuilder {
        CopyTaskBuilder {
            source_key: source_key.into(),
            destination: destination.into(),
            substitutions: Substitutions::new(),
        }
    }

    /// Task without substitutions
    pub fn new(source_key: impl Into<String>, destination: impl Into<PathBuf>) -> Result<Self> {
        Self::builder(source_key, destination).build()
    }

    /// Key of the template in the source backend
    pub fn source_key(&self) -> &str {
        &self.source_key
    }

    /// Local path the rendered template is written to
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn substitutions(&self) -> &Substitutions {
        &self.substitutions
    }
}

/// Builder for [`CopyTask`]
#[derive(Debug, Clone)]
pub struct CopyTaskBuilder {
    source_key: String,
    destination: PathBuf,
    substitutions: Substitutions,
}

impl CopyTaskBuilder {
    /// Replace every occurrence of `placeholder` with `replacement`
    pub fn substitute(
        mut self,
        placeholder: impl Into<String>,
        replacement: impl Into<String>,
    ) -> Self {
        self.substitutions.insert(placeholder, replacement);
        self
    }

    /// Add several pairs at once
    pub fn substitutions<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        for (placeholder, replacement) in pairs {
            self.substitutions.insert(placeholder, replacement);
        }
        self
    }

    /// Validate and build the task
    pub fn build(self) -> Result<CopyTask> {
        if self.source_key.trim().is_empty() {
            return Err(Error::invalid_task("source key must not be empty"));
        }
        if self.destination.as_os_str().is_empty() {
            return Err(Error::invalid_task(format!(
                "destination for {} must not be empty",
                self.source_key
            )));
        }
        if self.substitutions.iter().any(|(p, _)| p.is_empty()) {
            return Err(Error::invalid_task(format!(
                "empty placeholder in substitutions for {}",
                self.source_key
            )));
        }

        Ok(CopyTask {
            source_key: self.source_key,
            destination: self.destination,
            substitutions: self.substitutions,
        })
    }
}

/// Ordered list of copy-tasks for one generation run.
///
/// The position of a task is its identity in the [`MaterializationResult`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    tasks: Vec<CopyTask>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, task: CopyTask) {
        self.tasks.push(task);
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CopyTask> {
        self.tasks.iter()
    }

    pub fn tasks(&self) -> &[CopyTask] {
        &self.tasks
    }

    /// Destinations written by more than one task, with the indices involved.
    ///
    /// Concurrent writes to one path are last-write-wins in no defined order.
    pub fn destinations_conflict(&self) -> Vec<(PathBuf, Vec<usize>)> {
        let mut seen: HashMap<&Path, Vec<usize>> = HashMap::new();
        for (index, task) in self.tasks.iter().enumerate() {
            seen.entry(task.destination()).or_default().push(index);
        }

        let mut conflicts: Vec<(PathBuf, Vec<usize>)> = seen
            .into_iter()
            .filter(|(_, indices)| indices.len() > 1)
            .map(|(path, indices)| (path.to_path_buf(), indices))
            .collect();
        conflicts.sort_by(|a, b| a.1[0].cmp(&b.1[0]));
        conflicts
    }
}

impl FromIterator<CopyTask> for Manifest {
    fn from_iter<I: IntoIterator<Item = CopyTask>>(iter: I) -> Self {
        Self {
            tasks: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Manifest {
    type Item = CopyTask;
    type IntoIter = std::vec::IntoIter<CopyTask>;

    fn into_iter(self) -> Self::IntoIter {
        self.tasks.into_iter()
    }
}

impl<'a> IntoIterator for &'a Manifest {
    type Item = &'a CopyTask;
    type IntoIter = std::slice::Iter<'a, CopyTask>;

    fn into_iter(self) -> Self::IntoIter {
        self.tasks.iter()
    }
}

impl Extend<CopyTask> for Manifest {
    fn extend<I: IntoIterator<Item = CopyTask>>(&mut self, iter: I) {
        self.tasks.extend(iter);
    }
}

/// Outcome of a single copy-task
#[derive(Debug)]
pub enum TaskOutcome {
    /// Template fetched and written
    Success { bytes_written: usize },
    /// Task failed; siblings were unaffected
    Failure(TaskError),
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn error(&self) -> Option<&TaskError> {
        match self {
            Self::Success { .. } => None,
            Self::Failure(err) => Some(err),
        }
    }
}

/// A task together with its outcome
#[derive(Debug)]
pub struct TaskReport {
    /// Position of the task in the manifest
    pub index: usize,
    pub task: CopyTask,
    pub outcome: TaskOutcome,
}

/// Aggregated outcome of a materialization run, in manifest order
#[derive(Debug, Default)]
pub struct MaterializationResult {
    reports: Vec<TaskReport>,
}

impl MaterializationResult {
    pub(crate) fn from_reports(reports: Vec<TaskReport>) -> Self {
        Self { reports }
    }

    /// Every task's report, ordered by manifest index
    pub fn reports(&self) -> &[TaskReport] {
        &self.reports
    }

    pub fn into_reports(self) -> Vec<TaskReport> {
        self.reports
    }

    pub fn attempted(&self) -> usize {
        self.reports.len()
    }

    pub fn succeeded(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| r.outcome.is_success())
            .count()
    }

    pub fn failed(&self) -> usize {
        self.attempted() - self.succeeded()
    }

    /// Reports of failed tasks, with their originating task
    pub fn failures(&self) -> impl Iterator<Item = &TaskReport> {
        self.reports.iter().filter(|r| !r.outcome.is_success())
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    /// Serializable summary of the run
    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            attempted: self.attempted(),
            succeeded: self.succeeded(),
            failed: self.failed(),
            failures: self
                .failures()
                .filter_map(|r| {
                    r.outcome.error().map(|err| FailureSummary {
                        index: r.index,
                        source_key: r.task.source_key().to_string(),
                        destination: r.task.destination().to_path_buf(),
                        kind: err.kind().to_string(),
                        message: err.to_string(),
                    })
                })
                .collect(),
        }
    }
}

/// Counts plus failure details, suitable for JSON output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failures: Vec<FailureSummary>,
}

/// One failed task in a [`ReportSummary`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureSummary {
    pub index: usize,
    pub source_key: String,
    pub destination: PathBuf,
    pub kind: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;

    #[test]
    fn test_builder_collects_substitutions() {
        let task = CopyTask::builder("templates/go/gin/main.txt", "demo/main.go")
            .substitute("yourapp", "demo")
            .substitute("{{port}}", "8080")
            .build()
            .unwrap();

        assert_eq!(task.source_key(), "templates/go/gin/main.txt");
        assert_eq!(task.destination(), Path::new("demo/main.go"));
        assert_eq!(task.substitutions().len(), 2);
        assert_eq!(task.substitutions().get("yourapp"), Some("demo"));
    }

    #[test]
    fn test_builder_rejects_empty_placeholder() {
        let err = CopyTask::builder("a.txt", "a")
            .substitute("", "x")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTask { .. }));
    }

    #[test]
    fn test_builder_rejects_empty_key_and_destination() {
        assert!(CopyTask::new("  ", "out.txt").is_err());
        assert!(CopyTask::new("a.txt", "").is_err());
    }

    #[test]
    fn test_substitutions_order_is_insertion_independent() {
        let a: Substitutions = [("b", "2"), ("a", "1")].into_iter().collect();
        let b: Substitutions = [("a", "1"), ("b", "2")].into_iter().collect();
        assert_eq!(a, b);
        assert_eq!(a.iter().map(|(k, _)| k).collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_destinations_conflict() {
        let manifest: Manifest = vec![
            CopyTask::new("a.txt", "out/config.py").unwrap(),
            CopyTask::new("b.txt", "out/run.py").unwrap(),
            CopyTask::new("c.txt", "out/config.py").unwrap(),
        ]
        .into_iter()
        .collect();

        let conflicts = manifest.destinations_conflict();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].0, PathBuf::from("out/config.py"));
        assert_eq!(conflicts[0].1, vec![0, 2]);
    }

    #[test]
    fn test_result_counts_and_summary() {
        let result = MaterializationResult::from_reports(vec![
            TaskReport {
                index: 0,
                task: CopyTask::new("a.txt", "out/a").unwrap(),
                outcome: TaskOutcome::Success { bytes_written: 3 },
            },
            TaskReport {
                index: 1,
                task: CopyTask::new("missing.txt", "out/b").unwrap(),
                outcome: TaskOutcome::Failure(FetchError::not_found("missing.txt").into()),
            },
        ]);

        assert_eq!(result.attempted(), 2);
        assert_eq!(result.succeeded(), 1);
        assert_eq!(result.failed(), 1);
        assert!(!result.is_success());

        let summary = result.summary();
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].index, 1);
        assert_eq!(summary.failures[0].kind, "fetch");
        assert_eq!(summary.failures[0].source_key, "missing.txt");
    }

    #[test]
    fn test_deserialize_validates_like_builder() {
        let ok: Manifest = serde_json::from_str(
            r#"[{"source_key":"a.txt","destination":"out/a","substitutions":{"yourapp":"demo"}}]"#,
        )
        .unwrap();
        assert_eq!(ok.tasks()[0].substitutions().get("yourapp"), Some("demo"));

        let no_subs: CopyTask =
            serde_json::from_str(r#"{"source_key":"a.txt","destination":"out/a"}"#).unwrap();
        assert!(no_subs.substitutions().is_empty());

        let empty_placeholder = serde_json::from_str::<Manifest>(
            r#"[{"source_key":"a.txt","destination":"out/a","substitutions":{"":"X"}}]"#,
        );
        assert!(empty_placeholder.is_err());

        let empty_fields =
            serde_json::from_str::<CopyTask>(r#"{"source_key":"","destination":""}"#);
        assert!(empty_fields.is_err());
    }

    #[test]
    fn test_manifest_serializes_as_list() {
        let manifest: Manifest = vec![CopyTask::builder("a.txt", "out/a")
            .substitute("yourapp", "demo")
            .build()
            .unwrap()]
        .into_iter()
        .collect();

        let json = serde_json::to_value(&manifest).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["source_key"], "a.txt");
        assert_eq!(json[0]["substitutions"]["yourapp"], "demo");
    }
}
