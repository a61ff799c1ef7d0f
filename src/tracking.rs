//! Experiment tracking boundary.
//!
//! The search loop records every trial through the [`ExperimentTracker`]
//! trait; the tracker object is constructed explicitly and passed in, with a
//! `start_run -> log -> end_run` lifecycle. [`FileExperimentTracker`] persists
//! one JSON document per run under `<root>/<experiment>/`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};

/// One recorded run: parameters, metrics and artifact paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub name: String,
    pub params: BTreeMap<String, String>,
    pub metrics: BTreeMap<String, f64>,
    pub artifacts: Vec<String>,
    pub started_at: String,
    pub ended_at: Option<String>,
}

/// The contract the search loop records trials against.
pub trait ExperimentTracker {
    fn start_run(&mut self, name: &str) -> Result<String>;
    fn log_params(&mut self, run_id: &str, params: &BTreeMap<String, String>) -> Result<()>;
    fn log_metrics(&mut self, run_id: &str, metrics: &BTreeMap<String, f64>) -> Result<()>;
    fn log_artifact(&mut self, run_id: &str, path: &Path) -> Result<()>;
    fn end_run(&mut self, run_id: &str) -> Result<()>;

    /// Finished runs carrying `metric`, ascending by its value (non-finite
    /// values sort last). This is what model selection consumes.
    fn list_runs_by_metric(&self, metric: &str) -> Result<Vec<RunRecord>>;
}

/// File-backed tracker: `<root>/<experiment>/run_<id>.json` per run.
#[derive(Debug)]
pub struct FileExperimentTracker {
    experiment_dir: PathBuf,
    open_runs: BTreeMap<String, RunRecord>,
    next_id: usize,
}

impl FileExperimentTracker {
    pub fn new<P: AsRef<Path>>(root: P, experiment: &str) -> Result<Self> {
        let experiment_dir = root.as_ref().join(experiment);
        fs::create_dir_all(&experiment_dir)?;
        let next_id = fs::read_dir(&experiment_dir)?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map_or(false, |x| x == "json"))
            .count();
        Ok(FileExperimentTracker { experiment_dir, open_runs: BTreeMap::new(), next_id })
    }

    fn open_run_mut(&mut self, run_id: &str) -> Result<&mut RunRecord> {
        self.open_runs
            .get_mut(run_id)
            .ok_or_else(|| ForecastError::Tracking(format!("no open run '{run_id}'")))
    }

    fn run_path(&self, run_id: &str) -> PathBuf {
        self.experiment_dir.join(format!("run_{run_id}.json"))
    }
}

impl ExperimentTracker for FileExperimentTracker {
    fn start_run(&mut self, name: &str) -> Result<String> {
        let run_id = format!("{:04}", self.next_id);
        self.next_id += 1;
        let record = RunRecord {
            run_id: run_id.clone(),
            name: name.to_string(),
            params: BTreeMap::new(),
            metrics: BTreeMap::new(),
            artifacts: Vec::new(),
            started_at: Utc::now().to_rfc3339(),
            ended_at: None,
        };
        self.open_runs.insert(run_id.clone(), record);
        Ok(run_id)
    }

    fn log_params(&mut self, run_id: &str, params: &BTreeMap<String, String>) -> Result<()> {
        self.open_run_mut(run_id)?.params.extend(params.clone());
        Ok(())
    }

    fn log_metrics(&mut self, run_id: &str, metrics: &BTreeMap<String, f64>) -> Result<()> {
        self.open_run_mut(run_id)?.metrics.extend(metrics.clone());
        Ok(())
    }

    fn log_artifact(&mut self, run_id: &str, path: &Path) -> Result<()> {
        let record = self.open_run_mut(run_id)?;
        record.artifacts.push(path.display().to_string());
        Ok(())
    }

    fn end_run(&mut self, run_id: &str) -> Result<()> {
        let mut record = self
            .open_runs
            .remove(run_id)
            .ok_or_else(|| ForecastError::Tracking(format!("no open run '{run_id}'")))?;
        record.ended_at = Some(Utc::now().to_rfc3339());
        let payload = serde_json::to_string_pretty(&record)?;
        fs::write(self.run_path(run_id), payload)?;
        Ok(())
    }

    fn list_runs_by_metric(&self, metric: &str) -> Result<Vec<RunRecord>> {
        let mut runs = Vec::new();
        for entry in fs::read_dir(&self.experiment_dir)? {
            let path = entry?.path();
            if path.extension().map_or(false, |x| x == "json") {
                let record: RunRecord = serde_json::from_str(&fs::read_to_string(&path)?)?;
                if record.metrics.contains_key(metric) {
                    runs.push(record);
                }
            }
        }
        runs.sort_by(|a, b| {
            let av = a.metrics[metric];
            let bv = b.metrics[metric];
            av.partial_cmp(&bv)
                .unwrap_or_else(|| av.is_nan().cmp(&bv.is_nan()))
        });
        Ok(runs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn runs_round_trip_and_sort_by_metric() {
        let dir = tempdir().unwrap();
        let mut tracker = FileExperimentTracker::new(dir.path(), "exp").unwrap();
        for (name, rmse) in [("a", 3.0), ("b", 1.0), ("c", 2.0)] {
            let run = tracker.start_run(name).unwrap();
            tracker
                .log_metrics(&run, &BTreeMap::from([("rmse".to_string(), rmse)]))
                .unwrap();
            tracker.end_run(&run).unwrap();
        }
        let runs = tracker.list_runs_by_metric("rmse").unwrap();
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[0].name, "b");
        assert_eq!(runs[2].name, "a");
    }

    #[test]
    fn logging_against_a_closed_run_fails() {
        let dir = tempdir().unwrap();
        let mut tracker = FileExperimentTracker::new(dir.path(), "exp").unwrap();
        let run = tracker.start_run("t").unwrap();
        tracker.end_run(&run).unwrap();
        let err = tracker.log_metrics(&run, &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, ForecastError::Tracking(_)));
    }
}
