// Worker Report
// Per-worker fatigue and timing with the pool-wide fairness score

use crate::scheduling::worker::Worker;

use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Snapshot of one worker's counters
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerSummary {
    pub id: usize,
    pub multiplier: f64,
    pub fatigue: f64,
    #[serde(serialize_with = "serialize_millis")]
    pub busy_time: Duration,
    #[serde(serialize_with = "serialize_millis")]
    pub idle_time: Duration,
    pub tasks_completed: u64,
    pub tasks_failed: u64,
}

impl From<&Worker> for WorkerSummary {
    fn from(worker: &Worker) -> Self {
        let stats = worker.stats();
        Self {
            id: worker.id(),
            multiplier: worker.multiplier(),
            fatigue: stats.fatigue,
            busy_time: stats.busy_time,
            idle_time: stats.idle_time,
            tasks_completed: stats.tasks_completed,
            tasks_failed: stats.tasks_failed,
        }
    }
}

/// Load-balance report over every worker in a pool
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerReport {
    pub workers: Vec<WorkerSummary>,
    pub average_fatigue: f64,
    /// Sum of squared deviations of fatigue from the mean; 0 is perfectly even
    pub fairness: f64,
}

impl WorkerReport {
    pub fn from_workers(workers: Vec<WorkerSummary>) -> Self {
        let (average_fatigue, fairness) = fairness(workers.iter().map(|w| w.fatigue));
        Self {
            workers,
            average_fatigue,
            fairness,
        }
    }
}

/// Mean and sum of squared deviations of `values`; both 0 for no values
pub fn fairness<I>(values: I) -> (f64, f64)
where
    I: IntoIterator<Item = f64>,
{
    let values: Vec<f64> = values.into_iter().collect();
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let deviation = values.iter().map(|v| (v - mean).powi(2)).sum();
    (mean, deviation)
}

fn millis(duration: &Duration) -> f64 {
    duration.as_nanos() as f64 / 1_000_000.0
}

fn serialize_millis<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_f64(millis(duration))
}

impl fmt::Display for WorkerReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "WORKER REPORT")?;
        writeln!(
            f,
            "{:>6}  {:>10}  {:>16}  {:>12}  {:>12}  {:>8}  {:>6}",
            "worker", "multiplier", "fatigue", "busy (ms)", "idle (ms)", "tasks", "failed"
        )?;
        for worker in &self.workers {
            writeln!(
                f,
                "{:>6}  {:>10.3}  {:>16.0}  {:>12.3}  {:>12.3}  {:>8}  {:>6}",
                worker.id,
                worker.multiplier,
                worker.fatigue,
                millis(&worker.busy_time),
                millis(&worker.idle_time),
                worker.tasks_completed,
                worker.tasks_failed
            )?;
        }
        writeln!(f, "Average Fatigue: {:.0}", self.average_fatigue)?;
        write!(f, "Fairness Score (Variance): {:.0}", self.fairness)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(id: usize, fatigue: f64) -> WorkerSummary {
        WorkerSummary {
            id,
            multiplier: 1.0,
            fatigue,
            busy_time: Duration::from_millis(2),
            idle_time: Duration::from_millis(3),
            tasks_completed: 1,
            tasks_failed: 0,
        }
    }

    #[test]
    fn test_fairness_is_sum_of_squared_deviations() {
        let (mean, score) = fairness([2.0, 4.0, 6.0]);
        assert_eq!(mean, 4.0);
        assert_eq!(score, 8.0);
    }

    #[test]
    fn test_even_load_scores_zero() {
        let report = WorkerReport::from_workers(vec![summary(0, 5.0), summary(1, 5.0)]);
        assert_eq!(report.average_fatigue, 5.0);
        assert_eq!(report.fairness, 0.0);
    }

    #[test]
    fn test_empty_report() {
        let report = WorkerReport::from_workers(Vec::new());
        assert_eq!(report.average_fatigue, 0.0);
        assert_eq!(report.fairness, 0.0);
    }

    #[test]
    fn test_display_and_json() {
        let report = WorkerReport::from_workers(vec![summary(0, 1.0), summary(1, 3.0)]);
        let text = report.to_string();
        assert!(text.starts_with("WORKER REPORT"));
        assert!(text.contains("Average Fatigue: 2"));
        assert!(text.contains("Fairness Score (Variance): 2"));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["averageFatigue"], 2.0);
        assert_eq!(json["workers"][1]["busyTime"], 2.0);
        assert_eq!(json["workers"][0]["tasksCompleted"], 1);
    }
}
