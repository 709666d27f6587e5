use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// CRUD payload for a cron-driven recurring task, spec.md §6 "Schedules".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub name: String,
    pub cron_expression: String,
    pub timezone: String,
    pub task_query: String,
    #[serde(default)]
    pub task_context: HashMap<String, String>,
    #[serde(default)]
    pub max_budget_per_run_usd: Option<f64>,
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleRunStatus {
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRun {
    pub schedule_name: String,
    pub fired_at_ms: i64,
    pub status: ScheduleRunStatus,
    pub tokens: u64,
    pub cost_usd: f64,
    pub error: Option<String>,
}
