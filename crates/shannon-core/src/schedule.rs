//! Schedules (cron CRUD), spec.md §6. Pairs the `cron` crate with
//! `chrono-tz` for timezone-aware cron evaluation, narrowed to a pure "what
//! fires next" computation so it stays unit-testable without a live tokio
//! runtime driving wall clock.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use cron::Schedule as CronExpr;
use parking_lot::RwLock;
use shannon_contracts::{Schedule, ScheduleRun, ScheduleRunStatus};

use crate::error::{Result, ShannonError};

/// In-memory store for registered schedules. A production deployment would
/// back this with the relational store named in spec.md §6; kept in-memory
/// here since the store backend itself is out of scope (§1).
#[derive(Default)]
pub struct ScheduleStore {
    schedules: RwLock<HashMap<String, Schedule>>,
    runs: RwLock<HashMap<String, Vec<ScheduleRun>>>,
}

impl ScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, schedule: Schedule) -> Result<()> {
        validate_cron(&schedule.cron_expression)?;
        validate_timezone(&schedule.timezone)?;
        self.schedules.write().insert(schedule.name.clone(), schedule);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Schedule> {
        self.schedules.read().get(name).cloned()
    }

    pub fn delete(&self, name: &str) -> bool {
        self.schedules.write().remove(name).is_some()
    }

    pub fn list(&self) -> Vec<Schedule> {
        self.schedules.read().values().cloned().collect()
    }

    pub fn record_run(&self, run: ScheduleRun) {
        self.runs.write().entry(run.schedule_name.clone()).or_default().push(run);
    }

    pub fn runs_for(&self, name: &str) -> Vec<ScheduleRun> {
        self.runs.read().get(name).cloned().unwrap_or_default()
    }
}

fn validate_cron(expr: &str) -> Result<CronExpr> {
    CronExpr::from_str(expr)
        .map_err(|e| ShannonError::InvalidInput(format!("bad cron expression '{expr}': {e}")))
}

fn validate_timezone(tz: &str) -> Result<Tz> {
    tz.parse::<Tz>()
        .map_err(|_| ShannonError::InvalidInput(format!("unknown timezone '{tz}'")))
}

/// Pure "what fires next" computation over a set of schedules, driven by a
/// caller-supplied `now` so it stays deterministic-testable; the actual tick
/// loop (owned by a binary out of scope for this crate) would call
/// `due_schedules` once per tick against the real clock.
pub struct CronScheduler<'a> {
    store: &'a ScheduleStore,
}

impl<'a> CronScheduler<'a> {
    pub fn new(store: &'a ScheduleStore) -> Self {
        Self { store }
    }

    /// Schedules whose next fire time at or before `now` has not yet been
    /// recorded as a run started at or after `since`.
    pub fn due_schedules(&self, now: DateTime<Utc>, since: DateTime<Utc>) -> Vec<Schedule> {
        self.store
            .list()
            .into_iter()
            .filter(|schedule| self.is_due(schedule, now, since))
            .collect()
    }

    fn is_due(&self, schedule: &Schedule, now: DateTime<Utc>, since: DateTime<Utc>) -> bool {
        let Ok(expr) = validate_cron(&schedule.cron_expression) else { return false };
        let Ok(tz) = validate_timezone(&schedule.timezone) else { return false };
        let now_local = now.with_timezone(&tz);
        let since_local = since.with_timezone(&tz);
        expr.after(&since_local).take_while(|t| *t <= now_local).next().is_some()
    }

    pub fn next_fire(&self, schedule: &Schedule, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let expr = validate_cron(&schedule.cron_expression).ok()?;
        let tz = validate_timezone(&schedule.timezone).ok()?;
        let after_local = after.with_timezone(&tz);
        expr.after(&after_local).next().map(|t| t.with_timezone(&Utc))
    }
}

/// Build a `ScheduleRun` record after a scheduled task completes.
pub fn build_run(
    schedule_name: &str,
    fired_at_ms: i64,
    status: ScheduleRunStatus,
    tokens: u64,
    cost_usd: f64,
    error: Option<String>,
) -> ScheduleRun {
    ScheduleRun { schedule_name: schedule_name.to_string(), fired_at_ms, status, tokens, cost_usd, error }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn schedule(name: &str, cron_expr: &str) -> Schedule {
        Schedule {
            name: name.to_string(),
            cron_expression: cron_expr.to_string(),
            timezone: "UTC".to_string(),
            task_query: "summarize overnight alerts".to_string(),
            task_context: HashMap::new(),
            max_budget_per_run_usd: Some(1.0),
            timeout_seconds: Some(300),
        }
    }

    #[test]
    fn rejects_malformed_cron() {
        let store = ScheduleStore::new();
        let result = store.create(schedule("bad", "not a cron expr"));
        assert!(result.is_err());
    }

    #[test]
    fn rejects_unknown_timezone() {
        let store = ScheduleStore::new();
        let mut s = schedule("s1", "0 0 * * * *");
        s.timezone = "Mars/Olympus_Mons".to_string();
        assert!(store.create(s).is_err());
    }

    #[test]
    fn due_schedules_finds_fired_cron() {
        let store = ScheduleStore::new();
        // every minute
        store.create(schedule("minutely", "0 * * * * *")).unwrap();
        let since = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 2, 0).unwrap();
        let scheduler = CronScheduler::new(&store);
        let due = scheduler.due_schedules(now, since);
        assert_eq!(due.len(), 1);
    }

    #[test]
    fn not_due_before_next_fire_time() {
        let store = ScheduleStore::new();
        store.create(schedule("hourly", "0 0 * * * *")).unwrap();
        let since = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 1).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 30, 0).unwrap();
        let scheduler = CronScheduler::new(&store);
        assert!(scheduler.due_schedules(now, since).is_empty());
    }
}
