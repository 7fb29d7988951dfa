use std::fmt::Display;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a task. Derived from the creation instant in milliseconds, which also gives
/// tasks a natural creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub i64);

impl Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A unit of work logged against a category (DAS) on a calendar date.
///
/// While `is_running` is set, `start_time` is the instant the current run began and
/// `initial_elapsed_time` is what had been accumulated before it. Elapsed time is derived from
/// both, see [TaskEntity::sync].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskEntity {
    pub id: TaskId,
    pub date: NaiveDate,
    pub name: String,
    pub das: String,
    pub elapsed_time: u64,
    #[serde(default)]
    pub initial_elapsed_time: u64,
    #[serde(default)]
    pub is_running: bool,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub start_hour: Option<DateTime<Utc>>,
}

impl TaskEntity {
    pub fn new(id: TaskId, date: NaiveDate, name: String, das: String) -> Self {
        Self {
            id,
            date,
            name,
            das,
            elapsed_time: 0,
            initial_elapsed_time: 0,
            is_running: false,
            start_time: None,
            start_hour: None,
        }
    }

    /// Begins a run at `now`. The first run of the task also records its start hour.
    pub fn start(&mut self, now: DateTime<Utc>) {
        self.start_hour.get_or_insert(now);
        self.is_running = true;
        self.start_time = Some(now);
        self.initial_elapsed_time = self.elapsed_time;
    }

    /// Ends the current run, crediting the time measured up to `now`.
    pub fn stop(&mut self, now: DateTime<Utc>) -> u64 {
        let credited = self.sync(now);
        self.is_running = false;
        self.start_time = None;
        self.initial_elapsed_time = self.elapsed_time;
        credited
    }

    /// Recomputes elapsed time as the accumulated base plus whole seconds since the run began.
    /// Elapsed time never goes down: a clock that moved backwards produces no credit.
    /// Returns the seconds credited by this call.
    pub fn sync(&mut self, now: DateTime<Utc>) -> u64 {
        let Some(start) = self.start_time.filter(|_| self.is_running) else {
            return 0;
        };
        let measured = (now - start).num_seconds();
        if measured <= 0 {
            return 0;
        }
        let derived = self.initial_elapsed_time + measured as u64;
        if derived > self.elapsed_time {
            let credited = derived - self.elapsed_time;
            self.elapsed_time = derived;
            credited
        } else {
            0
        }
    }

    /// Replaces the accumulated time. A running task restarts its run from the new value.
    pub fn set_elapsed(&mut self, seconds: u64, now: DateTime<Utc>) {
        self.elapsed_time = seconds;
        self.initial_elapsed_time = seconds;
        if self.is_running {
            self.start_time = Some(now);
        }
    }
}

/// User preferences. Replaced wholesale on save. Missing fields take their default value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub daily_work_hours: f64,
    pub das_input: String,
    pub employee_name: String,
    pub auto_save_enabled: bool,
    /// In minutes.
    pub auto_save_interval: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            daily_work_hours: 8.,
            das_input: "Administration\nDéveloppement\nFormation\nSupport".into(),
            employee_name: "Salarié".into(),
            auto_save_enabled: true,
            auto_save_interval: 30,
        }
    }
}

impl Settings {
    pub fn expected_daily_seconds(&self) -> i64 {
        (self.daily_work_hours * 3600.).round() as i64
    }

    /// Categories in the order they were entered, blank lines skipped.
    pub fn das_list(&self) -> Vec<String> {
        self.das_input
            .lines()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from)
            .collect()
    }
}

pub const SNAPSHOT_VERSION: &str = "1.0";

/// Combined document used for periodic saves and manual export/import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: String,
    pub tasks: Vec<TaskEntity>,
    pub settings: Settings,
}

impl Snapshot {
    pub fn new(tasks: Vec<TaskEntity>, settings: Settings) -> Self {
        Self {
            version: SNAPSHOT_VERSION.into(),
            tasks,
            settings,
        }
    }
}

/// Written on every tick so a restarted daemon can pick up the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunningMarker {
    pub task_id: TaskId,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_update_time: DateTime<Utc>,
}

/// Identifier of a live daemon. Creation millis, serialized as a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstanceId(#[serde(with = "id_ser")] pub u64);

impl Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceDescriptor {
    pub id: InstanceId,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_ping: DateTime<Utc>,
}

mod id_ser {
    use serde::{self, de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(id: &u64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&id.to_string())
    }

    /// Accepts both `"1700000000000"` and `1700000000000`.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<u64, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Text(v) => v.parse().map_err(de::Error::custom),
            Raw::Number(v) => Ok(v),
        }
    }
}
