//! Task model and state machine
//!
//! Defines the canonical `Task` entity, the `TaskEvent` envelope used to
//! request state changes, and the fixed legal-transition table that gates
//! every state mutation on both the manager and the worker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Lifecycle state of a task.
///
/// Serialized on the wire as a bare integer (0-4) in declaration order.
/// `Completed` and `Failed` are terminal for the task's current container;
/// a restart moves a `Failed` task back to `Scheduled`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum State {
    #[default]
    Pending,
    Scheduled,
    Running,
    Completed,
    Failed,
}

impl From<State> for u8 {
    fn from(state: State) -> u8 {
        match state {
            State::Pending => 0,
            State::Scheduled => 1,
            State::Running => 2,
            State::Completed => 3,
            State::Failed => 4,
        }
    }
}

impl TryFrom<u8> for State {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(State::Pending),
            1 => Ok(State::Scheduled),
            2 => Ok(State::Running),
            3 => Ok(State::Completed),
            4 => Ok(State::Failed),
            other => Err(format!("invalid task state: {}", other)),
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            State::Pending => "Pending",
            State::Scheduled => "Scheduled",
            State::Running => "Running",
            State::Completed => "Completed",
            State::Failed => "Failed",
        };
        write!(f, "{}", name)
    }
}

/// The legal-transition table.
///
/// Every state mutation of a task database must pass this predicate before
/// being applied. Re-asserting the current state is always a legal no-op.
pub fn valid_transition(from: State, to: State) -> bool {
    if from == to {
        return true;
    }
    matches!(
        (from, to),
        (State::Pending, State::Scheduled)
            | (State::Scheduled, State::Running)
            | (State::Scheduled, State::Failed)
            | (State::Running, State::Completed)
            | (State::Running, State::Failed)
            | (State::Failed, State::Scheduled)
    )
}

/// Declarative description plus observed runtime facts for a single
/// containerized workload.
///
/// The declarative fields (`name`, `image`, resource requests, ports, health
/// check, restart policy) come from the submitter; `container_id`,
/// `start_time`, `finish_time` and `host_ports` are discovered at runtime by
/// the worker. Unknown fields in a submitted body are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Task {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub state: State,
    pub image: String,
    /// Requested memory, in bytes.
    #[serde(default)]
    pub memory: u64,
    /// Requested disk, in bytes.
    #[serde(default)]
    pub disk: u64,
    /// Container ports the workload exposes.
    #[serde(default)]
    pub exposed_ports: Vec<u16>,
    /// Exposed port -> host port, discovered from the runtime.
    #[serde(default)]
    pub host_ports: HashMap<u16, u16>,
    #[serde(default)]
    pub restart_policy: String,
    #[serde(default)]
    pub restart_count: u32,
    /// Optional HTTP health-check path, relative to the task's host port.
    #[serde(default)]
    pub health_check: Option<String>,
    /// Opaque identifier assigned by the container runtime once started.
    #[serde(default)]
    pub container_id: Option<String>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub finish_time: Option<DateTime<Utc>>,
}

impl Task {
    /// Creates a task with the given declarative fields and no observed
    /// runtime facts yet.
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            state: State::Pending,
            image: image.into(),
            memory: 0,
            disk: 0,
            exposed_ports: Vec::new(),
            host_ports: HashMap::new(),
            restart_policy: String::new(),
            restart_count: 0,
            health_check: None,
            container_id: None,
            start_time: None,
            finish_time: None,
        }
    }
}

/// Immutable request to transition a task to a desired state.
///
/// The envelope `state` records the submitter's intent; the *effective*
/// desired state applied by the worker is the embedded task snapshot's
/// `state` (see [`TaskEvent::desired_state`]). Events are value-typed and
/// never mutated once enqueued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskEvent {
    pub id: Uuid,
    pub state: State,
    pub timestamp: DateTime<Utc>,
    pub task: Task,
}

impl TaskEvent {
    /// Builds a fresh event (new event ID, current timestamp) carrying the
    /// given task snapshot.
    pub fn new(state: State, task: Task) -> Self {
        Self {
            id: Uuid::new_v4(),
            state,
            timestamp: Utc::now(),
            task,
        }
    }

    /// The state the receiving node should drive the task toward.
    pub fn desired_state(&self) -> State {
        self.task.state
    }
}
