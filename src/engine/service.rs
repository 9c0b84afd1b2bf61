//! Task Service: the load → compute → persist loop behind every handler.
//!
//! Callers pass an explicit `AuthContext`; the engine itself knows nothing
//! about roles. Writes are optimistic: on a conflict the service reloads
//! the task and recomputes, up to `Config::max_retries` extra times.

use super::error::ServiceError;
use super::state::{self, Transition};
use super::store::{ChangeRecord, TaskStore};
use super::types::{Event, Snapshot, SubtaskId, SubtaskStatus, Task, TaskId, TaskStatus};
use crate::config::Config;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Employee,
    TeamAdmin,
    Admin,
}

impl Role {
    /// Whether this role may set a task's status directly.
    #[must_use]
    pub fn can_override_status(self) -> bool {
        matches!(self, Self::TeamAdmin | Self::Admin)
    }

    #[must_use]
    pub fn can_delete_tasks(self) -> bool {
        matches!(self, Self::TeamAdmin | Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Employee => write!(f, "employee"),
            Self::TeamAdmin => write!(f, "team_admin"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "employee" | "user" => Ok(Self::Employee),
            "team_admin" | "teamadmin" => Ok(Self::TeamAdmin),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// Who is making a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user: String,
    pub role: Role,
}

impl AuthContext {
    #[must_use]
    pub fn new(user: impl Into<String>, role: Role) -> Self {
        Self {
            user: user.into(),
            role,
        }
    }

    fn require(&self, allowed: bool, action: &'static str) -> Result<(), ServiceError> {
        if allowed {
            Ok(())
        } else {
            Err(ServiceError::Forbidden {
                user: self.user.clone(),
                role: self.role.to_string(),
                action,
            })
        }
    }
}

pub struct TaskService<S> {
    store: S,
    max_retries: u32,
}

impl<S: TaskStore> TaskService<S> {
    #[must_use]
    pub fn new(store: S, config: &Config) -> Self {
        Self {
            store,
            max_retries: config.max_retries,
        }
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Creates a task in `to_do`.
    ///
    /// # Errors
    /// Returns an error if the store rejects the insert.
    pub fn create_task(&mut self, auth: &AuthContext, title: &str) -> Result<TaskId, ServiceError> {
        let id = self.store.create_task(title)?;
        debug!(task_id = id, user = %auth.user, "task created");
        Ok(id)
    }

    /// # Errors
    /// Returns an error if the store query fails.
    pub fn list_tasks(&self) -> Result<Vec<Task>, ServiceError> {
        Ok(self.store.list_tasks()?)
    }

    /// # Errors
    /// Returns `TaskNotFound` if the task does not exist.
    pub fn snapshot(&self, task_id: TaskId) -> Result<Snapshot, ServiceError> {
        Ok(self.store.load_snapshot(task_id)?)
    }

    /// # Errors
    /// Returns an error if the store query fails.
    pub fn history(
        &self,
        task_id: Option<TaskId>,
        limit: usize,
    ) -> Result<Vec<ChangeRecord>, ServiceError> {
        Ok(self.store.history(task_id, limit)?)
    }

    /// # Errors
    /// Returns an error if the task or subtask is unknown or the write fails.
    pub fn toggle_subtask(
        &mut self,
        auth: &AuthContext,
        task_id: TaskId,
        subtask_id: SubtaskId,
    ) -> Result<Transition, ServiceError> {
        self.run(auth, task_id, |_| Ok(Event::ToggleSubtask(subtask_id)))
    }

    /// # Errors
    /// Returns an error if the task or subtask is unknown or the write fails.
    pub fn set_subtask_status(
        &mut self,
        auth: &AuthContext,
        task_id: TaskId,
        subtask_id: SubtaskId,
        status: SubtaskStatus,
    ) -> Result<Transition, ServiceError> {
        self.run(auth, task_id, |_| {
            Ok(Event::SetSubtaskStatus(subtask_id, status))
        })
    }

    /// Adds a subtask under a freshly allocated id.
    ///
    /// # Errors
    /// Returns an error if the task is unknown or the write fails.
    pub fn add_subtask(
        &mut self,
        auth: &AuthContext,
        task_id: TaskId,
        title: &str,
    ) -> Result<Transition, ServiceError> {
        self.run(auth, task_id, |store| {
            Ok(Event::AddSubtask {
                id: store.next_subtask_id()?,
                title: title.to_string(),
            })
        })
    }

    /// # Errors
    /// Returns an error if the task or subtask is unknown or the write fails.
    pub fn remove_subtask(
        &mut self,
        auth: &AuthContext,
        task_id: TaskId,
        subtask_id: SubtaskId,
    ) -> Result<Transition, ServiceError> {
        self.run(auth, task_id, |_| Ok(Event::RemoveSubtask(subtask_id)))
    }

    /// Direct status override. Restricted to admins.
    ///
    /// # Errors
    /// Returns `Forbidden` for employees, otherwise as the other operations.
    pub fn set_task_status(
        &mut self,
        auth: &AuthContext,
        task_id: TaskId,
        status: TaskStatus,
    ) -> Result<Transition, ServiceError> {
        auth.require(auth.role.can_override_status(), "override task status")?;
        self.run(auth, task_id, |_| Ok(Event::SetTaskStatus(status)))
    }

    /// # Errors
    /// Returns `Forbidden` for employees or `TaskNotFound`.
    pub fn delete_task(&mut self, auth: &AuthContext, task_id: TaskId) -> Result<(), ServiceError> {
        auth.require(auth.role.can_delete_tasks(), "delete tasks")?;
        Ok(self.store.delete_task(task_id)?)
    }

    fn run(
        &mut self,
        auth: &AuthContext,
        task_id: TaskId,
        make_event: impl Fn(&S) -> Result<Event, ServiceError>,
    ) -> Result<Transition, ServiceError> {
        let mut attempt = 0;
        loop {
            let snapshot = self.store.load_snapshot(task_id)?;
            let event = make_event(&self.store)?;
            let (next, changes) = state::apply(&snapshot, &event)?;
            if changes.is_empty() {
                return Ok((next, changes));
            }

            match self.store.apply_changes(&snapshot, &changes, &auth.user) {
                Ok(()) => {
                    debug!(task_id, user = %auth.user, %event, changes = changes.len(), "event applied");
                    return Ok((next, changes));
                }
                Err(e) if e.is_conflict() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(task_id, attempt, error = %e, "write conflict, retrying with a fresh snapshot");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::error::PersistenceError;
    use crate::engine::store::MemoryStore;
    use crate::engine::types::Change;

    fn admin() -> AuthContext {
        AuthContext::new("root", Role::Admin)
    }

    fn service_with_task(subtasks: &[&str]) -> (TaskService<MemoryStore>, TaskId) {
        let mut svc = TaskService::new(MemoryStore::new(), &Config::default());
        let id = svc.create_task(&admin(), "Release").unwrap();
        for title in subtasks {
            svc.add_subtask(&admin(), id, title).unwrap();
        }
        (svc, id)
    }

    /// Lets another writer sneak in before each of the next `races` writes.
    struct RacingStore {
        inner: MemoryStore,
        races: u32,
    }

    impl TaskStore for RacingStore {
        fn create_task(&mut self, title: &str) -> Result<TaskId, PersistenceError> {
            self.inner.create_task(title)
        }
        fn list_tasks(&self) -> Result<Vec<Task>, PersistenceError> {
            self.inner.list_tasks()
        }
        fn load_snapshot(&self, task_id: TaskId) -> Result<Snapshot, PersistenceError> {
            self.inner.load_snapshot(task_id)
        }
        fn next_subtask_id(&self) -> Result<SubtaskId, PersistenceError> {
            self.inner.next_subtask_id()
        }
        fn apply_changes(
            &mut self,
            base: &Snapshot,
            changes: &[Change],
            actor: &str,
        ) -> Result<(), PersistenceError> {
            if self.races > 0 {
                self.races -= 1;
                let current = self.inner.load_snapshot(base.task.id)?;
                let first = current.subtasks[0].id;
                let (_, theirs) = state::toggle_subtask(&current, first).unwrap();
                self.inner.apply_changes(&current, &theirs, "someone-else")?;
            }
            self.inner.apply_changes(base, changes, actor)
        }
        fn delete_task(&mut self, task_id: TaskId) -> Result<(), PersistenceError> {
            self.inner.delete_task(task_id)
        }
        fn history(
            &self,
            task_id: Option<TaskId>,
            limit: usize,
        ) -> Result<Vec<ChangeRecord>, PersistenceError> {
            self.inner.history(task_id, limit)
        }
    }

    #[test]
    fn test_subtasks_drive_task_status() {
        let (mut svc, id) = service_with_task(&["a", "b"]);
        let ids = svc.snapshot(id).unwrap().subtask_ids();
        let user = AuthContext::new("emp", Role::Employee);

        svc.toggle_subtask(&user, id, ids[0]).unwrap();
        let (snap, changes) = svc.toggle_subtask(&user, id, ids[1]).unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(snap.task.status, TaskStatus::Done);
        assert_eq!(svc.snapshot(id).unwrap(), snap);
    }

    #[test]
    fn test_employee_cannot_override_status() {
        let (mut svc, id) = service_with_task(&["a"]);
        let user = AuthContext::new("emp", Role::Employee);
        let err = svc.set_task_status(&user, id, TaskStatus::Done).unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden { .. }));
        assert_eq!(svc.snapshot(id).unwrap().task.status, TaskStatus::ToDo);
        assert!(svc.delete_task(&user, id).is_err());
    }

    #[test]
    fn test_admin_override_cascades() {
        let (mut svc, id) = service_with_task(&["a", "b", "c"]);
        let lead = AuthContext::new("lead", Role::TeamAdmin);
        let (snap, changes) = svc.set_task_status(&lead, id, TaskStatus::Done).unwrap();
        assert_eq!(changes.len(), 4);
        assert!(snap.is_consistent());
        assert_eq!(svc.history(Some(id), 100).unwrap()[0].actor, "lead");
    }

    #[test]
    fn test_noop_writes_nothing() {
        let (mut svc, id) = service_with_task(&["a"]);
        let sub = svc.snapshot(id).unwrap().subtask_ids()[0];
        let before = svc.history(None, 100).unwrap().len();
        let (_, changes) = svc
            .set_subtask_status(&admin(), id, sub, SubtaskStatus::Pending)
            .unwrap();
        assert!(changes.is_empty());
        assert_eq!(svc.history(None, 100).unwrap().len(), before);
    }

    #[test]
    fn test_retries_after_conflict() {
        let mut inner = MemoryStore::new();
        let id = inner.create_task("Release").unwrap();
        let base = inner.load_snapshot(id).unwrap();
        let (_, changes) = state::add_subtask(&base, 1, "a").unwrap();
        inner.apply_changes(&base, &changes, "setup").unwrap();
        let base = inner.load_snapshot(id).unwrap();
        let (_, changes) = state::add_subtask(&base, 2, "b").unwrap();
        inner.apply_changes(&base, &changes, "setup").unwrap();

        let mut svc = TaskService::new(RacingStore { inner, races: 1 }, &Config::default());
        // The racer completes subtask 1 first; our toggle of 2 must then
        // see it and complete the task.
        let (snap, changes) = svc.toggle_subtask(&admin(), id, 2).unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(snap.task.status, TaskStatus::Done);
        assert_eq!(svc.snapshot(id).unwrap(), snap);
    }

    #[test]
    fn test_gives_up_after_max_retries() {
        let mut inner = MemoryStore::new();
        let id = inner.create_task("Release").unwrap();
        let base = inner.load_snapshot(id).unwrap();
        let (_, changes) = state::add_subtask(&base, 1, "a").unwrap();
        inner.apply_changes(&base, &changes, "setup").unwrap();

        let config = Config {
            max_retries: 2,
            ..Config::default()
        };
        let mut svc = TaskService::new(RacingStore { inner, races: 10 }, &config);
        let err = svc.toggle_subtask(&admin(), id, 1).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Persistence(PersistenceError::Conflict { .. })
        ));
        assert_eq!(svc.store().races, 7);
    }

    #[test]
    fn test_unknown_subtask_is_reported() {
        let (mut svc, id) = service_with_task(&["a"]);
        let err = svc.toggle_subtask(&admin(), id, 999).unwrap_err();
        assert!(matches!(err, ServiceError::Engine(_)));
        assert!(matches!(
            svc.toggle_subtask(&admin(), 42, 1).unwrap_err(),
            ServiceError::Persistence(PersistenceError::TaskNotFound(42))
        ));
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("team-admin".parse::<Role>().unwrap(), Role::TeamAdmin);
        assert_eq!("Admin".parse::<Role>().unwrap(), Role::Admin);
        assert!("guest".parse::<Role>().is_err());
    }
}
