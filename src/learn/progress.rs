use chrono::Utc;
use log::{debug, info};
use std::sync::Arc;
use uuid::Uuid;

use super::difficulty::completion_percentage;
use super::error::LearnError;
use super::storage::LearnStore;
use super::types::Progress;

/// Attempts per read-modify-write before a version conflict is surfaced.
pub const SAVE_ATTEMPTS: usize = 3;

#[derive(Clone)]
pub struct ProgressTracker {
    store: Arc<dyn LearnStore>,
    total_modules: u32,
}

impl ProgressTracker {
    pub fn new(store: Arc<dyn LearnStore>, total_modules: u32) -> Self {
        Self {
            store,
            total_modules,
        }
    }

    pub async fn get_or_create(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<Progress, LearnError> {
        if self.store.find_user(user_id).await?.is_none() {
            return Err(LearnError::Validation(format!(
                "user {user_id} does not exist"
            )));
        }
        if !self.store.course_exists(course_id).await? {
            return Err(LearnError::Validation(format!(
                "course {course_id} does not exist"
            )));
        }

        if let Some(progress) = self.store.find_progress(user_id, course_id).await? {
            return Ok(progress);
        }

        let progress = self
            .store
            .insert_progress(Progress::new(user_id, course_id))
            .await?;
        info!("Started progress {} for user {user_id} in course {course_id}", progress.id);
        Ok(progress)
    }

    pub async fn get(&self, user_id: Uuid, course_id: Uuid) -> Result<Progress, LearnError> {
        self.store
            .find_progress(user_id, course_id)
            .await?
            .ok_or_else(|| {
                LearnError::NotFound(format!(
                    "progress for user {user_id} in course {course_id}"
                ))
            })
    }

    /// Adds the module to the completed set (no-op if present) and recomputes
    /// the percentage against the configured module total.
    pub async fn complete_module(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        module_id: Uuid,
    ) -> Result<Progress, LearnError> {
        let module = self
            .store
            .find_module(module_id)
            .await?
            .ok_or_else(|| LearnError::NotFound(format!("module {module_id}")))?;
        if module.course_id != Some(course_id) {
            return Err(LearnError::Validation(format!(
                "module {module_id} does not belong to course {course_id}"
            )));
        }

        self.get_or_create(user_id, course_id).await?;

        let total_modules = self.total_modules;
        let progress = self
            .update(user_id, course_id, move |progress| {
                if !progress.completed_modules.contains(&module_id) {
                    progress.completed_modules.push(module_id);
                }
                progress.completed_percentage =
                    completion_percentage(progress.completed_modules.len(), total_modules);
            })
            .await?
            .ok_or_else(|| {
                LearnError::NotFound(format!(
                    "progress for user {user_id} in course {course_id}"
                ))
            })?;

        info!(
            "User {user_id} completed module {module_id}: {}/{} modules, {:.1}%",
            progress.completed_modules.len(),
            total_modules,
            progress.completed_percentage
        );
        Ok(progress)
    }

    /// Overwrites the average. Returns `None` when the user has no progress
    /// record for the course.
    pub async fn update_average_score(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        average: f64,
    ) -> Result<Option<Progress>, LearnError> {
        self.update(user_id, course_id, move |progress| {
            progress.average_score = Some(average);
        })
        .await
    }

    async fn update<F>(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        apply: F,
    ) -> Result<Option<Progress>, LearnError>
    where
        F: Fn(&mut Progress) + Send + Sync,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let Some(mut progress) = self.store.find_progress(user_id, course_id).await? else {
                return Ok(None);
            };
            apply(&mut progress);
            progress.last_accessed_at = Utc::now();

            match self.store.save_progress(progress).await {
                Ok(saved) => return Ok(Some(saved)),
                Err(LearnError::Conflict(reason)) if attempt < SAVE_ATTEMPTS => {
                    debug!("Retrying progress update for user {user_id}: {reason}");
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learn::storage::contended::ContendedStore;
    use crate::learn::storage::{MemoryStore, ProgressRepository};
    use crate::learn::types::{ModuleRef, Role, UserRef};

    struct Fixture {
        store: MemoryStore,
        tracker: ProgressTracker,
        user_id: Uuid,
        course_id: Uuid,
    }

    async fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let user_id = Uuid::new_v4();
        let course_id = Uuid::new_v4();
        store
            .add_user(UserRef {
                id: user_id,
                role: Role::Student,
            })
            .await;
        store.add_course(course_id).await;
        let tracker = ProgressTracker::new(Arc::new(store.clone()), 10);
        Fixture {
            store,
            tracker,
            user_id,
            course_id,
        }
    }

    impl Fixture {
        async fn module(&self) -> Uuid {
            let id = Uuid::new_v4();
            self.store
                .add_module(ModuleRef {
                    id,
                    course_id: Some(self.course_id),
                    title: String::new(),
                })
                .await;
            id
        }
    }

    #[tokio::test]
    async fn test_get_or_create_defaults_and_reuse() {
        let fx = fixture().await;
        let created = fx.tracker.get_or_create(fx.user_id, fx.course_id).await.unwrap();
        assert_eq!(created.completed_percentage, 0.0);
        assert!(created.completed_modules.is_empty());
        assert_eq!(created.average_score, Some(0.0));

        let again = fx.tracker.get_or_create(fx.user_id, fx.course_id).await.unwrap();
        assert_eq!(again.id, created.id);
    }

    #[tokio::test]
    async fn test_get_or_create_validates_references() {
        let fx = fixture().await;
        let err = fx
            .tracker
            .get_or_create(Uuid::new_v4(), fx.course_id)
            .await
            .unwrap_err();
        assert!(matches!(err, LearnError::Validation(_)));

        let err = fx
            .tracker
            .get_or_create(fx.user_id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, LearnError::Validation(_)));
    }

    #[tokio::test]
    async fn test_complete_module_is_idempotent() {
        let fx = fixture().await;
        let module = fx.module().await;

        let once = fx
            .tracker
            .complete_module(fx.user_id, fx.course_id, module)
            .await
            .unwrap();
        let twice = fx
            .tracker
            .complete_module(fx.user_id, fx.course_id, module)
            .await
            .unwrap();
        assert_eq!(once.completed_modules, vec![module]);
        assert_eq!(twice.completed_modules, once.completed_modules);
        assert_eq!(twice.completed_percentage, 10.0);
    }

    #[tokio::test]
    async fn test_percentage_uses_configured_total() {
        let fx = fixture().await;
        for k in 1..=12usize {
            let module = fx.module().await;
            let progress = fx
                .tracker
                .complete_module(fx.user_id, fx.course_id, module)
                .await
                .unwrap();
            assert_eq!(progress.completed_percentage, (k * 10) as f64);
        }
    }

    #[tokio::test]
    async fn test_complete_module_checks_course() {
        let fx = fixture().await;
        let err = fx
            .tracker
            .complete_module(fx.user_id, fx.course_id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, LearnError::NotFound(_)));

        let foreign = Uuid::new_v4();
        fx.store
            .add_module(ModuleRef {
                id: foreign,
                course_id: Some(Uuid::new_v4()),
                title: String::new(),
            })
            .await;
        let err = fx
            .tracker
            .complete_module(fx.user_id, fx.course_id, foreign)
            .await
            .unwrap_err();
        assert!(matches!(err, LearnError::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_average_leaves_modules_alone() {
        let fx = fixture().await;
        let module = fx.module().await;
        fx.tracker
            .complete_module(fx.user_id, fx.course_id, module)
            .await
            .unwrap();

        let updated = fx
            .tracker
            .update_average_score(fx.user_id, fx.course_id, 3.0)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.average_score, Some(3.0));
        assert_eq!(updated.completed_modules, vec![module]);
        assert_eq!(updated.completed_percentage, 10.0);
    }

    #[tokio::test]
    async fn test_update_average_without_record() {
        let fx = fixture().await;
        let result = fx
            .tracker
            .update_average_score(fx.user_id, fx.course_id, 2.0)
            .await
            .unwrap();
        assert!(result.is_none());
        assert!(matches!(
            fx.tracker.get(fx.user_id, fx.course_id).await,
            Err(LearnError::NotFound(_))
        ));
    }

    async fn contended(conflicts: usize) -> (Arc<ContendedStore>, ProgressTracker, Uuid, Uuid) {
        let fx = fixture().await;
        fx.store
            .insert_progress(Progress::new(fx.user_id, fx.course_id))
            .await
            .unwrap();
        let store = Arc::new(ContendedStore::new(fx.store, conflicts));
        let tracker = ProgressTracker::new(store.clone(), 10);
        (store, tracker, fx.user_id, fx.course_id)
    }

    #[tokio::test]
    async fn test_conflict_is_retried() {
        let (store, tracker, user_id, course_id) = contended(SAVE_ATTEMPTS - 1).await;
        let saved = tracker
            .update_average_score(user_id, course_id, 4.0)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(saved.average_score, Some(4.0));
        assert_eq!(store.saves(), SAVE_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_conflict_surfaces_after_attempts() {
        let (store, tracker, user_id, course_id) = contended(SAVE_ATTEMPTS).await;
        let err = tracker
            .update_average_score(user_id, course_id, 4.0)
            .await
            .unwrap_err();
        assert!(matches!(err, LearnError::Conflict(_)));
        assert_eq!(store.saves(), SAVE_ATTEMPTS);
    }
}
