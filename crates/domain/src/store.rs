//! Session-scoped storage: events in a `MemStore`, views in memory.

use std::{
    collections::HashMap,
    marker::PhantomData,
    sync::{Arc, RwLock},
};

use async_trait::async_trait;
use cqrs_es::{
    persist::{PersistenceError, ViewContext, ViewRepository},
    Aggregate, EventEnvelope, Query, View,
};

/// Folds committed events into the view kept by `repo`.
pub struct ViewQuery<V, A> {
    repo: Arc<Box<dyn ViewRepository<V, A>>>,
}

impl<V, A> ViewQuery<V, A>
where
    V: View<A>,
    A: Aggregate,
{
    pub fn new(repo: Arc<Box<dyn ViewRepository<V, A>>>) -> Self {
        Self { repo }
    }

    async fn update(
        &self,
        aggregate_id: &str,
        events: &[EventEnvelope<A>],
    ) -> Result<(), PersistenceError> {
        let (mut view, view_context) = match self.repo.load_with_context(aggregate_id).await? {
            None => (V::default(), ViewContext::new(aggregate_id.to_string(), 0)),
            Some((view, context)) => (view, context),
        };

        for event in events {
            view.update(event);
        }

        self.repo.update_view(view, view_context).await
    }
}

#[async_trait]
impl<V, A> Query<A> for ViewQuery<V, A>
where
    V: View<A>,
    A: Aggregate,
{
    async fn dispatch(&self, aggregate_id: &str, events: &[EventEnvelope<A>]) {
        if let Err(err) = self.update(aggregate_id, events).await {
            tracing::error!("{} view error for {}: {}", A::aggregate_type(), aggregate_id, err);
        }
    }
}

/// Keeps the latest version of each view, keyed by aggregate id.
pub struct MemViewRepository<V, A> {
    views: RwLock<HashMap<String, (V, i64)>>,
    _aggregate: PhantomData<fn() -> A>,
}

impl<V, A> Default for MemViewRepository<V, A> {
    fn default() -> Self {
        Self {
            views: RwLock::new(HashMap::new()),
            _aggregate: PhantomData,
        }
    }
}

impl<V, A> MemViewRepository<V, A> {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl<V, A> ViewRepository<V, A> for MemViewRepository<V, A>
where
    V: View<A> + Clone,
    A: Aggregate,
{
    async fn load(&self, view_id: &str) -> Result<Option<V>, PersistenceError> {
        Ok(self.load_with_context(view_id).await?.map(|(view, _)| view))
    }

    async fn load_with_context(
        &self,
        view_id: &str,
    ) -> Result<Option<(V, ViewContext)>, PersistenceError> {
        let views = self.views.read().map_err(poisoned)?;
        Ok(views
            .get(view_id)
            .map(|(view, version)| (view.clone(), ViewContext::new(view_id.to_string(), *version))))
    }

    async fn update_view(&self, view: V, context: ViewContext) -> Result<(), PersistenceError> {
        let mut views = self.views.write().map_err(poisoned)?;
        let current = views
            .get(&context.view_instance_id)
            .map(|(_, version)| *version)
            .unwrap_or(0);
        if current != context.version {
            return Err(PersistenceError::OptimisticLockError);
        }
        views.insert(context.view_instance_id, (view, context.version + 1));
        Ok(())
    }
}

fn poisoned<T>(err: std::sync::PoisonError<T>) -> PersistenceError {
    PersistenceError::UnknownError(err.to_string().into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prescriptions::{Event, Prescription, PrescriptionField, View as PrescriptionView};
    use chrono::Utc;

    fn envelope(sequence: usize, payload: Event) -> EventEnvelope<Prescription> {
        EventEnvelope {
            aggregate_id: "rx-3".to_string(),
            sequence,
            payload,
            metadata: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn view_query_folds_successive_batches() {
        let repo: Arc<Box<dyn ViewRepository<PrescriptionView, Prescription>>> =
            Arc::new(Box::new(MemViewRepository::new()));
        let query = ViewQuery::new(repo.clone());

        query
            .dispatch(
                "rx-3",
                &[envelope(
                    1,
                    Event::PrescriptionAdded {
                        id: "rx-3".to_string(),
                        created_at: Utc::now(),
                    },
                )],
            )
            .await;
        query
            .dispatch(
                "rx-3",
                &[envelope(
                    2,
                    Event::PrescriptionUpdated {
                        id: "rx-3".to_string(),
                        field: PrescriptionField::Refills(3),
                        updated_at: Utc::now(),
                    },
                )],
            )
            .await;

        let (view, context) = repo.load_with_context("rx-3").await.unwrap().unwrap();
        assert_eq!(view.id, "rx-3");
        assert_eq!(view.prescription.refills, 3);
        assert_eq!(context.version, 2);
    }

    #[tokio::test]
    async fn stores_and_versions_views() {
        let repo = MemViewRepository::<PrescriptionView, Prescription>::new();
        assert!(repo.load("rx-1").await.unwrap().is_none());

        let mut view = PrescriptionView::default();
        view.id = "rx-1".to_string();
        repo.update_view(view.clone(), ViewContext::new("rx-1".to_string(), 0))
            .await
            .unwrap();

        let (loaded, context) = repo.load_with_context("rx-1").await.unwrap().unwrap();
        assert_eq!(loaded.id, "rx-1");
        assert_eq!(context.version, 1);
    }

    #[tokio::test]
    async fn stale_context_is_rejected() {
        let repo = MemViewRepository::<PrescriptionView, Prescription>::new();
        let view = PrescriptionView::default();

        repo.update_view(view.clone(), ViewContext::new("rx-2".to_string(), 0))
            .await
            .unwrap();
        let result = repo
            .update_view(view, ViewContext::new("rx-2".to_string(), 0))
            .await;

        assert!(matches!(result, Err(PersistenceError::OptimisticLockError)));
    }
}
