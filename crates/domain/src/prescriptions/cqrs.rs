use std::sync::Arc;
use cqrs_es::{mem_store::MemStore, persist::ViewRepository, CqrsFramework};
use crate::store::{MemViewRepository, ViewQuery};
use super::{Prescription, Services, View};

pub type Framework = CqrsFramework<Prescription, MemStore<Prescription>>;

pub type Repo = Arc<Box<dyn ViewRepository<View, Prescription>>>;

pub fn init(repo: Repo, services: Services) -> Arc<Framework> {
    let store = MemStore::<Prescription>::default();
    let query: Box<dyn cqrs_es::Query<Prescription>> = Box::new(ViewQuery::new(repo));

    Arc::new(CqrsFramework::new(store, vec![query], services))
}

pub fn init_repo() -> Repo {
    Arc::new(Box::new(MemViewRepository::<View, Prescription>::new()))
}
