use std::sync::Arc;
use cqrs_es::{mem_store::MemStore, persist::ViewRepository, CqrsFramework};
use crate::store::{MemViewRepository, ViewQuery};
use super::{Order, Services, View};

pub type Framework = CqrsFramework<Order, MemStore<Order>>;

pub type Repo = Arc<Box<dyn ViewRepository<View, Order>>>;

pub fn init(repo: Repo, services: Services) -> Arc<Framework> {
    let store = MemStore::<Order>::default();
    let query: Box<dyn cqrs_es::Query<Order>> = Box::new(ViewQuery::new(repo));

    Arc::new(CqrsFramework::new(store, vec![query], services))
}

pub fn init_repo() -> Repo {
    Arc::new(Box::new(MemViewRepository::<View, Order>::new()))
}
