//! A static map of known providers plus a registration point for executors:
//! an interface `Executor` trait object keyed by [`Provider`] instead of a
//! bare string.

use std::collections::HashMap;
use std::sync::Arc;

use crate::executor::Executor;
use crate::model::Provider;

#[derive(Default)]
pub struct ProviderRegistry {
 executors: HashMap<Provider, Arc<dyn Executor>>,
}

impl ProviderRegistry {
 pub fn new() -> Self {
 Self::default()
 }

 pub fn register(&mut self, executor: Arc<dyn Executor>) {
 self.executors.insert(executor.provider(), executor);
 }

 pub fn get(&self, provider: Provider) -> Option<Arc<dyn Executor>> {
 self.executors.get(&provider).cloned()
 }
}
