//! Client-side synchronization core for the postdeck UI: query state for the
//! public listing, a read-through collection cache, the mutation pipeline,
//! and the dialog workflow for the management view.

use std::sync::Arc;

use shared::domain::OwnerId;
use tokio::sync::broadcast;

pub mod api;
pub mod cache;
pub mod error;
pub mod listing;
pub mod mutations;
pub mod query;
pub mod workflow;

use crate::{
    api::{HttpPostsApi, PostsApi},
    cache::{CacheLookup, CollectionCache, PageResult, QueryKey},
    error::ClientError,
    mutations::MutationPipeline,
    query::QueryController,
    workflow::{ManagementWorkflow, Notice},
};

const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Events broadcast by the core to whichever views are listening.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// A fresh page result was stored under `result.key`.
    PageReady { result: PageResult },
    /// The fetch for `key` failed; any existing entry was left in place.
    PageFailed { key: QueryKey, error: ClientError },
    /// A user-visible notification should be shown.
    Notice(Notice),
}

/// Wires the core together around one API backend: the public-listing query
/// controller, the collection cache, and the owner's management workflow.
/// The owner identifier is handed in explicitly at construction; the core
/// never reads ambient state.
pub struct PostdeckClient {
    cache: Arc<CollectionCache>,
    browse: QueryController,
    workflow: ManagementWorkflow,
    owner: OwnerId,
    events: broadcast::Sender<ClientEvent>,
}

impl PostdeckClient {
    /// Build a client over the production HTTP backend.
    pub fn connect(base_url: impl Into<String>, owner: OwnerId) -> Self {
        Self::with_api(Arc::new(HttpPostsApi::new(base_url)), owner)
    }

    /// Build a client over any backend; tests inject doubles here.
    pub fn with_api(api: Arc<dyn PostsApi>, owner: OwnerId) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let cache = CollectionCache::new(Arc::clone(&api), events.clone());
        let browse = QueryController::new(Arc::clone(&cache));
        let mutations = MutationPipeline::new(api, Arc::clone(&cache), owner.clone());
        let workflow = ManagementWorkflow::new(mutations, events.clone());
        Self {
            cache,
            browse,
            workflow,
            owner,
            events,
        }
    }

    /// Query state of the public listing.
    pub fn browse(&mut self) -> &mut QueryController {
        &mut self.browse
    }

    /// Dialog workflow of the management view.
    pub fn workflow(&mut self) -> &mut ManagementWorkflow {
        &mut self.workflow
    }

    pub fn cache(&self) -> &Arc<CollectionCache> {
        &self.cache
    }

    pub fn owner(&self) -> &OwnerId {
        &self.owner
    }

    /// Resolve the owner's management listing through the cache.
    pub async fn owner_listing(&self) -> CacheLookup {
        self.cache.resolve(QueryKey::Owner(self.owner.clone())).await
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
