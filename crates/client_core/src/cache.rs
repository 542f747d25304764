//! Read-through cache over the remote collection.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use shared::domain::{OwnerId, Post};
use tokio::sync::{broadcast, Mutex};
use tracing::debug;

use crate::{api::PostsApi, error::ClientError, query::QuerySignature, ClientEvent};

/// Key space of the collection cache: one public page, or one owner's
/// unpaginated listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Page(QuerySignature),
    Owner(OwnerId),
}

impl QueryKey {
    pub fn is_owner(&self, owner: &OwnerId) -> bool {
        matches!(self, QueryKey::Owner(key_owner) if key_owner == owner)
    }
}

/// One cached server response. Consumers receive clones and never mutate the
/// cached copy in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResult {
    pub items: Vec<Post>,
    pub total_pages: u32,
    pub key: QueryKey,
}

/// Outcome of a lookup: data, a fetch still in flight, or the last fetch
/// error for a key that has no usable entry.
#[derive(Debug, Clone)]
pub enum CacheLookup {
    Hit(PageResult),
    Loading,
    Failed(ClientError),
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<QueryKey, PageResult>,
    errors: HashMap<QueryKey, ClientError>,
    in_flight: HashSet<QueryKey>,
    /// Bumped by invalidation; an in-flight fetch that no longer matches the
    /// key's generation is discarded on completion.
    generations: HashMap<QueryKey, u64>,
}

/// Maps query keys to the last-known server response. The interior mutex is
/// never held across network I/O; fetches run on spawned tasks and commit
/// their outcome under a fresh lock.
pub struct CollectionCache {
    api: Arc<dyn PostsApi>,
    state: Mutex<CacheState>,
    events: broadcast::Sender<ClientEvent>,
}

impl CollectionCache {
    pub fn new(api: Arc<dyn PostsApi>, events: broadcast::Sender<ClientEvent>) -> Arc<Self> {
        Arc::new(Self {
            api,
            state: Mutex::new(CacheState::default()),
            events,
        })
    }

    /// Read through the cache. A hit returns the stored entry without a
    /// network round trip. A miss reports `Loading` and starts one
    /// background fetch for the key; duplicate calls while that fetch is
    /// pending attach to it rather than issuing another request. A key in
    /// error state reports the failure once and fetches fresh.
    pub async fn resolve(self: &Arc<Self>, key: QueryKey) -> CacheLookup {
        let mut state = self.state.lock().await;
        if let Some(entry) = state.entries.get(&key) {
            return CacheLookup::Hit(entry.clone());
        }
        if state.in_flight.contains(&key) {
            return CacheLookup::Loading;
        }
        let previous_failure = state.errors.remove(&key);
        self.spawn_fetch(&mut state, key);
        match previous_failure {
            Some(error) => CacheLookup::Failed(error),
            None => CacheLookup::Loading,
        }
    }

    /// Drop every entry whose key matches `predicate` and orphan any
    /// matching in-flight fetch; the next `resolve` for a dropped key
    /// fetches fresh.
    pub async fn invalidate<F>(&self, predicate: F)
    where
        F: Fn(&QueryKey) -> bool,
    {
        let mut state = self.state.lock().await;
        state.entries.retain(|key, _| !predicate(key));
        state.errors.retain(|key, _| !predicate(key));
        state.in_flight.retain(|key| !predicate(key));
        for (key, generation) in state.generations.iter_mut() {
            if predicate(key) {
                *generation += 1;
            }
        }
    }

    /// Invalidate one owner's management listing; mutations call this after
    /// success so the next render re-fetches.
    pub async fn invalidate_owner(&self, owner: &OwnerId) {
        self.invalidate(|key| key.is_owner(owner)).await;
    }

    fn spawn_fetch(self: &Arc<Self>, state: &mut CacheState, key: QueryKey) {
        let generation = *state.generations.entry(key.clone()).or_insert(0);
        state.in_flight.insert(key.clone());
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = cache.fetch(&key).await;
            cache.commit(key, generation, outcome).await;
        });
    }

    async fn fetch(&self, key: &QueryKey) -> Result<PageResult, ClientError> {
        match key {
            QueryKey::Page(signature) => {
                let page = self.api.list_page(signature).await?;
                Ok(PageResult {
                    items: page.posts,
                    total_pages: page.total_pages.max(1),
                    key: key.clone(),
                })
            }
            QueryKey::Owner(owner) => {
                let posts = self.api.owner_posts(owner).await?;
                Ok(PageResult {
                    items: posts,
                    total_pages: 1,
                    key: key.clone(),
                })
            }
        }
    }

    async fn commit(
        &self,
        key: QueryKey,
        generation: u64,
        outcome: Result<PageResult, ClientError>,
    ) {
        let mut state = self.state.lock().await;
        let current = state.generations.get(&key).copied().unwrap_or(0);
        if current != generation {
            debug!(?key, "discarding fetch result for invalidated key");
            return;
        }
        state.in_flight.remove(&key);
        match outcome {
            Ok(result) => {
                state.errors.remove(&key);
                state.entries.insert(key, result.clone());
                let _ = self.events.send(ClientEvent::PageReady { result });
            }
            Err(error) => {
                // Only the error state is recorded; entries are never
                // replaced by a failure.
                state.errors.insert(key.clone(), error.clone());
                let _ = self.events.send(ClientEvent::PageFailed { key, error });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use shared::{
        domain::{PostId, StatusFilter},
        protocol::{CreatePostRequest, UpdatePostRequest},
    };
    use tokio::sync::{mpsc, oneshot};

    use crate::{
        api::FetchedPage,
        listing::{ListingPhase, ListingState},
    };

    struct ListCall {
        signature: QuerySignature,
        respond: oneshot::Sender<Result<FetchedPage, ClientError>>,
    }

    /// Backend double whose fetches block until the test answers them, so
    /// completion order is fully scripted.
    struct ManualApi {
        calls: mpsc::UnboundedSender<ListCall>,
    }

    fn manual_api() -> (Arc<ManualApi>, mpsc::UnboundedReceiver<ListCall>) {
        let (calls, calls_rx) = mpsc::unbounded_channel();
        (Arc::new(ManualApi { calls }), calls_rx)
    }

    #[async_trait]
    impl crate::api::PostsApi for ManualApi {
        async fn list_page(&self, signature: &QuerySignature) -> Result<FetchedPage, ClientError> {
            let (respond, outcome) = oneshot::channel();
            self.calls
                .send(ListCall {
                    signature: signature.clone(),
                    respond,
                })
                .expect("test listens for list calls");
            outcome.await.expect("test answers list calls")
        }

        async fn owner_posts(&self, _owner: &OwnerId) -> Result<Vec<Post>, ClientError> {
            Err(ClientError::Network("not scripted".to_string()))
        }

        async fn create_post(&self, _request: &CreatePostRequest) -> Result<Post, ClientError> {
            Err(ClientError::Network("not scripted".to_string()))
        }

        async fn update_post(
            &self,
            _id: &PostId,
            _request: &UpdatePostRequest,
        ) -> Result<Post, ClientError> {
            Err(ClientError::Network("not scripted".to_string()))
        }

        async fn delete_post(&self, _id: &PostId) -> Result<(), ClientError> {
            Err(ClientError::Network("not scripted".to_string()))
        }
    }

    fn post(id: &str, title: &str) -> Post {
        Post {
            id: PostId::from(id),
            title: title.to_string(),
            content: "body".to_string(),
            owner: Some(OwnerId::from("owner-1")),
            author_name: None,
            published: true,
        }
    }

    fn fetched(id: &str, title: &str) -> FetchedPage {
        FetchedPage {
            posts: vec![post(id, title)],
            total_pages: 1,
        }
    }

    fn page_key(search: &str, page: u32) -> QueryKey {
        let mut signature = QuerySignature::first_page(search, StatusFilter::Any);
        signature.page = page;
        QueryKey::Page(signature)
    }

    #[tokio::test]
    async fn duplicate_resolves_attach_to_one_in_flight_fetch() {
        let (api, mut calls) = manual_api();
        let (events, mut events_rx) = broadcast::channel(64);
        let cache = CollectionCache::new(api, events);
        let key = page_key("", 1);

        assert!(matches!(
            cache.resolve(key.clone()).await,
            CacheLookup::Loading
        ));
        assert!(matches!(
            cache.resolve(key.clone()).await,
            CacheLookup::Loading
        ));

        let call = calls.recv().await.expect("one fetch");
        assert_eq!(call.signature.page, 1);
        assert!(calls.try_recv().is_err(), "second resolve must not fetch");

        call.respond.send(Ok(fetched("1", "first"))).expect("deliver");
        let event = events_rx.recv().await.expect("ready event");
        assert!(matches!(event, ClientEvent::PageReady { .. }));

        match cache.resolve(key).await {
            CacheLookup::Hit(result) => assert_eq!(result.items[0].title, "first"),
            other => panic!("expected hit, got {other:?}"),
        }
        assert!(calls.try_recv().is_err(), "a hit must not fetch");
    }

    #[tokio::test]
    async fn newer_page_stays_visible_when_older_fetch_finishes_last() {
        let (api, mut calls) = manual_api();
        let (events, mut events_rx) = broadcast::channel(64);
        let cache = CollectionCache::new(api, events);
        let mut listing = ListingState::new();

        let older = page_key("", 1);
        let newer = page_key("", 2);

        listing.begin(cache.resolve(older.clone()).await);
        let older_call = calls.recv().await.expect("older fetch");

        // The consumer moves to page 2 while page 1 is still in flight.
        listing.begin(cache.resolve(newer.clone()).await);
        let newer_call = calls.recv().await.expect("newer fetch");

        newer_call
            .respond
            .send(Ok(fetched("2", "page-two")))
            .expect("deliver");
        let event = events_rx.recv().await.expect("newer result");
        listing.apply(&newer, &event);

        older_call
            .respond
            .send(Ok(fetched("1", "page-one")))
            .expect("deliver");
        let event = events_rx.recv().await.expect("older result");
        listing.apply(&newer, &event);

        match listing.phase() {
            ListingPhase::Ready(result) => assert_eq!(result.items[0].title, "page-two"),
            other => panic!("expected page two to stay visible, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn invalidation_orphans_the_in_flight_fetch() {
        let (api, mut calls) = manual_api();
        let (events, mut events_rx) = broadcast::channel(64);
        let cache = CollectionCache::new(api, events);
        let key = page_key("", 1);

        assert!(matches!(
            cache.resolve(key.clone()).await,
            CacheLookup::Loading
        ));
        let stale_call = calls.recv().await.expect("first fetch");

        cache.invalidate(|candidate| *candidate == key).await;

        assert!(matches!(
            cache.resolve(key.clone()).await,
            CacheLookup::Loading
        ));
        let fresh_call = calls.recv().await.expect("fresh fetch");

        stale_call
            .respond
            .send(Ok(fetched("1", "stale")))
            .expect("deliver");
        fresh_call
            .respond
            .send(Ok(fetched("1", "fresh")))
            .expect("deliver");

        match events_rx.recv().await.expect("one ready event") {
            ClientEvent::PageReady { result } => assert_eq!(result.items[0].title, "fresh"),
            other => panic!("expected ready event, got {other:?}"),
        }
        match cache.resolve(key).await {
            CacheLookup::Hit(result) => assert_eq!(result.items[0].title, "fresh"),
            other => panic!("expected fresh entry, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn failed_fetch_reports_error_state_and_refetches_on_next_resolve() {
        let (api, mut calls) = manual_api();
        let (events, mut events_rx) = broadcast::channel(64);
        let cache = CollectionCache::new(api, events);
        let key = page_key("", 1);

        assert!(matches!(
            cache.resolve(key.clone()).await,
            CacheLookup::Loading
        ));
        let call = calls.recv().await.expect("first fetch");
        call.respond
            .send(Err(ClientError::Network("connection reset".to_string())))
            .expect("deliver");
        let event = events_rx.recv().await.expect("failure event");
        assert!(matches!(event, ClientEvent::PageFailed { .. }));

        match cache.resolve(key.clone()).await {
            CacheLookup::Failed(ClientError::Network(message)) => {
                assert_eq!(message, "connection reset");
            }
            other => panic!("expected failed lookup, got {other:?}"),
        }

        // That resolve also started a fresh fetch.
        let retry = calls.recv().await.expect("retry fetch");
        retry
            .respond
            .send(Ok(fetched("1", "recovered")))
            .expect("deliver");
        events_rx.recv().await.expect("ready event");
        match cache.resolve(key).await {
            CacheLookup::Hit(result) => assert_eq!(result.items[0].title, "recovered"),
            other => panic!("expected recovered entry, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn invalidate_drops_only_matching_entries() {
        let (api, mut calls) = manual_api();
        let (events, mut events_rx) = broadcast::channel(64);
        let cache = CollectionCache::new(api, events);
        let key_a = page_key("alpha", 1);
        let key_b = page_key("beta", 1);

        for key in [&key_a, &key_b] {
            cache.resolve(key.clone()).await;
            let call = calls.recv().await.expect("fetch");
            let title = call.signature.search.clone();
            call.respond.send(Ok(fetched("1", &title))).expect("deliver");
            events_rx.recv().await.expect("ready event");
        }

        cache
            .invalidate(|key| {
                matches!(key, QueryKey::Page(signature) if signature.search == "alpha")
            })
            .await;

        match cache.resolve(key_b).await {
            CacheLookup::Hit(result) => assert_eq!(result.items[0].title, "beta"),
            other => panic!("expected untouched entry, got {other:?}"),
        }
        assert!(calls.try_recv().is_err(), "untouched key must not refetch");

        assert!(matches!(cache.resolve(key_a).await, CacheLookup::Loading));
        assert!(calls.recv().await.is_some(), "dropped key fetches fresh");
    }
}
