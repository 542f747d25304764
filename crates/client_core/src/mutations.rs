//! Create/update/delete against the API, with the owner's cached listing
//! invalidated after every success.

use std::sync::Arc;

use shared::{
    domain::{OwnerId, Post, PostId},
    protocol::{CreatePostRequest, UpdatePostRequest},
};
use tracing::info;

use crate::{api::PostsApi, cache::CollectionCache, error::ClientError, workflow::PostForm};

/// Executes mutations and keeps cached views honest afterwards. Cached pages
/// are never patched with mutation results; the owner listing is dropped and
/// re-fetched on its next read. A failed mutation touches nothing.
pub struct MutationPipeline {
    api: Arc<dyn PostsApi>,
    cache: Arc<CollectionCache>,
    owner: OwnerId,
}

impl MutationPipeline {
    pub fn new(api: Arc<dyn PostsApi>, cache: Arc<CollectionCache>, owner: OwnerId) -> Self {
        Self { api, cache, owner }
    }

    pub fn owner(&self) -> &OwnerId {
        &self.owner
    }

    pub async fn create(&self, form: &PostForm) -> Result<Post, ClientError> {
        ensure_present("title", &form.title)?;
        ensure_present("content", &form.content)?;
        let request = CreatePostRequest {
            title: form.title.clone(),
            content: form.content.clone(),
            user_id: self.owner.as_str().to_string(),
            status: form.publish,
        };
        let post = self.api.create_post(&request).await?;
        info!(post_id = %post.id, "created post");
        self.cache.invalidate_owner(&self.owner).await;
        Ok(post)
    }

    pub async fn update(&self, id: &PostId, form: &PostForm) -> Result<Post, ClientError> {
        ensure_present("title", &form.title)?;
        ensure_present("content", &form.content)?;
        let request = UpdatePostRequest {
            title: form.title.clone(),
            content: form.content.clone(),
            status: form.publish,
        };
        let post = self.api.update_post(id, &request).await?;
        info!(post_id = %post.id, "updated post");
        self.cache.invalidate_owner(&self.owner).await;
        Ok(post)
    }

    /// Deleting an already-deleted id surfaces the server's `NotFound`; the
    /// pipeline does not suppress it.
    pub async fn remove(&self, id: &PostId) -> Result<(), ClientError> {
        self.api.delete_post(id).await?;
        info!(post_id = %id, "deleted post");
        self.cache.invalidate_owner(&self.owner).await;
        Ok(())
    }
}

/// Local pre-flight check; a violation never reaches the network. The
/// submitted value itself is carried verbatim.
fn ensure_present(field: &'static str, value: &str) -> Result<(), ClientError> {
    if value.trim().is_empty() {
        return Err(ClientError::Validation { field });
    }
    Ok(())
}
