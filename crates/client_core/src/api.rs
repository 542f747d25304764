//! Seam to the remote posts service.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use shared::{
    domain::{OwnerId, Post, PostId},
    error::ErrorBody,
    protocol::{CreatePostRequest, PostListResponse, PostPayload, UpdatePostRequest},
};
use tracing::debug;

use crate::{error::ClientError, query::QuerySignature};

/// One fetched page before the cache keys it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub posts: Vec<Post>,
    pub total_pages: u32,
}

/// The remote posts service as the core consumes it. The production
/// implementation speaks HTTP; tests substitute doubles.
#[async_trait]
pub trait PostsApi: Send + Sync {
    async fn list_page(&self, signature: &QuerySignature) -> Result<FetchedPage, ClientError>;
    async fn owner_posts(&self, owner: &OwnerId) -> Result<Vec<Post>, ClientError>;
    async fn create_post(&self, request: &CreatePostRequest) -> Result<Post, ClientError>;
    async fn update_post(
        &self,
        id: &PostId,
        request: &UpdatePostRequest,
    ) -> Result<Post, ClientError>;
    async fn delete_post(&self, id: &PostId) -> Result<(), ClientError>;
}

pub struct HttpPostsApi {
    http: Client,
    base_url: String,
}

impl HttpPostsApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: Client::new(),
            base_url,
        }
    }
}

#[async_trait]
impl PostsApi for HttpPostsApi {
    async fn list_page(&self, signature: &QuerySignature) -> Result<FetchedPage, ClientError> {
        let mut query: Vec<(&str, String)> = vec![
            ("page", signature.page.to_string()),
            ("limit", signature.page_size.to_string()),
        ];
        if !signature.search.is_empty() {
            query.push(("search", signature.search.clone()));
        }
        if let Some(status) = signature.status.as_query_value() {
            query.push(("status", status.to_string()));
        }

        let response = self
            .http
            .get(format!("{}/posts", self.base_url))
            .query(&query)
            .send()
            .await
            .map_err(transport_error)?;
        if !response.status().is_success() {
            return Err(failure_from(response, None).await);
        }
        let listing: PostListResponse = response.json().await.map_err(decode_error)?;
        debug!(
            page = signature.page,
            returned = listing.data.len(),
            "fetched public listing page"
        );
        Ok(FetchedPage {
            total_pages: listing.total_pages.unwrap_or(1).max(1),
            posts: map_posts(listing.data)?,
        })
    }

    async fn owner_posts(&self, owner: &OwnerId) -> Result<Vec<Post>, ClientError> {
        let response = self
            .http
            .get(format!("{}/posts", self.base_url))
            .query(&[("owner", owner.as_str())])
            .send()
            .await
            .map_err(transport_error)?;
        if !response.status().is_success() {
            return Err(failure_from(response, None).await);
        }
        let listing: PostListResponse = response.json().await.map_err(decode_error)?;
        map_posts(listing.data)
    }

    async fn create_post(&self, request: &CreatePostRequest) -> Result<Post, ClientError> {
        let response = self
            .http
            .post(format!("{}/posts", self.base_url))
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;
        if !response.status().is_success() {
            return Err(failure_from(response, None).await);
        }
        read_post(response).await
    }

    async fn update_post(
        &self,
        id: &PostId,
        request: &UpdatePostRequest,
    ) -> Result<Post, ClientError> {
        let response = self
            .http
            .put(format!("{}/posts/{}", self.base_url, id))
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;
        if !response.status().is_success() {
            return Err(failure_from(response, Some(id)).await);
        }
        read_post(response).await
    }

    async fn delete_post(&self, id: &PostId) -> Result<(), ClientError> {
        let response = self
            .http
            .delete(format!("{}/posts/{}", self.base_url, id))
            .send()
            .await
            .map_err(transport_error)?;
        if !response.status().is_success() {
            return Err(failure_from(response, Some(id)).await);
        }
        Ok(())
    }
}

fn transport_error(err: reqwest::Error) -> ClientError {
    ClientError::Network(err.to_string())
}

fn decode_error(err: reqwest::Error) -> ClientError {
    ClientError::Network(format!("invalid response body: {err}"))
}

/// Turn a failure response into the client taxonomy. 404 against a known
/// mutation target means the record is gone; anything else surfaces the
/// server message when one was sent.
async fn failure_from(response: Response, target: Option<&PostId>) -> ClientError {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        if let Some(id) = target {
            return ClientError::NotFound(id.clone());
        }
    }
    let message = match response.json::<ErrorBody>().await {
        Ok(body) => body.message,
        Err(_) => status.to_string(),
    };
    ClientError::Remote {
        status: status.as_u16(),
        message,
    }
}

async fn read_post(response: Response) -> Result<Post, ClientError> {
    let record: PostPayload = response.json().await.map_err(decode_error)?;
    record
        .into_post()
        .map_err(|err| ClientError::Network(format!("malformed post record: {err}")))
}

fn map_posts(records: Vec<PostPayload>) -> Result<Vec<Post>, ClientError> {
    records
        .into_iter()
        .map(|record| {
            record
                .into_post()
                .map_err(|err| ClientError::Network(format!("malformed post record: {err}")))
        })
        .collect()
}
