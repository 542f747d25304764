use serde::{Deserialize, Serialize};

use crate::{
    domain::{OwnerId, Post, PostId},
    error::MissingRecordId,
};

/// Owner reference as it appears on the wire: a bare identifier, or an
/// expanded object carrying the author's display name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OwnerRef {
    Id(String),
    Expanded {
        #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        name: String,
    },
}

impl OwnerRef {
    pub fn owner_id(&self) -> Option<OwnerId> {
        match self {
            OwnerRef::Id(id) => Some(OwnerId(id.clone())),
            OwnerRef::Expanded { id, .. } => id.clone().map(OwnerId),
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            OwnerRef::Id(_) => None,
            OwnerRef::Expanded { name, .. } => Some(name.as_str()),
        }
    }
}

/// A post record as served by the API. Depending on the endpoint the
/// identifier arrives as `id` or `_id`, and the owner reference may or may
/// not be expanded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    pub title: String,
    pub content: String,
    #[serde(rename = "userId")]
    pub user_id: OwnerRef,
    pub status: bool,
}

impl PostPayload {
    pub fn into_post(self) -> Result<Post, MissingRecordId> {
        let id = self
            .id
            .or(self.document_id)
            .map(PostId)
            .ok_or(MissingRecordId)?;
        let owner = self.user_id.owner_id();
        let author_name = self.user_id.name().map(str::to_string);
        Ok(Post {
            id,
            title: self.title,
            content: self.content,
            owner,
            author_name,
            published: self.status,
        })
    }
}

/// Envelope for both the paginated public listing and the unpaginated owner
/// listing (`totalPages` absent there).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostListResponse {
    pub data: Vec<PostPayload>,
    #[serde(
        rename = "totalPages",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub total_pages: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    pub status: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePostRequest {
    pub title: String,
    pub content: String,
    pub status: bool,
}
