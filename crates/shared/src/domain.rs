use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(raw.to_string())
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                Self(raw)
            }
        }
    };
}

id_newtype!(PostId);
id_newtype!(OwnerId);

/// Publish-status facet of the public listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    #[default]
    Any,
    Published,
    Unpublished,
}

impl StatusFilter {
    /// Wire value for the `status` query parameter; `Any` sends nothing.
    pub fn as_query_value(self) -> Option<&'static str> {
        match self {
            StatusFilter::Any => None,
            StatusFilter::Published => Some("true"),
            StatusFilter::Unpublished => Some("false"),
        }
    }
}

/// A post as the client reasons about it. Fields never change outside the
/// create/update/delete operations scoped to `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub content: String,
    /// Absent when the server expands the owner to a display-name object
    /// without an identifier.
    pub owner: Option<OwnerId>,
    /// Display name denormalized from the owner; read-only here.
    pub author_name: Option<String>,
    pub published: bool,
}
