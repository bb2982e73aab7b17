//! Shared S3 shapes used by the gateway's list and ACL responses.

use serde::{Deserialize, Serialize};

/// S3 EncodingType.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EncodingType {
    /// URL encoding of keys and prefixes in list responses.
    #[default]
    #[serde(rename = "url")]
    Url,
}

impl EncodingType {
    /// Returns the string value of this enum variant.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Url => "url",
        }
    }

    /// Parse the `encoding-type` query value. Only `url` is recognized.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        s.eq_ignore_ascii_case("url").then_some(Self::Url)
    }
}

impl std::fmt::Display for EncodingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// S3 Permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Permission {
    /// `FULL_CONTROL`.
    #[serde(rename = "FULL_CONTROL")]
    FullControl,
    /// `READ`.
    #[default]
    #[serde(rename = "READ")]
    Read,
}

impl Permission {
    /// Returns the string value of this enum variant.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FullControl => "FULL_CONTROL",
            Self::Read => "READ",
        }
    }
}

/// The `xsi:type` of a grantee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GranteeType {
    /// A canonical user identified by ID.
    #[default]
    CanonicalUser,
    /// A predefined group identified by URI.
    Group,
}

impl GranteeType {
    /// Returns the string value of this enum variant.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CanonicalUser => "CanonicalUser",
            Self::Group => "Group",
        }
    }
}

/// S3 Owner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Owner {
    pub display_name: Option<String>,
    pub id: Option<String>,
}

/// S3 Bucket, one per browseable target.
#[derive(Debug, Clone, Default)]
pub struct Bucket {
    pub creation_date: Option<chrono::DateTime<chrono::Utc>>,
    pub name: Option<String>,
}

/// S3 Object entry in a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Object {
    pub e_tag: Option<String>,
    pub key: Option<String>,
    pub last_modified: Option<chrono::DateTime<chrono::Utc>>,
    pub size: Option<i64>,
    pub storage_class: Option<String>,
}

/// S3 CommonPrefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommonPrefix {
    pub prefix: Option<String>,
}

/// S3 Grantee.
#[derive(Debug, Clone, Default)]
pub struct Grantee {
    pub display_name: Option<String>,
    pub id: Option<String>,
    pub r#type: GranteeType,
    pub uri: Option<String>,
}

/// S3 Grant.
#[derive(Debug, Clone, Default)]
pub struct Grant {
    pub grantee: Option<Grantee>,
    pub permission: Option<Permission>,
}
