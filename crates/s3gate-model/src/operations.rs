//! Operations recognized by the gateway router.

/// All supported S3 operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum S3Operation {
    /// The ListBuckets operation (`GET /`).
    ListBuckets,
    /// The ListObjectsV2 operation (`GET /{bucket}?list-type=2`).
    ListObjectsV2,
    /// The GetBucketAcl operation (`GET /{bucket}?acl`).
    GetBucketAcl,
    /// A bucket root request without `list-type` (`GET /{bucket}/`).
    BrowseBucket,
    /// The GetObject operation.
    GetObject,
    /// The HeadObject operation.
    HeadObject,
}

impl S3Operation {
    /// Returns the AWS operation name string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ListBuckets => "ListBuckets",
            Self::ListObjectsV2 => "ListObjectsV2",
            Self::GetBucketAcl => "GetBucketAcl",
            Self::BrowseBucket => "BrowseBucket",
            Self::GetObject => "GetObject",
            Self::HeadObject => "HeadObject",
        }
    }

    /// Parse an operation name string into an S3Operation.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ListBuckets" => Some(Self::ListBuckets),
            "ListObjectsV2" => Some(Self::ListObjectsV2),
            "GetBucketAcl" => Some(Self::GetBucketAcl),
            "BrowseBucket" => Some(Self::BrowseBucket),
            "GetObject" => Some(Self::GetObject),
            "HeadObject" => Some(Self::HeadObject),
            _ => None,
        }
    }

    /// Whether the operation addresses an object rather than a bucket.
    #[must_use]
    pub fn is_object_level(&self) -> bool {
        matches!(self, Self::GetObject | Self::HeadObject)
    }
}

impl std::fmt::Display for S3Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
