//! Bucket-level handlers: `list_buckets` and `get_bucket_acl`.

use s3gate_model::S3Error;
use s3gate_model::input::{GetBucketAclInput, ListBucketsInput};
use s3gate_model::output::{GetBucketAclOutput, ListBucketsOutput};
use s3gate_model::types::{Bucket, Grant, Grantee, GranteeType, Owner, Permission};
use tracing::debug;

use crate::provider::{OWNER_DISPLAY_NAME, OWNER_ID, S3Gateway};

/// Group URI granted public read on every bucket.
pub const ALL_USERS_URI: &str = "http://acs.amazonaws.com/groups/global/AllUsers";

pub(super) fn gateway_owner() -> Owner {
    Owner {
        display_name: Some(OWNER_DISPLAY_NAME.to_owned()),
        id: Some(OWNER_ID.to_owned()),
    }
}

#[allow(clippy::unused_async)]
impl S3Gateway {
    /// List browseable targets as buckets, in configured order.
    pub async fn handle_list_buckets(
        &self,
        _input: ListBucketsInput,
    ) -> Result<ListBucketsOutput, S3Error> {
        let registry = self.registry.current();
        let created = registry.created_at();
        let buckets: Vec<Bucket> = registry
            .list_browseable()
            .iter()
            .map(|target| Bucket {
                creation_date: Some(created),
                name: Some(target.name.clone()),
            })
            .collect();

        debug!(count = buckets.len(), "list_buckets completed");

        Ok(ListBucketsOutput {
            buckets,
            owner: Some(gateway_owner()),
        })
    }

    /// Fixed ACL: the owner has full control and everyone may read.
    ///
    /// Only the target name is checked; an unavailable target still answers.
    pub async fn handle_get_bucket_acl(
        &self,
        input: GetBucketAclInput,
    ) -> Result<GetBucketAclOutput, S3Error> {
        let registry = self.registry.current();
        if registry.get(&input.bucket).is_none() {
            return Err(S3Error::no_such_bucket(input.bucket));
        }

        let owner = gateway_owner();
        let grants = vec![
            Grant {
                grantee: Some(Grantee {
                    display_name: owner.display_name.clone(),
                    id: owner.id.clone(),
                    r#type: GranteeType::CanonicalUser,
                    uri: None,
                }),
                permission: Some(Permission::FullControl),
            },
            Grant {
                grantee: Some(Grantee {
                    display_name: None,
                    id: None,
                    r#type: GranteeType::Group,
                    uri: Some(ALL_USERS_URI.to_owned()),
                }),
                permission: Some(Permission::Read),
            },
        ];

        debug!(bucket = %input.bucket, "get_bucket_acl completed");

        Ok(GetBucketAclOutput {
            grants,
            owner: Some(owner),
        })
    }
}
