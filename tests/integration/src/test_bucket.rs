//! Bucket-level integration tests.

#[cfg(test)]
mod tests {
    use aws_sdk_s3::types::{Permission, Type};

    use crate::{endpoint_url, http_client, s3_client, test_bucket};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_list_configured_target_as_bucket() {
        let client = s3_client();

        let resp = client.list_buckets().send().await.expect("list_buckets");

        let bucket = test_bucket();
        assert!(
            resp.buckets()
                .iter()
                .any(|b| b.name() == Some(bucket.as_str())),
            "{bucket} missing from listing"
        );
        let owner = resp.owner().expect("owner");
        assert_eq!(owner.id(), Some("1"));
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_get_public_read_acl() {
        let client = s3_client();

        let resp = client
            .get_bucket_acl()
            .bucket(test_bucket())
            .send()
            .await
            .expect("get_bucket_acl");

        let grants = resp.grants();
        assert!(
            grants
                .iter()
                .any(|g| g.permission() == Some(&Permission::FullControl))
        );
        assert!(grants.iter().any(|g| {
            g.permission() == Some(&Permission::Read)
                && g.grantee().map(|e| e.r#type()) == Some(&Type::Group)
        }));
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_resolve_bucket_names_case_insensitively() {
        let resp = http_client()
            .get(format!(
                "{}/{}?list-type=2&max-keys=1",
                endpoint_url(),
                test_bucket().to_ascii_uppercase()
            ))
            .send()
            .await
            .expect("request");

        assert_eq!(resp.status(), reqwest::StatusCode::OK);
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_not_browse_bucket_root_without_list_type() {
        let resp = http_client()
            .get(format!("{}/{}/", endpoint_url(), test_bucket()))
            .send()
            .await
            .expect("request");

        assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
        let body = resp.text().await.expect("body");
        assert!(body.contains("<Code>NoSuchBucket</Code>"));
    }
}
