//! Error response integration tests.

#[cfg(test)]
mod tests {
    use aws_sdk_s3::error::ProvideErrorMetadata;

    use crate::{Fixture, endpoint_url, http_client, s3_client, test_bucket};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_return_no_such_bucket() {
        let client = s3_client();

        let err = client
            .list_objects_v2()
            .bucket("no-such-target-configured")
            .send()
            .await
            .expect_err("unknown bucket");

        let code = err.into_service_error().meta().code().map(ToOwned::to_owned);
        assert_eq!(code.as_deref(), Some("NoSuchBucket"));
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_writes_with_405() {
        let fixture = Fixture::new("write", &[("a.txt", "x")]);

        for method in [
            reqwest::Method::PUT,
            reqwest::Method::POST,
            reqwest::Method::DELETE,
            reqwest::Method::PATCH,
        ] {
            let resp = http_client()
                .request(method.clone(), fixture.url("a.txt"))
                .body("overwrite")
                .send()
                .await
                .expect("request");

            assert_eq!(
                resp.status(),
                reqwest::StatusCode::METHOD_NOT_ALLOWED,
                "{method}"
            );
            assert_eq!(
                resp.headers().get("Allow").and_then(|v| v.to_str().ok()),
                Some("GET, HEAD, OPTIONS")
            );
        }

        let content = s3_client()
            .get_object()
            .bucket(test_bucket())
            .key(fixture.key("a.txt"))
            .send()
            .await
            .expect("get_object")
            .body
            .collect()
            .await
            .expect("body")
            .into_bytes();
        assert_eq!(content.as_ref(), b"x");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_list_type_one() {
        let resp = http_client()
            .get(format!("{}/{}?list-type=1", endpoint_url(), test_bucket()))
            .send()
            .await
            .expect("request");

        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
        let body = resp.text().await.expect("body");
        assert!(body.contains("<Code>InvalidArgument</Code>"));
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_non_numeric_max_keys() {
        let resp = http_client()
            .get(format!(
                "{}/{}?list-type=2&max-keys=many",
                endpoint_url(),
                test_bucket()
            ))
            .send()
            .await
            .expect("request");

        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_garbage_continuation_token() {
        let resp = http_client()
            .get(format!(
                "{}/{}?list-type=2&continuation-token=%40%40%40",
                endpoint_url(),
                test_bucket()
            ))
            .send()
            .await
            .expect("request");

        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_carry_request_id_in_error_body() {
        let resp = http_client()
            .get(format!("{}/no-such-target-configured/key", endpoint_url()))
            .send()
            .await
            .expect("request");

        let request_id = resp
            .headers()
            .get("x-amz-request-id")
            .and_then(|v| v.to_str().ok())
            .map(ToOwned::to_owned)
            .expect("request id header");
        let body = resp.text().await.expect("body");
        assert!(body.contains(&format!("<RequestId>{request_id}</RequestId>")));
    }
}
