//! Object read integration tests.

#[cfg(test)]
mod tests {
    use crate::{Fixture, http_client, s3_client, test_bucket};

    const BODY: &str = "0123456789abcdefghij";

    fn fixture(name: &str) -> Fixture {
        Fixture::new(
            name,
            &[
                ("data.txt", BODY),
                ("config.yaml", "a: 1\n"),
                ("blob.unknownext", "raw"),
            ],
        )
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_get_whole_object() {
        let fixture = fixture("get");
        let client = s3_client();

        let resp = client
            .get_object()
            .bucket(test_bucket())
            .key(fixture.key("data.txt"))
            .send()
            .await
            .expect("get_object");

        assert_eq!(resp.content_length(), Some(20));
        assert_eq!(resp.content_type(), Some("text/plain"));
        assert!(resp.e_tag().is_some_and(|e| e.starts_with('"')));
        let bytes = resp.body.collect().await.expect("body").into_bytes();
        assert_eq!(bytes.as_ref(), BODY.as_bytes());
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_get_byte_range() {
        let fixture = fixture("range");
        let client = s3_client();

        let resp = client
            .get_object()
            .bucket(test_bucket())
            .key(fixture.key("data.txt"))
            .range("bytes=5-9")
            .send()
            .await
            .expect("ranged get_object");

        assert_eq!(resp.content_range(), Some("bytes 5-9/20"));
        assert_eq!(resp.content_length(), Some(5));
        let bytes = resp.body.collect().await.expect("body").into_bytes();
        assert_eq!(bytes.as_ref(), b"56789");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_get_suffix_range() {
        let fixture = fixture("suffix");

        let resp = http_client()
            .get(fixture.url("data.txt"))
            .header("Range", "bytes=-4")
            .send()
            .await
            .expect("request");

        assert_eq!(resp.status(), reqwest::StatusCode::PARTIAL_CONTENT);
        assert_eq!(resp.text().await.expect("body"), "ghij");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_unsatisfiable_range() {
        let fixture = fixture("badrange");

        let resp = http_client()
            .get(fixture.url("data.txt"))
            .header("Range", "bytes=100-200")
            .send()
            .await
            .expect("request");

        assert_eq!(resp.status(), reqwest::StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(
            resp.headers()
                .get("Content-Range")
                .and_then(|v| v.to_str().ok()),
            Some("bytes */20")
        );
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_head_object_like_get() {
        let fixture = fixture("head");
        let client = s3_client();

        let head = client
            .head_object()
            .bucket(test_bucket())
            .key(fixture.key("data.txt"))
            .send()
            .await
            .expect("head_object");
        let get = client
            .get_object()
            .bucket(test_bucket())
            .key(fixture.key("data.txt"))
            .send()
            .await
            .expect("get_object");

        assert_eq!(head.content_length(), get.content_length());
        assert_eq!(head.e_tag(), get.e_tag());
        assert_eq!(head.last_modified(), get.last_modified());
        assert_eq!(head.accept_ranges(), Some("bytes"));
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_guess_yaml_content_type() {
        let fixture = fixture("yaml");

        let resp = http_client()
            .head(fixture.url("config.yaml"))
            .send()
            .await
            .expect("request");

        assert_eq!(
            resp.headers()
                .get("Content-Type")
                .and_then(|v| v.to_str().ok()),
            Some("text/plain+yaml")
        );
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_attach_unknown_content_types() {
        let fixture = fixture("attach");

        let resp = http_client()
            .get(fixture.url("blob.unknownext"))
            .send()
            .await
            .expect("request");

        let headers = resp.headers();
        assert_eq!(
            headers.get("Content-Type").and_then(|v| v.to_str().ok()),
            Some("application/octet-stream")
        );
        assert_eq!(
            headers
                .get("Content-Disposition")
                .and_then(|v| v.to_str().ok()),
            Some("attachment; filename=\"blob.unknownext\"")
        );
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_return_no_such_key_for_missing_object() {
        let fixture = fixture("missing");
        let client = s3_client();

        let err = client
            .get_object()
            .bucket(test_bucket())
            .key(fixture.key("nope.txt"))
            .send()
            .await
            .expect_err("missing key");

        let service_err = err.into_service_error();
        assert!(service_err.is_no_such_key());
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_treat_directory_as_missing_key() {
        let fixture = Fixture::new("dir", &[("sub/file.txt", "x")]);

        let resp = http_client()
            .get(fixture.url("sub"))
            .send()
            .await
            .expect("request");

        assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
        assert!(
            resp.text()
                .await
                .expect("body")
                .contains("<Code>NoSuchKey</Code>")
        );
    }
}
