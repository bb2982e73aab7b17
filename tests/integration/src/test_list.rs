//! List objects integration tests.

#[cfg(test)]
mod tests {
    use crate::{Fixture, endpoint_url, http_client, s3_client, test_bucket};

    fn photos(name: &str) -> Fixture {
        Fixture::new(
            name,
            &[
                ("photos/2024/jan/img1.jpg", "x"),
                ("photos/2024/jan/img2.jpg", "x"),
                ("photos/2024/feb/img3.jpg", "x"),
                ("photos/2025/mar/img4.jpg", "x"),
                ("documents/report.pdf", "x"),
                ("documents/readme.txt", "x"),
                ("root.txt", "x"),
            ],
        )
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_list_objects_v2_under_prefix() {
        let fixture = photos("listv2");
        let client = s3_client();

        let resp = client
            .list_objects_v2()
            .bucket(test_bucket())
            .prefix(&fixture.prefix)
            .send()
            .await
            .expect("list_objects_v2");

        assert_eq!(resp.key_count(), Some(7));
        let keys: Vec<_> = resp.contents().iter().filter_map(|o| o.key()).collect();
        let mut sorted = keys.clone();
        sorted.sort_unstable();
        assert_eq!(keys, sorted, "keys must be in lexicographic order");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_list_with_delimiter() {
        let fixture = photos("delim");
        let client = s3_client();

        let resp = client
            .list_objects_v2()
            .bucket(test_bucket())
            .prefix(&fixture.prefix)
            .delimiter("/")
            .send()
            .await
            .expect("list with delimiter");

        let prefixes: Vec<_> = resp
            .common_prefixes()
            .iter()
            .filter_map(|p| p.prefix())
            .collect();
        assert_eq!(
            prefixes,
            vec![
                fixture.key("documents/").as_str(),
                fixture.key("photos/").as_str()
            ]
        );
        let keys: Vec<_> = resp.contents().iter().filter_map(|o| o.key()).collect();
        assert_eq!(keys, vec![fixture.key("root.txt").as_str()]);
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_paginate_with_continuation_token() {
        let fixture = photos("paginate");
        let client = s3_client();

        let mut seen = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let mut req = client
                .list_objects_v2()
                .bucket(test_bucket())
                .prefix(&fixture.prefix)
                .max_keys(2);
            if let Some(t) = token.take() {
                req = req.continuation_token(t);
            }
            let resp = req.send().await.expect("list page");
            assert!(resp.key_count().unwrap_or_default() <= 2);
            seen.extend(
                resp.contents()
                    .iter()
                    .filter_map(|o| o.key().map(ToOwned::to_owned)),
            );
            if resp.is_truncated() == Some(true) {
                token = resp.next_continuation_token().map(ToOwned::to_owned);
                assert!(token.is_some(), "truncated page must carry a token");
            } else {
                break;
            }
        }

        assert_eq!(seen.len(), 7);
        let mut deduped = seen.clone();
        deduped.dedup();
        assert_eq!(seen, deduped, "pages must not repeat keys");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_start_after_key() {
        let fixture = photos("startafter");
        let client = s3_client();

        let resp = client
            .list_objects_v2()
            .bucket(test_bucket())
            .prefix(&fixture.prefix)
            .start_after(fixture.key("photos/2024/jan/img1.jpg"))
            .send()
            .await
            .expect("list with start-after");

        let keys: Vec<_> = resp.contents().iter().filter_map(|o| o.key()).collect();
        assert_eq!(
            keys,
            vec![
                fixture.key("photos/2024/jan/img2.jpg").as_str(),
                fixture.key("photos/2025/mar/img4.jpg").as_str(),
                fixture.key("root.txt").as_str(),
            ]
        );
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_return_empty_page_for_zero_max_keys() {
        let fixture = photos("zero");
        let client = s3_client();

        let resp = client
            .list_objects_v2()
            .bucket(test_bucket())
            .prefix(&fixture.prefix)
            .max_keys(0)
            .send()
            .await
            .expect("list with max-keys=0");

        assert_eq!(resp.key_count(), Some(0));
        assert_eq!(resp.is_truncated(), Some(false));
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_url_encode_keys_when_requested() {
        let fixture = Fixture::new("encode", &[("with space.txt", "x")]);

        let resp = http_client()
            .get(format!(
                "{}/{}?list-type=2&encoding-type=url&prefix={}",
                endpoint_url(),
                test_bucket(),
                fixture.prefix
            ))
            .send()
            .await
            .expect("request");

        let body = resp.text().await.expect("body");
        assert!(body.contains("<EncodingType>url</EncodingType>"));
        assert!(body.contains("with+space.txt"));
    }
}
