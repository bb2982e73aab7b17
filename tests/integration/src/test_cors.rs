//! CORS, health and robots integration tests.

#[cfg(test)]
mod tests {
    use crate::{endpoint_url, http_client, test_bucket};

    fn header(resp: &reqwest::Response, name: &str) -> Option<String> {
        resp.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToOwned::to_owned)
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_answer_cors_preflight() {
        let resp = http_client()
            .request(
                reqwest::Method::OPTIONS,
                format!("{}/{}/any", endpoint_url(), test_bucket()),
            )
            .header("Origin", "https://example.com")
            .header("Access-Control-Request-Method", "GET")
            .header("Access-Control-Request-Headers", "range")
            .send()
            .await
            .expect("preflight");

        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        assert_eq!(
            header(&resp, "Access-Control-Allow-Origin").as_deref(),
            Some("*")
        );
        assert_eq!(
            header(&resp, "Access-Control-Allow-Methods").as_deref(),
            Some("GET, HEAD")
        );
        assert_eq!(
            header(&resp, "Access-Control-Allow-Headers").as_deref(),
            Some("range")
        );
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_expose_headers_on_every_response() {
        let resp = http_client()
            .get(format!("{}/", endpoint_url()))
            .header("Origin", "https://example.com")
            .send()
            .await
            .expect("request");

        assert_eq!(
            header(&resp, "Access-Control-Allow-Origin").as_deref(),
            Some("*")
        );
        let exposed = header(&resp, "Access-Control-Expose-Headers").expect("expose headers");
        assert!(exposed.contains("Content-Range"));
        assert_eq!(header(&resp, "Server").as_deref(), Some("s3gate"));
        assert_eq!(
            header(&resp, "x-amz-request-id"),
            header(&resp, "x-amz-id-2")
        );
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_report_health() {
        let resp = http_client()
            .get(format!("{}/health", endpoint_url()))
            .send()
            .await
            .expect("health");

        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let body: serde_json::Value = resp.json().await.expect("json");
        assert_eq!(body["status"], "running");
        assert_eq!(body["service"], "s3gate");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_disallow_crawlers() {
        let resp = http_client()
            .get(format!("{}/robots.txt", endpoint_url()))
            .send()
            .await
            .expect("robots");

        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        assert_eq!(
            resp.text().await.expect("body"),
            "User-agent: *\nDisallow: /\n"
        );
    }
}
