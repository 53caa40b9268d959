#[cfg(test)]
mod tests {
    use crate::config::FetchConfig;
    use crate::error::FetchError;
    use crate::tools::fetch::{HttpFetcher, PageFetcher};
    use crate::types::{parse_date, Occupancy, SearchParams};
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    type Seen = Arc<Mutex<Vec<String>>>;

    /// Serve canned `(status, body)` responses in order; the last one repeats.
    /// Returns the base URL and the raw requests received.
    async fn serve(responses: Vec<(u16, &'static str)>) -> (String, Seen) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);

        tokio::spawn(async move {
            let mut idx = 0usize;
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                }
                log.lock().unwrap().push(String::from_utf8_lossy(&buf).into_owned());

                let (status, body) = responses[idx.min(responses.len() - 1)];
                idx += 1;
                let reply = format!(
                    "HTTP/1.1 {status} X\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(reply.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{addr}"), seen)
    }

    fn quick_config() -> FetchConfig {
        FetchConfig {
            timeout_secs: 5,
            resolve_short_urls: false,
            pre_request_delay_ms: 0,
            jitter_ms: 0,
            max_retries: 2,
            backoff_base_ms: 1,
            backoff_max_ms: 5,
            ..FetchConfig::default()
        }
    }

    fn params() -> SearchParams {
        SearchParams::new(
            parse_date("2025-12-25").unwrap(),
            parse_date("2025-12-27").unwrap(),
            Occupancy::new(3).unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn fetches_dated_search_with_browser_headers() {
        let (base, seen) = serve(vec![(200, "<html><body>Book now</body></html>")]).await;
        let fetcher = HttpFetcher::new(quick_config()).unwrap();

        let page = fetcher
            .fetch(&format!("{base}/plans/7?lang=ja"), &params())
            .await
            .unwrap();

        assert_eq!(page.status, 200);
        assert!(page.body.contains("Book now"));

        let requests = seen.lock().unwrap();
        let first = requests[0].to_ascii_lowercase();
        assert!(first.starts_with(
            "get /plans/7?lang=ja&checkin=2025-12-25&checkout=2025-12-27&adults=3 http/1.1"
        ));
        assert!(first.contains("user-agent: mozilla/5.0"));
        assert!(first.contains("accept-language: ja,"));
        assert!(first.contains(&format!("referer: {}/", base.to_ascii_lowercase())));
    }

    #[tokio::test]
    async fn short_body_is_content_not_error() {
        let (base, _) = serve(vec![(200, "tiny")]).await;
        let fetcher = HttpFetcher::new(quick_config()).unwrap();
        let page = fetcher.fetch(&base, &params()).await.unwrap();
        assert_eq!(page.body, "tiny");
    }

    #[tokio::test]
    async fn retries_server_errors() {
        let (base, seen) = serve(vec![(503, "busy"), (200, "<html>ok</html>")]).await;
        let fetcher = HttpFetcher::new(quick_config()).unwrap();
        let page = fetcher.fetch(&base, &params()).await.unwrap();
        assert_eq!(page.body, "<html>ok</html>");
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let (base, seen) = serve(vec![(404, "missing")]).await;
        let fetcher = HttpFetcher::new(quick_config()).unwrap();
        let err = fetcher.fetch(&base, &params()).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { code: 404, .. }));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let (base, seen) = serve(vec![(500, "boom")]).await;
        let fetcher = HttpFetcher::new(quick_config()).unwrap();
        let err = fetcher.fetch(&base, &params()).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { code: 500, .. }));
        assert_eq!(seen.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let fetcher = HttpFetcher::new(FetchConfig {
            timeout_secs: 1,
            max_retries: 0,
            ..quick_config()
        })
        .unwrap();
        let err = fetcher
            .fetch(&format!("http://{addr}/"), &params())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Timeout { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn unresolvable_short_url_falls_back_to_original() {
        let fetcher = HttpFetcher::new(FetchConfig {
            resolve_timeout_secs: 2,
            ..quick_config()
        })
        .unwrap();
        let url = "http://127.0.0.1:1/s/abc";
        assert_eq!(fetcher.resolve_url(url).await, url);
    }
}
