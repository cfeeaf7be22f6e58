use crate::{content_segments, ContentError, ContentProvider, DeliveryRoute};
use async_trait::async_trait;
use bytes::Bytes;
use doc_model::{DirectoryListing, FileEntry};
use reqwest::{Client, StatusCode, Url};

/// Content tree served over HTTP.
///
/// Listings come from `GET {origin}/api/files?path=<dir>`. Files are served
/// statically under `{origin}/content/<path>`; the alternate route uses
/// `{mirror}/content/<path>` when a mirror is configured and the origin's
/// `GET /api/files/content?path=<path>` endpoint otherwise.
#[derive(Debug, Clone)]
pub struct HttpContentSource {
    client: Client,
    origin: Url,
    mirror: Option<Url>,
}

impl HttpContentSource {
    pub fn new(origin: Url) -> Self {
        Self { client: Client::new(), origin, mirror: None }
    }

    pub fn with_mirror(mut self, mirror: Url) -> Self {
        self.mirror = Some(mirror);
        self
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, ContentError> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|_| ContentError::Unsupported(base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn listing_url(&self, path: &str) -> Result<Url, ContentError> {
        let mut url = Self::endpoint(&self.origin, &["api", "files"])?;
        url.query_pairs_mut().append_pair("path", path);
        Ok(url)
    }

    fn content_url(&self, path: &str, route: DeliveryRoute) -> Result<Url, ContentError> {
        let segments = content_segments(path)?;
        let mut static_path = vec!["content"];
        static_path.extend_from_slice(&segments);

        match (route, &self.mirror) {
            (DeliveryRoute::Primary, _) => Self::endpoint(&self.origin, &static_path),
            (DeliveryRoute::Alternate, Some(mirror)) => Self::endpoint(mirror, &static_path),
            (DeliveryRoute::Alternate, None) => {
                let mut url = Self::endpoint(&self.origin, &["api", "files", "content"])?;
                url.query_pairs_mut().append_pair("path", &segments.join("/"));
                Ok(url)
            }
        }
    }

    async fn get(&self, url: Url, path: &str) -> Result<Bytes, ContentError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| ContentError::Http { url: url.to_string(), source })?;

        match response.status() {
            status if status.is_success() => response
                .bytes()
                .await
                .map_err(|source| ContentError::Http { url: url.to_string(), source }),
            StatusCode::NOT_FOUND => Err(ContentError::NotFound(path.to_owned())),
            StatusCode::BAD_REQUEST => Err(ContentError::NotADirectory(path.to_owned())),
            status => Err(ContentError::Status { url: url.to_string(), status: status.as_u16() }),
        }
    }
}

#[async_trait]
impl ContentProvider for HttpContentSource {
    async fn list_directory(&self, path: &str) -> Result<DirectoryListing, ContentError> {
        let relative = content_segments(path)?.join("/");
        let url = self.listing_url(&relative)?;

        let body = self.get(url, &relative).await?;
        let entries: Vec<FileEntry> = serde_json::from_slice(&body)
            .map_err(|source| ContentError::Listing { path: relative.clone(), source })?;

        tracing::debug!(dir = %relative, entries = entries.len(), "remote directory listed");
        Ok(DirectoryListing::new(relative, entries))
    }

    async fn fetch(&self, path: &str, route: DeliveryRoute) -> Result<Bytes, ContentError> {
        let url = self.content_url(path, route)?;
        tracing::debug!(%url, ?route, "fetching content");

        self.get(url, path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves one canned response per connection and reports each request line.
    async fn serve(
        responses: Vec<(u16, &'static str)>,
    ) -> (Url, tokio::sync::mpsc::UnboundedReceiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind should succeed");
        let addr = listener.local_addr().expect("local addr");
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

        tokio::spawn(async move {
            for (status, body) in responses {
                let Ok((mut socket, _)) = listener.accept().await else { return };
                let mut buf = vec![0u8; 4096];
                let read = socket.read(&mut buf).await.unwrap_or(0);
                let request = String::from_utf8_lossy(&buf[..read]);
                let _ = tx.send(request.lines().next().unwrap_or_default().to_owned());

                let response = format!(
                    "HTTP/1.1 {status} X\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });

        (Url::parse(&format!("http://{addr}/")).expect("valid url"), rx)
    }

    #[tokio::test]
    async fn lists_remote_directory() {
        let body = r#"[{"name":"a.mp3","path":"book/a.mp3","isDirectory":false,"type":"mp3"}]"#;
        let (origin, mut requests) = serve(vec![(200, body)]).await;

        let source = HttpContentSource::new(origin);
        let listing = source.list_directory("book").await.expect("listing should load");

        assert_eq!(listing.path, "book");
        assert_eq!(listing.audio_entries().count(), 1);
        assert_eq!(requests.recv().await.as_deref(), Some("GET /api/files?path=book HTTP/1.1"));
    }

    #[tokio::test]
    async fn listing_without_directory_flags_still_decodes() {
        let body = r#"[
            {"name":"unit1","path":"book/unit1","type":"directory"},
            {"name":"a.pdf","path":"book/a.pdf","type":"pdf","extension":"pdf"}
        ]"#;
        let (origin, _requests) = serve(vec![(200, body)]).await;

        let listing =
            HttpContentSource::new(origin).list_directory("book").await.expect("listing");

        assert!(listing.entries[0].is_directory());
        assert!(matches!(listing.entries[1], FileEntry::Pdf { .. }));
    }

    #[tokio::test]
    async fn maps_status_codes_to_provider_errors() {
        let (origin, _requests) = serve(vec![(404, "{}"), (400, "{}"), (500, "")]).await;
        let source = HttpContentSource::new(origin);

        let missing = source.list_directory("nope").await.expect_err("404");
        assert!(matches!(missing, ContentError::NotFound(_)));

        let file = source.list_directory("a.pdf").await.expect_err("400");
        assert!(matches!(file, ContentError::NotADirectory(_)));

        let broken = source.list_directory("x").await.expect_err("500");
        assert!(matches!(broken, ContentError::Status { status: 500, .. }));
        assert!(broken.is_transient());
    }

    #[tokio::test]
    async fn unknown_entry_type_is_a_listing_error() {
        let body = r#"[{"name":"a.wav","path":"a.wav","isDirectory":false,"type":"wav"}]"#;
        let (origin, _requests) = serve(vec![(200, body)]).await;

        let err = HttpContentSource::new(origin).list_directory("").await.expect_err("bad type");
        assert!(matches!(err, ContentError::Listing { .. }));
    }

    #[tokio::test]
    async fn fetch_routes_use_static_path_then_api() {
        let (origin, mut requests) = serve(vec![(200, "%PDF"), (200, "%PDF")]).await;
        let source = HttpContentSource::new(origin);

        let primary = source.fetch("book/unit 1.pdf", DeliveryRoute::Primary).await.expect("ok");
        let alternate = source.fetch("book/unit 1.pdf", DeliveryRoute::Alternate).await.expect("ok");

        assert_eq!(&primary[..], b"%PDF");
        assert_eq!(&alternate[..], b"%PDF");
        assert_eq!(
            requests.recv().await.as_deref(),
            Some("GET /content/book/unit%201.pdf HTTP/1.1")
        );
        assert_eq!(
            requests.recv().await.as_deref(),
            Some("GET /api/files/content?path=book%2Funit+1.pdf HTTP/1.1")
        );
    }

    #[test]
    fn alternate_route_prefers_mirror() {
        let source = HttpContentSource::new(Url::parse("http://origin.test/").expect("url"))
            .with_mirror(Url::parse("http://mirror.test/base/").expect("url"));

        let url = source.content_url("a.pdf", DeliveryRoute::Alternate).expect("url");
        assert_eq!(url.as_str(), "http://mirror.test/base/content/a.pdf");
    }

    #[test]
    fn cannot_be_a_base_origin_is_unsupported() {
        let source = HttpContentSource::new(Url::parse("mailto:someone@example.com").expect("url"));
        let err = source.content_url("a.pdf", DeliveryRoute::Primary).expect_err("unsupported");
        assert!(matches!(err, ContentError::Unsupported(_)));
    }
}
