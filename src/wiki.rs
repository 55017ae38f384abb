//! Page retrieval from a MediaWiki installation.
//!
//! The extraction pipeline never talks HTTP directly. It asks a
//! [`PageSource`] for a page's parse tree, the list page's HTML, an image's
//! download URL and raw bytes. [`MediaWikiClient`] is the production
//! implementation against `api.php`; tests plug in an in-memory source.

use crate::config::SheetConfig;
use crate::error::{FetchError, SheetError};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

/// A fetched page: its canonical title and its XML parse tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedPage {
    pub title: String,
    pub parse_tree: String,
}

/// Everything the pipeline needs from the wiki.
///
/// Object-safe so a run can hold an `Arc<dyn PageSource>`; implementations
/// must be `Send + Sync` because pages are fetched concurrently.
pub trait PageSource: Send + Sync {
    /// Fetch the XML parse tree of `identifier`.
    fn fetch_parse_tree<'a>(
        &'a self,
        identifier: &'a str,
    ) -> BoxFuture<'a, Result<ParsedPage, FetchError>>;

    /// Fetch the rendered HTML of `page` (used for outline discovery).
    fn fetch_list_html<'a>(&'a self, page: &'a str) -> BoxFuture<'a, Result<String, FetchError>>;

    /// Resolve a file name (without `File:` prefix) to its download URL.
    fn image_url<'a>(&'a self, filename: &'a str) -> BoxFuture<'a, Result<String, FetchError>>;

    /// Download raw bytes.
    fn fetch_bytes<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Vec<u8>, FetchError>>;
}

// ── API envelopes ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ParseEnvelope {
    parse: Option<ParseBody>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ParseBody {
    title: String,
    #[serde(default)]
    text: HashMap<String, String>,
    #[serde(default)]
    parsetree: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    #[serde(default)]
    info: String,
}

#[derive(Debug, Deserialize)]
struct QueryEnvelope {
    query: Option<QueryBody>,
}

#[derive(Debug, Deserialize)]
struct QueryBody {
    #[serde(default)]
    pages: HashMap<String, QueryPage>,
}

#[derive(Debug, Deserialize)]
struct QueryPage {
    #[serde(default)]
    imageinfo: Vec<ImageInfo>,
}

#[derive(Debug, Deserialize)]
struct ImageInfo {
    url: String,
}

/// `api.php`-backed [`PageSource`].
#[derive(Debug, Clone)]
pub struct MediaWikiClient {
    client: reqwest::Client,
    api_url: String,
    timeout_secs: u64,
}

impl MediaWikiClient {
    pub fn new(
        api_url: impl Into<String>,
        timeout_secs: u64,
        user_agent: &str,
    ) -> Result<Self, SheetError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(user_agent)
            .build()
            .map_err(|e| SheetError::Internal(format!("HTTP client: {}", e)))?;
        Ok(Self {
            client,
            api_url: api_url.into(),
            timeout_secs,
        })
    }

    pub fn from_config(config: &SheetConfig) -> Result<Self, SheetError> {
        Self::new(
            config.api_url.clone(),
            config.request_timeout_secs,
            &config.user_agent,
        )
    }

    async fn parse(&self, page: &str, prop: &str) -> Result<ParseBody, FetchError> {
        info!("Requesting wiki page: {}", page);
        let request = self.client.get(&self.api_url).query(&[
            ("action", "parse"),
            ("format", "json"),
            ("prop", prop),
            ("page", page),
        ]);
        let response = self.send(page, request).await?;
        let body = self.text(page, response).await?;
        decode_parse(page, &body)
    }

    async fn send(
        &self,
        page: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, FetchError> {
        let response = request.send().await.map_err(|e| self.transport_error(page, e))?;
        let status = response.status().as_u16();
        if status >= 300 {
            return Err(FetchError::Http {
                page: page.to_string(),
                status,
            });
        }
        Ok(response)
    }

    fn transport_error(&self, page: &str, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout {
                page: page.to_string(),
                secs: self.timeout_secs,
            }
        } else {
            FetchError::Network {
                page: page.to_string(),
                reason: e.to_string(),
            }
        }
    }

    async fn text(&self, page: &str, response: reqwest::Response) -> Result<String, FetchError> {
        response.text().await.map_err(|e| self.transport_error(page, e))
    }
}

impl PageSource for MediaWikiClient {
    fn fetch_parse_tree<'a>(
        &'a self,
        identifier: &'a str,
    ) -> BoxFuture<'a, Result<ParsedPage, FetchError>> {
        async move {
            let body = self.parse(identifier, "parsetree").await?;
            let parse_tree = body.parsetree.get("*").cloned().ok_or_else(|| FetchError::Decode {
                page: identifier.to_string(),
                reason: "response has no parse tree".into(),
            })?;
            Ok(ParsedPage {
                title: body.title,
                parse_tree,
            })
        }
        .boxed()
    }

    fn fetch_list_html<'a>(&'a self, page: &'a str) -> BoxFuture<'a, Result<String, FetchError>> {
        async move {
            let body = self.parse(page, "text").await?;
            body.text.get("*").cloned().ok_or_else(|| FetchError::Decode {
                page: page.to_string(),
                reason: "response has no parsed text".into(),
            })
        }
        .boxed()
    }

    fn image_url<'a>(&'a self, filename: &'a str) -> BoxFuture<'a, Result<String, FetchError>> {
        async move {
            info!("Requesting wiki image: {}", filename);
            let title = format!("File:{}", filename);
            let request = self.client.get(&self.api_url).query(&[
                ("action", "query"),
                ("format", "json"),
                ("prop", "imageinfo"),
                ("iiprop", "url"),
                ("titles", title.as_str()),
            ]);
            let response = self.send(&title, request).await?;
            let body = self.text(&title, response).await?;
            decode_image_url(filename, &body)
        }
        .boxed()
    }

    fn fetch_bytes<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Vec<u8>, FetchError>> {
        async move {
            debug!("Downloading {}", url);
            let response = self.send(url, self.client.get(url)).await?;
            let bytes = response
                .bytes()
                .await
                .map_err(|e| self.transport_error(url, e))?;
            Ok(bytes.to_vec())
        }
        .boxed()
    }
}

/// Decode an `action=parse` response body.
fn decode_parse(page: &str, body: &str) -> Result<ParseBody, FetchError> {
    let envelope: ParseEnvelope = serde_json::from_str(body).map_err(|e| FetchError::Decode {
        page: page.to_string(),
        reason: e.to_string(),
    })?;

    if let Some(err) = envelope.error {
        return Err(if err.code == "missingtitle" {
            FetchError::NotFound {
                page: page.to_string(),
            }
        } else {
            FetchError::Decode {
                page: page.to_string(),
                reason: format!("{}: {}", err.code, err.info),
            }
        });
    }

    envelope.parse.ok_or_else(|| FetchError::Decode {
        page: page.to_string(),
        reason: "response has no parse section".into(),
    })
}

/// Decode an `action=query&prop=imageinfo` response body.
fn decode_image_url(filename: &str, body: &str) -> Result<String, FetchError> {
    let page = format!("File:{}", filename);
    let envelope: QueryEnvelope = serde_json::from_str(body).map_err(|e| FetchError::Decode {
        page: page.clone(),
        reason: e.to_string(),
    })?;

    envelope
        .query
        .and_then(|q| {
            q.pages
                .into_values()
                .find_map(|p| p.imageinfo.into_iter().next())
        })
        .map(|info| info.url)
        .ok_or(FetchError::NotFound { page })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_parse_tree_response() {
        let body = r#"{"parse":{"title":"Beta distribution","pageid":1,
            "parsetree":{"*":"<root><template/></root>"}}}"#;
        let parsed = decode_parse("Beta_distribution", body).unwrap();
        assert_eq!(parsed.title, "Beta distribution");
        assert_eq!(parsed.parsetree["*"], "<root><template/></root>");
        assert!(parsed.text.is_empty());
    }

    #[test]
    fn decode_missing_title_is_not_found() {
        let body = r#"{"error":{"code":"missingtitle","info":"The page you specified doesn't exist."}}"#;
        assert_eq!(
            decode_parse("Nope", body).unwrap_err(),
            FetchError::NotFound { page: "Nope".into() }
        );
    }

    #[test]
    fn decode_other_api_error() {
        let body = r#"{"error":{"code":"invalidtitle","info":"Bad title"}}"#;
        match decode_parse("[x]", body).unwrap_err() {
            FetchError::Decode { reason, .. } => assert_eq!(reason, "invalidtitle: Bad title"),
            other => panic!("unexpected: {other}"),
        }
    }

    #[test]
    fn decode_garbage_is_decode_error() {
        assert!(matches!(
            decode_parse("x", "<html>").unwrap_err(),
            FetchError::Decode { .. }
        ));
    }

    #[test]
    fn decode_image_url_response() {
        let body = r#"{"batchcomplete":"","query":{"pages":{"-1":{"ns":6,"title":"File:Beta.svg",
            "imageinfo":[{"url":"https://upload.wikimedia.org/wikipedia/commons/f/f3/Beta.svg"}]}}}}"#;
        assert_eq!(
            decode_image_url("Beta.svg", body).unwrap(),
            "https://upload.wikimedia.org/wikipedia/commons/f/f3/Beta.svg"
        );
    }

    #[test]
    fn decode_image_without_info_is_not_found() {
        let body = r#"{"query":{"pages":{"-1":{"ns":6,"title":"File:Gone.svg","missing":""}}}}"#;
        assert_eq!(
            decode_image_url("Gone.svg", body).unwrap_err(),
            FetchError::NotFound { page: "File:Gone.svg".into() }
        );
    }

    #[test]
    fn client_builds_from_default_config() {
        let config = SheetConfig::default();
        let client = MediaWikiClient::from_config(&config).unwrap();
        assert_eq!(client.api_url, "https://en.wikipedia.org/w/api.php");
        assert_eq!(client.timeout_secs, 30);
    }
}
