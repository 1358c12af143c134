//! Dropbox files API client
//!
//! Thin wrapper over the `/2/files/*` HTTP endpoints. Every operation is a
//! single POST, except [`DropboxClient::list_folder`] which keeps following
//! the cursor until the server reports no more pages.

use crate::config::{validate_config, ConfigFile, DEFAULT_API_URL, DEFAULT_CONTENT_URL};
use crate::error::{ApiResponse, Error, Result};
use crate::paths::ROOT;
use crate::types::{CreateFolderOutcome, LatestCursor, ListFolderResult, Metadata, MetadataEnvelope, UploadResult};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// Header carrying the JSON arguments of content endpoints
pub const API_ARG_HEADER: &str = "Dropbox-API-Arg";

/// Request timeout used when none is configured
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// URL of every endpoint the client calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub list_folder: String,
    pub list_folder_continue: String,
    pub get_latest_cursor: String,
    pub delete: String,
    pub create_folder: String,
    pub upload: String,
}

impl Endpoints {
    /// Build the endpoint table from the RPC and content base URLs
    pub fn new(api_url: &str, content_url: &str) -> Self {
        let api = api_url.trim_end_matches('/');
        let content = content_url.trim_end_matches('/');

        Self {
            list_folder: format!("{}/files/list_folder", api),
            list_folder_continue: format!("{}/files/list_folder/continue", api),
            get_latest_cursor: format!("{}/files/list_folder/get_latest_cursor", api),
            delete: format!("{}/files/delete_v2", api),
            create_folder: format!("{}/files/create_folder_v2", api),
            upload: format!("{}/files/upload", content),
        }
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL, DEFAULT_CONTENT_URL)
    }
}

/// Transport settings for a [`DropboxClient`]
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub endpoints: Endpoints,
    pub timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            endpoints: Endpoints::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ClientSettings {
    /// Settings described by a config file
    pub fn from_config(config: &ConfigFile) -> Self {
        Self {
            endpoints: Endpoints::new(&config.dropbox.api_url, &config.dropbox.content_url),
            timeout: Duration::from_secs(config.timeout_secs()),
        }
    }
}

#[derive(Serialize)]
struct PathArg<'a> {
    path: &'a str,
}

#[derive(Serialize)]
struct ListFolderArg<'a> {
    path: &'a str,
    recursive: bool,
}

#[derive(Serialize)]
struct CursorArg<'a> {
    cursor: &'a str,
}

#[derive(Serialize)]
struct UploadArg<'a> {
    path: &'a str,
    mode: &'static str,
}

/// Dropbox API client.
///
/// The token and base headers are fixed at construction; requests share no
/// state beyond them.
pub struct DropboxClient {
    access_token: String,
    headers: HeaderMap,
    endpoints: Endpoints,
    http_client: Client,
}

impl std::fmt::Debug for DropboxClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DropboxClient")
            .field("access_token", &"<redacted>")
            .field("endpoints", &self.endpoints)
            .finish_non_exhaustive()
    }
}

impl DropboxClient {
    /// Create a client for the public Dropbox endpoints
    pub fn new(access_token: impl Into<String>) -> Result<Self> {
        Self::with_settings(access_token, &ClientSettings::default())
    }

    /// Create a client with explicit endpoints and timeout
    pub fn with_settings(access_token: impl Into<String>, settings: &ClientSettings) -> Result<Self> {
        let access_token = access_token.into();
        if access_token.trim().is_empty() {
            return Err(Error::InvalidInput("Access token cannot be empty".to_string()));
        }
        if settings.timeout.is_zero() {
            return Err(Error::InvalidInput("Request timeout must be greater than zero".to_string()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, bearer(&access_token)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http_client = Client::builder().timeout(settings.timeout).build()?;

        Ok(Self {
            access_token,
            headers,
            endpoints: settings.endpoints.clone(),
            http_client,
        })
    }

    /// Create a client from the token and settings of a config file.
    ///
    /// The file is validated first, so an out-of-range timeout or a
    /// malformed URL is rejected here rather than on the first request.
    pub fn from_config(config: &ConfigFile) -> Result<Self> {
        validate_config(config)?;

        let token = config.dropbox.access_token.clone().ok_or_else(|| {
            Error::Config("No access token configured (run 'dropkit init')".to_string())
        })?;

        Self::with_settings(token, &ClientSettings::from_config(config))
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Full recursive listing of `path`.
    ///
    /// With a `cursor`, `path` is ignored and listing resumes from that
    /// cursor. Pages are merged in the order they were fetched; the returned
    /// cursor is the one from the last page. If any page fails the entries
    /// gathered so far are dropped and the error is returned.
    pub async fn list_folder(&self, path: &str, cursor: Option<&str>) -> Result<ListFolderResult> {
        let mut page = match cursor {
            Some(cursor) => self.list_folder_continue(cursor).await?,
            None => self.list_folder_first(path).await?,
        };

        let mut entries = std::mem::take(&mut page.entries);
        let mut pages = 1;

        while page.has_more {
            page = self.list_folder_continue(&page.cursor).await?;
            entries.append(&mut page.entries);
            pages += 1;
        }

        debug!(path, pages, entries = entries.len(), "listing complete");

        Ok(ListFolderResult {
            entries,
            cursor: page.cursor,
            has_more: page.has_more,
        })
    }

    async fn list_folder_first(&self, path: &str) -> Result<ListFolderResult> {
        let arg = ListFolderArg { path, recursive: true };
        let response = self.post_json("list_folder", &self.endpoints.list_folder, &arg).await?;

        match response.status() {
            StatusCode::OK => decode(response).await,
            _ => Err(Error::Api(failure("list_folder", response).await)),
        }
    }

    async fn list_folder_continue(&self, cursor: &str) -> Result<ListFolderResult> {
        let arg = CursorArg { cursor };
        let response = self
            .post_json("list_folder/continue", &self.endpoints.list_folder_continue, &arg)
            .await?;

        match response.status() {
            StatusCode::OK => decode(response).await,
            _ => Err(Error::Api(failure("list_folder/continue", response).await)),
        }
    }

    /// Cursor for the current state of `path`, without listing it
    pub async fn get_latest_cursor(&self, path: &str) -> Result<String> {
        let arg = ListFolderArg { path, recursive: true };
        let response = self
            .post_json("get_latest_cursor", &self.endpoints.get_latest_cursor, &arg)
            .await?;

        match response.status() {
            StatusCode::OK => {
                let latest: LatestCursor = decode(response).await?;
                Ok(latest.cursor)
            }
            _ => Err(Error::Api(failure("get_latest_cursor", response).await)),
        }
    }

    /// Delete the file or folder at `path`, returning its last metadata
    pub async fn delete(&self, path: &str) -> Result<Metadata> {
        let response = self.post_json("delete", &self.endpoints.delete, &PathArg { path }).await?;

        match response.status() {
            StatusCode::OK => {
                let envelope: MetadataEnvelope = decode(response).await?;
                Ok(envelope.metadata)
            }
            _ => Err(Error::Api(failure("delete", response).await)),
        }
    }

    /// Create a folder at `path`.
    ///
    /// An existing folder (409) is reported, not raised: the decoded body
    /// comes back as [`CreateFolderOutcome::Conflict`].
    pub async fn create_folder(&self, path: &str) -> Result<CreateFolderOutcome> {
        let response = self
            .post_json("create_folder", &self.endpoints.create_folder, &PathArg { path })
            .await?;

        match response.status() {
            StatusCode::OK => {
                let envelope: MetadataEnvelope = decode(response).await?;
                Ok(CreateFolderOutcome::Created(envelope.metadata))
            }
            StatusCode::CONFLICT => {
                warn!(path, "DB_CONFLICT: folder already exists");
                let body = decode(response).await?;
                Ok(CreateFolderOutcome::Conflict(body))
            }
            _ => Err(Error::Api(failure("create_folder", response).await)),
        }
    }

    /// Upload a local file to `db_path` (the remote root when `None`),
    /// overwriting whatever is there.
    ///
    /// The file is read fully before any request is made, so a missing local
    /// file fails with [`Error::Io`] without touching the network.
    pub async fn upload_file(&self, local_path: &Path, db_path: Option<&str>) -> Result<UploadResult> {
        let data = tokio::fs::read(local_path).await?;
        self.upload_bytes(data, db_path.unwrap_or(ROOT)).await
    }

    /// Upload an in-memory buffer to `db_path`, overwriting.
    ///
    /// The 200 body is returned as decoded, whatever its shape.
    pub async fn upload_bytes(&self, data: Vec<u8>, db_path: &str) -> Result<UploadResult> {
        let headers = self.upload_headers(db_path)?;

        debug!(operation = "upload", url = %self.endpoints.upload, bytes = data.len(), "sending request");
        let response = self
            .http_client
            .post(&self.endpoints.upload)
            .headers(headers)
            .body(data)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => decode(response).await,
            StatusCode::CONFLICT => Err(Error::RateLimit(failure("upload", response).await)),
            _ => Err(Error::Api(failure("upload", response).await)),
        }
    }

    /// Headers for a content upload to `db_path`
    fn upload_headers(&self, db_path: &str) -> Result<HeaderMap> {
        let arg = header_safe_json(&UploadArg {
            path: db_path,
            mode: "overwrite",
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/octet-stream"));
        headers.insert(AUTHORIZATION, bearer(&self.access_token)?);
        headers.insert(
            API_ARG_HEADER,
            HeaderValue::from_str(&arg).map_err(|e| Error::InvalidInput(format!("Invalid upload path: {}", e)))?,
        );

        Ok(headers)
    }

    async fn post_json<T: Serialize + ?Sized>(&self, operation: &str, url: &str, body: &T) -> Result<Response> {
        debug!(operation, url, "sending request");

        let response = self
            .http_client
            .post(url)
            .headers(self.headers.clone())
            .json(body)
            .send()
            .await?;

        Ok(response)
    }
}

fn bearer(token: &str) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|_| Error::InvalidInput("Access token contains invalid characters".to_string()))?;
    value.set_sensitive(true);
    Ok(value)
}

/// Decode a 200 response body
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let body = response.text().await?;
    Ok(serde_json::from_str(&body)?)
}

/// Drain a failed response into an [`ApiResponse`] and log it
async fn failure(operation: &str, response: Response) -> ApiResponse {
    let status = response.status();
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => {
            debug!(operation, error = %e, "could not read response body");
            String::new()
        }
    };

    let api_response = ApiResponse::new(status, body, retry_after);
    let summary = api_response.error_summary();
    warn!(
        operation,
        status = status.as_u16(),
        reason = api_response.reason(),
        error_summary = summary.as_deref(),
        retry_after = api_response.retry_after.as_deref(),
        "request failed"
    );

    api_response
}

/// Serialize to JSON with every non-ASCII character escaped as `\uXXXX`.
///
/// HTTP header values must be ASCII, and Dropbox expects the argument header
/// encoded this way.
fn header_safe_json<T: Serialize>(value: &T) -> Result<String> {
    let json = serde_json::to_string(value)?;
    let mut out = String::with_capacity(json.len());

    for c in json.chars() {
        if c.is_ascii() && c != '\u{7f}' {
            out.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }

    Ok(out)
}
