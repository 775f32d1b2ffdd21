//! # Authoritative Store Clients
//!
//! The authoritative store owns the authored graph. Waypoint only reads it:
//! a version token first, and the full dataset when the token changed.
//!
//! Two backends:
//! - `HttpStore` - the REST API (`GET /api/version`, `/api/nodes`, ...)
//! - `FileStore` - a JSON `AuthoredDocument` on disk (`waypoint demo` writes one)

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use waypoint_core::{
    CompatibilityRule, Component, Dataset, Node, NodeOption, Recipe, VersionToken, WizardError,
};

/// Maximum size of a dataset document (64 MB).
const MAX_DOCUMENT_SIZE: u64 = 64 * 1024 * 1024;

// =============================================================================
// CLIENT ERRORS
// =============================================================================

/// Errors from the HTTP client layer.
#[derive(Debug)]
pub enum ClientError {
    /// Cannot reach the authoritative store.
    ConnectionFailed(String),
    /// 401 Unauthorized - invalid or missing API key.
    Unauthorized,
    /// Any other non-success status.
    ServerError(u16, String),
    /// Failed to parse response body.
    ParseError(String),
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConnectionFailed(url) => write!(f, "Cannot connect to store at {url}"),
            Self::Unauthorized => write!(f, "Unauthorized: invalid or missing API key"),
            Self::ServerError(status, msg) => write!(f, "Server error ({status}): {msg}"),
            Self::ParseError(msg) => write!(f, "Parse error: {msg}"),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<ClientError> for WizardError {
    fn from(e: ClientError) -> Self {
        WizardError::StoreUnavailable(e.to_string())
    }
}

// =============================================================================
// STORE TRAIT
// =============================================================================

/// Read access to the authoritative dataset.
#[async_trait]
pub trait AuthoritativeStore: Send + Sync {
    /// The current version token.
    async fn fetch_version(&self) -> Result<VersionToken, WizardError>;

    /// Every authored collection.
    async fn fetch_dataset(&self) -> Result<Dataset, WizardError>;

    /// Where this store lives, for logs.
    fn location(&self) -> String;
}

// =============================================================================
// HTTP STORE
// =============================================================================

#[derive(Deserialize)]
struct VersionBody {
    version: VersionToken,
}

/// The authoritative REST API.
#[derive(Clone)]
pub struct HttpStore {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpStore {
    /// Create a client pointing at the given base URL.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Build a GET request with optional Bearer auth.
    fn request(&self, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.http.get(&url);
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }
        req
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let resp = self
            .request(path)
            .send()
            .await
            .map_err(|e| ClientError::ConnectionFailed(format!("{}: {e}", self.base_url)))?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ClientError::Unauthorized);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::ServerError(status.as_u16(), body));
        }
        resp.json::<T>()
            .await
            .map_err(|e| ClientError::ParseError(format!("{path}: {e}")))
    }
}

#[async_trait]
impl AuthoritativeStore for HttpStore {
    async fn fetch_version(&self) -> Result<VersionToken, WizardError> {
        let body: VersionBody = self.get_json("/api/version").await?;
        Ok(body.version)
    }

    async fn fetch_dataset(&self) -> Result<Dataset, WizardError> {
        let (nodes, options, paths, recipes, components, rules) = tokio::try_join!(
            self.get_json::<Vec<Node>>("/api/nodes"),
            self.get_json::<Vec<NodeOption>>("/api/options"),
            self.get_json::<Vec<waypoint_core::Path>>("/api/paths"),
            self.get_json::<Vec<Recipe>>("/api/recipes"),
            self.get_json::<Vec<Component>>("/api/components"),
            self.get_json::<Vec<CompatibilityRule>>("/api/rules"),
        )?;
        Ok(Dataset {
            nodes,
            options,
            paths,
            recipes,
            components,
            rules,
        })
    }

    fn location(&self) -> String {
        self.base_url.clone()
    }
}

// =============================================================================
// FILE STORE
// =============================================================================

/// A dataset file: every collection plus the version token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthoredDocument {
    pub version: VersionToken,
    #[serde(flatten)]
    pub dataset: Dataset,
}

/// An authored JSON document on disk.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read and parse the whole document.
    pub async fn read_document(&self) -> Result<AuthoredDocument, WizardError> {
        read_document(&self.path).await
    }
}

/// Read an `AuthoredDocument`, refusing oversized files.
pub async fn read_document(path: &Path) -> Result<AuthoredDocument, WizardError> {
    let metadata = tokio::fs::metadata(path).await.map_err(|e| {
        WizardError::StoreUnavailable(format!("Cannot read '{}': {e}", path.display()))
    })?;
    if metadata.len() > MAX_DOCUMENT_SIZE {
        return Err(WizardError::SerializationError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            MAX_DOCUMENT_SIZE
        )));
    }
    let contents = tokio::fs::read(path).await.map_err(|e| {
        WizardError::StoreUnavailable(format!("Cannot read '{}': {e}", path.display()))
    })?;
    serde_json::from_slice(&contents).map_err(|e| {
        WizardError::SerializationError(format!("Invalid dataset '{}': {e}", path.display()))
    })
}

#[async_trait]
impl AuthoritativeStore for FileStore {
    async fn fetch_version(&self) -> Result<VersionToken, WizardError> {
        Ok(self.read_document().await?.version)
    }

    async fn fetch_dataset(&self) -> Result<Dataset, WizardError> {
        Ok(self.read_document().await?.dataset)
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

// =============================================================================
// BACKEND SELECTION
// =============================================================================

/// The configured store: an HTTP(S) URL selects the API, anything else a file.
#[derive(Clone)]
pub enum StoreBackend {
    Http(HttpStore),
    File(FileStore),
}

impl StoreBackend {
    pub fn from_location(location: &str, api_key: Option<String>) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            Self::Http(HttpStore::new(location, api_key))
        } else {
            Self::File(FileStore::new(location))
        }
    }
}

#[async_trait]
impl AuthoritativeStore for StoreBackend {
    async fn fetch_version(&self) -> Result<VersionToken, WizardError> {
        match self {
            Self::Http(store) => store.fetch_version().await,
            Self::File(store) => store.fetch_version().await,
        }
    }

    async fn fetch_dataset(&self) -> Result<Dataset, WizardError> {
        match self {
            Self::Http(store) => store.fetch_dataset().await,
            Self::File(store) => store.fetch_dataset().await,
        }
    }

    fn location(&self) -> String {
        match self {
            Self::Http(store) => store.location(),
            Self::File(store) => store.location(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
