//! HDFS sink over the WebHDFS REST API
//!
//! The namenode connection is bootstrapped once with [`WebHdfsClient::connect`]
//! and then shared by every transfer. Files are created through the usual
//! two-step WebHDFS flow: the namenode answers `CREATE`/`APPEND` with a
//! redirect to a datanode, and the data is sent there. Redirects are followed
//! by hand so the request body is never replayed against the namenode.
//!
//! Writes are buffered and shipped as `APPEND` requests once the buffer
//! reaches the configured size; `close` sends whatever is left.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::redirect::Policy;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

use super::{Sink, SinkWriter};
use crate::constants::{env, http, webhdfs};
use crate::errors::{SinkError, SinkResult};

/// Settings for the HDFS sink
#[derive(Debug, Clone)]
pub struct HdfsConfig {
    /// Namenode HTTP address(es), comma separated for HA pairs
    pub namenode: Option<String>,
    /// User to act as
    pub user: Option<String>,
    /// Connect timeout for namenode and datanode dials
    pub connect_timeout: Duration,
    /// TCP keep-alive for namenode and datanode connections
    pub tcp_keepalive: Option<Duration>,
    /// Bytes buffered per file before an APPEND is sent
    pub append_buffer_size: usize,
}

impl Default for HdfsConfig {
    fn default() -> Self {
        Self {
            namenode: None,
            user: None,
            connect_timeout: http::CONNECT_TIMEOUT,
            tcp_keepalive: Some(http::TCP_KEEPALIVE),
            append_buffer_size: webhdfs::APPEND_BUFFER_SIZE,
        }
    }
}

/// Values given explicitly for this run; they beat the environment
#[derive(Debug, Clone, Default)]
pub struct HdfsOverrides {
    pub namenode: Option<String>,
    pub user: Option<String>,
}

/// Resolved namenode addresses and user identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HdfsEndpoint {
    /// Namenodes to try, in order
    pub namenodes: Vec<Url>,
    /// User to act as
    pub user: String,
}

impl HdfsEndpoint {
    /// Resolve the endpoint from overrides, the process environment and config
    ///
    /// Precedence for the namenode: override, `HADOOP_NAMENODE`, config.
    /// Precedence for the user: override, `HADOOP_USER_NAME`, config, then
    /// the login user.
    pub fn resolve(config: &HdfsConfig, overrides: &HdfsOverrides) -> SinkResult<Self> {
        Self::resolve_with(config, overrides, |key| std::env::var(key).ok())
    }

    /// Same as [`HdfsEndpoint::resolve`] with a custom variable lookup
    pub fn resolve_with<F>(config: &HdfsConfig, overrides: &HdfsOverrides, lookup: F) -> SinkResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup_set = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let namenode = overrides
            .namenode
            .clone()
            .or_else(|| lookup_set(env::HADOOP_NAMENODE))
            .or_else(|| config.namenode.clone())
            .ok_or(SinkError::NamenodeNotFound)?;
        let namenodes = parse_namenodes(&namenode)?;

        let user = overrides
            .user
            .clone()
            .or_else(|| lookup_set(env::HADOOP_USER_NAME))
            .or_else(|| config.user.clone())
            .or_else(|| env::LOGIN_USER_VARS.iter().find_map(|key| lookup_set(*key)))
            .ok_or(SinkError::UserNotFound)?;

        Ok(Self { namenodes, user })
    }
}

/// Parse a comma separated list of namenode addresses
///
/// Bare `host` or `host:port` values get the `http` scheme, and bare hosts
/// get the default WebHDFS port.
pub fn parse_namenodes(addresses: &str) -> SinkResult<Vec<Url>> {
    let namenodes = addresses
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_namenode)
        .collect::<SinkResult<Vec<_>>>()?;

    if namenodes.is_empty() {
        return Err(SinkError::NamenodeNotFound);
    }
    Ok(namenodes)
}

fn parse_namenode(address: &str) -> SinkResult<Url> {
    let invalid = |reason: &str| SinkError::InvalidNamenode {
        address: address.to_string(),
        reason: reason.to_string(),
    };

    let bare = !address.contains("://");
    let candidate = if bare {
        format!("http://{}", address)
    } else {
        address.to_string()
    };

    let mut url = Url::parse(&candidate).map_err(|e| invalid(&e.to_string()))?;
    match url.scheme() {
        "http" | "https" => {}
        "hdfs" => return Err(invalid("use the WebHDFS HTTP address (e.g. host:9870), not the RPC address")),
        other => return Err(invalid(&format!("unsupported scheme '{}'", other))),
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host"));
    }
    if bare && url.port().is_none() && !address.contains(':') {
        url.set_port(Some(webhdfs::DEFAULT_PORT))
            .map_err(|_| invalid("cannot set port"))?;
    }

    url.set_path("");
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

/// Type of an HDFS path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FileType {
    File,
    Directory,
    Symlink,
}

/// Subset of a WebHDFS `FileStatus` object
#[derive(Debug, Clone, Deserialize)]
pub struct FileStatus {
    #[serde(rename = "type")]
    pub file_type: FileType,
    #[serde(default)]
    pub length: u64,
}

#[derive(Debug, Deserialize)]
struct FileStatusResponse {
    #[serde(rename = "FileStatus")]
    file_status: FileStatus,
}

#[derive(Debug, Deserialize)]
struct BooleanResponse {
    boolean: bool,
}

#[derive(Debug, Deserialize)]
struct RemoteExceptionResponse {
    #[serde(rename = "RemoteException")]
    remote_exception: RemoteException,
}

#[derive(Debug, Deserialize)]
struct RemoteException {
    exception: String,
    #[serde(default)]
    message: String,
}

/// Human readable message from a WebHDFS error body
fn remote_message(body: &str) -> String {
    match serde_json::from_str::<RemoteExceptionResponse>(body) {
        Ok(parsed) => format!(
            "{}: {}",
            parsed.remote_exception.exception, parsed.remote_exception.message
        ),
        Err(_) => body.trim().to_string(),
    }
}

async fn check(response: Response, operation: &'static str, path: &str) -> SinkResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(SinkError::Remote {
        operation,
        path: path.to_string(),
        status: status.as_u16(),
        message: remote_message(&body),
    })
}

/// Datanode location from a namenode redirect, if the response is one
fn redirect_location(response: &Response, operation: &'static str, path: &str) -> SinkResult<Option<Url>> {
    if !response.status().is_redirection() {
        return Ok(None);
    }

    let missing = || SinkError::MissingRedirect {
        operation,
        path: path.to_string(),
    };
    let location = response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(missing)?;
    let url = response.url().join(location).map_err(|_| missing())?;
    Ok(Some(url))
}

/// Connection to a WebHDFS namenode, shared by all writers
#[derive(Debug)]
pub struct WebHdfsClient {
    http: Client,
    namenode: Url,
    user: String,
}

impl WebHdfsClient {
    /// Build a client for one namenode without probing it
    pub fn new(config: &HdfsConfig, namenode: Url, user: impl Into<String>) -> SinkResult<Self> {
        Ok(Self {
            http: Self::build_http_client(config)?,
            namenode,
            user: user.into(),
        })
    }

    /// Connect to the first namenode of `endpoint` that answers
    ///
    /// # Errors
    ///
    /// Returns the error of the last namenode tried if none answers.
    pub async fn connect(endpoint: &HdfsEndpoint, config: &HdfsConfig) -> SinkResult<Self> {
        let http = Self::build_http_client(config)?;
        let mut last_error = None;

        for namenode in &endpoint.namenodes {
            let candidate = Self {
                http: http.clone(),
                namenode: namenode.clone(),
                user: endpoint.user.clone(),
            };

            match candidate.file_status(Path::new("/")).await {
                Ok(_) => {
                    info!("Connected to namenode {} as {}", namenode, endpoint.user);
                    return Ok(candidate);
                }
                Err(e) => {
                    warn!("Namenode {} unavailable: {}", namenode, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(SinkError::NamenodeNotFound))
    }

    fn build_http_client(config: &HdfsConfig) -> SinkResult<Client> {
        let mut builder = Client::builder()
            .redirect(Policy::none())
            .connect_timeout(config.connect_timeout)
            .user_agent(http::USER_AGENT);

        if let Some(keepalive) = config.tcp_keepalive {
            builder = builder.tcp_keepalive(keepalive);
        }

        builder.build().map_err(SinkError::Http)
    }

    /// Namenode this client talks to
    pub fn namenode(&self) -> &Url {
        &self.namenode
    }

    /// User this client acts as
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Absolute HDFS path for `path`; relative paths live under `/user/<user>`
    ///
    /// Segments are kept byte for byte, so a name like `a%20b.txt` stays
    /// literal on the cluster.
    ///
    /// # Errors
    ///
    /// Returns `SinkError::InvalidPath` for `.` or `..` segments.
    pub fn hdfs_path(&self, path: &Path) -> SinkResult<String> {
        let raw = path.to_string_lossy();
        let absolute = if raw.starts_with('/') {
            raw.into_owned()
        } else {
            let relative = raw.trim_start_matches("./");
            format!("/user/{}/{}", self.user, relative)
        };

        let mut normalized = String::new();
        for segment in absolute.split('/').filter(|s| !s.is_empty()) {
            if segment == "." || segment == ".." {
                return Err(SinkError::InvalidPath { path: absolute });
            }
            normalized.push('/');
            normalized.push_str(segment);
        }
        if normalized.is_empty() {
            normalized.push('/');
        }
        Ok(normalized)
    }

    fn op_url(&self, hdfs_path: &str, op: &str, extra: &[(&str, &str)]) -> SinkResult<Url> {
        let mut url = self.namenode.clone();
        url.set_path(webhdfs::API_PREFIX);
        {
            let mut segments = url.path_segments_mut().map_err(|_| SinkError::InvalidNamenode {
                address: self.namenode.to_string(),
                reason: "cannot carry a path".to_string(),
            })?;
            segments.pop_if_empty();
            let mut pushed = false;
            for segment in hdfs_path.split('/').filter(|s| !s.is_empty()) {
                segments.push(segment);
                pushed = true;
            }
            if !pushed {
                segments.push("");
            }
        }
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("op", op);
            query.append_pair("user.name", &self.user);
            for (key, value) in extra {
                query.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// Status of `path`, or `None` if it does not exist
    pub async fn file_status(&self, path: &Path) -> SinkResult<Option<FileStatus>> {
        let hdfs_path = self.hdfs_path(path)?;
        let url = self.op_url(&hdfs_path, "GETFILESTATUS", &[])?;

        let response = self.http.get(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = check(response, "GETFILESTATUS", &hdfs_path).await?;
        let body: FileStatusResponse = response.json().await?;
        Ok(Some(body.file_status))
    }

    /// Create `path` and any missing parents
    pub async fn mkdirs(&self, path: &Path) -> SinkResult<()> {
        let hdfs_path = self.hdfs_path(path)?;
        let url = self.op_url(
            &hdfs_path,
            "MKDIRS",
            &[("permission", webhdfs::DIR_PERMISSION)],
        )?;

        let response = self.http.put(url).send().await?;
        let response = check(response, "MKDIRS", &hdfs_path).await?;
        let body: BooleanResponse = response.json().await?;
        if !body.boolean {
            return Err(SinkError::Remote {
                operation: "MKDIRS",
                path: hdfs_path,
                status: StatusCode::OK.as_u16(),
                message: "namenode refused to create the directory".to_string(),
            });
        }

        debug!("Created HDFS directory {}", hdfs_path);
        Ok(())
    }

    /// Create (or truncate) an empty file at `hdfs_path`
    pub async fn create(&self, hdfs_path: &str) -> SinkResult<()> {
        let url = self.op_url(hdfs_path, "CREATE", &[("overwrite", "true")])?;
        let response = self.http.put(url).send().await?;

        match redirect_location(&response, "CREATE", hdfs_path)? {
            Some(datanode) => {
                let response = self
                    .http
                    .put(datanode)
                    .header(CONTENT_TYPE, "application/octet-stream")
                    .body(Vec::new())
                    .send()
                    .await?;
                check(response, "CREATE", hdfs_path).await?;
            }
            None => {
                check(response, "CREATE", hdfs_path).await?;
            }
        }

        Ok(())
    }

    /// Append `data` to the file at `hdfs_path`
    pub async fn append(&self, hdfs_path: &str, data: Vec<u8>) -> SinkResult<()> {
        let url = self.op_url(hdfs_path, "APPEND", &[])?;
        let response = self.http.post(url).send().await?;

        let datanode = match redirect_location(&response, "APPEND", hdfs_path)? {
            Some(datanode) => datanode,
            None => {
                check(response, "APPEND", hdfs_path).await?;
                return Err(SinkError::MissingRedirect {
                    operation: "APPEND",
                    path: hdfs_path.to_string(),
                });
            }
        };

        let response = self
            .http
            .post(datanode)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(data)
            .send()
            .await?;
        check(response, "APPEND", hdfs_path).await?;
        Ok(())
    }
}

/// Sink writing into HDFS
#[derive(Debug, Clone)]
pub struct WebHdfsSink {
    client: Arc<WebHdfsClient>,
    append_buffer_size: usize,
}

impl WebHdfsSink {
    /// Wrap an established client
    pub fn new(client: WebHdfsClient, append_buffer_size: usize) -> Self {
        Self {
            client: Arc::new(client),
            append_buffer_size: append_buffer_size.max(1),
        }
    }

    /// Resolve the endpoint, connect once, and return the ready sink
    pub async fn connect(config: &HdfsConfig, overrides: &HdfsOverrides) -> SinkResult<Self> {
        let endpoint = HdfsEndpoint::resolve(config, overrides)?;
        let client = WebHdfsClient::connect(&endpoint, config).await?;
        Ok(Self::new(client, config.append_buffer_size))
    }

    /// Shared namenode client
    pub fn client(&self) -> &WebHdfsClient {
        &self.client
    }
}

#[async_trait]
impl Sink for WebHdfsSink {
    fn name(&self) -> &'static str {
        "hdfs"
    }

    async fn ensure_container(&self, path: &Path) -> SinkResult<()> {
        match self.client.file_status(path).await? {
            Some(status) if status.file_type == FileType::Directory => {
                debug!("HDFS destination {} already exists", path.display());
                Ok(())
            }
            Some(_) => Err(SinkError::NotADirectory {
                path: path.to_path_buf(),
            }),
            None => self.client.mkdirs(path).await,
        }
    }

    async fn create_writer(&self, path: &Path) -> SinkResult<Box<dyn SinkWriter>> {
        let hdfs_path = self.client.hdfs_path(path)?;
        self.client.create(&hdfs_path).await?;

        Ok(Box::new(WebHdfsWriter {
            client: Arc::clone(&self.client),
            path: hdfs_path,
            buffer: Vec::new(),
            threshold: self.append_buffer_size,
            bytes_written: 0,
        }))
    }
}

/// Buffered writer over one HDFS file
#[derive(Debug)]
pub struct WebHdfsWriter {
    client: Arc<WebHdfsClient>,
    path: String,
    buffer: Vec<u8>,
    threshold: usize,
    bytes_written: u64,
}

impl WebHdfsWriter {
    async fn flush_buffer(&mut self) -> SinkResult<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let data = std::mem::take(&mut self.buffer);
        self.client.append(&self.path, data).await
    }
}

#[async_trait]
impl SinkWriter for WebHdfsWriter {
    async fn write_chunk(&mut self, chunk: &[u8]) -> SinkResult<()> {
        self.buffer.extend_from_slice(chunk);
        self.bytes_written += chunk.len() as u64;

        if self.buffer.len() >= self.threshold {
            self.flush_buffer().await?;
        }
        Ok(())
    }

    async fn close(mut self: Box<Self>) -> SinkResult<()> {
        self.flush_buffer().await
    }

    fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}
