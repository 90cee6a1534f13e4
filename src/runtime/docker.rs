//! Docker Engine REST API client.
//!
//! Talks to the daemon over its Unix socket (the default) or over TCP
//! (`DOCKER_HOST=tcp://host:2375`). The API version is negotiated against
//! the daemon's `/_ping` reply on first use. Error replies carry a
//! `{"message": ...}` body which is surfaced verbatim.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::OnceCell;
use tokio_stream::StreamExt as _;
use tracing::{debug, info, warn};
use url::Url;

use super::{
    ContainerRuntime, ContainerSpec, ContainerState, ContainerSummary, NetworkSummary,
    RuntimeError, RuntimeResult, VolumeSummary,
};
use crate::types::ImageRef;

pub const DEFAULT_DOCKER_HOST: &str = "unix:///var/run/docker.sock";
/// Highest API version the client speaks; older daemons negotiate down.
pub const DEFAULT_API_VERSION: &str = "v1.43";

/// Client for a Docker daemon.
#[derive(Clone)]
pub struct DockerEngine {
    http: Client,
    base: Url,
    max_api_version: String,
    negotiated: Arc<OnceCell<String>>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreateResponse {
    id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectResponse {
    id: String,
    state: InspectState,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectState {
    #[serde(default)]
    running: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct VolumeListResponse {
    #[serde(default)]
    volumes: Option<Vec<VolumeSummary>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct NetworkResource {
    name: String,
    #[serde(default)]
    id: String,
    #[serde(default)]
    containers: Option<HashMap<String, Value>>,
}

#[cfg(unix)]
fn with_socket(builder: ClientBuilder, path: &str) -> RuntimeResult<ClientBuilder> {
    Ok(builder.unix_socket(std::path::PathBuf::from(path)))
}

#[cfg(not(unix))]
fn with_socket(_builder: ClientBuilder, path: &str) -> RuntimeResult<ClientBuilder> {
    Err(RuntimeError::Transport(format!(
        "unix socket `{}` is not supported on this platform",
        path
    )))
}

/// Parse `1.43` or `v1.43` into a comparable pair.
fn parse_version(version: &str) -> Option<(u32, u32)> {
    let (major, minor) = version.trim_start_matches('v').split_once('.')?;
    Some((major.parse().ok()?, minor.parse().ok()?))
}

impl DockerEngine {
    /// Build a client for `host`.
    ///
    /// Accepts `unix://`, `tcp://`, `http://` and `https://` addresses, or a
    /// bare `host:port`. Requests over a Unix socket use a placeholder
    /// `localhost` authority.
    pub fn new(host: &str, api_version: &str) -> RuntimeResult<Self> {
        let mut builder = Client::builder();
        let normalized = if let Some(path) = host.strip_prefix("unix://") {
            builder = with_socket(builder, path)?;
            "http://localhost/".to_string()
        } else if let Some(rest) = host.strip_prefix("tcp://") {
            format!("http://{}", rest)
        } else if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else if host.starts_with("npipe://") {
            return Err(RuntimeError::Transport(format!(
                "unsupported docker host `{}`: use a unix socket or TCP",
                host
            )));
        } else {
            format!("http://{}", host)
        };

        let mut base = Url::parse(&normalized)
            .map_err(|e| RuntimeError::Transport(format!("invalid docker host `{}`: {}", host, e)))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let http = builder
            .build()
            .map_err(|e| RuntimeError::Transport(format!("failed to build engine client: {}", e)))?;

        Ok(Self {
            http,
            base,
            max_api_version: format!("v{}", api_version.trim_matches('/').trim_start_matches('v')),
            negotiated: Arc::new(OnceCell::new()),
        })
    }

    /// The version used for requests.
    ///
    /// A daemon older than [`DEFAULT_API_VERSION`] (or the configured
    /// ceiling) pulls the version down to its own. When the ping fails the
    /// ceiling is used and negotiation is retried on the next request.
    pub async fn api_version(&self) -> String {
        if let Some(version) = self.negotiated.get() {
            return version.clone();
        }
        let Some(reported) = self.ping_version().await else {
            return self.max_api_version.clone();
        };

        let version = match (parse_version(&reported), parse_version(&self.max_api_version)) {
            (Some(daemon), Some(ceiling)) if daemon < ceiling => {
                format!("v{}", reported.trim_start_matches('v'))
            }
            _ => self.max_api_version.clone(),
        };
        debug!(daemon = %reported, using = %version, "Negotiated engine API version");
        let _ = self.negotiated.set(version.clone());
        version
    }

    async fn ping_version(&self) -> Option<String> {
        let url = self.base.join("_ping").ok()?;
        let response = match self.http.get(url).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                warn!(status = %response.status(), "Engine ping rejected");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "Engine ping failed");
                return None;
            }
        };
        response
            .headers()
            .get("Api-Version")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    fn endpoint_for(&self, version: &str, path: &str) -> RuntimeResult<Url> {
        self.base
            .join(&format!("{}/{}", version, path))
            .map_err(|e| RuntimeError::Transport(format!("invalid endpoint `{}`: {}", path, e)))
    }

    async fn endpoint(&self, path: &str) -> RuntimeResult<Url> {
        let version = self.api_version().await;
        self.endpoint_for(&version, path)
    }

    fn label_filter(label: &str) -> String {
        json!({ "label": [label] }).to_string()
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> RuntimeResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| RuntimeError::Transport(e.to_string()))?;
        Self::check(response).await
    }

    /// Map non-2xx replies onto [`RuntimeError`], keeping the daemon's message.
    async fn check(response: Response) -> RuntimeResult<Response> {
        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_MODIFIED {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.message)
            .unwrap_or_else(|_| text.trim().to_string());

        Err(match status {
            StatusCode::NOT_FOUND => RuntimeError::NotFound(message),
            StatusCode::CONFLICT => RuntimeError::Conflict(message),
            other => RuntimeError::Api {
                status: other.as_u16(),
                message,
            },
        })
    }

    async fn decode<T: for<'de> Deserialize<'de>>(response: Response) -> RuntimeResult<T> {
        response
            .json::<T>()
            .await
            .map_err(|e| RuntimeError::Transport(format!("invalid engine response: {}", e)))
    }

    /// Inspect one line of pull progress; an `error` event fails the pull.
    fn check_progress(image: &ImageRef, line: &[u8]) -> RuntimeResult<()> {
        let line = line.trim_ascii();
        if line.is_empty() {
            return Ok(());
        }
        let Ok(event) = serde_json::from_slice::<Value>(line) else {
            return Ok(());
        };
        if let Some(error) = event.get("error").and_then(|e| e.as_str()) {
            return Err(RuntimeError::Stream(error.to_string()));
        }
        if let Some(status) = event.get("status").and_then(|s| s.as_str()) {
            debug!(image = %image, status, "pull progress");
        }
        Ok(())
    }
}

#[async_trait]
impl ContainerRuntime for DockerEngine {
    async fn create_network(&self, name: &str) -> RuntimeResult<()> {
        let url = self.endpoint("networks/create").await?;
        let response = self
            .send(self.http.post(url).json(&json!({ "Name": name })))
            .await?;
        let created: CreateResponse = Self::decode(response).await?;
        info!(network = %name, id = %created.id, "Created network");
        Ok(())
    }

    async fn create_volume(&self, name: &str) -> RuntimeResult<()> {
        let url = self.endpoint("volumes/create").await?;
        self.send(self.http.post(url).json(&json!({ "Name": name })))
            .await?;
        info!(volume = %name, "Created volume");
        Ok(())
    }

    async fn create_container(&self, spec: &ContainerSpec) -> RuntimeResult<String> {
        let mut url = self.endpoint("containers/create").await?;
        url.query_pairs_mut().append_pair("name", &spec.name);

        let endpoints: serde_json::Map<String, Value> = spec
            .networks
            .iter()
            .map(|network| (network.clone(), json!({})))
            .collect();

        let body = json!({
            "Image": spec.image,
            "Env": spec.env,
            "HostConfig": { "Binds": spec.binds },
            "NetworkingConfig": { "EndpointsConfig": endpoints },
        });

        let response = self.send(self.http.post(url).json(&body)).await?;
        let created: CreateResponse = Self::decode(response).await?;
        info!(container = %spec.name, id = %created.id, "Created container");
        Ok(created.id)
    }

    async fn inspect_container(&self, name: &str) -> RuntimeResult<ContainerState> {
        let url = self.endpoint(&format!("containers/{}/json", name)).await?;
        let response = self.send(self.http.get(url)).await?;
        let inspected: InspectResponse = Self::decode(response).await?;
        Ok(ContainerState {
            id: inspected.id,
            running: inspected.state.running,
        })
    }

    async fn start_container(&self, id: &str) -> RuntimeResult<()> {
        let url = self.endpoint(&format!("containers/{}/start", id)).await?;
        self.send(self.http.post(url)).await?;
        info!(container = %id, "Started container");
        Ok(())
    }

    async fn pull_image(&self, image: &ImageRef) -> RuntimeResult<()> {
        let (repository, tag) = image.split();
        let mut url = self.endpoint("images/create").await?;
        url.query_pairs_mut()
            .append_pair("fromImage", repository)
            .append_pair("tag", tag);

        let response = self.send(self.http.post(url)).await?;

        // The pull only completes once the progress stream has been drained.
        let mut stream = response.bytes_stream();
        let mut pending: Vec<u8> = Vec::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| RuntimeError::Transport(e.to_string()))?;
            pending.extend_from_slice(&chunk);
            while let Some(pos) = pending.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = pending.drain(..=pos).collect();
                Self::check_progress(image, &line)?;
            }
        }
        Self::check_progress(image, &pending)?;

        info!(image = %image, "Pulled image");
        Ok(())
    }

    async fn list_containers(&self, label: &str) -> RuntimeResult<Vec<ContainerSummary>> {
        let mut url = self.endpoint("containers/json").await?;
        url.query_pairs_mut()
            .append_pair("all", "true")
            .append_pair("filters", &Self::label_filter(label));
        let response = self.send(self.http.get(url)).await?;
        Self::decode(response).await
    }

    async fn list_volumes(&self, label: &str) -> RuntimeResult<Vec<VolumeSummary>> {
        let mut url = self.endpoint("volumes").await?;
        url.query_pairs_mut()
            .append_pair("filters", &Self::label_filter(label));
        let response = self.send(self.http.get(url)).await?;
        let listed: VolumeListResponse = Self::decode(response).await?;
        Ok(listed.volumes.unwrap_or_default())
    }

    async fn list_networks(&self, label: &str) -> RuntimeResult<Vec<NetworkSummary>> {
        let mut url = self.endpoint("networks").await?;
        url.query_pairs_mut()
            .append_pair("filters", &Self::label_filter(label));
        let response = self.send(self.http.get(url)).await?;
        let networks: Vec<NetworkResource> = Self::decode(response).await?;

        Ok(networks
            .into_iter()
            .map(|n| {
                let mut containers: Vec<String> =
                    n.containers.unwrap_or_default().into_keys().collect();
                containers.sort();
                NetworkSummary {
                    name: n.name,
                    id: n.id,
                    containers,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn engine(server: &MockServer) -> DockerEngine {
        engine_for(server)
    }

    fn engine_for(server: &MockServer) -> DockerEngine {
        DockerEngine::new(&server.uri(), DEFAULT_API_VERSION).unwrap()
    }

    #[test]
    fn test_host_normalization() {
        let engine = DockerEngine::new("tcp://10.0.0.5:2375", "v1.43").unwrap();
        assert_eq!(
            engine.endpoint_for("v1.43", "networks/create").unwrap().as_str(),
            "http://10.0.0.5:2375/v1.43/networks/create"
        );

        let engine = DockerEngine::new("localhost:2375", "/v1.41/").unwrap();
        assert_eq!(engine.max_api_version, "v1.41");
        assert_eq!(
            engine.endpoint_for("v1.41", "volumes").unwrap().as_str(),
            "http://localhost:2375/v1.41/volumes"
        );

        assert!(matches!(
            DockerEngine::new("npipe:////./pipe/docker_engine", "v1.43"),
            Err(RuntimeError::Transport(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_default_host_is_local_socket() {
        assert_eq!(DEFAULT_DOCKER_HOST, "unix:///var/run/docker.sock");
        let engine = DockerEngine::new(DEFAULT_DOCKER_HOST, DEFAULT_API_VERSION).unwrap();
        assert_eq!(
            engine.endpoint_for("v1.43", "_ping").unwrap().as_str(),
            "http://localhost/v1.43/_ping"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unix_socket_round_trip() {
        use axum::{Router, http::HeaderMap, routing::{get, post}};

        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("docker.sock");
        let listener = tokio::net::UnixListener::bind(&socket).unwrap();

        let app = Router::new()
            .route(
                "/_ping",
                get(|| async {
                    let mut headers = HeaderMap::new();
                    headers.insert("api-version", "1.41".parse().unwrap());
                    (headers, "OK")
                }),
            )
            .route(
                "/v1.41/volumes/create",
                post(|| async { axum::Json(json!({"Name": "data"})) }),
            );
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let host = format!("unix://{}", socket.display());
        let engine = DockerEngine::new(&host, DEFAULT_API_VERSION).unwrap();
        engine.create_volume("data").await.unwrap();
        assert_eq!(engine.api_version().await, "v1.41");
    }

    #[tokio::test]
    async fn test_version_negotiation() {
        let older = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/_ping"))
            .respond_with(ResponseTemplate::new(200).insert_header("Api-Version", "1.41"))
            .expect(1)
            .mount(&older)
            .await;
        let engine = engine(&older).await;
        assert_eq!(engine.api_version().await, "v1.41");
        // cached after the first successful ping
        assert_eq!(engine.api_version().await, "v1.41");

        let newer = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/_ping"))
            .respond_with(ResponseTemplate::new(200).insert_header("Api-Version", "1.47"))
            .mount(&newer)
            .await;
        assert_eq!(engine_for(&newer).api_version().await, "v1.43");

        // no ping route: fall back to the ceiling
        let silent = MockServer::start().await;
        assert_eq!(engine_for(&silent).api_version().await, "v1.43");
    }

    #[tokio::test]
    async fn test_create_network_posts_name() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1.43/networks/create"))
            .and(body_partial_json(json!({"Name": "net1"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"Id": "abc", "Warning": ""})))
            .expect(1)
            .mount(&server)
            .await;

        engine(&server).await.create_network("net1").await.unwrap();
    }

    #[tokio::test]
    async fn test_conflict_message_is_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1.43/networks/create"))
            .respond_with(
                ResponseTemplate::new(409)
                    .set_body_json(json!({"message": "network with name net1 already exists"})),
            )
            .mount(&server)
            .await;

        let err = engine(&server).await.create_network("net1").await.unwrap_err();
        assert_eq!(
            err,
            RuntimeError::Conflict("network with name net1 already exists".into())
        );
    }

    #[tokio::test]
    async fn test_create_container_sends_full_spec() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1.43/containers/create"))
            .and(query_param("name", "db"))
            .and(body_partial_json(json!({
                "Image": "mysql:latest",
                "Env": ["MYSQL_DATABASE=app"],
                "HostConfig": {"Binds": ["data:/var/lib/mysql"]},
                "NetworkingConfig": {"EndpointsConfig": {"backend": {}}}
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"Id": "c0ffee", "Warnings": []})))
            .mount(&server)
            .await;

        let spec = ContainerSpec {
            name: "db".into(),
            image: "mysql:latest".into(),
            env: vec!["MYSQL_DATABASE=app".into()],
            binds: vec!["data:/var/lib/mysql".into()],
            networks: vec!["backend".into()],
        };
        let id = engine(&server).await.create_container(&spec).await.unwrap();
        assert_eq!(id, "c0ffee");
    }

    #[tokio::test]
    async fn test_inspect_reports_running_state() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1.43/containers/web/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Id": "1234",
                "Name": "/web",
                "State": {"Status": "running", "Running": true}
            })))
            .mount(&server)
            .await;

        let state = engine(&server).await.inspect_container("web").await.unwrap();
        assert_eq!(
            state,
            ContainerState {
                id: "1234".into(),
                running: true
            }
        );
    }

    #[tokio::test]
    async fn test_missing_container_maps_to_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1.43/containers/ghost/json"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({"message": "No such container: ghost"})),
            )
            .mount(&server)
            .await;

        let err = engine(&server).await.inspect_container("ghost").await.unwrap_err();
        assert_eq!(err, RuntimeError::NotFound("No such container: ghost".into()));
    }

    #[tokio::test]
    async fn test_pull_drains_stream_and_surfaces_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1.43/images/create"))
            .and(query_param("fromImage", "redis"))
            .and(query_param("tag", "latest"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "{\"status\":\"Pulling from library/redis\"}\n{\"status\":\"Download complete\"}\n",
            ))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1.43/images/create"))
            .and(query_param("fromImage", "private/app"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "{\"status\":\"Pulling\"}\n{\"error\":\"pull access denied for private/app\"}\n",
            ))
            .mount(&server)
            .await;

        let engine = engine(&server).await;
        engine.pull_image(&ImageRef::new("redis:latest")).await.unwrap();

        let err = engine
            .pull_image(&ImageRef::new("private/app:1.0"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RuntimeError::Stream("pull access denied for private/app".into())
        );
    }

    #[tokio::test]
    async fn test_pull_without_tag_requests_latest() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1.43/images/create"))
            .and(query_param("fromImage", "nginx"))
            .and(query_param("tag", "latest"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"status\":\"Status: Image is up to date for nginx:latest\"}"))
            .expect(1)
            .mount(&server)
            .await;

        engine(&server).await.pull_image(&ImageRef::new("nginx")).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let pull = requests
            .iter()
            .find(|r| r.url.path() == "/v1.43/images/create")
            .unwrap();
        assert_eq!(pull.url.query(), Some("fromImage=nginx&tag=latest"));
    }

    #[tokio::test]
    async fn test_pull_by_digest_sends_digest_as_tag() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1.43/images/create"))
            .and(query_param("fromImage", "alpine"))
            .and(query_param("tag", "sha256:abcd"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        engine(&server)
            .await
            .pull_image(&ImageRef::new("alpine@sha256:abcd"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_pull_error_on_unterminated_last_line() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1.43/images/create"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "{\"status\":\"Pulling\"}\n\n{\"error\":\"manifest unknown\"}",
            ))
            .mount(&server)
            .await;

        let err = engine(&server)
            .await
            .pull_image(&ImageRef::new("ghost:1"))
            .await
            .unwrap_err();
        assert_eq!(err, RuntimeError::Stream("manifest unknown".into()));
    }

    #[tokio::test]
    async fn test_list_networks_collects_container_ids() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1.43/networks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"Name": "proj-net", "Id": "n1", "Containers": {"c2": {}, "c1": {}}},
                {"Name": "proj-empty", "Id": "n2"}
            ])))
            .mount(&server)
            .await;

        let networks = engine(&server)
            .await
            .list_networks("mcp-server-docker.project=proj")
            .await
            .unwrap();
        assert_eq!(networks.len(), 2);
        assert_eq!(networks[0].containers, vec!["c1".to_string(), "c2".to_string()]);
        assert!(networks[1].containers.is_empty());
    }
}
