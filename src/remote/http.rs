use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::COOKIE;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use super::wire::{ErrorBody, ProjectsEnvelope, Reparent, TodoEnvelope, TodosEnvelope};
use super::{RemoteError, TodoApi};
use crate::model::{NewTask, Project, ProjectId, ServerConfig, Task, TaskId, TaskPatch};

/// `TodoApi` over HTTP+JSON.
#[derive(Clone)]
pub struct HttpApi {
    base_url: String,
    session_cookie: Option<String>,
    http: Client,
}

impl HttpApi {
    pub fn new(config: &ServerConfig) -> Result<Self, RemoteError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RemoteError::Network(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            base_url: join_base(&config.base_url, &config.api_prefix),
            session_cookie: config.session_cookie.clone(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // --- Private helpers ---

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, format!("{}{}", self.base_url, path));
        match &self.session_cookie {
            Some(cookie) => builder.header(COOKIE, cookie),
            None => builder,
        }
    }

    /// Send and turn any non-success status into `Rejected`.
    async fn send(&self, builder: RequestBuilder) -> Result<Response, RemoteError> {
        let resp = builder
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let text = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.error)
            .unwrap_or_else(|_| format!("request failed with status {}", status.as_u16()));
        log::info!("Server rejected request ({}): {}", status, message);
        Err(RemoteError::Rejected {
            status: status.as_u16(),
            message,
        })
    }

    async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, RemoteError> {
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| RemoteError::Malformed(e.to_string()))
    }
}

fn join_base(base_url: &str, api_prefix: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let prefix = api_prefix.trim_matches('/');
    if prefix.is_empty() {
        base.to_string()
    } else {
        format!("{}/{}", base, prefix)
    }
}

#[async_trait]
impl TodoApi for HttpApi {
    async fn list_projects(&self) -> Result<Vec<Project>, RemoteError> {
        let resp = self.send(self.request(Method::GET, "/projects")).await?;
        Ok(Self::decode::<ProjectsEnvelope>(resp).await?.projects)
    }

    async fn fetch_tree(&self, project: ProjectId) -> Result<Vec<Task>, RemoteError> {
        let resp = self
            .send(self.request(Method::GET, &format!("/todos/{}", project)))
            .await?;
        Ok(Self::decode::<TodosEnvelope>(resp).await?.todos)
    }

    async fn create_task(&self, task: &NewTask) -> Result<Task, RemoteError> {
        let resp = self
            .send(self.request(Method::POST, "/todos").json(task))
            .await?;
        Ok(Self::decode::<TodoEnvelope>(resp).await?.todo)
    }

    async fn update_task(&self, id: TaskId, patch: &TaskPatch) -> Result<Task, RemoteError> {
        let resp = self
            .send(self.request(Method::PUT, &format!("/todos/{}", id.0)).json(patch))
            .await?;
        Ok(Self::decode::<TodoEnvelope>(resp).await?.todo)
    }

    async fn delete_task(&self, id: TaskId) -> Result<(), RemoteError> {
        self.send(self.request(Method::DELETE, &format!("/todos/{}", id.0)))
            .await?;
        Ok(())
    }

    async fn reparent_task(&self, id: TaskId, request: &Reparent) -> Result<(), RemoteError> {
        self.send(
            self.request(Method::POST, &format!("/todos/{}/reparent", id.0))
                .json(request),
        )
        .await?;
        Ok(())
    }
}
