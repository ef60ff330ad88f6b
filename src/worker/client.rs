//! Worker tool-protocol client

use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Schema of one tool hosted by the worker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub input_schema: serde_json::Value,
}

impl ToolDescriptor {
    /// Names of the schema's top-level properties, used to guide
    /// argument repair
    pub fn field_names(&self) -> Vec<String> {
        self.input_schema["properties"]
            .as_object()
            .map(|props| props.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Render as an OpenAI function-calling tool definition
    pub fn to_openai_function(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.input_schema,
            }
        })
    }
}

/// Calling convention for tools hosted by a sandboxed worker
#[async_trait]
pub trait WorkerClient: Send + Sync {
    /// Correlation name for logs
    fn name(&self) -> &str;

    /// Liveness probe
    async fn ping(&self) -> Result<()>;

    /// List the worker's tool schemas
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>>;

    /// Invoke one tool by name with structured arguments
    async fn call_tool(&self, name: &str, args: serde_json::Value) -> Result<String>;

    /// Re-establish the connection after a liveness failure
    async fn reconnect(&self) -> Result<()>;
}

/// HTTP implementation against the worker's tool endpoint
pub struct HttpWorkerClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpWorkerClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl WorkerClient for HttpWorkerClient {
    fn name(&self) -> &str {
        &self.base_url
    }

    async fn ping(&self) -> Result<()> {
        let response = self.client.get(self.url("/ping")).send().await?;
        if !response.status().is_success() {
            return Err(Error::Worker(format!(
                "Ping to {} returned {}",
                self.base_url,
                response.status()
            )));
        }
        Ok(())
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        let response = self.client.get(self.url("/tools")).send().await?;
        if !response.status().is_success() {
            return Err(Error::Worker(format!(
                "Tool listing returned {}",
                response.status()
            )));
        }
        Ok(response.json().await?)
    }

    async fn call_tool(&self, name: &str, args: serde_json::Value) -> Result<String> {
        let body = serde_json::json!({"name": name, "arguments": args});
        let response = self
            .client
            .post(self.url("/tools/call"))
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Error::Worker(format!(
                "Tool call {} returned {}",
                name,
                response.status()
            )));
        }
        Ok(response.text().await?)
    }

    async fn reconnect(&self) -> Result<()> {
        // Stateless HTTP transport; a reconnect is just a fresh ping.
        self.ping().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> ToolDescriptor {
        ToolDescriptor {
            name: "file_write".to_string(),
            description: "Write a file".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "file": {"type": "string"},
                    "content": {"type": "string"}
                },
                "required": ["file", "content"]
            }),
        }
    }

    #[test]
    fn test_field_names_from_schema() {
        let mut names = descriptor().field_names();
        names.sort();
        assert_eq!(names, vec!["content".to_string(), "file".to_string()]);

        let bare = ToolDescriptor {
            name: "x".to_string(),
            description: String::new(),
            input_schema: serde_json::Value::Null,
        };
        assert!(bare.field_names().is_empty());
    }

    #[test]
    fn test_openai_function_shape() {
        let function = descriptor().to_openai_function();
        assert_eq!(function["type"], "function");
        assert_eq!(function["function"]["name"], "file_write");
        assert_eq!(
            function["function"]["parameters"]["properties"]["file"]["type"],
            "string"
        );
    }

    #[tokio::test]
    async fn test_ping_unreachable_worker_errors() {
        let client = HttpWorkerClient::new("http://127.0.0.1:1");
        assert!(client.ping().await.is_err());
    }
}
