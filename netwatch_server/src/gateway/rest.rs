use std::error::Error as StdError;
use std::io;

use log::debug;
use reqwest::{Client, Method, StatusCode};
use serde_json::{Value, json};

use super::{
    ConnectionParams, GatewayCommand, GatewayError, GatewayFactory, NetwatchGateway, RemoteRecord,
};

/// Opens sessions against the RouterOS REST API (`/rest/...`)
pub struct RestGatewayFactory;

impl GatewayFactory for RestGatewayFactory {
    fn open(&self, params: &ConnectionParams) -> Box<dyn NetwatchGateway> {
        Box::new(RestGateway::new(params.clone()))
    }
}

pub struct RestGateway {
    params: ConnectionParams,
    client: Option<Client>,
}

impl RestGateway {
    pub fn new(params: ConnectionParams) -> Self {
        Self {
            params,
            client: None,
        }
    }

    fn url(&self, path: &str) -> String {
        let scheme = if self.params.use_tls { "https" } else { "http" };
        format!(
            "{}://{}:{}/rest{}",
            scheme, self.params.host, self.params.port, path
        )
    }

    async fn send(
        &self,
        client: &Client,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, GatewayError> {
        let mut request = client
            .request(method, self.url(path))
            .basic_auth(&self.params.username, Some(&self.params.password));
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::from_message(describe_transport_error(e)))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(GatewayError::from_message(format!(
                "authentication failed (HTTP {})",
                status.as_u16()
            )));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GatewayError::from_message(format!(
                "router returned HTTP {}: {}",
                status.as_u16(),
                text.trim()
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| GatewayError::from_message(describe_transport_error(e)))
    }
}

#[rocket::async_trait]
impl NetwatchGateway for RestGateway {
    async fn connect(&mut self) -> Result<(), GatewayError> {
        let client = Client::builder()
            .connect_timeout(self.params.timeout)
            .timeout(self.params.timeout)
            .build()
            .map_err(|e| GatewayError::from_message(describe_transport_error(e)))?;

        // The identity endpoint is cheap and checks the credentials.
        self.send(&client, Method::GET, "/system/identity", None)
            .await?;
        debug!("netwatch session opened host={}", self.params.host);
        self.client = Some(client);
        Ok(())
    }

    async fn query(&mut self, command: &GatewayCommand) -> Result<Vec<RemoteRecord>, GatewayError> {
        let Some(client) = self.client.as_ref() else {
            return Err(GatewayError::from_message("query issued before connect"));
        };

        let value = match command {
            GatewayCommand::ListNetwatch => {
                self.send(client, Method::GET, "/tool/netwatch", None).await?
            }
            GatewayCommand::AddNetwatch { host, comment } => {
                let body = json!({ "host": host, "comment": comment });
                self.send(client, Method::PUT, "/tool/netwatch", Some(body))
                    .await?
            }
            GatewayCommand::Identity => {
                self.send(client, Method::GET, "/system/identity", None)
                    .await?
            }
            GatewayCommand::Resource => {
                self.send(client, Method::GET, "/system/resource", None)
                    .await?
            }
        };

        Ok(records_from_json(value))
    }

    async fn close(&mut self) {
        if self.client.take().is_some() {
            debug!("netwatch session closed host={}", self.params.host);
        }
    }
}

/// Flatten a REST reply (object or array of objects) into attribute maps
pub fn records_from_json(value: Value) -> Vec<RemoteRecord> {
    let objects = match value {
        Value::Array(items) => items,
        Value::Object(_) => vec![value],
        _ => Vec::new(),
    };

    objects
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(map) => Some(
                map.into_iter()
                    .map(|(key, value)| {
                        let text = match value {
                            Value::String(s) => s,
                            other => other.to_string(),
                        };
                        (key, text)
                    })
                    .collect(),
            ),
            _ => None,
        })
        .collect()
}

/// Render a reqwest failure with its whole source chain, tagging socket
/// errors with their errno names so classification sees them.
fn describe_transport_error(err: reqwest::Error) -> String {
    let err = err.without_url();
    let mut parts: Vec<String> = Vec::new();
    if err.is_timeout() {
        parts.push("timed out".to_string());
    }

    let mut source: Option<&(dyn StdError + 'static)> = Some(&err);
    while let Some(current) = source {
        if let Some(io_err) = current.downcast_ref::<io::Error>() {
            if let Some(tag) = errno_tag(io_err.kind()) {
                parts.push(tag.to_string());
            }
        }
        parts.push(current.to_string());
        source = current.source();
    }

    parts.dedup();
    parts.join(": ")
}

fn errno_tag(kind: io::ErrorKind) -> Option<&'static str> {
    match kind {
        io::ErrorKind::ConnectionRefused => Some("ECONNREFUSED"),
        io::ErrorKind::HostUnreachable => Some("EHOSTUNREACH"),
        io::ErrorKind::NetworkUnreachable => Some("ENETUNREACH"),
        io::ErrorKind::TimedOut => Some("timed out"),
        _ => None,
    }
}
