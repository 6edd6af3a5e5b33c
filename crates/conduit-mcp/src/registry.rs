//! Server registry: every live connection, keyed by endpoint name.

use crate::client::{ToolHost, ToolInfo};
use crate::config::EndpointDescriptor;
use crate::connector;
use crate::error::McpError;

/// A connected endpoint and its current tool catalog.
pub struct LiveConnection {
    descriptor: EndpointDescriptor,
    host: Box<dyn ToolHost>,
    catalog: Vec<ToolInfo>,
}

impl LiveConnection {
    pub fn new(
        descriptor: EndpointDescriptor,
        host: Box<dyn ToolHost>,
        catalog: Vec<ToolInfo>,
    ) -> Self {
        Self {
            descriptor,
            host,
            catalog,
        }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn descriptor(&self) -> &EndpointDescriptor {
        &self.descriptor
    }

    pub fn tools(&self) -> &[ToolInfo] {
        &self.catalog
    }

    pub fn has_tool(&self, tool: &str) -> bool {
        self.catalog.iter().any(|t| t.name == tool)
    }

    pub fn host(&self) -> &dyn ToolHost {
        self.host.as_ref()
    }
}

/// An endpoint that could not be connected at startup.
#[derive(Debug)]
pub struct ConnectFailure {
    pub endpoint: String,
    pub error: McpError,
}

/// Connected endpoints in configuration order.
#[derive(Default)]
pub struct ServerRegistry {
    connections: Vec<LiveConnection>,
}

impl ServerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect every descriptor concurrently. Successful connections are
    /// committed in configuration order; failures are returned alongside.
    pub async fn connect_all(descriptors: &[EndpointDescriptor]) -> (Self, Vec<ConnectFailure>) {
        let attempts = descriptors.iter().map(connector::connect);
        let results = futures_util::future::join_all(attempts).await;

        let mut registry = Self::new();
        let mut failures = Vec::new();
        for (descriptor, result) in descriptors.iter().zip(results) {
            let outcome = result.and_then(|conn| registry.insert(conn).map(|_| ()));
            if let Err(error) = outcome {
                tracing::warn!("Endpoint '{}' unavailable: {error}", descriptor.name);
                failures.push(ConnectFailure {
                    endpoint: descriptor.name.clone(),
                    error,
                });
            }
        }
        (registry, failures)
    }

    /// Connect one more endpoint and record it.
    pub async fn register(
        &mut self,
        descriptor: &EndpointDescriptor,
    ) -> Result<&LiveConnection, McpError> {
        if self.lookup(&descriptor.name).is_some() {
            return Err(McpError::DuplicateEndpoint {
                name: descriptor.name.clone(),
            });
        }
        let connection = connector::connect(descriptor).await?;
        self.insert(connection)
    }

    /// Record an already-established connection.
    pub fn insert(&mut self, connection: LiveConnection) -> Result<&LiveConnection, McpError> {
        if self.lookup(connection.name()).is_some() {
            return Err(McpError::DuplicateEndpoint {
                name: connection.name().to_string(),
            });
        }
        self.connections.push(connection);
        let last = self.connections.len() - 1;
        Ok(&self.connections[last])
    }

    /// Endpoint names in configuration order.
    pub fn list(&self) -> Vec<&str> {
        self.connections.iter().map(LiveConnection::name).collect()
    }

    pub fn connections(&self) -> &[LiveConnection] {
        &self.connections
    }

    pub fn lookup(&self, name: &str) -> Option<&LiveConnection> {
        self.connections.iter().find(|c| c.name() == name)
    }

    pub fn tools_of(&self, name: &str) -> Option<&[ToolInfo]> {
        self.lookup(name).map(LiveConnection::tools)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Re-run `tools/list` on an endpoint and replace its catalog. Returns
    /// the new tool count. On failure the old catalog is kept.
    pub async fn refresh(&mut self, name: &str) -> Result<usize, McpError> {
        let connection = self
            .connections
            .iter_mut()
            .find(|c| c.name() == name)
            .ok_or_else(|| McpError::UnknownEndpoint {
                name: name.to_string(),
            })?;
        let tools = connection.host.list_tools().await?;
        connection.catalog = tools;
        Ok(connection.catalog.len())
    }

    /// Tear down every connection, best-effort.
    pub async fn shutdown(self) {
        let teardowns = self.connections.iter().map(|c| c.host.shutdown());
        futures_util::future::join_all(teardowns).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ToolCallResult;
    use crate::config::EndpointKind;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::{Arc, Mutex};

    /// Host whose catalog can be swapped between `list_tools` calls.
    struct FakeHost {
        catalog: Arc<Mutex<Vec<ToolInfo>>>,
    }

    impl ToolHost for FakeHost {
        fn list_tools(
            &self,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<ToolInfo>, McpError>> + Send + '_>> {
            let tools = self.catalog.lock().unwrap().clone();
            Box::pin(async move { Ok(tools) })
        }

        fn call_tool<'a>(
            &'a self,
            _name: &'a str,
            _arguments: serde_json::Value,
        ) -> Pin<Box<dyn Future<Output = Result<ToolCallResult, McpError>> + Send + 'a>> {
            Box::pin(async { Ok(ToolCallResult::default()) })
        }

        fn shutdown(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
            Box::pin(async {})
        }
    }

    fn tool(name: &str) -> ToolInfo {
        ToolInfo {
            name: name.to_string(),
            description: None,
            input_schema: None,
        }
    }

    fn connection(name: &str, tools: &[&str]) -> LiveConnection {
        connection_with_handle(name, tools).0
    }

    fn connection_with_handle(
        name: &str,
        tools: &[&str],
    ) -> (LiveConnection, Arc<Mutex<Vec<ToolInfo>>>) {
        let catalog: Vec<ToolInfo> = tools.iter().map(|t| tool(t)).collect();
        let served = Arc::new(Mutex::new(catalog.clone()));
        let connection = LiveConnection::new(
            EndpointDescriptor {
                name: name.to_string(),
                kind: EndpointKind::Url {
                    url: "http://localhost/".to_string(),
                },
                timeout_ms: 1000,
            },
            Box::new(FakeHost {
                catalog: Arc::clone(&served),
            }),
            catalog,
        );
        (connection, served)
    }

    #[test]
    fn lookup_and_list_keep_insertion_order() {
        let mut registry = ServerRegistry::new();
        registry.insert(connection("mathy", &["get-random", "add"])).unwrap();
        registry.insert(connection("remote", &["get-random"])).unwrap();

        assert_eq!(registry.list(), vec!["mathy", "remote"]);
        assert!(registry.lookup("mathy").unwrap().has_tool("add"));
        assert!(!registry.lookup("remote").unwrap().has_tool("add"));
        assert!(registry.lookup("nope").is_none());
        assert_eq!(registry.tools_of("mathy").unwrap().len(), 2);
        assert!(registry.tools_of("nope").is_none());
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let mut registry = ServerRegistry::new();
        registry.insert(connection("mathy", &[])).unwrap();
        let err = registry.insert(connection("mathy", &[])).err().unwrap();
        assert!(matches!(err, McpError::DuplicateEndpoint { .. }));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn refresh_replaces_catalog() {
        let mut registry = ServerRegistry::new();
        let (conn, served) = connection_with_handle("mathy", &["get-random"]);
        registry.insert(conn).unwrap();
        assert!(!registry.lookup("mathy").unwrap().has_tool("add"));

        served.lock().unwrap().push(tool("add"));

        assert_eq!(registry.refresh("mathy").await.unwrap(), 2);
        assert!(registry.lookup("mathy").unwrap().has_tool("add"));
    }

    #[tokio::test]
    async fn refresh_unknown_endpoint() {
        let mut registry = ServerRegistry::new();
        assert!(matches!(
            registry.refresh("ghost").await,
            Err(McpError::UnknownEndpoint { .. })
        ));
    }

    #[tokio::test]
    async fn connect_all_collects_failures() {
        let descriptors = vec![EndpointDescriptor {
            name: "ghost".to_string(),
            kind: EndpointKind::Stdio(crate::config::StdioLaunch {
                command: "this_command_does_not_exist_xyz123".to_string(),
                args: vec![],
                cwd: None,
                env: Default::default(),
            }),
            timeout_ms: 1000,
        }];
        let (registry, failures) = ServerRegistry::connect_all(&descriptors).await;
        assert!(registry.is_empty());
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].endpoint, "ghost");
        registry.shutdown().await;
    }
}
