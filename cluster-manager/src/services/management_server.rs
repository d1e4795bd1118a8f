//! Management listener
//!
//! Serves a registry to out-of-process test harnesses over TCP. A connection
//! may carry any number of request/response exchanges; each request frame is
//! answered by exactly one response frame.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use shared::{process_debug, process_info, process_warn, ManagementRequest, ManagementResponse, ProcessId};

use crate::core::{ManagementNamespace, ObjectName};
use crate::error::{ClusterResult, SetupError};
use crate::services::wire::{read_frame, write_frame};
use crate::traits::{NodeRegistry, NodeTerminator};

/// Pause before accepting again after a failed `accept`
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

struct ServerInner {
    name: ObjectName,
    registry: Arc<dyn NodeRegistry>,
    terminator: Option<Arc<dyn NodeTerminator>>,
}

/// TCP front end for a bound registry
pub struct ManagementServer {
    inner: Arc<ServerInner>,
    accept_task: Mutex<Option<JoinHandle<()>>>,
}

impl ManagementServer {
    pub fn new(name: ObjectName, registry: Arc<dyn NodeRegistry>) -> Self {
        Self {
            inner: Arc::new(ServerInner {
                name,
                registry,
                terminator: None,
            }),
            accept_task: Mutex::new(None),
        }
    }

    /// Serve the test cluster manager bound in `namespace`
    pub async fn for_test_cluster_manager(namespace: &ManagementNamespace) -> Result<Self, SetupError> {
        let name = ObjectName::test_cluster_manager();
        let registry = namespace
            .lookup(&name)
            .await
            .ok_or_else(|| SetupError::NotBound { name: name.to_string() })?;
        Ok(Self::new(name, registry))
    }

    /// Install the hook used to answer `TerminateNode` requests (fluent API)
    ///
    /// Must be called before `start`.
    pub fn with_terminator(self, terminator: Arc<dyn NodeTerminator>) -> Self {
        let inner = ServerInner {
            name: self.inner.name.clone(),
            registry: Arc::clone(&self.inner.registry),
            terminator: Some(terminator),
        };
        Self {
            inner: Arc::new(inner),
            accept_task: Mutex::new(None),
        }
    }

    /// Bind the listener and start accepting connections
    ///
    /// Returns the bound address, which differs from `addr` when port 0 was requested.
    pub async fn start(&self, addr: SocketAddr) -> ClusterResult<SocketAddr> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| SetupError::Bind { addr, source })?;
        let local_addr = listener.local_addr()?;

        let handle = tokio::spawn(accept_loop(Arc::clone(&self.inner), listener));

        let mut task = self.accept_task.lock().await;
        if let Some(previous) = task.replace(handle) {
            previous.abort();
        }

        process_info!(ProcessId::current(), "🌐 Management listener for {} on {}", self.inner.name, local_addr);
        Ok(local_addr)
    }

    /// Answer a single request against the served registry
    pub async fn handle_request(&self, request: ManagementRequest) -> ManagementResponse {
        dispatch(&self.inner, request).await
    }

    pub async fn is_running(&self) -> bool {
        self.accept_task
            .lock()
            .await
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Stop accepting connections
    pub async fn shutdown(&self) {
        if let Some(task) = self.accept_task.lock().await.take() {
            task.abort();
            process_debug!(ProcessId::current(), "🛑 Management listener stopped");
        }
    }
}

impl Drop for ManagementServer {
    fn drop(&mut self) {
        if let Some(task) = self.accept_task.get_mut().take() {
            task.abort();
        }
    }
}

/// Source of incoming management connections
trait Acceptor: Send + 'static {
    fn accept(&mut self) -> impl Future<Output = std::io::Result<(TcpStream, SocketAddr)>> + Send;
}

impl Acceptor for TcpListener {
    fn accept(&mut self) -> impl Future<Output = std::io::Result<(TcpStream, SocketAddr)>> + Send {
        TcpListener::accept(self)
    }
}

async fn accept_loop<A: Acceptor>(inner: Arc<ServerInner>, mut acceptor: A) {
    loop {
        match acceptor.accept().await {
            Ok((stream, peer)) => {
                let inner = Arc::clone(&inner);
                tokio::spawn(async move {
                    if let Err(e) = serve_connection(inner, stream).await {
                        process_warn!(ProcessId::current(), "⚠️ Management connection from {} failed: {}", peer, e);
                    }
                });
            }
            Err(e) => {
                process_warn!(ProcessId::current(), "⚠️ Management accept failed: {}", e);
                // Persistent errors such as EMFILE would otherwise spin
                tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
            }
        }
    }
}

async fn serve_connection(inner: Arc<ServerInner>, mut stream: TcpStream) -> ClusterResult<()> {
    while let Some(request) = read_frame::<_, ManagementRequest>(&mut stream).await? {
        let response = dispatch(&inner, request).await;
        write_frame(&mut stream, &response).await?;
    }
    Ok(())
}

async fn dispatch(inner: &ServerInner, request: ManagementRequest) -> ManagementResponse {
    let registry = &inner.registry;
    match request {
        ManagementRequest::RegisterNode(entry) => {
            registry
                .register_node(
                    entry.node_id,
                    entry.working_directory,
                    entry.config_directory,
                    entry.naming_port,
                    entry.rmi_port,
                )
                .await;
            ManagementResponse::Ack
        }
        ManagementRequest::UnregisterNode(node_id) => {
            registry.unregister_node(&node_id).await;
            ManagementResponse::Ack
        }
        ManagementRequest::GetNode(node_id) => ManagementResponse::Node(registry.get_node(&node_id).await),
        ManagementRequest::ListNodes => ManagementResponse::Nodes(registry.list_nodes().await),
        ManagementRequest::TerminateNode(node_id) => match &inner.terminator {
            Some(terminator) => ManagementResponse::Terminated(terminator.terminate_node(&node_id).await),
            None => ManagementResponse::Error {
                message: format!("{} cannot terminate node {}: no process owner attached", inner.name, node_id),
            },
        },
        ManagementRequest::Ping => ManagementResponse::Pong {
            name: inner.name.to_string(),
        },
    }
}
