//! Management client used by test harnesses
//!
//! Holds one connection to a launcher's management listener and issues
//! requests over it sequentially.

use std::net::SocketAddr;
use std::path::PathBuf;

use tokio::net::TcpStream;
use tokio::sync::Mutex;

use shared::{ManagementRequest, ManagementResponse, NodeEntry, NodeId};

use crate::error::{ClusterError, ClusterResult};
use crate::services::wire::{read_frame, write_frame};

pub struct ManagementClient {
    address: SocketAddr,
    stream: Mutex<TcpStream>,
}

impl ManagementClient {
    /// Connect to a management listener; no handshake is required
    pub async fn connect(address: SocketAddr) -> ClusterResult<Self> {
        let stream = TcpStream::connect(address).await?;
        Ok(Self {
            address,
            stream: Mutex::new(stream),
        })
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    async fn call(&self, request: ManagementRequest) -> ClusterResult<ManagementResponse> {
        let mut stream = self.stream.lock().await;
        write_frame(&mut *stream, &request).await?;
        match read_frame::<_, ManagementResponse>(&mut *stream).await? {
            Some(ManagementResponse::Error { message }) => Err(ClusterError::Remote { message }),
            Some(response) => Ok(response),
            None => Err(ClusterError::protocol("connection closed before a response arrived")),
        }
    }

    /// Name the remote registry is bound under
    pub async fn ping(&self) -> ClusterResult<String> {
        match self.call(ManagementRequest::Ping).await? {
            ManagementResponse::Pong { name } => Ok(name),
            other => Err(unexpected("Ping", &other)),
        }
    }

    pub async fn register_node(
        &self,
        node_id: impl Into<NodeId>,
        working_directory: impl Into<PathBuf>,
        config_directory: Option<PathBuf>,
        naming_port: u16,
        rmi_port: u16,
    ) -> ClusterResult<()> {
        let entry = NodeEntry::new(node_id, working_directory, config_directory, naming_port, rmi_port);
        match self.call(ManagementRequest::RegisterNode(entry)).await? {
            ManagementResponse::Ack => Ok(()),
            other => Err(unexpected("RegisterNode", &other)),
        }
    }

    pub async fn unregister_node(&self, node_id: &NodeId) -> ClusterResult<()> {
        match self.call(ManagementRequest::UnregisterNode(node_id.clone())).await? {
            ManagementResponse::Ack => Ok(()),
            other => Err(unexpected("UnregisterNode", &other)),
        }
    }

    /// `Ok(None)` when the node is not registered
    pub async fn get_node(&self, node_id: &NodeId) -> ClusterResult<Option<NodeEntry>> {
        match self.call(ManagementRequest::GetNode(node_id.clone())).await? {
            ManagementResponse::Node(entry) => Ok(entry),
            other => Err(unexpected("GetNode", &other)),
        }
    }

    pub async fn list_nodes(&self) -> ClusterResult<Vec<NodeEntry>> {
        match self.call(ManagementRequest::ListNodes).await? {
            ManagementResponse::Nodes(nodes) => Ok(nodes),
            other => Err(unexpected("ListNodes", &other)),
        }
    }

    /// Ask the launcher owning `node_id` to stop its broker process
    pub async fn terminate_node(&self, node_id: &NodeId) -> ClusterResult<bool> {
        match self.call(ManagementRequest::TerminateNode(node_id.clone())).await? {
            ManagementResponse::Terminated(stopped) => Ok(stopped),
            other => Err(unexpected("TerminateNode", &other)),
        }
    }
}

fn unexpected(request: &str, response: &ManagementResponse) -> ClusterError {
    ClusterError::protocol(format!("unexpected response to {request}: {response:?}"))
}
