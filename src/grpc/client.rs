//! gRPC client for streaming to the gateway

use anyhow::Result;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::transport::Channel;
use tracing::{info, warn};

use super::wsgateway::{ws_gateway_client::WsGatewayClient, BridgeStatus, ReadingEvent};

/// Streaming gateway client with automatic reconnection
pub struct StreamingGatewayClient {
    gateway_url: String,
}

impl StreamingGatewayClient {
    pub fn new(gateway_url: &str) -> Self {
        Self {
            gateway_url: gateway_url.to_string(),
        }
    }

    /// Connect to gateway with retry
    async fn connect_with_retry(&self, stream_name: &str) -> Channel {
        info!("[{}] Connecting to gateway: {}", stream_name, self.gateway_url);
        loop {
            match Channel::from_shared(self.gateway_url.clone()) {
                Ok(endpoint) => match endpoint.connect().await {
                    Ok(ch) => {
                        info!("[{}] Connected to gateway successfully", stream_name);
                        return ch;
                    }
                    Err(e) => {
                        warn!(
                            "[{}] Failed to connect to gateway: {}. Retrying in 2s...",
                            stream_name, e
                        );
                    }
                },
                Err(e) => {
                    warn!(
                        "[{}] Invalid gateway URL: {}. Retrying in 2s...",
                        stream_name, e
                    );
                }
            }
            tokio::time::sleep(tokio::time::Duration::from_secs(2)).await;
        }
    }

    /// Stream reading events to gateway (takes ownership of receiver)
    pub async fn stream_readings(&self, rx: mpsc::Receiver<ReadingEvent>) -> Result<()> {
        let channel = self.connect_with_retry("Readings").await;
        let mut client = WsGatewayClient::new(channel);
        info!("[Readings] Starting stream to gateway...");
        let stream = ReceiverStream::new(rx);

        match client.stream_readings(stream).await {
            Ok(response) => {
                info!("[Readings] Stream ended: {:?}", response.into_inner());
                Ok(())
            }
            Err(e) => {
                warn!("[Readings] Stream error: {}", e);
                Err(e.into())
            }
        }
    }

    /// Stream bridge status to gateway
    pub async fn stream_status(&self, rx: mpsc::Receiver<BridgeStatus>) -> Result<()> {
        let channel = self.connect_with_retry("Status").await;
        let mut client = WsGatewayClient::new(channel);
        info!("[Status] Starting stream to gateway...");
        let stream = ReceiverStream::new(rx);

        match client.stream_status(stream).await {
            Ok(response) => {
                info!("[Status] Stream ended: {:?}", response.into_inner());
                Ok(())
            }
            Err(e) => {
                warn!("[Status] Stream error: {}", e);
                Err(e.into())
            }
        }
    }
}
