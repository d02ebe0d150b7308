use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum AckError {
    #[error("broker refused acknowledgement: {0}")]
    Broker(String),
    #[error("channel closed")]
    ChannelClosed,
}

/// Poignée opaque sur une livraison broker : un seul verdict par message.
#[async_trait]
pub trait DeliveryAcker: Send + Sync {
    async fn ack(&self) -> Result<(), AckError>;
    /// Rejet avec remise en file (requeue=true)
    async fn nack_requeue(&self) -> Result<(), AckError>;
}
