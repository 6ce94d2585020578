use thiserror::Error;

use crate::core::types::{AgentId, OrderId};
use crate::simulation::orders::OrderStatus;

#[derive(Error, Debug)]
pub enum TavernError {
    #[error("Agent not found: {0}")]
    AgentNotFound(AgentId),

    #[error("Order not found: {0:?}")]
    OrderNotFound(OrderId),

    #[error("Order already handed in: {0:?}")]
    AlreadyHandedIn(OrderId),

    #[error("Order {order:?} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        order: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TavernError>;
