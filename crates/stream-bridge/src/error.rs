use std::time::Duration;

use thiserror::Error;
use tokio_tungstenite::tungstenite;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("upstream stream endpoint refused the connection: {0}")]
    Connect(#[from] tungstenite::Error),
    #[error("upstream stream endpoint did not answer within {0:?}")]
    ConnectTimeout(Duration),
}
