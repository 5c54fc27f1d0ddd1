//! Classification client: the pipeline's interface to the external AI
//! model, plus the HTTP gateway implementation.

mod gateway;
mod provider;

pub use gateway::{GatewayClassifier, GatewayConfig};
pub use provider::{ClassificationError, ClassificationProvider};
