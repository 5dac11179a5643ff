//! Gremlin Explorer Gremlin - WebSocket transport
//!
//! Implements `GraphSession` against a Gremlin Server compatible endpoint
//! such as Azure Cosmos DB's Gremlin API.

use async_trait::async_trait;
use gex_core::{ConnectionError, GraphSession, GremlinConfig, SessionFactory};
use std::sync::Once;

pub mod graphson;
pub mod protocol;
pub mod session;

pub use session::GremlinSession;

/// Opens one `GremlinSession` per call, validating configuration first
#[derive(Debug, Clone)]
pub struct GremlinSessionFactory {
    config: GremlinConfig,
}

impl GremlinSessionFactory {
    pub fn new(config: GremlinConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SessionFactory for GremlinSessionFactory {
    async fn open(&self, collection: &str) -> Result<Box<dyn GraphSession>, ConnectionError> {
        let target = self.config.target(collection)?;
        Ok(Box::new(GremlinSession::open(target).await?))
    }

    fn name(&self) -> &str {
        "gremlin"
    }
}

/// rustls needs a process-wide crypto provider before the first TLS handshake
pub(crate) fn install_crypto_provider() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        // Err means another provider was installed first, which is fine
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
