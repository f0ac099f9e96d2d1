//! `QuizforgeServer` builder and server loop.
//!
//! This is the entry point for running a quiz server. It ties together all
//! the layers: transport → protocol → registry → engine.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use quizforge_engine::{EngineConfig, GameEngine, NoopArchive, QuizStore, SessionArchive};
use quizforge_protocol::{Codec, JsonCodec};
use quizforge_registry::ConnectionRegistry;
use quizforge_transport::{Transport, TransportError, WebSocketTransport};

use crate::handler::handle_connection;
use crate::router::MessageRouter;
use crate::QuizforgeError;

/// How often evicted sessions are swept out of the session index.
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Builder for configuring and starting a Quizforge server.
///
/// # Example
///
/// ```rust,ignore
/// use quizforge::prelude::*;
///
/// let quizzes = InMemoryQuizStore::from_json(&catalogue)?;
/// let server = QuizforgeServer::builder()
///     .bind("0.0.0.0:8080")
///     .build(quizzes)
///     .await?;
/// server.run().await
/// ```
pub struct QuizforgeServerBuilder {
    bind_addr: String,
    engine_config: EngineConfig,
    archive: Arc<dyn SessionArchive>,
    sweep_interval: Duration,
}

impl QuizforgeServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            engine_config: EngineConfig::default(),
            archive: Arc::new(NoopArchive),
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the engine configuration.
    pub fn engine_config(mut self, config: EngineConfig) -> Self {
        self.engine_config = config;
        self
    }

    /// Sets where created and finished sessions are archived.
    pub fn archive(mut self, archive: impl SessionArchive) -> Self {
        self.archive = Arc::new(archive);
        self
    }

    /// Sets how often evicted sessions are purged from the index.
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Binds the listener and assembles the server around `quizzes`.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build<Q: QuizStore>(
        self,
        quizzes: Q,
    ) -> Result<QuizforgeServer<Q, JsonCodec>, QuizforgeError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let engine = Arc::new(GameEngine::with_config(
            quizzes,
            self.engine_config,
            self.archive,
        ));
        let registry = Arc::new(ConnectionRegistry::new());
        let router = Arc::new(MessageRouter::new(engine, registry, JsonCodec));

        Ok(QuizforgeServer {
            transport,
            router,
            sweep_interval: self.sweep_interval,
        })
    }
}

impl Default for QuizforgeServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Quizforge server.
///
/// Call [`run()`](Self::run) or [`run_until()`](Self::run_until) to start
/// accepting connections.
pub struct QuizforgeServer<Q, C> {
    transport: WebSocketTransport,
    router: Arc<MessageRouter<Q, C>>,
    sweep_interval: Duration,
}

impl QuizforgeServer<(), ()> {
    /// Creates a new builder.
    pub fn builder() -> QuizforgeServerBuilder {
        QuizforgeServerBuilder::new()
    }
}

impl<Q, C> QuizforgeServer<Q, C>
where
    Q: QuizStore,
    C: Codec,
{
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// The router shared by every connection.
    pub fn router(&self) -> &Arc<MessageRouter<Q, C>> {
        &self.router
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), QuizforgeError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` resolves.
    ///
    /// Connections already accepted keep running; only new ones are
    /// refused.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<(), QuizforgeError>
    where
        F: Future<Output = ()>,
    {
        tracing::info!(addr = ?self.local_addr().ok(), "Quizforge server running");

        let sweeper = tokio::spawn(sweep_loop(Arc::clone(&self.router), self.sweep_interval));
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("shutdown requested");
                    break;
                }
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let router = Arc::clone(&self.router);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(conn, router).await {
                                tracing::debug!(
                                    error = %e,
                                    "connection ended with error"
                                );
                            }
                        });
                    }
                    Err(TransportError::Shutdown) => break,
                    Err(e) if e.is_per_peer() => {
                        tracing::warn!(error = %e, "rejected connection");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
            }
        }

        sweeper.abort();
        self.transport.shutdown().await?;
        tracing::info!("Quizforge server stopped");
        Ok(())
    }
}

/// Periodically drops evicted sessions from the engine's index.
async fn sweep_loop<Q, C>(router: Arc<MessageRouter<Q, C>>, period: Duration)
where
    Q: QuizStore,
    C: Codec,
{
    let mut ticker = tokio::time::interval(period.max(Duration::from_millis(1)));
    // The first tick completes immediately.
    ticker.tick().await;
    loop {
        ticker.tick().await;
        router.engine().purge_finished();
    }
}
