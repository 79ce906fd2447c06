//! Task tracking and cooperative shutdown.
//!
//! Every actor spawned through [`ActorSystem::spawn`] watches the same
//! cancellation token; [`ActorSystem::run_until_shutdown`] waits for Ctrl-C,
//! an explicit [`ShutdownHandle::signal`], or any actor exiting, then joins
//! everything it spawned.
use crate::actor::{spawn_actor_with_shutdown, Actor, Addr};
use anyhow::Result;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Cloneable trigger and watch point for the shared shutdown signal.
#[derive(Clone, Default)]
pub struct ShutdownHandle {
    token: CancellationToken,
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signal(&self) {
        self.token.cancel();
    }

    pub fn is_signalled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once [`signal`](Self::signal) has been called.
    pub async fn signalled(&self) {
        self.token.cancelled().await
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

#[derive(Default)]
pub struct ActorSystem {
    joinset: JoinSet<Result<()>>,
    shutdown: ShutdownHandle,
}

impl ActorSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Spawn an actor bound to this system's shutdown signal.
    ///
    /// When the actor exits for any reason the whole system is signalled,
    /// so [`run_until_shutdown`](Self::run_until_shutdown) never outlives it.
    pub fn spawn<A: Actor>(&mut self, name: &'static str, actor: A, mailbox: usize) -> Addr<A> {
        let handle = spawn_actor_with_shutdown(actor, mailbox, Some(self.shutdown.token()));
        let shutdown = self.shutdown.clone();
        self.joinset.spawn(async move {
            let res = handle.task.await;
            shutdown.signal();
            let res = res?;
            tracing::debug!(actor = name, ok = res.is_ok(), "actor.exit");
            res
        });
        handle.addr
    }

    /// Signal shutdown and wait for every tracked task. The first failure wins.
    pub async fn graceful_shutdown(mut self) -> Result<()> {
        self.shutdown.signal();
        let mut first_err = None;
        while let Some(res) = self.joinset.join_next().await {
            let outcome = res.map_err(anyhow::Error::from).and_then(|r| r);
            if let Err(e) = outcome {
                tracing::error!(error = ?e, "task failed during shutdown");
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Block until Ctrl-C or an explicit signal, then shut down gracefully.
    pub async fn run_until_shutdown(self) -> Result<()> {
        let shutdown = self.shutdown.clone();
        tokio::select! {
            _ = tokio::signal::ctrl_c() => tracing::info!("ctrl-c received"),
            _ = shutdown.signalled() => tracing::debug!("shutdown signalled"),
        }
        self.graceful_shutdown().await
    }
}
