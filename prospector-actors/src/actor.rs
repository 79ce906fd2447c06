use anyhow::Result;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;

/// Minimal actor trait. `Self: Sized` keeps `Context<Self>` usable.
#[async_trait::async_trait]
pub trait Actor: Send + Sized + 'static {
    type Msg: Send + 'static;

    /// Handle a single message. Return `Err` to stop the actor.
    async fn handle(&mut self, msg: Self::Msg, ctx: &mut Context<Self>) -> Result<()>;

    /// Runs once after the mailbox loop exits, whatever the reason.
    async fn stopped(&mut self) {}
}

/// Runtime context for an actor instance.
pub struct Context<A: Actor> {
    addr: Addr<A>,
    stop: bool,
}

impl<A: Actor> Context<A> {
    /// This actor's own address, e.g. for tasks that report back.
    pub fn addr(&self) -> Addr<A> {
        self.addr.clone()
    }

    /// Stop after the current message.
    pub fn stop(&mut self) {
        self.stop = true;
    }
}

/// Address for sending messages to an actor.
pub struct Addr<A: Actor>(mpsc::Sender<A::Msg>);

// Manual impl: a derive would require `A: Clone`.
impl<A: Actor> Clone for Addr<A> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<A: Actor> Addr<A> {
    /// Send, waiting for mailbox space. Hands the message back if the actor is gone.
    pub async fn send(&self, msg: A::Msg) -> std::result::Result<(), A::Msg> {
        self.0.send(msg).await.map_err(|e| e.0)
    }

    /// Send without waiting. Hands the message back if the mailbox is full or closed.
    pub fn try_send(&self, msg: A::Msg) -> std::result::Result<(), A::Msg> {
        self.0.try_send(msg).map_err(|e| e.into_inner())
    }

    /// Send from a non-async thread, blocking until there is space.
    ///
    /// Panics if called from within an async runtime context.
    pub fn blocking_send(&self, msg: A::Msg) -> std::result::Result<(), A::Msg> {
        self.0.blocking_send(msg).map_err(|e| e.0)
    }

    pub fn is_closed(&self) -> bool {
        self.0.is_closed()
    }

    pub fn capacity(&self) -> usize {
        self.0.max_capacity()
    }
}

/// Handle to a running actor task.
pub struct ActorHandle<A: Actor> {
    pub addr: Addr<A>,
    pub task: JoinHandle<Result<()>>,
}

/// Spawn an actor with a bounded mailbox.
///
/// The actor stops when `handle` returns `Err` or calls `ctx.stop()`.
/// Its context holds an `Addr`, so dropping outside addresses alone does
/// not end it.
///
/// ```
/// # use anyhow::Result;
/// # use async_trait::async_trait;
/// # use prospector_actors::actor::{self, Actor, Context};
/// struct Tally(u32);
///
/// #[async_trait]
/// impl Actor for Tally {
///     type Msg = u32;
///     async fn handle(&mut self, msg: u32, ctx: &mut Context<Self>) -> Result<()> {
///         self.0 += msg;
///         if self.0 >= 5 {
///             ctx.stop();
///         }
///         Ok(())
///     }
/// }
///
/// let rt = tokio::runtime::Runtime::new().unwrap();
/// rt.block_on(async {
///     let actor::ActorHandle { addr, task } = actor::spawn_actor(Tally(0), 8);
///     assert_eq!(addr.capacity(), 8);
///     addr.send(2).await.unwrap();
///     addr.send(3).await.unwrap();
///     task.await.unwrap().unwrap();
/// });
/// ```
pub fn spawn_actor<A: Actor>(actor: A, capacity: usize) -> ActorHandle<A> {
    spawn_actor_with_shutdown(actor, capacity, None)
}

/// Like [`spawn_actor`], but also stops when `shutdown` is cancelled.
pub fn spawn_actor_with_shutdown<A: Actor>(
    actor: A,
    capacity: usize,
    shutdown: Option<CancellationToken>,
) -> ActorHandle<A> {
    let (tx, rx) = mpsc::channel::<A::Msg>(capacity);
    let addr = Addr(tx);
    let ctx = Context {
        addr: addr.clone(),
        stop: false,
    };
    let task = tokio::spawn(run_mailbox(actor, ctx, rx, shutdown.unwrap_or_default()));
    ActorHandle { addr, task }
}

async fn run_mailbox<A: Actor>(
    mut actor: A,
    mut ctx: Context<A>,
    mut rx: mpsc::Receiver<A::Msg>,
    shutdown: CancellationToken,
) -> Result<()> {
    let result = loop {
        let msg = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break Ok(()),
            msg = rx.recv() => msg,
        };
        let Some(msg) = msg else {
            break Ok(());
        };
        if let Err(e) = actor.handle(msg, &mut ctx).await {
            tracing::error!(target: "prospector-actors", error = ?e, "actor returned error; stopping");
            break Err(e);
        }
        if ctx.stop {
            break Ok(());
        }
    };
    actor.stopped().await;
    result
}
