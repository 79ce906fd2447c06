use anyhow::Result;
use async_trait::async_trait;
use prospector_actors::actor::{Actor, Context};
use prospector_actors::system::ActorSystem;
use std::time::Duration;
use tokio::sync::oneshot;

enum PingMsg {
    Ping(oneshot::Sender<u32>),
    Quit,
}

struct Pinger {
    count: u32,
}

#[async_trait]
impl Actor for Pinger {
    type Msg = PingMsg;

    async fn handle(&mut self, msg: PingMsg, _ctx: &mut Context<Self>) -> Result<()> {
        match msg {
            PingMsg::Ping(reply) => {
                self.count += 1;
                let _ = reply.send(self.count);
            }
            PingMsg::Quit => anyhow::bail!("asked to quit"),
        }
        Ok(())
    }
}

#[tokio::test]
async fn signal_unblocks_run_until_shutdown() {
    let mut system = ActorSystem::new();
    let shutdown = system.shutdown_handle();
    let addr = system.spawn("pinger", Pinger { count: 0 }, 8);

    let (tx, rx) = oneshot::channel();
    assert!(addr.send(PingMsg::Ping(tx)).await.is_ok());
    assert_eq!(rx.await.unwrap(), 1);

    let trigger = shutdown.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.signal();
    });

    tokio::time::timeout(Duration::from_secs(5), system.run_until_shutdown())
        .await
        .expect("shutdown completes")
        .expect("no task failed");
    assert!(shutdown.is_signalled());
}

#[tokio::test]
async fn actor_failure_surfaces_from_graceful_shutdown() {
    let mut system = ActorSystem::new();
    let addr = system.spawn("pinger", Pinger { count: 0 }, 8);
    assert!(addr.send(PingMsg::Quit).await.is_ok());
    tokio::time::timeout(Duration::from_secs(5), async {
        while !addr.is_closed() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("actor exits");

    let err = system.graceful_shutdown().await.expect_err("quit is an error");
    assert!(err.to_string().contains("asked to quit"));
}

#[tokio::test]
async fn failed_actor_ends_run_until_shutdown() {
    let mut system = ActorSystem::new();
    let shutdown = system.shutdown_handle();
    let addr = system.spawn("pinger", Pinger { count: 0 }, 8);
    assert!(addr.send(PingMsg::Quit).await.is_ok());

    let err = tokio::time::timeout(Duration::from_secs(2), system.run_until_shutdown())
        .await
        .expect("actor exit unblocks the system")
        .expect_err("quit is an error");
    assert!(err.to_string().contains("asked to quit"));
    assert!(shutdown.is_signalled());
}
