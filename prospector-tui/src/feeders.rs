use crate::tui::{TuiActor, TuiMsg};
use crossterm::event;
use prospector_actors::actor::Addr;
use prospector_actors::system::ShutdownHandle;
use std::time::Duration;
use tokio::time;

const INPUT_POLL: Duration = Duration::from_millis(100);
const TICK: Duration = Duration::from_millis(80);

/// Start the terminal input reader and the redraw ticker.
///
/// The reader lives on one blocking thread and polls so it can notice
/// shutdown between events.
pub fn spawn_tui_feeders(tui: Addr<TuiActor>, shutdown: ShutdownHandle) {
    let tui_in = tui.clone();
    let input_shutdown = shutdown.clone();
    tokio::task::spawn_blocking(move || {
        while !input_shutdown.is_signalled() {
            match event::poll(INPUT_POLL) {
                Ok(false) => continue,
                Ok(true) => {}
                Err(e) => {
                    let _ = tui_in.blocking_send(TuiMsg::OpError(format!("input: {e}")));
                    break;
                }
            }
            let msg = match event::read() {
                Ok(ev) => TuiMsg::InputEvent(ev),
                Err(e) => TuiMsg::OpError(format!("input: {e}")),
            };
            if tui_in.blocking_send(msg).is_err() {
                break;
            }
        }
        tracing::debug!("tui input reader stopped");
    });

    tokio::spawn(async move {
        let mut interval = time::interval(TICK);
        loop {
            tokio::select! {
                _ = shutdown.signalled() => break,
                _ = interval.tick() => {
                    let _ = tui.try_send(TuiMsg::Tick);
                }
            }
        }
    });
}
