use crate::{
    command::{Command, parse_command},
    input::InputLine,
    view::{self, ViewSnap},
};
use anyhow::Result;
use async_trait::async_trait;
use crossterm::{
    event::{Event as CtEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use prospector_actors::{
    actor::{Actor, Addr, Context},
    system::ShutdownHandle,
};
use prospector_search::{SearchCompletion, SearchOrchestrator, SearchRequest, SearchState};
use ratatui::{Terminal, backend::CrosstermBackend, layout::Rect};
use std::{
    io::{self, Stdout},
    time::{Duration, Instant},
};

const BRAILLE_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

pub enum TuiMsg {
    InputEvent(CtEvent),
    Tick,
    SearchDone(SearchCompletion),
    OpError(String),
    Shutdown,
}

/// What a key press asks the actor to do beyond editing its own state.
#[derive(Debug, PartialEq)]
enum KeyAction {
    Submit(String),
    Quit,
}

/// Owns the terminal and the search orchestrator; every state change happens
/// inside `handle`, so nothing else touches either.
pub struct TuiActor {
    orchestrator: SearchOrchestrator,

    // terminal
    term: Terminal<CrosstermBackend<Stdout>>,
    tick_rate: Duration,
    last_tick: Instant,
    restored: bool,

    // ui state
    input: InputLine,
    use_location: bool,
    scroll: usize,
    show_help: bool,
    notice: Option<String>,
    dirty: bool,
    spin_idx: usize,

    shutdown: ShutdownHandle,
}

impl TuiActor {
    pub fn new(
        orchestrator: SearchOrchestrator,
        use_location: bool,
        shutdown: ShutdownHandle,
    ) -> Result<Self> {
        enable_raw_mode()?;
        let term = match open_terminal() {
            Ok(term) => term,
            Err(e) => {
                disable_raw_mode().ok();
                let _ = execute!(io::stdout(), LeaveAlternateScreen);
                return Err(e);
            }
        };

        Ok(Self {
            orchestrator,
            term,
            tick_rate: Duration::from_millis(80),
            last_tick: Instant::now(),
            restored: false,
            input: InputLine::default(),
            use_location,
            scroll: 0,
            show_help: false,
            notice: Some("Type a business search and press Enter.".into()),
            dirty: true,
            spin_idx: 0,
            shutdown,
        })
    }

    fn restore_terminal(&mut self) {
        if self.restored {
            return;
        }
        self.restored = true;
        disable_raw_mode().ok();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        let _ = self.term.show_cursor();
    }

    fn spinner(&self) -> &'static str {
        if self.orchestrator.state().is_loading() {
            BRAILLE_FRAMES[self.spin_idx % BRAILLE_FRAMES.len()]
        } else {
            " "
        }
    }

    fn step_spinner(&mut self) {
        if self.orchestrator.state().is_loading() {
            self.spin_idx = (self.spin_idx + 1) % BRAILLE_FRAMES.len();
            self.dirty = true;
        }
    }

    fn draw(&mut self) -> Result<()> {
        let snap = ViewSnap {
            input: self.input.text().to_string(),
            input_cursor: self.input.cursor(),
            use_location: self.use_location,
            state: self.orchestrator.state().clone(),
            scroll: self.scroll,
            spinner: self.spinner(),
            show_help: self.show_help,
            notice: self.notice.clone(),
        };

        view::draw(&mut self.term, &snap)
    }

    fn set_location(&mut self, on: bool) {
        self.use_location = on;
        self.notice = Some(if on {
            "Location will be attached to searches.".into()
        } else {
            "Location is off.".into()
        });
        self.dirty = true;
    }

    /// Move the results window, never past the last screenful.
    fn scroll_by(&mut self, delta: isize) {
        let max = match (self.orchestrator.state(), self.term.size()) {
            (SearchState::Success(result), Ok(size)) => {
                view::max_scroll(result, Rect::new(0, 0, size.width, size.height))
            }
            _ => 0,
        };
        self.scroll = scrolled(self.scroll, delta, max);
    }

    fn handle_key(&mut self, key: KeyEvent) -> Option<KeyAction> {
        if key.kind == KeyEventKind::Release {
            return None;
        }
        self.show_help = false;
        self.dirty = true;

        match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL)
            | (KeyCode::Char('q'), KeyModifiers::CONTROL) => return Some(KeyAction::Quit),
            (KeyCode::Char('l'), KeyModifiers::CONTROL) | (KeyCode::Tab, _) => {
                self.set_location(!self.use_location);
            }
            (KeyCode::Enter, _) => return Some(KeyAction::Submit(self.input.text().to_string())),
            (KeyCode::PageUp, _) => self.scroll_by(-5),
            (KeyCode::PageDown, _) => self.scroll_by(5),
            (KeyCode::Up, _) => self.scroll_by(-1),
            (KeyCode::Down, _) => self.scroll_by(1),
            (KeyCode::Left, _) => self.input.left(),
            (KeyCode::Right, _) => self.input.right(),
            (KeyCode::Home, _) => self.input.home(),
            (KeyCode::End, _) => self.input.end(),
            (KeyCode::Backspace, _) => self.input.backspace(),
            (KeyCode::Delete, _) => self.input.delete(),
            (KeyCode::Esc, _) => self.input.clear(),
            (KeyCode::Char(ch), m) if !m.contains(KeyModifiers::CONTROL) => self.input.insert(ch),
            _ => {}
        }
        None
    }

    fn route_submit(&mut self, line: String, me: Addr<TuiActor>) {
        let query = line.trim();
        if query.is_empty() {
            return;
        }

        if query.starts_with('/') {
            let cmd = parse_command(query);
            self.input.clear();
            self.handle_command(cmd, me);
            return;
        }

        self.start_search(SearchRequest::new(query, self.use_location), me);
    }

    fn start_search(&mut self, request: SearchRequest, me: Addr<TuiActor>) {
        let ticket = self.orchestrator.begin();
        let task = self.orchestrator.search_task(ticket, request);
        self.scroll = 0;
        self.notice = None;
        self.dirty = true;

        tokio::spawn(async move {
            let completion = task.await;
            if me.send(TuiMsg::SearchDone(completion)).await.is_err() {
                tracing::debug!("tui gone before search completed");
            }
        });
    }

    fn handle_command(&mut self, cmd: Command, me: Addr<TuiActor>) {
        match cmd {
            Command::Quit => {
                let _ = me.try_send(TuiMsg::Shutdown);
            }
            Command::Help => self.show_help = true,
            Command::Location(Some(on)) => self.set_location(on),
            Command::Location(None) => {
                let state = if self.use_location { "on" } else { "off" };
                self.notice = Some(format!("Location is {state}. Use /location on|off."));
            }
            Command::Unknown(s) => {
                self.notice = Some(format!("Unknown command: {s}. Try /help."));
            }
        }
        self.dirty = true;
    }
}

fn open_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut term = Terminal::new(CrosstermBackend::new(stdout))?;
    term.clear()?;
    Ok(term)
}

fn scrolled(current: usize, delta: isize, max: usize) -> usize {
    current.saturating_add_signed(delta).min(max)
}

#[async_trait]
impl Actor for TuiActor {
    type Msg = TuiMsg;

    async fn handle(&mut self, msg: Self::Msg, ctx: &mut Context<Self>) -> Result<()> {
        match msg {
            TuiMsg::InputEvent(CtEvent::Key(key)) => match self.handle_key(key) {
                Some(KeyAction::Submit(line)) => self.route_submit(line, ctx.addr()),
                Some(KeyAction::Quit) => {
                    let _ = ctx.addr().try_send(TuiMsg::Shutdown);
                }
                None => {}
            },
            TuiMsg::InputEvent(CtEvent::Resize(_, _)) => self.dirty = true,
            TuiMsg::InputEvent(_) => {}
            TuiMsg::SearchDone(completion) => {
                if self.orchestrator.complete(completion) {
                    self.dirty = true;
                }
            }
            TuiMsg::OpError(e) => {
                tracing::warn!(error = %e, "tui.op_error");
                self.notice = Some(format!("Error: {e}"));
                self.dirty = true;
            }
            TuiMsg::Tick => {
                self.step_spinner();
                if self.dirty || self.last_tick.elapsed() >= self.tick_rate {
                    self.draw()?;
                    self.last_tick = Instant::now();
                    self.dirty = false;
                }
            }
            TuiMsg::Shutdown => {
                self.restore_terminal();
                self.shutdown.signal();
                ctx.stop();
            }
        }

        Ok(())
    }

    async fn stopped(&mut self) {
        self.restore_terminal();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrolling_stays_within_results() {
        assert_eq!(scrolled(0, -1, 10), 0);
        assert_eq!(scrolled(8, 5, 10), 10);
        assert_eq!(scrolled(10, 5, 10), 10);
        // Up responds immediately after overscrolling with PgDn.
        assert_eq!(scrolled(scrolled(10, 5, 10), -1, 10), 9);
        assert_eq!(scrolled(40, -1, 3), 3);
    }
}
