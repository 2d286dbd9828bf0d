use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute, queue,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor},
    terminal::{self, ClearType},
};
use std::io::{self, Write};
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

use crate::display::{Input, Surface};
use crate::error::RenderError;

const TERM_X: u16 = 1;
const TERM_Y: u16 = 0;

/// Alternate-screen terminal surface.
pub struct Renderer {
    cols: u16,
    rows: u16,
}

impl Renderer {
    pub fn setup() -> Result<Self, RenderError> {
        terminal::enable_raw_mode().map_err(RenderError::Init)?;
        if let Err(e) = execute!(io::stdout(), terminal::EnterAlternateScreen, cursor::Hide) {
            let _ = terminal::disable_raw_mode();
            return Err(RenderError::Init(e));
        }
        let (cols, rows) = terminal::size().unwrap_or((80, 24));
        Ok(Renderer { cols, rows })
    }

    pub fn teardown(&self) -> io::Result<()> {
        execute!(io::stdout(), cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()?;
        Ok(())
    }
}

impl Surface for Renderer {
    fn resize(&mut self, cols: u16, rows: u16) {
        self.cols = cols;
        self.rows = rows;
    }

    fn draw(&mut self, banner: &str, status: &str) -> io::Result<()> {
        let width = self.cols.saturating_sub(TERM_X) as usize;
        let mut stdout = io::stdout();

        queue!(
            stdout,
            terminal::Clear(ClearType::All),
            cursor::MoveTo(TERM_X, TERM_Y),
            SetForegroundColor(Color::White),
            SetAttribute(Attribute::Bold),
            Print(clip(banner, width)),
            SetAttribute(Attribute::Reset),
            ResetColor,
        )?;

        for (row, line) in (TERM_Y + 1..self.rows).zip(status.lines()) {
            // Key hints are dimmed.
            let color = if line.starts_with('[') {
                Color::DarkGrey
            } else {
                Color::Reset
            };
            queue!(
                stdout,
                cursor::MoveTo(TERM_X, row),
                SetForegroundColor(color),
                Print(clip(line, width)),
                ResetColor,
            )?;
        }

        stdout.flush()
    }
}

fn clip(line: &str, width: usize) -> String {
    line.chars().take(width).collect()
}

/// Maps a terminal event to a countdown input.
pub fn map_event(event: Event) -> Option<Input> {
    match event {
        Event::Key(KeyEvent {
            kind: KeyEventKind::Release,
            ..
        }) => None,
        Event::Key(KeyEvent {
            code: KeyCode::Char('c'),
            modifiers,
            ..
        }) if modifiers.contains(KeyModifiers::CONTROL) => Some(Input::Quit),
        Event::Key(KeyEvent {
            code: KeyCode::Char('q') | KeyCode::Esc,
            ..
        }) => Some(Input::Quit),
        Event::Key(KeyEvent {
            code: KeyCode::Char('r'),
            ..
        }) => Some(Input::Restart),
        Event::Resize(cols, rows) => Some(Input::Resize(cols, rows)),
        _ => None,
    }
}

/// Reads terminal events on a dedicated thread (crossterm reads block) and
/// forwards them until the receiver goes away.
pub fn spawn_input_reader(tx: mpsc::UnboundedSender<Input>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        while !tx.is_closed() {
            if !event::poll(Duration::from_millis(50)).unwrap_or(false) {
                continue;
            }
            let Ok(event) = event::read() else {
                continue;
            };
            if let Some(input) = map_event(event) {
                if tx.send(input).is_err() {
                    break;
                }
            }
        }
        debug!("input reader stopped");
    })
}
