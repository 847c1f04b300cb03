use crate::client::{
    AppSnapshot,
    short_address,
};
use color_eyre::eyre::{
    Result,
    eyre,
};
use crossterm::event::{
    Event,
    EventStream,
    KeyCode,
    KeyEventKind,
};
use crossterm::terminal::{
    disable_raw_mode,
    enable_raw_mode,
};
use futures::StreamExt;
use itertools::Itertools;
use ratatui::prelude::*;
use ratatui::widgets::*;
use std::io::stdout;

pub enum UserEvent {
    Quit,
    Connect,
    EnterRound,
    SelectWinner,
    DistributeReward,
    Resync,
    NextAccount,
    Redraw,
}

#[derive(Default)]
pub struct UiState {
    terminal: Option<Terminal<CrosstermBackend<std::io::Stdout>>>,
}

pub type InputEvents = EventStream;

pub fn input_events() -> InputEvents {
    EventStream::new()
}

pub fn terminal_enter(state: &mut UiState) -> Result<()> {
    enable_raw_mode()?;
    crossterm::execute!(
        std::io::stdout(),
        crossterm::terminal::EnterAlternateScreen,
        crossterm::event::EnableMouseCapture
    )?;
    // One persistent Terminal so buffers survive across draws
    let backend = CrosstermBackend::new(stdout());
    let terminal = Terminal::new(backend)?;
    state.terminal = Some(terminal);
    Ok(())
}

pub fn terminal_exit() -> Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(
        std::io::stdout(),
        crossterm::event::DisableMouseCapture,
        crossterm::terminal::LeaveAlternateScreen
    )?;
    Ok(())
}

/// Next raw terminal event off the crossterm stream. Cancel-safe, so it can
/// sit in a `select!` arm next to the poll ticker.
pub async fn next_raw_event(input: &mut InputEvents) -> Result<Event> {
    match input.next().await {
        Some(event) => Ok(event?),
        None => Err(eyre!("terminal input stream closed")),
    }
}

pub fn interpret_event(event: Event) -> Option<UserEvent> {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
            KeyCode::Char('q') | KeyCode::Esc => Some(UserEvent::Quit),
            KeyCode::Char('c') => Some(UserEvent::Connect),
            KeyCode::Char('e') => Some(UserEvent::EnterRound),
            KeyCode::Char('w') => Some(UserEvent::SelectWinner),
            KeyCode::Char('d') => Some(UserEvent::DistributeReward),
            KeyCode::Char('r') => Some(UserEvent::Resync),
            KeyCode::Char('a') => Some(UserEvent::NextAccount),
            _ => None,
        },
        Event::Resize(_, _) => Some(UserEvent::Redraw),
        _ => None,
    }
}

pub fn draw(state: &mut UiState, snap: &AppSnapshot) -> Result<()> {
    if let Some(mut term) = state.terminal.take() {
        term.draw(|f| ui(f, snap))?;
        state.terminal = Some(term);
    }
    Ok(())
}

fn ui(f: &mut Frame, snap: &AppSnapshot) {
    f.render_widget(Clear, f.area());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),  // session status
            Constraint::Min(6),     // players
            Constraint::Min(6),     // past winners
            Constraint::Length(6),  // messages + help
        ])
        .split(f.area());

    draw_top(f, chunks[0], snap);
    draw_players(f, chunks[1], snap);
    draw_history(f, chunks[2], snap);
    draw_bottom(f, chunks[3], snap);
}

fn draw_top(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let identity = match &snap.identity {
        Some(identity) => short_address(identity),
        None => String::from("not connected (press c)"),
    };
    let accounts = if snap.accounts.is_empty() {
        String::from("none")
    } else {
        snap.accounts.iter().map(short_address).join(" ")
    };
    let status = Paragraph::new(format!(
        "Account: {} | Round: {} | {}\nUnlocked: {}",
        identity, snap.current_round_id, snap.activity, accounts
    ))
    .block(Block::default().borders(Borders::ALL).title("Session"));
    f.render_widget(status, area);
}

fn draw_players(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let mut lines = Vec::new();
    if snap.players.is_empty() {
        lines.push(Line::styled("None", Style::default().fg(Color::DarkGray)));
    } else {
        // Entry order, duplicates included; one slot per entry.
        for (index, player) in snap.players.iter().enumerate() {
            let mut line = Line::from(format!("{:>3}. {}", index + 1, player));
            if Some(*player) == snap.identity {
                line = line.style(Style::default().fg(Color::Yellow));
            }
            lines.push(line);
        }
    }
    let title = format!("Players ({})", snap.players.len());
    let players =
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(players, area);
}

fn draw_history(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let mut lines = Vec::new();
    if snap.history.is_empty() {
        lines.push(Line::styled(
            "No decided rounds yet",
            Style::default().fg(Color::DarkGray),
        ));
    } else {
        for entry in &snap.history {
            lines.push(Line::from(format!(
                "Round {:>4}: {}",
                entry.round_id, entry.winner
            )));
        }
    }
    let history = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Past Winners"));
    f.render_widget(history, area);
}

fn draw_bottom(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Length(3)])
        .split(area);

    let (text, color) = match (&snap.error, &snap.success) {
        (Some(error), _) => (error.clone(), Color::Red),
        (None, Some(success)) => (success.clone(), Color::Green),
        (None, None) => (String::from("No messages"), Color::DarkGray),
    };
    let messages = Paragraph::new(text)
        .style(Style::default().fg(color))
        .block(Block::default().borders(Borders::ALL).title("Messages"));
    f.render_widget(messages, chunks[0]);

    let help = Paragraph::new(
        "c connect | e enter round | w select winner | d distribute reward | a next account | r resync | q quit",
    )
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(help, chunks[1]);
}
