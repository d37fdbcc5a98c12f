use std::io;
use std::time::Duration;
use std::time::Instant;

use chrono::{DateTime, Utc};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind,
    KeyboardEnhancementFlags, KeyModifiers, MouseButton, MouseEventKind,
    PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen,
    LeaveAlternateScreen, SetTitle,
};
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Terminal;
use tracing::info;
use tracing::warn;

use buildview_core::actions::{BuildAction, UserAction};
use buildview_core::keyboard::Key;
use buildview_core::reducer::BuildEffect;
use buildview_core::routes::LOGIN_ROUTE;
use buildview_core::scroll::ScrollTarget;
use buildview_core::state::{
    Build, BuildId, BuildReference, BuildStatus, BuildViewState, LoadFailure, LoadState,
};
use buildview_exec::{Session, SimulatedCi};

use crate::CliError;

/// Nominal height of one log row when translating pixel scroll amounts.
const LINE_HEIGHT_PX: u32 = 20;
/// Columns the history strip moves per wheel notch.
const HISTORY_WHEEL_STEP: f64 = 4.0;
const TRIGGER_LABEL: &str = " trigger ";
const ABORT_LABEL: &str = " abort ";

struct TuiGuard {
    keyboard_enhanced: bool,
}

impl Drop for TuiGuard {
    fn drop(&mut self) {
        if self.keyboard_enhanced {
            let _ = execute!(io::stdout(), PopKeyboardEnhancementFlags);
        }
        let _ = disable_raw_mode();
        let _ = execute!(
            io::stdout(),
            LeaveAlternateScreen,
            DisableMouseCapture,
            crossterm::cursor::Show
        );
    }
}

pub fn run(mut session: Session<SimulatedCi>, reference: BuildReference) -> Result<(), CliError> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        EnableMouseCapture,
        crossterm::cursor::Hide
    )?;
    let keyboard_enhanced = matches!(supports_keyboard_enhancement(), Ok(true));
    let _guard = TuiGuard { keyboard_enhanced };
    if keyboard_enhanced {
        execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        )?;
    }

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut view = ViewState {
        keys: KeyTranslator::new(keyboard_enhanced),
        ..ViewState::default()
    };
    dispatch(&mut session, &mut view, UserAction::SwitchTo(reference))?;
    run_app(&mut terminal, &mut session, &mut view)
}

/// Terminal-side rendering state the controller steers through effects.
#[derive(Debug, Default)]
struct ViewState {
    log: LogViewport,
    history_offset: f64,
    favicon: Option<BuildStatus>,
    title: String,
    login_required: bool,
    keys: KeyTranslator,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct LogViewport {
    offset: usize,
    total: usize,
    height: usize,
}

impl LogViewport {
    fn max_offset(&self) -> usize {
        self.total.saturating_sub(self.height)
    }

    fn resize(&mut self, total: usize, height: usize) {
        self.total = total;
        self.height = height;
        self.offset = self.offset.min(self.max_offset());
    }

    fn apply(&mut self, target: ScrollTarget) {
        let rows = |px: u32| px.div_ceil(LINE_HEIGHT_PX) as usize;
        self.offset = match target {
            ScrollTarget::ToTop => 0,
            ScrollTarget::ToBottom => self.max_offset(),
            ScrollTarget::Down(px) => (self.offset + rows(px)).min(self.max_offset()),
            ScrollTarget::Up(px) => self.offset.saturating_sub(rows(px)),
            ScrollTarget::HistoryBy(_) => self.offset,
        };
    }

    fn distance_from_bottom(&self) -> f64 {
        ((self.max_offset() - self.offset.min(self.max_offset())) as u32 * LINE_HEIGHT_PX) as f64
    }
}

impl ViewState {
    /// Applies presentation effects and returns the scroll reports they cause.
    fn apply_effects(&mut self, effects: &[BuildEffect]) -> Vec<UserAction> {
        let mut reports = Vec::new();
        for effect in effects {
            match effect {
                BuildEffect::Scroll(ScrollTarget::HistoryBy(delta)) => {
                    self.history_offset = (self.history_offset + delta).max(0.0);
                }
                BuildEffect::Scroll(target) => {
                    self.log.apply(*target);
                    reports.push(UserAction::Scrolled {
                        distance_from_bottom: self.log.distance_from_bottom(),
                    });
                }
                BuildEffect::SetWindowTitle(title) => {
                    self.title = title.clone();
                    let _ = execute!(io::stdout(), SetTitle(title.as_str()));
                }
                BuildEffect::SetFavicon(status) => self.favicon = *status,
                BuildEffect::RedirectToLogin => {
                    warn!(route = LOGIN_ROUTE, "authorization required");
                    self.login_required = true;
                }
                _ => {}
            }
        }
        reports
    }
}

/// Dispatches a user action, then settles every scroll report it triggers.
fn dispatch(
    session: &mut Session<SimulatedCi>,
    view: &mut ViewState,
    action: UserAction,
) -> Result<(), CliError> {
    let mut pending = vec![action];
    while let Some(action) = pending.pop() {
        let scrolled = matches!(action, UserAction::Scrolled { .. });
        let effects = session.dispatch(BuildAction::User(action))?;
        let reports = view.apply_effects(&effects);
        if !scrolled {
            pending.extend(reports);
        }
    }
    Ok(())
}

/// Maps terminal key events onto the key transitions the controller expects.
/// Terminals report shifted characters rather than the shift key itself, so
/// shift transitions are synthesized from the character. Terminals that do
/// not report releases get one synthesized after each press.
#[derive(Debug, Default)]
struct KeyTranslator {
    reports_releases: bool,
    shift_down: bool,
}

impl KeyTranslator {
    fn new(reports_releases: bool) -> Self {
        Self {
            reports_releases,
            shift_down: false,
        }
    }

    fn translate(
        &mut self,
        code: KeyCode,
        modifiers: KeyModifiers,
        kind: KeyEventKind,
    ) -> Vec<UserAction> {
        let (key, shifted) = match code {
            KeyCode::Char('?') => (Key::char('/'), Some(true)),
            KeyCode::Char(c) if c.is_ascii_uppercase() => (Key::char(c), Some(true)),
            KeyCode::Char(c) => (Key::char(c), Some(modifiers.contains(KeyModifiers::SHIFT))),
            _ => (Key::Other, None),
        };

        let mut actions = Vec::new();
        match kind {
            KeyEventKind::Press | KeyEventKind::Repeat => {
                if let Some(shifted) = shifted {
                    self.set_shift(shifted, &mut actions);
                }
                actions.push(UserAction::KeyDown(key));
                if kind == KeyEventKind::Press && !self.reports_releases {
                    self.release(key, shifted.is_some(), &mut actions);
                }
            }
            KeyEventKind::Release => self.release(key, shifted.is_some(), &mut actions),
        }
        actions
    }

    fn release(&mut self, key: Key, is_char: bool, actions: &mut Vec<UserAction>) {
        actions.push(UserAction::KeyUp(key));
        if is_char {
            self.set_shift(false, actions);
        }
    }

    fn set_shift(&mut self, down: bool, actions: &mut Vec<UserAction>) {
        if self.shift_down == down {
            return;
        }
        self.shift_down = down;
        actions.push(if down {
            UserAction::KeyDown(Key::Shift)
        } else {
            UserAction::KeyUp(Key::Shift)
        });
    }
}

struct Areas {
    header: Rect,
    history: Rect,
    body: Rect,
    footer: Rect,
}

fn layout(area: Rect) -> Areas {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);
    Areas {
        header: chunks[0],
        history: chunks[1],
        body: chunks[2],
        footer: chunks[3],
    }
}

fn button_rects(header: Rect) -> (Rect, Rect) {
    let y = header.y + 1;
    let right = header.x + header.width.saturating_sub(1);
    let abort_w = ABORT_LABEL.len() as u16;
    let trigger_w = TRIGGER_LABEL.len() as u16;
    let abort_x = right.saturating_sub(abort_w);
    let trigger_x = abort_x.saturating_sub(trigger_w + 1);
    (
        Rect::new(trigger_x, y, trigger_w, 1),
        Rect::new(abort_x, y, abort_w, 1),
    )
}

fn contains(rect: Rect, column: u16, row: u16) -> bool {
    column >= rect.x && column < rect.x + rect.width && row >= rect.y && row < rect.y + rect.height
}

fn history_label(build: &Build) -> String {
    format!(" #{} ", build.name)
}

/// Column spans of history entries inside the strip, after horizontal scroll.
fn history_spans(builds: &[Build], strip: Rect, offset: f64) -> Vec<(BuildId, u16, u16)> {
    let inner_x = i32::from(strip.x) + 1;
    let inner_end = i32::from(strip.x + strip.width.saturating_sub(1));
    let mut x = inner_x - offset.round() as i32;
    let mut spans = Vec::new();
    for build in builds {
        let width = history_label(build).len() as i32;
        let start = x.max(inner_x);
        let end = (x + width).min(inner_end);
        if end > start {
            spans.push((build.id, start as u16, (end - start) as u16));
        }
        x += width + 1;
    }
    spans
}

fn handle_mouse<B: Backend>(
    mouse: event::MouseEvent,
    session: &mut Session<SimulatedCi>,
    view: &mut ViewState,
    terminal: &Terminal<B>,
) -> Result<(), CliError> {
    let size = terminal.size()?;
    let areas = layout(Rect::new(0, 0, size.width, size.height));
    let in_history = contains(areas.history, mouse.column, mouse.row);
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            let (trigger, abort) = button_rects(areas.header);
            if contains(trigger, mouse.column, mouse.row) {
                dispatch(session, view, UserAction::TriggerClicked)?;
            } else if contains(abort, mouse.column, mouse.row) {
                dispatch(session, view, UserAction::AbortClicked)?;
            } else if in_history {
                let hit = history_spans(
                    session.state().history.builds(),
                    areas.history,
                    view.history_offset,
                )
                .into_iter()
                .find(|(_, x, width)| mouse.column >= *x && mouse.column < x + width);
                if let Some((id, _, _)) = hit {
                    dispatch(session, view, UserAction::HistoryClicked(id))?;
                }
            }
        }
        MouseEventKind::ScrollDown | MouseEventKind::ScrollUp if in_history => {
            let notch = if mouse.kind == MouseEventKind::ScrollDown {
                HISTORY_WHEEL_STEP
            } else {
                -HISTORY_WHEEL_STEP
            };
            dispatch(
                session,
                view,
                UserAction::Wheel {
                    delta_x: 0.0,
                    delta_y: notch,
                },
            )?;
        }
        MouseEventKind::ScrollLeft | MouseEventKind::ScrollRight if in_history => {
            let notch = if mouse.kind == MouseEventKind::ScrollLeft {
                HISTORY_WHEEL_STEP
            } else {
                -HISTORY_WHEEL_STEP
            };
            dispatch(
                session,
                view,
                UserAction::Wheel {
                    delta_x: notch,
                    delta_y: 0.0,
                },
            )?;
        }
        MouseEventKind::ScrollDown | MouseEventKind::ScrollUp => {
            let increment = session.state().settings.scroll_increment;
            let target = if mouse.kind == MouseEventKind::ScrollDown {
                ScrollTarget::Down(increment)
            } else {
                ScrollTarget::Up(increment)
            };
            view.log.apply(target);
            let distance_from_bottom = view.log.distance_from_bottom();
            dispatch(
                session,
                view,
                UserAction::Scrolled {
                    distance_from_bottom,
                },
            )?;
        }
        _ => {}
    }
    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    session: &mut Session<SimulatedCi>,
    view: &mut ViewState,
) -> Result<(), CliError> {
    let origin = session.now();
    let started = Instant::now();

    loop {
        let now = chrono::Duration::from_std(started.elapsed())
            .ok()
            .and_then(|elapsed| origin.checked_add_signed(elapsed))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let effects = session.advance_to(now)?;
        for report in view.apply_effects(&effects) {
            dispatch(session, view, report)?;
        }

        terminal.draw(|f| render(f, session.state(), view))?;

        if !event::poll(Duration::from_millis(100))? {
            continue;
        }
        match event::read()? {
            Event::Key(key) => {
                let quit = key.code == KeyCode::Char('q')
                    || (key.modifiers.contains(KeyModifiers::CONTROL)
                        && key.code == KeyCode::Char('c'));
                if quit && key.kind == KeyEventKind::Press {
                    info!("leaving build view");
                    return Ok(());
                }
                let actions = view.keys.translate(key.code, key.modifiers, key.kind);
                for action in actions {
                    dispatch(session, view, action)?;
                }
            }
            Event::Mouse(mouse) => handle_mouse(mouse, session, view, terminal)?,
            _ => {}
        }
    }
}

fn status_color(status: BuildStatus) -> Color {
    match status {
        BuildStatus::Pending => Color::Gray,
        BuildStatus::Started => Color::Yellow,
        BuildStatus::Succeeded => Color::Green,
        BuildStatus::Failed => Color::Red,
        BuildStatus::Errored => Color::LightRed,
        BuildStatus::Aborted => Color::Rgb(139, 87, 42),
    }
}

fn format_elapsed(elapsed: chrono::Duration) -> String {
    let secs = elapsed.num_seconds().max(0);
    match (secs / 3600, (secs % 3600) / 60, secs % 60) {
        (0, 0, s) => format!("{s}s"),
        (0, m, s) => format!("{m}m {s}s"),
        (h, m, s) => format!("{h}h {m}m {s}s"),
    }
}

fn render(f: &mut ratatui::Frame, state: &BuildViewState, view: &mut ViewState) {
    let areas = layout(f.area());
    render_header(f, areas.header, state, view);
    render_history(f, areas.history, state, view);
    render_body(f, areas.body, state, view);

    let footer = Paragraph::new(Line::from(vec![
        Span::styled(" h/l ", Style::default().fg(Color::Cyan)),
        Span::raw("newer/older  "),
        Span::styled(" j/k ", Style::default().fg(Color::Cyan)),
        Span::raw("scroll  "),
        Span::styled(" ? ", Style::default().fg(Color::Cyan)),
        Span::raw("help  "),
        Span::styled(" q ", Style::default().fg(Color::Cyan)),
        Span::raw("quit"),
    ]))
    .style(Style::default().fg(Color::DarkGray));
    f.render_widget(footer, areas.footer);

    if state.interaction.help_visible {
        render_help(f);
    }
}

fn render_header(f: &mut ratatui::Frame, area: Rect, state: &BuildViewState, view: &ViewState) {
    let border = view.favicon.map_or(Color::DarkGray, status_color);
    let mut spans = vec![Span::styled(
        view.title.clone(),
        Style::default().add_modifier(Modifier::BOLD),
    )];
    if let Some(build) = state.current_build() {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            build.status.label(),
            Style::default().fg(status_color(build.status)),
        ));
    }
    if let Some(elapsed) = state.elapsed() {
        spans.push(Span::styled(
            format!("  {}", format_elapsed(elapsed)),
            Style::default().fg(Color::DarkGray),
        ));
    }
    if view.login_required {
        spans.push(Span::styled(
            format!("  login required: {LOGIN_ROUTE}"),
            Style::default().fg(Color::Red),
        ));
    }
    let header = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border)),
    );
    f.render_widget(header, area);

    let (trigger, abort) = button_rects(area);
    let trigger_disabled = state.trigger_target().is_none()
        || state
            .job
            .details
            .as_ref()
            .is_some_and(|job| job.disable_manual_trigger);
    let abort_enabled = state
        .current_build()
        .is_some_and(|build| build.status.is_running() && state.history.is_latest(build.id));
    f.render_widget(button(TRIGGER_LABEL, !trigger_disabled), trigger);
    f.render_widget(button(ABORT_LABEL, abort_enabled), abort);
}

fn button(label: &'static str, enabled: bool) -> Paragraph<'static> {
    let style = if enabled {
        Style::default().fg(Color::Black).bg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray).bg(Color::Black)
    };
    Paragraph::new(label).style(style)
}

fn render_history(f: &mut ratatui::Frame, area: Rect, state: &BuildViewState, view: &ViewState) {
    let block = Block::default().borders(Borders::ALL).title(" builds ");
    f.render_widget(block, area);

    let current = state.current_build().map(|build| build.id);
    let builds = state.history.builds();
    for (id, x, width) in history_spans(builds, area, view.history_offset) {
        let Some(build) = state.history.get(id) else {
            continue;
        };
        let mut style = Style::default().fg(Color::Black).bg(status_color(build.status));
        if Some(id) == current {
            style = style.add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
        }
        let label = history_label(build);
        let visible: String = label.chars().take(usize::from(width)).collect();
        f.render_widget(
            Paragraph::new(visible).style(style),
            Rect::new(x, area.y + 1, width, 1),
        );
    }
}

fn render_body(f: &mut ratatui::Frame, area: Rect, state: &BuildViewState, view: &mut ViewState) {
    let block = Block::default().borders(Borders::ALL);
    let inner_height = usize::from(area.height.saturating_sub(2));

    let message = match &state.build {
        LoadState::NotAsked | LoadState::Loading => Some("loading...".to_string()),
        LoadState::Failure(LoadFailure::NotFound) => Some("build not found".to_string()),
        LoadState::Success(_) if state.is_tombstoned() => {
            Some("this build's output has been reaped".to_string())
        }
        LoadState::Success(_) => None,
    };
    if let Some(message) = message {
        view.log.resize(0, inner_height);
        f.render_widget(
            Paragraph::new(message)
                .alignment(Alignment::Center)
                .block(block.title(" output ")),
            area,
        );
        return;
    }

    let Some(info) = state.build.as_success() else {
        return;
    };
    let lines: Vec<Line> = match &info.output {
        Some(output) => {
            let mut lines: Vec<Line> = output
                .lines
                .iter()
                .map(|line| match &line.origin {
                    Some(origin) => Line::from(vec![
                        Span::styled(format!("[{origin}] "), Style::default().fg(Color::DarkGray)),
                        Span::raw(line.text.clone()),
                    ]),
                    None => Line::raw(line.text.clone()),
                })
                .collect();
            lines.extend(output.errors.iter().map(|error| {
                Line::styled(error.clone(), Style::default().fg(Color::Red))
            }));
            lines
        }
        None => preparation_lines(state),
    };

    view.log.resize(lines.len(), inner_height);
    let offset = u16::try_from(view.log.offset).unwrap_or(u16::MAX);
    f.render_widget(
        Paragraph::new(lines)
            .block(block.title(" output "))
            .scroll((offset, 0)),
        area,
    );
}

fn preparation_lines(state: &BuildViewState) -> Vec<Line<'static>> {
    let Some(preparation) = state
        .build
        .as_success()
        .and_then(|info| info.preparation.as_ref())
    else {
        return vec![Line::raw("waiting for the build to start")];
    };
    let flag = |label: &str, blocking: bool| {
        let (mark, color) = if blocking {
            ("blocking", Color::Red)
        } else {
            ("ok", Color::Green)
        };
        Line::from(vec![
            Span::raw(format!("{label:<24}")),
            Span::styled(mark.to_string(), Style::default().fg(color)),
        ])
    };
    let mut lines = vec![
        Line::styled("prerequisites", Style::default().add_modifier(Modifier::BOLD)),
        flag("pipeline paused", preparation.paused_pipeline),
        flag("job paused", preparation.paused_job),
        Line::raw(format!(
            "{:<24}{}",
            "inputs satisfied",
            preparation.inputs_satisfied.label()
        )),
        Line::raw(format!(
            "{:<24}{}",
            "max running builds",
            preparation.max_running_builds.label()
        )),
    ];
    for (input, status) in &preparation.inputs {
        lines.push(Line::raw(format!("  {input:<22}{}", status.label())));
        if let Some(reason) = preparation.missing_input_reasons.get(input) {
            lines.push(Line::styled(
                format!("    {reason}"),
                Style::default().fg(Color::DarkGray),
            ));
        }
    }
    lines
}

fn render_help(f: &mut ratatui::Frame) {
    let area = centered_rect(50, 50, f.area());
    let rows = [
        ("h", "newer build"),
        ("l", "older build"),
        ("j / k", "scroll down / up"),
        ("g g", "scroll to top"),
        ("G", "scroll to bottom"),
        ("T", "trigger a new build"),
        ("A", "abort this build"),
        ("?", "toggle this help"),
    ];
    let lines: Vec<Line> = rows
        .iter()
        .map(|(keys, what)| {
            Line::from(vec![
                Span::styled(format!("{keys:>8}  "), Style::default().fg(Color::Cyan)),
                Span::raw(*what),
            ])
        })
        .collect();
    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title(" keys ")),
        area,
    );
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use buildview_core::keyboard::{KeyCommand, KeyboardChordState};
    use buildview_core::state::BuildDuration;
    use pretty_assertions::assert_eq;

    use super::*;

    fn build(id: u64) -> Build {
        Build {
            id: BuildId(id),
            name: id.to_string(),
            status: BuildStatus::Succeeded,
            job: None,
            duration: BuildDuration::default(),
            reaped_at: None,
        }
    }

    fn press(keys: &mut KeyTranslator, code: KeyCode, modifiers: KeyModifiers) -> Vec<UserAction> {
        keys.translate(code, modifiers, KeyEventKind::Press)
    }

    #[test]
    fn uppercase_keys_are_wrapped_in_shift() {
        let mut keys = KeyTranslator::new(false);
        assert_eq!(
            press(&mut keys, KeyCode::Char('T'), KeyModifiers::SHIFT),
            vec![
                UserAction::KeyDown(Key::Shift),
                UserAction::KeyDown(Key::Char('t')),
                UserAction::KeyUp(Key::Char('t')),
                UserAction::KeyUp(Key::Shift),
            ]
        );
        assert_eq!(
            press(&mut keys, KeyCode::Char('?'), KeyModifiers::NONE)[1],
            UserAction::KeyDown(Key::Char('/'))
        );
        assert_eq!(
            press(&mut keys, KeyCode::Char('j'), KeyModifiers::NONE),
            vec![
                UserAction::KeyDown(Key::Char('j')),
                UserAction::KeyUp(Key::Char('j')),
            ]
        );
        assert_eq!(
            press(&mut keys, KeyCode::Esc, KeyModifiers::NONE),
            vec![UserAction::KeyDown(Key::Other), UserAction::KeyUp(Key::Other)]
        );
    }

    #[test]
    fn reported_releases_end_key_holds() {
        let mut keys = KeyTranslator::new(true);
        assert_eq!(
            press(&mut keys, KeyCode::Char('T'), KeyModifiers::SHIFT),
            vec![
                UserAction::KeyDown(Key::Shift),
                UserAction::KeyDown(Key::Char('t')),
            ]
        );
        assert_eq!(
            keys.translate(KeyCode::Char('T'), KeyModifiers::SHIFT, KeyEventKind::Release),
            vec![
                UserAction::KeyUp(Key::Char('t')),
                UserAction::KeyUp(Key::Shift),
            ]
        );
        assert_eq!(
            press(&mut keys, KeyCode::Char('j'), KeyModifiers::NONE),
            vec![UserAction::KeyDown(Key::Char('j'))]
        );
    }

    #[test]
    fn holding_shift_t_triggers_once() {
        let mut keys = KeyTranslator::new(true);
        let mut actions = press(&mut keys, KeyCode::Char('T'), KeyModifiers::SHIFT);
        for _ in 0..3 {
            actions.extend(keys.translate(
                KeyCode::Char('T'),
                KeyModifiers::SHIFT,
                KeyEventKind::Repeat,
            ));
        }

        let mut chords = KeyboardChordState::default();
        let mut commands = Vec::new();
        for action in actions {
            match action {
                UserAction::KeyDown(key) => commands.extend(chords.key_down(key)),
                UserAction::KeyUp(key) => chords.key_up(key),
                other => panic!("unexpected {other:?}"),
            }
        }
        assert_eq!(commands, vec![KeyCommand::TriggerBuild]);
        assert!(chords.trigger_held);
    }

    #[test]
    fn repeats_never_synthesize_a_release() {
        let mut keys = KeyTranslator::new(false);
        press(&mut keys, KeyCode::Char('T'), KeyModifiers::SHIFT);

        let repeat = keys.translate(KeyCode::Char('T'), KeyModifiers::SHIFT, KeyEventKind::Repeat);
        assert_eq!(
            repeat,
            vec![
                UserAction::KeyDown(Key::Shift),
                UserAction::KeyDown(Key::Char('t')),
            ]
        );
    }

    #[test]
    fn viewport_scrolls_in_rows_and_clamps() {
        let mut log = LogViewport::default();
        log.resize(100, 20);

        log.apply(ScrollTarget::Down(60));
        assert_eq!(log.offset, 3);
        log.apply(ScrollTarget::ToBottom);
        assert_eq!(log.offset, 80);
        assert_eq!(log.distance_from_bottom(), 0.0);

        log.apply(ScrollTarget::Up(60));
        assert_eq!(log.offset, 77);
        assert_eq!(log.distance_from_bottom(), 60.0);

        log.resize(10, 20);
        assert_eq!(log.offset, 0);
    }

    #[test]
    fn scroll_effects_report_distance() {
        let mut view = ViewState::default();
        view.log.resize(50, 10);

        let reports = view.apply_effects(&[
            BuildEffect::Scroll(ScrollTarget::ToTop),
            BuildEffect::Scroll(ScrollTarget::HistoryBy(6.0)),
            BuildEffect::SetFavicon(Some(BuildStatus::Failed)),
        ]);

        assert_eq!(
            reports,
            vec![UserAction::Scrolled {
                distance_from_bottom: 800.0
            }]
        );
        assert_eq!(view.history_offset, 6.0);
        assert_eq!(view.favicon, Some(BuildStatus::Failed));
    }

    #[test]
    fn history_spans_skip_scrolled_out_entries() {
        let builds = vec![build(12), build(11), build(10)];
        let strip = Rect::new(0, 0, 40, 3);

        let spans = history_spans(&builds, strip, 0.0);
        assert_eq!(
            spans,
            vec![
                (BuildId(12), 1, 5),
                (BuildId(11), 7, 5),
                (BuildId(10), 13, 5),
            ]
        );

        let scrolled = history_spans(&builds, strip, 6.0);
        assert_eq!(scrolled[0], (BuildId(11), 1, 5));
    }

    #[test]
    fn elapsed_is_compact() {
        assert_eq!(format_elapsed(chrono::Duration::seconds(42)), "42s");
        assert_eq!(format_elapsed(chrono::Duration::seconds(125)), "2m 5s");
        assert_eq!(format_elapsed(chrono::Duration::seconds(3_725)), "1h 2m 5s");
    }
}
