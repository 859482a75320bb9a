//! TUI Dashboard using ratatui.

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame, Terminal,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::io;
use std::time::Duration;
use telemetry_client::Mirror;
use telemetry_core::types::{Side, SystemStatus, TradeStatus};
use telemetry_metrics::RiskLevel;

/// Dashboard state.
#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    pub mirror: Mirror,
    pub server_url: String,
    pub messages: Vec<String>,
}

/// Heartbeat age after which the engine is shown as stale.
pub const DEFAULT_HEARTBEAT_MAX_AGE_SECS: i64 = 30;

/// TUI Dashboard.
pub struct Dashboard {
    refresh_ms: u64,
    heartbeat_max_age: chrono::Duration,
}

impl Dashboard {
    /// Create a new dashboard.
    pub fn new(refresh_ms: u64) -> Self {
        Self {
            refresh_ms,
            heartbeat_max_age: chrono::Duration::seconds(DEFAULT_HEARTBEAT_MAX_AGE_SECS),
        }
    }

    /// Override how old a heartbeat may get before the engine shows as stale.
    pub fn with_heartbeat_max_age(mut self, secs: i64) -> Self {
        self.heartbeat_max_age = chrono::Duration::seconds(secs);
        self
    }

    /// Run the dashboard until `q` or Esc. `r` calls `on_refresh`.
    pub fn run<F, R>(&self, mut get_state: F, mut on_refresh: R) -> io::Result<()>
    where
        F: FnMut() -> DashboardState,
        R: FnMut(),
    {
        // Setup terminal
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let res = self.run_loop(&mut terminal, &mut get_state, &mut on_refresh);

        // Restore terminal
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;

        res
    }

    fn run_loop<F, R>(
        &self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
        get_state: &mut F,
        on_refresh: &mut R,
    ) -> io::Result<()>
    where
        F: FnMut() -> DashboardState,
        R: FnMut(),
    {
        loop {
            let state = get_state();
            terminal.draw(|f| self.ui(f, &state, Utc::now()))?;

            if event::poll(Duration::from_millis(self.refresh_ms))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                        KeyCode::Char('r') => on_refresh(),
                        _ => {}
                    }
                }
            }
        }
    }

    fn ui(&self, frame: &mut Frame, state: &DashboardState, now: DateTime<Utc>) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Length(3),      // Header
                Constraint::Length(6),      // Stats
                Constraint::Min(6),         // Positions
                Constraint::Percentage(30), // Trades / signals
                Constraint::Length(7),      // Messages
            ])
            .split(frame.area());

        let lower = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(chunks[3]);

        self.render_header(frame, chunks[0], state, now);
        self.render_stats(frame, chunks[1], state);
        self.render_positions(frame, chunks[2], state);
        self.render_trades(frame, lower[0], state);
        self.render_signals(frame, lower[1], state);
        self.render_messages(frame, chunks[4], state);
    }

    fn render_header(&self, frame: &mut Frame, area: Rect, state: &DashboardState, now: DateTime<Utc>) {
        let mirror = &state.mirror;
        let (live, live_color) = if mirror.is_connected() {
            ("LIVE", Color::Green)
        } else {
            ("NOT LIVE", Color::Red)
        };

        let (engine, engine_color) = self.engine_label(mirror.system_status(), now);
        let last_push = mirror
            .last_push_at()
            .map(|at| at.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "--:--:--".to_string());

        let header = Paragraph::new(vec![Line::from(vec![
            Span::styled(
                "Trading Telemetry",
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw(" | "),
            Span::styled(
                live,
                Style::default().fg(live_color).add_modifier(Modifier::BOLD),
            ),
            Span::raw(" | "),
            Span::styled(state.server_url.as_str(), Style::default().fg(Color::Cyan)),
            Span::raw(" | "),
            Span::styled(engine, Style::default().fg(engine_color)),
            Span::raw(format!(" | last push {last_push}")),
            Span::raw(" | 'r' refresh, 'q' quit"),
        ])])
        .block(Block::default().borders(Borders::ALL).title("System"));
        frame.render_widget(header, area);
    }

    fn engine_label(&self, status: Option<&SystemStatus>, now: DateTime<Utc>) -> (String, Color) {
        match status {
            Some(status) if status.is_stale(now, self.heartbeat_max_age) => (
                format!(
                    "engine stale ({}, heartbeat {}s ago)",
                    status.mode,
                    (now - status.last_heartbeat).num_seconds()
                ),
                Color::Red,
            ),
            Some(status) if status.is_active => {
                (format!("engine active ({})", status.mode), Color::Green)
            }
            Some(status) => (format!("engine idle ({})", status.mode), Color::Yellow),
            None => ("engine status unknown".to_string(), Color::DarkGray),
        }
    }

    fn render_stats(&self, frame: &mut Frame, area: Rect, state: &DashboardState) {
        let risk = state.mirror.risk();
        let perf = state.mirror.performance_metrics();

        let risk_color = match risk.risk_level {
            RiskLevel::Low => Color::Green,
            RiskLevel::Medium => Color::Yellow,
            RiskLevel::High => Color::LightRed,
            RiskLevel::Critical => Color::Red,
        };

        let mut lines = vec![
            Line::from(vec![
                Span::raw("Exposure: "),
                Span::styled(
                    format!("${:.2}", risk.total_exposure),
                    Style::default()
                        .fg(Color::White)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw("  |  Unrealized: "),
                Span::styled(
                    format!("${:.2}", risk.unrealized_pnl),
                    Style::default().fg(pnl_color(risk.unrealized_pnl)),
                ),
                Span::raw("  |  Realized: "),
                Span::styled(
                    format!("${:.2}", risk.realized_pnl),
                    Style::default().fg(pnl_color(risk.realized_pnl)),
                ),
                Span::raw("  |  Risk: "),
                Span::styled(
                    risk.risk_level.to_string(),
                    Style::default().fg(risk_color).add_modifier(Modifier::BOLD),
                ),
            ]),
            Line::from(vec![
                Span::raw(format!(
                    "Max DD: {:.2}%  |  Current DD: {:.2}%  |  Positions: {}",
                    risk.max_drawdown_pct, risk.current_drawdown_pct, risk.open_positions
                )),
            ]),
            Line::from(vec![Span::raw(format!(
                "Trades: {}  |  Win rate: {:.2}%  |  Profit factor: {}  |  Avg win: ${:.2}  |  Avg loss: ${:.2}  |  Sharpe: {:.2}",
                perf.total_trades,
                perf.win_rate_pct,
                perf.profit_factor,
                perf.avg_win,
                perf.avg_loss,
                perf.sharpe_ratio
            ))]),
        ];

        if let Some(rollup) = state.mirror.performance() {
            lines.push(Line::from(vec![Span::raw(format!(
                "Store rollup: equity ${:.2}  |  daily P&L ${:.2}  |  win rate {:.2}%  |  max DD {:.2}%",
                rollup.equity, rollup.daily_pnl, rollup.win_rate, rollup.max_drawdown
            ))]));
        }

        let stats = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Statistics"));
        frame.render_widget(stats, area);
    }

    fn render_positions(&self, frame: &mut Frame, area: Rect, state: &DashboardState) {
        let header = header_row(&["Symbol", "Side", "Size", "Entry", "Current", "P&L", "P&L %"]);

        let rows = state.mirror.positions().iter().map(|pos| {
            let color = pnl_color(pos.unrealized_pnl);
            Row::new(vec![
                Cell::from(pos.symbol.clone()),
                Cell::from(side_label(pos.side)),
                Cell::from(format!("{}", pos.size)),
                Cell::from(format!("${:.2}", pos.entry_price)),
                Cell::from(format!("${:.2}", pos.current_price)),
                Cell::from(format!("${:.2}", pos.unrealized_pnl)).style(Style::default().fg(color)),
                Cell::from(format!("{:.2}%", pos.unrealized_pnl_pct))
                    .style(Style::default().fg(color)),
            ])
        });

        let table = Table::new(
            rows,
            [
                Constraint::Percentage(16),
                Constraint::Percentage(10),
                Constraint::Percentage(12),
                Constraint::Percentage(15),
                Constraint::Percentage(15),
                Constraint::Percentage(16),
                Constraint::Percentage(16),
            ],
        )
        .header(header)
        .block(Block::default().borders(Borders::ALL).title("Positions"));

        frame.render_widget(table, area);
    }

    fn render_trades(&self, frame: &mut Frame, area: Rect, state: &DashboardState) {
        let header = header_row(&["Time", "Symbol", "Side", "Entry", "Exit", "P&L"]);

        let rows = state.mirror.trades().iter().map(|trade| {
            let exit = trade
                .exit_price
                .map(|p| format!("${:.2}", p))
                .unwrap_or_else(|| "-".to_string());
            let pnl = match (trade.status, trade.pnl) {
                (TradeStatus::Closed, Some(pnl)) => {
                    Cell::from(format!("${:.2}", pnl)).style(Style::default().fg(pnl_color(pnl)))
                }
                (TradeStatus::Closed, None) => Cell::from("$0.00"),
                (TradeStatus::Open, _) => Cell::from("open"),
            };

            Row::new(vec![
                Cell::from(trade.entry_time.format("%m-%d %H:%M").to_string()),
                Cell::from(trade.symbol.clone()),
                Cell::from(side_label(trade.side)),
                Cell::from(format!("${:.2}", trade.entry_price)),
                Cell::from(exit),
                pnl,
            ])
        });

        let table = Table::new(
            rows,
            [
                Constraint::Percentage(20),
                Constraint::Percentage(16),
                Constraint::Percentage(10),
                Constraint::Percentage(18),
                Constraint::Percentage(18),
                Constraint::Percentage(18),
            ],
        )
        .header(header)
        .block(Block::default().borders(Borders::ALL).title("Recent Trades"));

        frame.render_widget(table, area);
    }

    fn render_signals(&self, frame: &mut Frame, area: Rect, state: &DashboardState) {
        let header = header_row(&["Symbol", "Side", "Price", "Conf."]);

        let rows = state.mirror.signals().iter().map(|signal| {
            Row::new(vec![
                Cell::from(signal.symbol.clone()),
                Cell::from(side_label(signal.side)),
                Cell::from(format!("${:.2}", signal.price)),
                Cell::from(format!("{:.0}%", signal.confidence * 100.0)),
            ])
        });

        let table = Table::new(
            rows,
            [
                Constraint::Percentage(30),
                Constraint::Percentage(20),
                Constraint::Percentage(30),
                Constraint::Percentage(20),
            ],
        )
        .header(header)
        .block(Block::default().borders(Borders::ALL).title("Signals"));

        frame.render_widget(table, area);
    }

    fn render_messages(&self, frame: &mut Frame, area: Rect, state: &DashboardState) {
        let messages: Vec<Line> = state
            .messages
            .iter()
            .rev()
            .take(5)
            .map(|m| Line::from(m.as_str()))
            .collect();

        let paragraph =
            Paragraph::new(messages).block(Block::default().borders(Borders::ALL).title("Log"));
        frame.render_widget(paragraph, area);
    }
}

fn header_row<'a>(titles: &[&'a str]) -> Row<'a> {
    let cells = titles
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().add_modifier(Modifier::BOLD)));
    Row::new(cells).height(1)
}

fn pnl_color(value: Decimal) -> Color {
    if value >= Decimal::ZERO {
        Color::Green
    } else {
        Color::Red
    }
}

fn side_label(side: Side) -> &'static str {
    match side {
        Side::Long => "LONG",
        Side::Short => "SHORT",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ratatui::backend::TestBackend;
    use rust_decimal_macros::dec;
    use telemetry_core::types::{EngineCounters, Position, TradingMode};
    use telemetry_core::wire::Snapshot;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 1, 10, 0, 0).unwrap()
    }

    fn render(state: &DashboardState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(160, 48)).unwrap();
        let dashboard = Dashboard::new(250);
        terminal.draw(|f| dashboard.ui(f, state, now())).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_disconnected_mirror_shows_not_live() {
        let state = DashboardState {
            server_url: "ws://127.0.0.1:3001".to_string(),
            ..DashboardState::default()
        };
        let screen = render(&state);
        assert!(screen.contains("NOT LIVE"));
        assert!(screen.contains("ws://127.0.0.1:3001"));
        assert!(screen.contains("LOW"));
    }

    #[test]
    fn test_connected_mirror_shows_live() {
        let mut mirror = Mirror::default();
        mirror.mark_connected();
        let state = DashboardState {
            mirror,
            messages: vec!["Refresh requested".to_string()],
            ..DashboardState::default()
        };
        let screen = render(&state);
        assert!(screen.contains("LIVE"));
        assert!(!screen.contains("NOT LIVE"));
        assert!(screen.contains("Refresh requested"));
    }

    fn status_mirror(is_active: bool, heartbeat: DateTime<Utc>) -> Mirror {
        let mut mirror = Mirror::default();
        mirror.mark_connected();
        mirror.apply(
            Snapshot::SystemStatus(Some(SystemStatus {
                is_active,
                mode: TradingMode::Paper,
                last_heartbeat: heartbeat,
                counters: EngineCounters::default(),
                updated_at: heartbeat,
            }))
            .into_message(1, heartbeat),
        );
        mirror
    }

    #[test]
    fn test_fresh_heartbeat_shows_active_engine() {
        let mirror = status_mirror(true, now() - chrono::Duration::seconds(2));
        let screen = render(&DashboardState {
            mirror,
            ..DashboardState::default()
        });
        assert!(screen.contains("engine active (PAPER)"));
        assert!(!screen.contains("stale"));
    }

    #[test]
    fn test_old_heartbeat_shows_stale_engine() {
        let mirror = status_mirror(true, now() - chrono::Duration::seconds(90));
        let screen = render(&DashboardState {
            mirror,
            ..DashboardState::default()
        });
        assert!(screen.contains("engine stale (PAPER, heartbeat 90s ago)"));
        assert!(!screen.contains("engine active"));
    }

    #[test]
    fn test_heartbeat_threshold_is_configurable() {
        let state = DashboardState {
            mirror: status_mirror(false, now() - chrono::Duration::seconds(90)),
            ..DashboardState::default()
        };
        let dashboard = Dashboard::new(250).with_heartbeat_max_age(120);
        let (label, color) = dashboard.engine_label(state.mirror.system_status(), now());
        assert_eq!(label, "engine idle (PAPER)");
        assert_eq!(color, Color::Yellow);

        let (label, _) = Dashboard::new(250).engine_label(state.mirror.system_status(), now());
        assert!(label.starts_with("engine stale"));
    }

    #[test]
    fn test_positions_are_listed() {
        let t0 = now();
        let mut mirror = Mirror::default();
        mirror.apply(
            Snapshot::Positions(vec![Position::new("p1", "AAPL", Side::Short, dec!(190), dec!(5), t0)])
                .into_message(1, t0),
        );

        let screen = render(&DashboardState {
            mirror,
            ..DashboardState::default()
        });
        assert!(screen.contains("AAPL"));
        assert!(screen.contains("SHORT"));
        assert!(screen.contains("$950.00"));
    }
}
