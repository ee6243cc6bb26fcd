// src/tui/mod.rs
use crate::core::order::Order;
use crate::output::Tabular;
use crate::types::{OrderId, OrderStatus, UiEvent};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Row, Table},
    Terminal,
};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::{io, time::Duration};
use tokio::sync::mpsc;

const MAX_LOG_LINES: usize = 20;

pub struct App {
    pub balance: Option<Decimal>,
    pub quotes: BTreeMap<String, Decimal>,
    pub orders: BTreeMap<OrderId, Order>,
    pub logs: Vec<String>,
}

impl App {
    pub fn new() -> Self {
        Self {
            balance: None,
            quotes: BTreeMap::new(),
            orders: BTreeMap::new(),
            logs: Vec::new(),
        }
    }

    pub fn on_event(&mut self, event: UiEvent) {
        match event {
            UiEvent::QuoteUpdate(q) => {
                self.quotes.insert(q.symbol, q.price);
            }
            UiEvent::BalanceUpdate(b) => {
                self.balance = Some(b);
            }
            UiEvent::OrderUpdate(order) => {
                self.orders.insert(order.id, order);
            }
            UiEvent::Log(msg) => {
                self.logs.push(msg);
                if self.logs.len() > MAX_LOG_LINES {
                    self.logs.remove(0);
                }
            }
        }
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs until `q` is pressed.
pub async fn run(mut rx: mpsc::Receiver<UiEvent>) -> anyhow::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new();

    loop {
        terminal.draw(|f| ui(f, &app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if let KeyCode::Char('q') = key.code {
                    break;
                }
            }
        }

        while let Ok(event) = rx.try_recv() {
            app.on_event(event);
        }
        tokio::task::yield_now().await;
    }

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    Ok(())
}

fn status_color(status: OrderStatus) -> Color {
    match status {
        OrderStatus::Open => Color::Yellow,
        OrderStatus::Win => Color::Green,
        OrderStatus::Loss => Color::Red,
        OrderStatus::Cancelled => Color::DarkGray,
    }
}

fn ui(f: &mut ratatui::Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(10),
                Constraint::Length(10),
            ]
            .as_ref(),
        )
        .split(f.size());

    let balance_text = match app.balance {
        Some(b) => format!("${:.2}", b),
        None => "Waiting for data...".to_string(),
    };
    let quotes_text = app
        .quotes
        .iter()
        .map(|(s, p)| format!("{} {}", s, p))
        .collect::<Vec<_>>()
        .join(" | ");

    let header = Paragraph::new(Line::from(vec![
        Span::styled("Binary Sim", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" | Balance: "),
        Span::styled(
            balance_text,
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::raw(quotes_text),
    ]))
    .block(Block::default().borders(Borders::ALL).title("Account"));
    f.render_widget(header, chunks[0]);

    let rows: Vec<Row> = app
        .orders
        .values()
        .rev()
        .map(|o| Row::new(o.cells()).style(Style::default().fg(status_color(o.status))))
        .collect();
    let widths = [
        Constraint::Length(6),
        Constraint::Length(8),
        Constraint::Length(10),
        Constraint::Length(10),
        Constraint::Length(10),
        Constraint::Length(12),
    ];
    let orders = Table::new(rows, widths)
        .header(
            Row::new(Order::headers().to_vec())
                .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(Block::default().borders(Borders::ALL).title("Orders"));
    f.render_widget(orders, chunks[1]);

    let logs: Vec<ListItem> = app
        .logs
        .iter()
        .rev()
        .map(|s| ListItem::new(Line::from(Span::raw(s))))
        .collect();

    let logs_list =
        List::new(logs).block(Block::default().borders(Borders::ALL).title("System Logs"));
    f.render_widget(logs_list, chunks[2]);
}
