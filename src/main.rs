use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Layout, Position};
use ratatui::style::{Color, Style};
use ratatui::widgets::Paragraph;
use ratatui::Terminal;
use std::cell::RefCell;
use std::io::{self, stdout};
use std::path::Path;
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use frozen_table::config::{TableConfig, TableOptions};
use frozen_table::data::memory_model::{load_csv, MemoryTableModel};
use frozen_table::data::table_model::TableModel;
use frozen_table::state::dispatcher::FnSubscriber;
use frozen_table::ui::table_renderer::render_table;
use frozen_table::ui::terminal_pane::TerminalPane;
use frozen_table::utils::logging::{init_tracing, LogRingBuffer};
use frozen_table::utils::settings_store::FileSettings;
use frozen_table::{Column, ColumnRegistry, Key, NativePane, Pane, PaneEvent, TableEvent, TableView};

const IDLE_POLL: Duration = Duration::from_millis(250);
const DOUBLE_CLICK: Duration = Duration::from_millis(400);
const WHEEL_ROWS: i32 = 3;
const MAX_COLUMN_WIDTH: u16 = 30;

fn main() -> Result<()> {
    let logs = init_tracing();
    let args: Vec<String> = std::env::args().collect();

    if args.contains(&"--generate-config".to_string()) {
        let path = TableConfig::get_config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(&path, TableConfig::create_default_with_comments())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Configuration file created at: {}", path.display());
        return Ok(());
    }

    let frozen = args
        .iter()
        .position(|arg| arg == "--frozen")
        .and_then(|pos| args.get(pos + 1))
        .map(|n| n.parse::<usize>().context("--frozen expects a column count"))
        .transpose()?
        .unwrap_or(1);

    let Some(file) = args
        .iter()
        .skip(1)
        .find(|arg| !arg.starts_with("--") && arg.ends_with(".csv"))
    else {
        show_usage();
        return Ok(());
    };

    let config = TableConfig::load().unwrap_or_else(|e| {
        warn!(target: "table_view", "Using default config: {:#}", e);
        TableConfig::default()
    });
    let options = TableOptions::from_config(&config);

    let path = Path::new(file);
    let model = load_csv(path)?;
    let columns = columns_for(&model, frozen)?;

    let mut view = TableView::with_options(TerminalPane::new(), TerminalPane::new(), &options)?;
    view.set_columns(columns)?;
    view.set_model(Some(Box::new(model)))?;

    let key = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("table")
        .to_string();
    let mut store = FileSettings::user_default()?;
    if view.persistent() {
        if let Err(e) = view.restore_state(&store, &key) {
            warn!(target: "layout", "Could not restore layout '{}': {}", key, e);
        }
    }

    let last_event = Rc::new(RefCell::new(String::new()));
    let sink = last_event.clone();
    view.subscribe(Box::new(FnSubscriber::new("status-line", move |event: &TableEvent| {
        *sink.borrow_mut() = describe(event);
    })));

    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("Failed to enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("Failed to create terminal")?;

    let result = run(&mut terminal, &mut view, &last_event, &logs);

    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)
        .context("Failed to leave alternate screen")?;

    if view.persistent() {
        view.save_state(&mut store, &key)
            .context("Failed to save table layout")?;
        info!(target: "layout", "Saved layout '{}'", key);
    }

    result.context("Table view failed")
}

/// One column per CSV header; the first `frozen` are frozen
fn columns_for(model: &MemoryTableModel, frozen: usize) -> Result<ColumnRegistry> {
    let columns = model.headers().iter().enumerate().map(|(i, name)| {
        let widest = (0..model.row_count().min(200))
            .map(|row| model.value(row, i).to_string().chars().count())
            .max()
            .unwrap_or(0)
            .max(name.chars().count() + 2);
        let width = u16::try_from(widest + 2)
            .unwrap_or(MAX_COLUMN_WIDTH)
            .min(MAX_COLUMN_WIDTH);
        Column::new(name.as_str())
            .with_width(width)
            .with_frozen(i < frozen)
    });
    Ok(ColumnRegistry::with_columns(columns)?)
}

fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    view: &mut TableView<TerminalPane>,
    last_event: &Rc<RefCell<String>>,
    logs: &LogRingBuffer,
) -> Result<()> {
    let mut last_click: Option<(Instant, u16, u16)> = None;

    loop {
        terminal.draw(|f| {
            let [table_area, status_area] =
                Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(f.area());
            view.set_bounds(table_area);
            render_table(f, view);

            let log_line = logs
                .latest()
                .map(|entry| entry.status_line())
                .unwrap_or_default();
            let status = format!(
                " {} | row {} of {} | {} ",
                last_event.borrow(),
                view.current_index().map_or("-".to_string(), |i| (i + 1).to_string()),
                view.item_count(),
                log_line
            );
            f.render_widget(
                Paragraph::new(status).style(Style::default().fg(Color::Black).bg(Color::Gray)),
                status_area,
            );
        })?;

        let timeout = view
            .next_timer_deadline(Instant::now())
            .unwrap_or(IDLE_POLL);
        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if !handle_key(view, key)? {
                        return Ok(());
                    }
                }
                Event::Mouse(mouse) => handle_mouse(view, mouse, &mut last_click),
                _ => {}
            }
        }
        view.on_timer(Instant::now());
    }
}

/// Returns false when the user asked to quit
fn handle_key(view: &mut TableView<TerminalPane>, key: KeyEvent) -> Result<bool> {
    let pane_key = match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return Ok(false),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return Ok(false),
        KeyCode::Char('s') => {
            let stretched = !view.last_column_stretched();
            view.set_last_column_stretched(stretched)?;
            return Ok(true);
        }
        KeyCode::Char('m') => {
            let multi = !view.multi_selection();
            view.set_multi_selection(multi)?;
            return Ok(true);
        }
        KeyCode::Char('x') => {
            let enabled = !view.check_boxes();
            view.set_check_boxes(enabled)?;
            return Ok(true);
        }
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::PageUp => Key::PageUp,
        KeyCode::PageDown => Key::PageDown,
        KeyCode::Home => Key::Home,
        KeyCode::End => Key::End,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::Char(' ') => Key::Space,
        KeyCode::Enter => Key::Enter,
        _ => return Ok(true),
    };
    view.handle_pane_event(Pane::Normal, PaneEvent::KeyDown(pane_key));
    Ok(true)
}

/// The pane under a screen position, with pane-local coordinates
fn pane_at(view: &TableView<TerminalPane>, x: u16, y: u16) -> Option<(Pane, u16, u16)> {
    [Pane::Frozen, Pane::Normal].into_iter().find_map(|pane| {
        let bounds = view.panes().get(pane).bounds();
        bounds
            .contains(Position::new(x, y))
            .then(|| (pane, x - bounds.x, y - bounds.y))
    })
}

fn handle_mouse(
    view: &mut TableView<TerminalPane>,
    mouse: MouseEvent,
    last_click: &mut Option<(Instant, u16, u16)>,
) {
    let Some((pane, x, y)) = pane_at(view, mouse.column, mouse.row) else {
        return;
    };

    let event = match mouse.kind {
        MouseEventKind::Down(button) => {
            let now = Instant::now();
            let double = button == MouseButton::Left
                && last_click.is_some_and(|(at, cx, cy)| {
                    now.duration_since(at) < DOUBLE_CLICK && (cx, cy) == (mouse.column, mouse.row)
                });
            *last_click = (!double).then_some((now, mouse.column, mouse.row));
            PaneEvent::ButtonDown {
                x,
                y,
                double,
                right: button == MouseButton::Right,
                extend: mouse.modifiers.contains(KeyModifiers::CONTROL),
            }
        }
        MouseEventKind::ScrollDown => PaneEvent::MouseWheel {
            delta_rows: WHEEL_ROWS,
        },
        MouseEventKind::ScrollUp => PaneEvent::MouseWheel {
            delta_rows: -WHEEL_ROWS,
        },
        MouseEventKind::ScrollLeft => PaneEvent::KeyDown(Key::Left),
        MouseEventKind::ScrollRight => PaneEvent::KeyDown(Key::Right),
        MouseEventKind::Moved => PaneEvent::MouseMove { x, y },
        _ => return,
    };
    view.handle_pane_event(pane, event);
}

fn describe(event: &TableEvent) -> String {
    match event {
        TableEvent::CurrentIndexChanged(Some(row)) => format!("current: row {}", row + 1),
        TableEvent::CurrentIndexChanged(None) => "current: none".to_string(),
        TableEvent::SelectedIndexesChanged(rows) => format!("{} selected", rows.len()),
        TableEvent::ItemActivated(row) => format!("activated row {}", row + 1),
        TableEvent::ColumnClicked(col) => format!("header {} clicked", col),
        other => other.kind().to_string(),
    }
}

fn show_usage() {
    println!("frozen-table - a table with frozen columns");
    println!();
    println!("Usage:");
    println!("  frozen-table <file.csv> [--frozen N]   Show a CSV file, N columns frozen (default 1)");
    println!("  frozen-table --generate-config        Write a commented config file");
    println!();
    println!("Controls:");
    println!("  Arrows, PgUp/PgDn, Home/End           Move the current row / scroll sideways");
    println!("  Enter, double click                    Activate the current row");
    println!("  Click a header                         Sort by that column");
    println!("  Space                                  Toggle the check box (with x)");
    println!("  x / m / s                              Check boxes / multi-select / stretch last column");
    println!("  q, Esc                                 Quit");
}
