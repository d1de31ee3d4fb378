//! # Console Interface Module
//!
//! Terminal front-end for the wiring lab. It plays two roles: it turns typed
//! commands into sandbox intents, and it renders the board, the wires and the
//! connection checklist.
//!
//! ## Features
//! - Line commands for placing, moving and wiring components
//! - Live checklist of required connections
//! - Pin levels while the simulation runs
//! - Single-threaded loop: key handling and clock ticks never overlap

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame, Terminal,
};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::io;
use std::time::{Duration, Instant};

use crate::board::Position;
use crate::clock::ClockState;
use crate::sandbox::{PinSelection, Sandbox};

const HELP_LINES: [(&str, &str); 13] = [
    ("place <type> <x> <y>", "Place a new component"),
    ("move <node> <x> <y>", "Move a component"),
    ("remove <node>", "Remove a component (its wires stay, dangling)"),
    ("select <node> <pin>", "Pick a wire end; pick a second pin to connect"),
    ("wire <node> <pin> <node> <pin>", "Connect two pins directly"),
    ("unwire <wire-id>", "Delete a wire"),
    ("start", "Run the simulation (needs every connection)"),
    ("pause", "Pause the simulation"),
    ("reset", "Restore the starting board"),
    ("tick", "Advance the running simulation by one step"),
    ("status", "Summarise progress"),
    ("help", "Show/hide this help"),
    ("quit", "Leave the lab"),
];

/// Console configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub refresh_rate_ms: u64,
    pub show_checklist: bool,
    pub show_wires: bool,
    pub show_pins: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            refresh_rate_ms: 100,
            show_checklist: true,
            show_wires: true,
            show_pins: true,
        }
    }
}

/// A parsed console command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Place {
        component_type: String,
        position: Position,
    },
    Move {
        node: String,
        position: Position,
    },
    Remove(String),
    Select {
        node: String,
        pin: usize,
    },
    Wire {
        from_node: String,
        from_pin: usize,
        to_node: String,
        to_pin: usize,
    },
    Unwire(String),
    Start,
    Pause,
    Reset,
    Tick,
    Status,
    Help,
    Quit,
}

impl Command {
    /// Parse one input line. Blank lines and `#` comments yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Command>, String> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }
        let words: Vec<&str> = line.split_whitespace().collect();
        let verb = words[0].to_lowercase();
        let args = &words[1..];

        let command = match (verb.as_str(), args) {
            ("place", [component_type, x, y]) => Command::Place {
                component_type: component_type.to_string(),
                position: Position::new(parse_coord(x)?, parse_coord(y)?),
            },
            ("move", [node, x, y]) => Command::Move {
                node: node.to_string(),
                position: Position::new(parse_coord(x)?, parse_coord(y)?),
            },
            ("remove", [node]) => Command::Remove(node.to_string()),
            ("select", [node, pin]) => Command::Select {
                node: node.to_string(),
                pin: parse_pin(pin)?,
            },
            ("wire", [from_node, from_pin, to_node, to_pin]) => Command::Wire {
                from_node: from_node.to_string(),
                from_pin: parse_pin(from_pin)?,
                to_node: to_node.to_string(),
                to_pin: parse_pin(to_pin)?,
            },
            ("unwire", [id]) => Command::Unwire(id.to_string()),
            ("start" | "run", []) => Command::Start,
            ("pause" | "stop", []) => Command::Pause,
            ("reset", []) => Command::Reset,
            ("tick", []) => Command::Tick,
            ("status", []) => Command::Status,
            ("help" | "h", []) => Command::Help,
            ("quit" | "exit" | "q", []) => Command::Quit,
            (
                "place" | "move" | "remove" | "select" | "wire" | "unwire" | "start" | "run"
                | "pause" | "stop" | "reset" | "tick" | "status" | "help" | "h" | "quit" | "exit"
                | "q",
                _,
            ) => return Err(format!("Wrong arguments for '{}' (try 'help')", verb)),
            _ => return Err(format!("Unknown command '{}' (try 'help')", verb)),
        };
        Ok(Some(command))
    }
}

fn parse_coord(text: &str) -> Result<f64, String> {
    text.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("'{}' is not a coordinate", text))
}

fn parse_pin(text: &str) -> Result<usize, String> {
    text.parse::<usize>()
        .map_err(|_| format!("'{}' is not a pin index", text))
}

/// Console UI application state
pub struct ConsoleApp {
    sandbox: Sandbox,
    config: ConsoleConfig,
    running: bool,
    command_buffer: String,
    show_help: bool,
    selected_pane: usize,
    status: String,
}

impl ConsoleApp {
    pub fn new(sandbox: Sandbox, config: ConsoleConfig) -> Self {
        Self {
            sandbox,
            config,
            running: true,
            command_buffer: String::new(),
            show_help: false,
            selected_pane: 0,
            status: "Type 'help' for commands".to_string(),
        }
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Parse and run one line, returning the message shown to the user.
    pub fn execute_line(&mut self, line: &str) -> String {
        let message = match Command::parse(line) {
            Ok(Some(command)) => self.execute(command),
            Ok(None) => return self.status.clone(),
            Err(e) => e,
        };
        self.status = message.clone();
        message
    }

    pub fn execute(&mut self, command: Command) -> String {
        log::debug!("Console command: {:?}", command);
        match command {
            Command::Place {
                component_type,
                position,
            } => match self.sandbox.place_node(&component_type, position) {
                Some(id) => format!("Placed {}", id),
                None => format!("Unknown component type '{}'", component_type),
            },
            Command::Move { node, position } => {
                if self.sandbox.update_node_position(&node, position.x, position.y) {
                    format!("Moved {} to ({}, {})", node, position.x, position.y)
                } else {
                    format!("No component '{}'", node)
                }
            }
            Command::Remove(node) => match self.sandbox.remove_node(&node) {
                Some(_) => format!("Removed {}", node),
                None => format!("No component '{}'", node),
            },
            Command::Select { node, pin } => match self.sandbox.select_pin(&node, pin) {
                PinSelection::Pending(end) => format!("Selected {}, pick the other end", end),
                PinSelection::Cancelled => "Selection cleared".to_string(),
                PinSelection::Connected(wire) => self.describe_new_wire(&wire.id),
                PinSelection::Rejected => "Those pins cannot be connected".to_string(),
            },
            Command::Wire {
                from_node,
                from_pin,
                to_node,
                to_pin,
            } => match self.sandbox.add_wire(&from_node, from_pin, &to_node, to_pin) {
                Some(wire) => self.describe_new_wire(&wire.id),
                None => "Those pins cannot be connected".to_string(),
            },
            Command::Unwire(id) => match self.sandbox.remove_wire(&id) {
                Some(_) => {
                    let mut message = format!("Removed wire {}", id);
                    if !self.sandbox.all_satisfied() && self.sandbox.clock_state() == ClockState::Stopped {
                        let _ = write!(message, " ({} connection(s) missing)", self.sandbox.matcher().remaining());
                    }
                    message
                }
                None => format!("No wire '{}'", id),
            },
            Command::Start => match self.sandbox.request_start() {
                Ok(()) => "Simulation running".to_string(),
                Err(rejected) => format!("Cannot start: {}", rejected),
            },
            Command::Pause => {
                self.sandbox.request_pause();
                "Simulation paused".to_string()
            }
            Command::Reset => {
                self.sandbox.reset();
                "Board reset".to_string()
            }
            Command::Tick => {
                if self.sandbox.tick() {
                    format!("Tick {}", self.sandbox.clock().tick_count())
                } else {
                    "Simulation is not running".to_string()
                }
            }
            Command::Status => render_status(&self.sandbox),
            Command::Help => {
                self.show_help = !self.show_help;
                help_text()
            }
            Command::Quit => {
                self.running = false;
                self.sandbox.request_pause();
                "Bye".to_string()
            }
        }
    }

    fn describe_new_wire(&self, id: &str) -> String {
        let matcher = self.sandbox.matcher();
        if matcher.all_satisfied() {
            format!("Connected {}; all connections made, 'start' is unlocked", id)
        } else {
            format!(
                "Connected {} ({}/{} connections)",
                id,
                matcher.satisfied_count(),
                matcher.requirements().len()
            )
        }
    }

    /// Give the clock a chance to tick. Call between input events.
    pub fn pump(&mut self, now: Instant) -> bool {
        self.sandbox.poll(now)
    }

    pub fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        // Setup terminal
        enable_raw_mode().map_err(|e| format!("Failed to enable raw mode: {}", e))?;
        let mut stdout = io::stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(format!("Failed to enter alternate screen: {}", e).into());
        }

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = match Terminal::new(backend) {
            Ok(terminal) => terminal,
            Err(e) => {
                let _ = disable_raw_mode();
                let mut stdout = io::stdout();
                let _ = execute!(stdout, LeaveAlternateScreen);
                return Err(e.into());
            }
        };

        let result = self.event_loop(&mut terminal);
        finish_with_restore(result, || restore_terminal(&mut terminal))
    }

    fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.running = true;
        let refresh = Duration::from_millis(self.config.refresh_rate_ms.max(10));
        let mut last_draw: Option<Instant> = None;
        let mut dirty = true;

        while self.running {
            if event::poll(Duration::from_millis(10))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key_event(key.code);
                        dirty = true;
                    }
                }
            }

            if self.pump(Instant::now()) {
                dirty = true;
            }

            let due = last_draw.map_or(true, |t| t.elapsed() >= refresh);
            if dirty && due {
                terminal.draw(|f| self.draw_ui(f))?;
                last_draw = Some(Instant::now());
                dirty = false;
            }
        }
        Ok(())
    }

    fn handle_key_event(&mut self, key: KeyCode) {
        if self.show_help && key != KeyCode::Enter {
            self.show_help = false;
            return;
        }
        match key {
            KeyCode::Esc => {
                self.execute(Command::Quit);
            }
            KeyCode::Tab => {
                self.selected_pane = (self.selected_pane + 1) % 3;
            }
            KeyCode::Backspace => {
                self.command_buffer.pop();
            }
            KeyCode::Enter => {
                let line = std::mem::take(&mut self.command_buffer);
                self.execute_line(&line);
            }
            KeyCode::Char(c) => {
                if !c.is_control() {
                    self.command_buffer.push(c);
                }
            }
            _ => {}
        }
    }

    fn draw_ui(&self, f: &mut Frame) {
        let size = f.size();

        if self.show_help {
            self.draw_help_screen(f);
            return;
        }

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4), // Title bar
                Constraint::Min(8),    // Main content
                Constraint::Length(3), // Command bar
            ])
            .split(size);

        let clock = self.sandbox.clock();
        let state_color = match clock.state() {
            ClockState::Running => Color::Green,
            ClockState::Stopped => Color::Red,
        };
        let title_text = vec![
            Line::from(vec![
                Span::styled(
                    format!("Wiring Lab: {}", self.sandbox.catalog().name()),
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw("   Simulation: "),
                Span::styled(clock.state().to_str(), Style::default().fg(state_color)),
                Span::raw(format!("   Ticks: {}", clock.tick_count())),
            ]),
            Line::from(vec![Span::raw(self.status.clone())]),
        ];
        let title = Paragraph::new(title_text)
            .block(Block::default().borders(Borders::ALL).title("Status"))
            .wrap(Wrap { trim: true });
        f.render_widget(title, chunks[0]);

        let content_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(chunks[1]);

        let right_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(content_chunks[1]);

        self.draw_board(f, content_chunks[0]);
        if self.config.show_checklist {
            self.draw_checklist(f, right_chunks[0]);
        }
        if self.config.show_wires {
            self.draw_wires(f, right_chunks[1]);
        }

        let command_text = if self.command_buffer.is_empty() {
            "Enter command (type 'help')..."
        } else {
            &self.command_buffer
        };
        let command_bar = Paragraph::new(command_text)
            .style(Style::default().fg(Color::White))
            .block(Block::default().borders(Borders::ALL).title("Command"));
        f.render_widget(command_bar, chunks[2]);
    }

    fn pane_block(&self, index: usize, title: &'static str) -> Block<'static> {
        let border = if self.selected_pane == index {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title(title)
    }

    fn draw_board(&self, f: &mut Frame, area: Rect) {
        let pending = self.sandbox.pending_selection();
        let mut lines = Vec::new();
        for node in self.sandbox.board().nodes() {
            lines.push(Line::from(vec![
                Span::styled(node.id.clone(), Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(format!(
                    " ({}) @ ({:.0}, {:.0})",
                    node.component_type, node.position.x, node.position.y
                )),
            ]));
            if self.config.show_pins {
                let mut spans = vec![Span::raw("   ")];
                for (index, pin) in node.pins.iter().enumerate() {
                    let selected = pending.is_some_and(|end| end.node == node.id && end.pin == index);
                    let style = if selected {
                        Style::default().fg(Color::Black).bg(Color::Yellow)
                    } else if pin.level.to_bool() {
                        Style::default().fg(Color::Green)
                    } else {
                        Style::default().fg(Color::DarkGray)
                    };
                    spans.push(Span::styled(
                        format!("[{}] {}={} ", index, pin.name, pin.level.to_char()),
                        style,
                    ));
                }
                lines.push(Line::from(spans));
            }
        }

        let board = Paragraph::new(lines)
            .block(self.pane_block(0, "Board"))
            .wrap(Wrap { trim: false });
        f.render_widget(board, area);
    }

    fn draw_checklist(&self, f: &mut Frame, area: Rect) {
        let matcher = self.sandbox.matcher();
        let mut lines = vec![Line::from(vec![Span::raw(format!(
            "{}/{} connections",
            matcher.satisfied_count(),
            matcher.requirements().len()
        ))])];
        for item in self.sandbox.checklist() {
            let (mark, color) = if item.satisfied {
                ("[x]", Color::Green)
            } else {
                ("[ ]", Color::Gray)
            };
            lines.push(Line::from(vec![
                Span::styled(mark, Style::default().fg(color)),
                Span::raw(format!(" {}", item.label)),
            ]));
        }

        let checklist = Paragraph::new(lines)
            .block(self.pane_block(1, "Checklist"))
            .wrap(Wrap { trim: true });
        f.render_widget(checklist, area);
    }

    fn draw_wires(&self, f: &mut Frame, area: Rect) {
        let board = self.sandbox.board();
        let lines: Vec<Line> = if board.wires().is_empty() {
            vec![Line::from("No wires yet")]
        } else {
            board
                .wires()
                .iter()
                .map(|wire| {
                    let style = if board.is_dangling(wire) {
                        Style::default().fg(Color::DarkGray).add_modifier(Modifier::CROSSED_OUT)
                    } else {
                        Style::default()
                    };
                    Line::from(vec![
                        Span::styled(wire.id.clone(), style),
                        Span::raw(format!(" [{}]", wire.color)),
                    ])
                })
                .collect()
        };

        let wires = Paragraph::new(lines)
            .block(self.pane_block(2, "Wires"))
            .wrap(Wrap { trim: true });
        f.render_widget(wires, area);
    }

    fn draw_help_screen(&self, f: &mut Frame) {
        let size = f.size();
        let mut help_text = vec![
            Line::from(vec![Span::styled(
                "Wiring Lab Help",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )]),
            Line::from(""),
            Line::from(vec![Span::styled(
                "Commands:",
                Style::default().add_modifier(Modifier::BOLD),
            )]),
        ];
        for (usage, description) in HELP_LINES {
            help_text.push(Line::from(vec![
                Span::styled(format!("  {}", usage), Style::default().fg(Color::Yellow)),
                Span::raw(format!(" - {}", description)),
            ]));
        }
        help_text.push(Line::from(""));
        help_text.push(Line::from(vec![
            Span::styled("  Tab", Style::default().fg(Color::Yellow)),
            Span::raw(" - Switch between panes, "),
            Span::styled("Esc", Style::default().fg(Color::Yellow)),
            Span::raw(" - Quit"),
        ]));
        help_text.push(Line::from(""));
        help_text.push(Line::from(vec![Span::raw(
            "Press any key to return to main view...",
        )]));

        let help = Paragraph::new(help_text)
            .style(Style::default().fg(Color::White))
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title("Help"));
        f.render_widget(help, size);
    }
}

/// Run `restore` whatever `result` holds. The loop's own error wins over a
/// failure to restore.
fn finish_with_restore<E>(
    result: Result<(), E>,
    restore: impl FnOnce() -> Result<(), E>,
) -> Result<(), E> {
    let restored = restore();
    result.and(restored)
}

/// Leave raw mode and the alternate screen. Every step is attempted; the
/// first failure is reported.
fn restore_terminal(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
) -> Result<(), Box<dyn std::error::Error>> {
    let raw = disable_raw_mode().map_err(|e| format!("Failed to disable raw mode: {}", e));
    let screen = execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .map_err(|e| format!("Failed to leave alternate screen: {}", e));
    let cursor = terminal
        .show_cursor()
        .map_err(|e| format!("Failed to show cursor: {}", e));
    raw?;
    screen?;
    cursor?;
    Ok(())
}

/// Plain-text progress summary.
pub fn render_status(sandbox: &Sandbox) -> String {
    let matcher = sandbox.matcher();
    let board = sandbox.board();
    let mut out = format!(
        "{}/{} connections, {} nodes, {} wires ({} dangling), simulation {}",
        matcher.satisfied_count(),
        matcher.requirements().len(),
        board.nodes().len(),
        board.wires().len(),
        board.dangling_wires().count(),
        sandbox.clock_state()
    );
    for item in sandbox.checklist() {
        let mark = if item.satisfied { 'x' } else { ' ' };
        let _ = write!(out, "\n  [{}] {}", mark, item.label);
    }
    out
}

pub fn help_text() -> String {
    HELP_LINES
        .iter()
        .map(|(usage, description)| format!("{:<32} {}", usage, description))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Public interface for launching the console
pub fn run_console(sandbox: Sandbox, config: ConsoleConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut app = ConsoleApp::new(sandbox, config);
    app.run()
}
