//! Console session tests: typed commands driving the sandbox end to end.


use mocks::*;
use wiring_lab::console::{render_status, ConsoleApp, ConsoleConfig};
use wiring_lab::ClockState;

fn console() -> ConsoleApp {
    ConsoleApp::new(builtin_lab(), ConsoleConfig::default())
}

// uno: 5V=0 GND=1 D13=2 D2=3; r1/led1/sw1: two pins each
const FULL_WIRING: [&str; 5] = [
    "wire uno 2 r1 0",
    "wire r1 1 led1 0",
    "wire led1 1 uno 1",
    "wire uno 0 sw1 0",
    "wire sw1 1 uno 3",
];

#[test]
fn test_full_session() {
    let mut app = console();

    assert!(app.execute_line("start").starts_with("Cannot start"));

    for (i, line) in FULL_WIRING.iter().enumerate() {
        let message = app.execute_line(line);
        assert!(message.starts_with("Connected"), "{}: {}", line, message);
        if i < FULL_WIRING.len() - 1 {
            assert!(message.contains(&format!("({}/5 connections)", i + 1)));
        } else {
            assert!(message.contains("'start' is unlocked"));
        }
    }

    assert_eq!(app.execute_line("start"), "Simulation running");
    assert_eq!(app.sandbox().clock_state(), ClockState::Running);
    assert_eq!(app.execute_line("tick"), "Tick 1");
    assert_eq!(app.execute_line("tick"), "Tick 2");

    assert_eq!(app.execute_line("pause"), "Simulation paused");
    assert_eq!(app.execute_line("tick"), "Simulation is not running");

    let status = app.execute_line("status");
    assert!(status.starts_with("5/5 connections, 4 nodes, 5 wires (0 dangling)"));
    assert!(!status.contains("[ ]"));
}

#[test]
fn test_unwire_while_running_stops_clock() {
    let mut app = console();
    for line in FULL_WIRING {
        app.execute_line(line);
    }
    app.execute_line("start");
    assert!(app.sandbox().clock().is_running());

    let message = app.execute_line("unwire uno:2->r1:0");
    assert!(message.starts_with("Removed wire uno:2->r1:0"));
    assert_eq!(app.sandbox().clock_state(), ClockState::Stopped);
    assert!(app.execute_line("start").contains("1 required connection(s)"));
}

#[test]
fn test_select_two_pins_makes_wire() {
    let mut app = console();
    assert!(app.execute_line("select uno 2").starts_with("Selected uno:2"));
    assert_eq!(app.sandbox().pending_selection().map(|e| e.pin), Some(2));

    let message = app.execute_line("select r1 0");
    assert!(message.starts_with("Connected uno:2->r1:0"));
    assert!(app.sandbox().pending_selection().is_none());
    assert_eq!(app.sandbox().board().wires().len(), 1);

    app.execute_line("select led1 0");
    assert_eq!(app.execute_line("select led1 0"), "Selection cleared");
    assert_eq!(app.sandbox().board().wires().len(), 1);
}

#[test]
fn test_rejected_wires() {
    let mut app = console();
    assert_eq!(app.execute_line("wire uno 0 uno 1"), "Those pins cannot be connected");
    assert_eq!(app.execute_line("wire uno 9 r1 0"), "Those pins cannot be connected");
    app.execute_line("wire uno 2 r1 0");
    assert_eq!(app.execute_line("wire r1 0 uno 2"), "Those pins cannot be connected");
    assert_eq!(app.execute_line("unwire nope"), "No wire 'nope'");
}

#[test]
fn test_place_move_remove() {
    let mut app = console();
    assert_eq!(app.execute_line("place led 100 100"), "Placed led-1");
    assert_eq!(app.execute_line("place led 120 100"), "Placed led-2");
    assert_eq!(app.execute_line("place capacitor 0 0"), "Unknown component type 'capacitor'");

    assert_eq!(app.execute_line("move led-1 5 6"), "Moved led-1 to (5, 6)");
    let led = app.sandbox().board().node("led-1").unwrap();
    assert_eq!((led.position.x, led.position.y), (5.0, 6.0));

    app.execute_line("wire led-1 0 r1 1");
    assert_eq!(app.execute_line("remove led-1"), "Removed led-1");
    assert_eq!(app.execute_line("remove led-1"), "No component 'led-1'");
    assert!(render_status(app.sandbox()).contains("1 wires (1 dangling)"));
}

#[test]
fn test_reset_restores_catalog_board() {
    let mut app = console();
    app.execute_line("place resistor 1 1");
    app.execute_line("wire uno 2 r1 0");
    app.execute_line("remove sw1");

    assert_eq!(app.execute_line("reset"), "Board reset");
    let status = render_status(app.sandbox());
    assert!(status.starts_with("0/5 connections, 4 nodes, 0 wires"));
    assert!(app.sandbox().board().node("sw1").is_some());
    assert!(app.sandbox().board().node("resistor-1").is_none());
}

#[test]
fn test_bad_input_keeps_previous_board() {
    let mut app = console();
    assert!(app.execute_line("frobnicate").contains("Unknown command"));
    assert!(app.execute_line("wire uno").contains("Wrong arguments"));
    assert_eq!(app.sandbox().board().wires().len(), 0);

    let before = app.status().to_string();
    assert_eq!(app.execute_line("# just a comment"), before);
}

#[test]
fn test_pair_catalog_session() {
    let mut app = ConsoleApp::new(pair_lab(), ConsoleConfig::default());
    assert!(app.execute_line("wire B 0 A 0").contains("'start' is unlocked"));
    assert_eq!(app.execute_line("start"), "Simulation running");
    assert_eq!(app.execute_line("quit"), "Bye");
    assert!(!app.is_running());
    assert_eq!(app.sandbox().clock_state(), ClockState::Stopped);
}
