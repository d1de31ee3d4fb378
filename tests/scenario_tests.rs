//! End-to-end wiring scenarios
//!
//! These tests drive the sandbox the way a front-end would and check the
//! completion map, the gating flag and the clock together.


use mocks::*;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};
use wiring_lab::{BoardEvent, ClockState, Intent, IntentOutcome, PinSelection, PinValue, Position};

#[cfg(test)]
mod pair_scenarios {
    use super::*;

    #[test]
    fn test_forward_wire_unlocks_then_removal_locks() {
        let mut lab = pair_lab();
        let wire = lab.add_wire("A", 0, "B", 0).unwrap();
        assert_eq!(lab.completion().get("req1"), Some(&true));
        assert!(lab.all_satisfied());

        assert!(lab.request_start().is_ok());
        assert_eq!(lab.clock_state(), ClockState::Running);

        lab.remove_wire(&wire.id).unwrap();
        assert_eq!(lab.completion().get("req1"), Some(&false));
        assert!(!lab.all_satisfied());
        assert_eq!(lab.clock_state(), ClockState::Stopped);
        assert!(!lab.tick());
        assert!(!lab.poll(Instant::now() + Duration::from_secs(60)));
        assert_eq!(lab.clock().tick_count(), 0);
    }

    #[test]
    fn test_reverse_wire_satisfies_requirement() {
        let mut lab = pair_lab();
        lab.add_wire("B", 0, "A", 0).unwrap();
        assert_eq!(lab.completion().get("req1"), Some(&true));
        assert!(lab.all_satisfied());
    }

    #[test]
    fn test_reverse_after_removing_forward_stays_satisfied() {
        let mut lab = pair_lab();
        let forward = lab.add_wire("A", 0, "B", 0).unwrap();
        lab.remove_wire(&forward.id);
        lab.add_wire("B", 0, "A", 0).unwrap();
        assert!(lab.completion()["req1"]);
    }

    #[test]
    fn test_unrelated_removal_leaves_map_unchanged() {
        let mut lab = pair_lab();
        lab.add_wire("A", 0, "B", 0).unwrap();
        let unrelated = lab.add_wire("A", 1, "B", 1).unwrap();
        let before = lab.completion().clone();
        lab.remove_wire(&unrelated.id).unwrap();
        assert_eq!(&before, lab.completion());
    }

    #[test]
    fn test_duplicate_wires_collapse_to_one() {
        let mut lab = pair_lab();
        assert!(lab.add_wire("A", 0, "B", 0).is_some());
        assert!(lab.add_wire("A", 0, "B", 0).is_none());
        assert!(lab.add_wire("B", 0, "A", 0).is_none());
        assert_eq!(lab.board().wires().len(), 1);
    }

    #[test]
    fn test_empty_board_is_locked() {
        let mut lab = pair_lab();
        assert!(!lab.all_satisfied());
        let err = lab.request_start().unwrap_err();
        assert_eq!(err.remaining, 1);
        assert_eq!(lab.clock_state(), ClockState::Stopped);
    }

    #[test]
    fn test_dangling_wire_counts_as_nothing() {
        let mut lab = pair_lab();
        lab.add_wire("A", 0, "B", 0).unwrap();
        lab.remove_node("A").unwrap();
        assert_eq!(lab.board().wires().len(), 1);
        assert!(!lab.completion()["req1"]);
        assert!(lab.board().dangling_wires().next().is_some());
    }
}

#[cfg(test)]
mod clock_scenarios {
    use super::*;

    #[test]
    fn test_locked_start_never_touches_pins() {
        let mut lab = builtin_lab();
        let before: Vec<_> = lab.board().nodes().iter().map(|n| n.levels()).collect();
        assert!(lab.request_start().is_err());
        assert!(!lab.tick());
        let after: Vec<_> = lab.board().nodes().iter().map(|n| n.levels()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_running_clock_animates_outputs() {
        let mut lab = builtin_lab();
        wire_all(&mut lab);
        assert!(lab.all_satisfied());
        lab.request_start().unwrap();

        for expected in [PinValue::High, PinValue::Low, PinValue::High] {
            assert!(lab.tick());
            assert_eq!(lab.board().node("uno").unwrap().pins[2].level, expected);
            assert_eq!(lab.board().node("sw1").unwrap().pins[1].level, expected);
        }
        // Power, ground and passive pins never move
        assert_eq!(lab.board().node("uno").unwrap().pins[0].level, PinValue::Low);
        assert_eq!(lab.board().node("r1").unwrap().levels(), vec![PinValue::Low; 2]);
    }

    #[test]
    fn test_pause_is_resumable() {
        let mut lab = builtin_lab();
        wire_all(&mut lab);
        lab.request_start().unwrap();
        lab.tick();
        let snapshot: Vec<_> = lab.board().nodes().iter().map(|n| n.levels()).collect();

        lab.request_pause();
        assert!(!lab.tick());
        let paused: Vec<_> = lab.board().nodes().iter().map(|n| n.levels()).collect();
        assert_eq!(snapshot, paused);

        lab.request_start().unwrap();
        assert!(lab.tick());
        assert_eq!(lab.clock().tick_count(), 2);
    }

    #[test]
    fn test_poll_ticks_on_period() {
        let mut lab = builtin_lab();
        wire_all(&mut lab);
        let t0 = Instant::now();
        lab.request_start_at(t0).unwrap();
        let period = lab.clock().period();

        assert!(!lab.poll(t0));
        assert!(lab.poll(t0 + period));
        lab.request_pause();
        assert!(!lab.poll(t0 + period * 10));
        assert_eq!(lab.clock().tick_count(), 1);
    }

    #[test]
    fn test_reset_restores_everything() {
        let mut lab = builtin_lab();
        let defaults = lab.board().nodes().to_vec();

        wire_all(&mut lab);
        lab.request_start().unwrap();
        lab.tick();
        lab.place_node("led", Position::new(600.0, 300.0)).unwrap();
        lab.update_node_position("uno", 5.0, 5.0);
        lab.select_pin("r1", 0);

        lab.reset();
        assert_eq!(lab.board().nodes(), defaults.as_slice());
        assert!(lab.board().wires().is_empty());
        assert!(lab.completion().values().all(|done| !done));
        assert_eq!(lab.clock_state(), ClockState::Stopped);
        assert_eq!(lab.clock().tick_count(), 0);
        assert!(lab.pending_selection().is_none());
    }

    #[test]
    fn test_reset_from_fresh_state() {
        let mut lab = pair_lab();
        let defaults = lab.board().nodes().to_vec();
        lab.reset();
        assert_eq!(lab.board().nodes(), defaults.as_slice());
        assert_eq!(lab.completion().len(), 1);
    }
}

#[cfg(test)]
mod intent_scenarios {
    use super::*;

    #[test]
    fn test_two_selections_make_a_wire() {
        let mut lab = pair_lab();
        let first = lab.dispatch(Intent::SelectPin {
            node: "B".to_string(),
            pin: 0,
        });
        assert!(matches!(first, IntentOutcome::Selection(PinSelection::Pending(_))));

        let second = lab.dispatch(Intent::SelectPin {
            node: "A".to_string(),
            pin: 0,
        });
        match second {
            IntentOutcome::Selection(PinSelection::Connected(wire)) => {
                assert_eq!(wire.id, "B:0->A:0");
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(lab.dispatch(Intent::RequestStart), IntentOutcome::Started(Ok(())));
        assert_eq!(lab.dispatch(Intent::RequestPause), IntentOutcome::Paused);
    }

    #[test]
    fn test_place_and_remove_node_intents() {
        let mut lab = builtin_lab();
        let placed = lab.dispatch(Intent::PlaceNode {
            component_type: "resistor".to_string(),
            position: Position::new(10.0, 10.0),
        });
        assert_eq!(placed, IntentOutcome::Placed(Some("resistor-1".to_string())));
        assert_eq!(
            lab.dispatch(Intent::RemoveNode("resistor-1".to_string())),
            IntentOutcome::NodeRemoved(true)
        );
        assert_eq!(
            lab.dispatch(Intent::RemoveNode("resistor-1".to_string())),
            IntentOutcome::NodeRemoved(false)
        );
    }

    #[test]
    fn test_extra_component_does_not_satisfy_key() {
        // A second LED wired the same way is a different node
        let mut lab = builtin_lab();
        let id = lab.place_node("led", Position::default()).unwrap();
        lab.add_wire("r1", 1, &id, 0).unwrap();
        assert!(!lab.completion()["r1-led"]);
    }

    #[test]
    fn test_observers_follow_mutations() {
        let mut lab = pair_lab();
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        let sub = lab.subscribe(move |event| sink.borrow_mut().push(event.clone()));

        let wire = lab.add_wire("A", 0, "B", 0).unwrap();
        lab.update_node_position("A", 3.0, 4.0);
        lab.remove_wire(&wire.id);
        lab.reset();
        assert!(lab.unsubscribe(sub));
        lab.add_wire("A", 0, "B", 0);

        let events = events.borrow();
        assert_eq!(events.len(), 4);
        assert_eq!(events[0], BoardEvent::WireAdded(wire.clone()));
        assert_eq!(
            events[1],
            BoardEvent::NodeMoved {
                id: "A".to_string(),
                position: Position::new(3.0, 4.0)
            }
        );
        assert_eq!(events[2], BoardEvent::WireRemoved(wire));
        assert_eq!(events[3], BoardEvent::Reset);
    }
}
