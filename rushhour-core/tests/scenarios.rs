//! Session walkthroughs on the reference starting board.
//!
//! Board (6x6), `r` = red, `b` = blue:
//!
//! ```text
//! r r . . . .
//! . . . . . .
//! . . . . . .
//! . . . . . .
//! . . . . . .
//! . . . . b b
//! ```

use rushhour_core::{
    same_configuration, starting_configuration, Configuration, Observed, SlideRules, Tracker,
    Transition, ILLEGAL_MOVE_NOTICE,
};

fn red_right() -> Configuration {
    Configuration::from_pieces([("red", [[0, 1], [0, 2]]), ("blue", [[5, 4], [5, 5]])])
}

fn red_far_right() -> Configuration {
    Configuration::from_pieces([("red", [[0, 2], [0, 3]]), ("blue", [[5, 4], [5, 5]])])
}

/// Scenario A: the first legal move from the starting board.
fn after_first_move() -> Tracker<SlideRules> {
    let mut tracker = Tracker::new(starting_configuration(), SlideRules::new(6));
    let outcome = tracker.observe(red_right());
    assert_eq!(outcome, Observed::Discovered { transition: None });
    tracker
}

#[test]
fn scenario_a_first_move_discovers_without_edge() {
    let tracker = after_first_move();
    let state = tracker.state();
    assert_eq!(state.visited().len(), 2);
    assert!(state.transitions().is_empty());
    assert_eq!(state.message(), None);
    assert!(same_configuration(state.current(), &red_right()));
    assert_eq!(
        state.visited().as_slice(),
        &[starting_configuration().fingerprint(), red_right().fingerprint()]
    );
}

#[test]
fn scenario_b_echo_changes_nothing() {
    let mut tracker = after_first_move();
    let before = tracker.state().clone();

    tracker.observe(red_right());

    let state = tracker.state();
    assert_eq!(state.visited().as_slice(), before.visited().as_slice());
    assert_eq!(state.transitions().as_slice(), before.transitions().as_slice());
    assert_eq!(state.message(), None);
    assert!(same_configuration(state.current(), before.current()));
}

#[test]
fn scenario_c_blue_through_red_is_rejected() {
    let mut tracker = after_first_move();
    // Blue lands on (0,2), which red still occupies.
    let through_red =
        Configuration::from_pieces([("red", [[0, 1], [0, 2]]), ("blue", [[0, 2], [0, 3]])]);

    let outcome = tracker.observe(through_red);

    assert_eq!(outcome, Observed::Rejected);
    let state = tracker.state();
    assert!(same_configuration(state.current(), &red_right()));
    assert_eq!(state.message(), Some(ILLEGAL_MOVE_NOTICE));
    assert_eq!(state.visited().len(), 2);
}

#[test]
fn scenario_c_rejection_recovers_on_next_legal_move() {
    let mut tracker = after_first_move();
    let jumped =
        Configuration::from_pieces([("red", [[0, 1], [0, 2]]), ("blue", [[0, 4], [0, 5]])]);
    assert_eq!(tracker.observe(jumped), Observed::Rejected);
    assert!(tracker.state().is_rejected());

    let outcome = tracker.observe(red_far_right());
    let edge = Transition::new(red_right().fingerprint(), red_far_right().fingerprint());
    assert_eq!(outcome, Observed::Discovered { transition: Some(edge) });
    assert!(!tracker.state().is_rejected());
}

#[test]
fn negative_cell_is_rejected_as_a_move() {
    let mut tracker = after_first_move();
    let message: rushhour_core::InboundMessage = serde_json::from_str(
        r#"{"cars": {"red": [[0, -1], [0, 0]], "blue": [[5, 4], [5, 5]]}}"#,
    )
    .unwrap();

    let outcome = tracker.observe(message.cars);

    assert_eq!(outcome, Observed::Rejected);
    let state = tracker.state();
    assert_eq!(state.message(), Some(ILLEGAL_MOVE_NOTICE));
    assert!(same_configuration(state.current(), &red_right()));
    assert_eq!(state.visited().len(), 2);
}

#[test]
fn scenario_d_return_to_start_adds_no_edge() {
    let mut tracker = after_first_move();

    let outcome = tracker.observe(starting_configuration());

    assert_eq!(outcome, Observed::Revisited { transition: None });
    let state = tracker.state();
    assert!(state.transitions().is_empty());
    assert_eq!(state.visited().len(), 2);
    assert!(same_configuration(state.current(), &starting_configuration()));
    assert_eq!(state.message(), None);
}

#[test]
fn longer_session_builds_a_path() {
    let mut tracker = Tracker::new(starting_configuration(), SlideRules::new(6));
    tracker.observe(red_right());
    tracker.observe(red_far_right());
    tracker.observe(red_right());
    tracker.observe(starting_configuration());

    let state = tracker.state();
    assert_eq!(state.visited().len(), 3);
    assert_eq!(
        state.transitions().as_slice(),
        &[Transition::new(
            red_right().fingerprint(),
            red_far_right().fingerprint()
        )]
    );
}
