//! Black-box invariant tests against the public engine surface (spec §8).
//! Invariants that need direct store access (parent acyclicity, capacity,
//! fuse countdown, handler-score tie-breaking) are exercised as unit tests
//! next to the code that enforces them (`store.rs`, `time.rs`,
//! `dispatch.rs`) instead, since `WorldStore` isn't part of this crate's
//! public API.
use gnusto_core::{demo, ScriptedIo};
use proptest::prelude::*;

#[test]
fn look_and_inventory_produce_no_observable_drift() {
    let mut engine = demo::lamp_and_chest_world().build();
    let mut io = ScriptedIo::new(["look"]);
    engine.run_turn(&mut io);
    let first = io.transcript_text();

    let mut engine = demo::lamp_and_chest_world().build();
    let mut io = ScriptedIo::new(["look", "look"]);
    engine.run_turn(&mut io);
    engine.run_turn(&mut io);
    let second_look = io.transcript_text();
    assert!(second_look.ends_with(&first[first.find('\n').map_or(0, |i| i + 1)..]));
}

#[test]
fn snapshot_restore_reproduces_subsequent_behavior() {
    let mut baseline = demo::lamp_and_chest_world().build();
    let mut io = ScriptedIo::new(["take lamp"]);
    baseline.run_turn(&mut io);
    let snapshot = baseline.snapshot();

    let mut diverged = demo::lamp_and_chest_world().build();
    let mut diverge_io = ScriptedIo::new(["take lamp", "drop lamp"]);
    diverged.run_turn(&mut diverge_io);
    diverged.run_turn(&mut diverge_io);
    diverged.restore(snapshot).expect("snapshot captured by the same engine shape always restores");

    let mut tail_a = ScriptedIo::new(["inventory"]);
    baseline.run_turn(&mut tail_a);
    let mut tail_b = ScriptedIo::new(["inventory"]);
    diverged.run_turn(&mut tail_b);
    assert_eq!(tail_a.transcript_text(), tail_b.transcript_text());
}

#[test]
fn dropping_an_item_never_taken_is_refused() {
    let mut engine = demo::lamp_and_chest_world().build();
    let mut io = ScriptedIo::new(["drop chest"]);
    engine.run_turn(&mut io);
    assert!(io.transcript_text().contains("aren't holding"));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// The engine never panics on arbitrary player input, whatever the
    /// parser or dispatcher makes of it (spec §7: "internal-engine-error
    /// ... does not crash the host").
    #[test]
    fn arbitrary_single_line_input_never_panics(line in "[a-z ]{0,40}") {
        let mut engine = demo::lamp_and_chest_world().build();
        let mut io = ScriptedIo::new([line]);
        engine.run_turn(&mut io);
    }

    /// Same property over a handful of verbs this world actually knows,
    /// so most generated lines parse instead of bottoming out on
    /// "don't understand".
    #[test]
    fn arbitrary_known_verb_sequences_never_panic(
        verbs in prop::collection::vec(
            prop_oneof![
                Just("take lamp"), Just("take hook"), Just("take coin"),
                Just("drop lamp"), Just("open chest"), Just("close chest"),
                Just("put lamp in chest"), Just("turn on lamp"),
                Just("look"), Just("inventory"), Just("down"), Just("up"),
                Just("wait"), Just("score"),
            ],
            1..8,
        )
    ) {
        let mut engine = demo::lamp_and_chest_world().build();
        let mut io = ScriptedIo::new(verbs);
        for _ in 0..8 {
            engine.run_turn(&mut io);
        }
    }
}
