//! Determinism and convergence properties: save/load transparency, the
//! frame-500 round trip, and rollback convergence under jittered delivery.

mod common;

use common::{ScriptedHost, StubSim};
use netrewind::rng::Pcg32;
use netrewind::{Frame, InputStatus, PlayerSlot, Simulator};
use proptest::prelude::*;

const REMOTE: PlayerSlot = PlayerSlot::new(1);

fn confirmed(pair: (u8, u8)) -> [(u8, InputStatus); 2] {
    [
        (pair.0, InputStatus::Confirmed),
        (pair.1, InputStatus::Confirmed),
    ]
}

/// S6 — save a snapshot at frame 500, continue for 100 frames recording
/// every snapshot, rewind, replay the same inputs: all 100 snapshots are
/// identical.
#[test]
fn s6_round_trip_from_frame_500() {
    let mut sim = StubSim::new();
    let mut rng = Pcg32::from_match_seed(0x00C0_FFEE);
    for _ in 0..500 {
        let bits = (rng.next_u32() & 0xFF) as u8;
        sim.step(&confirmed((bits, bits.wrapping_add(1))));
    }

    let checkpoint = sim.save_state();
    let replay: Vec<(u8, u8)> = (0..100)
        .map(|_| {
            (
                (rng.next_u32() & 0xFF) as u8,
                (rng.next_u32() & 0xFF) as u8,
            )
        })
        .collect();

    let mut first_pass = Vec::with_capacity(100);
    for pair in &replay {
        sim.step(&confirmed(*pair));
        first_pass.push(sim.save_state());
    }

    sim.load_state(&checkpoint);
    let mut second_pass = Vec::with_capacity(100);
    for pair in &replay {
        sim.step(&confirmed(*pair));
        second_pass.push(sim.save_state());
    }

    assert_eq!(first_pass, second_pass);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// A save + load round trip anywhere in a run never changes subsequent
    /// snapshots.
    #[test]
    fn save_load_round_trip_is_transparent(
        inputs in prop::collection::vec(any::<(u8, u8)>(), 1..100),
        round_trip_at in 0usize..100,
    ) {
        let mut plain = StubSim::new();
        let mut round_tripped = StubSim::new();
        for (i, pair) in inputs.iter().enumerate() {
            if i == round_trip_at % inputs.len() {
                let snapshot = round_tripped.save_state();
                round_tripped.load_state(&snapshot);
            }
            plain.step(&confirmed(*pair));
            round_tripped.step(&confirmed(*pair));
            prop_assert_eq!(plain.save_state(), round_tripped.save_state());
        }
    }

    /// Rollback convergence: however the remote inputs are delayed (within
    /// the rollback horizon), the repaired timeline is bit-identical to one
    /// where every input arrived on time.
    #[test]
    fn rollback_converges_under_jittered_delivery(
        remote_inputs in prop::collection::vec(any::<u8>(), 40),
        delays in prop::collection::vec(0usize..4, 40),
    ) {
        let mut delayed = common::two_player_engine();
        let mut reference = common::two_player_engine();
        let mut delayed_host = ScriptedHost::new(0x05);
        let mut reference_host = ScriptedHost::new(0x05);

        // In-order delivery: frame f cannot arrive before frame f - 1.
        let mut deliver_at = Vec::with_capacity(remote_inputs.len());
        let mut latest = 0;
        for (f, delay) in delays.iter().enumerate() {
            latest = latest.max(f + delay);
            deliver_at.push(latest);
        }

        let mut previous_watermark = Frame::NULL;
        for iteration in 0..50usize {
            for (f, at) in deliver_at.iter().enumerate() {
                if *at == iteration {
                    delayed
                        .receive_remote_input(
                            Frame::new(f as i32),
                            REMOTE,
                            remote_inputs[f],
                        )
                        .unwrap();
                }
            }
            delayed.tick(&mut delayed_host).unwrap();
            prop_assert!(delayed.confirmed_frame() >= previous_watermark);
            previous_watermark = delayed.confirmed_frame();

            if iteration < remote_inputs.len() {
                reference
                    .receive_remote_input(
                        Frame::new(iteration as i32),
                        REMOTE,
                        remote_inputs[iteration],
                    )
                    .unwrap();
            }
            reference.tick(&mut reference_host).unwrap();
        }

        prop_assert_eq!(delayed.current_frame(), Frame::new(50));
        prop_assert_eq!(reference.current_frame(), Frame::new(50));
        // The on-time timeline never mispredicted.
        prop_assert_eq!(reference.stats().rollback_count, 0);
        prop_assert_eq!(delayed.simulator().state, reference.simulator().state);
    }
}
