#![no_main]

use iec62056_sim::iec62056::interpreter::written_bytes;
use iec62056_sim::{Action, Interpreter, ProtocolState};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // First byte picks the chunk size so reads split at arbitrary points
    let Some((&split, rest)) = data.split_first() else {
        return;
    };
    let chunk_size = usize::from(split).max(1);

    let mut interp = Interpreter::new();
    for chunk in rest.chunks(chunk_size) {
        let was_switched = interp.state() == ProtocolState::Switched9600;
        let actions = interp.process(chunk);

        // The readout can only be answered once the settle delay has passed
        if !was_switched {
            assert!(written_bytes(&actions).iter().all(|b| *b != 0x02));
        }

        // Settle immediately, as if the driver's timer fired between reads
        if actions
            .iter()
            .any(|a| matches!(a, Action::ScheduleBaudSwitch { .. }))
        {
            interp.finish_baud_switch();
        }

        let session = interp.session();
        assert!(session.raw_buffer.len() <= 1024);
        assert!(session.framer.pending_len() <= 1024);
        assert!(session.framer.pending_hex().len() <= 1024 * 3);
    }

    assert!(interp.stats().acks_sent <= 1);
});
