#![no_main]

use libfuzzer_sys::fuzz_target;
use redwood_fuzz_utils::{CommandSequence, RunnerState};

fuzz_target!(|seq: CommandSequence| {
    let mut runner = RunnerState::init(seq.config);
    for c in &seq.cmds {
        runner.run_cmd(c);
    }
    runner.finish();
});
