#![no_main]

use libfuzzer_sys::fuzz_target;
use redwood::config::Balance;
use redwood_fuzz_utils::{CommandSequence, RunnerState};

// Same as `buffer_commands`, but the tree never rebalances, so deep and lopsided trees get
// exercised too
fuzz_target!(|seq: CommandSequence| {
    let mut config = seq.config;
    config.tree.balance = Balance::Unbalanced;

    let mut runner = RunnerState::init(config);
    for c in &seq.cmds {
        runner.run_cmd(c);
    }
    runner.finish();
});
