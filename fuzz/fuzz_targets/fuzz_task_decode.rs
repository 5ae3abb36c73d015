//! Fuzz target for replication task decoding.
//!
//! Tasks arrive from a remote cluster, so decoding and the payload shape
//! check must never panic on arbitrary bytes.

#![no_main]

use history_replication::task::{ReplicationTask, TaskPayload};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(task) = serde_json::from_slice::<ReplicationTask>(data) else {
        return;
    };

    // Should never panic
    match task.payload() {
        Ok(TaskPayload::NoOp) => {}
        Ok(_) => assert!(task.attributes.is_some()),
        Err(_) => {}
    }
    let _ = task.domain_id();
    let _ = task.task_type.as_str();
});
