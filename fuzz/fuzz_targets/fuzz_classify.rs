//! Fuzz target for gap classification and resend request building.
//!
//! Engine errors are built from arbitrary fields; classification must be
//! total and the legacy request must never be built without a run id.

#![no_main]

use history_replication::classify::{
    classify, legacy_resend_request, ndc_resend_request, GapError, TaskIdentity,
};
use history_replication::engine::{EngineError, RetryTaskError, RetryTaskV2Error};
use history_replication::task::FIRST_EVENT_ID;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: (u8, &str, &str, Option<i64>, Option<i64>, i64)| {
    let (kind, run_id, message, first, second, end_event_id) = data;

    let err = match kind % 4 {
        0 => EngineError::RetryTask(RetryTaskError {
            message: message.to_string(),
            run_id: run_id.to_string(),
            next_event_id: first,
            ..Default::default()
        }),
        1 => EngineError::RetryTaskV2(RetryTaskV2Error {
            message: message.to_string(),
            run_id: run_id.to_string(),
            start_event_id: first,
            end_event_id: second,
            ..Default::default()
        }),
        2 => EngineError::Unavailable(message.to_string()),
        _ => EngineError::Internal(message.to_string()),
    };

    let task = TaskIdentity {
        domain_id: "domain",
        workflow_id: "workflow",
        run_id: "run",
    };

    match classify(&err) {
        Some(GapError::V1(retry)) => {
            match legacy_resend_request(&retry, task, end_event_id, "source") {
                Some(request) => {
                    assert!(!request.begin.run_id.is_empty());
                    assert_eq!(
                        request.begin.event_id,
                        retry.next_event_id.unwrap_or(FIRST_EVENT_ID)
                    );
                    assert_eq!(request.end.event_id, end_event_id);
                }
                None => assert!(retry.run_id.is_empty()),
            }
        }
        Some(GapError::V2(retry)) => {
            let request = ndc_resend_request(&retry, task, "source");
            assert!(!request.run_id.is_empty());
            assert_eq!(request.start_event_id, retry.start_event_id);
            assert_eq!(request.end_event_id, retry.end_event_id);
        }
        None => assert!(kind % 4 >= 2),
    }
});
