//! Tests for subprocess workers, using shell stand-ins for the worker binary
#![cfg(unix)]

use fieldsplit_core_rs::protocol::{self, FrameKind, ProtocolError};
use fieldsplit_core_rs::worker::{ProcessWorker, WorkerCommand, WorkerFailure, WorkerLauncher};
use fieldsplit_core_rs::{
    BinaryType, Fields, Grid, InterpolationRequest, OrchestrationError, Orchestrator,
    OrchestratorConfig,
};
use std::time::{Duration, Instant};

fn request(n: usize) -> InterpolationRequest {
    let coords: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let grid = Grid::new(coords.clone(), coords.clone(), coords).unwrap();
    InterpolationRequest::new(BinaryType::Bbh, grid, "bbh.info")
}

fn shell(script: &str) -> ProcessWorker {
    ProcessWorker::new(WorkerCommand::new("sh").arg("-c").arg(script))
}

#[test]
fn test_nonzero_exit_is_reported() {
    let err = shell("exit 3").launch(1, &request(4), None).unwrap_err();
    assert_eq!(err.ordinal, 1);
    assert!(matches!(err.failure, WorkerFailure::ExitStatus { code: 3 }));
}

#[test]
fn test_killed_worker_is_reported() {
    let err = shell("kill -9 $$").launch(0, &request(2), None).unwrap_err();
    assert!(matches!(err.failure, WorkerFailure::Signaled));
}

#[test]
fn test_missing_program_is_spawn_failure() {
    let worker = ProcessWorker::new(WorkerCommand::for_program("/nonexistent/fieldsplit-worker"));
    let err = worker.launch(0, &request(2), None).unwrap_err();
    assert!(matches!(err.failure, WorkerFailure::Spawn { .. }));
    assert!(err.to_string().contains("worker #0"));
}

#[test]
fn test_echoed_request_is_rejected() {
    // `cat` hands the request frame straight back.
    let worker = ProcessWorker::new(WorkerCommand::new("cat"));
    let err = worker.launch(2, &request(3), None).unwrap_err();
    assert!(matches!(
        err.failure,
        WorkerFailure::Protocol(ProtocolError::UnexpectedFrame {
            expected: FrameKind::Fields,
            found: FrameKind::Request
        })
    ));
}

#[test]
fn test_empty_output_is_rejected() {
    let err = shell("cat > /dev/null").launch(0, &request(3), None).unwrap_err();
    assert!(matches!(
        err.failure,
        WorkerFailure::Protocol(ProtocolError::TruncatedHeader { actual: 0 })
    ));
}

#[test]
fn test_wrong_point_count_is_rejected() {
    let path = std::env::temp_dir().join(format!("fieldsplit-short-{}.bin", std::process::id()));
    std::fs::write(&path, protocol::encode_fields(&Fields::zeros(2)).unwrap()).unwrap();

    let worker = ProcessWorker::new(WorkerCommand::new("cat").arg(path.to_str().unwrap()));
    let err = worker.launch(0, &request(5), None).unwrap_err();
    let _ = std::fs::remove_file(&path);

    assert!(matches!(
        err.failure,
        WorkerFailure::LengthMismatch {
            expected: 5,
            actual: 2
        }
    ));
}

#[test]
fn test_valid_frame_is_accepted() {
    let path = std::env::temp_dir().join(format!("fieldsplit-ok-{}.bin", std::process::id()));
    let fields = Fields::from_fn(4, |name, i| (name.index() + i) as f64).unwrap();
    std::fs::write(&path, protocol::encode_fields(&fields).unwrap()).unwrap();

    let worker = ProcessWorker::new(WorkerCommand::new("cat").arg(path.to_str().unwrap()));
    let result = worker.launch(0, &request(4), None);
    let _ = std::fs::remove_file(&path);

    assert_eq!(result.unwrap(), fields);
}

#[test]
fn test_deadline_kills_worker() {
    let started = Instant::now();
    let deadline = started + Duration::from_millis(200);
    let err = shell("exec sleep 30").launch(0, &request(1), Some(deadline)).unwrap_err();

    assert!(err.is_timeout());
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[test]
fn test_orchestration_timeout() {
    let config = OrchestratorConfig::new(2).with_timeout(Duration::from_millis(200));
    let err = Orchestrator::new(shell("exec sleep 30"), config)
        .orchestrate(&request(4))
        .unwrap_err();

    match err {
        OrchestrationError::Worker(worker_err) => {
            assert_eq!(worker_err.ordinal, 0);
            assert!(worker_err.is_timeout());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_large_request_does_not_deadlock() {
    // Far larger than a pipe buffer.
    let n = 200_000;
    let script = "cat > /dev/null; exit 4";
    let err = shell(script).launch(0, &request(n), None).unwrap_err();
    assert!(matches!(err.failure, WorkerFailure::ExitStatus { code: 4 }));
}

#[test]
fn test_environment_is_passed_to_worker() {
    let worker = ProcessWorker::new(
        WorkerCommand::new("sh")
            .arg("-c")
            .arg("exit $FIELDSPLIT_TEST_CODE")
            .env("FIELDSPLIT_TEST_CODE", "7"),
    );
    let err = worker.launch(0, &request(1), None).unwrap_err();
    assert!(matches!(err.failure, WorkerFailure::ExitStatus { code: 7 }));
}
