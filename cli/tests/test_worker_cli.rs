//! Process-level tests against the real `fieldsplit` binary
//!
//! Every test pins the synthetic backend through the environment, which
//! worker processes inherit.

use fieldsplit_core_rs::protocol;
use fieldsplit_core_rs::worker::{ProcessWorker, WorkerCommand, WorkerFailure, WorkerLauncher};
use fieldsplit_core_rs::{
    BinaryType, FieldName, Grid, InterpolationRequest, Interpolator, OrchestrationError,
    Orchestrator, OrchestratorConfig, SyntheticInterpolator,
};
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

const FIELDSPLIT: &str = env!("CARGO_BIN_EXE_fieldsplit");

fn sample_request(n_points: usize, binary_type: BinaryType) -> InterpolationRequest {
    let x: Vec<f64> = (0..n_points).map(|i| i as f64 * 0.5 - 2.0).collect();
    let y: Vec<f64> = (0..n_points).map(|i| (i as f64).sin()).collect();
    let z: Vec<f64> = (0..n_points).map(|i| 0.1 * i as f64).collect();
    InterpolationRequest::new(binary_type, Grid::new(x, y, z).unwrap(), "bns.info")
        .with_interpolation_offset(0.25)
}

fn synthetic_worker() -> ProcessWorker {
    ProcessWorker::new(WorkerCommand::for_program(FIELDSPLIT).env("FIELDSPLIT_BACKEND", "synthetic"))
}

fn run_fieldsplit(args: &[&str], stdin: &[u8]) -> Output {
    let mut child = Command::new(FIELDSPLIT)
        .args(args)
        .env("FIELDSPLIT_BACKEND", "synthetic")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn fieldsplit");
    // The child may exit before reading; a broken pipe is part of the outcome.
    let _ = child.stdin.take().unwrap().write_all(stdin);
    child.wait_with_output().unwrap()
}

fn scratch_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("fieldsplit-{}-{name}", std::process::id()))
}

// ============================================================================
// Worker contract
// ============================================================================

#[test]
fn test_worker_answers_request_on_stdout() {
    let request = sample_request(7, BinaryType::Bns);
    let output = run_fieldsplit(&["interpolate"], &protocol::encode_request(&request).unwrap());

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let fields = protocol::decode_fields(&output.stdout).unwrap();
    assert_eq!(fields, SyntheticInterpolator::new().interpolate(&request).unwrap());
}

#[test]
fn test_worker_rejects_garbage_input() {
    let output = run_fieldsplit(&["interpolate"], b"definitely not a frame");
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(!output.stderr.is_empty());
}

#[test]
fn test_worker_rejects_fields_frame_as_request() {
    let fields = SyntheticInterpolator::new()
        .interpolate(&sample_request(3, BinaryType::Bbh))
        .unwrap();
    let output = run_fieldsplit(&["interpolate"], &protocol::encode_fields(&fields).unwrap());
    assert!(!output.status.success());
}

#[test]
fn test_unknown_action_fails() {
    let output = run_fieldsplit(&["extrapolate"], b"");
    assert!(!output.status.success());
}

#[cfg(not(feature = "native"))]
#[test]
fn test_native_backend_unavailable_without_feature() {
    let request = sample_request(2, BinaryType::Bns);
    let output = run_fieldsplit(
        &["interpolate", "--backend", "native"],
        &protocol::encode_request(&request).unwrap(),
    );
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("native"));
}

#[cfg(not(feature = "native"))]
#[test]
fn test_worker_without_backend_choice_refuses_to_run() {
    let request = InterpolationRequest::new(
        BinaryType::Bns,
        Grid::new(vec![0.0], vec![0.0], vec![0.0]).unwrap(),
        "/nonexistent/real.info",
    );
    let mut child = Command::new(FIELDSPLIT)
        .arg("interpolate")
        .env_remove("FIELDSPLIT_BACKEND")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn fieldsplit");
    let _ = child
        .stdin
        .take()
        .unwrap()
        .write_all(&protocol::encode_request(&request).unwrap());
    let output = child.wait_with_output().unwrap();

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("native"));
}

#[cfg(not(feature = "native"))]
#[test]
fn test_info_unsupported_by_synthetic_backend() {
    let output = run_fieldsplit(&["info", "--kind", "bns", "bns.info"], b"");
    assert!(!output.status.success());
}

// ============================================================================
// Process workers driven from the library
// ============================================================================

#[test]
fn test_process_worker_round_trip() {
    let request = sample_request(12, BinaryType::Bhns);
    let fields = synthetic_worker().launch(0, &request, None).unwrap();

    assert_eq!(fields.n_points(), 12);
    assert_eq!(fields, SyntheticInterpolator::new().interpolate(&request).unwrap());
}

#[test]
fn test_process_worker_reports_exit_status() {
    let worker = ProcessWorker::new(WorkerCommand::for_program(FIELDSPLIT).env("FIELDSPLIT_BACKEND", "native"));
    let request = sample_request(4, BinaryType::Bns);
    let err = worker.launch(5, &request, None).unwrap_err();

    assert_eq!(err.ordinal, 5);
    if cfg!(not(feature = "native")) {
        assert!(matches!(err.failure, WorkerFailure::ExitStatus { code } if code != 0));
    }
}

#[test]
fn test_ten_points_three_workers_match_direct_call() {
    let request = sample_request(10, BinaryType::Bns);
    let orchestrator = Orchestrator::new(synthetic_worker(), OrchestratorConfig::new(3));
    let merged = orchestrator.orchestrate(&request).unwrap();

    assert_eq!(merged.n_points(), 10);
    assert_eq!(merged, SyntheticInterpolator::new().interpolate(&request).unwrap());
}

#[test]
fn test_single_worker_matches_direct_call() {
    let request = sample_request(9, BinaryType::Bbh);
    let orchestrator = Orchestrator::new(synthetic_worker(), OrchestratorConfig::new(1));
    let merged = orchestrator.orchestrate(&request).unwrap();

    assert_eq!(merged, SyntheticInterpolator::new().interpolate(&request).unwrap());
    assert!(merged.get(FieldName::Rho).iter().all(|&rho| rho == 0.0));
}

#[test]
fn test_too_many_workers_is_partition_error() {
    let request = sample_request(2, BinaryType::Bns);
    let orchestrator = Orchestrator::new(synthetic_worker(), OrchestratorConfig::new(3));
    assert!(matches!(
        orchestrator.orchestrate(&request),
        Err(OrchestrationError::Partition(_))
    ));
}

// ============================================================================
// Operator entry
// ============================================================================

#[test]
fn test_run_writes_merged_fields() {
    let request = sample_request(25, BinaryType::Bns);
    let request_path = scratch_path("run-request.bin");
    let output_path = scratch_path("run-output.bin");
    std::fs::write(&request_path, protocol::encode_request(&request).unwrap()).unwrap();

    let output = Command::new(FIELDSPLIT)
        .arg("run")
        .args(["--workers", "4"])
        .arg("--request")
        .arg(&request_path)
        .arg("--output")
        .arg(&output_path)
        .env("FIELDSPLIT_BACKEND", "synthetic")
        .env_remove("FIELDSPLIT_WORKER")
        .env_remove("FIELDSPLIT_TIMEOUT_SECS")
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let merged = protocol::decode_fields(&std::fs::read(&output_path).unwrap()).unwrap();
    assert_eq!(merged, SyntheticInterpolator::new().interpolate(&request).unwrap());

    let _ = std::fs::remove_file(request_path);
    let _ = std::fs::remove_file(output_path);
}

#[test]
fn test_run_rejects_zero_workers() {
    let request_path = scratch_path("zero-request.bin");
    let output_path = scratch_path("zero-output.bin");
    std::fs::write(
        &request_path,
        protocol::encode_request(&sample_request(3, BinaryType::Bns)).unwrap(),
    )
    .unwrap();

    let output = Command::new(FIELDSPLIT)
        .arg("run")
        .args(["--workers", "0"])
        .arg("--request")
        .arg(&request_path)
        .arg("--output")
        .arg(&output_path)
        .env("FIELDSPLIT_BACKEND", "synthetic")
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(!output_path.exists());

    let _ = std::fs::remove_file(request_path);
}

#[test]
fn test_run_rejects_invalid_timeout() {
    let output = Command::new(FIELDSPLIT)
        .args(["run", "--workers", "1", "--request", "missing.bin", "--output", "out.bin"])
        .arg("--timeout-secs=0")
        .output()
        .unwrap();
    assert!(!output.status.success());
}
