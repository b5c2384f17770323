//! Behavioural tests covering complete probe runs over scripted seams.

use pegcheck::test_support::{
    ScriptedExecutor, ScriptedRunner, test_environment, test_transport_config,
};
use pegcheck::{
    OptionSet, Outcome, ProbeKind, ProbeOrchestrator, ProbeSpec, Transport, summarize,
};
use rstest::rstest;

fn orchestrator(
    runner: &ScriptedRunner,
    executor: ScriptedExecutor,
) -> ProbeOrchestrator<ScriptedRunner, ScriptedExecutor> {
    let transport =
        Transport::new(test_transport_config(), runner.clone()).expect("config should validate");
    ProbeOrchestrator::new(transport, executor)
}

fn script_happy_path(runner: &ScriptedRunner, results_json: &str) {
    runner.push_success();
    runner.push_success_with_file(results_json);
    runner.push_success();
    runner.push_success();
}

#[rstest]
fn http_probe_reports_success_with_detail_and_elapsed_time() {
    let runner = ScriptedRunner::new();
    script_happy_path(
        &runner,
        r#"{"results": "200 OK", "error": "", "elapsed": 1.23}"#,
    );
    let executor = ScriptedExecutor::new();
    executor.push_success();
    let orchestrator = orchestrator(&runner, executor);
    let options = OptionSet::new()
        .with("url", "https://example.com")
        .with("constant-name", "PANTHEON_SOIP_FOO");

    let result = orchestrator
        .run(
            &test_environment(),
            ProbeSpec::for_kind(ProbeKind::Curl),
            &options,
        )
        .expect("run should succeed");
    let outcome = summarize(ProbeKind::Curl, &result);
    let message = outcome.message(ProbeKind::Curl);

    assert!(!outcome.is_failure());
    assert!(message.contains("200 OK"), "message: {message}");
    assert!(message.contains("1.23"), "message: {message}");
}

#[rstest]
fn ssh_banner_probe_reports_failure_with_error_text() {
    let error_text =
        "Established a connection but server does not appear to be an SSH server.";
    let runner = ScriptedRunner::new();
    script_happy_path(
        &runner,
        &format!(r#"{{"results": "", "error": "{error_text}", "elapsed": 0.4}}"#),
    );
    let executor = ScriptedExecutor::new();
    executor.push_success();
    let orchestrator = orchestrator(&runner, executor);
    let options = OptionSet::new().with("constant-name", "PANTHEON_SOIP_BASTION");

    let result = orchestrator
        .run(
            &test_environment(),
            ProbeSpec::for_kind(ProbeKind::Ssh),
            &options,
        )
        .expect("run should succeed even when the probe failed");
    let outcome = summarize(ProbeKind::Ssh, &result);
    let message = outcome.message(ProbeKind::Ssh);

    assert!(outcome.is_failure());
    assert!(message.contains(error_text), "message: {message}");
}

#[rstest]
fn certificate_probe_is_informational_regardless_of_content() {
    let runner = ScriptedRunner::new();
    script_happy_path(
        &runner,
        r#"{"results": "-----BEGIN CERTIFICATE-----", "error": "", "elapsed": 2.1}"#,
    );
    let executor = ScriptedExecutor::new();
    executor.push_success();
    let orchestrator = orchestrator(&runner, executor);
    let options = OptionSet::new().with("constant-name", "PANTHEON_SOIP_MAIL");

    let result = orchestrator
        .run(
            &test_environment(),
            ProbeSpec::for_kind(ProbeKind::ShowCerts),
            &options,
        )
        .expect("run should succeed");
    let outcome = summarize(ProbeKind::ShowCerts, &result);

    assert!(matches!(outcome, Outcome::Info { .. }));
    let message = outcome.message(ProbeKind::ShowCerts);
    assert!(message.contains("BEGIN CERTIFICATE"), "message: {message}");
    assert!(message.contains("2.1"), "message: {message}");
}
