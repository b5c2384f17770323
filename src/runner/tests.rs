//! Unit tests for the probe orchestrator.

use super::*;
use crate::environment::FrameworkKind;
use crate::probe::ProbeKind;
use crate::test_support::{
    ScriptedExecutor, ScriptedRunner, test_environment, test_transport_config,
};
use crate::transport::TransportConfig;
use rstest::{fixture, rstest};

const CURL_RESULTS: &str = r#"{"results": "200 OK", "error": "", "elapsed": 1.23}"#;

#[fixture]
fn environment() -> Environment {
    test_environment()
}

fn orchestrator(
    config: TransportConfig,
    runner: &ScriptedRunner,
    executor: ScriptedExecutor,
) -> ProbeOrchestrator<ScriptedRunner, ScriptedExecutor> {
    let transport = Transport::new(config, runner.clone()).expect("config should validate");
    ProbeOrchestrator::new(transport, executor)
}

fn curl_options() -> OptionSet {
    OptionSet::new()
        .with("url", "https://example.com")
        .with("constant-name", "PANTHEON_SOIP_FOO")
}

/// Scripts the transport for a full successful run: push, pull (with
/// results payload), and two cleanup removals.
fn script_happy_path(runner: &ScriptedRunner, results_json: &str) {
    runner.push_success();
    runner.push_success_with_file(results_json);
    runner.push_success();
    runner.push_success();
}

#[rstest]
fn run_returns_parsed_result_on_success(environment: Environment) {
    let runner = ScriptedRunner::new();
    script_happy_path(&runner, CURL_RESULTS);
    let executor = ScriptedExecutor::new();
    executor.push_success();
    let orchestrator = orchestrator(test_transport_config(), &runner, executor);
    let spec = ProbeSpec::for_kind(ProbeKind::Curl);

    let result = orchestrator
        .run(&environment, spec, &curl_options())
        .expect("run should succeed");

    assert_eq!(result.results, "200 OK");
    assert_eq!(result.error, "");

    let invocations = runner.invocations();
    assert_eq!(invocations.len(), 4, "push, pull, and two removals");
    let programs: Vec<&str> = invocations
        .iter()
        .map(|invocation| invocation.program.as_str())
        .collect();
    assert_eq!(programs, ["rsync", "rsync", "sftp", "sftp"]);
}

#[rstest]
fn run_builds_drush_command_from_configured_files_dir(environment: Environment) {
    let runner = ScriptedRunner::new();
    script_happy_path(&runner, CURL_RESULTS);
    let executor = ScriptedExecutor::new();
    executor.push_success();
    let orchestrator = orchestrator(test_transport_config(), &runner, executor);
    let spec = ProbeSpec::for_kind(ProbeKind::Curl);

    orchestrator
        .run(&environment, spec, &curl_options())
        .expect("run should succeed");

    let commands = orchestrator.executor.commands();
    assert_eq!(
        commands,
        vec![vec![
            String::from("drush"),
            String::from("scr"),
            String::from("curltest.php"),
            String::from("--script-path=/srv/bindings/test/files"),
        ]]
    );
}

#[rstest]
fn run_discovers_files_dir_when_not_configured(environment: Environment) {
    let config = TransportConfig {
        remote_files_dir: None,
        ..test_transport_config()
    };
    let runner = ScriptedRunner::new();
    runner.push_success();
    runner.push_output(
        Some(0),
        "sftp> pwd\nRemote working directory: /srv/bindings/discovered\n",
        "",
    );
    runner.push_success_with_file(CURL_RESULTS);
    runner.push_success();
    runner.push_success();
    let executor = ScriptedExecutor::new();
    executor.push_success();
    let orchestrator = orchestrator(config, &runner, executor);
    let spec = ProbeSpec::for_kind(ProbeKind::Curl);

    orchestrator
        .run(&environment, spec, &curl_options())
        .expect("run should succeed");

    let commands = orchestrator.executor.commands();
    let command = commands.first().expect("one execution");
    assert_eq!(
        command.last().map(String::as_str),
        Some("--script-path=/srv/bindings/discovered/files")
    );
}

#[rstest]
fn run_validates_before_any_transport_call(environment: Environment) {
    let runner = ScriptedRunner::new();
    let executor = ScriptedExecutor::new();
    let orchestrator = orchestrator(test_transport_config(), &runner, executor);
    let spec = ProbeSpec::for_kind(ProbeKind::Curl);
    let options = OptionSet::new().with("url", "https://example.com");

    let err = orchestrator
        .run(&environment, spec, &options)
        .expect_err("missing constant-name should fail");

    assert!(
        matches!(err, ProbeRunError::MissingOption(ref missing) if missing.key == "constant-name")
    );
    assert!(
        runner.invocations().is_empty(),
        "validation must precede transport"
    );
    assert!(orchestrator.executor.commands().is_empty());
}

#[rstest]
fn run_aborts_on_push_failure_without_cleanup(environment: Environment) {
    let runner = ScriptedRunner::new();
    runner.push_failure(12);
    let executor = ScriptedExecutor::new();
    let orchestrator = orchestrator(test_transport_config(), &runner, executor);
    let spec = ProbeSpec::for_kind(ProbeKind::Curl);

    let err = orchestrator
        .run(&environment, spec, &curl_options())
        .expect_err("push failure should abort");

    assert!(matches!(err, ProbeRunError::Push(_)));
    assert_eq!(runner.invocations().len(), 1, "nothing was deployed");
    assert!(orchestrator.executor.commands().is_empty());
}

#[rstest]
fn run_rejects_unknown_framework_after_push_and_still_cleans_up(environment: Environment) {
    let target = Environment {
        framework: FrameworkKind::Unknown(String::from("backdrop")),
        ..environment
    };
    let runner = ScriptedRunner::new();
    runner.push_success();
    runner.push_success();
    runner.push_success();
    let executor = ScriptedExecutor::new();
    let orchestrator = orchestrator(test_transport_config(), &runner, executor);
    let spec = ProbeSpec::for_kind(ProbeKind::Curl);

    let err = orchestrator
        .run(&target, spec, &curl_options())
        .expect_err("unknown framework should fail");

    assert!(matches!(
        err,
        ProbeRunError::Exec(ExecError::UnsupportedFramework { .. })
    ));
    let invocations = runner.invocations();
    assert_eq!(invocations.len(), 3, "push plus two removal attempts");
    assert!(orchestrator.executor.commands().is_empty());
}

#[rstest]
fn run_surfaces_execution_failure_and_cleans_up(environment: Environment) {
    let runner = ScriptedRunner::new();
    runner.push_success();
    runner.push_success();
    runner.push_success();
    let executor = ScriptedExecutor::new();
    executor.push_failure(255, "PHP Fatal error");
    let orchestrator = orchestrator(test_transport_config(), &runner, executor);
    let spec = ProbeSpec::for_kind(ProbeKind::Curl);

    let err = orchestrator
        .run(&environment, spec, &curl_options())
        .expect_err("remote failure should abort");

    let ProbeRunError::Execute {
        status_text,
        stderr,
        ..
    } = err
    else {
        panic!("expected Execute error");
    };
    assert_eq!(status_text, "255");
    assert_eq!(stderr, "PHP Fatal error");
    assert_eq!(
        runner.invocations().len(),
        3,
        "push plus two removal attempts"
    );
}

#[rstest]
fn run_reports_missing_results_file_and_attempts_both_removals(environment: Environment) {
    let runner = ScriptedRunner::new();
    runner.push_success();
    // Pull reports success without materialising a local file.
    runner.push_success();
    runner.push_success();
    runner.push_success();
    let executor = ScriptedExecutor::new();
    executor.push_success();
    let orchestrator = orchestrator(test_transport_config(), &runner, executor);
    let spec = ProbeSpec::for_kind(ProbeKind::Curl);

    let err = orchestrator
        .run(&environment, spec, &curl_options())
        .expect_err("absent results file should fail");

    assert!(matches!(err, ProbeRunError::ResultsNotFound { .. }));
    let invocations = runner.invocations();
    assert_eq!(invocations.len(), 4, "push, pull, and two removal attempts");
    let removals: Vec<String> = invocations
        .iter()
        .filter(|invocation| invocation.program == "sftp")
        .filter_map(|invocation| invocation.stdin.clone())
        .collect();
    assert_eq!(
        removals,
        vec![
            String::from("rm files/curltest_results.json\n"),
            String::from("rm files/curltest.php\n"),
        ]
    );
}

#[rstest]
fn run_returns_result_even_when_every_cleanup_fails(environment: Environment) {
    let runner = ScriptedRunner::new();
    runner.push_success();
    runner.push_success_with_file(CURL_RESULTS);
    runner.push_failure(1);
    runner.push_failure(1);
    let executor = ScriptedExecutor::new();
    executor.push_success();
    let orchestrator = orchestrator(test_transport_config(), &runner, executor);
    let spec = ProbeSpec::for_kind(ProbeKind::Curl);

    let result = orchestrator
        .run(&environment, spec, &curl_options())
        .expect("cleanup failures must not mask the result");

    assert_eq!(result.results, "200 OK");
    assert_eq!(runner.invocations().len(), 4);
}

#[rstest]
fn run_rejects_malformed_results(environment: Environment) {
    let runner = ScriptedRunner::new();
    script_happy_path(&runner, "definitely not json");
    let executor = ScriptedExecutor::new();
    executor.push_success();
    let orchestrator = orchestrator(test_transport_config(), &runner, executor);
    let spec = ProbeSpec::for_kind(ProbeKind::Curl);

    let err = orchestrator
        .run(&environment, spec, &curl_options())
        .expect_err("malformed JSON should fail");

    assert!(matches!(err, ProbeRunError::MalformedResult { .. }));
}

#[rstest]
fn run_renders_ldap_defaults_into_the_deployed_script(environment: Environment) {
    let runner = ScriptedRunner::new();
    script_happy_path(
        &runner,
        r#"{"results": "bound", "error": "", "elapsed": 0.2}"#,
    );
    let executor = ScriptedExecutor::new();
    executor.push_success();
    let orchestrator = orchestrator(test_transport_config(), &runner, executor);
    let spec = ProbeSpec::for_kind(ProbeKind::Ldap);
    let options = OptionSet::new().with("constant-name", "PANTHEON_SOIP_DIR");

    orchestrator
        .run(&environment, spec, &options)
        .expect("run should succeed");

    // The staged script was uploaded from the temp workspace; its path is
    // the second-to-last rsync argument on the first invocation.
    let invocations = runner.invocations();
    let push = invocations.first().expect("push invocation");
    let local = push
        .args
        .iter()
        .rev()
        .nth(1)
        .expect("local path argument")
        .to_string_lossy()
        .into_owned();
    assert!(local.ends_with("ldaptest.php"), "local: {local}");
}
