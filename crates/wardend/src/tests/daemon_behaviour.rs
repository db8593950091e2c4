//! Behavioural tests covering the daemon's signal loop.

use std::cell::RefCell;

use camino::Utf8PathBuf;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use warden_config::Config;

use crate::daemon::{DaemonError, run_daemon_with};
use crate::process::ControlSignal;
use crate::tests::support::{
    ControllerHarness, SEED_FILES, ScriptStep, ScriptedSignals, TestConfigLoader,
};

type StepResult = Result<(), String>;

const BASE_LDIF: &str = "dn: o=base\nobjectClass: organization\n";

struct DaemonWorld {
    harness: ControllerHarness,
    loader: TestConfigLoader,
    config: Config,
    signals: Option<ScriptedSignals>,
    result: Option<Result<(), DaemonError>>,
}

impl DaemonWorld {
    fn new() -> Self {
        let harness = ControllerHarness::new();
        let loader = TestConfigLoader::for_root(&harness.root());
        let config = loader.current();
        Self {
            harness,
            loader,
            config,
            signals: Some(ScriptedSignals::default()),
            result: None,
        }
    }

    fn script(&mut self, step: ScriptStep) {
        let signals = self.signals.take().unwrap_or_default();
        self.signals = Some(signals.then(step));
    }

    fn run(&mut self) {
        let mut signals = self.signals.take().unwrap_or_default();
        let result = run_daemon_with(
            &self.loader,
            &self.config,
            &mut self.harness.controller,
            &mut signals,
        );
        self.result = Some(result);
    }
}

#[fixture]
fn world() -> RefCell<DaemonWorld> {
    RefCell::new(DaemonWorld::new())
}

#[given("a daemon for a fresh install root")]
fn given_daemon(world: &RefCell<DaemonWorld>) {
    assert!(!world.borrow().harness.root().exists());
}

#[given("the operator sends reload")]
fn given_reload(world: &RefCell<DaemonWorld>) {
    world
        .borrow_mut()
        .script(ScriptStep::Signal(ControlSignal::Reload));
}

#[given("the operator sends shutdown")]
fn given_shutdown(world: &RefCell<DaemonWorld>) {
    world
        .borrow_mut()
        .script(ScriptStep::Signal(ControlSignal::Shutdown));
}

#[given("the configuration on disk sets the LDAP port to {port}")]
fn given_reloaded_port(world: &RefCell<DaemonWorld>, port: u16) {
    world.borrow().loader.edit(|config| config.ldap_port = port);
}

#[given("the configuration on disk cannot be parsed")]
fn given_unparseable(world: &RefCell<DaemonWorld>) {
    world
        .borrow()
        .loader
        .fail_with_args(&["--ldap-port", "not-a-port"]);
}

#[given("the configuration on disk names an empty backend")]
fn given_empty_backend(world: &RefCell<DaemonWorld>) {
    world
        .borrow()
        .loader
        .edit(|config| config.backend_id = String::new());
}

#[given("the configuration names a base LDIF")]
fn given_base_ldif(world: &RefCell<DaemonWorld>) -> StepResult {
    let mut world = world.borrow_mut();
    let path = world.harness.write_file("base.ldif", BASE_LDIF);
    let path = Utf8PathBuf::from_path_buf(path)
        .map_err(|path| format!("non utf-8 path {}", path.display()))?;
    world.config.base_ldif = Some(path.clone());
    world.loader.edit(|config| config.base_ldif = Some(path));
    Ok(())
}

#[when("the daemon runs")]
fn when_daemon_runs(world: &RefCell<DaemonWorld>) {
    world.borrow_mut().run();
}

#[then("the daemon run succeeds")]
fn then_run_succeeds(world: &RefCell<DaemonWorld>) {
    let world = world.borrow();
    let result = world.result.as_ref().expect("daemon should have run");
    assert!(result.is_ok(), "daemon run should succeed: {result:?}");
}

#[then("the daemon run fails with a signal error")]
fn then_run_fails(world: &RefCell<DaemonWorld>) {
    let world = world.borrow();
    let result = world.result.as_ref().expect("daemon should have run");
    assert!(
        matches!(result, Err(DaemonError::Signals { .. })),
        "expected a signal failure, got {result:?}"
    );
}

#[then("the process boundary recorded {stops} stops and {starts} starts")]
fn then_process_calls(world: &RefCell<DaemonWorld>, stops: usize, starts: usize) {
    let world = world.borrow();
    assert_eq!(world.harness.supervisor.stops(), stops, "stop calls");
    assert_eq!(world.harness.supervisor.starts(), starts, "start calls");
}

#[then("the server lock is released")]
fn then_lock_released(world: &RefCell<DaemonWorld>) {
    let layout = world.borrow().harness.layout();
    assert!(!layout.server_lock().exists());
    assert!(!world.borrow().harness.supervisor.running());
}

#[then("the restarted server listened on {port}")]
fn then_restarted_port(world: &RefCell<DaemonWorld>, port: u16) {
    let config = world
        .borrow()
        .harness
        .supervisor
        .last_started_config()
        .expect("configuration present at restart");
    assert!(config.contains(&format!("ds-cfg-listen-port: {port}")));
}

#[then("the base LDIF was imported after the seed data")]
fn then_base_ldif_imported(world: &RefCell<DaemonWorld>) {
    let imported = world.borrow().harness.backends.imported_contents();
    assert_eq!(imported.len(), SEED_FILES.len() + 1);
    assert_eq!(imported.last().map(String::as_str), Some(BASE_LDIF));
}

#[scenario(path = "tests/features/daemon.feature")]
fn daemon(#[from(world)] _: RefCell<DaemonWorld>) {}
