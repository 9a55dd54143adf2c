// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use jitr_adapters::FakeRunner;
use jitr_core::test_support::registration;
use jitr_core::FakeClock;
use parking_lot::Mutex;
use std::sync::Arc;

mod cleanup;
mod existing;
mod lifecycle;
mod probes;

const UP_OK: &str = r#"{"outcome":"success","containerId":"c0ffee","remoteUser":"vscode","remoteWorkspaceFolder":"/workspaces/widgets"}"#;
const AGENT_OK: &str = "√ Connected to GitHub\nListening for Jobs\nRunning job: build\nJob build completed with result: Succeeded\n";

/// Pattern matching only the agent run (the install script also mentions run.sh).
const RUN_AGENT: &str = "--jitconfig";
const INSTALL_AGENT: &str = "actions-runner-linux";

struct TestContext {
    executor: JobExecutor<FakeRunner, FakeClock>,
    runner: FakeRunner,
    clock: FakeClock,
    work_root: PathBuf,
    _tmp: tempfile::TempDir,
}

fn setup() -> TestContext {
    setup_with(|config| config)
}

fn setup_with(configure: impl FnOnce(ExecutorConfig) -> ExecutorConfig) -> TestContext {
    let tmp = tempfile::tempdir().unwrap();
    let work_root = tmp.path().join("work");
    let runner = FakeRunner::new();
    runner.on("devcontainer up", CommandOutput::ok(UP_OK));
    runner.on(RUN_AGENT, CommandOutput::ok(AGENT_OK));
    let clock = FakeClock::new();
    let config = configure(ExecutorConfig::default().work_root(work_root.clone()));
    TestContext {
        executor: JobExecutor::new(runner.clone(), clock.clone(), config),
        runner,
        clock,
        work_root,
        _tmp: tmp,
    }
}

fn request(run_id: u64) -> JobRequest {
    JobRequest::new(registration("gpu"), run_id, "main", format!("jitr-{}-1000000", run_id))
}

fn credential() -> EphemeralCredential {
    EphemeralCredential::new(7, "jit-secret")
}

/// Records every state reported through the progress callback.
#[derive(Clone, Default)]
struct Progress(Arc<Mutex<Vec<JobState>>>);

impl Progress {
    fn callback(&self) -> impl Fn(&JobState) + Send + Sync {
        let seen = self.0.clone();
        move |state: &JobState| seen.lock().push(state.clone())
    }

    fn statuses(&self) -> Vec<JobStatus> {
        let mut out: Vec<JobStatus> = Vec::new();
        for state in self.0.lock().iter() {
            if out.last() != Some(&state.status) {
                out.push(state.status);
            }
        }
        out
    }

    fn len(&self) -> usize {
        self.0.lock().len()
    }
}

impl TestContext {
    async fn run(&self, request: JobRequest) -> JobState {
        self.executor.execute_job(request, credential(), &|_| {}, &CancellationToken::new()).await
    }

    fn position(&self, pattern: &str) -> Option<usize> {
        self.runner.command_lines().iter().position(|line| line.contains(pattern))
    }

    fn args_of(&self, pattern: &str) -> Vec<String> {
        self.runner.calls_matching(pattern).first().map(|c| c.args.clone()).unwrap_or_default()
    }
}
