// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command lines for git, the devcontainer CLI and the container engine.

use super::ExecutorConfig;
use jitr_adapters::CommandSpec;
use jitr_core::container::container_labels;
use jitr_core::{Registration, LABEL_NAME, LABEL_OWNER, LABEL_REPOSITORY};
use std::path::Path;

/// Install location of the shared agent inside a freshly provisioned container.
pub const AGENT_DIR: &str = "/tmp/jitr/agent";
/// Parent of per-job agent directories inside reused containers.
pub const JOBS_DIR: &str = "/tmp/jitr/jobs";

/// Remote env var carrying the encoded jit config into the container.
pub(crate) const JITCONFIG_ENV: &str = "JITR_JITCONFIG";

/// Clone URL for a registration, with the token inlined when present.
pub(crate) fn clone_url(config: &ExecutorConfig, registration: &Registration) -> String {
    let host = config.git_host.trim_end_matches('/');
    let path = format!("{}/{}.git", registration.owner, registration.repository);
    match config.token.as_deref() {
        Some(token) => match host.split_once("://") {
            Some((scheme, rest)) => format!("{scheme}://x-access-token:{token}@{rest}/{path}"),
            None => format!("https://x-access-token:{token}@{host}/{path}"),
        },
        None => format!("{host}/{path}"),
    }
}

pub(crate) fn clone(
    config: &ExecutorConfig,
    registration: &Registration,
    branch: &str,
    dest: &Path,
) -> CommandSpec {
    let mut spec = CommandSpec::new(&config.git)
        .args(["clone", "--branch", branch, "--depth", "1", "--single-branch"])
        .arg(clone_url(config, registration))
        .arg(dest.display().to_string())
        .env("GIT_TERMINAL_PROMPT", "0")
        .timeout(config.clone_timeout);
    if let Some(token) = config.token.as_deref() {
        spec = spec.secret(token);
    }
    spec
}

/// `devcontainer up`. Named containers are identified by labels and survive
/// the job; anonymous ones replace any container left over for the folder.
pub(crate) fn up(
    config: &ExecutorConfig,
    workspace: &Path,
    registration: &Registration,
    container_name: Option<&str>,
) -> CommandSpec {
    let spec = CommandSpec::new(&config.devcontainer)
        .args(["up", "--docker-path"])
        .arg(&config.engine)
        .arg("--workspace-folder")
        .arg(workspace.display().to_string())
        .timeout(config.up_timeout);
    match container_name {
        Some(name) => container_labels(name, &registration.owner, &registration.repository)
            .into_iter()
            .fold(spec, |spec, (key, value)| spec.arg("--id-label").arg(format!("{key}={value}"))),
        None => spec.arg("--remove-existing-container"),
    }
}

fn exec(config: &ExecutorConfig, container_id: &str) -> CommandSpec {
    CommandSpec::new(&config.devcontainer)
        .args(["exec", "--docker-path"])
        .arg(&config.engine)
        .arg("--container-id")
        .arg(container_id)
}

/// Download and unpack the agent into `dir` unless it is already there.
pub(crate) fn install_agent(config: &ExecutorConfig, container_id: &str, dir: &str) -> CommandSpec {
    let version = &config.agent_version;
    let base = config.agent_download_base.trim_end_matches('/');
    let script = format!(
        r#"set -e
mkdir -p {dir}
cd {dir}
if [ ! -x ./run.sh ]; then
  case "$(uname -m)" in
    aarch64|arm64) arch=arm64 ;;
    armv7l) arch=arm ;;
    *) arch=x64 ;;
  esac
  url="{base}/v{version}/actions-runner-linux-${{arch}}-{version}.tar.gz"
  if command -v curl >/dev/null 2>&1; then
    curl -fsSL "$url" -o agent.tar.gz
  else
    wget -qO agent.tar.gz "$url"
  fi
  tar xzf agent.tar.gz
  rm -f agent.tar.gz
fi"#
    );
    exec(config, container_id).args(["bash", "-lc"]).arg(script).timeout(config.install_timeout)
}

/// Start the agent from `dir` with the single-use config.
///
/// The config travels as a remote env var and is written to `.jitconfig`,
/// which is removed again once the agent exits.
pub(crate) fn run_agent(
    config: &ExecutorConfig,
    container_id: &str,
    dir: &str,
    encoded_config: &str,
) -> CommandSpec {
    let script = format!(
        r#"cd {dir}
umask 077
printf '%s' "${JITCONFIG_ENV}" > .jitconfig
status=0
./run.sh --jitconfig "$(cat .jitconfig)" || status=$?
rm -f .jitconfig
exit $status"#
    );
    exec(config, container_id)
        .arg("--remote-env")
        .arg(format!("{JITCONFIG_ENV}={encoded_config}"))
        .arg("--remote-env")
        .arg("RUNNER_ALLOW_RUNASROOT=1")
        .args(["bash", "-lc"])
        .arg(script)
        .secret(encoded_config)
}

pub(crate) fn remove_container(config: &ExecutorConfig, container_id: &str) -> CommandSpec {
    CommandSpec::new(&config.engine)
        .args(["rm", "-f", container_id])
        .timeout(config.engine_timeout)
}

/// Kill whatever still runs from `dir` (e.g. an agent whose exec client was cancelled).
///
/// The bracketed first character keeps the pattern from matching the shell running it.
pub(crate) fn stop_processes_in_container(
    config: &ExecutorConfig,
    container_id: &str,
    dir: &str,
) -> CommandSpec {
    let mut chars = dir.chars();
    let pattern = match chars.next() {
        Some(first) => format!("[{}]{}/", first, chars.as_str()),
        None => "/".to_string(),
    };
    exec(config, container_id)
        .args(["sh", "-c"])
        .arg(format!("pkill -f '{}' || true", pattern))
        .timeout(config.engine_timeout)
}

pub(crate) fn remove_dir_in_container(
    config: &ExecutorConfig,
    container_id: &str,
    dir: &str,
) -> CommandSpec {
    exec(config, container_id).args(["rm", "-rf", dir]).timeout(config.engine_timeout)
}

/// Tab-separated `id name owner repository created` per labelled container.
pub(crate) fn list_named(config: &ExecutorConfig) -> CommandSpec {
    let format = format!(
        "{{{{.ID}}}}\t{{{{.Label \"{LABEL_NAME}\"}}}}\t{{{{.Label \"{LABEL_OWNER}\"}}}}\t{{{{.Label \"{LABEL_REPOSITORY}\"}}}}\t{{{{.CreatedAt}}}}"
    );
    CommandSpec::new(&config.engine)
        .args(["ps", "--filter"])
        .arg(format!("label={LABEL_NAME}"))
        .arg("--format")
        .arg(format)
        .timeout(config.engine_timeout)
}

pub(crate) fn inspect_running(config: &ExecutorConfig, container_id: &str) -> CommandSpec {
    CommandSpec::new(&config.engine)
        .args(["inspect", "-f", "{{.State.Running}}", container_id])
        .timeout(config.engine_timeout)
}

pub(crate) fn engine_version(config: &ExecutorConfig) -> CommandSpec {
    CommandSpec::new(&config.engine)
        .args(["version", "--format", "{{.Server.Version}}"])
        .timeout(config.engine_timeout)
}

pub(crate) fn devcontainer_version(config: &ExecutorConfig) -> CommandSpec {
    CommandSpec::new(&config.devcontainer).arg("--version").timeout(config.engine_timeout)
}
