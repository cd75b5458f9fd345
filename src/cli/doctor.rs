//! `runcell doctor` - active health diagnostics.
//!
//! Probes external dependencies and validates configuration to surface
//! problems before they bite during normal operation. Each check reports
//! pass/fail with actionable guidance on failures.

use crate::config::Config;
use crate::sandbox::{connect_docker, PolicySet};

/// Run all diagnostic checks and print results.
pub async fn run_doctor_command(config: &Config) -> anyhow::Result<()> {
    println!("Runcell Doctor");
    println!("==============\n");

    let mut passed = 0u32;
    let mut failed = 0u32;

    let docker = check_docker().await;
    let daemon_ok = matches!(docker, CheckResult::Pass(_));
    check("Docker daemon", docker, &mut passed, &mut failed);

    if daemon_ok {
        check(
            "Runtime image",
            check_image(&config.sandbox.image).await,
            &mut passed,
            &mut failed,
        );
    } else {
        check(
            "Runtime image",
            CheckResult::Skip("docker daemon unreachable".into()),
            &mut passed,
            &mut failed,
        );
    }

    check(
        "Workspace root",
        check_workspace_root(config),
        &mut passed,
        &mut failed,
    );
    check("Policy", check_policy(config), &mut passed, &mut failed);

    println!();
    println!("  {passed} passed, {failed} failed");
    if failed > 0 {
        anyhow::bail!("doctor detected {failed} failing check(s)");
    }

    Ok(())
}

fn check(name: &str, result: CheckResult, passed: &mut u32, failed: &mut u32) {
    match result {
        CheckResult::Pass(detail) => {
            *passed += 1;
            println!("  [pass] {name}: {detail}");
        }
        CheckResult::Fail(detail) => {
            *failed += 1;
            println!("  [FAIL] {name}: {detail}");
        }
        CheckResult::Skip(reason) => {
            println!("  [skip] {name}: {reason}");
        }
    }
}

enum CheckResult {
    Pass(String),
    Fail(String),
    Skip(String),
}

async fn check_docker() -> CheckResult {
    match connect_docker().await {
        Ok(_) => CheckResult::Pass("daemon responding".into()),
        Err(e) => CheckResult::Fail(format!("{e}. Is the Docker daemon running?")),
    }
}

async fn check_image(image: &str) -> CheckResult {
    let docker = match connect_docker().await {
        Ok(docker) => docker,
        Err(e) => return CheckResult::Fail(e.to_string()),
    };
    match docker.inspect_image(image).await {
        Ok(_) => CheckResult::Pass(format!("{image} present")),
        Err(e) => CheckResult::Fail(format!(
            "{image} not available ({e}). Build or pull the runtime image first"
        )),
    }
}

fn check_workspace_root(config: &Config) -> CheckResult {
    let root = &config.sandbox.workspace_root;
    if let Err(e) = std::fs::create_dir_all(root) {
        return CheckResult::Fail(format!("cannot create {}: {e}", root.display()));
    }
    let probe = root.join(".doctor-probe");
    match std::fs::write(&probe, b"ok") {
        Ok(()) => {
            let _ = std::fs::remove_file(&probe);
            CheckResult::Pass(format!("{} writable", root.display()))
        }
        Err(e) => CheckResult::Fail(format!("{} not writable: {e}", root.display())),
    }
}

fn check_policy(config: &Config) -> CheckResult {
    match &config.policy_path {
        Some(path) => match PolicySet::from_path(path) {
            Ok(policy) => CheckResult::Pass(format!(
                "{} ({} approved, {} forbidden)",
                path.display(),
                policy.approved_len(),
                policy.forbidden_len()
            )),
            Err(e) => CheckResult::Fail(e.to_string()),
        },
        None => {
            let policy = PolicySet::default();
            CheckResult::Pass(format!(
                "built-in defaults ({} approved, {} forbidden)",
                policy.approved_len(),
                policy.forbidden_len()
            ))
        }
    }
}
