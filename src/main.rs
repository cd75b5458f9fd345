//! runcell - main entry point.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use runcell::{
    cli::{run_doctor_command, run_exec_command, Cli, Command},
    config::Config,
    observability::create_observer,
    sandbox::{connect_docker, DockerRuntime, PolicySet, SandboxManager},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("runcell=info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config = Config::from_env()?;

    match cli.command {
        Command::Doctor => run_doctor_command(&config).await,
        Command::Exec {
            file,
            timeout,
            input,
            artifacts_dir,
        } => {
            let policy = match &config.policy_path {
                Some(path) => {
                    let policy = PolicySet::from_path(path)?;
                    tracing::info!(path = %path.display(), "loaded policy file");
                    policy
                }
                None => PolicySet::default(),
            };

            let docker = connect_docker().await?;
            let runtime = Arc::new(DockerRuntime::new(docker, config.sandbox.clone()));
            let observer = create_observer(&config.observability);

            let manager = SandboxManager::builder(runtime)
                .policy(Arc::new(policy))
                .config(config.sandbox.clone())
                .observer(observer)
                .build();

            let outcome = run_exec_command(&manager, file, timeout, input, artifacts_dir).await;

            // One-shot CLI: tear pooled containers down before exiting.
            manager.shutdown().await;
            outcome
        }
    }
}
