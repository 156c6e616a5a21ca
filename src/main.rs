use anyhow::Context;
use uspace_em::{
    cli::config_path_from_args, collaborators::Collaborators, config::Config,
    logging::init_tracing, server,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = config_path_from_args()?;
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    let logging_guard = init_tracing(&config.logging)?;
    tracing::info!(
        target: "main",
        run_id = logging_guard.run_id(),
        config_path = %config_path.display(),
        socket_path = %config.server.socket_path.display(),
        "config_loaded"
    );

    let collaborators = Collaborators::from_config(&config.collaborators)
        .context("failed to construct collaborator clients")?;

    server::run(config, collaborators).await
}
