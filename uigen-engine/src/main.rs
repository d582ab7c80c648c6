use anyhow::Result;
use clap::Parser;
use uigen_engine::config::CliArgs;
use uigen_engine::server::PreviewServer;
use uigen_engine::transport::NdjsonTransport;

fn main() -> Result<()> {
    let args = CliArgs::parse();

    // stdout carries the protocol; logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level)),
        )
        .init();

    let preview_config = args.preview_config();
    let tree_config = args.tree_config();
    tracing::info!(
        root_alias = %preview_config.root_alias,
        runtime_modules = ?preview_config.runtime_modules,
        auto_create_parents = tree_config.auto_create_parents,
        "configuration loaded"
    );

    let transport = NdjsonTransport::new();
    let mut server = PreviewServer::new(transport, tree_config, preview_config);

    tracing::info!("uigen-engine ready");
    server.run()?;
    Ok(())
}
