//! `bookinglog-server`: boots the log directory, TLS, ACL policy, and the
//! gRPC `LogService` from a TOML config file.

use std::sync::Arc;

use bookinglog::auth::FileAuthorizer;
use bookinglog::pb;
use bookinglog::server::LogServer;
use bookinglog::{Config, Log};
use clap::Parser;
use tonic::transport::{Certificate, Identity, Server, ServerTlsConfig};

#[derive(Parser)]
#[command(name = "bookinglog-server")]
#[command(about = "Append-only booking log, served over mutually authenticated gRPC")]
struct Cli {
    /// Path to a TOML config file.
    #[arg(long, default_value = "bookinglog.toml")]
    config: std::path::PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    let log = Arc::new(Log::open_at(
        &config.log_dir,
        config.segment_config(),
        config.initial_offset(),
    )?);
    let authorizer: Arc<dyn bookinglog::auth::Authorizer> =
        Arc::new(FileAuthorizer::load(&config.authorizer_policy_path)?);
    let servers: Vec<pb::Server> = config
        .servers
        .iter()
        .map(|entry| pb::Server {
            id: entry.id.clone(),
            rpc_addr: entry.rpc_addr.clone(),
            is_leader: entry.is_leader,
        })
        .collect();

    let cert_pem = std::fs::read_to_string(&config.tls.cert_path)?;
    let key_pem = std::fs::read_to_string(&config.tls.key_path)?;
    let ca_pem = std::fs::read_to_string(&config.tls.client_ca_path)?;
    let tls = ServerTlsConfig::new()
        .identity(Identity::from_pem(cert_pem, key_pem))
        .client_ca_root(Certificate::from_pem(ca_pem));

    let addr = config.bind_addr.parse()?;
    tracing::info!(%addr, log_dir = %config.log_dir.display(), "starting bookinglog-server");

    let service = LogServer::new(log, authorizer, servers);

    Server::builder()
        .tls_config(tls)?
        .add_service(pb::log_service_server::LogServiceServer::new(service))
        .serve(addr)
        .await?;

    Ok(())
}
