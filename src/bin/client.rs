//! `bookinglog-client`: a thin CLI for exercising the `LogService` RPCs
//! against a running server, authenticating with a client certificate.

use bookinglog::pb;
use bookinglog::pb::log_service_client::LogServiceClient;
use clap::{Parser, Subcommand};
use tonic::transport::{Certificate, Channel, ClientTlsConfig, Identity};

#[derive(Parser)]
#[command(name = "bookinglog-client")]
struct Cli {
    /// Server address, e.g. https://127.0.0.1:8400
    #[arg(long)]
    addr: String,

    /// Client certificate (PEM).
    #[arg(long)]
    cert: std::path::PathBuf,

    /// Client private key (PEM).
    #[arg(long)]
    key: std::path::PathBuf,

    /// CA certificate used to verify the server (PEM).
    #[arg(long)]
    ca: std::path::PathBuf,

    /// TLS server name (must match the server certificate's CN).
    #[arg(long)]
    domain: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Append a record whose value is the given UTF-8 string.
    Produce { value: String },
    /// Read the record at the given offset.
    Consume { offset: u64 },
    /// Create a booking. A UUID is generated if `--uuid` isn't given.
    CreateBooking {
        #[arg(long)]
        uuid: Option<String>,
        #[arg(long)]
        email: String,
        #[arg(long)]
        full_name: String,
        #[arg(long)]
        start_date: String,
        #[arg(long)]
        end_date: String,
    },
    /// Update an existing booking by UUID.
    UpdateBooking {
        #[arg(long)]
        uuid: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        full_name: String,
        #[arg(long)]
        start_date: String,
        #[arg(long)]
        end_date: String,
    },
    /// Look up the latest booking state for a UUID.
    GetBooking { uuid: String },
    /// List the statically configured server membership.
    GetServers,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let identity = Identity::from_pem(
        std::fs::read_to_string(&cli.cert)?,
        std::fs::read_to_string(&cli.key)?,
    );
    let ca = Certificate::from_pem(std::fs::read_to_string(&cli.ca)?);
    let tls = ClientTlsConfig::new()
        .identity(identity)
        .ca_certificate(ca)
        .domain_name(cli.domain);

    let channel = Channel::from_shared(cli.addr)?
        .tls_config(tls)?
        .connect()
        .await?;
    let mut client = LogServiceClient::new(channel);

    match cli.command {
        Command::Produce { value } => {
            let response = client
                .produce(pb::ProduceRequest {
                    record: Some(pb::Record {
                        value: value.into_bytes(),
                        offset: 0,
                    }),
                })
                .await?;
            println!("offset = {}", response.into_inner().offset);
        }
        Command::Consume { offset } => {
            let response = client.consume(pb::ConsumeRequest { offset }).await?;
            let record = response.into_inner().record.unwrap_or_default();
            println!("{}", String::from_utf8_lossy(&record.value));
        }
        Command::CreateBooking {
            uuid,
            email,
            full_name,
            start_date,
            end_date,
        } => {
            let uuid = uuid.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            let response = client
                .create_booking(pb::CreateBookingRequest {
                    booking: Some(pb::Booking {
                        uuid,
                        email,
                        full_name,
                        start_date,
                        end_date,
                        active: false,
                        created_at: None,
                        updated_at: None,
                    }),
                })
                .await?;
            println!("{:#?}", response.into_inner().booking);
        }
        Command::UpdateBooking {
            uuid,
            email,
            full_name,
            start_date,
            end_date,
        } => {
            let response = client
                .update_booking(pb::UpdateBookingRequest {
                    booking: Some(pb::Booking {
                        uuid,
                        email,
                        full_name,
                        start_date,
                        end_date,
                        active: false,
                        created_at: None,
                        updated_at: None,
                    }),
                })
                .await?;
            println!("{:#?}", response.into_inner().booking);
        }
        Command::GetBooking { uuid } => {
            let response = client.get_booking(pb::GetBookingRequest { uuid }).await?;
            println!("{:#?}", response.into_inner().booking);
        }
        Command::GetServers => {
            let response = client.get_servers(pb::GetServersRequest {}).await?;
            for server in response.into_inner().servers {
                println!("{}\t{}\t{}", server.id, server.rpc_addr, server.is_leader);
            }
        }
    }

    Ok(())
}
