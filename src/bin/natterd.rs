// ABOUTME: Chat server daemon binary
// ABOUTME: Binds a TCP listener and serves the chat protocol until Ctrl-C

use argh::FromArgs;
use natter::Server;
use tokio::net::TcpListener;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

/// Chat server daemon
#[derive(FromArgs)]
struct CliArgs {
    /// whether or not to enable debugging
    #[argh(switch, short = 'd')]
    debugging: bool,

    /// the address to bind (default: 127.0.0.1)
    #[argh(option, default = "String::from(\"127.0.0.1\")")]
    addr: String,

    /// the port to listen on (default: 13180)
    #[argh(option, default = "13180")]
    port: u16,

    /// suppress the startup log
    #[argh(switch, short = 'q')]
    quiet: bool,
}

#[tokio::main]
async fn main() -> natter::Result<()> {
    let cli_args: CliArgs = argh::from_env();

    let level = if cli_args.debugging {
        Level::DEBUG
    } else if cli_args.quiet {
        Level::ERROR
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let listener = TcpListener::bind((cli_args.addr.as_str(), cli_args.port)).await?;
    info!("serving on {}", listener.local_addr()?);

    tokio::select! {
        served = Server::new().run(listener) => served?,
        _ = tokio::signal::ctrl_c() => info!("shutting down"),
    }

    Ok(())
}
