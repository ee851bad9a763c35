use clap::Parser;
use log::{error, info, warn};
use server::network::{discover_local_ip, HostControls, Server, ServerConfig};
use shared::{ControlEvent, GameConfig, Session, SessionEvent, DEFAULT_PORT};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to bind to; the first non-loopback interface when omitted
    #[arg(short = 'H', long)]
    host: Option<IpAddr>,

    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Nickname of the host's ship
    #[arg(short, long, default_value = "host")]
    nickname: String,

    /// Maximum number of connected clients
    #[arg(short = 'm', long, default_value = "16")]
    max_clients: usize,

    /// Let asteroids shatter each other on contact
    #[arg(short, long)]
    kessler: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let host = match args.host {
        Some(host) => host,
        None => discover_local_ip().unwrap_or_else(|e| {
            warn!("Could not discover local address ({}), binding all interfaces", e);
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        }),
    };

    let game = GameConfig::default().with_kessler_syndrome(args.kessler);
    let config = ServerConfig {
        bind_addr: SocketAddr::new(host, args.port),
        nickname: args.nickname,
        max_clients: args.max_clients,
        game,
    };

    let session = Session::new();
    let server = Server::bind(config, session.clone()).await?;

    let listeners = server.listeners();
    listeners.subscribe(|event| match event {
        SessionEvent::ConnectionsChanged { connected } => {
            info!("{} client(s) connected", connected)
        }
        SessionEvent::Restarted => info!("Round over, restarting"),
        SessionEvent::Aborted => error!("Session aborted"),
        _ => {}
    });

    info!("Share {} with the players", server.local_addr()?);
    info!("Type 'start' (or press Enter) to begin, 'quit' to stop");
    info!("Steer with +left/-left, +right/-right, +thrust/-thrust, +fire/-fire");

    let console = tokio::spawn(read_console(session.clone(), server.host_controls()));
    let ctrl_c = {
        let session = session.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Received Ctrl+C, shutting down gracefully...");
                session.end();
            }
        })
    };

    let result = server.run().await;
    console.abort();
    ctrl_c.abort();
    result
}

/// Reads host commands from stdin until the session is over
async fn read_console(session: Session, controls: HostControls) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while !session.is_over() {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!("Failed to read console: {}", e);
                break;
            }
        };

        match line.trim() {
            "" | "start" => {
                if session.start() {
                    info!("Starting game");
                }
            }
            "quit" | "exit" => {
                session.end();
            }
            command => match ControlEvent::parse(command) {
                Some(event) => {
                    controls.apply(event).await;
                }
                None => warn!("Unknown command '{}'", command),
            },
        }
    }
}
