use clap::{Parser, Subcommand};
use client::input::InputManager;
use client::network::{Client, ClientRole};
use client::single_player::{LogScoreSink, SinglePlayer};
use log::{debug, error, info, warn};
use shared::{GameConfig, Listeners, Session, SessionEvent, DEFAULT_PORT};
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Join a hosted game with a ship of your own
    Join {
        /// Server address to connect to
        #[arg(short = 's', long, default_value = "127.0.0.1:55555")]
        server: String,

        /// Name shown next to your ship
        #[arg(short = 'n', long, default_value = "player")]
        nickname: String,
    },
    /// Watch a hosted game
    Spectate {
        /// Server address to connect to
        #[arg(short = 's', long, default_value = "127.0.0.1:55555")]
        server: String,
    },
    /// Play alone without a server
    Solo {
        /// Name recorded with your score
        #[arg(short = 'n', long, default_value = "player")]
        nickname: String,

        /// Let asteroids shatter each other on contact
        #[arg(short, long)]
        kessler: bool,
    },
}

/// Accepts `host:port`, or a bare host on the default port
fn resolve_server(server: &str) -> Result<SocketAddr, Box<dyn std::error::Error + Send + Sync>> {
    let with_port = if server.contains(':') {
        server.to_string()
    } else {
        format!("{}:{}", server, DEFAULT_PORT)
    };
    with_port
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| format!("could not resolve {}", server).into())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let session = Session::new();

    info!("Controls: +left/-left, +right/-right, +thrust/-thrust, +fire/-fire, 'quit' to leave");

    let result = match args.mode {
        Mode::Join { server, nickname } => {
            let role = ClientRole::Joiner { nickname };
            run_client(resolve_server(&server)?, role, session).await
        }
        Mode::Spectate { server } => {
            run_client(resolve_server(&server)?, ClientRole::Spectator, session).await
        }
        Mode::Solo { nickname, kessler } => {
            let config = GameConfig::default().with_kessler_syndrome(kessler);
            let game = SinglePlayer::new(session.clone());
            log_events(&game.listeners());
            let console = spawn_console(session.clone(), game.input());
            game.run(nickname, config, LogScoreSink).await;
            console.abort();
            Ok(())
        }
    };

    if let Err(e) = &result {
        error!("{}", e);
    }
    result
}

async fn run_client(
    server_addr: SocketAddr,
    role: ClientRole,
    session: Session,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!("Connecting to: {}", server_addr);
    let client = Client::new(server_addr, role, session.clone()).await?;
    log_events(&client.listeners());

    let console = spawn_console(session, client.input());
    let result = client.run().await;
    console.abort();
    result
}

fn log_events(listeners: &Arc<Listeners<SessionEvent>>) {
    listeners.subscribe(|event| match event {
        SessionEvent::SnapshotInstalled => debug!("Snapshot installed"),
        SessionEvent::Restarted => info!("New round"),
        SessionEvent::Aborted => warn!("Session aborted"),
        _ => {}
    });
}

/// Reads control commands from stdin until the session is over
fn spawn_console(session: Session, input: InputManager) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
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
                "quit" | "exit" => {
                    session.end();
                }
                "" => {}
                command => {
                    if input.apply_command(command).is_none() {
                        warn!("Unknown command '{}'", command);
                    }
                }
            };
        }
    })
}
