use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{info, warn};

use match_sync::{
    config::BackendConfig,
    repositories::{
        match_repository::RestMatchRepository, procedure_repository::RestMatchProcedures,
        realtime::PhoenixRealtimeRepository,
    },
    services::{
        connect4_service::LocalGame,
        errors::match_sync_errors::MatchSyncError,
        lobby_service::LobbyService,
        match_sync_service::{MatchSession, MatchSyncService, MoveAttempt, SessionUpdate},
    },
};

mod render;

#[derive(Parser)]
#[command(name = "match-client")]
#[command(about = "Online Connect 4 in the terminal", long_about = None)]
struct Cli {
    /// Player identity (overrides MATCH_PLAYER_ID)
    #[arg(long, global = true)]
    player: Option<String>,

    /// Backend URL (overrides MATCH_BACKEND_URL)
    #[arg(long, global = true)]
    backend_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List open matches and your games in progress
    Lobby {
        /// Keep listing as matches change
        #[arg(long)]
        watch: bool,
    },

    /// Host a new match
    Create,

    /// Take the open seat in a match
    Join { match_id: String },

    /// Play an online match
    Play { match_id: String },

    /// Start (or look up) the rematch of a finished match
    Rematch { match_id: String },

    /// Two players sharing this terminal
    Local,
}

struct Backend {
    lobby: LobbyService,
    sync: MatchSyncService,
    player_id: String,
}

impl Backend {
    fn connect(cli: &Cli) -> Result<Self> {
        let mut config = BackendConfig::from_env();
        if let Some(url) = &cli.backend_url {
            config = config.with_base_url(url);
        }
        if let Some(player) = &cli.player {
            config = config.with_player_id(player);
        }

        let player_id = config
            .player_id
            .clone()
            .context("no player id: pass --player or set MATCH_PLAYER_ID")?;

        let matches = Arc::new(RestMatchRepository::new(&config));
        let procedures = Arc::new(RestMatchProcedures::new(&config));
        let realtime = Arc::new(PhoenixRealtimeRepository::new(&config));

        Ok(Backend {
            lobby: LobbyService::new(matches.clone(), procedures.clone(), realtime.clone()),
            sync: MatchSyncService::new(matches, procedures, realtime),
            player_id,
        })
    }
}

fn log_level() -> tracing::Level {
    std::env::var("MATCH_LOG_LEVEL")
        .ok()
        .and_then(|level| level.parse().ok())
        .unwrap_or(tracing::Level::INFO)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(log_level())
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Local => play_local().await,
        Commands::Lobby { watch } => {
            let backend = Backend::connect(&cli)?;
            show_lobby(&backend, *watch).await
        }
        Commands::Create => {
            let backend = Backend::connect(&cli)?;
            let record = backend.lobby.create_match(&backend.player_id).await?;
            println!("Created match {}", record.id);
            println!("Start playing with: match-client play {}", record.id);
            Ok(())
        }
        Commands::Join { match_id } => {
            let backend = Backend::connect(&cli)?;
            backend.lobby.join_match(match_id, &backend.player_id).await?;
            println!("Joined match {}", match_id);
            println!("Start playing with: match-client play {}", match_id);
            Ok(())
        }
        Commands::Play { match_id } => {
            let backend = Backend::connect(&cli)?;
            play_online(&backend, match_id).await
        }
        Commands::Rematch { match_id } => {
            let backend = Backend::connect(&cli)?;
            let mut session = backend.sync.open(match_id, &backend.player_id).await?;
            let rematch_id = session.request_rematch().await;
            session.close();
            println!("Rematch: {}", rematch_id?);
            Ok(())
        }
    }
}

async fn show_lobby(backend: &Backend, watch: bool) -> Result<()> {
    let listing = backend.lobby.listing(&backend.player_id).await?;
    print!("{}", render::listing(&listing, &backend.player_id));
    if !watch {
        return Ok(());
    }

    let mut lobby = backend.lobby.watch(&backend.player_id).await?;
    loop {
        let next = tokio::select! {
            _ = tokio::signal::ctrl_c() => None,
            next = lobby.next_listing() => next,
        };

        match next {
            Some(Ok(listing)) => {
                println!();
                print!("{}", render::listing(&listing, &backend.player_id));
            }
            Some(Err(e)) => warn!("Could not refresh lobby: {}", e),
            None => break,
        }
    }

    lobby.close();
    Ok(())
}

enum Input {
    Interrupt,
    Line(std::io::Result<Option<String>>),
    Update(Option<SessionUpdate>),
}

async fn play_online(backend: &Backend, match_id: &str) -> Result<()> {
    let mut session = backend.sync.open(match_id, &backend.player_id).await?;
    if !session.is_live() {
        println!("Live updates unavailable, the board will not refresh");
    }
    print!("{}", render::view(&session.view()));
    println!("Enter a column (1-7), r for rematch, q to quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let input = tokio::select! {
            _ = tokio::signal::ctrl_c() => Input::Interrupt,
            line = lines.next_line() => Input::Line(line),
            update = session.process_next() => Input::Update(update),
        };

        match input {
            Input::Interrupt | Input::Line(Ok(None)) => {
                session.on_unload().await;
                break;
            }
            Input::Line(Ok(Some(line))) => {
                if !handle_command(&mut session, line.trim()).await {
                    session.on_unload().await;
                    break;
                }
            }
            Input::Line(Err(e)) => {
                session.close();
                return Err(e).context("reading stdin");
            }
            Input::Update(Some(update)) => {
                if update.started() {
                    println!("Opponent joined, game on!");
                }
                if matches!(update, SessionUpdate::Snapshot { .. } | SessionUpdate::Presence(_)) {
                    print!("{}", render::view(&session.view()));
                }
            }
            Input::Update(None) => {
                println!("Connection to match lost");
                break;
            }
        }
    }

    session.close();
    Ok(())
}

/// Returns `false` when the player wants to leave.
async fn handle_command(session: &mut MatchSession, command: &str) -> bool {
    match command {
        "q" | "quit" => return false,
        "r" | "rematch" => match session.request_rematch().await {
            Ok(rematch_id) => println!("Rematch: match-client play {}", rematch_id),
            Err(e) => println!("{}", e),
        },
        _ => match command.parse::<usize>() {
            Ok(column) if (1..=7).contains(&column) => {
                match session.attempt_move(column - 1).await {
                    Ok(MoveAttempt::Submitted) => info!("Move sent"),
                    Ok(MoveAttempt::Ignored(reason)) => println!("{}", reason),
                    Err(MatchSyncError::RemoteRejected(rejection)) => {
                        println!("Move rejected: {}", rejection)
                    }
                    Err(e) => println!("Move failed: {}", e),
                }
            }
            _ => println!("Enter a column (1-7), r for rematch, q to quit"),
        },
    }
    true
}

async fn next_line(lines: &mut Lines<BufReader<Stdin>>) -> Result<Option<String>> {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => Ok(None),
        line = lines.next_line() => line
            .map(|line| line.map(|l| l.trim().to_string()))
            .context("reading stdin"),
    }
}

async fn play_local() -> Result<()> {
    let mut game = LocalGame::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Local game: enter a column (1-7), n for a new game, q to quit");
    print!("{}", render::board(game.board(), game.winning_cells()));

    while let Some(line) = next_line(&mut lines).await? {
        match line.as_str() {
            "q" | "quit" => break,
            "n" | "new" => game.reset(),
            other => match other.parse::<usize>() {
                Ok(column) if column >= 1 => {
                    if let Err(e) = game.play_column(column - 1) {
                        println!("{}", e);
                        continue;
                    }
                }
                _ => {
                    println!("Enter a column (1-7), n for a new game, q to quit");
                    continue;
                }
            },
        }

        print!("{}", render::board(game.board(), game.winning_cells()));
        match (game.status().is_over(), game.winner()) {
            (true, Some(winner)) => println!("{:?} wins! n for a new game", winner),
            (true, None) => println!("Draw! n for a new game"),
            (false, _) => println!("{:?} to move", game.current_player()),
        }
    }
    Ok(())
}
