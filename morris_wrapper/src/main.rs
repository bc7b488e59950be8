use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use morris_wrapper::{
    HttpGameClient, MoveOracle, Runner, ThreadSleeper, WrapperConfig, DEFAULT_GAME_TEMPLATE_FILE,
    DEFAULT_OPENING_TEMPLATE_FILE,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
struct Args {
    #[command(subcommand)]
    mode: Mode,

    /// Directory for the files exchanged with the move generator
    #[arg(short, long, default_value = ".", global = true)]
    work_dir: PathBuf,

    /// Give up on the move generator after this many seconds (default: never)
    #[arg(long, global = true)]
    move_timeout_secs: Option<u64>,

    /// A log level among "off", "error", "warn", "info", "debug", "trace"
    #[arg(short, long, default_value = "info", global = true)]
    log_level: LevelFilter,
}

#[derive(Subcommand)]
enum Mode {
    /// Log in to a game server and play games on it until killed
    Client {
        username: String,
        password: String,
        /// Base URL of the game server, e.g. http://localhost:8080
        server: String,

        /// File with the command line for the opening phase
        #[arg(default_value = DEFAULT_OPENING_TEMPLATE_FILE)]
        opening_command_file: PathBuf,

        /// File with the command line for the mid/end-game phase
        #[arg(default_value = DEFAULT_GAME_TEMPLATE_FILE)]
        game_command_file: PathBuf,

        /// RNG seed for picking a seat in new games
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    initialize_logging(args.log_level);

    match args.mode {
        Mode::Client {
            username,
            password,
            server,
            opening_command_file,
            game_command_file,
            seed,
        } => {
            let config = WrapperConfig::load(
                &opening_command_file,
                &game_command_file,
                args.work_dir,
                args.move_timeout_secs.map(Duration::from_secs),
            )?;
            info!("Opening Phase Command Line: {}", config.opening.as_str());
            info!("Mid/End Phase Command Line: {}", config.game.as_str());

            let seed = seed.unwrap_or_else(rand::random);
            info!(seed);
            let rng = StdRng::seed_from_u64(seed);

            let client = HttpGameClient::new(&server)?;
            let oracle = MoveOracle::new(config);
            info!(%username, %server, "Starting client");
            Runner::new(client, oracle, ThreadSleeper, rng, &username, &password).run()
        }
    }
}

fn initialize_logging(level: LevelFilter) {
    let format = tracing_subscriber::fmt::format()
        .with_target(false)
        .compact();

    let filter = Targets::new().with_default(level);

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().event_format(format))
        .with(filter)
        .init();
}
