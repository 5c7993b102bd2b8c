use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ballstreet")]
#[command(
    about = "Rankings, insights and trade replay over a player market snapshot",
    long_about = None
)]
pub struct Cli {
    /// Market snapshot: price observations and model predictions (JSON)
    #[arg(short, long)]
    pub market: PathBuf,

    /// Directory holding default.toml; environment variables are used when absent
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Rank players by latest percentage move
    Trending {
        #[arg(short, long)]
        window: Option<usize>,
        /// Maximum number of players to print
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Rank players by volatility of percentage moves
    Volatile {
        #[arg(short, long)]
        window: Option<usize>,
        /// Maximum number of players to print
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Top predicted opportunities and market sentiment
    Insights {
        #[arg(short, long)]
        top: Option<usize>,
    },
    /// Execute a file of trades for one user and value the resulting portfolio
    Replay {
        /// Trades file: [{"player_id", "type": "BUY"|"SELL", "shares"}]
        #[arg(short, long)]
        trades: PathBuf,
        #[arg(short, long)]
        user: String,
    },
}
