use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "og_cli", version, about = "OnlyGames auth operator tools")]
pub struct Cli {
    /// Log debug output to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the CLI and core library versions.
    Version,

    /// Hash a password with bcrypt.
    HashPassword {
        password: String,

        /// bcrypt cost factor (4..=31).
        #[arg(long, default_value = "10")]
        cost: String,
    },

    /// Check a password against a bcrypt hash. Exits non-zero on mismatch.
    VerifyPassword { password: String, hash: String },

    /// Generate a random signing secret.
    GenSecret {
        #[arg(long, default_value_t = 64)]
        length: usize,
    },

    /// Sign a token for an account id.
    IssueToken {
        #[arg(long)]
        user_id: String,

        /// Mark the token as belonging to a creator.
        #[arg(long)]
        creator: bool,

        /// Lifetime, e.g. `7d`, `12h`, `3600`.
        #[arg(long, default_value = "7d")]
        expiry: String,

        #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
        secret: String,
    },

    /// Verify a token and print its claims as JSON.
    VerifyToken {
        token: String,

        #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
        secret: String,
    },
}
