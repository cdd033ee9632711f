// Import and re-export the `error` module
pub use self::error::{Error, Result};
mod error;

use clap::Parser;
use cli::{Cli, Commands};
use og_core::auth::jwt::{IssueClaims, JwtSecret};
use og_core::auth::password::{hash_password, verify_password};
use og_core::config::{AuthConfig, parse_bcrypt_cost, parse_duration};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};

mod cli;
mod logging;

/// Minimum length for generated secrets.
const MIN_SECRET_LEN: usize = 32;

fn main() -> Result<()> {
    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<()> {
    let args = Cli::parse();
    logging::init(args.verbose)?;

    match args.command {
        Commands::Version => {
            println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
            println!("og_core {}", og_core::version());
        }
        Commands::HashPassword { password, cost } => {
            let cost = parse_bcrypt_cost(&cost)?;
            println!("{}", hash_password(&password, cost)?);
        }
        Commands::VerifyPassword { password, hash } => {
            if !verify_password(&password, &hash)? {
                return Err(Error::Custom("password does not match".into()));
            }
            println!("ok");
        }
        Commands::GenSecret { length } => {
            if length < MIN_SECRET_LEN {
                return Err(Error::Custom(format!(
                    "secret length must be at least {MIN_SECRET_LEN}"
                )));
            }
            let secret: String = rng()
                .sample_iter(&Alphanumeric)
                .take(length)
                .map(char::from)
                .collect();
            println!("{secret}");
        }
        Commands::IssueToken {
            user_id,
            creator,
            expiry,
            secret,
        } => {
            let mut config = AuthConfig::new(JwtSecret::new(secret)?);
            config.token_ttl = parse_duration(&expiry)?;
            let token = config.issuer().issue(IssueClaims::for_account(user_id.clone(), creator))?;
            log::info!("issued token for {user_id}");
            println!("{token}");
        }
        Commands::VerifyToken { token, secret } => {
            let config = AuthConfig::new(JwtSecret::new(secret)?);
            let claims = config.verifier().verify(token.trim())?;
            println!("{}", serde_json::to_string_pretty(claims.claims())?);
        }
    }

    Ok(())
}
