use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use shared::domain::Role;
use storage::Storage;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://./data/site.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Adds an account that can sign in to the site.
    CreateUser {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = "")]
        email: String,
        #[arg(long)]
        admin: bool,
    },
    /// Deletes sessions idle for longer than the given number of seconds.
    PurgeSessions {
        #[arg(long, default_value_t = 60 * 60 * 24 * 14)]
        older_than: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url).await?;

    match cli.command {
        Command::CreateUser {
            username,
            password,
            email,
            admin,
        } => {
            if password.is_empty() {
                bail!("password must not be empty");
            }
            let role = if admin { Role::Admin } else { Role::User };
            let user_id = storage
                .create_user(&username, &email, &password, role)
                .await?;
            println!("created user_id={} role={}", user_id.0, role.as_str());
        }
        Command::PurgeSessions { older_than } => {
            let purged = storage.purge_sessions(older_than).await?;
            println!("purged {purged} sessions");
        }
    }

    Ok(())
}
