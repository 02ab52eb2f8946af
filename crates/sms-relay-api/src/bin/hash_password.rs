//! Print an argon2id hash for seeding a `users.password_hash` column.

use std::io::BufRead;

use clap::Parser;
use dialoguer::Password;

use sms_relay_api::auth::password::hash_password;

#[derive(Parser, Debug)]
#[command(name = "sms-relay-hash-password")]
#[command(version, about = "Hash a password for an SMS Relay user record")]
struct Args {
    /// Read the password from the first line of stdin instead of prompting.
    #[arg(long)]
    stdin: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let password = if args.stdin {
        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line)?;
        line.trim_end_matches(['\r', '\n']).to_string()
    } else {
        Password::new()
            .with_prompt("Password")
            .with_confirmation("Confirm password", "Passwords do not match")
            .interact()?
    };

    if password.is_empty() {
        anyhow::bail!("Password must not be empty");
    }

    let hash = hash_password(&password).map_err(|e| anyhow::anyhow!("Hashing failed: {e}"))?;

    #[allow(clippy::print_stdout)]
    {
        println!("{hash}");
    }
    Ok(())
}
