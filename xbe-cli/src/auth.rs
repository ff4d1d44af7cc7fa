//! `xbe auth` commands.

use std::io::IsTerminal;

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use tokio::io::{AsyncBufReadExt, BufReader};
use xbe_core::{CredentialStore, ResolveError, Secret, StoreError, TokenResolver, XbeError};

use crate::Globals;

#[derive(Subcommand)]
pub enum AuthCommand {
    /// Store a token for the current base URL (pass --token or paste it on stdin)
    Login,

    /// Show which token would be used and where it comes from
    Status,

    /// Remove the stored token for the current base URL
    Logout,
}

pub async fn run(command: AuthCommand, globals: &Globals) -> Result<()> {
    match command {
        AuthCommand::Login => login(globals).await,
        AuthCommand::Status => status(globals).await,
        AuthCommand::Logout => logout(globals).await,
    }
}

fn open_store() -> Result<CredentialStore> {
    CredentialStore::open_default().context("failed to open credential store")
}

async fn login(globals: &Globals) -> Result<()> {
    let token = match globals.token.as_deref().map(str::trim) {
        Some(token) if !token.is_empty() => token.to_string(),
        _ => read_token().await?,
    };
    if token.is_empty() {
        bail!("no token provided");
    }

    let store = open_store()?;
    let backend = globals
        .ctx
        .run(store.set(&globals.base_url, &Secret::new(token)))
        .await
        .map_err(XbeError::from)?
        .map_err(XbeError::from)?;

    println!("Logged in to {} (stored in {})", globals.base_url, backend);
    Ok(())
}

async fn read_token() -> Result<String> {
    if std::io::stdin().is_terminal() {
        eprint!("Paste API token: ");
    }

    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("failed to read token from stdin")?;
    Ok(line.trim().to_string())
}

async fn status(globals: &Globals) -> Result<()> {
    let store = CredentialStore::open_default().ok();
    let resolver = match &store {
        Some(store) => TokenResolver::new(store),
        None => TokenResolver::without_store(),
    };

    match resolver
        .resolve(&globals.ctx, &globals.base_url, globals.token.as_deref())
        .await
    {
        Ok(resolved) => {
            println!("Base URL: {}", globals.base_url);
            println!("Token:    {}", resolved.token.masked());
            println!("Source:   {}", resolved.source);
            Ok(())
        }
        Err(ResolveError::NotFound { .. }) => {
            println!("Not logged in to {}", globals.base_url);
            Ok(())
        }
        Err(e) => Err(XbeError::from(e).into()),
    }
}

async fn logout(globals: &Globals) -> Result<()> {
    let store = open_store()?;
    let result = globals
        .ctx
        .run(store.delete(&globals.base_url))
        .await
        .map_err(XbeError::from)?;

    match result {
        Ok(()) => println!("Logged out of {}", globals.base_url),
        Err(StoreError::NotFound { .. }) => {
            println!("No stored token for {}", globals.base_url)
        }
        Err(e) => return Err(XbeError::from(e).into()),
    }
    Ok(())
}
