use std::io::{self, Write};

use clap::Args;

use crate::context::AppContext;
use crate::error::{AppError, AppResult};

#[derive(Args, Debug, Clone)]
pub struct LoginArgs {
    /// Username in the SSO realm; prompted for when omitted.
    #[arg(short, long)]
    pub username: Option<String>,
}

pub async fn login(ctx: &AppContext, args: LoginArgs) -> AppResult<()> {
    let username = match args.username {
        Some(username) => username,
        None => prompt("Username")?,
    };
    if username.is_empty() {
        return Err(AppError::Authentication("a username is required".to_string()));
    }
    let password = prompt("Password")?;

    let token = ctx.session.login(&username, &password).await?;

    let display = token.username.or(token.subject).unwrap_or(username);
    println!("Signed in as {display}.");
    Ok(())
}

pub async fn logout(ctx: &AppContext) -> AppResult<()> {
    ctx.session.logout().await?;
    println!("Session cleared.");
    Ok(())
}

fn prompt(field: &str) -> AppResult<String> {
    let mut stdout = io::stdout();
    write!(stdout, "{field}: ")?;
    stdout.flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}
