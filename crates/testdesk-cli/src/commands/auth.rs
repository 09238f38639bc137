//! The `testdesk login`, `logout` and `whoami` commands.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};

use testdesk_core::model::{Credentials, Role};

use super::{api_error, connect, require_login};

pub async fn login(config: Option<PathBuf>, email: String, password: Option<String>) -> Result<()> {
    let client = connect(config)?;

    let password = match password {
        Some(p) => p,
        None => read_password()?,
    };
    anyhow::ensure!(!password.is_empty(), "password must not be empty");

    let user = client.login(&Credentials { email, password }).await?;
    println!("Signed in as {} <{}>", user.name, user.email);

    if user.role != Role::Student {
        println!("Note: only student accounts can take tests.");
    }
    if !user.is_profile_completed {
        println!("Your profile is incomplete. Complete it before starting a test.");
    }
    Ok(())
}

pub async fn logout(config: Option<PathBuf>) -> Result<()> {
    let client = connect(config)?;
    if !client.is_authenticated() {
        println!("Not signed in.");
        return Ok(());
    }
    client.logout().await?;
    println!("Signed out.");
    Ok(())
}

pub async fn whoami(config: Option<PathBuf>) -> Result<()> {
    let client = connect(config)?;
    require_login(&client)?;

    let user = client
        .current_user()
        .await
        .map_err(|e| api_error(e, "load your profile"))?;

    println!("Name:    {}", user.name);
    println!("Email:   {}", user.email);
    println!("Role:    {:?}", user.role);
    if let Some(city) = &user.city {
        println!("City:    {city}");
    }
    println!(
        "Profile: {}",
        if user.is_profile_completed {
            "complete"
        } else {
            "incomplete"
        }
    );
    Ok(())
}

fn read_password() -> Result<String> {
    eprint!("Password: ");
    std::io::stderr().flush().ok();
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read password")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
