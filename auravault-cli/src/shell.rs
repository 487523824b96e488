//! Interactive session with inactivity auto-lock

use anyhow::{Context, Result};
use auravault_core::{ActivityHub, JsonFileStore, VaultService, VaultSession, VaultState};
use rpassword::prompt_password;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;
use zeroize::Zeroizing;

#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Help,
    List,
    Add { title: &'a str, content: &'a str },
    Lock,
    Unlock,
    Status,
    Quit,
    Empty,
    Unknown(&'a str),
}

impl<'a> Command<'a> {
    fn parse(line: &'a str) -> Self {
        let line = line.trim();
        let (name, rest) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (line, ""),
        };

        match name {
            "" => Command::Empty,
            "help" | "?" => Command::Help,
            "list" | "ls" => Command::List,
            "lock" => Command::Lock,
            "unlock" => Command::Unlock,
            "status" => Command::Status,
            "quit" | "exit" => Command::Quit,
            "add" => match rest.split_once(char::is_whitespace) {
                Some((title, content)) => Command::Add {
                    title,
                    content: content.trim(),
                },
                None => Command::Unknown(line),
            },
            _ => Command::Unknown(line),
        }
    }
}

const HELP: &str = "\
Commands:
  list                    show secrets (titles only while locked)
  add <title> <content>   add a secret
  lock                    lock the vault now
  unlock                  unlock with the passphrase
  status                  show lock state and time until auto-lock
  quit                    lock and exit";

pub async fn run(session: VaultSession<JsonFileStore>, auto_lock: Duration) -> Result<()> {
    let vault = VaultService::new(session, auto_lock);
    let activity = ActivityHub::new();
    vault.attach_activity_source(&activity);

    unlock(&vault).await?;
    println!(
        "Vault unlocked. Auto-lock after {}s of inactivity. Type 'help' for commands.",
        auto_lock.as_secs()
    );

    let mut states = vault.subscribe_state();
    states.borrow_and_update();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                if *states.borrow_and_update() == VaultState::Locked {
                    println!("Vault locked.");
                }
            }
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read from stdin")? else {
                    break;
                };
                activity.signal();

                match Command::parse(&line) {
                    Command::Empty => {}
                    Command::Help => println!("{}", HELP),
                    Command::List => list(&vault).await?,
                    Command::Add { title, content } => {
                        match vault.add_secret(title, content).await {
                            Ok(added) => println!("Added secret '{}' ({})", added.title, added.id),
                            Err(e) => println!("Error: {}", e),
                        }
                    }
                    Command::Lock => vault.lock().await,
                    Command::Unlock => {
                        if vault.is_unlocked() {
                            println!("Vault is already unlocked.");
                        } else if let Err(e) = unlock(&vault).await {
                            println!("Error: {}", e);
                        } else {
                            println!("Vault unlocked.");
                        }
                    }
                    Command::Status => match vault.time_until_lock() {
                        Some(left) => println!(
                            "{:?}, auto-lock in {}s",
                            vault.state(),
                            left.as_secs()
                        ),
                        None => println!("{:?}", vault.state()),
                    },
                    Command::Quit => break,
                    Command::Unknown(input) => {
                        debug!("Unrecognized command: {}", input);
                        println!("Unknown command. Type 'help' for commands.");
                    }
                }
            }
        }
    }

    vault.lock().await;
    Ok(())
}

async fn unlock(vault: &VaultService<JsonFileStore>) -> Result<()> {
    // rpassword blocks on the terminal
    let passphrase = tokio::task::spawn_blocking(|| prompt_password("Vault passphrase: "))
        .await
        .context("passphrase prompt task failed")?
        .context("failed to read from terminal")?;
    let passphrase = Zeroizing::new(passphrase);

    vault.unlock(&passphrase).await?;
    Ok(())
}

async fn list(vault: &VaultService<JsonFileStore>) -> Result<()> {
    if vault.is_unlocked() {
        let records = vault.decrypted_records().await;
        if records.is_empty() {
            println!("Vault is empty");
        }
        for record in &records {
            println!("{}: {}", record.title, record.content);
        }
    } else {
        for summary in vault.list_records().await? {
            println!("{}  {}", summary.id, summary.title);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(Command::parse("list"), Command::List);
        assert_eq!(Command::parse("  lock "), Command::Lock);
        assert_eq!(Command::parse("exit"), Command::Quit);
        assert_eq!(Command::parse(""), Command::Empty);
    }

    #[test]
    fn test_parse_add_keeps_content_spaces() {
        assert_eq!(
            Command::parse("add wifi  hunter2 and more"),
            Command::Add {
                title: "wifi",
                content: "hunter2 and more"
            }
        );
    }

    #[test]
    fn test_parse_add_without_content() {
        assert_eq!(Command::parse("add wifi"), Command::Unknown("add wifi"));
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(Command::parse("frobnicate"), Command::Unknown("frobnicate"));
    }
}
