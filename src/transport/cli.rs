//! CLI transport for direct terminal interaction
//!
//! Every line typed at the prompt is a message sent to one guild channel.
//! Lines starting with `/` control the simulated session instead.

use crate::channels::Notice;
use crate::config::Config;
use crate::core::identity::MemoryIdentity;
use crate::core::session::Session;
use crate::core::traits::OutputSink;
use crate::core::types::UserProfile;
use crate::engine::Engine;
use anyhow::Result;
use async_trait::async_trait;
use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

/// Prints bot messages to stdout
pub struct StdoutSink;

#[async_trait]
impl OutputSink for StdoutSink {
    async fn send(&self, message: String) -> Result<()> {
        if message.is_empty() {
            return Ok(());
        }
        println!("{} {}", "bot:".green().bold(), message);
        Ok(())
    }

    async fn send_queued(&self, message: String) -> Result<()> {
        self.send(message).await
    }
}

/// Who is typing and where
struct Speaker {
    user_id: String,
    guild_id: String,
    direct: bool,
}

impl Speaker {
    fn session(&self, content: &str) -> Session {
        if self.direct {
            Session::direct(&self.user_id, content)
        } else {
            Session::guild(&self.user_id, &self.guild_id, content)
        }
    }
}

fn build_engine(config: Config, identity: Arc<MemoryIdentity>) -> Result<Engine> {
    Engine::builder(config).identity(identity).build()
}

/// Run the interactive chat loop
pub async fn run_chat(config: Config, guild_id: String, user_id: String, authority: u32) -> Result<()> {
    let identity = Arc::new(MemoryIdentity::new());
    identity.insert(UserProfile::new(&user_id, authority));
    let prefix = config.general.prefix.clone();
    let engine = build_engine(config, Arc::clone(&identity))?;
    let sink = StdoutSink;

    println!("ditto chat mode");
    println!("Teach with '{prefix} <question> <answer>', '{prefix}' alone for help.");
    println!("Type '/as <user> [authority]', '/dm', '/poke', '/join' or 'exit'\n");

    let mut speaker = Speaker {
        user_id,
        guild_id,
        direct: false,
    };
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{}> ", speaker.user_id.cyan());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        match input {
            "exit" | "quit" => {
                println!("Goodbye!");
                break;
            }
            "/dm" => {
                speaker.direct = !speaker.direct;
                let place = if speaker.direct { "direct messages" } else { "the guild" };
                println!("{}", format!("Now talking in {place}.").dimmed());
                continue;
            }
            "/poke" | "/join" => {
                let notice = if input == "/poke" {
                    Notice::Poke {
                        target_id: "bot".to_string(),
                    }
                } else {
                    Notice::MemberAdded
                };
                if let Err(e) = engine.handle_notice(speaker.session(""), &notice, &sink).await {
                    eprintln!("Error: {}", e);
                }
                continue;
            }
            _ => {}
        }

        if let Some(rest) = input.strip_prefix("/as ") {
            let mut parts = rest.split_whitespace();
            if let Some(user) = parts.next() {
                speaker.user_id = user.to_string();
                if let Some(level) = parts.next().and_then(|level| level.parse().ok()) {
                    identity.set_authority(user, level);
                } else if engine.identity.resolve(user).await?.is_none() {
                    identity.insert(UserProfile::new(user, 1));
                }
            }
            continue;
        }

        if let Err(e) = engine.handle_message(speaker.session(input), &sink).await {
            eprintln!("Error: {}", e);
        }
    }

    Ok(())
}

/// Print the number of questions and dialogues
pub async fn run_stats(config: Config) -> Result<()> {
    let engine = build_engine(config, Arc::new(MemoryIdentity::new()))?;
    let stats = engine.stats().await?;
    println!("{}", "=== DITTO STATS ===".bold().cyan());
    println!("Questions: {}", stats.questions);
    println!("Dialogues: {}", stats.dialogues);
    Ok(())
}

/// Show the effective configuration, optionally writing it to disk
pub fn run_config(config: &Config, init: bool) -> Result<()> {
    if init {
        config.save()?;
        println!("{} {}", "✓".green(), Config::config_path()?.display());
        return Ok(());
    }
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
