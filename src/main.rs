//! PVE Warden - interactive console
//!
//! Loads a configuration, builds the damage engine and offers the
//! administrative surface on a small command loop so operators can poke
//! at mappings, the schedule and trace mode without a live host.

use std::io::{self, Write};
use std::path::PathBuf;

use clap::Parser;

use pve_warden::core::error::Result;
use pve_warden::{DamageEngine, SystemClock, WardenConfig};

#[derive(Parser, Debug)]
#[command(name = "pve-warden", about = "Damage authorization rule engine console")]
struct Args {
    /// Path to a TOML configuration; stock config when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Tracing filter, e.g. "pve_warden=debug".
    #[arg(long, default_value = "pve_warden=info")]
    log: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(args.log.clone())
        .init();

    tracing::info!("PVE Warden starting...");

    let config = match &args.config {
        Some(path) => WardenConfig::load(path)?,
        None => WardenConfig::default_config(),
    };
    let mut engine = DamageEngine::new(config);
    let clock = SystemClock;

    println!("\n=== PVE WARDEN ===");
    println!("Damage authorization rule engine");
    println!();
    println!("Commands:");
    println!("  status / s            - Show engine status");
    println!("  enable                - Toggle damage handling");
    println!("  trace                 - Toggle decision tracing");
    println!("  pvp                   - Toggle PVP on the current rule set");
    println!("  map <key> [target]    - Set or delete a zone mapping");
    println!("  sched <on|off>        - Enable or disable the schedule");
    println!("  tick                  - Run one schedule tick");
    println!("  def <ruleset>         - Switch the default rule set");
    println!("  dump                  - Print the effective engine options");
    println!("  quit / q              - Exit");
    println!();

    loop {
        display_status(&engine);

        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let input = input.trim();

        if input.is_empty() {
            continue;
        }
        if input == "quit" || input == "q" {
            break;
        }

        let mut parts = input.split_whitespace();
        let command = parts.next().unwrap_or_default();
        let rest: Vec<&str> = parts.collect();

        match command {
            "status" | "s" => {} // status reprints on loop
            "enable" => {
                let enabled = !engine.is_enabled();
                engine.set_enabled(enabled);
                println!("Damage handling set to {}", engine.is_enabled());
            }
            "trace" => {
                let on = engine.toggle_trace();
                println!("Trace mode toggled {}", if on { "on" } else { "off" });
            }
            "pvp" => {
                let on = engine.toggle_pvp();
                println!("PVP toggled {}", if on { "on" } else { "off" });
            }
            "map" => match rest.as_slice() {
                [key] => match engine.remove_mapping(key) {
                    Ok(old) => println!("Mapping for \"{key}\" => \"{old}\" deleted"),
                    Err(err) => println!("{err}"),
                },
                [key, target] => match engine.set_mapping(key, target) {
                    Ok(Some(old)) => {
                        println!("Mapping for \"{key}\" changed from \"{old}\" to \"{target}\"")
                    }
                    Ok(None) => println!("Mapping created for \"{key}\" => \"{target}\""),
                    Err(err) => println!("{err}"),
                },
                _ => println!("Usage: map <key> [target]"),
            },
            "sched" => match rest.first().copied() {
                Some("on") => match engine.set_schedule_enabled(true) {
                    Ok(()) => println!("Schedule enabled"),
                    Err(err) => println!("{err}"),
                },
                Some("off") => match engine.set_schedule_enabled(false) {
                    Ok(()) => println!("Schedule disabled"),
                    Err(err) => println!("{err}"),
                },
                _ => println!("Usage: sched <on|off>"),
            },
            "tick" => {
                if let Some(broadcast) = engine.schedule_tick(&clock) {
                    println!("Broadcast: {broadcast}");
                } else {
                    println!("Schedule tick ran; no change");
                }
            }
            "dump" => match serde_json::to_string_pretty(&engine.config().options) {
                Ok(json) => println!("{json}"),
                Err(err) => println!("{err}"),
            },
            "def" => match rest.first().copied() {
                Some(name) => match engine.reset_default_ruleset(name) {
                    Ok(()) => println!("Default rule set is now \"{name}\""),
                    Err(err) => println!("{err}"),
                },
                None => println!("Usage: def <ruleset>"),
            },
            _ => println!("Unknown command: {command}"),
        }
        println!();
    }

    tracing::info!("PVE Warden shutting down");
    Ok(())
}

fn display_status(engine: &DamageEngine) {
    let config = engine.config();
    println!(
        "[{}] ruleset: {} | rulesets: {} | groups: {} | mappings: {} | schedule: {}",
        if engine.is_enabled() { "on" } else { "off" },
        engine.current_ruleset_name(),
        config.rulesets.len(),
        config.groups.len(),
        config.mappings.len(),
        match (config.schedule.valid, config.schedule.enabled) {
            (false, _) => "invalid",
            (true, false) => "off",
            (true, true) => "on",
        },
    );
}
