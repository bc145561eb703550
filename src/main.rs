use clap::{Parser, Subcommand};
use corebot::app_core::AppCore;
use corebot::config::Config;
use corebot::media::{FolderCatalog, MediaCatalog};
use corebot::player::{LogPlayer, PlayerEvent};
use corebot::runtime::{run_console, spawn_scheduler, Cadence, ConsoleExit, SchedulerEvent};
use corebot::schedule::{self, RandomMinutes};
use std::io;
use std::path::PathBuf;
use serde::Serialize;
use tracing::{info, trace, warn};

#[derive(Parser)]
#[command(name = "corebot", about = "Plays videos from a folder at random minutes of every hour")]
struct Cli {
    /// Config file (default: platform config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scheduler with an interactive operator console
    Run {
        /// Video folder (overrides config)
        #[arg(short, long)]
        folder: Option<PathBuf>,
        /// Seconds between schedule checks (overrides config)
        #[arg(long)]
        check_interval: Option<u64>,
        /// Log playbacks instead of launching the player
        #[arg(long)]
        dry_run: bool,
        /// Do not loop background audio
        #[arg(long)]
        mute: bool,
    },
    /// List the videos the scheduler would pick up
    List {
        #[arg(short, long)]
        folder: Option<PathBuf>,
    },
    /// Build one schedule and print it without playing anything
    Plan {
        #[arg(short, long)]
        folder: Option<PathBuf>,
        /// Seed the random minutes for a reproducible plan
        #[arg(long)]
        seed: Option<u64>,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Configuration file management
    Config {
        #[command(subcommand)]
        action: ConfigCmd,
    },
}

#[derive(Subcommand)]
enum ConfigCmd {
    /// Show the effective configuration
    Show,
    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();
}

fn load_config(explicit: Option<&PathBuf>) -> Config {
    match explicit {
        Some(path) => match Config::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
        None => Config::load(&Config::default_path()),
    }
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_ref());

    match cli.command {
        Commands::Run {
            folder,
            check_interval,
            dry_run,
            mute,
        } => {
            if let Some(folder) = folder {
                config.media_folder = folder;
            }
            if let Some(secs) = check_interval {
                config.check_interval_secs = secs;
            }
            config.mute_background |= mute;
            if let Err(e) = config.validate() {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
            run(config, dry_run);
        }
        Commands::List { folder } => {
            let folder = folder.unwrap_or_else(|| config.media_folder.clone());
            match FolderCatalog::new(&folder, &config.extensions).load() {
                Ok(items) if items.is_empty() => {
                    println!("No videos found in folder: {}", folder.display());
                }
                Ok(items) => {
                    println!("{} video(s) in {}:", items.len(), folder.display());
                    for item in &items {
                        println!("  {}", item.name);
                    }
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Plan { folder, seed, json } => {
            let folder = folder.unwrap_or_else(|| config.media_folder.clone());
            let items = match FolderCatalog::new(&folder, &config.extensions).load() {
                Ok(items) => items,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            };
            let mut minutes = match seed {
                Some(s) => RandomMinutes::with_seed(s),
                None => RandomMinutes::new(),
            };
            let plan = schedule::build(items, &mut minutes, 1);
            if json {
                print_json(&plan.by_minute());
            } else if plan.is_empty() {
                println!("No videos found in folder: {}", folder.display());
            } else {
                for slot in plan.by_minute() {
                    println!("  {}  {}", slot.minute, slot.item.name);
                }
            }
        }
        Commands::Config { action } => match action {
            ConfigCmd::Show => print_json(&config),
            ConfigCmd::Init { force } => {
                let path = cli.config.clone().unwrap_or_else(Config::default_path);
                if path.exists() && !force {
                    eprintln!(
                        "Error: '{}' already exists. Use --force to overwrite.",
                        path.display()
                    );
                    std::process::exit(1);
                }
                match Config::default().save(&path) {
                    Ok(()) => println!("Wrote {}", path.display()),
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        std::process::exit(1);
                    }
                }
            }
        },
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(out) => println!("{}", out),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn on_player_event(event: PlayerEvent) {
    match event {
        PlayerEvent::Started { name } => trace!("Player started {}", name),
        PlayerEvent::Finished { name, success } => {
            if success {
                info!("Finished {}", name);
            } else {
                warn!("Player exited with an error for {}", name);
            }
        }
        PlayerEvent::AudioFailed { name, error } => {
            warn!("No background audio for {}: {}", name, error)
        }
    }
}

fn on_scheduler_event(event: SchedulerEvent) {
    match event {
        SchedulerEvent::Clock(time) => trace!("Current Time: {}", time),
        SchedulerEvent::ClockUnavailable(e) => eprintln!("Clock unavailable: {}", e),
        SchedulerEvent::Reloaded {
            generation,
            scheduled,
        } => println!("Schedule #{}: {} video(s)", generation, scheduled),
        SchedulerEvent::CatalogEmpty(reason) => match reason {
            Some(e) => println!("No videos scheduled ({})", e),
            None => println!("No videos scheduled"),
        },
        SchedulerEvent::Fired { name, minute } => println!("Playing {} at :{:02}", name, minute),
        SchedulerEvent::PlaybackFailed { name, error } => {
            println!("Could not play {}: {}", name, error)
        }
        SchedulerEvent::NextChanged(next) => match next {
            Some(n) => println!("Next Video: {} at :{:02}", n.name, n.minute.value()),
            None => println!("No upcoming videos."),
        },
    }
}

fn run(config: Config, dry_run: bool) {
    let mut core = AppCore::from_config(&config, on_player_event);
    if dry_run {
        core = core.with_player(Box::new(LogPlayer));
    }
    let cadence = Cadence {
        display_tick: config.display_tick(),
        check_interval: config.check_interval(),
    };

    info!("Watching {}", config.media_folder.display());
    let (handle, join) = match spawn_scheduler(core, cadence, on_scheduler_event) {
        Ok(pair) => pair,
        Err(e) => {
            eprintln!("Error: cannot start scheduler: {}", e);
            std::process::exit(1);
        }
    };

    println!("Commands: [c]heck, [r]eload, [s]tatus, [q]uit");
    match run_console(io::stdin().lock(), &mut io::stdout(), &handle) {
        ConsoleExit::Quit => handle.shutdown(),
        ConsoleExit::InputClosed => info!("Console input closed, scheduler keeps running"),
        ConsoleExit::SchedulerGone => {}
    }

    if join.join().is_err() {
        eprintln!("Error: scheduler thread panicked");
    }
}
