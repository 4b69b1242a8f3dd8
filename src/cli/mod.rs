use anyhow::{Context, bail};
use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{self, Config};
use crate::domain::{
    amount::Amount,
    campaign::{CampaignDraft, CampaignPatch, CampaignStatus},
    hash::Fingerprint,
    ids::generate_id,
    music::MusicDraft,
    play::{PlaySession, simulate_listen},
    progress::Role,
    stats::{Leaderboard, PortfolioValue, QuickStats},
};
use crate::http::server::HttpServer;
use crate::public_endpoint::resolve_location;
use crate::storage::{
    error::StorageError,
    ledger::SqliteLedger,
    repository::LedgerRepository,
};

#[derive(Parser)]
#[command(name = "tunecent")]
#[command(version = "0.1")]
#[command(about = "Local ledger for music crowdfunding and play royalties")]
pub struct Cli {
    /// Path to the config TOML file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show ledger totals
    Status,
    /// Manage uploaded tracks
    #[command(subcommand)]
    Music(MusicCommand),
    /// Manage funding campaigns
    #[command(subcommand)]
    Campaign(CampaignCommand),
    /// Contribute to a campaign
    Invest {
        campaign_id: String,
        #[arg(long)]
        investor: String,
        #[arg(long)]
        amount: String,
    },
    /// Report a listen of the given length
    Play {
        music_id: String,
        #[arg(long)]
        user: Option<String>,
        /// seconds listened
        #[arg(long)]
        seconds: f64,
    },
    /// Show accumulated royalties of a user
    Royalty {
        user: String,
        #[arg(long, default_value = "user")]
        role: String,
    },
    /// Recompute and show a user's tier
    Progress {
        user: String,
        #[arg(long, default_value = "user")]
        role: String,
    },
    /// Most played tracks and artists
    Leaderboard {
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
    /// Run http server exposing the ledger
    Serve,
    /// Delete every ledger collection
    Clear {
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum MusicCommand {
    /// Upload an audio file
    Add {
        audio: PathBuf,
        #[arg(long)]
        title: String,
        #[arg(long)]
        artist: String,
        #[arg(long)]
        creator: String,
        #[arg(long)]
        cover: Option<PathBuf>,
        #[arg(long)]
        genre: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// `MM:SS` or seconds
        #[arg(long)]
        duration: Option<String>,
    },
    /// List tracks, newest first
    List {
        #[arg(long)]
        creator: Option<String>,
    },
    /// Remove a track and its media
    Remove { id: String },
}

#[derive(Subcommand)]
pub enum CampaignCommand {
    /// Open a funding campaign for a track
    Create {
        music_id: String,
        #[arg(long)]
        goal: String,
        /// percent of play revenue promised to backers
        #[arg(long)]
        royalty: f64,
        #[arg(long)]
        days: Option<u32>,
        #[arg(long)]
        lockup: Option<u32>,
        #[arg(long)]
        description: Option<String>,
    },
    /// List campaigns
    List {
        #[arg(long)]
        active: bool,
    },
    /// Change a campaign's status
    SetStatus { id: String, status: String },
}

fn open_ledger(cfg: &Config) -> anyhow::Result<SqliteLedger> {
    SqliteLedger::new(&cfg.database).with_context(|| "Failed to open ledger database")
}

fn parse_amount(raw: &str) -> anyhow::Result<Amount> {
    raw.parse()
        .with_context(|| format!("'{raw}' is not an amount"))
}

/// Entrypoint for CLI
pub fn run() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let cfg = config::Config::load(&cli.config)?;

    match cli.command {
        Commands::Status => {
            let ledger = open_ledger(&cfg)?;
            let stats = ledger.storage_stats()?;

            println!("Tracks: {}", stats.total_music);
            println!(
                "Campaigns: {} ({} active)",
                stats.total_campaigns, stats.active_campaigns
            );
            println!("Investments: {}", ledger.list_investments()?.len());
            println!("Counted plays: {}", ledger.list_plays()?.len());
        }

        Commands::Music(command) => music_command(&cfg, command)?,
        Commands::Campaign(command) => campaign_command(&cfg, command)?,

        Commands::Invest {
            campaign_id,
            investor,
            amount,
        } => {
            let mut ledger = open_ledger(&cfg)?;
            let (investment, campaign) =
                ledger.invest(&campaign_id, Some(investor.as_str()), parse_amount(&amount)?)?;

            println!(
                "Invested {} in '{}' ({})",
                investment.amount.to_display(),
                campaign.music_title,
                investment.id
            );
            println!(
                "Campaign raised {} of {} ({:.0}%) from {} backers",
                campaign.current_amount.to_display(),
                campaign.goal.to_display(),
                campaign.funded_percentage(),
                campaign.backers
            );
        }

        Commands::Play {
            music_id,
            user,
            seconds,
        } => {
            let mut ledger = open_ledger(&cfg)?;
            let music = ledger
                .get_music(&music_id)?
                .ok_or_else(|| StorageError::MusicNotFound(music_id.clone()))?;

            let started_at = Utc::now();
            let mut session = PlaySession::new(&music.id, &music.title, cfg.playback.policy());
            let events = simulate_listen(
                &mut session,
                started_at,
                seconds,
                f64::from(music.duration),
                user.as_deref(),
            )?;

            if events.is_empty() {
                println!("Listen of '{}' was not counted", music.title);
            }
            for event in events {
                println!(
                    "Counted play of '{}' by {} ({:.0}s)",
                    event.music_title, event.user_id, event.duration
                );
                ledger.record_play(event)?;
            }
            println!("Total plays: {}", ledger.play_count(&music.id)?);
        }

        Commands::Royalty { user, role } => {
            let role: Role = role.parse()?;
            let ledger = open_ledger(&cfg)?;
            let snapshot = ledger.snapshot()?;
            let calc = cfg.royalty.calculator();

            match role {
                Role::Creator => {
                    for music in snapshot.music_by_creator(&user) {
                        println!(
                            "  {}: {} plays, gross {}, yours {:.2}",
                            music.title,
                            snapshot.play_count(&music.id),
                            calc.gross_revenue(&snapshot, &music.id).to_display(),
                            calc.creator_royalty(&snapshot, &music.id)
                        );
                    }
                    println!(
                        "Total creator royalty: {:.2}",
                        calc.total_creator_royalty(&snapshot, &user)
                    );
                    let portfolio = PortfolioValue::for_creator(&snapshot, &user);
                    println!(
                        "Raised {} ({}% of goals)",
                        portfolio.total_raised.to_display(),
                        portfolio.growth_percentage
                    );
                }
                Role::User => {
                    for detail in calc.royalty_breakdown(&snapshot, &user) {
                        println!(
                            "  {} / {}: {} plays, earned {:.4}",
                            detail.music_title,
                            detail.campaign_title,
                            detail.play_count,
                            detail.earnings
                        );
                    }
                    println!(
                        "Total investor royalty: {:.4}",
                        calc.total_investor_royalty(&snapshot, &user)
                    );
                    let quick = QuickStats::for_user(&snapshot, &user);
                    println!(
                        "Contributions: {}, active pools: {} (avg {}% funded)",
                        quick.contributions, quick.active_pools, quick.avg_funded
                    );
                }
            }
        }

        Commands::Progress { user, role } => {
            let role: Role = role.parse()?;
            let mut ledger = open_ledger(&cfg)?;
            let progress = ledger.update_user_progress(&user, role, &cfg.royalty.calculator())?;

            println!("{} ({})", progress.user_id, progress.user_role);
            println!(
                "Level: {} ({:.1}%)",
                progress.level, progress.progress_percentage
            );
            println!(
                "Plays: {}, invested: {}, royalty: {}",
                progress.total_plays,
                progress.total_invested.to_display(),
                progress.total_royalty.to_display()
            );
        }

        Commands::Leaderboard { limit } => {
            let ledger = open_ledger(&cfg)?;
            let board = Leaderboard::from_snapshot(&ledger.snapshot()?, limit);

            println!("Top tracks:");
            for entry in &board.music {
                println!("  {}. {} ({} plays)", entry.rank, entry.name, entry.plays);
            }
            println!("Top artists:");
            for entry in &board.artists {
                println!("  {}. {} ({} plays)", entry.rank, entry.name, entry.plays);
            }
        }

        Commands::Serve => {
            println!("Starting HTTP server...");

            let ledger = open_ledger(&cfg)?;
            let http_server = HttpServer::new(
                ledger,
                cfg.http.clone(),
                cfg.public_endpoint.clone(),
                cfg.royalty.calculator(),
                cfg.playback.policy(),
            );

            println!(
                "HTTP server running at http://{}:{}",
                http_server.config.bind_addr, http_server.config.port
            );
            http_server.run();
        }

        Commands::Clear { yes } => {
            if !yes {
                bail!("refusing to clear the ledger without --yes");
            }
            open_ledger(&cfg)?.clear_all()?;
            println!("Ledger cleared");
        }
    }

    Ok(())
}

fn music_command(cfg: &Config, command: MusicCommand) -> anyhow::Result<()> {
    let mut ledger = open_ledger(cfg)?;

    match command {
        MusicCommand::Add {
            audio,
            title,
            artist,
            creator,
            cover,
            genre,
            description,
            duration,
        } => {
            let fingerprint = Fingerprint::from_file(&audio)?;
            for existing in ledger.find_by_fingerprint(&fingerprint)? {
                log::warn!(
                    "same audio already uploaded as '{}' ({})",
                    existing.title,
                    existing.id
                );
            }

            let draft = MusicDraft {
                title,
                artist,
                genre,
                description,
                duration,
                creator_address: creator,
            };
            let music = ledger.upload_music(draft, &audio, cover.as_deref())?;
            println!("Uploaded '{}' as {}", music.title, music.id);
        }

        MusicCommand::List { creator } => {
            let tracks = match creator {
                Some(creator) => ledger.music_by_creator(&creator)?,
                None => ledger.list_music()?,
            };

            for music in tracks {
                println!("Track: {} ({})", music.title, music.id);
                println!("  Artist: {}, genre: {}", music.artist, music.genre);
                println!(
                    "  Uploaded {} by {}",
                    music.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
                    music.creator_address
                );
                match resolve_location(&cfg.public_endpoint, &music.audio_file_url) {
                    Some(url) => println!("  Audio: {url}"),
                    None => println!("  Audio unavailable :("),
                }
                println!("  Plays: {}", ledger.play_count(&music.id)?);
            }
        }

        MusicCommand::Remove { id } => {
            if !ledger.remove_music(&id)? {
                bail!("no music with id {id}");
            }
            println!("Removed {id}");
        }
    }

    Ok(())
}

fn campaign_command(cfg: &Config, command: CampaignCommand) -> anyhow::Result<()> {
    let mut ledger = open_ledger(cfg)?;

    match command {
        CampaignCommand::Create {
            music_id,
            goal,
            royalty,
            days,
            lockup,
            description,
        } => {
            let music = ledger
                .get_music(&music_id)?
                .ok_or_else(|| StorageError::MusicNotFound(music_id.clone()))?;

            let draft = CampaignDraft {
                music_token_id: music.id,
                music_title: music.title,
                goal: parse_amount(&goal)?,
                royalty_percentage: royalty,
                duration_days: days,
                lockup_days: lockup,
                description,
                creator_address: music.creator_address,
            };
            let campaign = draft.into_campaign(generate_id(), Utc::now())?;
            ledger.save_campaign(campaign.clone())?;

            println!(
                "Campaign {} opened for '{}', goal {}, {}% to backers",
                campaign.id,
                campaign.music_title,
                campaign.goal.to_display(),
                campaign.royalty_percentage
            );
        }

        CampaignCommand::List { active } => {
            let campaigns = if active {
                ledger.active_campaigns()?
            } else {
                ledger.list_campaigns()?
            };

            for campaign in campaigns {
                println!("Campaign: {} [{}]", campaign.id, campaign.status);
                println!("  Track: {}", campaign.music_title);
                println!(
                    "  Raised {} of {} ({:.0}%), {} backers",
                    campaign.current_amount.to_display(),
                    campaign.goal.to_display(),
                    campaign.funded_percentage(),
                    campaign.backers
                );
                println!(
                    "  Deadline {}",
                    campaign.deadline.with_timezone(&Local).format("%Y-%m-%d")
                );
            }
        }

        CampaignCommand::SetStatus { id, status } => {
            let status: CampaignStatus = status.parse()?;
            if !ledger.update_campaign(&id, CampaignPatch::status(status))? {
                return Err(StorageError::CampaignNotFound(id).into());
            }
            println!("Campaign {id} is now {status}");
        }
    }

    Ok(())
}
