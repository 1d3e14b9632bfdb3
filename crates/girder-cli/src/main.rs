#![forbid(unsafe_code)]

mod actor;
mod cmd;
mod output;
mod validate;

use clap::{CommandFactory, Parser, Subcommand};
use girder_core::config::{UserConfig, load_user_config, resolve_output};
use output::OutputMode;
use std::env;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "gd: optimistic engagement for the girder construction network",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Override actor identity (skips env and config resolution).
    #[arg(long, global = true)]
    actor: Option<String>,

    /// Suppress non-essential output.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Workspace",
        about = "Initialize a girder workspace",
        long_about = "Create .girder/ in the current directory with a default config and an empty feed.",
        after_help = "EXAMPLES:\n    # Initialize the current directory\n    gd init\n\n    # Emit machine-readable output\n    gd init --json"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        next_help_heading = "Content",
        about = "Add a news post to the feed",
        after_help = "EXAMPLES:\n    gd --actor newsroom post --title \"Tower crane lift plan\" --body \"Level 9 on Tuesday\""
    )]
    Post(cmd::content::PostArgs),

    #[command(
        next_help_heading = "Content",
        about = "Ask a forum question",
        after_help = "EXAMPLES:\n    gd --actor fay ask --title \"Minimum cover for footings?\""
    )]
    Ask(cmd::content::AskArgs),

    #[command(
        next_help_heading = "Content",
        about = "Answer a forum question",
        after_help = "EXAMPLES:\n    gd --actor pro answer q-1a2b3c4d5e6f --body \"75 mm cast against earth\""
    )]
    Answer(cmd::content::AnswerArgs),

    #[command(
        next_help_heading = "Read",
        about = "List feed entries",
        after_help = "EXAMPLES:\n    # Everything\n    gd list\n\n    # Only questions\n    gd list --kind question\n\n    # Emit machine-readable output\n    gd list --json"
    )]
    List(cmd::list::ListArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show one entry or comment",
        after_help = "EXAMPLES:\n    gd show p-1a2b3c4d5e6f\n\n    gd show q-1a2b3c4d5e6f --json"
    )]
    Show(cmd::show::ShowArgs),

    #[command(
        next_help_heading = "Engage",
        about = "Vote on a question or answer",
        long_about = "Vote up or down. Repeating your current vote retracts it; voting the\n\
                      other way moves your vote.",
        after_help = "EXAMPLES:\n    gd vote q-1a2b3c4d5e6f up\n\n    gd vote a-1a2b3c4d5e6f down --json"
    )]
    Vote(cmd::engage::VoteArgs),

    #[command(
        next_help_heading = "Engage",
        about = "Toggle your like on a post or comment",
        after_help = "EXAMPLES:\n    gd like p-1a2b3c4d5e6f"
    )]
    Like(cmd::engage::TargetArgs),

    #[command(
        next_help_heading = "Engage",
        about = "Toggle the saved flag on any entry",
        after_help = "EXAMPLES:\n    gd save q-1a2b3c4d5e6f"
    )]
    Save(cmd::engage::TargetArgs),

    #[command(
        next_help_heading = "Engage",
        about = "Comment on a post or reply to an answer",
        after_help = "EXAMPLES:\n    gd comment p-1a2b3c4d5e6f \"Which crane model?\""
    )]
    Comment(cmd::engage::CommentArgs),

    #[command(
        next_help_heading = "Engage",
        about = "Accept an answer to a question",
        long_about = "Mark one answer as accepted. Any previously accepted answer is cleared;\n\
                      accepting the current one clears it.",
        after_help = "EXAMPLES:\n    gd accept q-1a2b3c4d5e6f a-1a2b3c4d5e6f"
    )]
    Accept(cmd::engage::AcceptArgs),

    #[command(
        next_help_heading = "Engage",
        about = "Toggle the helpful flag on an answer",
        after_help = "EXAMPLES:\n    gd helpful a-1a2b3c4d5e6f"
    )]
    Helpful(cmd::engage::TargetArgs),

    #[command(
        next_help_heading = "Sync",
        about = "Inspect and settle pending commands",
        after_help = "EXAMPLES:\n    gd ledger list --pending\n\n    gd ledger confirm cmd-1\n\n    gd ledger rollback cmd-2"
    )]
    Ledger(cmd::ledger::LedgerArgs),

    #[command(
        next_help_heading = "Sync",
        about = "Sign in, sign out, or show the session",
        after_help = "EXAMPLES:\n    gd --actor ana session login\n\n    gd session show\n\n    gd session logout"
    )]
    Session(cmd::session::SessionArgs),

    #[command(
        next_help_heading = "Sync",
        about = "Describe a backend request without sending it",
        after_help = "EXAMPLES:\n    gd request list-news\n\n    gd request job-apply --body '{\"jobId\":\"j1\",\"applicantName\":\"Ana\",\"email\":\"ana@site.io\"}'"
    )]
    Request(cmd::request::RequestArgs),

    #[command(
        next_help_heading = "Developer",
        about = "Deterministic simulation campaigns",
        after_help = "EXAMPLES:\n    gd sim run --seeds 100\n\n    gd sim replay --seed 42"
    )]
    Sim(cmd::sim::SimArgs),

    #[command(
        next_help_heading = "Developer",
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n    gd completions bash > /etc/bash_completion.d/gd\n\n    gd completions zsh > ~/.zfunc/_gd"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(quiet: bool) {
    let filter = EnvFilter::try_from_env("GIRDER_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "girder=debug,info"
        } else if quiet {
            "error"
        } else {
            "girder=info,warn"
        })
    });

    let format = env::var("GIRDER_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.quiet);

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let user = load_user_config().unwrap_or_else(|err| {
        warn!(error = %err, "ignoring unreadable user config");
        UserConfig::default()
    });
    let env_format = env::var("FORMAT").ok();
    let output = OutputMode::from_resolved(&resolve_output(
        cli.json,
        user.output.as_deref(),
        env_format.as_deref(),
    ));
    debug!(?output, "output mode resolved");

    let project_root = env::current_dir()?;
    let actor = cli.actor.as_deref();
    let configured = user.actor.as_deref();

    match &cli.command {
        Commands::Init(args) => cmd::init::run_init(args, output, &project_root),
        Commands::Post(args) => {
            cmd::content::run_post(args, actor, configured, output, &project_root)
        }
        Commands::Ask(args) => cmd::content::run_ask(args, actor, configured, output, &project_root),
        Commands::Answer(args) => {
            cmd::content::run_answer(args, actor, configured, output, &project_root)
        }
        Commands::List(args) => cmd::list::run_list(args, output, &project_root),
        Commands::Show(args) => cmd::show::run_show(args, output, &project_root),
        Commands::Vote(args) => cmd::engage::run_vote(args, output, &project_root),
        Commands::Like(args) => cmd::engage::run_like(args, output, &project_root),
        Commands::Save(args) => cmd::engage::run_save(args, output, &project_root),
        Commands::Comment(args) => cmd::engage::run_comment(args, output, &project_root),
        Commands::Accept(args) => cmd::engage::run_accept(args, output, &project_root),
        Commands::Helpful(args) => cmd::engage::run_helpful(args, output, &project_root),
        Commands::Ledger(args) => cmd::ledger::run_ledger(args, output, &project_root),
        Commands::Session(args) => {
            cmd::session::run_session(args, actor, configured, output, &project_root)
        }
        Commands::Request(args) => cmd::request::run_request(args, output, &project_root),
        Commands::Sim(args) => match &args.command {
            cmd::sim::SimCommand::Run(run) => cmd::sim::run_sim_run(run, output),
            cmd::sim::SimCommand::Replay(replay) => cmd::sim::run_sim_replay(replay, output),
        },
        Commands::Completions(args) => {
            cmd::completions::run_completions(args.shell, &mut Cli::command())
        }
    }
}
