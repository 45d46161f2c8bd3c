// Entrypoint for the repost CLI.
// - Parses arguments, sets up logging on stderr and builds the pipeline.
// - stdout only carries status markers and the final JSON result, which a
//   backend process reads while the tool runs.

use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use insta_repost::cli::CliArgs;
use insta_repost::config::Config;
use insta_repost::download::YtDlp;
use insta_repost::instagram::{AuthCodeSource, GraphInstagram};
use insta_repost::status::{RepostResult, StatusReporter};
use insta_repost::{ui, RepostError, RepostOutcome, RepostRequest, Reposter};

fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_logging(args.verbose);

    let mut status = StatusReporter::stdout();
    match run(&args, &mut status) {
        Ok(outcome) => {
            status.result(&outcome.to_result());
            if outcome.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            // Setup failed before the pipeline could report anything.
            error!("{:#}", e);
            status.final_status(false);
            let steps = status.steps().to_vec();
            status.result(&RepostResult::new(false, format!("Error: {}", e), steps));
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: &CliArgs, status: &mut StatusReporter) -> anyhow::Result<RepostOutcome> {
    let config = Config::from_env().context("Reading configuration")?;
    let interactive = ui::is_interactive();

    if config.password.is_some() {
        warn!("INSTAGRAM_PASSWORD is set but ignored: Graph API login uses OAuth tokens");
    }

    let mut request = match &args.url {
        Some(url) => RepostRequest::new(url, args.source)?,
        None if interactive => ui::prompt_request(args.source)?,
        None => bail!("No video URL provided"),
    };
    // Flags given on the command line win over prompted answers.
    if args.caption.is_some() {
        request = request.with_caption(args.caption.clone());
    }
    if args.hashtags.is_some() {
        request = request.with_hashtags(args.hashtags.clone());
    }
    if args.no_hashtags {
        request = request.include_hashtags(false);
    }

    let username = match config.username.clone() {
        Some(username) => username,
        None if interactive => ui::prompt_username()?,
        None => return Err(RepostError::MissingConfig("INSTAGRAM_USERNAME").into()),
    };
    if username.is_empty() {
        return Err(RepostError::MissingConfig("INSTAGRAM_USERNAME").into());
    }

    let codes: Option<Box<dyn AuthCodeSource>> = if interactive {
        Some(Box::new(ui::TerminalPrompt))
    } else {
        None
    };
    let mut instagram = GraphInstagram::new(config.clone(), username, codes)?;
    let downloader = YtDlp::new(config.ytdlp_path.clone());

    let mut reposter = Reposter::new(&downloader, &mut instagram, config.download_dir.clone());
    Ok(reposter.run(&request, status))
}
