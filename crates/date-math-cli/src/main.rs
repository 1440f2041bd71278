use anyhow::Context as _;
use clap::Parser;
use cmds::{Cmd, Context};

mod cmds;

/// Date-interval arithmetic and non-business-day counting.
#[derive(Debug, Parser)]
#[command(name = "datemath", version, about)]
struct Cli {
    /// IANA timezone used for calendar days and local times.
    #[arg(long, global = true, default_value = "UTC")]
    tz: String,

    /// Fixed "now" as an RFC 3339 datetime (default: system clock).
    #[arg(long, global = true)]
    now: Option<String>,

    /// Print a JSON object instead of the bare result.
    #[arg(long, global = true)]
    json: bool,

    /// Log debug details to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: cmds::Commands,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
    log::debug!("{:?}", cli);

    let anchor = cli
        .now
        .as_deref()
        .map(|s| {
            chrono::DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&chrono::Utc))
                .with_context(|| format!("--now must be an RFC 3339 datetime, got '{s}'"))
        })
        .transpose()?;

    let ctx = Context::new(&cli.tz, anchor, cli.json)?;
    cli.command.run(&ctx)
}
