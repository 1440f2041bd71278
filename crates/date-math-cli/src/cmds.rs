use std::path::PathBuf;

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use date_math::{
    normalize_db_interval, weekday_from_index, BusinessCalendar, ChronoTimeSource, DateMath,
};
use serde_json::json;

// -----------------------------------------------------------------------------
// Context
// -----------------------------------------------------------------------------
pub struct Context {
    math: DateMath<ChronoTimeSource>,
    json: bool,
}

impl Context {
    pub fn new(tz: &str, anchor: Option<DateTime<Utc>>, json: bool) -> anyhow::Result<Self> {
        let source = ChronoTimeSource::from_timezone_name(tz, anchor)?;
        Ok(Self {
            math: DateMath::new(source),
            json,
        })
    }

    fn emit(&self, value: serde_json::Value, plain: impl std::fmt::Display) -> anyhow::Result<()> {
        if self.json {
            println!("{}", serde_json::to_string(&value)?);
        } else {
            println!("{plain}");
        }
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Cmd
// -----------------------------------------------------------------------------
pub trait Cmd {
    fn run(&self, ctx: &Context) -> anyhow::Result<()>;
}

// -----------------------------------------------------------------------------
// Commands
// -----------------------------------------------------------------------------
#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// Seconds spanned by an interval expression ("5 hours 6 minutes").
    IntervalSeconds(IntervalArgs),
    /// Whole days spanned by an interval expression, floored.
    IntervalDays(IntervalArgs),
    /// Rewrite H:MM:SS clock text as explicit hours/minutes/seconds.
    NormalizeInterval(NormalizeArgs),
    /// Whole days from 00:00 on FROM (default today) to 00:00 on TO.
    DaysUntil(DaysUntilArgs),
    /// Non-business days after FROM (default 12:00 today) up to and including TO.
    NonBusinessDays(NonBusinessDaysArgs),
}

impl Cmd for Commands {
    fn run(&self, ctx: &Context) -> anyhow::Result<()> {
        match self {
            Commands::IntervalSeconds(args) => {
                let interval = args.interval_text();
                let seconds = ctx.math.interval_to_seconds(&interval)?;
                ctx.emit(json!({ "interval": interval, "seconds": seconds }), seconds)
            }
            Commands::IntervalDays(args) => {
                let interval = args.interval_text();
                let days = ctx.math.interval_to_days(&interval)?;
                ctx.emit(json!({ "interval": interval, "days": days }), days)
            }
            Commands::NormalizeInterval(args) => args.run(ctx),
            Commands::DaysUntil(args) => args.run(ctx),
            Commands::NonBusinessDays(args) => args.run(ctx),
        }
    }
}

// -----------------------------------------------------------------------------
// IntervalArgs
// -----------------------------------------------------------------------------
#[derive(Debug, clap::Args)]
pub struct IntervalArgs {
    /// Interval expression.
    #[arg(allow_hyphen_values = true)]
    interval: String,

    /// Normalize database H:MM:SS clock text before parsing.
    #[arg(long)]
    db: bool,
}

impl IntervalArgs {
    fn interval_text(&self) -> String {
        if self.db {
            normalize_db_interval(&self.interval)
        } else {
            self.interval.clone()
        }
    }
}

// -----------------------------------------------------------------------------
// NormalizeArgs
// -----------------------------------------------------------------------------
#[derive(Debug, clap::Args)]
pub struct NormalizeArgs {
    /// Interval text as returned by the database.
    #[arg(allow_hyphen_values = true)]
    interval: String,
}

impl Cmd for NormalizeArgs {
    fn run(&self, ctx: &Context) -> anyhow::Result<()> {
        let normalized = normalize_db_interval(&self.interval);
        ctx.emit(
            json!({ "interval": self.interval, "normalized": normalized }),
            &normalized,
        )
    }
}

// -----------------------------------------------------------------------------
// DaysUntilArgs
// -----------------------------------------------------------------------------
#[derive(Debug, clap::Args)]
pub struct DaysUntilArgs {
    /// End date expression.
    #[arg(allow_hyphen_values = true)]
    to: String,

    /// Start date expression (default: today).
    #[arg(long, allow_hyphen_values = true)]
    from: Option<String>,
}

impl Cmd for DaysUntilArgs {
    fn run(&self, ctx: &Context) -> anyhow::Result<()> {
        let days = ctx.math.days_until_date(&self.to, self.from.as_deref())?;
        ctx.emit(
            json!({ "from": self.from, "to": self.to, "days": days }),
            days,
        )
    }
}

// -----------------------------------------------------------------------------
// NonBusinessDaysArgs
// -----------------------------------------------------------------------------
#[derive(Debug, clap::Args)]
pub struct NonBusinessDaysArgs {
    /// End date expression (inclusive).
    #[arg(allow_hyphen_values = true)]
    to: String,

    /// Start date expression (exclusive, default: 12:00 today).
    #[arg(long, allow_hyphen_values = true)]
    from: Option<String>,

    /// Non-business weekday, 0 = Sunday … 6 = Saturday. Repeatable; replaces
    /// the calendar's weekdays.
    #[arg(long = "weekday", value_parser = clap::value_parser!(u8).range(0..=6))]
    weekdays: Vec<u8>,

    /// Holiday date expression. Repeatable; added to the calendar's dates.
    #[arg(long = "holiday")]
    holidays: Vec<String>,

    /// JSON calendar file with `non_business_weekdays` and `non_business_dates`.
    #[arg(long)]
    calendar: Option<PathBuf>,
}

impl NonBusinessDaysArgs {
    fn business_calendar(&self) -> anyhow::Result<BusinessCalendar> {
        let mut calendar = match &self.calendar {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading calendar {}", path.display()))?;
                BusinessCalendar::from_json(&text)
                    .with_context(|| format!("parsing calendar {}", path.display()))?
            }
            None => BusinessCalendar::default(),
        };

        if !self.weekdays.is_empty() {
            calendar.non_business_weekdays = self
                .weekdays
                .iter()
                .map(|i| weekday_from_index(*i))
                .collect::<Result<_, _>>()?;
        }
        calendar
            .non_business_dates
            .extend(self.holidays.iter().cloned());
        log::debug!("calendar: {:?}", calendar);
        Ok(calendar)
    }
}

impl Cmd for NonBusinessDaysArgs {
    fn run(&self, ctx: &Context) -> anyhow::Result<()> {
        let calendar = self.business_calendar()?;
        let days = ctx
            .math
            .non_business_days(&self.to, self.from.as_deref(), &calendar)?;
        ctx.emit(
            json!({
                "from": self.from,
                "to": self.to,
                "calendar": calendar,
                "non_business_days": days,
            }),
            days,
        )
    }
}
