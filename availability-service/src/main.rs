mod api;
mod client;
mod config;
mod handlers;
#[cfg(test)]
mod testing;
mod when;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use shared::RowErrorPolicy;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, Level};

use crate::client::WidgetClient;
use crate::config::WidgetConfig;
use crate::handlers::CommandHandler;

const MAX_DAYS: u64 = 31;

#[derive(Parser)]
#[command(name = "availability-service", about = "Climbing gym reservation availability")]
struct Args {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Drop rows whose time range cannot be read instead of failing the whole day
    #[arg(long, global = true)]
    skip_unparsable: bool,

    #[command(flatten)]
    widget: WidgetConfig,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List every slot on a day, e.g. `day next friday`
    Day {
        #[arg(required = true, num_args = 1..)]
        when: Vec<String>,

        /// Number of consecutive days to list
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..=MAX_DAYS))]
        days: u64,

        #[arg(long)]
        json: bool,
    },
    /// Show the slot(s) covering a point in time, e.g. `at tomorrow 9:30 am`.
    /// Exits 0 if one is available, 1 if none is, 2 if no slot covers it.
    At {
        /// Day followed by time of day
        #[arg(required = true, num_args = 2..)]
        when: Vec<String>,

        #[arg(long)]
        json: bool,
    },
    /// Serve availability as JSON over HTTP
    Serve {
        #[arg(long, env = "PORT", default_value = "3001")]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let level = match (&args.command, args.debug) {
        (_, true) => Level::DEBUG,
        (Command::Serve { .. }, false) => Level::INFO,
        _ => Level::WARN,
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let policy = if args.skip_unparsable {
        RowErrorPolicy::Skip
    } else {
        RowErrorPolicy::Abort
    };
    let client = WidgetClient::new(args.widget)?;
    let today = Local::now().date_naive();

    match args.command {
        Command::Day { when, days, json } => {
            let date = when::resolve_date(&when.join(" "), today)?;
            CommandHandler::new(client, policy, json)
                .scan_days(date, days)
                .await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::At { when, json } => {
            let instant = when::resolve_instant(&when, today)?;
            let outcome = CommandHandler::new(client, policy, json)
                .lookup(instant)
                .await?;
            Ok(outcome.exit_code())
        }
        Command::Serve { port } => {
            let app = api::create_router(api::AppState {
                client: Arc::new(client),
                policy,
            });
            let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
                .await
                .with_context(|| format!("binding port {}", port))?;

            info!("Availability service ready at http://0.0.0.0:{}/availability", port);

            axum::serve(listener, app).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("availability-service").chain(args.iter().copied()))
    }

    #[test]
    fn test_flags_after_subcommand() {
        let args = parse(&["day", "tomorrow", "--skip-unparsable", "--debug"]).unwrap();
        assert!(args.skip_unparsable);
        assert!(args.debug);

        let args = parse(&["--skip-unparsable", "at", "tomorrow", "9am"]).unwrap();
        assert!(args.skip_unparsable);
    }

    #[test]
    fn test_day_takes_multi_word_date() {
        let args = parse(&["day", "next", "friday", "--days", "3", "--json"]).unwrap();
        match args.command {
            Command::Day { when, days, json } => {
                assert_eq!(when, vec!["next", "friday"]);
                assert_eq!(days, 3);
                assert!(json);
            }
            _ => panic!("expected day"),
        }
    }

    #[test]
    fn test_days_is_bounded() {
        assert!(parse(&["day", "today", "--days", "31"]).is_ok());
        assert!(parse(&["day", "today", "--days", "0"]).is_err());
        assert!(parse(&["day", "today", "--days", "365"]).is_err());
    }

    #[test]
    fn test_at_resolves_date_then_time() {
        let today = chrono::NaiveDate::from_ymd_opt(2021, 3, 17).unwrap();
        let expected = today
            .succ_opt()
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();

        for argv in [
            &["at", "tomorrow", "9:30am"][..],
            &["at", "tomorrow", "9:30", "AM"][..],
            &["at", "9:30", "AM", "tomorrow"][..],
        ] {
            let Command::At { when, .. } = parse(argv).unwrap().command else {
                panic!("expected at");
            };
            assert_eq!(when::resolve_instant(&when, today).unwrap(), expected, "{:?}", argv);
        }
    }

    #[test]
    fn test_at_needs_date_and_time() {
        assert!(parse(&["at", "tomorrow"]).is_err());
    }
}
