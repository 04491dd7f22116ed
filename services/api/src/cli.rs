use crate::demo::{run_demo, run_report_summary, DemoArgs, ReportSummaryArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use consultancy::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Consultancy Back Office",
    about = "Run the consultancy back office or inspect its figures from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Print reporting figures from a store snapshot
    Report {
        #[command(subcommand)]
        command: ReportCommand,
    },
    /// Seed an in-memory store with sample data and walk the main workflows
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum ReportCommand {
    /// Dashboard summary: students, COE counts, income, and payments
    Summary(ReportSummaryArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Report {
            command: ReportCommand::Summary(args),
        } => run_report_summary(args),
        Command::Demo(args) => run_demo(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["consultancy-api"]).expect("parses");
        assert!(cli.command.is_none());

        let cli = Cli::try_parse_from(["consultancy-api", "serve", "--port", "8080"])
            .expect("parses");
        match cli.command {
            Some(Command::Serve(args)) => assert_eq!(args.port, Some(8080)),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn report_summary_parses_dates_and_rates() {
        let cli = Cli::try_parse_from([
            "consultancy-api",
            "report",
            "summary",
            "--from",
            "2025-07-01",
            "--coe-received-income",
            "12000",
        ])
        .expect("parses");
        match cli.command {
            Some(Command::Report {
                command: ReportCommand::Summary(args),
            }) => {
                assert_eq!(
                    args.from.map(|date| date.to_string()).as_deref(),
                    Some("2025-07-01")
                );
                assert_eq!(args.coe_received_income, Some(12000));
                assert!(args.to.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }

        assert!(
            Cli::try_parse_from(["consultancy-api", "report", "summary", "--from", "July"])
                .is_err()
        );
    }
}
