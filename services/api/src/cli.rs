use crate::demo::{run_demo, DemoArgs};
use crate::server;
use chrono::{Local, NaiveDate};
use citizenship_intake::error::AppError;
use citizenship_intake::workflows::intake::calendar::{self, BsDate};
use citizenship_intake::workflows::intake::age_in_years;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "citizenship-intake",
    about = "Serve and exercise the citizenship application intake form",
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
    /// Convert a date between the Gregorian and Bikram-Sambat calendars
    Convert {
        #[command(subcommand)]
        command: ConvertCommand,
    },
    /// Print an applicant's age in whole years
    Age(AgeArgs),
    /// Walk a sample applicant through both form steps
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum ConvertCommand {
    /// Gregorian (YYYY-MM-DD) to Bikram-Sambat
    ToBs { date: String },
    /// Bikram-Sambat (YYYY-MM-DD) to Gregorian
    ToAd { date: String },
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

#[derive(Args, Debug)]
pub(crate) struct AgeArgs {
    /// Gregorian date of birth (YYYY-MM-DD)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) dob: NaiveDate,
    /// Evaluate the age on this date instead of today
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Convert { command } => run_convert(command),
        Command::Age(args) => run_age(args),
        Command::Demo(args) => run_demo(args).await,
    }
}

fn run_convert(command: ConvertCommand) -> Result<(), AppError> {
    match command {
        ConvertCommand::ToBs { date } => {
            let ad = calendar::parse_ad(&date)?;
            println!("{ad} AD = {} BS", calendar::to_bs(ad)?);
        }
        ConvertCommand::ToAd { date } => {
            let bs: BsDate = date.parse()?;
            println!("{bs} BS = {} AD", calendar::to_ad(bs)?);
        }
    }
    Ok(())
}

fn run_age(args: AgeArgs) -> Result<(), AppError> {
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    let age = age_in_years(args.dob, today);
    match calendar::to_bs(args.dob) {
        Ok(bs) => println!("Born {} ({bs} BS): {age} years old on {today}", args.dob),
        Err(_) => println!("Born {}: {age} years old on {today}", args.dob),
    }
    Ok(())
}
