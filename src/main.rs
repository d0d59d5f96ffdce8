use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};
use regplan::core::{
    PlanType, Price, default_plan, generate_display, parse_date, parse_price, summarize,
    validate_start_date,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliPlanType {
    FullPayment,
    FourInstallments,
    DepositInstallments,
}

impl From<CliPlanType> for PlanType {
    fn from(value: CliPlanType) -> Self {
        match value {
            CliPlanType::FullPayment => PlanType::FullPayment,
            CliPlanType::FourInstallments => PlanType::FourInstallments,
            CliPlanType::DepositInstallments => PlanType::DepositInstallments,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "regplan",
    version,
    about = "Installment plans for paid registrations"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the JSON API
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
        #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
        bind: IpAddr,
    },
    /// Print the installment due dates for a start date
    Schedule {
        #[arg(long)]
        start_date: String,
        #[arg(long, default_value_t = 4)]
        count: usize,
    },
    /// Print a default plan with amounts as JSON
    Plan {
        #[arg(long, value_enum, default_value_t = CliPlanType::FourInstallments)]
        plan_type: CliPlanType,
        #[arg(long)]
        start_date: Option<String>,
        #[arg(long, default_value = "0")]
        price: String,
        #[arg(long)]
        free: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("regplan=info")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Command::Serve { port, bind } => {
            regplan::api::run_http_server(SocketAddr::new(bind, port)).await?;
        }
        Command::Schedule { start_date, count } => {
            for (i, date) in generate_display(&start_date, count).iter().enumerate() {
                println!("Payment {}: {}", i + 1, date);
            }
        }
        Command::Plan {
            plan_type,
            start_date,
            price,
            free,
        } => {
            let plan_type = PlanType::from(plan_type);
            let today = Local::now().date_naive();
            let start_date = start_date.as_deref().and_then(parse_date);
            let anchor = match plan_type {
                PlanType::FullPayment => start_date,
                _ => start_date.filter(|_| validate_start_date(start_date, today).valid),
            };
            let price = if free {
                Price::Free
            } else {
                Price::Amount(parse_price(&price))
            };
            let summary = summarize(&default_plan(plan_type, anchor), price);
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }
    Ok(())
}
