use charge_sim::config::{self, Command, FormatArg};
use charge_sim::engine;
use charge_sim::error::Result;
use charge_sim::logging;
use charge_sim::output::{
    self, CsvFormatter, Formatter, HumanFormatter, JsonFormatter, SummaryFormatter,
};

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = config::parse_args()?;
    logging::init_logging(&cli.log_level);

    match cli.command {
        Command::Run(args) => {
            let config = config::build_config(&args.config)?;
            let report = engine::run_simulation(&config)?;
            let formatter = formatter_for(&args.format);
            print!("{}", formatter.write(&report));
        }
        Command::ShowConfig(args) => {
            let config = config::build_config(&args)?;
            print!("{}", config::describe_config(&config));
        }
        Command::Replicate(args) => {
            let config = config::build_config(&args.config)?;
            let seeds = engine::replication_seeds(config.seed.unwrap_or(1), args.replications)?;
            let report = engine::run_replications(&config, &seeds)?;
            print!("{}", output::write_replications(&report));
        }
    }

    Ok(())
}

fn formatter_for(format: &FormatArg) -> Box<dyn Formatter> {
    match format {
        FormatArg::Human => Box::new(HumanFormatter),
        FormatArg::Summary => Box::new(SummaryFormatter),
        FormatArg::Json => Box::new(JsonFormatter),
        FormatArg::Csv => Box::new(CsvFormatter),
    }
}
