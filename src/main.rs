use clap::Parser;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};
use weld_verifier::catalog::Catalog;
use weld_verifier::config::{AnalysisConfig, ErrorPolicy};
use weld_verifier::ir::ProgramProvider;
use weld_verifier::verifier::verify_class;

#[derive(Parser)]
#[command(name = "weld-verifier")]
#[command(about = "Check that robots only weld inside their construction range", long_about = None)]
struct Cli {
    /// Class to analyze
    class: String,
    /// Merges at a loop header before switching from join to widening
    #[arg(long)]
    widening_threshold: Option<usize>,
    /// Cap on point visits per method
    #[arg(long)]
    max_iterations: Option<usize>,
    /// Fail verdicts on internal analysis errors
    #[arg(long)]
    strict: bool,
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn config(&self) -> AnalysisConfig {
        let mut config = AnalysisConfig::default();
        if let Some(threshold) = self.widening_threshold {
            config = config.with_widening_threshold(threshold);
        }
        if let Some(max) = self.max_iterations {
            config = config.with_max_iterations(max);
        }
        if self.strict {
            config = config.with_error_policy(ErrorPolicy::Strict);
        }
        config
    }

    fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    TermLogger::init(cli.log_level(), Config::default(), TerminalMode::Mixed, ColorChoice::Auto)?;

    let catalog = Catalog::builtin();
    let class = catalog.load_class(&cli.class).ok_or_else(|| {
        eyre!(
            "unknown class `{}` (available: {})",
            cli.class,
            catalog.class_names().join(", ")
        )
    })?;

    let config = cli.config();
    log::debug!("Analyzing {} with {:?}", class.name, config);
    let report = verify_class(&class, &config);
    println!("{}", report);

    Ok(())
}
