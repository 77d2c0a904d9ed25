//! nutrigate command-line front end
//!
//! Runs single analyses against the configured providers and prints the
//! result as JSON.

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use nutrigate::{
    Accuracy, AnalysisRequest, BuildInfo, Config, FoodItem, HealthProfile, HealthRecord, Language,
    Orchestrator, Secrets, SelectionCriteria, Urgency,
};

/// Nutrigate CLI
#[derive(Parser)]
#[command(name = "nutrigate")]
#[command(version = nutrigate::PKG_VERSION)]
#[command(about = "Nutrition and health analysis across AI providers")]
struct Args {
    /// Config file (default: ~/.nutrigate/config.toml, then /etc/nutrigate/config.toml)
    #[arg(short, long, env = "NUTRIGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Requester identifier used for cost accounting and cache scoping
    #[arg(short, long, env = "NUTRIGATE_REQUESTER", default_value = "cli")]
    requester: String,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Recognise foods in a meal description
    Food {
        /// Meal description (or omit to read from stdin)
        text: Option<String>,
        /// Language of the description
        #[arg(short, long)]
        language: Option<LanguageArg>,
        /// Prefer fast providers
        #[arg(long)]
        urgent: bool,
    },

    /// Compute the dietary inflammatory index of a list of foods
    Dii {
        /// Food names, optionally with grams as `name:grams`
        #[arg(required = true)]
        items: Vec<String>,
    },

    /// Assess health risk from a JSON health profile
    Health {
        /// JSON profile (or omit to read from stdin)
        profile: Option<String>,
    },

    /// Detect risk signals in a JSON array of health records
    Risk {
        /// JSON records (or omit to read from stdin)
        records: Option<String>,
    },

    /// Probe every configured provider
    Probe,

    /// Print the resolved configuration summary
    Providers,

    /// Print build metadata as JSON
    Version,
}

#[derive(Clone, Copy, ValueEnum)]
enum LanguageArg {
    English,
    Japanese,
    Chinese,
    Korean,
    Other,
}

impl From<LanguageArg> for Language {
    fn from(arg: LanguageArg) -> Self {
        match arg {
            LanguageArg::English => Language::English,
            LanguageArg::Japanese => Language::Japanese,
            LanguageArg::Chinese => Language::Chinese,
            LanguageArg::Korean => Language::Korean,
            LanguageArg::Other => Language::Other,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing (default: warn for CLI; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    if let Command::Version = args.command {
        print_json(&BuildInfo::current(), args.pretty)?;
        return Ok(());
    }

    let config = Config::load(args.config.as_deref())?;
    let secrets = Secrets::load()?;
    let orchestrator = config.builder(&secrets).build()?;

    let request = match args.command {
        Command::Food {
            text,
            language,
            urgent,
        } => {
            let text = resolve_text(text, "food")?;
            let mut criteria = SelectionCriteria::new();
            if let Some(language) = language {
                criteria = criteria.language(language.into());
            }
            if urgent {
                criteria = criteria.urgency(Urgency::High);
            }
            AnalysisRequest::food(text, &args.requester).criteria(criteria)
        }

        Command::Dii { items } => {
            let items = items
                .iter()
                .map(|raw| parse_food_item(raw))
                .collect::<Result<Vec<_>, _>>()?;
            AnalysisRequest::dii(items, &args.requester)
        }

        Command::Health { profile } => {
            let profile: HealthProfile = serde_json::from_str(&resolve_text(profile, "health")?)?;
            AnalysisRequest::health(profile, &args.requester)
                .criteria(SelectionCriteria::new().accuracy(Accuracy::High))
        }

        Command::Risk { records } => {
            let records: Vec<HealthRecord> =
                serde_json::from_str(&resolve_text(records, "risk")?)?;
            AnalysisRequest::risk(records, &args.requester)
        }

        Command::Probe => {
            let mut results: Vec<_> = orchestrator.probe_providers().await.into_iter().collect();
            results.sort();
            for (provider, healthy) in results {
                let status = if healthy { "healthy" } else { "unhealthy" };
                println!("{provider}: {status}");
            }
            return Ok(());
        }

        Command::Providers => {
            print_providers(&orchestrator, &config);
            return Ok(());
        }

        Command::Version => return print_json(&BuildInfo::current(), args.pretty),
    };

    let result = orchestrator.analyze(request).await?;
    print_json(&result, args.pretty)
}

fn print_json<T: serde::Serialize>(
    value: &T,
    pretty: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{json}");
    Ok(())
}

/// Parse `name` or `name:grams`.
fn parse_food_item(raw: &str) -> Result<FoodItem, Box<dyn std::error::Error>> {
    match raw.rsplit_once(':') {
        Some((name, grams)) if !name.trim().is_empty() => {
            let grams: f64 = grams
                .trim()
                .parse()
                .map_err(|_| format!("dii: invalid amount in {raw:?}"))?;
            Ok(FoodItem::new(name.trim()).amount_g(grams))
        }
        _ => Ok(FoodItem::new(raw.trim())),
    }
}

/// Resolve text input from an optional CLI argument and/or stdin.
///
/// - arg only → arg
/// - stdin only → stdin
/// - both → `"{arg}\n\n{stdin}"`
/// - neither → error
fn resolve_text(arg: Option<String>, command: &str) -> Result<String, Box<dyn std::error::Error>> {
    let stdin_is_pipe = !io::stdin().is_terminal();
    let stdin_text = if stdin_is_pipe {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        let trimmed = buf.trim().to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    } else {
        None
    };

    match (arg, stdin_text) {
        (Some(a), Some(s)) => Ok(format!("{a}\n\n{s}")),
        (Some(a), None) => Ok(a),
        (None, Some(s)) => Ok(s),
        (None, None) => {
            Err(format!("{command}: no input provided (pass it as argument or via stdin)").into())
        }
    }
}

fn print_providers(orchestrator: &Orchestrator, config: &Config) {
    println!("nutrigate {}", nutrigate::version_string());
    for provider in orchestrator.router().providers() {
        if let Some(profile) = orchestrator.router().profile(provider) {
            println!(
                "{provider}: ${:.4}/call, timeout {}ms, {:?} accuracy",
                profile.cost_per_call_usd,
                profile.timeout_ms(),
                profile.accuracy
            );
        }
    }
    println!(
        "budget: ${:.2}/day, ${:.2}/month",
        config.budget.daily_limit_usd, config.budget.monthly_limit_usd
    );
}
