use adpilot_core::ads::sandbox::RecordedCall;
use adpilot_core::ads::{AdAccount, GraphApiAccount, SandboxAdAccount};
use adpilot_core::campaign::{credentials_message, CampaignRunner, ImageSource, GENERATED_IMAGE_STEM};
use adpilot_core::config::{AdpilotConfig, ConfigLoader};
use adpilot_core::prompt::{build_instruction, fact_sheet, CampaignBrief};
use adpilot_core::tools::ToolFactory;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::LevelFilter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[clap(name = "adpilot", author, version, about = "Create Meta ad campaigns from a campaign brief")]
struct Cli {
    #[clap(subcommand)]
    command: Commands,

    #[clap(long, short, default_value = "adpilot.yaml", help = "Configuration file")]
    config: PathBuf,

    #[clap(long, short, help = "Log level; overrides logging.level from the configuration")]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the agent and print the Markdown report
    Run {
        #[clap(long, short, help = "Campaign brief (YAML)")]
        brief: PathBuf,

        #[clap(long, short, help = "Ad image to upload; generated from the brief when omitted")]
        image: Option<PathBuf>,

        #[clap(long, help = "Use an in-process sandbox account instead of the Graph API")]
        dry_run: bool,
    },
    /// Print the instruction the agent would receive
    Prompt {
        #[clap(long, short, help = "Campaign brief (YAML)")]
        brief: PathBuf,

        #[clap(long, short, help = "Image path to reference in the instruction")]
        image: Option<PathBuf>,

        #[clap(long, help = "Print the structured fact sheet as YAML instead")]
        fact_sheet: bool,
    },
    /// List the tools offered to the model
    Tools,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::from_file_or_default(&cli.config)
        .await
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;

    let level = cli.log_level.as_deref().unwrap_or(&config.logging.level);
    let log_level_filter = level.parse().unwrap_or(LevelFilter::Info);
    init_logging(
        log_level_filter,
        matches!(cli.command, Commands::Run { .. }),
        config.logging.file.as_deref(),
    )?;
    log::info!("Configuration loaded from {}", cli.config.display());

    match cli.command {
        Commands::Run {
            brief,
            image,
            dry_run,
        } => run_campaign(&config, &brief, image, dry_run).await,
        Commands::Prompt {
            brief,
            image,
            fact_sheet,
        } => print_prompt(&config, &brief, image, fact_sheet).await,
        Commands::Tools => print_tools(&config),
    }
}

/// `run` logs to a file so stdout carries only the report.
fn init_logging(level: LevelFilter, to_file: bool, file: Option<&Path>) -> Result<()> {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);

    if let (true, Some(path)) = (to_file, file) {
        let log_file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("opening log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(log_file)));
    }

    builder.init();
    Ok(())
}

async fn load_brief(path: &Path) -> Result<CampaignBrief> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading brief {}", path.display()))?;
    serde_yaml::from_str(&content).with_context(|| format!("parsing brief {}", path.display()))
}

async fn run_campaign(
    config: &AdpilotConfig,
    brief_path: &Path,
    image: Option<PathBuf>,
    dry_run: bool,
) -> Result<()> {
    let brief = load_brief(brief_path).await?;

    let sandbox = dry_run.then(|| Arc::new(SandboxAdAccount::new()));
    let account: Arc<dyn AdAccount> = match &sandbox {
        Some(sandbox) => {
            log::info!("Dry run: using the sandbox ad account");
            sandbox.clone()
        }
        None => match GraphApiAccount::from_config(&config.meta) {
            Ok(account) => Arc::new(account),
            Err(e) if e.is_ads_error() => {
                println!("{}", credentials_message(&e));
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        },
    };

    let cancellation = CancellationToken::new();
    let ctrl_c = cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, cancelling the run");
            ctrl_c.cancel();
        }
    });

    let runner = CampaignRunner::from_config(config, account)?
        .with_cancellation(cancellation)
        .with_progress_logging(true);
    let source = image.map(ImageSource::Uploaded).unwrap_or(ImageSource::Generate);

    let report = runner.run(&brief, &source).await?;
    println!("{}", report);

    if let Some(sandbox) = sandbox {
        print_recorded_calls(&sandbox.calls())?;
    }
    Ok(())
}

fn print_recorded_calls(calls: &[RecordedCall]) -> Result<()> {
    println!("\n### Sandbox requests\n");
    println!("```json\n{}\n```", serde_json::to_string_pretty(calls)?);
    Ok(())
}

async fn print_prompt(
    config: &AdpilotConfig,
    brief_path: &Path,
    image: Option<PathBuf>,
    as_fact_sheet: bool,
) -> Result<()> {
    let brief = load_brief(brief_path).await?;
    let image_path = image.unwrap_or_else(|| {
        config
            .image
            .output_dir
            .join(format!("{}.png", GENERATED_IMAGE_STEM))
    });

    if as_fact_sheet {
        print!("{}", serde_yaml::to_string(&fact_sheet(&brief, &image_path))?);
    } else {
        println!("{}", build_instruction(&brief, &image_path));
    }
    Ok(())
}

fn print_tools(config: &AdpilotConfig) -> Result<()> {
    let registry = ToolFactory::create_campaign_registry(
        Arc::new(SandboxAdAccount::new()),
        &config.meta.defaults,
        ToolFactory::create_web_search(&config.tools.web_search),
    )?;

    for tool in registry.list_tools() {
        println!("{}\n    {}", tool.name, tool.description);
        println!("    {}", serde_json::to_string(&tool.input_schema)?);
    }
    Ok(())
}
