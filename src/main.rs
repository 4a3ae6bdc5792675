use anyhow::{Context, Result};
use pipeline_loader::cli::commands::{DispatchCommand, FmtCommand, PlanCommand, ValidateCommand};
use pipeline_loader::cli::output::*;
use pipeline_loader::cli::{Cli, Command};
use pipeline_loader::core::{LoadErrors, Pipeline, PipelineLoader};
use pipeline_loader::execution::{DispatchEvent, DispatchRequest, Dispatcher, JsonLinesExecutor};
use tracing::{debug, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Environment variable holding a `tracing` filter directive
const LOG_ENV: &str = "PIPELINE_LOADER_LOG";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(log_level.as_str()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    let loader = PipelineLoader::new(cli.loader_options());

    match &cli.command {
        Command::Validate(cmd) => validate_pipeline(&loader, cmd)?,
        Command::Plan(cmd) => plan_pipeline(&loader, cmd)?,
        Command::Dispatch(cmd) => dispatch_pipeline(&loader, cmd).await?,
        Command::Fmt(cmd) => format_pipeline(&loader, cmd)?,
    }

    Ok(())
}

/// Load a pipeline, printing every load error and exiting on failure
fn load_or_exit(loader: &PipelineLoader, file: &str) -> Result<Pipeline> {
    match loader.load_file(file) {
        Ok(pipeline) => Ok(pipeline),
        Err(e) => match e.downcast_ref::<LoadErrors>() {
            Some(errors) => {
                eprintln!(
                    "{} {} has {} error(s):",
                    CROSS,
                    style(file).bold(),
                    style(errors.len()).red()
                );
                eprintln!("{}", format_load_errors(errors));
                std::process::exit(1);
            }
            None => Err(e).context("Failed to load pipeline"),
        },
    }
}

fn validate_pipeline(loader: &PipelineLoader, cmd: &ValidateCommand) -> Result<()> {
    eprintln!("{} Validating pipeline...", INFO);
    let pipeline = load_or_exit(loader, &cmd.file)?;

    eprintln!("{} Pipeline definition is valid!", CHECK);
    eprintln!("  Steps: {}", style(pipeline.len()).cyan());

    if cmd.json {
        let json = serde_json::to_string_pretty(pipeline.steps())?;
        println!("{}", json);
    }
    Ok(())
}

fn plan_pipeline(loader: &PipelineLoader, cmd: &PlanCommand) -> Result<()> {
    let pipeline = load_or_exit(loader, &cmd.file)?;
    let requests = DispatchRequest::for_pipeline(&pipeline);

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&requests)?);
    } else {
        println!("{} {} step(s) to dispatch:", INFO, style(requests.len()).cyan());
        for request in &requests {
            println!("{}", format_request(request));
        }
    }
    Ok(())
}

async fn dispatch_pipeline(loader: &PipelineLoader, cmd: &DispatchCommand) -> Result<()> {
    let pipeline = load_or_exit(loader, &cmd.file)?;

    let progress = create_progress_bar(pipeline.len());
    let mut dispatcher = Dispatcher::new(JsonLinesExecutor::stdout(), cmd.scheduling_strategy());

    let bar = progress.clone();
    dispatcher.add_event_handler(move |event| {
        if bar.is_hidden() {
            eprintln!("{}", format_dispatch_event(&event));
        } else {
            bar.println(format_dispatch_event(&event));
        }
        if matches!(
            event,
            DispatchEvent::RequestDispatched { .. } | DispatchEvent::RequestFailed { .. }
        ) {
            bar.inc(1);
        }
    });

    let report = dispatcher.dispatch_pipeline(&pipeline).await;
    progress.finish_and_clear();
    debug!(run_id = %report.run_id, "dispatch report ready");

    if !report.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

fn format_pipeline(loader: &PipelineLoader, cmd: &FmtCommand) -> Result<()> {
    let pipeline = load_or_exit(loader, &cmd.file)?;
    let yaml = pipeline
        .to_yaml(&loader.options().container_plugin)
        .context("Failed to serialize pipeline")?;
    print!("{}", yaml);
    Ok(())
}
