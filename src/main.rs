use clap::Parser;
use gbe_invoker::{
    Invocation, InvocationContext, InvocationId, Invoker, InvokerError, JobQueue, JobRegistry,
    JobRequest, JobResult, MemoryMonitor, MemoryQueue, Monitor, Parameters, ServiceConfig,
};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gbe-invoker", about = "Invoke one job by type with string parameters")]
struct Cli {
    /// Registered job type (e.g. shell, http, enqueue, report)
    #[arg(long)]
    job_type: String,

    /// Job name; defaults to the job type
    #[arg(long)]
    job_name: Option<String>,

    /// Parameter as key=value (repeatable)
    #[arg(long = "param", value_name = "KEY=VALUE")]
    params: Vec<String>,

    /// Path to YAML service configuration
    #[arg(long, env = "GBE_INVOKER_CONFIG")]
    config: Option<PathBuf>,

    /// Log level when RUST_LOG is unset; overrides the configuration
    #[arg(long)]
    log_level: Option<String>,

    /// Drain and invoke follow-up requests enqueued by jobs
    #[arg(long)]
    follow: bool,
}

/// One line of stdout per invocation.
#[derive(Serialize)]
struct Outcome<'a> {
    invocation_id: InvocationId,
    job_type: &'a str,
    job_name: &'a str,
    #[serde(flatten)]
    result: &'a JobResult,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("gbe-invoker: {e}");
            return ExitCode::from(2);
        }
    };
    if let Err(e) = init_tracing(&config) {
        eprintln!("gbe-invoker: {e}");
        return ExitCode::from(2);
    }

    match run(cli, config).await {
        Ok(true) => ExitCode::from(0),
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            error!(error = %e, "invoker error");
            ExitCode::from(2)
        }
    }
}

fn load_config(cli: &Cli) -> Result<ServiceConfig, InvokerError> {
    let mut config = match &cli.config {
        Some(path) => ServiceConfig::from_yaml_file(path)?,
        None => ServiceConfig::default(),
    }
    .with_env_overrides()?;
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    Ok(config)
}

fn init_tracing(config: &ServiceConfig) -> Result<(), InvokerError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| InvokerError::Logging(e.to_string()))?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let installed = if config.log_json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| InvokerError::Logging(e.to_string()))
}

/// Returns whether every invocation completed.
async fn run(cli: Cli, config: ServiceConfig) -> Result<bool, InvokerError> {
    let params = Parameters::from_pairs(&cli.params)?;
    let job_name = cli.job_name.unwrap_or_else(|| cli.job_type.clone());
    let request = JobRequest::new(cli.job_type, job_name, params);

    let config = Arc::new(config);
    let invoker = Invoker::new(Arc::new(JobRegistry::builtin()));
    let queue = Arc::new(MemoryQueue::new());
    let monitor = Arc::new(MemoryMonitor::new());
    info!(
        service = %config.service_name,
        instance = %config.instance_name,
        job_types = ?invoker.registry().job_types(),
        "invoker ready"
    );

    let mut all_completed = true;
    let mut follow_ups = 0usize;
    let mut next = Some(Invocation::for_request(request));

    while let Some(invocation) = next.take() {
        let ctx = InvocationContext::new(
            Arc::new(invocation),
            config.clone(),
            Some(monitor.clone() as Arc<dyn Monitor>),
            Some(queue.clone() as Arc<dyn JobQueue>),
        );
        let result = invoker.invoke(&ctx).await;
        all_completed &= result.is_completed();

        let request = ctx.request();
        let line = serde_json::to_string(&Outcome {
            invocation_id: ctx.id(),
            job_type: &request.job_type,
            job_name: &request.job_name,
            result: &result,
        })?;
        println!("{line}");

        if !cli.follow {
            break;
        }
        if follow_ups == config.max_follow_ups {
            if !queue.is_empty() {
                warn!(
                    limit = config.max_follow_ups,
                    dropped = queue.len(),
                    "follow-up limit reached"
                );
            }
            break;
        }
        next = queue.dequeue();
        if next.is_some() {
            follow_ups += 1;
        }
    }

    info!(
        invocations = follow_ups + 1,
        events = monitor.events().len(),
        all_completed,
        "done"
    );
    Ok(all_completed)
}
