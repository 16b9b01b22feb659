use aegis::audit::read_jsonl;
use aegis::cli::{Args, Command, OperationArgs};
use aegis::config::Settings;
use aegis::logging::setup_logging;
use aegis::permissions::PermissionGate;
use aegis::tools::TOOL_SPECS;
use aegis::{Operation, PermissionEnforcer};
use anyhow::{bail, Context, Result};
use serde_json::Value;

fn parse_operation(args: &OperationArgs) -> Result<Operation> {
    let params: Value = serde_json::from_str(&args.params)
        .with_context(|| format!("--params is not valid JSON: {}", args.params))?;
    let Value::Object(params) = params else {
        bail!("--params must be a JSON object");
    };
    Ok(Operation::new(args.tool.clone(), params).with_justification(args.justification.clone()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    dotenv::dotenv().ok();
    setup_logging(args.verbose);

    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(mode) = args.mode {
        settings.mode = mode;
    }

    match args.command {
        Command::Check(op_args) => {
            let operation = parse_operation(&op_args)?;
            let gate = PermissionGate::new(&settings.policy)?;
            let decision = gate.decide(&operation, settings.mode);
            println!("{}", serde_json::to_string_pretty(&decision)?);
        }

        Command::Run(op_args) => {
            let operation = parse_operation(&op_args)?;
            let enforcer = PermissionEnforcer::from_settings(&settings)?;
            let response = enforcer.process(&operation).await;
            println!("{}", serde_json::to_string_pretty(&response)?);
            if !response.success {
                std::process::exit(1);
            }
        }

        Command::Tools => {
            let gate = PermissionGate::new(&settings.policy)?;
            println!("Tools in {} mode:", settings.mode);
            for spec in TOOL_SPECS {
                println!(
                    "  {:<18} {:<10} {:<22} {}",
                    spec.name,
                    gate.classifier().classify(spec.name).label(),
                    spec.parameters.join(", "),
                    spec.description
                );
            }
        }

        Command::Audit { file } => {
            let Some(path) = file.or(settings.audit.log_file) else {
                bail!("No audit file given and audit.log_file is not configured");
            };
            for entry in read_jsonl(&path)? {
                println!(
                    "{} [{}] {} ({}) {}: {}",
                    entry.timestamp.to_rfc3339(),
                    entry.mode,
                    entry.operation_name,
                    entry.tier,
                    if entry.decision.allowed { "allowed" } else { "denied" },
                    entry.decision.reason
                );
            }
        }
    }

    Ok(())
}
