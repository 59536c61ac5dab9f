//! `speechkit`: provision Azure AI Speech resources for sample projects.

mod config;
mod error;
mod terminal;

use clap::{Parser, Subcommand};
use rootcause::Report;
use speechkit_arm::{ArmAccountDirectory, ArmClient, ArmResourceInstances, ArmResourceManagement};
use speechkit_core::{AccountType, Prompter, ResourceId};
use speechkit_identity::{AccountManager, LoginState, TracingNotifier, session_provider};
use speechkit_provisioning::{
    ProvisioningError, ProvisioningOrchestrator, SelectionResolver, TracingTelemetry,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::CliConfig;
use crate::error::CliError;
use crate::terminal::TerminalPrompter;

/// Account kind created for new speech resources.
const TARGET_KIND: AccountType = AccountType::AiServices;

#[derive(Debug, Parser)]
#[command(name = "speechkit", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sign in to Azure.
    Login,
    /// Sign out of Azure.
    Logout,
    /// Show whether an account is signed in.
    Status,
    /// List the subscriptions the account can reach.
    Subscriptions,
    /// List speech-capable resources in the selected subscription.
    List,
    /// Create a new Azure AI Services resource.
    Create,
    /// Pick or create a resource and write its credentials into a project.
    Configure {
        /// Project directory receiving `.env/.env.dev` and `config.json`.
        #[arg(long, default_value = ".")]
        project: PathBuf,
    },
    /// Show the live properties of a resource.
    Show {
        /// Full ARM id of the resource.
        #[arg(long)]
        resource_id: ResourceId,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if err.current_context().is_cancellation() => {
            info!("{}", err.current_context());
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {}", err.current_context());
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> Result<(), Report<CliError>> {
    let config = CliConfig::from_env().map_err(|e| CliError::config(&e))?;
    let orchestrator = build_orchestrator(&config)?;
    execute(&orchestrator, command)
        .await
        .map_err(CliError::provisioning)?;
    Ok(())
}

fn build_orchestrator(config: &CliConfig) -> Result<ProvisioningOrchestrator, Report<CliError>> {
    let prompter: Arc<dyn Prompter> = Arc::new(TerminalPrompter::default());
    let provider = session_provider(&config.identity, Arc::new(TracingNotifier))
        .map_err(CliError::identity_setup)?;
    let account = Arc::new(
        AccountManager::new(provider, prompter.clone()).with_scopes(&config.identity.scopes()),
    );
    account.add_status_listener(|state| debug!(%state, "login state changed"));

    let client = ArmClient::new(&config.arm, account.clone()).map_err(CliError::arm_setup)?;
    let directory = Arc::new(ArmAccountDirectory::new(client.clone()));
    let management = Arc::new(ArmResourceManagement::new(client.clone(), TARGET_KIND));
    let instances = Arc::new(ArmResourceInstances::new(client, TARGET_KIND));

    let resolver = SelectionResolver::new(
        account,
        directory,
        management.clone(),
        instances.clone(),
        prompter,
    );
    Ok(
        ProvisioningOrchestrator::new(resolver, management, instances, Arc::new(TracingTelemetry))
            .with_layout(config.project.clone())
            .with_resource_group_policy(config.provisioning.resource_group_policy()),
    )
}

/// Signs in unless a cached session already exists.
async fn sign_in(orchestrator: &ProvisioningOrchestrator) -> Result<(), Report<ProvisioningError>> {
    if orchestrator.status().await?.state != LoginState::SignedIn {
        orchestrator.login().await?;
    }
    Ok(())
}

async fn execute(
    orchestrator: &ProvisioningOrchestrator,
    command: Command,
) -> Result<(), Report<ProvisioningError>> {
    let resolver = orchestrator.resolver();
    match command {
        Command::Login => {
            let account = orchestrator.login().await?;
            println!(
                "Signed in as {}.",
                account.sign_in_name().unwrap_or("your account")
            );
        }
        Command::Logout => {
            if orchestrator.logout().await? {
                println!("Signed out.");
            } else {
                println!("Not signed out.");
            }
        }
        Command::Status => {
            let status = orchestrator.status().await?;
            match status.account.as_ref().and_then(|a| a.sign_in_name()) {
                Some(name) if status.state == LoginState::SignedIn => {
                    println!("Signed in as {name}.");
                }
                _ => println!("{}.", status.state),
            }
        }
        Command::Subscriptions => {
            sign_in(orchestrator).await?;
            for subscription in resolver.list_subscriptions().await? {
                println!(
                    "{}\t{}\t{}",
                    subscription.id, subscription.name, subscription.tenant_id
                );
            }
        }
        Command::List => {
            let subscription = resolver.get_selected_subscription(true).await?;
            for resource in resolver.list_speech_resources(&subscription).await? {
                println!("{}\t{}", resource.label(), resource.id);
            }
        }
        Command::Create => {
            let subscription = resolver.get_selected_subscription(true).await?;
            let resource = orchestrator.create_new(&subscription).await?;
            println!("Created {}.", resource.id);
        }
        Command::Configure { project } => {
            let report = orchestrator.configure(&project).await?;
            println!(
                "Configured {} with {}.",
                report.files.env_path.display(),
                report.resource.name
            );
            if let Some(config_path) = &report.files.config_path {
                println!("Updated {}.", config_path.display());
            }
        }
        Command::Show { resource_id } => {
            sign_in(orchestrator).await?;
            let details = orchestrator.show_resource(&resource_id).await?;
            let rows = [
                ("name", Some(details.name.as_str())),
                ("kind", details.kind.as_deref()),
                ("location", Some(details.location.as_str())),
                ("sku", details.sku.as_deref()),
                ("endpoint", details.endpoint.as_deref()),
                ("customSubDomainName", details.custom_subdomain_name.as_deref()),
                ("provisioningState", details.provisioning_state.as_deref()),
            ];
            for (field, value) in rows {
                println!("{field:<20}{}", value.unwrap_or("-"));
            }
        }
    }
    Ok(())
}
