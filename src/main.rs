// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info, warn};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

use eventdesk::app_config::{Config, GenerationProvider, LogLevel};
use eventdesk::app_controller::Controller;
use eventdesk::database::models::{
    AssignmentStatus, AssignmentUpdate, AttachmentKind, Deliverable, DeliverableStatus,
    DeliverableUpdate, EventStatus, EventUpdate, MilestoneKind, NewDeliverable, NewEvent,
    NewSupplier, SupplierStatus, format_file_size,
};
use eventdesk::file_utils::FileManager;
use eventdesk::report::ReportMode;

/// CLI Wrapper for GenerationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliGenerationProvider {
    Ollama,
    #[value(name = "openai")]
    OpenAI,
    Anthropic,
    #[value(name = "lmstudio")]
    LMStudio,
}

impl From<CliGenerationProvider> for GenerationProvider {
    fn from(cli_provider: CliGenerationProvider) -> Self {
        match cli_provider {
            CliGenerationProvider::Ollama => GenerationProvider::Ollama,
            CliGenerationProvider::OpenAI => GenerationProvider::OpenAI,
            CliGenerationProvider::Anthropic => GenerationProvider::Anthropic,
            CliGenerationProvider::LMStudio => GenerationProvider::LMStudio,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create, list and edit events
    #[command(subcommand)]
    Event(EventCommand),

    /// Create, list and edit suppliers
    #[command(subcommand)]
    Supplier(SupplierCommand),

    /// Attach a supplier to an event with a budget and optional deliverables
    Assign {
        event_id: i64,
        supplier_id: i64,
        /// Budget allocated to the supplier
        #[arg(short, long)]
        budget: f64,
        /// JSON file with a list of deliverables
        #[arg(short, long, value_name = "FILE")]
        deliverables: Option<PathBuf>,
    },

    /// Remove a supplier and its deliverables from an event
    Unassign { event_id: i64, supplier_id: i64 },

    /// Edit supplier assignments
    #[command(subcommand)]
    Assignment(AssignmentCommand),

    /// Manage deliverables
    #[command(subcommand)]
    Deliverable(DeliverableCommand),

    /// Generate report documents
    #[command(subcommand)]
    Report(ReportCommand),

    /// Act as a supplier
    Portal {
        /// Username of the supplier
        #[arg(short, long, value_name = "USERNAME")]
        supplier: String,
        #[command(subcommand)]
        command: PortalCommand,
    },

    /// Show database statistics
    Stats,

    /// Generate shell completions for eventdesk
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug)]
enum EventCommand {
    /// Create an event
    Create {
        name: String,
        /// Event date (YYYY-MM-DD)
        #[arg(short, long)]
        date: NaiveDate,
        #[arg(long, default_value = "")]
        location: String,
        #[arg(short, long, default_value_t = 0.0)]
        budget: f64,
        #[arg(short, long)]
        status: Option<EventStatus>,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// List events
    List {
        #[arg(short, long)]
        status: Option<EventStatus>,
    },
    /// Show an event with its suppliers and deliverables
    Show { id: i64 },
    /// Update event fields
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        status: Option<EventStatus>,
        #[arg(long)]
        budget: Option<f64>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete an event and everything attached to it
    Delete { id: i64 },
}

#[derive(Subcommand, Debug)]
enum SupplierCommand {
    /// Create a supplier
    Create {
        name: String,
        #[arg(short, long)]
        email: String,
        /// Portal username
        #[arg(short, long)]
        username: String,
        #[arg(short, long, default_value = "")]
        phone: String,
        #[arg(short = 'S', long, default_value = "")]
        specialization: String,
        #[arg(short, long, default_value_t = 5)]
        rating: u8,
    },
    /// List suppliers
    List {
        #[arg(short, long)]
        status: Option<SupplierStatus>,
    },
    /// Show a supplier
    Show { id: i64 },
    /// Mark a supplier inactive
    Deactivate { id: i64 },
    /// Delete a supplier
    Delete { id: i64 },
}

#[derive(Subcommand, Debug)]
enum AssignmentCommand {
    /// Update the status, performance or budget of an assignment
    Update {
        event_id: i64,
        supplier_id: i64,
        #[arg(short, long)]
        status: Option<AssignmentStatus>,
        #[arg(short, long)]
        performance: Option<u8>,
        #[arg(short, long)]
        budget: Option<f64>,
    },
}

#[derive(Subcommand, Debug)]
enum DeliverableCommand {
    /// Add a deliverable for an assigned supplier
    Add {
        event_id: i64,
        supplier_id: i64,
        /// Item name
        #[arg(short, long)]
        item: String,
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
        #[arg(short, long, default_value_t = 0.0)]
        unit_price: f64,
        /// Defaults to quantity times unit price
        #[arg(long)]
        total_value: Option<f64>,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        delivery_date: Option<NaiveDate>,
        #[arg(long)]
        installation_date: Option<NaiveDate>,
        #[arg(long)]
        dismantling_date: Option<NaiveDate>,
    },
    /// List deliverables of an event or a supplier
    List {
        #[arg(short, long, conflicts_with = "supplier")]
        event: Option<i64>,
        #[arg(short, long)]
        supplier: Option<i64>,
    },
    /// Update a deliverable
    Update {
        id: i64,
        #[arg(short, long)]
        status: Option<DeliverableStatus>,
        #[arg(short, long)]
        progress: Option<u8>,
        #[arg(long)]
        delay_reason: Option<String>,
        #[arg(long)]
        quality: Option<u8>,
        #[arg(long)]
        quantity: Option<u32>,
        #[arg(long)]
        unit_price: Option<f64>,
    },
    /// Record the actual date of a milestone
    Milestone {
        id: i64,
        /// delivery, installation or dismantling
        kind: MilestoneKind,
        /// Defaults to today
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
    /// Comment on a deliverable
    Comment {
        id: i64,
        body: String,
        #[arg(short, long, default_value = "agency")]
        author: String,
    },
}

#[derive(Subcommand, Debug)]
enum ReportCommand {
    /// Generate the report of one event
    Event {
        id: i64,
        /// Compose the report from stored data instead of asking a provider
        #[arg(long)]
        offline: bool,
        /// Output directory (defaults to the configured one)
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,
        /// Force overwrite of existing output files
        #[arg(short, long)]
        force: bool,
        /// Generation provider to use
        #[arg(short, long, value_enum)]
        provider: Option<CliGenerationProvider>,
        /// Model name to use for generation
        #[arg(short, long)]
        model: Option<String>,
    },
    /// Generate the all-events overview report
    Overview {
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,
        #[arg(short, long)]
        force: bool,
    },
    /// Format an existing report text file into a document
    Format {
        file: PathBuf,
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,
        #[arg(short, long)]
        force: bool,
    },
    /// Check that the configured provider is reachable
    Check,
}

#[derive(Subcommand, Debug)]
enum PortalCommand {
    /// List deliverables assigned to the supplier
    Deliverables,
    /// Upload a document for a deliverable
    Upload {
        deliverable_id: i64,
        file: PathBuf,
        #[arg(short, long, default_value = "document")]
        kind: AttachmentKind,
        #[arg(short, long)]
        description: String,
    },
    /// Comment on a deliverable
    Comment { deliverable_id: i64, body: String },
    /// Report progress on a deliverable
    Progress {
        deliverable_id: i64,
        /// Progress in percent
        percent: u8,
        #[arg(short, long)]
        status: Option<DeliverableStatus>,
        #[arg(long)]
        delay_reason: Option<String>,
    },
}

/// EventDesk - event and supplier management with AI reports
#[derive(Parser, Debug)]
#[command(name = "eventdesk")]
#[command(version)]
#[command(about = "Event and supplier management with AI-written reports")]
#[command(long_about = "EventDesk tracks events, the suppliers attached to them and their deliverables,
and turns the result into Word reports written by an AI provider or composed offline.

EXAMPLES:
    eventdesk event create \"Summer Gala\" --date 2026-07-18 --budget 10000
    eventdesk supplier create \"Bright Lights\" -e info@bright.example -u bright
    eventdesk assign 1 1 --budget 4000 --deliverables lights.json
    eventdesk deliverable milestone 1 delivery
    eventdesk report event 1                    # AI report with the configured provider
    eventdesk report event 1 --offline -f       # Offline report, overwrite existing file
    eventdesk report event 1 -p openai -m gpt-4o-mini
    eventdesk portal -s bright upload 1 note.pdf -d \"Signed delivery note\"
    eventdesk completions bash > eventdesk.bash

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config. If the config file doesn't exist, a default one
    will be created automatically.

SUPPORTED PROVIDERS:
    ollama    - Local Ollama server (default: llama3.2:3b)
    openai    - OpenAI API (requires API key)
    anthropic - Anthropic API (requires API key)
    lmstudio  - LM Studio local server (OpenAI-compatible on http://localhost:1234/v1)")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long = "config", global = true, default_value = "conf.json")]
    config_path: String,

    /// Database file (overrides the configuration)
    #[arg(long, global = true, value_name = "FILE")]
    database: Option<PathBuf>,

    /// Set logging level
    #[arg(short, long, global = true, value_enum)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Marker and ANSI colour for log level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("❌", "\x1B[1;31m"),
            Level::Warn => ("🚧", "\x1B[1;33m"),
            Level::Info => (" ", "\x1B[1;32m"),
            Level::Debug => ("🔍", "\x1B[1;36m"),
            Level::Trace => ("📋", "\x1B[1;35m"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (marker, colour) = Self::style_for_level(record.level());
            let _ = writeln!(
                std::io::stderr(),
                "{}{} {} {}\x1B[0m",
                colour,
                now,
                marker,
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Trace is the ceiling; the effective level is set with log::set_max_level
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "eventdesk", &mut std::io::stdout());
        return Ok(());
    }

    if let Some(level) = &cli.log_level {
        log::set_max_level(LogLevel::from(level.clone()).to_level_filter());
    }

    let config_path = Path::new(&cli.config_path);
    let (mut config, created) = Config::load_or_create(config_path)?;
    if created {
        warn!("Config file not found at '{}', created default config.", cli.config_path);
    }

    if let Some(database) = &cli.database {
        config.database_path = Some(database.to_string_lossy().to_string());
    }
    match &cli.log_level {
        Some(level) => config.log_level = level.clone().into(),
        None => log::set_max_level(config.log_level.to_level_filter()),
    }
    if let Commands::Report(ReportCommand::Event { provider, model, .. }) = &cli.command {
        if let Some(provider) = provider {
            config.generation.provider = provider.clone().into();
        }
        if let Some(model) = model {
            config.generation.set_model(model);
        }
    }

    config.validate().context("Configuration validation failed")?;

    let controller = Controller::with_config(config)?;
    run_command(&controller, cli.command).await
}

async fn run_command(controller: &Controller, command: Commands) -> Result<()> {
    let repository = controller.repository();

    match command {
        Commands::Event(command) => run_event_command(controller, command).await,
        Commands::Supplier(command) => run_supplier_command(controller, command).await,

        Commands::Assign {
            event_id,
            supplier_id,
            budget,
            deliverables,
        } => {
            let deliverables: Vec<NewDeliverable> = match deliverables {
                Some(path) => {
                    let content = FileManager::read_to_string(&path)?;
                    serde_json::from_str(&content)
                        .with_context(|| format!("Failed to parse deliverables file: {:?}", path))?
                }
                None => Vec::new(),
            };
            let (assignment, created) = repository
                .assign_supplier(event_id, supplier_id, budget, deliverables)
                .await?;
            info!(
                "Assigned supplier {} to event {} with {} deliverables",
                supplier_id,
                event_id,
                created.len()
            );
            print_json(&assignment)
        }

        Commands::Unassign { event_id, supplier_id } => {
            let removed = repository.remove_supplier_from_event(event_id, supplier_id).await?;
            info!(
                "Removed supplier {} from event {} ({} deliverables deleted)",
                supplier_id, event_id, removed
            );
            Ok(())
        }

        Commands::Assignment(AssignmentCommand::Update {
            event_id,
            supplier_id,
            status,
            performance,
            budget,
        }) => {
            let update = AssignmentUpdate {
                status,
                performance,
                allocated_budget: budget,
            };
            let assignment = repository.update_assignment(event_id, supplier_id, update).await?;
            print_json(&assignment)
        }

        Commands::Deliverable(command) => run_deliverable_command(controller, command).await,
        Commands::Report(command) => run_report_command(controller, command).await,

        Commands::Portal { supplier, command } => {
            let portal = controller.open_portal(&supplier).await?;
            match command {
                PortalCommand::Deliverables => {
                    print_deliverables(&portal.assigned_deliverables().await?);
                    Ok(())
                }
                PortalCommand::Upload {
                    deliverable_id,
                    file,
                    kind,
                    description,
                } => {
                    let attachment = portal
                        .upload_document(deliverable_id, kind, &file, &description)
                        .await?;
                    info!(
                        "Uploaded {} ({})",
                        attachment.original_name,
                        format_file_size(attachment.size_bytes)
                    );
                    Ok(())
                }
                PortalCommand::Comment { deliverable_id, body } => {
                    portal.comment(deliverable_id, &body).await?;
                    Ok(())
                }
                PortalCommand::Progress {
                    deliverable_id,
                    percent,
                    status,
                    delay_reason,
                } => {
                    let deliverable = portal
                        .report_progress(deliverable_id, percent, status, delay_reason)
                        .await?;
                    info!(
                        "{}: {} ({}%)",
                        deliverable.item_name, deliverable.current_status, deliverable.progress_percentage
                    );
                    Ok(())
                }
            }
        }

        Commands::Stats => {
            let stats = repository.connection().stats()?;
            let overview = repository.overview().await?;
            println!("{}", stats);
            println!(
                "Total budget: {:.2}, Average completion: {}%",
                overview.total_budget, overview.average_completion
            );
            Ok(())
        }

        // Handled before the configuration is loaded
        Commands::Completions { .. } => Ok(()),
    }
}

async fn run_event_command(controller: &Controller, command: EventCommand) -> Result<()> {
    let repository = controller.repository();

    match command {
        EventCommand::Create {
            name,
            date,
            location,
            budget,
            status,
            description,
        } => {
            let event = repository
                .create_event(&NewEvent {
                    name,
                    date,
                    location,
                    status: status.unwrap_or_default(),
                    budget,
                    description,
                })
                .await?;
            info!("Created event {} ({})", event.id, event.name);
            Ok(())
        }
        EventCommand::List { status } => {
            for event in repository.list_events(status).await? {
                println!(
                    "{:>4}  {}  {:<9}  {:>12.2}  {} ({})",
                    event.id, event.date, event.status, event.budget, event.name, event.location
                );
            }
            Ok(())
        }
        EventCommand::Show { id } => print_json(&repository.get_event_details(id).await?),
        EventCommand::Update {
            id,
            name,
            date,
            location,
            status,
            budget,
            description,
        } => {
            let update = EventUpdate {
                name,
                date,
                location,
                status,
                budget,
                description,
            };
            if update.is_empty() {
                return Err(anyhow!("Nothing to update"));
            }
            let event = repository.update_event(id, update).await?;
            print_json(&event)
        }
        EventCommand::Delete { id } => {
            repository.delete_event(id).await?;
            info!("Deleted event {}", id);
            Ok(())
        }
    }
}

async fn run_supplier_command(controller: &Controller, command: SupplierCommand) -> Result<()> {
    let repository = controller.repository();

    match command {
        SupplierCommand::Create {
            name,
            email,
            username,
            phone,
            specialization,
            rating,
        } => {
            let supplier = repository
                .create_supplier(&NewSupplier {
                    name,
                    email,
                    phone,
                    specialization,
                    username,
                    rating,
                })
                .await?;
            info!("Created supplier {} ({})", supplier.id, supplier.username);
            Ok(())
        }
        SupplierCommand::List { status } => {
            for supplier in repository.list_suppliers(status).await? {
                println!(
                    "{:>4}  {:<8}  {}/5  {} <{}> @{}",
                    supplier.id,
                    supplier.status,
                    supplier.rating,
                    supplier.name,
                    supplier.email,
                    supplier.username
                );
            }
            Ok(())
        }
        SupplierCommand::Show { id } => {
            let supplier = repository
                .get_supplier(id)
                .await?
                .ok_or_else(|| anyhow!("Supplier {} not found", id))?;
            print_json(&supplier)
        }
        SupplierCommand::Deactivate { id } => {
            let supplier = repository.update_supplier_status(id, SupplierStatus::Inactive).await?;
            info!("Supplier {} is now {}", supplier.username, supplier.status);
            Ok(())
        }
        SupplierCommand::Delete { id } => {
            repository.delete_supplier(id).await?;
            info!("Deleted supplier {}", id);
            Ok(())
        }
    }
}

async fn run_deliverable_command(controller: &Controller, command: DeliverableCommand) -> Result<()> {
    let repository = controller.repository();

    match command {
        DeliverableCommand::Add {
            event_id,
            supplier_id,
            item,
            quantity,
            unit_price,
            total_value,
            description,
            delivery_date,
            installation_date,
            dismantling_date,
        } => {
            let deliverable = repository
                .add_deliverable(
                    event_id,
                    supplier_id,
                    &NewDeliverable {
                        item_name: item,
                        item_description: description,
                        quantity,
                        unit_price,
                        total_value,
                        scheduled_delivery_date: delivery_date,
                        scheduled_installation_date: installation_date,
                        scheduled_dismantling_date: dismantling_date,
                    },
                )
                .await?;
            info!("Created deliverable {} ({})", deliverable.id, deliverable.item_name);
            Ok(())
        }
        DeliverableCommand::List { event, supplier } => {
            let deliverables = match (event, supplier) {
                (Some(event_id), _) => repository.list_deliverables_for_event(event_id).await?,
                (None, Some(supplier_id)) => repository.list_deliverables_for_supplier(supplier_id).await?,
                (None, None) => return Err(anyhow!("Pass --event or --supplier")),
            };
            print_deliverables(&deliverables);
            Ok(())
        }
        DeliverableCommand::Update {
            id,
            status,
            progress,
            delay_reason,
            quality,
            quantity,
            unit_price,
        } => {
            let deliverable = repository
                .update_deliverable(
                    id,
                    DeliverableUpdate {
                        current_status: status,
                        progress_percentage: progress,
                        delay_reasons: delay_reason,
                        quality_rating: quality,
                        quantity,
                        unit_price,
                    },
                )
                .await?;
            print_json(&deliverable)
        }
        DeliverableCommand::Milestone { id, kind, date } => {
            let date = date.unwrap_or_else(|| chrono::Local::now().date_naive());
            let deliverable = repository.record_milestone(id, kind, date).await?;
            info!(
                "{}: {} on {} ({}%)",
                deliverable.item_name, kind, date, deliverable.progress_percentage
            );
            Ok(())
        }
        DeliverableCommand::Comment { id, body, author } => {
            repository.add_comment(id, &author, &body).await?;
            for comment in repository.list_comments(id).await? {
                println!("[{}] {}: {}", comment.created_at, comment.author, comment.body);
            }
            Ok(())
        }
    }
}

async fn run_report_command(controller: &Controller, command: ReportCommand) -> Result<()> {
    let written = match command {
        ReportCommand::Event {
            id,
            offline,
            output,
            force,
            ..
        } => {
            let mode = if offline { ReportMode::Offline } else { ReportMode::Ai };
            controller.run_event_report(id, mode, output, force).await?
        }
        ReportCommand::Overview { output, force } => controller.run_overview_report(output, force).await?,
        ReportCommand::Format { file, output, force } => controller.format_text_file(&file, output, force)?,
        ReportCommand::Check => {
            controller.test_provider().await?;
            return Ok(());
        }
    };

    if let Some(path) = written {
        println!("{}", path.display());
    }
    Ok(())
}

fn print_deliverables(deliverables: &[Deliverable]) {
    for d in deliverables {
        println!(
            "{:>4}  event {:<4} supplier {:<4} {:<11} {:>3}%  {} x{} ({:.2})",
            d.id,
            d.event_id,
            d.supplier_id,
            d.current_status.to_string(),
            d.progress_percentage,
            d.item_name,
            d.quantity,
            d.total_value
        );
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}
