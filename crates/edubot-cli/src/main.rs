//! Edubot CLI - curriculum-grounded answers for learners

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use edubot_core::commands::{audit, curriculum, knowledge, taxonomy};
use edubot_core::config::Config;
use edubot_core::domain::resolution::{Provenance, Resolution, ResolveRequest};
use edubot_core::domain::taxonomy::{QuestionContext, TaxonomyKind};
use edubot_core::extraction::UploadArea;
use edubot_core::prelude::AnswerService;
use edubot_core::storage::Database;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use serde_json::json;
use tracing::{debug, info, warn};

#[cfg(test)]
mod main_tests;

#[derive(Parser)]
#[command(name = "edubot")]
#[command(author, version, about = "Curriculum-grounded study assistant", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Grade, semester and department of a question; ids or names
#[derive(clap::Args, Debug, Default, Clone)]
struct ContextArgs {
    /// Grade id or name
    #[arg(short, long)]
    grade: Option<String>,
    /// Semester id or name
    #[arg(short, long)]
    semester: Option<String>,
    /// Department id or name
    #[arg(short, long)]
    department: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question
    Ask {
        /// The question (optional when a file is attached)
        question: Option<String>,
        #[command(flatten)]
        context: ContextArgs,
        /// Attach a document, image or audio file
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Learner name recorded with the conversation
        #[arg(short, long, env = "EDUBOT_USER", default_value = "student")]
        user: String,
        /// An answer held back for confirmation
        #[arg(long, requires = "confirm")]
        pending: Option<String>,
        /// The learner's reply to a held-back answer
        #[arg(long, requires = "pending")]
        confirm: Option<String>,
    },

    /// Interactive question session
    Chat {
        #[command(flatten)]
        context: ContextArgs,
        /// Learner name recorded with the conversation
        #[arg(short, long, env = "EDUBOT_USER", default_value = "student")]
        user: String,
    },

    /// Manage grades
    Grades {
        #[command(subcommand)]
        action: ItemAction,
    },

    /// Manage semesters
    Semesters {
        #[command(subcommand)]
        action: ItemAction,
    },

    /// Manage departments
    Departments {
        #[command(subcommand)]
        action: DepartmentAction,
    },

    /// Manage the knowledge base
    Kb {
        #[command(subcommand)]
        action: KnowledgeAction,
    },

    /// Manage curriculum documents
    Curriculum {
        #[command(subcommand)]
        action: CurriculumAction,
    },

    /// Show recent conversations
    History {
        /// Number of conversations to show
        #[arg(short, long, default_value_t = audit::DEFAULT_HISTORY_LIMIT)]
        limit: u32,
    },

    /// Show usage statistics
    Stats,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Run health check
    Doctor,
}

#[derive(Subcommand)]
enum ItemAction {
    /// List active entries
    List,
    /// Add an entry
    Add {
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Deactivate an entry by id or name
    Remove { key: String },
}

#[derive(Subcommand)]
enum DepartmentAction {
    /// List active departments
    List {
        /// Only departments offered in this grade
        #[arg(short, long)]
        grade: Option<String>,
    },
    /// Add a department
    Add {
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// Grades offering the department (comma-separated ids or names)
        #[arg(long, value_delimiter = ',')]
        grades: Vec<String>,
    },
    /// Delete a department and its links
    Remove { key: String },
    /// Offer a department in a grade
    Link { department: String, grade: String },
    /// Stop offering a department in a grade
    Unlink { department: String, grade: String },
}

#[derive(Subcommand)]
enum KnowledgeAction {
    /// List entries, newest first
    List,
    /// Add a question/answer pair
    Add {
        #[arg(long)]
        question: String,
        #[arg(long)]
        answer: String,
        #[arg(short, long)]
        keywords: Option<String>,
        #[command(flatten)]
        context: ContextArgs,
    },
    /// Delete an entry
    Remove { id: String },
}

#[derive(Subcommand)]
enum CurriculumAction {
    /// Upload a document for a grade, semester and departments
    Upload {
        file: PathBuf,
        #[arg(short, long)]
        grade: String,
        #[arg(short, long)]
        semester: String,
        /// Departments (comma-separated ids or names)
        #[arg(short, long, value_delimiter = ',', required = true)]
        departments: Vec<String>,
    },
    /// List active documents
    List {
        #[command(flatten)]
        context: ContextArgs,
    },
    /// Remove a document and its stored file
    Remove { id: String },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a configuration value
    Get { key: String },
    /// Set a configuration value
    Set { key: String, value: String },
    /// List all configuration
    List,
    /// Reset to defaults
    Reset,
    /// Show config file path
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("edubot=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        report(&e);
        std::process::exit(1);
    }
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    let quiet = cli.quiet;

    match cli.command {
        Commands::Ask {
            question,
            context,
            file,
            user,
            pending,
            confirm,
        } => {
            let (config, db) = open().await?;
            let service = AnswerService::new(&db, &config)?;
            let context = resolve(&db, &context).await?;
            let mut request = ResolveRequest::new(user, question.unwrap_or_default())
                .with_context(context);
            if let Some(file) = file {
                request = request.with_file(stage_file(&config, &file).await?);
            }
            if let (Some(answer), Some(reply)) = (pending, confirm) {
                request = request.with_pending(answer, reply);
            }
            let resolution = service.ask(request).await?;
            print_resolution(&resolution, format, quiet)
        }

        Commands::Chat { context, user } => {
            let (config, db) = open().await?;
            cmd_chat(&config, &db, &context, &user, format, quiet).await
        }

        Commands::Grades { action } => {
            let (_, db) = open().await?;
            cmd_items(&db, TaxonomyKind::Grade, action, format, quiet).await
        }

        Commands::Semesters { action } => {
            let (_, db) = open().await?;
            cmd_items(&db, TaxonomyKind::Semester, action, format, quiet).await
        }

        Commands::Departments { action } => {
            let (_, db) = open().await?;
            cmd_departments(&db, action, format, quiet).await
        }

        Commands::Kb { action } => {
            let (_, db) = open().await?;
            cmd_knowledge(&db, action, format, quiet).await
        }

        Commands::Curriculum { action } => {
            let (config, db) = open().await?;
            cmd_curriculum(&config, &db, action, format, quiet).await
        }

        Commands::History { limit } => {
            let (_, db) = open().await?;
            cmd_history(&db, limit, format).await
        }

        Commands::Stats => {
            let (_, db) = open().await?;
            cmd_stats(&db, format).await
        }

        Commands::Config { action } => cmd_config(action, quiet),

        Commands::Doctor => cmd_doctor(quiet).await,
    }
}

/// Print an error with its code and a hint when one exists
fn report(error: &anyhow::Error) {
    match error.downcast_ref::<edubot_core::Error>() {
        Some(e) => {
            eprintln!("Error [{}]: {}", e.code(), e);
            if let Some(hint) = e.suggestion() {
                eprintln!("  Try: {}", hint);
            }
        }
        None => eprintln!("Error: {:#}", error),
    }
}

async fn open() -> anyhow::Result<(Config, Database)> {
    let config = Config::load()?;
    let db = Database::open(config.database_path()?).await?;
    Ok((config, db))
}

async fn resolve(db: &Database, context: &ContextArgs) -> anyhow::Result<QuestionContext> {
    Ok(taxonomy::resolve_context(
        db,
        context.grade.as_deref(),
        context.semester.as_deref(),
        context.department.as_deref(),
    )
    .await?)
}

/// Copy a local file into the upload area; bare names already there pass through
async fn stage_file(config: &Config, file: &Path) -> anyhow::Result<String> {
    if !file.is_file() {
        return Ok(file.display().to_string());
    }
    let uploads = UploadArea::open(config.upload_dir()?)?;
    Ok(uploads.import(file).await?)
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_resolution(
    resolution: &Resolution,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => print_json(resolution),
        OutputFormat::Text => {
            println!("{}", resolution.answer);
            if !quiet {
                println!();
                println!("[{}]", provenance_label(resolution.provenance));
            }
            Ok(())
        }
    }
}

fn provenance_label(provenance: Provenance) -> &'static str {
    match provenance {
        Provenance::KnowledgeBase => "knowledge base",
        Provenance::Generative => "generated, matches the curriculum",
        Provenance::GenerativeUnverified => "generated, not verified against the curriculum",
        Provenance::Deflection => "unavailable",
        Provenance::AwaitingConfirmation => "awaiting confirmation",
        Provenance::Cancelled => "cancelled",
        Provenance::Extraction => "file contents",
        Provenance::Error => "error",
    }
}

// ========== Chat ==========

/// One line of chat input
#[derive(Debug, PartialEq)]
enum ChatInput<'a> {
    Quit,
    Skip,
    File { path: &'a str, question: &'a str },
    Text(&'a str),
}

fn parse_chat_line(line: &str) -> ChatInput<'_> {
    let line = line.trim();
    if line.is_empty() {
        return ChatInput::Skip;
    }
    if matches!(line, "/quit" | "/exit") {
        return ChatInput::Quit;
    }
    if let Some(rest) = line.strip_prefix("/file") {
        let rest = rest.trim();
        if rest.is_empty() {
            return ChatInput::Skip;
        }
        let (path, question) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        return ChatInput::File {
            path,
            question: question.trim(),
        };
    }
    ChatInput::Text(line)
}

async fn cmd_chat(
    config: &Config,
    db: &Database,
    context: &ContextArgs,
    user: &str,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    let service = AnswerService::new(db, config)?;
    let context = resolve(db, context).await?;
    let session_id = uuid::Uuid::new_v4().to_string();
    let mut editor = DefaultEditor::new()?;
    let mut pending: Option<String> = None;

    if !quiet {
        println!("Edubot chat. /file <path> [question] attaches a file, /quit exits.");
        if !service.model().is_enabled() {
            println!("Generated answers are off: no API key is configured.");
        }
        println!();
    }
    info!(session_id = %session_id, "Chat session started");

    loop {
        let line = match editor.readline("> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let input = parse_chat_line(&line);
        if input != ChatInput::Skip {
            if let Err(e) = editor.add_history_entry(line.trim()) {
                debug!(error = %e, "Could not add line to chat history");
            }
        }

        let base = ResolveRequest::new(user, "")
            .with_context(context.clone())
            .with_session(session_id.as_str());
        let request = match (input, pending.take()) {
            (ChatInput::Quit, _) => break,
            (ChatInput::Skip, held) => {
                pending = held;
                continue;
            }
            (ChatInput::Text(reply), Some(answer)) => base.with_pending(answer, reply),
            (ChatInput::Text(question), None) => ResolveRequest {
                question: question.to_string(),
                ..base
            },
            (ChatInput::File { path, question }, _) => {
                let file = match stage_file(config, Path::new(path)).await {
                    Ok(file) => file,
                    Err(e) => {
                        report(&e);
                        continue;
                    }
                };
                ResolveRequest {
                    question: question.to_string(),
                    ..base
                }
                .with_file(file)
            }
        };

        match service.ask(request).await {
            Ok(resolution) => {
                pending = resolution.pending_answer.clone();
                print_resolution(&resolution, format, quiet)?;
            }
            Err(e) => report(&anyhow::Error::from(e)),
        }
        println!();
    }

    info!(session_id = %session_id, "Chat session ended");
    Ok(())
}

// ========== Administration ==========

async fn cmd_items(
    db: &Database,
    kind: TaxonomyKind,
    action: ItemAction,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    match action {
        ItemAction::List => {
            let items = taxonomy::list_items(db, kind).await?;
            if format == OutputFormat::Json {
                return print_json(&items);
            }
            if items.is_empty() && !quiet {
                println!("No {}s.", kind.as_str());
            }
            for item in items {
                match item.description {
                    Some(description) => println!("{}  {} - {}", item.id, item.name, description),
                    None => println!("{}  {}", item.id, item.name),
                }
            }
        }
        ItemAction::Add { name, description } => {
            let item = taxonomy::add_item(db, kind, &name, description.as_deref()).await?;
            if format == OutputFormat::Json {
                return print_json(&item);
            }
            if !quiet {
                println!("Added {} {} ({})", kind.as_str(), item.name, item.id);
            }
        }
        ItemAction::Remove { key } => {
            let item = taxonomy::remove_item(db, kind, &key).await?;
            if !quiet {
                println!("Deactivated {} {}", kind.as_str(), item.name);
            }
        }
    }
    Ok(())
}

async fn cmd_departments(
    db: &Database,
    action: DepartmentAction,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    match action {
        DepartmentAction::List { grade } => {
            let departments = taxonomy::list_departments(db, grade.as_deref()).await?;
            if format == OutputFormat::Json {
                return print_json(&departments);
            }
            if departments.is_empty() && !quiet {
                println!("No departments.");
            }
            for department in departments {
                println!(
                    "{}  {} ({} grades)",
                    department.id,
                    department.name,
                    department.grade_ids.len()
                );
            }
        }
        DepartmentAction::Add {
            name,
            description,
            grades,
        } => {
            let department =
                taxonomy::add_department(db, &name, description.as_deref(), &grades).await?;
            if format == OutputFormat::Json {
                return print_json(&department);
            }
            if !quiet {
                println!("Added department {} ({})", department.name, department.id);
            }
        }
        DepartmentAction::Remove { key } => {
            let department = taxonomy::remove_department(db, &key).await?;
            if !quiet {
                println!("Deleted department {}", department.name);
            }
        }
        DepartmentAction::Link { department, grade } => {
            let linked = taxonomy::link_department(db, &department, &grade).await?;
            if !quiet {
                if linked {
                    println!("Linked {} to {}", department, grade);
                } else {
                    println!("{} is already offered in {}", department, grade);
                }
            }
        }
        DepartmentAction::Unlink { department, grade } => {
            let unlinked = taxonomy::unlink_department(db, &department, &grade).await?;
            if !quiet {
                if unlinked {
                    println!("Unlinked {} from {}", department, grade);
                } else {
                    println!("{} was not offered in {}", department, grade);
                }
            }
        }
    }
    Ok(())
}

async fn cmd_knowledge(
    db: &Database,
    action: KnowledgeAction,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    match action {
        KnowledgeAction::List => {
            let entries = knowledge::list_entries(db).await?;
            if format == OutputFormat::Json {
                return print_json(&entries);
            }
            if entries.is_empty() && !quiet {
                println!("The knowledge base is empty.");
            }
            for entry in entries {
                println!("{}  {}", entry.id, entry.question);
                if !quiet {
                    println!("    {}", entry.answer);
                }
            }
        }
        KnowledgeAction::Add {
            question,
            answer,
            keywords,
            context,
        } => {
            let context = resolve(db, &context).await?;
            let entry =
                knowledge::add_entry(db, &question, &answer, keywords.as_deref(), &context).await?;
            if format == OutputFormat::Json {
                return print_json(&entry);
            }
            if !quiet {
                println!("Added knowledge entry {}", entry.id);
            }
        }
        KnowledgeAction::Remove { id } => {
            knowledge::remove_entry(db, &id).await?;
            if !quiet {
                println!("Deleted knowledge entry {}", id);
            }
        }
    }
    Ok(())
}

async fn cmd_curriculum(
    config: &Config,
    db: &Database,
    action: CurriculumAction,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    let library = UploadArea::open(config.curriculum_dir()?)?;

    match action {
        CurriculumAction::Upload {
            file,
            grade,
            semester,
            departments,
        } => {
            let document = curriculum::upload(
                db,
                &library,
                curriculum::UploadRequest {
                    source: &file,
                    grade: &grade,
                    semester: &semester,
                    departments: &departments,
                },
            )
            .await?;
            if format == OutputFormat::Json {
                return print_json(&json!({
                    "id": document.id,
                    "original_filename": document.original_filename,
                    "file_kind": document.file_kind,
                    "file_size": document.file_size,
                    "content_chars": document.content_chars(),
                }));
            }
            if !quiet {
                println!(
                    "Uploaded {} ({}, {} characters extracted)",
                    document.original_filename,
                    document.id,
                    document.content_chars()
                );
            }
        }
        CurriculumAction::List { context } => {
            let documents = curriculum::list(
                db,
                context.grade.as_deref(),
                context.semester.as_deref(),
                context.department.as_deref(),
            )
            .await?;
            if format == OutputFormat::Json {
                let summaries: Vec<_> = documents
                    .iter()
                    .map(|d| {
                        json!({
                            "id": d.id,
                            "original_filename": d.original_filename,
                            "file_kind": d.file_kind,
                            "grade_id": d.grade_id,
                            "semester_id": d.semester_id,
                            "department_ids": d.department_ids,
                            "content_chars": d.content_chars(),
                            "uploaded_at": d.uploaded_at,
                        })
                    })
                    .collect();
                return print_json(&summaries);
            }
            if documents.is_empty() && !quiet {
                println!("No curriculum documents.");
            }
            for document in documents {
                println!(
                    "{}  {}  {} characters  {}",
                    document.id,
                    document.original_filename,
                    document.content_chars(),
                    document.uploaded_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        CurriculumAction::Remove { id } => {
            let document = curriculum::remove(db, &library, &id).await?;
            if !quiet {
                println!("Removed {}", document.original_filename);
            }
        }
    }
    Ok(())
}

async fn cmd_history(db: &Database, limit: u32, format: OutputFormat) -> anyhow::Result<()> {
    let entries = audit::history(db, limit).await?;
    if format == OutputFormat::Json {
        return print_json(&entries);
    }
    for entry in entries {
        let record = &entry.record;
        println!(
            "{}  {}  [{}]  {} / {} / {}",
            record.created_at.format("%Y-%m-%d %H:%M"),
            record.username,
            record.provenance,
            entry.grade_name.as_deref().unwrap_or("-"),
            entry.semester_name.as_deref().unwrap_or("-"),
            entry.department_name.as_deref().unwrap_or("-"),
        );
        println!("    Q: {}", record.question);
        println!("    A: {}", record.answer);
    }
    Ok(())
}

async fn cmd_stats(db: &Database, format: OutputFormat) -> anyhow::Result<()> {
    let stats = audit::stats(db).await?;
    if format == OutputFormat::Json {
        return print_json(&stats);
    }
    println!("Conversations: {}", stats.total);
    println!("Learners:      {}", stats.unique_users);
    println!("Today:         {}", stats.today);
    if !stats.by_provenance.is_empty() {
        println!();
        for (provenance, count) in &stats.by_provenance {
            println!("  {:<24} {}", provenance.as_str(), count);
        }
    }
    Ok(())
}

fn cmd_config(action: ConfigAction, quiet: bool) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = config.get(&key)?;
            println!("{}", value);
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            if !quiet {
                println!("Set {} = {}", key, value);
            }
        }
        ConfigAction::List => {
            let config = Config::load()?;
            for (key, value) in config.list()? {
                println!("{} = {}", key, value);
            }
        }
        ConfigAction::Reset => {
            Config::reset()?;
            if !quiet {
                println!("Configuration reset to defaults.");
            }
        }
        ConfigAction::Path => {
            println!("{}", Config::config_path()?.display());
        }
    }
    Ok(())
}

/// Open a file area for `doctor`, printing its status line
fn check_area(label: &str, dir: anyhow::Result<PathBuf>, quiet: bool) -> bool {
    match dir.and_then(|dir| Ok(UploadArea::open(dir)?)) {
        Ok(area) => {
            if !quiet {
                println!("[OK] {}: {}", label, area.root().display());
            }
            true
        }
        Err(e) => {
            if !quiet {
                println!("[!!] {}: Error - {}", label, e);
            }
            false
        }
    }
}

async fn cmd_doctor(quiet: bool) -> anyhow::Result<()> {
    if !quiet {
        println!("Edubot Health Check");
        println!("===================");
        println!();
    }

    let mut all_ok = true;

    let config = match Config::load() {
        Ok(config) => {
            if !quiet {
                println!("[OK] Configuration: Valid");
            }
            config
        }
        Err(e) => {
            if !quiet {
                println!("[!!] Configuration: Error - {}", e);
            }
            return Err(e);
        }
    };

    // A missing key only disables generated answers
    match config.llm.redacted_api_key() {
        Ok(Some(redacted)) => {
            if !quiet {
                println!("[OK] API Key: Configured ({}, model {})", redacted, config.llm.model);
            }
        }
        Ok(None) => {
            warn!("API Key: Not configured");
            if !quiet {
                println!("[--] API Key: Not configured, generated answers are off");
                println!("     Set EDUBOT_API_KEY or GEMINI_API_KEY environment variable");
            }
        }
        Err(e) => {
            all_ok = false;
            if !quiet {
                println!("[!!] API Key: Error - {}", e);
            }
        }
    }

    if !quiet {
        match Config::config_path() {
            Ok(path) if path.exists() => println!("[OK] Config file: {}", path.display()),
            Ok(path) => println!("[--] Config file: {} (using defaults)", path.display()),
            Err(e) => println!("[!!] Config file: Error - {}", e),
        }
    }

    all_ok &= check_area("Upload area", config.upload_dir(), quiet);
    all_ok &= check_area("Curriculum directory", config.curriculum_dir(), quiet);

    let db = match config.database_path() {
        Ok(path) => Database::open(path).await.map_err(anyhow::Error::from),
        Err(e) => Err(e),
    };
    match db {
        Ok(db) => {
            match db.health_check().await {
                Ok(()) => {
                    if !quiet {
                        println!("[OK] Database: {}", db.path().display());
                    }
                }
                Err(e) => {
                    all_ok = false;
                    if !quiet {
                        println!("[!!] Database: Error - {}", e);
                    }
                }
            }
            match db.migration_status().await {
                Ok(status) if !status.needs_migration => {
                    if !quiet {
                        println!("[OK] Schema v{}", status.current_version);
                    }
                }
                Ok(status) => {
                    all_ok = false;
                    if !quiet {
                        println!(
                            "[!!] Schema v{} (expected v{})",
                            status.current_version, status.target_version
                        );
                    }
                }
                Err(e) => {
                    all_ok = false;
                    if !quiet {
                        println!("[!!] Schema: Error - {}", e);
                    }
                }
            }
            match db.summary().await {
                Ok(summary) => {
                    if !quiet {
                        println!(
                            "[OK] Contents: {} grades, {} semesters, {} departments, {} knowledge entries, {} curriculum documents, {} conversations",
                            summary.grades,
                            summary.semesters,
                            summary.departments,
                            summary.knowledge_entries,
                            summary.curriculum_documents,
                            summary.conversations
                        );
                    }
                    if summary.curriculum_documents == 0 && !quiet {
                        println!("[--] No curriculum uploaded yet; generated answers cannot be verified");
                    }
                }
                Err(e) => {
                    all_ok = false;
                    if !quiet {
                        println!("[!!] Contents: Error - {}", e);
                    }
                }
            }
            db.close().await;
        }
        Err(e) => {
            all_ok = false;
            if !quiet {
                println!("[!!] Database: Error - {}", e);
            }
        }
    }

    if !quiet {
        println!();
        if all_ok {
            println!("All checks passed!");
        } else {
            println!("Some checks failed. See above for details.");
        }
    }

    Ok(())
}
