use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use notewell::api::{self, SecurityConfig};
use notewell::bus::EventBus;
use notewell::config::{ClientConfig, ServerConfig, DEFAULT_PORT};
use notewell::db::Database;
use notewell::form::{FormMode, FormState, NoteForm};
use notewell::models::{Note, NoteEvent};
use notewell::remote::{HttpRemote, LocalRemote, RemoteDataService};
use notewell::service::NoteService;
use notewell::store::{NoteStore, ViewState};
use notewell::summarize;
use notewell::ui::{self, Ui, UiEvent};

#[derive(Parser)]
#[command(name = "notewell")]
#[command(about = "Short notes with AI summaries and live updates")]
struct Cli {
    /// Use the local database directly instead of the HTTP API
    #[arg(long, global = true)]
    local: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the notewell API server
    Serve {
        /// Port for HTTP API
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },
    /// Manage users on the local database
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
    /// Store the API URL and token for later commands
    Login {
        #[arg(long)]
        token: String,
        #[arg(long)]
        url: Option<String>,
    },
    /// List notes, optionally filtered
    List {
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Show a single note
    Show { id: String },
    /// Create a note
    New {
        #[arg(short, long)]
        title: String,
        #[arg(short, long)]
        content: String,
        /// Generate an AI summary before saving
        #[arg(long)]
        summarize: bool,
    },
    /// Edit a note
    Edit {
        id: String,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long)]
        content: Option<String>,
        /// Regenerate the AI summary before saving
        #[arg(long)]
        summarize: bool,
    },
    /// Delete a note
    Delete { id: String },
    /// Print changes to your notes as they happen. Needs the HTTP API:
    /// with --local only changes made by this process would be seen.
    Watch,
}

#[derive(Subcommand)]
enum UserCommands {
    /// Create a user and print its API token
    Add { email: String },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "notewell=info,tower_http=info".into()),
    );

    // Logs go to stderr so command output on stdout stays clean
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn open_database(config: &ServerConfig) -> anyhow::Result<Database> {
    let db = match &config.db_path {
        Some(path) => Database::open(path.clone())?,
        None => Database::open_default()?,
    };
    db.migrate()?;
    Ok(db)
}

fn build_service(config: &ServerConfig) -> anyhow::Result<NoteService> {
    let db = open_database(config)?;
    let summarizer = summarize::from_config(&config.summary);
    Ok(NoteService::new(db, EventBus::default(), summarizer))
}

fn build_remote(local: bool) -> anyhow::Result<Arc<dyn RemoteDataService>> {
    let client = ClientConfig::load();
    if !local {
        tracing::debug!(url = %client.base_url, "Using HTTP remote");
        return Ok(Arc::new(HttpRemote::from_config(&client)));
    }

    let service = build_service(&ServerConfig::from_env())?;
    let remote = LocalRemote::new(service.clone());
    if let Some(token) = &client.token {
        match service.authenticate(token)? {
            Some(user) => remote.sign_in(user),
            None => tracing::warn!("Stored token is not known to the local database"),
        }
    }
    Ok(Arc::new(remote))
}

fn print_ui_events(rx: &mut UnboundedReceiver<UiEvent>) {
    for event in ui::drain(rx) {
        match event {
            UiEvent::Notify(notification) => println!("{}", notification),
            UiEvent::Navigate(route) => tracing::info!(path = %route.path(), "Navigate"),
        }
    }
}

fn format_timestamp(note: &Note) -> String {
    note.updated_at.format("%B %-d, %Y %I:%M %p").to_string()
}

fn print_note_line(note: &Note) {
    println!("{}  {}  (updated {})", note.id, note.title, format_timestamp(note));
    println!("    {}", note.summary_or_placeholder());
}

fn print_note(note: &Note) {
    println!("{}", note.title);
    println!("Last updated: {}", format_timestamp(note));
    println!();
    println!("AI Summary: {}", note.summary_or_placeholder());
    println!();
    println!("{}", note.content);
}

async fn run_serve(port: u16) -> anyhow::Result<()> {
    let config = ServerConfig::from_env();
    let service = build_service(&config)?;
    let app =
        api::create_router_with_security(service, SecurityConfig::from_server_config(&config));

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    tracing::info!("notewell server listening on http://127.0.0.1:{}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

async fn run_list(
    remote: Arc<dyn RemoteDataService>,
    search: Option<String>,
) -> anyhow::Result<()> {
    let (ui, mut rx) = Ui::channel();
    let store = NoteStore::new(remote, ui);

    eprintln!("Loading notes...");
    let result = store.load().await;
    print_ui_events(&mut rx);
    result?;

    let query = search.unwrap_or_default();
    let results = store.search(&query);
    match store.view_state() {
        ViewState::Populated(_) if !results.is_empty() => {
            for note in &results {
                print_note_line(note);
            }
        }
        ViewState::Loading => println!("Still loading..."),
        ViewState::Failed(msg) => println!("Could not load notes: {}", msg),
        _ => {
            println!("No notes found");
            if results.is_filtered() {
                println!("Try a different search term or create your first note");
            } else {
                println!("Get started by creating your first note");
            }
        }
    }
    Ok(())
}

async fn run_show(remote: Arc<dyn RemoteDataService>, id: String) -> anyhow::Result<()> {
    if remote.current_user().await?.is_none() {
        anyhow::bail!("Not signed in; run `notewell login --token <token>` first");
    }
    match remote.get_by_id(&id).await? {
        Some(record) => {
            print_note(&notewell::mapper::to_canonical(record));
            Ok(())
        }
        None => anyhow::bail!("Note not found: the note doesn't exist or has been deleted"),
    }
}

async fn run_form(
    remote: Arc<dyn RemoteDataService>,
    mode: FormMode,
    title: Option<String>,
    content: Option<String>,
    summarize: bool,
) -> anyhow::Result<()> {
    let (ui, mut rx) = Ui::channel();
    let form = NoteForm::new(remote, ui, mode);

    let state = form.mount().await;
    print_ui_events(&mut rx);
    if state != FormState::Ready {
        anyhow::bail!("Could not open the note form ({:?})", state);
    }

    if let Some(title) = title {
        form.set_title(title);
    }
    if let Some(content) = content {
        form.set_content(content);
    }

    if summarize {
        let result = form.generate_summary().await;
        print_ui_events(&mut rx);
        result?;
    }

    let result = form.save().await;
    print_ui_events(&mut rx);
    result?;

    if let Some(id) = form.draft().id {
        println!("{}", id);
    }
    Ok(())
}

async fn run_delete(remote: Arc<dyn RemoteDataService>, id: String) -> anyhow::Result<()> {
    let (ui, mut rx) = Ui::channel();
    let store = NoteStore::new(remote, ui);
    let result = store.remove(&id).await;
    print_ui_events(&mut rx);
    Ok(result?)
}

fn ensure_watchable(local: bool) -> anyhow::Result<()> {
    if local {
        anyhow::bail!(
            "`watch` needs the HTTP API; changes from other processes never reach a --local database"
        );
    }
    Ok(())
}

async fn run_watch(remote: Arc<dyn RemoteDataService>) -> anyhow::Result<()> {
    let (ui, mut rx) = Ui::channel();
    let store = NoteStore::new(remote, ui);

    let live = store
        .subscribe_with(|event, changed| {
            let verb = match event {
                NoteEvent::Insert(_) => "inserted",
                NoteEvent::Update(_) => "updated",
                NoteEvent::Delete(_) => "deleted",
            };
            let suffix = if changed { "" } else { " (no change)" };
            println!("{} {}{}", verb, event.note_id(), suffix);
        })
        .await;
    print_ui_events(&mut rx);
    let live = live?;

    let result = store.load().await;
    print_ui_events(&mut rx);
    result?;
    for note in store.notes() {
        print_note_line(&note);
    }
    eprintln!("Watching for changes, Ctrl-C to stop");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Stopping watch");
        }
        _ = live.closed() => {
            tracing::warn!("Change feed ended");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Commands::Serve { port } => run_serve(port).await,
        Commands::User {
            command: UserCommands::Add { email },
        } => {
            let db = open_database(&ServerConfig::from_env())?;
            let provisioned = db.create_user(&email)?;
            tracing::info!(user = %provisioned.user.id, "User created");
            println!("{}", provisioned.token);
            Ok(())
        }
        Commands::Login { token, url } => {
            let mut config = ClientConfig::load();
            config.token = Some(token);
            if let Some(url) = url {
                config.base_url = url;
            }
            let path = config.save()?;
            println!("Saved credentials to {}", path.display());
            Ok(())
        }
        Commands::List { search } => run_list(build_remote(cli.local)?, search).await,
        Commands::Show { id } => run_show(build_remote(cli.local)?, id).await,
        Commands::New {
            title,
            content,
            summarize,
        } => {
            run_form(
                build_remote(cli.local)?,
                FormMode::New,
                Some(title),
                Some(content),
                summarize,
            )
            .await
        }
        Commands::Edit {
            id,
            title,
            content,
            summarize,
        } => {
            run_form(
                build_remote(cli.local)?,
                FormMode::Edit(id),
                title,
                content,
                summarize,
            )
            .await
        }
        Commands::Delete { id } => run_delete(build_remote(cli.local)?, id).await,
        Commands::Watch => {
            ensure_watchable(cli.local)?;
            run_watch(build_remote(cli.local)?).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watch_refuses_the_local_database() {
        let err = ensure_watchable(true).unwrap_err();
        assert!(err.to_string().contains("HTTP API"));
        assert!(ensure_watchable(false).is_ok());
    }

    #[test]
    fn local_flag_parses_after_the_binary_name() {
        let cli = Cli::try_parse_from(["notewell", "--local", "watch"]).unwrap();
        assert!(cli.local);
        assert!(matches!(cli.command, Commands::Watch));
    }
}
