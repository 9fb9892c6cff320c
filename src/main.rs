//! IntelliReport CLI
//!
//! Command-line client for the IntelliReport API:
//! - Log in and manage the session
//! - Upload CSV sales data
//! - Browse the dashboard and reports
//! - Generate and download PDF reports

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use intellireport::output::{self, OutputFormat};
use intellireport::{
    ApiError, AuthContext, AuthService, AuthenticatedClient, Config, Credentials, FileService,
    GuardDecision, LoggingConfig, Navigator, ProfileUpdate, Registration, ReportService, Route,
    RouteGuard, SessionStore,
};

#[derive(Parser)]
#[command(name = "intellireport")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Sales analytics from your CSV files")]
#[command(long_about = "IntelliReport turns CSV sales data into reports.\nUpload files, browse dashboards and export PDF reports.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// API base URL (overrides config)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table, global = true)]
    pub format: OutputFormat,

    /// Config file (default: standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(flatten)]
    Api(ApiCommand),

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Commands that talk to the API
#[derive(Subcommand)]
pub enum ApiCommand {
    /// Log in with email and password
    Login {
        email: String,
        /// Password (default: INTELLIREPORT_PASSWORD, else read from stdin;
        /// the prompt echoes what you type)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Create an account and log in
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        company: Option<String>,
        #[arg(long)]
        position: Option<String>,
        /// Password (default: INTELLIREPORT_PASSWORD, else read from stdin;
        /// the prompt echoes what you type)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Log out and forget the stored session
    Logout,

    /// Show the logged-in user
    Whoami,

    /// Manage the user profile
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// Upload a CSV file for processing
    Upload {
        /// Path to the CSV file
        path: PathBuf,
    },

    /// Manage uploaded files
    Files {
        #[command(subcommand)]
        action: FilesAction,
    },

    /// Show aggregate statistics and recent reports
    Dashboard,

    /// Browse reports and export PDFs
    Reports {
        #[command(subcommand)]
        action: ReportsAction,
    },
}

#[derive(Subcommand)]
pub enum ProfileAction {
    /// Show the profile as stored on the server
    Show,
    /// Change profile fields; unset flags are left alone
    Update {
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        company: Option<String>,
        #[arg(long)]
        position: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum FilesAction {
    /// List uploaded files
    List,
    /// Delete a file and its report
    Delete { id: u64 },
    /// Recompute the report for a file
    Reprocess { id: u64 },
}

#[derive(Subcommand)]
pub enum ReportsAction {
    /// List reports
    List,
    /// Show a report with its chart series
    Show { id: u64 },
    /// Generate the PDF for a report
    Pdf {
        id: u64,
        /// Discard an existing PDF and render it again
        #[arg(long)]
        regenerate: bool,
    },
    /// Download the PDF for a report
    Download {
        id: u64,
        /// Output file (default: report_<id>.pdf)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Nothing to switch to; the login hint is part of the error message
struct CliNavigator;

impl Navigator for CliNavigator {
    fn navigate(&self, route: Route) {
        tracing::debug!(route = %route, "Redirect");
    }
}

struct App {
    auth: Arc<AuthContext>,
    navigator: Arc<CliNavigator>,
    client: Arc<AuthenticatedClient>,
    config: Config,
    format: OutputFormat,
}

impl App {
    /// Fail fast on protected commands when there is no usable session
    fn guard(&self, route: Route) -> anyhow::Result<()> {
        match RouteGuard::new(&self.auth, self.navigator.as_ref()).enter(route) {
            GuardDecision::Render(_) => Ok(()),
            GuardDecision::Redirect(_) | GuardDecision::Loading => {
                Err(ApiError::NotAuthenticated.into())
            }
        }
    }

    fn auth_service(&self) -> AuthService {
        AuthService::new(self.client.clone())
    }

    fn file_service(&self) -> FileService {
        FileService::new(self.client.clone(), self.config.upload.max_size_bytes)
    }

    fn report_service(&self) -> ReportService {
        ReportService::new(self.client.clone())
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        eprintln!("Error: {}", error_message(&err));
        std::process::exit(1);
    }
}

/// One line for the terminal; session problems point at `login`
fn error_message(err: &anyhow::Error) -> String {
    match err.downcast_ref::<ApiError>() {
        Some(api) if api.requires_login() => format!(
            "{}. Run `intellireport login <email>` to continue.",
            api.user_message().trim_end_matches('.')
        ),
        Some(api) => api.user_message(),
        None => format!("{:#}", err),
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    if let Some(url) = cli.api_url {
        config.api.base_url = url;
    }

    init_logging(&config.logging);
    tracing::debug!(api = %config.api.base_url, "IntelliReport CLI v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Config { output } => write_default_config(output.as_deref()),
        Commands::Api(command) => {
            let app = App::new(config, cli.format)?;
            app.dispatch(command).await
        }
    }
}

impl App {
    /// Load the stored session and bind a client to it
    fn new(config: Config, format: OutputFormat) -> anyhow::Result<Self> {
        let auth = Arc::new(AuthContext::new(SessionStore::file(config.session.path())));
        auth.initialize();

        let navigator = Arc::new(CliNavigator);
        let client = Arc::new(AuthenticatedClient::new(
            &config.api,
            auth.clone(),
            navigator.clone(),
        )?);

        Ok(Self {
            auth,
            navigator,
            client,
            config,
            format,
        })
    }

    async fn dispatch(&self, command: ApiCommand) -> anyhow::Result<()> {
        let stdout = io::stdout();
        let mut out = stdout.lock();

        match command {
            ApiCommand::Login { email, password } => {
                let password = read_password(password)?;
                let auth = self
                    .auth_service()
                    .login(&Credentials { email, password })
                    .await?;
                writeln!(out, "Logged in as {}", auth.user.display_name())?;
            }

            ApiCommand::Register {
                email,
                username,
                first_name,
                last_name,
                company,
                position,
                password,
            } => {
                let password = read_password(password)?;
                let auth = self
                    .auth_service()
                    .register(&Registration {
                        email,
                        username,
                        first_name,
                        last_name,
                        company,
                        position,
                        password_confirm: password.clone(),
                        password,
                    })
                    .await?;
                writeln!(out, "Account created, logged in as {}", auth.user.display_name())?;
            }

            ApiCommand::Logout => {
                self.auth_service().logout().await;
                writeln!(out, "Logged out")?;
            }

            ApiCommand::Whoami => {
                self.guard(Route::Profile)?;
                let user = match self.auth.user() {
                    Some(user) => user,
                    None => bail!("no cached profile"),
                };
                match self.format {
                    OutputFormat::Json => output::write_json(&mut out, &user)?,
                    _ => output::write_user(&mut out, &user)?,
                }
            }

            ApiCommand::Profile { action } => {
                self.guard(Route::Profile)?;
                let user = match action {
                    ProfileAction::Show => self.auth_service().profile().await?,
                    ProfileAction::Update {
                        username,
                        first_name,
                        last_name,
                        company,
                        position,
                    } => {
                        let update = ProfileUpdate {
                            username,
                            first_name,
                            last_name,
                            company,
                            position,
                        };
                        if update.is_empty() {
                            bail!("nothing to update, pass at least one field");
                        }
                        self.auth_service().update_profile(&update).await?
                    }
                };
                match self.format {
                    OutputFormat::Json => output::write_json(&mut out, &user)?,
                    _ => output::write_user(&mut out, &user)?,
                }
            }

            ApiCommand::Upload { path } => {
                self.guard(Route::Upload)?;
                let uploaded = self.file_service().upload_path(&path).await?;
                match self.format {
                    OutputFormat::Json => output::write_json(&mut out, &uploaded)?,
                    _ => writeln!(
                        out,
                        "Uploaded {} ({}), report #{}",
                        uploaded.csv_file.original_name, uploaded.csv_file.status, uploaded.report_id
                    )?,
                }
            }

            ApiCommand::Files { action } => {
                self.guard(Route::Upload)?;
                let files = self.file_service();
                match action {
                    FilesAction::List => {
                        let list = files.list().await?;
                        output::write_files(&mut out, &list, self.format)?;
                    }
                    FilesAction::Delete { id } => {
                        let ack = files.delete(id).await?;
                        writeln!(out, "{}", ack.message)?;
                    }
                    FilesAction::Reprocess { id } => {
                        let ack = files.reprocess(id).await?;
                        writeln!(out, "{} (report #{})", ack.message, ack.report_id)?;
                    }
                }
            }

            ApiCommand::Dashboard => {
                self.guard(Route::Dashboard)?;
                let dashboard = self.report_service().dashboard().await?;
                output::write_dashboard(&mut out, &dashboard, self.format)?;
            }

            ApiCommand::Reports { action } => {
                let reports = self.report_service();
                match action {
                    ReportsAction::List => {
                        self.guard(Route::Reports)?;
                        let list = reports.list().await?;
                        output::write_reports(&mut out, &list, self.format)?;
                    }
                    ReportsAction::Show { id } => {
                        self.guard(Route::ReportDetail(id))?;
                        let report = reports.get(id).await?;
                        output::write_report(&mut out, &report, self.format)?;
                    }
                    ReportsAction::Pdf { id, regenerate } => {
                        self.guard(Route::ReportDetail(id))?;
                        let pdf = if regenerate {
                            reports.regenerate_pdf(id).await?
                        } else {
                            reports.generate_pdf(id).await?
                        };
                        writeln!(out, "{}", pdf.pdf_url)?;
                    }
                    ReportsAction::Download { id, output } => {
                        self.guard(Route::ReportDetail(id))?;
                        let bytes = reports.download_pdf(id).await?;
                        let path = output.unwrap_or_else(|| PathBuf::from(format!("report_{id}.pdf")));
                        std::fs::write(&path, &bytes)
                            .with_context(|| format!("writing {}", path.display()))?;
                        writeln!(out, "Saved {} bytes to {:?}", bytes.len(), path)?;
                    }
                }
            }
        }

        Ok(())
    }
}

/// Structured logging to stderr; `RUST_LOG` wins over the configured level
fn init_logging(logging: &LoggingConfig) {
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(format!("intellireport={}", logging.level)));

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .init();
    }
}

fn read_password(given: Option<String>) -> anyhow::Result<String> {
    if let Some(password) = given.or_else(|| std::env::var("INTELLIREPORT_PASSWORD").ok()) {
        return Ok(password);
    }

    eprint!("Password: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn write_default_config(output: Option<&Path>) -> anyhow::Result<()> {
    let config = intellireport::config::generate_default_config();

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &config)?;
            println!("Config written to {:?}", path);
        }
        None => {
            print!("{}", config);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_config_parsed_outside_api_commands() {
        let cli = Cli::try_parse_from(["intellireport", "config"]).unwrap();
        assert!(matches!(cli.command, Commands::Config { output: None }));

        let cli = Cli::try_parse_from(["intellireport", "dashboard"]).unwrap();
        assert!(matches!(cli.command, Commands::Api(ApiCommand::Dashboard)));
    }

    #[test]
    fn test_login_hint_printed_once() {
        let message = error_message(&ApiError::NotAuthenticated.into());
        assert_eq!(message.matches("intellireport login").count(), 1);
        assert!(message.starts_with("Not authenticated, please log in."));
    }

    #[test]
    fn test_server_message_verbatim() {
        let err = ApiError::Server {
            status: 400,
            message: "Archivo inválido".to_string(),
        };
        assert_eq!(error_message(&err.into()), "Archivo inválido");
    }
}
