use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use cloudsec_console::components::header::{MenuAction, run_menu_action, user_label};
use cloudsec_console::config::ConfigError;
use cloudsec_console::identity::{FileStorage, SupabaseAuth};
use cloudsec_console::net::types::ContactForm;
use cloudsec_console::pages::aws_account::AwsAccountPage;
use cloudsec_console::pages::cspm::CspmPage;
use cloudsec_console::pages::cwpp::CwppPage;
use cloudsec_console::pages::dashboard::DashboardPage;
use cloudsec_console::pages::history::{self, HistoryPage};
use cloudsec_console::pages::login::{LoginMode, LoginPage};
use cloudsec_console::pages::profile::ProfilePage;
use cloudsec_console::pages::reset_password::ResetPasswordPage;
use cloudsec_console::routes::Route;
use cloudsec_console::state::request::RequestState;
use cloudsec_console::util::auth::{GateDecision, gate};
use cloudsec_console::util::export::{Download, ExportError};
use cloudsec_console::{ApiClient, ApiError, ConsoleConfig, SessionManager, SessionStore};
use serde_json::Value;
use time::OffsetDateTime;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("not signed in; run `cloudsec login` first")]
    NotSignedIn,
    #[error("{0}")]
    Failed(String),
    #[error("backend request failed: {0}")]
    Api(#[from] ApiError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Global settings. Each flag overrides the environment variable of the same
/// name; `.env` is loaded first.
#[derive(Parser, Debug)]
#[command(name = "cloudsec", about = "CloudSec scanning console CLI")]
struct Cli {
    /// Backend base URL [env: CLOUDSEC_API_BASE_URL, default: http://localhost:8000]
    #[arg(long)]
    api_base_url: Option<String>,

    /// [env: SUPABASE_URL]
    #[arg(long)]
    supabase_url: Option<String>,

    /// [env: SUPABASE_ANON_KEY]
    #[arg(long)]
    supabase_anon_key: Option<String>,

    /// Session file [env: CLOUDSEC_SESSION_FILE, default: <config dir>/cloudsec/session.json]
    #[arg(long)]
    session_file: Option<PathBuf>,

    /// [env: CLOUDSEC_RESET_REDIRECT_URL]
    #[arg(long)]
    reset_redirect_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    /// Flag value for a config variable, if the flag was given.
    fn flag(&self, var: &str) -> Option<String> {
        match var {
            "CLOUDSEC_API_BASE_URL" => self.api_base_url.clone(),
            "SUPABASE_URL" => self.supabase_url.clone(),
            "SUPABASE_ANON_KEY" => self.supabase_anon_key.clone(),
            "CLOUDSEC_SESSION_FILE" => self.session_file.as_ref().map(|p| p.display().to_string()),
            "CLOUDSEC_RESET_REDIRECT_URL" => self.reset_redirect_url.clone(),
            _ => None,
        }
    }

    /// Flags first, then the environment.
    fn config(&self) -> Result<ConsoleConfig, ConfigError> {
        ConsoleConfig::from_lookup(|var| self.flag(var).or_else(|| std::env::var(var).ok()))
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    Login(Credentials),
    Signup(Credentials),
    Logout,
    /// Send a reset e-mail, or set a new password on a recovery session.
    ResetPassword(ResetArgs),
    Whoami,
    Stats,
    Scan(ScanCommand),
    History(HistoryArgs),
    AwsAccount(AwsAccountCommand),
    Violations,
    Contact(ContactArgs),
    Profile {
        #[arg(long)]
        name: Option<String>,
    },
}

#[derive(Args, Debug)]
struct Credentials {
    #[arg(long)]
    email: String,

    #[arg(long, env = "CLOUDSEC_PASSWORD", hide_env_values = true)]
    password: String,
}

#[derive(Args, Debug)]
struct ResetArgs {
    #[arg(long, required_unless_present = "new_password", conflicts_with = "new_password")]
    email: Option<String>,

    #[arg(long)]
    new_password: Option<String>,
}

#[derive(Args, Debug)]
struct ScanCommand {
    #[command(subcommand)]
    command: ScanSubcommand,
}

#[derive(Subcommand, Debug)]
enum ScanSubcommand {
    Cspm {
        #[arg(long, default_value_t = false)]
        multi: bool,
        #[arg(long, help = "Write a JSON export into this directory")]
        out: Option<PathBuf>,
    },
    Cwpp {
        #[arg(long, help = "Write a CSV export into this directory")]
        out: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Json,
    Csv,
}

#[derive(Args, Debug)]
struct HistoryArgs {
    #[arg(long, default_value_t = false)]
    multi: bool,

    #[arg(long)]
    scan_type: Option<String>,

    #[arg(long, value_enum, default_value = "json")]
    format: Format,

    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct AwsAccountCommand {
    #[command(subcommand)]
    command: AwsAccountSubcommand,
}

#[derive(Subcommand, Debug)]
enum AwsAccountSubcommand {
    Show,
    Set { account_id: String, role_arn: String },
}

#[derive(Args, Debug)]
struct ContactArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    subject: String,
    #[arg(long)]
    message: String,
}

struct CliContext {
    api: ApiClient,
    manager: SessionManager,
}

impl CliContext {
    fn store(&self) -> &SessionStore {
        self.manager.store()
    }

    /// Apply the navigation gate for `route`; the session check has already
    /// settled, so `Loading` never comes back here.
    fn require(&self, route: Route) -> Result<(), CliError> {
        match gate(route, &self.manager.state()) {
            GateDecision::Redirect(Route::Login) => Err(CliError::NotSignedIn),
            GateDecision::Redirect(_) | GateDecision::Loading | GateDecision::Render => Ok(()),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = cli.config()?;
    let ctx = connect(config).await;
    match cli.command {
        Command::Login(creds) => run_login(&ctx, LoginMode::SignIn, creds).await,
        Command::Signup(creds) => run_login(&ctx, LoginMode::SignUp, creds).await,
        Command::Logout => run_logout(&ctx).await,
        Command::ResetPassword(args) => run_reset(&ctx, args).await,
        Command::Whoami => run_whoami(&ctx),
        Command::Stats => run_stats(&ctx).await,
        Command::Scan(scan) => run_scan(&ctx, scan).await,
        Command::History(args) => run_history(&ctx, args).await,
        Command::AwsAccount(account) => run_aws_account(&ctx, account).await,
        Command::Violations => run_violations(&ctx).await,
        Command::Contact(args) => run_contact(&ctx, args).await,
        Command::Profile { name } => run_profile(&ctx, name).await,
    }
}

/// Mount the session manager over the file-backed provider and wait for the
/// stored session to be checked (and refreshed when close to expiry).
async fn connect(config: ConsoleConfig) -> CliContext {
    let storage = Arc::new(FileStorage::new(config.session_path()));
    let provider = Arc::new(SupabaseAuth::new(&config.supabase_url, &config.supabase_anon_key, storage));
    let manager = SessionManager::mount(provider, SessionStore::new()).with_reset_redirect(config.reset_redirect_url);
    manager.settled().await;
    CliContext { api: ApiClient::new(&config.api_base_url), manager }
}

async fn run_login(ctx: &CliContext, mode: LoginMode, creds: Credentials) -> Result<(), CliError> {
    let mut page = LoginPage { email: creds.email, password: creds.password, mode, ..LoginPage::default() };
    let next = page.submit(&ctx.manager).await;
    report(&page.request)?;
    if let Some(route) = next {
        println!("signed in as {}", user_label(ctx.manager.state().user()));
        tracing::debug!(route = route.path(), "login complete");
    }
    Ok(())
}

async fn run_logout(ctx: &CliContext) -> Result<(), CliError> {
    let route = run_menu_action(MenuAction::SignOut, &ctx.manager).await;
    tracing::debug!(route = route.path(), "signed out");
    println!("signed out");
    Ok(())
}

async fn run_reset(ctx: &CliContext, args: ResetArgs) -> Result<(), CliError> {
    if let Some(password) = args.new_password {
        let mut page = ResetPasswordPage { confirm: password.clone(), password, ..ResetPasswordPage::default() };
        page.submit(&ctx.manager).await;
        return report(&page.request);
    }

    let mut page = LoginPage { mode: LoginMode::Reset, reset_email: args.email.unwrap_or_default(), ..LoginPage::default() };
    page.submit(&ctx.manager).await;
    report(&page.request)
}

fn run_whoami(ctx: &CliContext) -> Result<(), CliError> {
    ctx.require(Route::Profile)?;
    let state = ctx.manager.state();
    println!("{}", user_label(state.user()));
    Ok(())
}

async fn run_stats(ctx: &CliContext) -> Result<(), CliError> {
    ctx.require(Route::Dashboard)?;
    let mut page = DashboardPage::default();
    page.load(&ctx.api, ctx.store()).await;
    report(&page.load)?;
    print_json(&serde_json::to_value(&page.stats)?)
}

async fn run_scan(ctx: &CliContext, scan: ScanCommand) -> Result<(), CliError> {
    let now = OffsetDateTime::now_utc();
    match scan.command {
        ScanSubcommand::Cspm { multi, out } => {
            ctx.require(Route::Cspm)?;
            let mut page = CspmPage { multi_tenant: multi, ..CspmPage::default() };
            page.scan(&ctx.api, ctx.store()).await;
            report(&page.request)?;
            if let Some(results) = &page.results {
                print_json(results)?;
            }
            if let Some(dir) = out {
                save(page.export_json(now)?, &dir).await?;
            }
            Ok(())
        }
        ScanSubcommand::Cwpp { out } => {
            ctx.require(Route::Cwpp)?;
            let mut page = CwppPage::default();
            page.scan(&ctx.api, ctx.store()).await;
            report(&page.request)?;
            if let Some(results) = &page.results {
                print_json(results)?;
            }
            if let Some(dir) = out {
                save(page.export_csv(now), &dir).await?;
            }
            Ok(())
        }
    }
}

async fn run_history(ctx: &CliContext, args: HistoryArgs) -> Result<(), CliError> {
    ctx.require(Route::History)?;
    let mut page = HistoryPage { multi_tenant: args.multi, scan_type: args.scan_type, ..HistoryPage::default() };
    page.load(&ctx.api, ctx.store()).await;
    report(&page.request)?;
    if page.is_empty() {
        println!("{}", history::EMPTY);
        return Ok(());
    }

    let download = match args.format {
        Format::Json => page.export_json()?,
        Format::Csv => match page.export_csv() {
            Some(download) => download,
            None => return Ok(()),
        },
    };
    match args.out {
        Some(dir) => save(Some(download), &dir).await,
        None => {
            println!("{}", download.body);
            Ok(())
        }
    }
}

async fn run_aws_account(ctx: &CliContext, account: AwsAccountCommand) -> Result<(), CliError> {
    ctx.require(Route::AwsAccount)?;
    let mut page = AwsAccountPage::default();
    match account.command {
        AwsAccountSubcommand::Show => {
            page.load(&ctx.api, ctx.store()).await;
            report(&page.request)?;
            match &page.existing {
                Some(existing) => print_json(&serde_json::to_value(existing)?),
                None => {
                    println!("no AWS account configured");
                    Ok(())
                }
            }
        }
        AwsAccountSubcommand::Set { account_id, role_arn } => {
            page.account_id = account_id;
            page.role_arn = role_arn;
            page.submit(&ctx.api, ctx.store()).await;
            report(&page.request)
        }
    }
}

async fn run_violations(ctx: &CliContext) -> Result<(), CliError> {
    ctx.require(Route::Dashboard)?;
    let token = ctx.store().access_token().ok_or(CliError::NotSignedIn)?;
    let response = ctx.api.policy_violations(&token).await?;
    if let Some(error) = response.error.filter(|_| response.status.as_deref() != Some("ok")) {
        return Err(CliError::Failed(error));
    }
    print_json(&Value::Array(response.violations))
}

async fn run_contact(ctx: &CliContext, args: ContactArgs) -> Result<(), CliError> {
    ctx.require(Route::Dashboard)?;
    let mut page = DashboardPage {
        contact: ContactForm { name: args.name, email: args.email, subject: args.subject, message: args.message },
        ..DashboardPage::default()
    };
    page.send_contact(&ctx.api, ctx.store()).await;
    report(&page.contact_request)
}

async fn run_profile(ctx: &CliContext, name: Option<String>) -> Result<(), CliError> {
    ctx.require(Route::Profile)?;
    let state = ctx.manager.state();
    let mut page = ProfilePage::from_user(state.user());
    if let Some(name) = name {
        page.name = name;
        page.save(&ctx.manager).await;
        report(&page.request)?;
    }
    println!("name:  {}", page.name);
    println!("email: {}", page.email);
    Ok(())
}

/// Turn a page's request state into the command outcome, echoing any notice.
fn report(request: &RequestState) -> Result<(), CliError> {
    if let Some(error) = &request.error {
        return Err(CliError::Failed(error.clone()));
    }
    if let Some(notice) = &request.notice {
        println!("{notice}");
    }
    Ok(())
}

async fn save(download: Option<Download>, dir: &Path) -> Result<(), CliError> {
    let Some(download) = download else {
        eprintln!("nothing to export");
        return Ok(());
    };
    let path = download.write_to(dir).await?;
    eprintln!("wrote {}", path.display());
    Ok(())
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
