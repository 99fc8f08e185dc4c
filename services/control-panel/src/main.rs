use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use control_panel::io::{HttpClient, ReqwestHttpClient};
use control_panel::settings::form_data_from_pairs;
use control_panel::session::forward_output;
use control_panel::{
    load_config, ClientId, Config, ControlAction, ControlApi, ControlPanelError, LoginPage,
    Session,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, Level};

const CLIENT_ID_TIMEOUT: Duration = Duration::from_secs(10);
const STATUS_POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Output arriving this long after the request finished is still printed
const OUTPUT_QUIET: Duration = Duration::from_millis(500);
const OUTPUT_DRAIN_LIMIT: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "control-panel")]
#[command(about = "Command line control panel for Polypheny-Control")]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Polypheny-Control host
    #[arg(long)]
    host: Option<String>,

    /// Polypheny-Control port
    #[arg(long)]
    port: Option<u16>,

    /// User name for Basic auth
    #[arg(short, long)]
    user: Option<String>,

    /// Password for Basic auth
    #[arg(long)]
    password: Option<String>,

    /// Log level
    #[arg(short, long, default_value = "info", value_parser = clap::value_parser!(Level))]
    log_level: Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether the current session is already authenticated
    Check,

    /// Log in with the configured credentials
    Login,

    /// Show the status of Polypheny-DB
    Status,

    /// Show the checked out branches and commits
    Version,

    /// Start Polypheny-DB
    Start,

    /// Stop Polypheny-DB
    Stop,

    /// Restart Polypheny-DB
    Restart,

    /// Update Polypheny-DB and Polypheny-UI; only from idling, waits until done
    Update,

    /// Purge the Polypheny home folder
    Purge,

    /// Control the polyfier mode
    Polyfier {
        #[command(subcommand)]
        command: PolyfierCommands,
    },

    /// List the available branches
    Branches,

    /// Read or change the configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Follow the server's push messages until Ctrl+C
    Watch,
}

#[derive(Subcommand)]
enum PolyfierCommands {
    /// Start polyfier mode
    Start,
    /// Stop polyfier mode immediately
    StopForcefully,
    /// Let the current polyfier job finish, then stop
    StopGracefully,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the current configuration
    Get,
    /// Set configuration values
    Set {
        /// Entries as KEY=VALUE; `[..]` values are sent as lists
        #[arg(required = true, value_parser = parse_key_value)]
        entries: Vec<(String, String)>,
    },
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    if key.is_empty() {
        return Err(format!("empty key in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    debug!(
        "Parsed command line arguments: host={:?}, port={:?}, log_level={:?}",
        args.host, args.port, args.log_level
    );

    let mut config = if let Some(config_path) = &args.config {
        debug!("Loading configuration from {:?}", config_path);
        load_config(config_path)?
    } else {
        Config::default()
    };
    config.resolve_secrets()?;

    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(user) = args.user {
        config.credentials.username = Some(user);
    }
    if let Some(password) = args.password {
        config.credentials.password = Some(password);
    }

    match args.command {
        Commands::Check => run_check(&config).await?,
        Commands::Login => run_login(&config).await?,
        Commands::Status => {
            let api = rest_api(&config).await?;
            println!("{}", api.status(ClientId::default()).await?);
        }
        Commands::Version => run_version(&config).await?,
        Commands::Start => run_action(&config, ControlAction::Start).await?,
        Commands::Stop => run_action(&config, ControlAction::Stop).await?,
        Commands::Restart => run_action(&config, ControlAction::Restart).await?,
        Commands::Update => run_action(&config, ControlAction::Update).await?,
        Commands::Purge => run_action(&config, ControlAction::PurgePolyphenyFolder).await?,
        Commands::Polyfier { command } => {
            let action = match command {
                PolyfierCommands::Start => ControlAction::PolyfierStart,
                PolyfierCommands::StopForcefully => ControlAction::PolyfierStopForcefully,
                PolyfierCommands::StopGracefully => ControlAction::PolyfierStopGracefully,
            };
            run_action(&config, action).await?;
        }
        Commands::Branches => run_branches(&config).await?,
        Commands::Config { command } => match command {
            ConfigCommands::Get => run_config_get(&config).await?,
            ConfigCommands::Set { entries } => run_config_set(&config, &entries).await?,
        },
        Commands::Watch => control_panel::run(config).await?,
    }

    Ok(())
}

fn http_client() -> Result<Arc<dyn HttpClient>, ControlPanelError> {
    Ok(Arc::new(ReqwestHttpClient::new()?))
}

/// REST client that is already logged in when credentials are configured
async fn rest_api(config: &Config) -> Result<ControlApi, ControlPanelError> {
    let mut api = ControlApi::new(config.server.base_url(), http_client()?);
    if let Some((username, password)) = config.credentials.pair() {
        api = api.with_credentials(username, password);
    }
    api.login().await?;
    Ok(api)
}

async fn run_check(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut page = LoginPage::new(config.server.base_url(), http_client()?);
    if page.check_authentication().await {
        println!("authenticated");
    } else {
        println!("not authenticated");
    }
    Ok(())
}

async fn run_login(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let (username, password) = config.credentials.pair().ok_or_else(|| {
        ControlPanelError::Config("login needs a user name and a password".to_string())
    })?;

    let mut page = LoginPage::new(config.server.base_url(), http_client()?);
    if !page.login(username, password).await {
        return Err(ControlPanelError::Authentication("invalid credentials".to_string()).into());
    }
    info!("Logged in to {}", config.server.base_url());
    Ok(())
}

async fn run_version(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let api = rest_api(config).await?;
    let id = ClientId::default();
    println!("Control: {}", api.control_version(id).await?);

    let version = api.version(id).await?;
    println!(
        "PDB: {} @ {} ({} behind)",
        version.pdb_branch, version.pdb_commit, version.pdb_behind
    );
    println!(
        "PUI: {} @ {} ({} behind)",
        version.pui_branch, version.pui_commit, version.pui_behind
    );
    Ok(())
}

async fn run_branches(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let api = rest_api(config).await?;
    let id = ClientId::default();
    println!("Polypheny-DB:");
    for branch in api.pdb_branches(id).await? {
        println!("  {}", branch);
    }
    println!("Polypheny-UI:");
    for branch in api.pui_branches(id).await? {
        println!("  {}", branch);
    }
    Ok(())
}

async fn run_config_get(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let api = rest_api(config).await?;
    for (key, value) in api.get_config(ClientId::default()).await? {
        println!("{} = {}", key, value);
    }
    Ok(())
}

async fn run_config_set(
    config: &Config,
    entries: &[(String, String)],
) -> Result<(), Box<dyn std::error::Error>> {
    let api = rest_api(config).await?;
    let data = form_data_from_pairs(entries.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    api.set_config(ClientId::default(), &data).await?;
    info!("Updated {} configuration entries", data.len());
    Ok(())
}

/// Control actions report their progress to the requesting socket client, so
/// they are sent from a live session and its output is printed meanwhile
async fn run_action(
    config: &Config,
    action: ControlAction,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = Session::from_config(config)?;
    let output = session.subscribe();
    session.open().await?;

    let client_id = session.wait_for_client_id(CLIENT_ID_TIMEOUT).await?;
    debug!("Sending {:?} as client {}", action, client_id);

    let sent = CancellationToken::new();
    let mut printer = tokio::spawn(forward_output(
        output,
        sent.clone(),
        OUTPUT_QUIET,
        |_, line| println!("{}", line),
    ));

    let api = session.api();
    let result = match action {
        ControlAction::Update => match api.start_update(client_id).await {
            Ok(()) => {
                info!("Update started, waiting for Polypheny-DB to become idle");
                api.wait_until_idle(client_id, STATUS_POLL_INTERVAL).await
            }
            Err(e) => Err(e),
        },
        _ => api.send(action, client_id).await,
    };

    sent.cancel();
    if tokio::time::timeout(OUTPUT_DRAIN_LIMIT, &mut printer)
        .await
        .is_err()
    {
        debug!("Output still streaming, stopping the printer");
        printer.abort();
    }
    session.shutdown().await;

    result?;
    info!("{} finished", action.path());
    Ok(())
}
