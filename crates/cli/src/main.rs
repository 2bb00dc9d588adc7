//! StreetGasm CLI - club dashboard data from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Active members, page 2
//! sg-cli members --status active --page 2 --per-page 10
//!
//! # Overview: stats, active subscriptions and latest orders
//! sg-cli dashboard
//!
//! # Who drives what, and where
//! sg-cli garage --brand Porsche
//! sg-cli network --search utrecht
//!
//! # Membership applications
//! sg-cli approvals list
//! sg-cli approvals approve 7d1f6e4c-8a7b-4a44-bb0e-2f2f1b9c0a01 --notes "Welcome"
//!
//! # Resync everything from the shop
//! sg-cli sync all
//! ```
//!
//! # Output
//!
//! Every command prints pretty JSON on stdout. Logs go to stderr
//! (`RUST_LOG`, default `info`; `SG_LOG_FORMAT=json` for JSON lines).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Args, Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use streetgasm_core::{ApprovalStatus, EmailDigest, ListParams, SyncEntity, Theme};
use streetgasm_dashboard::aux_store::{DEFAULT_ACTIVITY_LIMIT, RowId};
use streetgasm_dashboard::{AppState, DashboardConfig, DashboardError};

mod commands;

#[derive(Parser)]
#[command(name = "sg-cli")]
#[command(author, version, about = "StreetGasm club dashboard CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List members (subscriptions shown as members)
    Members(ListArgs),
    /// Show one member
    Member {
        /// Subscription ID
        id: i64,
    },
    /// List raw subscriptions
    Subscriptions(ListArgs),
    /// List orders (no search)
    Orders(ListArgs),
    /// List events (products, no status filter)
    Events(ListArgs),
    /// List customers (no status filter)
    Customers(ListArgs),
    /// Dashboard totals and per-status subscription counts
    Stats,
    /// Overview: stats, active subscriptions and latest orders
    Dashboard,
    /// Revenue, growth and status breakdown over the latest records
    Analytics,
    /// Member distribution by country, city and car brand
    Network(MemberFilterArgs),
    /// Member cars
    Garage(MemberFilterArgs),
    /// Trigger a backend sync
    Sync {
        /// Entity to sync (`all`, `subscriptions`, `customers`, `orders`, `products`)
        #[arg(default_value = "all")]
        entity: SyncEntity,
    },
    /// Recent sync runs
    SyncStatus,
    /// Membership applications
    Approvals {
        #[command(subcommand)]
        action: ApprovalAction,
    },
    /// Favorite members
    Favorites {
        #[command(subcommand)]
        action: FavoriteAction,
    },
    /// Recent activity of this installation
    Activity {
        #[arg(short, long, default_value_t = DEFAULT_ACTIVITY_LIMIT)]
        limit: u32,
    },
    /// Preferences kept in the auxiliary store
    Preferences {
        #[command(subcommand)]
        action: PreferencesAction,
    },
    /// Local dashboard settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Show the soft user id of this installation
    Whoami,
}

/// Pagination and filter arguments shared by list commands.
#[derive(Args, Debug, Clone)]
struct ListArgs {
    #[arg(long, default_value_t = 1)]
    page: u32,

    #[arg(long, default_value_t = 20)]
    per_page: u32,

    /// Free-text search
    #[arg(short, long)]
    search: Option<String>,

    /// Backend status (e.g. `active`, `on-hold`, `cancelled`)
    #[arg(long)]
    status: Option<String>,
}

impl ListArgs {
    fn params(&self) -> ListParams {
        let mut params = ListParams::new().page(self.page).per_page(self.per_page);
        if let Some(status) = self.status.as_deref().filter(|s| !s.is_empty()) {
            params = params.status(status);
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            params = params.search(search);
        }
        params
    }
}

/// Local filters for the network and garage views.
#[derive(Args, Debug, Clone)]
struct MemberFilterArgs {
    /// Case-insensitive text filter
    #[arg(short, long, default_value = "")]
    search: String,

    /// Exact car brand
    #[arg(short, long)]
    brand: Option<String>,
}

#[derive(Subcommand)]
enum ApprovalAction {
    /// Applications awaiting review, oldest first
    List,
    /// Approve an application
    Approve {
        /// Approval row ID
        id: RowId,
        #[arg(short, long)]
        notes: Option<String>,
    },
    /// Reject an application
    Reject {
        /// Approval row ID
        id: RowId,
        #[arg(short, long)]
        notes: Option<String>,
    },
    /// Put a customer's application on the waitlist
    Waitlist {
        /// Shop customer ID
        customer_id: i64,
        #[arg(short, long)]
        notes: Option<String>,
    },
    /// Set any approval status for a customer's application
    Set {
        /// Shop customer ID
        customer_id: i64,
        /// `pending`, `approved`, `rejected` or `waitlist`
        status: ApprovalStatus,
        #[arg(short, long)]
        notes: Option<String>,
    },
}

#[derive(Subcommand)]
enum FavoriteAction {
    /// Favorite member IDs
    List,
    /// Add or remove a favorite
    Toggle {
        /// Member (subscription) ID
        member_id: i64,
    },
}

#[derive(Subcommand)]
enum PreferencesAction {
    Show,
    /// Update one or more preferences
    Set {
        #[arg(long)]
        theme: Option<Theme>,
        #[arg(long)]
        accent_color: Option<String>,
        #[arg(long)]
        company_name: Option<String>,
        #[arg(long)]
        notifications: Option<bool>,
        #[arg(long)]
        email_digest: Option<EmailDigest>,
        #[arg(long)]
        language: Option<String>,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    Show,
    Theme { theme: Theme },
    Accent { color: String },
    Title { title: String },
    Company { name: String },
    ToggleSidebar,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &DashboardConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Map tracing levels to Sentry: errors and warnings become events, the rest
/// breadcrumbs.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        tracing::Level::TRACE => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());

    // Logs go to stderr so stdout stays valid JSON
    let json = std::env::var("SG_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_writer(std::io::stderr)
    });
    let text_layer = (!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = DashboardConfig::from_env();
    let sentry_guard = config.as_ref().ok().and_then(init_sentry);
    init_tracing();

    let result = match config {
        Ok(config) => run(cli, &config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        drop(sentry_guard);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &DashboardConfig) -> Result<(), DashboardError> {
    let state = AppState::from_config(config)?;

    match cli.command {
        Commands::Members(args) => commands::lists::members(&state, &args.params()).await,
        Commands::Member { id } => commands::lists::member(&state, id).await,
        Commands::Subscriptions(args) => {
            commands::lists::subscriptions(&state, &args.params()).await
        }
        Commands::Orders(args) => commands::lists::orders(&state, &args.params()).await,
        Commands::Events(args) => commands::lists::events(&state, &args.params()).await,
        Commands::Customers(args) => commands::lists::customers(&state, &args.params()).await,
        Commands::Stats => commands::overview::stats(&state).await,
        Commands::Dashboard => commands::overview::dashboard(&state).await,
        Commands::Analytics => commands::overview::analytics(&state).await,
        Commands::Network(args) => {
            commands::overview::network(&state, &args.search, args.brand.as_deref()).await
        }
        Commands::Garage(args) => {
            commands::overview::garage(&state, &args.search, args.brand.as_deref()).await
        }
        Commands::Sync { entity } => commands::overview::sync(&state, entity).await,
        Commands::SyncStatus => commands::overview::sync_status(&state).await,
        Commands::Approvals { action } => match action {
            ApprovalAction::List => commands::club::pending_approvals(&state).await,
            ApprovalAction::Approve { id, notes } => {
                let notes = notes.as_deref();
                commands::club::process_approval(&state, &id, ApprovalStatus::Approved, notes)
                    .await
            }
            ApprovalAction::Reject { id, notes } => {
                let notes = notes.as_deref();
                commands::club::process_approval(&state, &id, ApprovalStatus::Rejected, notes)
                    .await
            }
            ApprovalAction::Waitlist { customer_id, notes } => {
                commands::club::set_approval_status(
                    &state,
                    customer_id,
                    ApprovalStatus::Waitlist,
                    notes.as_deref(),
                )
                .await
            }
            ApprovalAction::Set {
                customer_id,
                status,
                notes,
            } => {
                commands::club::set_approval_status(&state, customer_id, status, notes.as_deref())
                    .await
            }
        },
        Commands::Favorites { action } => match action {
            FavoriteAction::List => commands::club::favorites(&state).await,
            FavoriteAction::Toggle { member_id } => {
                commands::club::toggle_favorite(&state, member_id).await
            }
        },
        Commands::Activity { limit } => commands::club::activity(&state, limit).await,
        Commands::Preferences { action } => match action {
            PreferencesAction::Show => commands::club::preferences(&state).await,
            PreferencesAction::Set {
                theme,
                accent_color,
                company_name,
                notifications,
                email_digest,
                language,
            } => {
                let patch = streetgasm_dashboard::aux_store::PreferencesPatch {
                    theme,
                    accent_color,
                    company_name,
                    notifications_enabled: notifications,
                    email_digest,
                    language,
                };
                commands::club::save_preferences(&state, &patch).await
            }
        },
        Commands::Settings { action } => {
            let update = match action {
                SettingsAction::Show => None,
                SettingsAction::Theme { theme } => Some(commands::settings::Update::Theme(theme)),
                SettingsAction::Accent { color } => Some(commands::settings::Update::Accent(color)),
                SettingsAction::Title { title } => Some(commands::settings::Update::Title(title)),
                SettingsAction::Company { name } => Some(commands::settings::Update::Company(name)),
                SettingsAction::ToggleSidebar => Some(commands::settings::Update::ToggleSidebar),
            };
            commands::settings::settings(&state, update)
        }
        Commands::Whoami => commands::settings::whoami(&state, config),
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_list_args_omit_empty_filters() {
        let cli = Cli::parse_from(["sg-cli", "members", "--status", "", "--search", "jan"]);
        let Commands::Members(args) = cli.command else {
            panic!("expected members command");
        };
        let params = args.params();
        assert_eq!(params.status, None);
        assert_eq!(params.search.as_deref(), Some("jan"));
        assert_eq!(params.page, Some(1));
        assert_eq!(params.per_page, Some(20));
    }

    #[test]
    fn test_sync_entity_defaults_to_all() {
        let cli = Cli::parse_from(["sg-cli", "sync"]);
        assert!(matches!(
            cli.command,
            Commands::Sync {
                entity: SyncEntity::All
            }
        ));
    }

    #[test]
    fn test_approval_status_parses() {
        let cli = Cli::parse_from(["sg-cli", "approvals", "set", "12", "waitlist"]);
        assert!(matches!(
            cli.command,
            Commands::Approvals {
                action: ApprovalAction::Set {
                    customer_id: 12,
                    status: ApprovalStatus::Waitlist,
                    ..
                }
            }
        ));
    }

    #[test]
    fn test_approve_accepts_numeric_row_id() {
        let cli = Cli::parse_from(["sg-cli", "approvals", "approve", "17", "--notes", "Welkom"]);
        let Commands::Approvals {
            action: ApprovalAction::Approve { id, notes },
        } = cli.command
        else {
            panic!("expected approve command");
        };
        assert_eq!(id.as_str(), "17");
        assert_eq!(notes.as_deref(), Some("Welkom"));
    }
}
