//! Command-line driver.
//!
//! Each invocation resolves one session against the API (optionally logging
//! in first), runs one command and prints a JSON report. The driver is
//! generic over the API port so the binary chooses the adapter.

mod render;

use std::io::{self, Write};

use clap::{Parser, Subcommand};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::config::StorefrontSettings;
use crate::domain::ports::StorefrontApi;
use crate::domain::{
    ConsoleActions, Locale, LoginCredentials, OrderLine, ProductDraft, Registration, Role,
    RouteTable, SessionError, SessionStore, UserId,
};

pub use render::{ActionReport, RouteReport, SessionReport, action_reports, route_reports};

/// `storefront` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "storefront",
    about = "Resolve a storefront session and inspect its access decisions",
    version
)]
pub struct Cli {
    /// API base URL. Overrides `STOREFRONT_BASE_URL`.
    #[arg(long = "base-url", value_name = "url", global = true)]
    pub base_url: Option<String>,
    /// Request timeout in seconds. Overrides `STOREFRONT_REQUEST_TIMEOUT_SECS`.
    #[arg(long = "timeout-secs", value_name = "seconds", global = true)]
    pub request_timeout_secs: Option<u64>,
    /// Locale for fallback messages (`en`, `es`, `fr`).
    #[arg(long, value_name = "tag", global = true)]
    pub locale: Option<String>,
    /// Log in as this user before running the command.
    #[arg(long, short = 'u', value_name = "name", global = true, requires = "password")]
    pub username: Option<String>,
    /// Password for `--username`.
    #[arg(long, value_name = "password", global = true)]
    pub password: Option<String>,
    /// Command to run.
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Settings given explicitly on the command line.
    pub fn settings_overrides(&self) -> StorefrontSettings {
        StorefrontSettings {
            base_url: self.base_url.clone(),
            request_timeout_secs: self.request_timeout_secs,
            locale: self.locale.clone(),
        }
    }
}

/// Commands accepted by the driver.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print the resolved session and its capability flags.
    Whoami,
    /// Evaluate the route guard for one path.
    Navigate {
        /// Path to navigate to, e.g. `/admin/sellers`.
        path: String,
    },
    /// Evaluate the route guard for every registered route.
    Routes,
    /// Print how each console action is presented.
    Actions,
    /// `GET` a resource through the session.
    Query {
        /// API path, e.g. `/api/orders`.
        path: String,
    },
    /// Create an account and sign in as it.
    Register {
        /// New username.
        #[arg(long = "new-username", value_name = "name")]
        username: String,
        /// New password.
        #[arg(long = "new-password", value_name = "password")]
        password: String,
        /// `customer` or `seller`.
        #[arg(long, value_name = "role", value_parser = parse_role)]
        role: Role,
        /// Contact email.
        #[arg(long, value_name = "email")]
        email: String,
        /// Name shown in the consoles.
        #[arg(long = "display-name", value_name = "name")]
        display_name: String,
        /// Referral code for seller sign-ups.
        #[arg(long = "referral-code", value_name = "code")]
        referral_code: Option<String>,
    },
    /// End the session.
    Logout,
    /// Publish a pending product (admin).
    ApproveProduct {
        /// Product id.
        product_id: u64,
    },
    /// Reject a pending product (admin).
    RejectProduct {
        /// Product id.
        product_id: u64,
        /// Reason shown to the seller.
        #[arg(long)]
        reason: String,
    },
    /// Verify a seller account (admin).
    VerifySeller {
        /// Seller user id.
        seller_id: u64,
    },
    /// Attach a referral code to a seller (admin).
    AssignReferral {
        /// Seller user id.
        seller_id: u64,
        /// Referral code.
        #[arg(long)]
        code: String,
    },
    /// Approve or decline a withdrawal (admin).
    ReviewWithdrawal {
        /// Withdrawal id.
        withdrawal_id: u64,
        /// Decline instead of approving.
        #[arg(long)]
        decline: bool,
    },
    /// Submit a product listing (seller).
    CreateProduct {
        /// Listing name.
        #[arg(long)]
        name: String,
        /// Listing description.
        #[arg(long, default_value = "")]
        description: String,
        /// Price in cents.
        #[arg(long = "price-cents", value_name = "cents")]
        price_cents: u64,
        /// Units in stock.
        #[arg(long, default_value_t = 0)]
        stock: u32,
        /// Category id.
        #[arg(long = "category-id", value_name = "id")]
        category_id: Option<u64>,
    },
    /// Request a payout (seller).
    Withdraw {
        /// Amount in cents.
        amount_cents: u64,
    },
    /// Place an order from `product:quantity` lines.
    PlaceOrder {
        /// Lines as `product_id:quantity`.
        #[arg(value_name = "product:quantity", value_parser = parse_order_line, required = true)]
        lines: Vec<OrderLine>,
    },
}

/// Failure of a CLI run.
#[derive(Debug, Error)]
pub enum CliError {
    /// A session or console operation failed.
    #[error(transparent)]
    Session(#[from] SessionError),
    /// The route table failed to build.
    #[error("route table is invalid: {0}")]
    Routes(String),
    /// The report could not be written.
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

impl CliError {
    /// Message to print for the user.
    pub fn user_message(&self, locale: Locale) -> String {
        match self {
            Self::Session(error) => error.user_message(locale),
            other => other.to_string(),
        }
    }
}

fn parse_role(raw: &str) -> Result<Role, String> {
    raw.parse::<Role>().map_err(|error| error.to_string())
}

fn parse_order_line(raw: &str) -> Result<OrderLine, String> {
    let (product, quantity) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected `product_id:quantity`, got `{raw}`"))?;
    let product_id = product
        .trim()
        .parse()
        .map_err(|error| format!("invalid product id `{product}`: {error}"))?;
    let quantity = quantity
        .trim()
        .parse()
        .map_err(|error| format!("invalid quantity `{quantity}`: {error}"))?;
    Ok(OrderLine {
        product_id,
        quantity,
    })
}

fn print_json<W: Write>(out: &mut W, report: &impl Serialize) -> Result<(), CliError> {
    serde_json::to_writer_pretty(&mut *out, report).map_err(io::Error::from)?;
    writeln!(out)?;
    Ok(())
}

/// Resolve the session and run `cli.command`, printing to `out`.
///
/// # Errors
///
/// Returns [`CliError::Session`] when login or the command fails.
pub async fn run<A, W>(
    cli: &Cli,
    store: &SessionStore<A>,
    locale: Locale,
    out: &mut W,
) -> Result<(), CliError>
where
    A: StorefrontApi + 'static,
    W: Write,
{
    sign_in(cli, store).await?;
    let console = ConsoleActions::new(store.clone());
    match &cli.command {
        Command::Whoami => print_json(out, &SessionReport::new(&store.snapshot(), locale)),
        Command::Navigate { path } => {
            let table = route_table()?;
            print_json(out, &table.navigate(path, &store.snapshot()))
        }
        Command::Routes => {
            let table = route_table()?;
            let session = store.snapshot();
            print_json(out, &route_reports(&table, &session))
        }
        Command::Actions => print_json(out, &action_reports(store.capabilities())),
        Command::Query { path } => print_json(out, &store.query(path).await?),
        Command::Register {
            username,
            password,
            role,
            email,
            display_name,
            referral_code,
        } => {
            let registration =
                Registration::try_new(username, password, *role, email, display_name)
                    .map_err(SessionError::from)?;
            let registration = match referral_code {
                Some(code) => registration.with_referral_code(code.as_str()),
                None => registration,
            };
            store.register(&registration).await?;
            print_json(out, &SessionReport::new(&store.snapshot(), locale))
        }
        Command::Logout => {
            let session = store.logout().await;
            print_json(out, &SessionReport::new(&session, locale))
        }
        Command::ApproveProduct { product_id } => {
            print_json(out, &console.approve_product(*product_id).await?)
        }
        Command::RejectProduct { product_id, reason } => {
            print_json(out, &console.reject_product(*product_id, reason).await?)
        }
        Command::VerifySeller { seller_id } => {
            print_json(out, &console.verify_seller(UserId::new(*seller_id)).await?)
        }
        Command::AssignReferral { seller_id, code } => print_json(
            out,
            &console
                .assign_referral(UserId::new(*seller_id), code)
                .await?,
        ),
        Command::ReviewWithdrawal {
            withdrawal_id,
            decline,
        } => print_json(
            out,
            &console.review_withdrawal(*withdrawal_id, !decline).await?,
        ),
        Command::CreateProduct {
            name,
            description,
            price_cents,
            stock,
            category_id,
        } => {
            let draft = ProductDraft::try_new(name, description, *price_cents, *stock)?;
            let draft = match category_id {
                Some(category) => draft.in_category(*category),
                None => draft,
            };
            print_json(out, &console.create_product(&draft).await?)
        }
        Command::Withdraw { amount_cents } => {
            print_json(out, &console.request_withdrawal(*amount_cents).await?)
        }
        Command::PlaceOrder { lines } => print_json(out, &console.place_order(lines).await?),
    }
}

fn route_table() -> Result<RouteTable, CliError> {
    RouteTable::storefront().map_err(|error| CliError::Routes(error.to_string()))
}

async fn sign_in<A>(cli: &Cli, store: &SessionStore<A>) -> Result<(), CliError>
where
    A: StorefrontApi + 'static,
{
    if matches!(cli.command, Command::Register { .. }) {
        return Ok(());
    }
    match (&cli.username, &cli.password) {
        (Some(username), Some(password)) => {
            let credentials =
                LoginCredentials::try_from_parts(username, password).map_err(SessionError::from)?;
            let identity = store.login(&credentials).await?;
            debug!(username = identity.username(), "signed in for command");
        }
        _ => {
            let session = store.ensure_resolved().await;
            debug!(state = session.state().label(), "session resolved for command");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    //! Command parsing and end-to-end runs against the scripted API.

    use std::sync::Arc;

    use rstest::{fixture, rstest};
    use serde_json::Value;

    use super::*;
    use crate::test_support::ScriptedStorefrontApi;

    #[fixture]
    fn store() -> SessionStore<ScriptedStorefrontApi> {
        SessionStore::new(Arc::new(
            ScriptedStorefrontApi::new()
                .with_account("admin", "admin123", Role::Admin)
                .with_account("customer1", "customer123", Role::Customer),
        ))
    }

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("storefront").chain(args.iter().copied()))
            .expect("arguments parse")
    }

    async fn run_json(cli: &Cli, store: &SessionStore<ScriptedStorefrontApi>) -> Value {
        let mut out = Vec::new();
        run(cli, store, Locale::En, &mut out)
            .await
            .expect("command succeeds");
        serde_json::from_slice(&out).expect("output is JSON")
    }

    #[rstest]
    #[tokio::test]
    async fn whoami_without_credentials_is_anonymous(store: SessionStore<ScriptedStorefrontApi>) {
        let report = run_json(&parse(&["whoami"]), &store).await;
        assert_eq!(report["state"], "anonymous");
        assert_eq!(report["capabilities"]["isCustomer"], false);
    }

    #[rstest]
    #[tokio::test]
    async fn navigate_as_customer_denies_admin(store: SessionStore<ScriptedStorefrontApi>) {
        let cli = parse(&["-u", "customer1", "--password", "customer123", "navigate", "/admin"]);
        let report = run_json(&cli, &store).await;
        assert_eq!(report["view"], "admin-dashboard");
        assert_eq!(report["decision"]["decision"], "denied");
        assert_eq!(report["decision"]["home"], "/");
    }

    #[rstest]
    #[tokio::test]
    async fn anonymous_seller_route_redirects_to_registration(
        store: SessionStore<ScriptedStorefrontApi>,
    ) {
        let report = run_json(&parse(&["navigate", "/seller/products"]), &store).await;
        assert_eq!(report["decision"]["target"], "/seller/register");
    }

    #[rstest]
    #[tokio::test]
    async fn admin_console_command_is_sent(store: SessionStore<ScriptedStorefrontApi>) {
        let cli = parse(&[
            "--username",
            "admin",
            "--password",
            "admin123",
            "review-withdrawal",
            "4",
            "--decline",
        ]);
        let report = run_json(&cli, &store).await;
        assert_eq!(report["ok"], true);
    }

    #[rstest]
    #[tokio::test]
    async fn customer_cannot_run_admin_commands(store: SessionStore<ScriptedStorefrontApi>) {
        let cli = parse(&["-u", "customer1", "--password", "customer123", "verify-seller", "2"]);
        let mut out = Vec::new();
        let err = run(&cli, &store, Locale::Es, &mut out)
            .await
            .expect_err("admin only");
        assert_eq!(err.user_message(Locale::Es), Locale::Es.access_denied());
        assert!(out.is_empty());
    }

    #[test]
    fn username_requires_password() {
        let result = Cli::try_parse_from(["storefront", "-u", "admin", "whoami"]);
        assert!(result.is_err());
    }

    #[rstest]
    #[case("3:2", 3, 2)]
    #[case(" 10 : 1 ", 10, 1)]
    fn order_lines_parse(#[case] raw: &str, #[case] product_id: u64, #[case] quantity: u32) {
        assert_eq!(
            parse_order_line(raw),
            Ok(OrderLine {
                product_id,
                quantity
            })
        );
    }

    #[test]
    fn malformed_order_lines_are_rejected() {
        assert!(parse_order_line("3").is_err());
        assert!(parse_order_line("x:1").is_err());
    }

    #[test]
    fn flags_become_setting_overrides() {
        let cli = parse(&["--base-url", "https://shop.example", "--locale", "es", "routes"]);
        let overrides = cli.settings_overrides();
        assert_eq!(overrides.base_url.as_deref(), Some("https://shop.example"));
        assert_eq!(overrides.locale.as_deref(), Some("es"));
        assert!(overrides.request_timeout_secs.is_none());
    }
}
