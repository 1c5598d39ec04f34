//! Runtime settings.
//!
//! Parsed by clap from flags or environment variables; `main` loads an
//! optional `.env` first so local runs can keep secrets out of the shell.

use clap::Args;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Bookings a client may create per UTC day.
pub const DEFAULT_DAILY_BOOKING_LIMIT: u32 = 3;
/// Price of the master-of-ceremony role, in major units.
pub const DEFAULT_ROLE_UPGRADE_PRICE: Decimal = dec!(2500.00);

#[derive(Debug, Clone, Args)]
pub struct Settings {
    /// Settlement currency sent to the gateway
    #[arg(long, env = "EVENTPAY_CURRENCY", default_value = "inr")]
    pub currency: String,

    #[arg(long, env = "EVENTPAY_ROLE_UPGRADE_PRICE", default_value_t = DEFAULT_ROLE_UPGRADE_PRICE)]
    pub role_upgrade_price: Decimal,

    #[arg(long, env = "EVENTPAY_DAILY_BOOKING_LIMIT", default_value_t = DEFAULT_DAILY_BOOKING_LIMIT)]
    pub daily_booking_limit: u32,

    #[arg(
        long,
        env = "EVENTPAY_SUCCESS_URL",
        default_value = "http://localhost:3005/success.html"
    )]
    pub success_url: String,

    #[arg(
        long,
        env = "EVENTPAY_CANCEL_URL",
        default_value = "http://localhost:3005/cancel.html"
    )]
    pub cancel_url: String,

    #[command(flatten)]
    pub gateway: GatewaySettings,

    #[command(flatten)]
    pub log: LogSettings,
}

#[derive(Debug, Clone, Args)]
pub struct GatewaySettings {
    /// Stripe secret key. Without one, checkouts go to the simulated gateway.
    #[arg(long, env = "STRIPE_SECRET_KEY", hide_env_values = true)]
    pub stripe_secret_key: Option<String>,

    #[arg(long, env = "EVENTPAY_STRIPE_API_BASE", default_value = "https://api.stripe.com")]
    pub stripe_api_base: String,

    #[arg(long, env = "EVENTPAY_GATEWAY_TIMEOUT_MS", default_value_t = 15_000)]
    pub gateway_timeout_ms: u64,
}

#[derive(Debug, Clone, Args)]
pub struct LogSettings {
    /// Tracing filter directive, e.g. `info` or `eventpay=debug`
    #[arg(long, env = "EVENTPAY_LOG", default_value = "info")]
    pub log_filter: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "EVENTPAY_LOG_JSON")]
    pub log_json: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            currency: "inr".to_string(),
            role_upgrade_price: DEFAULT_ROLE_UPGRADE_PRICE,
            daily_booking_limit: DEFAULT_DAILY_BOOKING_LIMIT,
            success_url: "http://localhost:3005/success.html".to_string(),
            cancel_url: "http://localhost:3005/cancel.html".to_string(),
            gateway: GatewaySettings {
                stripe_secret_key: None,
                stripe_api_base: "https://api.stripe.com".to_string(),
                gateway_timeout_ms: 15_000,
            },
            log: LogSettings {
                log_filter: "info".to_string(),
                log_json: false,
            },
        }
    }
}
