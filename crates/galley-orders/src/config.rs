use anyhow::bail;
use clap::Parser;
use core::time::Duration;

/// Runtime configuration for the `galley-orders` binary.
///
/// Every flag can also be set through the environment variable named in its
/// description, and a `.env` file in the working directory is read first.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "galley-orders",
    version,
    about = "Order service for galley: forwards to and mirrors the kitchen"
)]
pub struct CliArgs {
    /// Address to listen on.
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("0.0.0.0:8080"))]
    pub server_addr: String,

    /// Root URL of the kitchen service.
    ///
    /// Environment variable: `KITCHEN_URL`
    #[arg(long, env = "KITCHEN_URL", default_value_t = String::from("http://kitchen-svc:8081"))]
    pub kitchen_url: String,

    /// Timeout for each kitchen call, in seconds.
    ///
    /// Environment variable: `KITCHEN_TIMEOUT_SECS`
    #[arg(long, env = "KITCHEN_TIMEOUT_SECS", default_value_t = 10)]
    pub kitchen_timeout_secs: u64,

    /// Secret expected in `X-Callback-Secret` on readiness callbacks. Empty
    /// accepts every callback.
    ///
    /// Environment variable: `KITCHEN_CALLBACK_SECRET`
    #[arg(long, env = "KITCHEN_CALLBACK_SECRET", default_value_t = String::new(), hide_env_values = true)]
    pub callback_secret: String,
}

#[derive(Clone)]
pub struct OrdersConfig {
    pub server_addr: String,
    pub kitchen_url: String,
    pub kitchen_timeout: Duration,
    pub callback_secret: Option<String>,
}

impl core::fmt::Debug for OrdersConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OrdersConfig")
            .field("server_addr", &self.server_addr)
            .field("kitchen_url", &self.kitchen_url)
            .field("kitchen_timeout", &self.kitchen_timeout)
            .field("callback_secret", &self.callback_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl TryFrom<CliArgs> for OrdersConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.kitchen_timeout_secs == 0 {
            bail!("KITCHEN_TIMEOUT_SECS must be greater than 0");
        }
        let kitchen_url = args.kitchen_url.trim();
        if kitchen_url.is_empty() {
            bail!("KITCHEN_URL must not be empty");
        }
        let secret = args.callback_secret.trim();

        Ok(Self {
            server_addr: args.server_addr,
            kitchen_url: kitchen_url.to_string(),
            kitchen_timeout: Duration::from_secs(args.kitchen_timeout_secs),
            callback_secret: (!secret.is_empty()).then(|| secret.to_string()),
        })
    }
}
