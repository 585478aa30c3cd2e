use crate::{callback::CallbackConfig, lifecycle::PrepSettings, schedule::PrepDelay};
use anyhow::bail;
use clap::Parser;
use core::time::Duration;

/// Runtime configuration for the `galley-kitchen` binary.
///
/// Every flag can also be set through the environment variable named in its
/// description, and a `.env` file in the working directory is read first.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "galley-kitchen",
    version,
    about = "Kitchen fulfillment service for galley"
)]
pub struct CliArgs {
    /// Address to listen on.
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("0.0.0.0:8081"))]
    pub server_addr: String,

    /// Lower bound, in whole seconds, of the simulated preparation time.
    /// Values below 1 are raised to 1.
    ///
    /// Environment variable: `KITCHEN_PREP_MIN_SECONDS`
    #[arg(long, env = "KITCHEN_PREP_MIN_SECONDS", default_value_t = 5)]
    pub prep_min_seconds: u64,

    /// Upper bound, in whole seconds, of the simulated preparation time.
    /// Values below the lower bound are raised to it.
    ///
    /// Environment variable: `KITCHEN_PREP_MAX_SECONDS`
    #[arg(long, env = "KITCHEN_PREP_MAX_SECONDS", default_value_t = 20)]
    pub prep_max_seconds: u64,

    /// Whether accepted orders become `READY` on their own.
    ///
    /// Environment variable: `KITCHEN_PREP_ENABLED`
    #[arg(long, env = "KITCHEN_PREP_ENABLED", default_value_t = true, action = clap::ArgAction::Set)]
    pub prep_enabled: bool,

    /// Threads dedicated to completion timers and callbacks.
    ///
    /// Environment variable: `KITCHEN_SCHEDULER_WORKERS`
    #[arg(long, env = "KITCHEN_SCHEDULER_WORKERS", default_value_t = 2)]
    pub scheduler_workers: usize,

    /// Whether to push a readiness callback to the order service.
    ///
    /// Environment variable: `KITCHEN_CALLBACK_ENABLED`
    #[arg(long, env = "KITCHEN_CALLBACK_ENABLED", default_value_t = true, action = clap::ArgAction::Set)]
    pub callback_enabled: bool,

    /// Callback URL template with `{orderId}` and `{kitchenOrderId}`
    /// placeholders. Empty disables the push.
    ///
    /// Example: `http://order-svc:8080/internal/orders/{orderId}/kitchen-ready?kitchenOrderId={kitchenOrderId}`
    ///
    /// Environment variable: `KITCHEN_CALLBACK_URL`
    #[arg(long, env = "KITCHEN_CALLBACK_URL", default_value_t = String::new())]
    pub callback_url: String,

    /// Shared secret sent as `X-Callback-Secret`. Empty sends no header.
    ///
    /// Environment variable: `KITCHEN_CALLBACK_SECRET`
    #[arg(long, env = "KITCHEN_CALLBACK_SECRET", default_value_t = String::new(), hide_env_values = true)]
    pub callback_secret: String,

    /// Timeout for each callback request, in seconds.
    ///
    /// Environment variable: `KITCHEN_CALLBACK_TIMEOUT_SECS`
    #[arg(long, env = "KITCHEN_CALLBACK_TIMEOUT_SECS", default_value_t = 10)]
    pub callback_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct KitchenConfig {
    pub server_addr: String,
    pub prep: PrepSettings,
    pub scheduler_workers: usize,
    /// `None` when the push is disabled or no URL is configured.
    pub callback: Option<CallbackConfig>,
}

impl TryFrom<CliArgs> for KitchenConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.scheduler_workers == 0 {
            bail!("KITCHEN_SCHEDULER_WORKERS must be greater than 0");
        }
        if args.callback_timeout_secs == 0 {
            bail!("KITCHEN_CALLBACK_TIMEOUT_SECS must be greater than 0");
        }

        let url_template = args.callback_url.trim();
        let callback = (args.callback_enabled && !url_template.is_empty()).then(|| {
            let secret = args.callback_secret.trim();
            CallbackConfig {
                url_template: url_template.to_string(),
                secret: (!secret.is_empty()).then(|| secret.to_string()),
                timeout: Duration::from_secs(args.callback_timeout_secs),
            }
        });

        Ok(Self {
            server_addr: args.server_addr,
            prep: PrepSettings {
                delay: PrepDelay::new(args.prep_min_seconds, args.prep_max_seconds),
                enabled: args.prep_enabled,
            },
            scheduler_workers: args.scheduler_workers,
            callback,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<KitchenConfig> {
        let args = CliArgs::try_parse_from(std::iter::once("galley-kitchen").chain(args.iter().copied()))?;
        KitchenConfig::try_from(args)
    }

    #[test]
    fn prep_bounds_are_clamped_not_rejected() {
        let config = parse(&["--prep-min-seconds", "0", "--prep-max-seconds", "0"]).unwrap();
        assert_eq!(config.prep.delay, PrepDelay::new(1, 1));

        let config = parse(&["--prep-min-seconds", "9", "--prep-max-seconds", "4"]).unwrap();
        assert_eq!(
            (config.prep.delay.min_secs(), config.prep.delay.max_secs()),
            (9, 9)
        );
    }

    #[test]
    fn zero_workers_or_timeout_is_rejected() {
        assert!(parse(&["--scheduler-workers", "0"]).is_err());
        assert!(parse(&["--callback-timeout-secs", "0"]).is_err());
    }

    #[test]
    fn callback_requires_url_and_enabled_flag() {
        let with_url = ["--callback-url", "http://o/{orderId}"];
        assert!(parse(&[]).unwrap().callback.is_none());

        let config = parse(&with_url).unwrap();
        let callback = config.callback.unwrap();
        assert_eq!(callback.url_template, "http://o/{orderId}");
        assert_eq!(callback.secret, None);
        assert_eq!(callback.timeout, Duration::from_secs(10));

        let mut disabled = with_url.to_vec();
        disabled.extend(["--callback-enabled", "false"]);
        assert!(parse(&disabled).unwrap().callback.is_none());

        let mut secret = with_url.to_vec();
        secret.extend(["--callback-secret", "s3cret"]);
        assert_eq!(
            parse(&secret).unwrap().callback.unwrap().secret.as_deref(),
            Some("s3cret")
        );
    }

    #[test]
    fn prep_can_be_disabled() {
        assert!(parse(&[]).unwrap().prep.enabled);
        assert!(!parse(&["--prep-enabled", "false"]).unwrap().prep.enabled);
    }
}
