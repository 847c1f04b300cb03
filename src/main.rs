use color_eyre::eyre::{
    Result,
    eyre,
};
use lottery_client::{
    client,
    wallets,
};
use std::time::Duration;
use tracing_appender::rolling;
use tracing_subscriber::EnvFilter;

fn print_usage_and_exit() -> ! {
    println!(
        "Usage: lottery-client --wallet <name> [--gateway-url <url>]\n\
         [--wallet-dir <path>] [--poll-ms <millis>] [--log-dir <path>]\n\
         \n\
         Flags:\n\
           --wallet <name>      forc-wallet profile to unlock for signing\n\
           --wallet-dir <path>  Override forc-wallet directory (defaults to ~/.fuel/wallets)\n\
           --gateway-url <url>  Point the client at a running gateway (default {})\n\
           --poll-ms <millis>   Background resync interval (default {}ms)\n\
           --log-dir <path>     Write daily log files into this directory instead of ./logs",
        client::DEFAULT_GATEWAY_URL,
        client::DEFAULT_POLL_INTERVAL.as_millis(),
    );
    std::process::exit(0);
}

struct CliArgs {
    config: client::AppConfig,
    log_dir: String,
}

fn parse_cli_args() -> Result<CliArgs> {
    let mut args = std::env::args().skip(1);
    let mut gateway_url: Option<String> = None;
    let mut wallet_dir: Option<String> = None;
    let mut wallet_name: Option<String> = None;
    let mut poll_ms: Option<u64> = None;
    let mut log_dir: Option<String> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--gateway-url" => {
                let url = args
                    .next()
                    .ok_or_else(|| eyre!("--gateway-url requires a URL argument"))?;
                if gateway_url.is_some() {
                    return Err(eyre!("--gateway-url may only be specified once"));
                }
                gateway_url = Some(url);
            }
            "--wallet-dir" => {
                let dir = args
                    .next()
                    .ok_or_else(|| eyre!("--wallet-dir requires a path argument"))?;
                if wallet_dir.is_some() {
                    return Err(eyre!("--wallet-dir may only be specified once"));
                }
                wallet_dir = Some(dir);
            }
            "--wallet" => {
                let name = args
                    .next()
                    .ok_or_else(|| eyre!("--wallet requires a wallet name"))?;
                if wallet_name.is_some() {
                    return Err(eyre!("--wallet may only be specified once"));
                }
                wallet_name = Some(name);
            }
            "--poll-ms" => {
                let raw = args
                    .next()
                    .ok_or_else(|| eyre!("--poll-ms requires a millisecond count"))?;
                if poll_ms.is_some() {
                    return Err(eyre!("--poll-ms may only be specified once"));
                }
                let millis: u64 = raw
                    .parse()
                    .map_err(|_| eyre!("--poll-ms expects an integer, got '{raw}'"))?;
                if millis == 0 {
                    return Err(eyre!("--poll-ms must be greater than zero"));
                }
                poll_ms = Some(millis);
            }
            "--log-dir" => {
                let dir = args
                    .next()
                    .ok_or_else(|| eyre!("--log-dir requires a path argument"))?;
                if log_dir.is_some() {
                    return Err(eyre!("--log-dir may only be specified once"));
                }
                log_dir = Some(dir);
            }
            "--help" | "-h" => print_usage_and_exit(),
            other => return Err(eyre!("Unknown argument: {other}")),
        }
    }

    let wallet = wallet_name.ok_or_else(|| {
        eyre!("Specify --wallet <name> to select a forc-wallet profile")
    })?;
    let dir = wallets::resolve_wallet_dir(wallet_dir.as_deref())?;

    Ok(CliArgs {
        config: client::AppConfig {
            gateway_url: gateway_url
                .unwrap_or_else(|| client::DEFAULT_GATEWAY_URL.to_string()),
            wallet: client::WalletConfig::Keystore { owner: wallet, dir },
            poll_interval: poll_ms
                .map(Duration::from_millis)
                .unwrap_or(client::DEFAULT_POLL_INTERVAL),
        },
        log_dir: log_dir.unwrap_or_else(|| String::from("logs")),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = parse_cli_args()?;

    // The terminal belongs to the UI once it starts, so logs go to a daily
    // rolling file instead of stdout.
    let file_appender = rolling::daily(&args.log_dir, "lottery-client.log");
    let (writer, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("lottery_client=info")),
        )
        .with_writer(writer)
        .with_ansi(false)
        .init();

    tracing::info!("starting lottery client");
    client::run_app(args.config).await
}
