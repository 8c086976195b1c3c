use anyhow::Context;
use clap::Parser;
use payment_watcher::{PagingToken, PaymentEvent, PaymentWatcher, StartOptions, load_config};
use tracing::{error, info};

/// Watch a Stellar Horizon server for payments and print them as JSON lines.
#[derive(Debug, Parser)]
#[command(name = "payment-watcher", version, about)]
struct Args {
	/// Configuration file (TOML); missing files fall back to defaults
	#[arg(short, long, default_value = "payment-watcher.toml")]
	config: String,

	/// Resume after this paging token instead of starting at the live tip
	#[arg(long)]
	cursor: Option<String>,

	/// Only deliver payments to this account (repeatable)
	#[arg(short, long = "account")]
	accounts: Vec<String>,

	/// Use the test network
	#[arg(long)]
	testnet: bool,

	/// Override the configured Horizon URL
	#[arg(long)]
	horizon_url: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::from_default_env()
				.add_directive(tracing::Level::INFO.into()),
		)
		.with_target(false)
		.with_thread_ids(false)
		.with_thread_names(false)
		.with_file(false)
		.with_line_number(false)
		.with_timer(tracing_subscriber::fmt::time::time())
		.with_writer(std::io::stderr)
		.init();

	let args = Args::parse();

	let mut config = load_config(&args.config)
		.with_context(|| format!("Failed to load configuration from '{}'", args.config))?;
	if args.testnet {
		config.use_testnet = true;
	}
	if let Some(horizon_url) = args.horizon_url {
		config.horizon_url = horizon_url;
	}
	let config = config.normalized();

	let cursor = args
		.cursor
		.as_deref()
		.map(str::parse::<PagingToken>)
		.transpose()
		.context("Invalid --cursor")?;

	info!(
		"Watching {} on the {} network",
		config.horizon_url, config.network
	);
	let watcher = PaymentWatcher::new(config).context("Failed to create payment watcher")?;

	let mut options = StartOptions::new()
		.accounts(args.accounts)
		.on_message(print_payment)
		.on_error(|e| error!("Horizon error, reconnecting: {}", e));
	if let Some(cursor) = cursor {
		options = options.cursor(cursor);
	}
	watcher.start(options);

	tokio::signal::ctrl_c()
		.await
		.context("Failed to listen for shutdown signal")?;

	info!("Shutting down");
	let status = watcher.shutdown().await;
	info!(
		"Stopped at cursor {}; pass --cursor {} to resume",
		status.cursor, status.cursor
	);

	Ok(())
}

fn print_payment(payment: &PaymentEvent) {
	match serde_json::to_string(payment) {
		Ok(line) => println!("{}", line),
		Err(e) => error!("Failed to serialize payment {}: {}", payment.id, e),
	}
}
