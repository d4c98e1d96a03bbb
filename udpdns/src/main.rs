use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::*;
use tokio::{select, signal::ctrl_c};

use proto::{Endpoint, Error, RecordFile, RecordStore, Resolver, Settings};
use udpdns::{Client, Server, ServerOptions};

#[derive(Parser)]
#[command(version)]
struct Args {
	#[command(subcommand)]
	cmd: Cmds,
}

#[derive(Subcommand)]
enum Cmds {
	#[command(alias = "s")]
	Server {
		/// settings file, both endpoints
		#[arg(short, default_value = "conf/Setting.json")]
		settings: String,

		#[arg(short, default_value = "conf/DNSRecords.json")]
		records: String,

		/// read the records once at startup instead of on every lookup
		#[arg(long)]
		preload: bool,

		/// ignore datagrams from anyone but the current client
		#[arg(long)]
		strict_peer: bool,
	},

	#[command(alias = "c")]
	Client {
		/// settings file, both endpoints
		#[arg(short, default_value = "conf/Setting.json")]
		settings: String,
	},
}

#[cfg(debug_assertions)]
const LOG_LEVEL: &str = "debug";
#[cfg(not(debug_assertions))]
const LOG_LEVEL: &str = "info";

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
	let args = Args::parse();

	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(LOG_LEVEL)).init();

	let r = match &args.cmd {
		Cmds::Server {
			settings,
			records,
			preload,
			strict_peer,
		} => {
			let options = ServerOptions {
				strict_peer: *strict_peer,
			};
			server(settings, records, *preload, options).await
		}
		Cmds::Client { settings } => client(settings).await,
	};
	match r {
		Ok(()) => ExitCode::SUCCESS,
		Err(e) => {
			error!("{e}");
			ExitCode::FAILURE
		}
	}
}

async fn server(
	settings: &str,
	records: &str,
	preload: bool,
	options: ServerOptions,
) -> Result<(), Error> {
	let settings = Settings::load(settings)?;
	let resolver: Box<dyn Resolver> = if preload {
		let store = RecordStore::load(records);
		info!("{} records preloaded from {records}", store.len());
		Box::new(store)
	} else {
		Box::new(RecordFile::new(records))
	};

	let endpoint = Endpoint::bind(settings.server_addr())?;
	info!("server listening on UDP {}", endpoint.local_addr()?);

	let mut server = Server::new(endpoint, resolver, options);
	select! {
		r = server.run() => r,
		_ = ctrl_c() => {
			info!("ctrl-c received, shutting down");
			Ok(())
		}
	}
}

async fn client(settings: &str) -> Result<(), Error> {
	let settings = Settings::load(settings)?;
	let endpoint = Endpoint::bind(settings.client_addr())?;
	info!("client bound to UDP {}", endpoint.local_addr()?);

	Client::new(endpoint, settings.server_addr()).run().await
}
