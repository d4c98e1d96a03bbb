use std::{
	fs,
	net::{IpAddr, SocketAddr},
	path::Path,
};

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// endpoints shared by both sides, read once at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
	#[serde(rename = "ServerIPAddress")]
	pub server_ip: IpAddr,
	#[serde(rename = "ServerPortNumber")]
	pub server_port: u16,
	#[serde(rename = "ClientIPAddress")]
	pub client_ip: IpAddr,
	#[serde(rename = "ClientPortNumber")]
	pub client_port: u16,
}

impl Settings {
	pub fn load(path: impl AsRef<Path>) -> Result<Settings, Error> {
		let path = path.as_ref();
		let config_err = |reason: String| Error::Config {
			path: path.to_path_buf(),
			reason,
		};
		let buf = fs::read(path).map_err(|e| config_err(e.to_string()))?;
		serde_json::from_slice(&buf).map_err(|e| config_err(e.to_string()))
	}

	pub fn server_addr(&self) -> SocketAddr {
		SocketAddr::new(self.server_ip, self.server_port)
	}

	pub fn client_addr(&self) -> SocketAddr {
		SocketAddr::new(self.client_ip, self.client_port)
	}
}
