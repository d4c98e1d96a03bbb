use std::net::SocketAddr;

use log::*;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;

use crate::{error::Error, message::Message};

// anything longer is a protocol violation and gets cut short
pub const RECV_BUF_LEN: usize = 0x400;

pub struct Datagram {
	pub from: SocketAddr,
	/// undecodable datagrams are not fatal, the session decides what to do
	pub msg: Result<Message, Error>,
}

pub struct Endpoint {
	socket: UdpSocket,
	buf: Vec<u8>,
}

impl Endpoint {
	// must be called within a tokio runtime
	pub fn bind(addr: SocketAddr) -> Result<Endpoint, Error> {
		let s = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))?;
		s.set_nonblocking(true)?;
		s.bind(&addr.into())?;
		let socket = UdpSocket::from_std(s.into())?;
		Ok(Endpoint {
			socket,
			buf: vec![0u8; RECV_BUF_LEN],
		})
	}

	pub fn local_addr(&self) -> Result<SocketAddr, Error> {
		Ok(self.socket.local_addr()?)
	}

	pub async fn send(&self, msg: &Message, to: SocketAddr) -> Result<(), Error> {
		debug!("-> {to} {msg}");
		self.send_bytes(&msg.encode()?, to).await
	}

	pub async fn send_bytes(&self, buf: &[u8], to: SocketAddr) -> Result<(), Error> {
		let len = self
			.socket
			.send_to(buf, to)
			.await
			.inspect_err(|e| error!("udp send error: {e}"))?;
		trace!("udp send {len} bytes to {to}");
		Ok(())
	}

	/// blocks until a datagram arrives, there is no timeout
	pub async fn recv(&mut self) -> Result<Datagram, Error> {
		let (len, from) = self
			.socket
			.recv_from(&mut self.buf)
			.await
			.inspect_err(|e| error!("udp recv error: {e}"))?;
		trace!("udp recv {len} bytes from {from}");
		let msg = Message::decode(&self.buf[..len]);
		match &msg {
			Ok(m) => debug!("<- {from} {m}"),
			Err(e) => debug!("<- {from} {e}"),
		}
		Ok(Datagram { from, msg })
	}
}
