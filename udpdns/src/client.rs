use std::net::SocketAddr;

use log::*;
use proto::{Body, DnsRecord, Endpoint, Error, Message, MsgId};

/// queried in order, one per lookup round
pub const LOOKUPS: [(&str, &str); 4] = [
	("A", "www.outlook.com"),
	("A", "mail.example.com"),
	// invalid type
	("XYZ", ""),
	// invalid name
	("", "nonexistentdomain.com"),
];

const HELLO: &str = "Hello from client";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
	Initial,
	WaitingForWelcome,
	SendingDnsLookup,
	WaitingForDnsLookupReply,
	SendingAck,
	WaitingForEnd,
	Terminated,
}

pub struct Client {
	endpoint: Endpoint,
	server: SocketAddr,
	state: ClientState,
	next_id: MsgId,
	lookup_index: usize,
	pending_id: MsgId,
	received: Option<Message>,
	// DNSLookupReply or Error, one per lookup
	answers: Vec<Message>,
}

impl Client {
	pub fn new(endpoint: Endpoint, server: SocketAddr) -> Client {
		Client {
			endpoint,
			server,
			state: ClientState::Initial,
			next_id: 1,
			lookup_index: 0,
			pending_id: 0,
			received: None,
			answers: Vec::with_capacity(LOOKUPS.len()),
		}
	}

	pub fn state(&self) -> ClientState {
		self.state
	}

	pub fn received(&self) -> Option<&Message> {
		self.received.as_ref()
	}

	pub fn answers(&self) -> &[Message] {
		&self.answers
	}

	/// runs the session to Terminated, only transport failures are errors
	pub async fn run(&mut self) -> Result<(), Error> {
		info!("client started, server {}", self.server);
		while self.state != ClientState::Terminated {
			self.step().await?;
		}
		info!("client terminating");
		Ok(())
	}

	pub async fn step(&mut self) -> Result<(), Error> {
		match self.state {
			ClientState::Initial => self.send_hello().await,
			ClientState::WaitingForWelcome => self.wait_welcome().await,
			ClientState::SendingDnsLookup => self.send_lookup().await,
			ClientState::WaitingForDnsLookupReply => self.wait_reply().await,
			ClientState::SendingAck => self.send_ack().await,
			ClientState::WaitingForEnd => self.wait_end().await,
			ClientState::Terminated => Ok(()),
		}
	}

	async fn send_hello(&mut self) -> Result<(), Error> {
		self.send(Body::Hello(HELLO.into())).await?;
		self.transition(ClientState::WaitingForWelcome);
		Ok(())
	}

	async fn wait_welcome(&mut self) -> Result<(), Error> {
		match self.endpoint.recv().await?.msg {
			Ok(msg @ Message { body: Body::Welcome(_), .. }) => {
				self.received = Some(msg);
				self.transition(ClientState::SendingDnsLookup);
			}
			other => {
				error!("{}, shutting down", self.unexpected(&other));
				self.received = other.ok();
				self.transition(ClientState::Terminated);
			}
		}
		Ok(())
	}

	async fn send_lookup(&mut self) -> Result<(), Error> {
		let Some(&(record_type, name)) = LOOKUPS.get(self.lookup_index) else {
			info!("all {} lookups completed", LOOKUPS.len());
			self.transition(ClientState::WaitingForEnd);
			return Ok(());
		};
		info!(
			"lookup #{}/{}: {record_type:?} record for {name:?}",
			self.lookup_index + 1,
			LOOKUPS.len()
		);
		self.pending_id = self
			.send(Body::DnsLookup(DnsRecord::query(record_type, name)))
			.await?;
		self.transition(ClientState::WaitingForDnsLookupReply);
		Ok(())
	}

	async fn wait_reply(&mut self) -> Result<(), Error> {
		let msg = match self.endpoint.recv().await?.msg {
			Ok(msg) => msg,
			Err(e) => {
				warn!("{}", self.unexpected(&Err(e)));
				return Ok(());
			}
		};
		let next = match &msg.body {
			Body::DnsLookupReply(record) => {
				self.check_reply_id(msg.id);
				match record {
					Some(record) => info!("{record}"),
					None => info!("empty reply"),
				}
				self.answers.push(msg.clone());
				Some(ClientState::SendingAck)
			}
			Body::Error(reason) => {
				self.check_reply_id(msg.id);
				warn!("lookup #{} failed: {reason}", self.lookup_index + 1);
				self.answers.push(msg.clone());
				Some(ClientState::SendingAck)
			}
			Body::End(_) => Some(ClientState::Terminated),
			_ => {
				// stay and receive again
				warn!("{}", self.unexpected(&Ok(msg.clone())));
				None
			}
		};
		self.received = Some(msg);
		if let Some(next) = next {
			self.transition(next);
		}
		Ok(())
	}

	async fn send_ack(&mut self) -> Result<(), Error> {
		self.send(Body::Ack(self.pending_id)).await?;
		self.lookup_index += 1;
		self.transition(ClientState::SendingDnsLookup);
		Ok(())
	}

	async fn wait_end(&mut self) -> Result<(), Error> {
		info!("waiting for End");
		match self.endpoint.recv().await?.msg {
			Ok(msg @ Message { body: Body::End(_), .. }) => {
				self.received = Some(msg);
				self.transition(ClientState::Terminated);
			}
			other => {
				warn!("{}", self.unexpected(&other));
				self.received = other.ok();
			}
		}
		Ok(())
	}

	async fn send(&mut self, body: Body) -> Result<MsgId, Error> {
		let msg = Message::new(self.next_id, body);
		self.next_id += 1;
		self.endpoint.send(&msg, self.server).await?;
		Ok(msg.id)
	}

	fn check_reply_id(&self, id: MsgId) {
		if id != self.pending_id {
			warn!("reply #{id} does not match pending lookup #{}", self.pending_id);
		}
	}

	fn unexpected(&self, got: &Result<Message, Error>) -> Error {
		Error::UnexpectedMessageType {
			state: format!("{:?}", self.state),
			got: match got {
				Ok(msg) => msg.msg_type().to_string(),
				Err(e) => e.to_string(),
			},
		}
	}

	fn transition(&mut self, next: ClientState) {
		info!("CLIENT | {:?} -> {:?}", self.state, next);
		self.state = next;
	}
}
