use std::net::SocketAddr;

use log::*;
use proto::{Body, Datagram, DnsRecord, Endpoint, Error, Message, MsgId, Resolver};

/// lookups served before the server says End
pub const LOOKUPS_PER_SESSION: usize = 4;

const WELCOME: &str = "Welcome from server";
const END: &str = "End of communication";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
	Waiting,
	ReceivingHello,
	SendingWelcome,
	ReceivingDnsLookup,
	ProcessingDnsLookup,
	SendingDnsLookupReply,
	SendingError,
	ReceivingAck,
	SendingEnd,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ServerOptions {
	/// drop datagrams from anyone but the client that said Hello,
	/// by default whatever arrives next continues the session
	pub strict_peer: bool,
}

/// per client state, thrown away on every return to Waiting
#[derive(Debug, Default)]
pub struct Session {
	client: Option<SocketAddr>,
	received: Option<Message>,
	request: Option<Result<DnsRecord, Error>>,
	found: Option<DnsRecord>,
	pending_id: MsgId,
	lookups: usize,
}

impl Session {
	pub fn client(&self) -> Option<SocketAddr> {
		self.client
	}

	pub fn received(&self) -> Option<&Message> {
		self.received.as_ref()
	}

	pub fn request(&self) -> Option<&Result<DnsRecord, Error>> {
		self.request.as_ref()
	}

	pub fn found(&self) -> Option<&DnsRecord> {
		self.found.as_ref()
	}

	pub fn pending_id(&self) -> MsgId {
		self.pending_id
	}

	pub fn lookups(&self) -> usize {
		self.lookups
	}
}

pub struct Server<R> {
	endpoint: Endpoint,
	resolver: R,
	options: ServerOptions,
	state: ServerState,
	// outlives sessions
	next_id: MsgId,
	session: Session,
}

impl<R: Resolver> Server<R> {
	pub fn new(endpoint: Endpoint, resolver: R, options: ServerOptions) -> Server<R> {
		Server {
			endpoint,
			resolver,
			options,
			state: ServerState::Waiting,
			next_id: 1,
			session: Session::default(),
		}
	}

	pub fn state(&self) -> ServerState {
		self.state
	}

	pub fn session(&self) -> &Session {
		&self.session
	}

	pub fn local_addr(&self) -> Result<SocketAddr, Error> {
		self.endpoint.local_addr()
	}

	/// serves one client after another, returns only on transport failure
	pub async fn run(&mut self) -> Result<(), Error> {
		loop {
			self.step().await?;
		}
	}

	pub async fn step(&mut self) -> Result<(), Error> {
		match self.state {
			ServerState::Waiting => {
				self.reset();
				Ok(())
			}
			ServerState::ReceivingHello => self.receive_hello().await,
			ServerState::SendingWelcome => {
				let id = self.next_id();
				self.reply(id, Body::Welcome(WELCOME.into()), ServerState::ReceivingDnsLookup)
					.await
			}
			ServerState::ReceivingDnsLookup => self.receive_lookup().await,
			ServerState::ProcessingDnsLookup => {
				self.process_lookup();
				Ok(())
			}
			ServerState::SendingDnsLookupReply => {
				let body = Body::DnsLookupReply(self.session.found.clone());
				self.reply(self.session.pending_id, body, ServerState::ReceivingAck)
					.await
			}
			ServerState::SendingError => {
				let (record_type, name) = match &self.session.request {
					Some(Ok(r)) => (r.record_type.as_str(), r.name.as_str()),
					_ => ("", ""),
				};
				let body = Body::Error(format!(
					"DNS record not found for type {record_type} and name {name}"
				));
				self.reply(self.session.pending_id, body, ServerState::ReceivingAck)
					.await
			}
			ServerState::ReceivingAck => self.receive_ack().await,
			ServerState::SendingEnd => {
				let id = self.next_id();
				self.reply(id, Body::End(END.into()), ServerState::Waiting)
					.await?;
				info!("session completed, ready for a new client");
				Ok(())
			}
		}
	}

	fn reset(&mut self) {
		info!("waiting for a client");
		self.session = Session::default();
		self.transition(ServerState::ReceivingHello);
	}

	async fn receive_hello(&mut self) -> Result<(), Error> {
		let d = self.recv().await?;
		// whoever speaks first owns the session
		self.session.client = Some(d.from);
		match d.msg {
			Ok(msg @ Message { body: Body::Hello(_), .. }) => {
				info!("client {} connected", d.from);
				self.session.received = Some(msg);
				self.transition(ServerState::SendingWelcome);
			}
			other => {
				warn!("{}, dropping {}", self.unexpected(&other), d.from);
				self.transition(ServerState::Waiting);
			}
		}
		Ok(())
	}

	async fn receive_lookup(&mut self) -> Result<(), Error> {
		let d = self.recv().await?;
		let (id, request) = match d.msg {
			Ok(Message {
				id,
				body: Body::DnsLookup(record),
			}) => (id, Ok(record)),
			// a lookup we cannot read still gets an answer
			Err(e) => match e.lookup_id() {
				Some(id) => (id, Err(e)),
				None => {
					warn!("{}", self.unexpected(&Err(e)));
					return Ok(());
				}
			},
			other => {
				warn!("{}", self.unexpected(&other));
				self.session.received = other.ok();
				return Ok(());
			}
		};
		self.session.lookups += 1;
		self.session.pending_id = id;
		info!("lookup #{} received, message #{id}", self.session.lookups);
		self.session.received = request
			.as_ref()
			.ok()
			.map(|query| Message::new(id, Body::DnsLookup(query.clone())));
		self.session.request = Some(request);
		self.session.found = None;
		self.transition(ServerState::ProcessingDnsLookup);
		Ok(())
	}

	// never fails, every problem becomes an Error reply
	fn process_lookup(&mut self) {
		let next = match &self.session.request {
			Some(Ok(req)) if !req.is_complete() => {
				let e = Error::IncompleteLookupRequest {
					record_type: req.record_type.clone(),
					name: req.name.clone(),
				};
				warn!("{e}");
				ServerState::SendingError
			}
			Some(Ok(req)) => {
				info!("resolving {} record of {}", req.record_type, req.name);
				match self.resolver.resolve(&req.record_type, &req.name) {
					Some(record) => {
						info!("found {record}");
						self.session.found = Some(record);
						ServerState::SendingDnsLookupReply
					}
					None => {
						let e = Error::RecordNotFound {
							record_type: req.record_type.clone(),
							name: req.name.clone(),
						};
						warn!("{e}");
						ServerState::SendingError
					}
				}
			}
			Some(Err(e)) => {
				warn!("cannot read lookup: {e}");
				ServerState::SendingError
			}
			None => {
				error!("no lookup to process");
				ServerState::SendingError
			}
		};
		self.transition(next);
	}

	async fn receive_ack(&mut self) -> Result<(), Error> {
		let d = self.recv().await?;
		match d.msg {
			Ok(msg @ Message { body: Body::Ack(_), .. }) => {
				if msg.body != Body::Ack(self.session.pending_id) {
					warn!(
						"{msg} does not acknowledge pending lookup #{}",
						self.session.pending_id
					);
				}
				self.session.received = Some(msg);
				let next = if self.session.lookups >= LOOKUPS_PER_SESSION {
					info!("all {LOOKUPS_PER_SESSION} lookups completed");
					ServerState::SendingEnd
				} else {
					info!(
						"waiting for more lookups, {}/{LOOKUPS_PER_SESSION} completed",
						self.session.lookups
					);
					ServerState::ReceivingDnsLookup
				};
				self.transition(next);
			}
			other => {
				warn!("{}", self.unexpected(&other));
				self.session.received = other.ok();
			}
		}
		Ok(())
	}

	async fn recv(&mut self) -> Result<Datagram, Error> {
		loop {
			let d = self.endpoint.recv().await?;
			match self.session.client {
				Some(client) if client != d.from => {
					if self.options.strict_peer {
						warn!("dropping datagram from {}, session belongs to {client}", d.from);
						continue;
					}
					debug!("datagram from {} continues the session of {client}", d.from);
				}
				_ => {}
			}
			return Ok(d);
		}
	}

	// replies always go to the client bound at Hello
	async fn reply(&mut self, id: MsgId, body: Body, next: ServerState) -> Result<(), Error> {
		let Some(client) = self.session.client else {
			error!("no client bound, abandoning session");
			self.transition(ServerState::Waiting);
			return Ok(());
		};
		self.endpoint.send(&Message::new(id, body), client).await?;
		self.transition(next);
		Ok(())
	}

	fn next_id(&mut self) -> MsgId {
		let id = self.next_id;
		self.next_id += 1;
		id
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

	fn transition(&mut self, next: ServerState) {
		info!("SERVER | {:?} -> {:?}", self.state, next);
		self.state = next;
	}
}
