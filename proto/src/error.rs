use std::{io, path::PathBuf};

use thiserror::Error;

use crate::message::{MessageType, MsgId};

#[derive(Debug, Error)]
pub enum Error {
	/// the datagram is not a well-formed envelope
	#[error("malformed message: {0}")]
	MalformedMessage(String),

	/// the envelope parsed but its Content does not fit MsgType
	#[error("invalid {msg_type} payload in message {id}: {reason}")]
	InvalidPayloadShape {
		id: MsgId,
		msg_type: MessageType,
		reason: String,
	},

	#[error("unexpected {got} in state {state}")]
	UnexpectedMessageType { state: String, got: String },

	#[error("no {record_type} record for {name}")]
	RecordNotFound { record_type: String, name: String },

	#[error("incomplete lookup request, type {record_type:?}, name {name:?}")]
	IncompleteLookupRequest { record_type: String, name: String },

	#[error("transport failure: {0}")]
	Transport(#[from] io::Error),

	#[error("failed to encode message: {0}")]
	Encode(serde_json::Error),

	#[error("failed to load {}: {reason}", path.display())]
	Config { path: PathBuf, reason: String },
}

impl Error {
	/// id of a DNSLookup whose record could not be decoded,
	/// the server still owes the sender an answer for it
	pub fn lookup_id(&self) -> Option<MsgId> {
		match self {
			Error::InvalidPayloadShape {
				id,
				msg_type: MessageType::DnsLookup,
				..
			} => Some(*id),
			_ => None,
		}
	}
}
