use std::fmt::Display;

use log::*;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::{error::Error, record::DnsRecord};

pub type MsgId = u32;

// declaration order is the ordinal order, the peer may send MsgType as a number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
	Hello,
	Welcome,
	DnsLookup,
	DnsLookupReply,
	// never sent at top level
	DnsRecord,
	Ack,
	End,
	Error,
}

const MESSAGE_TYPES: [MessageType; 8] = [
	MessageType::Hello,
	MessageType::Welcome,
	MessageType::DnsLookup,
	MessageType::DnsLookupReply,
	MessageType::DnsRecord,
	MessageType::Ack,
	MessageType::End,
	MessageType::Error,
];

impl MessageType {
	pub fn as_str(self) -> &'static str {
		match self {
			MessageType::Hello => "Hello",
			MessageType::Welcome => "Welcome",
			MessageType::DnsLookup => "DNSLookup",
			MessageType::DnsLookupReply => "DNSLookupReply",
			MessageType::DnsRecord => "DNSRecord",
			MessageType::Ack => "Ack",
			MessageType::End => "End",
			MessageType::Error => "Error",
		}
	}

	fn from_value(v: &Value) -> Option<MessageType> {
		match v {
			Value::String(s) => MESSAGE_TYPES.iter().copied().find(|t| t.as_str() == s),
			Value::Number(n) => n
				.as_u64()
				.and_then(|n| MESSAGE_TYPES.get(usize::try_from(n).ok()?).copied()),
			_ => None,
		}
	}
}

impl Display for MessageType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

impl Serialize for MessageType {
	fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
		s.serialize_str(self.as_str())
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
	Hello(String),
	Welcome(String),
	DnsLookup(DnsRecord),
	DnsLookupReply(Option<DnsRecord>),
	/// id of the lookup being acknowledged
	Ack(MsgId),
	End(String),
	Error(String),
}

impl Body {
	pub fn msg_type(&self) -> MessageType {
		match self {
			Body::Hello(_) => MessageType::Hello,
			Body::Welcome(_) => MessageType::Welcome,
			Body::DnsLookup(_) => MessageType::DnsLookup,
			Body::DnsLookupReply(_) => MessageType::DnsLookupReply,
			Body::Ack(_) => MessageType::Ack,
			Body::End(_) => MessageType::End,
			Body::Error(_) => MessageType::Error,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
	pub id: MsgId,
	pub body: Body,
}

#[derive(Serialize)]
struct Envelope<'a> {
	#[serde(rename = "MsgId")]
	id: MsgId,
	#[serde(rename = "MsgType")]
	msg_type: MessageType,
	#[serde(rename = "Content")]
	content: Content<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Content<'a> {
	Text(&'a str),
	Record(Option<&'a DnsRecord>),
	Id(MsgId),
}

#[derive(Deserialize)]
struct RawEnvelope {
	#[serde(rename = "MsgId")]
	id: MsgId,
	#[serde(rename = "MsgType")]
	msg_type: Value,
	#[serde(rename = "Content", default)]
	content: Value,
}

impl Message {
	pub fn new(id: MsgId, body: Body) -> Message {
		Message { id, body }
	}

	pub fn msg_type(&self) -> MessageType {
		self.body.msg_type()
	}

	// no length prefix, one datagram is one message
	pub fn encode(&self) -> Result<Vec<u8>, Error> {
		let content = match &self.body {
			Body::Hello(s) | Body::Welcome(s) | Body::End(s) | Body::Error(s) => Content::Text(s),
			Body::DnsLookup(r) => Content::Record(Some(r)),
			Body::DnsLookupReply(r) => Content::Record(r.as_ref()),
			Body::Ack(id) => Content::Id(*id),
		};
		let envelope = Envelope {
			id: self.id,
			msg_type: self.msg_type(),
			content,
		};
		serde_json::to_vec(&envelope).map_err(Error::Encode)
	}

	pub fn decode(buf: &[u8]) -> Result<Message, Error> {
		Message::try_from(buf)
	}
}

impl TryFrom<&[u8]> for Message {
	type Error = Error;

	fn try_from(buf: &[u8]) -> Result<Self, Self::Error> {
		// generic decode first, the payload is only interpretable given MsgType
		let raw: RawEnvelope =
			serde_json::from_slice(buf).map_err(|e| Error::MalformedMessage(e.to_string()))?;
		let msg_type = MessageType::from_value(&raw.msg_type).ok_or_else(|| {
			Error::MalformedMessage(format!("unknown MsgType {}", raw.msg_type))
		})?;
		let body = decode_body(raw.id, msg_type, raw.content)?;
		Ok(Message::new(raw.id, body))
	}
}

fn decode_body(id: MsgId, msg_type: MessageType, content: Value) -> Result<Body, Error> {
	let shape = |reason: String| Error::InvalidPayloadShape {
		id,
		msg_type,
		reason,
	};
	let body = match msg_type {
		MessageType::Hello => Body::Hello(text(content).map_err(shape)?),
		MessageType::Welcome => Body::Welcome(text(content).map_err(shape)?),
		MessageType::End => Body::End(text(content).map_err(shape)?),
		MessageType::Error => Body::Error(text(content).map_err(shape)?),
		MessageType::DnsLookup => {
			Body::DnsLookup(serde_json::from_value(content).map_err(|e| shape(e.to_string()))?)
		}
		MessageType::DnsLookupReply => {
			Body::DnsLookupReply(serde_json::from_value(content).map_err(|e| shape(e.to_string()))?)
		}
		MessageType::Ack => {
			Body::Ack(serde_json::from_value(content).map_err(|e| shape(e.to_string()))?)
		}
		MessageType::DnsRecord => {
			return Err(shape("DNSRecord is not a top level message type".into()));
		}
	};
	Ok(body)
}

fn text(content: Value) -> Result<String, String> {
	match content {
		Value::String(s) => Ok(s),
		Value::Null => {
			trace!("null text content read as empty");
			Ok(String::new())
		}
		other => Err(format!("expecting a string, got {other}")),
	}
}

impl Display for Message {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "#{} {}", self.id, self.msg_type())?;
		match &self.body {
			Body::Hello(s) | Body::Welcome(s) | Body::End(s) | Body::Error(s) => {
				write!(f, " {s:?}")
			}
			Body::DnsLookup(r) => write!(f, " {} {}", r.record_type, r.name),
			Body::DnsLookupReply(Some(r)) => write!(f, " {r}"),
			Body::DnsLookupReply(None) => write!(f, " <empty>"),
			Body::Ack(id) => write!(f, " #{id}"),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn outlook() -> DnsRecord {
		DnsRecord {
			record_type: "A".into(),
			name: "www.outlook.com".into(),
			value: Some("52.96.0.1".into()),
			ttl: Some(3600),
			priority: None,
		}
	}

	fn encode_str(m: &Message) -> String {
		String::from_utf8(m.encode().unwrap()).unwrap()
	}

	#[test]
	fn test_wire_format() {
		let hello = Message::new(1, Body::Hello("Hello from client".into()));
		assert_eq!(
			encode_str(&hello),
			r#"{"MsgId":1,"MsgType":"Hello","Content":"Hello from client"}"#
		);

		let lookup = Message::new(2, Body::DnsLookup(DnsRecord::query("A", "www.outlook.com")));
		assert_eq!(
			encode_str(&lookup),
			r#"{"MsgId":2,"MsgType":"DNSLookup","Content":{"Type":"A","Name":"www.outlook.com","Value":null,"TTL":null,"Priority":null}}"#
		);

		let ack = Message::new(3, Body::Ack(2));
		assert_eq!(encode_str(&ack), r#"{"MsgId":3,"MsgType":"Ack","Content":2}"#);

		let empty = Message::new(4, Body::DnsLookupReply(None));
		assert_eq!(
			encode_str(&empty),
			r#"{"MsgId":4,"MsgType":"DNSLookupReply","Content":null}"#
		);
	}

	#[test]
	fn test_round_trip() {
		let msgs = [
			Message::new(1, Body::Hello("Hello from client".into())),
			Message::new(1, Body::Welcome("Welcome from server".into())),
			Message::new(2, Body::DnsLookup(DnsRecord::query("XYZ", ""))),
			Message::new(2, Body::DnsLookupReply(Some(outlook()))),
			Message::new(2, Body::DnsLookupReply(None)),
			Message::new(3, Body::Ack(2)),
			Message::new(9, Body::End("End of communication".into())),
			Message::new(4, Body::Error("DNS record not found".into())),
		];
		for m in msgs {
			let buf = m.encode().unwrap();
			assert_eq!(Message::decode(&buf).unwrap(), m);
		}
	}

	#[test]
	fn test_decode_numeric_type() {
		let m = Message::decode(br#"{"MsgId":7,"MsgType":5,"Content":3}"#).unwrap();
		assert_eq!(m, Message::new(7, Body::Ack(3)));

		let m = Message::decode(
			br#"{"MsgId":8,"MsgType":3,"Content":{"Type":"A","Name":"www.outlook.com","Value":"52.96.0.1","TTL":3600,"Priority":null}}"#,
		)
		.unwrap();
		assert_eq!(m, Message::new(8, Body::DnsLookupReply(Some(outlook()))));
	}

	#[test]
	fn test_decode_lenient_fields() {
		// missing Name reads as empty, missing Content on a text type reads as empty
		let buf = br#"{"MsgId":2,"MsgType":"DNSLookup","Content":{"Type":"A"}}"#;
		let m = Message::decode(buf).unwrap();
		assert_eq!(m.body, Body::DnsLookup(DnsRecord::query("A", "")));

		let m = Message::decode(br#"{"MsgId":9,"MsgType":"End"}"#).unwrap();
		assert_eq!(m.body, Body::End(String::new()));
	}

	#[test]
	fn test_malformed() {
		let cases: &[&[u8]] = &[
			b"",
			b"\xff\xfe",
			b"not json",
			br#""Hello""#,
			br#"{"MsgType":"Hello","Content":"x"}"#,
			br#"{"MsgId":-1,"MsgType":"Hello","Content":"x"}"#,
			br#"{"MsgId":1,"MsgType":"hello","Content":"x"}"#,
			br#"{"MsgId":1,"MsgType":8,"Content":"x"}"#,
			br#"{"MsgId":1,"Content":"x"}"#,
			br#"{"MsgId":1,"MsgType":"Hello","Content":"x""#,
		];
		for &buf in cases {
			match Message::decode(buf) {
				Err(Error::MalformedMessage(_)) => {}
				other => panic!(
					"{:?}: expecting MalformedMessage, got {other:?}",
					String::from_utf8_lossy(buf)
				),
			}
		}
	}

	#[test]
	fn test_invalid_payload_shape() {
		let e = Message::decode(br#"{"MsgId":5,"MsgType":"DNSLookup","Content":42}"#).unwrap_err();
		assert!(matches!(
			e,
			Error::InvalidPayloadShape {
				id: 5,
				msg_type: MessageType::DnsLookup,
				..
			}
		));
		assert_eq!(e.lookup_id(), Some(5));

		let e = Message::decode(br#"{"MsgId":6,"MsgType":"Ack","Content":"2"}"#).unwrap_err();
		assert!(matches!(e, Error::InvalidPayloadShape { id: 6, msg_type: MessageType::Ack, .. }));
		assert_eq!(e.lookup_id(), None);

		let e = Message::decode(br#"{"MsgId":1,"MsgType":"Hello","Content":{"a":1}}"#).unwrap_err();
		assert!(matches!(e, Error::InvalidPayloadShape { msg_type: MessageType::Hello, .. }));

		let e =
			Message::decode(br#"{"MsgId":1,"MsgType":"DNSRecord","Content":null}"#).unwrap_err();
		assert!(matches!(e, Error::InvalidPayloadShape { msg_type: MessageType::DnsRecord, .. }));
	}

	#[test]
	fn test_display() {
		let m = Message::new(2, Body::DnsLookup(DnsRecord::query("A", "www.outlook.com")));
		assert_eq!(m.to_string(), "#2 DNSLookup A www.outlook.com");
		assert_eq!(Message::new(3, Body::Ack(2)).to_string(), "#3 Ack #2");
	}
}
