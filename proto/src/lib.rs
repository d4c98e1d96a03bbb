// a private JSON over UDP record lookup protocol, not RFC 1035
//
// every datagram carries exactly one envelope:
// 	{"MsgId": 1, "MsgType": "DNSLookup", "Content": {"Type": "A", "Name": ..}}
// Content is interpreted by MsgType

mod error;
mod message;
mod record;
mod settings;
mod store;
mod transport;

pub use error::Error;
pub use message::{Body, Message, MessageType, MsgId};
pub use record::DnsRecord;
pub use settings::Settings;
pub use store::{RecordFile, RecordStore, Resolver};
pub use transport::{Datagram, Endpoint, RECV_BUF_LEN};
