use std::fmt::Display;

use serde::{Deserialize, Serialize};

// field names are fixed by the peer implementation, case-sensitive
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
	// a missing Type or Name reads as empty, which makes the lookup incomplete
	#[serde(rename = "Type", default)]
	pub record_type: String,
	#[serde(rename = "Name", default)]
	pub name: String,
	#[serde(rename = "Value", default)]
	pub value: Option<String>,
	#[serde(rename = "TTL", default)]
	pub ttl: Option<i32>,
	// MX only
	#[serde(rename = "Priority", default)]
	pub priority: Option<i32>,
}

impl DnsRecord {
	/// a lookup request, only Type and Name are meaningful
	pub fn query(record_type: impl Into<String>, name: impl Into<String>) -> DnsRecord {
		DnsRecord {
			record_type: record_type.into(),
			name: name.into(),
			..Default::default()
		}
	}

	pub fn is_complete(&self) -> bool {
		!self.record_type.is_empty() && !self.name.is_empty()
	}

	pub fn matches(&self, record_type: &str, name: &str) -> bool {
		self.record_type == record_type && self.name == name
	}
}

// roughly the answer section of dig
impl Display for DnsRecord {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}\t", self.name)?;
		match self.ttl {
			Some(ttl) => write!(f, "{ttl}\t")?,
			None => write!(f, "-\t")?,
		}
		write!(f, "{}", self.record_type)?;
		if let Some(priority) = self.priority {
			write!(f, "\t{priority}")?;
		}
		write!(f, "\t{}", self.value.as_deref().unwrap_or("<unresolved>"))
	}
}
