use std::{
	fs,
	path::{Path, PathBuf},
};

use log::*;

use crate::{error::Error, record::DnsRecord};

pub trait Resolver {
	fn resolve(&self, record_type: &str, name: &str) -> Option<DnsRecord>;
}

impl<R: Resolver + ?Sized> Resolver for Box<R> {
	fn resolve(&self, record_type: &str, name: &str) -> Option<DnsRecord> {
		(**self).resolve(record_type, name)
	}
}

/// static record table, loaded once
#[derive(Debug, Default)]
pub struct RecordStore {
	records: Vec<DnsRecord>,
}

impl RecordStore {
	pub fn new(records: Vec<DnsRecord>) -> RecordStore {
		RecordStore { records }
	}

	// a broken record file means no records, not a dead server
	pub fn load(path: impl AsRef<Path>) -> RecordStore {
		let path = path.as_ref();
		match read_records(path) {
			Ok(records) => {
				debug!("{} records loaded from {}", records.len(), path.display());
				RecordStore::new(records)
			}
			Err(e) => {
				error!("{e}");
				RecordStore::default()
			}
		}
	}

	pub fn len(&self) -> usize {
		self.records.len()
	}

	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}

	// linear scan, first match wins
	pub fn lookup(&self, record_type: &str, name: &str) -> Option<&DnsRecord> {
		self.records.iter().find(|r| r.matches(record_type, name))
	}
}

impl Resolver for RecordStore {
	fn resolve(&self, record_type: &str, name: &str) -> Option<DnsRecord> {
		self.lookup(record_type, name).cloned()
	}
}

/// re-reads the record file on every lookup, so edits show up without a restart
pub struct RecordFile {
	path: PathBuf,
}

impl RecordFile {
	pub fn new(path: impl Into<PathBuf>) -> RecordFile {
		RecordFile { path: path.into() }
	}
}

impl Resolver for RecordFile {
	fn resolve(&self, record_type: &str, name: &str) -> Option<DnsRecord> {
		RecordStore::load(&self.path)
			.lookup(record_type, name)
			.cloned()
	}
}

fn read_records(path: &Path) -> Result<Vec<DnsRecord>, Error> {
	let config_err = |reason: String| Error::Config {
		path: path.to_path_buf(),
		reason,
	};
	let buf = fs::read(path).map_err(|e| config_err(e.to_string()))?;
	serde_json::from_slice(&buf).map_err(|e| config_err(e.to_string()))
}

#[cfg(test)]
mod tests {
	use tempfile::NamedTempFile;

	use super::*;

	fn record(t: &str, name: &str, value: &str) -> DnsRecord {
		DnsRecord {
			value: Some(value.into()),
			ttl: Some(3600),
			..DnsRecord::query(t, name)
		}
	}

	fn write_file(f: &mut NamedTempFile, s: &str) {
		fs::write(f.path(), s).unwrap();
	}

	#[test]
	fn test_first_match_wins() {
		let store = RecordStore::new(vec![
			record("A", "www.outlook.com", "52.96.0.1"),
			record("MX", "www.outlook.com", "mx.outlook.com"),
			record("A", "www.outlook.com", "52.96.0.2"),
		]);
		assert_eq!(store.len(), 3);
		let r = store.lookup("A", "www.outlook.com").unwrap();
		assert_eq!(r.value.as_deref(), Some("52.96.0.1"));
		let r = store.resolve("MX", "www.outlook.com").unwrap();
		assert_eq!(r.value.as_deref(), Some("mx.outlook.com"));
	}

	#[test]
	fn test_no_match() {
		let store = RecordStore::new(vec![record("A", "www.outlook.com", "52.96.0.1")]);
		assert!(store.lookup("A", "WWW.OUTLOOK.COM").is_none());
		assert!(store.lookup("AAAA", "www.outlook.com").is_none());
		assert!(store.lookup("", "").is_none());
		assert!(RecordStore::default().lookup("A", "www.outlook.com").is_none());
	}

	#[test]
	fn test_load() {
		let mut f = NamedTempFile::new().unwrap();
		write_file(
			&mut f,
			r#"[
				{"Type":"A","Name":"www.outlook.com","Value":"52.96.0.1","TTL":3600,"Priority":null},
				{"Type":"MX","Name":"example.com","Value":"mail.example.com","TTL":3600,"Priority":10}
			]"#,
		);
		let store = RecordStore::load(f.path());
		assert_eq!(store.len(), 2);
		let mx = store.lookup("MX", "example.com").unwrap();
		assert_eq!(mx.priority, Some(10));
	}

	#[test]
	fn test_load_failure_is_empty() {
		let store = RecordStore::load("/nonexistent/DNSRecords.json");
		assert!(store.is_empty());

		let mut f = NamedTempFile::new().unwrap();
		write_file(&mut f, "{ not a list");
		assert!(RecordStore::load(f.path()).is_empty());
	}

	#[test]
	fn test_record_file_rereads() {
		let mut f = NamedTempFile::new().unwrap();
		write_file(&mut f, r#"[{"Type":"A","Name":"a.example","Value":"10.0.0.1"}]"#);
		let rf = RecordFile::new(f.path());
		assert_eq!(
			rf.resolve("A", "a.example").unwrap().value.as_deref(),
			Some("10.0.0.1")
		);

		write_file(&mut f, r#"[{"Type":"A","Name":"a.example","Value":"10.0.0.2"}]"#);
		assert_eq!(
			rf.resolve("A", "a.example").unwrap().value.as_deref(),
			Some("10.0.0.2")
		);

		write_file(&mut f, "garbage");
		assert!(rf.resolve("A", "a.example").is_none());
	}

	#[test]
	fn test_boxed() {
		let r: Box<dyn Resolver> = Box::new(RecordStore::new(vec![record("A", "x", "1.1.1.1")]));
		assert!(r.resolve("A", "x").is_some());
	}
}
