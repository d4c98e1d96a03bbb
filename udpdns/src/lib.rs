// one client at a time, the server finishes a session before it accepts the next Hello
//
// client                      server
// 	Hello           ->
// 	                <-  Welcome
// 	DNSLookup       ->              (x4)
// 	                <-  DNSLookupReply | Error
// 	Ack             ->
// 	                <-  End

pub mod client;
pub mod server;

pub use client::{Client, ClientState, LOOKUPS};
pub use server::{Server, ServerOptions, ServerState, Session, LOOKUPS_PER_SESSION};
