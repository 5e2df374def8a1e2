//! NX9 DNS Forwarder Library
//!
//! This library decodes DNS queries received over UDP, forwards each question
//! to a single upstream resolver (or answers locally), and encodes the reply.

pub mod errors;
pub mod config;
pub mod utils;
pub mod name;
pub mod header;
pub mod message;
pub mod response;
pub mod resolver;
pub mod handlers;

// Re-export commonly used items
pub use errors::DnsError;
pub use config::ServerConfig;
pub use handlers::DnsServer;
pub use message::{Message, Question, ResourceRecord};
pub use name::Name;
