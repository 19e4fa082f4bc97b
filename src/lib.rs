//! # zonectl - DNS record management over a legacy SOAP/WSDL API
//!
//! zonectl manages DNS records on an authoritative name server that speaks
//! a restricted SOAP 1.1 wire protocol, and converges the live record state
//! toward a declared desired state.
//!
//! ## Modules
//!
//! - [`codec`] - typed value codec for the WSDL wire format
//! - [`envelope`] - request composition and response parsing
//! - [`transport`] - byte transport seam (HTTPS in production)
//! - [`client`] - one method per remote operation
//! - [`record`] - records, zones and record-set reports
//! - [`reconcile`] - pure desired-state reconciliation engine
//! - [`sync`] - the user-facing actions (get / converge / remove)
//!
//! The engine runs first and decides *what* to do without any I/O; the
//! client then performs the decided operations against the live service.

pub mod client;
pub mod codec;
pub mod config;
pub mod constants;
pub mod envelope;
pub mod error;
pub mod reconcile;
pub mod record;
pub mod sync;
pub mod transport;
pub mod validation;
