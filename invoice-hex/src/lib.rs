//! # Invoice Hex
//!
//! Invoice transaction engine and HTTP adapter for the invoice service.
//!
//! ## Architecture
//!
//! - `service/` - Application service (the engine; orchestrates domain operations)
//! - `inbound/` - HTTP adapter (Axum server)
//!
//! The service is generic over `R: LedgerRepository`, allowing
//! different ledger store implementations to be injected.

pub mod inbound;
pub mod service;


pub use service::{DEFAULT_REQUEST_TIMEOUT, InvoiceService};
