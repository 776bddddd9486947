//! billflow — invoicing & estimating engine.
//!
//! Organizations issue invoices and estimates made of line items; the engine
//! computes subtotal/tax/total with exact minor-unit integer arithmetic,
//! applies document-level adjustment/TDS/TCS rules, and converts estimates
//! into freshly numbered invoices. Layered hexagonally: `domain` holds the
//! financial model and ports, `application` the use-case DTO layer, and
//! `infrastructure` the configuration and Postgres adapters.

pub mod application;
pub mod domain;
pub mod infrastructure;
