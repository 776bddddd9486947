pub mod entities;
pub mod errors;
pub mod formatter;
pub mod ports;
pub mod services;
pub mod value_objects;

pub use entities::{Invoice, InvoiceTotals, LineItem};
pub use errors::BillingError;
pub use formatter::{CurrencyFormatter, DefaultCurrencyFormatter};
pub use ports::{InvoiceRepository, LineItemRepository};
pub use services::{
  BillingService, BillingServiceConfig, DocumentData, DocumentUpdateData, LineItemData,
  RecalculationPolicy,
};
pub use value_objects::{
  Amount, CurrencyCode, DocumentKind, DocumentNumber, DocumentStatus, ExchangeRate,
  LineItemDescription, Quantity, TaxRate, ValueObjectError,
};
