pub mod invoice_repository;
pub mod line_item_repository;

pub use invoice_repository::PostgresInvoiceRepository;
pub use line_item_repository::PostgresLineItemRepository;
