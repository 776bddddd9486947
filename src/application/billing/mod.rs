pub mod change_document_status;
pub mod convert_estimate;
pub mod create_document;
pub mod get_document_details;
pub mod recalculate_totals;
pub mod update_document;

pub use change_document_status::{
  ChangeDocumentStatusCommand, ChangeDocumentStatusResponse, ChangeDocumentStatusUseCase,
};
pub use convert_estimate::{
  ConvertEstimateCommand, ConvertEstimateResponse, ConvertEstimateUseCase,
};
pub use create_document::{
  CreateDocumentCommand, CreateDocumentResponse, CreateDocumentUseCase, DocumentLineItemDto,
};
pub use get_document_details::{
  DocumentDetailsResponse, DocumentLineItemDetailsDto, DocumentTotalsDto,
  GetDocumentDetailsCommand, GetDocumentDetailsUseCase,
};
pub use recalculate_totals::{
  RecalculateTotalsCommand, RecalculateTotalsResponse, RecalculateTotalsUseCase,
};
pub use update_document::{UpdateDocumentCommand, UpdateDocumentResponse, UpdateDocumentUseCase};
