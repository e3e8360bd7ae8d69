pub mod batch;
pub mod invocation;
pub mod loaders;
pub mod request;
pub mod result;

pub use batch::{BatchInput, BatchRow, BatchSummary, RowOutcome};
pub use invocation::{ModelCallSpec, ModelKind, RawModelResponse, StageKind};
pub use loaders::{load_csv_file, parse_csv, save_csv_file, write_csv, CsvTable};
pub use request::{AnswerSource, GradingRequest};
pub use result::{
    DiagnosticResult, DiagnosticStatus, GradeOutcome, GradeValue, GradingResult, Normalized,
    PageEntry, StageTiming, StructuredPage,
};
