// ==========================================
// 文档映射引擎 - 映射层
// ==========================================
// 数据流:
//   表格读取 → Grid
//   Grid + 映射 → 表头校验（快速失败）→ 取值 → 转换/校验 → ErrorMap
//   ErrorMap → 错误标注 → NG 文件
// 导出方向: 记录 + 映射 → 导出写入器 → 工作表
// ==========================================

// 模块声明
pub mod coercion;
pub mod document_processor;
pub mod error;
pub mod error_annotator;
pub mod export_writer;
pub mod field_resolver;
pub mod header_validator;
pub mod record;
pub mod tabular_reader;
pub mod validation;
pub mod value_grafter;

// 重导出核心类型
pub use coercion::{coerce, parse_date, parse_decimal, NumberConventions, DATE_PATTERNS};
pub use document_processor::{DocumentProcessor, ProcessOutcome};
pub use error::{MapperError, MapperResult};
pub use error_annotator::ErrorAnnotator;
pub use export_writer::{apply_date_format, write_header, write_rows, ExportWriter};
pub use field_resolver::{resolve_for, resolve_system_name};
pub use header_validator::{check_headers, validate_headers};
pub use record::{FieldDescriptor, FieldKind, FieldRule, FieldValue, MappedRecord, RecordSchema};
pub use tabular_reader::{CsvGridReader, ExcelGridReader, GridReader, TabularReader};
pub use validation::{FieldValidator, RuleSet};
pub use value_grafter::{extract_value, locate_cell, GraftedCell};
