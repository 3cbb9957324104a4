// ==========================================
// 文档映射引擎 - 领域模型层
// ==========================================
// 职责: 定义映射配置、表格快照、错误聚合等纯数据结构
// 红线: 不含文件读写逻辑,不含转换/校验逻辑
// ==========================================

pub mod document_map;
pub mod error_map;
pub mod grid;

// 重导出核心类型
pub use document_map::{ColumnDefinition, ContentBinding, DocumentMap};
pub use error_map::{CellError, CellErrorKind, ErrorMap, FieldErrors};
pub use grid::Grid;
