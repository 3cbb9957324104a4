// ==========================================
// 文档映射引擎 - 核心库
// ==========================================
// 职责: 按映射配置把工作表单元格填充到强类型记录，
//       校验失败的单元格标注回 NG 文件；反向导出记录到工作表
// 技术栈: calamine（读）+ umya-spreadsheet（写/标注）
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 映射配置 / Grid / ErrorMap
pub mod domain;

// 映射层 - 读取、取值、转换、校验、标注、导出
pub mod mapper;

// 配置层 - 引擎配置
pub mod config;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// ==========================================
// 重导出核心类型
// ==========================================

pub use config::EngineConfig;

pub use domain::{
    CellError, CellErrorKind, ColumnDefinition, ContentBinding, DocumentMap, ErrorMap,
    FieldErrors, Grid,
};

pub use mapper::{
    DocumentProcessor, ErrorAnnotator, ExportWriter, FieldDescriptor, FieldKind, FieldRule,
    FieldValidator, FieldValue, MappedRecord, MapperError, MapperResult, ProcessOutcome,
    RecordSchema, TabularReader,
};

// ==========================================
// 常量定义
// ==========================================

// 版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 名称
pub const APP_NAME: &str = "文档映射引擎";
