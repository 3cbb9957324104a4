// ==========================================
// 文档映射引擎 - 映射模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 分类: 致命错误（中止当前文档）/ 单元格错误（记入 ErrorMap 后继续）
// ==========================================

use thiserror::Error;

/// 映射模块错误类型
#[derive(Error, Debug)]
pub enum MapperError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("工作表不存在: {0}")]
    SheetNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .xlsx/.xlsm/.xls/.ods/.csv）")]
    UnsupportedFormat(String),

    #[error("文件读写失败: {0}")]
    Io(String),

    #[error("Excel 读取失败: {0}")]
    ExcelRead(String),

    #[error("CSV 读取失败: {0}")]
    CsvRead(String),

    #[error("Excel 写入失败: {0}")]
    Spreadsheet(String),

    // ===== 配置错误 =====
    #[error("映射配置错误: {0}")]
    Configuration(String),

    #[error("配置解析失败: {0}")]
    ConfigParse(String),

    // ===== 表头错误 =====
    #[error("表头校验失败 (行 {row}): 期望 '{expected}'，实际 '{actual}'")]
    HeaderMismatch {
        row: u32,
        expected: String,
        actual: String,
    },

    // ===== 单元格错误 =====
    #[error("类型转换失败 (字段 {field}): 数据格式错误 '{value}'")]
    Coercion { field: String, value: String },

    #[error("字段 {field} 的类型 '{kind}' 不支持转换")]
    UnsupportedType { field: String, kind: String },

    #[error("校验失败 (字段 {field}): {message}")]
    Validation { field: String, message: String },
}

impl MapperError {
    /// 是否为致命错误
    ///
    /// - true: 中止当前文档处理，直接返回调用方
    /// - false: 单元格级错误，记入 ErrorMap 后继续处理
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            MapperError::Coercion { .. } | MapperError::Validation { .. }
        )
    }
}

impl From<std::io::Error> for MapperError {
    fn from(err: std::io::Error) -> Self {
        MapperError::Io(err.to_string())
    }
}

impl From<calamine::Error> for MapperError {
    fn from(err: calamine::Error) -> Self {
        MapperError::ExcelRead(err.to_string())
    }
}

impl From<csv::Error> for MapperError {
    fn from(err: csv::Error) -> Self {
        MapperError::CsvRead(err.to_string())
    }
}

impl From<serde_json::Error> for MapperError {
    fn from(err: serde_json::Error) -> Self {
        MapperError::ConfigParse(err.to_string())
    }
}

impl From<umya_spreadsheet::XlsxError> for MapperError {
    fn from(err: umya_spreadsheet::XlsxError) -> Self {
        MapperError::Spreadsheet(err.to_string())
    }
}

/// Result 类型别名
pub type MapperResult<T> = Result<T, MapperError>;
