// ==========================================
// 文档映射引擎 - 引擎配置
// ==========================================
// 来源（后者覆盖前者）:
//   1. 默认值
//   2. JSON 配置文件（from_json_file）
//   3. 环境变量（with_env_overrides）
// 日志: init_logging 按 log_format / log_level 安装 subscriber
// ==========================================

use crate::mapper::coercion::NumberConventions;
use crate::mapper::error::{MapperError, MapperResult};
use crate::mapper::error_annotator::{
    ErrorAnnotator, DEFAULT_COMMENT_FONT_SIZE, DEFAULT_HIGHLIGHT_COLOR,
};
use crate::logging::{self, LogFormat};
use crate::mapper::validation::{FieldValidator, RuleSet};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// 环境变量键
pub mod env_keys {
    pub const DATE_FORMAT: &str = "DOC_MAPPER_DATE_FORMAT";
    pub const LOCALE: &str = "DOC_MAPPER_LOCALE";
    pub const HIGHLIGHT_COLOR: &str = "DOC_MAPPER_HIGHLIGHT_COLOR";
    pub const SKIP_BLANK_ROWS: &str = "DOC_MAPPER_SKIP_BLANK_ROWS";
    pub const LOG_FORMAT: &str = "DOC_MAPPER_LOG_FORMAT";
    pub const LOG_LEVEL: &str = "DOC_MAPPER_LOG_LEVEL";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 读取日期单元格的输出格式（chrono strftime）；映射自带格式时以映射为准
    pub date_format: Option<String>,
    /// 导出时日期列的 Excel 数字格式
    pub export_date_format: String,
    /// 标注高亮色（ARGB）
    pub highlight_color: String,
    pub comment_font_size: f64,
    /// 数字习惯所依据的语言；缺省跟随 i18n 当前语言
    pub locale: Option<String>,
    /// 跳过所有表格型单元格均为空的数据行
    pub skip_blank_rows: bool,
    /// 按属性名追加的校验规则
    pub rule_overrides: RuleSet,
    pub log_format: LogFormat,
    /// RUST_LOG 未设置时的日志级别
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            date_format: None,
            export_date_format: "yyyy-mm-dd".to_string(),
            highlight_color: DEFAULT_HIGHLIGHT_COLOR.to_string(),
            comment_font_size: DEFAULT_COMMENT_FONT_SIZE,
            locale: None,
            skip_blank_rows: true,
            rule_overrides: RuleSet::new(),
            log_format: LogFormat::default(),
            log_level: logging::DEFAULT_LEVEL.to_string(),
        }
    }
}

fn is_true(v: &str) -> bool {
    matches!(
        v.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}

impl EngineConfig {
    /// 从 JSON 文件加载（未出现的键取默认值）
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> MapperResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(MapperError::FileNotFound(path.display().to_string()));
        }
        let raw = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&raw)?;
        debug!("加载引擎配置: {}", path.display());
        Ok(config)
    }

    /// 默认值 + 环境变量
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 以进程环境变量覆盖当前配置
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// 以任意键值来源覆盖当前配置
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty(env_keys::DATE_FORMAT) {
            self.date_format = Some(v);
        }
        if let Some(v) = non_empty(env_keys::LOCALE) {
            self.locale = Some(v);
        }
        if let Some(v) = non_empty(env_keys::HIGHLIGHT_COLOR) {
            self.highlight_color = v;
        }
        if let Some(v) = non_empty(env_keys::SKIP_BLANK_ROWS) {
            self.skip_blank_rows = is_true(&v);
        }
        if let Some(v) = non_empty(env_keys::LOG_FORMAT) {
            self.log_format = LogFormat::parse(&v);
        }
        if let Some(v) = non_empty(env_keys::LOG_LEVEL) {
            self.log_level = v.trim().to_string();
        }
        self
    }

    /// 数字习惯：优先配置的语言，否则 i18n 当前语言
    pub fn number_conventions(&self) -> NumberConventions {
        match &self.locale {
            Some(locale) => NumberConventions::for_locale(locale),
            None => NumberConventions::current(),
        }
    }

    pub fn validator(&self) -> FieldValidator {
        FieldValidator::new(self.number_conventions()).with_overrides(self.rule_overrides.clone())
    }

    pub fn annotator(&self) -> ErrorAnnotator {
        ErrorAnnotator::new(self.highlight_color.clone(), self.comment_font_size)
    }

    /// 按配置安装全局日志；已安装时返回 false
    pub fn init_logging(&self) -> bool {
        logging::init_with(self.log_format, &self.log_level)
    }
}
