// ==========================================
// 文档映射引擎 - 日志初始化
// ==========================================
// tracing-subscriber: 过滤器取 RUST_LOG，缺省为 default_level
// 输出格式由 EngineConfig.log_format 决定（文本 / JSON）
// 全局 subscriber 只安装一次，重复调用返回 false
// ==========================================

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, EnvFilter};

/// 默认日志级别
pub const DEFAULT_LEVEL: &str = "info";

/// 日志输出格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// 人读文本（含 target 与行号）
    #[default]
    Text,
    /// 每行一个 JSON 对象，携带当前 span（批处理宿主采集用）
    Json,
}

impl LogFormat {
    /// "json" 不区分大小写 → Json；其他值一律 Text
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// 按格式安装全局 subscriber
///
/// 返回是否由本次调用完成安装
pub fn init_with(format: LogFormat, default_level: &str) -> bool {
    let builder = fmt().with_env_filter(filter(default_level));
    let installed = match format {
        LogFormat::Text => builder.with_target(true).with_line_number(true).try_init(),
        LogFormat::Json => builder.json().with_current_span(true).try_init(),
    };
    installed.is_ok()
}

/// 文本格式、info 级别
///
/// ```no_run
/// doc_mapper::logging::init();
/// ```
pub fn init() -> bool {
    init_with(LogFormat::Text, DEFAULT_LEVEL)
}

/// 测试用: debug 级别，输出交给测试框架捕获
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_format() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse(" JSON "), LogFormat::Json);
        assert_eq!(LogFormat::parse("text"), LogFormat::Text);
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Text);
    }

    #[test]
    fn test_format_serde() {
        assert_eq!(serde_json::to_string(&LogFormat::Json).unwrap(), "\"json\"");
        let parsed: LogFormat = serde_json::from_str("\"text\"").unwrap();
        assert_eq!(parsed, LogFormat::Text);
    }
}
