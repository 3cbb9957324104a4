// ==========================================
// 文档映射引擎 - 配置层
// ==========================================
// 职责: 引擎运行参数（日期格式、数字习惯、标注样式、规则覆写）
// 来源: 默认值 → JSON 文件 → 环境变量
// ==========================================

pub mod engine_config;

pub use engine_config::{env_keys, EngineConfig};
