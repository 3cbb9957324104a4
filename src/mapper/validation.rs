// ==========================================
// 文档映射引擎 - 赋值与字段校验
// ==========================================
// 状态流转（单字段）:
//   UNVALIDATED → 取值 → COERCED | COERCION_FAILED(终态,记错)
//   COERCED → VALIDATED | VALIDATION_FAILED(终态,记错)
// 单元格错误记入 ErrorMap 后继续；配置类错误直接返回
// ==========================================

use crate::domain::{CellError, CellErrorKind, ErrorMap};
use crate::i18n;
use crate::mapper::coercion::{coerce, coercion_message, NumberConventions};
use crate::mapper::error::{MapperError, MapperResult};
use crate::mapper::record::{FieldRule, FieldValue, MappedRecord};
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// 按属性名追加的规则集（来自配置）
pub type RuleSet = HashMap<String, Vec<FieldRule>>;

// ==========================================
// PatternCache - 已编译正则（按模式文本缓存，克隆间共享）
// ==========================================
#[derive(Debug, Clone, Default)]
struct PatternCache {
    compiled: Arc<Mutex<HashMap<String, Regex>>>,
}

impl PatternCache {
    /// 整值匹配: 模式两端自动加锚
    fn get(&self, pattern: &str) -> Result<Regex, String> {
        let mut cache = self
            .compiled
            .lock()
            .map_err(|e| format!("正则缓存锁失败: {}", e))?;

        if let Some(re) = cache.get(pattern) {
            return Ok(re.clone());
        }

        let re = Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| e.to_string())?;
        cache.insert(pattern.to_string(), re.clone());
        Ok(re)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.compiled.lock().map(|c| c.len()).unwrap_or(0)
    }
}

// ==========================================
// FieldValidator
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct FieldValidator {
    conventions: NumberConventions,
    overrides: RuleSet,
    patterns: PatternCache,
}

impl FieldValidator {
    pub fn new(conventions: NumberConventions) -> Self {
        Self {
            conventions,
            overrides: RuleSet::new(),
            patterns: PatternCache::default(),
        }
    }

    /// 使用当前 i18n 语言的数字习惯
    pub fn for_current_locale() -> Self {
        Self::new(NumberConventions::current())
    }

    pub fn with_overrides(mut self, overrides: RuleSet) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn conventions(&self) -> NumberConventions {
        self.conventions
    }

    /// 转换并赋值，然后执行该字段声明的校验规则
    ///
    /// # 参数
    /// - row: 单元格行号（1 起）。为 None 时只赋值不校验，且转换失败直接返回错误
    /// - column: 单元格列号（1 起）
    ///
    /// # 返回
    /// - Ok(ErrorMap): 成功时为空；单元格级失败按属性名记录
    /// - Err: 属性未知 / 类型不受支持 / 记录拒绝写入
    pub fn set_and_validate<R: MappedRecord>(
        &self,
        record: &mut R,
        property: &str,
        raw: Option<&str>,
        row: Option<u32>,
        column: u32,
    ) -> MapperResult<ErrorMap> {
        let schema = R::schema();
        let descriptor = schema.descriptor(property).ok_or_else(|| {
            MapperError::Configuration(format!(
                "类型 '{}' 中不存在属性 '{}'",
                schema.type_name(),
                property
            ))
        })?;

        let mut errors = ErrorMap::new();
        let raw_value = raw.map(str::to_string);

        let value = match coerce(property, &descriptor.kind, raw, self.conventions) {
            Ok(v) => v,
            Err(MapperError::Coercion { field, value }) => match row {
                Some(row) => {
                    debug!(field = %field, row, column, "类型转换失败: '{}'", value);
                    errors.push(
                        CellError {
                            field: property.to_string(),
                            row,
                            column,
                            message: coercion_message(&field, &value),
                            kind: CellErrorKind::Coercion,
                        },
                        raw_value,
                    );
                    return Ok(errors);
                }
                None => return Err(MapperError::Coercion { field, value }),
            },
            Err(e) => return Err(e),
        };

        record.set_field(property, value.clone())?;

        let row = match row {
            Some(row) => row,
            None => return Ok(errors),
        };

        let extra = self.overrides.get(property).map(Vec::as_slice).unwrap_or(&[]);
        for rule in descriptor.rules.iter().chain(extra) {
            if let Some(message) = self.check_rule(rule, property, &value)? {
                debug!(field = property, row, column, "字段校验失败: {}", message);
                errors.push(
                    CellError {
                        field: property.to_string(),
                        row,
                        column,
                        message,
                        kind: CellErrorKind::Validation,
                    },
                    raw_value.clone(),
                );
            }
        }

        Ok(errors)
    }

    /// 执行单条规则；返回失败消息（通过时为 None）
    ///
    /// Null 值只受 Required 约束，其余规则视为通过
    pub fn check_rule(
        &self,
        rule: &FieldRule,
        field: &str,
        value: &FieldValue,
    ) -> MapperResult<Option<String>> {
        let failure = match rule {
            FieldRule::Required { message } => {
                let missing = match value {
                    FieldValue::Null => true,
                    FieldValue::Text(s) => s.trim().is_empty(),
                    _ => false,
                };
                missing.then(|| {
                    message
                        .clone()
                        .unwrap_or_else(|| i18n::t_with_args("validation.required", &[("field", field)]))
                })
            }
            FieldRule::Length { min, max, message } => match value {
                FieldValue::Text(s) => {
                    let len = s.chars().count();
                    if let Some(min) = min.filter(|m| len < *m) {
                        Some(message.clone().unwrap_or_else(|| {
                            i18n::t_with_args(
                                "validation.length_min",
                                &[("field", field), ("min", &min.to_string())],
                            )
                        }))
                    } else if let Some(max) = max.filter(|m| len > *m) {
                        Some(message.clone().unwrap_or_else(|| {
                            i18n::t_with_args(
                                "validation.length_max",
                                &[("field", field), ("max", &max.to_string())],
                            )
                        }))
                    } else {
                        None
                    }
                }
                _ => None,
            },
            FieldRule::Range { min, max, message } => {
                let number = match value {
                    FieldValue::Decimal(v) => Some(*v),
                    FieldValue::Integer(v) => Some(f64::from(*v)),
                    _ => None,
                };
                match number {
                    Some(n) => {
                        if let Some(min) = min.filter(|m| n < *m) {
                            Some(message.clone().unwrap_or_else(|| {
                                i18n::t_with_args(
                                    "validation.range_min",
                                    &[("field", field), ("min", &min.to_string())],
                                )
                            }))
                        } else if let Some(max) = max.filter(|m| n > *m) {
                            Some(message.clone().unwrap_or_else(|| {
                                i18n::t_with_args(
                                    "validation.range_max",
                                    &[("field", field), ("max", &max.to_string())],
                                )
                            }))
                        } else {
                            None
                        }
                    }
                    None => None,
                }
            }
            FieldRule::Pattern { pattern, message } => match value {
                FieldValue::Text(s) if !s.is_empty() => {
                    let re = self.patterns.get(pattern).map_err(|e| {
                        MapperError::Configuration(format!(
                            "字段 '{}' 的正则 '{}' 无效: {}",
                            field, pattern, e
                        ))
                    })?;
                    (!re.is_match(s)).then(|| {
                        message
                            .clone()
                            .unwrap_or_else(|| i18n::t_with_args("validation.pattern", &[("field", field)]))
                    })
                }
                _ => None,
            },
        };

        Ok(failure)
    }
}
