// ==========================================
// 文档映射引擎 - 字段解析器
// ==========================================
// 职责: 逻辑属性名 → 系统键
// 说明: 任何声明了相同系统键约定的记录类型都可复用同一份映射
// ==========================================

use crate::mapper::error::{MapperError, MapperResult};
use crate::mapper::record::{MappedRecord, RecordSchema};

/// 解析属性的系统键
///
/// # 错误
/// - Configuration: 属性不存在 / 未声明系统键 / 系统键为空
pub fn resolve_system_name<'a>(schema: &'a RecordSchema, property: &str) -> MapperResult<&'a str> {
    let descriptor = schema.descriptor(property).ok_or_else(|| {
        MapperError::Configuration(format!(
            "类型 '{}' 中不存在属性 '{}'",
            schema.type_name(),
            property
        ))
    })?;

    match descriptor.system_key.as_deref() {
        Some(key) if !key.trim().is_empty() => Ok(key),
        Some(_) => Err(MapperError::Configuration(format!(
            "属性 '{}' 的系统键为空",
            property
        ))),
        None => Err(MapperError::Configuration(format!(
            "属性 '{}' 未声明系统键",
            property
        ))),
    }
}

/// 按记录类型解析（`resolve_system_name(R::schema(), property)` 的便捷形式）
pub fn resolve_for<R: MappedRecord>(property: &str) -> MapperResult<&'static str> {
    resolve_system_name(R::schema(), property)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::record::fixtures::Invoice;
    use crate::mapper::record::{FieldDescriptor, FieldKind};

    #[test]
    fn test_resolve_declared_property() {
        assert_eq!(resolve_for::<Invoice>("amount").unwrap(), "AMOUNT");
        assert_eq!(resolve_for::<Invoice>("invoice_date").unwrap(), "INV_DATE");
    }

    #[test]
    fn test_resolve_unknown_property() {
        let err = resolve_for::<Invoice>("missing").unwrap_err();
        assert!(matches!(err, MapperError::Configuration(_)));
    }

    #[test]
    fn test_resolve_property_without_system_key() {
        let err = resolve_for::<Invoice>("note").unwrap_err();
        assert!(matches!(err, MapperError::Configuration(_)));
    }

    #[test]
    fn test_resolve_blank_system_key() {
        let schema = RecordSchema::new("Blank")
            .field(FieldDescriptor::new("name", FieldKind::String).system_key("  "));

        assert!(matches!(
            resolve_system_name(&schema, "name"),
            Err(MapperError::Configuration(_))
        ));
    }
}
