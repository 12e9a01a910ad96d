// 该文件是 Amenity Vision 项目的一部分。
// src/model/labels.rs - 类别标签表
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Amenity Vision Authors

use std::collections::{BTreeMap, HashMap};

use crate::error::ModelLoadError;

/// 类别编号到名称的映射，随模型文件一起发布
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelTable {
  names: BTreeMap<u32, String>,
}

impl LabelTable {
  pub fn get(&self, class_id: u32) -> Option<&str> {
    self.names.get(&class_id).map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }

  /// 解析导出器写入 ONNX 元数据的 `names` 字段，
  /// 形如 `{0: 'smoke_detector', 1: "fire_extinguisher"}`
  pub fn from_metadata(text: &str) -> Result<Self, ModelLoadError> {
    let body = text
      .trim()
      .strip_prefix('{')
      .and_then(|s| s.strip_suffix('}'))
      .ok_or_else(|| ModelLoadError::InvalidLabels(format!("缺少花括号: {}", text)))?;

    let mut names = BTreeMap::new();
    let mut rest = body.trim_start();
    while !rest.is_empty() {
      let (key, after_key) = rest
        .split_once(':')
        .ok_or_else(|| ModelLoadError::InvalidLabels(format!("缺少冒号: {}", rest)))?;
      let class_id: u32 = key
        .trim()
        .parse()
        .map_err(|_| ModelLoadError::InvalidLabels(format!("类别编号无效: {}", key.trim())))?;

      let after_key = after_key.trim_start();
      let quote = after_key
        .chars()
        .next()
        .filter(|c| *c == '\'' || *c == '"')
        .ok_or_else(|| ModelLoadError::InvalidLabels(format!("类别名称缺少引号: {}", after_key)))?;
      let value = &after_key[1..];
      let end = value
        .find(quote)
        .ok_or_else(|| ModelLoadError::InvalidLabels(format!("类别名称引号未闭合: {}", after_key)))?;
      names.insert(class_id, value[..end].to_string());

      rest = value[end + 1..].trim_start();
      rest = rest.strip_prefix(',').unwrap_or(rest).trim_start();
    }

    Ok(LabelTable { names })
  }

  /// 解析 JSON 格式的标签文件 `{"0": "smoke_detector"}`
  pub fn from_json(text: &str) -> Result<Self, ModelLoadError> {
    let raw: HashMap<String, String> =
      serde_json::from_str(text).map_err(|e| ModelLoadError::InvalidLabels(e.to_string()))?;
    raw
      .into_iter()
      .map(|(key, name)| {
        key
          .trim()
          .parse::<u32>()
          .map(|id| (id, name))
          .map_err(|_| ModelLoadError::InvalidLabels(format!("类别编号无效: {}", key)))
      })
      .collect::<Result<BTreeMap<_, _>, _>>()
      .map(|names| LabelTable { names })
  }
}

impl<S: Into<String>> FromIterator<(u32, S)> for LabelTable {
  fn from_iter<I: IntoIterator<Item = (u32, S)>>(iter: I) -> Self {
    LabelTable {
      names: iter.into_iter().map(|(id, name)| (id, name.into())).collect(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_exporter_metadata() {
    let table =
      LabelTable::from_metadata("{0: 'bed', 1: \"smoke_detector\", 12: 'fire extinguisher'}").unwrap();
    assert_eq!(table.len(), 3);
    assert_eq!(table.get(0), Some("bed"));
    assert_eq!(table.get(1), Some("smoke_detector"));
    assert_eq!(table.get(12), Some("fire extinguisher"));
    assert_eq!(table.get(2), None);
  }

  #[test]
  fn names_may_contain_commas_and_colons() {
    let table = LabelTable::from_metadata("{0: 'tv, wall-mounted', 1: 'ratio 16:9'}").unwrap();
    assert_eq!(table.get(0), Some("tv, wall-mounted"));
    assert_eq!(table.get(1), Some("ratio 16:9"));
  }

  #[test]
  fn empty_dict_is_an_empty_table() {
    let table = LabelTable::from_metadata("{}").unwrap();
    assert!(table.is_empty());
  }

  #[test]
  fn rejects_malformed_metadata() {
    assert!(LabelTable::from_metadata("[0, 1]").is_err());
    assert!(LabelTable::from_metadata("{zero: 'bed'}").is_err());
    assert!(LabelTable::from_metadata("{0: bed}").is_err());
    assert!(LabelTable::from_metadata("{0: 'bed}").is_err());
  }

  #[test]
  fn parses_json_sidecar() {
    let table = LabelTable::from_json(r#"{"2": "smoke_detector", "0": "bed"}"#).unwrap();
    assert_eq!(table.get(2), Some("smoke_detector"));
    assert_eq!(table.get(0), Some("bed"));
    assert!(LabelTable::from_json(r#"{"x": "bed"}"#).is_err());
  }
}
