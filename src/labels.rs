// 该文件是 Xingyan （醒眼） 项目的一部分。
// src/labels.rs - 检测标签提取
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use thiserror::Error;

use crate::model::{ClassNameTable, DetectResult};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LabelError {
  /// 类别表与模型不匹配
  #[error("类别索引 {class_id} 不在类别表中")]
  UnknownClass { class_id: u32 },
}

/// 按检测顺序展开所有结果中的类别标签，保留重复项
pub fn extract_labels<'a, I>(results: I, names: &ClassNameTable) -> Result<Vec<String>, LabelError>
where
  I: IntoIterator<Item = &'a DetectResult>,
{
  results
    .into_iter()
    .flat_map(|result| result.items.iter())
    .map(|item| {
      names
        .get(item.class_id)
        .map(str::to_string)
        .ok_or(LabelError::UnknownClass {
          class_id: item.class_id,
        })
    })
    .collect()
}

/// 展示用的标签文本：逗号连接，无检测时为 `"None"`
pub fn label_text<S: AsRef<str>>(labels: &[S]) -> String {
  if labels.is_empty() {
    return "None".to_string();
  }
  labels
    .iter()
    .map(AsRef::as_ref)
    .collect::<Vec<_>>()
    .join(", ")
}
