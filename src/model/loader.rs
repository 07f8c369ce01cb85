// 该文件是 Xingyan （醒眼） 项目的一部分。
// src/model/loader.rs - 模型加载与缓存
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

use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::{debug, info};

/// 模型构建器
pub trait BuildModel {
  type Model;
  type Error;

  fn build(&self) -> Result<Self::Model, Self::Error>;
}

/// 只加载一次的模型缓存
///
/// 由应用显式创建并持有；第一次成功构建后，之后的调用都返回同一个 `Arc`。
/// 并发的首次调用会阻塞等待，最终共享同一个实例。构建失败不会被缓存。
pub struct ModelLoader<B: BuildModel> {
  builder: B,
  model: OnceCell<Arc<B::Model>>,
}

impl<B: BuildModel> ModelLoader<B> {
  pub fn new(builder: B) -> Self {
    Self {
      builder,
      model: OnceCell::new(),
    }
  }

  pub fn get_model(&self) -> Result<Arc<B::Model>, B::Error> {
    if let Some(model) = self.model.get() {
      debug!("复用已加载的模型");
      return Ok(Arc::clone(model));
    }

    let model = self.model.get_or_try_init(|| {
      info!("首次加载模型...");
      let now = std::time::Instant::now();
      let model = self.builder.build()?;
      info!("模型加载完成，耗时: {:.2?}", now.elapsed());
      Ok(Arc::new(model))
    })?;

    Ok(Arc::clone(model))
  }

  pub fn is_loaded(&self) -> bool {
    self.model.get().is_some()
  }
}
