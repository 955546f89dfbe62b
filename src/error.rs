// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// 检测流水线错误类型

use thiserror::Error;

/// 检测流水线错误
///
/// - `InvalidImage`: 输入图像不可用, 在任何变换之前报告
/// - `ModelLoad`: 后端构造阶段失败 (模型文件/形状不匹配), 不会推迟到首次 detect
/// - `Inference`: 单次前向传播失败, 流水线仍可继续使用
#[derive(Error, Debug)]
pub enum DetectError {
    #[error("无效图像: {0}")]
    InvalidImage(String),
    #[error("模型加载失败: {0}")]
    ModelLoad(String),
    #[error("推理失败: {0}")]
    Inference(String),
}

impl DetectError {
    pub fn invalid_image(msg: impl Into<String>) -> Self {
        DetectError::InvalidImage(msg.into())
    }

    pub fn model_load(msg: impl Into<String>) -> Self {
        DetectError::ModelLoad(msg.into())
    }

    pub fn inference(msg: impl Into<String>) -> Self {
        DetectError::Inference(msg.into())
    }
}
