// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// 推理后端统一接口与实现
//
// # 架构说明
//
// 三个后端只在模型加载方式与执行引擎上不同, 对外暴露同一个 `forward`:
// - **Embedded** (`tract_runtime.rs`): tract-onnx 纯 Rust 引擎, 无形状
//   自省能力, 输入尺寸由调用方声明后固化为 input fact
// - **NativeDnn** (`dnn_runtime.rs`): OpenCV DNN 模块, 直接读取 ONNX 文件,
//   需启用 `opencv-dnn` 功能
// - **ExternalRuntime** (`ort_runtime.rs`): ONNXRuntime, 从模型输入签名
//   查询形状, 与显式声明不一致时构造失败
//
// 编排层 (pipeline.rs) 只面向本接口编写一次, 不区分具体引擎

use ndarray::{Array, IxDyn};

use crate::error::DetectError;

pub mod tract_runtime;

#[cfg(feature = "opencv-dnn")]
pub mod dnn_runtime;

pub mod ort_runtime;

pub use tract_runtime::TractRuntime;

#[cfg(feature = "opencv-dnn")]
pub use dnn_runtime::DnnRuntime;

pub use ort_runtime::OrtRuntime;

/// 统一推理后端接口
///
/// 输入固定为 [1, 3, s, s], 输出固定为 [1, rows, 15], 形状在构造时确定。
/// 单个实例不保证跨线程并发安全, 调用方需串行访问 (forward 取 &mut self)
pub trait InferenceBackend: Send {
    /// 模型输入方形边长
    fn input_size(&self) -> u32;

    /// 执行一次前向传播
    fn forward(&mut self, input: Array<f32, IxDyn>) -> Result<Array<f32, IxDyn>, DetectError>;
}

/// 后端类型选择
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum BackendKind {
    /// 嵌入式纯 Rust 引擎 (tract)
    Embedded,
    /// OpenCV DNN 引擎
    NativeDnn,
    /// ONNXRuntime 引擎
    ExternalRuntime,
}

/// 输出候选行数: 三个特征层 (stride 8/16/32) 各 3 个 anchor
///
/// 320 → 6300, 640 → 25200
pub fn expected_rows(input_size: u32) -> usize {
    let s = input_size as usize;
    3 * ((s / 8) * (s / 8) + (s / 16) * (s / 16) + (s / 32) * (s / 32))
}

/// 按类型构造后端, 形状问题在此处报告, 不推迟到首次 forward
pub fn build_backend(
    kind: BackendKind,
    model_path: &str,
    input_size: u32,
) -> Result<Box<dyn InferenceBackend>, DetectError> {
    match kind {
        BackendKind::Embedded => Ok(Box::new(TractRuntime::new(model_path, input_size)?)),
        BackendKind::NativeDnn => {
            #[cfg(feature = "opencv-dnn")]
            {
                Ok(Box::new(DnnRuntime::new(model_path, input_size)?))
            }
            #[cfg(not(feature = "opencv-dnn"))]
            {
                Err(DetectError::model_load(
                    "NativeDnn 后端需要启用 opencv-dnn 功能编译",
                ))
            }
        }
        BackendKind::ExternalRuntime => {
            Ok(Box::new(OrtRuntime::new(model_path, Some(input_size))?))
        }
    }
}
