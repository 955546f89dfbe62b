// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// 嵌入式后端 (tract-onnx, 纯 Rust, 无 C 依赖)
// 引擎不提供形状自省, 输入尺寸由调用方声明并固化为 input fact;
// 与模型不可调和时在构造阶段报错

use ndarray::{Array, IxDyn};
use tract_onnx::prelude::*;

use crate::backend::{expected_rows, InferenceBackend};
use crate::error::DetectError;

type TractPlan = RunnableModel<TypedFact, Box<dyn TypedOp>, TypedModel>;

pub struct TractRuntime {
    plan: TractPlan,
    input_size: u32,
    rows: usize,
}

impl TractRuntime {
    /// 加载 ONNX 模型, 以调用方声明的方形输入尺寸固化计算图
    pub fn new(model_path: &str, input_size: u32) -> Result<Self, DetectError> {
        if input_size == 0 || input_size % 32 != 0 {
            return Err(DetectError::model_load(format!(
                "输入尺寸必须为 32 的正整数倍, 实际 {}",
                input_size
            )));
        }
        let s = input_size as usize;
        let rows = expected_rows(input_size);

        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .map_err(|e| DetectError::model_load(format!("读取 {} 失败: {}", model_path, e)))?
            .with_input_fact(0, InferenceFact::dt_shape(f32::datum_type(), tvec![1, 3, s, s]))
            .map_err(|e| DetectError::model_load(format!("输入形状声明失败: {}", e)))?
            .into_optimized()
            .map_err(|e| DetectError::model_load(format!("声明形状与模型不可调和: {}", e)))?;

        // 输出形状在优化后已具体化, 与候选行数核对
        let fact = model
            .output_fact(0)
            .map_err(|e| DetectError::model_load(format!("查询输出形状失败: {}", e)))?;
        if let Some(shape) = fact.shape.as_concrete() {
            let shape = shape.to_vec();
            if shape != [1, rows, 15] {
                return Err(DetectError::model_load(format!(
                    "模型输出形状 {:?} 与期望 [1, {}, 15] 不符",
                    shape, rows
                )));
            }
        }

        let plan = model
            .into_runnable()
            .map_err(|e| DetectError::model_load(format!("执行计划构建失败: {}", e)))?;

        Ok(Self {
            plan,
            input_size,
            rows,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }
}

impl InferenceBackend for TractRuntime {
    fn input_size(&self) -> u32 {
        self.input_size
    }

    fn forward(&mut self, input: Array<f32, IxDyn>) -> Result<Array<f32, IxDyn>, DetectError> {
        let shape: Vec<usize> = input.shape().to_vec();
        let s = self.input_size as usize;
        if shape != [1, 3, s, s] {
            return Err(DetectError::inference(format!(
                "输入张量形状 {:?} 与后端期望 [1, 3, {}, {}] 不符",
                shape, s, s
            )));
        }

        let (data, _offset) = input.into_raw_vec_and_offset();
        let arr4 = tract_ndarray::Array4::from_shape_vec((1, 3, s, s), data)
            .map_err(|e| DetectError::inference(format!("输入张量重组失败: {}", e)))?;

        let tensor: Tensor = arr4.into_tensor();
        let result = self
            .plan
            .run(tvec![tensor.into()])
            .map_err(|e| DetectError::inference(format!("前向传播失败: {}", e)))?;

        let view = result[0]
            .to_array_view::<f32>()
            .map_err(|e| DetectError::inference(format!("输出张量提取失败: {}", e)))?;
        let dims: Vec<usize> = view.shape().to_vec();
        Array::from_shape_vec(IxDyn(&dims), view.iter().copied().collect())
            .map_err(|e| DetectError::inference(format!("输出张量重组失败: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_unaligned_input_size() {
        let err = TractRuntime::new("model.onnx", 300);
        assert!(matches!(err, Err(DetectError::ModelLoad(_))));
    }

    #[test]
    fn test_missing_file_is_model_load_error() {
        let err = TractRuntime::new("/no/such/model.onnx", 320);
        assert!(matches!(err, Err(DetectError::ModelLoad(_))));
    }
}
