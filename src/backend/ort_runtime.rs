// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// ONNXRuntime 后端
// 输入形状从模型声明的输入签名查询得到, 与调用方显式声明不一致时构造失败

use ndarray::{Array, IxDyn};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;

use crate::backend::{expected_rows, InferenceBackend};
use crate::error::DetectError;

pub struct OrtRuntime {
    session: Session,
    input_size: u32,
    rows: usize,
}

impl OrtRuntime {
    /// 加载 ONNX 模型并校验输入签名
    ///
    /// `expected_size` 为调用方显式声明的方形输入边长; 传 `None` 时
    /// 完全采用模型自述的形状
    pub fn new(model_path: &str, expected_size: Option<u32>) -> Result<Self, DetectError> {
        let session = Session::builder()
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|b| b.with_intra_threads(4))
            .and_then(|b| b.commit_from_file(model_path))
            .map_err(|e| {
                DetectError::model_load(format!("ONNXRuntime 加载 {} 失败: {}", model_path, e))
            })?;

        let input = session
            .inputs
            .first()
            .ok_or_else(|| DetectError::model_load("模型没有输入"))?;
        let dims: Vec<i64> = input
            .input_type
            .tensor_shape()
            .ok_or_else(|| DetectError::model_load("模型输入不是张量"))?
            .iter()
            .copied()
            .collect();

        if dims.len() != 4 {
            return Err(DetectError::model_load(format!(
                "期望 4 维输入 [1,3,h,w], 实际 {} 维",
                dims.len()
            )));
        }
        let (h, w) = (dims[2], dims[3]);
        if h <= 0 || w <= 0 {
            return Err(DetectError::model_load(format!(
                "模型输入为动态形状 {:?}, 无法确定输入尺寸",
                dims
            )));
        }
        if h != w {
            return Err(DetectError::model_load(format!(
                "模型输入必须为方形, 实际 {}x{}",
                w, h
            )));
        }
        if let Some(s) = expected_size {
            if s as i64 != h {
                return Err(DetectError::model_load(format!(
                    "输入尺寸与模型期望不匹配: 声明 {}, 模型 {}",
                    s, h
                )));
            }
        }

        let input_size = h as u32;
        Ok(Self {
            session,
            input_size,
            rows: expected_rows(input_size),
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }
}

impl InferenceBackend for OrtRuntime {
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
        let input_tensor = Tensor::from_array(([shape[0], shape[1], shape[2], shape[3]], data))
            .map_err(|e| DetectError::inference(format!("输入张量创建失败: {}", e)))?;

        let outputs = self
            .session
            .run(ort::inputs![input_tensor])
            .map_err(|e| DetectError::inference(format!("前向传播失败: {}", e)))?;

        let (out_shape, out_data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| DetectError::inference(format!("输出张量提取失败: {}", e)))?;

        let dims: Vec<usize> = out_shape.iter().map(|&d| d as usize).collect();
        Array::from_shape_vec(IxDyn(&dims), out_data.to_vec())
            .map_err(|e| DetectError::inference(format!("输出张量重组失败: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_model_load_error() {
        let err = OrtRuntime::new("/no/such/model.onnx", None);
        assert!(matches!(err, Err(DetectError::ModelLoad(_))));
    }
}
