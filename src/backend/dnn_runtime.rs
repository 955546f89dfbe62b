// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// OpenCV DNN 后端 (opencv-dnn 功能)
// 直接读取 ONNX 交换格式文件, 输入尺寸由调用方声明

use ndarray::{Array, IxDyn};
use opencv::core::Mat;
use opencv::dnn;
use opencv::prelude::*;

use crate::backend::{expected_rows, InferenceBackend};
use crate::error::DetectError;

pub struct DnnRuntime {
    net: dnn::Net,
    input_size: u32,
    rows: usize,
}

impl DnnRuntime {
    pub fn new(model_path: &str, input_size: u32) -> Result<Self, DetectError> {
        if input_size == 0 || input_size % 32 != 0 {
            return Err(DetectError::model_load(format!(
                "输入尺寸必须为 32 的正整数倍, 实际 {}",
                input_size
            )));
        }

        let net = dnn::read_net_from_onnx(model_path)
            .map_err(|e| DetectError::model_load(format!("读取 {} 失败: {}", model_path, e)))?;
        if net
            .empty()
            .map_err(|e| DetectError::model_load(format!("网络校验失败: {}", e)))?
        {
            return Err(DetectError::model_load(format!(
                "模型文件无效: {}",
                model_path
            )));
        }

        Ok(Self {
            net,
            input_size,
            rows: expected_rows(input_size),
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }
}

impl InferenceBackend for DnnRuntime {
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
        let flat = Mat::from_slice(&data)
            .map_err(|e| DetectError::inference(format!("输入张量创建失败: {}", e)))?;
        let blob = flat
            .reshape_nd(1, &[1, 3, s as i32, s as i32])
            .map_err(|e| DetectError::inference(format!("输入张量重组失败: {}", e)))?;

        self.net
            .set_input(&blob, "", 1.0, opencv::core::Scalar::default())
            .map_err(|e| DetectError::inference(format!("设置输入失败: {}", e)))?;
        let out = self
            .net
            .forward_single("")
            .map_err(|e| DetectError::inference(format!("前向传播失败: {}", e)))?;

        let out_data = out
            .data_typed::<f32>()
            .map_err(|e| DetectError::inference(format!("输出张量提取失败: {}", e)))?;
        Array::from_shape_vec(IxDyn(&[1, self.rows, 15]), out_data.to_vec())
            .map_err(|e| DetectError::inference(format!("输出张量重组失败: {}", e)))
    }
}
