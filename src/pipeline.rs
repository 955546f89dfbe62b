// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// 检测流水线: letterbox → forward → postprocess 固定三段模板
// 对所有后端复用同一段编排, 不对引擎类型分支

use image::{DynamicImage, GenericImageView};

use crate::backend::{build_backend, InferenceBackend};
use crate::config::DetectorConfig;
use crate::error::DetectError;
use crate::letterbox::letterbox;
use crate::postprocess::postprocess;
use crate::Detection;

/// 车牌检测器
///
/// 跨调用仅持有后端实例与两个阈值; letterbox 参数是每次 detect 调用的
/// 局部值, 随调用返回链传递, 不在实例上保存
pub struct PlateDetector {
    backend: Box<dyn InferenceBackend>,
    conf_threshold: f32,
    iou_threshold: f32,
    profile: bool,
}

impl PlateDetector {
    /// 从配置创建检测器, 后端构造失败在此处报告
    pub fn new(config: DetectorConfig) -> Result<Self, DetectError> {
        let backend = build_backend(config.backend, &config.model, config.input_size)?;
        Self::from_backend(
            backend,
            config.conf_threshold,
            config.iou_threshold,
            config.profile,
        )
    }

    /// 直接挂载已构造的后端 (测试或自定义引擎)
    pub fn from_backend(
        backend: Box<dyn InferenceBackend>,
        conf_threshold: f32,
        iou_threshold: f32,
        profile: bool,
    ) -> Result<Self, DetectError> {
        if !(0.0..=1.0).contains(&conf_threshold) {
            return Err(DetectError::model_load(format!(
                "置信度阈值须在 [0,1] 内: {}",
                conf_threshold
            )));
        }
        if !(0.0..=1.0).contains(&iou_threshold) {
            return Err(DetectError::model_load(format!(
                "IoU 阈值须在 [0,1] 内: {}",
                iou_threshold
            )));
        }
        Ok(Self {
            backend,
            conf_threshold,
            iou_threshold,
            profile,
        })
    }

    pub fn input_size(&self) -> u32 {
        self.backend.input_size()
    }

    pub fn conf_threshold(&self) -> f32 {
        self.conf_threshold
    }

    pub fn iou_threshold(&self) -> f32 {
        self.iou_threshold
    }

    /// 对单张图片执行检测, 返回按融合分数降序的车牌列表
    ///
    /// 空列表是合法结果, 不是错误
    pub fn detect(&mut self, image: &DynamicImage) -> Result<Vec<Detection>, DetectError> {
        let (w, h) = image.dimensions();
        if w == 0 || h == 0 {
            return Err(DetectError::invalid_image(format!(
                "图像尺寸非法: {}x{}",
                w, h
            )));
        }

        let t_pre = std::time::Instant::now();
        let (tensor, params) = letterbox(image, self.backend.input_size())?;
        if self.profile {
            println!("[Model Preprocess]: {:?}", t_pre.elapsed());
        }

        let t_run = std::time::Instant::now();
        let raw = self.backend.forward(tensor)?;
        if self.profile {
            println!("[Model Inference]: {:?}", t_run.elapsed());
        }

        let t_post = std::time::Instant::now();
        let detections = postprocess(&raw, self.conf_threshold, self.iou_threshold, &params)?;
        if self.profile {
            println!("[Model Postprocess]: {:?}", t_post.elapsed());
        }

        Ok(detections)
    }
}
