// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// 检测器配置

use clap::Parser;

use crate::backend::BackendKind;

/// 低精度档输入尺寸 (速度优先)
pub const DETECT_LEVEL_LOW: u32 = 320;
/// 高精度档输入尺寸 (远距/小牌优先)
pub const DETECT_LEVEL_HIGH: u32 = 640;

pub const DEFAULT_CONF_THRESHOLD: f32 = 0.25;
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.5;

/// 检测流水线配置, 构造时一次性生效
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// ONNX 模型文件路径
    pub model: String,
    /// 推理后端类型
    pub backend: BackendKind,
    /// 方形输入边长, 须与模型一致
    pub input_size: u32,
    /// objectness 置信度阈值 [0,1]
    pub conf_threshold: f32,
    /// NMS IoU 阈值 [0,1]
    pub iou_threshold: f32,
    /// 是否打印各阶段耗时
    pub profile: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model: String::new(),
            backend: BackendKind::ExternalRuntime,
            input_size: DETECT_LEVEL_LOW,
            conf_threshold: DEFAULT_CONF_THRESHOLD,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            profile: false,
        }
    }
}

impl DetectorConfig {
    pub fn new(model: impl Into<String>, backend: BackendKind) -> Self {
        Self {
            model: model.into(),
            backend,
            ..Default::default()
        }
    }
}

/// 车牌检测命令行参数
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "车牌检测 (letterbox → 推理 → NMS)", long_about = None)]
pub struct Args {
    /// ONNX 模型文件路径
    #[arg(short, long)]
    pub model: String,

    /// 待检测图片路径
    #[arg(short, long)]
    pub source: String,

    /// 推理后端 (embedded/native-dnn/external-runtime)
    #[arg(short, long, value_enum, default_value = "external-runtime")]
    pub backend: BackendKind,

    /// 模型输入尺寸 (320 或 640)
    #[arg(long, default_value_t = DETECT_LEVEL_LOW)]
    pub input_size: u32,

    /// 置信度阈值
    #[arg(long, default_value_t = DEFAULT_CONF_THRESHOLD)]
    pub conf: f32,

    /// NMS IoU 阈值
    #[arg(long, default_value_t = DEFAULT_IOU_THRESHOLD)]
    pub iou: f32,

    /// 打印各阶段耗时
    #[arg(long)]
    pub profile: bool,
}

impl From<&Args> for DetectorConfig {
    fn from(args: &Args) -> Self {
        Self {
            model: args.model.clone(),
            backend: args.backend,
            input_size: args.input_size,
            conf_threshold: args.conf,
            iou_threshold: args.iou,
            profile: args.profile,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = DetectorConfig::default();
        assert_eq!(config.input_size, 320);
        assert_eq!(config.conf_threshold, 0.25);
        assert_eq!(config.iou_threshold, 0.5);
        assert_eq!(config.backend, BackendKind::ExternalRuntime);
    }

    #[test]
    fn test_config_new() {
        let config = DetectorConfig::new("det.onnx", BackendKind::Embedded);
        assert_eq!(config.model, "det.onnx");
        assert_eq!(config.backend, BackendKind::Embedded);
    }
}
