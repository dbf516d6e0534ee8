//! 转换配置模块
//!
//! 提供转换器的配置管理功能，支持从YAML文件加载配置。

use crate::epub::error::{EpubError, Result};
use crate::web::reconcile::SpineAnomalyPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 默认配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "bookweb.yaml";

/// 转换器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// EPUB文件所在目录
    pub input_dir: PathBuf,
    /// 输出目录
    pub output_dir: PathBuf,
    /// 托管域名，用于生成清单的self链接
    pub domain: String,
    /// 入口页面模板，未设置时使用内置模板
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<PathBuf>,
    /// 共享静态文件的源目录
    pub assets_dir: PathBuf,
    /// 脊柱异常的处理策略
    pub spine_anomalies: SpineAnomalyPolicy,
    /// 是否读取图片资源的宽高
    pub probe_image_sizes: bool,
    /// 是否并行转换多本书
    pub parallel: bool,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("books"),
            output_dir: PathBuf::from("out"),
            domain: String::new(),
            template: None,
            assets_dir: PathBuf::from("public"),
            spine_anomalies: SpineAnomalyPolicy::default(),
            probe_image_sizes: true,
            parallel: false,
        }
    }
}

impl ConverterConfig {
    /// 从指定配置文件加载配置
    ///
    /// 文件中缺少的字段使用默认值。
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| EpubError::ConfigError(format!("无法读取配置文件 {}: {}", path.display(), e)))?;

        Self::from_yaml(&content)
    }

    /// 从YAML文本解析配置
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yml::from_str(content)
            .map_err(|e| EpubError::ConfigError(format!("配置文件格式错误: {}", e)))
    }

    /// 配置文件存在时加载，不存在时返回默认配置
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::debug!(path = %path.display(), "配置文件不存在，使用默认配置");
            Ok(Self::default())
        }
    }

    /// 生成默认配置文件
    pub fn generate_default_config(path: &Path) -> Result<()> {
        let yaml_content = serde_yml::to_string(&Self::default())
            .map_err(|e| EpubError::ConfigError(format!("序列化配置失败: {}", e)))?;

        // 在YAML内容前添加注释说明
        let content_with_header = format!(
            "# bookweb 配置文件\n\
             # spine_anomalies 可选值: ignore / warn / strict\n\
             # template 未设置时使用内置的入口页面模板\n\n{}",
            yaml_content
        );

        fs::write(path, content_with_header)
            .map_err(|e| EpubError::ConfigError(format!("写入配置文件失败: {}", e)))?;

        Ok(())
    }
}
