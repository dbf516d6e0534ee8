use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EpubError>;

/// 转换过程中的错误类型
#[derive(Error, Debug)]
pub enum EpubError {
    #[error("IO错误: {0}")]
    Io(#[from] io::Error),

    #[error("Zip文件错误: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML解析错误: {0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("JSON序列化错误: {0}")]
    Json(#[from] serde_json::Error),

    #[error("图片解析错误: {0}")]
    Image(#[from] image::ImageError),

    #[error("container.xml解析错误: {0}")]
    ContainerParseError(String),

    #[error("未找到包文件(OPF): {0}")]
    PackageNotFound(String),

    #[error("OPF文件解析错误: {0}")]
    OpfParseError(String),

    #[error("脊柱引用异常: {0}")]
    SpineAnomaly(String),

    #[error("模板错误: {0}")]
    TemplateError(String),

    #[error("配置文件错误: {0}")]
    ConfigError(String),
}

impl From<quick_xml::events::attributes::AttrError> for EpubError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        EpubError::XmlError(quick_xml::Error::InvalidAttr(err))
    }
}
