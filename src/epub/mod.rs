pub mod error;
pub mod container;
pub mod path;
pub mod reader;
pub mod opf;

// 重新导出错误处理
pub use error::{EpubError, Result};

// 重新导出容器相关
pub use container::{Container, RootFile, CONTAINER_PATH, locate_package_document};

// 重新导出EPUB读取器
pub use reader::{Epub, ExtractSummary};

// 重新导出OPF相关
pub use opf::{ManifestItem, Package, PackageMetadata, SpineItem, XHTML_MEDIA_TYPE};
