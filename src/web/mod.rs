pub mod assets;
pub mod clock;
pub mod config;
pub mod converter;
pub mod emit;
pub mod model;
pub mod reconcile;
pub mod template;

// 重新导出配置与批量转换
pub use config::{ConverterConfig, DEFAULT_CONFIG_PATH};
pub use converter::{BatchReport, BookReport, Converter, ManifestSummary, Stage, StageFailure};

// 重新导出数据结构
pub use model::{BookManifest, BookMetadata, Icon, LinkRel, ResourceLink, WebAppDescriptor};

// 重新导出对账与输出
pub use clock::{Clock, FixedClock, SystemClock};
pub use reconcile::{Reconciler, Reconciliation, SpineAnomaly, SpineAnomalyPolicy};
pub use template::IndexTemplate;
