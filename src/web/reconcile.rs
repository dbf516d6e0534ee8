//! 清单与脊柱的对账
//!
//! 以脊柱的idref顺序为准，把清单项划分为有序的阅读内容和无序的辅助资源。
//! 每个清单项恰好出现在两者之一中。

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, FixedOffset};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::epub::error::{EpubError, Result};
use crate::epub::opf::{Package, PackageMetadata};
use crate::web::model::{BookManifest, BookMetadata, LinkRel, ResourceLink};

/// 脊柱异常的处理策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SpineAnomalyPolicy {
    /// 静默忽略
    Ignore,
    /// 记录警告日志
    #[default]
    Warn,
    /// 视为错误，该书的清单生成失败
    Strict,
}

/// 对账时发现的异常
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpineAnomaly {
    /// 脊柱引用了清单中不存在的ID
    UnknownIdref(String),
    /// 同一个ID在脊柱中重复出现
    DuplicateIdref(String),
    /// 脊柱引用了非XHTML的清单项
    NotContent { idref: String, media_type: String },
    /// 多个XHTML清单项使用同一个ID，后出现的作为辅助资源保留
    DuplicateManifestId(String),
}

impl fmt::Display for SpineAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpineAnomaly::UnknownIdref(id) => write!(f, "脊柱引用了不存在的清单项: {}", id),
            SpineAnomaly::DuplicateIdref(id) => write!(f, "脊柱中重复引用: {}", id),
            SpineAnomaly::NotContent { idref, media_type } => {
                write!(f, "脊柱引用了非XHTML清单项: {} ({})", idref, media_type)
            }
            SpineAnomaly::DuplicateManifestId(id) => write!(f, "清单项ID重复: {}", id),
        }
    }
}

/// 对账结果
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    /// 按脊柱顺序排列的内容文档
    pub spine: Vec<ResourceLink>,
    /// 辅助资源
    pub resources: Vec<ResourceLink>,
    /// 封面资源的解析后路径
    pub cover: Option<String>,
    pub anomalies: Vec<SpineAnomaly>,
}

impl Reconciliation {
    /// 组装成完整的书籍清单
    pub fn into_manifest(
        self,
        metadata: &PackageMetadata,
        self_link: ResourceLink,
        modified: DateTime<FixedOffset>,
    ) -> BookManifest {
        BookManifest {
            metadata: BookMetadata {
                title: metadata.title().to_string(),
                author: metadata.author().to_string(),
                identifier: metadata.identifier().to_string(),
                language: metadata.language().to_string(),
                modified,
                cover: self.cover,
            },
            links: vec![self_link],
            spine: self.spine,
            resources: self.resources,
        }
    }
}

/// 清单对账器
#[derive(Debug, Clone, Copy, Default)]
pub struct Reconciler {
    policy: SpineAnomalyPolicy,
}

impl Reconciler {
    pub fn new(policy: SpineAnomalyPolicy) -> Self {
        Self { policy }
    }

    /// 划分清单项
    ///
    /// 1. XHTML清单项按ID放入有序的候选表，其余清单项直接归为辅助资源
    /// 2. `nav` 属性标记为目录，`cover-image` 属性标记为封面并记录封面路径；
    ///    没有任何 `cover-image` 时使用 `<meta name="cover">` 指向的清单项
    /// 3. 按脊柱顺序取出候选项，每个ID最多取一次
    /// 4. 未被脊柱引用的候选项按清单顺序追加到辅助资源
    pub fn reconcile(&self, package: &Package) -> Result<Reconciliation> {
        let fallback_cover = if package.manifest.iter().any(|item| item.is_cover_image()) {
            None
        } else {
            package.metadata.cover_id.as_deref()
        };

        let mut candidates: IndexMap<&str, ResourceLink> = IndexMap::new();
        let mut resources = Vec::new();
        let mut anomalies = Vec::new();
        let mut cover = None;

        for item in &package.manifest {
            let mut link = ResourceLink::new(package.resolve(item), item.media_type.as_str());

            if item.is_nav() {
                link.rel = Some(LinkRel::Contents);
            }
            if item.is_cover_image() || fallback_cover == Some(item.id.as_str()) {
                link.rel = Some(LinkRel::Cover);
                cover.get_or_insert_with(|| link.href.clone());
            }

            if !item.is_xhtml() {
                resources.push(link);
            } else if candidates.contains_key(item.id.as_str()) {
                anomalies.push(SpineAnomaly::DuplicateManifestId(item.id.clone()));
                resources.push(link);
            } else {
                candidates.insert(item.id.as_str(), link);
            }
        }

        let mut consumed: HashSet<&str> = HashSet::new();
        let mut spine = Vec::new();

        for itemref in &package.spine {
            let idref = itemref.idref.as_str();
            if let Some(link) = candidates.shift_remove(idref) {
                spine.push(link);
                consumed.insert(idref);
            } else if consumed.contains(idref) {
                anomalies.push(SpineAnomaly::DuplicateIdref(idref.to_string()));
            } else if let Some(item) = package.get_manifest_item(idref) {
                anomalies.push(SpineAnomaly::NotContent {
                    idref: idref.to_string(),
                    media_type: item.media_type.clone(),
                });
            } else {
                anomalies.push(SpineAnomaly::UnknownIdref(idref.to_string()));
            }
        }

        resources.extend(candidates.into_values());

        self.apply_policy(&anomalies)?;

        Ok(Reconciliation {
            spine,
            resources,
            cover,
            anomalies,
        })
    }

    fn apply_policy(&self, anomalies: &[SpineAnomaly]) -> Result<()> {
        match self.policy {
            SpineAnomalyPolicy::Ignore => Ok(()),
            SpineAnomalyPolicy::Warn => {
                for anomaly in anomalies {
                    tracing::warn!(%anomaly, "清单对账异常");
                }
                Ok(())
            }
            SpineAnomalyPolicy::Strict => match anomalies.first() {
                Some(first) => Err(EpubError::SpineAnomaly(format!(
                    "{} (共{}处)",
                    first,
                    anomalies.len()
                ))),
                None => Ok(()),
            },
        }
    }
}
