//! 输出文件生成
//!
//! 负责 `manifest.json`、`manifest.appcache` 与 `webapp.webmanifest` 的序列化和写出。

use std::fs;
use std::path::Path;

use chrono::{DateTime, FixedOffset};

use crate::epub::error::Result;
use crate::web::model::{BookManifest, WebAppDescriptor};

/// JSON清单文件名
pub const MANIFEST_FILE: &str = "manifest.json";
/// 离线缓存清单文件名
pub const CACHE_MANIFEST_FILE: &str = "manifest.appcache";
/// 网页应用描述文件名
pub const WEBAPP_FILE: &str = "webapp.webmanifest";

/// 每本书都要缓存的共享文件，相对于书籍目录
pub const SHARED_CACHE_ENTRIES: [&str; 3] = ["../polyfill/fetch.js", "../viewer.js", "index.html"];

/// 缓存清单时间戳格式，例如 `Mon Jan 2 15:04:05 -0700 2006`
pub const CACHE_TIMESTAMP_FORMAT: &str = "%a %b %-d %H:%M:%S %z %Y";

/// 将书籍清单序列化为紧凑JSON
pub fn manifest_json(manifest: &BookManifest) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(manifest)?)
}

/// 将网页应用描述序列化为紧凑JSON
pub fn webapp_json(webapp: &WebAppDescriptor) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(webapp)?)
}

/// 生成离线缓存清单
///
/// `resource_paths` 应按清单项在OPF中的原始顺序给出，而不是划分后的顺序。
/// 每一行都以 `\n` 结尾。
pub fn cache_manifest<I, S>(resource_paths: I, timestamp: DateTime<FixedOffset>) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::from("CACHE MANIFEST\n");
    out.push_str(&format!("# timestamp {}\n", timestamp.format(CACHE_TIMESTAMP_FORMAT)));
    out.push('\n');

    for entry in SHARED_CACHE_ENTRIES {
        out.push_str(entry);
        out.push('\n');
    }
    for path in resource_paths {
        out.push_str(path.as_ref());
        out.push('\n');
    }

    out.push_str("\nNETWORK:\n*\n");
    out
}

/// 写出 `manifest.json` 与 `manifest.appcache`
pub fn write_manifest_files(book_dir: &Path, manifest: &BookManifest, cache: &str) -> Result<()> {
    fs::write(book_dir.join(MANIFEST_FILE), manifest_json(manifest)?)?;
    fs::write(book_dir.join(CACHE_MANIFEST_FILE), cache)?;
    Ok(())
}

/// 写出 `webapp.webmanifest`
pub fn write_webapp_file(book_dir: &Path, webapp: &WebAppDescriptor) -> Result<()> {
    fs::write(book_dir.join(WEBAPP_FILE), webapp_json(webapp)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::model::{BookMetadata, LinkRel, ResourceLink};

    fn frozen_time() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2024-03-05T09:07:01+08:00").unwrap()
    }

    #[test]
    fn test_cache_manifest_layout() {
        let cache = cache_manifest(["style.css", "img/cover.jpg"], frozen_time());

        assert_eq!(
            cache,
            "CACHE MANIFEST\n\
             # timestamp Tue Mar 5 09:07:01 +0800 2024\n\
             \n\
             ../polyfill/fetch.js\n\
             ../viewer.js\n\
             index.html\n\
             style.css\n\
             img/cover.jpg\n\
             \n\
             NETWORK:\n\
             *\n"
        );
    }

    #[test]
    fn test_cache_manifest_without_resources() {
        let cache = cache_manifest(Vec::<String>::new(), frozen_time());
        assert!(cache.ends_with("index.html\n\nNETWORK:\n*\n"));
    }

    #[test]
    fn test_manifest_json_shape() {
        let manifest = BookManifest {
            metadata: BookMetadata {
                title: "标题".to_string(),
                author: "作者".to_string(),
                identifier: "id-1".to_string(),
                language: "zh".to_string(),
                modified: frozen_time(),
                cover: None,
            },
            links: vec![BookManifest::self_link("", "a.epub")],
            spine: Vec::new(),
            resources: vec![ResourceLink::new("OEBPS/nav.xhtml", "application/xhtml+xml").with_rel(LinkRel::Contents)],
        };

        let json = String::from_utf8(manifest_json(&manifest).unwrap()).unwrap();
        assert_eq!(
            json,
            r#"{"metadata":{"title":"标题","author":"作者","identifier":"id-1","language":"zh","modified":"2024-03-05T09:07:01+08:00"},"links":[{"rel":"self","href":"/a.epub/manifest.json","type":"application/json"}],"resources":[{"rel":"contents","href":"OEBPS/nav.xhtml","type":"application/xhtml+xml"}]}"#
        );
    }

    #[test]
    fn test_write_files() {
        let dir = tempfile::tempdir().unwrap();
        let webapp = WebAppDescriptor::for_title("书");

        write_webapp_file(dir.path(), &webapp).unwrap();
        let written = fs::read_to_string(dir.path().join(WEBAPP_FILE)).unwrap();
        assert!(written.contains(r#""display":"standalone""#));

        let missing = dir.path().join("missing");
        assert!(write_webapp_file(&missing, &webapp).is_err());
    }
}
