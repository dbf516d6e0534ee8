//! 入口页面模板
//!
//! 模板中的 `{{ name }}` 占位符会被替换为书籍清单中的值。可用的占位符：
//! `title`、`author`、`language`、`identifier`、`cover`、`start`（第一页的路径）
//! 以及 `manifest`（整个清单的JSON，可直接嵌入 `<script>`）。

use std::fs;
use std::path::Path;

use crate::epub::error::{EpubError, Result};
use crate::web::emit;
use crate::web::model::BookManifest;

/// 入口页面文件名
pub const INDEX_FILE: &str = "index.html";

const DEFAULT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="{{ language }}" manifest="manifest.appcache">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{{ title }}</title>
  <link rel="manifest" href="webapp.webmanifest">
  <script src="../polyfill/fetch.js"></script>
  <script src="../viewer.js"></script>
</head>
<body>
  <header>
    <h1>{{ title }}</h1>
    <p class="author">{{ author }}</p>
  </header>
  <main id="viewer" data-start="{{ start }}"></main>
  <script type="application/json" id="manifest">{{ manifest }}</script>
</body>
</html>
"#;

/// 入口页面模板
#[derive(Debug, Clone)]
pub struct IndexTemplate {
    source: String,
}

impl Default for IndexTemplate {
    fn default() -> Self {
        Self::from_source(DEFAULT_TEMPLATE)
    }
}

impl IndexTemplate {
    pub fn from_source(source: impl Into<String>) -> Self {
        Self { source: source.into() }
    }

    /// 从文件加载模板
    pub fn from_file(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path).map_err(|e| {
            EpubError::TemplateError(format!("无法读取模板 {}: {}", path.display(), e))
        })?;
        Ok(Self::from_source(source))
    }

    /// 加载指定模板，未指定时使用内置模板
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// 渲染入口页面
    pub fn render(&self, manifest: &BookManifest) -> Result<String> {
        let mut out = String::with_capacity(self.source.len());
        let mut rest = self.source.as_str();

        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = after
                .find("}}")
                .ok_or_else(|| EpubError::TemplateError("占位符缺少结束的 }}".to_string()))?;
            out.push_str(&Self::value(after[..end].trim(), manifest)?);
            rest = &after[end + 2..];
        }
        out.push_str(rest);

        Ok(out)
    }

    /// 渲染并写出 `index.html`
    pub fn write(&self, book_dir: &Path, manifest: &BookManifest) -> Result<()> {
        fs::write(book_dir.join(INDEX_FILE), self.render(manifest)?)?;
        Ok(())
    }

    fn value(name: &str, manifest: &BookManifest) -> Result<String> {
        let metadata = &manifest.metadata;
        let value = match name {
            "title" => escape_html(&metadata.title),
            "author" => escape_html(&metadata.author),
            "language" => escape_html(&metadata.language),
            "identifier" => escape_html(&metadata.identifier),
            "cover" => escape_html(metadata.cover.as_deref().unwrap_or_default()),
            "start" => escape_html(manifest.spine.first().map(|l| l.href.as_str()).unwrap_or_default()),
            "manifest" => {
                let json = String::from_utf8_lossy(&emit::manifest_json(manifest)?).into_owned();
                // 防止在<script>中提前闭合标签
                json.replace("</", "<\\/")
            }
            other => {
                return Err(EpubError::TemplateError(format!("未知的占位符: {}", other)));
            }
        };
        Ok(value)
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
