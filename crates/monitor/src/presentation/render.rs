/// 渲染面
///
/// 把展示行转换为树形文本、HTML 片段或 JSON，宿主选择其一交给自己的 UI

use common::models::{DisplayRow, Severity};
use common::utils::escape_html;
use common::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 渲染格式
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RenderFormat {
    #[default]
    Tree,
    Html,
    Json,
}

impl FromStr for RenderFormat {
    type Err = common::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tree" => Ok(Self::Tree),
            "html" => Ok(Self::Html),
            "json" => Ok(Self::Json),
            other => Err(common::Error::ConfigInvalid(format!("未知的渲染格式: {}", other))),
        }
    }
}

impl fmt::Display for RenderFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Tree => "tree",
            Self::Html => "html",
            Self::Json => "json",
        };
        write!(f, "{}", name)
    }
}

fn marker(severity: Severity) -> &'static str {
    match severity {
        Severity::Normal => " ",
        Severity::Warning => "!",
        Severity::Critical => "‼",
    }
}

/// 树形文本，每行一个节点
pub fn tree_lines(rows: &[DisplayRow]) -> Vec<String> {
    rows.iter()
        .map(|row| format!("{} {}: {}", marker(row.severity), row.label, row.value_text))
        .collect()
}

/// HTML 片段
///
/// show_graph 为 true 时附加 CPU / 内存柱状条
pub fn html_fragment(rows: &[DisplayRow], show_graph: bool) -> String {
    let mut html = String::from("<ul class=\"nanometrics\">\n");
    for row in rows {
        html.push_str(&format!(
            "  <li class=\"severity-{}\"><span class=\"label\">{}</span>: <span class=\"value\">{}</span></li>\n",
            row.severity,
            escape_html(&row.label),
            escape_html(&row.value_text)
        ));
    }
    html.push_str("</ul>\n");

    if show_graph {
        html.push_str("<div class=\"graph\">\n");
        for row in rows.iter().filter(|row| row.label == "CPU" || row.label == "Memory") {
            let width = row
                .value_text
                .trim_end_matches('%')
                .parse::<u32>()
                .unwrap_or(0)
                .min(100);
            html.push_str(&format!(
                "  <div class=\"bar severity-{}\" style=\"width:{}%\">{}</div>\n",
                row.severity,
                width,
                escape_html(&row.label)
            ));
        }
        html.push_str("</div>\n");
    }

    html
}

/// JSON 数组
pub fn json(rows: &[DisplayRow]) -> Result<String> {
    Ok(serde_json::to_string(rows)?)
}

/// 按格式渲染为单个字符串
pub fn render(rows: &[DisplayRow], format: RenderFormat, show_graph: bool) -> Result<String> {
    match format {
        RenderFormat::Tree => Ok(tree_lines(rows).join("\n")),
        RenderFormat::Html => Ok(html_fragment(rows, show_graph)),
        RenderFormat::Json => json(rows),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<DisplayRow> {
        vec![
            DisplayRow::new("CPU", "82%", Severity::Critical),
            DisplayRow::new("Memory", "55%", Severity::Warning),
            DisplayRow::normal("Network <lo>", "rx 0.00 B, tx 0.00 B"),
        ]
    }

    #[test]
    fn test_tree_lines() {
        let lines = tree_lines(&rows());
        assert_eq!(lines[0], "‼ CPU: 82%");
        assert_eq!(lines[1], "! Memory: 55%");
        assert_eq!(lines[2], "  Network <lo>: rx 0.00 B, tx 0.00 B");
    }

    #[test]
    fn test_html_is_escaped() {
        let html = html_fragment(&rows(), false);
        assert!(html.contains("severity-critical"));
        assert!(html.contains("Network &lt;lo&gt;"));
        assert!(!html.contains("class=\"graph\""));
    }

    #[test]
    fn test_html_graph() {
        let html = html_fragment(&rows(), true);
        assert!(html.contains("style=\"width:82%\""));
        assert!(html.contains("style=\"width:55%\""));
    }

    #[test]
    fn test_json() {
        let json = json(&rows()).unwrap();
        let parsed: Vec<DisplayRow> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, rows());
        assert!(json.contains("\"valueText\":\"82%\""));
    }

    #[test]
    fn test_parse_render_format() {
        assert_eq!("HTML".parse::<RenderFormat>().unwrap(), RenderFormat::Html);
        assert!("xml".parse::<RenderFormat>().is_err());
    }
}
