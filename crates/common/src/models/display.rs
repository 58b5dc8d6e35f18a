/// 展示行定义

use serde::{Deserialize, Serialize};
use std::fmt;

use super::constants::{CRITICAL_THRESHOLD, WARNING_THRESHOLD};

/// 严重程度，决定展示强调
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Normal,
    Warning,
    Critical,
}

impl Severity {
    /// 百分比标量的阈值分级
    pub fn for_percent(percent: f64) -> Self {
        if percent >= CRITICAL_THRESHOLD {
            Self::Critical
        } else if percent >= WARNING_THRESHOLD {
            Self::Warning
        } else {
            Self::Normal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 展示行
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DisplayRow {
    pub label: String,
    pub value_text: String,
    pub severity: Severity,
}

impl DisplayRow {
    pub fn new(label: impl Into<String>, value_text: impl Into<String>, severity: Severity) -> Self {
        Self {
            label: label.into(),
            value_text: value_text.into(),
            severity,
        }
    }

    pub fn normal(label: impl Into<String>, value_text: impl Into<String>) -> Self {
        Self::new(label, value_text, Severity::Normal)
    }
}
