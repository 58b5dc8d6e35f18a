/// 工具函数集合

/// 格式化字节大小
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}

/// 格式化百分比，四舍五入到整数
pub fn format_percent(percent: f64) -> String {
    format!("{}%", percent.round() as i64)
}

/// 格式化摄氏温度，四舍五入到整数
pub fn format_celsius(celsius: f64) -> String {
    format!("{}°C", celsius.round() as i64)
}

/// 将百分比限制在 0-100 之间，非有限值返回 None
pub fn sanitize_percent(value: f64) -> Option<f64> {
    if value.is_finite() {
        Some(value.clamp(0.0, 100.0))
    } else {
        None
    }
}

/// 计算占比百分比，分母为 0 时返回 None
pub fn ratio_percent(part: u64, total: u64) -> Option<f64> {
    if total == 0 {
        return None;
    }
    Some(part as f64 / total as f64 * 100.0)
}

/// 转义 HTML 文本
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0.00 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1048576), "1.00 MB");
        assert_eq!(format_bytes(1073741824), "1.00 GB");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(82.3), "82%");
        assert_eq!(format_percent(79.5), "80%");
        assert_eq!(format_percent(0.0), "0%");
        assert_eq!(format_percent(100.0), "100%");
    }

    #[test]
    fn test_sanitize_percent() {
        assert_eq!(sanitize_percent(42.0), Some(42.0));
        assert_eq!(sanitize_percent(-3.0), Some(0.0));
        assert_eq!(sanitize_percent(130.0), Some(100.0));
        assert_eq!(sanitize_percent(f64::NAN), None);
        assert_eq!(sanitize_percent(f64::INFINITY), None);
    }

    #[test]
    fn test_ratio_percent() {
        assert_eq!(ratio_percent(1, 4), Some(25.0));
        assert_eq!(ratio_percent(1, 0), None);
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<b>\"a\" & 'b'</b>"), "&lt;b&gt;&quot;a&quot; &amp; &#39;b&#39;&lt;/b&gt;");
        assert_eq!(escape_html("eth0"), "eth0");
    }
}
