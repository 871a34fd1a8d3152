use chrono::{DateTime, Local, Utc};

/// 将 UTC 时间格式化为本地时间 HH:MM:SS.mmm
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.with_timezone(&Local).format("%H:%M:%S%.3f").to_string()
}

/// 导出文件名，带时间戳避免覆盖
pub fn export_file_name(now: &DateTime<Local>) -> String {
    format!("test_results_{}.csv", now.format("%Y%m%d_%H%M%S"))
}

/// 力值显示，保留两位小数
pub fn format_force(value: f64) -> String {
    format!("{:.2} N", value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamp_has_millisecond_precision() {
        let ts = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let formatted = format_timestamp(&ts);
        assert_eq!(formatted.len(), 12);
        assert!(formatted.ends_with(".123"));
    }

    #[test]
    fn export_name_is_sortable() {
        let now = Local.with_ymd_and_hms(2026, 3, 7, 9, 5, 2).unwrap();
        assert_eq!(export_file_name(&now), "test_results_20260307_090502.csv");
    }

    #[test]
    fn force_is_rounded() {
        assert_eq!(format_force(-1.23456), "-1.23 N");
        assert_eq!(format_force(0.0), "0.00 N");
    }
}
