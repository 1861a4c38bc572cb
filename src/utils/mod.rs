pub mod bins;
pub mod exec_policy;
pub mod process;

pub mod time {
    use std::time::Duration;

    use anyhow::Result;
    use time::{OffsetDateTime, format_description::well_known::Rfc3339};

    pub fn now_utc() -> Result<String> {
        Ok(OffsetDateTime::now_utc().format(&Rfc3339)?)
    }

    /// `1h02m03s`, `4m05s`, `6s`; sub-second precision is dropped.
    pub fn fmt_duration(d: Duration) -> String {
        let secs = d.as_secs();
        let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
        if h > 0 {
            format!("{h}h{m:02}m{s:02}s")
        } else if m > 0 {
            format!("{m}m{s:02}s")
        } else {
            format!("{s}s")
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn now_is_rfc3339_utc() {
            let s = now_utc().unwrap();
            assert!(s.ends_with('Z'), "got {s}");
            assert!(OffsetDateTime::parse(&s, &Rfc3339).is_ok());
        }

        #[test]
        fn durations() {
            assert_eq!(fmt_duration(Duration::from_millis(6_900)), "6s");
            assert_eq!(fmt_duration(Duration::from_secs(245)), "4m05s");
            assert_eq!(fmt_duration(Duration::from_secs(3723)), "1h02m03s");
        }
    }
}
