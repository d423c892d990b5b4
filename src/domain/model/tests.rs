// Unit tests for domain models

use super::*;

#[test]
fn test_time_range_creation() {
    let range = TimeRange::new(2.0, 3.5).unwrap();
    assert_eq!(range.start(), 2.0);
    assert_eq!(range.end(), 3.5);
    assert_eq!(range.duration(), 1.5);
}

#[test]
fn test_time_range_invalid() {
    assert!(TimeRange::new(-1.0, 2.0).is_err());
    assert!(TimeRange::new(3.0, 3.0).is_err());
    assert!(TimeRange::new(4.0, 3.0).is_err());
    assert!(TimeRange::new(f64::NAN, 3.0).is_err());
    assert!(TimeRange::new(0.0, f64::INFINITY).is_err());
}

#[test]
fn test_time_range_deserialize_validates() {
    let range: TimeRange = serde_json::from_str(r#"{"start": 1.25, "end": 2.5}"#).unwrap();
    assert_eq!(range, TimeRange::new(1.25, 2.5).unwrap());

    let reversed = serde_json::from_str::<TimeRange>(r#"{"start": 5, "end": 2}"#);
    assert!(reversed.is_err());
}

#[test]
fn test_time_range_parse_cli_form() {
    let range: TimeRange = "1:02.5-1:04".parse().unwrap();
    assert_eq!(range.start(), 62.5);
    assert_eq!(range.end(), 64.0);

    let plain: TimeRange = "2-3".parse().unwrap();
    assert_eq!(plain, TimeRange::new(2.0, 3.0).unwrap());

    assert!("2.5".parse::<TimeRange>().is_err());
    assert!("3-2".parse::<TimeRange>().is_err());
}

#[test]
fn test_keep_plan_complement_and_total() {
    let plan = KeepPlan::from_sorted(vec![
        TimeRange::new(0.0, 1.95).unwrap(),
        TimeRange::new(3.05, 10.0).unwrap(),
    ]);
    assert!((plan.total_duration() - 8.9).abs() < 1e-9);

    let gaps = plan.complement(10.0);
    assert_eq!(gaps, vec![TimeRange::new(1.95, 3.05).unwrap()]);
}

#[test]
fn test_keep_plan_complement_edges() {
    let plan = KeepPlan::from_sorted(vec![TimeRange::new(2.0, 4.0).unwrap()]);
    let gaps = plan.complement(6.0);
    assert_eq!(
        gaps,
        vec![
            TimeRange::new(0.0, 2.0).unwrap(),
            TimeRange::new(4.0, 6.0).unwrap()
        ]
    );
}

#[test]
fn test_output_format_parse() {
    assert_eq!("mp4".parse::<OutputFormat>().unwrap(), OutputFormat::Mp4);
    assert_eq!("MP3".parse::<OutputFormat>().unwrap(), OutputFormat::Mp3);
    assert!("mkv".parse::<OutputFormat>().is_err());
    assert!(OutputFormat::Mp3.is_audio_only());
    assert_eq!(OutputFormat::default().extension(), "mp4");
}

#[test]
fn test_keep_plan_serializes_as_array() {
    let plan = KeepPlan::from_sorted(vec![TimeRange::new(0.0, 1.0).unwrap()]);
    let json = serde_json::to_string(&plan).unwrap();
    assert_eq!(json, r#"[{"start":0.0,"end":1.0}]"#);
}
