use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use vitalread::cleaning::{CachePolicy, OverlapCounter};
use vitalread::{BoundingBox, Cleaner, CleanerConfig, DeviceType, FieldRegistry, OcrRequest, Segment};

fn builtin_cleaner() -> Cleaner {
    Cleaner::new(FieldRegistry::builtin().unwrap())
}

fn value_of<'a>(segments: &'a [vitalread::CleanedSegment], name: &str) -> Option<&'a str> {
    segments
        .iter()
        .find(|s| s.name == name)
        .and_then(|s| s.value.as_deref())
}

#[test]
fn test_json_request_roundtrip() {
    let line = r#"{"monitorId":"bed-4","imageId":7,"segments":[
        {"name":"HR","value":"80 ","top":1,"left":2,"bottom":3,"right":4,"level":"crop"},
        {"name":"HR","value":"(80)"},
        {"name":"SpO2","value":"97%"},
        {"value":"ignored"}
    ]}"#;
    let request: OcrRequest = serde_json::from_str(line).unwrap();
    assert_eq!(request.monitor_id.as_deref(), Some("bed-4"));

    let cleaner = builtin_cleaner();
    let output = cleaner
        .clean(&request.segments, request.monitor_id.as_deref())
        .unwrap();

    let json = serde_json::to_value(&output.segments).unwrap();
    assert_eq!(
        json,
        serde_json::json!([
            {"name": "HR", "value": "80", "top": 1, "left": 2, "bottom": 3, "right": 4},
            {"name": "SpO2", "value": "97"}
        ])
    );
}

#[test]
fn test_null_values_serialize_as_null() {
    let cleaner = builtin_cleaner();
    let output = cleaner
        .clean(&[Segment::new("HR", Some("abc"))], Some("bed-1"))
        .unwrap();
    let json = serde_json::to_value(&output.segments).unwrap();
    assert_eq!(json, serde_json::json!([{"name": "HR", "value": null}]));
}

#[test]
fn test_last_valid_value_survives_within_window() {
    let cleaner = builtin_cleaner();
    let t0 = Instant::now();
    let good = [Segment::new("RR", Some("18"))];
    let garbage = [Segment::new("RR", Some("xx"))];

    let out = cleaner.clean_at(&good, Some("m"), t0).unwrap();
    assert_eq!(value_of(&out.segments, "RR"), Some("18"));

    let out = cleaner.clean_at(&garbage, Some("m"), t0 + Duration::from_secs(10)).unwrap();
    assert_eq!(value_of(&out.segments, "RR"), Some("18"));

    let out = cleaner
        .clean_at(&garbage, Some("m"), t0 + Duration::from_millis(10_001))
        .unwrap();
    assert_eq!(value_of(&out.segments, "RR"), None);
}

#[test]
fn test_crop_box_with_split_fields() {
    let cleaner = builtin_cleaner();
    let bbox = BoundingBox { top: 5, left: 6, bottom: 50, right: 60 };
    let frame = [Segment::new("IBP", Some("130/70")).with_crop(bbox)];
    let output = cleaner.clean(&frame, Some("m")).unwrap();

    assert_eq!(output.segments.len(), 2);
    assert!(output.segments.iter().all(|s| s.bbox == Some(bbox)));
    assert_eq!(value_of(&output.segments, "IBP-Systole"), Some("130"));
    assert_eq!(value_of(&output.segments, "IBP-Diastole"), Some("70"));
}

#[test]
fn test_parallel_monitors_do_not_interfere() {
    let counter = Arc::new(OverlapCounter::new());
    let cleaner = Arc::new(builtin_cleaner().with_observer(counter.clone()));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let cleaner = Arc::clone(&cleaner);
            thread::spawn(move || {
                let monitor = format!("bed-{}", i);
                let hr = format!("{}", 60 + i);
                for _ in 0..50 {
                    let frame = [Segment::new("HR", Some(hr.as_str()))];
                    let output = cleaner.clean(&frame, Some(monitor.as_str())).unwrap();
                    assert_eq!(value_of(&output.segments, "HR"), Some(hr.as_str()));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(cleaner.monitor_count(), 8);
    for i in 0..8 {
        let state = cleaner.monitor_state(&format!("bed-{}", i)).unwrap();
        assert_eq!(state.last_valid_value("HR"), Some(format!("{}", 60 + i).as_str()));
    }
    assert_eq!(counter.get(), 0);
}

#[test]
fn test_least_recent_monitor_evicted_at_capacity() {
    let config = CleanerConfig {
        cache: CachePolicy {
            max_monitors: 2,
            idle_timeout: None,
        },
        ..CleanerConfig::default()
    };
    let cleaner = Cleaner::with_config(FieldRegistry::builtin().unwrap(), config);
    let t0 = Instant::now();
    let frame = [Segment::new("HR", Some("70"))];

    cleaner.clean_at(&frame, Some("a"), t0).unwrap();
    cleaner.clean_at(&frame, Some("b"), t0 + Duration::from_secs(1)).unwrap();
    cleaner.clean_at(&frame, Some("a"), t0 + Duration::from_secs(2)).unwrap();
    cleaner.clean_at(&frame, Some("c"), t0 + Duration::from_secs(3)).unwrap();

    assert_eq!(cleaner.monitor_count(), 2);
    assert!(cleaner.monitor_state("a").is_some());
    assert!(cleaner.monitor_state("b").is_none());
    assert!(cleaner.monitor_state("c").is_some());
}

#[test]
fn test_idle_monitor_evicted() {
    let config = CleanerConfig {
        cache: CachePolicy {
            max_monitors: 16,
            idle_timeout: Some(Duration::from_secs(60)),
        },
        ..CleanerConfig::default()
    };
    let cleaner = Cleaner::with_config(FieldRegistry::builtin().unwrap(), config);
    let t0 = Instant::now();
    let frame = [Segment::new("HR", Some("70"))];

    cleaner.clean_at(&frame, Some("a"), t0).unwrap();
    cleaner.clean_at(&frame, Some("b"), t0 + Duration::from_secs(61)).unwrap();

    assert!(cleaner.monitor_state("a").is_none());
    assert_eq!(cleaner.monitor_count(), 1);
}

#[test]
fn test_custom_catalog() {
    let content = r#"
[[field]]
name = "HR"
device = "monitor"

[field.spec]
kind = "integer"
max_length = 3
valid = { min = 10.0, max = 200.0 }

[[field]]
name = "Temp"

[field.spec]
kind = "float"
max_length = 3
decimal_digits = 1
repair = { rule = "implied_decimal", low = 350, high = 420 }
"#;
    let registry = FieldRegistry::from_toml_str(content).unwrap();
    let cleaner = Cleaner::new(registry);
    let frame = [
        Segment::new("HR", Some("72")),
        Segment::new("Temp", Some("372")),
        Segment::new("SpO2", Some("98")),
    ];
    let output = cleaner.clean(&frame, Some("m")).unwrap();

    assert_eq!(value_of(&output.segments, "HR"), Some("72"));
    assert_eq!(value_of(&output.segments, "Temp"), Some("37.2"));
    // not in this catalog, passed through by majority
    assert_eq!(value_of(&output.segments, "SpO2"), Some("98"));
}

#[test]
fn test_repeated_frame_is_idempotent() {
    let cleaner = builtin_cleaner();
    let now = Instant::now();
    let frame = [
        Segment::new("HR", Some("72")),
        Segment::new("HR", Some("7")),
        Segment::new("Temp", Some("372")),
        Segment::new("NIBP", Some("118/76")),
    ];

    let first = cleaner.clean_at(&frame, Some("m"), now).unwrap();
    let state = cleaner.monitor_state("m").unwrap();
    let second = cleaner.clean_at(&frame, Some("m"), now).unwrap();

    assert_eq!(first.segments, second.segments);
    assert_eq!(cleaner.monitor_state("m").unwrap(), state);
}

#[test]
fn test_resolved_values_respect_hard_bounds() {
    let registry = FieldRegistry::for_devices(&[DeviceType::Monitor, DeviceType::Respirator]).unwrap();
    let bounded: Vec<(String, f64, f64)> = registry
        .entries()
        .iter()
        .filter_map(|e| {
            let range = e.spec.valid_range();
            Some((e.name.clone(), range.min?, range.max?))
        })
        .collect();
    assert!(!bounded.is_empty());

    let cleaner = Cleaner::new(registry);
    let mut rng = StdRng::seed_from_u64(11);
    let alphabet = ['0', '1', '2', '3', '4', '5', '6', '7', '8', '9', '.', ' ', 'o'];
    let start = Instant::now();

    for step in 0..200u64 {
        let frame: Vec<Segment> = bounded
            .iter()
            .flat_map(|(name, _, _)| {
                let readings = rng.gen_range(1..=3);
                (0..readings)
                    .map(|_| {
                        let len = rng.gen_range(1..=5);
                        let raw: String = (0..len)
                            .map(|_| alphabet[rng.gen_range(0..alphabet.len())])
                            .collect();
                        Segment::new(name.as_str(), Some(raw.as_str()))
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        let now = start + Duration::from_millis(step * 500);
        let output = cleaner.clean_at(&frame, Some("fuzz"), now).unwrap();
        for segment in &output.segments {
            let Some((_, min, max)) = bounded.iter().find(|(n, _, _)| *n == segment.name) else {
                continue;
            };
            if let Some(value) = &segment.value {
                let parsed: f64 = value.parse().unwrap();
                assert!(
                    parsed >= *min && parsed <= *max,
                    "{} = {} outside [{}, {}]",
                    segment.name,
                    value,
                    min,
                    max
                );
            }
        }
    }
}
