use std::path::PathBuf;
use waymark_extract::{parse_heading, EntityExtractor, ExtractorConfig};

const ORLANDO_DAY: &str = "\
# Orlando – May 2 → May 5
## Trip Snapshot
- Travelers : **2**
- Budget    : **$2,400 USD total**

## Daily Breakdown
### Day 1 – May 2
| Time (24h) | Activity | Neighborhood / Address | Notes |
|------------|----------|------------------------|-------|
| 08:00-09:00 | Breakfast @ **Se7en Bites** (Bakery • ★4.6 • $) | Milk District | Try the pie. |
| 09:30-13:00 | **Kennedy Space Center** | Merritt Island | Pre-book the bus tour. |
| 13:30-14:30 | Walk to **Cocoa Beach Pier** | 20 min drive | Fresh seafood. |
| 17:45-19:15 | Dinner @ **The Boheme** (★4.7 • $$$) | Downtown Orlando | Jazz brunch on Sundays. |
Take the Lynx Bus along International Drive to reach Universal Studios Florida.
";

fn extractor() -> EntityExtractor {
    EntityExtractor::with_config(ExtractorConfig::default(), PathBuf::from("unused.json"))
}

#[test]
fn test_full_day_candidates() {
    let names = extractor().extract(ORLANDO_DAY);

    for expected in [
        "Se7en Bites",
        "The Boheme",
        "Kennedy Space Center",
        "Cocoa Beach Pier",
        "Universal Studios Florida",
    ] {
        assert!(
            names.iter().any(|n| n == expected),
            "expected {:?} in {:?}",
            expected,
            names
        );
    }

    // Marker captures come first
    assert_eq!(names[0], "Se7en Bites");
    assert_eq!(names[1], "The Boheme");
}

#[test]
fn test_full_day_has_no_duplicates() {
    let names = extractor().extract(ORLANDO_DAY);
    let mut sorted = names.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(sorted.len(), names.len());
}

#[test]
fn test_over_inclusive_by_design() {
    // Snapshot lines and table headers leak through; resolution filters them later
    let names = extractor().extract(ORLANDO_DAY);
    assert!(names.iter().any(|n| n == "Trip Snapshot"));
    assert!(names.iter().any(|n| n == "Daily Breakdown"));
}

#[test]
fn test_heading_gives_destination() {
    assert_eq!(parse_heading(ORLANDO_DAY), Some("Orlando".to_string()));
}
