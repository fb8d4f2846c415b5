//! Segment many independent traces in parallel.
//!
//! Run with: cargo run --example batch_traces --features parallel

use chrono::{Duration, TimeZone, Utc};
use field_segmentation::{run_batch_parallel, GpsFix, PointTrace, SegmentationConfig};
use std::time::Instant;

fn main() {
    env_logger::init();

    println!("Batch Trace Segmentation Example\n");

    let config = SegmentationConfig { eps_degrees: 1e-4, min_area_gunthas: 1.0, ..Default::default() };

    // One trace per operator day, each visiting 1-4 plots
    let traces: Vec<PointTrace> = (0..32)
        .filter_map(|day| PointTrace::new(synthetic_day(day, 1 + day % 4)).ok())
        .collect();

    println!("Created {} traces\n", traces.len());

    let start = Instant::now();
    let reports = match run_batch_parallel(&traces, &config) {
        Ok(reports) => reports,
        Err(e) => {
            eprintln!("Batch failed: {}", e);
            return;
        }
    };
    let elapsed = start.elapsed();

    println!("Segmentation completed in {:?}\n", elapsed);

    let total_fields: usize = reports.iter().map(|r| r.fields.len()).sum();
    let total_area: f64 = reports.iter().map(|r| r.total_area_gunthas()).sum();
    let total_travel: f64 = reports.iter().map(|r| r.total_travel_distance_m()).sum();
    let empty = reports.iter().filter(|r| !r.has_fields()).count();

    println!("Stats:");
    println!("  Traces: {}", reports.len());
    println!("  Fields found: {}", total_fields);
    println!("  Total area: {:.1} gunthas", total_area);
    println!("  Travel between fields: {:.0} m", total_travel);
    println!("  Traces without fields: {}", empty);
}

/// A day of work: `plots` grids visited one after another.
fn synthetic_day(day: usize, plots: usize) -> Vec<GpsFix> {
    let start = Utc.with_ymd_and_hms(2024, 3, 1, 7, 0, 0).unwrap() + Duration::days(day as i64);
    let mut fixes = Vec::new();
    let mut clock = 0;

    for plot in 0..plots {
        let lat = 19.58 + day as f64 * 0.01 + plot as f64 * 0.002;
        for i in 0..40 {
            fixes.push(GpsFix::new(
                lat + (i / 8) as f64 * 5e-5,
                74.607 + (i % 8) as f64 * 5e-5,
                start + Duration::seconds(clock),
            ));
            clock += 20;
        }
        clock += 600;
    }

    fixes
}
