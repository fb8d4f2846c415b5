//! Segment a synthetic morning of field work into a report.
//!
//! Run with: RUST_LOG=debug cargo run --example field_report

use chrono::{Duration, TimeZone, Utc};
use field_segmentation::{run, Diagnostic, GpsFix, SegmentationConfig};

fn main() {
    env_logger::init();

    let start = Utc.with_ymd_and_hms(2024, 3, 1, 7, 0, 0).unwrap();
    let mut fixes = Vec::new();
    let mut clock = 0;

    // Walk from the road to the first plot
    for i in 0..4 {
        fixes.push(GpsFix::new(19.5790 + i as f64 * 2e-4, 74.6060, start + Duration::seconds(clock)));
        clock += 45;
    }

    // Two plots, walked row by row at ~8 m spacing
    for (lat, lng) in [(19.5800, 74.6070), (19.5830, 74.6090)] {
        for i in 0..48 {
            let (row, col) = (i / 8, i % 8);
            fixes.push(GpsFix::new(
                lat + row as f64 * 5e-5,
                lng + col as f64 * 5e-5,
                start + Duration::seconds(clock),
            ));
            clock += 20;
        }
        clock += 900;
    }

    let config = SegmentationConfig {
        eps_degrees: 1e-4,
        min_area_gunthas: 1.0,
        include_noise_segments: true,
        ..Default::default()
    };

    println!("Field Segmentation Example\n");
    println!(
        "Config: eps={} deg, min_points={}, min_area={} gunthas\n",
        config.eps_degrees, config.min_points, config.min_area_gunthas
    );

    let report = match run(fixes, &config) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Could not process trace: {}", e);
            return;
        }
    };

    if report.diagnostics.contains(&Diagnostic::NoFieldsDetected) {
        println!("No fields found in this trace.");
    }

    if let Some(lead_in) = &report.lead_in {
        println!(
            "Lead-in: {:.0}m in {:.1} min\n",
            lead_in.distance_m,
            lead_in.elapsed_minutes()
        );
    }

    println!("Field | Area (gunthas) | Time (min) | To next (m) | To next (min)");
    for row in report.rows() {
        println!(
            "{:>5} | {:>14.2} | {:>10.1} | {:>11} | {:>13}",
            row.field_index,
            row.area_gunthas,
            row.dwell_minutes,
            row.distance_to_next_m.map_or("-".to_string(), |d| format!("{:.0}", d)),
            row.time_to_next_minutes.map_or("-".to_string(), |m| format!("{:.1}", m)),
        );
    }

    let summary = &report.summary;
    println!("\nSummary:");
    println!("  Fixes: {} ({} noise)", summary.point_count, report.noise_point_count);
    println!("  Duration: {:.1} min", summary.total_minutes);
    println!("  Mean sampling interval: {:.1} s", summary.mean_sampling_interval_seconds);
    println!("  Path length: {:.0} m", summary.path_length_m);
    println!("  Time in fields: {:.1} min", summary.minutes_in_fields);
    println!("  Total area: {:.2} gunthas", report.total_area_gunthas());

    for segment in &report.noise_segments {
        println!(
            "  Noise fix #{} is {:.0}m from field {}",
            segment.fix_index, segment.travel.distance_m, segment.nearest_field
        );
    }
}
