use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use minisector::{Event, MergedSample};

/// `Comparison.png` -> `Comparison-monaco.png`
pub fn with_event_suffix(path: &Path, event: Event) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "comparison".to_string());
    let name = match path.extension() {
        Some(ext) => format!("{}-{}.{}", stem, event.slug(), ext.to_string_lossy()),
        None => format!("{}-{}", stem, event.slug()),
    };
    path.with_file_name(name)
}

pub fn write_samples_csv(samples: &[MergedSample], path: &Path) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = csv::Writer::from_writer(file);
    write_sample_rows(samples, &mut writer)
}

pub fn write_sample_rows<W: Write>(samples: &[MergedSample], writer: &mut csv::Writer<W>) -> Result<()> {
    writer.write_record([
        "distance",
        "x",
        "y",
        "speed",
        "driver",
        "minisector",
        "fastest_driver",
        "fastest_driver_class",
    ])?;
    for s in samples {
        writer.write_record([
            format!("{:.3}", s.distance),
            format!("{:.3}", s.x),
            format!("{:.3}", s.y),
            format!("{:.3}", s.speed),
            s.competitor.code().to_string(),
            s.segment.to_string(),
            s.winner.code().to_string(),
            s.winner.ordinal().to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use minisector::Competitor;

    #[test]
    fn event_suffix_keeps_extension() {
        assert_eq!(
            with_event_suffix(Path::new("out/Comparison.png"), Event::AbuDhabi),
            PathBuf::from("out/Comparison-abu-dhabi.png")
        );
        assert_eq!(
            with_event_suffix(Path::new("plot"), Event::Monza),
            PathBuf::from("plot-monza")
        );
    }

    #[test]
    fn csv_rows_carry_labels_and_classes() {
        let samples = vec![MergedSample {
            competitor: Competitor::Hamilton,
            x: 1.0,
            y: -2.5,
            distance: 12.25,
            speed: 301.0,
            segment: 1,
            winner: Competitor::Verstappen,
        }];
        let mut buf = Vec::new();
        {
            let mut writer = csv::Writer::from_writer(&mut buf);
            write_sample_rows(&samples, &mut writer).unwrap();
        }
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "distance,x,y,speed,driver,minisector,fastest_driver,fastest_driver_class"
        );
        assert_eq!(lines[1], "12.250,1.000,-2.500,301.000,HAM,1,VER,1");
    }
}
