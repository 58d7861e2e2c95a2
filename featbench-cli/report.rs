use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use featbench_core::{DescriptorFamily, DetectorFamily, FatalResult};

pub const REPORT_TITLE: &str = "Results for task8";
pub const REPORT_HEADER: &str =
    "Detector, # Keypoints, Time for detection (ms), Descriptor, Time for description (ms), #matches, ";

/// Measurements of one matched frame pair
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub detector: DetectorFamily,
    /// Keypoints of the current frame after ROI filtering and limiting
    pub keypoints: usize,
    pub detection_ms: f64,
    pub descriptor: DescriptorFamily,
    pub description_ms: f64,
    pub matches: usize,
}

/// Destination of sweep results
pub trait ReportSink {
    fn row(&mut self, row: &ResultRow) -> FatalResult<()>;
    /// Marker for a pair whose run aborted; only called when failure
    /// recording is enabled
    fn failure(&mut self, detector: DetectorFamily, descriptor: DescriptorFamily, reason: &str) -> FatalResult<()>;
    fn finish(&mut self) -> FatalResult<()>;
}

/// Comma-separated report with a title line and a fixed header
pub struct CsvReport<W: Write> {
    writer: W,
}

impl CsvReport<BufWriter<File>> {
    pub fn create<P: AsRef<Path>>(path: P) -> FatalResult<Self> {
        let file = File::create(path)?;
        Self::new(BufWriter::new(file))
    }
}

impl<W: Write> CsvReport<W> {
    pub fn new(mut writer: W) -> FatalResult<Self> {
        writeln!(writer, "{}", REPORT_TITLE)?;
        writeln!(writer, "{}", REPORT_HEADER)?;
        Ok(Self { writer })
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ReportSink for CsvReport<W> {
    fn row(&mut self, row: &ResultRow) -> FatalResult<()> {
        writeln!(
            self.writer,
            "{},{},{:.4},{},{:.4},{}, ",
            row.detector, row.keypoints, row.detection_ms, row.descriptor, row.description_ms, row.matches
        )?;
        Ok(())
    }

    fn failure(&mut self, detector: DetectorFamily, descriptor: DescriptorFamily, reason: &str) -> FatalResult<()> {
        // commas would shift the columns
        let reason = reason.replace(',', ";");
        writeln!(self.writer, "{},FAILED,,{},,,{}", detector, descriptor, reason)?;
        Ok(())
    }

    fn finish(&mut self) -> FatalResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Collects everything in memory
#[derive(Debug, Default, Clone)]
pub struct MemoryReport {
    pub rows: Vec<ResultRow>,
    pub failures: Vec<(DetectorFamily, DescriptorFamily, String)>,
    pub finished: bool,
}

impl ReportSink for MemoryReport {
    fn row(&mut self, row: &ResultRow) -> FatalResult<()> {
        self.rows.push(row.clone());
        Ok(())
    }

    fn failure(&mut self, detector: DetectorFamily, descriptor: DescriptorFamily, reason: &str) -> FatalResult<()> {
        self.failures.push((detector, descriptor, reason.to_string()));
        Ok(())
    }

    fn finish(&mut self) -> FatalResult<()> {
        self.finished = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_layout() {
        let mut report = CsvReport::new(Vec::new()).unwrap();
        report
            .row(&ResultRow {
                detector: DetectorFamily::Fast,
                keypoints: 149,
                detection_ms: 1.25,
                descriptor: DescriptorFamily::Brief,
                description_ms: 0.5,
                matches: 122,
            })
            .unwrap();
        report
            .failure(DetectorFamily::Orb, DescriptorFamily::Sift, "boom, twice")
            .unwrap();
        report.finish().unwrap();

        let text = String::from_utf8(report.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Results for task8");
        assert_eq!(
            lines[1],
            "Detector, # Keypoints, Time for detection (ms), Descriptor, Time for description (ms), #matches, "
        );
        assert_eq!(lines[2], "FAST,149,1.2500,BRIEF,0.5000,122, ");
        assert_eq!(lines[3], "ORB,FAILED,,SIFT,,,boom; twice");
    }
}
