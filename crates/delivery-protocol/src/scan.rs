use crate::error::ProtocolError;

/// One range/intensity sample from a laser revolution.
///
/// `angle` is in `[0, 2*PI)`, measured from the robot's forward axis.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScanPoint {
    pub distance: f64,
    pub angle: f64,
    pub intensity: f64,
}

impl ScanPoint {
    pub fn new(distance: f64, angle: f64, intensity: f64) -> Self {
        Self { distance, angle, intensity }
    }
}

/// A full revolution of range samples, angle-sorted ascending.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Scan {
    pub points: Vec<ScanPoint>,
}

impl Scan {
    pub fn new(points: Vec<ScanPoint>) -> Self {
        Self { points }
    }

    /// Nearest recorded point whose bearing falls within `half_width` of
    /// `angle`, or `None` if the scan has no point in that sector.
    pub fn nearest_in_sector(&self, angle: f64, half_width: f64) -> Option<&ScanPoint> {
        self.points
            .iter()
            .filter(|p| angular_distance(p.angle, angle) <= half_width)
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    pub fn min_distance(&self) -> Option<f64> {
        self.points.iter().map(|p| p.distance).min_by(f64::total_cmp)
    }
}

fn angular_distance(a: f64, b: f64) -> f64 {
    let diff = (a - b).rem_euclid(std::f64::consts::TAU);
    diff.min(std::f64::consts::TAU - diff)
}

/// Wire line for one full revolution from the laser scanner device:
/// `SCAN:<d0>,<a0>,<i0>;<d1>,<a1>,<i1>;...`, same ASCII-line-per-record
/// idiom as the microcontroller's `ENCODER:`/`IR:` telemetry.
pub fn parse_scan_line(line: &str) -> Result<Scan, ProtocolError> {
    let line = line.trim();
    let rest = line
        .strip_prefix("SCAN:")
        .ok_or_else(|| ProtocolError::UnknownTelemetry(line.to_string()))?;
    if rest.is_empty() {
        return Ok(Scan::default());
    }
    let mut points = Vec::new();
    for record in rest.split(';') {
        let mut fields = record.split(',');
        let distance: f64 = fields
            .next()
            .and_then(|v| v.trim().parse().ok())
            .ok_or_else(|| ProtocolError::MalformedLine(line.to_string()))?;
        let angle: f64 = fields
            .next()
            .and_then(|v| v.trim().parse().ok())
            .ok_or_else(|| ProtocolError::MalformedLine(line.to_string()))?;
        let intensity: f64 = fields
            .next()
            .and_then(|v| v.trim().parse().ok())
            .ok_or_else(|| ProtocolError::MalformedLine(line.to_string()))?;
        if fields.next().is_some() {
            return Err(ProtocolError::MalformedLine(line.to_string()));
        }
        points.push(ScanPoint::new(distance, angle, intensity));
    }
    Ok(Scan::new(points))
}

/// Inverse of [`parse_scan_line`], without the trailing `\n`.
pub fn encode_scan_line(scan: &Scan) -> String {
    let body = scan
        .points
        .iter()
        .map(|p| format!("{},{},{}", p.distance, p.angle, p.intensity))
        .collect::<Vec<_>>()
        .join(";");
    format!("SCAN:{body}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_in_sector_picks_closest_point() {
        let scan = Scan::new(vec![
            ScanPoint::new(2.0, 0.0, 1.0),
            ScanPoint::new(0.5, 0.05, 1.0),
            ScanPoint::new(5.0, 3.0, 1.0),
        ]);
        let nearest = scan.nearest_in_sector(0.0, 0.2).expect("a point in sector");
        assert_eq!(nearest.distance, 0.5);
    }

    #[test]
    fn nearest_in_sector_none_when_empty() {
        let scan = Scan::new(vec![ScanPoint::new(5.0, 3.0, 1.0)]);
        assert!(scan.nearest_in_sector(0.0, 0.1).is_none());
    }

    #[test]
    fn angular_distance_wraps_across_zero() {
        assert!(angular_distance(0.05, std::f64::consts::TAU - 0.05) < 0.2);
    }

    #[test]
    fn parse_scan_line_round_trips_through_encode() {
        let scan = Scan::new(vec![ScanPoint::new(1.5, 0.0, 0.9), ScanPoint::new(2.25, 1.2, 0.4)]);
        let line = encode_scan_line(&scan);
        assert_eq!(parse_scan_line(&line).unwrap(), scan);
    }

    #[test]
    fn parse_scan_line_accepts_empty_revolution() {
        assert_eq!(parse_scan_line("SCAN:").unwrap(), Scan::default());
    }

    #[test]
    fn parse_scan_line_rejects_missing_prefix() {
        assert!(matches!(parse_scan_line("1.0,0.0,1.0"), Err(ProtocolError::UnknownTelemetry(_))));
    }

    #[test]
    fn parse_scan_line_rejects_malformed_record() {
        assert!(matches!(parse_scan_line("SCAN:1.0,2.0"), Err(ProtocolError::MalformedLine(_))));
        assert!(matches!(parse_scan_line("SCAN:a,0.0,1.0"), Err(ProtocolError::MalformedLine(_))));
    }
}
