use delivery_protocol::{Pose, Scan, ScanPoint};

/// Tuning knobs for breakpoint-based person clustering on a laser scan.
///
/// Clustering is the classic range-image segmentation approach: walk the
/// angle-sorted scan and start a new cluster wherever the range jumps by
/// more than `break_distance_m` between consecutive points. A cluster is
/// accepted as a person candidate only if its apparent width falls within
/// a human torso/shoulder silhouette.
#[derive(Debug, Clone, Copy)]
pub struct PersonDetectorConfig {
    /// Range discontinuity (metres) that starts a new cluster.
    pub break_distance_m: f64,
    /// Minimum accepted cluster width (metres).
    pub min_width_m: f64,
    /// Maximum accepted cluster width (metres).
    pub max_width_m: f64,
    /// Candidates farther than this from the robot are ignored.
    pub max_range_m: f64,
}

impl Default for PersonDetectorConfig {
    fn default() -> Self {
        Self { break_distance_m: 0.20, min_width_m: 0.15, max_width_m: 0.90, max_range_m: 6.0 }
    }
}

/// One contiguous run of scan points with no large range discontinuity.
struct Cluster<'a> {
    points: Vec<&'a ScanPoint>,
}

impl<'a> Cluster<'a> {
    fn mean_distance(&self) -> f64 {
        self.points.iter().map(|p| p.distance).sum::<f64>() / self.points.len() as f64
    }

    /// Mean bearing, via the circular mean so a cluster straddling the
    /// `0`/`2*PI` wrap doesn't average to the wrong side of the circle.
    fn mean_angle(&self) -> f64 {
        let (mut sin_sum, mut cos_sum) = (0.0, 0.0);
        for p in &self.points {
            sin_sum += p.angle.sin();
            cos_sum += p.angle.cos();
        }
        sin_sum.atan2(cos_sum).rem_euclid(std::f64::consts::TAU)
    }

    /// Chord width between the first and last point in the cluster,
    /// approximating the silhouette's apparent extent.
    fn width(&self) -> f64 {
        let first = self.points.first().expect("cluster is never empty");
        let last = self.points.last().expect("cluster is never empty");
        let (x1, y1) = (first.distance * first.angle.cos(), first.distance * first.angle.sin());
        let (x2, y2) = (last.distance * last.angle.cos(), last.distance * last.angle.sin());
        ((x2 - x1).powi(2) + (y2 - y1).powi(2)).sqrt()
    }
}

/// Splits an angle-sorted scan into breakpoint clusters, merging the last
/// cluster into the first if the scan wraps around `0` without a break
/// (the revolution is cyclic, not a line segment).
fn breakpoint_clusters(scan: &Scan, break_distance_m: f64) -> Vec<Cluster<'_>> {
    if scan.points.is_empty() {
        return Vec::new();
    }
    let mut clusters: Vec<Cluster> = Vec::new();
    let mut current: Vec<&ScanPoint> = vec![&scan.points[0]];
    for pair in scan.points.windows(2) {
        let (prev, next) = (pair[0].distance, pair[1].distance);
        if (next - prev).abs() > break_distance_m {
            clusters.push(Cluster { points: std::mem::take(&mut current) });
        }
        current.push(&pair[1]);
    }
    clusters.push(Cluster { points: current });

    if clusters.len() > 1 {
        let wrap_gap = (clusters[0].points[0].distance
            - clusters.last().unwrap().points.last().unwrap().distance)
            .abs();
        if wrap_gap <= break_distance_m {
            let first = clusters.remove(0);
            clusters.last_mut().unwrap().points.extend(first.points);
        }
    }
    clusters
}

/// Detects the nearest person-shaped cluster in `scan`, reporting its
/// position in the global frame given the robot's current `pose`.
///
/// Returns `None` when the scan has no point, or no cluster's apparent
/// width falls in the configured human silhouette band.
pub fn detect_person(scan: &Scan, robot_pose: Pose, config: &PersonDetectorConfig) -> Option<Pose> {
    breakpoint_clusters(scan, config.break_distance_m)
        .into_iter()
        .filter(|c| c.mean_distance() <= config.max_range_m)
        .filter(|c| {
            let width = c.width();
            width >= config.min_width_m && width <= config.max_width_m
        })
        .min_by(|a, b| a.mean_distance().total_cmp(&b.mean_distance()))
        .map(|c| {
            let range = c.mean_distance();
            let bearing = c.mean_angle();
            let world_angle = robot_pose.theta + bearing;
            let x = robot_pose.x + range * world_angle.cos();
            let y = robot_pose.y + range * world_angle.sin();
            Pose::new(x, y, 0.0)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(distance: f64, angle: f64) -> ScanPoint {
        ScanPoint::new(distance, angle, 1.0)
    }

    #[test]
    fn no_points_yields_no_detection() {
        let scan = Scan::new(vec![]);
        assert!(detect_person(&scan, Pose::new(0.0, 0.0, 0.0), &PersonDetectorConfig::default()).is_none());
    }

    #[test]
    fn wide_wall_like_cluster_is_rejected() {
        // A long unbroken run of points at a constant range, spanning a
        // wide angular sweep, looks like a wall, not a person.
        let mut points = Vec::new();
        for i in 0..60 {
            points.push(point(2.0, i as f64 * 0.05));
        }
        let scan = Scan::new(points);
        assert!(detect_person(&scan, Pose::new(0.0, 0.0, 0.0), &PersonDetectorConfig::default()).is_none());
    }

    #[test]
    fn narrow_cluster_detected_in_robot_frame() {
        // A short run of points close together, bracketed by far-away
        // background on both sides: a person-width blob directly ahead.
        let mut points = vec![point(5.0, 0.0), point(5.0, 0.05)];
        for i in 0..6 {
            points.push(point(1.5, 0.10 + i as f64 * 0.03));
        }
        points.push(point(5.0, 0.30));
        points.push(point(5.0, 0.35));
        let scan = Scan::new(points);
        let detected = detect_person(&scan, Pose::new(0.0, 0.0, 0.0), &PersonDetectorConfig::default())
            .expect("narrow cluster should be detected");
        // The cluster sits roughly 1.5 m ahead at a small positive bearing.
        assert!(detected.x > 1.0 && detected.x < 2.0);
        assert!(detected.y.abs() < 0.5);
    }

    #[test]
    fn nearest_of_two_candidate_clusters_is_chosen() {
        let mut points = vec![point(4.0, 0.0)];
        for i in 0..4 {
            points.push(point(1.0, 0.05 + i as f64 * 0.03)); // near cluster
        }
        points.push(point(4.0, 0.20));
        for i in 0..4 {
            points.push(point(3.0, 1.0 + i as f64 * 0.03)); // far cluster
        }
        points.push(point(4.0, 1.20));
        let scan = Scan::new(points);
        let detected = detect_person(&scan, Pose::new(0.0, 0.0, 0.0), &PersonDetectorConfig::default())
            .expect("nearest cluster should be detected");
        assert!(detected.x < 1.5, "expected the near cluster to win, got {detected:?}");
    }

    #[test]
    fn cluster_position_is_offset_by_robot_pose() {
        let mut points = Vec::new();
        for i in 0..6 {
            points.push(point(2.0, i as f64 * 0.03));
        }
        let scan = Scan::new(points);
        let robot_pose = Pose::new(10.0, 10.0, std::f64::consts::FRAC_PI_2);
        let detected = detect_person(&scan, robot_pose, &PersonDetectorConfig::default())
            .expect("cluster should be detected");
        // Robot faces +y; a point dead ahead in its own frame lands further
        // along +y in the world frame, not at the raw robot-frame offset.
        assert!(detected.y > robot_pose.y);
    }
}
