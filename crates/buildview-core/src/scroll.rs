use super::state::BuildStatus;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScrollTarget {
    ToTop,
    ToBottom,
    Down(u32),
    Up(u32),
    /// Horizontal scroll of the history strip.
    HistoryBy(f64),
}

/// Whether new log output should pull the view to the bottom.
///
/// Succeeded logs are static and pending builds have nothing to follow yet.
pub fn follows_output(autoscroll: bool, status: BuildStatus) -> bool {
    autoscroll && !matches!(status, BuildStatus::Succeeded | BuildStatus::Pending)
}

/// Autoscroll state after the user scrolled to `distance_from_bottom`.
pub fn autoscroll_after_scroll(distance_from_bottom: f64) -> bool {
    distance_from_bottom <= 0.0
}

/// Vertical wheels scroll the history strip sideways; a horizontal delta wins
/// when present.
pub fn history_wheel_delta(delta_x: f64, delta_y: f64) -> f64 {
    if delta_x == 0.0 {
        delta_y
    } else {
        -delta_x
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn follows_running_and_failed_output_only() {
        let followed: Vec<BuildStatus> = [
            BuildStatus::Pending,
            BuildStatus::Started,
            BuildStatus::Succeeded,
            BuildStatus::Failed,
            BuildStatus::Errored,
            BuildStatus::Aborted,
        ]
        .into_iter()
        .filter(|status| follows_output(true, *status))
        .collect();
        assert_eq!(
            followed,
            vec![
                BuildStatus::Started,
                BuildStatus::Failed,
                BuildStatus::Errored,
                BuildStatus::Aborted
            ]
        );
        assert!(!follows_output(false, BuildStatus::Started));
    }

    #[test]
    fn only_zero_distance_re_enables_autoscroll() {
        assert!(autoscroll_after_scroll(0.0));
        assert!(!autoscroll_after_scroll(0.5));
        assert!(!autoscroll_after_scroll(240.0));
    }

    #[test]
    fn wheel_prefers_horizontal_delta() {
        assert_eq!(history_wheel_delta(0.0, 30.0), 30.0);
        assert_eq!(history_wheel_delta(12.0, 30.0), -12.0);
    }
}
