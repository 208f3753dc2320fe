//! Hourly Line Charts
//!
//! Each production line has one chart over the operating day (06:00 to
//! 23:00, one bucket per hour) with three series: the sticky target, the
//! cumulative good quantity and the derived parts-per-hour rate. Updates only
//! touch the bucket of the current wall-clock hour.

use crate::model::{metrics, LineId, LineReport};

pub const FIRST_HOUR: u32 = 6;
pub const LAST_HOUR: u32 = 23;
pub const BUCKET_COUNT: usize = (LAST_HOUR - FIRST_HOUR + 1) as usize;

/// Bucket position of `hour`, if it falls inside the operating day.
pub fn bucket_index(hour: u32) -> Option<usize> {
    (FIRST_HOUR..=LAST_HOUR)
        .contains(&hour)
        .then(|| (hour - FIRST_HOUR) as usize)
}

/// Hour of day covered by bucket `index`.
pub fn bucket_hour(index: usize) -> u32 {
    FIRST_HOUR + index as u32
}

pub fn bucket_label(index: usize) -> String {
    format!("{:02}:00", bucket_hour(index))
}

/// Colour of the parts-per-hour markers, shared by every point of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarkerColor {
    /// Throughput above target.
    Green,
    /// Throughput below target.
    Red,
    /// Exactly on target.
    #[default]
    Blue,
}

impl MarkerColor {
    pub fn for_rate(parts_per_hour: u32, target: u64) -> Self {
        match u64::from(parts_per_hour).cmp(&target) {
            std::cmp::Ordering::Greater => MarkerColor::Green,
            std::cmp::Ordering::Less => MarkerColor::Red,
            std::cmp::Ordering::Equal => MarkerColor::Blue,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineChart {
    target: [u64; BUCKET_COUNT],
    quantity: [u64; BUCKET_COUNT],
    rate: [Option<u32>; BUCKET_COUNT],
    marker: MarkerColor,
    revision: u64,
}

impl Default for LineChart {
    fn default() -> Self {
        Self::new()
    }
}

impl LineChart {
    pub fn new() -> Self {
        Self::with_rate_plan([Some(0); BUCKET_COUNT])
    }

    /// Chart whose future rate buckets start from planned values.
    pub fn with_rate_plan(plan: [Option<u32>; BUCKET_COUNT]) -> Self {
        Self {
            target: [0; BUCKET_COUNT],
            quantity: [0; BUCKET_COUNT],
            rate: plan,
            marker: MarkerColor::default(),
            revision: 0,
        }
    }

    pub fn target_series(&self) -> &[u64; BUCKET_COUNT] {
        &self.target
    }

    pub fn quantity_series(&self) -> &[u64; BUCKET_COUNT] {
        &self.quantity
    }

    pub fn rate_series(&self) -> &[Option<u32>; BUCKET_COUNT] {
        &self.rate
    }

    pub fn marker(&self) -> MarkerColor {
        self.marker
    }

    /// Number of qualifying updates applied so far.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Re-plot the chart for the bucket of `hour`.
    pub fn apply(&mut self, hour: u32, target: u64, quantity: u64, parts_per_hour: u32) {
        let current = bucket_index(hour);
        for index in 0..BUCKET_COUNT {
            let is_current = current == Some(index);
            self.target[index] = if is_current { target } else { 0 };
            self.quantity[index] = if is_current { quantity } else { 0 };
            if is_current {
                self.rate[index] = Some(parts_per_hour);
            } else if bucket_hour(index) < hour {
                self.rate[index] = None;
            }
        }
        self.marker = MarkerColor::for_rate(parts_per_hour, target);
        self.revision += 1;
    }
}

/// The two line charts.
#[derive(Debug, Default)]
pub struct ChartPresenter {
    charts: [LineChart; 2],
}

impl ChartPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chart(&self, line: LineId) -> &LineChart {
        &self.charts[line.index()]
    }

    /// Apply a qualifying update for `line`; returns the parts-per-hour used.
    pub fn update(&mut self, line: LineId, hour: u32, target: u64, report: &LineReport) -> u32 {
        let quantity = report.quantity();
        let rate = metrics::parts_per_hour(
            i64::try_from(quantity).unwrap_or(i64::MAX),
            report.cycle_time_secs.unwrap_or(0.0),
        );
        self.charts[line.index()].apply(hour, target, quantity, rate);
        rate
    }
}
