//! Metric calculators.
//!
//! A calculator fills one slice of a metric record from a decoded well or
//! plate. Calculators are stateless; the orchestration in [`process`]
//! decides which of them run for which plate type, and in which order.

pub mod channel;
pub mod colorcal;
pub mod plate;
pub mod process;
pub mod tables;
pub mod well;

use tracing::debug;

use crate::error::MetricsError;
use crate::model::{PlateMetric, WellChannelMetric, WellMetric};
use crate::plate::{DecodedChannel, DecodedPlate, DecodedWell};
use crate::types::{PlateTypeCode, WellName};

pub use process::{compute_plate_metrics, fill_plate_type_metrics, process_plate};

/// Computes metrics from one channel of one well.
pub trait WellChannelMetricCalculator: Sync {
    fn compute(&self, well: &DecodedWell, channel: &DecodedChannel, metric: &mut WellChannelMetric);
}

/// Computes metrics from a whole well.
pub trait WellMetricCalculator: Sync {
    fn compute(&self, well: &DecodedWell, metric: &mut WellMetric);
}

/// Computes metrics that need several wells of a plate at once.
///
/// Plate calculators may write into well records; a well present on the
/// decoded plate but absent from the metric tree is an error.
pub trait PlateMetricCalculator: Sync {
    fn compute(&self, plate: &DecodedPlate, metric: &mut PlateMetric) -> Result<(), MetricsError>;
}

fn well_metric_for<'a>(
    plate_metric: &'a mut PlateMetric,
    name: &WellName,
) -> Result<&'a mut WellMetric, MetricsError> {
    plate_metric.require_well_mut(name)
}

/// Run a well calculator over every analyzed well, in row-major order.
pub fn foreach_well(
    plate: &DecodedPlate,
    plate_metric: &mut PlateMetric,
    calculator: &dyn WellMetricCalculator,
) -> Result<(), MetricsError> {
    for (name, well) in &plate.wells {
        calculator.compute(well, well_metric_for(plate_metric, name)?);
    }
    Ok(())
}

/// Run a channel calculator over both channels of every analyzed well.
pub fn foreach_well_channel(
    plate: &DecodedPlate,
    plate_metric: &mut PlateMetric,
    calculator: &dyn WellChannelMetricCalculator,
) -> Result<(), MetricsError> {
    for (name, well) in &plate.wells {
        let well_metric = well_metric_for(plate_metric, name)?;
        for channel in &well.channels {
            calculator.compute(well, channel, well_metric.channel_mut(channel.channel_num)?);
        }
    }
    Ok(())
}

/// Run a well calculator chosen per well from the well's logical layout.
/// Wells whose layout selects no calculator are left alone.
pub fn foreach_mixed_well<F>(
    plate: &DecodedPlate,
    plate_metric: &mut PlateMetric,
    select: F,
) -> Result<(), MetricsError>
where
    F: Fn(PlateTypeCode) -> Option<&'static dyn WellMetricCalculator>,
{
    for (name, well) in &plate.wells {
        let Some(code) = PlateTypeCode::of_auto_validation_well(well.experiment_name.as_deref()) else {
            debug!(well = %name, "No layout for mixed-plate well");
            continue;
        };
        if let Some(calculator) = select(code) {
            calculator.compute(well, well_metric_for(plate_metric, name)?);
        }
    }
    Ok(())
}

pub fn foreach_mixed_well_channel<F>(
    plate: &DecodedPlate,
    plate_metric: &mut PlateMetric,
    select: F,
) -> Result<(), MetricsError>
where
    F: Fn(PlateTypeCode) -> Option<&'static dyn WellChannelMetricCalculator>,
{
    for (name, well) in &plate.wells {
        let Some(code) = PlateTypeCode::of_auto_validation_well(well.experiment_name.as_deref()) else {
            continue;
        };
        if let Some(calculator) = select(code) {
            let well_metric = well_metric_for(plate_metric, name)?;
            for channel in &well.channels {
                calculator.compute(well, channel, well_metric.channel_mut(channel.channel_num)?);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plate::fixtures::{duplex_well, plate};

    struct CountPeaks;

    impl WellMetricCalculator for CountPeaks {
        fn compute(&self, well: &DecodedWell, metric: &mut WellMetric) {
            metric.accepted_event_count = well.peaks.len();
        }
    }

    static COUNT_PEAKS: CountPeaks = CountPeaks;

    #[test]
    fn test_foreach_well_requires_metric_records() {
        let decoded = plate(vec![("A01", duplex_well(None, 1, 1, 1, 1))]);
        let mut pm = PlateMetric::new("p", None);
        let err = foreach_well(&decoded, &mut pm, &COUNT_PEAKS).unwrap_err();
        assert!(matches!(err, MetricsError::MissingWellMetric { .. }));

        pm.insert_well(WellMetric::new("A01".parse().unwrap()));
        foreach_well(&decoded, &mut pm, &COUNT_PEAKS).unwrap();
        assert_eq!(pm.well_metrics[0].accepted_event_count, 4);
    }

    #[test]
    fn test_mixed_dispatch_uses_experiment_name() {
        let mut red = duplex_well(None, 1, 0, 0, 1);
        red.experiment_name = Some("Validation-RED".to_string());
        let mut unknown = duplex_well(None, 1, 0, 0, 1);
        unknown.experiment_name = Some("Something else".to_string());
        let decoded = plate(vec![("A01", red), ("A02", unknown)]);

        let mut pm = PlateMetric::new("p", None);
        for name in ["A01", "A02"] {
            pm.insert_well(WellMetric::new(name.parse().unwrap()));
        }
        foreach_mixed_well(&decoded, &mut pm, |code| match code {
            PlateTypeCode::Bred => Some(&COUNT_PEAKS as &dyn WellMetricCalculator),
            _ => None,
        })
        .unwrap();
        assert_eq!(pm.well_metrics[0].accepted_event_count, 2);
        assert_eq!(pm.well_metrics[1].accepted_event_count, 0);
    }
}
