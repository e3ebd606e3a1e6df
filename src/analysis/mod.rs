//! Aggregation of stored metric trees across plates.
//!
//! An [`AnalysisGroupMetrics`] holds the plate metric trees of one scope
//! (an analysis group, a reader, or a single plate) under one reprocess
//! config, and answers the named views and statistics the reports use.
//! Every statistic ignores absent values and returns zeros, `None` or an
//! empty list for an empty population; nothing here yields NaN.

pub mod certification;
pub mod limits;

use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::LimitTable;
use crate::error::StoreError;
use crate::model::{AnalysisGroup, ChannelField, PlateMetric, PlateRecord, WellChannelMetric, WellField, WellMetric};
use crate::stats::{self, Summary};
use crate::store::{plates_by_reader, plates_in_group, MetricStore};
use crate::types::{Channel, Dyeset, PlateTypeCode, WellName, FAM, VIC};

pub use certification::{CertificationReport, DrCertificationMetrics, Observed, TestResult};
pub use limits::{limits_key, LimitOverrides, LimitParams, Tolerance};

/// System version assumed when no plate in scope records one.
pub const DEFAULT_SYSTEM_VERSION: &str = "QX100";

/// Software gain folded into FAM/HEX calibrations that predate stored
/// color compensation gains.
pub const HEX_SCALE_FACTOR: f64 = 10000.0 / 8600.0;

/// Sample names of wells that are expected to have few events.
const EXPECTED_LOW_EVENT_SAMPLES: &[&str] = &["stealth", "Stealth", ""];

const STEALTH_SAMPLES: &[&str] = &["stealth", "Stealth"];

const FAM_HI_SAMPLES: &[&str] = &["FAM 350nM", "FAM HI"];
const VIC_HI_SAMPLES: &[&str] = &["VIC 350nM", "VIC HI"];

/// Wells are eventful for width statistics above this many triggered events.
const WIDTH_EVENTFUL_COUNT: usize = 100;

/// Decision-tree flags that do not indicate a quality problem.
const BENIGN_DECISION_TREE_FLAGS: u32 = 256 | (1 << 28);

pub type Predicate<T> = Box<dyn Fn(&T) -> bool>;

/// Injectable selection predicates. Unset predicates accept everything;
/// set ones combine with AND.
#[derive(Default)]
pub struct Filters {
    pub plate: Option<Predicate<PlateRecord>>,
    pub plate_type: Option<Predicate<Option<PlateTypeCode>>>,
    pub well: Option<Predicate<WellName>>,
    pub well_metric: Option<Predicate<WellMetric>>,
}

impl Filters {
    fn accepts_plate(&self, plate: &PlateRecord) -> bool {
        self.plate.as_ref().map_or(true, |f| f(plate))
            && self.plate_type.as_ref().map_or(true, |f| f(&plate.plate_type))
    }

    fn accepts_well(&self, well: &WellMetric) -> bool {
        self.well.as_ref().map_or(true, |f| f(&well.well_name))
            && self.well_metric.as_ref().map_or(true, |f| f(well))
    }
}

/// Filters and limit overrides for one query.
#[derive(Default)]
pub struct QueryOptions {
    pub filters: Filters,
    pub overrides: LimitOverrides,
}

/// What the metrics were gathered over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Group(Uuid),
    Reader(String),
    Plate(String),
}

/// Variations on the base views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    Group,
    /// Reader certification: singleplex and air droplet views read the
    /// eventful carryover wells.
    Certification,
    /// One plate: event-count wells only exclude stealth wells.
    SinglePlate,
}

/// A plate and its metric tree.
#[derive(Debug, Clone, PartialEq)]
pub struct PlateEntry {
    pub plate: PlateRecord,
    pub metric: PlateMetric,
}

/// A well metric with the plate it belongs to.
#[derive(Debug, Clone, Copy)]
pub struct WellRef<'a> {
    pub plate: &'a PlateRecord,
    pub plate_metric: &'a PlateMetric,
    pub metric: &'a WellMetric,
}

impl<'a> WellRef<'a> {
    pub fn channel(&self, channel: Channel) -> Option<&'a WellChannelMetric> {
        self.metric.channels.get(channel)
    }

    fn fam(&self) -> &'a WellChannelMetric {
        &self.metric.channels[FAM]
    }

    fn vic(&self) -> &'a WellChannelMetric {
        &self.metric.channels[VIC]
    }

    pub fn sample_name(&self) -> Option<&'a str> {
        self.metric.sample_name.as_deref()
    }

    fn sample_in(&self, names: &[&str]) -> bool {
        self.sample_name().is_some_and(|s| names.contains(&s))
    }

    /// False for stealth and unnamed wells.
    pub fn expects_events(&self) -> bool {
        self.sample_name()
            .is_some_and(|s| !EXPECTED_LOW_EVENT_SAMPLES.contains(&s))
    }

    fn is_stealth(&self) -> bool {
        self.sample_name().is_some_and(|s| s.eq_ignore_ascii_case("stealth"))
    }

    /// Whether the plate type, or on auto-validation plates the well's own
    /// logical layout, is one of `codes`.
    pub fn matches_type(&self, codes: &[PlateTypeCode]) -> bool {
        match self.plate.plate_type {
            Some(code) if codes.contains(&code) => true,
            Some(code) if code.is_mixed() => {
                PlateTypeCode::of_auto_validation_well(self.metric.experiment_name.as_deref())
                    .is_some_and(|well_code| codes.contains(&well_code))
            }
            _ => false,
        }
    }
}

/// Mean amplitude and mean amplitude spread of a set of wells.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmplitudeStats {
    pub mean: f64,
    pub stdev: f64,
}

/// Cluster amplitudes of a single-well calibration, gain-corrected.
/// Blue is the FAM channel, green the VIC/HEX channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SingleWellAmplitudes {
    pub blue_hi_mean: f64,
    pub blue_hi_stdev: f64,
    pub blue_lo_mean: f64,
    pub blue_lo_stdev: f64,
    pub green_hi_mean: f64,
    pub green_hi_stdev: f64,
    pub green_lo_mean: f64,
    pub green_lo_stdev: f64,
}

/// Plate-level carryover sums over the carryover plates in scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CarryoverTotals {
    pub plates: usize,
    pub carryover_peaks: usize,
    pub gated_contamination_peaks: usize,
    pub contamination_peaks: usize,
    pub stealth_wells: usize,
}

/// Gap rain statistics for one channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GapRainStats {
    pub summary: Summary,
    pub wells_with_rain: usize,
    pub wells: usize,
}

/// Per-target means for a singleplex layout.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetStats {
    pub target: String,
    pub concentration: Option<f64>,
    pub s2d_value: Option<f64>,
    pub single_rain_pct: Option<f64>,
    /// Double rain of the opposite channel.
    pub double_rain_pct: Option<f64>,
}

/// Means of the 2D droplet cluster metrics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DropletMetricStats {
    pub balance_score: Option<f64>,
    pub s2d_value: Option<f64>,
    pub high_flier_pct: Option<f64>,
    pub low_flier_pct: Option<f64>,
    pub single_rain_pct: Option<f64>,
    pub double_rain_pct: Option<f64>,
}

/// Summary of a well-level field over the given wells.
pub fn attr_summary(wells: &[WellRef<'_>], field: WellField) -> Summary {
    Summary::of_present(wells.iter().map(|w| field.value(w.metric)))
}

/// Summary of a channel-level field over the given wells.
pub fn channel_attr_summary(wells: &[WellRef<'_>], channel: Channel, field: ChannelField) -> Summary {
    Summary::of_present(wells.iter().map(|w| w.channel(channel).and_then(|c| field.value(c))))
}

fn channel_summary<F>(wells: &[WellRef<'_>], channel: Channel, value: F) -> Summary
where
    F: Fn(&WellChannelMetric) -> Option<f64>,
{
    Summary::of_present(wells.iter().map(|w| w.channel(channel).and_then(&value)))
}

fn well_summary<F>(wells: &[WellRef<'_>], value: F) -> Summary
where
    F: Fn(&WellMetric) -> Option<f64>,
{
    Summary::of_present(wells.iter().map(|w| value(w.metric)))
}

fn count(value: Option<usize>) -> Option<f64> {
    value.map(|v| v as f64)
}

/// Wells with more than `event_count` accepted events.
pub fn eventful<'a>(wells: &[WellRef<'a>], event_count: usize) -> Vec<WellRef<'a>> {
    wells
        .iter()
        .filter(|w| w.metric.accepted_event_count > event_count)
        .copied()
        .collect()
}

/// Wells with more than `event_count` total events.
pub fn total_eventful<'a>(wells: &[WellRef<'a>], event_count: usize) -> Vec<WellRef<'a>> {
    wells
        .iter()
        .filter(|w| w.metric.total_event_count > event_count)
        .copied()
        .collect()
}

/// Wells with more than `event_count` triggered events.
pub fn triggered_eventful<'a>(wells: &[WellRef<'a>], event_count: usize) -> Vec<WellRef<'a>> {
    wells
        .iter()
        .filter(|w| w.metric.triggered_event_count() > event_count)
        .copied()
        .collect()
}

/// Wells with a non-zero threshold in `channel`.
pub fn thresholded<'a>(wells: &[WellRef<'a>], channel: Channel) -> Vec<WellRef<'a>> {
    wells
        .iter()
        .filter(|w| w.channel(channel).and_then(|c| c.called_threshold()).is_some())
        .copied()
        .collect()
}

/// Wells without a threshold in `channel`.
pub fn nonthresholded<'a>(wells: &[WellRef<'a>], channel: Channel) -> Vec<WellRef<'a>> {
    wells
        .iter()
        .filter(|w| w.channel(channel).and_then(|c| c.called_threshold()).is_none())
        .copied()
        .collect()
}

/// Wells whose `channel` assay target is `target`.
pub fn well_metrics_by_target<'a>(wells: &[WellRef<'a>], target: &str, channel: Channel) -> Vec<WellRef<'a>> {
    wells
        .iter()
        .filter(|w| w.channel(channel).and_then(|c| c.target.as_deref()) == Some(target))
        .copied()
        .collect()
}

/// Distinct `channel` targets, in first-seen order.
pub fn targets(wells: &[WellRef<'_>], channel: Channel) -> Vec<Option<String>> {
    let mut seen: Vec<Option<String>> = Vec::new();
    for w in wells {
        let target = w.channel(channel).and_then(|c| c.target.clone());
        if !seen.contains(&target) {
            seen.push(target);
        }
    }
    seen
}

/// Concentration summary of the wells with a called threshold, or `None`
/// if there are none.
fn conc_summary(wells: &[WellRef<'_>], channel: Channel) -> Option<Summary> {
    let values: Vec<f64> = wells
        .iter()
        .filter_map(|w| w.channel(channel))
        .filter(|c| c.threshold.is_some_and(|t| t > 0.0))
        .filter_map(|c| c.concentration)
        .collect();
    if values.is_empty() {
        None
    } else {
        Some(Summary::of(&values))
    }
}

/// Summary of a percentage computed per well; the ratio is scaled by 100.
fn pct_summary(ratios: Vec<f64>) -> Summary {
    Summary::of(&ratios).scaled(100.0)
}

/// 95th percentile of a per-well rate, `None` with no wells.
fn rate_p95<F>(wells: &[WellRef<'_>], rate: F) -> Option<f64>
where
    F: Fn(&WellRef<'_>) -> Option<f64>,
{
    let rates: Vec<f64> = wells.iter().filter_map(rate).collect();
    stats::percentile(&rates, 0.95)
}

fn load_entries(
    store: &dyn MetricStore,
    plates: Vec<PlateRecord>,
    reprocess_config_id: Option<u32>,
) -> Result<Vec<PlateEntry>, StoreError> {
    let ids: Vec<String> = plates.iter().map(|p| p.id.clone()).collect();
    let mut metrics: HashMap<String, PlateMetric> = store
        .plate_metrics(&ids, reprocess_config_id)?
        .into_iter()
        .map(|m| (m.plate_id.clone(), m))
        .collect();
    Ok(plates
        .into_iter()
        .filter_map(|plate| metrics.remove(&plate.id).map(|metric| PlateEntry { plate, metric }))
        .collect())
}

/// Stored metrics of one scope, with the views and statistics over them.
pub struct AnalysisGroupMetrics {
    pub scope: Scope,
    pub reprocess_config_id: Option<u32>,
    pub system_version: String,
    pub program_version: Option<String>,
    pub params: LimitParams,
    kind: ViewKind,
    entries: Vec<PlateEntry>,
    filters: Filters,
}

impl AnalysisGroupMetrics {
    /// Build from already loaded entries, oldest run first.
    ///
    /// The limits key comes from the newest plate's system version and the
    /// oldest plate's analysis software version.
    pub fn from_entries(
        scope: Scope,
        kind: ViewKind,
        entries: Vec<PlateEntry>,
        reprocess_config_id: Option<u32>,
        tables: &BTreeMap<String, LimitTable>,
        options: QueryOptions,
    ) -> Self {
        let system_version = entries
            .last()
            .and_then(|e| e.plate.system_version.clone())
            .unwrap_or_else(|| DEFAULT_SYSTEM_VERSION.to_string());
        let program_version = entries.first().and_then(|e| e.plate.program_version.clone());
        let key = limits_key(&system_version, program_version.as_deref());
        let params = LimitParams::resolve(&key, tables.get(&key), &options.overrides);

        let filters = options.filters;
        let entries: Vec<PlateEntry> = entries.into_iter().filter(|e| filters.accepts_plate(&e.plate)).collect();

        debug!(
            scope = ?scope,
            reprocess_config = ?reprocess_config_id,
            limits = %params.key,
            plates = entries.len(),
            "Loaded group metrics"
        );

        Self {
            scope,
            reprocess_config_id,
            system_version,
            program_version,
            params,
            kind,
            entries,
            filters,
        }
    }

    /// Metrics of an analysis group. A reprocess config the group is not
    /// associated with falls back to the original processing.
    pub fn for_group(
        store: &dyn MetricStore,
        group: &AnalysisGroup,
        reprocess_config_id: Option<u32>,
        tables: &BTreeMap<String, LimitTable>,
        options: QueryOptions,
    ) -> Result<Self, StoreError> {
        let resolved = group.resolve_reprocess(reprocess_config_id);
        if resolved != reprocess_config_id {
            warn!(
                group = %group.id,
                reprocess_config = ?reprocess_config_id,
                "Group is not associated with reprocess config; using original metrics"
            );
        }
        let mut plates = plates_in_group(store, group)?;
        plates.sort_by(|a, b| a.run_time.cmp(&b.run_time));
        let entries = load_entries(store, plates, resolved)?;
        Ok(Self::from_entries(
            Scope::Group(group.id),
            ViewKind::Group,
            entries,
            resolved,
            tables,
            options,
        ))
    }

    /// Metrics of every plate run on one reader.
    pub fn for_reader(
        store: &dyn MetricStore,
        reader: &str,
        reprocess_config_id: Option<u32>,
        tables: &BTreeMap<String, LimitTable>,
        options: QueryOptions,
    ) -> Result<Self, StoreError> {
        let plates = plates_by_reader(store, reader)?;
        let entries = load_entries(store, plates, reprocess_config_id)?;
        Ok(Self::from_entries(
            Scope::Reader(reader.to_string()),
            ViewKind::Group,
            entries,
            reprocess_config_id,
            tables,
            options,
        ))
    }

    /// Metrics of one plate, regardless of how recent it is.
    pub fn for_plate(
        store: &dyn MetricStore,
        plate_id: &str,
        reprocess_config_id: Option<u32>,
        tables: &BTreeMap<String, LimitTable>,
        options: QueryOptions,
    ) -> Result<Self, StoreError> {
        let plate = store.plate(plate_id)?;
        let entries = load_entries(store, vec![plate], reprocess_config_id)?;
        Ok(Self::from_entries(
            Scope::Plate(plate_id.to_string()),
            ViewKind::SinglePlate,
            entries,
            reprocess_config_id,
            tables,
            options,
        ))
    }

    /// Replace the plates in scope, e.g. to keep only the newest of each type.
    pub(crate) fn select_entries<F>(&mut self, select: F)
    where
        F: FnOnce(Vec<PlateEntry>) -> Vec<PlateEntry>,
    {
        let entries = std::mem::take(&mut self.entries);
        self.entries = select(entries);
    }

    pub fn kind(&self) -> ViewKind {
        self.kind
    }

    pub fn plate_entries(&self) -> &[PlateEntry] {
        &self.entries
    }

    pub fn plate_metrics_by_type(&self, codes: &[PlateTypeCode]) -> Vec<&PlateEntry> {
        self.entries
            .iter()
            .filter(|e| e.plate.plate_type.is_some_and(|code| codes.contains(&code)))
            .collect()
    }

    fn latest_plate_of_type(&self, codes: &[PlateTypeCode]) -> Option<&PlateEntry> {
        self.plate_metrics_by_type(codes)
            .into_iter()
            .max_by(|a, b| a.plate.run_time.cmp(&b.plate.run_time))
    }

    fn entry_wells<'a>(&'a self, entry: &'a PlateEntry) -> impl Iterator<Item = WellRef<'a>> + '_ {
        entry
            .metric
            .well_metrics
            .iter()
            .filter(|w| self.filters.accepts_well(w))
            .map(move |metric| WellRef {
                plate: &entry.plate,
                plate_metric: &entry.metric,
                metric,
            })
    }

    /// Every well in scope that passes the well filters.
    pub fn all_well_metrics(&self) -> Vec<WellRef<'_>> {
        self.entries.iter().flat_map(|e| self.entry_wells(e)).collect()
    }

    /// Wells of plates of the given types, plus auto-validation wells whose
    /// own layout is one of them.
    pub fn well_metrics_by_type(&self, codes: &[PlateTypeCode]) -> Vec<WellRef<'_>> {
        self.all_well_metrics()
            .into_iter()
            .filter(|w| w.matches_type(codes))
            .collect()
    }

    pub fn well_metrics_excluding_type(&self, codes: &[PlateTypeCode]) -> Vec<WellRef<'_>> {
        self.all_well_metrics()
            .into_iter()
            .filter(|w| !w.matches_type(codes))
            .collect()
    }

    pub fn well_metrics_by_type_sample(&self, codes: &[PlateTypeCode], samples: &[&str]) -> Vec<WellRef<'_>> {
        self.well_metrics_by_type(codes)
            .into_iter()
            .filter(|w| w.sample_in(samples))
            .collect()
    }

    // Event counts

    pub fn event_count_wells(&self) -> Vec<WellRef<'_>> {
        let kind = self.kind;
        self.all_well_metrics()
            .into_iter()
            .filter(|w| w.expects_events() || (kind == ViewKind::SinglePlate && w.sample_name().is_none()))
            .collect()
    }

    pub fn probe_event_count_wells(&self) -> Vec<WellRef<'_>> {
        self.well_metrics_by_type(&[PlateTypeCode::Probeec])
    }

    pub fn eva_event_count_wells(&self) -> Vec<WellRef<'_>> {
        self.well_metrics_by_type(&[PlateTypeCode::Evaec])
    }

    pub fn event_count_summary(&self) -> Summary {
        attr_summary(&self.event_count_wells(), WellField::AcceptedEventCount)
    }

    pub fn low_event_wells_in<'a>(&self, wells: &[WellRef<'a>]) -> Vec<WellRef<'a>> {
        let low = self.params.low_event_count;
        wells
            .iter()
            .filter(|w| (w.metric.accepted_event_count as i64) < low)
            .copied()
            .collect()
    }

    pub fn low_event_wells(&self) -> Vec<WellRef<'_>> {
        self.low_event_wells_in(&self.event_count_wells())
    }

    pub fn high_event_wells(&self, max_count: usize) -> Vec<WellRef<'_>> {
        self.event_count_wells()
            .into_iter()
            .filter(|w| w.metric.accepted_event_count > max_count)
            .collect()
    }

    // Quality

    /// Wells expected to get an automatic threshold in at least one channel.
    pub fn quality_eligible_wells(&self) -> Vec<WellRef<'_>> {
        self.all_well_metrics()
            .into_iter()
            .filter(|w| w.metric.channels.iter().any(|c| c.auto_threshold_expected == Some(true)))
            .collect()
    }

    /// Like [`Self::quality_eligible_wells`], with RED plates exempt.
    pub fn quality_eligible_wells_qx200(&self) -> Vec<WellRef<'_>> {
        self.quality_eligible_wells()
            .into_iter()
            .filter(|w| !w.plate.is_type(PlateTypeCode::Bred))
            .collect()
    }

    pub fn low_quality_wells_in<'a>(&self, wells: &[WellRef<'a>]) -> Vec<WellRef<'a>> {
        let min_quality = self.params.low_data_quality;
        wells
            .iter()
            .filter(|w| {
                w.metric.channels.iter().any(|c| {
                    c.auto_threshold_expected == Some(true)
                        && c.threshold_conf.map_or(true, |conf| conf < min_quality)
                })
            })
            .copied()
            .collect()
    }

    pub fn low_quality_wells(&self) -> Vec<WellRef<'_>> {
        self.low_quality_wells_in(&self.quality_eligible_wells())
    }

    pub fn low_quality_wells_qx200(&self) -> Vec<WellRef<'_>> {
        self.low_quality_wells_in(&self.quality_eligible_wells_qx200())
    }

    /// Eligible wells whose threshold decision tree raised a flag other
    /// than the benign ones.
    pub fn check_quality_wells(&self) -> Vec<WellRef<'_>> {
        self.quality_eligible_wells()
            .into_iter()
            .filter(|w| {
                w.metric.channels.iter().any(|c| {
                    c.auto_threshold_expected == Some(true)
                        && c.decision_tree_flags & !BENIGN_DECISION_TREE_FLAGS != 0
                })
            })
            .collect()
    }

    // False positives and negatives

    pub fn fpfn_false_positive_wells(&self) -> Vec<WellRef<'_>> {
        self.well_metrics_by_type(&[PlateTypeCode::Bfpfn])
            .into_iter()
            .filter(|w| w.metric.channels.iter().any(|c| c.false_positive_peaks.is_some()))
            .collect()
    }

    pub fn fpfn_false_negative_wells(&self) -> Vec<WellRef<'_>> {
        self.well_metrics_by_type(&[PlateTypeCode::Bfpfn])
            .into_iter()
            .filter(|w| w.metric.channels.iter().any(|c| c.false_negative_peaks.is_some()))
            .collect()
    }

    /// Upper 95th percentile of VIC false positives per 10000 droplets.
    pub fn fpfn_false_positive_ci95(&self) -> Option<f64> {
        rate_p95(&self.fpfn_false_positive_wells(), |w| {
            per_droplets(w.vic().false_positive_peaks, w.metric.accepted_event_count, 10000.0)
        })
    }

    /// Upper 95th percentile of VIC false negatives per 10000 droplets.
    pub fn fpfn_false_negative_ci95(&self) -> Option<f64> {
        rate_p95(&self.fpfn_false_negative_wells(), |w| {
            per_droplets(w.vic().false_negative_peaks, w.metric.accepted_event_count, 10000.0)
        })
    }

    // Layout selections

    pub fn singleplex_wells(&self) -> Vec<WellRef<'_>> {
        match self.kind {
            ViewKind::Certification => self
                .well_metrics_by_type(&[PlateTypeCode::Bcarry, PlateTypeCode::Mfgco])
                .into_iter()
                .filter(|w| !w.sample_in(STEALTH_SAMPLES))
                .collect(),
            _ => self.well_metrics_by_type(&[PlateTypeCode::Bsplex]),
        }
    }

    pub fn duplex_wells(&self) -> Vec<WellRef<'_>> {
        self.well_metrics_by_type(&[PlateTypeCode::Bdplex])
    }

    pub fn dplex200_wells(&self) -> Vec<WellRef<'_>> {
        self.well_metrics_by_type(&[PlateTypeCode::Dplex200])
    }

    pub fn colorcomp_wells(&self) -> Vec<WellRef<'_>> {
        self.well_metrics_by_type(&[PlateTypeCode::Bcc, PlateTypeCode::Mfgcc, PlateTypeCode::Scc])
    }

    pub fn qx200_dnr_wells(&self) -> Vec<WellRef<'_>> {
        self.well_metrics_by_type(&[PlateTypeCode::Dnr200])
    }

    pub fn eg200_wells(&self) -> Vec<WellRef<'_>> {
        self.well_metrics_by_type(&[PlateTypeCode::Eg200])
    }

    pub fn tq200_wells(&self) -> Vec<WellRef<'_>> {
        self.well_metrics_by_type(&[PlateTypeCode::Tq200])
    }

    // Concentration

    /// FAM concentration over wells with a called FAM threshold.
    pub fn conc_ci95(&self, wells: &[WellRef<'_>]) -> Option<Summary> {
        conc_summary(wells, FAM)
    }

    /// Singleplex FAM concentration. On QX200 readers only wells that met
    /// the data quality bar count.
    pub fn all_singleplex_conc_ci95(&self) -> Option<Summary> {
        let wells = self.singleplex_wells();
        if self.system_version == "QX200" {
            let min_quality = self.params.low_data_quality;
            let eligible: Vec<WellRef<'_>> = wells
                .into_iter()
                .filter(|w| {
                    w.metric.channels.iter().any(|c| {
                        c.auto_threshold_expected == Some(true)
                            && c.threshold_conf.is_some_and(|conf| conf >= min_quality)
                    })
                })
                .collect();
            self.conc_ci95(&eligible)
        } else {
            self.conc_ci95(&wells)
        }
    }

    /// 4Q/1Q concentration rise ratio over wells where one was computed.
    pub fn conc_rise_ratio_ci95(&self, wells: &[WellRef<'_>], channel: Channel) -> Summary {
        channel_summary(wells, channel, |c| c.concentration_rise_ratio.filter(|r| *r != 0.0))
    }

    pub fn singleplex_conc_rise_ratio_ci95(&self) -> Summary {
        self.conc_rise_ratio_ci95(&self.singleplex_wells(), FAM)
    }

    pub fn positive_mean_summary(&self, wells: &[WellRef<'_>], channel: Channel) -> Summary {
        channel_attr_summary(wells, channel, ChannelField::PositiveMean)
    }

    pub fn negative_mean_summary(&self, wells: &[WellRef<'_>], channel: Channel) -> Summary {
        channel_attr_summary(wells, channel, ChannelField::NegativeMean)
    }

    pub fn s_value_summary(&self, wells: &[WellRef<'_>], channel: Channel) -> Summary {
        channel_attr_summary(wells, channel, ChannelField::SValue)
    }

    /// Per-target means for one singleplex layout, NTC wells excluded.
    pub fn target_singleplex_stats(&self, code: PlateTypeCode, channel: Channel) -> Vec<TargetStats> {
        let wells: Vec<WellRef<'_>> = self
            .well_metrics_by_type(&[code])
            .into_iter()
            .filter(|w| !w.sample_name().unwrap_or("").contains("NTC"))
            .collect();
        let opposite = if channel == FAM { VIC } else { FAM };

        targets(&wells, channel)
            .into_iter()
            .flatten()
            .filter(|t| !t.is_empty())
            .map(|target| {
                let target_wells = well_metrics_by_target(&wells, &target, channel);
                let mean_of = |ch: Channel, value: fn(&WellChannelMetric) -> Option<f64>| {
                    let values: Vec<f64> = target_wells
                        .iter()
                        .filter_map(|w| w.channel(ch).and_then(value))
                        .collect();
                    stats::mean(&values)
                };
                TargetStats {
                    concentration: mean_of(channel, |c| c.concentration),
                    s2d_value: mean_of(channel, |c| c.s2d_value),
                    single_rain_pct: mean_of(channel, |c| c.single_rain_pct),
                    double_rain_pct: mean_of(opposite, |c| c.double_rain_pct),
                    target,
                }
            })
            .collect()
    }

    pub fn eg200_singleplex_stats(&self) -> Vec<TargetStats> {
        self.target_singleplex_stats(PlateTypeCode::Eg200, FAM)
    }

    pub fn tq200_singleplex_stats(&self, channel: Channel) -> Vec<TargetStats> {
        self.target_singleplex_stats(PlateTypeCode::Tq200, channel)
    }

    /// Means of the 2D cluster droplet metrics over non-NTC wells.
    pub fn new_droplet_metrics_stats(&self, channel: Channel) -> DropletMetricStats {
        let wells: Vec<WellRef<'_>> = self
            .all_well_metrics()
            .into_iter()
            .filter(|w| !w.sample_name().unwrap_or("").contains("NTC"))
            .collect();
        let channel_mean = |value: fn(&WellChannelMetric) -> Option<f64>| {
            let values: Vec<f64> = wells.iter().filter_map(|w| w.channel(channel).and_then(value)).collect();
            stats::mean(&values)
        };
        let balance: Vec<f64> = wells.iter().filter_map(|w| w.metric.balance_score).collect();
        DropletMetricStats {
            balance_score: stats::mean(&balance),
            s2d_value: channel_mean(|c| c.s2d_value),
            high_flier_pct: channel_mean(|c| c.high_flier_pct()),
            low_flier_pct: channel_mean(|c| c.low_flier_pct()),
            single_rain_pct: channel_mean(|c| c.single_rain_pct),
            double_rain_pct: channel_mean(|c| c.double_rain_pct),
        }
    }

    /// Wells whose expected FAM concentration is `expected`.
    pub fn fam_conc_well_metrics<'a>(&self, wells: &[WellRef<'a>], expected: f64) -> Vec<WellRef<'a>> {
        wells
            .iter()
            .filter(|w| w.fam().expected_concentration == Some(expected))
            .copied()
            .collect()
    }

    pub fn fam_conc_ci95(&self, wells: &[WellRef<'_>], expected: f64) -> Option<Summary> {
        conc_summary(&self.fam_conc_well_metrics(wells, expected), FAM)
    }

    fn all_duplex_wells(&self) -> Vec<WellRef<'_>> {
        self.well_metrics_by_type(&[PlateTypeCode::Bdplex, PlateTypeCode::Dplex200])
    }

    pub fn duplex_fam_conc_well_metrics(&self, expected: f64) -> Vec<WellRef<'_>> {
        self.fam_conc_well_metrics(&self.all_duplex_wells(), expected)
    }

    pub fn duplex_fam_conc_ci95(&self, expected: f64) -> Option<Summary> {
        self.fam_conc_ci95(&self.all_duplex_wells(), expected)
    }

    pub fn all_duplex_vic_conc_ci95(&self) -> Option<Summary> {
        conc_summary(&self.duplex_wells(), VIC)
    }

    /// VIC concentration of duplex wells at one expected FAM concentration.
    pub fn duplex_vic_conc_ci95(&self, expected: f64) -> Option<Summary> {
        conc_summary(&self.duplex_fam_conc_well_metrics(expected), VIC)
    }

    pub fn conc_rise_ci95(&self, wells: &[WellRef<'_>], expected: f64, channel: Channel) -> Summary {
        self.conc_rise_ratio_ci95(&self.fam_conc_well_metrics(wells, expected), channel)
    }

    pub fn duplex_conc_rise_ci95(&self, expected: f64, channel: Channel) -> Summary {
        self.conc_rise_ratio_ci95(&self.duplex_fam_conc_well_metrics(expected), channel)
    }

    pub fn all_duplex_vic_conc_rise_ci95(&self) -> Summary {
        let wells = thresholded(&self.duplex_wells(), VIC);
        self.conc_rise_ratio_ci95(&wells, VIC)
    }

    pub fn duplex_bscore_summary(&self, expected: f64) -> Summary {
        attr_summary(&self.duplex_fam_conc_well_metrics(expected), WellField::BalanceScore)
    }

    pub fn dnr_conc_well_metrics(&self, expected: f64) -> Vec<WellRef<'_>> {
        let wells = self.well_metrics_by_type(&[PlateTypeCode::Bdnr, PlateTypeCode::Gdnr, PlateTypeCode::Dnr200]);
        self.fam_conc_well_metrics(&wells, expected)
    }

    pub fn dnr_conc_ci95(&self, expected: f64) -> Option<Summary> {
        conc_summary(&self.dnr_conc_well_metrics(expected), FAM)
    }

    pub fn dnr_conc_rise_ci95(&self, expected: f64) -> Summary {
        self.conc_rise_ratio_ci95(&self.dnr_conc_well_metrics(expected), FAM)
    }

    pub fn red_lod_wells(&self, sample: &str) -> Vec<WellRef<'_>> {
        self.well_metrics_by_type_sample(&[PlateTypeCode::Bred], &[sample])
    }

    /// 95th percentile of FAM false positives per `per_droplet_count` droplets.
    pub fn red_lod_ci95(&self, sample: &str, per_droplet_count: f64) -> Option<f64> {
        rate_p95(&self.red_lod_wells(sample), |w| {
            per_droplets(w.fam().false_positive_peaks, w.metric.accepted_event_count, per_droplet_count)
        })
    }

    /// Like [`Self::red_lod_ci95`], counting positives against a manual threshold.
    pub fn manual_red_lod_ci95(&self, sample: &str, per_droplet_count: f64) -> Option<f64> {
        rate_p95(&self.red_lod_wells(sample), |w| {
            Some(per_droplets(w.fam().positive_peaks, w.metric.accepted_event_count, per_droplet_count).unwrap_or(0.0))
        })
    }

    // Widths and baselines

    fn width_eventful_wells(&self) -> Vec<WellRef<'_>> {
        triggered_eventful(&self.all_well_metrics(), WIDTH_EVENTFUL_COUNT)
    }

    pub fn mean_width_summary_in(&self, wells: &[WellRef<'_>]) -> Summary {
        attr_summary(wells, WellField::WidthMean)
    }

    pub fn mean_width_summary(&self) -> Summary {
        self.mean_width_summary_in(&self.width_eventful_wells())
    }

    pub fn width_variance_summary(&self) -> Summary {
        attr_summary(&self.width_eventful_wells(), WellField::WidthVariance)
    }

    pub fn mean_accepted_width_summary_in(&self, wells: &[WellRef<'_>]) -> Summary {
        attr_summary(wells, WellField::AcceptedWidthMean)
    }

    pub fn mean_accepted_width_summary(&self) -> Summary {
        self.mean_accepted_width_summary_in(&self.width_eventful_wells())
    }

    pub fn accepted_width_stdev_summary(&self) -> Summary {
        attr_summary(&self.width_eventful_wells(), WellField::AcceptedWidthStdev)
    }

    pub fn min_width_gate_summary(&self) -> Summary {
        channel_attr_summary(&self.width_eventful_wells(), FAM, ChannelField::MinWidthGate)
    }

    pub fn max_width_gate_summary(&self) -> Summary {
        channel_attr_summary(&self.width_eventful_wells(), FAM, ChannelField::MaxWidthGate)
    }

    pub fn sum_baseline_mean_summary(&self) -> Summary {
        attr_summary(&eventful(&self.all_well_metrics(), 0), WellField::SumBaselineMean)
    }

    pub fn sum_baseline_stdev_summary(&self) -> Summary {
        attr_summary(&eventful(&self.all_well_metrics(), 0), WellField::SumBaselineStdev)
    }

    pub fn baseline_mean_summary(&self, channel: Channel) -> Summary {
        channel_attr_summary(&eventful(&self.all_well_metrics(), 0), channel, ChannelField::BaselineMean)
    }

    pub fn baseline_stdev_summary(&self, channel: Channel) -> Summary {
        channel_attr_summary(&eventful(&self.all_well_metrics(), 0), channel, ChannelField::BaselineStdev)
    }

    // CNV

    pub fn well_metrics_of_cnv_num(&self, expected_cnv: f64) -> Vec<WellRef<'_>> {
        self.well_metrics_by_type(&[PlateTypeCode::Bcnv, PlateTypeCode::Gcnv, PlateTypeCode::Cnv200])
            .into_iter()
            .filter(|w| w.metric.expected_cnv == Some(expected_cnv))
            .collect()
    }

    /// Wells with no CNV, or one more than 0.5 copies off the expected value.
    pub fn cnv_misses(&self, expected_cnv: f64) -> Vec<WellRef<'_>> {
        self.well_metrics_of_cnv_num(expected_cnv)
            .into_iter()
            .filter(|w| match w.metric.cnv.filter(|c| *c != 0.0) {
                Some(cnv) => (cnv - expected_cnv).abs() > 0.5,
                None => true,
            })
            .collect()
    }

    /// Mean and standard deviation of the called copy numbers.
    pub fn cnv_mean_stdev(&self, expected_cnv: f64) -> (f64, f64) {
        let cnvs: Vec<f64> = self
            .well_metrics_of_cnv_num(expected_cnv)
            .iter()
            .filter_map(|w| w.metric.cnv.filter(|c| *c != 0.0))
            .collect();
        match (stats::mean(&cnvs), stats::pstdev(&cnvs)) {
            (Some(mean), Some(stdev)) => (mean, stdev),
            _ => (0.0, 0.0),
        }
    }

    pub fn cnv_rise_ratio_summary(&self, expected_cnv: f64) -> Summary {
        attr_summary(&self.well_metrics_of_cnv_num(expected_cnv), WellField::CnvRiseRatio)
    }

    pub fn cnv_min_max(&self, expected_cnv: f64) -> (f64, f64) {
        let cnvs: Vec<f64> = self
            .well_metrics_of_cnv_num(expected_cnv)
            .iter()
            .filter_map(|w| w.metric.cnv)
            .collect();
        let min = cnvs.iter().copied().fold(f64::INFINITY, f64::min);
        let max = cnvs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if cnvs.is_empty() {
            (0.0, 0.0)
        } else {
            (min, max)
        }
    }

    // Null linkage

    pub fn null_linkage_wells(&self) -> Vec<WellRef<'_>> {
        self.all_well_metrics()
            .into_iter()
            .filter(|w| w.metric.null_linkage.is_some())
            .collect()
    }

    pub fn null_linkage_summary(&self) -> Summary {
        attr_summary(&self.null_linkage_wells(), WellField::NullLinkage)
    }

    pub fn null_linkage_wells_sub1(&self) -> Vec<WellRef<'_>> {
        self.null_linkage_wells()
            .into_iter()
            .filter(|w| w.metric.null_linkage.is_some_and(|n| n < 1.0))
            .collect()
    }

    // Gated percentages, scaled to percent

    fn triggered_ratio<F>(&self, value: F) -> Vec<f64>
    where
        F: Fn(&WellMetric) -> Option<usize>,
    {
        let cutoff = self.params.accepted_event_cutoff;
        self.all_well_metrics()
            .iter()
            .filter(|w| w.metric.triggered_event_count() as i64 > cutoff)
            .filter_map(|w| value(w.metric).map(|v| v as f64 / w.metric.triggered_event_count() as f64))
            .collect()
    }

    /// Events gated out for width, as a percentage of triggered events.
    pub fn width_gated_pct_summary(&self) -> Summary {
        pct_summary(self.triggered_ratio(|w| w.channels[FAM].width_gated_peaks))
    }

    /// Events gated out for low quality (RED mode).
    pub fn quality_gated_pct_summary(&self) -> Summary {
        pct_summary(self.triggered_ratio(|w| w.channels[FAM].quality_gated_peaks))
    }

    pub fn vertical_streak_pct_summary(&self) -> Summary {
        pct_summary(self.triggered_ratio(|w| w.vertical_streak_events))
    }

    /// Events below the VIC minimum amplitude, as a percentage of all events.
    pub fn min_amplitude_gated_summary(&self) -> Summary {
        let cutoff = self.params.accepted_event_cutoff;
        let ratios: Vec<f64> = self
            .all_well_metrics()
            .iter()
            .filter(|w| w.metric.accepted_event_count as i64 > cutoff)
            .filter_map(|w| {
                count(w.metric.min_amplitude_peaks).map(|peaks| stats::ratio(peaks, w.metric.total_event_count as f64))
            })
            .collect();
        pct_summary(ratios)
    }

    /// Peaks rejected before processing, as a percentage of all peaks.
    pub fn rejected_peak_pct_summary(&self) -> Summary {
        let cutoff = self.params.accepted_event_cutoff;
        let ratios: Vec<f64> = self
            .all_well_metrics()
            .iter()
            .filter(|w| w.metric.total_event_count as i64 > cutoff)
            .map(|w| {
                let rejected = w.metric.rejected_peaks.unwrap_or(0) as f64;
                stats::ratio(rejected, rejected + w.metric.total_event_count as f64)
            })
            .collect();
        pct_summary(ratios)
    }

    // Colorcomp

    /// Wells of the newest multi-well colorcomp plate with one of `samples`.
    pub fn colorcomp_sample_wells(&self, samples: &[&str]) -> Vec<WellRef<'_>> {
        match self.latest_plate_of_type(&[PlateTypeCode::Bcc, PlateTypeCode::Mfgcc]) {
            Some(entry) => self.entry_wells(entry).filter(|w| w.sample_in(samples)).collect(),
            None => Vec::new(),
        }
    }

    /// Newest single-well colorcomp plate with a calibration well for `dyeset`.
    pub fn singlewell_colorcomp_plate(&self, dyeset: Dyeset) -> Option<&PlateEntry> {
        let mut plates = self.plate_metrics_by_type(&[PlateTypeCode::Scc]);
        plates.sort_by(|a, b| b.plate.run_time.cmp(&a.plate.run_time));
        plates.into_iter().find(|entry| {
            self.entry_wells(entry)
                .any(|w| w.sample_name() == Some(dyeset.sample_name()))
        })
    }

    pub fn singlewell_colorcomp_well(&self, dyeset: Dyeset) -> Option<WellRef<'_>> {
        let entry = self.singlewell_colorcomp_plate(dyeset)?;
        self.entry_wells(entry)
            .filter(|w| w.sample_name() == Some(dyeset.sample_name()))
            .last()
    }

    pub fn colorcomp_fam_high_wells(&self) -> Vec<WellRef<'_>> {
        self.colorcomp_wells()
            .into_iter()
            .filter(|w| w.sample_in(FAM_HI_SAMPLES))
            .collect()
    }

    pub fn colorcomp_vic_high_wells(&self) -> Vec<WellRef<'_>> {
        self.colorcomp_wells()
            .into_iter()
            .filter(|w| w.sample_in(VIC_HI_SAMPLES))
            .collect()
    }

    /// Mean amplitude and spread of multi-well colorcomp dye wells, with
    /// the plate's software PMT gain divided out.
    pub fn colorcomp_amplitude_stats(&self, samples: &[&str], channel: Channel) -> Option<AmplitudeStats> {
        let mut means = Vec::new();
        let mut stdevs = Vec::new();
        for w in self.colorcomp_sample_wells(samples) {
            let Some(c) = w.channel(channel) else { continue };
            let (Some(mean), Some(stdev)) = (c.amplitude_mean, c.amplitude_stdev) else {
                continue;
            };
            let gain = match channel {
                FAM => w.plate_metric.software_pmt_gain_fam,
                _ => w.plate_metric.software_pmt_gain_vic,
            }
            .filter(|g| *g != 0.0)
            .unwrap_or(1.0);
            means.push(mean / gain);
            stdevs.push(stdev / gain);
        }
        Some(AmplitudeStats {
            mean: stats::mean(&means)?,
            stdev: stats::mean(&stdevs)?,
        })
    }

    /// Cluster amplitudes of the newest single-well calibration for
    /// `dyeset`. `None` unless all four clusters were found.
    pub fn singlewell_colorcomp_amplitude_stats(&self, dyeset: Dyeset) -> Option<SingleWellAmplitudes> {
        let well = self.singlewell_colorcomp_well(dyeset)?;
        let (fam, vic) = (well.fam(), well.vic());
        let nonzero = |v: Option<f64>| v.filter(|v| *v != 0.0);
        let (blue_hi, blue_lo) = (nonzero(fam.positive_mean)?, nonzero(fam.negative_mean)?);
        let (green_hi, green_lo) = (nonzero(vic.positive_mean)?, nonzero(vic.negative_mean)?);

        let fam_gain = nonzero(well.plate_metric.software_pmt_gain_fam).unwrap_or(1.0);
        let mut vic_gain = nonzero(well.plate_metric.software_pmt_gain_vic).unwrap_or(1.0);
        if vic_gain == 1.0 && dyeset == Dyeset::FamHex {
            vic_gain = HEX_SCALE_FACTOR;
        }

        Some(SingleWellAmplitudes {
            blue_hi_mean: blue_hi / fam_gain,
            blue_hi_stdev: fam.positive_stdev? / fam_gain,
            blue_lo_mean: blue_lo / fam_gain,
            blue_lo_stdev: fam.negative_stdev? / fam_gain,
            green_hi_mean: green_hi / vic_gain,
            green_hi_stdev: vic.positive_stdev? / vic_gain,
            green_lo_mean: green_lo / vic_gain,
            green_lo_stdev: vic.negative_stdev? / vic_gain,
        })
    }

    /// Blue HI minus green HI width of the newest calibration for `dyeset`.
    pub fn singlewell_colorcomp_delta_widths(&self, dyeset: Dyeset) -> Option<f64> {
        self.singlewell_colorcomp_well(dyeset)?.metric.delta_widths()
    }

    /// FAM rain (middle plus negative) of the first colorcomp FAM HI well,
    /// and whether that well got a threshold.
    pub fn colorcomp_fam_rain_stats(&self) -> Option<(f64, bool)> {
        self.colorcomp_fam_high_wells()
            .first()
            .map(|w| hi_well_rain(w.fam()))
    }

    pub fn colorcomp_vic_rain_stats(&self) -> Option<(f64, bool)> {
        self.colorcomp_vic_high_wells()
            .first()
            .map(|w| hi_well_rain(w.vic()))
    }

    /// Carryover peaks of the newest multi-well colorcomp plate.
    pub fn colorcomp_carryover_total(&self) -> usize {
        self.latest_plate_of_type(&[PlateTypeCode::Bcc, PlateTypeCode::Mfgcc])
            .and_then(|e| e.metric.carryover_peaks)
            .unwrap_or(0)
    }

    pub fn colorcomp_plate_metrics(&self) -> Vec<&PlateEntry> {
        self.plate_metrics_by_type(&[PlateTypeCode::Bcc, PlateTypeCode::Mfgcc])
    }

    // Carryover

    pub fn carryover_plate_metrics(&self) -> Vec<&PlateEntry> {
        self.plate_metrics_by_type(&[PlateTypeCode::Bcarry, PlateTypeCode::Mfgco])
    }

    pub fn events_plate_metrics(&self) -> Vec<&PlateEntry> {
        self.plate_metrics_by_type(&[PlateTypeCode::Betaec])
    }

    pub fn probe_events_plate_metrics(&self) -> Vec<&PlateEntry> {
        self.plate_metrics_by_type(&[PlateTypeCode::Probeec])
    }

    pub fn eva_events_plate_metrics(&self) -> Vec<&PlateEntry> {
        self.plate_metrics_by_type(&[PlateTypeCode::Evaec])
    }

    pub fn total_carryover_stats(&self) -> CarryoverTotals {
        let plates = self.carryover_plate_metrics();
        CarryoverTotals {
            plates: plates.len(),
            carryover_peaks: plates.iter().map(|p| p.metric.carryover_peaks.unwrap_or(0)).sum(),
            gated_contamination_peaks: plates
                .iter()
                .map(|p| p.metric.gated_contamination_peaks.unwrap_or(0))
                .sum(),
            contamination_peaks: plates.iter().map(|p| p.metric.contamination_peaks.unwrap_or(0)).sum(),
            stealth_wells: plates.iter().map(|p| p.metric.stealth_wells.unwrap_or(0)).sum(),
        }
    }

    fn carryover_wells(&self) -> Vec<WellRef<'_>> {
        self.well_metrics_by_type(&[PlateTypeCode::Bcarry, PlateTypeCode::Mfgco])
    }

    /// Non-stealth wells of carryover plates.
    pub fn carryover_eventful_wells(&self) -> Vec<WellRef<'_>> {
        self.carryover_wells().into_iter().filter(|w| !w.is_stealth()).collect()
    }

    pub fn carryover_stealth_wells(&self) -> Vec<WellRef<'_>> {
        self.carryover_wells().into_iter().filter(|w| w.is_stealth()).collect()
    }

    /// Eventful carryover wells where a FAM threshold was drawn.
    pub fn ok_carryover_eventful_wells(&self) -> Vec<WellRef<'_>> {
        thresholded(&self.carryover_eventful_wells(), FAM)
    }

    pub fn carryover_eventful_rejected_peaks_summary(&self) -> Summary {
        attr_summary(&self.carryover_eventful_wells(), WellField::RejectedPeaks)
    }

    pub fn carryover_stealth_rejected_peaks_summary(&self) -> Summary {
        attr_summary(&self.carryover_stealth_wells(), WellField::RejectedPeaks)
    }

    pub fn carryover_event_middle_rain_summary(&self) -> Summary {
        channel_summary(&self.ok_carryover_eventful_wells(), FAM, |c| c.rain_p)
    }

    pub fn carryover_event_negative_rain_summary(&self) -> Summary {
        channel_summary(&self.ok_carryover_eventful_wells(), FAM, |c| c.rain_p_minus)
    }

    /// Ratio of closely spaced droplets to triggered events. Certification
    /// reads the event-count wells; other views read the width-eventful wells.
    pub fn short_droplet_spacing_summary(&self) -> Summary {
        let wells = match self.kind {
            ViewKind::Certification => self.event_count_wells(),
            _ => self.width_eventful_wells(),
        };
        let ratios: Vec<f64> = wells
            .iter()
            .filter(|w| w.metric.triggered_event_count() > 0)
            .filter_map(|w| {
                count(w.metric.short_interval_count).map(|c| c / w.metric.triggered_event_count() as f64)
            })
            .collect();
        Summary::of(&ratios)
    }

    // Droplet populations

    /// Summary of a raw channel value over the wells where it was computed.
    pub fn analyzed_channel_stats<F>(&self, wells: &[WellRef<'_>], channel: Channel, value: F) -> Summary
    where
        F: Fn(&WellChannelMetric) -> Option<f64>,
    {
        channel_summary(wells, channel, value)
    }

    pub fn polydispersity_stats(&self, wells: &[WellRef<'_>], channel: Channel) -> Summary {
        channel_summary(wells, channel, |c| c.polydispersity)
    }

    pub fn polydispersity_revb_stats(&self, wells: &[WellRef<'_>], channel: Channel) -> Summary {
        channel_summary(wells, channel, |c| c.revb_polydispersity)
    }

    pub fn extracluster_stats(&self, wells: &[WellRef<'_>], channel: Channel) -> Summary {
        channel_summary(wells, channel, |c| c.extracluster)
    }

    pub fn extracluster_revb_stats(&self, wells: &[WellRef<'_>], channel: Channel) -> Summary {
        channel_summary(wells, channel, |c| c.revb_extracluster)
    }

    pub fn polydispersity_all_stats(&self, channel: Channel) -> Summary {
        self.polydispersity_stats(&self.all_well_metrics(), channel)
    }

    pub fn extracluster_all_stats(&self, channel: Channel) -> Summary {
        self.extracluster_stats(&self.all_well_metrics(), channel)
    }

    pub fn polydispersity_carryover_fam_stats(&self) -> Summary {
        self.polydispersity_stats(&self.carryover_eventful_wells(), FAM)
    }

    pub fn polydispersity_colorcomp_fam_stats(&self) -> Summary {
        self.polydispersity_stats(&self.colorcomp_fam_high_wells(), FAM)
    }

    pub fn polydispersity_colorcomp_vic_stats(&self) -> Summary {
        self.polydispersity_stats(&self.colorcomp_vic_high_wells(), VIC)
    }

    /// Wells where gap rain was computed in `channel`.
    pub fn gap_rain_wells(&self, channel: Channel) -> Vec<WellRef<'_>> {
        self.all_well_metrics()
            .into_iter()
            .filter(|w| w.channel(channel).is_some_and(|c| c.gap_rain_droplets.is_some()))
            .collect()
    }

    pub fn gap_rain_stats(&self, channel: Channel) -> GapRainStats {
        let wells = self.gap_rain_wells(channel);
        let summary = channel_summary(&wells, channel, |c| count(c.gap_rain_droplets));
        let wells_with_rain = wells
            .iter()
            .filter(|w| w.channel(channel).and_then(|c| c.gap_rain_droplets).unwrap_or(0) > 0)
            .count();
        GapRainStats {
            summary,
            wells_with_rain,
            wells: wells.len(),
        }
    }

    // Air droplets

    /// Wells where air droplets are looked for.
    pub fn air_droplets_wells(&self) -> Vec<WellRef<'_>> {
        let mut wells = self.ok_carryover_eventful_wells();
        match self.kind {
            ViewKind::Certification => wells.extend(self.well_metrics_by_type(&[PlateTypeCode::Betaec])),
            _ => {
                wells.extend(self.singleplex_wells());
                wells.extend(self.event_count_wells());
            }
        }
        wells
    }

    pub fn air_droplets_summary(&self) -> Summary {
        attr_summary(&self.air_droplets_wells(), WellField::AirDroplets)
    }

    /// Wells with air droplets, and wells looked at.
    pub fn air_droplet_count(&self) -> (usize, usize) {
        air_count(&self.air_droplets_wells())
    }

    pub fn carryover_air_droplet_summary(&self) -> Summary {
        attr_summary(&self.ok_carryover_eventful_wells(), WellField::AirDroplets)
    }

    pub fn carryover_air_droplet_count(&self) -> (usize, usize) {
        air_count(&self.ok_carryover_eventful_wells())
    }

    // FAM/VIC titration

    /// FAM wells of F+/V+ titration plates: by sample name, else columns 5-8.
    pub fn famvic_fam_wells(&self) -> Vec<WellRef<'_>> {
        self.famvic_wells("fam", 5, 8)
    }

    /// VIC wells of F+/V+ titration plates: by sample name, else columns 9-12.
    pub fn famvic_vic_wells(&self) -> Vec<WellRef<'_>> {
        self.famvic_wells("vic", 9, 12)
    }

    fn famvic_wells(&self, dye: &str, first: u8, last: u8) -> Vec<WellRef<'_>> {
        let wells = self.well_metrics_by_type(&[PlateTypeCode::Fvtitr]);
        let named: Vec<WellRef<'_>> = wells
            .iter()
            .filter(|w| w.sample_name().is_some_and(|s| s.to_lowercase().contains(dye)))
            .copied()
            .collect();
        if !named.is_empty() {
            return named;
        }
        wells
            .into_iter()
            .filter(|w| w.metric.well_name.column_in(first, last))
            .collect()
    }

    pub fn famvic_amplitude_stats(&self, channel: Channel) -> Option<AmplitudeStats> {
        let wells = match channel {
            FAM => self.famvic_fam_wells(),
            VIC => self.famvic_vic_wells(),
            _ => return None,
        };
        let means: Vec<f64> = wells.iter().filter_map(|w| w.channel(channel)?.amplitude_mean).collect();
        let stdevs: Vec<f64> = wells.iter().filter_map(|w| w.channel(channel)?.amplitude_stdev).collect();
        Some(AmplitudeStats {
            mean: stats::mean(&means)?,
            stdev: stats::mean(&stdevs)?,
        })
    }

    /// The statistics `ddqc report` prints, in display order.
    pub fn headline(&self) -> Vec<(&'static str, Summary)> {
        vec![
            ("Accepted events", self.event_count_summary()),
            ("Width mean", self.mean_width_summary()),
            ("Accepted width mean", self.mean_accepted_width_summary()),
            ("Width gated (%)", self.width_gated_pct_summary()),
            ("Rejected peaks (%)", self.rejected_peak_pct_summary()),
            ("Short droplet spacing", self.short_droplet_spacing_summary()),
            ("FAM polydispersity (%)", self.polydispersity_all_stats(FAM).scaled(100.0)),
            ("VIC polydispersity (%)", self.polydispersity_all_stats(VIC).scaled(100.0)),
            ("FAM extracluster (%)", self.extracluster_all_stats(FAM).scaled(100.0)),
            ("Air droplets", self.air_droplets_summary()),
            ("Null linkage", self.null_linkage_summary()),
            ("Stealth rejected peaks", self.carryover_stealth_rejected_peaks_summary()),
        ]
    }
}

fn per_droplets(peaks: Option<usize>, accepted: usize, per: f64) -> Option<f64> {
    let peaks = peaks? as f64;
    Some(if accepted == 0 { 0.0 } else { peaks * per / accepted as f64 })
}

fn hi_well_rain(channel: &WellChannelMetric) -> (f64, bool) {
    let rain = channel.rain_p_minus.unwrap_or(0.0) + channel.rain_p.unwrap_or(0.0);
    (rain, channel.called_threshold().is_some())
}

fn air_count(wells: &[WellRef<'_>]) -> (usize, usize) {
    let with_air = wells.iter().filter(|w| w.metric.air_droplets.unwrap_or(0) > 0).count();
    (with_air, wells.len())
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Metric trees built directly, without running the calculators.

    use super::*;
    use crate::plate::fixtures::record;

    pub fn well(name: &str, sample: Option<&str>, accepted: usize) -> WellMetric {
        let mut metric = WellMetric::new(name.parse().expect("well name"));
        metric.sample_name = sample.map(str::to_string);
        metric.accepted_event_count = accepted;
        metric.total_event_count = accepted;
        metric
    }

    pub fn entry(id: &str, code: Option<PlateTypeCode>, day: u32, wells: Vec<WellMetric>) -> PlateEntry {
        let mut metric = PlateMetric::new(id, None);
        for w in wells {
            metric.insert_well(w);
        }
        PlateEntry {
            plate: record(id, code, day),
            metric,
        }
    }

    pub fn group(entries: Vec<PlateEntry>) -> AnalysisGroupMetrics {
        AnalysisGroupMetrics::from_entries(
            Scope::Reader("dr-1".to_string()),
            ViewKind::Group,
            entries,
            None,
            &BTreeMap::new(),
            QueryOptions::default(),
        )
    }

    /// Well names A01, A02, ... in row-major order over 12 columns.
    pub fn well_name(index: usize) -> String {
        let row = (b'A' + (index / 12) as u8) as char;
        format!("{}{:02}", row, index % 12 + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{entry, group, well, well_name};
    use super::*;
    use crate::store::JsonMetricStore;
    use tempfile::TempDir;

    #[test]
    fn test_attr_summary_empty_and_constant() {
        assert_eq!(attr_summary(&[], WellField::WidthMean), Summary::ZERO);

        let mut wells = Vec::new();
        for i in 0..4 {
            let mut w = well(&well_name(i), Some("x"), 100);
            w.width_mean = Some(9.5);
            wells.push(w);
        }
        let metrics = group(vec![entry("p1", Some(PlateTypeCode::Bsplex), 1, wells)]);
        let (mean, stdev, lo, hi) = attr_summary(&metrics.all_well_metrics(), WellField::WidthMean).as_tuple();
        assert_eq!((mean, stdev), (9.5, 0.0));
        assert!((lo - 9.5).abs() < 1e-9 && (hi - 9.5).abs() < 1e-9);
    }

    #[test]
    fn test_channel_attr_summary_skips_absent() {
        let mut a = well("A01", Some("x"), 100);
        a.channels[FAM].s_value = Some(4.0);
        let mut b = well("A02", Some("x"), 100);
        b.channels[FAM].s_value = Some(6.0);
        let c = well("A03", Some("x"), 100);
        let metrics = group(vec![entry("p1", Some(PlateTypeCode::Bsplex), 1, vec![a, b, c])]);
        let summary = channel_attr_summary(&metrics.all_well_metrics(), FAM, ChannelField::SValue);
        assert_eq!(summary.mean, 5.0);
        assert_eq!(summary.stdev, 1.0);
        assert_eq!(channel_attr_summary(&metrics.all_well_metrics(), 7, ChannelField::SValue), Summary::ZERO);
    }

    #[test]
    fn test_filters_compose() {
        let entries = vec![
            entry("p1", Some(PlateTypeCode::Bsplex), 1, vec![well("A01", Some("a"), 10), well("A02", Some("b"), 20)]),
            entry("p2", Some(PlateTypeCode::Bdplex), 2, vec![well("A01", Some("a"), 30)]),
        ];
        let options = QueryOptions {
            filters: Filters {
                plate_type: Some(Box::new(|code| *code == Some(PlateTypeCode::Bsplex))),
                well_metric: Some(Box::new(|w| w.accepted_event_count > 15)),
                ..Default::default()
            },
            overrides: LimitOverrides::default(),
        };
        let metrics = AnalysisGroupMetrics::from_entries(
            Scope::Reader("dr-1".to_string()),
            ViewKind::Group,
            entries,
            None,
            &BTreeMap::new(),
            options,
        );
        let wells = metrics.all_well_metrics();
        assert_eq!(wells.len(), 1);
        assert_eq!(wells[0].plate.id, "p1");
        assert_eq!(wells[0].metric.accepted_event_count, 20);
    }

    #[test]
    fn test_auto_validation_wells_match_by_well_type() {
        let mut dup = well("A01", Some("dup"), 100);
        dup.experiment_name = Some("Validation-Duplex".to_string());
        let mut carry = well("A02", Some("stealth"), 100);
        carry.experiment_name = Some("Validation-Carryover".to_string());
        let metrics = group(vec![
            entry("av", Some(PlateTypeCode::Av), 1, vec![dup, carry]),
            entry("p2", Some(PlateTypeCode::Bdplex), 2, vec![well("A01", Some("dup"), 100)]),
        ]);

        assert_eq!(metrics.duplex_wells().len(), 2);
        assert_eq!(metrics.carryover_stealth_wells().len(), 1);
        let others = metrics.well_metrics_excluding_type(&[PlateTypeCode::Bdplex]);
        assert_eq!(others.len(), 1);
        assert_eq!(others[0].sample_name(), Some("stealth"));
    }

    #[test]
    fn test_auto_validation_plate_matches_its_own_code() {
        let mut dup = well("A01", Some("dup"), 100);
        dup.experiment_name = Some("Validation-Duplex".to_string());
        let metrics = group(vec![
            entry("av", Some(PlateTypeCode::Av), 1, vec![dup]),
            entry("p2", Some(PlateTypeCode::Bdplex), 2, vec![well("A01", Some("dup"), 100)]),
        ]);

        let av = metrics.well_metrics_by_type(&[PlateTypeCode::Av]);
        assert_eq!(av.len(), 1);
        assert_eq!(av[0].plate.id, "av");
        assert_eq!(metrics.well_metrics_by_type(&[PlateTypeCode::Av, PlateTypeCode::Bdplex]).len(), 2);
        assert!(metrics.well_metrics_excluding_type(&[PlateTypeCode::Av, PlateTypeCode::Bdplex]).is_empty());
        assert_eq!(metrics.well_metrics_excluding_type(&[PlateTypeCode::Av]).len(), 1);
    }

    #[test]
    fn test_event_count_wells_by_view() {
        let wells = || {
            vec![
                well("A01", Some("sample"), 100),
                well("A02", Some("stealth"), 5),
                well("A03", None, 5),
                well("A04", Some(""), 5),
            ]
        };
        let metrics = group(vec![entry("p1", Some(PlateTypeCode::Betaec), 1, wells())]);
        assert_eq!(metrics.event_count_wells().len(), 1);

        let single = AnalysisGroupMetrics::from_entries(
            Scope::Plate("p1".to_string()),
            ViewKind::SinglePlate,
            vec![entry("p1", Some(PlateTypeCode::Betaec), 1, wells())],
            None,
            &BTreeMap::new(),
            QueryOptions::default(),
        );
        assert_eq!(single.event_count_wells().len(), 2);
    }

    #[test]
    fn test_limits_follow_newest_system_version() {
        let mut old = entry("p1", None, 1, vec![]);
        old.plate.program_version = Some("QuantaSoft 1.7.4.0917".to_string());
        let mut new = entry("p2", None, 2, vec![]);
        new.plate.system_version = Some("QX200".to_string());

        let mut tables = BTreeMap::new();
        tables.insert(
            "QX200.new".to_string(),
            LimitTable {
                low_event_count: Some(15000),
                ..Default::default()
            },
        );
        let metrics = AnalysisGroupMetrics::from_entries(
            Scope::Reader("dr-1".to_string()),
            ViewKind::Group,
            vec![old, new],
            None,
            &tables,
            QueryOptions::default(),
        );
        assert_eq!(metrics.system_version, "QX200");
        assert_eq!(metrics.params.key, "QX200.new");
        assert_eq!(metrics.params.low_event_count, 15000);

        assert_eq!(group(vec![]).params.key, DEFAULT_SYSTEM_VERSION);
    }

    #[test]
    fn test_conc_ci95_requires_called_threshold() {
        let mut wells = Vec::new();
        for (i, (threshold, conc)) in [(Some(4000.0), 100.0), (Some(4000.0), 200.0), (Some(0.0), 900.0), (None, 900.0)]
            .into_iter()
            .enumerate()
        {
            let mut w = well(&well_name(i), Some("s"), 15000);
            w.channels[FAM].threshold = threshold;
            w.channels[FAM].concentration = Some(conc);
            wells.push(w);
        }
        let metrics = group(vec![entry("p1", Some(PlateTypeCode::Bsplex), 1, wells)]);
        let summary = metrics.all_singleplex_conc_ci95().unwrap();
        assert_eq!(summary.mean, 150.0);
        assert!((summary.ci025 - 102.5).abs() < 1e-9);
        assert!((summary.ci975 - 197.5).abs() < 1e-9);

        assert!(group(vec![]).all_singleplex_conc_ci95().is_none());
    }

    #[test]
    fn test_carryover_views_and_totals() {
        let mut eventful = well("A01", Some("S.a. 1cpd"), 15000);
        eventful.channels[FAM].threshold = Some(4000.0);
        eventful.channels[FAM].rain_p = Some(0.02);
        eventful.air_droplets = Some(3);
        let unthresholded = well("A02", Some("S.a. 1cpd"), 15000);
        let mut stealth = well("A03", Some("Stealth"), 0);
        stealth.carryover_peaks = Some(1);
        let mut plate = entry("c1", Some(PlateTypeCode::Mfgco), 1, vec![eventful, unthresholded, stealth]);
        plate.metric.carryover_peaks = Some(1);
        plate.metric.stealth_wells = Some(1);
        let metrics = group(vec![plate]);

        assert_eq!(metrics.carryover_eventful_wells().len(), 2);
        assert_eq!(metrics.ok_carryover_eventful_wells().len(), 1);
        assert_eq!(metrics.carryover_stealth_wells().len(), 1);
        assert_eq!(metrics.carryover_air_droplet_count(), (1, 1));
        assert_eq!(metrics.carryover_event_middle_rain_summary().mean, 0.02);
        assert_eq!(
            metrics.total_carryover_stats(),
            CarryoverTotals {
                plates: 1,
                carryover_peaks: 1,
                gated_contamination_peaks: 0,
                contamination_peaks: 0,
                stealth_wells: 1,
            }
        );
    }

    #[test]
    fn test_single_well_colorcomp_prefers_newest_plate_with_dyeset() {
        let calibration = |fam_hi: f64| {
            let mut w = well("A01", Some("FAM/VIC"), 20000);
            w.channels[FAM].positive_mean = Some(fam_hi);
            w.channels[FAM].positive_stdev = Some(fam_hi / 50.0);
            w.channels[FAM].negative_mean = Some(2000.0);
            w.channels[FAM].negative_stdev = Some(100.0);
            w.channels[VIC].positive_mean = Some(10000.0);
            w.channels[VIC].positive_stdev = Some(200.0);
            w.channels[VIC].negative_mean = Some(1800.0);
            w.channels[VIC].negative_stdev = Some(90.0);
            w.delta_widths = Some(0.2);
            w
        };
        let older = entry("s1", Some(PlateTypeCode::Scc), 1, vec![calibration(19000.0)]);
        let mut newer = entry("s2", Some(PlateTypeCode::Scc), 2, vec![calibration(21000.0)]);
        newer.metric.software_pmt_gain_fam = Some(1.05);
        let hex_only = entry("s3", Some(PlateTypeCode::Scc), 3, vec![well("A01", Some("FAM/HEX"), 20000)]);
        let metrics = group(vec![older, newer, hex_only]);

        let plate = metrics.singlewell_colorcomp_plate(Dyeset::FamVic).unwrap();
        assert_eq!(plate.plate.id, "s2");
        let amps = metrics.singlewell_colorcomp_amplitude_stats(Dyeset::FamVic).unwrap();
        assert!((amps.blue_hi_mean - 20000.0).abs() < 1e-9);
        assert_eq!(amps.green_hi_mean, 10000.0);
        assert_eq!(metrics.singlewell_colorcomp_delta_widths(Dyeset::FamVic), Some(0.2));

        // The HEX calibration well has no clusters.
        assert_eq!(metrics.singlewell_colorcomp_plate(Dyeset::FamHex).unwrap().plate.id, "s3");
        assert!(metrics.singlewell_colorcomp_amplitude_stats(Dyeset::FamHex).is_none());
    }

    #[test]
    fn test_colorcomp_amplitude_divides_gain_on_newest_plate() {
        let fam_hi = |mean: f64| {
            let mut w = well("A01", Some("FAM HI"), 15000);
            w.channels[FAM].amplitude_mean = Some(mean);
            w.channels[FAM].amplitude_stdev = Some(400.0);
            w
        };
        let old = entry("c1", Some(PlateTypeCode::Bcc), 1, vec![fam_hi(5000.0)]);
        let mut new = entry("c2", Some(PlateTypeCode::Mfgcc), 2, vec![fam_hi(22000.0)]);
        new.metric.software_pmt_gain_fam = Some(1.1);
        new.metric.carryover_peaks = Some(4);
        let metrics = group(vec![old, new]);

        let stats = metrics.colorcomp_amplitude_stats(FAM_HI_SAMPLES, FAM).unwrap();
        assert!((stats.mean - 20000.0).abs() < 1e-9);
        assert_eq!(metrics.colorcomp_carryover_total(), 4);
        assert!(metrics.colorcomp_amplitude_stats(VIC_HI_SAMPLES, VIC).is_none());
    }

    #[test]
    fn test_gated_percentages() {
        let mut a = well("A01", Some("s"), 2000);
        a.channels[FAM].width_gated_peaks = Some(100);
        a.rejected_peaks = Some(0);
        let mut b = well("A02", Some("s"), 2000);
        b.channels[FAM].width_gated_peaks = Some(300);
        b.rejected_peaks = Some(0);
        let small = well("A03", Some("s"), 10);
        let metrics = group(vec![entry("p1", Some(PlateTypeCode::Bsplex), 1, vec![a, b, small])]);

        let triggered = metrics.all_well_metrics()[0].metric.triggered_event_count() as f64;
        let gated = metrics.width_gated_pct_summary();
        let expected = 100.0 * (100.0 / triggered + 300.0 / triggered) / 2.0;
        assert!((gated.mean - expected).abs() < 1e-9);
        assert_eq!(metrics.rejected_peak_pct_summary().mean, 0.0);
    }

    #[test]
    fn test_cnv_views() {
        let cnv_well = |name: &str, cnv: Option<f64>| {
            let mut w = well(name, Some("cnv"), 15000);
            w.expected_cnv = Some(2.0);
            w.cnv = cnv;
            w
        };
        let metrics = group(vec![entry(
            "p1",
            Some(PlateTypeCode::Bcnv),
            1,
            vec![
                cnv_well("A01", Some(2.1)),
                cnv_well("A02", Some(1.9)),
                cnv_well("A03", Some(2.8)),
                cnv_well("A04", None),
            ],
        )]);

        assert_eq!(metrics.well_metrics_of_cnv_num(2.0).len(), 4);
        assert_eq!(metrics.cnv_misses(2.0).len(), 2);
        assert_eq!(metrics.cnv_min_max(2.0), (1.9, 2.8));
        assert!((metrics.cnv_mean_stdev(2.0).0 - 2.2667).abs() < 1e-3);
        assert_eq!(metrics.cnv_min_max(3.0), (0.0, 0.0));
    }

    #[test]
    fn test_target_stats_group_by_target() {
        let target_well = |name: &str, target: &str, conc: f64| {
            let mut w = well(name, Some("assay"), 15000);
            w.channels[FAM].target = Some(target.to_string());
            w.channels[FAM].concentration = Some(conc);
            w.channels[VIC].double_rain_pct = Some(1.0);
            w
        };
        let mut ntc = target_well("A04", "EGFR", 1000.0);
        ntc.sample_name = Some("NTC".to_string());
        let metrics = group(vec![entry(
            "p1",
            Some(PlateTypeCode::Eg200),
            1,
            vec![
                target_well("A01", "EGFR", 100.0),
                target_well("A02", "EGFR", 300.0),
                target_well("A03", "KRAS", 50.0),
                ntc,
            ],
        )]);

        let stats = metrics.eg200_singleplex_stats();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].target, "EGFR");
        assert_eq!(stats[0].concentration, Some(200.0));
        assert_eq!(stats[0].double_rain_pct, Some(1.0));
        assert_eq!(stats[0].s2d_value, None);
        assert_eq!(stats[1].target, "KRAS");
    }

    #[test]
    fn test_for_group_loads_from_store() {
        let dir = TempDir::new().unwrap();
        let store = JsonMetricStore::open(dir.path()).unwrap();
        let mut group_record = AnalysisGroup::new("week 12");
        for (id, day) in [("p1", 1), ("p2", 2)] {
            let e = entry(id, Some(PlateTypeCode::Bsplex), day, vec![well("A01", Some("s"), 100)]);
            store.save_plate(&e.plate).unwrap();
            store.replace_plate_metric(&e.metric).unwrap();
            group_record.add_plate(id);
        }
        let mut reprocessed = PlateMetric::new("p1", Some(7));
        reprocessed.insert_well(well("A01", Some("s"), 999));
        store.replace_plate_metric(&reprocessed).unwrap();

        // rc 7 is not associated with the group, so the originals are used.
        let metrics =
            AnalysisGroupMetrics::for_group(&store, &group_record, Some(7), &BTreeMap::new(), QueryOptions::default())
                .unwrap();
        assert_eq!(metrics.reprocess_config_id, None);
        assert_eq!(metrics.plate_entries().len(), 2);
        assert!(metrics.all_well_metrics().iter().all(|w| w.metric.accepted_event_count == 100));

        group_record.reprocess_config_ids.push(7);
        let metrics =
            AnalysisGroupMetrics::for_group(&store, &group_record, Some(7), &BTreeMap::new(), QueryOptions::default())
                .unwrap();
        assert_eq!(metrics.plate_entries().len(), 1);
        assert_eq!(metrics.all_well_metrics()[0].metric.accepted_event_count, 999);

        let single =
            AnalysisGroupMetrics::for_plate(&store, "p2", None, &BTreeMap::new(), QueryOptions::default()).unwrap();
        assert_eq!(single.kind(), ViewKind::SinglePlate);
        assert_eq!(single.plate_entries()[0].plate.id, "p2");
    }
}
