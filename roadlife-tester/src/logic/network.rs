use anyhow::{Context, Result, bail};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use roadlife_model::{
    DistressKind, HostSchedule, ParamValue, ParameterMap, RoadModel, Segment, evaluate_candidate,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

const ONRC_CLASSES: [&str; 7] = [
    "National",
    "Regional",
    "Arterial",
    "Primary Collector",
    "Secondary Collector",
    "Access",
    "Low Volume",
];

const DISTRESS_COLUMNS: [&str; 7] = [
    "file_pct_flush",
    "file_pct_edgebreak",
    "file_pct_scabb",
    "file_pct_lt_crax",
    "file_pct_allig",
    "file_pct_shove",
    "file_pct_poth",
];

/// Shape of a synthetic network walk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkPlan {
    pub segments: usize,
    pub periods: i32,
    /// Share of segments surfaced in asphalt; the rest are chipseal.
    pub asphalt_share: f64,
    /// Apply the best-scoring proposal each period instead of doing nothing.
    pub apply_treatments: bool,
}

impl Default for NetworkPlan {
    fn default() -> Self {
        Self {
            segments: 25,
            periods: 10,
            asphalt_share: 0.35,
            apply_treatments: true,
        }
    }
}

/// Network totals for one period.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PeriodRecord {
    pub period: i32,
    pub candidates: usize,
    pub proposals: usize,
    pub forced: usize,
    pub treatments: BTreeMap<String, usize>,
    pub mean_pdi: f64,
    pub mean_sdi: f64,
    pub mean_rut: f64,
    pub max_sla: f64,
    pub routine_maintenance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSummary {
    pub seed: u64,
    pub plan: NetworkPlan,
    pub records: Vec<PeriodRecord>,
    /// Broken model invariants observed during the walk.
    pub violations: Vec<String>,
}

impl NetworkSummary {
    #[must_use]
    pub fn treatments_applied(&self) -> usize {
        self.records
            .iter()
            .flat_map(|r| r.treatments.values())
            .sum()
    }
}

struct SegmentRun {
    element_index: i32,
    map: ParameterMap,
    schedule: HostSchedule,
}

/// Drives a seeded synthetic network through the model the way a host would:
/// rank, propose, choose, then reset or increment every segment each period.
pub struct NetworkSimulator {
    model: RoadModel,
    verbose: bool,
}

impl NetworkSimulator {
    /// # Errors
    ///
    /// Returns an error when the embedded lookups cannot build a model.
    pub fn new(verbose: bool) -> Result<Self> {
        let model = RoadModel::with_defaults().context("building road model")?;
        Ok(Self { model, verbose })
    }

    /// # Errors
    ///
    /// Returns the first model error, tagged with the segment and operation.
    pub fn run(&self, plan: &NetworkPlan, seed: u64) -> Result<NetworkSummary> {
        if plan.segments == 0 {
            bail!("network plan has no segments");
        }
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let mut violations = Vec::new();
        let mut runs = Vec::with_capacity(plan.segments);
        for i in 0..plan.segments {
            let element_index = i32::try_from(i).context("segment index overflow")?;
            let row = synthetic_row(&mut rng, plan.asphalt_share);
            let schedule = HostSchedule::default();
            let map = self.model.initialise(element_index, &row, &schedule)?;
            self.check_invariants(element_index, 0, &map, &schedule, &mut violations)?;
            runs.push(SegmentRun {
                element_index,
                map,
                schedule,
            });
        }

        let mut records = Vec::new();
        for period in 1..=plan.periods {
            write_ranks(&mut runs, "para_pdi", "para_pdi_rank");
            write_ranks(&mut runs, "para_sdi", "para_sdi_rank");
            let mut record = PeriodRecord {
                period,
                ..PeriodRecord::default()
            };

            for run in &mut runs {
                let proposals = self.model.treatment_candidates(
                    run.element_index,
                    &run.map,
                    period,
                    &run.schedule,
                )?;
                if run.map.get("para_csl_flag") == Some(&ParamValue::flag(true)) {
                    record.candidates += 1;
                }
                record.proposals += proposals.len();
                record.forced += proposals.iter().filter(|p| p.forced).count();
                if let Some(forced) = proposals.iter().find(|p| p.forced)
                    && proposals.len() > 1
                {
                    violations.push(format!(
                        "segment {} period {period}: forced {} offered alongside options",
                        run.element_index, forced.treatment
                    ));
                }

                let chosen = plan
                    .apply_treatments
                    .then(|| {
                        proposals
                            .iter()
                            .max_by(|a, b| a.score.total_cmp(&b.score))
                            .map(|p| p.treatment.clone())
                    })
                    .flatten();

                run.map = if let Some(name) = chosen {
                    run.schedule.periods_since_last_treatment = 0;
                    run.schedule.last_treatment = Some(name.clone());
                    *record.treatments.entry(name.clone()).or_default() += 1;
                    if self.verbose {
                        println!("  🛠️  period {period} segment {}: {name}", run.element_index);
                    }
                    self.model
                        .reset(run.element_index, &run.map, period, Some(&name), &run.schedule)?
                } else {
                    run.schedule.periods_since_last_treatment =
                        run.schedule.periods_since_last_treatment.saturating_add(1);
                    self.model
                        .increment(run.element_index, &run.map, period, &run.schedule)?
                };

                if let Some(rmaint) = self.model.routine_maintenance(
                    run.element_index,
                    &run.map,
                    period,
                    &run.schedule,
                )? {
                    record.routine_maintenance += rmaint.quantity;
                }
                self.check_invariants(
                    run.element_index,
                    period,
                    &run.map,
                    &run.schedule,
                    &mut violations,
                )?;
            }

            summarise_condition(&runs, &mut record);
            records.push(record);
        }

        Ok(NetworkSummary {
            seed,
            plan: plan.clone(),
            records,
            violations,
        })
    }

    fn check_invariants(
        &self,
        element_index: i32,
        period: i32,
        map: &ParameterMap,
        schedule: &HostSchedule,
        violations: &mut Vec<String>,
    ) -> Result<()> {
        let mut flag =
            |what: String| violations.push(format!("segment {element_index} period {period}: {what}"));

        let sla = number(map, "para_surf_life_ach");
        if !(0.0..=200.0).contains(&sla) {
            flag(format!("surface life achieved {sla} outside 0..=200"));
        }
        for kind in DistressKind::ALL {
            let pct = number(map, &kind.percent_parameter());
            if pct < 0.0 {
                flag(format!("{kind:?} percentage {pct} is negative"));
            }
        }

        let segment = self.model.load(element_index, map, period)?;
        let rebuilt =
            Segment::from_parameter_map(element_index, map, self.model.context().lookups())?
                .parameter_map()?;
        if &rebuilt != map {
            flag("parameter map changed on round trip".to_string());
        }

        let verdict = evaluate_candidate(
            &segment,
            period,
            schedule,
            &self.model.context().constants().candidate,
        )?;
        if map.get("para_csl_flag") != Some(&ParamValue::flag(verdict.accepted)) {
            flag(format!("stored candidate flag disagrees with '{}'", verdict.outcome()));
        }
        Ok(())
    }
}

fn number(map: &ParameterMap, key: &str) -> f64 {
    map.get(key).and_then(ParamValue::as_number).unwrap_or(f64::NAN)
}

/// Percentile rank (0-100) of each segment's value, written back to its map.
fn write_ranks(runs: &mut [SegmentRun], value_key: &str, rank_key: &str) {
    let values: Vec<f64> = runs.iter().map(|r| number(&r.map, value_key)).collect();
    for (run, rank) in runs.iter_mut().zip(percentile_ranks(&values)) {
        run.map.insert(rank_key.to_string(), ParamValue::Number(rank));
    }
}

pub fn percentile_ranks(values: &[f64]) -> Vec<f64> {
    if values.len() < 2 {
        return vec![100.0; values.len()];
    }
    #[allow(clippy::cast_precision_loss)]
    let denominator = (values.len() - 1) as f64;
    values
        .iter()
        .map(|v| {
            let below = values.iter().filter(|other| *other < v).count();
            #[allow(clippy::cast_precision_loss)]
            let below = below as f64;
            100.0 * below / denominator
        })
        .collect()
}

fn summarise_condition(runs: &[SegmentRun], record: &mut PeriodRecord) {
    #[allow(clippy::cast_precision_loss)]
    let count = runs.len().max(1) as f64;
    let mean = |key: &str| runs.iter().map(|r| number(&r.map, key)).sum::<f64>() / count;
    record.mean_pdi = mean("para_pdi");
    record.mean_sdi = mean("para_sdi");
    record.mean_rut = mean("para_rut");
    record.max_sla = runs
        .iter()
        .map(|r| number(&r.map, "para_surf_life_ach"))
        .fold(0.0, f64::max);
}

/// A plausible inventory row for a chipseal or asphalt segment.
pub fn synthetic_row(rng: &mut ChaCha20Rng, asphalt_share: f64) -> HashMap<String, String> {
    let asphalt = rng.gen_bool(asphalt_share.clamp(0.0, 1.0));
    let (class, materials) = if asphalt {
        ("ac", ["ac10", "ac14"])
    } else {
        ("cs", ["g3", "g35"])
    };
    let material = materials.choose(rng).copied().unwrap_or(materials[0]);
    let onrc = ONRC_CLASSES.choose(rng).copied().unwrap_or("Access");
    let urban = if rng.gen_bool(0.4) { "U" } else { "R" };
    let length = rng.gen_range(50.0..800.0_f64).round();
    let width = rng.gen_range(5.0..12.0_f64);

    let mut row = HashMap::new();
    let mut put = |key: &str, value: String| {
        row.insert(key.to_string(), value);
    };
    put("file_seg_name", format!("Synthetic {}", rng.gen_range(1..10_000)));
    put("file_section_id", rng.gen_range(1000..9999).to_string());
    put("file_section_name", "Synthetic Rd".to_string());
    put("file_loc_from", "0".to_string());
    put("file_loc_to", length.to_string());
    put("file_lane_name", "L1".to_string());
    put("file_length", length.to_string());
    put("file_area_m2", (length * width).round().to_string());
    put("file_is_roundabout_flag", "0".to_string());
    put("file_can_treat_flag", "1".to_string());
    put("file_can_rehab_flag", rng.gen_bool(0.6).to_string());
    put("file_ac_ok_flag", "1".to_string());
    put("file_earliest_treat_period", rng.gen_range(1..4).to_string());
    put("file_urban_rural", urban.to_string());
    put("file_onrc", onrc.to_string());
    put("file_adt", rng.gen_range(50..20_000).to_string());
    put("file_heavy_perc", format!("{:.1}", rng.gen_range(0.0..25.0_f64)));
    put("file_no_of_bus_routes", rng.gen_range(0..4).to_string());
    put("file_traff_growth_perc", format!("{:.1}", rng.gen_range(0.0..3.0_f64)));
    put("file_surf_class", class.to_string());
    put("file_next_surf", class.to_string());
    put("file_surf_date", format!("01/07/{}", rng.gen_range(2005..2023)));
    put("file_surf_function", "R".to_string());
    put("file_surf_material", material.to_string());
    put("file_surf_life_expected", rng.gen_range(6..20).to_string());
    put("file_surf_layer_no", rng.gen_range(1..5).to_string());
    put("file_surf_thick", rng.gen_range(15..60).to_string());
    put("file_pave_type", "granular".to_string());
    put("file_pave_date", format!("01/07/{}", rng.gen_range(1960..2004)));
    put("file_pave_remlife", rng.gen_range(1..40).to_string());
    put("file_su_fault_qty", format!("{:.1}", rng.gen_range(0.0..20.0_f64)));
    put("file_pa_fault_qty", format!("{:.1}", rng.gen_range(0.0..20.0_f64)));
    put("file_roughsegment_date", "01/07/2023".to_string());
    put("file_naasra_85", format!("{:.0}", rng.gen_range(40.0..160.0_f64)));
    put("file_hsd_date", "01/07/2023".to_string());
    put("file_rut_lwpmean_85", format!("{:.1}", rng.gen_range(2.0..20.0_f64)));
    put("file_rut_rwpmean_85", format!("{:.1}", rng.gen_range(2.0..20.0_f64)));
    put("file_cond_survey_date", "01/07/2023".to_string());
    for column in DISTRESS_COLUMNS {
        put(column, format!("{:.2}", rng.gen_range(0.0..20.0_f64)));
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_span_the_network() {
        let ranks = percentile_ranks(&[3.0, 1.0, 2.0]);
        assert_eq!(ranks, vec![100.0, 0.0, 50.0]);
        assert_eq!(percentile_ranks(&[7.0]), vec![100.0]);
        assert!(percentile_ranks(&[]).is_empty());
    }

    #[test]
    fn synthetic_rows_are_deterministic() {
        let a = synthetic_row(&mut ChaCha20Rng::seed_from_u64(9), 0.5);
        let b = synthetic_row(&mut ChaCha20Rng::seed_from_u64(9), 0.5);
        assert_eq!(a, b);
        assert_eq!(a["file_surf_class"], a["file_next_surf"]);
    }

    #[test]
    fn untreated_walk_applies_nothing() {
        let sim = NetworkSimulator::new(false).unwrap();
        let plan = NetworkPlan {
            segments: 6,
            periods: 3,
            apply_treatments: false,
            ..NetworkPlan::default()
        };
        let summary = sim.run(&plan, 42).unwrap();
        assert_eq!(summary.records.len(), 3);
        assert_eq!(summary.treatments_applied(), 0);
        assert!(summary.violations.is_empty(), "{:?}", summary.violations);
    }

    #[test]
    fn empty_plans_are_rejected() {
        let sim = NetworkSimulator::new(false).unwrap();
        let plan = NetworkPlan {
            segments: 0,
            ..NetworkPlan::default()
        };
        assert!(sim.run(&plan, 1).is_err());
    }
}
