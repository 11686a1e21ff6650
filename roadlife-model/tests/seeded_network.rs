use std::collections::HashMap;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use roadlife_model::roughness::exceedance_reset;
use roadlife_model::{
    DistressKind, HostSchedule, ParamValue, ParameterMap, RoadModel, evaluate_candidate,
};

const SEGMENTS: i32 = 40;
const PERIODS: i32 = 8;

const ONRC: [&str; 7] = [
    "National",
    "Regional",
    "Arterial",
    "Primary Collector",
    "Secondary Collector",
    "Access",
    "Low Volume",
];

fn random_row(rng: &mut ChaCha20Rng) -> HashMap<String, String> {
    let asphalt = rng.gen_bool(0.35);
    let (class, material) = if asphalt {
        ("ac", *["ac10", "ac14"].choose(rng).unwrap())
    } else {
        ("cs", *["g3", "g35"].choose(rng).unwrap())
    };
    let length = rng.gen_range(50.0..800.0_f64).round();
    let width = rng.gen_range(5.0..12.0_f64);
    let mut row: HashMap<String, String> = HashMap::new();
    let mut put = |key: &str, value: String| {
        row.insert(key.to_string(), value);
    };
    put("file_seg_name", format!("Seg {}", rng.gen_range(1..9999)));
    put("file_section_id", "1".to_string());
    put("file_section_name", "Sweep Rd".to_string());
    put("file_loc_from", "0".to_string());
    put("file_loc_to", length.to_string());
    put("file_lane_name", "L1".to_string());
    put("file_length", length.to_string());
    put("file_area_m2", (length * width).to_string());
    put("file_is_roundabout_flag", "0".to_string());
    put("file_can_treat_flag", "1".to_string());
    put("file_can_rehab_flag", rng.gen_bool(0.5).to_string());
    put("file_ac_ok_flag", "1".to_string());
    put("file_earliest_treat_period", rng.gen_range(1..4).to_string());
    put("file_urban_rural", (*["U", "R"].choose(rng).unwrap()).to_string());
    put("file_onrc", (*ONRC.choose(rng).unwrap()).to_string());
    put("file_adt", rng.gen_range(50..20_000).to_string());
    put("file_heavy_perc", rng.gen_range(0.0..25.0_f64).to_string());
    put("file_no_of_bus_routes", rng.gen_range(0..4).to_string());
    put("file_traff_growth_perc", rng.gen_range(0.0..3.0_f64).to_string());
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
    put("file_su_fault_qty", rng.gen_range(0.0..20.0_f64).to_string());
    put("file_pa_fault_qty", rng.gen_range(0.0..20.0_f64).to_string());
    put("file_roughsegment_date", "01/07/2023".to_string());
    put("file_naasra_85", rng.gen_range(40.0..160.0_f64).to_string());
    put("file_hsd_date", "01/07/2023".to_string());
    put("file_rut_lwpmean_85", rng.gen_range(2.0..20.0_f64).to_string());
    put("file_rut_rwpmean_85", rng.gen_range(2.0..20.0_f64).to_string());
    put("file_cond_survey_date", "01/07/2023".to_string());
    for column in [
        "file_pct_flush",
        "file_pct_edgebreak",
        "file_pct_scabb",
        "file_pct_lt_crax",
        "file_pct_allig",
        "file_pct_shove",
        "file_pct_poth",
    ] {
        put(column, rng.gen_range(0.0..20.0_f64).to_string());
    }
    row
}

fn number(map: &ParameterMap, key: &str) -> f64 {
    map.get(key)
        .and_then(ParamValue::as_number)
        .unwrap_or_else(|| panic!("{key} should be numeric"))
}

/// Walk every segment through the horizon, applying the best-scoring proposal.
fn sweep(seed: u64, mut check: impl FnMut(i32, i32, &ParameterMap, &HostSchedule)) {
    let model = RoadModel::with_defaults().unwrap();
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    for element_index in 0..SEGMENTS {
        let row = random_row(&mut rng);
        let mut schedule = HostSchedule::default();
        let mut map = model.initialise(element_index, &row, &schedule).unwrap();
        check(element_index, 0, &map, &schedule);

        for period in 1..=PERIODS {
            map.insert(
                "para_pdi_rank".to_string(),
                ParamValue::Number(rng.gen_range(0.0..100.0)),
            );
            map.insert(
                "para_sdi_rank".to_string(),
                ParamValue::Number(rng.gen_range(0.0..100.0)),
            );
            let proposals = model
                .treatment_candidates(element_index, &map, period, &schedule)
                .unwrap();
            let chosen = proposals
                .iter()
                .max_by(|a, b| a.score.total_cmp(&b.score))
                .map(|p| p.treatment.clone());

            map = match chosen.as_deref() {
                Some(name) => {
                    schedule.periods_since_last_treatment = 0;
                    schedule.last_treatment = Some(name.to_string());
                    model
                        .reset(element_index, &map, period, Some(name), &schedule)
                        .unwrap()
                }
                None => {
                    schedule.periods_since_last_treatment =
                        schedule.periods_since_last_treatment.saturating_add(1);
                    model.increment(element_index, &map, period, &schedule).unwrap()
                }
            };
            check(element_index, period, &map, &schedule);
        }
    }
}

#[test]
fn surface_life_achieved_is_capped() {
    sweep(0x5EED_0001, |_, _, map, _| {
        let sla = number(map, "para_surf_life_ach");
        assert!((0.0..=200.0).contains(&sla), "SLA out of range: {sla}");
    });
}

#[test]
fn stored_verdict_matches_a_fresh_evaluation() {
    let model = RoadModel::with_defaults().unwrap();
    let thresholds = &model.context().constants().candidate;
    sweep(0x5EED_0002, |element_index, period, map, schedule| {
        let segment = model.load(element_index, map, period).unwrap();
        let first = evaluate_candidate(&segment, period, schedule, thresholds).unwrap();
        let second = evaluate_candidate(&segment, period, schedule, thresholds).unwrap();
        assert_eq!(first, second);
        assert_eq!(map["para_csl_flag"], ParamValue::flag(first.accepted));
        assert_eq!(map["para_csl_status"], ParamValue::text(first.outcome()));
    });
}

#[test]
fn treatments_clear_visible_distress() {
    let mut treated = 0;
    sweep(0x5EED_0003, |_, period, map, schedule| {
        if period == 0 || schedule.periods_since_last_treatment != 0 {
            return;
        }
        treated += 1;
        for kind in DistressKind::ALL {
            let pct = number(map, &kind.percent_parameter());
            assert!(pct.abs() < f64::EPSILON, "{kind:?} left at {pct}");
        }
        let is_preseal = schedule.last_treatment.as_deref() == Some("PreSeal");
        assert_eq!(number(map, "para_surf_age").abs() < f64::EPSILON, !is_preseal);
    });
    assert!(treated > 0, "sweep applied no treatments");
}

#[test]
fn treatment_counts_never_decrease() {
    let mut last: HashMap<i32, f64> = HashMap::new();
    sweep(0x5EED_0004, |element_index, _, map, _| {
        let count = number(map, "para_treat_count");
        let previous = last.insert(element_index, count).unwrap_or(0.0);
        assert!(count >= previous);
    });
}

#[test]
fn exceedance_reset_only_trims_the_excess() {
    assert!((exceedance_reset(12.0, 8.0, 0.5) - 10.0).abs() < 1e-12);
    assert!((exceedance_reset(6.0, 8.0, 0.5) - 6.0).abs() < 1e-12);
    assert!((exceedance_reset(12.0, 8.0, 1.0) - 8.0).abs() < 1e-12);
}
