use anyhow::{Result, bail, ensure};

use super::network::{NetworkPlan, NetworkSummary};

pub type Expectation = fn(&NetworkSummary) -> Result<()>;

/// A named network walk plus the checks its summary must pass.
#[derive(Clone)]
pub struct NetworkScenario {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub plan: NetworkPlan,
    pub expectations: Vec<Expectation>,
}

impl NetworkScenario {
    fn new(
        key: &'static str,
        name: &'static str,
        description: &'static str,
        plan: NetworkPlan,
    ) -> Self {
        Self {
            key,
            name,
            description,
            plan,
            expectations: vec![no_violations],
        }
    }

    fn with_expectation(mut self, expectation: Expectation) -> Self {
        self.expectations.push(expectation);
        self
    }

    /// Override the horizon and network size from the command line.
    #[must_use]
    pub fn sized(mut self, segments: Option<usize>, periods: Option<i32>) -> Self {
        if let Some(segments) = segments {
            self.plan.segments = segments;
        }
        if let Some(periods) = periods {
            self.plan.periods = periods;
        }
        self
    }

    /// First failed expectation, if any.
    #[must_use]
    pub fn evaluate(&self, summary: &NetworkSummary) -> Option<String> {
        self.expectations
            .iter()
            .find_map(|expectation| expectation(summary).err().map(|e| e.to_string()))
    }
}

pub fn catalog() -> Vec<NetworkScenario> {
    vec![
        NetworkScenario::new(
            "lifecycle",
            "Network Lifecycle",
            "Mixed network, best proposal applied each period",
            NetworkPlan::default(),
        )
        .with_expectation(some_treatment_applied),
        NetworkScenario::new(
            "do-nothing",
            "Do-Nothing Deterioration",
            "Mixed network left untreated for the whole horizon",
            NetworkPlan {
                apply_treatments: false,
                ..NetworkPlan::default()
            },
        )
        .with_expectation(nothing_applied)
        .with_expectation(condition_never_improves),
        NetworkScenario::new(
            "asphalt",
            "Asphalt Network",
            "All-asphalt network exercising the asphalt treatment ladder",
            NetworkPlan {
                asphalt_share: 1.0,
                ..NetworkPlan::default()
            },
        )
        .with_expectation(only_asphalt_or_rehab),
        NetworkScenario::new(
            "chipseal",
            "Chipseal Network",
            "All-chipseal network exercising reseals and pre-seal repairs",
            NetworkPlan {
                asphalt_share: 0.0,
                ..NetworkPlan::default()
            },
        )
        .with_expectation(no_asphalt_treatments),
    ]
}

pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    catalog()
        .into_iter()
        .map(|s| (s.key, s.description))
        .collect()
}

pub fn get_scenario(key: &str) -> Option<NetworkScenario> {
    catalog().into_iter().find(|s| s.key == key)
}

/// Expand `all` into every catalogued scenario key.
pub fn expand_scenarios(requested: &[String]) -> Vec<String> {
    let mut keys: Vec<String> = requested.iter().filter(|k| *k != "all").cloned().collect();
    if requested.iter().any(|k| k == "all") {
        for scenario in catalog() {
            if !keys.iter().any(|k| k == scenario.key) {
                keys.push(scenario.key.to_string());
            }
        }
    }
    keys
}

fn no_violations(summary: &NetworkSummary) -> Result<()> {
    if let Some(first) = summary.violations.first() {
        bail!("{} invariant violation(s), first: {first}", summary.violations.len());
    }
    Ok(())
}

fn some_treatment_applied(summary: &NetworkSummary) -> Result<()> {
    ensure!(
        summary.treatments_applied() > 0,
        "no treatment applied across {} periods",
        summary.records.len()
    );
    Ok(())
}

fn nothing_applied(summary: &NetworkSummary) -> Result<()> {
    ensure!(
        summary.treatments_applied() == 0,
        "{} treatment(s) applied to an untreated network",
        summary.treatments_applied()
    );
    Ok(())
}

fn condition_never_improves(summary: &NetworkSummary) -> Result<()> {
    for pair in summary.records.windows(2) {
        let (before, after) = (&pair[0], &pair[1]);
        ensure!(
            after.mean_pdi + 1e-9 >= before.mean_pdi,
            "mean PDI fell from {:.3} to {:.3} in period {}",
            before.mean_pdi,
            after.mean_pdi,
            after.period
        );
        ensure!(
            after.mean_rut + 1e-9 >= before.mean_rut,
            "mean rut fell from {:.3} to {:.3} in period {}",
            before.mean_rut,
            after.mean_rut,
            after.period
        );
    }
    Ok(())
}

fn only_asphalt_or_rehab(summary: &NetworkSummary) -> Result<()> {
    for record in &summary.records {
        for name in record.treatments.keys() {
            let asphalt = name.contains("AC") || name.starts_with("Rehab_");
            ensure!(asphalt, "{name} applied to an asphalt network in period {}", record.period);
        }
    }
    Ok(())
}

fn no_asphalt_treatments(summary: &NetworkSummary) -> Result<()> {
    for record in &summary.records {
        for name in record.treatments.keys() {
            ensure!(
                !name.contains("AC"),
                "{name} applied to a chipseal network in period {}",
                record.period
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::network::PeriodRecord;
    use std::collections::BTreeMap;

    fn summary(records: Vec<PeriodRecord>) -> NetworkSummary {
        NetworkSummary {
            seed: 1,
            plan: NetworkPlan::default(),
            records,
            violations: Vec::new(),
        }
    }

    #[test]
    fn all_expands_to_the_catalogue() {
        let keys = expand_scenarios(&["lifecycle".to_string(), "all".to_string()]);
        assert_eq!(keys, vec!["lifecycle", "do-nothing", "asphalt", "chipseal"]);
    }

    #[test]
    fn improving_condition_fails_do_nothing() {
        let records = vec![
            PeriodRecord {
                period: 1,
                mean_pdi: 5.0,
                ..PeriodRecord::default()
            },
            PeriodRecord {
                period: 2,
                mean_pdi: 4.0,
                ..PeriodRecord::default()
            },
        ];
        let err = condition_never_improves(&summary(records)).unwrap_err();
        assert!(err.to_string().contains("mean PDI fell"));
    }

    #[test]
    fn violations_fail_every_scenario() {
        let mut s = summary(Vec::new());
        s.violations.push("segment 1 period 2: broken".to_string());
        for scenario in catalog() {
            assert!(scenario.evaluate(&s).is_some(), "{}", scenario.key);
        }
    }

    #[test]
    fn chipseal_network_rejects_asphalt_work() {
        let record = PeriodRecord {
            period: 3,
            treatments: BTreeMap::from([("ThinAC_P".to_string(), 1)]),
            ..PeriodRecord::default()
        };
        assert!(no_asphalt_treatments(&summary(vec![record])).is_err());
    }
}
