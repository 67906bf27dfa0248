use crate::config::{self, Experiment};
use crate::hierarchy::{Hierarchy, Level};
use crate::trace::AddressTrace;
use strum::IntoEnumIterator;

/// Result of simulating one configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub name: String,
    pub result: Result<stats::Stats, config::Error>,
}

impl Row {
    /// Hit rate of a level in percent, if the configuration was valid.
    #[must_use]
    pub fn hit_rate_percent(&self, level: Level) -> Option<f64> {
        let stats = self.result.as_ref().ok()?;
        Some(
            stats
                .caches
                .get(level.name())
                .map_or(0.0, stats::Summary::hit_rate_percent),
        )
    }
}

/// Replays `trace` through a fresh hierarchy.
pub fn simulate(
    config: &config::Hierarchy,
    trace: &dyn AddressTrace,
) -> Result<stats::Stats, config::Error> {
    let mut hierarchy = Hierarchy::new(config)?;
    let mut collector = stats::Collector::with_levels(Level::iter().map(Level::name));
    hierarchy.replay(trace, &mut collector);
    Ok(collector.stats())
}

/// Simulates a list of experiments over the same trace.
#[derive(Debug, Clone)]
pub struct Runner {
    pub base: config::Hierarchy,
    /// Run configurations concurrently.
    ///
    /// Only has an effect with the `parallel` feature.
    pub parallel: bool,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new(config::Hierarchy::default())
    }
}

impl Runner {
    #[must_use]
    pub fn new(base: config::Hierarchy) -> Self {
        Self {
            base,
            parallel: cfg!(feature = "parallel"),
        }
    }

    fn run_experiment(&self, experiment: &Experiment, trace: &dyn AddressTrace) -> Row {
        let config = experiment.apply(&self.base);
        log::info!("Beginning simulation for {} configuration!", experiment.name);
        log::debug!("{}: {}", experiment.name, config);

        let start = std::time::Instant::now();
        let result = simulate(&config, trace);
        match &result {
            Ok(stats) => log::info!(
                "Simulation for {} configuration complete. ({} accesses in {} cycles, took {:?})",
                experiment.name,
                stats.sim.accesses,
                stats.sim.cycles,
                start.elapsed(),
            ),
            Err(err) => log::error!("Simulation for {} configuration failed: {}", experiment.name, err),
        }
        Row {
            name: experiment.name.clone(),
            result,
        }
    }

    /// Runs all experiments.
    ///
    /// Each experiment owns its hierarchy and statistics. Rows are returned
    /// in the order of `experiments`, and an invalid configuration only
    /// fails its own row.
    pub fn run(&self, experiments: &[Experiment], trace: &dyn AddressTrace) -> Vec<Row> {
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            if self.parallel {
                return experiments
                    .par_iter()
                    .map(|experiment| self.run_experiment(experiment, trace))
                    .collect();
            }
        }
        experiments
            .iter()
            .map(|experiment| self.run_experiment(experiment, trace))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{simulate, Runner};
    use crate::config::{self, Experiment, Overrides};
    use crate::hierarchy::Level;
    use crate::trace::{Access, Kind, Recorded};
    use color_eyre::eyre;
    use pretty_assertions_sorted as diff;

    #[test]
    fn test_simulate_empty_trace() -> eyre::Result<()> {
        let stats = simulate(&config::Hierarchy::default(), &Recorded::default())?;
        let levels: Vec<_> = stats.caches.keys().cloned().collect();
        diff::assert_eq!(
            levels,
            vec!["L1I".to_string(), "L1D".to_string(), "L2".to_string()]
        );
        for summary in stats.caches.values() {
            assert_eq!(summary.accesses, 0);
            assert_eq!(summary.hit_rate, 0.0);
        }
        assert_eq!(stats.sim.cycles, 0);
        Ok(())
    }

    #[test]
    fn test_invalid_experiment_fails_alone() {
        crate::testing::init_logging();
        let trace: Recorded = (0..16).map(|i| Access::new(i * 64, Kind::Read)).collect();
        let invalid = Experiment {
            l2: Overrides {
                associativity: Some(0),
                ..Overrides::default()
            },
            ..Experiment::new("broken")
        };
        let experiments = vec![Experiment::new("first"), invalid, Experiment::new("last")];
        let rows = Runner::default().run(&experiments, &trace);

        let names: Vec<_> = rows.iter().map(|row| row.name.clone()).collect();
        diff::assert_eq!(
            names,
            vec!["first".to_string(), "broken".to_string(), "last".to_string()]
        );
        assert!(rows[0].result.is_ok());
        assert!(matches!(
            rows[1].result,
            Err(config::Error::InvalidConfig { ref level, .. }) if level == "L2"
        ));
        assert_eq!(rows[1].hit_rate_percent(Level::L2), None);
        assert_eq!(rows[0].result, rows[2].result);
    }

    #[test]
    fn test_default_runner_matches_new() {
        let runner = Runner::default();
        assert_eq!(runner.parallel, cfg!(feature = "parallel"));
        assert_eq!(runner.parallel, Runner::new(runner.base.clone()).parallel);
        assert_eq!(runner.base, config::Hierarchy::default());
    }
}
