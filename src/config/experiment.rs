use super::{size, Cache, Hierarchy, LoadError, Size};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Per-level geometry overrides.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Overrides {
    pub size: Option<Size>,
    pub associativity: Option<usize>,
    pub block_size: Option<u32>,
}

impl Overrides {
    fn apply(&self, cache: &mut Cache) {
        if let Some(size) = self.size {
            cache.size = size;
        }
        if let Some(associativity) = self.associativity {
            cache.associativity = associativity;
        }
        if let Some(block_size) = self.block_size {
            cache.block_size = block_size;
        }
    }
}

/// A named experiment configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Experiment {
    pub name: String,
    /// Block size of every level, applied before per-level overrides.
    #[serde(default)]
    pub block_size: Option<u32>,
    #[serde(default)]
    pub l1i: Overrides,
    #[serde(default)]
    pub l1d: Overrides,
    #[serde(default)]
    pub l2: Overrides,
}

impl Experiment {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            block_size: None,
            l1i: Overrides::default(),
            l1d: Overrides::default(),
            l2: Overrides::default(),
        }
    }

    /// Applies this experiment on top of a base hierarchy.
    #[must_use]
    pub fn apply(&self, base: &Hierarchy) -> Hierarchy {
        let mut config = base.clone();
        for (cache, overrides) in [
            (&mut config.l1i, &self.l1i),
            (&mut config.l1d, &self.l1d),
            (&mut config.l2, &self.l2),
        ] {
            if let Some(block_size) = self.block_size {
                cache.block_size = block_size;
            }
            overrides.apply(cache);
        }
        config
    }
}

/// The four reference experiments: a baseline and one variation each
/// of the shared cache size, its associativity, and the block size.
#[must_use]
pub fn reference_experiments() -> Vec<Experiment> {
    let l2 = |size: u64, associativity: usize| Overrides {
        size: Some(Size(size)),
        associativity: Some(associativity),
        block_size: None,
    };
    vec![
        Experiment {
            block_size: Some(64),
            l2: l2(256 * size::KIB, 16),
            ..Experiment::new("Baseline")
        },
        Experiment {
            block_size: Some(64),
            l2: l2(size::MIB, 16),
            ..Experiment::new("Increased L2")
        },
        Experiment {
            block_size: Some(64),
            l2: l2(256 * size::KIB, 32),
            ..Experiment::new("Higher Assoc.")
        },
        Experiment {
            block_size: Some(128),
            l2: l2(256 * size::KIB, 16),
            ..Experiment::new("Larger Blocks")
        },
    ]
}

/// A sweep over experiment configurations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sweep {
    #[serde(default)]
    pub base: Hierarchy,
    #[serde(default = "reference_experiments")]
    pub experiments: Vec<Experiment>,
}

impl Default for Sweep {
    fn default() -> Self {
        Self {
            base: Hierarchy::default(),
            experiments: reference_experiments(),
        }
    }
}

impl Sweep {
    pub fn from_reader(reader: impl std::io::Read) -> Result<Self, LoadError> {
        let sweep = serde_yaml::from_reader(reader)?;
        Ok(sweep)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let file = std::fs::OpenOptions::new()
            .read(true)
            .open(path)
            .map_err(|source| LoadError::OpenFile {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_reader(std::io::BufReader::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::{reference_experiments, Experiment, Overrides, Sweep};
    use crate::config::{Hierarchy, Size};
    use color_eyre::eyre;
    use pretty_assertions_sorted as diff;

    #[test]
    fn test_reference_experiments() {
        let base = Hierarchy::default();
        let configs: Vec<_> = reference_experiments()
            .iter()
            .map(|experiment| {
                let config = experiment.apply(&base);
                (
                    experiment.name.clone(),
                    config.l2.size,
                    config.l2.associativity,
                    config.l1i.block_size,
                    config.l1d.block_size,
                    config.l2.block_size,
                )
            })
            .collect();
        diff::assert_eq!(
            configs,
            vec![
                ("Baseline".to_string(), Size(256 * 1024), 16, 64, 64, 64),
                ("Increased L2".to_string(), Size(1024 * 1024), 16, 64, 64, 64),
                ("Higher Assoc.".to_string(), Size(256 * 1024), 32, 64, 64, 64),
                ("Larger Blocks".to_string(), Size(256 * 1024), 16, 128, 128, 128),
            ]
        );
    }

    #[test]
    fn test_per_level_override_wins() {
        let experiment = Experiment {
            block_size: Some(128),
            l1d: Overrides {
                block_size: Some(32),
                ..Overrides::default()
            },
            ..Experiment::new("mixed")
        };
        let config = experiment.apply(&Hierarchy::default());
        assert_eq!(config.l1i.block_size, 128);
        assert_eq!(config.l1d.block_size, 32);
        assert_eq!(config.l2.block_size, 128);
    }

    #[test]
    fn test_parse_sweep() -> eyre::Result<()> {
        let sweep = Sweep::from_reader(
            r#"
experiments:
  - name: Small L1D
    l1d: { size: 16kB, associativity: 4 }
  - name: Direct mapped L2
    block_size: 64
    l2: { associativity: 1 }
"#
            .as_bytes(),
        )?;
        assert_eq!(sweep.base, Hierarchy::default());
        let names: Vec<_> = sweep.experiments.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["Small L1D", "Direct mapped L2"]);
        assert_eq!(sweep.experiments[0].l1d.size, Some(Size(16 * 1024)));
        assert_eq!(sweep.experiments[1].l2.associativity, Some(1));
        Ok(())
    }

    #[test]
    fn test_empty_sweep_uses_reference_experiments() -> eyre::Result<()> {
        let sweep = Sweep::from_reader("{}".as_bytes())?;
        assert_eq!(sweep, Sweep::default());
        Ok(())
    }

    #[test]
    fn test_unknown_override_is_rejected() {
        let sweep = Sweep::from_reader(
            r"
experiments:
  - name: typo
    l2: { assoc: 32 }
"
            .as_bytes(),
        );
        assert!(sweep.is_err());
    }
}
