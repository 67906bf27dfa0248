use cachesweep::config::{self, experiment::reference_experiments, Experiment, Overrides};
use cachesweep::hierarchy::Outcome;
use cachesweep::trace::{Access, Kind, Recorded, Synthetic};
use cachesweep::{report, simulate, Hierarchy, Level, Runner};
use color_eyre::eyre;
use pretty_assertions_sorted as diff;

fn workload() -> Synthetic {
    Synthetic {
        num_accesses: 20_000,
        data_size: 1024 * 1024,
        ..Synthetic::default()
    }
}

#[test]
fn reference_sweep_keeps_declaration_order() -> eyre::Result<()> {
    let experiments = reference_experiments();
    let rows = Runner::default().run(&experiments, &workload());

    let names: Vec<_> = rows.iter().map(|row| row.name.clone()).collect();
    diff::assert_eq!(
        names,
        vec![
            "Baseline".to_string(),
            "Increased L2".to_string(),
            "Higher Assoc.".to_string(),
            "Larger Blocks".to_string(),
        ]
    );
    for row in &rows {
        assert!(row.result.is_ok(), "{} failed: {:?}", row.name, row.result);
    }

    let mut out = Vec::new();
    report::write_report(&mut out, &rows)?;
    let text = String::from_utf8(out)?;
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), 5);
    assert_eq!(lines[0], report::HEADER);
    assert!(lines[1].starts_with("Baseline | "));
    assert!(lines[1..].iter().all(|line| line.ends_with('%')));
    Ok(())
}

#[test]
fn parallel_and_serial_runs_agree() {
    let experiments = reference_experiments();
    let trace = workload();
    let serial = Runner {
        parallel: false,
        ..Runner::default()
    }
    .run(&experiments, &trace);
    let parallel = Runner {
        parallel: true,
        ..Runner::default()
    }
    .run(&experiments, &trace);
    assert_eq!(serial, parallel);
}

#[test]
fn replay_is_deterministic() -> eyre::Result<()> {
    let config = config::Hierarchy::default();
    let trace = workload();
    let first = simulate(&config, &trace)?;
    let second = simulate(&config, &trace)?;
    assert_eq!(first, second);
    assert_eq!(first.sim.accesses, trace.num_accesses as u64);
    Ok(())
}

#[test]
fn empty_trace_reports_zero() -> eyre::Result<()> {
    let rows = Runner::default().run(&reference_experiments(), &Recorded::default());
    for row in &rows {
        for level in [Level::L1I, Level::L1D, Level::L2] {
            assert_eq!(row.hit_rate_percent(level), Some(0.0));
        }
    }
    let mut out = Vec::new();
    report::write_report(&mut out, &rows[..1])?;
    diff::assert_eq!(
        String::from_utf8(out)?,
        format!("{}\nBaseline | 0.0% | 0.0% | 0.0%\n", report::HEADER)
    );
    Ok(())
}

#[test]
fn invalid_configuration_is_isolated() {
    let mut experiments = reference_experiments();
    experiments.insert(
        1,
        Experiment {
            block_size: Some(96),
            ..Experiment::new("Odd Blocks")
        },
    );
    let rows = Runner::default().run(&experiments, &workload());
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[1].name, "Odd Blocks");
    assert_eq!(
        rows[1].result,
        Err(config::Error::InvalidConfig {
            level: "L1I".to_string(),
            source: config::Invalid::BlockSizeNotPowerOfTwo(96),
        })
    );
    assert_eq!(report::format_row(&rows[1]), "Odd Blocks | n/a | n/a | n/a");
    assert!(rows
        .iter()
        .enumerate()
        .all(|(i, row)| i == 1 || row.result.is_ok()));
}

#[test]
fn oversized_associativity_is_isolated() {
    let mut experiments = reference_experiments();
    experiments.insert(
        2,
        Experiment {
            l2: Overrides {
                associativity: Some(1 << 60),
                ..Overrides::default()
            },
            ..Experiment::new("Huge L2 Assoc.")
        },
    );
    let rows = Runner::default().run(&experiments, &workload());
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[2].name, "Huge L2 Assoc.");
    assert!(
        matches!(
            rows[2].result,
            Err(config::Error::InvalidConfig {
                ref level,
                source: config::Invalid::Indivisible { associativity, .. },
            }) if level == "L2" && associativity == 1 << 60
        ),
        "{:?}",
        rows[2].result
    );
    assert_eq!(
        report::format_row(&rows[2]),
        "Huge L2 Assoc. | n/a | n/a | n/a"
    );
    for (i, row) in rows.iter().enumerate() {
        assert!(i == 2 || row.result.is_ok(), "{} failed: {:?}", row.name, row.result);
    }
}

#[test]
fn counters_stay_consistent_while_stalling() -> eyre::Result<()> {
    let config = config::Hierarchy {
        l1d: config::Cache {
            mshrs: 2,
            tgts_per_mshr: 2,
            ..config::Cache::l1()
        },
        ..config::Hierarchy::default()
    };
    let mut hierarchy = Hierarchy::new(&config)?;
    let mut stats = stats::Collector::with_levels(["L1I", "L1D", "L2"]);
    // streams over distinct blocks, faster than fills return
    let trace: Vec<Access> = (0..256u64)
        .map(|i| Access::new((i % 32) * 4096 + (i % 4) * 8, Kind::Read))
        .collect();

    let mut stalls = 0;
    for access in trace {
        loop {
            match hierarchy.access(access) {
                Outcome::Completed(outcomes) => {
                    for outcome in outcomes {
                        stats.record(outcome.level.name(), access.kind, outcome.status);
                    }
                    break;
                }
                Outcome::Stalled { level, reason } => {
                    stats.record(level.name(), access.kind, reason);
                    stalls += 1;
                    hierarchy.advance();
                }
            }
        }
        hierarchy.advance();

        for (level, summary) in stats.report().iter() {
            assert_eq!(
                summary.accesses,
                summary.hits + summary.misses,
                "{level} after {access}: {summary:?}"
            );
        }
    }
    hierarchy.drain();

    let report = stats.report();
    assert!(stalls > 0);
    assert_eq!(
        report["L1D"].reservation_failures + report["L2"].reservation_failures,
        stalls
    );
    assert_eq!(report["L1D"].accesses, 256);
    Ok(())
}

#[test]
fn counters_are_consistent() -> eyre::Result<()> {
    let config = config::Hierarchy {
        l1d: config::Cache {
            mshrs: 4,
            tgts_per_mshr: 2,
            ..config::Cache::l1()
        },
        ..config::Hierarchy::default()
    };
    let stats = simulate(&config, &workload())?;
    for (level, summary) in stats.caches.iter() {
        assert_eq!(
            summary.accesses,
            summary.hits + summary.misses,
            "{level}: {summary:?}"
        );
    }
    let l1i = &stats.caches["L1I"];
    let l1d = &stats.caches["L1D"];
    let l2 = &stats.caches["L2"];
    assert_eq!(
        (l1i.accesses + l1d.accesses) as u64,
        stats.sim.accesses,
        "every access is counted once at its first level"
    );
    assert_eq!(
        l2.accesses,
        (l1i.misses - l1i.mshr_hits) + (l1d.misses - l1d.mshr_hits),
        "only new first level misses reach the shared level"
    );
    Ok(())
}

#[test]
fn coalesced_misses_share_one_fill() -> eyre::Result<()> {
    // eight reads of the same block issued back to back
    let trace: Recorded = (0..8u64)
        .map(|i| Access {
            requestor: i as usize,
            ..Access::new(0x2000 + i * 8, Kind::Read)
        })
        .collect();
    let stats = simulate(&config::Hierarchy::default(), &trace)?;
    let l1d = &stats.caches["L1D"];
    assert_eq!(l1d.accesses, 8);
    assert_eq!(l1d.misses, 8);
    assert_eq!(l1d.mshr_hits, 7);
    assert_eq!(stats.caches["L2"].accesses, 1);
    assert_eq!(stats.sim.stall_cycles, 0);
    Ok(())
}
