//! Criterion benchmarks for the classification and sequential update paths.
//!
//! Everything runs in memory against built-in priors so results are stable
//! across machines.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use vp_config::{OverflowPolicy, Priors};
use vp_core::evidence::{EvidenceVector, Proximity};
use vp_core::inference::classify;
use vp_core::sequential::{ModelState, SequentialUpdater};
use vp_math::{LikelihoodRatio, Scale};

fn clinic_visit() -> EvidenceVector {
    EvidenceVector::new()
        .with_proximity(Proximity::VeryClose)
        .with_confirmation(true)
        .with_prescription(true)
        .with_device_data(false)
}

fn telehealth_visit() -> EvidenceVector {
    EvidenceVector::new()
        .with_proximity(Proximity::Far)
        .with_confirmation(false)
        .with_device_data(true)
}

fn bench_classify(c: &mut Criterion) {
    let priors = Priors::default();
    let mut group = c.benchmark_group("classify");

    for (name, evidence) in [
        ("clinic", clinic_visit()),
        ("telehealth", telehealth_visit()),
        ("empty", EvidenceVector::new()),
    ] {
        group.bench_with_input(BenchmarkId::new("classify", name), &evidence, |b, ev| {
            b.iter(|| {
                let trace = classify(black_box(&priors), black_box(ev)).expect("classifies");
                black_box(trace.result.posterior);
            })
        });
    }

    // Every combination of the four channels, including absent ones.
    let mut evidences = Vec::with_capacity(5 * 27);
    let flags = [None, Some(true), Some(false)];
    for proximity in [None]
        .into_iter()
        .chain(Proximity::ALL.into_iter().map(Some))
    {
        for confirmation in flags {
            for prescription in flags {
                for device_data in flags {
                    evidences.push(EvidenceVector {
                        proximity,
                        confirmation,
                        prescription,
                        device_data,
                    });
                }
            }
        }
    }

    group.bench_function("classify_all_combinations", |b| {
        b.iter(|| {
            let mut pph = 0u64;
            for ev in &evidences {
                if let Ok(trace) = classify(&priors, black_box(ev)) {
                    pph += u64::from(trace.result.posterior.pph);
                }
            }
            black_box(pph);
        })
    });

    group.finish();
}

fn bench_sequential(c: &mut Criterion) {
    let updater = SequentialUpdater::new(Scale::BASIS_POINTS, OverflowPolicy::Saturate);
    let ids: Vec<String> = (0..256).map(|i| format!("visit-{i}")).collect();

    c.bench_function("sequential_submit_256", |b| {
        b.iter(|| {
            let mut state = ModelState::initial(Scale::BASIS_POINTS);
            for (i, id) in ids.iter().enumerate() {
                let ratio = LikelihoodRatio::new(5_000 + (i as u32 % 11) * 1_000);
                state = updater
                    .submit(&state, id, ratio)
                    .expect("fresh identifiers")
                    .state;
            }
            black_box(state.posterior);
        })
    });
}

criterion_group!(benches, bench_classify, bench_sequential);
criterion_main!(benches);
