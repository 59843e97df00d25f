//! Benchmarks for template resolution, artifact queries and pipeline execution.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use releaseflow::artifact::{Artifact, ArtifactKind, Platform, PlatformFilter, Selection};
use releaseflow::pipeline::{PipelineBuilder, StageGroup};
use releaseflow::stages::NoOpStage;
use releaseflow::template::TemplateResolver;
use releaseflow::testing::TestContext;

fn template_benchmark(c: &mut Criterion) {
    let ctx = TestContext::new().build();
    let artifact = Artifact::new("app", "app", "dist/app", ArtifactKind::Binary)
        .with_platform(Platform::new("linux", "arm").with_arm("7"));
    let resolver = TemplateResolver::new(&ctx).with_artifact(&artifact);

    c.bench_function("template_archive_name", |b| {
        b.iter(|| {
            resolver
                .apply(black_box(
                    "{{ .ProjectName }}_{{ .Version }}_{{ .Os }}_{{ .Arch }}{{ if .Arm }}v{{ .Arm }}{{ end }}",
                ))
                .unwrap()
        });
    });

    c.bench_function("template_functions", |b| {
        b.iter(|| {
            resolver
                .apply(black_box(
                    "{{ .Tag | trimprefix \"v\" | toupper }}-{{ .ShortCommit | replace \"a\" \"b\" }}",
                ))
                .unwrap()
        });
    });
}

fn artifact_benchmark(c: &mut Criterion) {
    let ctx = TestContext::new().build();
    for (i, os) in ["linux", "darwin", "windows", "freebsd"].iter().enumerate() {
        for arch in ["amd64", "arm64", "386"] {
            for id in 0..8 {
                let name = format!("app{id}_{os}_{arch}");
                let kind = if i % 2 == 0 { ArtifactKind::Binary } else { ArtifactKind::PlatformPackage };
                ctx.artifacts()
                    .register(
                        Artifact::new(format!("app{id}"), name.clone(), format!("dist/{name}"), kind)
                            .with_platform(Platform::new(*os, arch)),
                    )
                    .unwrap();
            }
        }
    }

    let selection = Selection::all()
        .with_ids(["app1", "app3"])
        .with_kinds([ArtifactKind::Binary])
        .with_platform(PlatformFilter::any().os("linux"));

    c.bench_function("artifact_query", |b| {
        b.iter(|| ctx.artifacts().query(black_box(&selection)));
    });

    c.bench_function("artifact_group_by_platform", |b| {
        b.iter(|| ctx.artifacts().group_by_platform(black_box(&Selection::all())));
    });
}

fn pipeline_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    c.bench_function("pipeline_noop_stages", |b| {
        b.iter(|| {
            let group = (0..16).fold(StageGroup::concurrent("noop", 4), |g, i| {
                g.with_stage(NoOpStage::new(format!("noop-{i}")))
            });
            let mut pipeline = PipelineBuilder::new("bench")
                .group(group)
                .unwrap()
                .build()
                .unwrap();
            let ctx = TestContext::new().build();
            runtime.block_on(pipeline.run(&ctx))
        });
    });
}

criterion_group!(benches, template_benchmark, artifact_benchmark, pipeline_benchmark);
criterion_main!(benches);
