//! Benchmarks for repository scanning and template extraction.
//!
//! Each benchmark runs against a generated repository holding the given
//! number of Helm charts, ArgoCD applications and Kustomize bases, plus
//! some unrelated files the detectors have to walk past.

use std::fs;
use std::path::Path;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use deploy_replicator::config::ReplicatorConfig;
use deploy_replicator::scanner::{ScanOptions, Scanner};
use deploy_replicator::template::TemplateExtractor;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Generate a repository with `count` patterns of every kind.
fn generate_repo(count: usize) -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    for i in 0..count {
        let name = format!("svc{}", i);
        write(
            root,
            &format!("charts/{name}/Chart.yaml"),
            &format!("apiVersion: v2\nname: {name}\nversion: 1.{i}.0\nappVersion: \"2.0\"\n"),
        );
        write(
            root,
            &format!("charts/{name}/values.yaml"),
            &format!("replicaCount: 2\nimage:\n  repository: myorg/{name}\n  tag: \"2.0\"\n"),
        );
        write(
            root,
            &format!("charts/{name}/templates/deployment.yaml"),
            "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: {{ .Release.Name }}\n",
        );
        write(
            root,
            &format!("argocd/{name}.yaml"),
            &format!(
                "apiVersion: argoproj.io/v1alpha1\nkind: Application\nmetadata:\n  name: {name}\n  namespace: argocd\nspec:\n  project: default\n  source:\n    repoURL: https://github.com/acme/{name}.git\n    path: charts/{name}\n  destination:\n    namespace: {name}\n"
            ),
        );
        write(
            root,
            &format!("k8s/{name}/kustomization.yaml"),
            &format!("namespace: {name}\nresources:\n- service.yaml\n"),
        );
        write(
            root,
            &format!("k8s/{name}/service.yaml"),
            &format!("apiVersion: v1\nkind: Service\nmetadata:\n  name: {name}\n"),
        );
        write(root, &format!("src/{name}/main.py"), "print('hello')\n");
        write(root, &format!("node_modules/{name}/Chart.yaml"), "name: ignored\n");
    }
    temp
}

fn bench_scan(c: &mut Criterion) {
    let config = ReplicatorConfig::default();
    let mut group = c.benchmark_group("scan");

    for count in [10, 50, 200] {
        let repo = generate_repo(count);
        let sequential = Scanner::with_default_detectors(&config);
        group.bench_with_input(BenchmarkId::new("sequential", count), &repo, |b, repo| {
            b.iter(|| sequential.scan(black_box(repo.path())))
        });

        let parallel = Scanner::with_default_detectors(&config).with_options(ScanOptions { parallel: true });
        group.bench_with_input(BenchmarkId::new("parallel", count), &repo, |b, repo| {
            b.iter(|| parallel.scan(black_box(repo.path())))
        });
    }

    group.finish();
}

fn bench_extract(c: &mut Criterion) {
    let config = ReplicatorConfig::default();
    let mut group = c.benchmark_group("extract");

    for count in [10, 50] {
        let repo = generate_repo(count);
        let patterns = Scanner::with_default_detectors(&config).scan(repo.path());
        let extractor = TemplateExtractor::new(repo.path(), &config);
        group.bench_with_input(BenchmarkId::new("patterns", patterns.len()), &patterns, |b, patterns| {
            b.iter(|| extractor.extract(black_box(patterns)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_scan, bench_extract);
criterion_main!(benches);
