//! Library-level tests of the scan → extract → store → apply pipeline.
//!
//! These run the public API against real directories and check the
//! properties the pipeline guarantees: idempotent re-application, lossless
//! template storage, deterministic scans, path safety, side-effect free dry
//! runs and conflict handling.

mod common;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use common::TestFixture;
use deploy_replicator::applicator::{Applicator, ApplyOptions, ApplyResult, ApplyStatus};
use deploy_replicator::config::ReplicatorConfig;
use deploy_replicator::pattern::{PatternKind, PatternRef};
use deploy_replicator::scanner::{ScanOptions, Scanner};
use deploy_replicator::template::{load_templates, save_templates, Template, TemplateExtractor};

fn replicate(source: &Path, target: &Path, options: &ApplyOptions) -> Vec<ApplyResult> {
    let config = ReplicatorConfig::default();
    let patterns = Scanner::with_default_detectors(&config).scan(source);
    let templates = TemplateExtractor::new(source, &config).extract(&patterns);
    assert_eq!(templates.len(), patterns.len(), "every pattern should extract");
    Applicator::with_defaults(&config).apply(&templates, target, options)
}

fn forced() -> ApplyOptions {
    ApplyOptions {
        force: true,
        ..Default::default()
    }
}

#[test]
fn test_second_apply_skips_everything_applied_first() {
    let fixture = TestFixture::new()
        .with_helm_chart("charts/demo")
        .with_argocd_app("argocd/app.yaml")
        .with_kustomize_base("k8s/base")
        .with_target("new-service");

    let first = replicate(&fixture.source(), &fixture.target(), &ApplyOptions::default());
    assert_eq!(first.len(), 3);
    assert!(
        first.iter().all(|r| r.status == ApplyStatus::Applied),
        "first run: {first:?}"
    );
    let files_after_first = fixture.target_files();

    let second = replicate(&fixture.source(), &fixture.target(), &ApplyOptions::default());
    assert_eq!(second.len(), 3);
    for result in &second {
        assert_eq!(result.status, ApplyStatus::SkippedExists, "{result:?}");
        assert!(result.written_paths.is_empty());
    }
    assert_eq!(fixture.target_files(), files_after_first);
}

#[test]
fn test_saved_templates_load_back_identical() {
    let fixture = TestFixture::new()
        .with_helm_chart("charts/demo")
        .with_argocd_app("deploy/argocd/payments.yaml")
        .with_kustomize_base("k8s/base")
        .with_file("k8s/overlays/prod/kustomization.yaml", "resources:\n- ../../base\nnamePrefix: prod-\n");

    let config = ReplicatorConfig::default();
    let patterns = Scanner::with_default_detectors(&config).scan(&fixture.source());
    let templates = TemplateExtractor::new(fixture.source(), &config).extract(&patterns);
    assert_eq!(templates.len(), 4);

    save_templates(&templates, &fixture.templates()).unwrap();
    let mut loaded = load_templates(&fixture.templates()).unwrap();
    let mut expected = templates.clone();
    let key = |t: &Template| (t.kind(), t.source().name.clone(), t.destination().to_string());
    loaded.sort_by_key(key);
    expected.sort_by_key(key);

    assert_eq!(loaded.len(), expected.len());
    for (loaded, expected) in loaded.iter().zip(&expected) {
        assert_eq!(loaded.source(), expected.source());
        assert_eq!(loaded.files(), expected.files());
        assert_eq!(loaded.variables(), expected.variables());
        assert_eq!(loaded, expected);
    }
}

#[test]
fn test_template_store_inside_source_tracks_the_latest_scan() {
    let fixture = TestFixture::new()
        .with_helm_chart("charts/a")
        .with_helm_chart("charts/b");
    let source = fixture.source();
    let store = source.join("deploy-templates");

    let config = ReplicatorConfig::default();
    let scanner = Scanner::with_default_detectors(&config);
    let extractor = TemplateExtractor::new(&source, &config);

    let patterns = scanner.scan(&source);
    assert_eq!(patterns.len(), 2);
    save_templates(&extractor.extract(&patterns), &store).unwrap();
    assert_eq!(scanner.scan(&source), patterns);

    fs::remove_dir_all(source.join("charts/b")).unwrap();
    let patterns = scanner.scan(&source);
    assert_eq!(patterns.len(), 1);
    assert_eq!(patterns[0].path, PathBuf::from("charts/a"));
    save_templates(&extractor.extract(&patterns), &store).unwrap();

    let loaded = load_templates(&store).unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].source().name, "demo");
}

#[test]
fn test_repeated_scans_are_identical() {
    let fixture = TestFixture::new()
        .with_helm_chart("charts/demo")
        .with_helm_chart("charts/other")
        .with_argocd_app("argocd/app.yaml")
        .with_kustomize_base("k8s/base");

    let config = ReplicatorConfig::default();
    let scanner = Scanner::with_default_detectors(&config);
    let first = scanner.scan(&fixture.source());
    let second = scanner.scan(&fixture.source());
    assert_eq!(first, second);

    let parallel = Scanner::with_default_detectors(&config)
        .with_options(ScanOptions { parallel: true })
        .scan(&fixture.source());
    assert_eq!(first, parallel);

    let kinds: Vec<PatternKind> = first.iter().map(|p| p.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            PatternKind::Helm,
            PatternKind::Helm,
            PatternKind::Argocd,
            PatternKind::Kustomize
        ]
    );
}

#[test]
fn test_destination_escaping_target_fails_and_writes_nothing() {
    let fixture = TestFixture::new().with_target("new-service");
    let template = Template::new(
        PatternRef {
            kind: PatternKind::Kustomize,
            name: "escape".to_string(),
        },
        "escape",
        "${where}",
        BTreeMap::from([("kustomization.yaml".to_string(), "resources: []\n".to_string())]),
        BTreeMap::new(),
    )
    .unwrap();
    let options = ApplyOptions {
        overrides: BTreeMap::from([("where".to_string(), "../stolen".to_string())]),
        ..Default::default()
    };

    let config = ReplicatorConfig::default();
    let results = Applicator::with_defaults(&config).apply(&[template], &fixture.target(), &options);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].status, ApplyStatus::Failed);
    assert!(results[0].message.contains("Write error"), "{}", results[0].message);
    assert!(!fixture.path().join("stolen").exists());
    assert!(fixture.target_files().is_empty());
}

#[test]
fn test_dry_run_leaves_target_empty() {
    let fixture = TestFixture::new()
        .with_file("charts/demo/Chart.yaml", "name: demo\nversion: 1.0.0\n")
        .with_file("charts/demo/values.yaml", "replicaCount: 1\n")
        .with_target("new-service");
    let options = ApplyOptions {
        dry_run: true,
        ..Default::default()
    };

    let results = replicate(&fixture.source(), &fixture.target(), &options);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].status, ApplyStatus::SkippedDryRun);
    assert_eq!(
        results[0].written_paths,
        vec![
            PathBuf::from("charts/new-service/Chart.yaml"),
            PathBuf::from("charts/new-service/values.yaml"),
        ]
    );
    assert_eq!(fs::read_dir(fixture.target()).unwrap().count(), 0);
}

#[test]
fn test_argocd_application_replicates_under_target_name() {
    let fixture = TestFixture::new()
        .with_argocd_app("argocd/app.yaml")
        .with_target("new-service");

    let config = ReplicatorConfig::default();
    let patterns = Scanner::with_default_detectors(&config).scan(&fixture.source());
    assert_eq!(patterns.len(), 1);
    assert_eq!(patterns[0].kind(), PatternKind::Argocd);
    assert_eq!(patterns[0].name, "payments");

    let results = replicate(&fixture.source(), &fixture.target(), &forced());
    assert_eq!(results[0].status, ApplyStatus::Applied, "{:?}", results[0]);
    assert_eq!(results[0].written_paths, vec![PathBuf::from("argocd/application.yaml")]);

    let written = fs::read_to_string(fixture.target().join("argocd/application.yaml")).unwrap();
    assert!(written.starts_with("apiVersion: argoproj.io/v1alpha1\nkind: Application\n"));
    let manifest: serde_yaml::Value = serde_yaml::from_str(&written).unwrap();
    assert_eq!(manifest["metadata"]["name"].as_str(), Some("new-service"));
    assert_eq!(manifest["metadata"]["namespace"].as_str(), Some("argocd"));
    assert_eq!(manifest["spec"]["destination"]["namespace"].as_str(), Some("new-service"));
    assert_eq!(manifest["spec"]["project"].as_str(), Some("default"));
}

#[test]
fn test_existing_chart_is_kept_unless_forced_then_replaced() {
    let fixture = TestFixture::new()
        .with_file("charts/demo/Chart.yaml", "name: demo\nversion: 1.0.0\n")
        .with_target("new-service")
        .with_target_file("charts/demo/Chart.yaml", "name: demo\nversion: 0.1.0\n");
    let original = fs::read_to_string(fixture.target().join("charts/demo/Chart.yaml")).unwrap();

    let results = replicate(&fixture.source(), &fixture.target(), &ApplyOptions::default());
    assert_eq!(results[0].status, ApplyStatus::SkippedExists);
    assert!(results[0].written_paths.is_empty());
    assert_eq!(fixture.target_files(), vec!["charts/demo/Chart.yaml"]);
    assert_eq!(
        fs::read_to_string(fixture.target().join("charts/demo/Chart.yaml")).unwrap(),
        original
    );

    let results = replicate(&fixture.source(), &fixture.target(), &forced());
    assert_eq!(results[0].status, ApplyStatus::Applied);
    assert_eq!(results[0].written_paths, vec![PathBuf::from("charts/demo/Chart.yaml")]);
    assert_eq!(fixture.target_files(), vec!["charts/demo/Chart.yaml"]);
    assert_eq!(
        fs::read_to_string(fixture.target().join("charts/demo/Chart.yaml")).unwrap(),
        "name: demo\nversion: 1.0.0\n"
    );
}

#[test]
fn test_forced_apply_overwrites_matching_files() {
    let fixture = TestFixture::new()
        .with_kustomize_base("k8s/base")
        .with_target("new-service")
        .with_target_file("k8s/base/kustomization.yaml", "resources: []\n");

    let results = replicate(&fixture.source(), &fixture.target(), &ApplyOptions::default());
    assert_eq!(results[0].status, ApplyStatus::SkippedExists);

    let results = replicate(&fixture.source(), &fixture.target(), &forced());
    assert_eq!(results[0].status, ApplyStatus::Applied);
    let kustomization = fs::read_to_string(fixture.target().join("k8s/base/kustomization.yaml")).unwrap();
    assert_eq!(kustomization, "namespace: new-service\nresources:\n- deployment.yaml\n");
}

#[test]
fn test_overrides_win_over_target_values() {
    let fixture = TestFixture::new()
        .with_helm_chart("charts/demo")
        .with_target("new-service");
    let options = ApplyOptions {
        overrides: BTreeMap::from([
            ("app_name".to_string(), "billing".to_string()),
            ("image_tag".to_string(), "9.9".to_string()),
        ]),
        ..Default::default()
    };

    let results = replicate(&fixture.source(), &fixture.target(), &options);
    assert_eq!(results[0].status, ApplyStatus::Applied);
    let values = fs::read_to_string(fixture.target().join("charts/billing/values.yaml")).unwrap();
    assert!(values.contains("tag: \"9.9\""), "{values}");
    // image_repository is derived from the target name, not the override.
    assert!(values.contains("repository: myorg/new-service"), "{values}");
}
