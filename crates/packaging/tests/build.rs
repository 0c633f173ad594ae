use lambda_models::LambdaError;
use lambda_packaging::{build_package, BuildOptions, DependencyInstaller, InstallMode};
use lambda_testsupport::{project_fixture, sample_config, zip_entries, zip_entry, FakePackageManager};

#[tokio::test]
async fn freeze_mode_bundles_dependencies_and_sources() {
    let project = project_fixture(&[
        ("helpers.py", "X = 1"),
        ("lib/db/conn.py", "CONN = None"),
        ("notes/readme.md", "not bundled"),
        (".DS_Store", ""),
    ])
    .unwrap();
    let packages = FakePackageManager::new().with_frozen([
        "requests==2.31.0",
        "Python==3.12.0",
        "python-lambda==11.8.0",
    ]);
    let mut config = sample_config("orders");
    config.build.source_directories = Some("lib".into());

    let artifact = build_package(
        &config,
        project.path(),
        &BuildOptions::default(),
        &packages,
    )
    .await
    .unwrap();

    assert_eq!(packages.installed().await, vec!["requests==2.31.0"]);
    assert_eq!(
        zip_entries(&artifact.path).unwrap(),
        vec![
            "helpers.py",
            "lib/db/conn.py",
            "requests/__init__.py",
            "service.py",
        ]
    );
    assert!(zip_entry(&artifact.path, "service.py")
        .unwrap()
        .contains("def handler"));
    assert!(artifact.path.starts_with(project.path().join("dist")));
    assert!(artifact
        .file_name()
        .unwrap()
        .ends_with("-orders.zip"));
    assert_eq!(artifact.size, std::fs::metadata(&artifact.path).unwrap().len());
}

#[tokio::test]
async fn requirements_mode_reads_file_and_appends_local_packages() {
    let project = project_fixture(&[(
        "requirements.txt",
        "# deps\n-e ./vendor/shared\nboto3==1.34.0\n\n",
    )])
    .unwrap();
    let packages = FakePackageManager::new().with_frozen(["ignored==1.0"]);
    let options = BuildOptions {
        mode: InstallMode::Requirements(project.path().join("requirements.txt")),
        local_packages: vec!["./local_pkg".into()],
        output_filename: Some("bundle".into()),
        ..Default::default()
    };

    let artifact = build_package(&sample_config("reqs"), project.path(), &options, &packages)
        .await
        .unwrap();

    assert_eq!(
        packages.installed().await,
        vec!["./vendor/shared", "boto3==1.34.0", "./local_pkg"]
    );
    assert_eq!(artifact.file_name(), Some("bundle.zip"));
    let entries = zip_entries(&artifact.path).unwrap();
    assert!(entries.contains(&"requirements.txt".to_string()));
    assert!(!entries.contains(&"config.yaml".to_string()));
}

#[tokio::test]
async fn missing_requirements_file_installs_nothing() {
    let project = project_fixture(&[]).unwrap();
    let packages = FakePackageManager::new();
    let options = BuildOptions {
        mode: InstallMode::Requirements(project.path().join("requirements.txt")),
        ..Default::default()
    };

    let artifact = build_package(&sample_config("bare"), project.path(), &options, &packages)
        .await
        .unwrap();

    assert!(packages.installed().await.is_empty());
    assert_eq!(zip_entries(&artifact.path).unwrap(), vec!["service.py"]);
}

#[tokio::test]
async fn failed_install_aborts_build_without_artifact() {
    let project = project_fixture(&[]).unwrap();
    let packages = FakePackageManager::new()
        .with_frozen(["good==1.0", "broken==0.1", "never==2.0"])
        .failing_on("broken==0.1");

    let err = build_package(
        &sample_config("fails"),
        project.path(),
        &BuildOptions::default(),
        &packages,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, LambdaError::DependencyInstallError { ref package, .. } if package == "broken==0.1"));
    assert_eq!(packages.installed().await, vec!["good==1.0", "broken==0.1"]);
    let dist = project.path().join("dist");
    let leftovers = std::fs::read_dir(&dist)
        .map(|entries| entries.count())
        .unwrap_or(0);
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn namespace_package_gets_init_marker() {
    let target = tempfile::tempdir().unwrap();
    let packages = FakePackageManager::new()
        .with_frozen(["zope.interface==6.0"])
        .as_namespace("zope");

    let report = DependencyInstaller::new(&packages)
        .install(target.path(), &InstallMode::Freeze, &[])
        .await
        .unwrap();

    assert_eq!(report.namespace_fixes, vec!["zope".to_string()]);
    assert!(target.path().join("zope/__init__.py").exists());
}
