use lambda_deploy::templates::{init, TEMPLATE_FILES};
use lambda_deploy::{read_config, ConfigOverrides, DEFAULT_CONFIG_FILE};

#[test]
fn init_writes_starter_project() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let project = dir.path().join("hello");

    let written = init(&project, false)?;
    assert_eq!(written.len(), TEMPLATE_FILES.len());
    for name in TEMPLATE_FILES {
        assert!(project.join(name).is_file(), "{name} missing");
    }

    let config = read_config(&project, DEFAULT_CONFIG_FILE, &ConfigOverrides::default())?;
    assert_eq!(config.function_name, "my_lambda_function");
    Ok(())
}

#[test]
fn minimal_init_skips_event() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    init(dir.path(), true)?;
    assert!(dir.path().join("service.py").exists());
    assert!(!dir.path().join("event.json").exists());
    Ok(())
}

#[test]
fn init_keeps_existing_files() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::write(dir.path().join("service.py"), "# mine\n")?;

    let written = init(dir.path(), false)?;

    assert!(!written.contains(&dir.path().join("service.py")));
    assert_eq!(std::fs::read_to_string(dir.path().join("service.py"))?, "# mine\n");
    Ok(())
}
