//! `curalink doctor`: Diagnose configuration health.

use anyhow::Result;
use curalink_config::AppConfig;

pub fn run() -> Result<()> {
    println!("CuraLink Doctor - Diagnostics");
    println!("=============================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if !config_path.exists() {
        println!("  ⚠️  No config file - defaults in use (run `curalink onboard`)");
        issues += 1;
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  Fix the config file and re-run.");
            return Ok(());
        }
    };

    if config.has_api_key() {
        println!("  ✅ API key configured for '{}'", config.default_provider);
    } else {
        println!("  ⚠️  No API key - flows will only return their fallbacks");
        issues += 1;
    }

    let router = curalink_providers::build_from_config(&config);
    println!("  ✅ Providers: {}", router.list().join(", "));
    println!("  ✅ Model: {}", config.default_model);

    match config.storage.backend.as_str() {
        "file" => {
            let path = config.storage.file_path();
            match curalink_store::FileStore::open(path.clone()) {
                Ok(_) => println!("  ✅ Store readable: {}", path.display()),
                Err(e) => {
                    println!("  ❌ Store unreadable: {e}");
                    issues += 1;
                }
            }
        }
        backend => println!("  ✅ Store: {backend} (records are lost on exit)"),
    }

    println!(
        "  ✅ Directory: {} departments, {} doctors",
        config.directory.departments.len(),
        config.directory.doctors.len()
    );

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
