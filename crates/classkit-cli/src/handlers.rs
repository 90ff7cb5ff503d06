//! Command handlers.

use crate::client::AdminClient;
use crate::config::{CliConfig, OutputFormat};
use chrono::Utc;
use classkit_core::feature::ActionKind;
use classkit_core::ids::LicenseCode;
use classkit_core::license::{ActivationOutcome, LicenseCheck, LicenseStats};
use classkit_core::ports::{KeyValueStore, LicenseAuthority};
use classkit_core::trial::format_days_remaining;
use classkit_db::{FileKeyValueStore, FileLicenseStore};
use classkit_licensing::codes::{self, CustomerRequest};
use classkit_licensing::{
    DeviceIdentity, DeviceInfo, FeatureGate, GatePolicy, HttpLicenseAuthority, LicenseManager,
    LicenseRegistry, RemoteConfig, TrialClock,
};
use console::style;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Print `value` as JSON or YAML, or run `table` for the human format.
fn emit<T: Serialize>(format: OutputFormat, value: &T, table: impl FnOnce()) -> CliResult {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
        OutputFormat::Table => table(),
    }
    Ok(())
}

/// Services for the device this CLI runs on.
struct DeviceContext {
    manager: LicenseManager,
    trial: TrialClock,
    gate: FeatureGate,
}

async fn local_registry(config: &CliConfig) -> CliResult<LicenseRegistry> {
    let path = config.data_dir()?.join("registry.json");
    let registry = LicenseRegistry::new(Arc::new(FileLicenseStore::new(path)));
    registry.ensure_seeded().await?;
    Ok(registry)
}

async fn device_context(config: &CliConfig) -> CliResult<DeviceContext> {
    let store: Arc<dyn KeyValueStore> =
        Arc::new(FileKeyValueStore::new(config.data_dir()?.join("state.json")));

    let authority: Arc<dyn LicenseAuthority> = match &config.api_url {
        Some(api_url) => Arc::new(HttpLicenseAuthority::new(RemoteConfig {
            api_url: api_url.clone(),
            ..Default::default()
        })?),
        None => Arc::new(local_registry(config).await?),
    };

    let info = DeviceInfo::collect();
    let identity = Arc::new(DeviceIdentity::new(store.clone(), info.clone()));
    let trial = TrialClock::new(store.clone());
    let gate = FeatureGate::new(
        trial.clone(),
        GatePolicy {
            fail_closed: config.fail_closed,
        },
    );

    Ok(DeviceContext {
        manager: LicenseManager::new(identity, authority, store, info),
        trial,
        gate,
    })
}

/// Registry administration, local or through the service.
enum Registry {
    Local(LicenseRegistry),
    Remote(AdminClient),
}

impl Registry {
    async fn open(config: &CliConfig) -> CliResult<Self> {
        Ok(match &config.api_url {
            Some(url) => Registry::Remote(AdminClient::new(url, config.admin_token.clone())?),
            None => Registry::Local(local_registry(config).await?),
        })
    }

    async fn generate(&self, prefix: &str, max_devices: u32) -> CliResult<LicenseCode> {
        Ok(match self {
            Registry::Local(r) => r.generate_code(prefix, max_devices).await?,
            Registry::Remote(c) => c.generate_code(prefix, max_devices).await?.code,
        })
    }

    async fn stats(&self) -> CliResult<BTreeMap<LicenseCode, LicenseStats>> {
        Ok(match self {
            Registry::Local(r) => r.stats().await?,
            Registry::Remote(c) => c.stats().await?,
        })
    }

    async fn revoke(&self, code: &LicenseCode) -> CliResult<bool> {
        Ok(match self {
            Registry::Local(r) => r.revoke(code).await?,
            Registry::Remote(c) => c.revoke(code).await?,
        })
    }

    async fn reset_device(&self, code: &LicenseCode, device_id: &str) -> CliResult<bool> {
        Ok(match self {
            Registry::Local(r) => r.reset_device_for_code(code, &device_id.into()).await?,
            Registry::Remote(c) => c.reset_device(code, device_id).await?,
        })
    }
}

/// Show trial and premium status.
pub async fn status(config: &CliConfig) -> CliResult {
    let ctx = device_context(config).await?;
    let status = ctx.trial.status().await?;
    let limits = ctx.trial.limits().await?;

    emit(
        config.output_format,
        &serde_json::json!({ "status": status, "limits": limits }),
        || {
            if status.is_premium {
                println!("{} Premium", style("★").yellow());
                if let Some(code) = &status.unlock_code {
                    println!("  Unlocked with: {}", code);
                }
            } else if status.is_trial_active {
                println!(
                    "{} Trial: {}",
                    style("◷").cyan(),
                    format_days_remaining(status.days_remaining)
                );
                println!("  Ends: {}", status.trial_end_date.format("%Y-%m-%d"));
            } else {
                println!("{} Trial expired. Activate a code to continue.", style("✗").red());
            }

            let show = |limit: Option<u32>| limit.map_or("unlimited".to_string(), |n| n.to_string());
            println!("  Students: {}", show(limits.max_students));
            println!("  Classes:  {}", show(limits.max_classes));
            println!("  Grades:   {}", show(limits.max_grades));
            println!("  Courses:  {}", show(limits.max_courses));
            println!("  Export:   {}", if limits.can_export_data { "yes" } else { "no" });
        },
    )
}

/// Activate a code on this device.
pub async fn activate(config: &CliConfig, code: &str) -> CliResult {
    let ctx = device_context(config).await?;

    match ctx.manager.activate(code).await? {
        ActivationOutcome::Activated(info) => emit(config.output_format, &info, || {
            println!("{} Premium unlocked with {}", style("✓").green(), style(&info.code).bold());
            println!("  Device: {} ({})", info.device_name, info.device_id);
        }),
        ActivationOutcome::Rejected(rejection) => Err(rejection.into()),
    }
}

/// Release this device's license.
pub async fn deactivate(config: &CliConfig) -> CliResult {
    let ctx = device_context(config).await?;
    if ctx.manager.deactivate().await? {
        println!("{} License released from this device", style("✓").green());
    } else {
        println!("{} No license on this device", style("i").blue());
    }
    Ok(())
}

/// Show the stored license.
pub async fn license(config: &CliConfig) -> CliResult {
    let ctx = device_context(config).await?;
    let info = ctx.manager.license_info().await?;

    emit(config.output_format, &info, || match &info {
        Some(info) => {
            println!("License: {}", style(&info.code).bold());
            println!("  Device: {} ({})", info.device_name, info.device_id);
            println!("  Activated: {}", info.activation_date.format("%Y-%m-%d %H:%M UTC"));
            println!("  Active: {}", info.is_active);
        }
        None => println!("{} No license on this device", style("i").blue()),
    })
}

/// Re-validate the stored license.
pub async fn verify(config: &CliConfig) -> CliResult {
    let ctx = device_context(config).await?;
    let check = ctx.manager.check_current_license().await?;

    let license = match &check {
        LicenseCheck::Valid(info) => Some(info),
        _ => None,
    };
    emit(
        config.output_format,
        &serde_json::json!({
            "valid": check.is_valid(),
            "reason": check.reason(),
            "license": license,
        }),
        || match (&check, check.reason()) {
            (LicenseCheck::Valid(info), _) => {
                println!("{} License {} is valid", style("✓").green(), info.code)
            }
            (_, Some(reason)) => println!("{} {}", style("✗").red(), reason),
            (_, None) => {}
        },
    )
}

/// Show device identity and license summary.
pub async fn device_info(config: &CliConfig) -> CliResult {
    let ctx = device_context(config).await?;
    let report = ctx.manager.device_report().await?;
    emit(config.output_format, &report, || println!("{}", report))
}

/// Ask the feature gate about an action.
pub async fn check(config: &CliConfig, action: &str, count: u32) -> CliResult {
    let ctx = device_context(config).await?;
    let action: ActionKind = action.parse()?;
    let decision = ctx.gate.can_perform_action(&action, count).await?;

    emit(config.output_format, &decision, || {
        if decision.allowed {
            println!("{} {} allowed", style("✓").green(), action);
        } else {
            println!(
                "{} {} denied: {}",
                style("✗").red(),
                action,
                decision.reason.as_deref().unwrap_or("")
            );
        }
    })
}

pub async fn generate_code(config: &CliConfig, prefix: &str, max_devices: u32) -> CliResult {
    let registry = Registry::open(config).await?;
    let code = registry.generate(prefix, max_devices).await?;

    emit(
        config.output_format,
        &serde_json::json!({ "code": code, "maxDevices": max_devices }),
        || {
            println!("{} {}", style("✓").green(), style(&code).bold());
            println!("  Devices allowed: {}", max_devices);
        },
    )
}

pub fn customer_code(config: &CliConfig, info: &str) -> CliResult {
    let generated = codes::generate_bulk(&[CustomerRequest {
        info: info.to_string(),
        phone: None,
        max_devices: 1,
    }]);
    print_generated(config.output_format, &generated)
}

pub fn pattern_code(config: &CliConfig, pattern: &str, info: &str) -> CliResult {
    let code = codes::generate_pattern_code(&pattern.trim().to_uppercase(), info);
    emit(config.output_format, &serde_json::json!({ "code": code }), || {
        println!("{}", code)
    })
}

pub fn bulk_codes(config: &CliConfig, file: &Path) -> CliResult {
    let content = std::fs::read_to_string(file)?;
    let requests: Vec<CustomerRequest> = match file.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
        _ => serde_json::from_str(&content)?,
    };
    let generated = codes::generate_bulk(&requests);
    print_generated(config.output_format, &generated)
}

fn print_generated(format: OutputFormat, generated: &[codes::GeneratedCode]) -> CliResult {
    emit(format, &generated, || {
        for entry in generated {
            println!(
                "{}  {}  {} device(s)  {}",
                style(&entry.code).bold(),
                entry.customer,
                entry.max_devices,
                entry.phone
            );
        }
        println!(
            "{} {} code(s) generated at {}",
            style("✓").green(),
            generated.len(),
            Utc::now().format("%Y-%m-%d %H:%M UTC")
        );
    })
}

pub fn validate_code(code: &str) -> CliResult {
    let code = LicenseCode::new(code);
    if codes::is_valid_code_format(code.as_str()) {
        println!("{} {} has a valid format", style("✓").green(), code);
        Ok(())
    } else {
        Err(format!("{} does not have the generated-code format", code).into())
    }
}

pub async fn code_stats(config: &CliConfig) -> CliResult {
    let registry = Registry::open(config).await?;
    let stats = registry.stats().await?;

    emit(config.output_format, &stats, || {
        if stats.is_empty() {
            println!("{} No codes registered", style("i").blue());
            return;
        }
        println!("{:<32} {:>7} {:>5}", "CODE", "ACTIVE", "MAX");
        for (code, s) in &stats {
            println!("{:<32} {:>7} {:>5}", code, s.active_devices, s.max_devices);
        }
    })
}

pub async fn revoke_code(config: &CliConfig, code: &str, yes: bool) -> CliResult {
    use dialoguer::Confirm;

    let code = LicenseCode::new(code);
    if !yes {
        let confirmed = Confirm::new()
            .with_prompt(format!("Revoke {} and all its activations?", code))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("{} Cancelled", style("!").yellow());
            return Ok(());
        }
    }

    let registry = Registry::open(config).await?;
    if registry.revoke(&code).await? {
        println!("{} Code {} revoked", style("✓").green(), code);
        Ok(())
    } else {
        Err(format!("Unknown code {}", code).into())
    }
}

pub async fn reset_device(config: &CliConfig, code: &str, device_id: &str) -> CliResult {
    let code = LicenseCode::new(code);
    let registry = Registry::open(config).await?;
    if registry.reset_device(&code, device_id).await? {
        println!("{} Device {} released from {}", style("✓").green(), device_id, code);
        Ok(())
    } else {
        Err(format!("Unknown code {}", code).into())
    }
}

pub async fn reset_trial(config: &CliConfig, yes: bool) -> CliResult {
    use dialoguer::Confirm;

    if !yes {
        let confirmed = Confirm::new()
            .with_prompt("Restart the trial and clear premium status?")
            .default(false)
            .interact()?;
        if !confirmed {
            println!("{} Cancelled", style("!").yellow());
            return Ok(());
        }
    }

    let ctx = device_context(config).await?;
    ctx.trial.reset().await?;
    println!("{} Trial reset", style("✓").green());
    Ok(())
}

/// Run the license service in the foreground.
pub async fn serve(path: Option<&Path>) -> CliResult {
    let settings = classkit_api::settings::Settings::load(path)?;
    classkit_api::serve(settings).await?;
    Ok(())
}

/// Show configuration.
pub fn show_config(config: &CliConfig) -> CliResult {
    println!("Current configuration:");
    println!(
        "  api_url: {}",
        config.api_url.as_deref().unwrap_or("(not set, local registry)")
    );
    println!(
        "  admin_token: {}",
        if config.admin_token.is_some() {
            "***"
        } else {
            "(not set)"
        }
    );
    println!("  data_dir: {}", config.data_dir()?.display());
    println!("  output_format: {:?}", config.output_format);
    println!("  fail_closed: {}", config.fail_closed);

    if let Ok(path) = CliConfig::config_path() {
        println!("\nConfig file: {}", path.display());
    }

    Ok(())
}

/// Set configuration.
pub fn set_config(key: &str, value: &str) -> CliResult {
    let mut config = CliConfig::load().unwrap_or_default();
    config.set(key, value)?;
    config.save()?;

    let shown = if key == "admin_token" { "***" } else { value };
    println!("{} Set {} = {}", style("✓").green(), key, shown);
    Ok(())
}
