use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintSettings {
    pub print_page_uri: String,
    pub ready_timeout_ms: u64,
    pub queue_depth: usize,
    pub debug_surface: bool,
}

impl Default for PrintSettings {
    fn default() -> Self {
        Self {
            print_page_uri: print_page_uri(Path::new("."), false),
            ready_timeout_ms: 10_000,
            queue_depth: 8,
            debug_surface: false,
        }
    }
}

impl PrintSettings {
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }
}

/// Location of the page the print surface loads. Production bundles keep it
/// under `utils/print`.
pub fn print_page_uri(base_dir: &Path, production: bool) -> String {
    let dir = if production {
        base_dir.join("utils").join("print")
    } else {
        base_dir.to_path_buf()
    };
    let path = dir.join("print.html").to_string_lossy().replace('\\', "/");
    if path.starts_with('/') {
        format!("file://{path}")
    } else {
        format!("file:///{path}")
    }
}

pub fn load_settings() -> PrintSettings {
    let base_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));
    load_settings_from(Path::new("print.toml"), &base_dir, |key| {
        std::env::var(key).ok()
    })
}

/// Defaults, then `config_path` if readable, then environment overrides
/// looked up through `env`.
pub fn load_settings_from(
    config_path: &Path,
    base_dir: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> PrintSettings {
    let production = env("APP__ENVIRONMENT").is_some_and(|v| v.eq_ignore_ascii_case("production"));
    let mut settings = PrintSettings {
        print_page_uri: print_page_uri(base_dir, production),
        ..PrintSettings::default()
    };

    if let Ok(raw) = fs::read_to_string(config_path) {
        match toml::from_str::<HashMap<String, toml::Value>>(&raw) {
            Ok(file_cfg) => {
                let file_cfg: HashMap<String, String> = file_cfg
                    .into_iter()
                    .map(|(key, value)| (key, value_text(value)))
                    .collect();
                if let Some(v) = file_cfg.get("print_page_uri") {
                    settings.print_page_uri = v.clone();
                }
                if let Some(v) = file_cfg.get("ready_timeout_ms") {
                    apply_number(&mut settings.ready_timeout_ms, v);
                }
                if let Some(v) = file_cfg.get("queue_depth") {
                    apply_number(&mut settings.queue_depth, v);
                }
                if let Some(v) = file_cfg.get("debug_surface") {
                    settings.debug_surface = is_truthy(v);
                }
            }
            Err(err) => tracing::warn!(
                path = %config_path.display(),
                "ignoring unreadable print settings: {err}"
            ),
        }
    }

    if let Some(v) = env("APP__PRINT_PAGE_URI") {
        settings.print_page_uri = v;
    }
    if let Some(v) = env("APP__PRINT_READY_TIMEOUT_MS") {
        apply_number(&mut settings.ready_timeout_ms, &v);
    }
    if let Some(v) = env("APP__PRINT_QUEUE_DEPTH") {
        apply_number(&mut settings.queue_depth, &v);
    }
    if let Some(v) = env("DEBUG") {
        settings.debug_surface = is_truthy(&v);
    }

    settings.queue_depth = settings.queue_depth.max(1);
    settings
}

// Values may be written quoted or bare.
fn value_text(value: toml::Value) -> String {
    match value {
        toml::Value::String(text) => text,
        other => other.to_string(),
    }
}

fn apply_number<T: std::str::FromStr>(target: &mut T, raw: &str) {
    if let Ok(parsed) = raw.trim().parse::<T>() {
        *target = parsed;
    }
}

fn is_truthy(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
