use crate::utils::error::{AppError, Result};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use url::Host;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field: &str, value: impl ToString, reason: impl Into<String>) -> AppError {
    AppError::InvalidConfigValueError {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

static HOSTNAME_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?$").expect("hostname label pattern")
});

/// 監聽位址只接受主機名稱或 IP，不含協定或埠號
///
/// IPv6 addresses are written in brackets, as they appear in `host:port`.
pub fn validate_host(field_name: &str, host: &str) -> Result<()> {
    if host.trim().is_empty() {
        return Err(invalid(field_name, host, "Host cannot be empty"));
    }
    match Host::parse(host) {
        Ok(Host::Ipv4(_)) | Ok(Host::Ipv6(_)) => Ok(()),
        Ok(Host::Domain(domain)) => {
            if domain.len() <= 253 && domain.split('.').all(|label| HOSTNAME_LABEL.is_match(label)) {
                Ok(())
            } else {
                Err(invalid(
                    field_name,
                    host,
                    "Hostname labels may only contain letters, digits and '-'",
                ))
            }
        }
        Err(e) => Err(invalid(field_name, host, format!("Invalid host: {}", e))),
    }
}

pub fn validate_port(field_name: &str, port: u32) -> Result<()> {
    if !(1..=u32::from(u16::MAX)).contains(&port) {
        return Err(invalid(
            field_name,
            port,
            format!("Port must be between 1 and {}", u16::MAX),
        ));
    }
    Ok(())
}

/// Seed files are JSON documents.
pub fn validate_seed_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() || path.contains('\0') {
        return Err(invalid(field_name, path.escape_default(), "Path is not usable"));
    }
    match Path::new(path).extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(()),
        _ => Err(invalid(field_name, path, "Seed file must have a .json extension")),
    }
}

pub fn validate_one_of(field_name: &str, value: &str, allowed: &[&str]) -> Result<()> {
    if allowed.contains(&value) {
        return Ok(());
    }
    Err(invalid(
        field_name,
        value,
        format!("Unsupported value. Valid values: {}", allowed.join(", ")),
    ))
}
