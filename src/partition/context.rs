use std::collections::HashMap;
use std::path::PathBuf;

/// Storage driver name whose thin pool is tracked as an extra partition.
pub const DEVICE_MAPPER_DRIVER: &str = "devicemapper";

/// Driver status key holding the thin pool name.
pub const POOL_NAME_KEY: &str = "Pool Name";

/// Driver status key holding the thin pool block size, as a human-readable size.
pub const POOL_BLOCK_SIZE_KEY: &str = "Pool Blocksize";

/// Container runtime storage layout, as reported by the runtime.
///
/// An empty context (the default) means plain host discovery.
#[derive(Debug, Clone, Default)]
pub struct RuntimeContext {
    /// Root directory of the runtime's storage, e.g. `/var/lib/docker`.
    /// A mount at exactly this path is tracked even if its filesystem is virtual.
    pub root: Option<PathBuf>,
    /// Storage driver name, e.g. `overlay2` or `devicemapper`.
    pub driver: String,
    /// Free-form driver status pairs.
    pub driver_status: HashMap<String, String>,
}

impl RuntimeContext {
    /// Returns the thin pool name if the devicemapper driver is active.
    pub fn thin_pool_name(&self) -> Option<&str> {
        if self.driver != DEVICE_MAPPER_DRIVER {
            return None;
        }
        self.driver_status
            .get(POOL_NAME_KEY)
            .map(String::as_str)
            .filter(|name| !name.is_empty())
    }

    /// Returns the thin pool block size in bytes, if reported and parseable.
    pub fn thin_pool_block_size(&self) -> Option<u64> {
        self.driver_status
            .get(POOL_BLOCK_SIZE_KEY)
            .and_then(|raw| parse_human_size(raw))
    }
}

/// Parses decimal human-readable sizes such as `65.54 kB`, `1.2GB` or `512`.
pub fn parse_human_size(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(raw.len());
    let (number, unit) = raw.split_at(split);
    let number: f64 = number.parse().ok()?;

    let multiplier: f64 = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1.0,
        "k" | "kb" => 1e3,
        "m" | "mb" => 1e6,
        "g" | "gb" => 1e9,
        "t" | "tb" => 1e12,
        "p" | "pb" => 1e15,
        _ => return None,
    };

    Some((number * multiplier).round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_human_size() {
        assert_eq!(parse_human_size("65.54 kB"), Some(65_540));
        assert_eq!(parse_human_size("512"), Some(512));
        assert_eq!(parse_human_size("1.5GB"), Some(1_500_000_000));
        assert_eq!(parse_human_size(" 2 M "), Some(2_000_000));
        assert_eq!(parse_human_size("lots"), None);
        assert_eq!(parse_human_size("3 parsecs"), None);
    }

    #[test]
    fn test_thin_pool_only_for_devicemapper() {
        let mut ctx = RuntimeContext {
            driver: "overlay2".to_owned(),
            ..Default::default()
        };
        ctx.driver_status
            .insert(POOL_NAME_KEY.to_owned(), "docker-pool".to_owned());
        assert_eq!(ctx.thin_pool_name(), None);

        ctx.driver = DEVICE_MAPPER_DRIVER.to_owned();
        assert_eq!(ctx.thin_pool_name(), Some("docker-pool"));
    }

    #[test]
    fn test_thin_pool_block_size() {
        let mut ctx = RuntimeContext::default();
        assert_eq!(ctx.thin_pool_block_size(), None);
        ctx.driver_status
            .insert(POOL_BLOCK_SIZE_KEY.to_owned(), "65.54 kB".to_owned());
        assert_eq!(ctx.thin_pool_block_size(), Some(65_540));
    }
}
