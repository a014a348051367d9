use tracing::{info, warn};

use crate::error::{Result, SynScanError};
use crate::SerialConfig;

/// Serial devices the OS currently reports, by path.
pub fn available_ports() -> Result<Vec<String>> {
    let ports = tokio_serial::available_ports()?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}

/// A single candidate is taken; zero or several are left to the caller.
pub fn pick_port(mut candidates: Vec<String>) -> Result<String> {
    match candidates.len() {
        0 => Err(SynScanError::NoPortFound),
        1 => Ok(candidates.remove(0)),
        _ => {
            candidates.sort();
            Err(SynScanError::AmbiguousPort(candidates))
        }
    }
}

pub fn find_mount() -> Result<String> {
    let ports = available_ports()?;
    match pick_port(ports) {
        Ok(dev) => {
            info!("mount autodetect: using {}", dev);
            Ok(dev)
        }
        Err(e) => {
            warn!("mount autodetect: {}", e);
            Err(e)
        }
    }
}

/// Configured device wins unless autodetect is on.
pub fn resolve_port(cfg: &SerialConfig) -> Result<String> {
    match (&cfg.serial_dev, cfg.autodetect) {
        (Some(dev), false) if !dev.is_empty() => Ok(dev.clone()),
        (_, true) => find_mount(),
        _ => Err(SynScanError::invalid("serial.serial_dev missing (autodetect=false)")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_port_is_chosen() {
        assert_eq!(pick_port(vec!["/dev/ttyUSB0".into()]).unwrap(), "/dev/ttyUSB0");
    }

    #[test]
    fn zero_or_many_defer_to_caller() {
        assert!(matches!(pick_port(vec![]), Err(SynScanError::NoPortFound)));
        match pick_port(vec!["COM4".into(), "COM3".into()]) {
            Err(SynScanError::AmbiguousPort(list)) => assert_eq!(list, vec!["COM3", "COM4"]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn explicit_device_skips_discovery() {
        let cfg = SerialConfig {
            serial_dev: Some("/dev/ttyACM0".into()),
            autodetect: false,
            ..SerialConfig::default()
        };
        assert_eq!(resolve_port(&cfg).unwrap(), "/dev/ttyACM0");

        let missing = SerialConfig { serial_dev: None, autodetect: false, ..SerialConfig::default() };
        assert!(matches!(resolve_port(&missing), Err(SynScanError::InvalidArgument(_))));
    }
}
