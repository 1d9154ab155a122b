//! Host actions the UI can trigger: network identity and power management

use anyhow::{bail, Context, Result};
use log::{info, warn};
use std::process::Command;
use std::sync::Mutex;

pub trait SystemControl: Send + Sync {
    /// Addresses of the appliance as shown on the hostname page.
    fn hostname(&self) -> Result<String>;

    fn shutdown(&self, restart: bool) -> Result<()>;
}

/// Runs the stock `hostname` and `shutdown` commands.
#[derive(Debug, Default)]
pub struct HostSystem;

impl SystemControl for HostSystem {
    fn hostname(&self) -> Result<String> {
        let output = Command::new("hostname")
            .arg("-I")
            .output()
            .context("failed to run hostname")?;
        if !output.status.success() {
            bail!("Error {}", output.status.code().unwrap_or(-1));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn shutdown(&self, restart: bool) -> Result<()> {
        let flag = if restart { "-r" } else { "-h" };
        info!("Running shutdown {} now", flag);
        let status = Command::new("sudo")
            .args(["shutdown", flag, "now"])
            .status()
            .context("failed to run shutdown")?;
        if !status.success() {
            warn!("shutdown exited with {}", status);
            bail!("shutdown exited with {}", status);
        }
        Ok(())
    }
}

/// Stand-in for machines where halting the host is not wanted; only logs.
#[derive(Debug)]
pub struct SimulatedSystem {
    hostname: String,
    shutdowns: Mutex<Vec<bool>>,
}

impl SimulatedSystem {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            shutdowns: Mutex::new(Vec::new()),
        }
    }

    /// Restart flags of every shutdown requested so far.
    pub fn shutdown_requests(&self) -> Vec<bool> {
        match self.shutdowns.lock() {
            Ok(requests) => requests.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl SystemControl for SimulatedSystem {
    fn hostname(&self) -> Result<String> {
        Ok(self.hostname.clone())
    }

    fn shutdown(&self, restart: bool) -> Result<()> {
        info!("Simulated {}", if restart { "restart" } else { "shutdown" });
        match self.shutdowns.lock() {
            Ok(mut requests) => requests.push(restart),
            Err(poisoned) => poisoned.into_inner().push(restart),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulated_system_records_shutdowns() {
        let system = SimulatedSystem::new("10.0.0.2");
        assert_eq!(system.hostname().unwrap(), "10.0.0.2");
        system.shutdown(false).unwrap();
        system.shutdown(true).unwrap();
        assert_eq!(system.shutdown_requests(), vec![false, true]);
    }
}
