//! OrchDaemon implementation.
//!
//! The OrchDaemon owns one [`HwSwitch`] and the state last programmed into
//! it. Updates arrive on a bounded channel and are applied one at a time in
//! arrival order, so no two deltas for the switch ever overlap.

use crate::audit::{AuditCategory, AuditOutcome, AuditRecord};
use crate::audit_log;
use crate::error::ErrorClass;
use crate::hw_switch::{HwSwitch, HwSwitchError};
use crate::nhg::NeighborKey;
use crate::state::SwitchState;
use log::{debug, error, info, warn};
use sonic_types::MacAddress;
use tokio::sync::{mpsc, oneshot};

/// Configuration for the OrchDaemon.
#[derive(Debug, Clone)]
pub struct OrchDaemonConfig {
    /// Updates that may wait in the channel before senders block.
    pub queue_depth: usize,
    /// The switch was brought up from reloaded hardware state.
    pub warm_boot: bool,
}

impl Default for OrchDaemonConfig {
    fn default() -> Self {
        Self {
            queue_depth: 64,
            warm_boot: false,
        }
    }
}

/// One unit of work for the switch.
#[derive(Debug, Clone)]
pub enum SwitchUpdate {
    /// A complete desired state; the delta is taken against the state last
    /// programmed.
    DesiredState(Box<SwitchState>),
    NeighborResolved { key: NeighborKey, mac: MacAddress },
    NeighborUnresolved(NeighborKey),
    /// Ends a warm boot by removing everything left unclaimed.
    FinishWarmBoot,
    Stop,
}

impl SwitchUpdate {
    fn name(&self) -> &'static str {
        match self {
            SwitchUpdate::DesiredState(_) => "desired_state",
            SwitchUpdate::NeighborResolved { .. } => "neighbor_resolved",
            SwitchUpdate::NeighborUnresolved(_) => "neighbor_unresolved",
            SwitchUpdate::FinishWarmBoot => "finish_warm_boot",
            SwitchUpdate::Stop => "stop",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateReply {
    Applied,
    WarmBootFinished { removed: usize },
    Stopped,
}

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("OrchDaemon is not running")]
    NotRunning,

    #[error(transparent)]
    Switch(#[from] HwSwitchError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DaemonStats {
    pub applied: u64,
    pub rejected: u64,
}

struct Request {
    update: SwitchUpdate,
    reply: oneshot::Sender<Result<UpdateReply, HwSwitchError>>,
}

/// Sends updates to a running [`OrchDaemon`] and waits for their outcome.
#[derive(Debug, Clone)]
pub struct DaemonHandle {
    sender: mpsc::Sender<Request>,
}

impl DaemonHandle {
    pub async fn send(&self, update: SwitchUpdate) -> Result<UpdateReply, DaemonError> {
        let (reply, outcome) = oneshot::channel();
        self.sender
            .send(Request { update, reply })
            .await
            .map_err(|_| DaemonError::NotRunning)?;
        let result = outcome.await.map_err(|_| DaemonError::NotRunning)?;
        Ok(result?)
    }

    pub async fn apply_state(&self, state: SwitchState) -> Result<(), DaemonError> {
        self.send(SwitchUpdate::DesiredState(Box::new(state)))
            .await
            .map(|_| ())
    }

    pub async fn finish_warm_boot(&self) -> Result<usize, DaemonError> {
        match self.send(SwitchUpdate::FinishWarmBoot).await? {
            UpdateReply::WarmBootFinished { removed } => Ok(removed),
            _ => Ok(0),
        }
    }

    pub async fn stop(&self) -> Result<(), DaemonError> {
        self.send(SwitchUpdate::Stop).await.map(|_| ())
    }
}

/// The update loop for one switch.
pub struct OrchDaemon {
    config: OrchDaemonConfig,
    switch: HwSwitch,
    /// State last accepted by the switch.
    programmed: SwitchState,
    receiver: mpsc::Receiver<Request>,
    stats: DaemonStats,
    running: bool,
}

impl OrchDaemon {
    /// Creates a daemon around an initialized switch, plus the handle used
    /// to feed it.
    pub fn new(config: OrchDaemonConfig, switch: HwSwitch) -> (Self, DaemonHandle) {
        let (sender, receiver) = mpsc::channel(config.queue_depth.max(1));
        let daemon = Self {
            config,
            switch,
            programmed: SwitchState::default(),
            receiver,
            stats: DaemonStats::default(),
            running: false,
        };
        (daemon, DaemonHandle { sender })
    }

    pub fn switch(&self) -> &HwSwitch {
        &self.switch
    }

    pub fn programmed_state(&self) -> &SwitchState {
        &self.programmed
    }

    pub fn stats(&self) -> DaemonStats {
        self.stats
    }

    /// Processes updates until a stop request arrives, every handle is
    /// dropped, or an update reports inconsistent bookkeeping. In the last
    /// case the failing update is answered and nothing after it is read.
    pub async fn run(&mut self) {
        info!("Starting OrchDaemon update loop");
        self.running = true;
        audit_log!(AuditRecord::new(
            AuditCategory::SystemLifecycle,
            "OrchDaemon",
            "update_loop_started"
        )
            .with_outcome(AuditOutcome::Success)
            .with_details(serde_json::json!({
                "queue_depth": self.config.queue_depth,
                "warm_boot": self.config.warm_boot,
            })));

        let mut aborted = false;
        while self.running {
            let Some(request) = self.receiver.recv().await else {
                debug!("All update senders dropped");
                break;
            };
            let result = self.handle(request.update);
            let inconsistent =
                matches!(&result, Err(e) if e.class() == ErrorClass::Invariant);
            if request.reply.send(result).is_err() {
                debug!("Update sender went away before the reply");
            }
            if inconsistent {
                error!("Switch bookkeeping is inconsistent, aborting OrchDaemon");
                aborted = true;
                break;
            }
        }
        self.running = false;
        self.receiver.close();

        info!(
            "OrchDaemon update loop stopped ({} applied, {} rejected)",
            self.stats.applied, self.stats.rejected
        );
        let outcome = if aborted {
            AuditOutcome::Failure
        } else {
            AuditOutcome::Success
        };
        audit_log!(AuditRecord::new(
            AuditCategory::SystemLifecycle,
            "OrchDaemon",
            "update_loop_stopped"
        )
            .with_outcome(outcome)
            .with_details(serde_json::json!({
                "applied": self.stats.applied,
                "rejected": self.stats.rejected,
            })));
    }

    fn handle(&mut self, update: SwitchUpdate) -> Result<UpdateReply, HwSwitchError> {
        let name = update.name();
        debug!("Processing {}", name);
        let result = match update {
            SwitchUpdate::DesiredState(state) => self
                .switch
                .apply_delta(&self.programmed, &state)
                .map(|programmed| {
                    self.programmed = programmed;
                    UpdateReply::Applied
                }),
            SwitchUpdate::NeighborResolved { key, mac } => self
                .switch
                .neighbor_resolved(key, mac)
                .map(|()| UpdateReply::Applied),
            SwitchUpdate::NeighborUnresolved(key) => self
                .switch
                .neighbor_unresolved(&key)
                .map(|()| UpdateReply::Applied),
            SwitchUpdate::FinishWarmBoot => self
                .switch
                .finish_warm_boot()
                .map(|removed| UpdateReply::WarmBootFinished { removed }),
            SwitchUpdate::Stop => {
                info!("Stopping OrchDaemon");
                self.running = false;
                Ok(UpdateReply::Stopped)
            }
        };

        match &result {
            Ok(UpdateReply::Stopped) => {}
            Ok(_) => self.stats.applied += 1,
            Err(e) => {
                warn!("{} failed: {}", name, e);
                self.stats.rejected += 1;
            }
        }
        result
    }

    /// Dumps state for debugging.
    pub fn dump(&self) -> Vec<String> {
        let mut lines = vec![
            format!("OrchDaemon running: {}", self.running),
            format!(
                "  switch: {} boot, failed: {}",
                self.switch.boot_type(),
                self.switch.is_failed()
            ),
            format!(
                "  programmed: {} ports, {} vlans, {} neighbors, {} routes",
                self.programmed.ports.len(),
                self.programmed.vlans.len(),
                self.programmed.neighbors.len(),
                self.programmed.routes.len()
            ),
        ];
        for group in self.switch.port_groups() {
            lines.push(format!(
                "  port group {}: {}",
                group.controlling_port(),
                group
                    .lane_mode()
                    .map_or_else(|| "unloaded".to_string(), |mode| mode.to_string())
            ));
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hw_switch::BootType;
    use crate::platform::{Platform, PlatformKind};
    use crate::state::PortConfig;
    use pretty_assertions::assert_eq;
    use sonic_sai::schema::port;
    use sonic_sai::{AttrValue, FakeSai, ObjectType, SaiApi};
    use sonic_types::{PortId, PortSpeed};
    use std::sync::Arc;

    fn switch(fake: &Arc<FakeSai>, boot: BootType) -> HwSwitch {
        let mut platform = Platform::new(PlatformKind::Fake);
        for id in 0..4 {
            platform.add_port(PortId::new(id), None);
        }
        let groups = vec![(0..4).map(PortId::new).collect()];
        HwSwitch::init(fake.clone(), platform, &groups, boot).unwrap()
    }

    fn daemon(fake: &Arc<FakeSai>) -> (OrchDaemon, DaemonHandle) {
        OrchDaemon::new(OrchDaemonConfig::default(), switch(fake, BootType::Cold))
    }

    fn ports(speed: PortSpeed, enabled: &[u32]) -> SwitchState {
        (0..4).fold(SwitchState::new(), |state, id| {
            let port = PortConfig::new(PortId::new(id), speed);
            state.with_port(if enabled.contains(&id) { port.enabled() } else { port })
        })
    }

    // ============================================================================
    // 1. Configuration Tests
    // ============================================================================

    #[test]
    fn test_orchdaemon_default_config() {
        let config = OrchDaemonConfig::default();
        assert_eq!(config.queue_depth, 64);
        assert!(!config.warm_boot);
    }

    // ============================================================================
    // 2. Update Loop Tests
    // ============================================================================

    #[tokio::test]
    async fn test_updates_applied_in_order() {
        let fake = Arc::new(FakeSai::new());
        let (mut daemon, handle) = daemon(&fake);
        let task = tokio::spawn(async move {
            daemon.run().await;
            daemon
        });

        handle
            .apply_state(ports(PortSpeed::TwentyFiveG, &[0, 1, 2, 3]))
            .await
            .unwrap();
        let last = ports(PortSpeed::HundredG, &[0]);
        handle.apply_state(last.clone()).await.unwrap();
        handle.stop().await.unwrap();

        let daemon = task.await.unwrap();
        assert_eq!(daemon.programmed_state(), &last);
        assert_eq!(daemon.stats(), DaemonStats { applied: 2, rejected: 0 });
        assert_eq!(fake.count(ObjectType::Port), 4);
    }

    #[tokio::test]
    async fn test_rejected_state_keeps_previous() {
        let fake = Arc::new(FakeSai::new());
        let (mut daemon, handle) = daemon(&fake);
        let task = tokio::spawn(async move {
            daemon.run().await;
            daemon
        });

        let good = ports(PortSpeed::Xg, &[0, 1, 2, 3]);
        handle.apply_state(good.clone()).await.unwrap();
        let err = handle
            .apply_state(ports(PortSpeed::HundredG, &[0, 1]))
            .await
            .unwrap_err();
        match err {
            DaemonError::Switch(e) => assert_eq!(e.class(), ErrorClass::ConfigInvalid),
            other => panic!("unexpected error: {other}"),
        }
        drop(handle);

        let daemon = task.await.unwrap();
        assert_eq!(daemon.programmed_state(), &good);
        assert_eq!(daemon.stats().rejected, 1);
        assert!(!daemon.switch().is_failed());
    }

    // ============================================================================
    // 3. Stop Tests
    // ============================================================================

    #[tokio::test]
    async fn test_handle_fails_after_stop() {
        let fake = Arc::new(FakeSai::new());
        let (mut daemon, handle) = daemon(&fake);
        let task = tokio::spawn(async move {
            daemon.run().await;
            daemon
        });

        handle.stop().await.unwrap();
        let daemon = task.await.unwrap();
        assert!(matches!(
            handle.apply_state(SwitchState::default()).await,
            Err(DaemonError::NotRunning)
        ));
        assert!(daemon.dump()[0].contains("false"));
    }

    #[tokio::test]
    async fn test_inconsistent_hardware_aborts_loop() {
        let fake = Arc::new(FakeSai::new());
        let state = ports(PortSpeed::TwentyFiveG, &[0, 1, 2, 3]);
        let mut cold = switch(&fake, BootType::Cold);
        cold.apply_delta(&SwitchState::default(), &state).unwrap();
        let controlling = cold
            .managers()
            .ports()
            .port_oid(PortId::new(0))
            .unwrap()
            .adapter_key();
        drop(cold);
        // No lane mode drives three lanes.
        fake.set_attribute(&controlling, port::ACTIVE_LANES, &AttrValue::U32(3))
            .unwrap();

        let config = OrchDaemonConfig {
            warm_boot: true,
            ..Default::default()
        };
        let (mut daemon, handle) = OrchDaemon::new(config, switch(&fake, BootType::Warm));
        let task = tokio::spawn(async move {
            daemon.run().await;
            daemon
        });

        match handle.apply_state(state.clone()).await.unwrap_err() {
            DaemonError::Switch(e) => assert_eq!(e.class(), ErrorClass::Invariant),
            other => panic!("unexpected error: {other}"),
        }
        let daemon = task.await.unwrap();
        assert!(daemon.switch().is_failed());
        assert_eq!(daemon.stats().rejected, 1);
        assert!(matches!(
            handle.apply_state(state).await,
            Err(DaemonError::NotRunning)
        ));
    }

    #[tokio::test]
    async fn test_finish_warm_boot_on_cold_switch() {
        let fake = Arc::new(FakeSai::new());
        let (mut daemon, handle) = daemon(&fake);
        let task = tokio::spawn(async move { daemon.run().await });

        assert_eq!(handle.finish_warm_boot().await.unwrap(), 0);
        handle.stop().await.unwrap();
        task.await.unwrap();
    }
}
