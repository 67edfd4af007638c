//! Wi-Fi station bring-up and join supervision.
//!
//! A background task drives the radio through start and association and
//! records where it got to in [`LINK_PHASE`]. The join driver polled by
//! the startup phase reads that record plus the network stack's link
//! state, so each poll returns immediately and the caller owns the
//! cadence.

use core::cell::Cell;

use embassy_executor::Spawner;
use embassy_net::{Runner, Stack};
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use esp_radio::wifi::{ClientConfig, ModeConfig, WifiController, WifiDevice};
use hygro_core::config::InternetConfig;
use hygro_core::pipeline::JoinDriver;
use hygro_core::wifi::{JoinFailure, JoinPoll};

/// How far the background connect task has gotten.
#[derive(Clone, Copy)]
enum LinkPhase {
    Idle,
    Associating,
    Associated,
    Failed(JoinFailure),
}

static LINK_PHASE: Mutex<CriticalSectionRawMutex, Cell<LinkPhase>> =
    Mutex::new(Cell::new(LinkPhase::Idle));

fn set_phase(phase: LinkPhase) {
    LINK_PHASE.lock(|cell| cell.set(phase));
}

fn phase() -> LinkPhase {
    LINK_PHASE.lock(|cell| cell.get())
}

/// Builds the station-mode configuration from the device config.
pub fn station_config(config: &InternetConfig) -> ModeConfig {
    ModeConfig::Client(
        ClientConfig::default()
            .with_ssid(config.ssid.into())
            .with_password(config.password.into()),
    )
}

#[embassy_executor::task]
pub async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) {
    runner.run().await
}

#[embassy_executor::task]
async fn connect_task(mut controller: WifiController<'static>) {
    set_phase(LinkPhase::Associating);

    if let Err(err) = controller.start_async().await {
        log::error!("radio start failed: {err:?}");
        set_phase(LinkPhase::Failed(JoinFailure::RadioFailure));
        return;
    }

    if let Err(err) = controller.connect_async().await {
        log::error!("association failed: {err:?}");
        set_phase(LinkPhase::Failed(JoinFailure::AssociationFailed));
        return;
    }

    set_phase(LinkPhase::Associated);
}

/// Non-blocking view over the background join, polled by the startup
/// phase until the link carries an IPv4 address or fails outright.
pub struct WifiJoinDriver {
    spawner: Spawner,
    controller: Option<WifiController<'static>>,
    stack: Stack<'static>,
}

impl WifiJoinDriver {
    pub fn new(spawner: Spawner, controller: WifiController<'static>, stack: Stack<'static>) -> Self {
        Self {
            spawner,
            controller: Some(controller),
            stack,
        }
    }

    pub fn stack(&self) -> Stack<'static> {
        self.stack
    }
}

impl JoinDriver for WifiJoinDriver {
    async fn begin_join(&mut self) {
        if let Some(controller) = self.controller.take() {
            if self.spawner.spawn(connect_task(controller)).is_err() {
                set_phase(LinkPhase::Failed(JoinFailure::RadioFailure));
            }
        }
    }

    async fn poll(&mut self) -> JoinPoll {
        match phase() {
            LinkPhase::Failed(failure) => JoinPoll::TerminalFailure(failure),
            LinkPhase::Associated
                if self.stack.is_link_up() && self.stack.config_v4().is_some() =>
            {
                JoinPoll::Joined
            }
            _ => JoinPoll::Joining,
        }
    }
}
