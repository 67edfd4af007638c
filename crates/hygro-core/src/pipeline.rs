//! The sense → display → publish pipeline.
//!
//! Two phases. Startup runs once: show status, request the network
//! join, and poll the driver at a fixed interval (one progress dot per
//! poll) until the supervisor reports `Connected` or `Failed`. Failed
//! is terminal; the caller halts the device. Steady state runs forever:
//! one [`run_cycle`] per interval.
//!
//! Everything here is generic over the component traits so host tests
//! can drive a whole cycle with scripted mocks and no hardware.

use embedded_hal_async::delay::DelayNs;
use log::{error, info, warn};

use crate::display::Presenter;
use crate::publish::PublishError;
use crate::reading::Reading;
use crate::sensor::{Sensor, SensorError};
use crate::wifi::{ConnectionState, JoinFailure, JoinPoll, JoinSupervisor};

/// A consumer that pushes one reading to the remote API.
pub trait Publisher {
    async fn publish(&mut self, reading: &Reading) -> Result<(), PublishError>;
}

/// The pipeline's view of the radio during startup.
///
/// `poll` returns one observation immediately; the pipeline owns the
/// inter-poll delay.
pub trait JoinDriver {
    /// Ask the radio to associate with the configured access point.
    async fn begin_join(&mut self);

    /// Observe the current join status.
    async fn poll(&mut self) -> JoinPoll;
}

/// What one steady-state cycle did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CycleOutcome {
    /// Read, displayed, and accepted by the server.
    Published,
    /// Read and displayed, but the server or transport refused it.
    /// The data point is dropped; the next cycle is the retry.
    PublishFailed(PublishError),
    /// The sensor produced no reading; display and publish skipped.
    SensorFailed(SensorError),
    /// The reading carried no valid fields; display and publish skipped.
    NothingValid,
}

/// The loop cadence never undercuts the sensor's sampling floor.
pub fn effective_interval_ms(configured_ms: u64, sensor_floor_ms: u64) -> u64 {
    configured_ms.max(sensor_floor_ms)
}

/// Run the startup join phase to completion.
///
/// Returns `Ok` once the supervisor reaches `Connected`. A terminal
/// failure renders the failure screen and returns `Err`; the caller
/// must halt rather than proceed to steady state.
pub async fn run_join_phase<J, P, D>(
    driver: &mut J,
    presenter: &mut P,
    delay: &mut D,
    poll_interval_ms: u32,
) -> Result<(), JoinFailure>
where
    J: JoinDriver,
    P: Presenter,
    D: DelayNs,
{
    if let Err(e) = presenter.show_startup_status("Joining network") {
        warn!("startup status render failed: {e:?}");
    }

    driver.begin_join().await;
    let mut supervisor = JoinSupervisor::new();
    supervisor.begin();

    loop {
        match supervisor.on_poll(driver.poll().await) {
            ConnectionState::Connected => {
                info!("network joined after {} polls", supervisor.polls());
                return Ok(());
            }
            ConnectionState::Failed => {
                let reason = supervisor
                    .failure()
                    .unwrap_or(JoinFailure::AssociationFailed);
                error!("network join failed: {reason}");
                if let Err(e) = presenter.show_join_failure() {
                    warn!("failure screen render failed: {e:?}");
                }
                return Err(reason);
            }
            ConnectionState::Connecting | ConnectionState::Disconnected => {
                if let Err(e) = presenter.append_startup_dot() {
                    warn!("progress dot render failed: {e:?}");
                }
                delay.delay_ms(poll_interval_ms).await;
            }
        }
    }
}

/// One steady-state iteration: read, display, publish.
///
/// A sensor failure skips both consumers for this cycle only. A display
/// failure is logged and does not block the publish. A publish failure
/// is logged and the data point is dropped — there is no queue and no
/// resend.
pub async fn run_cycle<S, P, U>(
    sensor: &mut S,
    presenter: &mut P,
    publisher: &mut U,
) -> CycleOutcome
where
    S: Sensor,
    P: Presenter,
    U: Publisher,
{
    let reading = match sensor.read().await {
        Ok(reading) => reading,
        Err(e) => {
            warn!("sensor read failed: {e}; skipping display and publish this cycle");
            return CycleOutcome::SensorFailed(e);
        }
    };
    if !reading.has_valid_field() {
        warn!("reading has no valid fields; skipping display and publish this cycle");
        return CycleOutcome::NothingValid;
    }

    if let Err(e) = presenter.show_reading(&reading) {
        warn!("display update failed: {e:?}");
    }

    match publisher.publish(&reading).await {
        Ok(()) => {
            info!("published reading captured at {} ms", reading.captured_at_ms);
            CycleOutcome::Published
        }
        Err(e) => {
            warn!("publish failed: {e}; dropping this cycle's data point");
            CycleOutcome::PublishFailed(e)
        }
    }
}
